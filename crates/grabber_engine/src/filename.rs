use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Longest title kept, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Extension given to every downloaded archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Make a title safe to use as a file stem on Windows and Unix.
///
/// Returns an empty string when nothing usable is left; callers pick a
/// fallback title in that case.
pub fn sanitize_title(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c.is_whitespace() || c == '.');
    let mut final_name: String = trimmed.chars().take(MAX_TITLE_CHARS).collect();
    // Truncation can expose trailing whitespace or dots again.
    let kept = final_name.trim_end_matches(|c: char| c.is_whitespace() || c == '.').len();
    final_name.truncate(kept);
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

/// Title used when no title selector matched: the URL tail after its last
/// `-`, then a timestamp placeholder.
pub fn fallback_title(item_url: &str) -> String {
    let tail = item_url
        .trim_end_matches('/')
        .rsplit('-')
        .next()
        .unwrap_or_default();
    let from_url = sanitize_title(&format!("item_{tail}"));
    if !tail.trim().is_empty() && !from_url.is_empty() {
        return from_url;
    }
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    format!("unknown_item_{secs}")
}

/// `{title}.zip`
pub fn archive_filename(title: &str) -> String {
    format!("{title}.{ARCHIVE_EXTENSION}")
}

/// Stable id for the progress line of one download.
pub fn progress_id(title: &str) -> String {
    format!("download_{}", short_hash(title))
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_characters_become_underscores() {
        assert_eq!(sanitize_title(r#"a<b>c:d"e/f\g|h?i*j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_title("  [Group] Title. "), "[Group] Title");
    }

    #[test]
    fn long_titles_are_cut_on_char_boundaries() {
        let title = "漫".repeat(150);
        let sanitized = sanitize_title(&title);
        assert_eq!(sanitized.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn reserved_device_names_are_patched() {
        assert_eq!(sanitize_title("con"), "con_");
        assert_eq!(sanitize_title("COM1"), "COM1_");
    }

    #[test]
    fn fallback_uses_url_tail() {
        assert_eq!(
            fallback_title("https://ex.com/photos-index-aid-12345.html"),
            "item_12345.html"
        );
        let no_dash = fallback_title("https://ex.com/view?id=9");
        assert!(no_dash.starts_with("item_https_"));
        assert!(!no_dash.contains('/'));
        assert!(!no_dash.contains('?'));
    }

    #[test]
    fn fallback_is_bounded_and_never_empty() {
        let long = format!("https://ex.com/a-{}", "x".repeat(300));
        let title = fallback_title(&long);
        assert!(!title.is_empty());
        assert!(title.chars().count() <= MAX_TITLE_CHARS);

        assert!(fallback_title("https://ex.com/a-").starts_with("unknown_item_"));
        assert!(fallback_title("").starts_with("unknown_item_"));
    }

    #[test]
    fn progress_id_is_stable_per_title() {
        assert_eq!(progress_id("Title"), progress_id("Title"));
        assert_ne!(progress_id("Title"), progress_id("Other"));
        assert_eq!(progress_id("Title").len(), "download_".len() + 8);
    }
}
