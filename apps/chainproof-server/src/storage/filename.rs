//! Filename sanitizing and collision candidates

use unicode_normalization::UnicodeNormalization;

/// Device names that cannot be used as file stems on Windows
const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduce a client-supplied filename to a safe flat name.
///
/// The name is NFKD-decomposed and reduced to ASCII, so accented letters
/// keep their base letter. Path separators become spaces, whitespace runs
/// collapse into `_`, anything outside `[A-Za-z0-9_.-]` is dropped and
/// leading/trailing `.`/`_` are stripped. On Windows, device names get a `_`
/// prefix. Returns `None` when nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let spaced: String = raw
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return None;
    }

    if cfg!(windows) && is_device_name(trimmed) {
        return Some(format!("_{}", trimmed));
    }

    Some(trimmed.to_string())
}

fn is_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name);
    WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
}

/// Whether `name` can be joined to the storage root as-is
pub fn is_plain_name(name: &str) -> bool {
    sanitize_filename(name).as_deref() == Some(name)
}

/// Split off the last extension, keeping the dot with the extension
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Candidate name for probe `n`: the name itself for 0, `stem_n.ext` after that
pub fn numbered_candidate(name: &str, n: usize) -> String {
    if n == 0 {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    format!("{}_{}{}", stem, n, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain_names_untouched() {
        assert_eq!(sanitize_filename("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            sanitize_filename("data-2024_v1.tar.gz").as_deref(),
            Some("data-2024_v1.tar.gz")
        );
    }

    #[test]
    fn test_sanitize_strips_traversal() {
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("etc_passwd")
        );
        assert_eq!(
            sanitize_filename("..\\windows\\system32\\cmd.exe").as_deref(),
            Some("windows_system32_cmd.exe")
        );
        assert_eq!(sanitize_filename("/abs/path.txt").as_deref(), Some("abs_path.txt"));
    }

    #[test]
    fn test_sanitize_whitespace_and_symbols() {
        assert_eq!(
            sanitize_filename("My  cool\tmovie.mov").as_deref(),
            Some("My_cool_movie.mov")
        );
        assert_eq!(sanitize_filename("a$b%c?.txt").as_deref(), Some("abc.txt"));
        assert_eq!(sanitize_filename(".hidden").as_deref(), Some("hidden"));
    }

    #[test]
    fn test_sanitize_decomposes_accents() {
        assert_eq!(sanitize_filename("résumé.pdf").as_deref(), Some("resume.pdf"));
        assert_eq!(sanitize_filename("Ångström 2.txt").as_deref(), Some("Angstrom_2.txt"));
        // compatibility forms fold to ASCII
        assert_eq!(sanitize_filename("ﬁle①.txt").as_deref(), Some("file1.txt"));
        assert_eq!(sanitize_filename("日本語.txt").as_deref(), Some("txt"));
    }

    #[test]
    fn test_sanitize_rejects_empty_results() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("///"), None);
        assert_eq!(sanitize_filename("???"), None);
    }

    #[test]
    fn test_device_names() {
        assert!(is_device_name("con.txt"));
        assert!(is_device_name("LPT1"));
        assert!(!is_device_name("console.txt"));
    }

    #[test]
    #[cfg(windows)]
    fn test_sanitize_prefixes_devices_on_windows() {
        assert_eq!(sanitize_filename("con.txt").as_deref(), Some("_con.txt"));
        assert_eq!(sanitize_filename("LPT1").as_deref(), Some("_LPT1"));
    }

    #[test]
    #[cfg(not(windows))]
    fn test_sanitize_keeps_device_names_elsewhere() {
        assert_eq!(sanitize_filename("con.txt").as_deref(), Some("con.txt"));
        assert_eq!(sanitize_filename("LPT1").as_deref(), Some("LPT1"));
    }

    #[test]
    fn test_is_plain_name() {
        assert!(is_plain_name("report_1.pdf"));
        assert!(!is_plain_name("../report.pdf"));
        assert!(!is_plain_name("dir/report.pdf"));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name(""));
    }

    #[test]
    fn test_numbered_candidates() {
        assert_eq!(numbered_candidate("report.pdf", 0), "report.pdf");
        assert_eq!(numbered_candidate("report.pdf", 1), "report_1.pdf");
        assert_eq!(numbered_candidate("archive.tar.gz", 2), "archive.tar_2.gz");
        assert_eq!(numbered_candidate("README", 3), "README_3");
    }
}
