use unicode_segmentation::UnicodeSegmentation;

pub const MAX_FILENAME_LENGTH: usize = 120;

const FORBIDDEN_CHARS: [char; 10] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// Strip characters that are not allowed in file names on common platforms
/// and cap the result at `max_len` graphemes.
///
/// Returns `None` when nothing usable is left.
#[must_use]
pub fn sanitize_file_name(name: &str, max_len: usize) -> Option<String> {
    let trunc = name
        .graphemes(true)
        .filter(|x| !x.chars().all(char::is_control))
        .filter(|x| !x.contains(FORBIDDEN_CHARS))
        .map(|x| if x.chars().all(char::is_whitespace) { "_" } else { x })
        .take(max_len)
        .collect::<String>();

    let trunc = trunc.trim_matches(['.', '_']).to_string();

    if trunc.is_empty() {
        None
    } else {
        Some(trunc)
    }
}

/// Join a sanitised stem with an extension, keeping the whole name within
/// [`MAX_FILENAME_LENGTH`]
#[must_use]
pub fn file_name_with_extension(stem: &str, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    let max_stem = MAX_FILENAME_LENGTH.saturating_sub(extension.len() + 1).max(1);
    let stem = sanitize_file_name(stem, max_stem).unwrap_or_else(|| "media".to_string());

    if extension.is_empty() {
        stem
    } else {
        format!("{stem}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_forbidden_and_control_characters() {
        assert_eq!(
            sanitize_file_name("some/user:na*me\u{7}", 100).as_deref(),
            Some("someusername")
        );
    }

    #[test]
    fn whitespace_becomes_underscore() {
        assert_eq!(
            sanitize_file_name("a b c", 100).as_deref(),
            Some("a_b_c")
        );
    }

    #[test]
    fn truncates_by_grapheme() {
        assert_eq!(sanitize_file_name("ééééé", 3).as_deref(), Some("ééé"));
    }

    #[test]
    fn empty_result_is_none() {
        assert_eq!(sanitize_file_name("///", 10), None);
        assert_eq!(sanitize_file_name("", 10), None);
    }

    #[test]
    fn extension_is_kept_within_limit() {
        let name = file_name_with_extension(&"x".repeat(500), "jpg");

        assert_eq!(name.len(), MAX_FILENAME_LENGTH);
        assert!(name.ends_with(".jpg"));
        assert_eq!(file_name_with_extension("???", ".mp4"), "media.mp4");
    }
}
