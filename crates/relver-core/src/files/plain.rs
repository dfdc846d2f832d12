//! Whole-file versions (`VERSION`, `version.txt`).

pub(super) fn extract(contents: &str) -> Option<String> {
    let trimmed = contents.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// The file becomes exactly the new version, keeping the trailing line
/// ending if there was one.
pub(super) fn apply(contents: &str, next: &str) -> String {
    if contents.ends_with("\r\n") {
        format!("{next}\r\n")
    } else if contents.ends_with('\n') {
        format!("{next}\n")
    } else {
        next.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_trims_whitespace() {
        assert_eq!(extract("  1.2.3\n").as_deref(), Some("1.2.3"));
        assert_eq!(extract("\n"), None);
    }

    #[test]
    fn apply_replaces_whole_file() {
        assert_eq!(apply("1.2.3\n", "1.3.0"), "1.3.0\n");
        assert_eq!(apply("1.2.3", "1.3.0"), "1.3.0");
    }

    #[test]
    fn apply_keeps_crlf() {
        assert_eq!(apply("1.0.0\r\n", "1.1.0"), "1.1.0\r\n");
    }
}
