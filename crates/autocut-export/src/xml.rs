//! Small shared helpers for hand-built XML documents.

use std::path::Path;

/// Escape special XML characters.
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Render a path as a `file://localhost` URI the target editors accept.
pub(crate) fn file_uri(path: &Path) -> String {
    let joined = path
        .components()
        .filter_map(|c| match c {
            std::path::Component::RootDir => None,
            other => Some(other.as_os_str().to_string_lossy().into_owned()),
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("file://localhost/{}", joined.replace(' ', "%20"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<clip>"), "&lt;clip&gt;");
        assert_eq!(escape_xml("it's \"fine\""), "it&apos;s &quot;fine&quot;");
    }

    #[test]
    fn test_file_uri() {
        let path = PathBuf::from("/uploads/My Talk.mp4");
        assert_eq!(file_uri(&path), "file://localhost/uploads/My%20Talk.mp4");
    }
}
