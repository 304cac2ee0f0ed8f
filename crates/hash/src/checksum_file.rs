//! Parsing of published checksum files

/// Extract the hex digest from the contents of a checksum file
///
/// Accepts a bare digest, the `digest  filename` form written by
/// `sha1sum`/`md5sum`, and the BSD `SHA1 (filename) = digest` form. Returns
/// `None` when the file holds no digest.
#[must_use]
pub fn parse_checksum(contents: &str) -> Option<String> {
    let line = contents.lines().map(str::trim).find(|l| !l.is_empty())?;

    // BSD style: ALG (file) = digest
    if let Some((head, digest)) = line.rsplit_once(" = ") {
        if head.ends_with(')') {
            return non_empty(digest);
        }
    }

    // GNU style: digest  filename, or digest *filename
    let first = line.split_whitespace().next()?;
    non_empty(first)
}

fn non_empty(digest: &str) -> Option<String> {
    let digest = digest.trim();
    if digest.is_empty() {
        None
    } else {
        Some(digest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_digest() {
        assert_eq!(
            parse_checksum("5eb63bbbe01eeed093cb22bb8f5acdc3\n").as_deref(),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
    }

    #[test]
    fn test_gnu_format() {
        assert_eq!(
            parse_checksum("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed  lib-1.0.jar").as_deref(),
            Some("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed")
        );
        assert_eq!(
            parse_checksum("2aae6c35 *lib-1.0.jar").as_deref(),
            Some("2aae6c35")
        );
    }

    #[test]
    fn test_bsd_format() {
        assert_eq!(
            parse_checksum("MD5 (lib-1.0.jar) = 5eb63bbbe01eeed093cb22bb8f5acdc3").as_deref(),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(parse_checksum(""), None);
        assert_eq!(parse_checksum("\n  \n"), None);
    }

    #[test]
    fn test_leading_blank_lines() {
        assert_eq!(parse_checksum("\n\nabc123\n").as_deref(), Some("abc123"));
    }
}
