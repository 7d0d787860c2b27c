//! Allowlist validation of the untrusted routing fields.
//!
//! The subdomain, path and query string end up verbatim in an upstream URL
//! that carries an API key, so anything outside these character sets is
//! rejected outright. Nothing is escaped or normalised.

use crate::error::ProxyError;

const SUBDOMAIN_SYMBOLS: &str = "_-.";
const PATH_SYMBOLS: &str = "/_-+";
// TODO: `"` is accepted for compatibility with existing clients; review whether it can be dropped.
const QUERY_SYMBOLS: &str = "/_-+@?&=.:\"";

fn in_charset(s: &str, symbols: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || symbols.contains(c))
}

/// Letters, digits, `_`, `-` and `.`.
pub fn is_valid_subdomain(s: &str) -> bool {
    in_charset(s, SUBDOMAIN_SYMBOLS)
}

/// Letters, digits, `/`, `_`, `-` and `+`.
pub fn is_valid_path(s: &str) -> bool {
    in_charset(s, PATH_SYMBOLS)
}

/// Letters, digits and `/_-+@?&=.:"`.
pub fn is_valid_query(s: &str) -> bool {
    in_charset(s, QUERY_SYMBOLS)
}

pub fn check_subdomain(subdomain: &str) -> Result<(), ProxyError> {
    if subdomain.is_empty() {
        return Err(ProxyError::MissingSubdomain);
    }
    if !is_valid_subdomain(subdomain) {
        return Err(ProxyError::InvalidSubdomain(subdomain.to_string()));
    }
    Ok(())
}

/// The path is checked still percent-encoded, so any escape (`%2B` included)
/// is rejected. Stricter than checking the decoded path, and never lets a
/// decoded `?` or `/` reach the upstream URL.
pub fn check_path(path: &str) -> Result<(), ProxyError> {
    if !is_valid_path(path) {
        return Err(ProxyError::InvalidPath(path.to_string()));
    }
    Ok(())
}

pub fn check_query(query: &str) -> Result<(), ProxyError> {
    if !is_valid_query(query) {
        return Err(ProxyError::InvalidQuery(query.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_charset() {
        let cases = [
            ("my.subdomain", true),
            ("citestcycle-intake", true),
            ("a_b-c.D9", true),
            ("google.com%3Fattack=", false),
            ("google.com?attack=", false),
            ("sub/domain", false),
            ("sub domain", false),
            ("sub:443", false),
            ("süb", false),
        ];
        for (input, expected) in cases {
            assert_eq!(is_valid_subdomain(input), expected, "subdomain {:?}", input);
        }
    }

    #[test]
    fn test_path_charset() {
        let cases = [
            ("/mypath/mysubpath", true),
            ("/api/v2/citestcycle", true),
            ("/a+b_c-d", true),
            ("/", true),
            ("/my%20subpath", false),
            ("/a%2Bb", false),
            ("/my subpath", false),
            ("/../etc", false),
            ("/a?b", false),
            ("/a#b", false),
        ];
        for (input, expected) in cases {
            assert_eq!(is_valid_path(input), expected, "path {:?}", input);
        }
    }

    #[test]
    fn test_query_charset() {
        let cases = [
            ("", true),
            ("arg=test", true),
            ("a=1&b=2", true),
            ("email=a@b.c", true),
            ("time=12:00", true),
            ("q=\"quoted\"", true),
            ("next=/path?x=y", true),
            ("test=bad%20arg", false),
            ("test=bad arg", false),
            ("a=<script>", false),
            ("a=1#frag", false),
        ];
        for (input, expected) in cases {
            assert_eq!(is_valid_query(input), expected, "query {:?}", input);
        }
    }

    #[test]
    fn test_check_subdomain_errors() {
        assert!(matches!(check_subdomain(""), Err(ProxyError::MissingSubdomain)));
        assert!(matches!(
            check_subdomain("bad%"),
            Err(ProxyError::InvalidSubdomain(s)) if s == "bad%"
        ));
        assert!(check_subdomain("my.subdomain").is_ok());
    }

    #[test]
    fn test_check_path_and_query_errors() {
        assert!(matches!(check_path("/a b"), Err(ProxyError::InvalidPath(_))));
        assert!(matches!(check_query("a b"), Err(ProxyError::InvalidQuery(_))));
        assert!(check_path("/ok").is_ok());
        assert!(check_query("ok=1").is_ok());
    }
}
