//! Sanity checks for registry, prefix and mirror locations.

use url::Url;

/// Validates a location and returns its sanitized form.
///
/// Locations look like `example.com[:port][/namespace/...]`: a prefix of a
/// fully expanded reference. Trailing slashes are stripped.
pub(crate) fn parse_location(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("cannot be empty");
    }
    if has_scheme(trimmed) {
        return Err("URI schemes are not supported");
    }

    let url = Url::parse(&format!("http://{trimmed}"))
        .map_err(|_| "not a valid host[:port][/path] location")?;
    if !url.username().is_empty() || url.password().is_some() {
        return Err("user/password are not supported");
    }

    Ok(trimmed.to_string())
}

/// Validates a prefix. Wildcard prefixes are classified by the matcher
/// instead of being parsed as URLs.
pub(crate) fn parse_prefix(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim_end_matches('/');
    if trimmed.contains('*') {
        if has_scheme(trimmed) {
            return Err("URI schemes are not supported");
        }
        return Ok(trimmed.to_string());
    }
    parse_location(trimmed)
}

fn has_scheme(input: &str) -> bool {
    input.split_once("://").is_some_and(|(scheme, _)| {
        scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location_valid() {
        for (input, expected) in [
            ("example.com", "example.com"),
            ("example.com/", "example.com"),
            ("example.com//", "example.com"),
            ("example.com:5000", "example.com:5000"),
            ("example.com:5000/ns/repo", "example.com:5000/ns/repo"),
            ("localhost", "localhost"),
            ("[2001:db8::1]:5000", "[2001:db8::1]:5000"),
        ] {
            assert_eq!(parse_location(input).as_deref(), Ok(expected), "{input}");
        }
    }

    #[test]
    fn test_parse_location_invalid() {
        assert_eq!(parse_location(""), Err("cannot be empty"));
        assert_eq!(parse_location("/"), Err("cannot be empty"));
        assert_eq!(
            parse_location("https://example.com"),
            Err("URI schemes are not supported")
        );
        assert_eq!(
            parse_location("docker://example.com/foo"),
            Err("URI schemes are not supported")
        );
        assert_eq!(
            parse_location("user:pass@example.com"),
            Err("user/password are not supported")
        );
    }

    #[test]
    fn test_parse_prefix_keeps_wildcards() {
        assert_eq!(parse_prefix("*.example.com/").as_deref(), Ok("*.example.com"));
        assert_eq!(parse_prefix("*.*.io").as_deref(), Ok("*.*.io"));
        assert!(parse_prefix("http://*.example.com").is_err());
        assert!(parse_prefix("").is_err());
    }
}
