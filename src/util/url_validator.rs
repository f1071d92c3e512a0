use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string as an absolute http(s) URL.
///
/// Used for the configured feed URL and for media URLs found inside the feed
/// (enclosures, cover images). Rejects relative references and any scheme
/// that a browser would execute or resolve locally (`javascript:`, `data:`,
/// `file:`).
///
/// # Examples
///
/// ```
/// use castpage::util::validate_url;
///
/// let url = validate_url("https://example.com/feed.xml").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_url("javascript:alert(1)").is_err());
/// assert!(validate_url("/relative/path.mp3").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

/// Returns the trimmed input if it is a usable absolute http(s) media URL.
///
/// The original string is kept (not the normalized [`Url`] form) so the
/// rendered `src` matches what the feed published.
pub fn absolute_media_url(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match validate_url(trimmed) {
        Ok(_) => Some(trimmed),
        Err(e) => {
            tracing::debug!(url = %trimmed, error = %e, "Ignoring unusable media URL");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_url("https://example.com/feed.xml").is_ok());
        assert!(validate_url("http://anchor.fm/s/101530384/podcast/rss").is_ok());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(matches!(
            validate_url("javascript:alert(1)"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_relative_rejected() {
        assert!(matches!(
            validate_url("ai-convo-cast-logo.jpg"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_localhost_accepted() {
        // Feeds may be served from a local mirror
        assert!(validate_url("http://127.0.0.1:8080/rss").is_ok());
    }

    #[test]
    fn test_media_url_trimmed() {
        assert_eq!(
            absolute_media_url("  https://cdn.example.com/ep1.mp3\n"),
            Some("https://cdn.example.com/ep1.mp3")
        );
    }

    #[test]
    fn test_media_url_rejects_empty_and_relative() {
        assert_eq!(absolute_media_url(""), None);
        assert_eq!(absolute_media_url("   "), None);
        assert_eq!(absolute_media_url("ep1.mp3"), None);
        assert_eq!(absolute_media_url("data:audio/mpeg;base64,AAAA"), None);
    }
}
