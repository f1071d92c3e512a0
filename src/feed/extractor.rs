use chrono::{DateTime, FixedOffset, ParseResult};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::document::{Element, ParsedDocument};
use crate::config::Config;
use crate::util::{absolute_media_url, decode_entities, escape_text, excerpt, strip_tags};

/// Title shown for items without one.
pub const UNTITLED: &str = "Untitled";

/// One podcast episode, normalized for display.
///
/// `title` and `description_html` are already HTML-escaped text; the two URL
/// fields are raw and must be attribute-escaped by whoever interpolates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub title: String,
    /// "Mon D, YYYY", or empty when the feed date is missing or unparseable
    pub published_at: String,
    pub description_html: String,
    /// Absolute http(s) enclosure URL, or empty
    pub audio_url: String,
    /// Cover image URL, or the configured placeholder asset
    pub image_url: String,
}

impl Episode {
    /// Description cut to `limit` characters with an ellipsis appended.
    pub fn excerpt(&self, limit: usize) -> Cow<'_, str> {
        excerpt(&self.description_html, limit)
    }
}

/// Decides whether an image URL is the feed host's generic stock artwork.
#[derive(Clone)]
pub struct PlaceholderMatcher(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl PlaceholderMatcher {
    pub fn new<F>(pred: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(pred))
    }

    /// Matches any URL containing one of `markers`. Empty markers are ignored.
    pub fn from_markers(markers: Vec<String>) -> Self {
        let markers: Vec<String> = markers.into_iter().filter(|m| !m.is_empty()).collect();
        Self::new(move |url| markers.iter().any(|m| url.contains(m.as_str())))
    }

    pub fn matches(&self, url: &str) -> bool {
        (self.0)(url)
    }
}

impl Default for PlaceholderMatcher {
    fn default() -> Self {
        Self::from_markers(vec!["placeholder".to_string()])
    }
}

impl fmt::Debug for PlaceholderMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlaceholderMatcher(..)")
    }
}

/// Maps `<item>` elements to [`Episode`] records.
///
/// Extraction never fails: every field has a default that a missing or
/// malformed value degrades to.
#[derive(Debug, Clone)]
pub struct EpisodeExtractor {
    placeholder_image: String,
    placeholder: PlaceholderMatcher,
}

impl EpisodeExtractor {
    pub fn new(placeholder_image: impl Into<String>, placeholder: PlaceholderMatcher) -> Self {
        Self {
            placeholder_image: placeholder_image.into(),
            placeholder,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.placeholder_image.clone(),
            PlaceholderMatcher::from_markers(config.placeholder_markers.clone()),
        )
    }

    /// One episode per item, in document order.
    pub fn extract(&self, doc: &ParsedDocument) -> Vec<Episode> {
        doc.items()
            .into_iter()
            .map(|item| self.extract_item(item))
            .collect()
    }

    fn extract_item(&self, item: &Element) -> Episode {
        let title = child_text(item, "title")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let published_at = child_text(item, "pubDate")
            .map(|d| format_pub_date(&d))
            .unwrap_or_default();

        let description_html = child_text(item, "description")
            .map(|raw| sanitize_description(&raw))
            .unwrap_or_default();

        let audio_url = item
            .find("enclosure")
            .and_then(|enc| enc.attr("url"))
            .and_then(absolute_media_url)
            .unwrap_or_default()
            .to_string();

        let image_url = self.image_url(item);

        Episode {
            title: escape_text(&title).into_owned(),
            published_at,
            description_html,
            audio_url,
            image_url,
        }
    }

    /// First item-level image (`<itunes:image href>`, `<image href>` or
    /// `<image>url</image>`), unless missing, unusable, or a placeholder.
    fn image_url(&self, item: &Element) -> String {
        let discovered = item
            .find_descendant(|el| el.local_name() == "image")
            .map(|img| match img.attr("href") {
                Some(href) if !href.trim().is_empty() => href.to_string(),
                _ => img.text_content(),
            });

        match discovered.as_deref().and_then(absolute_media_url) {
            Some(url) if !self.placeholder.matches(url) => url.to_string(),
            Some(url) => {
                tracing::debug!(url = %url, "Feed image is a placeholder, using local logo");
                self.placeholder_image.clone()
            }
            None => self.placeholder_image.clone(),
        }
    }
}

fn child_text(item: &Element, name: &str) -> Option<String> {
    item.find(name).map(Element::text_content)
}

/// Tags stripped, entities decoded, then re-escaped for display.
fn sanitize_description(raw: &str) -> String {
    let stripped = strip_tags(raw);
    let decoded = decode_entities(&stripped);
    escape_text(decoded.trim()).into_owned()
}

/// Formats an RFC 2822 (or RFC 3339) date as "Mon D, YYYY" in the feed's own offset.
///
/// A weekday that disagrees with the date is ignored. Returns an empty string
/// for anything unparseable.
pub fn format_pub_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    match parse_feed_date(raw) {
        Ok(dt) => dt.format("%b %-d, %Y").to_string(),
        Err(e) => {
            tracing::debug!(date = %raw, error = %e, "Unparseable pubDate, leaving blank");
            String::new()
        }
    }
}

fn parse_feed_date(raw: &str) -> ParseResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|e| match strip_weekday(raw) {
            Some(rest) => DateTime::parse_from_rfc2822(rest),
            None => Err(e),
        })
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
}

/// `"Fri, 02 Oct 2024 ..."` -> `"02 Oct 2024 ..."`. The weekday is optional in RFC 2822.
fn strip_weekday(raw: &str) -> Option<&str> {
    let (day, rest) = raw.split_once(',')?;
    let day = day.trim();
    (day.len() == 3 && day.chars().all(|c| c.is_ascii_alphabetic())).then(|| rest.trim_start())
}
