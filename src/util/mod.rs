//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **URL validation**: absolute http(s) checks for feed and media URLs
//! - **Text processing**: HTML escaping, tag stripping and excerpting
//!
//! # Examples
//!
//! ```
//! use castpage::util::{escape_text, excerpt, validate_url};
//!
//! let url = validate_url("https://example.com/feed.xml").unwrap();
//! assert_eq!(url.scheme(), "https");
//!
//! let safe = escape_text("<b>Bold</b> & loud");
//! assert_eq!(excerpt(&safe, 7), "&lt;b&gt;Bold…");
//! ```

mod text;
mod url_validator;

pub use text::{
    decode_entities, escape_attr, escape_text, excerpt, quote_attr, strip_tags, ELLIPSIS,
};
pub use url_validator::{absolute_media_url, validate_url, UrlValidationError};
