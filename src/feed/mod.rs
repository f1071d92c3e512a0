//! Feed acquisition and episode extraction.
//!
//! - [`fetcher`] - HTTP retrieval behind the single-slot [`FeedCache`](crate::storage::FeedCache)
//! - [`document`] - quick-xml based parsing of the RSS body into an element tree
//! - [`extractor`] - mapping `<item>` elements to display-ready [`Episode`] records
//!
//! # Example
//!
//! ```ignore
//! use castpage::feed::{EpisodeExtractor, FeedFetcher};
//!
//! let doc = fetcher.fetch_feed().await?;
//! let episodes = EpisodeExtractor::from_config(&config).extract(&doc);
//! ```

mod document;
mod extractor;
mod fetcher;

pub use document::{parse_document, DocumentError, Element, Node, ParsedDocument};
pub use extractor::{format_pub_date, Episode, EpisodeExtractor, PlaceholderMatcher, UNTITLED};
pub use fetcher::{FeedFetcher, FetchError, FetchResult};
