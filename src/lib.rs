//! castpage: podcast episode page generator.
//!
//! Fetches the show's RSS feed (through a single-slot local cache), turns each
//! item into an [`feed::Episode`], and renders the episodes into an HTML page
//! with a highlighted latest episode. A small HTTP service exposes the
//! workflow trigger used to produce new episodes.

pub mod config;
pub mod feed;
pub mod page;
pub mod storage;
pub mod trigger;
pub mod util;
