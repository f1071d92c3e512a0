//! Episode page rendering.
//!
//! [`Renderer`] turns episodes into card markup and writes it through the
//! [`DocumentRenderer`] trait. [`HtmlPage`] is the in-memory implementation
//! used by the CLI, and [`PageController`] drives one load cycle.

mod controller;
mod html;
mod renderer;

pub use controller::{PageController, LOAD_ERROR_MESSAGE};
pub use html::{HtmlPage, PageLayout};
pub use renderer::{DocumentRenderer, MetaTag, Renderer};
