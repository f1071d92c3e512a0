use crate::config::Config;
use crate::feed::Episode;
use crate::util::{escape_attr, quote_attr};

/// Social preview tags rewritten to the latest episode's cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaTag {
    /// `<meta property="og:image">`
    OgImage,
    /// `<meta name="twitter:image">`
    TwitterImage,
}

impl MetaTag {
    pub const ALL: [MetaTag; 2] = [MetaTag::OgImage, MetaTag::TwitterImage];

    /// `(attribute, value)` identifying the tag in markup.
    pub fn selector(self) -> (&'static str, &'static str) {
        match self {
            MetaTag::OgImage => ("property", "og:image"),
            MetaTag::TwitterImage => ("name", "twitter:image"),
        }
    }
}

/// The page surface the renderer and controller write to.
///
/// Only the grid is mandatory; the highlight slot, error region and meta tags
/// may be absent, in which case writes to them are no-ops.
pub trait DocumentRenderer {
    /// Remove every card from the episodes grid.
    fn clear_grid(&mut self);

    /// Append one card's markup to the grid.
    fn append_grid_card(&mut self, markup: String);

    /// Whether the page has a latest-episode slot.
    fn has_highlight(&self) -> bool;

    /// Replace the latest-episode slot's contents (empty string clears it).
    fn set_highlight(&mut self, markup: String);

    /// Set a meta tag's `content`. Returns false if the page has no such tag.
    fn set_meta_content(&mut self, tag: MetaTag, content: &str) -> bool;

    /// Put `message` in the error region and make it visible.
    fn show_error(&mut self, message: &str);

    /// Hide the error region.
    fn hide_error(&mut self);
}

/// Writes episode cards into a [`DocumentRenderer`].
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    grid_excerpt: usize,
    highlight_excerpt: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(100, 180)
    }
}

impl Renderer {
    pub fn new(grid_excerpt: usize, highlight_excerpt: usize) -> Self {
        Self {
            grid_excerpt,
            highlight_excerpt,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.grid_excerpt_chars, config.highlight_excerpt_chars)
    }

    /// Replaces the page's episode content with `episodes`.
    ///
    /// The first episode also fills the highlight slot and the social preview
    /// tags when the page has them. An empty slice leaves both regions empty.
    pub fn render<D>(&self, episodes: &[Episode], page: &mut D)
    where
        D: DocumentRenderer + ?Sized,
    {
        page.clear_grid();
        let has_highlight = page.has_highlight();
        if has_highlight {
            page.set_highlight(String::new());
        }

        if let (Some(latest), true) = (episodes.first(), has_highlight) {
            for tag in MetaTag::ALL {
                if !page.set_meta_content(tag, &latest.image_url) {
                    tracing::trace!(?tag, "Page has no meta tag, skipping");
                }
            }
            page.set_highlight(self.highlight_card(latest));
        }

        for episode in episodes {
            page.append_grid_card(self.grid_card(episode));
        }

        tracing::debug!(episodes = episodes.len(), "Rendered episodes");
    }

    fn highlight_card(&self, episode: &Episode) -> String {
        let title_attr = quote_attr(&episode.title);
        format!(
            r#"<article class="episode-card latest-episode" aria-label="Latest episode">
  <img src="{src}" alt="Cover for latest episode: {title_attr}" class="episode-thumb" width="300" height="300" loading="lazy">
  <div class="episode-title">{title}</div>
  <div class="episode-date">{date}</div>
  <div class="episode-desc">{desc}</div>
  {audio}
</article>"#,
            src = escape_attr(&episode.image_url),
            title = episode.title,
            date = episode.published_at,
            desc = episode.excerpt(self.highlight_excerpt),
            audio = audio_player(
                &episode.audio_url,
                &format!("Audio player for latest episode: {title_attr}")
            ),
        )
    }

    fn grid_card(&self, episode: &Episode) -> String {
        let title_attr = quote_attr(&episode.title);
        format!(
            r#"<article class="episode-card" aria-label="Episode: {title_attr}">
  <img src="{src}" alt="Episode cover for {title_attr}" class="episode-thumb" width="300" height="300" loading="lazy">
  <div class="episode-title">{title}</div>
  <div class="episode-date">{date}</div>
  <div class="episode-desc">{desc}</div>
  {audio}
</article>"#,
            src = escape_attr(&episode.image_url),
            title = episode.title,
            date = episode.published_at,
            desc = episode.excerpt(self.grid_excerpt),
            audio = audio_player(
                &episode.audio_url,
                &format!("Audio player for {title_attr}")
            ),
        )
    }
}

/// `label` must already be attribute-safe.
fn audio_player(audio_url: &str, label: &str) -> String {
    format!(
        r#"<audio class="episode-audio" controls preload="none" aria-label="{label}">
    <source src="{src}" type="audio/mpeg">
    Your browser does not support the audio element.
  </audio>"#,
        src = escape_attr(audio_url),
    )
}
