use super::renderer::{DocumentRenderer, MetaTag};
use crate::config::Config;
use crate::util::{escape_attr, escape_text};

/// Which optional regions a page carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub highlight: bool,
    pub error_region: bool,
    pub og_image: bool,
    pub twitter_image: bool,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            highlight: true,
            error_region: true,
            og_image: true,
            twitter_image: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ErrorRegion {
    message: String,
    visible: bool,
}

/// In-memory episodes page, serialized with [`HtmlPage::to_html`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlPage {
    title: String,
    grid: Vec<String>,
    /// `None` when the page has no highlight slot
    highlight: Option<String>,
    og_image: Option<String>,
    twitter_image: Option<String>,
    error: Option<ErrorRegion>,
}

impl HtmlPage {
    /// Empty page. Present meta tags start out pointing at `default_image`.
    pub fn new(title: impl Into<String>, default_image: &str, layout: PageLayout) -> Self {
        Self {
            title: title.into(),
            grid: Vec::new(),
            highlight: layout.highlight.then(String::new),
            og_image: layout.og_image.then(|| default_image.to_string()),
            twitter_image: layout.twitter_image.then(|| default_image.to_string()),
            error: layout.error_region.then(ErrorRegion::default),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.page_title.clone(),
            &config.placeholder_image,
            PageLayout::default(),
        )
    }

    pub fn grid_cards(&self) -> &[String] {
        &self.grid
    }

    pub fn highlight(&self) -> Option<&str> {
        self.highlight.as_deref()
    }

    pub fn meta_content(&self, tag: MetaTag) -> Option<&str> {
        match tag {
            MetaTag::OgImage => self.og_image.as_deref(),
            MetaTag::TwitterImage => self.twitter_image.as_deref(),
        }
    }

    /// The visible error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .filter(|e| e.visible)
            .map(|e| e.message.as_str())
    }

    /// Serializes the page as a standalone HTML document.
    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(4096 + self.grid.iter().map(String::len).sum::<usize>());
        let title = escape_text(&self.title);

        out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        out.push_str("  <meta charset=\"utf-8\">\n");
        out.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        out.push_str(&format!("  <title>{title}</title>\n"));
        for tag in MetaTag::ALL {
            if let Some(content) = self.meta_content(tag) {
                let (attr, value) = tag.selector();
                out.push_str(&format!(
                    "  <meta {attr}=\"{value}\" content=\"{}\">\n",
                    escape_attr(content)
                ));
            }
        }
        out.push_str(STYLE);
        out.push_str("</head>\n<body>\n");
        out.push_str(&format!("  <h1>{title}</h1>\n"));

        if let Some(highlight) = &self.highlight {
            out.push_str("  <section id=\"latest-episode-highlight\">\n");
            push_block(&mut out, highlight);
            out.push_str("  </section>\n");
        }

        if let Some(error) = &self.error {
            let hidden = if error.visible { "" } else { " hidden" };
            out.push_str(&format!(
                "  <div id=\"episodes-error\" class=\"episodes-error\" role=\"alert\"{hidden}>{}</div>\n",
                escape_text(&error.message)
            ));
        }

        out.push_str("  <section id=\"episodes-grid\" class=\"episodes-grid\">\n");
        for card in &self.grid {
            push_block(&mut out, card);
        }
        out.push_str("  </section>\n</body>\n</html>\n");
        out
    }
}

fn push_block(out: &mut String, markup: &str) {
    for line in markup.lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
}

const STYLE: &str = "  <style>
    body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 72rem; padding: 1rem; }
    .episodes-grid { display: grid; gap: 1.5rem; grid-template-columns: repeat(auto-fill, minmax(300px, 1fr)); }
    .episode-card { display: flex; flex-direction: column; gap: .5rem; }
    .episode-thumb { width: 100%; height: auto; border-radius: 8px; }
    .episode-title { font-weight: 600; }
    .episode-date { color: #666; font-size: .875rem; }
    .latest-episode { margin-bottom: 2rem; }
    .episodes-error { color: #b00020; }
  </style>
";

impl DocumentRenderer for HtmlPage {
    fn clear_grid(&mut self) {
        self.grid.clear();
    }

    fn append_grid_card(&mut self, markup: String) {
        self.grid.push(markup);
    }

    fn has_highlight(&self) -> bool {
        self.highlight.is_some()
    }

    fn set_highlight(&mut self, markup: String) {
        if let Some(slot) = self.highlight.as_mut() {
            *slot = markup;
        }
    }

    fn set_meta_content(&mut self, tag: MetaTag, content: &str) -> bool {
        let slot = match tag {
            MetaTag::OgImage => &mut self.og_image,
            MetaTag::TwitterImage => &mut self.twitter_image,
        };
        match slot {
            Some(current) => {
                *current = content.to_string();
                true
            }
            None => false,
        }
    }

    fn show_error(&mut self, message: &str) {
        if let Some(error) = self.error.as_mut() {
            error.message = message.to_string();
            error.visible = true;
        }
    }

    fn hide_error(&mut self) {
        if let Some(error) = self.error.as_mut() {
            error.visible = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_regions() {
        let page = HtmlPage::new("Show", "logo.jpg", PageLayout::default());
        assert!(page.grid_cards().is_empty());
        assert_eq!(page.highlight(), Some(""));
        assert_eq!(page.meta_content(MetaTag::TwitterImage), Some("logo.jpg"));
        assert_eq!(page.error_message(), None);
    }

    #[test]
    fn test_error_show_hide() {
        let mut page = HtmlPage::new("Show", "logo.jpg", PageLayout::default());
        page.show_error("boom");
        assert_eq!(page.error_message(), Some("boom"));
        assert!(page.to_html().contains(r#"role="alert">boom</div>"#));

        page.hide_error();
        assert_eq!(page.error_message(), None);
        assert!(page.to_html().contains(r#"role="alert" hidden>boom</div>"#));
    }

    #[test]
    fn test_absent_error_region_is_noop() {
        let layout = PageLayout {
            error_region: false,
            ..PageLayout::default()
        };
        let mut page = HtmlPage::new("Show", "logo.jpg", layout);
        page.show_error("boom");
        assert_eq!(page.error_message(), None);
        assert!(!page.to_html().contains("episodes-error"));
    }

    #[test]
    fn test_to_html_regions() {
        let mut page = HtmlPage::new("Show & Tell", "logo.jpg", PageLayout::default());
        page.append_grid_card("<article>a</article>".to_string());
        page.set_highlight("<article>h</article>".to_string());
        page.set_meta_content(MetaTag::OgImage, "https://cdn.example.com/a.jpg?x=1&y=2");

        let html = page.to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Show &amp; Tell</title>"));
        assert!(html.contains(
            r#"<meta property="og:image" content="https://cdn.example.com/a.jpg?x=1&amp;y=2">"#
        ));
        assert!(html.contains(r#"<meta name="twitter:image" content="logo.jpg">"#));
        assert!(html.contains("id=\"latest-episode-highlight\""));
        assert!(html.contains("    <article>h</article>"));
        assert!(html.contains("    <article>a</article>"));

        let highlight_at = html.find("latest-episode-highlight").unwrap();
        let grid_at = html.find("id=\"episodes-grid\"").unwrap();
        assert!(highlight_at < grid_at);
    }

    #[test]
    fn test_layout_without_highlight() {
        let layout = PageLayout {
            highlight: false,
            ..PageLayout::default()
        };
        let mut page = HtmlPage::new("Show", "logo.jpg", layout);
        assert!(!page.has_highlight());
        page.set_highlight("<article>h</article>".to_string());
        assert_eq!(page.highlight(), None);
        assert!(!page.to_html().contains("latest-episode-highlight"));
    }
}
