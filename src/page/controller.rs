use super::renderer::{DocumentRenderer, Renderer};
use crate::config::Config;
use crate::feed::{EpisodeExtractor, FeedFetcher, FetchError};

/// Shown in the error region when the feed cannot be loaded.
pub const LOAD_ERROR_MESSAGE: &str =
    "Sorry, we couldn't load episodes right now. Please try again later.";

/// Runs one fetch, extract and render cycle against a page.
pub struct PageController {
    fetcher: FeedFetcher,
    extractor: EpisodeExtractor,
    renderer: Renderer,
}

impl PageController {
    pub fn new(fetcher: FeedFetcher, extractor: EpisodeExtractor, renderer: Renderer) -> Self {
        Self {
            fetcher,
            extractor,
            renderer,
        }
    }

    pub fn from_config(fetcher: FeedFetcher, config: &Config) -> Self {
        Self::new(
            fetcher,
            EpisodeExtractor::from_config(config),
            Renderer::from_config(config),
        )
    }

    /// Loads the feed and renders it into `page`.
    ///
    /// On success the episodes replace the page content and any error message
    /// is hidden. On failure the page's existing content is left as it was,
    /// the error region shows [`LOAD_ERROR_MESSAGE`], and the error is
    /// returned to the caller.
    ///
    /// Returns the number of episodes rendered.
    pub async fn load<D>(&self, page: &mut D) -> Result<usize, FetchError>
    where
        D: DocumentRenderer + ?Sized,
    {
        match self.fetcher.fetch_feed().await {
            Ok(doc) => {
                let episodes = self.extractor.extract(&doc);
                self.renderer.render(&episodes, page);
                page.hide_error();
                tracing::info!(episodes = episodes.len(), "Episodes page updated");
                Ok(episodes.len())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load episodes");
                page.show_error(LOAD_ERROR_MESSAGE);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlPage;
    use crate::storage::{FeedCache, MemoryStore};
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<rss version="2.0"><channel>
        <item><title>One</title></item>
        <item><title>Two</title></item>
    </channel></rss>"#;

    fn controller(server_uri: &str) -> PageController {
        let config = Config {
            feed_url: format!("{server_uri}/rss"),
            ..Config::default()
        };
        let cache = FeedCache::from_config(Arc::new(MemoryStore::new()), &config);
        let fetcher = FeedFetcher::new(reqwest::Client::new(), cache, &config);
        PageController::from_config(fetcher, &config)
    }

    #[tokio::test]
    async fn test_load_success_hides_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .mount(&mock_server)
            .await;

        let mut page = HtmlPage::from_config(&Config::default());
        page.show_error("stale message");

        let count = controller(&mock_server.uri()).load(&mut page).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(page.grid_cards().len(), 2);
        assert_eq!(page.error_message(), None);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_content() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let mut page = HtmlPage::from_config(&Config::default());
        page.append_grid_card("<article>previous</article>".to_string());

        let err = controller(&mock_server.uri())
            .load(&mut page)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(503)));
        assert_eq!(page.grid_cards(), ["<article>previous</article>".to_string()]);
        assert_eq!(page.error_message(), Some(LOAD_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_parse_failure_shows_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss><channel>"))
            .mount(&mock_server)
            .await;

        let mut page = HtmlPage::from_config(&Config::default());
        let err = controller(&mock_server.uri())
            .load(&mut page)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
        assert_eq!(page.error_message(), Some(LOAD_ERROR_MESSAGE));
    }
}
