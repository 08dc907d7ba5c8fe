use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use lumen_core::errors::GatewayError;
use lumen_core::provider::{ImageHit, SearchProvider, WebHit};

/// What a scripted search call yields.
#[derive(Clone, Debug)]
pub enum ScriptedResult<T> {
    Hits(Vec<T>),
    Error(GatewayError),
    Delay(Duration, Box<ScriptedResult<T>>),
}

impl<T> ScriptedResult<T> {
    pub fn delayed(delay: Duration, inner: ScriptedResult<T>) -> Self {
        Self::Delay(delay, Box::new(inner))
    }

    async fn resolve(self) -> Result<Vec<T>, GatewayError> {
        let mut current = self;
        loop {
            match current {
                Self::Hits(hits) => return Ok(hits),
                Self::Error(e) => return Err(e),
                Self::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    current = *inner;
                }
            }
        }
    }
}

type Script<T> = Box<dyn Fn(&str, usize) -> ScriptedResult<T> + Send + Sync>;

/// Search provider driven by per-call closures. Text and image lookups are
/// scripted independently so tests can fail one and not the other.
pub struct MockSearchProvider {
    text: Script<WebHit>,
    images: Script<ImageHit>,
    text_calls: AtomicUsize,
    image_calls: AtomicUsize,
    text_queries: Mutex<Vec<String>>,
}

impl Default for MockSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchProvider {
    /// Both lookups succeed with no hits.
    pub fn new() -> Self {
        Self {
            text: Box::new(|_, _| ScriptedResult::Hits(Vec::new())),
            images: Box::new(|_, _| ScriptedResult::Hits(Vec::new())),
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            text_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_text(
        mut self,
        script: impl Fn(&str, usize) -> ScriptedResult<WebHit> + Send + Sync + 'static,
    ) -> Self {
        self.text = Box::new(script);
        self
    }

    pub fn with_images(
        mut self,
        script: impl Fn(&str, usize) -> ScriptedResult<ImageHit> + Send + Sync + 'static,
    ) -> Self {
        self.images = Box::new(script);
        self
    }

    /// Always return these web hits.
    pub fn with_web_hits(self, hits: Vec<WebHit>) -> Self {
        self.with_text(move |_, _| ScriptedResult::Hits(hits.clone()))
    }

    /// Always return these image hits.
    pub fn with_image_hits(self, hits: Vec<ImageHit>) -> Self {
        self.with_images(move |_, _| ScriptedResult::Hits(hits.clone()))
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::Relaxed)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::Relaxed)
    }

    /// Query strings seen by `text_search`, in arrival order.
    pub fn text_queries(&self) -> Vec<String> {
        self.text_queries.lock().clone()
    }
}

/// Convenience constructor for a web hit in tests.
pub fn web_hit(title: &str, url: &str, snippet: &str) -> WebHit {
    WebHit {
        title: title.to_string(),
        url: Some(url.to_string()),
        snippet: snippet.to_string(),
        score: None,
    }
}

/// Convenience constructor for an image hit in tests.
pub fn image_hit(url: &str) -> ImageHit {
    ImageHit {
        title: None,
        url: url.to_string(),
        thumbnail: None,
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn text_search(&self, query: &str, bound: usize) -> Result<Vec<WebHit>, GatewayError> {
        let _ = self.text_calls.fetch_add(1, Ordering::Relaxed);
        self.text_queries.lock().push(query.to_string());
        let scripted = (self.text)(query, bound);
        let mut hits = scripted.resolve().await?;
        hits.truncate(bound);
        Ok(hits)
    }

    async fn image_search(
        &self,
        query: &str,
        bound: usize,
    ) -> Result<Vec<ImageHit>, GatewayError> {
        let _ = self.image_calls.fetch_add(1, Ordering::Relaxed);
        let scripted = (self.images)(query, bound);
        let mut hits = scripted.resolve().await?;
        hits.truncate(bound);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_are_empty_successes() {
        let mock = MockSearchProvider::new();
        assert!(mock.text_search("q", 5).await.unwrap().is_empty());
        assert!(mock.image_search("q", 5).await.unwrap().is_empty());
        assert_eq!(mock.text_calls(), 1);
        assert_eq!(mock.image_calls(), 1);
    }

    #[tokio::test]
    async fn hits_respect_bound() {
        let mock = MockSearchProvider::new().with_web_hits(vec![
            web_hit("a", "https://a", "1"),
            web_hit("b", "https://b", "2"),
            web_hit("c", "https://c", "3"),
        ]);
        assert_eq!(mock.text_search("q", 2).await.unwrap().len(), 2);
        assert_eq!(mock.text_queries(), vec!["q".to_string()]);
    }

    #[tokio::test]
    async fn text_and_images_scripted_independently() {
        let mock = MockSearchProvider::new()
            .with_text(|_, _| ScriptedResult::Error(GatewayError::NetworkError("down".into())))
            .with_image_hits(vec![image_hit("https://img/1.jpg")]);
        assert!(mock.text_search("q", 5).await.is_err());
        assert_eq!(mock.image_search("q", 5).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_then_hits() {
        let mock = MockSearchProvider::new().with_text(|_, _| {
            ScriptedResult::delayed(
                Duration::from_millis(50),
                ScriptedResult::Hits(vec![web_hit("a", "https://a", "1")]),
            )
        });
        let start = tokio::time::Instant::now();
        let hits = mock.text_search("q", 5).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(hits.len(), 1);
    }
}
