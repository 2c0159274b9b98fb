use super::{Error, EventStream};
use http::header::{HeaderValue, ACCEPT};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Builder {
    client: Arc<reqwest::Client>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            client: Arc::new(reqwest::Client::new()),
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `body` as JSON and returns the events of the streamed response.
    pub async fn open<T>(&self, url: impl reqwest::IntoUrl, body: &T) -> Result<EventStream, Error>
    where
        T: Serialize + ?Sized,
    {
        let url = url.into_url()?;
        tracing::info!(%url, "opening event stream");
        let response = self
            .client
            .post(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(body)
            .send()
            .await?;
        EventStream::from_response(response).await
    }
}
