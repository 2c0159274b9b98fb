mod builder;
mod records;

pub use builder::Builder;
pub use records::{Record, RecordSplitter, RECORD_PREFIX};
pub use synctify_model as model;

use futures::stream::{Stream, StreamExt};
use model::StreamEvent;
use reqwest::StatusCode;
use serde::Deserialize;
use std::pin::Pin;
use std::task::{Context, Poll};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("authentication expired ({0})")]
    AuthExpired(StatusCode),
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
}

impl Error {
    pub fn is_auth_expired(&self) -> bool {
        match self {
            Self::AuthExpired(_) => true,
            Self::Http(err) => err.status().map(is_unauthorized).unwrap_or(false),
            _ => false,
        }
    }
}

fn is_unauthorized(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

fn status_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(body) => body.error,
        Err(_) => format!("server responded with {}", status),
    }
}

fn decode(record: &Record) -> Option<StreamEvent> {
    match StreamEvent::parse(record.payload()) {
        Ok(event) => {
            tracing::debug!(kind = %event.kind, "received record");
            Some(event)
        }
        Err(err) => {
            tracing::warn!(%record, "skipping malformed record: {}", err);
            None
        }
    }
}

/// Decodes a chunked body into conversion events.
///
/// Nothing is yielded after a `success` or `error` event, but the body is
/// still read to the end.
pub fn events<'a, S, B, E>(body: S) -> impl Stream<Item = Result<StreamEvent, Error>> + Send + 'a
where
    S: Stream<Item = Result<B, E>> + Send + 'a,
    B: AsRef<[u8]> + Send + 'a,
    E: Into<BoxError> + Send + 'a,
{
    async_stream::stream! {
        futures::pin_mut!(body);
        let mut splitter = RecordSplitter::new();
        let mut finished = false;
        let mut failed = false;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let err: BoxError = err.into();
                    if finished {
                        tracing::debug!("ignoring transport error after terminal event: {}", err);
                    } else {
                        failed = true;
                        yield Err(Error::Transport(err));
                    }
                    break;
                }
            };
            for record in splitter.push(chunk.as_ref()) {
                if finished {
                    tracing::trace!(%record, "discarding record after terminal event");
                    continue;
                }
                if let Some(event) = decode(&record) {
                    finished = event.kind.is_terminal();
                    yield Ok(event);
                }
            }
        }

        if !finished && !failed {
            if let Some(event) = splitter.finish().as_ref().and_then(decode) {
                yield Ok(event);
            }
        }
    }
}

/// The lazy event sequence of one conversion request.
pub struct EventStream {
    inner: Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>,
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").finish()
    }
}

impl EventStream {
    pub fn new<S, B, E>(body: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Self {
            inner: Box::pin(events(body)),
        }
    }

    pub async fn from_response(response: reqwest::Response) -> Result<Self, Error> {
        let status = response.status();
        if is_unauthorized(status) {
            return Err(Error::AuthExpired(status));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status,
                message: status_message(status, &body),
            });
        }
        Ok(Self::new(response.bytes_stream()))
    }
}

impl Stream for EventStream {
    type Item = Result<StreamEvent, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::{events, Builder, Error, EventStream};
    use crate::model::{EventKind, StreamEvent};
    use anyhow::Result;
    use futures::stream::{self, StreamExt};
    use std::convert::Infallible;
    use std::io;
    use std::net::SocketAddr;
    use warp::Filter;

    fn body(chunks: Vec<&'static str>) -> impl futures::Stream<Item = Result<Vec<u8>, io::Error>> {
        stream::iter(chunks.into_iter().map(|c| Ok(c.as_bytes().to_vec())))
    }

    async fn collect(chunks: Vec<&'static str>) -> Vec<Result<StreamEvent, Error>> {
        events(body(chunks)).collect().await
    }

    fn kinds(items: &[Result<StreamEvent, Error>]) -> Vec<String> {
        items
            .iter()
            .map(|item| match item {
                Ok(event) => event.kind.to_string(),
                Err(err) => format!("err: {}", err),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_record_split_across_chunks() {
        let items = collect(vec![
            "data: {\"type\":\"searching\",\"cur",
            "rent\":1,\"total\":3,\"track\":\"A\"}\n",
            "\ndata: {\"type\":\"found\"}\n\n",
        ])
        .await;
        assert_eq!(kinds(&items), vec!["searching", "found"]);
        let first = items[0].as_ref().unwrap();
        assert_eq!(first.current, Some(1));
        assert_eq!(first.track.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_malformed_record_is_skipped() {
        let items = collect(vec![
            "data: {invalid json\n\n",
            "data: {\"type\":\"error\",\"message\":\"boom\"}\n\n",
        ])
        .await;
        assert_eq!(kinds(&items), vec!["error"]);
        assert_eq!(items[0].as_ref().unwrap().message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_nothing_yielded_after_terminal_event() {
        let items = collect(vec![
            "data: {\"type\":\"success\",\"playlist_id\":\"abc\"}\n\n",
            "data: {\"type\":\"found\"}\n\n",
            "data: {\"type\":\"error\",\"message\":\"late\"}",
        ])
        .await;
        assert_eq!(kinds(&items), vec!["success"]);
    }

    #[tokio::test]
    async fn test_transport_error_ends_sequence() {
        let chunks = vec![
            Ok(b"data: {\"type\":\"found\"}\n\n".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"data: {\"type\":\"found\"}\n\n".to_vec()),
        ];
        let items: Vec<_> = events(stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_transport_error_after_terminal_event_is_ignored() {
        let chunks = vec![
            Ok(b"data: {\"type\":\"error\",\"message\":\"boom\"}\n\n".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let items: Vec<_> = events(stream::iter(chunks)).collect().await;
        assert_eq!(kinds(&items), vec!["error"]);
    }

    #[tokio::test]
    async fn test_unterminated_last_record() {
        let items = collect(vec!["data: {\"type\":\"not_found\"}\n\n", "data: {\"type\":\"success\"}"]).await;
        assert_eq!(kinds(&items), vec!["not_found", "success"]);
    }

    #[tokio::test]
    async fn test_one_byte_chunks() {
        let text = "data: {\"type\":\"searching\",\"track\":\"Sigur Rós\"}\n\n: ping\n\ndata: {\"type\":\"heartbeat\"}\n\n";
        let chunks: Vec<Result<Vec<u8>, io::Error>> =
            text.as_bytes().iter().map(|b| Ok(vec![*b])).collect();
        let items: Vec<_> = events(stream::iter(chunks)).collect().await;
        assert_eq!(kinds(&items), vec!["searching", "heartbeat"]);
        assert_eq!(
            items[0].as_ref().unwrap().track.as_deref(),
            Some("Sigur Rós")
        );
        assert_eq!(
            items[1].as_ref().unwrap().kind,
            EventKind::Unknown("heartbeat".to_string())
        );
    }

    macro_rules! serve {
        ($filter:expr) => {{
            let (addr, server) = warp::serve($filter).bind_ephemeral(([127, 0, 0, 1], 0));
            tokio::spawn(server);
            addr
        }};
    }

    #[tokio::test]
    async fn test_reads_server_sent_events() -> Result<()> {
        let route = warp::post().and(warp::path("convert")).map(|| {
            let records = vec![
                r#"{"type":"searching","current":1,"total":2,"track":"A"}"#,
                r#"{"type":"found","current":1}"#,
                r#"{"type":"success","playlist_id":"abc"}"#,
            ];
            let events = stream::iter(
                records
                    .into_iter()
                    .map(|data| Ok::<_, Infallible>(warp::sse::Event::default().data(data))),
            );
            warp::sse::reply(events)
        });
        let addr: SocketAddr = serve!(route);

        let stream = Builder::new()
            .open(format!("http://{}/convert", addr), &serde_json::json!({}))
            .await?;
        let items: Vec<_> = stream.collect().await;
        assert_eq!(kinds(&items), vec!["searching", "found", "success"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_expired() -> Result<()> {
        let route = warp::post().map(|| {
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({"error": "token expired"})),
                warp::http::StatusCode::UNAUTHORIZED,
            )
        });
        let addr: SocketAddr = serve!(route);

        let err = Builder::new()
            .open(format!("http://{}/convert", addr), &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.is_auth_expired());
        assert!(matches!(err, Error::AuthExpired(status) if status.as_u16() == 401));
        Ok(())
    }

    #[tokio::test]
    async fn test_error_status_uses_server_message() -> Result<()> {
        let route = warp::post().map(|| {
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({"error": "Missing YouTube URL"})),
                warp::http::StatusCode::BAD_REQUEST,
            )
        });
        let addr: SocketAddr = serve!(route);

        let err = Builder::new()
            .open(format!("http://{}/convert", addr), &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(!err.is_auth_expired());
        assert_eq!(err.to_string(), "Missing YouTube URL");
        Ok(())
    }

    #[tokio::test]
    async fn test_event_stream_from_chunks() {
        let stream = EventStream::new(body(vec!["data: {\"type\":\"found\"}\n", "\n"]));
        let items: Vec<_> = stream.collect().await;
        assert_eq!(kinds(&items), vec!["found"]);
    }
}
