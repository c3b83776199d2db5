use std::collections::VecDeque;

use futures_util::{
    stream::{self, BoxStream},
    Stream, StreamExt,
};
use reqwest::Client;
use serde::Serialize;

use super::{send, Result, ServiceError};

const SERVICE: &str = "rag";

/// Client for the retrieval augmented question answering service
#[derive(Clone)]
pub struct RagService {
    client: Client,
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RagQuery<'a> {
    question: &'a str,
    chapter_id: &'a str,
}

impl RagService {
    pub fn new(client: &Client, url: &str) -> Self {
        Self {
            client: client.clone(),
            url: url.to_string(),
        }
    }

    /// Asks a question about a chapter, returning the `data:` payloads of the
    /// streamed answer as they arrive
    pub async fn query(
        &self,
        question: &str,
        chapter_id: &str,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let response = send(
            SERVICE,
            self.client.post(&self.url).json(&RagQuery {
                question,
                chapter_id,
            }),
        )
        .await?;

        Ok(events(response.bytes_stream().boxed()).boxed())
    }
}

/// Splits a byte stream into event payloads
fn events<S, B>(body: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = reqwest::Result<B>> + Unpin + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    struct State<S> {
        body: S,
        parser: EventParser,
        pending: VecDeque<String>,
        done: bool,
    }

    let state = State {
        body,
        parser: EventParser::default(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }

            if state.done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.pending.extend(state.parser.push(chunk.as_ref())),
                Some(Err(source)) => {
                    state.done = true;
                    let error = ServiceError::Request {
                        service: SERVICE,
                        source,
                    };

                    return Some((Err(error), state));
                }
                None => {
                    state.done = true;
                    state.pending.extend(state.parser.finish());
                }
            }
        }
    })
}

/// Incremental parser for server sent events.
///
/// Network chunks can end anywhere, even inside a multi byte character, so
/// bytes are buffered until a blank line closes the event.
#[derive(Debug, Default)]
pub struct EventParser {
    buffer: Vec<u8>,
}

impl EventParser {
    /// Feeds a chunk and returns the payloads of every event it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().filter(|b| **b != b'\r'));

        let mut events = vec![];

        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();

            if let Some(data) = event_data(&raw[..end]) {
                events.push(data);
            }
        }

        events
    }

    /// Returns the last event if the stream ended without closing it
    pub fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        event_data(&raw)
    }
}

/// Joins the `data:` lines of one event, ignoring comments and other fields
fn event_data(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);

    let lines: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        return None;
    }

    Some(lines.join("\n"))
}
