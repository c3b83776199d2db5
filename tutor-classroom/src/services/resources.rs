use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{util::youtube_video_id, PrimaryKey};

use super::{join, read_json, send, Result, ServiceError};

const SERVICE: &str = "resources searcher";
const YOUTUBE_VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const DESCRIPTION_LENGTH: usize = 200;

/// Client for the service that finds study resources for a classroom
#[derive(Clone)]
pub struct ResourceSearcher {
    client: Client,
    base_url: String,
}

/// A resource as returned by the searcher, before enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundResource {
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl ResourceSearcher {
    pub fn new(client: &Client, base_url: &str) -> Self {
        Self {
            client: client.clone(),
            base_url: base_url.to_string(),
        }
    }

    /// Asks the searcher for resources matching the topics of a classroom
    pub async fn query(&self, classroom_id: PrimaryKey) -> Result<Vec<FoundResource>> {
        info!("Querying resources for classroom {}", classroom_id);

        let response = send(
            SERVICE,
            self.client
                .post(join(&self.base_url, "/api/query-resources"))
                .json(&json!({ "classroom_id": classroom_id.to_string() })),
        )
        .await?;

        let payload: Value = read_json(SERVICE, response).await?;

        let resources = payload
            .get("resources")
            .filter(|r| r.is_array())
            .ok_or_else(|| ServiceError::InvalidResponse {
                service: SERVICE,
                reason: "resources is missing or not a list".to_string(),
            })?;

        Vec::<FoundResource>::deserialize(resources).map_err(|e| ServiceError::InvalidResponse {
            service: SERVICE,
            reason: e.to_string(),
        })
    }
}

/// Looks up video details on the YouTube data API
#[derive(Clone)]
pub struct YouTube {
    client: Client,
    api_key: Option<String>,
    api_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetails {
    pub title: String,
    /// The start of the description, always ending in `...`
    pub description: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl YouTube {
    pub fn new(client: &Client, api_key: Option<String>) -> Self {
        Self {
            client: client.clone(),
            api_key,
            api_url: YOUTUBE_VIDEOS_URL.to_string(),
        }
    }

    /// Points the client at another videos endpoint
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    /// Returns details of the video behind a YouTube URL.
    /// Anything that goes wrong is logged and results in `None`.
    pub async fn video_details(&self, url: &str) -> Option<VideoDetails> {
        let api_key = self.api_key.as_deref()?;
        let id = youtube_video_id(url)?;

        match self.fetch(id, api_key).await {
            Ok(details) => details,
            Err(e) => {
                warn!("Could not fetch details of video {}: {}", id, e);
                None
            }
        }
    }

    async fn fetch(&self, id: &str, api_key: &str) -> Result<Option<VideoDetails>> {
        let response = send(
            "youtube",
            self.client
                .get(&self.api_url)
                .query(&[("id", id), ("key", api_key), ("part", "snippet")]),
        )
        .await?;

        let list: VideoList = read_json("youtube", response).await?;

        Ok(list.items.into_iter().next().map(|video| {
            let snippet = video.snippet;
            let thumbnails = snippet.thumbnails;

            VideoDetails {
                title: snippet.title,
                description: truncate_description(&snippet.description),
                thumbnail: thumbnails.medium.or(thumbnails.default).map(|t| t.url),
            }
        }))
    }
}

fn truncate_description(description: &str) -> String {
    let mut truncated: String = description.chars().take(DESCRIPTION_LENGTH).collect();
    truncated.push_str("...");
    truncated
}
