//! YouTube Data API v3 client.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use super::convert::{to_remote_channel, to_remote_record};
use super::error::YouTubeError;
use super::types::{ChannelItem, ListResponse, PlaylistItem, VideoItem};
use crate::catalog::{
    self, ApiRateLimiter, CatalogError, MAX_IDS_PER_CALL, PlaylistPage, RemoteCatalog,
    RemoteChannel, RemoteRecord,
};
use crate::http::reqwest_transport::{DEFAULT_TIMEOUT, ReqwestTransport};
use crate::http::{HttpRequest, HttpTransport};
use crate::retry::retry_catalog;

/// Default API base URL.
pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

const CHANNEL_PARTS: &str = "contentDetails,id,snippet";
const PLAYLIST_PARTS: &str = "contentDetails";
const VIDEO_PARTS: &str = "contentDetails,liveStreamingDetails,snippet";

/// API-key authenticated client for the read-only endpoints the engine uses.
#[derive(Clone)]
pub struct YouTubeClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: String,
    rate_limiter: Option<ApiRateLimiter>,
}

impl YouTubeClient {
    /// Create a client against the public API with a 30s request timeout.
    pub fn new(api_key: &str, rate_limiter: Option<ApiRateLimiter>) -> Result<Self, YouTubeError> {
        if api_key.trim().is_empty() {
            return Err(YouTubeError::Config("YouTube API key is empty".to_string()));
        }
        let transport = ReqwestTransport::with_timeout(DEFAULT_TIMEOUT)
            .map_err(|e| YouTubeError::Config(e.to_string()))?;
        Ok(Self::new_with_transport(
            YOUTUBE_API_BASE,
            api_key,
            rate_limiter,
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        base_url: &str,
        api_key: &str,
        rate_limiter: Option<ApiRateLimiter>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            rate_limiter,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }
    }

    /// Full request URL for `resource` with `params` and the API key appended.
    pub(crate) fn endpoint(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<String, YouTubeError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, resource))
            .map_err(|e| YouTubeError::Config(format!("invalid base URL: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", &self.api_key);
        Ok(url.into())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<T, YouTubeError> {
        self.wait_for_rate_limit().await;
        let url = self.endpoint(resource, params)?;
        let request = HttpRequest::get(url).with_header("Accept", "application/json");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| YouTubeError::Http(e.to_string()))?;

        if !response.is_success() {
            return Err(YouTubeError::from_response(response.status, &response.body));
        }

        serde_json::from_slice(&response.body).map_err(YouTubeError::Json)
    }

    /// GET with transient-failure retry, mapped into catalog errors.
    async fn get_with_retry<T: DeserializeOwned + Send>(
        &self,
        resource: &'static str,
        params: &[(&str, &str)],
    ) -> catalog::Result<T> {
        retry_catalog(resource, None, move || async move {
            self.get::<T>(resource, params)
                .await
                .map_err(CatalogError::from)
        })
        .await
    }
}

fn check_batch_size(ids: &[String]) -> catalog::Result<()> {
    if ids.len() > MAX_IDS_PER_CALL {
        return Err(CatalogError::api(format!(
            "at most {MAX_IDS_PER_CALL} ids per request, got {}",
            ids.len()
        )));
    }
    Ok(())
}

#[async_trait]
impl RemoteCatalog for YouTubeClient {
    async fn fetch_channels(&self, ids: &[String]) -> catalog::Result<Vec<RemoteChannel>> {
        check_batch_size(ids)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let max_results = ids.len().to_string();
        let response: ListResponse<ChannelItem> = self
            .get_with_retry(
                "channels",
                &[
                    ("part", CHANNEL_PARTS),
                    ("id", joined.as_str()),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(to_remote_channel)
            .collect())
    }

    async fn fetch_playlist_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> catalog::Result<PlaylistPage> {
        let max_results = max_results.clamp(1, MAX_IDS_PER_CALL as u32).to_string();
        let mut params = vec![
            ("part", PLAYLIST_PARTS),
            ("playlistId", playlist_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response: ListResponse<PlaylistItem> =
            self.get_with_retry("playlistItems", &params).await?;

        let video_ids = response
            .items
            .into_iter()
            .filter_map(|item| item.content_details.and_then(|c| c.video_id))
            .filter(|id| !id.is_empty())
            .collect();

        Ok(PlaylistPage {
            video_ids,
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn fetch_video_batch(&self, ids: &[String]) -> catalog::Result<Vec<RemoteRecord>> {
        check_batch_size(ids)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let max_results = ids.len().to_string();
        let response: ListResponse<VideoItem> = self
            .get_with_retry(
                "videos",
                &[
                    ("part", VIDEO_PARTS),
                    ("id", joined.as_str()),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(to_remote_record)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport, response};

    const BASE: &str = "https://yt.test/youtube/v3";

    fn client(transport: &MockTransport) -> YouTubeClient {
        YouTubeClient::new_with_transport(BASE, "k", None, Arc::new(transport.clone()))
    }

    #[test]
    fn endpoint_encodes_params_and_appends_key() {
        let transport = MockTransport::new();
        let url = client(&transport)
            .endpoint("videos", &[("part", VIDEO_PARTS), ("id", "v1,v2")])
            .unwrap();
        assert_eq!(
            url,
            "https://yt.test/youtube/v3/videos?part=contentDetails%2CliveStreamingDetails%2Csnippet&id=v1%2Cv2&key=k"
        );
    }

    #[test]
    fn new_rejects_empty_api_key() {
        assert!(matches!(
            YouTubeClient::new("  ", None),
            Err(YouTubeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn fetch_playlist_page_passes_token_and_size() {
        let transport = MockTransport::new();
        let yt = client(&transport);
        let url = yt
            .endpoint(
                "playlistItems",
                &[
                    ("part", PLAYLIST_PARTS),
                    ("playlistId", "UU1"),
                    ("maxResults", "50"),
                    ("pageToken", "CAUQAA"),
                ],
            )
            .unwrap();
        transport.push_response(
            HttpMethod::Get,
            url,
            response(
                200,
                &[],
                br#"{"items": [
                    {"contentDetails": {"videoId": "a"}},
                    {"contentDetails": {}},
                    {"contentDetails": {"videoId": "b"}}
                ], "nextPageToken": "CAoQAA"}"#,
            ),
        );

        let page = yt
            .fetch_playlist_page("UU1", Some("CAUQAA"), 50)
            .await
            .unwrap();
        assert_eq!(page.video_ids, vec!["a", "b"]);
        assert_eq!(page.next_page_token.as_deref(), Some("CAoQAA"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].headers[0].1, "application/json");
    }

    #[tokio::test]
    async fn fetch_video_batch_converts_items() {
        let transport = MockTransport::new();
        let yt = client(&transport);
        let url = yt
            .endpoint(
                "videos",
                &[("part", VIDEO_PARTS), ("id", "v1,v2"), ("maxResults", "2")],
            )
            .unwrap();
        transport.push_response(
            HttpMethod::Get,
            url,
            response(
                200,
                &[],
                br#"{"items": [{"id": "v1", "snippet": {"title": "One", "publishedAt": "2024-01-01T00:00:00Z"},
                               "contentDetails": {"duration": "PT5M"}}]}"#,
            ),
        );

        let records = yt
            .fetch_video_batch(&["v1".to_string(), "v2".to_string()])
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "One");
        assert_eq!(records[0].duration, "PT5M");
    }

    #[tokio::test]
    async fn fetch_video_batch_rejects_oversized_batches_without_request() {
        let transport = MockTransport::new();
        let ids: Vec<String> = (0..51).map(|i| format!("v{i}")).collect();
        let err = client(&transport)
            .fetch_video_batch(&ids)
            .await
            .expect_err("oversized batch");
        assert!(matches!(err, CatalogError::Api { .. }));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let transport = MockTransport::new();
        let yt = client(&transport);
        let url = yt
            .endpoint(
                "channels",
                &[("part", CHANNEL_PARTS), ("id", "UC1"), ("maxResults", "1")],
            )
            .unwrap();
        transport.push_response(HttpMethod::Get, url.clone(), response(503, &[], b"busy"));
        transport.push_error(HttpMethod::Get, url.clone(), "connection reset");
        transport.push_response(
            HttpMethod::Get,
            url,
            response(
                200,
                &[],
                br#"{"items": [{"id": "UC1", "contentDetails": {"relatedPlaylists": {"uploads": "UU1"}}}]}"#,
            ),
        );

        let channels = yt.fetch_channels(&["UC1".to_string()]).await.unwrap();
        assert_eq!(channels[0].uploads_playlist_id, "UU1");
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn auth_failures_are_not_retried() {
        let transport = MockTransport::new();
        let yt = client(&transport);
        let url = yt
            .endpoint(
                "videos",
                &[("part", VIDEO_PARTS), ("id", "v1"), ("maxResults", "1")],
            )
            .unwrap();
        transport.push_response(
            HttpMethod::Get,
            url,
            response(
                400,
                &[],
                br#"{"error": {"message": "API key not valid", "errors": [{"reason": "badRequest"}]}}"#,
            ),
        );

        let err = yt
            .fetch_video_batch(&["v1".to_string()])
            .await
            .expect_err("bad request");
        assert!(matches!(err, CatalogError::Api { ref message } if message.contains("API key")));
        assert_eq!(transport.requests().len(), 1);
    }
}
