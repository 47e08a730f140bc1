//! Conditional image fetches keyed on ETag.
//!
//! With a known ETag the request carries `If-None-Match`, and the server may
//! answer 304 Not Modified instead of resending the image.

use crate::http::{HttpRequest, HttpResponse, HttpTransport};

use super::errors::ThumbnailError;

/// Default content type when the server sends none.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Result of a conditional GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalFetch {
    /// 304: the stored image is current.
    NotModified {
        /// ETag echoed by the server, if any.
        etag: Option<String>,
    },
    /// 200: a new image body.
    Fetched {
        bytes: Vec<u8>,
        content_type: String,
        etag: Option<String>,
    },
}

impl ConditionalFetch {
    pub fn is_not_modified(&self) -> bool {
        matches!(self, ConditionalFetch::NotModified { .. })
    }

    pub fn etag(&self) -> Option<&str> {
        match self {
            ConditionalFetch::NotModified { etag } | ConditionalFetch::Fetched { etag, .. } => {
                etag.as_deref()
            }
        }
    }
}

fn response_etag(response: &HttpResponse) -> Option<String> {
    response
        .header("etag")
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

/// GET `url`, sending `If-None-Match` when `etag` is known.
///
/// A 304 body is discarded. Any status other than 2xx or 304 is
/// [`ThumbnailError::Fetch`].
pub async fn fetch_conditional(
    transport: &dyn HttpTransport,
    url: &str,
    etag: Option<&str>,
) -> Result<ConditionalFetch, ThumbnailError> {
    let mut request = HttpRequest::get(url);
    if let Some(etag) = etag {
        request = request.with_header("If-None-Match", etag);
    }

    let response = transport
        .send(request)
        .await
        .map_err(|e| ThumbnailError::Transport(e.to_string()))?;

    if response.is_not_modified() {
        return Ok(ConditionalFetch::NotModified {
            etag: response_etag(&response),
        });
    }
    if !response.is_success() {
        return Err(ThumbnailError::Fetch {
            status: response.status,
        });
    }

    let etag = response_etag(&response);
    let content_type = response
        .header("content-type")
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_ascii_lowercase();

    Ok(ConditionalFetch::Fetched {
        bytes: response.body,
        content_type,
        etag,
    })
}
