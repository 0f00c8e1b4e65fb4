use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reel_api::endpoint::SearchEndpoint;
use reel_api::error::ErrorKind;
use reel_api::response::{parse_search_page, SearchResultPage};

/// Classified failure for one search/page call. Everything the transport and
/// decode layers can throw is folded into these three cases before the
/// coordinator sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No connectivity, or the transport failed mid-request.
    Network,
    /// The response body could not be parsed into a search page.
    Decode,
    /// Anything else, including non-success HTTP statuses.
    Other,
}

impl From<FetchError> for ErrorKind {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Network => ErrorKind::NoInternet,
            FetchError::Decode | FetchError::Other => ErrorKind::UnknownError,
        }
    }
}

pub type SearchFuture =
    Pin<Box<dyn Future<Output = Result<SearchResultPage, FetchError>> + Send>>;

/// Transport seam between the coordinator and the remote API. `keyword` is
/// trimmed and non-empty, `page` is 1-based; the coordinator guarantees both.
pub trait SearchBackend: Send + Sync {
    fn search(&self, keyword: &str, page: u32) -> SearchFuture;
}

/// HTTP client for the remote search endpoint. One GET per call, no side
/// effects beyond the request itself.
pub struct RemoteSearchClient {
    endpoint: SearchEndpoint,
    http: reqwest::Client,
    pub req_timeout: Duration,
}

impl RemoteSearchClient {
    pub fn new(endpoint: SearchEndpoint, http: reqwest::Client) -> Self {
        Self {
            endpoint,
            http,
            req_timeout: Duration::from_secs(10),
        }
    }

    async fn fetch_page(
        http: reqwest::Client,
        url: url::Url,
        req_timeout: Duration,
    ) -> Result<SearchResultPage, FetchError> {
        let resp = http
            .get(url)
            .timeout(req_timeout)
            .send()
            .await
            .map_err(classify_transport)?;
        if !resp.status().is_success() {
            return Err(FetchError::Other);
        }
        let body = resp.bytes().await.map_err(classify_transport)?;
        parse_search_page(&body).map_err(|_| FetchError::Decode)
    }
}

impl SearchBackend for RemoteSearchClient {
    fn search(&self, keyword: &str, page: u32) -> SearchFuture {
        let url = self.endpoint.search_url(keyword, page);
        let http = self.http.clone();
        let req_timeout = self.req_timeout;
        Box::pin(async move { Self::fetch_page(http, url, req_timeout).await })
    }
}

/// Request-construction bugs aside, a failed send or body read means the
/// transport gave out.
fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_builder() {
        FetchError::Other
    } else {
        FetchError::Network
    }
}
