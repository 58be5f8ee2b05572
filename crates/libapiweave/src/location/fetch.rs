//! Concurrent retrieval of external link indexes.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{fs, task::JoinSet, time};
use tracing::{debug, error};

use crate::{
    config::{DEFAULT_TIMEOUT_MS, ExternalLinkConfig},
    diagnostics::{Diagnostic, Diagnostics},
    error::{ApiweaveError, Result},
    location::external::ExternalLinkIndex,
};

/// Retrieves the raw text of an index file.
#[async_trait]
pub trait IndexFetcher: Send + Sync {
    /// Fetch `url`, which may be an `http(s)` URL, a `file://` URL or a plain path.
    async fn fetch(&self, url: &str) -> Result<String>;
}

impl fmt::Debug for dyn IndexFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IndexFetcher")
    }
}

/// Fetches over HTTP with `reqwest`, and from the local filesystem for everything else.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// Shared client; requests and connects are bounded by its timeouts.
    client: reqwest::Client,
}

impl HttpFetcher {
    /// A fetcher whose requests give up after the default external index timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// A fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| ApiweaveError::config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

/// Whether `url` needs the network.
fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Wrap any displayable failure as a fetch error for `url`.
fn fetch_error(url: &str, reason: impl fmt::Display) -> ApiweaveError {
    ApiweaveError::Fetch {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl IndexFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        if is_remote(url) {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| fetch_error(url, e))?;
            response.text().await.map_err(|e| fetch_error(url, e))
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            fs::read_to_string(path)
                .await
                .map_err(|e| fetch_error(url, e))
        }
    }
}

/// Candidate index URLs for a link, in the order they are tried.
fn candidates(link: &ExternalLinkConfig) -> Vec<String> {
    if let Some(list) = &link.package_list {
        return vec![list.clone()];
    }
    let base = link.url.trim_end_matches('/');
    vec![format!("{base}/package-list"), format!("{base}/element-list")]
}

/// Fetch one link's index text, trying each candidate in turn and retrying the whole round.
///
/// Every attempt is bounded by the link's timeout, whatever the fetcher does.
async fn fetch_one(fetcher: Arc<dyn IndexFetcher>, link: ExternalLinkConfig) -> Result<String> {
    let urls = candidates(&link);
    let timeout = link.timeout();
    let mut last = None;
    for attempt in 0..=link.retries {
        for url in &urls {
            let result = time::timeout(timeout, fetcher.fetch(url))
                .await
                .unwrap_or_else(|_| {
                    Err(fetch_error(
                        url,
                        format!("timed out after {} ms", link.timeout_ms),
                    ))
                });
            match result {
                Ok(text) => {
                    debug!(url, attempt, "fetched external index");
                    return Ok(text);
                }
                Err(e) => {
                    debug!(url, attempt, error = %e, "index fetch attempt failed");
                    last = Some(e);
                }
            }
        }
    }
    Err(last.unwrap_or_else(|| fetch_error(&link.url, "no index location")))
}

/// Fetch and parse the indexes of every link concurrently.
///
/// Results keep the order of `links`. A link that cannot be loaded is reported as an
/// [`Diagnostic::ExternalIndexFetchFailure`] and left out; it never fails the other links. In
/// `offline` mode links that need the network are not attempted.
pub async fn fetch_all(
    fetcher: Arc<dyn IndexFetcher>,
    links: &[ExternalLinkConfig],
    offline: bool,
    diagnostics: &Diagnostics,
) -> Vec<ExternalLinkIndex> {
    let mut tasks = JoinSet::new();
    for (position, link) in links.iter().enumerate() {
        if offline && candidates(link).iter().any(|url| is_remote(url)) {
            diagnostics.report(Diagnostic::ExternalIndexFetchFailure {
                url: link.url.clone(),
                reason: "skipped in offline mode".to_string(),
            });
            continue;
        }
        let fetcher = Arc::clone(&fetcher);
        let link = link.clone();
        tasks.spawn(async move {
            let result = fetch_one(fetcher, link.clone()).await;
            (position, link, result)
        });
    }

    let mut fetched = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((position, link, Ok(text))) => {
                fetched.push((position, ExternalLinkIndex::parse(&link.url, &text, diagnostics)));
            }
            Ok((_, link, Err(e))) => diagnostics.report(Diagnostic::ExternalIndexFetchFailure {
                url: link.url,
                reason: e.to_string(),
            }),
            Err(e) => error!("index fetch task failed: {e}"),
        }
    }
    fetched.sort_by_key(|(position, _)| *position);
    fetched.into_iter().map(|(_, index)| index).collect()
}
