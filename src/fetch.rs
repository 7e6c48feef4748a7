//! Image fetcher.
//!
//! Downloads one remote image to a caller-chosen path. The destination is
//! derived from the source URL before the call (see [`crate::images`]), so
//! an existing file short-circuits the request entirely and re-runs never
//! download the same image twice.
//!
//! Redirects are followed by hand, one request per hop, up to the
//! configured bound. Bodies are streamed into a `.part` file next to the
//! destination and renamed into place only after the last byte is
//! written; every failure path removes the partial file.

use reqwest::{header, Client, StatusCode, Url};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::FetchConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid image url '{0}'")]
    InvalidUrl(String),
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },
    #[error("redirect from {url} has no usable Location header")]
    MissingLocation { url: String },
    #[error("more than {limit} redirects starting at {url}")]
    TooManyRedirects { url: String, limit: usize },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Local file-system failures abort a batch; network failures do not.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Io(_))
    }

    fn from_reqwest(url: &Url, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// What a successful [`ImageFetcher::fetch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { bytes: u64 },
    AlreadyPresent,
}

#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    max_redirects: usize,
}

impl ImageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout());
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder.build().map_err(FetchError::Client)?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
        })
    }

    /// Download `url` to `dest` unless `dest` already exists.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome, FetchError> {
        if tokio::fs::try_exists(dest).await? {
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let start = parse_http_url(url)?;
        let response = self.follow_redirects(start).await?;
        let bytes = write_atomically(response, dest).await?;
        Ok(FetchOutcome::Downloaded { bytes })
    }

    async fn follow_redirects(&self, start: Url) -> Result<reqwest::Response, FetchError> {
        let mut current = start.clone();
        let mut hops = 0usize;

        loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|err| FetchError::from_reqwest(&current, err))?;
            let status = response.status();

            if status.is_redirection() {
                hops += 1;
                if hops > self.max_redirects {
                    return Err(FetchError::TooManyRedirects {
                        url: start.to_string(),
                        limit: self.max_redirects,
                    });
                }
                let next = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|location| current.join(location).ok())
                    .ok_or_else(|| FetchError::MissingLocation {
                        url: current.to_string(),
                    })?;
                tracing::debug!(from = %current, to = %next, hop = hops, "following redirect");
                current = next;
                continue;
            }

            if status != StatusCode::OK {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    url: current.to_string(),
                });
            }

            return Ok(response);
        }
    }
}

fn parse_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}

/// Sibling path the body is streamed into before the final rename.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn write_atomically(response: reqwest::Response, dest: &Path) -> Result<u64, FetchError> {
    let part = part_path(dest);
    match stream_body(response, &part).await {
        Ok(bytes) => {
            if let Err(err) = tokio::fs::rename(&part, dest).await {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(err.into());
            }
            Ok(bytes)
        }
        Err(err) => {
            let _ = tokio::fs::remove_file(&part).await;
            Err(err)
        }
    }
}

async fn stream_body(mut response: reqwest::Response, part: &Path) -> Result<u64, FetchError> {
    let url = response.url().clone();
    let mut file = tokio::fs::File::create(part).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|err| FetchError::from_reqwest(&url, err))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}
