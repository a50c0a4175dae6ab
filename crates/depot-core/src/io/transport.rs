//! Transport capability: URL in, byte stream out.
//!
//! Implementations classify failures before handing them back, so the
//! coordinator only has to ask [`FetchError::is_retryable`].

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::error::FetchError;

/// Body of a successful response.
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open `url` for reading.
    ///
    /// A definitive "not there" must come back as [`FetchError::NotFound`];
    /// everything else is treated as transient.
    async fn open(&self, url: &str) -> Result<ByteStream, FetchError>;
}

/// Map a response status to the coordinator's fault model.
pub fn classify_status(url: &str, status: u16) -> Result<(), FetchError> {
    match status {
        200..=299 => Ok(()),
        404 | 410 => Err(FetchError::NotFound {
            url: url.to_string(),
        }),
        _ => Err(FetchError::Status {
            url: url.to_string(),
            status,
        }),
    }
}

/// Serve `file://` URLs from the local filesystem.
async fn open_local(url: &str) -> Result<ByteStream, FetchError> {
    let path = PathBuf::from(url.trim_start_matches("file://"));
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let stream = tokio_util::io::ReaderStream::new(file).map(|chunk| chunk.map_err(FetchError::from));
    Ok(stream.boxed())
}

/// HTTP(S) transport backed by `reqwest`.
///
/// Advertises `deflate` and inflates transparently; redirects, proxies and
/// connection pooling are left to the client's own policy.
#[cfg(feature = "network")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

#[cfg(feature = "network")]
impl HttpTransport {
    /// Build a transport with depot's user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .deflate(true)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared pools, custom proxies, tests).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "network")]
#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &str) -> Result<ByteStream, FetchError> {
        if url.starts_with("file://") {
            return open_local(url).await;
        }

        let response = self.client.get(url).send().await?;
        classify_status(url, response.status().as_u16())?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(FetchError::from));
        Ok(stream.boxed())
    }
}

/// Transport that only understands `file://` URLs.
///
/// Used when the crate is built without the `network` feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransport;

#[async_trait]
impl Transport for LocalTransport {
    async fn open(&self, url: &str) -> Result<ByteStream, FetchError> {
        if url.starts_with("file://") {
            open_local(url).await
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 501,
            })
        }
    }
}
