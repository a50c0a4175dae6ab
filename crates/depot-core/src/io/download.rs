//! One download attempt with streaming SHA-256 verification.
//!
//! The body is written to a temp file next to the destination and hashed on
//! the way through. Only a file whose hash matches is renamed into place; any
//! other outcome drops the temp file.

use std::path::Path;

use depot_schema::{ContentHash, ContentHasher};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;
use crate::io::transport::Transport;

/// Prefix shared by every in-progress download file.
pub const TEMP_PREFIX: &str = ".download-";

/// Suffix shared by every in-progress download file.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Fetch `url` into `dest`, which must hash to `expected`.
///
/// # Errors
///
/// Returns the transport's classified error, an I/O error, or
/// [`FetchError::HashMismatch`]. On error nothing exists at `dest`.
pub async fn download_and_verify(
    transport: &dyn Transport,
    url: &str,
    dest: &Path,
    expected: &ContentHash,
) -> Result<u64, FetchError> {
    let dir = dest
        .parent()
        .ok_or_else(|| std::io::Error::other("destination has no parent directory"))?;
    tokio::fs::create_dir_all(dir).await?;

    let mut stream = transport.open(url).await?;

    // Deleted on drop unless persisted
    let tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    let mut file = tokio::fs::File::from_std(tmp.reopen()?);
    let mut hasher = ContentHasher::new();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    let actual = hasher.finalize();
    if actual != *expected {
        tracing::debug!(url, %expected, %actual, "digest mismatch, discarding download");
        return Err(FetchError::HashMismatch {
            expected: *expected,
            actual,
        });
    }

    tmp.persist(dest).map_err(|e| FetchError::Io(e.error))?;
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::transport::ByteStream;
    use async_trait::async_trait;
    use bytes::Bytes;

    struct Fixed(&'static [u8]);

    #[async_trait]
    impl Transport for Fixed {
        async fn open(&self, _: &str) -> Result<ByteStream, FetchError> {
            let chunks: Vec<Result<Bytes, FetchError>> = self
                .0
                .chunks(3)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            Ok(futures::stream::iter(chunks).boxed())
        }
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn verified_download_lands_at_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("abc").join("lib-1.0.jar");
        let body = b"artifact bytes";

        let size = download_and_verify(&Fixed(body), "mem://lib", &dest, &ContentHash::of_bytes(body))
            .await
            .unwrap();

        assert_eq!(size, body.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert_eq!(leftovers(dest.parent().unwrap()), ["lib-1.0.jar"]);
    }

    #[tokio::test]
    async fn tampered_download_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("abc").join("lib-1.0.jar");

        let err = download_and_verify(
            &Fixed(b"tampered"),
            "mem://lib",
            &dest,
            &ContentHash::of_bytes(b"original"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, FetchError::HashMismatch { .. }));
        assert!(!dest.exists());
        assert!(leftovers(dest.parent().unwrap()).is_empty());
    }
}
