use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;

use crate::error::InstallError;
use crate::release::response_snippet;
use crate::traits::Downloader;

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub retry_delays: Vec<Duration>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            retry_delays: [0, 2, 5].map(Duration::from_secs).to_vec(),
        }
    }
}

/// `reqwest`-backed [`Downloader`] with a fixed retry schedule.
pub struct HttpDownloader {
    client: reqwest::Client,
    retry_delays: Vec<Duration>,
}

impl HttpDownloader {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(options: &HttpOptions) -> Result<Self, InstallError> {
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .read_timeout(options.read_timeout)
            .user_agent(format!("di-installer/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| InstallError::network("build HTTP client", "-", error))?;

        let retry_delays = if options.retry_delays.is_empty() {
            vec![Duration::ZERO]
        } else {
            options.retry_delays.clone()
        };

        Ok(Self {
            client,
            retry_delays,
        })
    }

    async fn with_retries<T, F, Fut>(&self, url: &str, mut attempt: F) -> Result<T, InstallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, InstallError>>,
    {
        let mut last_error = None;

        for (index, delay) in self.retry_delays.iter().enumerate() {
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }

            match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() => {
                    warn!("Attempt {} for {url} failed: {error}", index + 1);
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error
            .unwrap_or_else(|| InstallError::network("download", url, "no attempts were made")))
    }

    async fn send(
        &self,
        operation: &'static str,
        url: &str,
    ) -> Result<reqwest::Response, InstallError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| InstallError::network(operation, url, error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_snippet = response
                .text()
                .await
                .ok()
                .map(|body| response_snippet(&body, 160))
                .unwrap_or_default();
            return Err(InstallError::HttpStatus {
                operation,
                url: url.to_string(),
                status,
                body_snippet,
            });
        }

        Ok(response)
    }

    async fn get_text_once(&self, url: &str) -> Result<String, InstallError> {
        self.send("fetch", url)
            .await?
            .text()
            .await
            .map_err(|error| InstallError::network("read response", url, error))
    }

    async fn download_once(&self, url: &str, dest: &Path) -> Result<u64, InstallError> {
        let response = self.send("download", url).await?;
        let total = response.content_length().unwrap_or(0);
        let mut downloaded: u64 = 0;

        let mut file = tokio::fs::File::create(dest).await.map_err(|error| {
            InstallError::filesystem("failed to create download file", dest, error)
        })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|error| InstallError::network("download stream", url, error))?;
            file.write_all(&chunk).await.map_err(|error| {
                InstallError::filesystem("failed to write download data", dest, error)
            })?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await.map_err(|error| {
            InstallError::filesystem("failed to flush download file", dest, error)
        })?;

        debug!("Downloaded {downloaded} of {total} bytes from {url}");
        Ok(downloaded)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn get_text(&self, url: &str) -> Result<String, InstallError> {
        debug!("GET {url}");
        self.with_retries(url, || self.get_text_once(url)).await
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64, InstallError> {
        info!("Downloading {url} to {}", dest.display());
        let bytes = self
            .with_retries(url, || self.download_once(url, dest))
            .await?;
        info!("Download complete: {bytes} bytes");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::{HttpDownloader, HttpOptions};
    use crate::error::InstallError;

    fn downloader(delays: Vec<Duration>) -> HttpDownloader {
        HttpDownloader::new(&HttpOptions {
            retry_delays: delays,
            ..HttpOptions::default()
        })
        .expect("client should build")
    }

    #[test]
    fn default_options_match_retry_schedule() {
        let options = HttpOptions::default();

        assert_eq!(
            options.retry_delays,
            vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(5)
            ]
        );
        assert_eq!(options.connect_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn retries_transient_errors_until_schedule_is_exhausted() {
        let downloader = downloader(vec![Duration::ZERO, Duration::ZERO, Duration::ZERO]);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), InstallError> = downloader
            .with_retries("https://example.invalid", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(InstallError::network("fetch", "https://example.invalid", "reset"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let downloader = downloader(vec![Duration::ZERO, Duration::ZERO]);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), InstallError> = downloader
            .with_retries("https://example.invalid", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(InstallError::InvalidManifest("eof".to_string()))
            })
            .await;

        assert!(matches!(result, Err(InstallError::InvalidManifest(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_schedule_still_makes_one_attempt() {
        let downloader = downloader(Vec::new());
        let attempts = AtomicUsize::new(0);

        let result = downloader
            .with_retries("https://example.invalid", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<_, InstallError>(7)
            })
            .await;

        assert_eq!(result.expect("attempt should succeed"), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
