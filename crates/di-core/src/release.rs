use serde::Deserialize;

use crate::error::InstallError;
use crate::traits::Downloader;
use crate::version::strip_tag_prefix;

const GITHUB_REPO: &str = "DiscordInjections/DiscordInjections";

/// GitHub "latest release" endpoint of the upstream project.
#[must_use]
pub fn default_release_api_url() -> String {
    format!("https://api.github.com/repos/{GITHUB_REPO}/releases/latest")
}

/// The subset of a GitHub release the installer reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseManifest {
    pub tag_name: String,
    pub zipball_url: String,
    #[serde(default)]
    pub tarball_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ReleaseManifest {
    /// Parse a release document.
    ///
    /// # Errors
    /// Returns an error when the body is not JSON or lacks `tag_name` or
    /// `zipball_url`.
    pub fn parse(body: &str) -> Result<Self, InstallError> {
        serde_json::from_str(body).map_err(|error| {
            InstallError::InvalidManifest(format!("{error}{}", response_snippet(body, 160)))
        })
    }

    #[must_use]
    pub fn version(&self) -> &str {
        strip_tag_prefix(&self.tag_name)
    }
}

/// Fetch and parse the latest release manifest.
///
/// # Errors
/// Returns an error when the request fails or the response is not a release
/// manifest.
pub async fn fetch_latest_release(
    downloader: &dyn Downloader,
    url: &str,
) -> Result<ReleaseManifest, InstallError> {
    let body = downloader.get_text(url).await?;
    let release = ReleaseManifest::parse(&body)?;
    log::info!(
        "Latest release {} ({})",
        release.tag_name,
        release.html_url.as_deref().unwrap_or(&release.zipball_url)
    );
    Ok(release)
}

pub(crate) fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.trim().chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}
