//! Local image catalog
//!
//! Lists the images available to the Docker daemon so the dashboard can offer
//! them for scanning.

use crate::error::{ScanCacheError, ScanCacheResult};
use crate::process::{output_tail, run_captured, RunError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Source of locally available images
#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// List local images
    async fn list_images(&self) -> ScanCacheResult<Vec<ImageSummary>>;
}

/// One local image as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub created_since: String,
    pub size: String,
    /// `repository:tag`, the name to pass to a scan
    pub name: String,
}

/// A line of `docker images --format '{{json .}}'`
#[derive(Debug, Deserialize)]
struct DockerImageLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Repository")]
    repository: String,
    #[serde(rename = "Tag", default)]
    tag: String,
    #[serde(rename = "CreatedSince", default)]
    created_since: String,
    #[serde(rename = "Size", default)]
    size: String,
}

impl From<DockerImageLine> for ImageSummary {
    fn from(line: DockerImageLine) -> Self {
        let name = match (line.repository.as_str(), line.tag.as_str()) {
            ("<none>", _) => line.id.clone(),
            (repo, "" | "<none>") => repo.to_string(),
            (repo, tag) => format!("{}:{}", repo, tag),
        };
        Self {
            id: line.id,
            repository: line.repository,
            tag: line.tag,
            created_since: line.created_since,
            size: line.size,
            name,
        }
    }
}

/// Catalog backed by the docker CLI
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ImageCatalog for DockerCli {
    async fn list_images(&self) -> ScanCacheResult<Vec<ImageSummary>> {
        let args = ["images", "--format", "{{json .}}"];
        let output = run_captured(&self.binary, &args, None)
            .await
            .map_err(|e| match e {
                RunError::NotFound => {
                    ScanCacheError::ImageList(format!("{} not found on PATH", self.binary))
                }
                RunError::TimedOut(limit) => {
                    ScanCacheError::ImageList(format!("timed out after {}s", limit.as_secs()))
                }
                RunError::Spawn(source) => ScanCacheError::command_failed(
                    format!("{} {}", self.binary, args.join(" ")),
                    source,
                ),
            })?;

        if !output.status.success() {
            return Err(ScanCacheError::command_exec(
                format!("{} images", self.binary),
                output_tail(b"", &output.stderr),
            ));
        }

        let images = parse_image_lines(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Found {} local images", images.len());
        Ok(images)
    }
}

/// Parse newline-delimited JSON from `docker images`
pub(crate) fn parse_image_lines(stdout: &str) -> ScanCacheResult<Vec<ImageSummary>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            serde_json::from_str::<DockerImageLine>(l)
                .map(ImageSummary::from)
                .map_err(|e| ScanCacheError::ImageList(format!("unreadable docker output: {}", e)))
        })
        .collect()
}
