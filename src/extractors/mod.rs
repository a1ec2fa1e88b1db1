use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub mod cookies;
pub mod ytdlp;

pub use cookies::CookieFile;
pub use ytdlp::YtDlpBackend;

/// Container yt-dlp is asked to merge separate video and audio streams into
pub const MERGE_OUTPUT_FORMAT: &str = "mp4";

/// Errors raised by the extraction backend
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("yt-dlp is not available: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Failed(String),

    #[error("Failed to parse yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Downloaded file was not found on the server: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where a download is written: `<dir>/<stem>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    pub dir: PathBuf,
    pub stem: String,
}

impl OutputTemplate {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    /// Output pattern in yt-dlp's `-o` syntax
    pub fn pattern(&self) -> String {
        self.dir
            .join(format!("{}.%(ext)s", self.stem))
            .to_string_lossy()
            .into_owned()
    }

    /// Path yt-dlp produces for the given extension
    pub fn path_with_ext(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, ext))
    }
}

/// Options passed to a single probe or download
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Format selector expression, `None` lets the extractor pick its default
    pub format: Option<String>,

    /// Output location, only meaningful for downloads
    pub output: Option<OutputTemplate>,

    /// Netscape cookie file used for authenticated extraction
    pub cookie_file: Option<PathBuf>,
}

/// Size of a single requested format, as reported by yt-dlp
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestedFormat {
    pub format_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub filesize: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub filesize_approx: Option<u64>,
}

impl RequestedFormat {
    fn size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

/// Metadata returned by a probe
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub id: String,

    /// Identity of the extractor that resolved the URL ("Youtube", "Instagram", ...)
    #[serde(default)]
    pub extractor_key: String,

    pub title: Option<String>,

    pub ext: Option<String>,

    /// Exact size in bytes if known
    #[serde(default, deserialize_with = "deserialize_size")]
    pub filesize: Option<u64>,

    /// Estimated size in bytes
    #[serde(default, deserialize_with = "deserialize_size")]
    pub filesize_approx: Option<u64>,

    /// Separate streams picked by a `video+audio` selector
    #[serde(default)]
    pub requested_formats: Vec<RequestedFormat>,

    #[serde(default, deserialize_with = "deserialize_duration")]
    pub duration: Option<Duration>,
}

impl MediaInfo {
    /// Parse one `--dump-json` document
    pub fn from_json(json: &str) -> Result<Self, ExtractError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Best known size: exact, then approximate, then the sum of merged streams
    pub fn size_estimate(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx).or_else(|| {
            if self.requested_formats.is_empty() {
                return None;
            }
            self.requested_formats
                .iter()
                .map(RequestedFormat::size)
                .sum::<Option<u64>>()
        })
    }
}

// yt-dlp emits sizes as integers for most sites and as floats for a few
fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let size = Option::<f64>::deserialize(deserializer)?;
    Ok(size.filter(|s| s.is_finite() && *s >= 0.0).map(|s| s as u64))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let seconds = Option::<f64>::deserialize(deserializer)?;
    // Page metadata can claim any duration, out of range values count as unknown
    Ok(seconds
        .filter(|s| s.is_finite() && *s >= 0.0)
        .and_then(|s| Duration::try_seconds(s as i64)))
}

/// Static mapping from extractor identity to a format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatPolicy {
    /// 720p-capped mp4/m4a chain
    Youtube,
    /// Best mp4 with a final "anything" fallback (reels, TikTok, ...)
    Generic,
}

impl FormatPolicy {
    pub fn for_extractor(extractor_key: &str) -> Self {
        if extractor_key.to_lowercase().contains("youtube") {
            FormatPolicy::Youtube
        } else {
            FormatPolicy::Generic
        }
    }

    pub fn selector(&self) -> &'static str {
        match self {
            FormatPolicy::Youtube => {
                "bestvideo[ext=mp4][height<=720]+bestaudio[ext=m4a]/best[ext=mp4][height<=720]/best[ext=mp4]"
            }
            FormatPolicy::Generic => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
        }
    }
}

/// True when a known size is strictly above the ceiling; unknown sizes pass
pub fn exceeds_ceiling(size: Option<u64>, ceiling: u64) -> bool {
    size.is_some_and(|size| size > ceiling)
}

/// Find the file a download actually produced.
///
/// Merging may change the container, so when `expected` is missing the same stem with
/// `fallback_ext` is tried before giving up.
pub fn resolve_artifact(expected: &Path, fallback_ext: &str) -> Result<PathBuf, ExtractError> {
    if expected.exists() {
        return Ok(expected.to_path_buf());
    }

    let corrected = expected.with_extension(fallback_ext);
    if corrected.exists() {
        tracing::debug!(
            "Corrected download path {} -> {}",
            expected.display(),
            corrected.display()
        );
        return Ok(corrected);
    }

    Err(ExtractError::MissingArtifact(expected.to_path_buf()))
}

/// Extraction/download backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Resolve a URL without downloading anything
    async fn probe(&self, url: &str, options: &FetchOptions) -> Result<MediaInfo, ExtractError>;

    /// Download to `options.output` and return the path of the produced file
    async fn download(&self, url: &str, options: &FetchOptions) -> Result<PathBuf, ExtractError>;
}

/// Request-scoped ownership of everything written under `<dir>/<stem>.*`.
///
/// Dropping the scope removes the final artifact as well as partial and per-format
/// fragments left behind by a failed download.
pub struct ArtifactScope {
    template: OutputTemplate,
    adopted: Vec<PathBuf>,
}

impl ArtifactScope {
    pub fn new(template: OutputTemplate) -> Self {
        Self {
            template,
            adopted: Vec::new(),
        }
    }

    /// Also remove `path` on drop, for files the backend reports outside the template
    pub fn adopt(&mut self, path: PathBuf) {
        if !self.adopted.contains(&path) {
            self.adopted.push(path);
        }
    }

    pub fn template(&self) -> &OutputTemplate {
        &self.template
    }

    /// Files currently on disk that belong to this request
    pub fn files(&self) -> Vec<PathBuf> {
        let prefix = format!("{}.", self.template.stem);
        let entries = match fs_err::read_dir(&self.template.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Cannot list {}: {}", self.template.dir.display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect()
    }

    fn cleanup(&self) {
        let mut paths = self.files();
        paths.extend(self.adopted.iter().filter(|p| p.exists()).cloned());
        paths.sort();
        paths.dedup();

        for path in paths {
            match fs_err::remove_file(&path) {
                Ok(()) => tracing::info!("Removed downloaded file: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::error!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for ArtifactScope {
    fn drop(&mut self) {
        self.cleanup();
    }
}
