use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Semaphore;

use super::{ExtractError, FetchOptions, MediaBackend, MediaInfo, OutputTemplate, MERGE_OUTPUT_FORMAT};

/// Extraction backend driving the yt-dlp executable.
///
/// yt-dlp runs as a child process; a semaphore bounds how many run at once so a burst of
/// requests cannot start an unbounded number of extractions.
pub struct YtDlpBackend {
    yt_dlp_path: String,
    workers: Arc<Semaphore>,
}

impl YtDlpBackend {
    pub fn new(yt_dlp_path: impl Into<String>, max_concurrent_jobs: usize) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            workers: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Arguments for a metadata-only resolution
    pub fn probe_args(url: &str, options: &FetchOptions) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--dump-json".into(),
            "--skip-download".into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
        ];
        if let Some(format) = &options.format {
            args.extend(["--format".into(), format.clone()]);
            args.extend(["--merge-output-format".into(), MERGE_OUTPUT_FORMAT.into()]);
        }
        push_cookie_args(&mut args, options);
        args.push(url.to_string());
        args
    }

    /// Arguments for the actual download
    pub fn download_args(url: &str, options: &FetchOptions) -> Result<Vec<String>, ExtractError> {
        let output = options
            .output
            .as_ref()
            .ok_or_else(|| ExtractError::Failed("No output template given for download".to_string()))?;

        let mut args: Vec<String> = vec![
            "--output".into(),
            output.pattern(),
            "--no-playlist".into(),
            "--quiet".into(),
            "--no-warnings".into(),
            "--no-progress".into(),
            "--no-simulate".into(),
            "--print".into(),
            "after_move:filepath".into(),
            "--merge-output-format".into(),
            MERGE_OUTPUT_FORMAT.into(),
        ];
        if let Some(format) = &options.format {
            args.extend(["--format".into(), format.clone()]);
        }
        push_cookie_args(&mut args, options);
        args.push(url.to_string());
        Ok(args)
    }

    /// Run yt-dlp on a worker slot and wait for it to exit
    async fn run(&self, args: &[String]) -> Result<Output, ExtractError> {
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|_| ExtractError::Unavailable("worker pool is closed".to_string()))?;

        let output = Command::new(&self.yt_dlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractError::Unavailable(format!(
                        "'{}' not found. Please install it: https://github.com/yt-dlp/yt-dlp",
                        self.yt_dlp_path
                    ))
                } else {
                    ExtractError::Io(e)
                }
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExtractError::Failed(if error.is_empty() {
                format!("yt-dlp exited with {}", output.status)
            } else {
                error
            }));
        }

        Ok(output)
    }
}

fn push_cookie_args(args: &mut Vec<String>, options: &FetchOptions) {
    if let Some(cookie_file) = &options.cookie_file {
        args.extend(["--cookies".into(), cookie_file.to_string_lossy().into_owned()]);
    }
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    async fn probe(&self, url: &str, options: &FetchOptions) -> Result<MediaInfo, ExtractError> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = self.run(&Self::probe_args(url, options)).await?;
        let json_str = String::from_utf8_lossy(&output.stdout);

        // --no-playlist still prints one document per entry for some extractors
        let first = json_str
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| ExtractError::Failed("yt-dlp returned no metadata".to_string()))?;

        MediaInfo::from_json(first)
    }

    async fn download(&self, url: &str, options: &FetchOptions) -> Result<PathBuf, ExtractError> {
        tracing::debug!("Downloading video for: {}", url);

        let args = Self::download_args(url, options)?;
        let output = self.run(&args).await?;

        let template = options
            .output
            .as_ref()
            .ok_or_else(|| ExtractError::Failed("No output template given for download".to_string()))?;

        // `after_move:filepath` prints the final name once merging and remuxing are done
        let printed = String::from_utf8_lossy(&output.stdout);
        match printed.lines().map(str::trim).filter(|l| !l.is_empty()).last() {
            Some(path) => Ok(PathBuf::from(path)),
            None => find_by_stem(template),
        }
    }
}

/// Any finished file for the template, in case yt-dlp kept the source container
fn find_by_stem(template: &OutputTemplate) -> Result<PathBuf, ExtractError> {
    let prefix = format!("{}.", template.stem);
    let entries = fs_err::read_dir(&template.dir)?;

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            name.starts_with(&prefix)
                && !name.ends_with(".part")
                && !name.ends_with(".ytdl")
                && name.matches('.').count() == 1
        })
        .ok_or_else(|| ExtractError::MissingArtifact(template.path_with_ext(MERGE_OUTPUT_FORMAT)))
}
