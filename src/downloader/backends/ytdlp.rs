// yt-dlp download engine
//
// start_download resolves once yt-dlp is running; the transfer itself is
// watched from a background task that turns stdout into progress events.

use std::process::Stdio;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;

use crate::downloader::command::DownloadCommand;
use crate::downloader::config::DownloaderSettings;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadProgress, SourceKind};
use crate::downloader::traits::{DownloadEngine, ProgressEmitter};
use crate::downloader::utils::{find_ytdlp, network_args};

const OUTPUT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

pub struct YtDlpEngine {
    ytdlp_path: String,
    settings: DownloaderSettings,
    emitter: ProgressEmitter,
}

impl YtDlpEngine {
    pub fn new(settings: DownloaderSettings) -> Self {
        Self {
            ytdlp_path: find_ytdlp(&settings),
            settings,
            emitter: ProgressEmitter::default(),
        }
    }

    /// Send progress events to `emitter`
    pub fn with_emitter(mut self, emitter: ProgressEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    fn build_args(&self, command: &DownloadCommand) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            command.format_token.clone(),
            "--newline".to_string(),
            "--no-warnings".to_string(),
            "-P".to_string(),
            self.settings.download_dir.clone(),
            "-o".to_string(),
            OUTPUT_TEMPLATE.to_string(),
        ];

        if let Some(langs) = &command.subtitle_langs {
            args.push("--write-subs".to_string());
            args.push("--sub-langs".to_string());
            args.push(langs.clone());
        }

        match (command.source_kind, &command.playlist_index) {
            (SourceKind::Playlist, Some(index)) => {
                args.push("--playlist-items".to_string());
                args.push(index.clone());
            }
            _ => args.push("--no-playlist".to_string()),
        }

        match (&command.container_override, command.extract_audio) {
            (Some(codec), true) => {
                args.push("-x".to_string());
                args.push("--audio-format".to_string());
                args.push(codec.clone());
            }
            (Some(container), false) => {
                args.push("--merge-output-format".to_string());
                args.push(container.clone());
                args.push("--remux-video".to_string());
                args.push(container.clone());
            }
            (None, _) => {}
        }

        args.extend(network_args(&self.settings));
        args.push(command.source_url.clone());
        args
    }
}

#[async_trait]
impl DownloadEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn start_download(&self, command: &DownloadCommand) -> Result<(), DownloadError> {
        let args = self.build_args(command);
        tracing::info!("[YtDlpEngine] {} {}", self.ytdlp_path, args.join(" "));

        let mut child = TokioCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stderr".to_string()))?;

        self.emitter.emit(DownloadProgress {
            percent: 0.0,
            status: "Starting download...".to_string(),
        });

        let emitter = self.emitter.clone();
        tokio::spawn(async move {
            let stderr_task = tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            });

            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some((percent, status)) = parse_ytdlp_progress(&line) {
                    emitter.emit(DownloadProgress { percent, status });
                }
            }

            let stderr_output = stderr_task.await.unwrap_or_default();
            match child.wait().await {
                Ok(status) if status.success() => {
                    tracing::info!("[YtDlpEngine] Download finished");
                    emitter.emit(DownloadProgress {
                        percent: 100.0,
                        status: "Download complete!".to_string(),
                    });
                }
                Ok(status) => {
                    let reason = last_error_line(&stderr_output);
                    tracing::warn!("[YtDlpEngine] yt-dlp exited with {}: {}", status, reason);
                    emitter.emit(DownloadProgress {
                        percent: 0.0,
                        status: format!("Download failed: {}", reason),
                    });
                }
                Err(e) => tracing::warn!("[YtDlpEngine] Process error: {}", e),
            }
        });

        Ok(())
    }
}

/// Parse yt-dlp progress line like:
/// [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)
/// Returns (percent, status_string)
pub fn parse_ytdlp_progress(line: &str) -> Option<(f32, String)> {
    lazy_static::lazy_static! {
        static ref PROGRESS_RE: Regex = Regex::new(
            r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)(?:\s+at\s+(\S+(?:\s*\w+/s)?))?(?:\s+ETA\s+(\S+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?"
        ).unwrap();
        static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
        static ref MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
        static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2).map_or("?", |m| m.as_str());
        let speed = caps.get(3).map_or("?", |m| m.as_str());
        let eta = caps.get(4).map_or("", |m| m.as_str());

        let mut status = format!("{:.1}% of {} @ {}", percent, size, speed);
        if !eta.is_empty() {
            status.push_str(&format!(" ETA {}", eta));
        }
        if let (Some(current), Some(total)) = (caps.get(5), caps.get(6)) {
            status.push_str(&format!(" (frag {}/{})", current.as_str(), total.as_str()));
        }
        return Some((percent, status));
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = caps.get(1).map_or("file", |m| m.as_str());
        let short_name: String = filename
            .rsplit(&['/', '\\'][..])
            .next()
            .unwrap_or(filename)
            .chars()
            .take(50)
            .collect();
        return Some((0.0, format!("Starting: {}", short_name)));
    }

    if MERGE_RE.is_match(line) {
        return Some((99.0, "Merging video and audio...".to_string()));
    }

    if ALREADY_RE.is_match(line) {
        return Some((100.0, "File already downloaded".to_string()));
    }

    None
}

fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or("unknown error")
        .chars()
        .take(200)
        .collect()
}
