// Helper functions shared by the yt-dlp collaborators

use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};
use url::Url;

use super::config::DownloaderSettings;
use super::errors::DownloadError;
use super::traits::PidReporter;

/// Check a submitted URL; returns it trimmed.
///
/// Empty input is `MissingUrl`, anything that is not an absolute http(s)
/// URL with a host is `InvalidUrl`.
pub fn validate_url(input: &str) -> Result<String, DownloadError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DownloadError::MissingUrl);
    }

    let parsed = Url::parse(trimmed).map_err(|e| DownloadError::InvalidUrl(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DownloadError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(DownloadError::InvalidUrl("missing host".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Locate the yt-dlp executable: explicit setting, common paths, `which`
pub fn find_ytdlp(settings: &DownloaderSettings) -> String {
    if let Some(path) = settings.ytdlp_path.as_deref().filter(|p| !p.is_empty()) {
        return path.to_string();
    }

    let common_paths = [
        "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
        "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac
        "/usr/bin/yt-dlp",
    ];
    for path in common_paths {
        if std::path::Path::new(path).exists() {
            return path.to_string();
        }
    }

    let locator = if cfg!(windows) { "where" } else { "which" };
    if let Ok(output) = std::process::Command::new(locator).arg("yt-dlp").output() {
        if output.status.success() {
            let found = String::from_utf8_lossy(&output.stdout);
            if let Some(first) = found.lines().map(str::trim).find(|l| !l.is_empty()) {
                return first.to_string();
            }
        }
    }

    "yt-dlp".to_string()
}

/// `--proxy` and `--socket-timeout` from settings
pub fn network_args(settings: &DownloaderSettings) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(proxy) = settings.proxy.as_deref().filter(|p| !p.is_empty()) {
        args.push("--proxy".to_string());
        args.push(proxy.to_string());
    }
    if let Some(secs) = settings.socket_timeout_secs {
        args.push("--socket-timeout".to_string());
        args.push(secs.to_string());
    }

    args
}

/// Spawn `program`, hand its pid to `report_pid`, collect the output.
///
/// A process killed from outside simply ends with a failed status.
pub async fn run_output_reporting_pid(
    program: &str,
    args: &[String],
    report_pid: PidReporter,
    timeout_secs: Option<u64>,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(pid) = child.id() {
        report_pid(pid);
    }

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        DownloadError::ExecutionError(format!("Failed to capture stdout from {}", program))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        DownloadError::ExecutionError(format!("Failed to capture stderr from {}", program))
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let status = match timeout_secs {
        Some(secs) => match timeout(Duration::from_secs(secs), child.wait()).await {
            Ok(waited) => waited?,
            Err(_) => {
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(DownloadError::NetworkTimeout);
            }
        },
        None => child.wait().await?,
    };

    let join = |e: tokio::task::JoinError| DownloadError::ExecutionError(e.to_string());
    let stdout = stdout_task.await.map_err(join)??;
    let stderr = stderr_task.await.map_err(join)??;

    Ok(std::process::Output {
        status,
        stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert_eq!(validate_url(""), Err(DownloadError::MissingUrl));
        assert_eq!(validate_url("   "), Err(DownloadError::MissingUrl));
        assert!(matches!(validate_url("youtube.com/watch"), Err(DownloadError::InvalidUrl(_))));
        assert!(matches!(validate_url("ftp://host/file"), Err(DownloadError::InvalidUrl(_))));
        assert_eq!(
            validate_url("  https://youtu.be/abc ").as_deref(),
            Ok("https://youtu.be/abc")
        );
    }

    #[test]
    fn test_explicit_ytdlp_path_wins() {
        let settings = DownloaderSettings::default().with_ytdlp_path(Some("/custom/yt-dlp".into()));
        assert_eq!(find_ytdlp(&settings), "/custom/yt-dlp");
    }

    #[test]
    fn test_network_args() {
        let settings = DownloaderSettings::default().with_proxy(Some("socks5h://127.0.0.1:1080".into()));
        assert_eq!(
            network_args(&settings),
            vec!["--proxy", "socks5h://127.0.0.1:1080", "--socket-timeout", "15"]
        );

        let mut bare = DownloaderSettings::default();
        bare.socket_timeout_secs = None;
        assert!(network_args(&bare).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_output_reports_pid() {
        let (tx, rx) = std::sync::mpsc::channel();
        let output = run_output_reporting_pid(
            "sh",
            &["-c".to_string(), "echo hello".to_string()],
            Box::new(move |pid| {
                let _ = tx.send(pid);
            }),
            Some(10),
        )
        .await
        .unwrap();

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
        assert!(rx.try_recv().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_not_found() {
        let result = run_output_reporting_pid(
            "definitely-not-a-real-binary-xyz",
            &[],
            Box::new(|_| {}),
            None,
        )
        .await;
        assert!(matches!(result, Err(DownloadError::ToolNotFound(_))));
    }
}
