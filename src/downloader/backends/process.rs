// Process termination through the platform's kill command

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;

use crate::downloader::errors::DownloadError;
use crate::downloader::traits::ProcessTerminator;

/// Terminates a pid with `kill` (unix) or `taskkill` (windows)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTerminator;

impl SystemTerminator {
    fn kill_command(pid: u32) -> (&'static str, Vec<String>) {
        if cfg!(windows) {
            ("taskkill", vec!["/PID".to_string(), pid.to_string(), "/T".to_string(), "/F".to_string()])
        } else {
            ("kill", vec!["-TERM".to_string(), pid.to_string()])
        }
    }
}

#[async_trait]
impl ProcessTerminator for SystemTerminator {
    async fn terminate(&self, pid: u32) -> Result<(), DownloadError> {
        let (program, args) = Self::kill_command(pid);
        tracing::info!("[Terminator] {} {}", program, args.join(" "));

        let output = TokioCommand::new(program).args(&args).output().await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(DownloadError::ExecutionError(format!(
                "{} {} failed: {}",
                program,
                pid,
                stderr.trim()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_kill_command_unix() {
        let (program, args) = SystemTerminator::kill_command(42);
        assert_eq!(program, "kill");
        assert_eq!(args, vec!["-TERM", "42"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_running_process() {
        let mut child = TokioCommand::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id().unwrap();

        SystemTerminator.terminate(pid).await.unwrap();
        let status = child.wait().await.unwrap();
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_unknown_pid_fails() {
        let result = SystemTerminator.terminate(2_000_000_000).await;
        assert!(matches!(result, Err(DownloadError::ExecutionError(_))));
    }
}
