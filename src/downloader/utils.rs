// Helper functions shared by the yt-dlp and ffmpeg drivers

use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration as TokioDuration};

use super::errors::DownloadError;

fn spawn_piped(program: &str, args: &[String]) -> Result<tokio::process::Child, DownloadError> {
    TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DownloadError::ToolNotFound(program.to_string()),
            _ => DownloadError::ExecutionError(format!("Failed to start {}: {}", program, e)),
        })
}

fn take_pipe<T>(pipe: Option<T>, program: &str, name: &str) -> Result<T, DownloadError> {
    pipe.ok_or_else(|| DownloadError::ExecutionError(format!("Failed to capture {} from {}", name, program)))
}

fn collect_pipe<R>(mut pipe: R) -> tokio::task::JoinHandle<std::io::Result<Vec<u8>>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).await.map(|_| buf)
    })
}

/// Run command with timeout, collecting stdout and stderr
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = spawn_piped(program, &args)?;
    let stdout_pipe = take_pipe(child.stdout.take(), program, "stdout")?;
    let stderr_pipe = take_pipe(child.stderr.take(), program, "stderr")?;

    let stdout_task = collect_pipe(stdout_pipe);
    let stderr_task = collect_pipe(stderr_pipe);

    let waited = timeout(TokioDuration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res.map_err(|e| {
                DownloadError::ExecutionError(format!("Failed to wait for {}: {}", program, e))
            })?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Timeout(format!(
                "{} did not finish within {}s",
                program, timeout_secs
            )))
        }
    }
}

/// Like `run_output_with_timeout`, but hands each stdout line to `on_line`
/// as it arrives. The returned output still carries the full stdout.
pub async fn run_streaming_with_timeout<F>(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
    mut on_line: F,
) -> Result<std::process::Output, DownloadError>
where
    F: FnMut(&str),
{
    let mut child = spawn_piped(program, &args)?;
    let stdout_pipe = take_pipe(child.stdout.take(), program, "stdout")?;
    let stderr_pipe = take_pipe(child.stderr.take(), program, "stderr")?;
    let stderr_task = collect_pipe(stderr_pipe);

    let work = async {
        let mut reader = BufReader::new(stdout_pipe);
        let mut stdout = Vec::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(|e| DownloadError::ExecutionError(format!("Failed to read stdout: {}", e)))?;
            if read == 0 {
                break;
            }
            stdout.extend_from_slice(&line);
            on_line(String::from_utf8_lossy(&line).trim_end());
        }
        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::ExecutionError(format!("Failed to wait for {}: {}", program, e)))?;
        Ok::<_, DownloadError>((status, stdout))
    };

    let waited = timeout(TokioDuration::from_secs(timeout_secs), work).await;
    match waited {
        Ok(result) => {
            let (status, stdout) = result?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stderr_task.abort();
            Err(DownloadError::Timeout(format!(
                "{} did not finish within {}s",
                program, timeout_secs
            )))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::ExecutionError(format!("{} task failed: {}", name, e)))?
        .map_err(|e| DownloadError::ExecutionError(format!("Failed to read {}: {}", name, e)))
}

/// Locate an executable: explicit override, common install paths, then PATH
pub fn find_tool(binary_name: &str, override_path: Option<&str>) -> String {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        return path.to_string();
    }

    let common_paths = [
        format!("/opt/homebrew/bin/{}", binary_name), // Homebrew on Apple Silicon
        format!("/usr/local/bin/{}", binary_name),    // Homebrew on Intel Mac
        format!("/usr/bin/{}", binary_name),          // System installation
    ];

    for path in common_paths {
        if Path::new(&path).exists() {
            return path;
        }
    }

    if let Ok(output) = StdCommand::new("which").arg(binary_name).output() {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }

    // Last resort: hope it's in PATH
    binary_name.to_string()
}

/// Files in `dir` whose name embeds `[id]` and ends in one of `exts`
pub fn find_outputs(dir: &Path, id: &str, exts: &[&str]) -> Vec<PathBuf> {
    let token = format!("[{}]", id);
    let mut matches: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
                let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
                name.contains(&token) && exts.iter().any(|x| x.eq_ignore_ascii_case(ext))
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    matches.sort();
    matches
}

/// Seconds with millisecond precision, as ffmpeg and logs expect
pub fn format_seconds(d: std::time::Duration) -> String {
    format!("{:.3}", d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tool_prefers_override() {
        assert_eq!(find_tool("yt-dlp", Some("/custom/yt-dlp")), "/custom/yt-dlp");
    }

    #[test]
    fn test_find_outputs_matches_bracketed_id() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "Song [dQw4w9WgXcQ].en.vtt",
            "Song [dQw4w9WgXcQ].m4a",
            "Other [aaaaaaaaaaa].en.vtt",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let found = find_outputs(dir.path(), "dQw4w9WgXcQ", &["vtt", "srt"]);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("Song [dQw4w9WgXcQ].en.vtt"));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(std::time::Duration::from_millis(90_500)), "90.500");
    }

    #[tokio::test]
    async fn test_streaming_sees_lines_in_order() {
        let mut seen = Vec::new();
        let output = run_streaming_with_timeout(
            "sh",
            vec!["-c".to_string(), "echo one; echo two >&2; echo three".to_string()],
            5,
            |line| seen.push(line.to_string()),
        )
        .await
        .unwrap();

        assert!(output.status.success());
        assert_eq!(seen, vec!["one", "three"]);
        assert_eq!(output.stdout, b"one\nthree\n");
        assert_eq!(output.stderr, b"two\n");
    }

    #[tokio::test]
    async fn test_streaming_times_out() {
        let result = run_streaming_with_timeout("sh", vec!["-c".to_string(), "sleep 5".to_string()], 1, |_| {}).await;
        assert!(matches!(result, Err(DownloadError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_not_found() {
        let result = run_output_with_timeout("definitely-not-a-real-binary-xyz", vec![], 5).await;
        assert!(matches!(result, Err(DownloadError::ToolNotFound(_))));
    }
}
