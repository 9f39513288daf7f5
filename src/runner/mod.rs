use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::output;

#[derive(thiserror::Error, Debug)]
pub enum RunnerError {
    #[error("`{program}` is not installed or not on PATH")]
    NotFound { program: String },

    #[error("Failed to start command: {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read output of command: {command}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {} ({})", .command, exit_label(.code))]
    Failed { command: String, code: Option<i32> },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit {}", code),
        None => "killed by signal".to_string(),
    }
}

/// Run `command` through `sh -c` inside `dir`, echoing its output as it arrives.
///
/// Returns everything the command printed on stdout and stderr, interleaved in
/// the order the lines were read.
pub async fn capture(command: &str, dir: &Path) -> Result<String, RunnerError> {
    if let Some(program) = program_name(command) {
        if which::which_in(program, std::env::var_os("PATH"), dir).is_err() {
            return Err(RunnerError::NotFound {
                program: program.to_string(),
            });
        }
    }

    output::command(command);
    debug!("running in {}", dir.display());

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RunnerError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let io_error = |source: std::io::Error| RunnerError::Io {
        command: command.to_string(),
        source,
    };

    // Both handles were requested as piped above.
    let stdout = child.stdout.take().ok_or_else(|| io_error(missing_pipe()))?;
    let stderr = child.stderr.take().ok_or_else(|| io_error(missing_pipe()))?;

    let captured = drain(stdout, stderr).await.map_err(io_error)?;

    let status = child.wait().await.map_err(io_error)?;
    debug!("command exited with {}", status);

    if !status.success() {
        return Err(RunnerError::Failed {
            command: command.to_string(),
            code: status.code(),
        });
    }

    Ok(captured)
}

/// First word of `command` after any leading `NAME=value` assignments.
fn program_name(command: &str) -> Option<&str> {
    command
        .split_whitespace()
        .find(|word| !is_assignment(word))
}

fn is_assignment(word: &str) -> bool {
    match word.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && !name.starts_with(|c: char| c.is_ascii_digit())
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

fn missing_pipe() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "child pipe was not captured")
}

/// Read both streams to EOF, mirroring each line to the matching terminal stream.
async fn drain<O, E>(stdout: O, stderr: E) -> std::io::Result<String>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out_lines = BufReader::new(stdout).split(b'\n');
    let mut err_lines = BufReader::new(stderr).split(b'\n');
    let mut out_open = true;
    let mut err_open = true;
    let mut captured = String::new();

    while out_open || err_open {
        tokio::select! {
            line = out_lines.next_segment(), if out_open => match line? {
                Some(line) => {
                    let line = String::from_utf8_lossy(&line);
                    let mut term = std::io::stdout().lock();
                    writeln!(term, "{}", line)?;
                    term.flush()?;
                    captured.push_str(&line);
                    captured.push('\n');
                }
                None => out_open = false,
            },
            line = err_lines.next_segment(), if err_open => match line? {
                Some(line) => {
                    let line = String::from_utf8_lossy(&line);
                    let mut term = std::io::stderr().lock();
                    writeln!(term, "{}", line)?;
                    term.flush()?;
                    captured.push_str(&line);
                    captured.push('\n');
                }
                None => err_open = false,
            },
        }
    }

    Ok(captured)
}

#[cfg(test)]
mod tests {
    use super::{capture, program_name, RunnerError};
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();

        let captured = capture("echo Outputs: && echo 'dev.key = value' 1>&2", dir.path())
            .await
            .unwrap();

        assert!(captured.contains("Outputs:\n"));
        assert!(captured.contains("dev.key = value\n"));
    }

    #[tokio::test]
    async fn runs_in_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("transcript.txt"), "Outputs:\ndev.a = 1\n").unwrap();

        let captured = capture("cat transcript.txt", dir.path()).await.unwrap();

        assert_eq!(captured, "Outputs:\ndev.a = 1\n");
    }

    #[tokio::test]
    async fn keeps_final_line_without_newline() {
        let dir = tempfile::tempdir().unwrap();

        let captured = capture("printf 'a\\nb'", dir.path()).await.unwrap();

        assert_eq!(captured, "a\nb\n");
    }

    #[tokio::test]
    async fn reports_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();

        let err = capture("false", dir.path()).await.unwrap_err();

        match &err {
            RunnerError::Failed { command, code } => {
                assert_eq!(command, "false");
                assert_eq!(*code, Some(1));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert!(err.to_string().starts_with("Command failed: false"));
    }

    #[tokio::test]
    async fn reports_missing_program() {
        let dir = tempfile::tempdir().unwrap();

        let err = capture("cdkdeploy-no-such-program deploy", dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, RunnerError::NotFound { ref program } if program == "cdkdeploy-no-such-program"));
    }

    #[tokio::test]
    async fn reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();

        let err = capture("true", &dir.path().join("nope")).await.unwrap_err();

        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[test]
    fn program_name_skips_env_assignments() {
        assert_eq!(program_name("cdk deploy dev"), Some("cdk"));
        assert_eq!(
            program_name("AWS_PROFILE=dev CDK_DEBUG=1 cdk deploy dev"),
            Some("cdk")
        );
        assert_eq!(
            program_name("./node_modules/.bin/cdk deploy dev"),
            Some("./node_modules/.bin/cdk")
        );
        assert_eq!(program_name("AWS_PROFILE=dev"), None);
    }

    #[tokio::test]
    async fn runs_with_env_prefix() {
        let dir = tempfile::tempdir().unwrap();

        let captured = capture("STAGE_NAME=dev sh -c 'echo $STAGE_NAME'", dir.path())
            .await
            .unwrap();

        assert_eq!(captured, "dev\n");
    }

    #[tokio::test]
    async fn resolves_relative_program_against_dir() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-cdk");
        std::fs::write(&script, "#!/bin/sh\necho \"Outputs:\"\necho \"$1.key = value\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let captured = capture("./fake-cdk dev", dir.path()).await.unwrap();

        assert_eq!(captured, "Outputs:\ndev.key = value\n");
    }

    #[tokio::test]
    async fn dropping_capture_kills_command() {
        let dir = tempfile::tempdir().unwrap();

        let run = capture("sleep 1 && touch finished", dir.path());
        assert!(tokio::time::timeout(Duration::from_millis(200), run)
            .await
            .is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!dir.path().join("finished").exists());
    }
}
