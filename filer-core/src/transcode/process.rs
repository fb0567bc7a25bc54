use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::TranscodeError;

/// What an external tool left behind: its stdout, its stderr as text, and
/// the failure if it did not exit cleanly.
#[derive(Debug, Default)]
pub(crate) struct Finished {
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub error: Option<TranscodeError>,
}

/// Runs `cmd` to completion, killing it once `limit` elapses.
pub(crate) async fn run_bounded(mut cmd: Command, program: &str, limit: Duration) -> Finished {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(command = ?cmd, "spawning");

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            return Finished {
                error: Some(TranscodeError::Spawn {
                    program: program.to_string(),
                    source,
                }),
                ..Finished::default()
            };
        }
    };

    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let error = (!output.status.success()).then(|| TranscodeError::Exit {
                program: program.to_string(),
                code: output.status.code().unwrap_or(-1),
            });
            Finished {
                stdout: output.stdout,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                error,
            }
        }
        Ok(Err(source)) => Finished {
            error: Some(TranscodeError::Wait {
                program: program.to_string(),
                source,
            }),
            ..Finished::default()
        },
        // Dropping the wait future drops the child, which kills it.
        Err(_) => Finished {
            error: Some(TranscodeError::TimedOut {
                program: program.to_string(),
                after: limit,
            }),
            ..Finished::default()
        },
    }
}
