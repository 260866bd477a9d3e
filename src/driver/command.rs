//! Mount-time command execution
//!
//! The `cmd` option of a volume is run when the volume is mounted. The command
//! line is split naively on single spaces: there is no shell quoting, so an
//! argument containing a space cannot be expressed. Scripts that need quoting
//! should be wrapped in an executable file.
//!
//! The child inherits the daemon environment plus:
//!
//! - `VOLMEX_NAME`: volume name
//! - `VOLMEX_MOUNTPOINT`: volume mountpoint
//! - `VOLMEX_CMD`: the trimmed command line

use std::io::{self, PipeReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::errors::{Result, VolmexError};
use crate::registry::VolumeRecord;

/// Environment variable carrying the volume name
pub const ENV_NAME: &str = "VOLMEX_NAME";
/// Environment variable carrying the volume mountpoint
pub const ENV_MOUNTPOINT: &str = "VOLMEX_MOUNTPOINT";
/// Environment variable carrying the command line itself
pub const ENV_CMD: &str = "VOLMEX_CMD";

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long output is still drained after a command was killed
const KILL_GRACE: Duration = Duration::from_millis(200);

/// A parsed mount command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountCommand {
    /// Trimmed command line
    pub line: String,
    /// Program to execute
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
}

/// Result of a successful mount command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Combined stdout and stderr
    pub output: String,
    /// Execution time in milliseconds
    pub exec_time_ms: u64,
}

impl MountCommand {
    /// Split a command line into program and arguments.
    ///
    /// Consecutive spaces produce empty arguments.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Err(VolmexError::MissingCommand);
        }

        let mut parts = line.split(' ').map(str::to_string);
        let program = parts.next().unwrap_or_default();

        Ok(Self {
            line: line.to_string(),
            program,
            args: parts.collect(),
        })
    }

    /// Environment entries handed to the child for `record`
    pub fn env(&self, record: &VolumeRecord) -> Vec<(String, String)> {
        vec![
            (ENV_NAME.to_string(), record.name.clone()),
            (ENV_MOUNTPOINT.to_string(), record.mountpoint.clone()),
            (ENV_CMD.to_string(), self.line.clone()),
        ]
    }

    /// Run the command for `record`, waiting at most `timeout` if given
    pub fn run(&self, record: &VolumeRecord, timeout: Option<Duration>) -> Result<CommandOutput> {
        debug!("Running mount command for {}: {:?}", record.name, self.line);

        let (reader, writer) = io::pipe().map_err(|e| spawn_failed(&e))?;
        let stderr_writer = writer.try_clone().map_err(|e| spawn_failed(&e))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env(record))
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer);

        let start = Instant::now();
        let deadline = timeout.map(|t| start + t);
        let mut child = command.spawn().map_err(|e| spawn_failed(&e))?;
        // The command still owns the write ends; the reader only sees EOF once
        // they are gone.
        drop(command);

        let chunks = stream_output(reader);

        let status = match wait_for_child(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let (output, _) = collect_output(&chunks, Some(Instant::now() + KILL_GRACE));
                warn!(
                    "Mount command for {} killed after {:?}",
                    record.name,
                    timeout.unwrap_or_default()
                );
                return Err(timed_out(timeout, output));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let (output, _) = collect_output(&chunks, Some(Instant::now() + KILL_GRACE));
                return Err(VolmexError::CommandFailed {
                    reason: format!("wait failed: {}", e),
                    output,
                });
            }
        };

        // Background processes started by the command may still hold the pipe.
        let (output, complete) = collect_output(&chunks, deadline);
        if !complete {
            warn!(
                "Mount command for {} left its output open past {:?}",
                record.name,
                timeout.unwrap_or_default()
            );
            return Err(timed_out(timeout, output));
        }
        let exec_time_ms = start.elapsed().as_millis() as u64;

        if !status.success() {
            return Err(VolmexError::CommandFailed {
                reason: status.to_string(),
                output,
            });
        }

        Ok(CommandOutput {
            output,
            exec_time_ms,
        })
    }
}

/// Forward everything read from `reader` as chunks until EOF.
///
/// The thread is detached: it ends at EOF or once the receiver is dropped and
/// the next read returns.
fn stream_output(mut reader: PipeReader) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
    rx
}

/// Gather output until EOF or `deadline`; the flag is false if the deadline hit
fn collect_output(chunks: &Receiver<Vec<u8>>, deadline: Option<Instant>) -> (String, bool) {
    let mut buf = Vec::new();
    let complete = loop {
        let next = match deadline {
            Some(deadline) => {
                chunks.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => chunks.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(chunk) => buf.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break true,
            Err(RecvTimeoutError::Timeout) => break false,
        }
    };
    (String::from_utf8_lossy(&buf).trim_end().to_string(), complete)
}

fn timed_out(timeout: Option<Duration>, output: String) -> VolmexError {
    VolmexError::CommandFailed {
        reason: format!("timed out after {:?}", timeout.unwrap_or_default()),
        output,
    }
}

fn spawn_failed(e: &io::Error) -> VolmexError {
    VolmexError::CommandFailed {
        reason: "spawn failed".to_string(),
        output: e.to_string(),
    }
}

/// Wait for the child; `Ok(None)` means it was killed at the deadline
fn wait_for_child(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::VolumeOptions;

    fn record(name: &str, mountpoint: &str) -> VolumeRecord {
        VolumeRecord::new(name, mountpoint, VolumeOptions::new())
    }

    #[test]
    fn parse_trims_and_splits_on_spaces() {
        let cmd = MountCommand::parse("  mount -t nfs host:/export  ").unwrap();
        assert_eq!(cmd.line, "mount -t nfs host:/export");
        assert_eq!(cmd.program, "mount");
        assert_eq!(cmd.args, vec!["-t", "nfs", "host:/export"]);
    }

    #[test]
    fn parse_does_not_honour_quotes() {
        let cmd = MountCommand::parse("echo \"a b\"").unwrap();
        assert_eq!(cmd.args, vec!["\"a", "b\""]);
    }

    #[test]
    fn parse_keeps_empty_arguments() {
        let cmd = MountCommand::parse("echo a  b").unwrap();
        assert_eq!(cmd.args, vec!["a", "", "b"]);
    }

    #[test]
    fn parse_rejects_blank_line() {
        assert!(matches!(
            MountCommand::parse("   "),
            Err(VolmexError::MissingCommand)
        ));
    }

    #[test]
    fn env_uses_stable_names() {
        let cmd = MountCommand::parse(" echo hi ").unwrap();
        let env = cmd.env(&record("foo", "/m/foo"));
        assert_eq!(
            env,
            vec![
                ("VOLMEX_NAME".to_string(), "foo".to_string()),
                ("VOLMEX_MOUNTPOINT".to_string(), "/m/foo".to_string()),
                ("VOLMEX_CMD".to_string(), "echo hi".to_string()),
            ]
        );
    }

    #[test]
    fn run_captures_output() {
        let cmd = MountCommand::parse("echo hi").unwrap();
        let result = cmd.run(&record("foo", "/m/foo"), None).unwrap();
        assert_eq!(result.output, "hi");
    }

    #[test]
    fn run_exports_volume_environment() {
        let cmd = MountCommand::parse("env").unwrap();
        let result = cmd.run(&record("foo", "/m/foo"), None).unwrap();
        assert!(result.output.contains("VOLMEX_NAME=foo"));
        assert!(result.output.contains("VOLMEX_MOUNTPOINT=/m/foo"));
        assert!(result.output.contains("VOLMEX_CMD=env"));
    }

    #[test]
    fn run_missing_executable_fails() {
        let cmd = MountCommand::parse("/definitely/not/here --flag").unwrap();
        let err = cmd.run(&record("foo", "/m/foo"), None).unwrap_err();
        match err {
            VolmexError::CommandFailed { reason, .. } => assert_eq!(reason, "spawn failed"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn run_nonzero_exit_carries_combined_output() {
        let cmd = MountCommand::parse("ls /definitely/not/here").unwrap();
        let err = cmd.run(&record("foo", "/m/foo"), None).unwrap_err();
        match err {
            VolmexError::CommandFailed { reason, output } => {
                assert!(reason.contains("exit status"));
                assert!(output.contains("/definitely/not/here"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn run_kills_command_at_timeout() {
        let cmd = MountCommand::parse("sleep 5").unwrap();
        let start = Instant::now();
        let err = cmd
            .run(&record("foo", "/m/foo"), Some(Duration::from_millis(100)))
            .unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(4));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn run_within_timeout_succeeds() {
        let cmd = MountCommand::parse("true").unwrap();
        assert!(
            cmd.run(&record("foo", "/m/foo"), Some(Duration::from_secs(5)))
                .is_ok()
        );
    }

    fn script(dir: &tempfile::TempDir, body: &str) -> MountCommand {
        let path = dir.path().join("mount.sh");
        std::fs::write(&path, body).unwrap();
        MountCommand::parse(&format!("sh {}", path.display())).unwrap()
    }

    #[test]
    fn run_keeps_partial_output_when_killed() {
        let tmp = tempfile::tempdir().unwrap();
        let cmd = script(&tmp, "echo partial\nsleep 5\n");
        let err = cmd
            .run(&record("foo", "/m/foo"), Some(Duration::from_millis(300)))
            .unwrap_err();

        match err {
            VolmexError::CommandFailed { reason, output } => {
                assert!(reason.starts_with("timed out"));
                assert_eq!(output, "partial");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn run_timeout_bounds_background_output_holders() {
        let tmp = tempfile::tempdir().unwrap();
        let cmd = script(&tmp, "sleep 4 &\necho started\n");
        let start = Instant::now();
        let err = cmd
            .run(&record("bg", "/m/bg"), Some(Duration::from_millis(500)))
            .unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(2));
        match err {
            VolmexError::CommandFailed { reason, output } => {
                assert!(reason.starts_with("timed out"));
                assert_eq!(output, "started");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn run_without_timeout_waits_for_background_output() {
        let tmp = tempfile::tempdir().unwrap();
        let cmd = script(&tmp, "(sleep 0.3; echo late) &\necho early\n");
        let result = cmd.run(&record("bg", "/m/bg"), None).unwrap();
        assert_eq!(result.output, "early\nlate");
    }
}
