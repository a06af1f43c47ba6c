//! Running a command while holding a lock.
//!
//! The child is a separate process with inherited stdio. The lock is
//! released on every exit path: normal exit, non-zero exit, spawn failure,
//! lease loss, or shutdown.

use crate::context::LockContext;
use crate::error::{LockError, Result};
use crate::exit_codes;
use crate::locks::HeldLock;
use std::io::Write;
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::Duration;

/// How often the child is polled while the lease is monitored.
const CHILD_POLL: Duration = Duration::from_millis(100);

/// A command and its arguments, copied once at entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Build from an argv-style list; `None` if it is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let words = std::iter::once(&self.program).chain(&self.args);
        write!(f, "{}", shell_words::join(words))
    }
}

/// How the supervised child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// Exited normally with this status.
    Code(i32),
    /// Killed by this signal.
    Signal(i32),
}

impl ChildExit {
    pub fn is_success(&self) -> bool {
        matches!(self, ChildExit::Code(0))
    }

    /// Status to exit nfslock with.
    pub fn exit_status(&self) -> i32 {
        match *self {
            ChildExit::Code(code) => code,
            ChildExit::Signal(signal) => exit_codes::for_signal(signal),
        }
    }
}

impl From<ExitStatus> for ChildExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ChildExit::Signal(signal);
            }
        }
        ChildExit::Code(status.code().unwrap_or(exit_codes::FAILURE))
    }
}

impl std::fmt::Display for ChildExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildExit::Code(code) => write!(f, "exit status {}", code),
            ChildExit::Signal(signal) => write!(f, "signal {}", signal),
        }
    }
}

/// Run `command` while `lock` is held, then release the lock.
///
/// The lock's refresher (if any) keeps running while the child does. If the
/// lease is lost the child is killed.
///
/// # Returns
///
/// * `Ok(ChildExit)` - The child ran to completion (successfully or not)
/// * `Err(LockError::Spawn)` - The command could not be started
/// * `Err(LockError::LeaseLost)` - The lock was lost while the child ran
/// * `Err(LockError::Interrupted)` - Shutdown requested while the child ran
pub fn run_under_lock(
    ctx: &LockContext,
    lock: HeldLock,
    command: &CommandLine,
) -> Result<ChildExit> {
    flush_output();

    tracing::info!(
        lock = %lock.path().display(),
        command = %command,
        "running command under lock"
    );

    let mut child = match Command::new(&command.program).args(&command.args).spawn() {
        Ok(child) => child,
        Err(source) => {
            if let Err(e) = lock.release() {
                tracing::warn!(error = %e, "failed to release lock");
            }
            return Err(LockError::Spawn {
                program: command.program.clone(),
                source,
            });
        }
    };

    let waited = wait_for_child(ctx, &lock, &mut child);
    let released = lock.release();
    let exit = waited?;
    released?;

    if exit.is_success() {
        tracing::debug!(command = %command, "command succeeded");
    } else {
        report_failure(command, &exit);
    }
    Ok(exit)
}

/// Print the notice that distinguishes a failed command from nfslock's own
/// failures.
fn report_failure(command: &CommandLine, exit: &ChildExit) {
    eprintln!("nfslock: command '{}' failed with {}", command, exit);
}

fn flush_output() {
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
}

fn wait_for_child(ctx: &LockContext, lock: &HeldLock, child: &mut Child) -> Result<ChildExit> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status.into()),
            Ok(None) => {
                if lock.lease_lost() {
                    tracing::error!(pid = child.id(), "lease lost; killing command");
                    kill_process(child);
                    return Err(LockError::LeaseLost(lock.path().to_path_buf()));
                }
                if ctx.shutdown.is_requested() {
                    tracing::warn!(pid = child.id(), "shutdown requested; killing command");
                    kill_process(child);
                    return Err(LockError::Interrupted);
                }
                thread::sleep(CHILD_POLL);
            }
            Err(e) => {
                kill_process(child);
                return Err(LockError::io("failed to check command status", e));
            }
        }
    }
}

/// Kill a process and wait for it to terminate.
fn kill_process(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::{Config, PollPolicy, RetryPolicy};
    use crate::locks::acquire;
    use std::path::Path;
    use std::time::Instant;
    use tempfile::TempDir;

    fn sh(script: &str) -> CommandLine {
        CommandLine::from_argv(&["sh".to_string(), "-c".to_string(), script.to_string()])
            .unwrap()
    }

    fn take_lock(ctx: &LockContext, path: &Path) -> HeldLock {
        let retry = RetryPolicy {
            retries: Some(0),
            sleep_inc: Duration::ZERO,
            min_sleep: Duration::ZERO,
            max_sleep: Duration::ZERO,
            suspend: Duration::ZERO,
            timeout: None,
            poll: PollPolicy {
                retries: 0,
                max_sleep: Duration::ZERO,
            },
        };
        acquire(ctx, path, &retry, &ctx.config.lease_policy()).unwrap()
    }

    #[test]
    fn command_line_requires_a_program() {
        assert!(CommandLine::from_argv(&[]).is_none());
        let cmd = CommandLine::from_argv(&["echo".to_string(), "a b".to_string()]).unwrap();
        assert_eq!(cmd.program, "echo");
        assert_eq!(cmd.to_string(), "echo 'a b'");
    }

    #[test]
    fn child_exit_statuses() {
        assert!(ChildExit::Code(0).is_success());
        assert!(!ChildExit::Code(7).is_success());
        assert_eq!(ChildExit::Code(7).exit_status(), 7);
        assert_eq!(ChildExit::Signal(9).exit_status(), 137);
        assert_eq!(ChildExit::Signal(9).to_string(), "signal 9");
    }

    #[test]
    fn successful_command_releases_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.lock");
        let ctx = LockContext::new(Config::default());
        let lock = take_lock(&ctx, &path);

        let exit = run_under_lock(&ctx, lock, &sh("true")).unwrap();

        assert_eq!(exit, ChildExit::Code(0));
        assert!(!path.exists());
    }

    #[test]
    fn failing_command_reports_status_and_releases_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.lock");
        let ctx = LockContext::new(Config::default());
        let lock = take_lock(&ctx, &path);

        let exit = run_under_lock(&ctx, lock, &sh("exit 7")).unwrap();

        assert_eq!(exit, ChildExit::Code(7));
        assert!(!path.exists());
    }

    #[test]
    fn command_sees_the_lock_while_running() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.lock");
        let ctx = LockContext::new(Config::default());
        let lock = take_lock(&ctx, &path);

        let script = format!("test -f '{}'", path.display());
        let exit = run_under_lock(&ctx, lock, &sh(&script)).unwrap();

        assert!(exit.is_success());
    }

    #[test]
    fn signalled_command_is_distinguished() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.lock");
        let ctx = LockContext::new(Config::default());
        let lock = take_lock(&ctx, &path);

        let exit = run_under_lock(&ctx, lock, &sh("kill -9 $$")).unwrap();

        assert_eq!(exit, ChildExit::Signal(9));
        assert_eq!(exit.exit_status(), 137);
        assert!(!path.exists());
    }

    #[test]
    fn spawn_failure_releases_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.lock");
        let ctx = LockContext::new(Config::default());
        let lock = take_lock(&ctx, &path);
        let cmd = CommandLine::from_argv(&["/nonexistent/nfslock-test-binary".to_string()])
            .unwrap();

        let err = run_under_lock(&ctx, lock, &cmd).unwrap_err();

        assert!(matches!(err, LockError::Spawn { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn lost_lease_kills_command() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.lock");
        let ctx = LockContext::new(Config::default());
        let mut lock = take_lock(&ctx, &path);
        lock.start_refresher(Duration::from_millis(50)).unwrap();

        let remover_path = path.clone();
        let remover = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            std::fs::remove_file(remover_path).unwrap();
        });

        let start = Instant::now();
        let err = run_under_lock(&ctx, lock, &sh("sleep 30")).unwrap_err();
        remover.join().unwrap();

        assert!(matches!(err, LockError::LeaseLost(_)));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn shutdown_kills_command_and_releases_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.lock");
        let ctx = LockContext::new(Config::default());
        let lock = take_lock(&ctx, &path);

        let flag = ctx.shutdown.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            flag.request();
        });

        let err = run_under_lock(&ctx, lock, &sh("sleep 30")).unwrap_err();
        stopper.join().unwrap();

        assert!(matches!(err, LockError::Interrupted));
        assert!(!path.exists());
    }
}
