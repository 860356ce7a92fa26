use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::app::error::AppError;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn lines(&self) -> Vec<String> {
        self.stdout.lines().map(str::to_string).collect()
    }
}

/// Runs an external program and captures its output once it exits.
pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
        cancel_flag: Option<&AtomicBool>,
        trace_id: &str,
    ) -> Result<CommandOutput, AppError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl CommandExecutor for ProcessExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
        cancel_flag: Option<&AtomicBool>,
        trace_id: &str,
    ) -> Result<CommandOutput, AppError> {
        run_command_cancellable(program, args, timeout, cancel_flag, trace_id)
    }
}

pub fn run_command_cancellable(
    program: &str,
    args: &[String],
    timeout: Duration,
    cancel_flag: Option<&AtomicBool>,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    // Own process group, so a kill also reaches anything the child forked.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let mut child = command
        .spawn()
        .map_err(|err| AppError::dependency(format!("Failed to spawn command: {err}"), trace_id))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;

    let stdout_handle = std::thread::spawn(move || drain(stdout));
    let stderr_handle = std::thread::spawn(move || drain(stderr));

    let start = Instant::now();
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                let cancelled = cancel_flag
                    .map(|flag| flag.load(Ordering::SeqCst))
                    .unwrap_or(false);
                if cancelled || start.elapsed() > timeout {
                    kill_tree(&mut child);
                    let _ = child.wait();
                    // A grandchild may still hold the pipes open; the drain threads finish
                    // on their own once it exits.
                    drop(stdout_handle);
                    drop(stderr_handle);
                    if cancelled {
                        return Err(AppError::cancelled("Command cancelled", trace_id));
                    }
                    return Err(AppError::timeout(
                        format!("Command timed out after {}s", timeout.as_secs()),
                        trace_id,
                    ));
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(err) => {
                kill_tree(&mut child);
                drop(stdout_handle);
                drop(stderr_handle);
                return Err(AppError::system(
                    format!("Failed to poll command: {err}"),
                    trace_id,
                ));
            }
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
    })
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: plain signal send to the group created at spawn; no memory is touched.
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

fn drain(mut reader: impl Read) -> Vec<u8> {
    let mut buffer = Vec::<u8>::new();
    let mut temp = [0u8; 4096];
    loop {
        match reader.read(&mut temp) {
            Ok(0) => break,
            Ok(count) => buffer.extend_from_slice(&temp[..count]),
            Err(_) => break,
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> (String, Vec<String>) {
        if cfg!(windows) {
            ("cmd.exe".to_string(), vec!["/C".to_string(), script.to_string()])
        } else {
            ("sh".to_string(), vec!["-c".to_string(), script.to_string()])
        }
    }

    fn run(
        program: &str,
        args: &[String],
        timeout: Duration,
        trace_id: &str,
    ) -> Result<CommandOutput, AppError> {
        run_command_cancellable(program, args, timeout, None, trace_id)
    }

    #[test]
    fn large_stdout_does_not_deadlock() {
        // Regression: undrained pipes block the child once the buffer fills.
        let trace_id = "test-trace-large-output";
        let (program, args) = if cfg!(windows) {
            shell("for /L %i in (1,1,100000) do @echo 1234567890")
        } else {
            shell("i=0; while [ $i -lt 100000 ]; do echo 1234567890; i=$((i+1)); done")
        };

        let output = run(&program, &args, Duration::from_secs(10), trace_id)
            .expect("expected large-output command to complete without timing out");

        assert_eq!(output.exit_code, Some(0));
        assert!(output.stdout.len() >= 1_000_000);
    }

    #[cfg(unix)]
    #[test]
    fn splits_stdout_into_lines() {
        let (program, args) = shell("printf 'header\\nfirst\\tdevice\\n\\n'");
        let output = run(&program, &args, Duration::from_secs(5), "trace")
            .expect("run");
        assert_eq!(output.lines(), vec!["header", "first\tdevice", ""]);
    }

    #[cfg(unix)]
    #[test]
    fn kills_command_after_timeout() {
        let (program, args) = shell("sleep 30");
        let started = Instant::now();
        let err = run(&program, &args, Duration::from_millis(200), "trace-t")
            .expect_err("expected timeout");
        assert_eq!(err.code, "ERR_TIMEOUT");
        assert_eq!(err.trace_id, "trace-t");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_does_not_wait_for_forked_grandchild() {
        // The shell forks `sleep` and keeps the pipes shared with it.
        let (program, args) = shell("sleep 6; echo done");
        let started = Instant::now();
        let err = run(&program, &args, Duration::from_millis(200), "trace-g")
            .expect_err("expected timeout");
        assert_eq!(err.code, "ERR_TIMEOUT");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn cancel_does_not_wait_for_forked_grandchild() {
        let (program, args) = shell("sleep 6; echo done");
        let flag = AtomicBool::new(false);
        let started = Instant::now();
        let err = std::thread::scope(|scope| {
            scope.spawn(|| {
                std::thread::sleep(Duration::from_millis(200));
                flag.store(true, Ordering::SeqCst);
            });
            run_command_cancellable(&program, &args, Duration::from_secs(30), Some(&flag), "trace")
        })
        .expect_err("expected cancellation");
        assert_eq!(err.code, "ERR_CANCELLED");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn raised_cancel_flag_stops_command() {
        let (program, args) = shell("sleep 30");
        let flag = AtomicBool::new(true);
        let err =
            run_command_cancellable(&program, &args, Duration::from_secs(30), Some(&flag), "trace")
                .expect_err("expected cancellation");
        assert_eq!(err.code, "ERR_CANCELLED");
    }

    #[test]
    fn missing_program_is_a_dependency_error() {
        let err = run(
            "/this/path/should/not/exist/adb",
            &[],
            Duration::from_secs(1),
            "trace",
        )
        .expect_err("spawn failure");
        assert_eq!(err.code, "ERR_DEPENDENCY");
    }
}
