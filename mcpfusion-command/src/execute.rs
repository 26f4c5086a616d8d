//! Launch, timeout enforcement and output capture.
//!
//! Graceful-then-forceful termination reuses
//! `mcpfusion_resilience::shutdown::ProcessShutdownManager`, which already
//! implements "SIGTERM, wait, SIGKILL" for this workspace.

use crate::error::CommandError;
use crate::invocation::ComposedInvocation;
use mcpfusion_config::domains::command::CommandGroupConfig;
use mcpfusion_resilience::shutdown::ProcessShutdownManager;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failed,
    TimedOut,
}

#[derive(Debug)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub error: Option<String>,
}

/// Runs one command invocation end-to-end: launches per `config`'s control
/// fields, feeds `invocation.stdin`, enforces `config.timeout_seconds` with
/// `config.kill_grace_seconds` grace, and captures output per the capture
/// flags.
pub async fn run(config: &CommandGroupConfig, invocation: &ComposedInvocation) -> Result<ExecutionOutcome, CommandError> {
    let mut command = build_command(config, invocation)?;
    command.stdin(Stdio::piped());
    command.stdout(if config.capture_stdout { Stdio::piped() } else { Stdio::null() });
    command.stderr(if config.capture_stderr { Stdio::piped() } else { Stdio::null() });

    let started = Instant::now();
    let mut child = command
        .spawn()
        .map_err(|err| CommandError::Spawn(err.to_string()))?;

    if let Some(stdin) = invocation.stdin.as_ref() {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(stdin.as_bytes())
                .await
                .map_err(|err| CommandError::Spawn(format!("writing stdin: {err}")))?;
        }
    } else {
        child.stdin.take();
    }

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let timeout = if config.timeout_seconds == 0 {
        None
    } else {
        Some(Duration::from_secs(config.timeout_seconds))
    };

    let wait_result = match timeout {
        Some(duration) => tokio::time::timeout(duration, child.wait()).await,
        None => Ok(child.wait().await),
    };

    match wait_result {
        Ok(Ok(exit_status)) => {
            let stdout = drain(&mut stdout_pipe).await;
            let stderr = drain(&mut stderr_pipe).await;
            Ok(ExecutionOutcome {
                status: if exit_status.success() { ExecutionStatus::Success } else { ExecutionStatus::Failed },
                exit_code: exit_status.code(),
                elapsed: started.elapsed(),
                stdout,
                stderr,
                error: None,
            })
        }
        Ok(Err(err)) => Err(CommandError::Wait(err.to_string())),
        Err(_) => {
            tracing::warn!(executable = %config.executable, timeout_seconds = config.timeout_seconds, "command timed out, terminating");
            let grace = Duration::from_secs(config.kill_grace_seconds);
            let kill_result = ProcessShutdownManager::shutdown_process(child, grace).await;
            let stdout = drain(&mut stdout_pipe).await;
            let stderr = drain(&mut stderr_pipe).await;
            let exit_code = match &kill_result {
                Ok(status) => status.code(),
                Err(_) => None,
            };
            Ok(ExecutionOutcome {
                status: ExecutionStatus::TimedOut,
                exit_code,
                elapsed: started.elapsed(),
                stdout,
                stderr,
                error: Some(format!("execution exceeded {}s timeout", config.timeout_seconds)),
            })
        }
    }
}

fn build_command(config: &CommandGroupConfig, invocation: &ComposedInvocation) -> Result<Command, CommandError> {
    let mut command = if config.use_shell {
        let mut parts = vec![config.executable.clone()];
        parts.extend(invocation.argv.iter().cloned());
        let joined = parts.join(" ");
        let mut command = Command::new(&config.shell_interpreter);
        command.arg("-c").arg(joined);
        command
    } else {
        let mut command = Command::new(&config.executable);
        command.args(&invocation.argv);
        command
    };

    if let Some(cwd) = &config.cwd {
        command.current_dir(cwd);
    }
    for (key, value) in &invocation.env {
        command.env(key, value);
    }
    command.kill_on_drop(true);
    Ok(command)
}

async fn drain(pipe: &mut Option<impl AsyncReadExt + Unpin>) -> Option<String> {
    let pipe = pipe.as_mut()?;
    let mut buf = Vec::new();
    if pipe.read_to_end(&mut buf).await.is_err() {
        return None;
    }
    Some(String::from_utf8_lossy(&buf).into_owned())
}
