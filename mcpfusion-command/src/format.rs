//! Response formatting: header lines followed by
//! `--- STDOUT ---` / `--- STDERR ---` sections when captured output exists.

use crate::execute::{ExecutionOutcome, ExecutionStatus};

pub fn format_outcome(outcome: &ExecutionOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("Exit Code: {}\n", outcome.exit_code.map_or("N/A".to_string(), |c| c.to_string())));
    out.push_str(&format!("Execution Time: {:.3}s\n", outcome.elapsed.as_secs_f64()));
    out.push_str(&format!("Status: {}\n", status_label(outcome.status)));
    if let Some(error) = &outcome.error {
        out.push_str(&format!("Error: {error}\n"));
    }
    if let Some(stdout) = &outcome.stdout {
        out.push_str("--- STDOUT ---\n");
        out.push_str(stdout);
        if !stdout.ends_with('\n') {
            out.push('\n');
        }
    }
    if let Some(stderr) = &outcome.stderr {
        out.push_str("--- STDERR ---\n");
        out.push_str(stderr);
        if !stderr.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn status_label(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Success => "Success",
        ExecutionStatus::Failed => "Failed",
        ExecutionStatus::TimedOut => "Timed Out",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn success_without_output_omits_sections() {
        let outcome = ExecutionOutcome {
            status: ExecutionStatus::Success,
            exit_code: Some(0),
            elapsed: Duration::from_millis(42),
            stdout: None,
            stderr: None,
            error: None,
        };
        let formatted = format_outcome(&outcome);
        assert!(formatted.contains("Exit Code: 0"));
        assert!(formatted.contains("Status: Success"));
        assert!(!formatted.contains("STDOUT"));
    }

    #[test]
    fn timeout_includes_error_line_and_captured_output() {
        let outcome = ExecutionOutcome {
            status: ExecutionStatus::TimedOut,
            exit_code: None,
            elapsed: Duration::from_secs(5),
            stdout: Some("partial".to_string()),
            stderr: Some("".to_string()),
            error: Some("execution exceeded 5s timeout".to_string()),
        };
        let formatted = format_outcome(&outcome);
        assert!(formatted.contains("Status: Timed Out"));
        assert!(formatted.contains("Error: execution exceeded 5s timeout"));
        assert!(formatted.contains("--- STDOUT ---\npartial"));
        assert!(formatted.contains("--- STDERR ---"));
    }
}
