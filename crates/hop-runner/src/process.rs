//! Running composed invocations in the foreground

use std::process::{ExitStatus, Stdio};

use hop_core::{Invocation, ProcessError};

/// What the child's stdin is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinMode {
    /// Share our stdin (interactive sessions)
    Inherit,
    /// `/dev/null` (one-shot commands)
    Null,
}

/// Run `invocation` to completion with our stdout/stderr
pub fn run(invocation: &Invocation, stdin: StdinMode) -> Result<(), ProcessError> {
    tracing::debug!("Running: {}", invocation);

    let mut cmd = invocation.to_command();
    cmd.stdin(match stdin {
        StdinMode::Inherit => Stdio::inherit(),
        StdinMode::Null => Stdio::null(),
    })
    .stdout(Stdio::inherit())
    .stderr(Stdio::inherit());

    let status = cmd.status().map_err(|source| ProcessError::Spawn {
        program: invocation.program.clone(),
        source,
    })?;

    check_status(&invocation.program, status)
}

/// Map a non-success exit status to [`ProcessError::Failed`]
pub fn check_status(program: &str, status: ExitStatus) -> Result<(), ProcessError> {
    if status.success() {
        Ok(())
    } else {
        Err(ProcessError::Failed {
            program: program.to_string(),
            code: status.code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_success() {
        let inv = Invocation::new("sh").args(["-c", "exit 0"]);
        run(&inv, StdinMode::Null).unwrap();
    }

    #[test]
    fn test_run_reports_exit_code() {
        let inv = Invocation::new("sh").args(["-c", "exit 7"]);
        match run(&inv, StdinMode::Null).unwrap_err() {
            ProcessError::Failed { program, code } => {
                assert_eq!(program, "sh");
                assert_eq!(code, Some(7));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_missing_program() {
        let inv = Invocation::new("/nonexistent/hopgate-test-binary");
        assert!(matches!(
            run(&inv, StdinMode::Null).unwrap_err(),
            ProcessError::Spawn { .. }
        ));
    }
}
