//! hopgate: SSH gateway CLI for nodes behind relay hosts
//!
//! Provides the `hopgate` binary: topology management, interactive and
//! one-shot access through a relay, file copy, and tunneled discovery.

pub mod commands;
pub mod context;
pub mod output;
pub mod prompt;

use hop_core::ProcessError;
use hop_runner::ScanError;

/// Exit status conventionally used after SIGINT
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Process exit code for a failed command.
///
/// A failed ssh or tar passes its own status through; anything else is 1.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(process) = cause.downcast_ref::<ProcessError>() {
            return u8::try_from(process.exit_code())
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(1);
        }
        if let Some(ScanError::Interrupted) = cause.downcast_ref::<ScanError>() {
            return INTERRUPTED_EXIT_CODE;
        }
    }
    1
}

/// Whether the error is just the remote side's non-zero exit, which the
/// remote already reported on our terminal
pub fn is_remote_exit(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ProcessError>(),
        Some(ProcessError::Failed { code: Some(_), .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hop_runner::TransferError;

    fn failed(code: Option<i32>) -> ProcessError {
        ProcessError::Failed {
            program: "ssh".into(),
            code,
        }
    }

    #[test]
    fn test_exit_code_passthrough() {
        assert_eq!(exit_code(&anyhow::Error::new(failed(Some(3)))), 3);
        assert_eq!(exit_code(&anyhow::Error::new(failed(Some(255)))), 255);
        assert_eq!(exit_code(&anyhow::Error::new(failed(None))), 1);
    }

    #[test]
    fn test_exit_code_through_transfer_error() {
        let err = anyhow::Error::new(TransferError::Consumer(failed(Some(2))));
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn test_exit_code_other_errors() {
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
        assert_eq!(
            exit_code(&anyhow::Error::new(ScanError::Interrupted)),
            INTERRUPTED_EXIT_CODE
        );
    }

    #[test]
    fn test_is_remote_exit() {
        assert!(is_remote_exit(&anyhow::Error::new(failed(Some(1)))));
        assert!(!is_remote_exit(&anyhow::Error::new(failed(None))));
        assert!(!is_remote_exit(&anyhow::Error::new(TransferError::Consumer(
            failed(Some(2))
        ))));
    }
}
