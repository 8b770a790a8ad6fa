//! Two-process byte pipe
//!
//! The producer's stdout is connected straight to the consumer's stdin.
//! Neither `Command` outlives its spawn, so after both are started the only
//! holders of the pipe are the two children: when the producer exits the
//! consumer reads EOF, and when the consumer exits the producer gets EPIPE.

use std::process::{Child, ChildStdout, ExitStatus, Stdio};

use hop_core::{Invocation, ProcessError};

use crate::error::TransferError;
use crate::process::check_status;

/// Producer → consumer process pair
#[derive(Debug, Clone)]
pub struct Pipeline {
    producer: Invocation,
    consumer: Invocation,
}

impl Pipeline {
    pub fn new(producer: Invocation, consumer: Invocation) -> Self {
        Self { producer, consumer }
    }

    pub fn producer(&self) -> &Invocation {
        &self.producer
    }

    pub fn consumer(&self) -> &Invocation {
        &self.consumer
    }

    /// Start both processes and wait for both to finish.
    ///
    /// A producer failure is reported ahead of the consumer's, except when
    /// the producer only died of a broken pipe because the consumer had
    /// already failed.
    pub fn run(&self) -> Result<(), TransferError> {
        tracing::debug!("Pipe producer: {}", self.producer);
        tracing::debug!("Pipe consumer: {}", self.consumer);

        let (mut producer, stdout) = spawn_producer(&self.producer).map_err(TransferError::Producer)?;

        let mut consumer = match spawn_consumer(&self.consumer, stdout) {
            Ok(child) => child,
            Err(e) => {
                if let Err(kill_err) = producer.kill() {
                    tracing::warn!("Failed to kill pipe producer: {}", kill_err);
                }
                let _ = producer.wait();
                return Err(TransferError::Consumer(e));
            }
        };

        let producer_status = wait(&mut producer, &self.producer.program);
        let consumer_result = wait(&mut consumer, &self.consumer.program)
            .and_then(|status| check_status(&self.consumer.program, status));

        let producer_status = producer_status.map_err(TransferError::Producer)?;
        if broke_pipe(producer_status) {
            if let Err(e) = consumer_result {
                tracing::debug!("Producer hit a broken pipe after the consumer failed");
                return Err(TransferError::Consumer(e));
            }
        }

        check_status(&self.producer.program, producer_status).map_err(TransferError::Producer)?;
        consumer_result.map_err(TransferError::Consumer)
    }
}

fn spawn_producer(invocation: &Invocation) -> Result<(Child, ChildStdout), ProcessError> {
    let mut cmd = invocation.to_command();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: invocation.program.clone(),
        source,
    })?;

    match child.stdout.take() {
        Some(stdout) => Ok((child, stdout)),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(ProcessError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::other("stdout was not captured"),
            })
        }
    }
}

fn spawn_consumer(invocation: &Invocation, input: ChildStdout) -> Result<Child, ProcessError> {
    let mut cmd = invocation.to_command();
    cmd.stdin(Stdio::from(input))
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: invocation.program.clone(),
        source,
    })
}

fn wait(child: &mut Child, program: &str) -> Result<ExitStatus, ProcessError> {
    child.wait().map_err(|source| ProcessError::Wait {
        program: program.to_string(),
        source,
    })
}

#[cfg(unix)]
fn broke_pipe(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(libc::SIGPIPE)
}

#[cfg(not(unix))]
fn broke_pipe(_status: ExitStatus) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn sh(script: &str) -> Invocation {
        Invocation::new("sh").args(["-c", script])
    }

    fn code_of(err: &ProcessError) -> Option<i32> {
        match err {
            ProcessError::Failed { code, .. } => *code,
            _ => None,
        }
    }

    #[test]
    fn test_bytes_flow_through() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.txt");
        let consumer = Invocation::new("sh").args([
            "-c".to_string(),
            "cat > \"$0\"".to_string(),
            out.display().to_string(),
        ]);

        Pipeline::new(sh("printf 'hello hopgate'"), consumer)
            .run()
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello hopgate");
    }

    #[test]
    fn test_producer_failure_is_primary() {
        let pipeline = Pipeline::new(
            sh("printf partial; exit 3"),
            sh("cat > /dev/null; exit 5"),
        );
        match pipeline.run().unwrap_err() {
            TransferError::Producer(e) => assert_eq!(code_of(&e), Some(3)),
            other => panic!("expected producer failure, got {other}"),
        }
    }

    #[test]
    fn test_failed_producer_does_not_block_consumer() {
        let start = Instant::now();
        let err = Pipeline::new(sh("exit 1"), Invocation::new("cat"))
            .run()
            .unwrap_err();
        assert!(matches!(err, TransferError::Producer(_)));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_consumer_failure_reported() {
        let err = Pipeline::new(sh("printf data"), sh("cat > /dev/null; exit 4"))
            .run()
            .unwrap_err();
        match err {
            TransferError::Consumer(e) => assert_eq!(code_of(&e), Some(4)),
            other => panic!("expected consumer failure, got {other}"),
        }
    }

    #[test]
    fn test_consumer_exiting_early_is_the_cause() {
        // `yes` never stops on its own; it dies of SIGPIPE once the
        // consumer goes away
        let err = Pipeline::new(
            Invocation::new("yes"),
            sh("head -c 16 > /dev/null; exit 2"),
        )
        .run()
        .unwrap_err();
        match err {
            TransferError::Consumer(e) => assert_eq!(code_of(&e), Some(2)),
            other => panic!("expected consumer failure, got {other}"),
        }
    }

    #[test]
    fn test_consumer_spawn_failure_reaps_producer() {
        let start = Instant::now();
        let err = Pipeline::new(
            sh("sleep 30"),
            Invocation::new("/nonexistent/hopgate-consumer"),
        )
        .run()
        .unwrap_err();
        assert!(matches!(
            err,
            TransferError::Consumer(ProcessError::Spawn { .. })
        ));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_producer_spawn_failure() {
        let err = Pipeline::new(
            Invocation::new("/nonexistent/hopgate-producer"),
            Invocation::new("cat"),
        )
        .run()
        .unwrap_err();
        assert!(matches!(
            err,
            TransferError::Producer(ProcessError::Spawn { .. })
        ));
    }
}
