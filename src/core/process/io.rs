// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! I/O streaming and output capture for processes.
//!
//! ```text
//! run_child()
//!   stdout/stderr reader tasks
//!     each line --> trace!, sink (flume), buffer
//!   wait (or timeout --> kill the process group)
//!   join readers
//!   --> ProcessOutput { stdout, stderr, exit_code }
//! ```

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use super::builder::{
    OutputLine, OutputSink, ProcessBuilder, ProcessFlags, ProcessOutput, Stream, StreamFlags,
};
use super::runner::kill_group;
use crate::error::ProcessError;

/// Configuration for a stream reader task.
struct StreamReaderConfig {
    flags: StreamFlags,
    stream: Stream,
    process_name: String,
    sink: Option<OutputSink>,
}

/// Spawns a reader task for one child stream if anything consumes it.
fn spawn_reader<R>(reader: Option<R>, config: StreamReaderConfig) -> Option<JoinHandle<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    if !config
        .flags
        .intersects(StreamFlags::FORWARD_TO_LOG | StreamFlags::KEEP_IN_STRING)
        && config.sink.is_none()
    {
        return None;
    }
    reader.map(|reader| tokio::spawn(read_stream(reader, config)))
}

/// Waits for a reader task and returns its buffered text.
async fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}

impl ProcessBuilder {
    /// Runs the child process, handling I/O streaming and waiting for completion.
    pub(super) async fn run_child(
        &self,
        name: &str,
        cmd_line: &str,
        child: &mut Child,
    ) -> Result<ProcessOutput, ProcessError> {
        let stdout_handle = spawn_reader(
            child.stdout.take(),
            StreamReaderConfig {
                flags: self.stdout_config(),
                stream: Stream::Stdout,
                process_name: name.to_string(),
                sink: self.output_sink().cloned(),
            },
        );
        let stderr_handle = spawn_reader(
            child.stderr.take(),
            StreamReaderConfig {
                flags: self.stderr_config(),
                stream: Stream::Stderr,
                process_name: name.to_string(),
                sink: self.output_sink().cloned(),
            },
        );

        let wait_error = |e: std::io::Error| ProcessError::OutputError {
            command: cmd_line.to_string(),
            message: e.to_string(),
        };

        let exit_status = if let Some(timeout_duration) = self.timeout_duration() {
            tokio::select! {
                status = child.wait() => status.map_err(wait_error)?,
                () = tokio::time::sleep(timeout_duration) => {
                    warn!(process = %name, timeout = ?timeout_duration, "process timed out");
                    if self.process_flags().contains(ProcessFlags::NEW_PROCESS_GROUP)
                        && let Some(pid) = child.id()
                    {
                        kill_group(pid);
                    }
                    child.kill().await.ok();
                    // Grandchildren may still hold the pipes open
                    for handle in [stdout_handle, stderr_handle].into_iter().flatten() {
                        handle.abort();
                    }
                    return Err(ProcessError::Timeout {
                        command: cmd_line.to_string(),
                        timeout_secs: timeout_duration.as_secs(),
                    });
                }
            }
        } else {
            child.wait().await.map_err(wait_error)?
        };

        let stdout = join_reader(stdout_handle).await;
        let stderr = join_reader(stderr_handle).await;

        Ok(ProcessOutput::new(
            exit_status.code().unwrap_or(-1),
            stdout,
            stderr,
        ))
    }
}

/// Reads a stream to the end, forwarding each line and buffering the text.
///
/// The buffered text keeps line terminators so file contents read through
/// a child process come back byte-for-byte (modulo invalid UTF-8).
async fn read_stream<R>(reader: R, config: StreamReaderConfig) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let keep = config.flags.contains(StreamFlags::KEEP_IN_STRING);
    let forward = config.flags.contains(StreamFlags::FORWARD_TO_LOG);
    let mut buffer = String::new();
    let mut raw = Vec::new();

    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&raw);
                let line = text.trim_end_matches(['\n', '\r']);
                if forward {
                    trace!(
                        process = %config.process_name,
                        stream = config.stream.as_str(),
                        line = %line,
                        "output"
                    );
                }
                if let Some(sink) = &config.sink {
                    // A dropped receiver only means nobody is listening
                    let _ = sink.send(OutputLine {
                        stream: config.stream,
                        line: line.to_string(),
                    });
                }
                if keep {
                    buffer.push_str(&text);
                }
            }
            Err(e) => {
                warn!(
                    process = %config.process_name,
                    stream = config.stream.as_str(),
                    error = %e,
                    "error reading stream"
                );
                break;
            }
        }
    }
    buffer
}
