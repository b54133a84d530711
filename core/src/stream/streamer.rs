//! Encoding-tolerant process output streaming.
//!
//! [`OutputStreamer::stream`] spawns a child whose stdout and stderr share one
//! pipe, so lines arrive in the order the child wrote them, and hands back a
//! [`ProcessOutput`]. Its
//! [`ChunkStream`] yields one [`OutputChunk`] per line, decoded with the
//! configured encoding fallback, and guarantees the child is reaped however
//! consumption ends.

use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::Stream;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::StreamingConfig;
use crate::encoding::{decode_with_fallback, escape_raw, TextEncoding, DEFAULT_ENCODINGS};
use crate::error::StreamError;

use super::guard::ChildGuard;
use super::io_pump::{pump, Tap};
use super::pipe::merged_pipe;
use super::types::{ExitOutcome, OutputChunk, ProcessInvocation};

#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Longest line buffered before it is emitted as a partial chunk.
    pub max_line_bytes: usize,
    pub channel_capacity: usize,
    /// How long a child may linger after closing its output before it is killed.
    pub exit_wait: Duration,
    /// How long to wait for a killed child to be reaped.
    pub kill_grace: Duration,
    /// After the child exits, how long to keep reading output that is still
    /// buffered or held open by a background process it left behind.
    pub drain_grace: Duration,
    pub encodings: Vec<TextEncoding>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::from(&StreamingConfig::default())
    }
}

impl From<&StreamingConfig> for StreamOptions {
    fn from(cfg: &StreamingConfig) -> Self {
        let encodings = if cfg.encodings.is_empty() {
            DEFAULT_ENCODINGS.to_vec()
        } else {
            cfg.encodings.clone()
        };
        Self {
            max_line_bytes: cfg.max_line_bytes,
            channel_capacity: cfg.channel_capacity,
            exit_wait: Duration::from_millis(cfg.exit_wait_ms),
            kill_grace: Duration::from_millis(cfg.kill_grace_ms),
            drain_grace: Duration::from_millis(cfg.drain_grace_ms),
            encodings,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputStreamer {
    opts: StreamOptions,
}

impl OutputStreamer {
    pub fn new(opts: StreamOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &StreamOptions {
        &self.opts
    }

    /// Spawn `invocation` and start pumping its output.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`StreamError::Spawn`] before any output exists if the program
    /// cannot be started.
    pub fn stream(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, StreamError> {
        let program = invocation.program().to_string_lossy().into_owned();
        let pipe = merged_pipe().map_err(StreamError::Pipe)?;

        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.get_args())
            .envs(invocation.get_envs().iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(pipe.stdout)
            .stderr(pipe.stderr)
            .kill_on_drop(true);
        if let Some(dir) = invocation.get_current_dir() {
            cmd.current_dir(dir);
        }

        let spawned = cmd.spawn();
        // Close our copies of the write ends, or the reader never sees EOF.
        drop(cmd);
        let child = spawned.map_err(|source| {
            tracing::warn!(program = %program, error = %source, "spawn failed");
            StreamError::Spawn {
                program: program.clone(),
                source,
            }
        })?;

        let (tap_tx, tap_rx) = mpsc::channel::<Tap>(self.opts.channel_capacity.max(1));
        let reader = pump(pipe.reader, tap_tx, self.opts.max_line_bytes);

        let outcome = Arc::new(OnceLock::new());
        let guard = ChildGuard::new(child, Some(reader), outcome.clone(), self.opts.kill_grace);
        let pid = guard.pid();

        tracing::info!(pid = ?pid, command = %invocation.display(), "spawned child process");

        Ok(ProcessOutput {
            chunks: Some(ChunkStream::new(tap_rx, guard, &self.opts)),
            outcome,
            pid,
        })
    }
}

/// Spawn `invocation` with default [`StreamOptions`].
pub fn stream(invocation: &ProcessInvocation) -> Result<ProcessOutput, StreamError> {
    OutputStreamer::default().stream(invocation)
}

/// Result of one invocation. Its output can be taken exactly once.
pub struct ProcessOutput {
    chunks: Option<ChunkStream>,
    outcome: Arc<OnceLock<ExitOutcome>>,
    pid: Option<u32>,
}

impl ProcessOutput {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Take the chunk sequence. A second call fails with [`StreamError::AlreadyConsumed`].
    pub fn chunks(&mut self) -> Result<ChunkStream, StreamError> {
        self.chunks.take().ok_or(StreamError::AlreadyConsumed)
    }

    /// Exit outcome; `None` until the chunk sequence has been drained or terminated.
    pub fn exit_status(&self) -> Option<ExitOutcome> {
        self.outcome.get().copied()
    }
}

/// Lazy, finite sequence of output chunks for a single child process.
pub struct ChunkStream {
    taps: mpsc::Receiver<Tap>,
    guard: ChildGuard,
    encodings: Vec<TextEncoding>,
    exit_wait: Duration,
    drain_grace: Duration,
    /// Set once the child has exited; output is read until then at most.
    drain_deadline: Option<Instant>,
    done: bool,
}

impl ChunkStream {
    fn new(taps: mpsc::Receiver<Tap>, guard: ChildGuard, opts: &StreamOptions) -> Self {
        Self {
            taps,
            guard,
            encodings: opts.encodings.clone(),
            exit_wait: opts.exit_wait,
            drain_grace: opts.drain_grace,
            drain_deadline: None,
            done: false,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.guard.pid()
    }

    /// Wait for the next chunk.
    ///
    /// `None` once the output is closed, or once the child has exited and
    /// `drain_grace` has passed, whichever comes first. The child is reaped
    /// before `None` is returned.
    pub async fn next_chunk(&mut self) -> Option<OutputChunk> {
        if self.done {
            return None;
        }

        let tap = loop {
            match self.drain_deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, self.taps.recv()).await {
                    Ok(tap) => break tap,
                    Err(_) => {
                        tracing::debug!(
                            pid = ?self.guard.pid(),
                            "output still open after child exit, closing it"
                        );
                        self.done = true;
                        self.taps.close();
                        self.guard.finish(Duration::ZERO).await;
                        return None;
                    }
                },
                None => tokio::select! {
                    biased;
                    tap = self.taps.recv() => break tap,
                    _ = self.guard.wait_exit() => {
                        self.drain_deadline = Some(Instant::now() + self.drain_grace);
                    }
                },
            }
        };

        match tap {
            Some(Tap::Line(bytes)) => Some(self.decode(bytes)),
            Some(Tap::Failed(error)) => {
                self.done = true;
                self.taps.close();
                self.guard.terminate().await;
                Some(OutputChunk::stream_error(format!(
                    "reading child output failed: {error}"
                )))
            }
            None => {
                self.done = true;
                self.guard.finish(self.exit_wait).await;
                None
            }
        }
    }

    /// Stop early: kill the child if it is still running and wait for it.
    /// Safe to call more than once.
    pub async fn terminate(&mut self) -> Option<ExitOutcome> {
        self.done = true;
        self.taps.close();
        self.guard.terminate().await
    }

    pub fn exit_status(&self) -> Option<ExitOutcome> {
        self.guard.outcome()
    }

    /// Adapt into a [`Stream`]. Dropping it early kills the child.
    pub fn into_stream(self) -> impl Stream<Item = OutputChunk> + Send + 'static {
        futures::stream::unfold(self, |mut chunks| async move {
            chunks.next_chunk().await.map(|chunk| (chunk, chunks))
        })
    }

    fn decode(&self, bytes: Vec<u8>) -> OutputChunk {
        match decode_with_fallback(&bytes, &self.encodings) {
            Some((text, encoding)) => {
                if Some(&encoding) != self.encodings.first() {
                    tracing::trace!(%encoding, "decoded with fallback encoding");
                }
                OutputChunk::normal(text)
            }
            None => {
                tracing::warn!(
                    pid = ?self.guard.pid(),
                    bytes = bytes.len(),
                    "output line is not valid in any configured encoding"
                );
                OutputChunk::decode_error(undecodable_placeholder(&bytes))
            }
        }
    }
}

fn undecodable_placeholder(bytes: &[u8]) -> String {
    let (body, newline) = match bytes.strip_suffix(b"\n") {
        Some(rest) => (rest.strip_suffix(b"\r").unwrap_or(rest), true),
        None => (bytes, false),
    };
    let mut out = escape_raw(body);
    if newline {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_keeps_line_break() {
        assert_eq!(undecodable_placeholder(&[0xFF, 0xFE, 0x00, b'\n']), "\\xff\\xfe\\x00\n");
        assert_eq!(undecodable_placeholder(&[0xFF, b'\r', b'\n']), "\\xff\n");
        assert_eq!(undecodable_placeholder(&[0xFF]), "\\xff");
    }

    #[test]
    fn test_options_from_config_fill_empty_encodings() {
        let cfg = StreamingConfig {
            encodings: vec![],
            ..StreamingConfig::default()
        };
        let opts = StreamOptions::from(&cfg);
        assert_eq!(opts.encodings, DEFAULT_ENCODINGS);
        assert_eq!(opts.max_line_bytes, 64 * 1024);
        assert_eq!(opts.drain_grace, Duration::from_millis(500));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_read_failure_yields_one_error_chunk_and_kills_child() {
        let child = Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let outcome = Arc::new(OnceLock::new());
        let guard = ChildGuard::new(child, None, outcome.clone(), Duration::from_secs(3));

        let (tx, rx) = mpsc::channel::<Tap>(4);
        tx.send(Tap::Line(b"loading world\n".to_vec())).await.unwrap();
        tx.send(Tap::Failed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe closed",
        )))
        .await
        .unwrap();
        tx.send(Tap::Line(b"never delivered\n".to_vec())).await.unwrap();

        let mut chunks = ChunkStream::new(rx, guard, &StreamOptions::default());
        assert_eq!(chunks.next_chunk().await, Some(OutputChunk::normal("loading world\n")));

        let chunk = chunks.next_chunk().await.expect("error chunk");
        assert_eq!(chunk.kind, crate::stream::ChunkKind::StreamError);
        assert_eq!(chunk.render(), "[Error] reading child output failed: pipe closed\n");

        assert!(chunks.next_chunk().await.is_none());
        let status = outcome.get().copied().expect("child reaped");
        assert!(status.killed);
        assert_eq!(chunks.exit_status(), Some(status));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_immediate() {
        let inv = ProcessInvocation::new("/definitely/not/a/real/program-gsctl");
        let err = stream(&inv).err().expect("spawn should fail");
        assert_eq!(err.kind(), "SPAWN_FAILURE");
    }

    #[tokio::test]
    async fn test_invalid_working_directory_is_spawn_failure() {
        let inv = ProcessInvocation::new("echo").current_dir("/definitely/not/a/dir/gsctl");
        let err = stream(&inv).err().expect("spawn should fail");
        assert!(matches!(err, StreamError::Spawn { .. }));
    }
}
