use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const READ_BUF_BYTES: usize = 16 * 1024;

/// Raw output handed from the pump task to the consumer side.
#[derive(Debug)]
pub enum Tap {
    Line(Vec<u8>),
    Failed(std::io::Error),
}

/// Spawns a task copying `rd` into `tap_tx`, one line (or capped chunk) at a time.
///
/// Stops at EOF, after the first read error (reported as [`Tap::Failed`]
/// after whatever partial line was buffered), or once the receiver is gone.
/// Returns the number of bytes read.
pub fn pump<R>(mut rd: R, tap_tx: mpsc::Sender<Tap>, max_line_bytes: usize) -> JoinHandle<u64>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_BUF_BYTES];
        let mut total = 0u64;
        let mut splitter = LineSplitter::new(max_line_bytes);

        loop {
            let n = match rd.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(error) => {
                    tracing::debug!(error = %error, bytes = total, "pump read failed");
                    if let Some(bytes) = splitter.finish() {
                        let _ = tap_tx.send(Tap::Line(bytes)).await;
                    }
                    let _ = tap_tx.send(Tap::Failed(error)).await;
                    return total;
                }
            };
            total += n as u64;

            for bytes in splitter.push(&buf[..n]) {
                if tap_tx.send(Tap::Line(bytes)).await.is_err() {
                    return total;
                }
            }
        }

        // EOF flush: deliver the last partial line if it doesn't end with '\n'.
        if let Some(bytes) = splitter.finish() {
            let _ = tap_tx.send(Tap::Line(bytes)).await;
        }

        total
    })
}

/// Splits a byte stream into lines, keeping the terminator.
///
/// A line longer than `max_line_bytes` is cut into pieces of at most that
/// size, preferring not to split a UTF-8 character in half.
#[derive(Debug)]
pub struct LineSplitter {
    buf: Vec<u8>,
    max_line_bytes: usize,
}

impl LineSplitter {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(8 * 1024),
            max_line_bytes: max_line_bytes.max(1),
        }
    }

    pub fn push(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(data);

        let mut out = Vec::new();
        loop {
            let newline = self.buf.iter().position(|&b| b == b'\n');
            let cut = match newline {
                Some(pos) if pos < self.max_line_bytes => pos + 1,
                _ if self.buf.len() >= self.max_line_bytes => {
                    utf8_boundary(&self.buf[..self.max_line_bytes])
                }
                _ => break,
            };
            out.push(self.buf.drain(..cut).collect());
        }
        out
    }

    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

fn utf8_boundary(window: &[u8]) -> usize {
    match std::str::from_utf8(window) {
        Err(e) if e.error_len().is_none() && e.valid_up_to() > 0 => e.valid_up_to(),
        _ => window.len(),
    }
}
