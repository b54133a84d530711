//! One anonymous pipe shared by the child's stdout and stderr, so both land in
//! a single byte stream in the order the child wrote them.

use std::io;
use std::process::Stdio;

#[cfg(unix)]
pub(crate) type OutputReader = tokio::net::unix::pipe::Receiver;

#[cfg(windows)]
pub(crate) type OutputReader = tokio::fs::File;

pub(crate) struct MergedPipe {
    pub(crate) reader: OutputReader,
    pub(crate) stdout: Stdio,
    pub(crate) stderr: Stdio,
}

/// Must be called from within a tokio runtime.
pub(crate) fn merged_pipe() -> io::Result<MergedPipe> {
    let (reader, writer) = io::pipe()?;
    let stderr = writer.try_clone()?;
    Ok(MergedPipe {
        reader: into_async(reader)?,
        stdout: Stdio::from(writer),
        stderr: Stdio::from(stderr),
    })
}

#[cfg(unix)]
fn into_async(reader: io::PipeReader) -> io::Result<OutputReader> {
    tokio::net::unix::pipe::Receiver::from_owned_fd(std::os::fd::OwnedFd::from(reader))
}

#[cfg(windows)]
fn into_async(reader: io::PipeReader) -> io::Result<OutputReader> {
    let handle = std::os::windows::io::OwnedHandle::from(reader);
    Ok(tokio::fs::File::from_std(std::fs::File::from(handle)))
}
