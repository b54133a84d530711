#![allow(dead_code)]

use gsctl_core::api::{ChunkStream, OutputChunk, ProcessInvocation};

pub fn sh(script: &str) -> ProcessInvocation {
    ProcessInvocation::new("sh").arg("-c").arg(script)
}

pub async fn drain(mut chunks: ChunkStream) -> (Vec<OutputChunk>, ChunkStream) {
    let mut out = Vec::new();
    while let Some(chunk) = chunks.next_chunk().await {
        out.push(chunk);
    }
    (out, chunks)
}

pub fn concat(chunks: &[OutputChunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect()
}

/// True while `pid` exists in the process table (including as a zombie).
#[cfg(target_os = "linux")]
pub fn pid_exists(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}
