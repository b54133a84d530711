use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// One external command to run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    program: OsString,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
}

impl ProcessInvocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn get_envs(&self) -> &[(OsString, OsString)] {
        &self.envs
    }

    /// Human readable command line for logs.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Normal,
    DecodeError,
    StreamError,
}

/// A decoded line of child output, or an in-band error marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub kind: ChunkKind,
    pub text: String,
}

impl OutputChunk {
    pub fn normal(text: impl Into<String>) -> Self {
        Self {
            kind: ChunkKind::Normal,
            text: text.into(),
        }
    }

    pub fn decode_error(text: impl Into<String>) -> Self {
        Self {
            kind: ChunkKind::DecodeError,
            text: text.into(),
        }
    }

    pub fn stream_error(text: impl Into<String>) -> Self {
        Self {
            kind: ChunkKind::StreamError,
            text: text.into(),
        }
    }

    pub fn is_normal(&self) -> bool {
        self.kind == ChunkKind::Normal
    }

    /// Text as delivered to an operator. Error markers always end with a newline.
    pub fn render(&self) -> String {
        match self.kind {
            ChunkKind::Normal => self.text.clone(),
            ChunkKind::DecodeError => with_newline(format!("[Decode Error] {}", self.text)),
            ChunkKind::StreamError => with_newline(format!("[Error] {}", self.text)),
        }
    }
}

fn with_newline(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

impl fmt::Display for OutputChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// How the child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// True if the streamer had to kill the child.
    pub killed: bool,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}
