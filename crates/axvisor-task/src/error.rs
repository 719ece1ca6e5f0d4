use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Msg(String),

    /// The subsystem source tree is absent and could not be provisioned.
    #[error("missing dependency at {}: {reason}", .path.display())]
    MissingDependency { path: PathBuf, reason: String },

    /// The external build process exited unsuccessfully.
    #[error("command failed with exit code {code}: {command}")]
    Command { command: String, code: i32 },
}

impl Error {
    pub fn msg<M: Into<String>>(msg: M) -> Self {
        Self::Msg(msg.into())
    }

    /// Process exit status to report for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Command { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// [`Self::exit_code`] narrowed to what a process can report. Codes wider
    /// than a byte (non-unix hosts) keep their low byte, but never become 0.
    pub fn exit_status(&self) -> u8 {
        match (self.exit_code() & 0xff) as u8 {
            0 => 1,
            b => b,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::msg(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::msg(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::msg(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
