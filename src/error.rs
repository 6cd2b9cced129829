use std::fmt;

use thiserror::Error;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("Chunked model decode failed: {detail}")]
    ChunkDecode { detail: String },
    #[error("Keyframe model decode failed: {detail}")]
    KeyframeDecode { detail: String },
    #[error("Unrecognized model format: {path}")]
    UnknownFormat { path: String },
    #[error("IO error")]
    IoError(#[from] std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(x: std::io::Error) -> Error {
        Error { kind: x.into() }
    }
}

pub fn failure_from_kind(kind: ErrorKind) -> Error {
    Error { kind }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_delegates_to_kind() {
        let err = failure_from_kind(ErrorKind::UnknownFormat {
            path: "scene.obj".into(),
        });
        assert_eq!(err.to_string(), "Unrecognized model format: scene.obj");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err.kind, ErrorKind::IoError(_)));
    }
}
