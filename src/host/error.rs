use std::fmt;
use std::io;
use thiserror::Error;

pub type HostResult<T> = Result<T, HostError>;

/// Closed set of failure kinds a host operation may report.
///
/// The WASI layer translates each kind into exactly one errno, so every
/// implementation of `HostFs` must classify its failures into this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostErrorKind {
    NotFound,
    PermissionDenied,
    ConnectionRefused,
    ConnectionReset,
    ConnectionAborted,
    NotConnected,
    AddrInUse,
    AddrNotAvailable,
    BrokenPipe,
    InvalidData,
    TimedOut,
    Interrupted,
    BadResource,
    Busy,
    AlreadyExists,
    NotADirectory,
    IsADirectory,
    DirectoryNotEmpty,
    Other,
}

impl fmt::Display for HostErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostErrorKind::NotFound => "Not found",
            HostErrorKind::PermissionDenied => "Permission denied",
            HostErrorKind::ConnectionRefused => "Connection refused",
            HostErrorKind::ConnectionReset => "Connection reset",
            HostErrorKind::ConnectionAborted => "Connection aborted",
            HostErrorKind::NotConnected => "Not connected",
            HostErrorKind::AddrInUse => "Address in use",
            HostErrorKind::AddrNotAvailable => "Address not available",
            HostErrorKind::BrokenPipe => "Broken pipe",
            HostErrorKind::InvalidData => "Invalid data",
            HostErrorKind::TimedOut => "Timed out",
            HostErrorKind::Interrupted => "Interrupted",
            HostErrorKind::BadResource => "Bad resource",
            HostErrorKind::Busy => "Busy",
            HostErrorKind::AlreadyExists => "Already exists",
            HostErrorKind::NotADirectory => "Not a directory",
            HostErrorKind::IsADirectory => "Is a directory",
            HostErrorKind::DirectoryNotEmpty => "Directory not empty",
            HostErrorKind::Other => "Host error",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct HostError {
    kind: HostErrorKind,
    message: String,
}

impl HostError {
    pub fn new(kind: HostErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn kind(&self) -> HostErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bad_resource(rid: u32) -> Self {
        Self::new(HostErrorKind::BadResource, format!("resource {} is not open", rid))
    }
}

impl From<io::Error> for HostError {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => HostErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => HostErrorKind::PermissionDenied,
            io::ErrorKind::ConnectionRefused => HostErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset => HostErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted => HostErrorKind::ConnectionAborted,
            io::ErrorKind::NotConnected => HostErrorKind::NotConnected,
            io::ErrorKind::AddrInUse => HostErrorKind::AddrInUse,
            io::ErrorKind::AddrNotAvailable => HostErrorKind::AddrNotAvailable,
            io::ErrorKind::BrokenPipe => HostErrorKind::BrokenPipe,
            io::ErrorKind::InvalidData => HostErrorKind::InvalidData,
            io::ErrorKind::TimedOut => HostErrorKind::TimedOut,
            io::ErrorKind::Interrupted => HostErrorKind::Interrupted,
            io::ErrorKind::ResourceBusy => HostErrorKind::Busy,
            io::ErrorKind::AlreadyExists => HostErrorKind::AlreadyExists,
            io::ErrorKind::NotADirectory => HostErrorKind::NotADirectory,
            io::ErrorKind::IsADirectory => HostErrorKind::IsADirectory,
            io::ErrorKind::DirectoryNotEmpty => HostErrorKind::DirectoryNotEmpty,
            _ => HostErrorKind::Other,
        };
        Self { kind, message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_display() {
        let err = HostError::new(HostErrorKind::NotFound, "/data/missing.txt");
        assert_eq!(err.to_string(), "Not found: /data/missing.txt");
    }

    #[test]
    fn test_bad_resource_error() {
        let err = HostError::bad_resource(42);
        assert_eq!(err.kind(), HostErrorKind::BadResource);
        assert_eq!(err.message(), "resource 42 is not open");
    }

    #[test]
    fn test_from_io_error_kinds() {
        let cases = [
            (io::ErrorKind::NotFound, HostErrorKind::NotFound),
            (io::ErrorKind::PermissionDenied, HostErrorKind::PermissionDenied),
            (io::ErrorKind::ConnectionRefused, HostErrorKind::ConnectionRefused),
            (io::ErrorKind::BrokenPipe, HostErrorKind::BrokenPipe),
            (io::ErrorKind::InvalidData, HostErrorKind::InvalidData),
            (io::ErrorKind::TimedOut, HostErrorKind::TimedOut),
            (io::ErrorKind::Interrupted, HostErrorKind::Interrupted),
            (io::ErrorKind::ResourceBusy, HostErrorKind::Busy),
            (io::ErrorKind::AlreadyExists, HostErrorKind::AlreadyExists),
            (io::ErrorKind::DirectoryNotEmpty, HostErrorKind::DirectoryNotEmpty),
            (io::ErrorKind::InvalidInput, HostErrorKind::Other),
            (io::ErrorKind::UnexpectedEof, HostErrorKind::Other),
        ];

        for (io_kind, expected) in cases {
            let err = HostError::from(io::Error::new(io_kind, "boom"));
            assert_eq!(err.kind(), expected, "io kind {:?}", io_kind);
        }
    }

    #[test]
    fn test_host_result_err() {
        let result: HostResult<u32> = Err(HostError::new(HostErrorKind::Busy, "locked"));
        assert!(result.is_err());
    }
}
