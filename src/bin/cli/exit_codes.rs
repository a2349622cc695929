//! Exit codes for the CLI tool.

use pyiarchive::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Archive format error
pub const BAD_ARCHIVE: i32 = 3;
/// Requested entry does not exist
pub const NOT_FOUND: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Archive file vanished while in use
pub const ARCHIVE_UNAVAILABLE: i32 = 6;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    BadArchive,
    NotFound,
    IoError,
    ArchiveUnavailable,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::BadArchive => BAD_ARCHIVE,
            Self::NotFound => NOT_FOUND,
            Self::IoError => IO_ERROR,
            Self::ArchiveUnavailable => ARCHIVE_UNAVAILABLE,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts a library error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) => ExitCode::IoError,
        Error::InvalidFormat(_) | Error::CorruptHeader { .. } => ExitCode::BadArchive,
        Error::EntryNotFound { .. } => ExitCode::NotFound,
        Error::UnsupportedArchiveType { .. } => ExitCode::BadArgs,
        Error::ArchiveUnavailable { .. } => ExitCode::ArchiveUnavailable,
        Error::Decode { .. } => ExitCode::BadArchive,
        Error::CryptoError(_) => ExitCode::FatalError,
        Error::InvalidArgument(_) => ExitCode::BadArgs,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
