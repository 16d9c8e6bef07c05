//! Error kinds returned by the storage engine.
//!
//! The core never deals in `errno`; the FUSE adapter is the single place
//! that downgrades an [`FsError`] to a raw `i32`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory")]
    NotFound,

    #[error("file or directory already exists")]
    AlreadyExists,

    #[error("no space left on device")]
    NoSpace,

    #[error("not a directory")]
    NotADirectory,

    #[error("is a directory")]
    IsADirectory,

    #[error("directory not empty")]
    DirectoryNotEmpty,

    #[error("file name too long")]
    NameTooLong,

    #[error("invalid file name")]
    InvalidName,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Map to a raw POSIX errno, for the FUSE adapter.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::NoSpace => libc::ENOSPC,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::IsADirectory => libc::EISDIR,
            FsError::DirectoryNotEmpty => libc::ENOTEMPTY,
            FsError::NameTooLong => libc::ENAMETOOLONG,
            FsError::InvalidName => libc::EINVAL,
            FsError::Io(_) => libc::EIO,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
