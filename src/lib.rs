//! A tiny user-space file system backed by a single host file, mountable
//! via FUSE. See [`fs::Filesystem`] for the storage engine and
//! [`fuse_adapter`] for the kernel-facing translation layer.

pub mod bitmap;
pub mod device;
pub mod error;
pub mod fs;
pub mod fuse_adapter;
pub mod param;
pub mod stat;

pub use error::{FsError, Result};
pub use fs::Filesystem;
