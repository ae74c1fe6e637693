#![forbid(unsafe_code)]

//! Pack a directory tree into one flat binary archive and restore it, optionally under a
//! new root name.

pub mod archive;
pub mod prompt;

pub use archive::{pack, unpack, PackError, UnpackError};
