#![forbid(unsafe_code)]

mod error;
mod format;
mod io;
mod ops;
mod pack;
mod path;
mod read;
mod unpack;

pub use error::{Error, PackError, PackResult, Result, UnpackError, UnpackResult};
pub use format::{EntryInfo, Header, Progress, RecordKind, HEADER_LEN, MAGIC};
pub use path::{normalize_slash_bytes, normalize_slashes, path_exists, rewrite_root};
pub use read::{root_path, ArchiveReader, RecordHeader};

pub use ops::{
    clear_destination, entries, list, prepare_pack_destination, prepare_unpack_destination,
    verify, VerifyReport,
};
pub use pack::{archive_overlaps_source, pack, pack_with_progress};
pub use unpack::{unpack, Unpacker};
