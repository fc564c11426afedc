//! Definitions for encoding/decoding NFSv3 calls and replies, and the
//! operation layer built on them.
mod client;
mod consts;
mod file;
pub mod procs;
mod target;
mod types;

pub use client::NfsClient;
pub use consts::*;
pub use file::{FileReader, FileWriter};
pub use target::{clean_path, split_path, ReadDirLimit, Target};
pub use types::*;
