//! Normalized file info.
//!
//! The device answers file-info requests with string pairs whose numeric
//! values are decimal strings. Only the keys below are kept.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::{ProtocolError, Result};

pub const KEY_IFMT: &str = "st_ifmt";
pub const KEY_SIZE: &str = "st_size";
pub const KEY_BLOCKS: &str = "st_blocks";
pub const KEY_NLINK: &str = "st_nlink";
pub const KEY_MTIME: &str = "st_mtime";
pub const KEY_BIRTHTIME: &str = "st_birthtime";
pub const KEY_LINK_TARGET: &str = "LinkTarget";

const NANOS_PER_MILLI: i64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Other(String),
}

impl FileType {
    pub fn from_ifmt(value: &str) -> Self {
        match value {
            "S_IFREG" => FileType::Regular,
            "S_IFDIR" => FileType::Directory,
            "S_IFLNK" => FileType::Symlink,
            "S_IFCHR" => FileType::CharDevice,
            "S_IFBLK" => FileType::BlockDevice,
            "S_IFIFO" => FileType::Fifo,
            "S_IFSOCK" => FileType::Socket,
            other => FileType::Other(other.to_string()),
        }
    }

    /// The `st_ifmt` spelling.
    pub fn as_ifmt(&self) -> &str {
        match self {
            FileType::Regular => "S_IFREG",
            FileType::Directory => "S_IFDIR",
            FileType::Symlink => "S_IFLNK",
            FileType::CharDevice => "S_IFCHR",
            FileType::BlockDevice => "S_IFBLK",
            FileType::Fifo => "S_IFIFO",
            FileType::Socket => "S_IFSOCK",
            FileType::Other(value) => value,
        }
    }
}

/// File info with numeric fields parsed and timestamps converted.
///
/// Timestamps arrive as nanoseconds since the unix epoch and keep millisecond
/// resolution; the remainder is truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub file_type: Option<FileType>,
    pub size: Option<u64>,
    pub blocks: Option<u64>,
    pub nlink: Option<u64>,
    pub mtime: Option<DateTime<Local>>,
    pub birthtime: Option<DateTime<Local>>,
    pub link_target: Option<String>,
}

impl FileInfo {
    pub fn from_raw(raw: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            file_type: raw.get(KEY_IFMT).map(|value| FileType::from_ifmt(value)),
            size: parse_field(raw, KEY_SIZE)?,
            blocks: parse_field(raw, KEY_BLOCKS)?,
            nlink: parse_field(raw, KEY_NLINK)?,
            mtime: parse_timestamp(raw, KEY_MTIME)?,
            birthtime: parse_timestamp(raw, KEY_BIRTHTIME)?,
            link_target: raw.get(KEY_LINK_TARGET).cloned(),
        })
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == Some(FileType::Directory)
    }

    pub fn is_file(&self) -> bool {
        self.file_type == Some(FileType::Regular)
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type == Some(FileType::Symlink)
    }
}

fn parse_field(raw: &HashMap<String, String>, key: &str) -> Result<Option<u64>> {
    raw.get(key)
        .map(|value| {
            value.trim().parse::<u64>().map_err(|_| ProtocolError::InvalidInfoValue {
                key: key.to_string(),
                value: value.clone(),
            })
        })
        .transpose()
}

fn parse_timestamp(raw: &HashMap<String, String>, key: &str) -> Result<Option<DateTime<Local>>> {
    let Some(value) = raw.get(key) else {
        return Ok(None);
    };

    let invalid = || ProtocolError::InvalidInfoValue {
        key: key.to_string(),
        value: value.clone(),
    };

    let nanos = value.trim().parse::<i64>().map_err(|_| invalid())?;
    let millis = nanos / NANOS_PER_MILLI;
    let utc = DateTime::from_timestamp_millis(millis).ok_or_else(invalid)?;
    Ok(Some(utc.with_timezone(&Local)))
}
