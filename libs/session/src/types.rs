//! Transfer Types
//!
//! Value types exchanged with transfer actors. Everything returned to a
//! caller is an owned snapshot; nothing points into actor state.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

/// Immutable 20-byte identity key of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive a key from a transfer name (SHA3-256, truncated to 20 bytes)
    pub fn from_name(name: &str) -> Self {
        let digest = Sha3_256::digest(name.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for InfoHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// One file of a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
}

/// Tracker announce entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerEntry {
    pub url: String,
    pub tier: u8,
}

impl TrackerEntry {
    pub fn new(url: impl Into<String>, tier: u8) -> Self {
        Self {
            url: url.into(),
            tier,
        }
    }
}

/// Static layout of a transfer: name, key, piece size and files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInfo {
    pub name: String,
    pub info_hash: InfoHash,
    pub piece_length: u32,
    pub files: Vec<FileEntry>,
}

impl TransferInfo {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn num_pieces(&self) -> usize {
        let piece_length = u64::from(self.piece_length);
        if piece_length == 0 {
            return 0;
        }
        self.total_size().div_ceil(piece_length) as usize
    }

    /// Byte size of piece `index`; the last piece may be short
    pub fn piece_size(&self, index: usize) -> u64 {
        let num_pieces = self.num_pieces();
        if index >= num_pieces {
            return 0;
        }
        let piece_length = u64::from(self.piece_length);
        let start = index as u64 * piece_length;
        (self.total_size() - start).min(piece_length)
    }

    /// Half-open byte range of every file within the transfer
    pub fn file_ranges(&self) -> Vec<(u64, u64)> {
        let mut offset = 0;
        self.files
            .iter()
            .map(|file| {
                let range = (offset, offset + file.size);
                offset += file.size;
                range
            })
            .collect()
    }

    /// Half-open byte range of piece `index`
    pub fn piece_range(&self, index: usize) -> (u64, u64) {
        let start = index as u64 * u64::from(self.piece_length);
        (start, start + self.piece_size(index))
    }
}

/// Parameters for adding a transfer to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParams {
    pub name: String,
    /// Derived from `name` when absent
    pub info_hash: Option<InfoHash>,
    pub piece_length: u32,
    pub files: Vec<FileEntry>,
    pub save_path: String,
    pub trackers: Vec<TrackerEntry>,
    pub paused: bool,
    pub auto_managed: bool,
    pub sequential_download: bool,
}

impl TransferParams {
    /// Single-file transfer with default settings
    pub fn single_file(name: impl Into<String>, size: u64, piece_length: u32) -> Self {
        let name = name.into();
        Self {
            files: vec![FileEntry {
                path: name.clone(),
                size,
            }],
            name,
            info_hash: None,
            piece_length,
            save_path: ".".to_string(),
            trackers: Vec::new(),
            paused: false,
            auto_managed: true,
            sequential_download: false,
        }
    }

    pub fn info_hash(&self) -> InfoHash {
        self.info_hash.unwrap_or_else(|| InfoHash::from_name(&self.name))
    }

    /// Check the layout describes at least one piece
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.piece_length == 0 {
            return Err("piece_length must be positive".to_string());
        }
        if self.files.is_empty() {
            return Err("at least one file is required".to_string());
        }
        if self.files.iter().map(|f| f.size).sum::<u64>() == 0 {
            return Err("total size must be positive".to_string());
        }
        Ok(())
    }

    pub(crate) fn into_info(self) -> (TransferInfo, TransferSettings) {
        let info = TransferInfo {
            info_hash: self.info_hash(),
            name: self.name,
            piece_length: self.piece_length,
            files: self.files,
        };
        let settings = TransferSettings {
            save_path: self.save_path,
            trackers: self.trackers,
            paused: self.paused,
            auto_managed: self.auto_managed,
            sequential_download: self.sequential_download,
        };
        (info, settings)
    }
}

/// Mutable starting settings split off `TransferParams`
#[derive(Debug, Clone)]
pub(crate) struct TransferSettings {
    pub save_path: String,
    pub trackers: Vec<TrackerEntry>,
    pub paused: bool,
    pub auto_managed: bool,
    pub sequential_download: bool,
}

/// Coarse transfer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    #[default]
    Downloading,
    /// Every wanted piece is present
    Finished,
    /// Every piece is present
    Seeding,
}

/// Point-in-time status snapshot of a transfer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransferStatus {
    pub info_hash: InfoHash,
    pub name: String,
    pub state: TransferState,
    pub paused: bool,
    pub auto_managed: bool,
    pub queue_position: i32,
    pub num_pieces: usize,
    pub pieces_done: usize,
    pub total_done: u64,
    pub total_wanted: u64,
    pub total_wanted_done: u64,
    pub progress: f32,
    pub upload_limit: i32,
    pub download_limit: i32,
    pub sequential_download: bool,
    pub super_seeding: bool,
    pub upload_mode: bool,
    pub num_trackers: usize,
    pub error: Option<String>,
}
