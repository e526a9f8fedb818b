//! Transfer Actor
//!
//! Per-transfer state owned by the session executor. Methods here run only
//! on that executor, through a [`TransferHandle`](crate::handle::TransferHandle).
//! The bookkeeping is deliberately plain: limits, flags, priorities, piece
//! completion and tracker lists.

use crate::queue::QueueOrder;
use crate::types::{
    InfoHash, TrackerEntry, TransferInfo, TransferSettings, TransferState, TransferStatus,
};

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Highest piece/file priority
pub const MAX_PRIORITY: u8 = 7;

/// Priority assigned to pieces and files on creation
pub const DEFAULT_PRIORITY: u8 = 4;

/// Sentinel for "no limit"
pub const UNLIMITED: i32 = -1;

/// Which seed list a web seed belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    Url,
    Http,
}

#[derive(Debug)]
pub struct Transfer {
    info: Arc<TransferInfo>,
    queue: QueueOrder,
    save_path: String,

    max_uploads: i32,
    max_connections: i32,
    upload_limit: i32,
    download_limit: i32,

    paused: bool,
    graceful_pause: bool,
    auto_managed: bool,
    sequential_download: bool,
    super_seeding: bool,
    upload_mode: bool,

    piece_priorities: Vec<u8>,
    file_priorities: Vec<u8>,
    have: Vec<bool>,

    trackers: Vec<TrackerEntry>,
    url_seeds: BTreeSet<String>,
    http_seeds: BTreeSet<String>,

    error: Option<String>,

    // Set once the session has removed this transfer; queue operations
    // from tasks still in flight must not re-enter the shared order.
    detached: bool,
}

impl Transfer {
    pub(crate) fn new(info: TransferInfo, settings: TransferSettings, queue: QueueOrder) -> Self {
        let num_pieces = info.num_pieces();
        let num_files = info.files.len();

        let mut transfer = Self {
            info: Arc::new(info),
            queue,
            save_path: settings.save_path,
            max_uploads: UNLIMITED,
            max_connections: UNLIMITED,
            upload_limit: 0,
            download_limit: 0,
            paused: settings.paused,
            graceful_pause: false,
            auto_managed: settings.auto_managed,
            sequential_download: settings.sequential_download,
            super_seeding: false,
            upload_mode: false,
            piece_priorities: vec![DEFAULT_PRIORITY; num_pieces],
            file_priorities: vec![DEFAULT_PRIORITY; num_files],
            have: vec![false; num_pieces],
            trackers: Vec::new(),
            url_seeds: BTreeSet::new(),
            http_seeds: BTreeSet::new(),
            error: None,
            detached: false,
        };
        transfer.replace_trackers(settings.trackers);
        transfer
    }

    pub fn info_hash(&self) -> InfoHash {
        self.info.info_hash
    }

    pub fn name(&self) -> String {
        self.info.name.clone()
    }

    pub fn save_path(&self) -> String {
        self.save_path.clone()
    }

    /// Owned snapshot of the layout; later renames do not affect it
    pub fn torrent_file(&self) -> Arc<TransferInfo> {
        Arc::clone(&self.info)
    }

    // Limits

    pub fn max_uploads(&self) -> i32 {
        self.max_uploads
    }

    pub fn set_max_uploads(&mut self, limit: i32) {
        self.max_uploads = limit;
    }

    pub fn max_connections(&self) -> i32 {
        self.max_connections
    }

    pub fn set_max_connections(&mut self, limit: i32) {
        self.max_connections = limit;
    }

    pub fn upload_limit(&self) -> i32 {
        self.upload_limit
    }

    pub fn set_upload_limit(&mut self, limit: i32) {
        self.upload_limit = limit;
    }

    pub fn download_limit(&self) -> i32 {
        self.download_limit
    }

    pub fn set_download_limit(&mut self, limit: i32) {
        self.download_limit = limit;
    }

    // Run state

    pub fn pause(&mut self, graceful: bool) {
        self.paused = true;
        self.graceful_pause = graceful;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.graceful_pause = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_auto_managed(&self) -> bool {
        self.auto_managed
    }

    /// Auto-managed transfers take part in the session queue
    pub fn set_auto_managed(&mut self, auto_managed: bool) {
        if self.auto_managed == auto_managed {
            return;
        }
        self.auto_managed = auto_managed;
        if self.detached {
            return;
        }
        if auto_managed {
            self.queue.enter(self.info_hash());
        } else {
            self.queue.leave(&self.info_hash());
        }
    }

    pub fn is_sequential_download(&self) -> bool {
        self.sequential_download
    }

    pub fn set_sequential_download(&mut self, sequential: bool) {
        self.sequential_download = sequential;
    }

    pub fn super_seeding(&self) -> bool {
        self.super_seeding
    }

    /// Super seeding only makes sense once every piece is present
    pub fn set_super_seeding(&mut self, on: bool) {
        self.super_seeding = on && self.is_seed();
    }

    pub fn upload_mode(&self) -> bool {
        self.upload_mode
    }

    pub fn set_upload_mode(&mut self, on: bool) {
        self.upload_mode = on;
    }

    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // Queue

    /// -1 once detached, even if a new transfer with the same key is queued
    pub fn queue_position(&self) -> i32 {
        if self.detached {
            return -1;
        }
        self.queue.position(&self.info_hash())
    }

    pub fn set_queue_position(&mut self, position: i32) {
        if !self.detached {
            self.queue.move_to(&self.info_hash(), position);
        }
    }

    pub fn queue_up(&mut self) {
        let position = self.queue_position();
        if position > 0 {
            self.set_queue_position(position - 1);
        }
    }

    pub fn queue_down(&mut self) {
        let position = self.queue_position();
        if position >= 0 {
            self.set_queue_position(position + 1);
        }
    }

    pub(crate) fn enter_queue(&mut self) {
        if self.auto_managed && !self.detached {
            self.queue.enter(self.info_hash());
        }
    }

    /// Leave the session queue for good
    pub(crate) fn detach(&mut self) {
        self.detached = true;
        self.queue.leave(&self.info_hash());
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    // Priorities

    pub fn piece_priority(&self, index: usize) -> u8 {
        self.piece_priorities.get(index).copied().unwrap_or(0)
    }

    pub fn set_piece_priority(&mut self, index: usize, priority: u8) {
        if let Some(slot) = self.piece_priorities.get_mut(index) {
            *slot = priority.min(MAX_PRIORITY);
        }
    }

    pub fn piece_priorities(&self) -> Vec<u8> {
        self.piece_priorities.clone()
    }

    pub fn prioritize_pieces(&mut self, priorities: Vec<u8>) {
        for (slot, priority) in self.piece_priorities.iter_mut().zip(priorities) {
            *slot = priority.min(MAX_PRIORITY);
        }
    }

    pub fn prioritize_piece_list(&mut self, pieces: Vec<(usize, u8)>) {
        for (index, priority) in pieces {
            self.set_piece_priority(index, priority);
        }
    }

    pub fn file_priority(&self, index: usize) -> u8 {
        self.file_priorities.get(index).copied().unwrap_or(0)
    }

    pub fn set_file_priority(&mut self, index: usize, priority: u8) {
        if let Some(slot) = self.file_priorities.get_mut(index) {
            *slot = priority.min(MAX_PRIORITY);
        }
    }

    pub fn file_priorities(&self) -> Vec<u8> {
        self.file_priorities.clone()
    }

    pub fn prioritize_files(&mut self, priorities: Vec<u8>) {
        for (slot, priority) in self.file_priorities.iter_mut().zip(priorities) {
            *slot = priority.min(MAX_PRIORITY);
        }
    }

    // Pieces and progress

    pub fn have_piece(&self, index: usize) -> bool {
        self.have.get(index).copied().unwrap_or(false)
    }

    /// Store a downloaded piece. Data of the wrong size is recorded as an
    /// error instead of being accepted.
    pub fn add_piece(&mut self, index: usize, data: Vec<u8>) {
        let expected = self.info.piece_size(index);
        if index >= self.have.len() || data.len() as u64 != expected {
            warn!(
                info_hash = %self.info_hash(),
                piece = index,
                size = data.len(),
                expected,
                "Rejected piece with unexpected size"
            );
            self.error = Some(format!("piece {} has {} bytes, expected {}", index, data.len(), expected));
            return;
        }
        self.have[index] = true;
    }

    /// Forget all piece data; it will be verified again
    pub fn force_recheck(&mut self) {
        debug!(info_hash = %self.info_hash(), "Recheck requested, dropping piece state");
        self.have.iter_mut().for_each(|h| *h = false);
        self.super_seeding = false;
        self.error = None;
    }

    /// Bytes downloaded per file
    pub fn file_progress(&self) -> Vec<u64> {
        let ranges = self.info.file_ranges();
        let mut progress = vec![0u64; ranges.len()];

        for (piece, _) in self.have.iter().enumerate().filter(|(_, have)| **have) {
            let (piece_start, piece_end) = self.info.piece_range(piece);
            for (file, (file_start, file_end)) in ranges.iter().enumerate() {
                let start = piece_start.max(*file_start);
                let end = piece_end.min(*file_end);
                if start < end {
                    progress[file] += end - start;
                }
            }
        }
        progress
    }

    fn piece_wanted(&self, index: usize, ranges: &[(u64, u64)]) -> bool {
        if self.piece_priority(index) == 0 {
            return false;
        }
        let (piece_start, piece_end) = self.info.piece_range(index);
        ranges.iter().enumerate().any(|(file, (file_start, file_end))| {
            self.file_priority(file) > 0 && piece_start < *file_end && *file_start < piece_end
        })
    }

    pub fn is_seed(&self) -> bool {
        !self.have.is_empty() && self.have.iter().all(|h| *h)
    }

    pub fn is_finished(&self) -> bool {
        let ranges = self.info.file_ranges();
        (0..self.have.len()).all(|i| self.have[i] || !self.piece_wanted(i, &ranges))
    }

    // Files and storage

    /// Rename a file. Earlier `torrent_file` snapshots keep the old name.
    pub fn rename_file(&mut self, index: usize, new_name: String) {
        let info = Arc::make_mut(&mut self.info);
        if let Some(file) = info.files.get_mut(index) {
            file.path = new_name;
        }
    }

    pub fn move_storage(&mut self, save_path: String) {
        if save_path.trim().is_empty() {
            self.error = Some("move_storage: empty save path".to_string());
            return;
        }
        self.save_path = save_path;
    }

    // Trackers and seeds

    pub fn trackers(&self) -> Vec<TrackerEntry> {
        self.trackers.clone()
    }

    /// Add unless the url is already known; kept ordered by tier
    pub fn add_tracker(&mut self, tracker: TrackerEntry) {
        if self.trackers.iter().any(|t| t.url == tracker.url) {
            return;
        }
        let at = self
            .trackers
            .iter()
            .position(|t| t.tier > tracker.tier)
            .unwrap_or(self.trackers.len());
        self.trackers.insert(at, tracker);
    }

    pub fn replace_trackers(&mut self, trackers: Vec<TrackerEntry>) {
        self.trackers.clear();
        for tracker in trackers {
            self.add_tracker(tracker);
        }
    }

    pub fn add_web_seed(&mut self, url: String, kind: SeedKind) {
        self.seeds_mut(kind).insert(url);
    }

    pub fn remove_web_seed(&mut self, url: &str, kind: SeedKind) {
        self.seeds_mut(kind).remove(url);
    }

    pub fn web_seeds(&self, kind: SeedKind) -> BTreeSet<String> {
        match kind {
            SeedKind::Url => self.url_seeds.clone(),
            SeedKind::Http => self.http_seeds.clone(),
        }
    }

    fn seeds_mut(&mut self, kind: SeedKind) -> &mut BTreeSet<String> {
        match kind {
            SeedKind::Url => &mut self.url_seeds,
            SeedKind::Http => &mut self.http_seeds,
        }
    }

    // Status

    pub fn state(&self) -> TransferState {
        if self.is_seed() {
            TransferState::Seeding
        } else if self.is_finished() {
            TransferState::Finished
        } else {
            TransferState::Downloading
        }
    }

    pub fn status(&self) -> TransferStatus {
        let ranges = self.info.file_ranges();
        let mut total_done = 0;
        let mut total_wanted = 0;
        let mut total_wanted_done = 0;

        for index in 0..self.have.len() {
            let size = self.info.piece_size(index);
            let wanted = self.piece_wanted(index, &ranges);
            if self.have[index] {
                total_done += size;
                if wanted {
                    total_wanted_done += size;
                }
            }
            if wanted {
                total_wanted += size;
            }
        }

        let progress = if total_wanted == 0 {
            1.0
        } else {
            total_wanted_done as f32 / total_wanted as f32
        };

        TransferStatus {
            info_hash: self.info_hash(),
            name: self.info.name.clone(),
            state: self.state(),
            paused: self.paused,
            auto_managed: self.auto_managed,
            queue_position: self.queue_position(),
            num_pieces: self.have.len(),
            pieces_done: self.have.iter().filter(|h| **h).count(),
            total_done,
            total_wanted,
            total_wanted_done,
            progress,
            upload_limit: self.upload_limit,
            download_limit: self.download_limit,
            sequential_download: self.sequential_download,
            super_seeding: self.super_seeding,
            upload_mode: self.upload_mode,
            num_trackers: self.trackers.len(),
            error: self.error.clone(),
        }
    }
}
