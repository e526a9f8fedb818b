//! Transfer Handle
//!
//! Caller-facing wrapper around [`Handle<Transfer>`]. Every operation is a
//! one-line use of one of the three call shapes; results fall back to a
//! documented default when the transfer has been removed. Arguments are
//! checked here, on the calling thread, before anything reaches the
//! executor.

use crate::transfer::{SeedKind, Transfer, MAX_PRIORITY, UNLIMITED};
use crate::types::{InfoHash, TrackerEntry, TransferInfo, TransferStatus};

use actor_dispatch::{ActorId, DispatchError, Handle};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Clone)]
pub struct TransferHandle {
    handle: Handle<Transfer>,
    info_hash: InfoHash,
    num_pieces: usize,
    num_files: usize,
}

impl TransferHandle {
    pub(crate) fn new(handle: Handle<Transfer>, info: &TransferInfo) -> Self {
        Self {
            handle,
            info_hash: info.info_hash,
            num_pieces: info.num_pieces(),
            num_files: info.files.len(),
        }
    }

    /// Cached key; never dispatches
    pub fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    pub fn id(&self) -> ActorId {
        self.handle.id()
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn inner(&self) -> &Handle<Transfer> {
        &self.handle
    }

    // Limits

    pub fn set_max_uploads(&self, limit: i32) -> Result<()> {
        check_cap("set_max_uploads", limit)?;
        self.handle.dispatch_async(move |t| t.set_max_uploads(limit));
        Ok(())
    }

    pub fn max_uploads(&self) -> i32 {
        self.handle.dispatch_sync_with_result(0, |t| t.max_uploads())
    }

    pub fn set_max_connections(&self, limit: i32) -> Result<()> {
        check_cap("set_max_connections", limit)?;
        self.handle.dispatch_async(move |t| t.set_max_connections(limit));
        Ok(())
    }

    pub fn max_connections(&self) -> i32 {
        self.handle.dispatch_sync_with_result(0, |t| t.max_connections())
    }

    pub fn set_upload_limit(&self, limit: i32) -> Result<()> {
        check_limit("set_upload_limit", limit)?;
        self.handle.dispatch_async(move |t| t.set_upload_limit(limit));
        Ok(())
    }

    pub fn upload_limit(&self) -> i32 {
        self.handle.dispatch_sync_with_result(0, |t| t.upload_limit())
    }

    pub fn set_download_limit(&self, limit: i32) -> Result<()> {
        check_limit("set_download_limit", limit)?;
        self.handle.dispatch_async(move |t| t.set_download_limit(limit));
        Ok(())
    }

    pub fn download_limit(&self) -> i32 {
        self.handle.dispatch_sync_with_result(0, |t| t.download_limit())
    }

    // Run state

    pub fn pause(&self, graceful: bool) {
        self.handle.dispatch_async(move |t| t.pause(graceful));
    }

    pub fn resume(&self) {
        self.handle.dispatch_async(|t| t.resume());
    }

    pub fn is_paused(&self) -> bool {
        self.handle.dispatch_sync_with_result(false, |t| t.is_paused())
    }

    pub fn set_auto_managed(&self, auto_managed: bool) {
        self.handle.dispatch_async(move |t| t.set_auto_managed(auto_managed));
    }

    pub fn is_auto_managed(&self) -> bool {
        self.handle.dispatch_sync_with_result(false, |t| t.is_auto_managed())
    }

    pub fn set_sequential_download(&self, sequential: bool) {
        self.handle
            .dispatch_async(move |t| t.set_sequential_download(sequential));
    }

    pub fn is_sequential_download(&self) -> bool {
        self.handle
            .dispatch_sync_with_result(false, |t| t.is_sequential_download())
    }

    pub fn set_super_seeding(&self, on: bool) {
        self.handle.dispatch_async(move |t| t.set_super_seeding(on));
    }

    pub fn super_seeding(&self) -> bool {
        self.handle.dispatch_sync_with_result(false, |t| t.super_seeding())
    }

    pub fn set_upload_mode(&self, on: bool) {
        self.handle.dispatch_async(move |t| t.set_upload_mode(on));
    }

    pub fn clear_error(&self) {
        self.handle.dispatch_async(|t| t.clear_error());
    }

    // Queue

    /// -1 when the transfer is not queued or has been removed
    pub fn queue_position(&self) -> i32 {
        self.handle.dispatch_sync_with_result(-1, |t| t.queue_position())
    }

    pub fn queue_position_up(&self) {
        self.handle.dispatch_async(|t| t.queue_up());
    }

    pub fn queue_position_down(&self) {
        self.handle.dispatch_async(|t| t.queue_down());
    }

    pub fn queue_position_top(&self) {
        self.handle.dispatch_async(|t| t.set_queue_position(0));
    }

    pub fn queue_position_bottom(&self) {
        self.handle
            .dispatch_async(|t| t.set_queue_position(i32::MAX));
    }

    // Priorities

    pub fn set_piece_priority(&self, index: usize, priority: u8) -> Result<()> {
        check_index("set_piece_priority", index, self.num_pieces)?;
        check_priority("set_piece_priority", priority)?;
        self.handle
            .dispatch_async(move |t| t.set_piece_priority(index, priority));
        Ok(())
    }

    pub fn piece_priority(&self, index: usize) -> u8 {
        self.handle
            .dispatch_sync_with_result(0, move |t| t.piece_priority(index))
    }

    /// One priority per piece
    pub fn prioritize_pieces(&self, priorities: Vec<u8>) -> Result<()> {
        if priorities.len() != self.num_pieces {
            return Err(DispatchError::invalid_argument(
                "prioritize_pieces",
                format!("expected {} priorities, got {}", self.num_pieces, priorities.len()),
            ));
        }
        priorities
            .iter()
            .try_for_each(|p| check_priority("prioritize_pieces", *p))?;
        self.handle
            .dispatch_async(move |t| t.prioritize_pieces(priorities));
        Ok(())
    }

    /// Sparse `(piece, priority)` updates
    pub fn prioritize_piece_list(&self, pieces: Vec<(usize, u8)>) -> Result<()> {
        for (index, priority) in &pieces {
            check_index("prioritize_piece_list", *index, self.num_pieces)?;
            check_priority("prioritize_piece_list", *priority)?;
        }
        self.handle
            .dispatch_async(move |t| t.prioritize_piece_list(pieces));
        Ok(())
    }

    pub fn piece_priorities(&self) -> Vec<u8> {
        self.handle
            .dispatch_sync_with_result(Vec::new(), |t| t.piece_priorities())
    }

    pub fn set_file_priority(&self, index: usize, priority: u8) -> Result<()> {
        check_index("set_file_priority", index, self.num_files)?;
        check_priority("set_file_priority", priority)?;
        self.handle
            .dispatch_async(move |t| t.set_file_priority(index, priority));
        Ok(())
    }

    pub fn file_priority(&self, index: usize) -> u8 {
        self.handle
            .dispatch_sync_with_result(0, move |t| t.file_priority(index))
    }

    pub fn prioritize_files(&self, priorities: Vec<u8>) -> Result<()> {
        if priorities.len() != self.num_files {
            return Err(DispatchError::invalid_argument(
                "prioritize_files",
                format!("expected {} priorities, got {}", self.num_files, priorities.len()),
            ));
        }
        priorities
            .iter()
            .try_for_each(|p| check_priority("prioritize_files", *p))?;
        self.handle
            .dispatch_async(move |t| t.prioritize_files(priorities));
        Ok(())
    }

    pub fn file_priorities(&self) -> Vec<u8> {
        self.handle
            .dispatch_sync_with_result(Vec::new(), |t| t.file_priorities())
    }

    // Pieces and progress

    /// Blocks until the piece has been stored (or rejected)
    pub fn add_piece(&self, index: usize, data: Vec<u8>) -> Result<()> {
        check_index("add_piece", index, self.num_pieces)?;
        self.handle.dispatch_sync(move |t| t.add_piece(index, data));
        Ok(())
    }

    pub fn have_piece(&self, index: usize) -> bool {
        self.handle
            .dispatch_sync_with_result(false, move |t| t.have_piece(index))
    }

    pub fn file_progress(&self) -> Vec<u64> {
        self.handle
            .dispatch_sync_with_result(Vec::new(), |t| t.file_progress())
    }

    pub fn force_recheck(&self) {
        self.handle.dispatch_async(|t| t.force_recheck());
    }

    pub fn is_seed(&self) -> bool {
        self.handle.dispatch_sync_with_result(false, |t| t.is_seed())
    }

    pub fn is_finished(&self) -> bool {
        self.handle.dispatch_sync_with_result(false, |t| t.is_finished())
    }

    pub fn status(&self) -> TransferStatus {
        self.handle
            .dispatch_sync_with_result(TransferStatus::default(), |t| t.status())
    }

    // Files and storage

    pub fn name(&self) -> String {
        self.handle.dispatch_sync_with_result(String::new(), |t| t.name())
    }

    pub fn save_path(&self) -> String {
        self.handle
            .dispatch_sync_with_result(String::new(), |t| t.save_path())
    }

    /// Owned snapshot of the transfer layout, `None` once removed
    pub fn torrent_file(&self) -> Option<Arc<TransferInfo>> {
        self.handle
            .dispatch_sync_with_result(None, |t| Some(t.torrent_file()))
    }

    pub fn rename_file(&self, index: usize, new_name: impl Into<String>) -> Result<()> {
        check_index("rename_file", index, self.num_files)?;
        let new_name = new_name.into();
        if new_name.is_empty() {
            return Err(DispatchError::invalid_argument(
                "rename_file",
                "new name must not be empty",
            ));
        }
        self.handle
            .dispatch_async(move |t| t.rename_file(index, new_name));
        Ok(())
    }

    pub fn move_storage(&self, save_path: impl Into<String>) {
        let save_path = save_path.into();
        self.handle.dispatch_async(move |t| t.move_storage(save_path));
    }

    // Trackers and seeds

    pub fn trackers(&self) -> Vec<TrackerEntry> {
        self.handle
            .dispatch_sync_with_result(Vec::new(), |t| t.trackers())
    }

    pub fn add_tracker(&self, tracker: TrackerEntry) -> Result<()> {
        check_url("add_tracker", &tracker.url)?;
        self.handle.dispatch_async(move |t| t.add_tracker(tracker));
        Ok(())
    }

    pub fn replace_trackers(&self, trackers: Vec<TrackerEntry>) -> Result<()> {
        trackers
            .iter()
            .try_for_each(|t| check_url("replace_trackers", &t.url))?;
        self.handle
            .dispatch_async(move |t| t.replace_trackers(trackers));
        Ok(())
    }

    pub fn add_url_seed(&self, url: impl Into<String>) -> Result<()> {
        self.add_seed("add_url_seed", url.into(), SeedKind::Url)
    }

    pub fn remove_url_seed(&self, url: impl Into<String>) {
        self.remove_seed(url.into(), SeedKind::Url);
    }

    pub fn url_seeds(&self) -> BTreeSet<String> {
        self.handle
            .dispatch_sync_with_result(BTreeSet::new(), |t| t.web_seeds(SeedKind::Url))
    }

    pub fn add_http_seed(&self, url: impl Into<String>) -> Result<()> {
        self.add_seed("add_http_seed", url.into(), SeedKind::Http)
    }

    pub fn remove_http_seed(&self, url: impl Into<String>) {
        self.remove_seed(url.into(), SeedKind::Http);
    }

    pub fn http_seeds(&self) -> BTreeSet<String> {
        self.handle
            .dispatch_sync_with_result(BTreeSet::new(), |t| t.web_seeds(SeedKind::Http))
    }

    fn add_seed(&self, operation: &'static str, url: String, kind: SeedKind) -> Result<()> {
        check_url(operation, &url)?;
        self.handle.dispatch_async(move |t| t.add_web_seed(url, kind));
        Ok(())
    }

    fn remove_seed(&self, url: String, kind: SeedKind) {
        self.handle
            .dispatch_async(move |t| t.remove_web_seed(&url, kind));
    }
}

fn check_limit(operation: &'static str, limit: i32) -> Result<()> {
    if limit < UNLIMITED {
        return Err(DispatchError::invalid_argument(
            operation,
            format!("limit {} is below -1", limit),
        ));
    }
    Ok(())
}

// Upload slot and connection caps below 2 make a transfer unusable
fn check_cap(operation: &'static str, limit: i32) -> Result<()> {
    if limit != UNLIMITED && limit < 2 {
        return Err(DispatchError::invalid_argument(
            operation,
            format!("cap {} must be -1 or at least 2", limit),
        ));
    }
    Ok(())
}

fn check_priority(operation: &'static str, priority: u8) -> Result<()> {
    if priority > MAX_PRIORITY {
        return Err(DispatchError::invalid_argument(
            operation,
            format!("priority {} is above {}", priority, MAX_PRIORITY),
        ));
    }
    Ok(())
}

fn check_index(operation: &'static str, index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(DispatchError::invalid_argument(
            operation,
            format!("index {} out of range 0..{}", index, len),
        ));
    }
    Ok(())
}

fn check_url(operation: &'static str, url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(DispatchError::invalid_argument(operation, "url must not be empty"));
    }
    Ok(())
}

impl PartialEq for TransferHandle {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for TransferHandle {}

impl Hash for TransferHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Debug for TransferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferHandle")
            .field("info_hash", &self.info_hash)
            .field("actor_id", &self.handle.id())
            .field("valid", &self.is_valid())
            .finish()
    }
}
