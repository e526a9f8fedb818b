//! Transfer handle behaviour through a live session

use actor_dispatch::{ExecutorConfig, WaitStrategy};
use std::collections::HashSet;
use std::thread;
use transfer_session::{
    FileEntry, Session, TrackerEntry, TransferHandle, TransferParams, TransferState,
    TransferStatus, DEFAULT_PRIORITY,
};

const STRATEGIES: [WaitStrategy; 2] = [WaitStrategy::PerCall, WaitStrategy::PerExecutor];

fn session(strategy: WaitStrategy) -> Session {
    Session::new(ExecutorConfig::named("transfer-test").with_wait_strategy(strategy)).unwrap()
}

fn two_files(name: &str) -> TransferParams {
    TransferParams {
        files: vec![
            FileEntry { path: "one".to_string(), size: 40 },
            FileEntry { path: "two".to_string(), size: 24 },
        ],
        ..TransferParams::single_file(name, 64, 16)
    }
}

fn fill(handle: &TransferHandle, pieces: usize) {
    for piece in 0..pieces {
        handle.add_piece(piece, vec![0; 16]).unwrap();
    }
}

#[test]
fn test_setters_visible_to_following_reads() {
    for strategy in STRATEGIES {
        let session = session(strategy);
        let handle = session.add_transfer(two_files("limits")).unwrap();

        assert_eq!(handle.max_uploads(), -1);
        assert_eq!(handle.max_connections(), -1);

        handle.set_max_uploads(8).unwrap();
        handle.set_max_connections(50).unwrap();
        handle.set_upload_limit(1000).unwrap();
        handle.set_download_limit(-1).unwrap();

        assert_eq!(handle.max_uploads(), 8);
        assert_eq!(handle.max_connections(), 50);
        assert_eq!(handle.upload_limit(), 1000);
        assert_eq!(handle.download_limit(), -1);

        handle.pause(true);
        assert!(handle.is_paused());
        handle.resume();
        assert!(!handle.is_paused());

        handle.set_sequential_download(true);
        assert!(handle.is_sequential_download());
    }
}

#[test]
fn test_invalid_arguments_rejected_before_dispatch() {
    let session = session(WaitStrategy::PerCall);
    let handle = session.add_transfer(two_files("args")).unwrap();
    let before = session.stats().tasks_submitted;

    assert!(handle.set_max_uploads(1).is_err());
    assert!(handle.set_upload_limit(-7).is_err());
    assert!(handle.set_piece_priority(4, 1).is_err());
    assert!(handle.set_piece_priority(0, 8).is_err());
    assert!(handle.set_file_priority(2, 1).is_err());
    assert!(handle.prioritize_pieces(vec![1, 2]).is_err());
    assert!(handle.add_piece(99, vec![0; 16]).is_err());
    assert!(handle.rename_file(0, "").is_err());
    assert!(handle.add_url_seed("").is_err());

    assert_eq!(session.stats().tasks_submitted, before);
}

#[test]
fn test_priorities_and_progress() {
    let session = session(WaitStrategy::PerExecutor);
    let handle = session.add_transfer(two_files("progress")).unwrap();

    assert_eq!(handle.piece_priorities(), vec![DEFAULT_PRIORITY; 4]);
    handle.prioritize_pieces(vec![7, 6, 5, 0]).unwrap();
    handle.prioritize_piece_list(vec![(3, 1)]).unwrap();
    assert_eq!(handle.piece_priorities(), vec![7, 6, 5, 1]);
    assert_eq!(handle.piece_priority(0), 7);

    handle.prioritize_files(vec![1, 0]).unwrap();
    assert_eq!(handle.file_priorities(), vec![1, 0]);
    assert_eq!(handle.file_priority(1), 0);

    // Piece 2 covers bytes 32..48: 8 in "one", 8 in "two"
    handle.add_piece(2, vec![0; 16]).unwrap();
    assert!(handle.have_piece(2));
    assert_eq!(handle.file_progress(), vec![8, 8]);
    assert!(!handle.is_finished());

    fill(&handle, 2);
    assert!(handle.is_finished());
    assert!(!handle.is_seed());

    fill(&handle, 4);
    assert!(handle.is_seed());
    let status = handle.status();
    assert_eq!(status.state, TransferState::Seeding);
    assert_eq!(status.pieces_done, 4);
    assert_eq!(status.total_done, 64);
}

#[test]
fn test_trackers_and_seeds() {
    let session = session(WaitStrategy::PerCall);
    let handle = session.add_transfer(two_files("trackers")).unwrap();

    handle.add_tracker(TrackerEntry::new("udp://tier1", 1)).unwrap();
    handle.add_tracker(TrackerEntry::new("udp://tier0", 0)).unwrap();
    let urls: Vec<_> = handle.trackers().into_iter().map(|t| t.url).collect();
    assert_eq!(urls, vec!["udp://tier0", "udp://tier1"]);

    handle
        .replace_trackers(vec![TrackerEntry::new("http://only", 0)])
        .unwrap();
    assert_eq!(handle.trackers().len(), 1);

    handle.add_url_seed("http://mirror/a").unwrap();
    handle.add_url_seed("http://mirror/a").unwrap();
    handle.add_http_seed("http://seed/b").unwrap();
    assert_eq!(handle.url_seeds().len(), 1);
    assert_eq!(handle.http_seeds().len(), 1);

    handle.remove_url_seed("http://mirror/a");
    assert!(handle.url_seeds().is_empty());
}

#[test]
fn test_storage_and_error_state() {
    let session = session(WaitStrategy::PerCall);
    let handle = session.add_transfer(two_files("storage")).unwrap();

    handle.move_storage("/data/downloads");
    assert_eq!(handle.save_path(), "/data/downloads");

    handle.move_storage("");
    assert!(handle.status().error.is_some());
    assert_eq!(handle.save_path(), "/data/downloads");
    handle.clear_error();
    assert!(handle.status().error.is_none());

    let snapshot = handle.torrent_file().unwrap();
    handle.rename_file(1, "renamed").unwrap();
    assert_eq!(snapshot.files[1].path, "two");
    assert_eq!(handle.torrent_file().unwrap().files[1].path, "renamed");
    assert_eq!(handle.name(), "storage");
}

#[test]
fn test_queue_positions_follow_session_order() {
    let session = session(WaitStrategy::PerCall);
    let a = session.add_transfer(two_files("a")).unwrap();
    let b = session.add_transfer(two_files("b")).unwrap();
    let manual = session
        .add_transfer(TransferParams {
            auto_managed: false,
            ..two_files("manual")
        })
        .unwrap();
    let c = session.add_transfer(two_files("c")).unwrap();

    assert_eq!(
        [a.queue_position(), b.queue_position(), c.queue_position()],
        [0, 1, 2]
    );
    assert_eq!(manual.queue_position(), -1);

    c.queue_position_top();
    assert_eq!(c.queue_position(), 0);
    assert_eq!(a.queue_position(), 1);

    c.queue_position_bottom();
    a.queue_position_down();
    assert_eq!(
        [b.queue_position(), a.queue_position(), c.queue_position()],
        [0, 1, 2]
    );

    b.queue_position_up(); // already at the top
    assert_eq!(b.queue_position(), 0);

    assert!(session.remove_transfer(&b));
    assert_eq!(a.queue_position(), 0);
    assert_eq!(c.queue_position(), 1);

    manual.set_auto_managed(true);
    assert_eq!(manual.queue_position(), 2);

    let order: Vec<_> = session.transfers().iter().map(|h| h.info_hash()).collect();
    assert_eq!(order, vec![a.info_hash(), c.info_hash(), manual.info_hash()]);
}

#[test_log::test]
fn test_removed_transfer_returns_defaults() {
    for strategy in STRATEGIES {
        let session = session(strategy);
        let handle = session.add_transfer(two_files("gone")).unwrap();
        handle.set_upload_limit(500).unwrap();
        fill(&handle, 4);

        assert!(session.remove_transfer(&handle));
        assert!(!session.remove_transfer(&handle));
        assert!(!handle.is_valid());

        assert_eq!(handle.max_uploads(), 0);
        assert_eq!(handle.upload_limit(), 0);
        assert_eq!(handle.queue_position(), -1);
        assert_eq!(handle.piece_priority(0), 0);
        assert!(handle.piece_priorities().is_empty());
        assert!(handle.file_progress().is_empty());
        assert!(!handle.have_piece(0));
        assert!(!handle.is_seed());
        assert!(handle.trackers().is_empty());
        assert!(handle.url_seeds().is_empty());
        assert_eq!(handle.name(), "");
        assert!(handle.torrent_file().is_none());
        assert_eq!(handle.status(), TransferStatus::default());

        // Validation still runs; dispatch is a silent no-op
        assert!(handle.set_upload_limit(10).is_ok());
        assert!(handle.add_piece(0, vec![0; 16]).is_ok());
        handle.pause(false);

        // Identity and cached key survive removal
        assert_eq!(session.find_transfer(&handle.info_hash()), None);
        assert_eq!(handle.info_hash(), transfer_session::InfoHash::from_name("gone"));
    }
}

#[test]
fn test_readding_after_removal_gives_new_identity() {
    let session = session(WaitStrategy::PerCall);
    let first = session.add_transfer(two_files("again")).unwrap();
    assert!(session.remove_transfer(&first));

    let second = session.add_transfer(two_files("again")).unwrap();
    assert_eq!(first.info_hash(), second.info_hash());
    assert_ne!(first, second);
    assert!(!session.remove_transfer(&first));
    assert!(second.is_valid());

    let set: HashSet<TransferHandle> = [first.clone(), second.clone(), first].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn test_concurrent_callers_with_removal() {
    for strategy in STRATEGIES {
        let session = session(strategy);
        let handle = session.add_transfer(two_files("race")).unwrap();

        thread::scope(|scope| {
            for worker in 0..8 {
                let handle = handle.clone();
                scope.spawn(move || {
                    for call in 0..200 {
                        let limit = (worker * 1000 + call) as i32;
                        handle.set_download_limit(limit).unwrap();
                        let seen = handle.download_limit();
                        assert!((0..8000).contains(&seen));
                        let position = handle.queue_position();
                        assert!(position == 0 || position == -1);
                    }
                });
            }
            scope.spawn(|| {
                thread::yield_now();
                assert!(session.remove_transfer(&handle));
            });
        });

        assert!(!handle.is_valid());
        assert_eq!(handle.queue_position(), -1);
        assert_eq!(session.stats().task_panics, 0);
    }
}

#[test]
fn test_shutdown_invalidates_handles() {
    let session = session(WaitStrategy::PerExecutor);
    let handles: Vec<_> = (0..5)
        .map(|i| session.add_transfer(two_files(&format!("t{}", i))).unwrap())
        .collect();

    session.shutdown();
    for handle in &handles {
        assert!(!handle.is_valid());
        assert_eq!(handle.status(), TransferStatus::default());
    }
    assert!(session.is_empty());
}

#[test]
fn test_in_flight_calls_cannot_requeue_removed_transfer() {
    for strategy in STRATEGIES {
        let session = session(strategy);
        let a = session.add_transfer(two_files("a")).unwrap();
        let b = session
            .add_transfer(TransferParams {
                auto_managed: false,
                ..two_files("b")
            })
            .unwrap();

        // Strong references taken before removal keep the actor alive
        let late_toggle = b.inner().native_reference().unwrap();
        let late_move = b.inner().native_reference().unwrap();
        assert!(session.remove_transfer(&b));

        late_toggle.into_post(|t| t.set_auto_managed(true)).unwrap();
        let c = session.add_transfer(two_files("c")).unwrap();
        assert_eq!([a.queue_position(), c.queue_position()], [0, 1]);

        // Re-adding the same key must not let the old actor steer the new one
        let b_again = session.add_transfer(two_files("b")).unwrap();
        assert_eq!(b_again.queue_position(), 2);
        let stale_position = late_move
            .into_call_with_result(|t| {
                t.set_queue_position(0);
                t.queue_position()
            })
            .unwrap();
        assert_eq!(stale_position, -1);

        assert_eq!(
            [a.queue_position(), c.queue_position(), b_again.queue_position()],
            [0, 1, 2]
        );
        assert_eq!(b.queue_position(), -1);
    }
}
