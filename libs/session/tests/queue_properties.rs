//! Queue ordering stays a permutation of the auto-managed transfers no
//! matter how callers reorder it.

use actor_dispatch::ExecutorConfig;
use proptest::prelude::*;
use std::collections::HashSet;
use transfer_session::{Session, TransferHandle, TransferParams};

#[derive(Debug, Clone)]
enum Move {
    Up(usize),
    Down(usize),
    Top(usize),
    Bottom(usize),
}

fn moves(transfers: usize) -> impl Strategy<Value = Vec<Move>> {
    let one = prop_oneof![
        (0..transfers).prop_map(Move::Up),
        (0..transfers).prop_map(Move::Down),
        (0..transfers).prop_map(Move::Top),
        (0..transfers).prop_map(Move::Bottom),
    ];
    prop::collection::vec(one, 0..40)
}

fn apply(model: &mut Vec<usize>, mv: &Move) {
    let (who, target) = match *mv {
        Move::Up(i) => {
            let at = model.iter().position(|x| *x == i).unwrap_or(0);
            (i, at.saturating_sub(1))
        }
        Move::Down(i) => {
            let at = model.iter().position(|x| *x == i).unwrap_or(0);
            (i, (at + 1).min(model.len() - 1))
        }
        Move::Top(i) => (i, 0),
        Move::Bottom(i) => (i, model.len() - 1),
    };
    model.retain(|x| *x != who);
    model.insert(target, who);
}

fn issue(handle: &TransferHandle, mv: &Move) {
    match mv {
        Move::Up(_) => handle.queue_position_up(),
        Move::Down(_) => handle.queue_position_down(),
        Move::Top(_) => handle.queue_position_top(),
        Move::Bottom(_) => handle.queue_position_bottom(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn queue_matches_sequential_model(count in 1usize..6, plan in moves(6)) {
        let session = Session::new(ExecutorConfig::named("queue-prop")).unwrap();
        let handles: Vec<_> = (0..count)
            .map(|i| session.add_transfer(TransferParams::single_file(format!("q{}", i), 32, 16)).unwrap())
            .collect();

        let mut model: Vec<usize> = (0..count).collect();
        for mv in plan.iter().filter(|mv| match mv {
            Move::Up(i) | Move::Down(i) | Move::Top(i) | Move::Bottom(i) => *i < count,
        }) {
            let who = match mv {
                Move::Up(i) | Move::Down(i) | Move::Top(i) | Move::Bottom(i) => *i,
            };
            issue(&handles[who], mv);
            apply(&mut model, mv);
        }

        let positions: Vec<i32> = handles.iter().map(|h| h.queue_position()).collect();
        let distinct: HashSet<i32> = positions.iter().copied().collect();
        prop_assert_eq!(distinct.len(), count);
        prop_assert!(positions.iter().all(|p| *p >= 0 && (*p as usize) < count));

        for (position, who) in model.iter().enumerate() {
            prop_assert_eq!(positions[*who], position as i32);
        }
    }
}
