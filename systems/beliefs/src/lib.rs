#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-player belief trees for the maze bot.
//!
//! Every tracked player owns a [`Tree`] of map hypotheses. Its leaves are
//! the player's current belief; turns reported by the engine advance or
//! split them, contradictions prune them and the [`LeavesMatcher`] keeps the
//! trees of different players consistent with each other.

mod init;
mod matcher;
mod player;
mod stats;
mod tree;

pub use init::{InitGenerator, TrackedPlayer};
pub use matcher::{LeavesMatcher, MAX_MATCHABLE_NODES};
pub use player::PlayerState;
pub use stats::PlayerStats;
pub use tree::{Node, NodeId, Tree};
