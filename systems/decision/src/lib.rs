#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Action selection for the maze bot.
//!
//! Each real-spawn hypothesis of the acting player is turned into a weighted
//! traversal graph, the most useful reachable tile becomes its target and the
//! action starting the cheapest path to it becomes the hypothesis' vote.

mod decision;
mod graph;
mod target;

pub use decision::{Decision, DecisionMaker};
pub use graph::{Edge, GraphBuilder};
pub use target::TargetCalculator;
