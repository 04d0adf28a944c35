#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Map hypotheses for the maze bot.
//!
//! A [`FieldState`] is one internally consistent guess at the hidden maze: a
//! [`Grid`] of cells and walls, the players believed to stand on it, the
//! treasures believed to lie on it and the unique rooms it has not placed yet.
//! Each turn reported by the engine moves a hypothesis forward or splits it
//! into several successors; a contradiction means the guess cannot describe
//! the real game.

mod common;
mod grid;
mod state;

pub use common::CommonData;
pub use grid::{Cell, Grid, RiverFlow};
pub use state::{FieldState, Transition};
