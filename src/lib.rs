//! flowlink
//! ========
//!
//! A solver core for Flow Free / Number Link puzzles: given a square grid in
//! which each color labels exactly two endpoint cells, find an assignment of
//! colors to every cell such that each color forms a simple path between its
//! endpoints, paths are pairwise disjoint, and together they cover the grid,
//! or determine that none exists.
//!
//! Three interchangeable strategies sit behind one dispatcher:
//!
//! - [Strategy::PathEnum]: breadth-first enumeration of each color's simple
//!   paths with recursive descent over colors. Complete, best on small boards.
//! - [Strategy::Heuristic]: best-first search over partial board states with
//!   flow-specific pruning; the workhorse for harder instances.
//! - [Strategy::Sat]: a degree-constraint encoding handed to a SAT back-end.
//!
//! Call [solve] with a row-major grid (`0` for open cells), a strategy, and a
//! [Deadline]; the [SolveReport] envelope carries the completed board or a
//! failure, along with timing and node-count telemetry.

mod board;
mod cell;
mod error;
mod frontier;
pub mod heuristic;
pub mod path_enum;
mod reachability;
pub mod sat;
mod solver;
pub mod wire;

pub use self::{board::*, cell::*, error::*, reachability::*, solver::*};
