use crate::{heuristic, path_enum, sat};
use crate::{Board, Color, PairIndex, SolveError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// The available solver back-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Per-color enumeration of simple paths with recursive descent.
    /// Complete, but impractical much beyond 10x10.
    PathEnum,
    /// Best-first search over partial boards with domain pruning.
    Heuristic,
    /// Constraint encoding handed to the SAT back-end.
    Sat,
}

/// A monotonic instant after which a solve must stop with `Timeout`.
/// Cancellation is the same mechanism: solve against [Deadline::immediate].
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// The recommended default budget.
    pub const DEFAULT_MS: u64 = 15_000;

    #[must_use]
    pub fn after(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
        }
    }

    #[must_use]
    pub fn after_ms(ms: u64) -> Self {
        Self::after(Duration::from_millis(ms))
    }

    /// A deadline [DEFAULT_MS](Self::DEFAULT_MS) from now.
    #[must_use]
    pub fn standard() -> Self {
        Self::after_ms(Self::DEFAULT_MS)
    }

    /// An already-expired deadline.
    #[must_use]
    pub fn immediate() -> Self {
        Self { at: Instant::now() }
    }

    #[inline]
    #[must_use]
    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// What a strategy hands back to the dispatcher: the outcome plus its
/// expansion count.
pub struct SearchOutcome {
    pub result: Result<Board, SolveError>,
    pub nodes: u64,
}

/// The uniform result envelope. Failures are reported here as data; no error
/// type or panic crosses the dispatcher boundary.
#[derive(Debug, Clone, Serialize)]
pub struct SolveReport {
    /// The completed grid, absent on failure.
    pub board: Option<Board>,
    /// True when the deadline expired before the search concluded.
    pub timed_out: bool,
    /// Elapsed wall-clock for the whole solve.
    pub time_taken_ms: u64,
    /// Strategy-specific expansion count; 0 for the SAT back-end.
    pub node_count: u64,
    /// Short description of a non-timeout failure.
    pub error: Option<String>,
}

/// Solve `rows` with the chosen strategy under `deadline`.
///
/// The input is validated first (shape, then endpoint parity); a board that
/// is already a valid covering is returned unchanged, which also makes
/// `solve(solve(b)) = solve(b)`.
#[must_use]
pub fn solve(rows: &[Vec<Color>], strategy: Strategy, deadline: Deadline) -> SolveReport {
    let started = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| dispatch(rows, strategy, deadline)))
        .unwrap_or_else(|_| SearchOutcome {
            result: Err(SolveError::Internal("strategy panicked".into())),
            nodes: 0,
        });
    let time_taken_ms = started.elapsed().as_millis() as u64;

    match outcome.result {
        Ok(board) => {
            debug!(
                "{strategy:?} solved in {time_taken_ms}ms after {} nodes",
                outcome.nodes
            );
            SolveReport {
                board: Some(board),
                timed_out: false,
                time_taken_ms,
                node_count: outcome.nodes,
                error: None,
            }
        }
        Err(SolveError::Timeout) => {
            debug!(
                "{strategy:?} timed out after {time_taken_ms}ms and {} nodes",
                outcome.nodes
            );
            SolveReport {
                board: None,
                timed_out: true,
                time_taken_ms,
                node_count: outcome.nodes,
                error: None,
            }
        }
        Err(e) => {
            debug!("{strategy:?} failed: {e}");
            SolveReport {
                board: None,
                timed_out: false,
                time_taken_ms,
                node_count: outcome.nodes,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Solve with the default deadline.
#[must_use]
pub fn solve_default(rows: &[Vec<Color>], strategy: Strategy) -> SolveReport {
    solve(rows, strategy, Deadline::standard())
}

fn dispatch(rows: &[Vec<Color>], strategy: Strategy, deadline: Deadline) -> SearchOutcome {
    let board = match Board::from_rows(rows) {
        Ok(board) => board,
        Err(e) => {
            return SearchOutcome {
                result: Err(e),
                nodes: 0,
            }
        }
    };
    // A fully-labeled valid covering is its own solution. Checked before the
    // parity validation, which would reject its many-celled color classes.
    if board.is_solved() {
        return SearchOutcome {
            result: Ok(board),
            nodes: 0,
        };
    }
    let pairs = match PairIndex::build(&board) {
        Ok(pairs) => pairs,
        Err(e) => {
            return SearchOutcome {
                result: Err(e),
                nodes: 0,
            }
        }
    };
    match strategy {
        Strategy::PathEnum => path_enum::solve(&board, &pairs, deadline),
        Strategy::Heuristic => heuristic::solve(&board, &pairs, deadline),
        Strategy::Sat => sat::solve(&board, &pairs, deadline),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ALL: [Strategy; 3] = [Strategy::PathEnum, Strategy::Heuristic, Strategy::Sat];

    fn rows(board: &[&[Color]]) -> Vec<Vec<Color>> {
        board.iter().map(|r| r.to_vec()).collect()
    }

    /// Colors `1..=k` as parallel rows with endpoints pinned to the side
    /// columns; trivially coverable by straight lines.
    fn lanes(n: usize) -> Vec<Vec<Color>> {
        (0..n)
            .map(|r| {
                let mut row = vec![0; n];
                row[0] = r as Color + 1;
                row[n - 1] = r as Color + 1;
                row
            })
            .collect()
    }

    #[test]
    fn test_invalid_board_is_reported_in_envelope() {
        let input = rows(&[&[1, 0], &[0, 0]]);
        for strategy in ALL {
            let report = solve(&input, strategy, Deadline::standard());
            assert!(report.board.is_none());
            assert!(!report.timed_out);
            assert!(report.error.as_deref().unwrap().contains("invalid board"));
        }
    }

    #[test]
    fn test_scenario_covering_on_all_strategies() {
        let input = rows(&[
            &[1, 0, 0, 2],
            &[0, 0, 0, 0],
            &[0, 1, 2, 0],
            &[0, 0, 0, 0],
        ]);
        let board = Board::from_rows(&input).unwrap();
        let pairs = PairIndex::build(&board).unwrap();
        for strategy in ALL {
            let report = solve(&input, strategy, Deadline::standard());
            let solved = report.board.expect("coverable 4x4");
            assert!(solved.solves(&board, &pairs), "{strategy:?}");
            assert!(report.error.is_none());
        }
    }

    #[test]
    fn test_crossed_pairs_report_no_solution() {
        let input = rows(&[&[1, 2], &[2, 1]]);
        for strategy in ALL {
            let report = solve(&input, strategy, Deadline::standard());
            assert!(report.board.is_none(), "{strategy:?}");
            assert!(!report.timed_out);
            assert_eq!(report.error.as_deref(), Some("no solution exists"));
        }
    }

    #[test]
    fn test_solved_board_round_trips() {
        let input = rows(&[&[1, 2, 2], &[1, 2, 3], &[1, 2, 3]]);
        for strategy in ALL {
            let report = solve(&input, strategy, Deadline::standard());
            let board = report.board.expect("already solved");
            assert_eq!(board.rows(), input);
            assert_eq!(report.node_count, 0);

            // solve(solve(b)) = solve(b)
            let again = solve(&board.rows(), strategy, Deadline::standard());
            assert_eq!(again.board.unwrap().rows(), input);
        }
    }

    #[test]
    fn test_unique_puzzle_agrees_across_strategies() {
        let input = rows(&[&[1, 0, 2], &[0, 0, 3], &[1, 2, 3]]);
        let expected = rows(&[&[1, 2, 2], &[1, 2, 3], &[1, 2, 3]]);
        for strategy in ALL {
            let report = solve(&input, strategy, Deadline::standard());
            assert_eq!(report.board.unwrap().rows(), expected, "{strategy:?}");
        }
    }

    #[test]
    fn test_five_by_five_four_colors_across_strategies() {
        let input = rows(&[
            &[1, 0, 0, 0, 1],
            &[2, 0, 0, 0, 2],
            &[3, 0, 0, 0, 3],
            &[4, 0, 0, 0, 0],
            &[4, 0, 0, 0, 0],
        ]);
        let board = Board::from_rows(&input).unwrap();
        let pairs = PairIndex::build(&board).unwrap();
        for strategy in ALL {
            let report = solve(&input, strategy, Deadline::standard());
            let solved = report.board.expect("coverable 5x5");
            assert!(solved.solves(&board, &pairs), "{strategy:?}");
        }
    }

    #[test]
    fn test_cancellation_reports_timeout() {
        let input = rows(&[
            &[1, 0, 0, 2],
            &[0, 0, 0, 0],
            &[0, 1, 2, 0],
            &[0, 0, 0, 0],
        ]);
        for strategy in ALL {
            let report = solve(&input, strategy, Deadline::immediate());
            assert!(report.board.is_none());
            assert!(report.timed_out, "{strategy:?}");
            assert!(report.error.is_none());
        }
    }

    #[test]
    fn test_ten_by_ten_within_budget() {
        let input = lanes(10);
        let board = Board::from_rows(&input).unwrap();
        let pairs = PairIndex::build(&board).unwrap();

        // The enumeration strategy is allowed to blow a tight budget here.
        let report = solve(&input, Strategy::PathEnum, Deadline::after_ms(100));
        if let Some(solved) = &report.board {
            assert!(solved.solves(&board, &pairs));
        } else {
            assert!(report.timed_out);
        }

        for strategy in [Strategy::Heuristic, Strategy::Sat] {
            let report = solve(&input, strategy, Deadline::after_ms(60_000));
            let solved = report.board.expect("coverable 10x10");
            assert!(solved.solves(&board, &pairs), "{strategy:?}");
        }
    }

    #[test]
    fn test_fourteen_by_fourteen_under_tight_deadline() {
        let input = lanes(14);
        let board = Board::from_rows(&input).unwrap();
        let pairs = PairIndex::build(&board).unwrap();
        // Every strategy may time out; none may hand back an invalid board.
        for strategy in ALL {
            let report = solve(&input, strategy, Deadline::after_ms(50));
            match report.board {
                Some(solved) => assert!(solved.solves(&board, &pairs), "{strategy:?}"),
                None => assert!(report.timed_out || report.error.is_some()),
            }
        }
    }

    #[test]
    fn test_strategy_wire_names() {
        assert_eq!(
            serde_json::to_string(&Strategy::PathEnum).unwrap(),
            "\"path_enum\""
        );
        assert_eq!(
            serde_json::from_str::<Strategy>("\"heuristic\"").unwrap(),
            Strategy::Heuristic
        );
        assert_eq!(serde_json::from_str::<Strategy>("\"sat\"").unwrap(), Strategy::Sat);
    }

    #[test]
    fn test_report_serializes() {
        let report = solve(&rows(&[&[1, 1], &[0, 0]]), Strategy::Heuristic, Deadline::standard());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"timed_out\":false"));
        assert!(json.contains("\"node_count\""));
    }
}
