use crate::frontier::Fifo;
use crate::reachability::shortest_open_distance;
use crate::solver::{Deadline, SearchOutcome};
use crate::{Board, Cell, ColorPair, PairIndex, SolveError};
use fxhash::FxHashSet;
use log::trace;

/// Packed occupancy bitset over the at most 15x15 = 225 cells of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
struct CellSet([u64; 4]);

impl CellSet {
    #[inline]
    fn insert(&mut self, index: usize) {
        self.0[index >> 6] |= 1 << (index & 63);
    }

    #[inline]
    fn contains(&self, index: usize) -> bool {
        self.0[index >> 6] & (1 << (index & 63)) != 0
    }
}

/// A partial path, linked by arena index to its shared prefix. Extending a
/// path allocates one node instead of copying the whole cell sequence; the
/// occupancy set rides along for O(1) self-avoidance checks.
#[derive(Clone, Copy)]
struct PathNode {
    cell: Cell,
    parent: u32,
    len: u32,
    occupied: CellSet,
}

const NO_PARENT: u32 = u32::MAX;

struct PathEnum<'a> {
    pairs: &'a [ColorPair],
    deadline: Deadline,
    size: usize,
    nodes: u64,
}

/// The path-enumeration strategy: recursive descent over colors in ascending
/// id order, enumerating each color's simple paths breadth-first and
/// recursing on every distinct completion.
///
/// Complete but impractical much beyond 10x10; the heuristic engine covers
/// harder instances.
#[must_use]
pub fn solve(input: &Board, pairs: &PairIndex, deadline: Deadline) -> SearchOutcome {
    let mut search = PathEnum {
        pairs: pairs.pairs(),
        deadline,
        size: input.size(),
        nodes: 0,
    };
    let result = match search.route(input, 0) {
        Ok(Some(solved)) => Ok(solved),
        Ok(None) => Err(SolveError::NoSolution),
        Err(e) => Err(e),
    };
    SearchOutcome {
        result,
        nodes: search.nodes,
    }
}

impl PathEnum<'_> {
    /// Route the color at `idx` on `board`, then recurse on the rest.
    /// `Ok(None)` means this branch admits no covering; `Err` is timeout.
    fn route(&mut self, board: &Board, idx: usize) -> Result<Option<Board>, SolveError> {
        if idx == self.pairs.len() {
            // Success only when the last path closed the covering.
            return Ok(board.is_complete().then(|| board.clone()));
        }
        let pair = self.pairs[idx];

        let Some(min_dist) = shortest_open_distance(board, pair.start, pair.end) else {
            return Ok(None);
        };
        // Lookahead: a later color already cut off makes this branch dead.
        for later in &self.pairs[idx + 1..] {
            if shortest_open_distance(board, later.start, later.end).is_none() {
                trace!("color {} strands color {}", pair.color, later.color);
                return Ok(None);
            }
        }

        let mut arena = Vec::with_capacity(64);
        let mut start_set = CellSet::default();
        start_set.insert(pair.start.index(self.size));
        arena.push(PathNode {
            cell: pair.start,
            parent: NO_PARENT,
            len: 1,
            occupied: start_set,
        });
        let mut queue = Fifo::default();
        queue.push(0);
        // Two completions over the same cell set write the same board, so the
        // occupancy set is the duplicate key.
        let mut completed: FxHashSet<CellSet> = FxHashSet::default();

        while let Some(i) = queue.pop() {
            if self.deadline.expired() {
                return Err(SolveError::Timeout);
            }
            self.nodes += 1;
            let node = arena[i as usize];

            if node.cell == pair.end {
                let edges = node.len - 1;
                if edges < min_dist || !completed.insert(node.occupied) {
                    continue;
                }
                let mut child = board.clone();
                let mut j = i;
                loop {
                    let link = &arena[j as usize];
                    child.set(link.cell, pair.color);
                    if link.parent == NO_PARENT {
                        break;
                    }
                    j = link.parent;
                }
                if let Some(solved) = self.route(&child, idx + 1)? {
                    return Ok(Some(solved));
                }
                continue;
            }

            for nb in node.cell.neighbors(self.size) {
                let bi = nb.index(self.size);
                if node.occupied.contains(bi) {
                    continue;
                }
                if !board.is_open(nb) && nb != pair.end {
                    continue;
                }
                let mut occupied = node.occupied;
                occupied.insert(bi);
                arena.push(PathNode {
                    cell: nb,
                    parent: i,
                    len: node.len + 1,
                    occupied,
                });
                queue.push(arena.len() as u32 - 1);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::parse_text;

    fn run(text: &str) -> SearchOutcome {
        let board = parse_text(text).unwrap();
        let pairs = PairIndex::build(&board).unwrap();
        solve(&board, &pairs, Deadline::after_ms(10_000))
    }

    #[test]
    fn test_two_by_two_snake() {
        let outcome = run("RR\n..\n");
        let solved = outcome.result.unwrap();
        assert_eq!(solved.rows(), vec![vec![1, 1], vec![1, 1]]);
        assert!(outcome.nodes > 0);
    }

    #[test]
    fn test_crossed_pairs_have_no_solution() {
        let outcome = run("RB\nBR\n");
        assert_eq!(outcome.result, Err(SolveError::NoSolution));
    }

    #[test]
    fn test_walled_off_endpoints_have_no_solution() {
        // The B and Y pairs wall row 1 off, separating the two R endpoints.
        let outcome = run("R.Y\nBBY\nR..\n");
        assert_eq!(outcome.result, Err(SolveError::NoSolution));
    }

    #[test]
    fn test_four_by_four_covering() {
        let input = parse_text("R..B\n....\n.RB.\n....\n").unwrap();
        let pairs = PairIndex::build(&input).unwrap();
        let outcome = solve(&input, &pairs, Deadline::after_ms(10_000));
        let solved = outcome.result.unwrap();
        assert!(solved.solves(&input, &pairs));
    }

    #[test]
    fn test_unique_three_by_three() {
        let outcome = run("R.B\n..Y\nRBY\n");
        let solved = outcome.result.unwrap();
        assert_eq!(
            solved.rows(),
            vec![vec![1, 2, 2], vec![1, 2, 3], vec![1, 2, 3]]
        );
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let board = parse_text("R..B\n....\n.RB.\n....\n").unwrap();
        let pairs = PairIndex::build(&board).unwrap();
        let outcome = solve(&board, &pairs, Deadline::immediate());
        assert_eq!(outcome.result, Err(SolveError::Timeout));
    }
}
