use crate::frontier::CostHolder;
use crate::solver::{Deadline, SearchOutcome};
use crate::{Board, Cell, ColorPair, PairIndex, SolveError};
use fxhash::{FxHashSet, FxHasher};
use log::trace;
use std::collections::{BinaryHeap, VecDeque};
use std::hash::{Hash, Hasher};

/// A partial board state: the grid so far, the current tip of each color's
/// path, and which colors are still being routed. A closed color's head sits
/// on its target endpoint.
#[derive(Clone)]
struct State {
    board: Board,
    heads: Vec<Cell>,
    open: u16,
    filled: usize,
}

impl State {
    #[inline]
    fn is_open(&self, pair: usize) -> bool {
        self.open & (1 << pair) != 0
    }

    fn key(&self) -> u64 {
        let mut h = FxHasher::default();
        self.board.as_slice().hash(&mut h);
        self.heads.hash(&mut h);
        h.finish()
    }
}

struct Heuristic<'a> {
    pairs: &'a [ColorPair],
    deadline: Deadline,
    size: usize,
    nodes: u64,
}

/// The flow-specific strategy: best-first search over partial board states,
/// preferring more-filled states, with domain pruning: most-constrained
/// color selection, dead-end and stranding detection, chokepoint analysis,
/// and forced-move fast-forwarding.
#[must_use]
pub fn solve(input: &Board, pairs: &PairIndex, deadline: Deadline) -> SearchOutcome {
    let mut search = Heuristic {
        pairs: pairs.pairs(),
        deadline,
        size: input.size(),
        nodes: 0,
    };
    let result = search.run(input);
    SearchOutcome {
        result,
        nodes: search.nodes,
    }
}

impl Heuristic<'_> {
    fn run(&mut self, input: &Board) -> Result<Board, SolveError> {
        let total = input.cell_count();
        let initial = State {
            board: input.clone(),
            heads: self.pairs.iter().map(|p| p.start).collect(),
            open: ((1u32 << self.pairs.len()) - 1) as u16,
            filled: input.filled(),
        };

        // Arena of pending states; each heap entry owns its slot, so a pop
        // takes the state back out.
        let mut states: Vec<Option<State>> = Vec::with_capacity(256);
        let mut frontier: BinaryHeap<CostHolder<u64>> = BinaryHeap::with_capacity(256);
        let mut visited: FxHashSet<u64> = FxHashSet::default();
        let mut seq: u64 = 0;

        states.push(Some(initial));
        frontier.push(CostHolder {
            estimated_cost: (total - input.filled()) as u64,
            cost: 0,
            index: 0,
        });

        'search: while let Some(CostHolder { index, .. }) = frontier.pop() {
            if self.deadline.expired() {
                return Err(SolveError::Timeout);
            }
            self.nodes += 1;
            let mut state = states[index as usize].take().expect("state popped twice");

            if !visited.insert(state.key()) {
                continue;
            }
            if self.dead_end(&state) || self.stranded(&state) || self.choked(&state) {
                continue;
            }

            // Forced-move fast-forward: while the most constrained color has a
            // single legal move, take it in place instead of enqueuing. Each
            // application is a state transition of its own, so the deadline is
            // rechecked here too; a long corridor chain must not outrun it.
            loop {
                if self.deadline.expired() {
                    return Err(SolveError::Timeout);
                }
                if state.open == 0 {
                    if state.filled == total {
                        return Ok(state.board);
                    }
                    continue 'search;
                }
                let (pair, moves) = self.most_constrained(&state);
                match moves.len() {
                    0 => continue 'search,
                    1 => self.apply(&mut state, pair, moves[0]),
                    _ => {
                        for mv in moves {
                            let mut child = state.clone();
                            self.apply(&mut child, pair, mv);
                            let est = (total - child.filled) as u64;
                            seq += 1;
                            states.push(Some(child));
                            frontier.push(CostHolder {
                                estimated_cost: est,
                                cost: seq,
                                index: states.len() as u32 - 1,
                            });
                        }
                        continue 'search;
                    }
                }
            }
        }
        Err(SolveError::NoSolution)
    }

    /// Legal forward moves for an open pair: empty neighbors of its head,
    /// plus the closing step onto its target when adjacent.
    fn legal_moves(&self, state: &State, pair: usize) -> Vec<Cell> {
        let head = state.heads[pair];
        let target = self.pairs[pair].end;
        let mut moves: Vec<Cell> = head
            .neighbors(self.size)
            .filter(|&nb| state.board.is_open(nb))
            .collect();
        if head.is_adjacent(target) {
            moves.push(target);
        }
        moves
    }

    /// The open pair with the fewest legal moves, ties to the smallest color
    /// id (pairs are stored ascending).
    fn most_constrained(&self, state: &State) -> (usize, Vec<Cell>) {
        let mut best: Option<(usize, Vec<Cell>)> = None;
        for pair in 0..self.pairs.len() {
            if !state.is_open(pair) {
                continue;
            }
            let moves = self.legal_moves(state, pair);
            let fewer = best
                .as_ref()
                .map_or(true, |(_, b)| moves.len() < b.len());
            if fewer {
                if moves.is_empty() {
                    return (pair, moves);
                }
                best = Some((pair, moves));
            }
        }
        best.expect("called with at least one open pair")
    }

    fn apply(&self, state: &mut State, pair: usize, mv: Cell) {
        if mv == self.pairs[pair].end {
            state.open &= !(1 << pair);
        } else {
            state.board.set(mv, self.pairs[pair].color);
            state.filled += 1;
        }
        state.heads[pair] = mv;
    }

    /// True when some open color's head has no legal forward move.
    fn dead_end(&self, state: &State) -> bool {
        (0..self.pairs.len()).any(|pair| {
            state.is_open(pair) && self.legal_moves(state, pair).is_empty()
        })
    }

    /// Label the connected components of empty cells; `-1` for non-empty.
    fn label_regions(&self, board: &Board) -> (Vec<i32>, usize) {
        let n = self.size;
        let mut labels = vec![-1i32; n * n];
        let mut next = 0;
        for cell in board.iter_cells() {
            if !board.is_open(cell) || labels[cell.index(n)] >= 0 {
                continue;
            }
            let mut queue = VecDeque::new();
            labels[cell.index(n)] = next;
            queue.push_back(cell);
            while let Some(at) = queue.pop_front() {
                for nb in at.neighbors(n) {
                    if board.is_open(nb) && labels[nb.index(n)] < 0 {
                        labels[nb.index(n)] = next;
                        queue.push_back(nb);
                    }
                }
            }
            next += 1;
        }
        (labels, next as usize)
    }

    /// Stranding analysis over empty-cell components.
    ///
    /// A color's remaining route lies in a single empty component adjacent to
    /// both its head and its target, and every component that is ever filled
    /// must host such a route. Violation of either direction is fatal:
    /// (a) an open pair, not directly closable, with no component adjacent to
    /// both ends; (b) a component adjacent to both ends of no open pair.
    fn stranded(&self, state: &State) -> bool {
        let (labels, count) = self.label_regions(&state.board);
        if count == 0 {
            return false;
        }
        let mut head_touch = vec![0u16; count];
        let mut target_touch = vec![0u16; count];
        for pair in 0..self.pairs.len() {
            if !state.is_open(pair) {
                continue;
            }
            let bit = 1u16 << pair;
            for nb in state.heads[pair].neighbors(self.size) {
                let label = labels[nb.index(self.size)];
                if label >= 0 {
                    head_touch[label as usize] |= bit;
                }
            }
            for nb in self.pairs[pair].end.neighbors(self.size) {
                let label = labels[nb.index(self.size)];
                if label >= 0 {
                    target_touch[label as usize] |= bit;
                }
            }
        }
        for pair in 0..self.pairs.len() {
            if !state.is_open(pair) || state.heads[pair].is_adjacent(self.pairs[pair].end) {
                continue;
            }
            let bit = 1u16 << pair;
            let linked = (0..count).any(|c| (head_touch[c] & target_touch[c] & bit) != 0);
            if !linked {
                trace!("color {} stranded from its target", self.pairs[pair].color);
                return true;
            }
        }
        (0..count).any(|c| {
            let dead = (head_touch[c] & target_touch[c]) == 0;
            if dead {
                trace!("empty region {c} unreachable by any open color");
            }
            dead
        })
    }

    /// Chokepoint analysis: an empty cell ends up as an interior path cell,
    /// so it needs two usable adjacencies for a single color: empty
    /// neighbors, that color's head, or that color's target.
    fn choked(&self, state: &State) -> bool {
        let n = self.size;
        for cell in state.board.iter_cells() {
            if !state.board.is_open(cell) {
                continue;
            }
            let empty_nbs = cell
                .neighbors(n)
                .filter(|&nb| state.board.is_open(nb))
                .count();
            if empty_nbs >= 2 {
                continue;
            }
            let fillable = (0..self.pairs.len()).any(|pair| {
                if !state.is_open(pair) {
                    return false;
                }
                let adj = usize::from(cell.is_adjacent(state.heads[pair]))
                    + usize::from(cell.is_adjacent(self.pairs[pair].end));
                empty_nbs + adj >= 2
            });
            if !fillable {
                trace!("cell ({}, {}) is an unusable chokepoint", cell.row, cell.col);
                return true;
            }
        }
        false
    }
}
