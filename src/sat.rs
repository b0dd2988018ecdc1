use crate::solver::{Deadline, SearchOutcome};
use crate::{Board, Cell, ColorPair, PairIndex, SolveError};
use fxhash::FxHashMap;
use log::debug;
use varisat::{ExtendFormula, Lit, Solver};

/// The constraint-satisfaction strategy.
///
/// The board's integer model (a positive color per cell, with the count of
/// same-color neighbors equal to 1 at endpoints and 2 elsewhere) is lowered
/// onto booleans: a one-hot color variable per cell, an edge variable per
/// adjacent cell pair equivalent to "both ends share a color", and exactly-k
/// cardinality over each cell's incident edges. A satisfying model is read
/// back into a board.
///
/// The degree constraints alone admit monochromatic cycles disjoint from the
/// endpoint path. Each decoded model is run through the solution verifier;
/// when a cycle slips through, its edge set is banned with one clause and the
/// back-end re-solves, so only a verified covering ever leaves this module.
#[must_use]
pub fn solve(input: &Board, pairs: &PairIndex, deadline: Deadline) -> SearchOutcome {
    SearchOutcome {
        result: run(input, pairs, deadline),
        nodes: 0,
    }
}

fn run(input: &Board, pairs: &PairIndex, deadline: Deadline) -> Result<Board, SolveError> {
    if pairs.is_empty() {
        // No colors, nothing to cover the open cells with.
        return Err(SolveError::NoSolution);
    }
    if deadline.expired() {
        return Err(SolveError::Timeout);
    }

    let n = input.size();
    let cells = input.cell_count();
    let colors = pairs.pairs();
    let num_k = colors.len();

    // Pair index by color id, for pinning labeled cells.
    let mut pair_of_color = [None; crate::MAX_COLOR as usize + 1];
    for (pi, pair) in colors.iter().enumerate() {
        pair_of_color[pair.color as usize] = Some(pi);
    }

    // Undirected edges between 4-adjacent cells, with the incidence lists
    // needed for the degree constraints.
    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(2 * n * (n - 1));
    let mut incident: Vec<Vec<usize>> = vec![Vec::with_capacity(4); cells];
    let mut edge_between: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    for cell in input.iter_cells() {
        let ci = cell.index(n);
        for nb in [
            (cell.col + 1 < n).then(|| Cell::new(cell.row, cell.col + 1)),
            (cell.row + 1 < n).then(|| Cell::new(cell.row + 1, cell.col)),
        ]
        .into_iter()
        .flatten()
        {
            let ni = nb.index(n);
            incident[ci].push(edges.len());
            incident[ni].push(edges.len());
            edge_between.insert((ci, ni), edges.len());
            edges.push((ci, ni));
        }
    }

    let mut solver = Solver::new();

    // Variable layout: cell-color one-hots first, then edge indicators.
    let lits: Vec<Lit> = (0..cells * num_k + edges.len())
        .map(|_| solver.new_lit())
        .collect();
    let color_lit = |ci: usize, pi: usize| lits[ci * num_k + pi];
    let edge_lit = |ei: usize| lits[cells * num_k + ei];

    for cell in input.iter_cells() {
        let ci = cell.index(n);
        // B[i][j] > 0: some color holds.
        let one_of: Vec<Lit> = (0..num_k).map(|pi| color_lit(ci, pi)).collect();
        solver.add_clause(&one_of);
        for a in 0..num_k {
            for b in a + 1..num_k {
                solver.add_clause(&[!color_lit(ci, a), !color_lit(ci, b)]);
            }
        }
        // Fixed input cells keep their color.
        let v = input.get(cell);
        if v > 0 {
            let pi = pair_of_color[v as usize].expect("validated color has a pair");
            solver.add_clause(&[color_lit(ci, pi)]);
        }
    }

    // Edge indicator <=> endpoints share a color (given the one-hots).
    for (ei, &(a, b)) in edges.iter().enumerate() {
        let e = edge_lit(ei);
        for pi in 0..num_k {
            solver.add_clause(&[!e, !color_lit(a, pi), color_lit(b, pi)]);
            solver.add_clause(&[!e, !color_lit(b, pi), color_lit(a, pi)]);
            solver.add_clause(&[e, !color_lit(a, pi), !color_lit(b, pi)]);
        }
    }

    // Degree: endpoints terminate a path, every other cell passes one through.
    for cell in input.iter_cells() {
        let ci = cell.index(n);
        let incident_lits: Vec<Lit> = incident[ci].iter().map(|&ei| edge_lit(ei)).collect();
        let degree = if input.get(cell) > 0 { 1 } else { 2 };
        exactly_k(&mut solver, &incident_lits, degree);
    }

    debug!(
        "sat: {} cells, {} colors, {} edges encoded",
        cells,
        num_k,
        edges.len()
    );

    loop {
        let satisfiable = solver
            .solve()
            .map_err(|e| SolveError::BackendUnavailable(e.to_string()))?;
        if deadline.expired() {
            return Err(SolveError::Timeout);
        }
        if !satisfiable {
            return Err(SolveError::NoSolution);
        }

        let model = solver
            .model()
            .ok_or_else(|| SolveError::Internal("satisfiable without a model".into()))?;
        let mut assignment = vec![false; cells * num_k + edges.len()];
        for lit in model {
            let index = lit.var().index();
            if index < assignment.len() {
                assignment[index] = lit.is_positive();
            }
        }

        let mut solved = input.clone();
        for cell in input.iter_cells() {
            let ci = cell.index(n);
            let pi = (0..num_k)
                .find(|&pi| assignment[ci * num_k + pi])
                .ok_or_else(|| SolveError::Internal("model leaves a cell uncolored".into()))?;
            solved.set(cell, colors[pi].color);
        }

        if solved.solves(input, pairs) {
            return Ok(solved);
        }

        // The model put a monochromatic cycle next to some endpoint path. A
        // valid covering can relabel the cycle's cells but never use all of
        // its edges at once, so banning the edge set is sound.
        let banned = ban_cycles(&mut solver, &solved, colors, &edge_between, |ei| edge_lit(ei));
        if banned == 0 {
            return Err(SolveError::Internal(
                "model failed verification without a cycle".into(),
            ));
        }
        debug!("sat: banned {banned} cycle components, re-solving");
    }
}

/// Add one blocking clause per same-color component that contains neither of
/// its color's endpoints. Degree constraints make such a component a simple
/// cycle, and its internal edges are all set, so requiring one of them false
/// excludes the cycle without excluding path relabelings of the same cells.
fn ban_cycles(
    solver: &mut Solver,
    solved: &Board,
    colors: &[ColorPair],
    edge_between: &FxHashMap<(usize, usize), usize>,
    edge_lit: impl Fn(usize) -> Lit,
) -> usize {
    let n = solved.size();
    let mut banned = 0;
    let mut seen = vec![false; solved.cell_count()];
    for pair in colors {
        for cell in solved.iter_cells() {
            if solved.get(cell) != pair.color || seen[cell.index(n)] {
                continue;
            }
            let mut comp = vec![cell];
            seen[cell.index(n)] = true;
            let mut i = 0;
            while i < comp.len() {
                let cur = comp[i];
                for nb in cur.neighbors(n) {
                    if solved.get(nb) == pair.color && !seen[nb.index(n)] {
                        seen[nb.index(n)] = true;
                        comp.push(nb);
                    }
                }
                i += 1;
            }
            if comp.iter().any(|&c| c == pair.start || c == pair.end) {
                continue;
            }
            let mut clause = Vec::with_capacity(comp.len());
            for &c in &comp {
                let ci = c.index(n);
                for nb in c.neighbors(n) {
                    let ni = nb.index(n);
                    if ni > ci && solved.get(nb) == pair.color {
                        clause.push(!edge_lit(edge_between[&(ci, ni)]));
                    }
                }
            }
            solver.add_clause(&clause);
            banned += 1;
        }
    }
    banned
}

/// Assert that exactly `k` of `lits` are true. Arity is at most 4 here, so
/// subset enumeration is the whole encoding: at-least-k as one clause per
/// `(m - k + 1)`-subset, at-most-k as one negated clause per `(k + 1)`-subset.
fn exactly_k(solver: &mut Solver, lits: &[Lit], k: usize) {
    let m = lits.len();
    debug_assert!(m <= 4 && k <= m);
    let mut clause = Vec::with_capacity(m);
    for mask in 0u32..1 << m {
        let picked = mask.count_ones() as usize;
        if picked == m - k + 1 {
            clause.clear();
            clause.extend(
                lits.iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, &l)| l),
            );
            solver.add_clause(&clause);
        }
        if picked == k + 1 {
            clause.clear();
            clause.extend(
                lits.iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, &l)| !l),
            );
            solver.add_clause(&clause);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::parse_text;

    fn run_text(text: &str) -> SearchOutcome {
        let board = parse_text(text).unwrap();
        let pairs = PairIndex::build(&board).unwrap();
        solve(&board, &pairs, Deadline::after_ms(10_000))
    }

    #[test]
    fn test_two_by_two_snake() {
        let outcome = run_text("RR\n..\n");
        assert_eq!(
            outcome.result.unwrap().rows(),
            vec![vec![1, 1], vec![1, 1]]
        );
        assert_eq!(outcome.nodes, 0);
    }

    #[test]
    fn test_crossed_pairs_have_no_solution() {
        let outcome = run_text("RB\nBR\n");
        assert_eq!(outcome.result, Err(SolveError::NoSolution));
    }

    #[test]
    fn test_four_by_four_covering() {
        let input = parse_text("R..B\n....\n.RB.\n....\n").unwrap();
        let pairs = PairIndex::build(&input).unwrap();
        let outcome = solve(&input, &pairs, Deadline::after_ms(10_000));
        assert!(outcome.result.unwrap().solves(&input, &pairs));
    }

    #[test]
    fn test_unique_three_by_three() {
        let outcome = run_text("R.B\n..Y\nRBY\n");
        assert_eq!(
            outcome.result.unwrap().rows(),
            vec![vec![1, 2, 2], vec![1, 2, 3], vec![1, 2, 3]]
        );
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let board = parse_text("RR\n..\n").unwrap();
        let pairs = PairIndex::build(&board).unwrap();
        let outcome = solve(&board, &pairs, Deadline::immediate());
        assert_eq!(outcome.result, Err(SolveError::Timeout));
    }
}
