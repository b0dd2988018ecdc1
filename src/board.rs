use crate::{Cell, SolveError};
use serde::{Deserialize, Serialize};

/// A puzzle color id. `0` marks an unconstrained cell; positive ids are colors.
pub type Color = u8;

/// Minimum supported board edge length.
pub const MIN_SIZE: usize = 2;
/// Maximum supported board edge length.
pub const MAX_SIZE: usize = 15;
/// Maximum color id, fixed by the 16-symbol wire alphabet.
pub const MAX_COLOR: Color = 16;

/// A square `N`-by-`N` grid of color ids, stored row-major.
///
/// The coordinate convention is `board[row][col]` with `(0, 0)` at the
/// top-left, applied uniformly across every strategy and the wire format.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    cells: Vec<Color>,
}

impl Board {
    /// Create an empty board of the given edge length.
    ///
    /// # Panics
    ///
    /// If `size` is outside `[MIN_SIZE, MAX_SIZE]`. Use [Board::from_rows] for
    /// caller-supplied data.
    #[inline]
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!((MIN_SIZE..=MAX_SIZE).contains(&size));
        Self {
            size,
            cells: vec![0; size * size],
        }
    }

    /// Build a board from a 2-D row-major array, checking the shape contract:
    /// square, edge length in `[2, 15]`, color ids at most [MAX_COLOR].
    ///
    /// Endpoint parity (each color exactly twice) is checked separately by
    /// [PairIndex::build], since a fully solved board is also a valid [Board].
    pub fn from_rows(rows: &[Vec<Color>]) -> Result<Self, SolveError> {
        let size = rows.len();
        if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
            return Err(SolveError::invalid(format!(
                "board size {size} outside [{MIN_SIZE}, {MAX_SIZE}]"
            )));
        }
        let mut cells = Vec::with_capacity(size * size);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(SolveError::invalid(format!(
                    "row {r} has {} cells, expected {size}",
                    row.len()
                )));
            }
            for (c, &value) in row.iter().enumerate() {
                if value > MAX_COLOR {
                    return Err(SolveError::invalid(format!(
                        "cell ({r}, {c}) has color {value}, maximum is {MAX_COLOR}"
                    )));
                }
                cells.push(value);
            }
        }
        Ok(Self { size, cells })
    }

    /// The edge length `N`.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells, `N * N`.
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The color at `cell`.
    #[inline]
    #[must_use]
    pub fn get(&self, cell: Cell) -> Color {
        self.cells[cell.index(self.size)]
    }

    /// Set the color at `cell`.
    #[inline]
    pub fn set(&mut self, cell: Cell, color: Color) {
        let i = cell.index(self.size);
        self.cells[i] = color;
    }

    /// True if `cell` is unconstrained (color `0`).
    #[inline]
    #[must_use]
    pub fn is_open(&self, cell: Cell) -> bool {
        self.get(cell) == 0
    }

    /// Number of cells carrying a positive color.
    #[inline]
    #[must_use]
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|&&v| v > 0).count()
    }

    /// True if every cell carries a positive color.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(|&v| v > 0)
    }

    /// Iterate all cells in row-major order.
    #[inline]
    pub fn iter_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let n = self.size;
        (0..n).flat_map(move |row| (0..n).map(move |col| Cell::new(row, col)))
    }

    /// The grid as a 2-D row-major array, the shape of the input contract.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<Color>> {
        self.cells.chunks(self.size).map(<[Color]>::to_vec).collect()
    }

    /// Raw row-major cell slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Color] {
        &self.cells
    }

    /// Number of same-color 4-neighbors of `cell`.
    #[must_use]
    pub fn same_color_degree(&self, cell: Cell) -> usize {
        let color = self.get(cell);
        cell.neighbors(self.size)
            .filter(|&nb| self.get(nb) == color)
            .count()
    }

    /// If the cells labeled `color` form a single simple path, return its two
    /// extreme cells (in row-major scan order). Returns `None` for an absent
    /// color, a broken class, a branched class, or a cycle.
    #[must_use]
    pub fn path_extremes(&self, color: Color) -> Option<(Cell, Cell)> {
        let class: Vec<Cell> = self
            .iter_cells()
            .filter(|&cell| self.get(cell) == color)
            .collect();
        if class.len() < 2 {
            return None;
        }
        let mut ends = Vec::new();
        for &cell in &class {
            match self.same_color_degree(cell) {
                1 => ends.push(cell),
                2 => {}
                _ => return None,
            }
        }
        if ends.len() != 2 {
            return None;
        }
        // Degree checks admit one path plus disjoint cycles; walking the path
        // from one end and requiring it to consume the whole class rules the
        // cycles out.
        let mut seen = vec![false; self.cell_count()];
        let mut at = ends[0];
        let mut walked = 1;
        seen[at.index(self.size)] = true;
        while at != ends[1] {
            let Some(next) = at
                .neighbors(self.size)
                .find(|&nb| self.get(nb) == color && !seen[nb.index(self.size)])
            else {
                return None;
            };
            seen[next.index(self.size)] = true;
            at = next;
            walked += 1;
        }
        if walked != class.len() {
            return None;
        }
        Some((ends[0], ends[1]))
    }

    /// True if this board is a fully-labeled valid covering: every cell
    /// positive and every color class a single simple path.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        if !self.is_complete() {
            return false;
        }
        let mut present = [false; MAX_COLOR as usize + 1];
        for &v in &self.cells {
            present[v as usize] = true;
        }
        (1..=MAX_COLOR)
            .filter(|&k| present[k as usize])
            .all(|k| self.path_extremes(k).is_some())
    }

    /// True if this board is a valid solution of `input` under `pairs`:
    /// complete, preserving every labeled input cell, with each color class a
    /// simple path whose extremes are exactly the input endpoints, and no
    /// colors beyond the input's.
    #[must_use]
    pub fn solves(&self, input: &Board, pairs: &PairIndex) -> bool {
        if self.size != input.size || !self.is_complete() {
            return false;
        }
        for cell in input.iter_cells() {
            let v = input.get(cell);
            if v > 0 && self.get(cell) != v {
                return false;
            }
        }
        let mut allowed = [false; MAX_COLOR as usize + 1];
        for pair in pairs.pairs() {
            allowed[pair.color as usize] = true;
            let Some((a, b)) = self.path_extremes(pair.color) else {
                return false;
            };
            if (a, b) != (pair.start, pair.end) && (b, a) != (pair.start, pair.end) {
                return false;
            }
        }
        self.cells.iter().all(|&v| allowed[v as usize])
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Board({}x{})", self.size, self.size)?;
        for row in self.cells.chunks(self.size) {
            for &v in row {
                write!(f, "{v:3}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// One color's two endpoints. `start` is the first occurrence in row-major
/// scan order; the path searches are seeded from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub color: Color,
    pub start: Cell,
    pub end: Cell,
}

/// The endpoint pairs of a puzzle, ordered by ascending color id. Built once
/// at solve entry and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairIndex {
    pairs: Vec<ColorPair>,
}

impl PairIndex {
    /// Scan `board` in row-major order and record the first and second
    /// occurrence of each color. Fails with `InvalidBoard` when a color occurs
    /// once or more than twice.
    pub fn build(board: &Board) -> Result<Self, SolveError> {
        let mut first: [Option<Cell>; MAX_COLOR as usize + 1] = [None; MAX_COLOR as usize + 1];
        let mut second: [Option<Cell>; MAX_COLOR as usize + 1] = [None; MAX_COLOR as usize + 1];
        for cell in board.iter_cells() {
            let color = board.get(cell);
            if color == 0 {
                continue;
            }
            let k = color as usize;
            match (first[k], second[k]) {
                (None, _) => first[k] = Some(cell),
                (Some(_), None) => second[k] = Some(cell),
                (Some(_), Some(_)) => {
                    return Err(SolveError::invalid(format!(
                        "color {color} occurs more than twice"
                    )));
                }
            }
        }
        let mut pairs = Vec::new();
        for k in 1..=MAX_COLOR {
            match (first[k as usize], second[k as usize]) {
                (Some(start), Some(end)) => pairs.push(ColorPair { color: k, start, end }),
                (Some(_), None) => {
                    return Err(SolveError::invalid(format!("color {k} occurs only once")));
                }
                _ => {}
            }
        }
        Ok(Self { pairs })
    }

    /// The pairs, ascending by color id.
    #[inline]
    #[must_use]
    pub fn pairs(&self) -> &[ColorPair] {
        &self.pairs
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Look up the pair for `color`.
    #[inline]
    #[must_use]
    pub fn get(&self, color: Color) -> Option<&ColorPair> {
        self.pairs.iter().find(|p| p.color == color)
    }
}
