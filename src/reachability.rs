use crate::frontier::CostHolder;
use crate::{Board, Cell};
use fxhash::FxHasher;
use indexmap::map::Entry::{Occupied, Vacant};
use indexmap::IndexMap;
use std::collections::BinaryHeap;
use std::hash::BuildHasherDefault;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Minimum number of edges in a 4-connected path from `start` to `goal` that
/// traverses only currently-open cells. `start` and `goal` themselves are
/// exempt from the openness requirement, since they typically carry a color
/// label. Returns `None` when no such path exists.
///
/// A\* with the Manhattan heuristic, which is admissible and consistent on a
/// unit-cost 4-connected grid; that consistency is what permits closing cells
/// at generation time rather than at expansion.
///
/// The result is both a feasibility test and a lower bound on the length of
/// any valid path for a color in the current partial state.
#[must_use]
pub fn shortest_open_distance(board: &Board, start: Cell, goal: Cell) -> Option<u32> {
    let n = board.size();
    let mut to_see = BinaryHeap::with_capacity(64);
    let mut seen: FxIndexMap<Cell, u32> = FxIndexMap::default();

    seen.insert(start, 0);
    to_see.push(CostHolder {
        estimated_cost: start.manhattan(goal) as u32,
        cost: 0,
        index: 0,
    });

    while let Some(CostHolder { cost, index, .. }) = to_see.pop() {
        let (&cell, _) = seen.get_index(index as usize).unwrap(); // Cannot fail
        if cell == goal {
            return Some(cost);
        }
        for nb in cell.neighbors(n) {
            if nb != goal && !board.is_open(nb) {
                continue;
            }
            let g = cost + 1;
            match seen.entry(nb) {
                Vacant(e) => {
                    let i = e.index() as u32;
                    e.insert(g);
                    to_see.push(CostHolder {
                        estimated_cost: g + nb.manhattan(goal) as u32,
                        cost: g,
                        index: i,
                    });
                }
                // Closed at generation; unit edges make the first g optimal.
                Occupied(_) => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    fn board(rows: &[&[u8]]) -> Board {
        Board::from_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_open_grid_is_manhattan() {
        let row: &[u8] = &[0, 0, 0, 0];
        let b = board(&[row; 4]);
        assert_eq!(
            shortest_open_distance(&b, Cell::new(0, 0), Cell::new(3, 3)),
            Some(6)
        );
        assert_eq!(
            shortest_open_distance(&b, Cell::new(1, 1), Cell::new(1, 1)),
            Some(0)
        );
    }

    #[test]
    fn test_endpoints_exempt_from_openness() {
        // Both endpoints carry labels; the interior route is open.
        let b = board(&[
            &[1, 0, 0],
            &[0, 0, 0],
            &[0, 0, 1],
        ]);
        assert_eq!(
            shortest_open_distance(&b, Cell::new(0, 0), Cell::new(2, 2)),
            Some(4)
        );
    }

    #[test]
    fn test_detour_around_wall() {
        let b = board(&[
            &[0, 2, 0],
            &[0, 2, 0],
            &[0, 0, 0],
        ]);
        // Straight across is walled; the route dips under the wall.
        assert_eq!(
            shortest_open_distance(&b, Cell::new(0, 0), Cell::new(0, 2)),
            Some(6)
        );
    }

    #[test]
    fn test_unreachable() {
        let b = board(&[
            &[0, 2, 0],
            &[0, 2, 0],
            &[0, 2, 0],
        ]);
        assert_eq!(
            shortest_open_distance(&b, Cell::new(0, 0), Cell::new(0, 2)),
            None
        );
    }
}
