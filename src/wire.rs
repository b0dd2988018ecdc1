use crate::{Board, Color, SolveError};

/// The fixed serialization alphabet: color `k` is written as the `k`-th
/// symbol, 1-indexed. Its length caps the supported color range.
pub const ALPHABET: [u8; 16] = [
    b'R', b'B', b'Y', b'G', b'O', b'C', b'M', b'm', b'P', b'A', b'W', b'g', b'T', b'b', b'c', b'p',
];

/// The symbol for an open cell.
pub const OPEN: u8 = b'.';

/// The symbol for `color`, or `None` for color `0` (open).
#[inline]
#[must_use]
pub fn symbol_for(color: Color) -> Option<u8> {
    match color {
        0 => None,
        k => ALPHABET.get(k as usize - 1).copied(),
    }
}

/// The color id for `symbol`; `OPEN` maps to `0`.
#[inline]
#[must_use]
pub fn color_for(symbol: u8) -> Option<Color> {
    if symbol == OPEN {
        return Some(0);
    }
    ALPHABET
        .iter()
        .position(|&s| s == symbol)
        .map(|i| i as Color + 1)
}

/// Serialize a board as a text grid: one line per row, `N` symbols per line,
/// each line newline-terminated. Rows are emitted top to bottom in the
/// crate's row-major convention; there is no transposition.
#[must_use]
pub fn encode_text(board: &Board) -> String {
    let n = board.size();
    let mut out = String::with_capacity(n * (n + 1));
    for row in board.as_slice().chunks(n) {
        for &v in row {
            out.push(symbol_for(v).unwrap_or(OPEN) as char);
        }
        out.push('\n');
    }
    out
}

/// Parse a text grid produced by [encode_text]. Also the fixture format used
/// throughout the test suite.
pub fn parse_text(text: &str) -> Result<Board, SolveError> {
    let mut rows = Vec::new();
    for (r, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut row = Vec::with_capacity(line.len());
        for (c, symbol) in line.bytes().enumerate() {
            let color = color_for(symbol).ok_or_else(|| {
                SolveError::invalid(format!(
                    "unknown symbol {:?} at ({r}, {c})",
                    symbol as char
                ))
            })?;
            row.push(color);
        }
        rows.push(row);
    }
    Board::from_rows(&rows)
}

/// Serialize a board as the back-end's JSON form: a 2-D array of byte codes,
/// row-major.
#[must_use]
pub fn encode_codes(board: &Board) -> String {
    let n = board.size();
    let codes: Vec<Vec<u8>> = board
        .as_slice()
        .chunks(n)
        .map(|row| row.iter().map(|&v| symbol_for(v).unwrap_or(OPEN)).collect())
        .collect();
    serde_json::to_string(&codes).expect("2-D byte array always serializes")
}

/// Decode the back-end's JSON 2-D byte-code array back into a board, mapping
/// each code through the alphabet (`0` for an open cell).
pub fn decode_codes(json: &str) -> Result<Board, SolveError> {
    let codes: Vec<Vec<u8>> = serde_json::from_str(json)
        .map_err(|e| SolveError::invalid(format!("malformed code array: {e}")))?;
    let mut rows = Vec::with_capacity(codes.len());
    for (r, code_row) in codes.iter().enumerate() {
        let mut row = Vec::with_capacity(code_row.len());
        for (c, &code) in code_row.iter().enumerate() {
            let color = color_for(code).ok_or_else(|| {
                SolveError::invalid(format!("unknown byte code {code} at ({r}, {c})"))
            })?;
            row.push(color);
        }
        rows.push(row);
    }
    Board::from_rows(&rows)
}
