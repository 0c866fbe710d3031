//! D8 flow directions (TauDEM encoding)
//!
//! ```text
//! 4 3 2
//! 5 · 1
//! 6 7 8
//! ```
//! Code 0 (or any value outside 1..=8) means the pixel has no defined flow.

/// Direction offsets: (row_offset, col_offset), indexed by direction code.
pub const OFFSETS: [(isize, isize); 9] = [
    (0, 0),   // 0: no flow
    (0, 1),   // 1: E
    (-1, 1),  // 2: NE
    (-1, 0),  // 3: N
    (-1, -1), // 4: NW
    (0, -1),  // 5: W
    (1, -1),  // 6: SW
    (1, 0),   // 7: S
    (1, 1),   // 8: SE
];

/// Whether `code` is a defined flow direction
#[inline]
pub fn is_valid(code: u8) -> bool {
    (1..=8).contains(&code)
}

/// Offset for a direction code, or `None` for no-flow codes
#[inline]
pub fn offset(code: u8) -> Option<(isize, isize)> {
    if is_valid(code) {
        Some(OFFSETS[code as usize])
    } else {
        None
    }
}

/// The pixel that `(row, col)` drains into, or `None` when the code is
/// undefined or the flow leaves a `rows x cols` grid.
#[inline]
pub fn downstream(row: usize, col: usize, code: u8, rows: usize, cols: usize) -> Option<(usize, usize)> {
    let (dr, dc) = offset(code)?;
    let nr = row as isize + dr;
    let nc = col as isize + dc;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        return None;
    }
    Some((nr as usize, nc as usize))
}

/// Whether two pixels are distinct queen-move neighbors
pub fn is_adjacent(a: (usize, usize), b: (usize, usize)) -> bool {
    let dr = a.0 as isize - b.0 as isize;
    let dc = a.1 as isize - b.1 as isize;
    (dr != 0 || dc != 0) && dr.abs() <= 1 && dc.abs() <= 1
}
