//! Smart layouts - deterministic default partitions of the canvas.
//!
//! Used whenever the region count has to be reconciled: a prompt count
//! changed, an external source supplied only a count, or regions are being
//! regenerated with neutral placement.

use crate::mapping::{MappingTuple, DEFAULT_MAPPING};
use crate::region::{round2, DEFAULT_WEIGHT, MIN_SYNC_SIZE};

/// Default layout for `count` regions.
///
/// Pure and deterministic:
/// - 0 falls back to left/right halves
/// - 1 is the full canvas, 2 is left/right halves, 3 is vertical thirds
/// - 4 is the 2x2 quadrants
/// - larger counts use a row-major grid with `ceil(sqrt(n))` columns, trailing
///   cells discarded
#[must_use]
pub fn layout(count: usize) -> Vec<MappingTuple> {
    match count {
        0 | 2 => DEFAULT_MAPPING.to_vec(),
        1 => vec![[0.0, 1.0, 0.0, 1.0, DEFAULT_WEIGHT]],
        3 => (0..3).map(|c| cell(c, 0, 3, 1)).collect(),
        4 => grid(4, 2, 2),
        n => {
            let cols = ceil_sqrt(n);
            let rows = n.div_ceil(cols);
            grid(n, cols, rows)
        }
    }
}

fn grid(count: usize, cols: usize, rows: usize) -> Vec<MappingTuple> {
    (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (col, row)))
        .take(count)
        .map(|(col, row)| cell(col, row, cols, rows))
        .collect()
}

fn cell(col: usize, row: usize, cols: usize, rows: usize) -> MappingTuple {
    let (x1, x2) = span(col, cols);
    let (y1, y2) = span(row, rows);
    [x1, x2, y1, y2, DEFAULT_WEIGHT]
}

/// Rounded bounds of slot `index` out of `slots`, never narrower than
/// `MIN_SYNC_SIZE` even when rounding merges neighbouring edges.
#[allow(clippy::cast_precision_loss)]
fn span(index: usize, slots: usize) -> (f64, f64) {
    let (index, slots) = (index as f64, slots as f64);
    let start = round2(index / slots).min(1.0 - MIN_SYNC_SIZE);
    let end = round2((index + 1.0) / slots).max(round2(start + MIN_SYNC_SIZE));
    (start, end)
}

fn ceil_sqrt(n: usize) -> usize {
    let mut root = 1;
    while root * root < n {
        root += 1;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_deterministic() {
        for n in 0..20 {
            assert_eq!(layout(n), layout(n));
        }
    }

    #[test]
    fn test_layout_four_is_quadrants() {
        assert_eq!(
            layout(4),
            vec![
                [0.0, 0.5, 0.0, 0.5, 1.0],
                [0.5, 1.0, 0.0, 0.5, 1.0],
                [0.0, 0.5, 0.5, 1.0, 1.0],
                [0.5, 1.0, 0.5, 1.0, 1.0],
            ]
        );
    }

    #[test]
    fn test_layout_small_counts() {
        assert_eq!(layout(0), DEFAULT_MAPPING.to_vec());
        assert_eq!(layout(1), vec![[0.0, 1.0, 0.0, 1.0, 1.0]]);
        assert_eq!(
            layout(2),
            vec![[0.0, 0.5, 0.0, 1.0, 1.0], [0.5, 1.0, 0.0, 1.0, 1.0]]
        );
        assert_eq!(
            layout(3),
            vec![
                [0.0, 0.33, 0.0, 1.0, 1.0],
                [0.33, 0.67, 0.0, 1.0, 1.0],
                [0.67, 1.0, 0.0, 1.0, 1.0],
            ]
        );
    }

    #[test]
    fn test_layout_grid_fallback() {
        // 5 -> 3 columns, 2 rows, last cell dropped
        let five = layout(5);
        assert_eq!(five.len(), 5);
        assert_eq!(five[0], [0.0, 0.33, 0.0, 0.5, 1.0]);
        assert_eq!(five[3], [0.0, 0.33, 0.5, 1.0, 1.0]);
        assert_eq!(five[4], [0.33, 0.67, 0.5, 1.0, 1.0]);

        // 9 -> exact 3x3
        let nine = layout(9);
        assert_eq!(nine.len(), 9);
        assert_eq!(nine[8], [0.67, 1.0, 0.67, 1.0, 1.0]);
    }

    #[test]
    fn test_layout_cells_stay_in_unit_square() {
        for n in 1..40 {
            let cells = layout(n);
            assert_eq!(cells.len(), n);
            for [x1, x2, y1, y2, w] in cells {
                assert!((0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2));
                assert!((0.0..=1.0).contains(&y1) && (0.0..=1.0).contains(&y2));
                assert!(x1 < x2 && y1 < y2);
                assert!((w - 1.0).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn test_layout_dense_grid_keeps_min_size() {
        // 10_001 -> 101 columns, where rounding alone merges cell edges
        for n in [10_001, 62_500] {
            let cells = layout(n);
            assert_eq!(cells.len(), n);
            for [x1, x2, y1, y2, _] in cells {
                assert!(x2 - x1 >= MIN_SYNC_SIZE - 1e-9, "{x1}..{x2}");
                assert!(y2 - y1 >= MIN_SYNC_SIZE - 1e-9, "{y1}..{y2}");
                assert!(x1 >= 0.0 && x2 <= 1.0 && y1 >= 0.0 && y2 <= 1.0);
            }
        }
    }
}
