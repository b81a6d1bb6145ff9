//! Grid assertions treating NaN cells as equal to each other.

use fcover::ExtractedGrid;

/// Tolerance for values that went through scale/offset unpacking
pub const EPSILON: f32 = 1e-5;

/// Assert that a grid matches `expected` row by row; `f32::NAN` marks masked cells
pub fn assert_grid_eq(grid: &ExtractedGrid, expected: &[&[f32]]) {
    let cols = expected.first().map_or(0, |row| row.len());
    assert_eq!(
        grid.shape(),
        (expected.len(), cols),
        "grid shape differs from expected"
    );

    for (r, row) in expected.iter().enumerate() {
        for (c, &want) in row.iter().enumerate() {
            let got = grid.values[[r, c]];
            if want.is_nan() {
                assert!(got.is_nan(), "cell ({}, {}) should be masked, got {}", r, c, got);
            } else {
                assert!(
                    (got - want).abs() <= EPSILON,
                    "cell ({}, {}) expected {}, got {}",
                    r,
                    c,
                    want,
                    got
                );
            }
        }
    }
}

/// Assert that every cell of a grid is masked
pub fn assert_all_masked(grid: &ExtractedGrid) {
    assert!(
        grid.values.iter().all(|v| v.is_nan()),
        "expected a fully masked grid, got {:?}",
        grid.values
    );
}
