pub fn manhattan_dist((x1, y1): (usize, usize), (x2, y2): (usize, usize)) -> usize {
    x1.abs_diff(x2) + y1.abs_diff(y2)
}

/// Offsets `x` by `dx` and clamps the result to `0..len`.
pub fn clamped_offset(x: usize, dx: isize, len: usize) -> usize {
    x.saturating_add_signed(dx).min(len - 1)
}
