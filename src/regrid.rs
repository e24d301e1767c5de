//! Resampling of reduced latitude/longitude grids onto full regular ones.
//!
//! A reduced Gaussian grid thins the points per latitude row towards the
//! poles; the packing and rendering paths downstream assume a rectangular
//! grid, so each row is stretched back to the widest row length by linear
//! interpolation in longitude index space. Longitude is periodic, so the
//! interpolation wraps around the end of each row.

use crate::error::{GribError, Result};
use crate::utils::is_missing;

/// Resample a reduced-grid field to `nx_max` points per row. Rows keep
/// their order; only within-row interpolation occurs. Output points whose
/// source neighbours include a missing value stay missing.
pub fn reduced_to_regular(
    values: &[f64],
    points_per_row: &[u32],
    nx_max: usize,
    missing: f64,
) -> Result<Vec<f64>> {
    let total: usize = points_per_row.iter().map(|n| *n as usize).sum();
    if total != values.len() {
        return Err(GribError::InvalidGridSpec(format!(
            "points-per-row sum {} != {} data values",
            total,
            values.len()
        )));
    }
    if nx_max == 0 {
        return Err(GribError::InvalidGridSpec(String::from(
            "zero output row length",
        )));
    }

    let mut out = Vec::with_capacity(points_per_row.len() * nx_max);
    let mut offset = 0usize;
    for nx in points_per_row {
        let nx = *nx as usize;
        let row = &values[offset..offset + nx];
        offset += nx;

        if nx == nx_max {
            out.extend_from_slice(row);
            continue;
        }
        if nx == 0 {
            out.extend(std::iter::repeat(missing).take(nx_max));
            continue;
        }

        let delon = nx as f64 / nx_max as f64;
        for j in 0..nx_max {
            let zxi = j as f64 * delon;
            let im = zxi as usize % nx;
            let ip = (im + 1) % nx;
            let zdx = zxi - (zxi as usize) as f64;
            let (left, right) = (row[im], row[ip]);
            if is_missing(left, missing) || is_missing(right, missing) {
                out.push(missing);
            } else {
                out.push((1.0 - zdx) * left + zdx * right);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_stretch_to_the_widest_row() {
        // 2, 4 and 2 points per row onto 4 output columns
        let values = [0.0, 2.0, 1.0, 2.0, 3.0, 4.0, 10.0, 30.0];
        let out = reduced_to_regular(&values, &[2, 4, 2], 4, f64::NAN).unwrap();
        assert_eq!(out.len(), 12);

        // row 0: source indices 0.0, 0.5, 1.0, 1.5 with circular wrap
        assert_eq!(&out[0..4], &[0.0, 1.0, 2.0, 1.0]);
        // row 1 is already full width
        assert_eq!(&out[4..8], &[1.0, 2.0, 3.0, 4.0]);
        // row 2 wraps back towards the first point
        assert_eq!(&out[8..12], &[10.0, 20.0, 30.0, 20.0]);
    }

    #[test]
    fn sum_mismatch_is_rejected_before_resampling() {
        let values = [1.0, 2.0, 3.0];
        assert!(matches!(
            reduced_to_regular(&values, &[2, 4, 2], 4, f64::NAN),
            Err(GribError::InvalidGridSpec(_))
        ));
    }

    #[test]
    fn single_point_row_is_constant() {
        let out = reduced_to_regular(&[7.5], &[1], 4, f64::NAN).unwrap();
        assert_eq!(out, vec![7.5; 4]);
    }

    #[test]
    fn missing_neighbours_stay_missing() {
        let values = [10.0, f64::NAN, 30.0, 40.0];
        let out = reduced_to_regular(&values, &[4], 8, f64::NAN).unwrap();
        // both neighbours are checked, so points adjacent to the gap stay
        // missing even at integer source offsets
        assert!(out[0..4].iter().all(|v| v.is_nan()));
        assert_eq!(&out[4..8], &[30.0, 35.0, 40.0, 25.0]);
    }

    #[test]
    fn interpolation_never_reads_out_of_range() {
        // 3 points onto 7 columns: fractional indices stay below 3
        let values = [0.0, 3.0, 6.0];
        let out = reduced_to_regular(&values, &[3], 7, f64::NAN).unwrap();
        assert_eq!(out.len(), 7);
        for value in &out {
            assert!(value.is_finite());
            assert!((0.0..=6.0).contains(value));
        }
    }
}
