use crate::error::*;
use gridworld::Continous;
use ndarray::{Array1, Array2};

/// Pivots smaller than this are treated as zero.
pub const SINGULAR_EPS: Continous = 1e-12;

/// Solves `a · x = b` by Gaussian elimination with partial pivoting.
pub fn solve(mut a: Array2<Continous>, mut b: Array1<Continous>) -> Result<Array1<Continous>> {
    let n = b.len();
    assert_eq!(a.dim(), (n, n), "system must be square");

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < SINGULAR_EPS {
            return Err(Error::SingularSystem { pivot: col });
        }

        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }

        for row in (col + 1)..n {
            let f = a[[row, col]] / a[[col, col]];
            if f == 0. {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= f * a[[col, k]];
            }
            b[row] -= f * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: Continous = ((row + 1)..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }

    Ok(x)
}
