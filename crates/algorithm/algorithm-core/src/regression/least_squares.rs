//! Ridge-damped ordinary least squares

use algorithm_spi::{Result, TsError};

/// Solve `min ||X b - y||² + ridge ||b||²` through the normal equations.
///
/// `design` is row-major: one row per observation, all rows the same width.
/// An empty design (no columns) yields an empty coefficient vector.
pub fn solve_ridge(design: &[Vec<f64>], target: &[f64], ridge: f64) -> Result<Vec<f64>> {
    if design.len() != target.len() {
        return Err(TsError::InvalidData(format!(
            "design has {} rows but target has {} values",
            design.len(),
            target.len()
        )));
    }
    let k = design.first().map_or(0, Vec::len);
    if k == 0 {
        return Ok(Vec::new());
    }
    if design.iter().any(|row| row.len() != k) {
        return Err(TsError::InvalidData(
            "design rows have different widths".to_string(),
        ));
    }

    // Augmented normal equations [X'X + ridge I | X'y]
    let mut system = vec![vec![0.0; k + 1]; k];
    for (row, &y) in design.iter().zip(target.iter()) {
        for i in 0..k {
            for j in i..k {
                system[i][j] += row[i] * row[j];
            }
            system[i][k] += row[i] * y;
        }
    }
    for i in 0..k {
        for j in 0..i {
            system[i][j] = system[j][i];
        }
        system[i][i] += ridge;
    }

    gaussian_elimination(system)
}

/// Gaussian elimination with partial pivoting on an augmented `k x (k+1)` matrix
fn gaussian_elimination(mut system: Vec<Vec<f64>>) -> Result<Vec<f64>> {
    let k = system.len();

    for col in 0..k {
        let pivot_row = (col..k)
            .max_by(|&a, &b| {
                system[a][col]
                    .abs()
                    .partial_cmp(&system[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);

        if system[pivot_row][col].abs() < 1e-12 {
            return Err(TsError::NumericalError(
                "Singular matrix in least squares".to_string(),
            ));
        }
        system.swap(col, pivot_row);

        for row in (col + 1)..k {
            let factor = system[row][col] / system[col][col];
            if factor == 0.0 {
                continue;
            }
            for j in col..=k {
                system[row][j] -= factor * system[col][j];
            }
        }
    }

    let mut solution = vec![0.0; k];
    for i in (0..k).rev() {
        let tail: f64 = ((i + 1)..k).map(|j| system[i][j] * solution[j]).sum();
        solution[i] = (system[i][k] - tail) / system[i][i];
    }

    if solution.iter().any(|x| !x.is_finite()) {
        return Err(TsError::NumericalError(
            "Least squares solution is not finite".to_string(),
        ));
    }
    Ok(solution)
}
