//! Quadratic least-squares fit of a noise floor.
//!
//! A [`FitCurve`] can be saved after fitting one recording and loaded to
//! evaluate the same floor on another, such as the other channel of a stereo
//! pair, without refitting.

use crate::error::{AnalysisError, Result};
use crate::export::write_atomic;
use std::fmt::Write as _;
use std::path::Path;

/// Second-degree polynomial `a*x^2 + b*x + c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitCurve {
    coefficients: [f64; 3],
}

impl FitCurve {
    /// Create a curve from coefficients, highest degree first.
    pub fn new(coefficients: [f64; 3]) -> Self {
        Self { coefficients }
    }

    /// Coefficients, highest degree first.
    pub fn coefficients(&self) -> [f64; 3] {
        self.coefficients
    }

    /// Evaluate the polynomial at `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        let [a, b, c] = self.coefficients;
        (a * x + b) * x + c
    }

    /// Evaluate the polynomial at every point of `xs`.
    pub fn evaluate_all(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }

    /// Least-squares fit of a quadratic to `(xs, ys)`.
    ///
    /// The abscissa is centered and scaled before solving the normal
    /// equations, then the coefficients are mapped back to raw `x`.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<FitCurve> {
        if xs.len() != ys.len() {
            return Err(AnalysisError::InvalidParameter(format!(
                "fit needs equal-length inputs, got {} and {}",
                xs.len(),
                ys.len()
            )));
        }
        let points: Vec<(f64, f64)> = xs
            .iter()
            .zip(ys)
            .filter(|&(x, y)| x.is_finite() && y.is_finite())
            .map(|(&x, &y)| (x, y))
            .collect();

        let mut distinct: Vec<f64> = points.iter().map(|p| p.0).collect();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        if distinct.len() < 3 {
            return Err(AnalysisError::InvalidParameter(format!(
                "quadratic fit needs at least 3 distinct frequencies, got {}",
                distinct.len()
            )));
        }

        let n = points.len() as f64;
        let mean = points.iter().map(|p| p.0).sum::<f64>() / n;
        let spread = (points.iter().map(|p| (p.0 - mean).powi(2)).sum::<f64>() / n).sqrt();

        // Normal equations in u = (x - mean) / spread
        let mut s = [0.0f64; 5];
        let mut t = [0.0f64; 3];
        for &(x, y) in &points {
            let u = (x - mean) / spread;
            let mut p = 1.0;
            for k in 0..5 {
                s[k] += p;
                if k < 3 {
                    t[k] += p * y;
                }
                p *= u;
            }
        }
        let matrix = [
            [s[4], s[3], s[2]],
            [s[3], s[2], s[1]],
            [s[2], s[1], s[0]],
        ];
        let rhs = [t[2], t[1], t[0]];
        let [a, b, c] = solve3(matrix, rhs)?;

        // Expand a*u^2 + b*u + c back into powers of x
        let s2 = spread * spread;
        let coefficients = [
            a / s2,
            b / spread - 2.0 * a * mean / s2,
            a * mean * mean / s2 - b * mean / spread + c,
        ];
        tracing::debug!(?coefficients, "fitted quadratic noise floor");
        Ok(FitCurve { coefficients })
    }

    /// Render as text, one coefficient per line, highest degree first.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for c in self.coefficients {
            // `{:e}` is the shortest representation that parses back exactly
            let _ = writeln!(out, "{c:e}");
        }
        out
    }

    /// Parse text holding exactly three non-blank coefficient lines.
    pub fn from_text(text: &str) -> Result<FitCurve> {
        let values = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| {
                l.parse::<f64>()
                    .map_err(|e| AnalysisError::InvalidFitFile(format!("'{l}': {e}")))
            })
            .collect::<Result<Vec<f64>>>()?;

        let coefficients: [f64; 3] = values.as_slice().try_into().map_err(|_| {
            AnalysisError::InvalidFitFile(format!(
                "expected 3 coefficients, found {}",
                values.len()
            ))
        })?;
        Ok(FitCurve { coefficients })
    }

    /// Write the coefficients to `path` atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_atomic(path, self.to_text().as_bytes())?;
        Ok(())
    }

    /// Load coefficients written by [`FitCurve::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<FitCurve> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(&text)
    }
}

/// Solve a 3x3 system by Gaussian elimination with partial pivoting.
fn solve3(mut m: [[f64; 3]; 3], mut v: [f64; 3]) -> Result<[f64; 3]> {
    for col in 0..3 {
        let pivot = (col..3)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-12 {
            return Err(AnalysisError::InvalidParameter(
                "quadratic fit is singular".to_string(),
            ));
        }
        m.swap(col, pivot);
        v.swap(col, pivot);

        for row in col + 1..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..3 {
                m[row][k] -= factor * m[col][k];
            }
            v[row] -= factor * v[col];
        }
    }

    let mut x = [0.0f64; 3];
    for row in (0..3).rev() {
        let tail: f64 = (row + 1..3).map(|k| m[row][k] * x[k]).sum();
        x[row] = (v[row] - tail) / m[row][row];
    }
    Ok(x)
}
