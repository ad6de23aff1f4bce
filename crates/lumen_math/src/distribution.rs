//! Piecewise-constant distributions for importance sampling.
//!
//! [`Distribution1D`] picks lights proportional to their power and is the
//! building block of [`Distribution2D`], which samples environment maps by
//! luminance.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::Vec2;

/// Largest float below one; keeps reconstructed continuous samples in `[0, 1)`.
const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON / 2.0;

/// Discrete distribution over non-negative weights.
///
/// The cumulative table has one more entry than there are weights, starts at 0
/// and ends at 1. If every weight is zero the table is a uniform ramp so that
/// sampling stays well defined, but the reported probabilities are all 0.
#[derive(Debug, Clone)]
pub struct Distribution1D {
    func: Vec<f32>,
    cdf: Vec<f32>,
    /// Sum of all weights (integral with unit spacing).
    integral: f32,
}

impl Distribution1D {
    /// Build the cumulative table for `weights`.
    pub fn new(weights: Vec<f32>) -> Self {
        debug_assert!(!weights.is_empty(), "distribution needs at least one weight");
        debug_assert!(
            weights.iter().all(|w| *w >= 0.0),
            "distribution weights must be non-negative"
        );

        let n = weights.len();
        let mut cdf = Vec::with_capacity(n + 1);
        cdf.push(0.0f32);
        let mut sum = 0.0f64;
        for w in &weights {
            sum += *w as f64;
            cdf.push(sum as f32);
        }

        let integral = sum as f32;
        if integral > 0.0 {
            for c in cdf.iter_mut().skip(1) {
                *c /= integral;
            }
        } else {
            for (i, c) in cdf.iter_mut().enumerate().skip(1) {
                *c = i as f32 / n as f32;
            }
        }
        // Summation error must not leave the last entry short of one.
        if let Some(last) = cdf.last_mut() {
            *last = 1.0;
        }

        Self {
            func: weights,
            cdf,
            integral,
        }
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.func.len()
    }

    /// True if the distribution has no bins.
    pub fn is_empty(&self) -> bool {
        self.func.is_empty()
    }

    /// Sum of all weights.
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Weight of bin `index` as given at construction.
    pub fn value_at(&self, index: usize) -> f32 {
        self.func[index]
    }

    /// Cumulative table (length `len() + 1`).
    pub fn cdf(&self) -> &[f32] {
        &self.cdf
    }

    /// Bin containing the variate `xi`.
    ///
    /// Bin `i` covers `[cdf[i], cdf[i+1])`. When `xi` lands exactly on a shared
    /// boundary the upper bin wins, so zero-weight bins are never returned for a
    /// distribution with positive integral.
    fn find_bin(&self, xi: f32) -> usize {
        self.cdf
            .partition_point(|c| *c <= xi)
            .saturating_sub(1)
            .min(self.func.len() - 1)
    }

    /// Sample a bin index for `xi` in `[0, 1)`, returning it with its probability mass.
    pub fn sample_index(&self, xi: f32) -> (usize, f32) {
        let index = self.find_bin(xi);
        (index, self.pdf(index))
    }

    /// Probability mass of bin `index` (`weight / integral`, 0 for a zero integral).
    pub fn pdf(&self, index: usize) -> f32 {
        if self.integral > 0.0 {
            self.func[index] / self.integral
        } else {
            0.0
        }
    }

    /// Sample a continuous position in `[0, 1)`.
    ///
    /// The fractional offset inside the chosen bin is recovered from where `xi`
    /// lies between the bin's cumulative bounds. Returns `(x, density, index)`
    /// where `density` is with respect to `x` on the unit interval.
    pub fn sample_continuous(&self, xi: f32) -> (f32, f32, usize) {
        let index = self.find_bin(xi);

        let lo = self.cdf[index];
        let hi = self.cdf[index + 1];
        let mut du = xi - lo;
        if hi - lo > 0.0 {
            du /= hi - lo;
        }
        let du = du.clamp(0.0, 1.0);

        let x = ((index as f32 + du) / self.len() as f32).min(ONE_MINUS_EPSILON);
        (x, self.pdf_continuous_bin(index), index)
    }

    /// Density of the continuous variant at `x` in `[0, 1)`.
    pub fn pdf_continuous(&self, x: f32) -> f32 {
        let n = self.len();
        let index = ((x * n as f32) as usize).min(n - 1);
        self.pdf_continuous_bin(index)
    }

    fn pdf_continuous_bin(&self, index: usize) -> f32 {
        if self.integral > 0.0 {
            self.func[index] * self.len() as f32 / self.integral
        } else {
            0.0
        }
    }

    /// Dump the normalized weights to `<prefix>.pdf` and the table to `<prefix>.cdf`.
    ///
    /// One value per line; a diagnostic for plotting, not a stable format.
    pub fn write_debug(&self, prefix: impl AsRef<Path>) -> io::Result<()> {
        let prefix = prefix.as_ref();

        let mut pdf = BufWriter::new(File::create(prefix.with_extension("pdf"))?);
        for i in 0..self.len() {
            writeln!(pdf, "{}", self.pdf(i))?;
        }
        pdf.flush()?;

        let mut cdf = BufWriter::new(File::create(prefix.with_extension("cdf"))?);
        for c in &self.cdf {
            writeln!(cdf, "{}", c)?;
        }
        cdf.flush()?;

        log::debug!("Wrote distribution tables with prefix {}", prefix.display());
        Ok(())
    }
}

/// Piecewise-constant density over the unit square, built from a row-major grid.
///
/// Rows map to `v`, columns to `u`. A row is drawn from the marginal over row
/// integrals, then a column from that row's conditional distribution.
#[derive(Debug, Clone)]
pub struct Distribution2D {
    conditional: Vec<Distribution1D>,
    marginal: Distribution1D,
    width: usize,
    height: usize,
}

impl Distribution2D {
    /// Build from `values` of length `width * height` (row-major).
    pub fn new(values: &[f32], width: usize, height: usize) -> Self {
        debug_assert!(width > 0 && height > 0);
        debug_assert_eq!(values.len(), width * height);

        let conditional: Vec<Distribution1D> = values
            .chunks_exact(width)
            .take(height)
            .map(|row| Distribution1D::new(row.to_vec()))
            .collect();
        let marginal =
            Distribution1D::new(conditional.iter().map(Distribution1D::integral).collect());

        Self {
            conditional,
            marginal,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum of all grid values.
    pub fn integral(&self) -> f32 {
        self.marginal.integral()
    }

    /// Mean grid value, i.e. the integral of the function over the unit square.
    pub fn unit_integral(&self) -> f32 {
        self.marginal.integral() / (self.width * self.height) as f32
    }

    /// Sample `(u, v)` in `[0, 1)²` from two uniform variates.
    ///
    /// Returns the position and its density with respect to area on the unit square.
    pub fn sample(&self, xi: Vec2) -> (Vec2, f32) {
        let (v, pdf_v, row) = self.marginal.sample_continuous(xi.y);
        let (u, pdf_u, _) = self.conditional[row].sample_continuous(xi.x);
        debug_assert!(pdf_u.is_finite() && pdf_v.is_finite());
        (Vec2::new(u, v), pdf_u * pdf_v)
    }

    /// Density of [`Distribution2D::sample`] at `uv`.
    pub fn pdf(&self, uv: Vec2) -> f32 {
        let integral = self.integral();
        if integral <= 0.0 {
            return 0.0;
        }
        let x = ((uv.x * self.width as f32) as usize).min(self.width - 1);
        let y = ((uv.y * self.height as f32) as usize).min(self.height - 1);
        self.conditional[y].value_at(x) * (self.width * self.height) as f32 / integral
    }
}
