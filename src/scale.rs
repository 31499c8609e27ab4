//! Input/output scaling.
//!
//! Every scaler is a per-dimension affine map `scaled = (x - offset) / span`:
//!
//! - `Identity`: `offset = 0`, `span = 1`
//! - `Linear`: `offset = min`, `span = max - min` (maps the fitted range onto `[0, 1]`)
//! - `Normal`: `offset = mean`, `span = population std`
//!
//! A scaler must be fitted (`set_scale`) before it can scale. `Identity` is
//! fitted at construction since it needs no data.

use crate::error::check_len;
use crate::{Error, Result};

/// Which affine map a [`Scaler`] fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScaleKind {
    Identity,
    Linear,
    Normal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    kind: ScaleKind,
    offset: Vec<f64>,
    span: Vec<f64>,
}

impl Scaler {
    /// Identity scaler, already fitted for `dimensions` values.
    pub fn identity(dimensions: usize) -> Self {
        Self {
            kind: ScaleKind::Identity,
            offset: vec![0.0; dimensions],
            span: vec![1.0; dimensions],
        }
    }

    /// Unfitted min/max scaler.
    pub fn linear() -> Self {
        Self::unfitted(ScaleKind::Linear)
    }

    /// Unfitted mean/std scaler.
    pub fn normal() -> Self {
        Self::unfitted(ScaleKind::Normal)
    }

    /// Unfitted scaler of `kind`. `Identity` still needs `set_scale` to learn
    /// its width.
    pub fn unfitted(kind: ScaleKind) -> Self {
        Self {
            kind,
            offset: Vec::new(),
            span: Vec::new(),
        }
    }

    /// Rebuilds a fitted scaler from stored `(offset, span)` pairs.
    pub fn from_parts(kind: ScaleKind, offset: Vec<f64>, span: Vec<f64>) -> Result<Self> {
        check_len("scaler span", offset.len(), span.len())?;
        if offset.is_empty() {
            return Err(Error::InvalidData("scaler has no dimensions".to_owned()));
        }
        if offset.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData("scaler offset is not finite".to_owned()));
        }
        if span.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(Error::InvalidData(
                "scaler span must be finite and > 0".to_owned(),
            ));
        }
        Ok(Self { kind, offset, span })
    }

    #[inline]
    pub fn kind(&self) -> ScaleKind {
        self.kind
    }

    #[inline]
    pub fn is_scaled(&self) -> bool {
        !self.offset.is_empty()
    }

    /// Fitted width, 0 while unfitted.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.offset.len()
    }

    #[inline]
    pub fn offset(&self) -> &[f64] {
        &self.offset
    }

    #[inline]
    pub fn span(&self) -> &[f64] {
        &self.span
    }

    /// Fits the scaler to `points`.
    ///
    /// Needs at least two points of equal, non-zero width with finite values.
    /// A constant dimension gets a default span (`min - 0.5 .. max + 0.5` for
    /// `Linear`, `std = 1` for `Normal`); the scaler is then fitted but
    /// `DegenerateScale` is returned listing those dimensions.
    pub fn set_scale<'a, I>(&mut self, points: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a [f64]>,
        I::IntoIter: Clone,
    {
        let points = points.into_iter();
        let (count, dim) = check_points(points.clone())?;

        let mut offset = vec![0.0; dim];
        let mut span = vec![1.0; dim];
        let mut degenerate = Vec::new();

        match self.kind {
            ScaleKind::Identity => {}
            ScaleKind::Linear => {
                let mut min = vec![f64::INFINITY; dim];
                let mut max = vec![f64::NEG_INFINITY; dim];
                for p in points {
                    for j in 0..dim {
                        min[j] = min[j].min(p[j]);
                        max[j] = max[j].max(p[j]);
                    }
                }
                for j in 0..dim {
                    if min[j] == max[j] {
                        min[j] -= 0.5;
                        max[j] += 0.5;
                        degenerate.push(j);
                    }
                    offset[j] = min[j];
                    span[j] = max[j] - min[j];
                }
            }
            ScaleKind::Normal => {
                let n = count as f64;
                for p in points.clone() {
                    for j in 0..dim {
                        offset[j] += p[j];
                    }
                }
                for m in &mut offset {
                    *m /= n;
                }
                let mut var = vec![0.0; dim];
                for p in points {
                    for j in 0..dim {
                        let d = p[j] - offset[j];
                        var[j] += d * d;
                    }
                }
                for j in 0..dim {
                    let std = (var[j] / n).sqrt();
                    if std == 0.0 {
                        degenerate.push(j);
                        span[j] = 1.0;
                    } else {
                        span[j] = std;
                    }
                }
            }
        }

        if let Some(j) = span.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(Error::Numeric(format!(
                "scale of dimension {j} is {}",
                span[j]
            )));
        }

        self.offset = offset;
        self.span = span;

        if degenerate.is_empty() {
            tracing::debug!(kind = ?self.kind, count, dim, "fitted scaler");
            Ok(())
        } else {
            tracing::warn!(kind = ?self.kind, dims = ?degenerate, "constant dimensions while fitting scaler");
            Err(Error::DegenerateScale { dims: degenerate })
        }
    }

    /// Maps a raw point into scaled space, in place.
    ///
    /// On error `point` is left untouched.
    pub fn scale(&self, point: &mut [f64]) -> Result<()> {
        self.apply(point, |x, o, s| (x - o) / s)
    }

    /// Maps a scaled point back into raw space, in place.
    ///
    /// On error `point` is left untouched.
    pub fn unscale(&self, point: &mut [f64]) -> Result<()> {
        self.apply(point, |x, o, s| x * s + o)
    }

    /// [`Scaler::scale`] over a flat row-major buffer of points.
    pub fn scale_rows(&self, rows: &mut [f64]) -> Result<()> {
        self.check_rows(rows)?;
        for point in rows.chunks_exact_mut(self.dimensions()) {
            self.scale(point)?;
        }
        Ok(())
    }

    /// [`Scaler::unscale`] over a flat row-major buffer of points.
    pub fn unscale_rows(&self, rows: &mut [f64]) -> Result<()> {
        self.check_rows(rows)?;
        for point in rows.chunks_exact_mut(self.dimensions()) {
            self.unscale(point)?;
        }
        Ok(())
    }

    #[inline]
    fn apply(&self, point: &mut [f64], f: impl Fn(f64, f64, f64) -> f64) -> Result<()> {
        if !self.is_scaled() {
            return Err(Error::NotScaled);
        }
        check_len("scaled point", self.dimensions(), point.len())?;

        for (j, &x) in point.iter().enumerate() {
            let y = f(x, self.offset[j], self.span[j]);
            if !y.is_finite() {
                return Err(Error::Numeric(format!(
                    "dimension {j}: {x} maps to non-finite {y}"
                )));
            }
        }
        for ((x, &o), &s) in point.iter_mut().zip(&self.offset).zip(&self.span) {
            *x = f(*x, o, s);
        }
        Ok(())
    }

    fn check_rows(&self, rows: &[f64]) -> Result<()> {
        if !self.is_scaled() {
            return Err(Error::NotScaled);
        }
        if rows.len() % self.dimensions() != 0 {
            return Err(Error::InvalidData(format!(
                "rows length {} is not divisible by scaler width {}",
                rows.len(),
                self.dimensions()
            )));
        }
        Ok(())
    }
}

fn check_points<'a, I>(points: I) -> Result<(usize, usize)>
where
    I: Iterator<Item = &'a [f64]>,
{
    let mut count = 0;
    let mut dim = 0;
    for (i, p) in points.enumerate() {
        if i == 0 {
            dim = p.len();
            if dim == 0 {
                return Err(Error::InvalidData("points must have width > 0".to_owned()));
            }
        } else if p.len() != dim {
            return Err(Error::InvalidData(format!(
                "point {i} has len {}, expected {dim}",
                p.len()
            )));
        }
        if p.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(format!("point {i} is not finite")));
        }
        count += 1;
    }
    if count < 2 {
        return Err(Error::InvalidData(format!(
            "need at least 2 points to fit a scaler, got {count}"
        )));
    }
    Ok((count, dim))
}
