//! Circular statistics over compass directions.
//!
//! Angles wrap at 360°, so means and dispersion are computed from summed
//! unit vectors instead of plain arithmetic.

use std::fmt;

/// An angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Degree(pub f64);

impl Degree {
    /// Range-reduces the angle into `[0, 360)`.
    pub fn clamped(self) -> Degree {
        let d = self.0.rem_euclid(360.0);
        // rem_euclid rounds tiny negative inputs up to exactly 360.0
        // `+ 0.0` turns -0.0 into 0.0
        if d >= 360.0 { Degree(0.0) } else { Degree(d + 0.0) }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn radians(self) -> f64 {
        self.0.to_radians()
    }
}

impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}

/// Weighted means of the sine and cosine components.
///
/// Returns `None` for empty input or when the weights do not sum to a
/// positive number.
fn mean_components(pairs: impl Iterator<Item = (Degree, f64)>) -> Option<(f64, f64)> {
    let mut sin_sum = 0.0;
    let mut cos_sum = 0.0;
    let mut weight_sum = 0.0;
    for (angle, w) in pairs {
        let r = angle.radians();
        sin_sum += w * r.sin();
        cos_sum += w * r.cos();
        weight_sum += w;
    }

    if weight_sum <= 0.0 || !weight_sum.is_finite() {
        return None;
    }
    Some((sin_sum / weight_sum, cos_sum / weight_sum))
}

/// Pairs each angle with its weight; `None` when the lengths differ.
fn weighted_components(angles: &[Degree], weights: &[f64]) -> Option<(f64, f64)> {
    if angles.len() != weights.len() {
        return None;
    }
    mean_components(angles.iter().copied().zip(weights.iter().copied()))
}

fn unweighted_components(angles: &[Degree]) -> Option<(f64, f64)> {
    mean_components(angles.iter().map(|&a| (a, 1.0)))
}

/// Weighted circular mean, clamped into `[0, 360)`. `None` when the
/// slices differ in length.
pub fn weighted_mean(angles: &[Degree], weights: &[f64]) -> Option<Degree> {
    let (s, c) = weighted_components(angles, weights)?;
    Some(Degree(s.atan2(c).to_degrees()).clamped())
}

/// Unweighted circular mean, clamped into `[0, 360)`.
pub fn mean(angles: &[Degree]) -> Option<Degree> {
    let (s, c) = unweighted_components(angles)?;
    Some(Degree(s.atan2(c).to_degrees()).clamped())
}

/// Yamartino estimate of the standard deviation from mean components.
fn yamartino(s: f64, c: f64) -> f64 {
    let eps = (1.0 - (s * s + c * c)).max(0.0).sqrt().min(1.0);
    let k = 2.0 / 3.0_f64.sqrt() - 1.0;
    (eps.asin() * (1.0 + k * eps.powi(3))).to_degrees()
}

/// Weighted circular standard deviation in degrees (Yamartino method).
///
/// Bounded above by roughly 103.9° for uniformly scattered directions.
pub fn weighted_std_dev(angles: &[Degree], weights: &[f64]) -> Option<f64> {
    let (s, c) = weighted_components(angles, weights)?;
    Some(yamartino(s, c))
}

/// Unweighted circular standard deviation in degrees (Yamartino method).
pub fn std_dev(angles: &[Degree]) -> Option<f64> {
    let (s, c) = unweighted_components(angles)?;
    Some(yamartino(s, c))
}

/// Resolution of a compass label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionPrecision {
    /// N, E, S, W
    Cardinal,
    /// N, NE, E, ...
    Intercardinal,
    /// N, NNE, NE, ENE, ...
    SecondaryIntercardinal,
}

const POINTS_16: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

impl DirectionPrecision {
    fn points(self) -> usize {
        match self {
            DirectionPrecision::Cardinal => 4,
            DirectionPrecision::Intercardinal => 8,
            DirectionPrecision::SecondaryIntercardinal => 16,
        }
    }
}

/// Formats a direction as the nearest compass point at `precision`.
pub fn direction_str(direction: Degree, precision: DirectionPrecision) -> &'static str {
    let points = precision.points();
    let sector = 360.0 / points as f64;
    let idx = (direction.clamped().0 / sector).round() as usize % points;
    POINTS_16[idx * (16 / points)]
}
