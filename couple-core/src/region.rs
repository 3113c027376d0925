//! Regions - weighted rectangles of the target image, each bound to a prompt.

use serde::{Deserialize, Serialize};

/// Minimum region span for pointer-driven edits (create, move, resize).
pub const MIN_DRAG_SIZE: f64 = 0.05;

/// Minimum region span for every other normalization (table, import, mapping).
pub const MIN_SYNC_SIZE: f64 = 0.01;

/// Lowest accepted region weight.
pub const WEIGHT_MIN: f64 = 0.1;

/// Highest accepted region weight.
pub const WEIGHT_MAX: f64 = 5.0;

/// Weight given to new regions.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Region colors, handed out round-robin at creation.
pub const PALETTE: [&str; 7] = [
    "#ff0000", // red
    "#ffa500", // orange
    "#ffff00", // yellow
    "#008000", // green
    "#0000ff", // blue
    "#4b0082", // indigo
    "#ee82ee", // violet
];

/// Palette color for the n-th created region.
#[must_use]
pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Unique identifier for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(u64);

impl RegionId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalized rectangular area with its prompt and weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Unique identifier.
    pub id: RegionId,
    /// Left bound in `[0, 1]`.
    pub x1: f64,
    /// Top bound in `[0, 1]`.
    pub y1: f64,
    /// Right bound in `[0, 1]`.
    pub x2: f64,
    /// Bottom bound in `[0, 1]`.
    pub y2: f64,
    /// Conditioning weight in `[0.1, 5.0]`.
    pub weight: f64,
    /// Prompt text for this region.
    #[serde(default)]
    pub prompt: String,
    /// Display color as hex.
    pub color: String,
}

impl Region {
    /// Width of the region in normalized units.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Height of the region in normalized units.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Check if a normalized point lies within this region (edges inclusive).
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// Restore every region invariant using the given minimum span.
    pub fn normalize(&mut self, min_size: f64) {
        let (x1, x2) = normalize_span(self.x1, self.x2, min_size);
        let (y1, y2) = normalize_span(self.y1, self.y2, min_size);
        self.x1 = x1;
        self.x2 = x2;
        self.y1 = y1;
        self.y2 = y2;
        self.weight = clamp_weight(self.weight);
    }

    /// Copy of this region with invariants restored.
    #[must_use]
    pub fn normalized(mut self, min_size: f64) -> Self {
        self.normalize(min_size);
        self
    }

    /// Check all invariants for the given minimum span.
    ///
    /// A tiny tolerance absorbs float error from re-centering.
    #[must_use]
    pub fn is_valid(&self, min_size: f64) -> bool {
        const EPS: f64 = 1e-9;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        in_unit(self.x1)
            && in_unit(self.x2)
            && in_unit(self.y1)
            && in_unit(self.y2)
            && self.x1 < self.x2
            && self.y1 < self.y2
            && self.width() + EPS >= min_size
            && self.height() + EPS >= min_size
            && (WEIGHT_MIN..=WEIGHT_MAX).contains(&self.weight)
    }
}

/// Geometry and weight for a region that does not exist yet.
///
/// Missing coordinates fall back to position-dependent defaults chosen by the
/// store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionDraft {
    /// Bounds as `(x1, y1, x2, y2)`.
    pub bounds: Option<(f64, f64, f64, f64)>,
    /// Weight (defaults to 1.0).
    pub weight: Option<f64>,
    /// Prompt (defaults to empty).
    pub prompt: Option<String>,
    /// Preserved color (imports keep theirs; otherwise palette).
    pub color: Option<String>,
}

impl RegionDraft {
    /// Draft with explicit bounds.
    #[must_use]
    pub fn with_bounds(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            bounds: Some((x1, y1, x2, y2)),
            ..Self::default()
        }
    }

    /// Set the weight.
    #[must_use]
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Set the prompt.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Set the color.
    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Clamp a weight into its valid range, mapping non-finite input to the default.
#[must_use]
pub fn clamp_weight(weight: f64) -> f64 {
    finite_or(weight, DEFAULT_WEIGHT).clamp(WEIGHT_MIN, WEIGHT_MAX)
}

/// Normalize one axis: clamp to `[0, 1]`, order the bounds, and re-center the
/// span if it is narrower than `min_size`.
#[must_use]
pub fn normalize_span(lo: f64, hi: f64, min_size: f64) -> (f64, f64) {
    let mut lo = finite_or(lo, 0.0).clamp(0.0, 1.0);
    let mut hi = finite_or(hi, 1.0).clamp(0.0, 1.0);
    if lo > hi {
        std::mem::swap(&mut lo, &mut hi);
    }
    if hi - lo < min_size {
        let center = (lo + hi) / 2.0;
        lo = (center - min_size / 2.0).clamp(0.0, 1.0 - min_size);
        hi = (lo + min_size).min(1.0);
    }
    (lo, hi)
}

/// Round to two decimals (mapping coordinates).
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to one decimal (mapping weights).
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x1: f64, y1: f64, x2: f64, y2: f64) -> Region {
        Region {
            id: RegionId::new(1),
            x1,
            y1,
            x2,
            y2,
            weight: 1.0,
            prompt: String::new(),
            color: PALETTE[0].to_string(),
        }
    }

    #[test]
    fn test_normalize_swaps_inverted_bounds() {
        let r = region(0.8, 0.9, 0.2, 0.1).normalized(MIN_SYNC_SIZE);
        assert!((r.x1 - 0.2).abs() < 1e-12);
        assert!((r.x2 - 0.8).abs() < 1e-12);
        assert!((r.y1 - 0.1).abs() < 1e-12);
        assert!((r.y2 - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_recenters_thin_span() {
        let r = region(0.5, 0.0, 0.5, 1.0).normalized(MIN_DRAG_SIZE);
        assert!((r.width() - MIN_DRAG_SIZE).abs() < 1e-9);
        assert!(((r.x1 + r.x2) / 2.0 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_recenter_stays_in_unit_square() {
        let r = region(1.0, 0.0, 1.0, 0.0).normalized(MIN_DRAG_SIZE);
        assert!(r.is_valid(MIN_DRAG_SIZE));
        assert!((r.x2 - 1.0).abs() < 1e-9);
        assert!(r.y1.abs() < 1e-9);
    }

    #[test]
    fn test_normalize_clamps_and_handles_nan() {
        let mut r = region(-0.5, f64::NAN, 1.5, 0.5);
        r.weight = 9.0;
        r.normalize(MIN_SYNC_SIZE);
        assert!(r.x1.abs() < f64::EPSILON);
        assert!((r.x2 - 1.0).abs() < f64::EPSILON);
        assert!(r.y1.abs() < f64::EPSILON);
        assert!((r.weight - WEIGHT_MAX).abs() < f64::EPSILON);
        assert!(r.is_valid(MIN_SYNC_SIZE));
    }

    #[test]
    fn test_clamp_weight() {
        assert!((clamp_weight(0.0) - WEIGHT_MIN).abs() < f64::EPSILON);
        assert!((clamp_weight(f64::INFINITY) - DEFAULT_WEIGHT).abs() < f64::EPSILON);
        assert!((clamp_weight(2.5) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_palette_round_robin() {
        assert_eq!(palette_color(0), PALETTE[0]);
        assert_eq!(palette_color(PALETTE.len()), PALETTE[0]);
        assert_eq!(palette_color(8), PALETTE[1]);
    }

    #[test]
    fn test_rounding() {
        assert!((round2(0.333_333) - 0.33).abs() < f64::EPSILON);
        assert!((round2(0.666_666) - 0.67).abs() < f64::EPSILON);
        assert!((round1(1.25) - 1.3).abs() < f64::EPSILON);
    }
}
