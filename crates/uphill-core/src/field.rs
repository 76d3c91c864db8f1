//! Static level geometry and the overlap query used by collision resolution.
//!
//! An [`ObstacleField`] is built once per level and is read-only while the
//! simulation runs. Queries return obstacles in insertion order so that a
//! body overlapping several obstacles in one axis pass always resolves
//! against them in the same sequence.

use serde::{Deserialize, Serialize};

use crate::math::Rect;
use crate::CoreError;

// ---------------------------------------------------------------------------
// SurfaceKind
// ---------------------------------------------------------------------------

/// Opaque surface tag carried by every obstacle.
///
/// The integrator does not read it; level data keeps it so that future
/// surface types (ice, one-way platforms) can be added without a format
/// change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceKind(pub u32);

impl SurfaceKind {
    /// Plain solid ground.
    pub const SOLID: SurfaceKind = SurfaceKind(0);
}

// ---------------------------------------------------------------------------
// Obstacle
// ---------------------------------------------------------------------------

/// A static axis-aligned rectangle of level geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// World-space bounds.
    #[serde(flatten)]
    pub rect: Rect,
    /// Surface tag (currently no behavioural effect).
    #[serde(default)]
    pub kind: SurfaceKind,
}

impl Obstacle {
    /// Create an obstacle with an explicit surface kind.
    pub const fn new(rect: Rect, kind: SurfaceKind) -> Self {
        Self { rect, kind }
    }

    /// Create a [`SurfaceKind::SOLID`] obstacle from raw coordinates.
    pub const fn solid(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Rect::new(x, y, width, height), SurfaceKind::SOLID)
    }
}

// ---------------------------------------------------------------------------
// ObstacleField
// ---------------------------------------------------------------------------

/// Immutable, insertion-ordered collection of level obstacles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    /// Build a field, rejecting obstacles with non-finite coordinates or
    /// negative extents.
    pub fn new(obstacles: Vec<Obstacle>) -> Result<Self, CoreError> {
        if let Some((index, bad)) = obstacles
            .iter()
            .enumerate()
            .find(|(_, o)| !o.rect.is_well_formed())
        {
            return Err(CoreError::InvalidObstacle {
                index,
                rect: bad.rect,
            });
        }
        Ok(Self { obstacles })
    }

    /// A field with no geometry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every obstacle whose rectangle intersects `bounds`, in insertion order.
    ///
    /// Touching edges do not count as overlap. The iterator borrows the field
    /// and allocates nothing.
    pub fn overlapping(&self, bounds: Rect) -> impl Iterator<Item = &Obstacle> + '_ {
        self.obstacles
            .iter()
            .filter(move |o| bounds.intersects(&o.rect))
    }

    /// All obstacles in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Obstacle> {
        self.obstacles.iter()
    }

    /// The obstacle at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Obstacle> {
        self.obstacles.get(index)
    }

    /// Number of obstacles.
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    /// Whether the field has no obstacles.
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl<'a> IntoIterator for &'a ObstacleField {
    type Item = &'a Obstacle;
    type IntoIter = std::slice::Iter<'a, Obstacle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
