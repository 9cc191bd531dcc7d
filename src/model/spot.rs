//! A spot is one detection at one timepoint.

use serde::{Deserialize, Serialize};

/// Opaque spot handle into the owning store's arena.
///
/// Handles are allocated once and never reused, so a handle held across a
/// traversal can go stale (the spot was removed) but never alias another spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpotId(pub u64);

impl std::fmt::Display for SpotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Spatial extent of a spot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Isotropic sphere.
    Sphere { radius: f64 },
    /// Symmetric 3×3 covariance matrix (world units squared).
    Covariance([[f64; 3]; 3]),
}

impl Shape {
    pub fn sphere(radius: f64) -> Self {
        Shape::Sphere { radius }
    }

    /// Covariance of an isotropic sphere: `r²` on the diagonal.
    pub fn covariance_from_radius(radius: f64) -> Self {
        let r2 = radius * radius;
        Shape::Covariance([[r2, 0.0, 0.0], [0.0, r2, 0.0], [0.0, 0.0, r2]])
    }

    /// Radius of the sphere, or the square root of the largest diagonal
    /// variance for a covariance shape.
    pub fn bounding_radius(&self) -> f64 {
        match self {
            Shape::Sphere { radius } => *radius,
            Shape::Covariance(c) => c[0][0].max(c[1][1]).max(c[2][2]).max(0.0).sqrt(),
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Sphere { radius: 10.0 }
    }
}

/// A single detected object instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub time: i32,
    /// World-space position.
    pub position: [f64; 3],
    pub shape: Shape,
    pub label: String,
}

impl Spot {
    pub fn new(time: i32, position: [f64; 3]) -> Self {
        Self {
            time,
            position,
            shape: Shape::default(),
            label: String::new(),
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.shape = Shape::sphere(radius);
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}
