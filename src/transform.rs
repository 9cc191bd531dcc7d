//! Coordinate mapping between image (pixel) space and world space.
//!
//! The transcoder never assumes a particular calibration. Callers hand in a
//! [`CoordinateMapper`]; readers use `to_world`, writers use `to_image`.

use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bidirectional mapping between image and world coordinates.
pub trait CoordinateMapper {
    /// Image (pixel) coordinates → world coordinates.
    fn to_world(&self, image: [f64; 3]) -> [f64; 3];

    /// World coordinates → image (pixel) coordinates.
    fn to_image(&self, world: [f64; 3]) -> [f64; 3];
}

impl<M: CoordinateMapper + ?Sized> CoordinateMapper for &M {
    fn to_world(&self, image: [f64; 3]) -> [f64; 3] {
        (**self).to_world(image)
    }

    fn to_image(&self, world: [f64; 3]) -> [f64; 3] {
        (**self).to_image(world)
    }
}

/// Image space and world space coincide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityMapper;

impl CoordinateMapper for IdentityMapper {
    fn to_world(&self, image: [f64; 3]) -> [f64; 3] {
        image
    }

    fn to_image(&self, world: [f64; 3]) -> [f64; 3] {
        world
    }
}

// ============================================================================
// Affine transform
// ============================================================================

/// 3D affine transform in homogeneous form, mapping image → world.
/// The inverse is computed once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform3D {
    forward: Matrix4<f64>,
    inverse: Matrix4<f64>,
}

impl AffineTransform3D {
    /// Build from the row-major `[A | t]` image→world matrix.
    /// Fails if the linear part is singular.
    pub fn new(rows: [[f64; 4]; 3]) -> Result<Self> {
        let forward = Matrix4::new(
            rows[0][0], rows[0][1], rows[0][2], rows[0][3],
            rows[1][0], rows[1][1], rows[1][2], rows[1][3],
            rows[2][0], rows[2][1], rows[2][2], rows[2][3],
            0.0, 0.0, 0.0, 1.0,
        );
        let inverse = forward
            .try_inverse()
            .filter(|m| m.iter().all(|v| v.is_finite()))
            .ok_or_else(|| Error::InvalidConfig("affine transform is not invertible".into()))?;
        Ok(Self { forward, inverse })
    }

    pub fn identity() -> Self {
        Self { forward: Matrix4::identity(), inverse: Matrix4::identity() }
    }

    /// Anisotropic voxel scaling plus an offset, the common microscopy case.
    pub fn scale_translate(scale: [f64; 3], offset: [f64; 3]) -> Result<Self> {
        Self::new([
            [scale[0], 0.0, 0.0, offset[0]],
            [0.0, scale[1], 0.0, offset[1]],
            [0.0, 0.0, scale[2], offset[2]],
        ])
    }

    /// The image→world matrix as row-major `[A | t]`.
    pub fn matrix(&self) -> [[f64; 4]; 3] {
        let m = &self.forward;
        std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)]))
    }

    /// The world→image transform as its own mapper.
    pub fn inverted(&self) -> Self {
        Self { forward: self.inverse, inverse: self.forward }
    }
}

impl Default for AffineTransform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl CoordinateMapper for AffineTransform3D {
    fn to_world(&self, image: [f64; 3]) -> [f64; 3] {
        apply(&self.forward, image)
    }

    fn to_image(&self, world: [f64; 3]) -> [f64; 3] {
        apply(&self.inverse, world)
    }
}

fn apply(m: &Matrix4<f64>, p: [f64; 3]) -> [f64; 3] {
    let q = m.transform_point(&Point3::new(p[0], p[1], p[2]));
    [q.x, q.y, q.z]
}
