//! Transform types for holder and element rotations.

use super::{Axis, Direction};
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

/// Block-level transform carried by a model holder.
///
/// Angles are integer degrees in {0, 90, 180, 270}. The geometry pipeline
/// negates all three angles before building the rotation matrices so that
/// positive holder angles agree with the source-data convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HolderTransform {
    /// X rotation in degrees.
    pub x: i32,
    /// Y rotation in degrees.
    pub y: i32,
    /// Z rotation in degrees.
    pub z: i32,
    /// If true, UV coordinates don't rotate with the block.
    pub uv_lock: bool,
}

impl HolderTransform {
    pub fn new(x: i32, y: i32, z: i32, uv_lock: bool) -> Self {
        Self { x, y, z, uv_lock }
    }

    /// Check if this is an identity transform (no rotation).
    pub fn is_identity(&self) -> bool {
        self.x % 360 == 0 && self.y % 360 == 0 && self.z % 360 == 0
    }

    /// The combined rotation matrix: x, then y, then z, with all angles
    /// negated per the holder sign convention.
    pub fn matrix(&self) -> Mat3 {
        let rx = Mat3::from_rotation_x((-self.x as f32).to_radians());
        let ry = Mat3::from_rotation_y((-self.y as f32).to_radians());
        let rz = Mat3::from_rotation_z((-self.z as f32).to_radians());
        rz * ry * rx
    }

    /// Rotate a block-local point about the block center (0.5, 0.5, 0.5).
    pub fn rotate_point(&self, p: [f32; 3]) -> [f32; 3] {
        if self.is_identity() {
            return p;
        }
        let center = Vec3::splat(0.5);
        let rotated = self.matrix() * (Vec3::from_array(p) - center) + center;
        rotated.to_array()
    }

    /// Rotate a direction vector (no translation).
    pub fn rotate_vector(&self, v: [f32; 3]) -> [f32; 3] {
        if self.is_identity() {
            return v;
        }
        (self.matrix() * Vec3::from_array(v)).to_array()
    }

    /// Rotate a face direction through this transform.
    ///
    /// 90-degree multiples always map cardinals to cardinals; the snap
    /// absorbs float noise.
    pub fn rotate_direction(&self, dir: Direction) -> Direction {
        if self.is_identity() {
            return dir;
        }
        Direction::from_vector(self.rotate_vector(dir.normal()))
    }
}

/// Element-level rotation from a model element.
///
/// `origin` arrives in [0, 16] units from the content JSON; the model
/// resolver divides it by 16 along with the element coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRotation {
    #[serde(default = "default_origin")]
    pub origin: [f32; 3],
    /// Axis to rotate around.
    pub axis: Axis,
    /// Rotation angle in degrees.
    pub angle: f32,
    /// Whether to rescale the element so a tilted face keeps its footprint.
    #[serde(default)]
    pub rescale: bool,
}

fn default_origin() -> [f32; 3] {
    [8.0, 8.0, 8.0]
}

impl ElementRotation {
    /// Get the angle in radians.
    pub fn angle_radians(&self) -> f32 {
        self.angle.to_radians()
    }

    /// Scale factor applied to the two coordinates orthogonal to the axis
    /// when `rescale` is set.
    pub fn rescale_factor(&self) -> f32 {
        if self.rescale {
            1.0 / self.angle_radians().cos()
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = HolderTransform::default();
        assert!(t.is_identity());
        assert_eq!(t.rotate_point([0.25, 0.5, 0.75]), [0.25, 0.5, 0.75]);
        assert_eq!(t.rotate_direction(Direction::North), Direction::North);
    }

    #[test]
    fn test_y_rotation_moves_faces() {
        // Negated-sign convention: y=90 sends north to east.
        let t = HolderTransform::new(0, 90, 0, false);
        assert_eq!(t.rotate_direction(Direction::North), Direction::East);
        assert_eq!(t.rotate_direction(Direction::East), Direction::South);
        assert_eq!(t.rotate_direction(Direction::Up), Direction::Up);
    }

    #[test]
    fn test_rotation_preserves_center() {
        let t = HolderTransform::new(90, 180, 270, false);
        let p = t.rotate_point([0.5, 0.5, 0.5]);
        for c in p {
            assert!((c - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_full_turn_is_identity() {
        let t = HolderTransform::new(0, 360, 0, false);
        assert!(t.is_identity());
    }

    #[test]
    fn test_rescale_factor() {
        let rot = ElementRotation {
            origin: [8.0, 8.0, 8.0],
            axis: Axis::Y,
            angle: 45.0,
            rescale: true,
        };
        assert!((rot.rescale_factor() - std::f32::consts::SQRT_2).abs() < 1e-5);

        let no_rescale = ElementRotation { rescale: false, ..rot };
        assert_eq!(no_rescale.rescale_factor(), 1.0);
    }
}
