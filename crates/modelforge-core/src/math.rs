//! Math primitives used across modelforge
//!
//! Small hand-rolled vector/matrix types tailored to the ingestion
//! pipeline. Normals and tangents use a NaN sentinel to mark "not yet
//! synthesized"; see [`Vec3::UNDEFINED`] and [`Vec4::UNDEFINED`].

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub};

/// 2D vector (UV coordinates, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// All zeros
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    /// All ones
    pub const ONE: Self = Self { x: 1.0, y: 1.0 };

    /// Create a new vector
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Default for Vec2 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// 3D vector (position, normal, color triple, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// All zeros
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    /// All ones
    pub const ONE: Self = Self { x: 1.0, y: 1.0, z: 1.0 };
    /// Unit Y
    pub const UP: Self = Self { x: 0.0, y: 1.0, z: 0.0 };
    /// Sentinel for "this attribute has not been synthesized yet"
    pub const UNDEFINED: Self = Self { x: f32::NAN, y: f32::NAN, z: f32::NAN };

    /// Create a new vector
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Uniform vector with all components equal to `v`
    #[must_use]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Euclidean length
    #[must_use]
    pub fn length(&self) -> f32 {
        self.squared_length().sqrt()
    }

    /// Squared Euclidean length
    #[must_use]
    pub fn squared_length(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Unit-length copy, or zero if this vector has zero length
    #[must_use]
    pub fn direction_or_zero(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len, self.z / len)
        } else {
            Self::ZERO
        }
    }

    /// Dot product
    #[must_use]
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[must_use]
    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Component-wise minimum
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum
    #[must_use]
    pub fn max(&self, other: &Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Largest single component
    #[must_use]
    pub fn max_component(&self) -> f32 {
        self.x.max(self.y).max(self.z)
    }

    /// True when all components are finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// True when all components are exactly zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// True when this is the NaN sentinel (any NaN component counts)
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.x.is_nan()
    }

    /// Any unit vector perpendicular to this one
    #[must_use]
    pub fn arbitrary_perpendicular(&self) -> Self {
        // Pick the axis most orthogonal to self to avoid degeneracy
        let axis = if self.x.abs() < 0.9 {
            Self::new(1.0, 0.0, 0.0)
        } else {
            Self::UP
        };
        self.cross(&axis).direction_or_zero()
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl MulAssign<f32> for Vec3 {
    fn mul_assign(&mut self, s: f32) {
        *self = *self * s;
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;
    fn div(self, s: f32) -> Self {
        Self::new(self.x / s, self.y / s, self.z / s)
    }
}

/// 4D vector (tangent with handedness in w, RGBA color, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Vec4 {
    /// All zeros
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };
    /// All ones
    pub const ONE: Self = Self { x: 1.0, y: 1.0, z: 1.0, w: 1.0 };
    /// Sentinel for "this attribute has not been synthesized yet"
    pub const UNDEFINED: Self = Self { x: f32::NAN, y: f32::NAN, z: f32::NAN, w: f32::NAN };

    /// Create a new vector
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Extend a 3D vector with a w component
    #[must_use]
    pub const fn from_vec3(v: Vec3, w: f32) -> Self {
        Self { x: v.x, y: v.y, z: v.z, w }
    }

    /// Drop the w component
    #[must_use]
    pub const fn xyz(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// True when this is the NaN sentinel (any NaN component counts)
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.x.is_nan()
    }
}

impl Default for Vec4 {
    fn default() -> Self {
        Self::ZERO
    }
}

/// 3x3 rotation/linear matrix, row-major
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat3 {
    /// Rows of the matrix
    pub m: [[f32; 3]; 3],
}

impl Mat3 {
    /// Identity matrix
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Rotation about `axis` (assumed unit length) by `angle` radians
    #[must_use]
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        Self {
            m: [
                [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
                [t * x * y + s * z, t * y * y + c, t * y * z - s * x],
                [t * x * z - s * y, t * y * z + s * x, t * z * z + c],
            ],
        }
    }

    /// Read a column as a vector
    #[must_use]
    pub const fn column(&self, c: usize) -> Vec3 {
        Vec3::new(self.m[0][c], self.m[1][c], self.m[2][c])
    }

    /// Overwrite a column
    pub fn set_column(&mut self, c: usize, v: Vec3) {
        self.m[0][c] = v.x;
        self.m[1][c] = v.y;
        self.m[2][c] = v.z;
    }

    /// Matrix determinant
    #[must_use]
    pub fn determinant(&self) -> f32 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Transposed copy
    #[must_use]
    pub fn transpose(&self) -> Self {
        let m = &self.m;
        Self {
            m: [
                [m[0][0], m[1][0], m[2][0]],
                [m[0][1], m[1][1], m[2][1]],
                [m[0][2], m[1][2], m[2][2]],
            ],
        }
    }

    /// Transform a vector
    #[must_use]
    pub fn transform(&self, v: &Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// Gram-Schmidt orthonormalization of the columns
    #[must_use]
    pub fn orthonormalized(&self) -> Self {
        let c0 = self.column(0).direction_or_zero();
        let mut c1 = self.column(1);
        c1 = (c1 - c0 * c0.dot(&c1)).direction_or_zero();
        let c2 = c0.cross(&c1);

        let mut out = Self::IDENTITY;
        out.set_column(0, c0);
        out.set_column(1, c1);
        out.set_column(2, c2);
        out
    }

    /// True when the column basis is right-handed
    #[must_use]
    pub fn is_right_handed(&self) -> bool {
        self.determinant() > 0.0
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Mat3 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut out = Self { m: [[0.0; 3]; 3] };
        for r in 0..3 {
            for c in 0..3 {
                out.m[r][c] = (0..3).map(|k| self.m[r][k] * rhs.m[k][c]).sum();
            }
        }
        out
    }
}

/// 4x4 transformation matrix, row-major
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat4 {
    /// Rows of the matrix
    pub m: [[f32; 4]; 4],
}

impl Mat4 {
    /// Identity matrix
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Pure translation matrix
    #[must_use]
    pub const fn translation(t: Vec3) -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, t.x],
                [0.0, 1.0, 0.0, t.y],
                [0.0, 0.0, 1.0, t.z],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// The upper-left 3x3 block
    #[must_use]
    pub const fn upper3x3(&self) -> Mat3 {
        Mat3 {
            m: [
                [self.m[0][0], self.m[0][1], self.m[0][2]],
                [self.m[1][0], self.m[1][1], self.m[1][2]],
                [self.m[2][0], self.m[2][1], self.m[2][2]],
            ],
        }
    }

    /// The translation column
    #[must_use]
    pub const fn translation_column(&self) -> Vec3 {
        Vec3::new(self.m[0][3], self.m[1][3], self.m[2][3])
    }

    /// Transform a point (homogeneous w = 1)
    #[must_use]
    pub fn transform_point(&self, p: &Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3],
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3],
        )
    }

    /// Extract the nearest rigid coordinate frame: orthonormalize the
    /// rotation block and take the translation column. The result is
    /// forced right-handed by negating the first column if necessary.
    #[must_use]
    pub fn approx_coordinate_frame(&self) -> CoordinateFrame {
        let mut rotation = self.upper3x3().orthonormalized();
        if !rotation.is_right_handed() {
            rotation.set_column(0, -rotation.column(0));
        }
        CoordinateFrame {
            rotation,
            translation: self.translation_column(),
        }
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<CoordinateFrame> for Mat4 {
    fn from(cf: CoordinateFrame) -> Self {
        let r = &cf.rotation.m;
        Self {
            m: [
                [r[0][0], r[0][1], r[0][2], cf.translation.x],
                [r[1][0], r[1][1], r[1][2], cf.translation.y],
                [r[2][0], r[2][1], r[2][2], cf.translation.z],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

/// Rigid transform: rotation plus translation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateFrame {
    /// Rotation part (orthonormal for a valid frame)
    pub rotation: Mat3,
    /// Translation part
    pub translation: Vec3,
}

impl CoordinateFrame {
    /// The identity frame
    pub const IDENTITY: Self = Self {
        rotation: Mat3::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Inverse of a rigid transform
    #[must_use]
    pub fn inverse(&self) -> Self {
        let rt = self.rotation.transpose();
        let t = rt.transform(&self.translation);
        Self {
            rotation: rt,
            translation: -t,
        }
    }

    /// Transform a point: `R * p + t`
    #[must_use]
    pub fn transform_point(&self, p: &Vec3) -> Vec3 {
        self.rotation.transform(p) + self.translation
    }
}

impl Default for CoordinateFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for CoordinateFrame {
    type Output = Self;
    // (self * rhs): apply rhs first, then self
    fn mul(self, rhs: Self) -> Self {
        Self {
            rotation: self.rotation * rhs.rotation,
            translation: self.rotation.transform(&rhs.translation) + self.translation,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// The empty box (merging anything into it yields that thing)
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create from explicit corners
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// True when no point has been merged yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Grow to include a point
    pub fn merge_point(&mut self, p: Vec3) {
        self.min = self.min.min(&p);
        self.max = self.max.max(&p);
    }

    /// Grow to include another box
    pub fn merge(&mut self, other: &Self) {
        if !other.is_empty() {
            self.min = self.min.min(&other.min);
            self.max = self.max.max(&other.max);
        }
    }

    /// Center point (zero for the empty box)
    #[must_use]
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    /// Diagonal extent (zero for the empty box)
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Bounding sphere, derived from an [`Aabb`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingSphere {
    /// Sphere center
    pub center: Vec3,
    /// Sphere radius
    pub radius: f32,
}

impl BoundingSphere {
    /// Sphere circumscribing a box
    #[must_use]
    pub fn from_aabb(b: &Aabb) -> Self {
        Self {
            center: b.center(),
            radius: b.extent().length() / 2.0,
        }
    }

    /// True when `other` fits entirely inside this sphere
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        let d = (other.center - self.center).length();
        d + other.radius <= self.radius + 1e-5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_or_zero() {
        assert_eq!(Vec3::ZERO.direction_or_zero(), Vec3::ZERO);
        let d = Vec3::new(3.0, 0.0, 0.0).direction_or_zero();
        assert_eq!(d, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_undefined_sentinel() {
        assert!(Vec3::UNDEFINED.is_undefined());
        assert!(Vec4::UNDEFINED.is_undefined());
        assert!(!Vec3::ZERO.is_undefined());
    }

    #[test]
    fn test_axis_angle_rotation() {
        let r = Mat3::from_axis_angle(Vec3::UP, std::f32::consts::FRAC_PI_2);
        let v = r.transform(&Vec3::new(1.0, 0.0, 0.0));
        assert!((v.z - -1.0).abs() < 1e-6);
        assert!(v.x.abs() < 1e-6);
    }

    #[test]
    fn test_coordinate_frame_inverse() {
        let cf = CoordinateFrame {
            rotation: Mat3::from_axis_angle(Vec3::UP, 0.7),
            translation: Vec3::new(1.0, 2.0, 3.0),
        };
        let p = Vec3::new(-4.0, 5.0, 0.25);
        let q = cf.inverse().transform_point(&cf.transform_point(&p));
        assert!((q - p).length() < 1e-5);
    }

    #[test]
    fn test_approx_coordinate_frame_right_handed() {
        // A mirrored matrix must come back right-handed
        let m = Mat4 {
            m: [
                [-1.0, 0.0, 0.0, 5.0],
                [0.0, 1.0, 0.0, 6.0],
                [0.0, 0.0, 1.0, 7.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        };
        let cf = m.approx_coordinate_frame();
        assert!(cf.rotation.is_right_handed());
        assert_eq!(cf.translation, Vec3::new(5.0, 6.0, 7.0));
    }

    #[test]
    fn test_aabb_merge_and_sphere() {
        let mut b = Aabb::EMPTY;
        assert!(b.is_empty());
        b.merge_point(Vec3::ZERO);
        b.merge_point(Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(b.center(), Vec3::new(1.0, 0.0, 0.0));

        let s = BoundingSphere::from_aabb(&b);
        assert!((s.radius - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sphere_containment() {
        let big = BoundingSphere { center: Vec3::ZERO, radius: 10.0 };
        let small = BoundingSphere { center: Vec3::new(5.0, 0.0, 0.0), radius: 2.0 };
        assert!(big.contains(&small));
        assert!(!small.contains(&big));
    }
}
