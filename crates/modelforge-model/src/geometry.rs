//! Vertex geometry storage
//!
//! Attributes live in parallel arrays. `positions`, `normals`,
//! `tangents` always have the same length; the remaining arrays are
//! either that length or empty. Normals and tangents may hold the NaN
//! sentinel until geometry cleaning synthesizes them.

use modelforge_core::math::{Aabb, BoundingSphere, Vec2, Vec3, Vec4};

/// One shared vertex array, referenced by mesh index lists
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Geometry name
    pub name: String,
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex normals, NaN until synthesized
    pub normals: Vec<Vec3>,
    /// Vertex tangents with handedness in w, NaN until synthesized
    pub tangents: Vec<Vec4>,
    /// Primary texture coordinates, empty when the source had none
    pub tex_coords0: Vec<Vec2>,
    /// Secondary texture coordinates (light map channel)
    pub tex_coords1: Vec<Vec2>,
    /// Vertex colors
    pub vertex_colors: Vec<Vec4>,
    /// Skinning bone indices
    pub bone_indices: Vec<[u16; 4]>,
    /// Skinning bone weights
    pub bone_weights: Vec<Vec4>,
    /// Union of the bounding boxes of the meshes using this geometry
    pub bounding_box: Aabb,
    /// Sphere around `bounding_box`
    pub bounding_sphere: BoundingSphere,
}

impl Geometry {
    /// Create an empty geometry
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Number of vertices
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when there are no vertices
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// True when the primary texture coordinate array is populated
    #[must_use]
    pub fn has_tex_coord0(&self) -> bool {
        !self.tex_coords0.is_empty()
    }

    /// Append a vertex with the core attributes, returning its index.
    /// Optional arrays must be pushed separately by callers that use
    /// them.
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3, tangent: Vec4) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.tangents.push(tangent);
        index
    }

    /// All core attribute arrays agree in length, and each optional
    /// array is empty or that same length
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        let optional_ok = |len: usize| len == 0 || len == n;
        self.normals.len() == n
            && self.tangents.len() == n
            && optional_ok(self.tex_coords0.len())
            && optional_ok(self.tex_coords1.len())
            && optional_ok(self.vertex_colors.len())
            && optional_ok(self.bone_indices.len())
            && optional_ok(self.bone_weights.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_vertex() {
        let mut g = Geometry::new("g");
        let i = g.push_vertex(Vec3::ZERO, Vec3::UNDEFINED, Vec4::UNDEFINED);
        assert_eq!(i, 0);
        assert_eq!(g.len(), 1);
        assert!(g.normals[0].is_undefined());
        assert!(g.is_consistent());
    }

    #[test]
    fn test_consistency_detects_mismatch() {
        let mut g = Geometry::new("g");
        g.push_vertex(Vec3::ZERO, Vec3::UP, Vec4::ZERO);
        g.push_vertex(Vec3::ONE, Vec3::UP, Vec4::ZERO);
        g.tex_coords0.push(Vec2::ZERO);
        assert!(!g.is_consistent());
        g.tex_coords0.push(Vec2::ZERO);
        assert!(g.is_consistent());
    }
}
