//! Mesh: an indexed triangle list with one material

use crate::material::Material;
use crate::model::{GeometryId, PartId};
use modelforge_core::math::{Aabb, BoundingSphere};
use std::sync::Arc;

/// Stable mesh identity, preserved across removals and merges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshUid(pub u64);

/// Primitive topology of a mesh's index list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Primitive {
    /// Independent triangles, three indices each
    #[default]
    Triangles,
}

/// A draw call: indices into one geometry, under one part, with one
/// material
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Stable identity
    pub uid: MeshUid,
    /// Mesh name; meshes may share a name across parts
    pub name: String,
    /// Shared material; identity comparison uses the `Arc` pointer
    pub material: Arc<Material>,
    /// Owning part
    pub part: PartId,
    /// Geometry holding the vertices
    pub geometry: GeometryId,
    /// Index list, three entries per triangle
    pub indices: Vec<u32>,
    /// Index topology
    pub primitive: Primitive,
    /// Render both faces
    pub two_sided: bool,
    /// Parts whose transforms affect these vertices. Contains at least
    /// the owning part.
    pub contributing_joints: Vec<PartId>,
    /// Bounds over the referenced positions, in geometry space
    pub bounding_box: Aabb,
    /// Sphere around `bounding_box`
    pub bounding_sphere: BoundingSphere,
}

impl Mesh {
    /// Number of triangles
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Same material by pointer identity
    #[must_use]
    pub fn shares_material(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.material, &other.material)
    }

    /// Swap each triangle's second and third index
    pub fn reverse_winding(&mut self) {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }
}
