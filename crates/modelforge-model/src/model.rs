//! The canonical model arena
//!
//! Parts and geometries are arena vectors indexed by `PartId` and
//! `GeometryId`; neither is ever removed, so the ids stay valid for
//! the model's lifetime. Meshes can be removed (and merged away), so
//! they carry a monotonically assigned [`MeshUid`] instead of an
//! index.

use crate::geometry::Geometry;
use crate::material::Material;
use crate::mesh::{Mesh, MeshUid, Primitive};
use crate::part::Part;
use modelforge_core::math::{Aabb, BoundingSphere, CoordinateFrame, Vec3};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Index into `Model::parts`
pub type PartId = usize;
/// Index into `Model::geometries`
pub type GeometryId = usize;

/// A fully ingested model
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Model name, usually the source file stem
    pub name: String,
    /// Part hierarchy; append-only
    pub parts: Vec<Part>,
    /// Vertex geometries; append-only
    pub geometries: Vec<Geometry>,
    /// Meshes; removable
    pub meshes: Vec<Mesh>,
    /// Materials by name, shared across meshes
    pub materials: BTreeMap<String, Arc<Material>>,
    /// Whole-model bounds in world space
    pub bounding_box: Aabb,
    /// Sphere around `bounding_box`
    pub bounding_sphere: BoundingSphere,
    next_mesh_uid: u64,
}

impl Model {
    /// Create an empty model
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    // ==================== Parts ====================

    /// Add a part, making the name unique with a `_#N` suffix when it
    /// collides with an existing part
    pub fn add_part(&mut self, name: &str, parent: Option<PartId>) -> PartId {
        let mut unique = name.to_string();
        let mut n = 2;
        while self.part_id(&unique).is_some() {
            unique = format!("{name}_#{n}");
            n += 1;
        }
        self.parts.push(Part::new(unique, parent));
        self.parts.len() - 1
    }

    /// Find a part by exact name
    #[must_use]
    pub fn part_id(&self, name: &str) -> Option<PartId> {
        self.parts.iter().position(|p| p.name == name)
    }

    /// Ids of all parts without a parent
    #[must_use]
    pub fn root_parts(&self) -> Vec<PartId> {
        (0..self.parts.len()).filter(|&i| self.parts[i].is_root()).collect()
    }

    /// Ids of the direct children of `id`
    #[must_use]
    pub fn children_of(&self, id: PartId) -> Vec<PartId> {
        (0..self.parts.len())
            .filter(|&i| self.parts[i].parent == Some(id))
            .collect()
    }

    /// Compose the part-to-world transform along the parent chain
    #[must_use]
    pub fn world_cframe(&self, id: PartId) -> CoordinateFrame {
        let part = &self.parts[id];
        match part.parent {
            Some(parent) => self.world_cframe(parent) * part.cframe,
            None => part.cframe,
        }
    }

    // ==================== Geometries ====================

    /// Add an empty geometry
    pub fn add_geometry(&mut self, name: impl Into<String>) -> GeometryId {
        self.geometries.push(Geometry::new(name));
        self.geometries.len() - 1
    }

    // ==================== Materials ====================

    /// Intern a material by name, keeping the first definition
    pub fn get_or_insert_material(&mut self, material: Material) -> Arc<Material> {
        self.materials
            .entry(material.name.clone())
            .or_insert_with(|| Arc::new(material))
            .clone()
    }

    /// Look up a material by name
    #[must_use]
    pub fn material(&self, name: &str) -> Option<&Arc<Material>> {
        self.materials.get(name)
    }

    // ==================== Meshes ====================

    /// Add a mesh over `geometry` under `part`
    pub fn add_mesh(
        &mut self,
        name: impl Into<String>,
        part: PartId,
        geometry: GeometryId,
        material: Arc<Material>,
        indices: Vec<u32>,
    ) -> MeshUid {
        let uid = MeshUid(self.next_mesh_uid);
        self.next_mesh_uid += 1;
        self.meshes.push(Mesh {
            uid,
            name: name.into(),
            material,
            part,
            geometry,
            indices,
            primitive: Primitive::Triangles,
            two_sided: false,
            contributing_joints: vec![part],
            bounding_box: Aabb::EMPTY,
            bounding_sphere: BoundingSphere::default(),
        });
        uid
    }

    /// Find a mesh by uid
    #[must_use]
    pub fn mesh(&self, uid: MeshUid) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.uid == uid)
    }

    /// Find a mesh by uid, mutably
    pub fn mesh_mut(&mut self, uid: MeshUid) -> Option<&mut Mesh> {
        self.meshes.iter_mut().find(|m| m.uid == uid)
    }

    /// Remove a mesh; parts and geometries are untouched
    pub fn remove_mesh(&mut self, uid: MeshUid) -> bool {
        let before = self.meshes.len();
        self.meshes.retain(|m| m.uid != uid);
        self.meshes.len() != before
    }

    /// Uids of all meshes with the given name
    #[must_use]
    pub fn meshes_named(&self, name: &str) -> Vec<MeshUid> {
        self.meshes
            .iter()
            .filter(|m| m.name == name)
            .map(|m| m.uid)
            .collect()
    }

    // ==================== Statistics ====================

    /// Total triangle count
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Total vertex count across geometries
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.geometries.iter().map(Geometry::len).sum()
    }

    // ==================== Bounds ====================

    /// Recompute mesh, geometry, and model bounds from the current
    /// vertex data. Mesh and geometry bounds are in geometry space;
    /// the model bounds are in world space.
    pub fn compute_bounds(&mut self) {
        for g in &mut self.geometries {
            g.bounding_box = Aabb::EMPTY;
        }

        let mut model_box = Aabb::EMPTY;
        for mesh in &mut self.meshes {
            let geometry = &self.geometries[mesh.geometry];
            let mut b = Aabb::EMPTY;
            for &i in &mesh.indices {
                b.merge_point(geometry.positions[i as usize]);
            }
            mesh.bounding_box = b;
            mesh.bounding_sphere = BoundingSphere::from_aabb(&b);

            // World-space contribution via the owning part's frame
            if !b.is_empty() {
                let world = world_cframe_of(&self.parts, mesh.part);
                for corner in box_corners(&b) {
                    model_box.merge_point(world.transform_point(&corner));
                }
            }
        }

        for mesh in &self.meshes {
            let b = mesh.bounding_box;
            self.geometries[mesh.geometry].bounding_box.merge(&b);
        }
        for g in &mut self.geometries {
            g.bounding_sphere = BoundingSphere::from_aabb(&g.bounding_box);
        }

        self.bounding_box = model_box;
        self.bounding_sphere = BoundingSphere::from_aabb(&model_box);
    }
}

/// Free-function version of [`Model::world_cframe`] usable while
/// meshes are mutably borrowed
fn world_cframe_of(parts: &[Part], id: PartId) -> CoordinateFrame {
    let part = &parts[id];
    match part.parent {
        Some(parent) => world_cframe_of(parts, parent) * part.cframe,
        None => part.cframe,
    }
}

fn box_corners(b: &Aabb) -> [Vec3; 8] {
    let (lo, hi) = (b.min, b.max);
    [
        Vec3::new(lo.x, lo.y, lo.z),
        Vec3::new(hi.x, lo.y, lo.z),
        Vec3::new(lo.x, hi.y, lo.z),
        Vec3::new(hi.x, hi.y, lo.z),
        Vec3::new(lo.x, lo.y, hi.z),
        Vec3::new(hi.x, lo.y, hi.z),
        Vec3::new(lo.x, hi.y, hi.z),
        Vec3::new(hi.x, hi.y, hi.z),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelforge_core::math::Vec4;

    /// A one-triangle model under a translated root part
    pub(crate) fn make_test_model() -> Model {
        let mut model = Model::new("test");
        let part = model.add_part("root", None);
        model.parts[part].cframe.translation = Vec3::new(10.0, 0.0, 0.0);
        let geometry = model.add_geometry("root");
        for p in [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)] {
            model.geometries[geometry].push_vertex(p, Vec3::UNDEFINED, Vec4::UNDEFINED);
        }
        let material = Material::default_shared();
        model.add_mesh("mesh", part, geometry, material, vec![0, 1, 2]);
        model
    }

    #[test]
    fn test_unique_part_names() {
        let mut model = Model::new("m");
        let a = model.add_part("box", None);
        let b = model.add_part("box", None);
        let c = model.add_part("box", None);
        assert_eq!(model.parts[a].name, "box");
        assert_eq!(model.parts[b].name, "box_#2");
        assert_eq!(model.parts[c].name, "box_#3");
    }

    #[test]
    fn test_world_cframe_composes() {
        let mut model = Model::new("m");
        let root = model.add_part("root", None);
        let child = model.add_part("child", Some(root));
        model.parts[root].cframe.translation = Vec3::new(1.0, 0.0, 0.0);
        model.parts[child].cframe.translation = Vec3::new(0.0, 2.0, 0.0);
        let world = model.world_cframe(child);
        assert_eq!(world.translation, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_compute_bounds_world_space() {
        let mut model = make_test_model();
        model.compute_bounds();
        let mesh = &model.meshes[0];
        // Mesh bounds stay in geometry space
        assert_eq!(mesh.bounding_box.min, Vec3::ZERO);
        assert_eq!(mesh.bounding_box.max, Vec3::new(1.0, 1.0, 0.0));
        // Model bounds pick up the part translation
        assert_eq!(model.bounding_box.min, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(model.bounding_box.max, Vec3::new(11.0, 1.0, 0.0));
    }

    #[test]
    fn test_remove_mesh_keeps_parts() {
        let mut model = make_test_model();
        let uid = model.meshes[0].uid;
        assert!(model.remove_mesh(uid));
        assert!(!model.remove_mesh(uid));
        assert_eq!(model.parts.len(), 1);
        assert_eq!(model.geometries.len(), 1);
    }

    #[test]
    fn test_material_interning() {
        let mut model = Model::new("m");
        let a = model.get_or_insert_material(Material::gray("steel"));
        let b = model.get_or_insert_material(Material::gray("steel"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(model.materials.len(), 1);
    }
}
