//! Material-aware mesh merging
//!
//! Meshes sharing a material (by `Arc` identity), part, geometry, and
//! sidedness can be drawn together; merging their index lists trades
//! cull granularity for fewer draw calls. The radius limits bound how
//! much a merge may inflate the combined bounding sphere: a merge that
//! does not grow the larger of the two spheres is always free, and one
//! that does must stay under the per-class radius. Opaque and
//! non-opaque materials get separate limits because over-merged
//! transparent geometry sorts badly.
//!
//! Call [`Model::compute_bounds`] first; the predicate reads mesh
//! bounds.

use crate::mesh::MeshUid;
use crate::model::Model;
use modelforge_core::math::BoundingSphere;
use std::sync::Arc;
use tracing::debug;

/// Merge all eligible mesh pairs. `opaque_radius` and
/// `transmissive_radius` of zero disable merging for that class;
/// infinity removes the growth limit.
pub fn merge_meshes(model: &mut Model, opaque_radius: f32, transmissive_radius: f32) {
    if opaque_radius == 0.0 && transmissive_radius == 0.0 {
        return;
    }

    // Group by material identity, preserving mesh order
    let mut groups: Vec<(usize, Vec<MeshUid>)> = Vec::new();
    for mesh in &model.meshes {
        let key = Arc::as_ptr(&mesh.material) as usize;
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, uids)) => uids.push(mesh.uid),
            None => groups.push((key, vec![mesh.uid])),
        }
    }

    let before = model.meshes.len();
    for (_, mut uids) in groups {
        let mut i = 0;
        while i < uids.len() {
            let mut j = i + 1;
            while j < uids.len() {
                if try_merge(model, uids[i], uids[j], opaque_radius, transmissive_radius) {
                    uids.remove(j);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }

    let after = model.meshes.len();
    if after != before {
        debug!(before, after, "merged meshes");
    }
}

fn try_merge(
    model: &mut Model,
    dst: MeshUid,
    src: MeshUid,
    opaque_radius: f32,
    transmissive_radius: f32,
) -> bool {
    let (Some(a), Some(b)) = (model.mesh(dst), model.mesh(src)) else {
        return false;
    };

    if a.primitive != b.primitive
        || a.two_sided != b.two_sided
        || a.part != b.part
        || a.geometry != b.geometry
    {
        return false;
    }

    let src_r = a.bounding_sphere.radius;
    let dst_r = b.bounding_sphere.radius;
    let mut combined_box = a.bounding_box;
    combined_box.merge(&b.bounding_box);
    let combined = BoundingSphere::from_aabb(&combined_box);

    // The union can never shrink, so equality means no growth
    let did_not_grow = combined.radius <= src_r.max(dst_r);

    let opaque = a.material.is_fully_opaque();
    let allowed = if opaque {
        opaque_radius > 0.0 && (did_not_grow || combined.radius <= opaque_radius)
    } else {
        transmissive_radius > 0.0 && (did_not_grow || combined.radius <= transmissive_radius)
    };
    if !allowed {
        return false;
    }

    // Same geometry, so index lists concatenate without remapping
    let (src_name, src_indices, src_joints) = {
        let b = model.mesh(src).unwrap_or_else(|| unreachable!());
        (b.name.clone(), b.indices.clone(), b.contributing_joints.clone())
    };
    let Some(a) = model.mesh_mut(dst) else { return false };
    a.indices.extend_from_slice(&src_indices);
    for joint in src_joints {
        if !a.contributing_joints.contains(&joint) {
            a.contributing_joints.push(joint);
        }
    }
    if src_name < a.name {
        a.name = src_name;
    }
    a.bounding_box = combined_box;
    a.bounding_sphere = combined;

    model.remove_mesh(src);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::model::Model;
    use modelforge_core::math::{Vec3, Vec4};

    /// Two triangles at a controllable separation, one mesh each
    fn two_mesh_model(offset: f32, shared_material: bool) -> Model {
        let mut model = Model::new("m");
        let part = model.add_part("root", None);
        let geometry = model.add_geometry("root");
        {
            let g = &mut model.geometries[geometry];
            for p in [
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(offset, 0.0, 0.0),
                Vec3::new(offset + 1.0, 0.0, 0.0),
                Vec3::new(offset, 1.0, 0.0),
            ] {
                g.push_vertex(p, Vec3::new(0.0, 0.0, 1.0), Vec4::ZERO);
            }
        }
        let m1 = model.get_or_insert_material(Material::gray("a"));
        let m2 = if shared_material {
            m1.clone()
        } else {
            model.get_or_insert_material(Material::gray("b"))
        };
        model.add_mesh("alpha", part, geometry, m1, vec![0, 1, 2]);
        model.add_mesh("beta", part, geometry, m2, vec![3, 4, 5]);
        model.compute_bounds();
        model
    }

    #[test]
    fn test_zero_radii_merge_nothing() {
        let mut model = two_mesh_model(0.0, true);
        merge_meshes(&mut model, 0.0, 0.0);
        assert_eq!(model.meshes.len(), 2);
    }

    #[test]
    fn test_coincident_meshes_merge() {
        let mut model = two_mesh_model(0.0, true);
        merge_meshes(&mut model, f32::INFINITY, f32::INFINITY);
        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        // Alphabetically lesser name survives
        assert_eq!(mesh.name, "alpha");
    }

    #[test]
    fn test_different_materials_never_merge() {
        let mut model = two_mesh_model(0.0, false);
        merge_meshes(&mut model, f32::INFINITY, f32::INFINITY);
        assert_eq!(model.meshes.len(), 2);
    }

    #[test]
    fn test_radius_limit_blocks_distant_merge() {
        let mut model = two_mesh_model(100.0, true);
        // Combined radius far exceeds 1, and the merge grows the sphere
        merge_meshes(&mut model, 1.0, 1.0);
        assert_eq!(model.meshes.len(), 2);
    }

    #[test]
    fn test_no_growth_merge_ignores_radius() {
        // The second triangle sits inside the first one's bounds
        let mut model = two_mesh_model(0.0, true);
        merge_meshes(&mut model, 0.001, 0.001);
        assert_eq!(model.meshes.len(), 1);
    }

    #[test]
    fn test_merged_bounds_contain_both() {
        let mut model = two_mesh_model(3.0, true);
        let spheres: Vec<BoundingSphere> =
            model.meshes.iter().map(|m| m.bounding_sphere).collect();
        merge_meshes(&mut model, f32::INFINITY, f32::INFINITY);
        assert_eq!(model.meshes.len(), 1);
        let merged = model.meshes[0].bounding_sphere;
        for s in spheres {
            assert!(merged.contains(&s));
        }
    }

    #[test]
    fn test_two_sided_mismatch_blocks_merge() {
        let mut model = two_mesh_model(0.0, true);
        model.meshes[1].two_sided = true;
        merge_meshes(&mut model, f32::INFINITY, f32::INFINITY);
        assert_eq!(model.meshes.len(), 2);
    }

    #[test]
    fn test_transmissive_uses_its_own_radius() {
        let mut model = two_mesh_model(100.0, true);
        let mut glass = Material::gray("a2");
        glass.alpha = 0.5;
        glass.alpha_hint = crate::material::AlphaHint::Blend;
        let shared = Arc::new(glass);
        for mesh in &mut model.meshes {
            mesh.material = shared.clone();
        }
        // Opaque radius alone cannot merge a transparent pair
        merge_meshes(&mut model, f32::INFINITY, 0.0);
        assert_eq!(model.meshes.len(), 2);
        merge_meshes(&mut model, 0.0, f32::INFINITY);
        assert_eq!(model.meshes.len(), 1);
    }
}
