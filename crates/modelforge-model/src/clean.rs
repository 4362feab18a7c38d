//! Geometry cleaning
//!
//! Runs per geometry, across every mesh that references it:
//!
//! 1. Decide what is missing. Any NaN normal triggers normal
//!    synthesis (and invalidates that vertex's tangent); otherwise any
//!    NaN tangent triggers tangent synthesis alone.
//! 2. Build a per-triangle face table with an adjacency index keyed by
//!    vertex position alone, so smoothing sees faces that touch in
//!    space even when their other attributes differ.
//! 3. Synthesize missing normals by angle-limited averaging of
//!    adjacent face normals.
//! 4. Weld vertices: identical attributes merge when their normals
//!    agree within the weld angle. Welding is what removes the
//!    duplication the OBJ builder introduces.
//! 5. Synthesize missing tangents from the texture-space gradients of
//!    the final indexed triangles.
//!
//! The steps are ordered so running the whole pass twice changes
//! nothing: a welded, fully-attributed geometry has no NaN attributes
//! and every weld candidate already matches itself exactly.

use crate::mesh::MeshUid;
use crate::model::{GeometryId, Model};
use modelforge_core::math::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::f32::consts::PI;
use tracing::debug;

/// Controls for the cleaning pass. Angles are radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CleanSettings {
    /// Weld vertices even when nothing else required rebuilding
    pub force_vertex_merging: bool,
    /// Master switch for welding
    pub allow_vertex_merging: bool,
    /// Discard and resynthesize every normal
    pub force_compute_normals: bool,
    /// Discard and resynthesize every tangent
    pub force_compute_tangents: bool,
    /// Largest normal disagreement that still welds two vertices
    pub max_normal_weld_angle: f32,
    /// Largest face-normal angle across which smoothing averages
    pub max_smooth_angle: f32,
}

impl Default for CleanSettings {
    fn default() -> Self {
        Self {
            force_vertex_merging: true,
            allow_vertex_merging: true,
            force_compute_normals: false,
            force_compute_tangents: false,
            max_normal_weld_angle: 8.0 * PI / 180.0,
            max_smooth_angle: 65.0 * PI / 180.0,
        }
    }
}

/// Clean every geometry in the model, then recompute bounds
pub fn clean_geometry(model: &mut Model, settings: &CleanSettings) {
    for geometry in 0..model.geometries.len() {
        clean_one(model, geometry, settings);
    }
    model.compute_bounds();
}

/// Full attribute copy of one face corner
#[derive(Debug, Clone, Copy)]
struct FaceVertex {
    position: Vec3,
    normal: Vec3,
    tangent: Vec4,
    tex0: Vec2,
    tex1: Vec2,
    color: Vec4,
    bone_indices: [u16; 4],
    bone_weights: Vec4,
    source_index: u32,
}

#[derive(Debug, Clone)]
struct Face {
    vertex: [FaceVertex; 3],
    mesh: MeshUid,
    non_unit_normal: Vec3,
    unit_normal: Vec3,
}

/// Bit-pattern hash key. NaN payloads compare equal to themselves this
/// way, which is exactly what the sentinel needs.
type Key = [u32; 19];

fn position_key(p: Vec3) -> [u32; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

/// Everything except normal and tangent; those are what welding is
/// allowed to reconcile
fn attribute_key(v: &FaceVertex) -> Key {
    [
        v.position.x.to_bits(),
        v.position.y.to_bits(),
        v.position.z.to_bits(),
        v.tex0.x.to_bits(),
        v.tex0.y.to_bits(),
        v.tex1.x.to_bits(),
        v.tex1.y.to_bits(),
        v.color.x.to_bits(),
        v.color.y.to_bits(),
        v.color.z.to_bits(),
        v.color.w.to_bits(),
        u32::from(v.bone_indices[0]),
        u32::from(v.bone_indices[1]),
        u32::from(v.bone_indices[2]),
        u32::from(v.bone_indices[3]),
        v.bone_weights.x.to_bits(),
        v.bone_weights.y.to_bits(),
        v.bone_weights.z.to_bits(),
        v.bone_weights.w.to_bits(),
    ]
}

fn clean_one(model: &mut Model, geometry: GeometryId, settings: &CleanSettings) {
    let mesh_uids: Vec<MeshUid> = model
        .meshes
        .iter()
        .filter(|m| m.geometry == geometry)
        .map(|m| m.uid)
        .collect();
    if mesh_uids.is_empty() && model.geometries[geometry].is_empty() {
        return;
    }

    {
        let g = &mut model.geometries[geometry];
        if settings.force_compute_normals {
            g.normals.fill(Vec3::UNDEFINED);
        }
        if settings.force_compute_tangents {
            g.tangents.fill(Vec4::UNDEFINED);
        }
    }

    // Determine needs. A synthesized normal invalidates the tangent
    // built against the old one.
    let compute_normals = {
        let g = &mut model.geometries[geometry];
        let mut any = false;
        for i in 0..g.normals.len() {
            if g.normals[i].is_undefined() {
                g.tangents[i] = Vec4::UNDEFINED;
                any = true;
            }
        }
        any
    };
    let compute_tangents = compute_normals
        || model.geometries[geometry].tangents.iter().any(Vec4::is_undefined);

    let merge = settings.allow_vertex_merging
        && (compute_normals || settings.force_vertex_merging);

    if compute_normals || merge {
        let mut faces = build_face_array(model, geometry, &mesh_uids);

        if compute_normals {
            compute_missing_normals(&mut faces, settings.max_smooth_angle);
        }

        if merge {
            merge_vertices(model, geometry, &mesh_uids, &faces, settings.max_normal_weld_angle);
        } else if compute_normals {
            // Welding disallowed: push the synthesized normals back
            // into the vertices they came from
            let g = &mut model.geometries[geometry];
            for face in &faces {
                for v in &face.vertex {
                    g.normals[v.source_index as usize] = v.normal;
                }
            }
        }
    }

    if compute_tangents {
        compute_missing_tangents(model, geometry, &mesh_uids);
    }
}

fn build_face_array(model: &Model, geometry: GeometryId, mesh_uids: &[MeshUid]) -> Vec<Face> {
    let g = &model.geometries[geometry];
    let fetch = |index: u32| -> FaceVertex {
        let i = index as usize;
        FaceVertex {
            position: g.positions[i],
            normal: g.normals[i],
            tangent: g.tangents[i],
            tex0: g.tex_coords0.get(i).copied().unwrap_or(Vec2::ZERO),
            tex1: g.tex_coords1.get(i).copied().unwrap_or(Vec2::ZERO),
            color: g.vertex_colors.get(i).copied().unwrap_or(Vec4::ZERO),
            bone_indices: g.bone_indices.get(i).copied().unwrap_or([0; 4]),
            bone_weights: g.bone_weights.get(i).copied().unwrap_or(Vec4::ZERO),
            source_index: index,
        }
    };

    let mut faces = Vec::new();
    for &uid in mesh_uids {
        let mesh = model.mesh(uid).unwrap_or_else(|| unreachable!());
        for tri in mesh.indices.chunks_exact(3) {
            let vertex = [fetch(tri[0]), fetch(tri[1]), fetch(tri[2])];
            let non_unit_normal = (vertex[1].position - vertex[0].position)
                .cross(&(vertex[2].position - vertex[0].position));
            faces.push(Face {
                vertex,
                mesh: uid,
                unit_normal: non_unit_normal.direction_or_zero(),
                non_unit_normal,
            });
        }
    }
    faces
}

/// Adjacency by position only: two faces are neighbors when they share
/// a point in space, regardless of the other attributes at that point
fn build_adjacency(faces: &[Face]) -> HashMap<[u32; 3], SmallVec<[usize; 8]>> {
    let mut table: HashMap<[u32; 3], SmallVec<[usize; 8]>> = HashMap::new();
    for (i, face) in faces.iter().enumerate() {
        for v in &face.vertex {
            table.entry(position_key(v.position)).or_default().push(i);
        }
    }
    table
}

fn compute_missing_normals(faces: &mut [Face], max_smooth_angle: f32) {
    let adjacency = build_adjacency(faces);
    let cos_smooth = max_smooth_angle.cos();

    // Snapshot of geometric normals; the loop below rewrites vertex
    // normals but never face normals
    let face_normals: Vec<(Vec3, Vec3)> =
        faces.iter().map(|f| (f.non_unit_normal, f.unit_normal)).collect();

    for face in faces.iter_mut() {
        let own_unit = face.unit_normal;
        for v in &mut face.vertex {
            if !v.normal.is_undefined() {
                continue;
            }
            let neighbors = adjacency
                .get(&position_key(v.position))
                .map_or(&[][..], SmallVec::as_slice);

            let normal = if own_unit.is_zero() {
                // Degenerate face: average everything that touches
                // this point, weighted by face area
                let mut sum = Vec3::ZERO;
                for &n in neighbors {
                    sum += face_normals[n].0;
                }
                let dir = sum.direction_or_zero();
                if dir.is_zero() {
                    Vec3::UP
                } else {
                    dir
                }
            } else {
                let mut sum = Vec3::ZERO;
                for &n in neighbors {
                    if face_normals[n].1.dot(&own_unit) >= cos_smooth {
                        sum += face_normals[n].0;
                    }
                }
                let dir = sum.direction_or_zero();
                if dir.is_zero() {
                    // Every neighbor was outside the smoothing angle
                    own_unit
                } else {
                    dir
                }
            };
            v.normal = normal;
        }
    }
}

/// Rebuild the vertex array and every index list, reusing an output
/// vertex when the full attribute key matches and the normals agree
/// within the weld angle (a zero or undefined normal matches anything)
fn merge_vertices(
    model: &mut Model,
    geometry: GeometryId,
    mesh_uids: &[MeshUid],
    faces: &[Face],
    max_weld_angle: f32,
) {
    let cos_weld = max_weld_angle.cos();
    let had_tex0 = model.geometries[geometry].has_tex_coord0();
    let had_tex1 = !model.geometries[geometry].tex_coords1.is_empty();
    let had_color = !model.geometries[geometry].vertex_colors.is_empty();
    let had_bones = !model.geometries[geometry].bone_indices.is_empty();

    {
        let g = &mut model.geometries[geometry];
        g.positions.clear();
        g.normals.clear();
        g.tangents.clear();
        g.tex_coords0.clear();
        g.tex_coords1.clear();
        g.vertex_colors.clear();
        g.bone_indices.clear();
        g.bone_weights.clear();
    }

    let mut table: HashMap<Key, SmallVec<[u32; 4]>> = HashMap::new();
    let mut dropped_triangles = 0usize;

    for &uid in mesh_uids {
        let mut indices: Vec<u32> = Vec::new();

        for face in faces.iter().filter(|f| f.mesh == uid) {
            let mut out = [0u32; 3];
            for (slot, v) in out.iter_mut().zip(&face.vertex) {
                let candidates = table.entry(attribute_key(v)).or_default();
                let found = candidates.iter().copied().find(|&c| {
                    let existing = model.geometries[geometry].normals[c as usize];
                    if existing.is_undefined()
                        || existing.is_zero()
                        || v.normal.is_undefined()
                        || v.normal.is_zero()
                    {
                        return true;
                    }
                    existing.dot(&v.normal) >= cos_weld
                });
                *slot = match found {
                    Some(c) => c,
                    None => {
                        let g = &mut model.geometries[geometry];
                        let index = g.push_vertex(v.position, v.normal, v.tangent);
                        if had_tex0 {
                            g.tex_coords0.push(v.tex0);
                        }
                        if had_tex1 {
                            g.tex_coords1.push(v.tex1);
                        }
                        if had_color {
                            g.vertex_colors.push(v.color);
                        }
                        if had_bones {
                            g.bone_indices.push(v.bone_indices);
                            g.bone_weights.push(v.bone_weights);
                        }
                        candidates.push(index);
                        index
                    }
                };
            }

            if out[0] == out[1] || out[1] == out[2] || out[0] == out[2] {
                dropped_triangles += 1;
            } else {
                indices.extend_from_slice(&out);
            }
        }

        if let Some(mesh) = model.mesh_mut(uid) {
            mesh.indices = indices;
        }
    }

    if dropped_triangles > 0 {
        debug!(
            geometry = %model.geometries[geometry].name,
            dropped_triangles,
            "dropped degenerate triangles while welding"
        );
    }
}

/// Texture-space gradient tangents. Without texture coordinates there
/// is no texture space, so every tangent becomes zero.
fn compute_missing_tangents(model: &mut Model, geometry: GeometryId, mesh_uids: &[MeshUid]) {
    if !model.geometries[geometry].has_tex_coord0() {
        let g = &mut model.geometries[geometry];
        g.tangents.fill(Vec4::ZERO);
        return;
    }

    let n = model.geometries[geometry].len();
    let mut tan1 = vec![Vec3::ZERO; n];
    let mut tan2 = vec![Vec3::ZERO; n];

    for &uid in mesh_uids {
        let Some(mesh) = model.mesh(uid) else { continue };
        let g = &model.geometries[geometry];
        for tri in mesh.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let (p0, p1, p2) = (g.positions[i0], g.positions[i1], g.positions[i2]);
            let (w0, w1, w2) = (g.tex_coords0[i0], g.tex_coords0[i1], g.tex_coords0[i2]);

            let e1 = p1 - p0;
            let e2 = p2 - p0;
            let s0 = w1.x - w0.x;
            let s1 = w2.x - w0.x;
            let t0 = w1.y - w0.y;
            let t1 = w2.y - w0.y;

            let denom = s0 * t1 - s1 * t0;
            if denom == 0.0 {
                // Collapsed texture mapping carries no direction
                continue;
            }
            let r = 1.0 / denom;
            let sdir = (e1 * t1 - e2 * t0) * r;
            let tdir = (e2 * s0 - e1 * s1) * r;
            for &i in &[i0, i1, i2] {
                tan1[i] += sdir;
                tan2[i] += tdir;
            }
        }
    }

    let g = &mut model.geometries[geometry];
    for i in 0..n {
        if !g.tangents[i].is_undefined() {
            continue;
        }
        let normal = g.normals[i];
        let t = tan1[i];
        let mut tangent = (t - normal * normal.dot(&t)).direction_or_zero();
        if tangent.is_zero() {
            tangent = normal.arbitrary_perpendicular();
        }
        let w = if normal.cross(&t).dot(&tan2[i]) < 0.0 { 1.0 } else { -1.0 };
        g.tangents[i] = Vec4::from_vec3(tangent, w);
    }
}
