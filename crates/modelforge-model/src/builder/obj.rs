//! OBJ to canonical model
//!
//! OBJ faces index three independent attribute arrays, so vertices are
//! duplicated per face corner into one geometry; geometry cleaning
//! welds them back together afterwards.

use crate::material::Material;
use crate::model::Model;
use modelforge_core::error::Result;
use modelforge_core::math::{Vec2, Vec3, Vec4};
use modelforge_parsers::obj::ObjFile;
use tracing::warn;

/// Build the canonical model from a parsed OBJ file: one root part and
/// geometry, one mesh per (group, material) pair named
/// `"group/material"`.
pub fn build_obj(file: &ObjFile, name: &str) -> Result<Model> {
    let mut model = Model::new(name);
    let part = model.add_part("root", None);
    let geometry = model.add_geometry("root");
    let has_tex_coords = !file.tex_coords.is_empty();

    let mut warned_non_finite = false;

    for group in file.groups.values() {
        for source_mesh in group.meshes.values() {
            let material = match file.materials.get(&source_mesh.material) {
                Some(m) => model.get_or_insert_material(Material::from_mtl(m)),
                None => {
                    warn!(
                        material = %source_mesh.material,
                        group = %group.name,
                        "usemtl references an undefined material, using the default"
                    );
                    let m = Material::default_shared();
                    model.materials.entry(m.name.clone()).or_insert_with(|| m.clone());
                    m
                }
            };

            let mut indices: Vec<u32> = Vec::new();
            for face in &source_mesh.faces {
                let g = &mut model.geometries[geometry];
                let base = g.len() as u32;
                for corner in face {
                    let mut position = file.vertices[corner.vertex as usize];
                    if !position.is_finite() {
                        if !warned_non_finite {
                            warn!(group = %group.name, "non-finite vertex, replaced with zero");
                            warned_non_finite = true;
                        }
                        position = Vec3::ZERO;
                    }
                    let normal = if corner.normal >= 0 {
                        file.normals[corner.normal as usize]
                    } else {
                        Vec3::UNDEFINED
                    };
                    g.push_vertex(position, normal, Vec4::UNDEFINED);
                    if has_tex_coords {
                        // V is flipped relative to this pipeline
                        let tc = if corner.tex_coord >= 0 {
                            let t = file.tex_coords[corner.tex_coord as usize];
                            Vec2::new(t.x, 1.0 - t.y)
                        } else {
                            Vec2::ZERO
                        };
                        g.tex_coords0.push(tc);
                    }
                }
                for t in 2..face.len() as u32 {
                    indices.push(base);
                    indices.push(base + t - 1);
                    indices.push(base + t);
                }
            }

            let two_sided = material.has_partial_coverage();
            let uid = model.add_mesh(
                format!("{}/{}", group.name, source_mesh.material),
                part,
                geometry,
                material,
                indices,
            );
            if let Some(mesh) = model.mesh_mut(uid) {
                mesh.two_sided = two_sided;
            }
        }
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelforge_parsers::parse_obj;
    use std::path::Path;

    fn build(text: &str) -> Model {
        let file = parse_obj(text, Path::new(".")).unwrap();
        build_obj(&file, "m").unwrap()
    }

    #[test]
    fn test_vertices_duplicated_per_corner() {
        let model = build(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
             f 1 2 3\nf 2 4 3\n",
        );
        // Two triangles sharing an edge still produce six vertices
        assert_eq!(model.geometries[0].len(), 6);
        assert_eq!(model.meshes[0].indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_texcoord_v_flip() {
        let model = build(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vt 0 0.25\nvt 1 0.25\nvt 0 1\n\
             f 1/1 2/2 3/3\n",
        );
        let g = &model.geometries[0];
        assert!((g.tex_coords0[0].y - 0.75).abs() < 1e-6);
        assert!((g.tex_coords0[2].y - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_normal_is_sentinel() {
        let model = build(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vn 0 1 0\n\
             f 1//1 2 3\n",
        );
        let g = &model.geometries[0];
        assert_eq!(g.normals[0], Vec3::new(0.0, 1.0, 0.0));
        assert!(g.normals[1].is_undefined());
    }

    #[test]
    fn test_mesh_per_group_and_material() {
        let model = build(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             g wall\nusemtl a\nf 1 2 3\n\
             usemtl b\nf 1 2 3\n\
             g floor\nusemtl a\nf 1 2 3\n",
        );
        let mut names: Vec<&str> = model.meshes.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["floor/a", "wall/a", "wall/b"]);
    }

    #[test]
    fn test_quad_fan_tessellation() {
        let model = build("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");
        assert_eq!(model.meshes[0].indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(model.meshes[0].triangle_count(), 2);
    }

    #[test]
    fn test_undefined_material_uses_default() {
        let model = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl ghost\nf 1 2 3\n");
        assert_eq!(model.meshes[0].material.name, "default");
    }
}
