//! 3DS to canonical model

use crate::material::Material;
use crate::model::Model;
use modelforge_core::error::Result;
use modelforge_core::math::{Vec3, Vec4};
use modelforge_parsers::tds::TdsFile;
use tracing::warn;

/// Build the canonical model from a parsed 3DS file.
///
/// Each object becomes a root part with one geometry. The keyframe
/// matrix supplies the part frame; since the file stores vertices with
/// that transform already applied, they are multiplied by the frame's
/// inverse to express them in part space.
pub fn build_tds(file: &TdsFile, name: &str) -> Result<Model> {
    let mut model = Model::new(name);

    for object in &file.objects {
        let part = model.add_part(&object.name, None);
        let cframe = object.keyframe.approx_coordinate_frame();
        model.parts[part].cframe = cframe;
        let to_part = cframe.inverse();

        let geometry_name = model.parts[part].name.clone();
        let geometry = model.add_geometry(&geometry_name);
        {
            let g = &mut model.geometries[geometry];
            for &v in &object.vertices {
                g.push_vertex(to_part.transform_point(&v), Vec3::UNDEFINED, Vec4::UNDEFINED);
            }
            g.tex_coords0 = object.tex_coords.clone();
        }

        let vertex_count = object.vertices.len() as u32;
        let tri_in_range = |tri: &[u32]| tri.iter().all(|&i| i < vertex_count);
        let dropped = object
            .indices
            .chunks_exact(3)
            .filter(|tri| !tri_in_range(tri))
            .count();
        if dropped > 0 {
            warn!(
                object = %object.name,
                dropped,
                "dropping faces that reference vertices past the vertex list"
            );
        }

        if object.face_mats.is_empty() {
            let material = Material::default_shared();
            model.materials.entry(material.name.clone()).or_insert_with(|| material.clone());
            let indices: Vec<u32> = object
                .indices
                .chunks_exact(3)
                .filter(|tri| tri_in_range(tri))
                .flatten()
                .copied()
                .collect();
            model.add_mesh("mesh", part, geometry, material, indices);
        } else {
            for face_mat in &object.face_mats {
                if face_mat.face_indices.is_empty() {
                    continue;
                }

                let material = match file.material(&face_mat.material_name) {
                    Some(source) => model.get_or_insert_material(Material::from_tds(source)),
                    None => {
                        warn!(
                            material = %face_mat.material_name,
                            object = %object.name,
                            "face references an undefined material, using the default"
                        );
                        let m = Material::default_shared();
                        model.materials.entry(m.name.clone()).or_insert_with(|| m.clone());
                        m
                    }
                };

                let face_count = object.indices.len() / 3;
                let mut indices = Vec::with_capacity(face_mat.face_indices.len() * 3);
                for &face in &face_mat.face_indices {
                    if usize::from(face) >= face_count {
                        warn!(
                            object = %object.name,
                            face,
                            "face-material entry references a face past the face list"
                        );
                        continue;
                    }
                    let base = usize::from(face) * 3;
                    let tri = &object.indices[base..base + 3];
                    if tri_in_range(tri) {
                        indices.extend_from_slice(tri);
                    }
                }

                let source = file.material(&face_mat.material_name);
                let two_sided = source.is_some_and(|m| m.two_sided || m.transparency > 0.0);

                let uid = model.add_mesh(
                    face_mat.material_name.clone(),
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
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelforge_core::math::{CoordinateFrame, Mat4};
    use modelforge_parsers::tds::{TdsFaceMat, TdsMaterial, TdsObject};

    fn one_object(face_mats: Vec<TdsFaceMat>) -> TdsObject {
        TdsObject {
            name: "box".to_string(),
            vertices: vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            indices: vec![0, 1, 2],
            face_mats,
            ..TdsObject::default()
        }
    }

    #[test]
    fn test_no_face_materials_single_mesh() {
        let file = TdsFile {
            objects: vec![one_object(Vec::new())],
            ..TdsFile::default()
        };
        let model = build_tds(&file, "m").unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.meshes[0].name, "mesh");
        assert_eq!(model.meshes[0].indices, vec![0, 1, 2]);
        assert!(model.geometries[0].normals[0].is_undefined());
    }

    #[test]
    fn test_keyframe_inverse_applied() {
        let mut object = one_object(Vec::new());
        object.keyframe = Mat4::from(CoordinateFrame {
            rotation: modelforge_core::math::Mat3::IDENTITY,
            translation: Vec3::new(5.0, 0.0, 0.0),
        });
        let file = TdsFile { objects: vec![object], ..TdsFile::default() };
        let model = build_tds(&file, "m").unwrap();
        // Part frame carries the translation, vertices lose it
        assert_eq!(model.parts[0].cframe.translation, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(model.geometries[0].positions[0], Vec3::new(-5.0, 0.0, 0.0));
    }

    #[test]
    fn test_unknown_material_falls_back() {
        let face_mats = vec![TdsFaceMat {
            material_name: "missing".to_string(),
            face_indices: vec![0],
        }];
        let file = TdsFile {
            objects: vec![one_object(face_mats)],
            ..TdsFile::default()
        };
        let model = build_tds(&file, "m").unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.meshes[0].material.name, "default");
    }

    #[test]
    fn test_transparent_material_is_two_sided() {
        let mut material = TdsMaterial::default();
        material.name = "glass".to_string();
        material.transparency = 0.5;
        let face_mats = vec![TdsFaceMat {
            material_name: "glass".to_string(),
            face_indices: vec![0],
        }];
        let file = TdsFile {
            objects: vec![one_object(face_mats)],
            materials: vec![material],
            ..TdsFile::default()
        };
        let model = build_tds(&file, "m").unwrap();
        assert!(model.meshes[0].two_sided);
    }

    #[test]
    fn test_empty_face_material_skipped() {
        let face_mats = vec![TdsFaceMat {
            material_name: "unused".to_string(),
            face_indices: Vec::new(),
        }];
        let file = TdsFile {
            objects: vec![one_object(face_mats)],
            ..TdsFile::default()
        };
        let model = build_tds(&file, "m").unwrap();
        assert!(model.meshes.is_empty());
    }
}
