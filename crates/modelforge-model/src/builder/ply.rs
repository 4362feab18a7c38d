//! PLY to canonical model

use crate::material::Material;
use crate::model::Model;
use modelforge_core::error::{Error, Result};
use modelforge_core::math::{Vec2, Vec3, Vec4};
use modelforge_parsers::ply::{PlyFile, PropertyType, ScalarType};
use tracing::debug;

/// Property indices resolved by conventional names
struct Layout {
    x: usize,
    y: usize,
    z: usize,
    normal: Option<[usize; 3]>,
    tex: Option<[usize; 2]>,
    color: Option<[usize; 3]>,
    alpha: Option<usize>,
    /// Color components need a /255 rescale when stored as integers
    color_is_byte: bool,
}

fn resolve_layout(file: &PlyFile) -> Result<Layout> {
    let find = |name: &str| file.property_index(name);

    let x = find("x").ok_or_else(|| Error::missing_field("x"))?;
    let y = find("y").ok_or_else(|| Error::missing_field("y"))?;
    let z = find("z").ok_or_else(|| Error::missing_field("z"))?;

    let normal = match (find("nx"), find("ny"), find("nz")) {
        (Some(nx), Some(ny), Some(nz)) => Some([nx, ny, nz]),
        _ => None,
    };

    let tex = match (find("u"), find("v")) {
        (Some(u), Some(v)) => Some([u, v]),
        _ => match (find("s"), find("t")) {
            (Some(s), Some(t)) => Some([s, t]),
            _ => None,
        },
    };

    let color = match (find("red"), find("green"), find("blue")) {
        (Some(r), Some(g), Some(b)) => Some([r, g, b]),
        _ => None,
    };
    let alpha = find("alpha");

    let color_is_byte = color.is_some_and(|[r, _, _]| {
        matches!(
            file.vertex_properties[r].ty,
            PropertyType::Scalar(
                ScalarType::Char
                    | ScalarType::UChar
                    | ScalarType::Short
                    | ScalarType::UShort
                    | ScalarType::Int
                    | ScalarType::UInt
            )
        )
    });

    let known: Vec<usize> = [x, y, z]
        .into_iter()
        .chain(normal.into_iter().flatten())
        .chain(tex.into_iter().flatten())
        .chain(color.into_iter().flatten())
        .chain(alpha)
        .collect();
    for (i, p) in file.vertex_properties.iter().enumerate() {
        if !known.contains(&i) {
            debug!(property = %p.name, "ignoring unmapped vertex property");
        }
    }

    Ok(Layout { x, y, z, normal, tex, color, alpha, color_is_byte })
}

/// Build the canonical model from a parsed PLY file: one root part,
/// one geometry, one mesh with the default material.
pub fn build_ply(file: &PlyFile, name: &str) -> Result<Model> {
    let layout = resolve_layout(file)?;

    let mut model = Model::new(name);
    let part = model.add_part("root", None);
    let geometry = model.add_geometry("root");

    {
        let g = &mut model.geometries[geometry];
        for i in 0..file.num_vertices {
            let row = file.vertex(i);
            let normal = match layout.normal {
                Some([nx, ny, nz]) => Vec3::new(row[nx], row[ny], row[nz]),
                None => Vec3::UNDEFINED,
            };
            g.push_vertex(Vec3::new(row[layout.x], row[layout.y], row[layout.z]), normal, Vec4::UNDEFINED);

            if let Some([u, v]) = layout.tex {
                g.tex_coords0.push(Vec2::new(row[u], row[v]));
            }
            if let Some([r, gr, b]) = layout.color {
                let scale = if layout.color_is_byte { 1.0 / 255.0 } else { 1.0 };
                let a = layout.alpha.map_or(1.0, |a| row[a] * scale);
                g.vertex_colors.push(Vec4::new(
                    row[r] * scale,
                    row[gr] * scale,
                    row[b] * scale,
                    a,
                ));
            }
        }
    }

    let mut indices: Vec<u32> = Vec::new();
    for face in &file.faces {
        if let Some(&bad) = face.iter().find(|&&i| i as usize >= file.num_vertices) {
            return Err(Error::invalid_data(format!("face index {bad} out of range")));
        }
        for t in 2..face.len() {
            indices.push(face[0]);
            indices.push(face[t - 1]);
            indices.push(face[t]);
        }
    }

    for strip in &file.tristrips {
        emit_tristrip(strip, file.num_vertices, &mut indices)?;
    }

    let material = Material::default_shared();
    model.materials.entry(material.name.clone()).or_insert_with(|| material.clone());
    model.add_mesh("mesh", part, geometry, material, indices);

    Ok(model)
}

/// Expand one triangle strip into independent triangles. The winding
/// alternates each step and resets after every -1 restart.
fn emit_tristrip(strip: &[i32], num_vertices: usize, indices: &mut Vec<u32>) -> Result<()> {
    let mut window: [u32; 2] = [0, 0];
    let mut filled = 0usize;
    let mut flip = false;

    for &raw in strip {
        if raw < 0 {
            filled = 0;
            flip = false;
            continue;
        }
        let i = raw as usize;
        if i >= num_vertices {
            return Err(Error::invalid_data(format!("tristrip index {i} out of range")));
        }
        let i = i as u32;
        if filled < 2 {
            window[filled] = i;
            filled += 1;
            continue;
        }
        let (a, b) = (window[0], window[1]);
        if flip {
            indices.extend_from_slice(&[b, a, i]);
        } else {
            indices.extend_from_slice(&[a, b, i]);
        }
        flip = !flip;
        window = [b, i];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelforge_parsers::ply::{Property, PropertyType, ScalarType};

    fn make_ply(
        names: &[(&str, ScalarType)],
        rows: &[&[f32]],
        faces: Vec<Vec<u32>>,
        tristrips: Vec<Vec<i32>>,
    ) -> PlyFile {
        PlyFile {
            big_endian: false,
            vertex_properties: names
                .iter()
                .map(|(n, t)| Property {
                    name: (*n).to_string(),
                    ty: PropertyType::Scalar(*t),
                })
                .collect(),
            num_vertices: rows.len(),
            vertex_data: rows.iter().flat_map(|r| r.iter().copied()).collect(),
            faces,
            tristrips,
        }
    }

    const F: ScalarType = ScalarType::Float;

    #[test]
    fn test_positions_and_normals() {
        let file = make_ply(
            &[("x", F), ("y", F), ("z", F), ("nx", F), ("ny", F), ("nz", F)],
            &[
                &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                &[0.0, 0.0, 1.0, 0.0, 1.0, 0.0],
            ],
            vec![vec![0, 1, 2]],
            Vec::new(),
        );
        let model = build_ply(&file, "m").unwrap();
        let g = &model.geometries[0];
        assert_eq!(g.len(), 3);
        assert_eq!(g.normals[1], Vec3::UP);
        assert_eq!(model.meshes[0].indices, vec![0, 1, 2]);
        assert_eq!(model.meshes[0].material.name, "default");
    }

    #[test]
    fn test_missing_position_property() {
        let file = make_ply(&[("x", F), ("y", F)], &[], Vec::new(), Vec::new());
        assert!(matches!(
            build_ply(&file, "m").unwrap_err(),
            Error::MissingField { .. }
        ));
    }

    #[test]
    fn test_quad_fan_triangulation() {
        let file = make_ply(
            &[("x", F), ("y", F), ("z", F)],
            &[&[0.0; 3], &[1.0, 0.0, 0.0], &[1.0, 1.0, 0.0], &[0.0, 1.0, 0.0]],
            vec![vec![0, 1, 2, 3]],
            Vec::new(),
        );
        let model = build_ply(&file, "m").unwrap();
        assert_eq!(model.meshes[0].indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_tristrip_alternation_and_restart() {
        let file = make_ply(
            &[("x", F), ("y", F), ("z", F)],
            &[&[0.0; 3][..]; 5],
            Vec::new(),
            vec![vec![0, 1, 2, 3, -1, 2, 3, 4]],
        );
        let model = build_ply(&file, "m").unwrap();
        // First segment: (0,1,2) then flipped (2,1,3); second resets
        assert_eq!(
            model.meshes[0].indices,
            vec![0, 1, 2, 2, 1, 3, 2, 3, 4]
        );
    }

    #[test]
    fn test_byte_colors_rescaled() {
        let file = make_ply(
            &[
                ("x", F),
                ("y", F),
                ("z", F),
                ("red", ScalarType::UChar),
                ("green", ScalarType::UChar),
                ("blue", ScalarType::UChar),
            ],
            &[&[0.0, 0.0, 0.0, 255.0, 0.0, 51.0]],
            Vec::new(),
            Vec::new(),
        );
        let model = build_ply(&file, "m").unwrap();
        let c = model.geometries[0].vertex_colors[0];
        assert!((c.x - 1.0).abs() < 1e-6);
        assert!((c.z - 0.2).abs() < 1e-6);
        assert_eq!(c.w, 1.0);
    }

    #[test]
    fn test_tristrip_index_out_of_range() {
        let file = make_ply(
            &[("x", F), ("y", F), ("z", F)],
            &[&[0.0; 3][..]; 2],
            Vec::new(),
            vec![vec![0, 1, 5]],
        );
        assert!(build_ply(&file, "m").is_err());
    }
}
