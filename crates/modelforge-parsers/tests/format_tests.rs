//! Cross-format parser tests
//!
//! These exercise the parsers the way the load pipeline uses them:
//! whole files in, structured results out. The OBJ tests use real
//! files on disk so `mtllib` resolution runs against the filesystem.

use modelforge_core::math::Vec3;
use modelforge_parsers::{parse_obj, parse_ply, ModelFormat};
use std::fs;
use std::path::Path;

#[test]
fn obj_with_material_library_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("crate.mtl"),
        "newmtl wood\nKd 0.6 0.4 0.2\nNs 12\n",
    )
    .unwrap();

    let obj = "mtllib crate.mtl\n\
               v 0 0 0\nv 1 0 0\nv 0 1 0\n\
               usemtl wood\n\
               f 1 2 3\n";
    let file = parse_obj(obj, dir.path()).unwrap();

    let wood = &file.materials["wood"];
    assert_eq!(wood.kd.constant, Vec3::new(0.6, 0.4, 0.2));
    assert_eq!(file.groups["default"].meshes["wood"].faces.len(), 1);
}

#[test]
fn obj_with_two_libraries_last_definition_wins() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.mtl"), "newmtl shared\nKd 1 0 0\n").unwrap();
    fs::write(dir.path().join("b.mtl"), "newmtl shared\nKd 0 0 1\n").unwrap();

    let obj = "mtllib a.mtl\nmtllib b.mtl\n\
               v 0 0 0\nv 1 0 0\nv 0 1 0\n\
               usemtl shared\nf 1 2 3\n";
    let file = parse_obj(obj, dir.path()).unwrap();
    assert_eq!(file.materials["shared"].kd.constant, Vec3::new(0.0, 0.0, 1.0));
}

#[test]
fn ply_vertex_table_is_property_ordered() {
    let mut data = b"ply\n\
        format binary_little_endian 1.0\n\
        element vertex 2\n\
        property float z\n\
        property float x\n\
        property float y\n\
        end_header\n"
        .to_vec();
    for v in [[3.0f32, 1.0, 2.0], [6.0, 4.0, 5.0]] {
        for c in v {
            data.extend_from_slice(&c.to_le_bytes());
        }
    }
    let file = parse_ply(&data).unwrap();
    // Properties keep file order, whatever it is
    assert_eq!(file.property_index("z"), Some(0));
    assert_eq!(file.property_index("x"), Some(1));
    let x = file.property_index("x").unwrap();
    assert_eq!(file.vertex(1)[x], 4.0);
}

#[test]
fn format_detection_matches_load_extensions() {
    for (name, format) in [
        ("model.3ds", Some(ModelFormat::Tds)),
        ("model.ply", Some(ModelFormat::Ply)),
        ("model.obj", Some(ModelFormat::Obj)),
        ("model.gltf", None),
    ] {
        assert_eq!(ModelFormat::from_path(Path::new(name)), format, "{name}");
    }
}
