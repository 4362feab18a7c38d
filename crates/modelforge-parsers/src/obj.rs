//! Wavefront OBJ parser
//!
//! Scans the raw byte buffer directly instead of splitting into lines:
//! commands are recognized by literal prefix, and the numeric readers
//! work on the byte span in place without allocating. Produces the
//! file's raw structure: shared attribute arrays plus faces bucketed by
//! group and material. Faces are kept untessellated; triangulation
//! happens when the canonical model is built. Relative indices are
//! resolved against the array sizes at the point of use, which is the
//! only meaning they have in this format.
//!
//! A `#` starts a comment only at the beginning of a line; the
//! character is legal inside group and material names.
//!
//! `mtllib` references are resolved against the directory of the OBJ
//! file. A missing library is a warning, not an error; referenced
//! materials then fall back to the default.

use crate::cursor::Cursor;
use crate::mtl::{parse_mtl, MtlLibrary, MtlMaterial};
use modelforge_core::error::{Error, Result};
use modelforge_core::math::{Vec2, Vec3};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Attribute indices for one face vertex, resolved to 0-based.
/// -1 marks an absent optional attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjIndex {
    /// Position index
    pub vertex: i32,
    /// Texture coordinate index, -1 when absent
    pub tex_coord: i32,
    /// Normal index, -1 when absent
    pub normal: i32,
}

/// Faces in one group that share a material
#[derive(Debug, Clone, Default)]
pub struct ObjMesh {
    /// Name of the material these faces use
    pub material: String,
    /// Faces as read, three or more corners each
    pub faces: Vec<SmallVec<[ObjIndex; 4]>>,
}

/// A named `g` group
#[derive(Debug, Clone, Default)]
pub struct ObjGroup {
    /// Group name
    pub name: String,
    /// Meshes keyed by material name
    pub meshes: BTreeMap<String, ObjMesh>,
}

/// Complete parse result for one .obj file
#[derive(Debug, Clone, Default)]
pub struct ObjFile {
    /// Shared vertex positions
    pub vertices: Vec<Vec3>,
    /// Shared texture coordinates
    pub tex_coords: Vec<Vec2>,
    /// Shared normals
    pub normals: Vec<Vec3>,
    /// Groups keyed by name
    pub groups: BTreeMap<String, ObjGroup>,
    /// Materials merged from every `mtllib` line
    pub materials: MtlLibrary,
}

impl ObjFile {
    /// Total face count across all groups
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.groups
            .values()
            .flat_map(|g| g.meshes.values())
            .map(|m| m.faces.len())
            .sum()
    }
}

/// Parse an .obj file, loading material libraries from `base_path`
pub fn parse_obj(text: &str, base_path: &Path) -> Result<ObjFile> {
    let mut file = ObjFile::default();
    file.materials.insert("default".to_string(), MtlMaterial::default());

    let mut current_group = "default".to_string();
    let mut current_material = "default".to_string();
    let mut scanner = Scanner::new(text.as_bytes());

    loop {
        scanner.skip_blanks();
        match scanner.peek() {
            None => break,
            Some(b'\n') => {
                scanner.newline();
                continue;
            }
            Some(b'#') => {
                scanner.skip_line();
                continue;
            }
            Some(_) => {}
        }

        match std::str::from_utf8(scanner.keyword()).unwrap_or("") {
            "v" => {
                let v = scanner.vec3()?;
                file.vertices.push(v);
                // A fourth (w) coordinate is legal and ignored
                scanner.skip_line();
            }
            "vn" => {
                let n = scanner.vec3()?;
                file.normals.push(n);
                scanner.skip_line();
            }
            "vt" => {
                let x = scanner.number()?;
                let y = scanner.number()?;
                file.tex_coords.push(Vec2::new(x, y));
                // A third (w) coordinate is legal and ignored
                scanner.skip_line();
            }
            "f" => {
                let face = scanner.face(&file)?;
                let group = file
                    .groups
                    .entry(current_group.clone())
                    .or_insert_with(|| ObjGroup {
                        name: current_group.clone(),
                        meshes: BTreeMap::new(),
                    });
                let mesh = group
                    .meshes
                    .entry(current_material.clone())
                    .or_insert_with(|| ObjMesh {
                        material: current_material.clone(),
                        faces: Vec::new(),
                    });
                mesh.faces.push(face);
                scanner.skip_line();
            }
            "g" => {
                let name = scanner.rest_of_line();
                current_group = if name.is_empty() { "default" } else { name }.to_string();
            }
            "usemtl" => {
                let name = scanner.rest_of_line();
                current_material = if name.is_empty() { "default" } else { name }.to_string();
            }
            "mtllib" => {
                for lib in scanner.rest_of_line().split_whitespace() {
                    load_material_library(&mut file.materials, base_path, lib);
                }
            }
            // Object names and smoothing groups carry no geometry
            _ => scanner.skip_line(),
        }
    }

    Ok(file)
}

/// Byte-buffer scanner with line tracking for error reports
struct Scanner<'a> {
    cursor: Cursor<'a>,
    line: u32,
}

impl<'a> Scanner<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(data), line: 1 }
    }

    fn peek(&self) -> Option<u8> {
        self.cursor.peek()
    }

    fn bad(&self, what: &str) -> Error {
        Error::invalid_data(format!("line {}: {what}", self.line))
    }

    /// Consume spaces, tabs, and carriage returns
    fn skip_blanks(&mut self) {
        self.cursor.take_while(|b| b == b' ' || b == b'\t' || b == b'\r');
    }

    /// Consume the rest of the current line, newline included
    fn skip_line(&mut self) {
        self.cursor.take_while(|b| b != b'\n');
        self.newline();
    }

    /// Consume one `\n` if present
    fn newline(&mut self) {
        if self.cursor.peek() == Some(b'\n') {
            self.cursor.advance();
            self.line += 1;
        }
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'\n'))
    }

    /// The command word at the cursor
    fn keyword(&mut self) -> &'a [u8] {
        self.cursor.take_while(|b| !b.is_ascii_whitespace())
    }

    /// The remainder of the line, trimmed, newline consumed.
    /// The buffer comes from a `&str`, so the span is valid UTF-8.
    fn rest_of_line(&mut self) -> &'a str {
        let bytes = self.cursor.take_while(|b| b != b'\n');
        self.newline();
        std::str::from_utf8(bytes).unwrap_or("").trim()
    }

    /// A signed integer at the cursor, no leading whitespace allowed
    fn integer(&mut self) -> Result<i64> {
        let negative = match self.peek() {
            Some(b'-') => {
                self.cursor.advance();
                true
            }
            Some(b'+') => {
                self.cursor.advance();
                false
            }
            _ => false,
        };
        let digits = self.cursor.take_while(|b| b.is_ascii_digit());
        if digits.is_empty() {
            return Err(self.bad("expected an integer"));
        }
        let mut value: i64 = 0;
        for &d in digits {
            value = value
                .saturating_mul(10)
                .saturating_add(i64::from(d - b'0'));
        }
        Ok(if negative { -value } else { value })
    }

    /// A float at the cursor, skipping leading blanks. Accepts sign,
    /// fraction, and exponent forms without allocating.
    fn number(&mut self) -> Result<f32> {
        self.skip_blanks();
        let negative = match self.peek() {
            Some(b'-') => {
                self.cursor.advance();
                true
            }
            Some(b'+') => {
                self.cursor.advance();
                false
            }
            _ => false,
        };

        let mut mantissa: f64 = 0.0;
        let int_digits = self.cursor.take_while(|b| b.is_ascii_digit());
        for &d in int_digits {
            mantissa = mantissa * 10.0 + f64::from(d - b'0');
        }

        let mut scale: i32 = 0;
        let mut frac_digits: &[u8] = &[];
        if self.peek() == Some(b'.') {
            self.cursor.advance();
            frac_digits = self.cursor.take_while(|b| b.is_ascii_digit());
            for &d in frac_digits {
                mantissa = mantissa * 10.0 + f64::from(d - b'0');
                scale -= 1;
            }
        }
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(self.bad("expected a number"));
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.cursor.advance();
            let exponent = self.integer()?;
            scale = scale.saturating_add(exponent.clamp(-1000, 1000) as i32);
        }

        let value = mantissa * 10f64.powi(scale);
        Ok(if negative { -value as f32 } else { value as f32 })
    }

    fn vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.number()?, self.number()?, self.number()?))
    }

    /// The corners of one `f` line
    fn face(&mut self, file: &ObjFile) -> Result<SmallVec<[ObjIndex; 4]>> {
        let mut face: SmallVec<[ObjIndex; 4]> = SmallVec::new();
        loop {
            self.skip_blanks();
            if self.at_line_end() {
                break;
            }
            face.push(self.corner(file)?);
        }
        if face.len() < 3 {
            return Err(self.bad("face with fewer than 3 corners"));
        }
        Ok(face)
    }

    /// One `v`, `v/vt`, `v//vn`, or `v/vt/vn` corner
    fn corner(&mut self, file: &ObjFile) -> Result<ObjIndex> {
        let raw = self.integer()?;
        let vertex = self.resolve(raw, file.vertices.len())?;

        let mut tex_coord = -1;
        let mut normal = -1;
        if self.peek() == Some(b'/') {
            self.cursor.advance();
            if self.at_index() {
                let raw = self.integer()?;
                tex_coord = self.resolve(raw, file.tex_coords.len())?;
            }
            if self.peek() == Some(b'/') {
                self.cursor.advance();
                if self.at_index() {
                    let raw = self.integer()?;
                    normal = self.resolve(raw, file.normals.len())?;
                }
            }
        }

        match self.peek() {
            None | Some(b'\n') => {}
            Some(b) if b.is_ascii_whitespace() => {}
            Some(_) => return Err(self.bad("bad face corner")),
        }
        Ok(ObjIndex { vertex, tex_coord, normal })
    }

    fn at_index(&self) -> bool {
        matches!(self.peek(), Some(b) if b == b'-' || b == b'+' || b.is_ascii_digit())
    }

    /// Resolve a 1-based or negative relative index against the
    /// current array size
    fn resolve(&self, raw: i64, count: usize) -> Result<i32> {
        if raw > 0 {
            if raw as u64 > count as u64 {
                return Err(self.bad("index past the array"));
            }
            Ok((raw - 1) as i32)
        } else if raw < 0 {
            let resolved = count as i64 + raw;
            if resolved < 0 {
                return Err(self.bad("relative index out of range"));
            }
            Ok(resolved as i32)
        } else {
            Err(self.bad("zero index in face"))
        }
    }
}

fn load_material_library(materials: &mut MtlLibrary, base_path: &Path, lib: &str) {
    let path = base_path.join(lib);
    match std::fs::read_to_string(&path) {
        Ok(text) => match parse_mtl(&text) {
            Ok(parsed) => {
                // Later libraries override earlier definitions
                materials.extend(parsed);
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to parse material library");
            }
        },
        Err(error) => {
            warn!(path = %path.display(), %error, "material library not found, using defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ObjFile {
        parse_obj(text, Path::new(".")).unwrap()
    }

    #[test]
    fn test_triangle_with_full_corners() {
        let file = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vt 0 0\nvt 1 0\nvt 0 1\n\
             vn 0 0 1\n\
             f 1/1/1 2/2/1 3/3/1\n",
        );
        assert_eq!(file.vertices.len(), 3);
        assert_eq!(file.face_count(), 1);
        let mesh = &file.groups["default"].meshes["default"];
        assert_eq!(mesh.faces[0][1], ObjIndex { vertex: 1, tex_coord: 1, normal: 0 });
    }

    #[test]
    fn test_negative_indices() {
        let file = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             f -3 -2 -1\n",
        );
        let mesh = &file.groups["default"].meshes["default"];
        let face = &mesh.faces[0];
        assert_eq!(face[0].vertex, 0);
        assert_eq!(face[1].vertex, 1);
        assert_eq!(face[2].vertex, 2);
    }

    #[test]
    fn test_missing_texcoord_slot() {
        let file = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vn 0 0 1\n\
             f 1//1 2//1 3//1\n",
        );
        let face = &file.groups["default"].meshes["default"].faces[0];
        assert_eq!(face[0].tex_coord, -1);
        assert_eq!(face[0].normal, 0);
    }

    #[test]
    fn test_groups_and_materials() {
        let file = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
             g wall\n\
             usemtl brick\n\
             f 1 2 3\n\
             usemtl plaster\n\
             f 2 4 3\n\
             g floor\n\
             f 1 3 4\n",
        );
        assert_eq!(file.groups.len(), 2);
        let wall = &file.groups["wall"];
        assert_eq!(wall.meshes.len(), 2);
        assert_eq!(wall.meshes["brick"].faces.len(), 1);
        assert_eq!(wall.meshes["plaster"].faces.len(), 1);
        // usemtl persists across group changes
        assert_eq!(file.groups["floor"].meshes["plaster"].faces.len(), 1);
    }

    #[test]
    fn test_quad_kept_untessellated() {
        let file = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");
        let face = &file.groups["default"].meshes["default"].faces[0];
        assert_eq!(face.len(), 4);
    }

    #[test]
    fn test_zero_index_rejected() {
        let result = parse_obj("v 0 0 0\nf 0 1 1\n", Path::new("."));
        assert!(result.is_err());
    }

    #[test]
    fn test_index_past_array_rejected() {
        let result = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n", Path::new("."));
        assert!(result.is_err());
    }

    #[test]
    fn test_numeric_forms() {
        let file = parse("v 1.5e1 -.25 +3\nv 0 0 0\nv 0 0 0\nf 1 2 3\n");
        let v = file.vertices[0];
        assert!((v.x - 15.0).abs() < 1e-6);
        assert!((v.y + 0.25).abs() < 1e-6);
        assert!((v.z - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_vertex_w_coordinate_ignored() {
        let file = parse("v 0 0 0 1.0\nv 1 0 0 1.0\nv 0 1 0 1.0\nf 1 2 3\n");
        assert_eq!(file.vertices.len(), 3);
        assert_eq!(file.face_count(), 1);
    }

    #[test]
    fn test_comments_only_at_line_start() {
        let file = parse(
            "# header comment\n\
             v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             usemtl brick#2\n\
             g room#main\n\
             f 1 2 3\n",
        );
        // A hash inside a name is part of the name
        assert!(file.groups.contains_key("room#main"));
        assert!(file.groups["room#main"].meshes.contains_key("brick#2"));
    }

    #[test]
    fn test_error_reports_line_number() {
        let err = parse_obj("v 0 0 0\n\nv oops\n", Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn test_missing_mtllib_is_not_fatal() {
        let file = parse("mtllib does_not_exist.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        assert!(file.materials.contains_key("default"));
        assert_eq!(file.face_count(), 1);
    }

    #[test]
    fn test_crlf_line_endings() {
        let file = parse("v 0 0 0\r\nv 1 0 0\r\nv 0 1 0\r\nf 1 2 3\r\n");
        assert_eq!(file.vertices.len(), 3);
        assert_eq!(file.face_count(), 1);
    }
}
