//! Autodesk 3D Studio (.3ds) parser
//!
//! Walks the chunk tree and extracts geometry, materials, and the
//! single-frame keyframe transform per object. Unknown chunks are
//! skipped by declared length.
//!
//! Coordinate handling: file vectors `(f0, f1, f2)` become
//! `(-f0, f2, f1)`, a Y-up right-handed frame. Texture V is flipped.

use crate::chunk::{ChunkHeader, ChunkId};
use crate::cursor::Cursor;
use modelforge_core::error::{Error, Result};
use modelforge_core::math::{CoordinateFrame, Mat3, Mat4, Vec2, Vec3};
use tracing::warn;

/// A texture map slot on a 3DS material
#[derive(Debug, Clone, PartialEq)]
pub struct TdsMap {
    /// Referenced texture file, if any
    pub filename: Option<String>,
    /// Blend strength in [0, 1]
    pub pct: f32,
    /// UV tiling scale
    pub scale: Vec2,
    /// UV offset
    pub offset: Vec2,
    /// Raw tiling flags
    pub flags: u16,
}

impl Default for TdsMap {
    fn default() -> Self {
        Self {
            filename: None,
            pct: 1.0,
            scale: Vec2::ONE,
            offset: Vec2::ZERO,
            flags: 0,
        }
    }
}

/// A material definition from the EDITMATERIAL chunk
#[derive(Debug, Clone, PartialEq)]
pub struct TdsMaterial {
    /// Material name
    pub name: String,
    /// Render both faces of each triangle
    pub two_sided: bool,
    /// Diffuse color
    pub diffuse: Vec3,
    /// Specular color
    pub specular: Vec3,
    /// Shininess in [0, 1]
    pub shininess: f32,
    /// Shininess strength in [0, 1]
    pub shininess_strength: f32,
    /// Transparency in [0, 1]
    pub transparency: f32,
    /// Self-illumination in [0, 1]
    pub emissive: f32,
    /// Reflection strength in [0, 1]
    pub reflection: f32,
    /// Primary texture map
    pub texture1: TdsMap,
    /// Secondary texture map
    pub texture2: TdsMap,
    /// Bump map
    pub bump_map: TdsMap,
}

impl Default for TdsMaterial {
    fn default() -> Self {
        Self {
            name: String::new(),
            two_sided: false,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            shininess: 0.8,
            shininess_strength: 0.25,
            transparency: 0.0,
            emissive: 0.0,
            reflection: 0.0,
            texture1: TdsMap::default(),
            texture2: TdsMap::default(),
            bump_map: TdsMap::default(),
        }
    }
}

/// Face indices assigned to one material within an object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TdsFaceMat {
    /// Name of the referenced material
    pub material_name: String,
    /// Triangle indices into the object's face list
    pub face_indices: Vec<u16>,
}

/// One named object (triangle mesh) from the file
#[derive(Debug, Clone)]
pub struct TdsObject {
    /// Object name from the EDITOBJECT chunk
    pub name: String,
    /// Vertex positions (already in world space)
    pub vertices: Vec<Vec3>,
    /// Flat triangle index list, three entries per face
    pub indices: Vec<u32>,
    /// Texture coordinates, one per vertex when present
    pub tex_coords: Vec<Vec2>,
    /// Per-material face subsets
    pub face_mats: Vec<TdsFaceMat>,
    /// Object-to-world matrix as stored (already applied to vertices)
    pub cframe: Mat4,
    /// Single-frame keyframe transform
    pub keyframe: Mat4,
    /// Parent index from the keyframer, -1 for roots
    pub hierarchy_index: i32,
    /// Keyframer node id, -1 when absent
    pub node_id: i32,
}

impl Default for TdsObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            tex_coords: Vec::new(),
            face_mats: Vec::new(),
            cframe: Mat4::IDENTITY,
            keyframe: Mat4::IDENTITY,
            hierarchy_index: -1,
            node_id: -1,
        }
    }
}

/// Complete parse result for one .3ds file
#[derive(Debug, Clone, Default)]
pub struct TdsFile {
    /// File format version (always 3)
    pub file_version: u16,
    /// Editor mesh version, recorded but not enforced
    pub mesh_version: u32,
    /// All objects in file order
    pub objects: Vec<TdsObject>,
    /// All materials in file order
    pub materials: Vec<TdsMaterial>,
    /// First animation frame
    pub start_frame: u32,
    /// Last animation frame
    pub end_frame: u32,
}

impl TdsFile {
    /// Look up a material by name
    #[must_use]
    pub fn material(&self, name: &str) -> Option<&TdsMaterial> {
        self.materials.iter().find(|m| m.name == name)
    }
}

/// Parse a complete .3ds file from memory
pub fn parse_tds(data: &[u8]) -> Result<TdsFile> {
    let mut parser = Parser {
        cursor: Cursor::new(data),
        file: TdsFile::default(),
        current_object: None,
        current_rotation: Mat3::IDENTITY,
        current_scale: Vec3::ONE,
        current_translation: Vec3::ZERO,
        current_pivot: Vec3::ZERO,
    };
    parser.parse()?;
    Ok(parser.file)
}

struct Parser<'a> {
    cursor: Cursor<'a>,
    file: TdsFile,
    current_object: Option<usize>,
    current_rotation: Mat3,
    current_scale: Vec3,
    current_translation: Vec3,
    current_pivot: Vec3,
}

impl Parser<'_> {
    fn parse(&mut self) -> Result<()> {
        let header = ChunkHeader::read(&mut self.cursor)?;
        if header.kind() != Some(ChunkId::Main) {
            return Err(Error::InvalidMagic {
                expected: "0x4D4D".to_string(),
                found: format!("0x{:04X}", header.id),
            });
        }
        self.process_chunk(&header)?;
        self.cursor.seek(header.end)
    }

    /// Read a file vector as `(-f0, f2, f1)`
    fn read_vector(&mut self) -> Result<Vec3> {
        let f0 = self.cursor.read_f32()?;
        let f1 = self.cursor.read_f32()?;
        let f2 = self.cursor.read_f32()?;
        Ok(Vec3::new(-f0, f2, f1))
    }

    /// Read a color payload chunk (float or byte RGB)
    fn read_color(&mut self) -> Result<Vec3> {
        let header = ChunkHeader::read(&mut self.cursor)?;
        let color = match header.kind() {
            Some(ChunkId::ColorFloat) => Vec3::new(
                self.cursor.read_f32()?,
                self.cursor.read_f32()?,
                self.cursor.read_f32()?,
            ),
            Some(ChunkId::ColorByte) => Vec3::new(
                f32::from(self.cursor.read_u8()?) / 255.0,
                f32::from(self.cursor.read_u8()?) / 255.0,
                f32::from(self.cursor.read_u8()?) / 255.0,
            ),
            _ => {
                return Err(Error::invalid_data(format!(
                    "expected a color chunk, found 0x{:04X}",
                    header.id
                )))
            }
        };
        self.cursor.seek(header.end)?;
        Ok(color)
    }

    /// Read a percentage payload chunk (u16/100 or raw float)
    fn read_pct(&mut self) -> Result<f32> {
        let header = ChunkHeader::read(&mut self.cursor)?;
        let pct = match header.kind() {
            Some(ChunkId::IntPercent) => f32::from(self.cursor.read_u16()?) / 100.0,
            Some(ChunkId::FloatPercent) => self.cursor.read_f32()?,
            _ => {
                return Err(Error::invalid_data(format!(
                    "expected a percent chunk, found 0x{:04X}",
                    header.id
                )))
            }
        };
        self.cursor.seek(header.end)?;
        Ok(pct)
    }

    /// Skip the TCB interpolation block of a track key
    fn read_tcb(&mut self) -> Result<()> {
        const USE_TENSION: u16 = 0x0001;
        const USE_CONTINUITY: u16 = 0x0002;
        const USE_BIAS: u16 = 0x0004;
        const USE_EASE_TO: u16 = 0x0008;
        const USE_EASE_FROM: u16 = 0x0010;

        let _frame = self.cursor.read_i32()?;
        let flags = self.cursor.read_u16()?;
        for bit in [USE_TENSION, USE_CONTINUITY, USE_BIAS, USE_EASE_TO, USE_EASE_FROM] {
            if flags & bit != 0 {
                let _ = self.cursor.read_f32()?;
            }
        }
        Ok(())
    }

    /// Read a linear vector track, keeping only the first key
    fn read_lin3_track(&mut self) -> Result<Vec3> {
        let _flags = self.cursor.read_u16()?;
        let _ = self.cursor.read_u32()?;
        let _ = self.cursor.read_u32()?;
        let keys = self.cursor.read_i32()?;
        if keys > 1 {
            warn!(keys, "vector track has more than one key frame, keeping the first");
        }
        let mut vector = Vec3::ZERO;
        for _ in 0..keys.min(1).max(0) {
            self.read_tcb()?;
            vector = self.read_vector()?;
        }
        Ok(vector)
    }

    /// Read a rotation track, keeping only the first key
    fn read_rot_track(&mut self) -> Result<Mat3> {
        let _flags = self.cursor.read_u16()?;
        let _ = self.cursor.read_u32()?;
        let _ = self.cursor.read_u32()?;
        let keys = self.cursor.read_i32()?;
        if keys > 1 {
            warn!(keys, "rotation track has more than one key frame, keeping the first");
        }
        let mut angle = 0.0;
        let mut axis = Vec3::ZERO;
        for _ in 0..keys.min(1).max(0) {
            self.read_tcb()?;
            angle = self.cursor.read_f32()?;
            axis = self.read_vector()?;
        }
        if axis.is_zero() {
            axis = Vec3::UP;
            if angle.abs() > 1e-5 {
                warn!(angle, "zero-axis rotation with non-zero angle");
            }
        }
        Ok(Mat3::from_axis_angle(axis, angle))
    }

    fn process_chunk(&mut self, parent: &ChunkHeader) -> Result<()> {
        while self.cursor.position() < parent.end {
            let header = ChunkHeader::read(&mut self.cursor)?;
            match header.kind() {
                Some(ChunkId::Version) => {
                    self.file.file_version = self.cursor.read_u16()?;
                    if self.file.file_version != 3 {
                        return Err(Error::UnsupportedVersion {
                            version: self.file.file_version.to_string(),
                            supported: "3".to_string(),
                        });
                    }
                }

                Some(ChunkId::Editor | ChunkId::Keyframer) => {
                    self.process_chunk(&header)?;
                }

                Some(ChunkId::MeshVersion) => {
                    self.file.mesh_version = self.cursor.read_u32()?;
                }

                Some(ChunkId::EditMaterial) => {
                    let mut material = TdsMaterial::default();
                    self.process_material_chunk(&mut material, &header)?;
                    self.file.materials.push(material);
                }

                Some(ChunkId::EditObject) => {
                    let mut object = TdsObject::default();
                    self.process_object_chunk(&mut object, &header)?;
                    self.file.objects.push(object);
                }

                Some(ChunkId::KfFrames) => {
                    self.file.start_frame = self.cursor.read_u32()?;
                    self.file.end_frame = self.cursor.read_u32()?;
                    self.process_chunk(&header)?;
                }

                Some(ChunkId::KfMeshInfo) => {
                    self.current_rotation = Mat3::IDENTITY;
                    self.current_scale = Vec3::ONE;
                    self.current_translation = Vec3::ZERO;
                    self.current_pivot = Vec3::ZERO;

                    self.process_chunk(&header)?;

                    if let Some(index) = self.current_object {
                        let cframe = CoordinateFrame {
                            rotation: self.current_rotation,
                            translation: self.current_translation + self.current_pivot,
                        };
                        let mut keyframe = Mat4::from(cframe);
                        let scale = [self.current_scale.x, self.current_scale.y, self.current_scale.z];
                        for r in 0..3 {
                            for (c, s) in scale.iter().enumerate() {
                                keyframe.m[r][c] *= s;
                            }
                        }
                        self.file.objects[index].keyframe = keyframe;
                    }
                }

                Some(ChunkId::KfName) => {
                    let name = self.cursor.read_cstring()?;
                    let _ = self.cursor.read_u16()?;
                    let _ = self.cursor.read_u16()?;
                    // 0xFFFF means "root object"
                    let hierarchy_index = i32::from(self.cursor.read_u16()? as i16);

                    self.current_object = if name == "$$$DUMMY" {
                        None
                    } else {
                        self.file.objects.iter().position(|o| o.name == name)
                    };
                    if let Some(index) = self.current_object {
                        self.file.objects[index].hierarchy_index = hierarchy_index;
                    }
                }

                Some(ChunkId::KfPivot) => {
                    self.current_pivot = self.read_vector()?;
                }

                Some(ChunkId::KfTranslation) => {
                    self.current_translation = self.read_lin3_track()?;
                }

                Some(ChunkId::KfScale) => {
                    // The vector reader negates x assuming a point; undo
                    // that for a scale factor.
                    let mut scale = self.read_lin3_track()?;
                    scale.x *= -1.0;
                    self.current_scale = scale;
                }

                Some(ChunkId::KfRotation) => {
                    self.current_rotation = self.read_rot_track()?;
                }

                Some(ChunkId::KfHierarchy) => {
                    if let Some(index) = self.current_object {
                        self.file.objects[index].node_id = i32::from(self.cursor.read_u16()?);
                    }
                }

                _ => {}
            }
            self.cursor.seek(header.end)?;
        }
        Ok(())
    }

    fn process_material_chunk(
        &mut self,
        material: &mut TdsMaterial,
        parent: &ChunkHeader,
    ) -> Result<()> {
        while self.cursor.position() < parent.end {
            let header = ChunkHeader::read(&mut self.cursor)?;
            match header.kind() {
                Some(ChunkId::MaterialName) => material.name = self.cursor.read_cstring()?,
                Some(ChunkId::MaterialDiffuse) => material.diffuse = self.read_color()?,
                Some(ChunkId::MaterialSpecular) => material.specular = self.read_color()?,
                Some(ChunkId::MaterialShininess) => material.shininess = self.read_pct()?,
                Some(ChunkId::MaterialShininessStrength) => {
                    material.shininess_strength = self.read_pct()?;
                }
                Some(ChunkId::MaterialTransparency) => material.transparency = self.read_pct()?,
                Some(ChunkId::MaterialSelfIllum) => material.emissive = self.read_pct()?,
                // Carries no payload; presence alone means two-sided
                Some(ChunkId::MaterialTwoSided) => material.two_sided = true,
                Some(ChunkId::MaterialReflectionMap) => {
                    // Only the strength percentage feeds the material
                    let mut map = TdsMap::default();
                    self.process_map_chunk(&mut map, &header)?;
                    material.reflection = map.pct;
                }
                Some(ChunkId::MaterialTextureMap1) => {
                    self.process_map_chunk(&mut material.texture1, &header)?;
                }
                Some(ChunkId::MaterialTextureMap2) => {
                    self.process_map_chunk(&mut material.texture2, &header)?;
                }
                Some(ChunkId::MaterialBumpMap) => {
                    self.process_map_chunk(&mut material.bump_map, &header)?;
                }
                _ => {}
            }
            self.cursor.seek(header.end)?;
        }
        Ok(())
    }

    fn process_map_chunk(&mut self, map: &mut TdsMap, parent: &ChunkHeader) -> Result<()> {
        while self.cursor.position() < parent.end {
            let header = ChunkHeader::read(&mut self.cursor)?;
            match header.kind() {
                Some(ChunkId::MapFilename) => map.filename = Some(self.cursor.read_cstring()?),
                // Inside a map chunk the percentage is a single byte
                Some(ChunkId::IntPercent) => {
                    map.pct = f32::from(self.cursor.read_u8()?) / 100.0;
                }
                Some(ChunkId::MapTiling) => map.flags = self.cursor.read_u16()?,
                Some(ChunkId::MapUScale) => map.scale.x = self.cursor.read_f32()?,
                Some(ChunkId::MapVScale) => map.scale.y = self.cursor.read_f32()?,
                Some(ChunkId::MapUOffset) => map.offset.x = self.cursor.read_f32()?,
                Some(ChunkId::MapVOffset) => map.offset.y = self.cursor.read_f32()?,
                _ => {}
            }
            self.cursor.seek(header.end)?;
        }
        Ok(())
    }

    fn process_object_chunk(&mut self, object: &mut TdsObject, parent: &ChunkHeader) -> Result<()> {
        object.name = self.cursor.read_cstring()?;
        while self.cursor.position() < parent.end {
            let header = ChunkHeader::read(&mut self.cursor)?;
            if header.kind() == Some(ChunkId::TriMesh) {
                self.process_tri_mesh_chunk(object, &header)?;
            }
            self.cursor.seek(header.end)?;
        }
        Ok(())
    }

    fn process_tri_mesh_chunk(
        &mut self,
        object: &mut TdsObject,
        parent: &ChunkHeader,
    ) -> Result<()> {
        let mut warned_non_finite = false;
        while self.cursor.position() < parent.end {
            let header = ChunkHeader::read(&mut self.cursor)?;
            match header.kind() {
                Some(ChunkId::TriVertexList) => {
                    let n = self.cursor.read_u16()?;
                    object.vertices.clear();
                    object.vertices.reserve(usize::from(n));
                    for _ in 0..n {
                        let mut v = self.read_vector()?;
                        if !v.is_finite() {
                            if !warned_non_finite {
                                warn!(object = %object.name, "non-finite vertex, replaced with zero");
                                warned_non_finite = true;
                            }
                            v = Vec3::ZERO;
                        }
                        object.vertices.push(v);
                    }
                }

                Some(ChunkId::TriFaceList) => {
                    // Indices are in clockwise winding order
                    let n = self.cursor.read_u16()?;
                    object.indices.clear();
                    object.indices.reserve(usize::from(n) * 3);
                    for _ in 0..n {
                        for _ in 0..3 {
                            object.indices.push(u32::from(self.cursor.read_u16()?));
                        }
                        // Edge visibility flags, unused
                        let _flags = self.cursor.read_u16()?;
                    }
                    // The face list nests TRIFACEMAT chunks after the faces
                    self.process_tri_mesh_chunk(object, &header)?;
                }

                Some(ChunkId::TriFaceMaterial) => {
                    let mut face_mat = TdsFaceMat {
                        material_name: self.cursor.read_cstring()?,
                        face_indices: Vec::new(),
                    };
                    let n = self.cursor.read_u16()?;
                    face_mat.face_indices.reserve(usize::from(n));
                    for _ in 0..n {
                        face_mat.face_indices.push(self.cursor.read_u16()?);
                    }
                    object.face_mats.push(face_mat);
                }

                Some(ChunkId::TriTexCoords) => {
                    let n = usize::from(self.cursor.read_u16()?);
                    if n == object.vertices.len() {
                        object.tex_coords.clear();
                        object.tex_coords.reserve(n);
                        for _ in 0..n {
                            let x = self.cursor.read_f32()?;
                            // V is flipped relative to this pipeline
                            let y = 1.0 - self.cursor.read_f32()?;
                            object.tex_coords.push(Vec2::new(x, y));
                        }
                    } else {
                        warn!(
                            object = %object.name,
                            expected = object.vertices.len(),
                            found = n,
                            "texture coordinate count does not match vertex count, skipping"
                        );
                    }
                }

                Some(ChunkId::TriMatrix) => {
                    let mut c = [0.0f32; 12];
                    for v in &mut c {
                        *v = self.cursor.read_f32()?;
                    }
                    // Swap y/z and negate x, matching read_vector. The
                    // transform is already baked into the vertices.
                    object.cframe = Mat4 {
                        m: [
                            [c[0], c[3], c[6], -c[9]],
                            [c[1], c[4], c[7], c[11]],
                            [c[2], c[5], c[8], c[10]],
                            [0.0, 0.0, 0.0, 1.0],
                        ],
                    };
                }

                // Smoothing groups are not used downstream
                Some(ChunkId::TriSmoothing) => {}

                _ => {}
            }
            self.cursor.seek(header.end)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal chunk writer for building synthetic files
    struct ChunkWriter {
        data: Vec<u8>,
    }

    impl ChunkWriter {
        fn new() -> Self {
            Self { data: Vec::new() }
        }

        fn begin(&mut self, id: u16) -> usize {
            let at = self.data.len();
            self.data.extend_from_slice(&id.to_le_bytes());
            self.data.extend_from_slice(&0u32.to_le_bytes());
            at
        }

        fn end(&mut self, at: usize) {
            let length = (self.data.len() - at) as u32;
            self.data[at + 2..at + 6].copy_from_slice(&length.to_le_bytes());
        }

        fn u8(&mut self, v: u8) {
            self.data.push(v);
        }

        fn u16(&mut self, v: u16) {
            self.data.extend_from_slice(&v.to_le_bytes());
        }

        fn u32(&mut self, v: u32) {
            self.data.extend_from_slice(&v.to_le_bytes());
        }

        fn f32(&mut self, v: f32) {
            self.data.extend_from_slice(&v.to_le_bytes());
        }

        fn cstr(&mut self, s: &str) {
            self.data.extend_from_slice(s.as_bytes());
            self.data.push(0);
        }
    }

    /// One triangle with a material assignment and an unknown sibling chunk
    fn build_single_triangle() -> Vec<u8> {
        build_triangle(true)
    }

    fn build_triangle(include_unknown: bool) -> Vec<u8> {
        let mut w = ChunkWriter::new();
        let main = w.begin(0x4D4D);

        let version = w.begin(0x0002);
        w.u16(3);
        w.end(version);

        let editor = w.begin(0x3D3D);

        if include_unknown {
            // An editor-config chunk the parser must skip by length
            let unknown = w.begin(0x0100);
            w.f32(1.0);
            w.end(unknown);
        }

        let mat = w.begin(0xAFFF);
        let name = w.begin(0xA000);
        w.cstr("red");
        w.end(name);
        let diffuse = w.begin(0xA020);
        let rgb = w.begin(0x0011);
        w.u8(255);
        w.u8(0);
        w.u8(0);
        w.end(rgb);
        w.end(diffuse);
        w.u16(0xA081); // two-sided, no payload
        w.data.extend_from_slice(&6u32.to_le_bytes());
        w.end(mat);

        let obj = w.begin(0x4000);
        w.cstr("tri");
        let mesh = w.begin(0x4100);

        let verts = w.begin(0x4110);
        w.u16(3);
        for v in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]] {
            w.f32(v[0]);
            w.f32(v[1]);
            w.f32(v[2]);
        }
        w.end(verts);

        let faces = w.begin(0x4120);
        w.u16(1);
        w.u16(0);
        w.u16(1);
        w.u16(2);
        w.u16(0); // flags
        let facemat = w.begin(0x4130);
        w.cstr("red");
        w.u16(1);
        w.u16(0);
        w.end(facemat);
        w.end(faces);

        w.end(mesh);
        w.end(obj);
        w.end(editor);
        w.end(main);
        w.data
    }

    #[test]
    fn test_single_triangle() {
        let file = parse_tds(&build_single_triangle()).unwrap();
        assert_eq!(file.file_version, 3);
        assert_eq!(file.objects.len(), 1);

        let obj = &file.objects[0];
        assert_eq!(obj.name, "tri");
        assert_eq!(obj.vertices.len(), 3);
        assert_eq!(obj.indices, vec![0, 1, 2]);
        // (f0, f1, f2) maps to (-f0, f2, f1)
        assert_eq!(obj.vertices[1], Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(obj.vertices[2], Vec3::new(0.0, 1.0, 0.0));

        assert_eq!(obj.face_mats.len(), 1);
        assert_eq!(obj.face_mats[0].material_name, "red");
        assert_eq!(obj.face_mats[0].face_indices, vec![0]);

        let mat = file.material("red").unwrap();
        assert_eq!(mat.diffuse, Vec3::new(1.0, 0.0, 0.0));
        assert!(mat.two_sided);
        // Untouched defaults
        assert!((mat.shininess - 0.8).abs() < 1e-6);
        assert!((mat.shininess_strength - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_mesh_version_and_material_strengths() {
        let mut w = ChunkWriter::new();
        let main = w.begin(0x4D4D);
        let editor = w.begin(0x3D3D);

        let mesh_version = w.begin(0x3D3E);
        w.u32(3);
        w.end(mesh_version);

        let mat = w.begin(0xAFFF);
        let name = w.begin(0xA000);
        w.cstr("glow");
        w.end(name);
        let self_illum = w.begin(0xA084);
        let pct = w.begin(0x0030);
        w.u16(25);
        w.end(pct);
        w.end(self_illum);
        let reflection = w.begin(0xA220);
        let strength = w.begin(0x0030);
        w.u8(40); // map percentages are one byte
        w.end(strength);
        w.end(reflection);
        w.end(mat);

        w.end(editor);
        w.end(main);

        let file = parse_tds(&w.data).unwrap();
        assert_eq!(file.mesh_version, 3);
        let m = file.material("glow").unwrap();
        assert!((m.emissive - 0.25).abs() < 1e-6);
        assert!((m.reflection - 0.40).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_chunk_does_not_disturb_siblings() {
        let with = parse_tds(&build_triangle(true)).unwrap();
        let without = parse_tds(&build_triangle(false)).unwrap();

        assert_eq!(with.materials, without.materials);
        assert_eq!(with.objects.len(), without.objects.len());
        let (a, b) = (&with.objects[0], &without.objects[0]);
        assert_eq!(a.name, b.name);
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.indices, b.indices);
        assert_eq!(a.face_mats, b.face_mats);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = build_single_triangle();
        data[0] = 0x00;
        data[1] = 0x00;
        let err = parse_tds(&data).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { .. }));
    }

    #[test]
    fn test_unsupported_version() {
        let mut w = ChunkWriter::new();
        let main = w.begin(0x4D4D);
        let version = w.begin(0x0002);
        w.u16(2);
        w.end(version);
        w.end(main);
        let err = parse_tds(&w.data).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_truncated_chunk_rejected() {
        let mut data = build_single_triangle();
        data.truncate(data.len() - 4);
        assert!(parse_tds(&data).is_err());
    }

    #[test]
    fn test_non_finite_vertex_zeroed() {
        let mut w = ChunkWriter::new();
        let main = w.begin(0x4D4D);
        let editor = w.begin(0x3D3D);
        let obj = w.begin(0x4000);
        w.cstr("bad");
        let mesh = w.begin(0x4100);
        let verts = w.begin(0x4110);
        w.u16(1);
        w.f32(f32::INFINITY);
        w.f32(0.0);
        w.f32(0.0);
        w.end(verts);
        w.end(mesh);
        w.end(obj);
        w.end(editor);
        w.end(main);

        let file = parse_tds(&w.data).unwrap();
        assert_eq!(file.objects[0].vertices[0], Vec3::ZERO);
    }

    #[test]
    fn test_texcoord_count_mismatch_skipped() {
        let mut w = ChunkWriter::new();
        let main = w.begin(0x4D4D);
        let editor = w.begin(0x3D3D);
        let obj = w.begin(0x4000);
        w.cstr("t");
        let mesh = w.begin(0x4100);
        let verts = w.begin(0x4110);
        w.u16(2);
        for _ in 0..6 {
            w.f32(0.0);
        }
        w.end(verts);
        let uv = w.begin(0x4140);
        w.u16(1); // wrong count
        w.f32(0.5);
        w.f32(0.5);
        w.end(uv);
        w.end(mesh);
        w.end(obj);
        w.end(editor);
        w.end(main);

        let file = parse_tds(&w.data).unwrap();
        assert!(file.objects[0].tex_coords.is_empty());
    }
}
