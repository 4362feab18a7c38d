//! Stanford PLY parser (binary only)
//!
//! The header is ASCII lines; the body is packed binary in the byte
//! order the `format` line declares. Vertex properties are whatever the
//! file says they are; every scalar is widened to `f32` and stored in a
//! flat row-major table so downstream code can index by property name.
//! ASCII bodies are not supported.

use crate::cursor::{Cursor, Endian};
use modelforge_core::error::{Error, Result};

/// The eight PLY scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// 8-bit signed
    Char,
    /// 8-bit unsigned
    UChar,
    /// 16-bit signed
    Short,
    /// 16-bit unsigned
    UShort,
    /// 32-bit signed
    Int,
    /// 32-bit unsigned
    UInt,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
}

impl ScalarType {
    /// Parse a type keyword, accepting both classic and sized names
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "char" | "int8" => Self::Char,
            "uchar" | "uint8" => Self::UChar,
            "short" | "int16" => Self::Short,
            "ushort" | "uint16" => Self::UShort,
            "int" | "int32" => Self::Int,
            "uint" | "uint32" => Self::UInt,
            "float" | "float32" => Self::Float,
            "double" | "float64" => Self::Double,
            _ => return None,
        })
    }

    /// Encoded size in bytes
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Double => 8,
        }
    }
}

/// Scalar or variable-length list property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    /// A single scalar value
    Scalar(ScalarType),
    /// A count followed by that many elements
    List {
        /// Type of the leading count
        length: ScalarType,
        /// Type of each element
        element: ScalarType,
    },
}

/// One declared property of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property name as declared
    pub name: String,
    /// Scalar or list shape
    pub ty: PropertyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Vertex,
    Face,
    TriStrips,
}

/// Complete parse result for one .ply file
#[derive(Debug, Clone, Default)]
pub struct PlyFile {
    /// True when the body was big-endian
    pub big_endian: bool,
    /// Vertex property declarations in file order
    pub vertex_properties: Vec<Property>,
    /// Number of vertices
    pub num_vertices: usize,
    /// Row-major vertex table, `num_vertices` rows of
    /// `vertex_properties.len()` floats
    pub vertex_data: Vec<f32>,
    /// Polygon faces as vertex index lists
    pub faces: Vec<Vec<u32>>,
    /// Triangle strips; -1 restarts a strip
    pub tristrips: Vec<Vec<i32>>,
}

impl PlyFile {
    /// Index of a vertex property by name
    #[must_use]
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.vertex_properties.iter().position(|p| p.name == name)
    }

    /// One vertex row
    #[must_use]
    pub fn vertex(&self, index: usize) -> &[f32] {
        let width = self.vertex_properties.len();
        &self.vertex_data[index * width..(index + 1) * width]
    }
}

/// Parse a complete .ply file from memory
pub fn parse_ply(data: &[u8]) -> Result<PlyFile> {
    let mut cursor = Cursor::new(data);
    let mut file = PlyFile::default();

    let magic = cursor.read_line()?;
    if magic.trim() != "ply" {
        return Err(Error::InvalidMagic {
            expected: "ply".to_string(),
            found: magic.chars().take(16).collect(),
        });
    }

    // (kind, count, properties) in declaration order
    let mut elements: Vec<(ElementKind, usize, Vec<Property>)> = Vec::new();
    let mut saw_format = false;

    loop {
        let line = cursor.read_line()?;
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else { continue };

        match keyword {
            "comment" | "obj_info" => {}

            "format" => {
                let encoding = words.next().unwrap_or("");
                let version = words.next().unwrap_or("");
                match encoding {
                    "binary_little_endian" => file.big_endian = false,
                    "binary_big_endian" => file.big_endian = true,
                    other => {
                        return Err(Error::UnsupportedEncoding {
                            encoding: other.to_string(),
                        })
                    }
                }
                if version != "1.0" {
                    return Err(Error::UnsupportedVersion {
                        version: version.to_string(),
                        supported: "1.0".to_string(),
                    });
                }
                saw_format = true;
            }

            "element" => {
                let name = words.next().unwrap_or("");
                let count: usize = words
                    .next()
                    .and_then(|w| w.parse().ok())
                    .ok_or_else(|| Error::invalid_data(format!("bad element count: {line}")))?;
                let kind = match name {
                    "vertex" => ElementKind::Vertex,
                    "face" => ElementKind::Face,
                    "tristrips" => ElementKind::TriStrips,
                    other => {
                        // Skipping unknown elements would require knowing
                        // their binary width, which lists make impossible
                        return Err(Error::invalid_data(format!("unsupported element: {other}")));
                    }
                };
                elements.push((kind, count, Vec::new()));
            }

            "property" => {
                let (_, _, props) = elements
                    .last_mut()
                    .ok_or_else(|| Error::invalid_data("property before any element"))?;
                let first = words.next().unwrap_or("");
                let (ty, name) = if first == "list" {
                    let length = ScalarType::from_keyword(words.next().unwrap_or(""))
                        .ok_or_else(|| Error::invalid_data(format!("bad list property: {line}")))?;
                    let element = ScalarType::from_keyword(words.next().unwrap_or(""))
                        .ok_or_else(|| Error::invalid_data(format!("bad list property: {line}")))?;
                    (PropertyType::List { length, element }, words.next())
                } else {
                    let scalar = ScalarType::from_keyword(first)
                        .ok_or_else(|| Error::invalid_data(format!("bad property: {line}")))?;
                    (PropertyType::Scalar(scalar), words.next())
                };
                let name = name
                    .ok_or_else(|| Error::invalid_data(format!("property without a name: {line}")))?;
                props.push(Property { name: name.to_string(), ty });
            }

            "end_header" => break,

            other => {
                return Err(Error::invalid_data(format!("unknown header keyword: {other}")));
            }
        }
    }

    if !saw_format {
        return Err(Error::missing_field("format"));
    }

    cursor.set_endian(if file.big_endian { Endian::Big } else { Endian::Little });

    for (kind, count, props) in elements {
        match kind {
            ElementKind::Vertex => read_vertices(&mut cursor, &mut file, count, props)?,
            ElementKind::Face => {
                read_index_lists(&mut cursor, count, &props, |indices| {
                    let mut face = Vec::with_capacity(indices.len());
                    for &i in &indices {
                        let i = u32::try_from(i).map_err(|_| {
                            Error::invalid_data(format!("face index out of range: {i}"))
                        })?;
                        face.push(i);
                    }
                    file.faces.push(face);
                    Ok(())
                })?;
            }
            ElementKind::TriStrips => {
                read_index_lists(&mut cursor, count, &props, |indices| {
                    let mut strip = Vec::with_capacity(indices.len());
                    for &i in &indices {
                        if i < -1 || i > i64::from(i32::MAX) {
                            return Err(Error::invalid_data(format!("bad tristrip index: {i}")));
                        }
                        strip.push(i as i32);
                    }
                    file.tristrips.push(strip);
                    Ok(())
                })?;
            }
        }
    }

    Ok(file)
}

fn read_scalar_f32(cursor: &mut Cursor<'_>, ty: ScalarType) -> Result<f32> {
    Ok(match ty {
        ScalarType::Char => f32::from(cursor.read_i8()?),
        ScalarType::UChar => f32::from(cursor.read_u8()?),
        ScalarType::Short => f32::from(cursor.read_i16()?),
        ScalarType::UShort => f32::from(cursor.read_u16()?),
        ScalarType::Int => cursor.read_i32()? as f32,
        ScalarType::UInt => cursor.read_u32()? as f32,
        ScalarType::Float => cursor.read_f32()?,
        ScalarType::Double => cursor.read_f64()? as f32,
    })
}

fn read_scalar_i64(cursor: &mut Cursor<'_>, ty: ScalarType) -> Result<i64> {
    Ok(match ty {
        ScalarType::Char => i64::from(cursor.read_i8()?),
        ScalarType::UChar => i64::from(cursor.read_u8()?),
        ScalarType::Short => i64::from(cursor.read_i16()?),
        ScalarType::UShort => i64::from(cursor.read_u16()?),
        ScalarType::Int => i64::from(cursor.read_i32()?),
        ScalarType::UInt => i64::from(cursor.read_u32()?),
        ScalarType::Float => cursor.read_f32()? as i64,
        ScalarType::Double => cursor.read_f64()? as i64,
    })
}

fn read_vertices(
    cursor: &mut Cursor<'_>,
    file: &mut PlyFile,
    count: usize,
    props: Vec<Property>,
) -> Result<()> {
    for p in &props {
        if let PropertyType::List { .. } = p.ty {
            return Err(Error::invalid_data(format!(
                "vertex property '{}' is a list",
                p.name
            )));
        }
    }
    let row_bytes: usize = props
        .iter()
        .map(|p| match p.ty {
            PropertyType::Scalar(ty) => ty.size(),
            PropertyType::List { .. } => 0,
        })
        .sum();
    if count.checked_mul(row_bytes).is_none_or(|total| total > cursor.remaining()) {
        return Err(Error::invalid_data(format!("vertex count {count} exceeds file size")));
    }
    file.num_vertices = count;
    file.vertex_data = Vec::with_capacity(count * props.len());
    for _ in 0..count {
        for p in &props {
            let PropertyType::Scalar(ty) = p.ty else {
                return Err(Error::invalid_data(format!(
                    "vertex property '{}' is a list",
                    p.name
                )));
            };
            file.vertex_data.push(read_scalar_f32(cursor, ty)?);
        }
    }
    file.vertex_properties = props;
    Ok(())
}

/// True for the conventional names of the face index list
fn is_index_list(name: &str) -> bool {
    name == "vertex_indices" || name == "vertex_index"
}

/// Read `count` rows of an indexed element, calling `sink` with each
/// row's index list. Non-index properties are parsed and discarded;
/// lists make the row width variable so they cannot simply be skipped.
fn read_index_lists(
    cursor: &mut Cursor<'_>,
    count: usize,
    props: &[Property],
    mut sink: impl FnMut(Vec<i64>) -> Result<()>,
) -> Result<()> {
    if count == 0 {
        return Ok(());
    }
    if !props
        .iter()
        .any(|p| matches!(p.ty, PropertyType::List { .. }) && is_index_list(&p.name))
    {
        return Err(Error::missing_field("vertex_indices"));
    }

    for _ in 0..count {
        let mut row: Option<Vec<i64>> = None;
        for p in props {
            match p.ty {
                PropertyType::Scalar(ty) => {
                    let _ = read_scalar_f32(cursor, ty)?;
                }
                PropertyType::List { length, element } => {
                    let n = read_scalar_i64(cursor, length)?;
                    if n < 0 {
                        return Err(Error::invalid_data(format!("negative list length: {n}")));
                    }
                    // Every element occupies at least one body byte
                    if n as u64 > cursor.remaining() as u64 {
                        return Err(Error::invalid_data(format!("list length {n} exceeds file size")));
                    }
                    if is_index_list(&p.name) && row.is_none() {
                        let mut indices = Vec::with_capacity(n as usize);
                        for _ in 0..n {
                            indices.push(read_scalar_i64(cursor, element)?);
                        }
                        row = Some(indices);
                    } else {
                        for _ in 0..n {
                            let _ = read_scalar_i64(cursor, element)?;
                        }
                    }
                }
            }
        }
        if let Some(indices) = row {
            sink(indices)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(body: &str) -> Vec<u8> {
        format!("ply\n{body}end_header\n").into_bytes()
    }

    fn two_triangle_quad() -> Vec<u8> {
        let mut data = header(
            "format binary_little_endian 1.0\n\
             comment made by hand\n\
             element vertex 4\n\
             property float x\n\
             property float y\n\
             property float z\n\
             element face 2\n\
             property list uchar int vertex_indices\n",
        );
        for v in [
            [0.0f32, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ] {
            for c in v {
                data.extend_from_slice(&c.to_le_bytes());
            }
        }
        for face in [[0i32, 1, 2], [0, 2, 3]] {
            data.push(3);
            for i in face {
                data.extend_from_slice(&i.to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn test_two_triangles() {
        let file = parse_ply(&two_triangle_quad()).unwrap();
        assert!(!file.big_endian);
        assert_eq!(file.num_vertices, 4);
        assert_eq!(file.property_index("x"), Some(0));
        assert_eq!(file.property_index("z"), Some(2));
        assert_eq!(file.vertex(2), &[1.0, 1.0, 0.0]);
        assert_eq!(file.faces, vec![vec![0, 1, 2], vec![0, 2, 3]]);
    }

    #[test]
    fn test_big_endian_body() {
        let mut data = header(
            "format binary_big_endian 1.0\n\
             element vertex 1\n\
             property float x\n\
             property float y\n\
             property float z\n",
        );
        for c in [1.5f32, -2.0, 0.25] {
            data.extend_from_slice(&c.to_be_bytes());
        }
        let file = parse_ply(&data).unwrap();
        assert!(file.big_endian);
        assert_eq!(file.vertex(0), &[1.5, -2.0, 0.25]);
    }

    #[test]
    fn test_ascii_rejected() {
        let data = header("format ascii 1.0\nelement vertex 0\n");
        let err = parse_ply(&data).unwrap_err();
        assert!(matches!(err, Error::UnsupportedEncoding { .. }));
    }

    #[test]
    fn test_bad_magic() {
        let err = parse_ply(b"not a ply\n").unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { .. }));
    }

    #[test]
    fn test_extra_face_properties_discarded() {
        let mut data = header(
            "format binary_little_endian 1.0\n\
             element vertex 3\n\
             property float x\n\
             property float y\n\
             property float z\n\
             element face 1\n\
             property uchar flags\n\
             property list uchar int vertex_indices\n\
             property float quality\n",
        );
        for _ in 0..9 {
            data.extend_from_slice(&0.0f32.to_le_bytes());
        }
        data.push(7); // flags
        data.push(3);
        for i in [0i32, 1, 2] {
            data.extend_from_slice(&i.to_le_bytes());
        }
        data.extend_from_slice(&0.5f32.to_le_bytes()); // quality
        let file = parse_ply(&data).unwrap();
        assert_eq!(file.faces, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_tristrips_with_restart() {
        let mut data = header(
            "format binary_little_endian 1.0\n\
             element vertex 5\n\
             property float x\n\
             property float y\n\
             property float z\n\
             element tristrips 1\n\
             property list int int vertex_indices\n",
        );
        for _ in 0..15 {
            data.extend_from_slice(&0.0f32.to_le_bytes());
        }
        let strip = [0i32, 1, 2, 3, -1, 2, 3, 4];
        data.extend_from_slice(&(strip.len() as i32).to_le_bytes());
        for i in strip {
            data.extend_from_slice(&i.to_le_bytes());
        }
        let file = parse_ply(&data).unwrap();
        assert_eq!(file.tristrips.len(), 1);
        assert_eq!(file.tristrips[0], strip.to_vec());
    }

    #[test]
    fn test_list_vertex_property_rejected() {
        let data = header(
            "format binary_little_endian 1.0\n\
             element vertex 1\n\
             property list uchar float weights\n",
        );
        assert!(parse_ply(&data).is_err());
    }

    #[test]
    fn test_truncated_body() {
        let mut data = two_triangle_quad();
        data.truncate(data.len() - 2);
        assert!(matches!(parse_ply(&data).unwrap_err(), Error::UnexpectedEof { .. }));
    }
}
