//! 3DS chunk framing
//!
//! A 3DS file is a tree of chunks. Every chunk starts with a 6-byte
//! header: a 16-bit id and a 32-bit total length that includes the
//! header itself. Walking a file means reading a header, dispatching on
//! the id, and always seeking to `end` afterwards so unknown or
//! partially-read chunks can never desynchronize the stream.

use crate::cursor::Cursor;
use modelforge_core::error::{Error, Result};

/// Size of the id + length prefix
pub const CHUNK_HEADER_SIZE: u32 = 6;

/// Known chunk ids. Files contain many more; anything unlisted is
/// skipped by length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkId {
    /// Top-level file chunk
    Main,
    /// File format version
    Version,
    /// Editor data container
    Editor,
    /// Editor mesh version
    MeshVersion,
    /// Material definition container
    EditMaterial,
    /// Material name
    MaterialName,
    /// Diffuse color
    MaterialDiffuse,
    /// Specular color
    MaterialSpecular,
    /// Shininess percentage
    MaterialShininess,
    /// Shininess strength percentage
    MaterialShininessStrength,
    /// Transparency percentage
    MaterialTransparency,
    /// Self-illumination percentage
    MaterialSelfIllum,
    /// Presence marks the material two-sided
    MaterialTwoSided,
    /// Reflection map container; its percentage is the strength
    MaterialReflectionMap,
    /// Primary texture map
    MaterialTextureMap1,
    /// Secondary texture map
    MaterialTextureMap2,
    /// Bump map
    MaterialBumpMap,
    /// Map file name
    MapFilename,
    /// Map tiling flags
    MapTiling,
    /// Map U scale
    MapUScale,
    /// Map V scale
    MapVScale,
    /// Map U offset
    MapUOffset,
    /// Map V offset
    MapVOffset,
    /// Named object container
    EditObject,
    /// Triangle mesh container
    TriMesh,
    /// Vertex list
    TriVertexList,
    /// Face list
    TriFaceList,
    /// Per-material face subset
    TriFaceMaterial,
    /// Texture coordinate list
    TriTexCoords,
    /// Smoothing groups (skipped)
    TriSmoothing,
    /// Object-to-world matrix
    TriMatrix,
    /// Keyframer container
    Keyframer,
    /// Animation frame range
    KfFrames,
    /// Per-object keyframe container
    KfMeshInfo,
    /// Keyframed object name
    KfName,
    /// Pivot point
    KfPivot,
    /// Translation track
    KfTranslation,
    /// Rotation track
    KfRotation,
    /// Scale track
    KfScale,
    /// Hierarchy node id
    KfHierarchy,
    /// Float RGB color payload
    ColorFloat,
    /// Byte RGB color payload
    ColorByte,
    /// Integer percentage payload
    IntPercent,
    /// Float percentage payload
    FloatPercent,
}

impl ChunkId {
    /// Map a raw chunk id to a known kind
    #[must_use]
    pub const fn from_u16(id: u16) -> Option<Self> {
        Some(match id {
            0x4D4D => Self::Main,
            0x0002 => Self::Version,
            0x3D3D => Self::Editor,
            0x3D3E => Self::MeshVersion,
            0xAFFF => Self::EditMaterial,
            0xA000 => Self::MaterialName,
            0xA020 => Self::MaterialDiffuse,
            0xA030 => Self::MaterialSpecular,
            0xA040 => Self::MaterialShininess,
            0xA041 => Self::MaterialShininessStrength,
            0xA050 => Self::MaterialTransparency,
            0xA084 => Self::MaterialSelfIllum,
            0xA081 => Self::MaterialTwoSided,
            0xA220 => Self::MaterialReflectionMap,
            0xA200 => Self::MaterialTextureMap1,
            0xA33A => Self::MaterialTextureMap2,
            0xA230 => Self::MaterialBumpMap,
            0xA300 => Self::MapFilename,
            0xA351 => Self::MapTiling,
            0xA354 => Self::MapUScale,
            0xA356 => Self::MapVScale,
            0xA358 => Self::MapUOffset,
            0xA35A => Self::MapVOffset,
            0x4000 => Self::EditObject,
            0x4100 => Self::TriMesh,
            0x4110 => Self::TriVertexList,
            0x4120 => Self::TriFaceList,
            0x4130 => Self::TriFaceMaterial,
            0x4140 => Self::TriTexCoords,
            0x4150 => Self::TriSmoothing,
            0x4160 => Self::TriMatrix,
            0xB000 => Self::Keyframer,
            0xB008 => Self::KfFrames,
            0xB002 => Self::KfMeshInfo,
            0xB010 => Self::KfName,
            0xB013 => Self::KfPivot,
            0xB020 => Self::KfTranslation,
            0xB021 => Self::KfRotation,
            0xB022 => Self::KfScale,
            0xB030 => Self::KfHierarchy,
            0x0010 => Self::ColorFloat,
            0x0011 => Self::ColorByte,
            0x0030 => Self::IntPercent,
            0x0031 => Self::FloatPercent,
            _ => return None,
        })
    }
}

/// One decoded chunk header
#[derive(Debug, Clone, Copy)]
pub struct ChunkHeader {
    /// Raw 16-bit chunk id
    pub id: u16,
    /// Total chunk length in bytes, header included
    pub length: u32,
    /// Absolute offset of the header
    pub begin: usize,
    /// Absolute offset one past the chunk payload
    pub end: usize,
}

impl ChunkHeader {
    /// Read and validate a header at the cursor position
    pub fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
        let begin = cursor.position();
        let id = cursor.read_u16()?;
        let length = cursor.read_u32()?;
        if length < CHUNK_HEADER_SIZE {
            return Err(Error::invalid_data(format!(
                "chunk 0x{id:04X} at offset {begin} declares length {length}, below the header size"
            )));
        }
        let end = begin + length as usize;
        if end > cursor.len() {
            return Err(Error::invalid_data(format!(
                "chunk 0x{id:04X} at offset {begin} declares length {length}, past end of file"
            )));
        }
        Ok(Self { id, length, begin, end })
    }

    /// The known kind of this chunk, if any
    #[must_use]
    pub const fn kind(&self) -> Option<ChunkId> {
        ChunkId::from_u16(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_bytes(id: u16, length: u32) -> Vec<u8> {
        let mut v = id.to_le_bytes().to_vec();
        v.extend_from_slice(&length.to_le_bytes());
        v.resize(length.max(CHUNK_HEADER_SIZE) as usize, 0);
        v
    }

    #[test]
    fn test_read_header() {
        let data = chunk_bytes(0x4D4D, 10);
        let mut c = Cursor::new(&data);
        let h = ChunkHeader::read(&mut c).unwrap();
        assert_eq!(h.kind(), Some(ChunkId::Main));
        assert_eq!(h.begin, 0);
        assert_eq!(h.end, 10);
    }

    #[test]
    fn test_length_below_header_size_rejected() {
        let mut data = chunk_bytes(0x4D4D, 10);
        data[2..6].copy_from_slice(&2u32.to_le_bytes());
        let mut c = Cursor::new(&data);
        assert!(ChunkHeader::read(&mut c).is_err());
    }

    #[test]
    fn test_length_past_eof_rejected() {
        let mut data = chunk_bytes(0x4D4D, 10);
        data.truncate(8);
        let mut c = Cursor::new(&data);
        assert!(ChunkHeader::read(&mut c).is_err());
    }

    #[test]
    fn test_unknown_id() {
        let data = chunk_bytes(0x7012, 6);
        let mut c = Cursor::new(&data);
        let h = ChunkHeader::read(&mut c).unwrap();
        assert_eq!(h.kind(), None);
    }
}
