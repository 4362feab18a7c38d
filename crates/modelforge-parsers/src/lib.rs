//! modelforge-parsers
//!
//! Parsers for the model formats the ingestion pipeline accepts. Each
//! parser produces a faithful in-memory representation of its file; the
//! canonical model build lives downstream in `modelforge-model`.
//!
//! # Supported Formats
//!
//! | Format | Extension       | Description                       |
//! |--------|-----------------|-----------------------------------|
//! | 3DS    | `.3ds` / `.tds` | Autodesk 3D Studio chunked binary |
//! | PLY    | `.ply`          | Stanford polygon format (binary)  |
//! | OBJ    | `.obj`          | Wavefront geometry (text)         |
//! | MTL    | `.mtl`          | Wavefront material library (text) |

pub mod chunk;
pub mod cursor;
pub mod mtl;
pub mod obj;
pub mod ply;
pub mod tds;

pub use chunk::{ChunkHeader, ChunkId};
pub use cursor::{Cursor, Endian};
pub use mtl::{parse_mtl, MtlField, MtlLibrary, MtlMaterial};
pub use obj::{parse_obj, ObjFile, ObjGroup, ObjIndex, ObjMesh};
pub use ply::{parse_ply, PlyFile, Property, PropertyType, ScalarType};
pub use tds::{parse_tds, TdsFile, TdsMap, TdsMaterial, TdsObject};

use std::path::Path;

/// Model formats the pipeline knows how to ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    /// Autodesk 3D Studio chunked binary
    Tds,
    /// Stanford polygon format
    Ply,
    /// Wavefront geometry
    Obj,
}

impl ModelFormat {
    /// Detect the format from a file extension (case-insensitive)
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "3ds" | "tds" => Some(Self::Tds),
            "ply" => Some(Self::Ply),
            "obj" => Some(Self::Obj),
            _ => None,
        }
    }
}
