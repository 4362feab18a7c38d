//! Modelforge Model Library
//!
//! The canonical model representation and everything that produces or
//! reshapes it: per-format builders over the raw parser output, the
//! preprocessing instruction interpreter, geometry cleaning, mesh
//! merging, the load pipeline, and the weak-reference model cache.
//!
//! The usual entry point is [`cache::ModelCache::load`] (or the
//! uncached [`load::load`]) with a [`load::LoadSpecification`].

pub mod builder;
pub mod cache;
pub mod clean;
pub mod geometry;
pub mod load;
pub mod material;
pub mod merge;
pub mod mesh;
pub mod model;
pub mod part;
pub mod preprocess;

pub use cache::ModelCache;
pub use clean::{clean_geometry, CleanSettings};
pub use geometry::Geometry;
pub use load::{load, LoadSpecification};
pub use material::{AlphaHint, BumpSpec, Channel, Glossiness, Material};
pub use merge::merge_meshes;
pub use mesh::{Mesh, MeshUid, Primitive};
pub use model::{GeometryId, Model, PartId};
pub use part::Part;
pub use preprocess::{run_program, Identifier, Instruction, MergeRadius};

/// Re-export commonly used items
pub mod prelude {
    pub use crate::cache::ModelCache;
    pub use crate::load::{load, LoadSpecification};
    pub use crate::model::{GeometryId, Model, PartId};
}
