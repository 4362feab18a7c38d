//! Preprocessing instruction interpreter
//!
//! A preprocess program is an ordered list of tagged instructions,
//! usually authored as JSON alongside the model file. Instructions
//! address parts and meshes by an [`Identifier`]: a literal name or
//! one of the symbolic targets `root()`, `all()`, `none()`. A target
//! that fails to resolve aborts the program with the instruction's
//! index; the program is assumed correct by construction, so an
//! unresolved name is an authoring bug rather than something to skip.

use crate::material::Material;
use crate::merge::merge_meshes;
use crate::mesh::MeshUid;
use crate::model::{GeometryId, Model, PartId};
use modelforge_core::error::{Error, Result};
use modelforge_core::math::{CoordinateFrame, Mat4, Vec3, Vec4};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use tracing::debug;

/// A part or mesh target in a preprocess instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// A literal part or mesh name
    Name(String),
    /// All root parts
    Root,
    /// Every part or mesh
    All,
    /// No target; the instruction becomes a no-op
    None,
}

impl Identifier {
    fn as_str(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Root => "root()",
            Self::All => "all()",
            Self::None => "none()",
        }
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "root()" => Self::Root,
            "all()" => Self::All,
            "none()" => Self::None,
            _ => Self::Name(s),
        })
    }
}

/// A merge radius budget: a number, `"NONE"` (0), or `"ALL"` (no limit)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeRadius(pub f32);

impl MergeRadius {
    /// Merging disabled
    pub const NONE: Self = Self(0.0);
    /// No growth limit
    pub const ALL: Self = Self(f32::INFINITY);
}

impl Default for MergeRadius {
    fn default() -> Self {
        Self::NONE
    }
}

impl Serialize for MergeRadius {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        // Infinity is not representable in JSON
        if self.0 == f32::INFINITY {
            serializer.serialize_str("ALL")
        } else if self.0 == 0.0 {
            serializer.serialize_str("NONE")
        } else {
            serializer.serialize_f32(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for MergeRadius {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f32),
            Word(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Number(r) => Ok(Self(r)),
            Repr::Word(w) => match w.as_str() {
                "NONE" => Ok(Self::NONE),
                "ALL" => Ok(Self::ALL),
                _ => Err(D::Error::custom(format!("invalid merge radius '{w}'"))),
            },
        }
    }
}

fn default_true() -> bool {
    true
}

/// One preprocess instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Instruction {
    /// Uniformly scale vertex positions and all pivot translations
    Scale {
        /// Uniform scale factor
        factor: f32,
    },
    /// Translate so the world bounding-box center lands at the origin
    MoveCenterToOrigin,
    /// Translate so the bounding-box base center lands at the origin
    MoveBaseToOrigin,
    /// Replace a part's local transform
    SetCFrame {
        /// Target part(s)
        part: Identifier,
        /// New local transform
        cframe: CoordinateFrame,
    },
    /// Pre-compose a transform onto a part's local transform
    TransformCFrame {
        /// Target part(s)
        part: Identifier,
        /// Transform to compose
        transform: CoordinateFrame,
    },
    /// Bake a matrix into the geometry of a part's meshes
    TransformGeometry {
        /// Target part(s)
        part: Identifier,
        /// Matrix to bake
        transform: Mat4,
    },
    /// Rename a single part
    RenamePart {
        /// Target part; must be a literal name
        part: Identifier,
        /// New name
        name: String,
    },
    /// Rename a single mesh
    RenameMesh {
        /// Target mesh; must resolve to exactly one
        mesh: Identifier,
        /// New name
        name: String,
    },
    /// Delete meshes
    RemoveMesh {
        /// Target mesh(es)
        mesh: Identifier,
    },
    /// Flip triangle winding
    ReverseWinding {
        /// Target mesh(es)
        mesh: Identifier,
    },
    /// Replace the material on meshes
    SetMaterial {
        /// Target mesh(es)
        mesh: Identifier,
        /// Replacement material
        material: Material,
        /// Preserve each mesh's existing light-map reference
        #[serde(default = "default_true")]
        keep_light_maps: bool,
    },
    /// Set the two-sided flag on meshes
    SetTwoSided {
        /// Target mesh(es)
        mesh: Identifier,
        /// New flag value
        two_sided: bool,
    },
    /// Run the mesh merge optimizer
    MergeAll {
        /// Budget for fully opaque materials
        #[serde(default)]
        opaque_radius: MergeRadius,
        /// Budget for transmissive materials
        #[serde(default)]
        transmissive_radius: MergeRadius,
    },
}

/// Run a preprocess program in order, stopping at the first failure
pub fn run_program(model: &mut Model, program: &[Instruction]) -> Result<()> {
    for (index, instruction) in program.iter().enumerate() {
        apply(model, index, instruction)?;
    }
    Ok(())
}

fn apply(model: &mut Model, index: usize, instruction: &Instruction) -> Result<()> {
    debug!(index, ?instruction, "preprocess");
    match instruction {
        Instruction::Scale { factor } => {
            scale_model(model, *factor);
        }
        Instruction::MoveCenterToOrigin => {
            recenter(model, false);
        }
        Instruction::MoveBaseToOrigin => {
            recenter(model, true);
        }
        Instruction::SetCFrame { part, cframe } => {
            for id in resolve_parts(model, index, part)? {
                model.parts[id].cframe = *cframe;
            }
        }
        Instruction::TransformCFrame { part, transform } => {
            for id in resolve_parts(model, index, part)? {
                model.parts[id].cframe = *transform * model.parts[id].cframe;
            }
        }
        Instruction::TransformGeometry { part, transform } => {
            let targets = resolve_parts(model, index, part)?;
            bake_transform(model, &targets, transform);
        }
        Instruction::RenamePart { part, name } => {
            let Identifier::Name(old) = part else {
                return Err(Error::InvalidInstruction {
                    instruction: index,
                    message: format!("renamePart needs a literal name, not {}", part.as_str()),
                });
            };
            let id = model.part_id(old).ok_or_else(|| Error::UnresolvedTarget {
                instruction: index,
                target: old.clone(),
            })?;
            model.parts[id].name = name.clone();
        }
        Instruction::RenameMesh { mesh, name } => {
            let uids = resolve_meshes(model, index, mesh)?;
            if uids.len() != 1 {
                return Err(Error::InvalidInstruction {
                    instruction: index,
                    message: format!(
                        "renameMesh target {} resolved {} meshes, need exactly 1",
                        mesh.as_str(),
                        uids.len()
                    ),
                });
            }
            if let Some(m) = model.mesh_mut(uids[0]) {
                m.name = name.clone();
            }
        }
        Instruction::RemoveMesh { mesh } => {
            for uid in resolve_meshes(model, index, mesh)? {
                model.remove_mesh(uid);
            }
        }
        Instruction::ReverseWinding { mesh } => {
            for uid in resolve_meshes(model, index, mesh)? {
                if let Some(m) = model.mesh_mut(uid) {
                    m.reverse_winding();
                }
            }
        }
        Instruction::SetMaterial {
            mesh,
            material,
            keep_light_maps,
        } => {
            let uids = resolve_meshes(model, index, mesh)?;
            set_material(model, &uids, material, *keep_light_maps);
        }
        Instruction::SetTwoSided { mesh, two_sided } => {
            for uid in resolve_meshes(model, index, mesh)? {
                if let Some(m) = model.mesh_mut(uid) {
                    m.two_sided = *two_sided;
                }
            }
        }
        Instruction::MergeAll {
            opaque_radius,
            transmissive_radius,
        } => {
            model.compute_bounds();
            merge_meshes(model, opaque_radius.0, transmissive_radius.0);
        }
    }
    Ok(())
}

/// Part targets for an instruction. `root()` is every root, `all()`
/// every part, `none()` nothing; a literal name must resolve.
fn resolve_parts(model: &Model, index: usize, id: &Identifier) -> Result<Vec<PartId>> {
    match id {
        Identifier::Name(name) => {
            let part = model.part_id(name).ok_or_else(|| Error::UnresolvedTarget {
                instruction: index,
                target: name.clone(),
            })?;
            Ok(vec![part])
        }
        Identifier::Root => Ok(model.root_parts()),
        Identifier::All => Ok((0..model.parts.len()).collect()),
        Identifier::None => Ok(Vec::new()),
    }
}

/// Mesh targets for an instruction. `root()` is not a mesh class.
fn resolve_meshes(model: &Model, index: usize, id: &Identifier) -> Result<Vec<MeshUid>> {
    match id {
        Identifier::Name(name) => {
            let uids = model.meshes_named(name);
            if uids.is_empty() {
                return Err(Error::UnresolvedTarget {
                    instruction: index,
                    target: name.clone(),
                });
            }
            Ok(uids)
        }
        Identifier::All => Ok(model.meshes.iter().map(|m| m.uid).collect()),
        Identifier::None => Ok(Vec::new()),
        Identifier::Root => Err(Error::InvalidInstruction {
            instruction: index,
            message: "root() does not name meshes".to_string(),
        }),
    }
}

/// Scale every position and pivot translation by `factor`
pub(crate) fn scale_model(model: &mut Model, factor: f32) {
    if factor == 1.0 {
        return;
    }
    for part in &mut model.parts {
        part.cframe.translation *= factor;
        part.inverse_bind_pose.translation *= factor;
    }
    for geometry in &mut model.geometries {
        for p in &mut geometry.positions {
            *p *= factor;
        }
    }
}

/// Translate the model so its world box center (or base center) sits
/// at the origin, by baking the offset into the root parts' geometry
fn recenter(model: &mut Model, to_base: bool) {
    model.compute_bounds();
    if model.bounding_box.is_empty() {
        return;
    }
    let mut offset = -model.bounding_box.center();
    if to_base {
        offset.y += model.bounding_box.extent().y * 0.5;
    }
    let roots = model.root_parts();
    bake_transform(model, &roots, &Mat4::translation(offset));
}

/// Bake `transform` into the geometry used by each target part's
/// meshes, invalidating normals and tangents; child pivots move so
/// untouched descendants keep their placement relative to the baked
/// vertices.
fn bake_transform(model: &mut Model, targets: &[PartId], transform: &Mat4) {
    // A geometry shared between targets is transformed once
    let mut touched: Vec<GeometryId> = Vec::new();
    for &part in targets {
        let geometries: Vec<GeometryId> = model
            .meshes
            .iter()
            .filter(|m| m.part == part)
            .map(|m| m.geometry)
            .collect();
        for id in geometries {
            if touched.contains(&id) {
                continue;
            }
            touched.push(id);
            let geometry = &mut model.geometries[id];
            for p in &mut geometry.positions {
                *p = transform.transform_point(p);
            }
            for n in &mut geometry.normals {
                *n = Vec3::UNDEFINED;
            }
            for t in &mut geometry.tangents {
                *t = Vec4::UNDEFINED;
            }
        }
        for child in model.children_of(part) {
            let t = model.parts[child].cframe.translation;
            model.parts[child].cframe.translation = transform.transform_point(&t);
        }
    }
}

/// Swap the material on each mesh, optionally carrying over the light
/// map the mesh's old material referenced
fn set_material(model: &mut Model, uids: &[MeshUid], material: &Material, keep_light_maps: bool) {
    let base = Arc::new(material.clone());
    model
        .materials
        .insert(material.name.clone(), base.clone());
    for &uid in uids {
        let Some(mesh) = model.mesh_mut(uid) else { continue };
        let light_map = mesh.material.light_map.clone();
        mesh.material = match light_map {
            Some(light_map) if keep_light_maps => {
                let mut kept = material.clone();
                kept.light_map = Some(light_map);
                Arc::new(kept)
            }
            _ => base.clone(),
        };
    }
}
