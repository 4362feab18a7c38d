//! The load pipeline
//!
//! A [`LoadSpecification`] names the file and every knob the pipeline
//! honors. [`load`] runs the stages in a fixed order: parse, early
//! merge, scale, preprocess program, clean, bounds. Any failure
//! discards the partially built model; the caller never sees a
//! half-populated result.
//!
//! The same specification, serialized, is the cache key, so two loads
//! that would produce identical models share one cache entry.

use crate::builder::{build_obj, build_ply, build_tds};
use crate::clean::{clean_geometry, CleanSettings};
use crate::material::Material;
use crate::merge::merge_meshes;
use crate::model::Model;
use crate::preprocess::{run_program, scale_model, Instruction, MergeRadius};
use modelforge_core::error::{Error, Result};
use modelforge_parsers::{parse_obj, parse_ply, parse_tds, ModelFormat};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Everything that determines the outcome of one model load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadSpecification {
    /// Source file; the extension selects the parser
    pub path: PathBuf,
    /// Base for resolving relative material/texture references;
    /// defaults to the source file's directory
    pub base_path: Option<PathBuf>,
    /// Discard all parsed materials and substitute the default
    pub strip_materials: bool,
    /// Merge budget for opaque meshes, applied right after parsing
    pub mesh_merge_opaque_cluster_radius: MergeRadius,
    /// Merge budget for transmissive meshes
    pub mesh_merge_transmissive_cluster_radius: MergeRadius,
    /// Cleaning: largest smoothing angle, radians
    pub max_smooth_angle: f32,
    /// Cleaning: largest weld angle, radians
    pub max_normal_weld_angle: f32,
    /// Cleaning: resynthesize every normal
    pub force_compute_normals: bool,
    /// Cleaning: resynthesize every tangent
    pub force_compute_tangents: bool,
    /// Cleaning: weld even when nothing else changed
    pub force_vertex_merging: bool,
    /// Cleaning: master welding switch
    pub allow_vertex_merging: bool,
    /// Uniform scale applied before the preprocess program
    pub scale: f32,
    /// Whether this load may use and populate the model cache
    pub cachable: bool,
    /// Preprocess program, run in order
    pub preprocess: Vec<Instruction>,
}

impl Default for LoadSpecification {
    fn default() -> Self {
        let clean = CleanSettings::default();
        Self {
            path: PathBuf::new(),
            base_path: None,
            strip_materials: false,
            mesh_merge_opaque_cluster_radius: MergeRadius::NONE,
            mesh_merge_transmissive_cluster_radius: MergeRadius::NONE,
            max_smooth_angle: clean.max_smooth_angle,
            max_normal_weld_angle: clean.max_normal_weld_angle,
            force_compute_normals: clean.force_compute_normals,
            force_compute_tangents: clean.force_compute_tangents,
            force_vertex_merging: clean.force_vertex_merging,
            allow_vertex_merging: clean.allow_vertex_merging,
            scale: 1.0,
            cachable: true,
            preprocess: Vec::new(),
        }
    }
}

impl LoadSpecification {
    /// A specification with defaults for everything but the path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// The cleaning settings this specification asks for
    #[must_use]
    pub fn clean_settings(&self) -> CleanSettings {
        CleanSettings {
            force_vertex_merging: self.force_vertex_merging,
            allow_vertex_merging: self.allow_vertex_merging,
            force_compute_normals: self.force_compute_normals,
            force_compute_tangents: self.force_compute_tangents,
            max_normal_weld_angle: self.max_normal_weld_angle,
            max_smooth_angle: self.max_smooth_angle,
        }
    }

    /// Normalized serialization used as the cache key
    pub fn cache_key(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::internal(format!("unserializable load specification: {e}")))
    }
}

/// Load a model file through the full pipeline
pub fn load(spec: &LoadSpecification) -> Result<Model> {
    let started = Instant::now();
    let path = &spec.path;
    let format =
        ModelFormat::from_path(path).ok_or_else(|| Error::UnsupportedFormat(path.clone()))?;
    let data = map_file(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string();

    let mut model = match format {
        ModelFormat::Tds => build_tds(&parse_tds(&data)?, &name)?,
        ModelFormat::Ply => build_ply(&parse_ply(&data)?, &name)?,
        ModelFormat::Obj => {
            let text = std::str::from_utf8(&data)
                .map_err(|_| Error::invalid_data("source text is not valid UTF-8"))?;
            let base = match &spec.base_path {
                Some(base) => base.clone(),
                None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
            };
            build_obj(&parse_obj(text, &base)?, &name)?
        }
    };
    drop(data);

    if spec.strip_materials {
        strip_materials(&mut model);
    }

    let opaque = spec.mesh_merge_opaque_cluster_radius.0;
    let transmissive = spec.mesh_merge_transmissive_cluster_radius.0;
    if (opaque != 0.0 || transmissive != 0.0) && model.meshes.len() > 1 {
        model.compute_bounds();
        merge_meshes(&mut model, opaque, transmissive);
    }

    scale_model(&mut model, spec.scale);
    run_program(&mut model, &spec.preprocess)?;
    clean_geometry(&mut model, &spec.clean_settings());

    info!(
        path = %path.display(),
        parts = model.parts.len(),
        meshes = model.meshes.len(),
        vertices = model.vertex_count(),
        triangles = model.triangle_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "loaded model"
    );
    Ok(model)
}

fn map_file(path: &Path) -> Result<memmap2::Mmap> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    // Safety: the mapping is read-only and dropped before load returns
    #[allow(unsafe_code)]
    let map = unsafe { memmap2::Mmap::map(&file)? };
    Ok(map)
}

/// Replace every material with the shared default
fn strip_materials(model: &mut Model) {
    let default = Material::default_shared();
    model.materials.clear();
    model
        .materials
        .insert(default.name.clone(), default.clone());
    for mesh in &mut model.meshes {
        mesh.material = default.clone();
    }
}
