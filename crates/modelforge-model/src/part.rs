//! Part: a named node in the model's rigid hierarchy

use crate::model::PartId;
use modelforge_core::math::CoordinateFrame;

/// One node of the part tree. Parts are never removed, so `PartId`
/// stays a stable index.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part name; unique within a model
    pub name: String,
    /// Parent part, `None` for roots
    pub parent: Option<PartId>,
    /// Transform relative to the parent (or the model origin)
    pub cframe: CoordinateFrame,
    /// Inverse bind pose for skinned vertices; identity when unskinned
    pub inverse_bind_pose: CoordinateFrame,
}

impl Part {
    /// Create a part at the identity frame
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<PartId>) -> Self {
        Self {
            name: name.into(),
            parent,
            cframe: CoordinateFrame::IDENTITY,
            inverse_bind_pose: CoordinateFrame::IDENTITY,
        }
    }

    /// True for parts without a parent
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
