//! Name label: committed text rendered as a mesh that travels with the camera.
//!
//! Geometry is built off the loop. Each build is tagged with a request id and
//! only the newest request may attach; anything older is dropped on arrival.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::resources::{Geometry, GeometryId, Material, MaterialId, ResourceRegistry};
use crate::scene::{NodeId, NodeKind, SceneGraph, Transform};
use crate::{ViewerError, ViewerResult};

/// Horizontal advance per glyph, as a fraction of the glyph size.
const GLYPH_ADVANCE: f32 = 0.6;
const VERTICES_PER_GLYPH: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    pub size: f32,
    /// Extrusion depth.
    pub depth: f32,
    pub color: u32,
    /// Placement relative to the camera.
    pub offset: [f32; 3],
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            size: 0.2,
            depth: 0.02,
            color: 0xffffff,
            offset: [0.0, 2.0, -1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextGeometry {
    pub text: String,
    pub vertex_count: usize,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

/// Turns a string into renderable geometry. Runs on a worker thread.
pub trait LabelBuilder: Send + Sync {
    fn build(&self, text: &str, style: &LabelStyle) -> ViewerResult<TextGeometry>;
}

/// Builder without font data: one extruded box per visible glyph.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockTextBuilder;

impl LabelBuilder for BlockTextBuilder {
    fn build(&self, text: &str, style: &LabelStyle) -> ViewerResult<TextGeometry> {
        if style.size <= 0.0 {
            return Err(ViewerError::Label(format!("invalid glyph size {}", style.size)));
        }
        let glyphs = text.chars().filter(|c| !c.is_whitespace()).count();
        let advance = style.size * GLYPH_ADVANCE;
        Ok(TextGeometry {
            text: text.to_string(),
            vertex_count: glyphs * VERTICES_PER_GLYPH,
            width: text.chars().count() as f32 * advance,
            height: style.size,
            depth: style.depth,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelRequest {
    pub id: u64,
    pub text: String,
    pub style: LabelStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameLabel {
    pub text: String,
    pub mesh: NodeId,
    pub geometry: GeometryId,
    pub material: MaterialId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOutcome {
    Attached,
    Stale,
    Failed,
}

#[derive(Debug)]
pub struct NameLabelRenderer {
    style: LabelStyle,
    current: Option<NameLabel>,
    latest_request: Option<u64>,
    next_request: u64,
}

impl NameLabelRenderer {
    pub fn new(style: LabelStyle) -> Self {
        Self {
            style,
            current: None,
            latest_request: None,
            next_request: 0,
        }
    }

    pub fn current(&self) -> Option<&NameLabel> {
        self.current.as_ref()
    }

    /// Start a build for `text`, superseding any build still in flight.
    pub fn request(&mut self, text: impl Into<String>) -> LabelRequest {
        self.next_request += 1;
        self.latest_request = Some(self.next_request);
        LabelRequest {
            id: self.next_request,
            text: text.into(),
            style: self.style.clone(),
        }
    }

    /// Attach a finished build under `camera`, replacing the current label.
    pub fn complete(
        &mut self,
        request: u64,
        result: ViewerResult<TextGeometry>,
        scene: &mut SceneGraph,
        resources: &mut ResourceRegistry,
        camera: NodeId,
    ) -> LabelOutcome {
        if self.latest_request != Some(request) {
            info!("discarding superseded label build {}", request);
            return LabelOutcome::Stale;
        }
        self.latest_request = None;

        let geometry = match result {
            Ok(geometry) => geometry,
            Err(err) => {
                error!("label build failed: {}", err);
                return LabelOutcome::Failed;
            }
        };

        self.release(scene, resources);

        let geometry_id = resources.add_geometry(Geometry::Text {
            text: geometry.text.clone(),
            vertex_count: geometry.vertex_count,
            width: geometry.width,
        });
        let material_id = resources.add_material(Material::basic("name-label", self.style.color));
        let mesh = scene.add(
            camera,
            "name-label",
            NodeKind::Mesh {
                geometry: geometry_id,
                material: material_id,
            },
            Transform::from_array(self.style.offset),
        );
        info!("name label now shows {:?}", geometry.text);
        self.current = Some(NameLabel {
            text: geometry.text,
            mesh,
            geometry: geometry_id,
            material: material_id,
        });
        LabelOutcome::Attached
    }

    /// Detach the current label and release its geometry and material.
    pub fn release(&mut self, scene: &mut SceneGraph, resources: &mut ResourceRegistry) {
        let Some(label) = self.current.take() else {
            return;
        };
        scene.remove(label.mesh);
        resources.dispose_geometry(label.geometry);
        resources.dispose_material(label.material);
    }
}
