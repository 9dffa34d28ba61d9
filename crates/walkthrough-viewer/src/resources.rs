//! GPU-side resources referenced by scene nodes.
//!
//! Geometries and materials are owned here, not by nodes, so that releasing
//! them is an explicit, countable step.

use std::collections::HashMap;

use glam::Vec3;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u32);

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Line { points: Vec<Vec3> },
    Mesh { vertex_count: usize },
    Text { text: String, vertex_count: usize, width: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Lit by the scene environment.
    Standard,
    /// Unlit; ignores scene lighting.
    Basic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub kind: MaterialKind,
    pub color: u32,
    pub opacity: f32,
    pub transparent: bool,
    pub visible: bool,
    pub map: Option<String>,
}

impl Material {
    pub fn standard(name: impl Into<String>, color: u32) -> Self {
        Self {
            name: name.into(),
            kind: MaterialKind::Standard,
            color,
            opacity: 1.0,
            transparent: false,
            visible: true,
            map: None,
        }
    }

    pub fn basic(name: impl Into<String>, color: u32) -> Self {
        Self {
            kind: MaterialKind::Basic,
            ..Self::standard(name, color)
        }
    }
}

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    geometries: HashMap<GeometryId, Geometry>,
    materials: HashMap<MaterialId, Material>,
    next_id: u32,
    disposed_geometries: u64,
    disposed_materials: u64,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        let id = GeometryId(self.next());
        self.geometries.insert(id, geometry);
        id
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next());
        self.materials.insert(id, material);
        id
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(&id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(&id)
    }

    /// Release a geometry. Returns `false` if it was already released.
    pub fn dispose_geometry(&mut self, id: GeometryId) -> bool {
        let released = self.geometries.remove(&id).is_some();
        if released {
            self.disposed_geometries += 1;
            trace!("disposed geometry {:?}", id);
        }
        released
    }

    /// Release a material. Returns `false` if it was already released.
    pub fn dispose_material(&mut self, id: MaterialId) -> bool {
        let released = self.materials.remove(&id).is_some();
        if released {
            self.disposed_materials += 1;
            trace!("disposed material {:?}", id);
        }
        released
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn disposed_geometries(&self) -> u64 {
        self.disposed_geometries
    }

    pub fn disposed_materials(&self) -> u64 {
        self.disposed_materials
    }
}
