//! Scene assets: the environment map and the walkthrough model.
//!
//! Decoding happens on worker threads through [`AssetLoader`]; importing the
//! decoded model into the scene happens on the loop.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkthrough_common::Error as CommonError;

use crate::resources::{Geometry, Material, MaterialId, ResourceRegistry};
use crate::scene::{NodeId, NodeKind, SceneGraph, Transform};
use crate::ViewerResult;

const HDR_MAGIC: [&str; 2] = ["#?RADIANCE", "#?RGBE"];
const PROXY_MARKER: &str = "PROXY";
const GLASS_MARKER: &str = "Glass";
const SKYBOX_MARKER: &str = "SkyBox";
const GLASS_OPACITY: f32 = 0.1;
const LOBBY_SHOP: &str = "LobbyShop";
const LOBBY_SHOP_DOORS: [&str; 2] = ["LobbyShop_Door__1_", "LobbyShop_Door__2_"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentMap {
    pub source: PathBuf,
    pub byte_len: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelData {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<ModelNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelNode {
    pub name: String,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub mesh: Option<MeshDesc>,
    #[serde(default)]
    pub children: Vec<ModelNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDesc {
    pub vertex_count: usize,
    pub material: MaterialDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: u32,
    #[serde(default)]
    pub map: Option<String>,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_color() -> u32 {
    0xffffff
}

fn default_opacity() -> f32 {
    1.0
}

/// Decodes assets. Called from worker threads.
pub trait AssetLoader: Send + Sync {
    fn load_environment(&self, path: &Path) -> ViewerResult<EnvironmentMap>;
    fn load_model(&self, path: &Path) -> ViewerResult<ModelData>;
}

/// Reads assets from disk. Environment maps are only header-checked; models
/// are JSON manifests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAssetLoader;

impl AssetLoader for FsAssetLoader {
    fn load_environment(&self, path: &Path) -> ViewerResult<EnvironmentMap> {
        let file = fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CommonError::not_found(format!("environment map {}", path.display()))
            }
            _ => CommonError::Io(e),
        })?;
        let byte_len = file.metadata().map_err(CommonError::Io)?.len();

        let mut header = String::new();
        BufReader::new(file)
            .read_line(&mut header)
            .map_err(CommonError::Io)?;
        if !HDR_MAGIC.iter().any(|magic| header.starts_with(magic)) {
            return Err(CommonError::unsupported(format!(
                "{} is not a Radiance HDR file",
                path.display()
            ))
            .into());
        }
        debug!("environment map {} ({} bytes)", path.display(), byte_len);
        Ok(EnvironmentMap {
            source: path.to_path_buf(),
            byte_len,
        })
    }

    fn load_model(&self, path: &Path) -> ViewerResult<ModelData> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(walkthrough_common::config::load_json(path)?),
            _ => Err(CommonError::unsupported(format!(
                "no importer for model {}",
                path.display()
            ))
            .into()),
        }
    }
}

/// Handles into the imported model.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedModel {
    pub root: NodeId,
    /// Invisible navigation mesh.
    pub proxy: Option<NodeId>,
    pub lobby_shop: Option<NodeId>,
}

/// Import `data` under the scene root and apply the walkthrough's material
/// fix-ups.
pub fn import_model(
    scene: &mut SceneGraph,
    resources: &mut ResourceRegistry,
    data: &ModelData,
) -> ImportedModel {
    let root = scene.add(scene.root(), data.name.clone(), NodeKind::Group, Transform::IDENTITY);
    let mut materials: HashMap<String, MaterialId> = HashMap::new();
    let mut meshes = Vec::new();
    for node in &data.nodes {
        import_node(scene, resources, root, node, &mut materials, &mut meshes);
    }

    let mut proxy = None;
    for &mesh in &meshes {
        let Some(node) = scene.node(mesh) else {
            continue;
        };
        if !node.name.contains(PROXY_MARKER) {
            continue;
        }
        if let NodeKind::Mesh { material, .. } = node.kind {
            if let Some(material) = resources.material_mut(material) {
                material.visible = false;
            }
        }
        proxy = Some(mesh);
    }

    for (name, id) in &materials {
        if name.contains(GLASS_MARKER) {
            if let Some(material) = resources.material_mut(*id) {
                material.opacity = GLASS_OPACITY;
                material.transparent = true;
            }
        } else if name.contains(SKYBOX_MARKER) {
            replace_with_unlit(scene, resources, &meshes, *id);
        }
    }

    let lobby_shop = place_lobby_shop(scene, root);
    info!(
        "imported model {:?}: {} meshes, {} materials",
        data.name,
        meshes.len(),
        materials.len()
    );
    ImportedModel {
        root,
        proxy,
        lobby_shop,
    }
}

fn import_node(
    scene: &mut SceneGraph,
    resources: &mut ResourceRegistry,
    parent: NodeId,
    node: &ModelNode,
    materials: &mut HashMap<String, MaterialId>,
    meshes: &mut Vec<NodeId>,
) {
    let kind = match &node.mesh {
        Some(mesh) => {
            let geometry = resources.add_geometry(Geometry::Mesh {
                vertex_count: mesh.vertex_count,
            });
            let material = *materials
                .entry(mesh.material.name.clone())
                .or_insert_with(|| resources.add_material(material_from(&mesh.material)));
            NodeKind::Mesh { geometry, material }
        }
        None => NodeKind::Group,
    };
    let is_mesh = matches!(kind, NodeKind::Mesh { .. });
    let id = scene.add(parent, node.name.clone(), kind, Transform::from_array(node.position));
    if is_mesh {
        meshes.push(id);
    }
    for child in &node.children {
        import_node(scene, resources, id, child, materials, meshes);
    }
}

fn material_from(desc: &MaterialDesc) -> Material {
    Material {
        opacity: desc.opacity,
        transparent: desc.opacity < 1.0,
        map: desc.map.clone(),
        ..Material::standard(desc.name.clone(), desc.color)
    }
}

/// Swap `old` for an unlit copy keeping its texture, then release `old`.
fn replace_with_unlit(
    scene: &mut SceneGraph,
    resources: &mut ResourceRegistry,
    meshes: &[NodeId],
    old: MaterialId,
) {
    let Some(previous) = resources.material(old).cloned() else {
        return;
    };
    let unlit = resources.add_material(Material {
        map: previous.map.clone(),
        ..Material::basic(previous.name.clone(), previous.color)
    });
    for &mesh in meshes {
        if let Some(node) = scene.node_mut(mesh) {
            if let NodeKind::Mesh { material, .. } = &mut node.kind {
                if *material == old {
                    *material = unlit;
                }
            }
        }
    }
    resources.dispose_material(old);
    debug!("material {:?} switched to unlit", previous.name);
}

fn place_lobby_shop(scene: &mut SceneGraph, model_root: NodeId) -> Option<NodeId> {
    let doors = LOBBY_SHOP_DOORS.map(|name| scene.find_in(model_root, name));
    let [Some(first), Some(second)] = doors else {
        warn!("model has no LobbyShop doors, skipping anchor");
        return None;
    };
    let midpoint = (scene.world_position(first) + scene.world_position(second)) / 2.0;
    let local = scene
        .world_matrix(model_root)
        .inverse()
        .transform_point3(midpoint);
    Some(scene.add(
        model_root,
        LOBBY_SHOP,
        NodeKind::Group,
        Transform {
            translation: local,
            ..Transform::IDENTITY
        },
    ))
}

/// World position of `id`, if it is still in the scene.
pub fn anchor_position(scene: &SceneGraph, id: NodeId) -> Option<Vec3> {
    scene.contains(id).then(|| scene.world_position(id))
}
