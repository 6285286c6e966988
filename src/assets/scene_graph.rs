use glam::{Mat4, Quat, Vec3};
use log::warn;

use crate::error::AssetError;

/// A node's transform relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalTransform {
    /// `rotation` is a quaternion in `[x, y, z, w]` order.
    Decomposed {
        translation: [f32; 3],
        rotation: [f32; 4],
        scale: [f32; 3],
    },
    /// Column-major.
    Matrix([[f32; 4]; 4]),
}

impl Default for LocalTransform {
    fn default() -> Self {
        LocalTransform::Matrix(Mat4::IDENTITY.to_cols_array_2d())
    }
}

impl LocalTransform {
    pub fn from_gltf(transform: gltf::scene::Transform) -> Self {
        match transform {
            gltf::scene::Transform::Matrix { matrix } => LocalTransform::Matrix(matrix),
            gltf::scene::Transform::Decomposed {
                translation,
                rotation,
                scale,
            } => LocalTransform::Decomposed {
                translation,
                rotation,
                scale,
            },
        }
    }

    /// `T * R * S` for the decomposed form.
    pub fn to_mat4(&self) -> Mat4 {
        match *self {
            LocalTransform::Matrix(matrix) => Mat4::from_cols_array_2d(&matrix),
            LocalTransform::Decomposed {
                translation,
                rotation: [x, y, z, w],
                scale,
            } => Mat4::from_scale_rotation_translation(
                Vec3::from(scale),
                Quat::from_xyzw(x, y, z, w),
                Vec3::from(translation),
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    pub transform: LocalTransform,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
}

impl SceneNode {
    pub fn from_gltf(node: &gltf::Node) -> Self {
        Self {
            transform: LocalTransform::from_gltf(node.transform()),
            children: node.children().map(|c| c.index()).collect(),
            mesh: node.mesh().map(|m| m.index()),
        }
    }
}

/// One visit of a mesh-bearing node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInstance {
    pub node: usize,
    pub mesh: usize,
    pub world: Mat4,
}

/// Walks the node graph from `roots` and returns every mesh-bearing node
/// with its world transform, in pre-order.
///
/// A node reachable along several paths is visited once per path. A cycle
/// is detected once the walk is deeper than there are nodes.
pub fn flatten(roots: &[usize], nodes: &[SceneNode]) -> Result<Vec<MeshInstance>, AssetError> {
    let mut instances = Vec::new();
    let mut stack: Vec<(usize, Mat4, usize)> = roots
        .iter()
        .rev()
        .map(|&root| (root, Mat4::IDENTITY, 0))
        .collect();

    while let Some((index, parent, depth)) = stack.pop() {
        if depth >= nodes.len() {
            return Err(AssetError::CyclicSceneGraph { node: index });
        }
        let Some(node) = nodes.get(index) else {
            warn!("skipping reference to missing node {}", index);
            continue;
        };
        let world = parent * node.transform.to_mat4();
        if let Some(mesh) = node.mesh {
            instances.push(MeshInstance {
                node: index,
                mesh,
                world,
            });
        }
        stack.extend(node.children.iter().rev().map(|&child| (child, world, depth + 1)));
    }

    Ok(instances)
}
