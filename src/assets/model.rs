use std::collections::HashMap;

use glam::Mat4;

use super::mega_buffer::PooledPrimitive;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    pub geometry: PooledPrimitive,
    /// Index into the pool's material table.
    pub material_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelMesh {
    pub name: String,
    pub world_matrix: Mat4,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<ModelMesh>,
}

impl Model {
    pub fn primitive_count(&self) -> usize {
        self.meshes.iter().map(|m| m.primitives.len()).sum()
    }
}

/// Loaded models by name, remembering load order.
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<String, Model>,
    order: Vec<String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Returns `false` and keeps the existing entry if `model.name` is taken.
    pub fn insert(&mut self, model: Model) -> bool {
        if self.contains(&model.name) {
            return false;
        }
        self.order.push(model.name.clone());
        self.models.insert(model.name.clone(), model);
        true
    }

    /// Names in load order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Model> {
        self.order.iter().filter_map(|name| self.models.get(name))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn clear(&mut self) {
        self.models.clear();
        self.order.clear();
    }
}
