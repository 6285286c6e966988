use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use log::warn;

use crate::error::AssetError;

/// Pooled vertex layout, read by byte offset from a storage buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// One primitive's geometry before it is pooled. `material` is the
/// asset-local material index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimitiveGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

/// Reads a triangle primitive out of the asset buffers. Non-triangle
/// primitives are skipped with `Ok(None)`.
pub fn read_primitive(
    mesh: usize,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Result<Option<PrimitiveGeometry>, AssetError> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        warn!(
            "skipping primitive {} of mesh {}: mode {:?} is not triangles",
            primitive.index(),
            mesh,
            primitive.mode()
        );
        return Ok(None);
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or(AssetError::MissingAttribute {
            mesh,
            primitive: primitive.index(),
            semantic: "POSITION",
        })?
        .collect();
    let normals = reader.read_normals().map(|n| n.collect());
    let uvs = reader.read_tex_coords(0).map(|t| t.into_f32().collect());
    let indices = reader.read_indices().map(|i| i.into_u32().collect());

    let mut geometry = assemble(mesh, primitive.index(), positions, normals, uvs, indices)?;
    geometry.material = primitive.material().index();
    Ok(Some(geometry))
}

/// Builds interleaved vertices from separate attribute streams, filling in
/// whatever the asset left out: `0..n` indices, flat normals, zero UVs.
pub fn assemble(
    mesh: usize,
    primitive: usize,
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    uvs: Option<Vec<[f32; 2]>>,
    indices: Option<Vec<u32>>,
) -> Result<PrimitiveGeometry, AssetError> {
    let count = positions.len();
    let check = |attribute: &'static str, actual: usize| {
        if actual == count {
            Ok(())
        } else {
            Err(AssetError::AttributeCountMismatch {
                mesh,
                primitive,
                attribute,
                expected: count,
                actual,
            })
        }
    };

    let indices = indices.unwrap_or_else(|| (0..count as u32).collect());
    if indices.len() % 3 != 0 {
        return Err(AssetError::PartialTriangle {
            mesh,
            primitive,
            index_count: indices.len(),
        });
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= count) {
        return Err(AssetError::InvalidIndex {
            mesh,
            primitive,
            index,
            vertex_count: count,
        });
    }

    let normals = match normals {
        Some(normals) => {
            check("NORMAL", normals.len())?;
            normals
        }
        None => flat_normals(&positions, &indices),
    };
    let uvs = match uvs {
        Some(uvs) => {
            check("TEXCOORD_0", uvs.len())?;
            uvs
        }
        None => vec![[0.0; 2]; count],
    };

    let vertices = positions
        .into_iter()
        .zip(normals)
        .zip(uvs)
        .map(|((position, normal), uv)| Vertex {
            position,
            normal,
            uv,
        })
        .collect();

    Ok(PrimitiveGeometry {
        vertices,
        indices,
        material: None,
    })
}

/// Face normal per triangle, written to its three corners. Degenerate
/// triangles point up. Indices must already be in range and come in
/// whole triangles.
pub fn flat_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0; 3]; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let p0 = Vec3::from(positions[i0]);
        let cross = (Vec3::from(positions[i1]) - p0).cross(Vec3::from(positions[i2]) - p0);
        let normal = if cross.length_squared() < f32::EPSILON {
            Vec3::Y
        } else {
            cross.normalize()
        };
        for i in [i0, i1, i2] {
            normals[i] = normal.to_array();
        }
    }
    normals
}
