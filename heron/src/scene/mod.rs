//! Scene asset loading. Decoding runs on a worker thread so the frame loop
//! never blocks on disk; the renderer polls a [`SceneSlot`] and uploads the
//! result when it turns ready.

use crate::gpu::Vertex;

use glam::{Vec2, Vec3, Vec4};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to import gltf: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("mesh '{0}' has no vertex positions")]
    MissingPositions(String),
}

/// One draw range inside a mesh's index buffer, mirroring a gltf primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Surface {
    pub start_index: u32,
    pub count: u32,
}

pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub surfaces: Vec<Surface>,
}

pub fn load_meshes(path: &Path) -> Result<Vec<MeshData>, SceneError> {
    let (document, buffers, _images) = gltf::import(path)?;

    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        let name = mesh.name().unwrap_or("unnamed").to_owned();
        let mut vertices: Vec<Vertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut surfaces: Vec<Surface> = Vec::new();

        for primitive in mesh.primitives() {
            let reader = primitive
                .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| SceneError::MissingPositions(name.clone()))?
                .collect();
            let normals: Vec<[f32; 3]> =
                reader.read_normals().map(|iter| iter.collect()).unwrap_or_default();
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|coords| coords.into_f32().collect())
                .unwrap_or_default();
            let colors: Vec<[f32; 4]> = reader
                .read_colors(0)
                .map(|colors| colors.into_rgba_f32().collect())
                .unwrap_or_default();

            let base_vertex = vertices.len() as u32;
            for (index, &position) in positions.iter().enumerate() {
                vertices.push(Vertex::new(
                    Vec3::from(position),
                    normals.get(index).copied().map(Vec3::from).unwrap_or(Vec3::Z),
                    uvs.get(index).copied().map(Vec2::from).unwrap_or(Vec2::ZERO),
                    colors.get(index).copied().map(Vec4::from).unwrap_or(Vec4::ONE),
                ));
            }

            let start_index = indices.len() as u32;
            match reader.read_indices() {
                Some(read_indices) => {
                    indices.extend(read_indices.into_u32().map(|index| index + base_vertex))
                }
                None => indices.extend(base_vertex..base_vertex + positions.len() as u32),
            }
            surfaces.push(Surface {
                start_index,
                count: indices.len() as u32 - start_index,
            });
        }

        info!(
            "loaded mesh '{name}': {} vertices, {} indices, {} surfaces",
            vertices.len(),
            indices.len(),
            surfaces.len()
        );
        meshes.push(MeshData { name, vertices, indices, surfaces });
    }

    Ok(meshes)
}

pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decodes any supported container to tightly-packed RGBA8.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, SceneError> {
    let decoded = image::load_from_memory(bytes)?.to_rgba8();
    Ok(DecodedImage {
        width: decoded.width(),
        height: decoded.height(),
        pixels: decoded.into_raw(),
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LoadStage {
    Idle = 0,
    Loading = 1,
    Ready = 2,
    Failed = 3,
}

impl LoadStage {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoadStage::Loading,
            2 => LoadStage::Ready,
            3 => LoadStage::Failed,
            _ => LoadStage::Idle,
        }
    }
}

/// Mailbox between the loader thread and the frame loop. The stage flag is
/// published last, after the payload is in place, so a `Ready` observation
/// always finds the data.
pub struct SceneSlot {
    stage: AtomicU8,
    data: Mutex<Option<Vec<MeshData>>>,
}

impl SceneSlot {
    pub fn new() -> Self {
        Self {
            stage: AtomicU8::new(LoadStage::Idle as u8),
            data: Mutex::new(None),
        }
    }

    pub fn stage(&self) -> LoadStage {
        LoadStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    /// Takes the loaded meshes once ready, resetting the slot to idle.
    pub fn take(&self) -> Option<Vec<MeshData>> {
        if self.stage() != LoadStage::Ready {
            return None;
        }
        let data = self.data.lock().ok()?.take();
        self.stage.store(LoadStage::Idle as u8, Ordering::Release);
        data
    }

    fn publish(&self, meshes: Vec<MeshData>) {
        if let Ok(mut slot) = self.data.lock() {
            *slot = Some(meshes);
        }
        self.stage.store(LoadStage::Ready as u8, Ordering::Release);
    }

    fn fail(&self) {
        self.stage.store(LoadStage::Failed as u8, Ordering::Release);
    }
}

impl Default for SceneSlot {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_async(slot: Arc<SceneSlot>, path: PathBuf) {
    slot.stage.store(LoadStage::Loading as u8, Ordering::Release);
    std::thread::spawn(move || match load_meshes(&path) {
        Ok(meshes) => slot.publish(meshes),
        Err(e) => {
            error!("scene load failed for {}: {e}", path.display());
            slot.fail();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn missing_asset_reports_failure() {
        let slot = Arc::new(SceneSlot::new());
        load_async(slot.clone(), PathBuf::from("does/not/exist.gltf"));

        let mut waited = 0;
        while slot.stage() == LoadStage::Loading && waited < 200 {
            std::thread::sleep(std::time::Duration::from_millis(10));
            waited += 1;
        }
        assert_eq!(slot.stage(), LoadStage::Failed);
        assert!(slot.take().is_none());
    }

    #[test]
    fn slot_starts_idle_and_take_resets() {
        let slot = SceneSlot::new();
        assert_eq!(slot.stage(), LoadStage::Idle);
        assert!(slot.take().is_none());

        slot.publish(vec![]);
        assert_eq!(slot.stage(), LoadStage::Ready);
        assert!(slot.take().is_some());
        assert_eq!(slot.stage(), LoadStage::Idle);
    }

    #[test]
    fn surfaces_partition_the_index_buffer_per_primitive() {
        // Two unindexed triangle primitives sharing one zeroed position
        // buffer (72 bytes, base64 of all zeroes).
        let positions = "A".repeat(96);
        let gltf = format!(
            "{{\"asset\":{{\"version\":\"2.0\"}},\
             \"buffers\":[{{\"byteLength\":72,\"uri\":\"data:application/octet-stream;base64,{positions}\"}}],\
             \"bufferViews\":[{{\"buffer\":0,\"byteOffset\":0,\"byteLength\":36}},\
             {{\"buffer\":0,\"byteOffset\":36,\"byteLength\":36}}],\
             \"accessors\":[{{\"bufferView\":0,\"componentType\":5126,\"count\":3,\"type\":\"VEC3\",\"min\":[0,0,0],\"max\":[0,0,0]}},\
             {{\"bufferView\":1,\"componentType\":5126,\"count\":3,\"type\":\"VEC3\",\"min\":[0,0,0],\"max\":[0,0,0]}}],\
             \"meshes\":[{{\"name\":\"pair\",\"primitives\":[{{\"attributes\":{{\"POSITION\":0}}}},\
             {{\"attributes\":{{\"POSITION\":1}}}}]}}]}}"
        );
        let path = std::env::temp_dir().join("heron_two_primitive_mesh.gltf");
        std::fs::write(&path, gltf).expect("write test asset");

        let meshes = load_meshes(&path).expect("load");
        let _ = std::fs::remove_file(&path);

        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(
            mesh.surfaces,
            vec![
                Surface { start_index: 0, count: 3 },
                Surface { start_index: 3, count: 3 },
            ]
        );
    }

    #[test]
    fn decode_image_round_trips_rgba() {
        let source = image::RgbaImage::from_pixel(2, 3, image::Rgba([255, 0, 128, 255]));
        let mut bytes = Vec::new();
        source
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("png encode");

        let decoded = decode_image(&bytes).expect("decode");
        assert_eq!((decoded.width, decoded.height), (2, 3));
        assert_eq!(decoded.pixels.len(), 2 * 3 * 4);
        assert_eq!(&decoded.pixels[0..4], &[255, 0, 128, 255]);
    }

    #[test]
    fn decode_image_rejects_garbage() {
        assert!(decode_image(&[0xde, 0xad, 0xbe, 0xef]).is_err());
    }
}
