//! POD types shared between host code and the SPIR-V shader binaries. Layouts
//! here must match the shader-side declarations exactly.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

pub const MAX_SHADOW_CASCADES: usize = 4;

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position_uv_x: Vec4,
    pub normal_uv_y: Vec4,
    pub color: Vec4,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2, color: Vec4) -> Self {
        Self {
            position_uv_x: Vec4::from((position, uv.x)),
            normal_uv_y: Vec4::from((normal, uv.y)),
            color,
        }
    }
}

pub const VERTEX_SIZE: u64 = size_of::<Vertex>() as u64;

/// Per-draw push constants for the shadow and gbuffer vertex stages; vertices
/// are pulled through the buffer device address.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct DrawPushConstants {
    pub transform: Mat4,
    pub vertex_buffer_address: u64,
    pub _pad: u64,
}

impl Default for DrawPushConstants {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            vertex_buffer_address: 0,
            _pad: 0,
        }
    }
}

pub const DRAW_PUSH_CONSTANTS_SIZE: u32 = size_of::<DrawPushConstants>() as u32;

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub position: Vec4,
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
pub struct ShadowUniform {
    pub light_view_proj: Mat4,
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
pub struct LightingUniform {
    pub cascade_view_proj: [Mat4; MAX_SHADOW_CASCADES],
    pub cascade_splits: Vec4,
    pub light_direction: Vec4,
    pub light_color: Vec4,
    pub camera_position: Vec4,
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
pub struct ExposurePushConstants {
    pub min_log_luminance: f32,
    pub max_log_luminance: f32,
    pub pixel_count: u32,
    pub _pad: u32,
}

pub const EXPOSURE_PUSH_CONSTANTS_SIZE: u32 = size_of::<ExposurePushConstants>() as u32;

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
pub struct BloomPushConstants {
    pub src_width: u32,
    pub src_height: u32,
    pub dst_width: u32,
    pub dst_height: u32,
}

pub const BLOOM_PUSH_CONSTANTS_SIZE: u32 = size_of::<BloomPushConstants>() as u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_constant_blocks_fit_within_guaranteed_128_bytes() {
        assert!(DRAW_PUSH_CONSTANTS_SIZE <= 128);
        assert!(EXPOSURE_PUSH_CONSTANTS_SIZE <= 128);
        assert!(BLOOM_PUSH_CONSTANTS_SIZE <= 128);
    }

    #[test]
    fn vertex_layout_is_three_vec4s() {
        assert_eq!(VERTEX_SIZE, 48);
    }
}
