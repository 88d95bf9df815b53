//! Deferred pipeline stages. Each submodule pairs a `*Pipeline` (immutable
//! for the renderer's lifetime) with a `*Target` (rebuilt with the swapchain,
//! except for the fixed-resolution shadow cascades).

pub mod bloom;
pub mod composite;
pub mod exposure;
pub mod gbuffer;
pub mod lighting;
pub mod shadow;

use crate::gpu::MAX_SHADOW_CASCADES;
use crate::ren::error::Result;
use crate::ren::settings::Settings;
use crate::ren::vk::descriptor::DescriptorPoolRequirements;
use crate::ren::vk::pipeline;

use ash::{vk, Device as DeviceHandle};

pub const GBUFFER_ALBEDO_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
pub const GBUFFER_NORMAL_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;
pub const SHADOW_DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;
pub const HDR_COLOR_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;

pub const SHADER_DIR: &str = "shaders";

/// Every pipeline and the shared sampler, built once against the initial
/// swapchain format. Only the composite render pass depends on the surface
/// format, and a format change forces full renderer recreation anyway.
pub struct PipelineSet {
    pub shadow: shadow::ShadowPipeline,
    pub gbuffer: gbuffer::GbufferPipeline,
    pub lighting: lighting::LightingPipeline,
    pub exposure: exposure::ExposurePipeline,
    pub bloom: bloom::BloomPipeline,
    pub composite: composite::CompositePipeline,
    pub sampler: vk::Sampler,
}

impl PipelineSet {
    pub fn new(
        device_handle: &DeviceHandle,
        swapchain_format: vk::Format,
        settings: &Settings,
    ) -> Result<Self> {
        Ok(Self {
            shadow: shadow::ShadowPipeline::new(device_handle)?,
            gbuffer: gbuffer::GbufferPipeline::new(device_handle)?,
            lighting: lighting::LightingPipeline::new(device_handle, capped_cascades(settings))?,
            exposure: exposure::ExposurePipeline::new(device_handle)?,
            bloom: bloom::BloomPipeline::new(device_handle)?,
            composite: composite::CompositePipeline::new(device_handle, swapchain_format)?,
            sampler: pipeline::create_sampler(device_handle)?,
        })
    }

    /// Sums every stage's pool needs for one render-target generation;
    /// the shared pool is created from this and destroyed with the generation.
    pub fn pool_requirements(&self, image_count: u32, settings: &Settings) -> DescriptorPoolRequirements {
        DescriptorPoolRequirements::merge(&[
            self.shadow.pool_requirements(capped_cascades(settings), settings.buffering),
            self.gbuffer.pool_requirements(image_count),
            self.lighting.pool_requirements(image_count, capped_cascades(settings)),
            self.exposure.pool_requirements(image_count),
            self.bloom.pool_requirements(image_count, settings.bloom_downsample_levels),
            self.composite.pool_requirements(image_count),
        ])
    }

    pub fn drop(&mut self, device_handle: &DeviceHandle) {
        unsafe { device_handle.destroy_sampler(self.sampler, None) };
        self.composite.drop(device_handle);
        self.bloom.drop(device_handle);
        self.exposure.drop(device_handle);
        self.lighting.drop(device_handle);
        self.gbuffer.drop(device_handle);
        self.shadow.drop(device_handle);
    }
}

pub fn create_framebuffer(
    device_handle: &DeviceHandle,
    render_pass: vk::RenderPass,
    attachments: &[vk::ImageView],
    extent: vk::Extent2D,
) -> Result<vk::Framebuffer> {
    let create_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1);

    let framebuffer = unsafe { device_handle.create_framebuffer(&create_info, None)? };
    Ok(framebuffer)
}

pub fn shader_path(file_name: &str) -> std::path::PathBuf {
    std::path::Path::new(SHADER_DIR).join(file_name)
}

/// Cascade count bound by the lighting uniform's fixed matrix array.
pub fn capped_cascades(settings: &Settings) -> u32 {
    settings.cascade_count().min(MAX_SHADOW_CASCADES as u32)
}
