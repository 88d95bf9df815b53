use crate::gpu::EXPOSURE_PUSH_CONSTANTS_SIZE;
use crate::ren::error::Result;
use crate::ren::vk::allocator::AllocatedResources;
use crate::ren::vk::buffer::Buffer;
use crate::ren::vk::descriptor::{
    DescriptorPoolRequirements, DescriptorSetLayoutBuilder, DescriptorWrite,
};
use crate::ren::vk::pass::lighting::LightingTarget;
use crate::ren::vk::pass::shader_path;
use crate::ren::vk::pipeline;

use ash::{vk, Device as DeviceHandle};
use gpu_allocator::{vulkan as vka, MemoryLocation};

const BINDING_HDR: u32 = 0;
const BINDING_EXPOSURE: u32 = 1;

/// Four floats: running average luminance, current exposure, and the clamp
/// bounds mirrored for the composite stage.
pub const EXPOSURE_BUFFER_SIZE: u64 = 4 * size_of::<f32>() as u64;

pub const EXPOSURE_WORKGROUP_SIZE: u32 = 16;

/// Auto-exposure compute dispatch. Reduces the HDR target to a luminance
/// estimate in a small storage buffer that stays on the GPU; composite reads
/// it when tonemapping.
pub struct ExposurePipeline {
    pub set_layout: vk::DescriptorSetLayout,
    pub layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
}

impl ExposurePipeline {
    pub fn new(device_handle: &DeviceHandle) -> Result<Self> {
        let set_layout = DescriptorSetLayoutBuilder::default()
            .add_binding(BINDING_HDR, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .add_binding(BINDING_EXPOSURE, vk::DescriptorType::STORAGE_BUFFER)
            .build(device_handle, vk::ShaderStageFlags::COMPUTE)?;

        let push_constant_ranges = [vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::COMPUTE)
            .size(EXPOSURE_PUSH_CONSTANTS_SIZE)];
        let layout =
            pipeline::create_pipeline_layout(device_handle, &[set_layout], &push_constant_ranges)?;

        let shader_module =
            pipeline::load_shader_module(device_handle, &shader_path("exposure.comp.spv"))?;
        let pipeline = pipeline::create_compute_pipeline(device_handle, shader_module, layout);
        unsafe { device_handle.destroy_shader_module(shader_module, None) };

        Ok(Self {
            set_layout,
            layout,
            pipeline: pipeline?,
        })
    }

    pub fn pool_requirements(&self, image_count: u32) -> DescriptorPoolRequirements {
        DescriptorPoolRequirements::new(
            image_count,
            &[
                (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, image_count),
                (vk::DescriptorType::STORAGE_BUFFER, image_count),
            ],
        )
    }

    pub fn drop(&mut self, device_handle: &DeviceHandle) {
        unsafe {
            device_handle.destroy_pipeline(self.pipeline, None);
            device_handle.destroy_pipeline_layout(self.layout, None);
            device_handle.destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}

pub struct ExposureTarget {
    pub buffer: Buffer,
    pub set: vk::DescriptorSet,
}

impl ExposureTarget {
    pub fn new(
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        resources: &mut AllocatedResources,
        slot: usize,
    ) -> Result<Self> {
        let buffer = Buffer::new(
            device_handle,
            allocator,
            resources,
            EXPOSURE_BUFFER_SIZE,
            vk::BufferUsageFlags::STORAGE_BUFFER,
            &format!("exposure_{slot}"),
            MemoryLocation::GpuOnly,
        )?;

        Ok(Self { buffer, set: vk::DescriptorSet::null() })
    }

    pub fn link_lighting(
        &self,
        lighting: &LightingTarget,
        sampler: vk::Sampler,
    ) -> Vec<DescriptorWrite> {
        vec![
            DescriptorWrite::Images {
                set: self.set,
                binding: BINDING_HDR,
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                sampler,
                views: vec![(lighting.image.view, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)],
            },
            DescriptorWrite::Buffer {
                set: self.set,
                binding: BINDING_EXPOSURE,
                ty: vk::DescriptorType::STORAGE_BUFFER,
                buffer: self.buffer.handle,
                offset: 0,
                range: EXPOSURE_BUFFER_SIZE,
            },
        ]
    }
}
