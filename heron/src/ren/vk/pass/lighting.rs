use crate::gpu::LightingUniform;
use crate::ren::error::Result;
use crate::ren::vk::allocator::AllocatedResources;
use crate::ren::vk::buffer::Buffer;
use crate::ren::vk::descriptor::{
    DescriptorPoolRequirements, DescriptorSetLayoutBuilder, DescriptorWrite,
};
use crate::ren::vk::image::Image;
use crate::ren::vk::pass::gbuffer::GbufferTarget;
use crate::ren::vk::pass::shadow::ShadowTargets;
use crate::ren::vk::pass::{create_framebuffer, shader_path, HDR_COLOR_FORMAT};
use crate::ren::vk::pipeline::{self, GraphicsPipelineConfig};

use ash::{vk, Device as DeviceHandle};
use gpu_allocator::{vulkan as vka, MemoryLocation};

const LIGHTING_UNIFORM_SIZE: u64 = size_of::<LightingUniform>() as u64;

const BINDING_UNIFORM: u32 = 0;
const BINDING_ALBEDO: u32 = 1;
const BINDING_NORMAL: u32 = 2;
const BINDING_DEPTH: u32 = 3;
const BINDING_SHADOW_MAPS: u32 = 4;

/// Fullscreen shading pass resolving the gbuffer against the directional
/// light, with cascaded shadow lookups. Renders into the HDR target that
/// exposure, bloom and composite consume.
pub struct LightingPipeline {
    pub set_layout: vk::DescriptorSetLayout,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub pipeline: vk::Pipeline,
}

impl LightingPipeline {
    pub fn new(device_handle: &DeviceHandle, cascade_count: u32) -> Result<Self> {
        let set_layout = DescriptorSetLayoutBuilder::default()
            .add_binding(BINDING_UNIFORM, vk::DescriptorType::UNIFORM_BUFFER)
            .add_binding(BINDING_ALBEDO, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .add_binding(BINDING_NORMAL, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .add_binding(BINDING_DEPTH, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .add_binding_array(
                BINDING_SHADOW_MAPS,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                cascade_count,
            )
            .build(device_handle, vk::ShaderStageFlags::FRAGMENT)?;

        let layout = pipeline::create_pipeline_layout(device_handle, &[set_layout], &[])?;

        let render_pass = create_render_pass(device_handle)?;

        let vertex_shader =
            pipeline::load_shader_module(device_handle, &shader_path("fullscreen.vert.spv"))?;
        let fragment_shader =
            match pipeline::load_shader_module(device_handle, &shader_path("lighting.frag.spv")) {
                Ok(module) => module,
                Err(e) => {
                    unsafe { device_handle.destroy_shader_module(vertex_shader, None) };
                    return Err(e);
                }
            };

        let pipeline = GraphicsPipelineConfig::new(vertex_shader)
            .fragment_shader(fragment_shader)
            .cull_mode(vk::CullModeFlags::NONE)
            .build(device_handle, layout, render_pass);
        unsafe {
            device_handle.destroy_shader_module(fragment_shader, None);
            device_handle.destroy_shader_module(vertex_shader, None);
        }

        Ok(Self {
            set_layout,
            layout,
            render_pass,
            pipeline: pipeline?,
        })
    }

    pub fn pool_requirements(
        &self,
        image_count: u32,
        cascade_count: u32,
    ) -> DescriptorPoolRequirements {
        DescriptorPoolRequirements::new(
            image_count,
            &[
                (vk::DescriptorType::UNIFORM_BUFFER, image_count),
                (
                    vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    image_count * (3 + cascade_count),
                ),
            ],
        )
    }

    pub fn drop(&mut self, device_handle: &DeviceHandle) {
        unsafe {
            device_handle.destroy_pipeline(self.pipeline, None);
            device_handle.destroy_render_pass(self.render_pass, None);
            device_handle.destroy_pipeline_layout(self.layout, None);
            device_handle.destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}

fn create_render_pass(device_handle: &DeviceHandle) -> Result<vk::RenderPass> {
    let attachments = [vk::AttachmentDescription::default()
        .format(HDR_COLOR_FORMAT)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];

    let color_references = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_references)];

    // The HDR output feeds the exposure/bloom compute dispatches as well as
    // the composite fragment stage.
    let dependencies = [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(
                vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::COMPUTE_SHADER,
            )
            .src_access_mask(vk::AccessFlags::SHADER_READ)
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .dst_stage_mask(
                vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::COMPUTE_SHADER,
            )
            .dst_access_mask(vk::AccessFlags::SHADER_READ),
    ];

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    let render_pass = unsafe { device_handle.create_render_pass(&create_info, None)? };
    Ok(render_pass)
}

pub struct LightingTarget {
    pub image: Image,
    pub framebuffer: vk::Framebuffer,
    pub uniform: Buffer,
    pub uniform_allocation: vka::Allocation,
    pub set: vk::DescriptorSet,
    pub extent: vk::Extent2D,
}

impl LightingTarget {
    pub fn new(
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        resources: &mut AllocatedResources,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
        slot: usize,
    ) -> Result<Self> {
        let extent_3d = vk::Extent3D::default().width(extent.width).height(extent.height).depth(1);

        let image = Image::new(
            device_handle,
            allocator,
            resources,
            &format!("lighting_hdr_{slot}"),
            HDR_COLOR_FORMAT,
            extent_3d,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::COLOR,
        )?;

        let framebuffer = create_framebuffer(device_handle, render_pass, &[image.view], extent)?;

        let uniform = Buffer::create(
            device_handle,
            allocator,
            LIGHTING_UNIFORM_SIZE,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            &format!("lighting_uniform_{slot}"),
            MemoryLocation::CpuToGpu,
        );
        let (uniform, uniform_allocation) = match uniform {
            Ok(pair) => pair,
            Err(e) => {
                unsafe { device_handle.destroy_framebuffer(framebuffer, None) };
                return Err(e);
            }
        };

        Ok(Self {
            image,
            framebuffer,
            uniform,
            uniform_allocation,
            set: vk::DescriptorSet::null(),
            extent,
        })
    }

    pub fn bind_uniforms(&self) -> DescriptorWrite {
        DescriptorWrite::Buffer {
            set: self.set,
            binding: BINDING_UNIFORM,
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            buffer: self.uniform.handle,
            offset: 0,
            range: LIGHTING_UNIFORM_SIZE,
        }
    }

    /// Links the matching frame slot's gbuffer attachments into this target's
    /// set. Returned writes are applied in one batch by the caller.
    pub fn link_gbuffer(&self, gbuffer: &GbufferTarget, sampler: vk::Sampler) -> Vec<DescriptorWrite> {
        let sampled = |binding: u32, view: vk::ImageView| DescriptorWrite::Images {
            set: self.set,
            binding,
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            sampler,
            views: vec![(view, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)],
        };

        vec![
            sampled(BINDING_ALBEDO, gbuffer.albedo.view),
            sampled(BINDING_NORMAL, gbuffer.normal.view),
            sampled(BINDING_DEPTH, gbuffer.depth.view),
        ]
    }

    /// Links every shadow cascade as one descriptor array.
    pub fn link_shadow(&self, shadow: &ShadowTargets, sampler: vk::Sampler) -> DescriptorWrite {
        DescriptorWrite::Images {
            set: self.set,
            binding: BINDING_SHADOW_MAPS,
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            sampler,
            views: shadow
                .cascades
                .iter()
                .map(|cascade| (cascade.image.view, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL))
                .collect(),
        }
    }

    pub fn write_uniforms(&mut self, uniform: LightingUniform) {
        self.uniform.upload(&[uniform], &mut self.uniform_allocation, 0);
    }

    pub fn destroy(self, device_handle: &DeviceHandle, allocator: &mut vka::Allocator) {
        unsafe { device_handle.destroy_framebuffer(self.framebuffer, None) };
        self.uniform.destroy(device_handle, allocator, self.uniform_allocation);
    }
}
