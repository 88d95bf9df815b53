use crate::gpu::{CameraUniform, DRAW_PUSH_CONSTANTS_SIZE};
use crate::ren::error::Result;
use crate::ren::vk::allocator::AllocatedResources;
use crate::ren::vk::buffer::Buffer;
use crate::ren::vk::descriptor::{
    DescriptorPoolRequirements, DescriptorSetLayoutBuilder, DescriptorWrite,
};
use crate::ren::vk::image::Image;
use crate::ren::vk::pass::{
    create_framebuffer, shader_path, DEPTH_FORMAT, GBUFFER_ALBEDO_FORMAT, GBUFFER_NORMAL_FORMAT,
};
use crate::ren::vk::pipeline::{self, GraphicsPipelineConfig};

use ash::{vk, Device as DeviceHandle};
use gpu_allocator::{vulkan as vka, MemoryLocation};

const CAMERA_UNIFORM_SIZE: u64 = size_of::<CameraUniform>() as u64;

/// Geometry pass writing albedo, world-space normals and depth. All three
/// attachments leave the pass shader-readable for the lighting stage.
pub struct GbufferPipeline {
    pub set_layout: vk::DescriptorSetLayout,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub pipeline: vk::Pipeline,
}

impl GbufferPipeline {
    pub fn new(device_handle: &DeviceHandle) -> Result<Self> {
        let set_layout = DescriptorSetLayoutBuilder::default()
            .add_binding(0, vk::DescriptorType::UNIFORM_BUFFER)
            .build(device_handle, vk::ShaderStageFlags::VERTEX)?;

        let push_constant_ranges = [vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::VERTEX)
            .size(DRAW_PUSH_CONSTANTS_SIZE)];
        let layout =
            pipeline::create_pipeline_layout(device_handle, &[set_layout], &push_constant_ranges)?;

        let render_pass = create_render_pass(device_handle)?;

        let vertex_shader =
            pipeline::load_shader_module(device_handle, &shader_path("gbuffer.vert.spv"))?;
        let fragment_shader =
            match pipeline::load_shader_module(device_handle, &shader_path("gbuffer.frag.spv")) {
                Ok(module) => module,
                Err(e) => {
                    unsafe { device_handle.destroy_shader_module(vertex_shader, None) };
                    return Err(e);
                }
            };

        let pipeline = GraphicsPipelineConfig::new(vertex_shader)
            .fragment_shader(fragment_shader)
            .color_attachment_count(2)
            .depth_test(vk::CompareOp::LESS_OR_EQUAL)
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

    pub fn pool_requirements(&self, image_count: u32) -> DescriptorPoolRequirements {
        DescriptorPoolRequirements::new(
            image_count,
            &[(vk::DescriptorType::UNIFORM_BUFFER, image_count)],
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
    let color_attachment = |format: vk::Format| {
        vk::AttachmentDescription::default()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
    };

    let attachments = [
        color_attachment(GBUFFER_ALBEDO_FORMAT),
        color_attachment(GBUFFER_NORMAL_FORMAT),
        vk::AttachmentDescription::default()
            .format(DEPTH_FORMAT)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
    ];

    let color_references = [
        vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        vk::AttachmentReference::default()
            .attachment(1)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
    ];
    let depth_reference = vk::AttachmentReference::default()
        .attachment(2)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_references)
        .depth_stencil_attachment(&depth_reference)];

    let dependencies = [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
            .src_access_mask(vk::AccessFlags::SHADER_READ)
            .dst_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            )
            .src_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
            .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
            .dst_access_mask(vk::AccessFlags::SHADER_READ),
    ];

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    let render_pass = unsafe { device_handle.create_render_pass(&create_info, None)? };
    Ok(render_pass)
}

/// One geometry target per swapchain image, sized to the drawable extent.
pub struct GbufferTarget {
    pub albedo: Image,
    pub normal: Image,
    pub depth: Image,
    pub framebuffer: vk::Framebuffer,
    pub camera_uniform: Buffer,
    pub camera_allocation: vka::Allocation,
    pub set: vk::DescriptorSet,
    pub extent: vk::Extent2D,
}

impl GbufferTarget {
    pub fn new(
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        resources: &mut AllocatedResources,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
        slot: usize,
    ) -> Result<Self> {
        let extent_3d = vk::Extent3D::default().width(extent.width).height(extent.height).depth(1);

        let albedo = Image::new(
            device_handle,
            allocator,
            resources,
            &format!("gbuffer_albedo_{slot}"),
            GBUFFER_ALBEDO_FORMAT,
            extent_3d,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::COLOR,
        )?;
        let normal = Image::new(
            device_handle,
            allocator,
            resources,
            &format!("gbuffer_normal_{slot}"),
            GBUFFER_NORMAL_FORMAT,
            extent_3d,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::COLOR,
        )?;
        let depth = Image::new(
            device_handle,
            allocator,
            resources,
            &format!("gbuffer_depth_{slot}"),
            DEPTH_FORMAT,
            extent_3d,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::DEPTH,
        )?;

        let framebuffer = create_framebuffer(
            device_handle,
            render_pass,
            &[albedo.view, normal.view, depth.view],
            extent,
        )?;

        let camera = Buffer::create(
            device_handle,
            allocator,
            CAMERA_UNIFORM_SIZE,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            &format!("camera_uniform_{slot}"),
            MemoryLocation::CpuToGpu,
        );
        let (camera_uniform, camera_allocation) = match camera {
            Ok(pair) => pair,
            Err(e) => {
                unsafe { device_handle.destroy_framebuffer(framebuffer, None) };
                return Err(e);
            }
        };

        Ok(Self {
            albedo,
            normal,
            depth,
            framebuffer,
            camera_uniform,
            camera_allocation,
            set: vk::DescriptorSet::null(),
            extent,
        })
    }

    pub fn bind_camera(&self) -> DescriptorWrite {
        DescriptorWrite::Buffer {
            set: self.set,
            binding: 0,
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            buffer: self.camera_uniform.handle,
            offset: 0,
            range: CAMERA_UNIFORM_SIZE,
        }
    }

    pub fn write_camera(&mut self, uniform: CameraUniform) {
        self.camera_uniform.upload(&[uniform], &mut self.camera_allocation, 0);
    }

    pub fn destroy(self, device_handle: &DeviceHandle, allocator: &mut vka::Allocator) {
        unsafe { device_handle.destroy_framebuffer(self.framebuffer, None) };
        self.camera_uniform.destroy(device_handle, allocator, self.camera_allocation);
    }
}
