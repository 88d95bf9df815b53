use crate::gpu::{ShadowUniform, DRAW_PUSH_CONSTANTS_SIZE};
use crate::ren::error::Result;
use crate::ren::vk::allocator::AllocatedResources;
use crate::ren::vk::buffer::Buffer;
use crate::ren::vk::descriptor::{
    DescriptorPoolRequirements, DescriptorSetLayoutBuilder, DescriptorWrite,
};
use crate::ren::vk::image::Image;
use crate::ren::vk::pass::{create_framebuffer, shader_path, SHADOW_DEPTH_FORMAT};
use crate::ren::vk::pipeline::{self, GraphicsPipelineConfig};

use ash::{vk, Device as DeviceHandle};
use gpu_allocator::{vulkan as vka, MemoryLocation};

const SHADOW_UNIFORM_SIZE: u64 = size_of::<ShadowUniform>() as u64;

/// Depth-only cascade pass. Each cascade renders the scene from the light at
/// its own fixed resolution; the lighting stage samples all cascades as an
/// array of depth maps.
pub struct ShadowPipeline {
    pub set_layout: vk::DescriptorSetLayout,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub pipeline: vk::Pipeline,
}

impl ShadowPipeline {
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
            pipeline::load_shader_module(device_handle, &shader_path("shadow.vert.spv"))?;
        let pipeline = GraphicsPipelineConfig::new(vertex_shader)
            .color_attachment_count(0)
            .depth_test(vk::CompareOp::LESS_OR_EQUAL)
            .build(device_handle, layout, render_pass);
        unsafe { device_handle.destroy_shader_module(vertex_shader, None) };

        Ok(Self {
            set_layout,
            layout,
            render_pass,
            pipeline: pipeline?,
        })
    }

    pub fn pool_requirements(
        &self,
        cascade_count: u32,
        frames_in_flight: u32,
    ) -> DescriptorPoolRequirements {
        let sets = cascade_count * frames_in_flight;
        DescriptorPoolRequirements::new(sets, &[(vk::DescriptorType::UNIFORM_BUFFER, sets)])
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
        .format(SHADOW_DEPTH_FORMAT)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];

    let depth_reference = vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .depth_stencil_attachment(&depth_reference)];

    // Previous-frame lighting reads must finish before this frame's depth
    // writes, and the writes must finish before lighting samples the map.
    let dependencies = [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
            .src_access_mask(vk::AccessFlags::SHADER_READ)
            .dst_stage_mask(vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS)
            .dst_access_mask(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(vk::PipelineStageFlags::LATE_FRAGMENT_TESTS)
            .src_access_mask(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
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

pub struct ShadowCascade {
    pub image: Image,
    pub framebuffer: vk::Framebuffer,
    /// One host-visible uniform buffer per frame slot; in-flight frames must
    /// never share one, or a write for frame N races the submitted reads of
    /// frame N-1.
    pub uniforms: Vec<Buffer>,
    pub uniform_allocations: Vec<vka::Allocation>,
    pub resolution: u32,
    /// One set per frame slot, allocated from the current render-target
    /// generation's pool; reassigned on every rebuild even though the images
    /// above survive.
    pub sets: Vec<vk::DescriptorSet>,
}

/// The cascade maps and their uniforms are resolution-independent, so they
/// live outside the swapchain-tied generation and keep their own resource
/// queue for the renderer's whole lifetime.
pub struct ShadowTargets {
    pub cascades: Vec<ShadowCascade>,
    resources: AllocatedResources,
}

impl ShadowTargets {
    pub fn new(
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        resolutions: &[u32],
        render_pass: vk::RenderPass,
        frames_in_flight: u32,
    ) -> Result<Self> {
        let mut resources = AllocatedResources::new();
        let mut cascades = Vec::with_capacity(resolutions.len());

        for (index, &resolution) in resolutions.iter().enumerate() {
            let cascade = create_cascade(
                device_handle,
                allocator,
                &mut resources,
                render_pass,
                index,
                resolution,
                frames_in_flight,
            );
            match cascade {
                Ok(cascade) => cascades.push(cascade),
                Err(e) => {
                    destroy_cascades(device_handle, allocator, cascades, &mut resources);
                    return Err(e);
                }
            }
        }

        Ok(Self { cascades, resources })
    }

    /// Total descriptor sets needed per generation, one per cascade per
    /// frame slot.
    pub fn set_count(&self) -> usize {
        self.cascades.iter().map(|cascade| cascade.sets.len()).sum()
    }

    pub fn assign_sets(&mut self, sets: &[vk::DescriptorSet]) {
        let mut sets = sets.iter();
        for cascade in &mut self.cascades {
            for slot in &mut cascade.sets {
                if let Some(&set) = sets.next() {
                    *slot = set;
                }
            }
        }
    }

    pub fn bind_uniforms(&self) -> Vec<DescriptorWrite> {
        self.cascades
            .iter()
            .flat_map(|cascade| {
                cascade.sets.iter().zip(&cascade.uniforms).map(|(&set, uniform)| {
                    DescriptorWrite::Buffer {
                        set,
                        binding: 0,
                        ty: vk::DescriptorType::UNIFORM_BUFFER,
                        buffer: uniform.handle,
                        offset: 0,
                        range: SHADOW_UNIFORM_SIZE,
                    }
                })
            })
            .collect()
    }

    /// Writes this frame slot's cascade uniforms. The slot's fence has been
    /// waited on by the caller, so no submitted work reads these buffers.
    pub fn write_uniforms(&mut self, uniforms: &[ShadowUniform], slot: usize) {
        for (cascade, uniform) in self.cascades.iter_mut().zip(uniforms) {
            cascade.uniforms[slot].upload(&[*uniform], &mut cascade.uniform_allocations[slot], 0);
        }
    }

    pub fn destroy(&mut self, device_handle: &DeviceHandle, allocator: &mut vka::Allocator) {
        let cascades = std::mem::take(&mut self.cascades);
        destroy_cascades(device_handle, allocator, cascades, &mut self.resources);
    }
}

fn create_cascade(
    device_handle: &DeviceHandle,
    allocator: &mut vka::Allocator,
    resources: &mut AllocatedResources,
    render_pass: vk::RenderPass,
    index: usize,
    resolution: u32,
    frames_in_flight: u32,
) -> Result<ShadowCascade> {
    let extent = vk::Extent3D::default().width(resolution).height(resolution).depth(1);
    let image = Image::new(
        device_handle,
        allocator,
        resources,
        &format!("shadow_cascade_{index}"),
        SHADOW_DEPTH_FORMAT,
        extent,
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
        vk::ImageAspectFlags::DEPTH,
    )?;

    let framebuffer =
        create_framebuffer(device_handle, render_pass, &[image.view], image.extent_2d)?;

    let mut uniforms = Vec::with_capacity(frames_in_flight as usize);
    let mut uniform_allocations = Vec::with_capacity(frames_in_flight as usize);
    for slot in 0..frames_in_flight {
        let uniform = Buffer::create(
            device_handle,
            allocator,
            SHADOW_UNIFORM_SIZE,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            &format!("shadow_uniform_{index}_{slot}"),
            MemoryLocation::CpuToGpu,
        );
        match uniform {
            Ok((uniform, allocation)) => {
                uniforms.push(uniform);
                uniform_allocations.push(allocation);
            }
            Err(e) => {
                for (uniform, allocation) in uniforms.into_iter().zip(uniform_allocations) {
                    uniform.destroy(device_handle, allocator, allocation);
                }
                unsafe { device_handle.destroy_framebuffer(framebuffer, None) };
                return Err(e);
            }
        }
    }

    Ok(ShadowCascade {
        image,
        framebuffer,
        uniforms,
        uniform_allocations,
        resolution,
        sets: vec![vk::DescriptorSet::null(); frames_in_flight as usize],
    })
}

fn destroy_cascades(
    device_handle: &DeviceHandle,
    allocator: &mut vka::Allocator,
    cascades: Vec<ShadowCascade>,
    resources: &mut AllocatedResources,
) {
    for cascade in cascades {
        unsafe { device_handle.destroy_framebuffer(cascade.framebuffer, None) };
        for (uniform, allocation) in cascade.uniforms.into_iter().zip(cascade.uniform_allocations)
        {
            uniform.destroy(device_handle, allocator, allocation);
        }
    }
    resources.drop(device_handle, allocator);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn test_buffer(raw: u64) -> Buffer {
        Buffer {
            handle: vk::Buffer::from_raw(raw),
            size: SHADOW_UNIFORM_SIZE,
            memory: vk::DeviceMemory::null(),
            usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
            location: MemoryLocation::CpuToGpu,
            min_alignment: 16,
        }
    }

    #[test]
    fn pool_requirements_scale_with_cascades_and_frame_slots() {
        let pipeline = ShadowPipeline {
            set_layout: vk::DescriptorSetLayout::null(),
            layout: vk::PipelineLayout::null(),
            render_pass: vk::RenderPass::null(),
            pipeline: vk::Pipeline::null(),
        };

        let requirements = pipeline.pool_requirements(3, 2);
        assert_eq!(requirements.max_sets, 6);
        assert_eq!(requirements.sizes.len(), 1);
        assert_eq!(requirements.sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(requirements.sizes[0].descriptor_count, 6);
    }

    #[test]
    fn in_flight_frames_bind_distinct_uniform_buffers() {
        let extent_2d = vk::Extent2D::default().width(2048).height(2048);
        let targets = ShadowTargets {
            cascades: vec![ShadowCascade {
                image: Image {
                    handle: vk::Image::null(),
                    view: vk::ImageView::null(),
                    extent_3d: vk::Extent3D::default().width(2048).height(2048).depth(1),
                    extent_2d,
                    format: SHADOW_DEPTH_FORMAT,
                },
                framebuffer: vk::Framebuffer::null(),
                uniforms: vec![test_buffer(1), test_buffer(2)],
                uniform_allocations: vec![],
                resolution: 2048,
                sets: vec![vk::DescriptorSet::from_raw(10), vk::DescriptorSet::from_raw(20)],
            }],
            resources: AllocatedResources::new(),
        };

        let writes = targets.bind_uniforms();
        assert_eq!(writes.len(), 2);
        assert_eq!(targets.set_count(), 2);
        for (write, (expected_set, expected_buffer)) in
            writes.iter().zip([(10u64, 1u64), (20, 2)])
        {
            match write {
                DescriptorWrite::Buffer { set, buffer, range, .. } => {
                    assert_eq!(set.as_raw(), expected_set);
                    assert_eq!(buffer.as_raw(), expected_buffer);
                    assert_eq!(*range, SHADOW_UNIFORM_SIZE);
                }
                other => panic!("unexpected write variant: {other:?}"),
            }
        }
    }

    #[test]
    fn cascades_use_a_depth_only_format() {
        assert_eq!(SHADOW_DEPTH_FORMAT, vk::Format::D32_SFLOAT);
    }
}
