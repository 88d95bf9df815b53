use crate::ren::error::Result;
use crate::ren::vk::descriptor::{
    DescriptorPoolRequirements, DescriptorSetLayoutBuilder, DescriptorWrite,
};
use crate::ren::vk::pass::bloom::BloomTarget;
use crate::ren::vk::pass::exposure::{ExposureTarget, EXPOSURE_BUFFER_SIZE};
use crate::ren::vk::pass::lighting::LightingTarget;
use crate::ren::vk::pass::{create_framebuffer, shader_path};
use crate::ren::vk::pipeline::{self, GraphicsPipelineConfig};

use ash::{vk, Device as DeviceHandle};

const BINDING_HDR: u32 = 0;
const BINDING_BLOOM: u32 = 1;
const BINDING_EXPOSURE: u32 = 2;

/// Final tonemapping pass: exposure-scaled HDR plus the bloom contribution,
/// drawn straight into the swapchain image and left ready to present.
pub struct CompositePipeline {
    pub set_layout: vk::DescriptorSetLayout,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub pipeline: vk::Pipeline,
}

impl CompositePipeline {
    pub fn new(device_handle: &DeviceHandle, swapchain_format: vk::Format) -> Result<Self> {
        let set_layout = DescriptorSetLayoutBuilder::default()
            .add_binding(BINDING_HDR, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .add_binding(BINDING_BLOOM, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .add_binding(BINDING_EXPOSURE, vk::DescriptorType::STORAGE_BUFFER)
            .build(device_handle, vk::ShaderStageFlags::FRAGMENT)?;

        let layout = pipeline::create_pipeline_layout(device_handle, &[set_layout], &[])?;

        let render_pass = create_render_pass(device_handle, swapchain_format)?;

        let vertex_shader =
            pipeline::load_shader_module(device_handle, &shader_path("fullscreen.vert.spv"))?;
        let fragment_shader =
            match pipeline::load_shader_module(device_handle, &shader_path("composite.frag.spv")) {
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

    pub fn pool_requirements(&self, image_count: u32) -> DescriptorPoolRequirements {
        DescriptorPoolRequirements::new(
            image_count,
            &[
                (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, image_count * 2),
                (vk::DescriptorType::STORAGE_BUFFER, image_count),
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

fn create_render_pass(
    device_handle: &DeviceHandle,
    swapchain_format: vk::Format,
) -> Result<vk::RenderPass> {
    let attachments = [vk::AttachmentDescription::default()
        .format(swapchain_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)];

    let color_references = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_references)];

    let dependencies = [vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)];

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    let render_pass = unsafe { device_handle.create_render_pass(&create_info, None)? };
    Ok(render_pass)
}

/// One composite target per swapchain image; the framebuffer wraps the
/// swapchain image view, so the whole target is generation-scoped.
pub struct CompositeTarget {
    pub framebuffer: vk::Framebuffer,
    pub set: vk::DescriptorSet,
    pub extent: vk::Extent2D,
}

impl CompositeTarget {
    pub fn new(
        device_handle: &DeviceHandle,
        render_pass: vk::RenderPass,
        swapchain_view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let framebuffer = create_framebuffer(device_handle, render_pass, &[swapchain_view], extent)?;
        Ok(Self { framebuffer, set: vk::DescriptorSet::null(), extent })
    }

    pub fn link_lighting(&self, lighting: &LightingTarget, sampler: vk::Sampler) -> DescriptorWrite {
        DescriptorWrite::Images {
            set: self.set,
            binding: BINDING_HDR,
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            sampler,
            views: vec![(lighting.image.view, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)],
        }
    }

    pub fn link_bloom(&self, bloom: &BloomTarget, sampler: vk::Sampler) -> DescriptorWrite {
        DescriptorWrite::Images {
            set: self.set,
            binding: BINDING_BLOOM,
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            sampler,
            views: vec![(bloom.output().image.view, vk::ImageLayout::GENERAL)],
        }
    }

    pub fn link_exposure(&self, exposure: &ExposureTarget) -> DescriptorWrite {
        DescriptorWrite::Buffer {
            set: self.set,
            binding: BINDING_EXPOSURE,
            ty: vk::DescriptorType::STORAGE_BUFFER,
            buffer: exposure.buffer.handle,
            offset: 0,
            range: EXPOSURE_BUFFER_SIZE,
        }
    }

    pub fn destroy(self, device_handle: &DeviceHandle) {
        unsafe { device_handle.destroy_framebuffer(self.framebuffer, None) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ren::vk::buffer::Buffer;
    use crate::ren::vk::image::Image;
    use crate::ren::vk::pass::bloom::{BloomLevel, BloomTarget};
    use gpu_allocator::MemoryLocation;

    fn composite_target() -> CompositeTarget {
        CompositeTarget {
            framebuffer: vk::Framebuffer::null(),
            set: vk::DescriptorSet::null(),
            extent: vk::Extent2D::default().width(640).height(480),
        }
    }

    fn exposure_target() -> ExposureTarget {
        ExposureTarget {
            buffer: Buffer {
                handle: vk::Buffer::null(),
                size: EXPOSURE_BUFFER_SIZE,
                memory: vk::DeviceMemory::null(),
                usage: vk::BufferUsageFlags::STORAGE_BUFFER,
                location: MemoryLocation::GpuOnly,
                min_alignment: 16,
            },
            set: vk::DescriptorSet::null(),
        }
    }

    fn bloom_target() -> BloomTarget {
        let extent = vk::Extent2D::default().width(320).height(240);
        BloomTarget {
            levels: vec![BloomLevel {
                image: Image {
                    handle: vk::Image::null(),
                    view: vk::ImageView::null(),
                    extent_3d: vk::Extent3D::default().width(320).height(240).depth(1),
                    extent_2d: extent,
                    format: vk::Format::R16G16B16A16_SFLOAT,
                },
                extent,
                set: vk::DescriptorSet::null(),
            }],
        }
    }

    #[test]
    fn exposure_link_targets_the_storage_buffer_binding() {
        let composite = composite_target();
        let exposure = exposure_target();

        let write = composite.link_exposure(&exposure);
        assert_eq!(
            write,
            DescriptorWrite::Buffer {
                set: composite.set,
                binding: BINDING_EXPOSURE,
                ty: vk::DescriptorType::STORAGE_BUFFER,
                buffer: exposure.buffer.handle,
                offset: 0,
                range: EXPOSURE_BUFFER_SIZE,
            }
        );
    }

    #[test]
    fn link_planning_is_deterministic_and_idempotent() {
        let composite = composite_target();
        let exposure = exposure_target();
        let bloom = bloom_target();
        let sampler = vk::Sampler::null();

        assert_eq!(composite.link_exposure(&exposure), composite.link_exposure(&exposure));
        assert_eq!(
            composite.link_bloom(&bloom, sampler),
            composite.link_bloom(&bloom, sampler)
        );
    }

    #[test]
    fn bloom_link_samples_the_last_chain_level() {
        let composite = composite_target();
        let bloom = bloom_target();

        match composite.link_bloom(&bloom, vk::Sampler::null()) {
            DescriptorWrite::Images { binding, ty, views, .. } => {
                assert_eq!(binding, BINDING_BLOOM);
                assert_eq!(ty, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
                assert_eq!(views, vec![(bloom.output().image.view, vk::ImageLayout::GENERAL)]);
            }
            other => panic!("unexpected write variant: {other:?}"),
        }
    }
}
