use crate::gpu::BLOOM_PUSH_CONSTANTS_SIZE;
use crate::ren::error::Result;
use crate::ren::vk::allocator::AllocatedResources;
use crate::ren::vk::descriptor::{
    DescriptorPoolRequirements, DescriptorSetLayoutBuilder, DescriptorWrite,
};
use crate::ren::vk::image::Image;
use crate::ren::vk::pass::lighting::LightingTarget;
use crate::ren::vk::pass::{shader_path, HDR_COLOR_FORMAT};
use crate::ren::vk::pipeline;

use ash::{vk, Device as DeviceHandle};
use gpu_allocator::vulkan as vka;

const BINDING_SRC: u32 = 0;
const BINDING_DST: u32 = 1;

pub const BLOOM_WORKGROUP_SIZE: u32 = 16;

/// Progressive downsample chain for the bloom contribution. Each level is
/// half the previous one; composite samples the smallest level.
pub struct BloomPipeline {
    pub set_layout: vk::DescriptorSetLayout,
    pub layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
}

impl BloomPipeline {
    pub fn new(device_handle: &DeviceHandle) -> Result<Self> {
        let set_layout = DescriptorSetLayoutBuilder::default()
            .add_binding(BINDING_SRC, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .add_binding(BINDING_DST, vk::DescriptorType::STORAGE_IMAGE)
            .build(device_handle, vk::ShaderStageFlags::COMPUTE)?;

        let push_constant_ranges = [vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::COMPUTE)
            .size(BLOOM_PUSH_CONSTANTS_SIZE)];
        let layout =
            pipeline::create_pipeline_layout(device_handle, &[set_layout], &push_constant_ranges)?;

        let shader_module =
            pipeline::load_shader_module(device_handle, &shader_path("bloom_downsample.comp.spv"))?;
        let pipeline = pipeline::create_compute_pipeline(device_handle, shader_module, layout);
        unsafe { device_handle.destroy_shader_module(shader_module, None) };

        Ok(Self {
            set_layout,
            layout,
            pipeline: pipeline?,
        })
    }

    pub fn pool_requirements(&self, image_count: u32, levels: u32) -> DescriptorPoolRequirements {
        let sets = image_count * levels;
        DescriptorPoolRequirements::new(
            sets,
            &[
                (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, sets),
                (vk::DescriptorType::STORAGE_IMAGE, sets),
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

/// Halves the extent per level, clamping to one texel; levels that would
/// degenerate past 1x1 are dropped so small drawables get shorter chains.
/// Always yields at least one level.
pub fn chain_extents(extent: vk::Extent2D, levels: u32) -> Vec<vk::Extent2D> {
    let levels = levels.max(1);
    let mut extents = Vec::with_capacity(levels as usize);
    let mut width = extent.width;
    let mut height = extent.height;
    for _level in 0..levels {
        width = (width / 2).max(1);
        height = (height / 2).max(1);
        extents.push(vk::Extent2D::default().width(width).height(height));
        if width == 1 && height == 1 {
            break;
        }
    }
    extents
}

pub struct BloomLevel {
    pub image: Image,
    pub extent: vk::Extent2D,
    pub set: vk::DescriptorSet,
}

pub struct BloomTarget {
    pub levels: Vec<BloomLevel>,
}

impl BloomTarget {
    /// `chain` comes from the generation's extent plan, one entry per level.
    pub fn new(
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        resources: &mut AllocatedResources,
        chain: &[vk::Extent2D],
        slot: usize,
    ) -> Result<Self> {
        let mut levels = Vec::new();
        for (index, &level_extent) in chain.iter().enumerate() {
            let image = Image::new(
                device_handle,
                allocator,
                resources,
                &format!("bloom_{slot}_{index}"),
                HDR_COLOR_FORMAT,
                vk::Extent3D::default()
                    .width(level_extent.width)
                    .height(level_extent.height)
                    .depth(1),
                vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::SAMPLED,
                vk::ImageAspectFlags::COLOR,
            )?;
            levels.push(BloomLevel {
                image,
                extent: level_extent,
                set: vk::DescriptorSet::null(),
            });
        }

        Ok(Self { levels })
    }

    pub fn assign_sets(&mut self, sets: &[vk::DescriptorSet]) {
        for (level, &set) in self.levels.iter_mut().zip(sets) {
            level.set = set;
        }
    }

    /// The first level reads the HDR target; every further level reads its
    /// predecessor. All chain images are written and read in GENERAL layout.
    pub fn link_lighting(
        &self,
        lighting: &LightingTarget,
        sampler: vk::Sampler,
    ) -> Vec<DescriptorWrite> {
        let mut writes = Vec::with_capacity(self.levels.len() * 2);
        for (index, level) in self.levels.iter().enumerate() {
            let (src_view, src_layout) = match index {
                0 => (lighting.image.view, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                _ => (self.levels[index - 1].image.view, vk::ImageLayout::GENERAL),
            };
            writes.push(DescriptorWrite::Images {
                set: level.set,
                binding: BINDING_SRC,
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                sampler,
                views: vec![(src_view, src_layout)],
            });
            writes.push(DescriptorWrite::Images {
                set: level.set,
                binding: BINDING_DST,
                ty: vk::DescriptorType::STORAGE_IMAGE,
                sampler: vk::Sampler::null(),
                views: vec![(level.image.view, vk::ImageLayout::GENERAL)],
            });
        }
        writes
    }

    pub fn output(&self) -> &BloomLevel {
        // chain_extents always yields at least one level
        self.levels.last().expect("bloom chain is never empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D::default().width(width).height(height)
    }

    #[test]
    fn chain_halves_per_level() {
        let extents = chain_extents(extent(1920, 1080), 3);
        assert_eq!(extents.len(), 3);
        assert_eq!((extents[0].width, extents[0].height), (960, 540));
        assert_eq!((extents[1].width, extents[1].height), (480, 270));
        assert_eq!((extents[2].width, extents[2].height), (240, 135));
    }

    #[test]
    fn chain_clamps_to_one_texel() {
        let extents = chain_extents(extent(8, 2), 5);
        assert_eq!((extents[0].width, extents[0].height), (4, 1));
        assert_eq!((extents[1].width, extents[1].height), (2, 1));
        assert_eq!((extents[2].width, extents[2].height), (1, 1));
        // truncated once fully degenerate
        assert_eq!(extents.len(), 3);
    }

    #[test]
    fn chain_always_has_at_least_one_level() {
        let extents = chain_extents(extent(1920, 1080), 0);
        assert_eq!(extents.len(), 1);
        assert_eq!((extents[0].width, extents[0].height), (960, 540));
    }

    #[test]
    fn chain_handles_non_square_extents() {
        let extents = chain_extents(extent(5, 3), 2);
        assert_eq!((extents[0].width, extents[0].height), (2, 1));
        assert_eq!((extents[1].width, extents[1].height), (1, 1));
    }
}
