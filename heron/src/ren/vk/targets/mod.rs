use crate::gpu::MAX_SHADOW_CASCADES;
use crate::ren::error::Result;
use crate::ren::settings::Settings;
use crate::ren::vk::allocator::AllocatedResources;
use crate::ren::vk::descriptor::{self, DescriptorWrite};
use crate::ren::vk::pass::{
    bloom::{self, BloomTarget},
    composite::CompositeTarget,
    exposure::ExposureTarget,
    gbuffer::GbufferTarget,
    lighting::LightingTarget,
    shadow::ShadowTargets,
    PipelineSet,
};
use crate::ren::vk::swapchain::Swapchain;

use ash::{vk, Device as DeviceHandle};
use gpu_allocator::vulkan as vka;

/// Per-stage extents for one generation. Gbuffer, lighting and composite all
/// track the drawable size; the bloom chain halves off it; shadow cascade
/// resolutions come from configuration alone, capped by the lighting
/// uniform's fixed matrix array, and are untouched by a resize.
pub struct TargetExtents {
    pub surface: vk::Extent2D,
    pub bloom: Vec<vk::Extent2D>,
    pub shadow: Vec<u32>,
}

pub fn target_extents(swapchain_extent: vk::Extent2D, settings: &Settings) -> TargetExtents {
    TargetExtents {
        surface: swapchain_extent,
        bloom: bloom::chain_extents(swapchain_extent, settings.bloom_downsample_levels),
        shadow: settings.shadow.resolutions.iter().copied().take(MAX_SHADOW_CASCADES).collect(),
    }
}

/// One generation of swapchain-sized render targets: every per-slot target,
/// the descriptor pool they allocate from, and the deferred-destruction queue
/// for their GPU memory. A swapchain rebuild destroys the whole generation
/// and builds a fresh one; construction is all-or-nothing so a failure cannot
/// leak a half-built generation.
pub struct RenderTargetSet {
    pub pool: vk::DescriptorPool,
    pub gbuffer: Vec<GbufferTarget>,
    pub lighting: Vec<LightingTarget>,
    pub exposure: Vec<ExposureTarget>,
    pub bloom: Vec<BloomTarget>,
    pub composite: Vec<CompositeTarget>,
    pub extent: vk::Extent2D,
    resources: AllocatedResources,
}

impl RenderTargetSet {
    /// The shadow targets outlive generations, but their descriptor sets are
    /// allocated from this generation's pool and reassigned here.
    pub fn new(
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        pipelines: &PipelineSet,
        settings: &Settings,
        swapchain: &Swapchain,
        shadow: &mut ShadowTargets,
    ) -> Result<Self> {
        let image_count = swapchain.image_views.len() as u32;
        let requirements = pipelines.pool_requirements(image_count, settings);
        let pool = descriptor::create_pool(device_handle, &requirements)?;
        let plan = target_extents(swapchain.extent, settings);

        let mut targets = Self {
            pool,
            gbuffer: vec![],
            lighting: vec![],
            exposure: vec![],
            bloom: vec![],
            composite: vec![],
            extent: plan.surface,
            resources: AllocatedResources::new(),
        };

        match targets.build(device_handle, allocator, pipelines, &plan, swapchain, shadow) {
            Ok(()) => Ok(targets),
            Err(e) => {
                targets.destroy(device_handle, allocator);
                Err(e)
            }
        }
    }

    fn build(
        &mut self,
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        pipelines: &PipelineSet,
        plan: &TargetExtents,
        swapchain: &Swapchain,
        shadow: &mut ShadowTargets,
    ) -> Result<()> {
        let image_count = swapchain.image_views.len();

        let shadow_sets = descriptor::allocate_sets(
            device_handle,
            self.pool,
            &vec![pipelines.shadow.set_layout; shadow.set_count()],
        )?;
        shadow.assign_sets(&shadow_sets);

        let gbuffer_sets = descriptor::allocate_sets(
            device_handle,
            self.pool,
            &vec![pipelines.gbuffer.set_layout; image_count],
        )?;
        let lighting_sets = descriptor::allocate_sets(
            device_handle,
            self.pool,
            &vec![pipelines.lighting.set_layout; image_count],
        )?;
        let exposure_sets = descriptor::allocate_sets(
            device_handle,
            self.pool,
            &vec![pipelines.exposure.set_layout; image_count],
        )?;
        let composite_sets = descriptor::allocate_sets(
            device_handle,
            self.pool,
            &vec![pipelines.composite.set_layout; image_count],
        )?;

        for slot in 0..image_count {
            let mut gbuffer = GbufferTarget::new(
                device_handle,
                allocator,
                &mut self.resources,
                pipelines.gbuffer.render_pass,
                self.extent,
                slot,
            )?;
            gbuffer.set = gbuffer_sets[slot];
            self.gbuffer.push(gbuffer);

            let mut lighting = LightingTarget::new(
                device_handle,
                allocator,
                &mut self.resources,
                pipelines.lighting.render_pass,
                self.extent,
                slot,
            )?;
            lighting.set = lighting_sets[slot];
            self.lighting.push(lighting);

            let mut exposure =
                ExposureTarget::new(device_handle, allocator, &mut self.resources, slot)?;
            exposure.set = exposure_sets[slot];
            self.exposure.push(exposure);

            let mut bloom = BloomTarget::new(
                device_handle,
                allocator,
                &mut self.resources,
                &plan.bloom,
                slot,
            )?;
            let bloom_sets = descriptor::allocate_sets(
                device_handle,
                self.pool,
                &vec![pipelines.bloom.set_layout; bloom.levels.len()],
            )?;
            bloom.assign_sets(&bloom_sets);
            self.bloom.push(bloom);

            let mut composite = CompositeTarget::new(
                device_handle,
                pipelines.composite.render_pass,
                swapchain.image_views[slot],
                self.extent,
            )?;
            composite.set = composite_sets[slot];
            self.composite.push(composite);
        }

        Ok(())
    }

    /// Wires the cross-stage descriptor links for every frame slot. The
    /// shadow uniform binds are slot-independent and go out first; each
    /// slot's web of links is then applied as a single batch.
    pub fn link_all(
        &self,
        device_handle: &DeviceHandle,
        shadow: &ShadowTargets,
        sampler: vk::Sampler,
    ) {
        descriptor::apply_writes(device_handle, &shadow.bind_uniforms());

        for slot in 0..self.gbuffer.len() {
            let gbuffer = &self.gbuffer[slot];
            let lighting = &self.lighting[slot];
            let exposure = &self.exposure[slot];
            let bloom = &self.bloom[slot];
            let composite = &self.composite[slot];

            let mut writes: Vec<DescriptorWrite> = vec![gbuffer.bind_camera()];
            writes.push(lighting.bind_uniforms());
            writes.extend(lighting.link_gbuffer(gbuffer, sampler));
            writes.push(lighting.link_shadow(shadow, sampler));
            writes.extend(exposure.link_lighting(lighting, sampler));
            writes.extend(bloom.link_lighting(lighting, sampler));
            writes.push(composite.link_lighting(lighting, sampler));
            writes.push(composite.link_bloom(bloom, sampler));
            writes.push(composite.link_exposure(exposure));

            descriptor::apply_writes(device_handle, &writes);
        }
    }

    pub fn destroy(&mut self, device_handle: &DeviceHandle, allocator: &mut vka::Allocator) {
        for composite in self.composite.drain(..) {
            composite.destroy(device_handle);
        }
        for lighting in self.lighting.drain(..) {
            lighting.destroy(device_handle, allocator);
        }
        for gbuffer in self.gbuffer.drain(..) {
            gbuffer.destroy(device_handle, allocator);
        }
        self.exposure.clear();
        self.bloom.clear();
        self.resources.drop(device_handle, allocator);
        unsafe { device_handle.destroy_descriptor_pool(self.pool, None) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D::default().width(width).height(height)
    }

    #[test]
    fn resize_changes_surface_extents_but_not_shadow_resolutions() {
        let settings = Settings::default();
        let before = target_extents(extent(1920, 1080), &settings);
        let after = target_extents(extent(640, 360), &settings);

        assert_eq!(before.shadow, vec![2048, 1536, 1024]);
        assert_eq!(after.shadow, before.shadow);

        assert_eq!(before.surface, extent(1920, 1080));
        assert_eq!(after.surface, extent(640, 360));
        assert_eq!(before.bloom[0], extent(960, 540));
        assert_eq!(after.bloom[0], extent(320, 180));
    }

    #[test]
    fn shadow_resolutions_are_capped_by_the_uniform_array() {
        let mut settings = Settings::default();
        settings.shadow.resolutions = vec![4096, 2048, 1024, 512, 256, 128];

        let plan = target_extents(extent(1920, 1080), &settings);
        assert_eq!(plan.shadow, vec![4096, 2048, 1024, 512]);
    }
}
