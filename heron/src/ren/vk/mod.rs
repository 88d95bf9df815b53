pub mod allocator;
pub mod buffer;
pub mod descriptor;
pub mod device;
pub mod frame;
pub mod image;
pub mod immediate;
pub mod instance;
pub mod mesh;
pub mod pass;
pub mod pipeline;
pub mod surface;
pub mod swapchain;
pub mod targets;

use crate::gpu::{
    BloomPushConstants, CameraUniform, DrawPushConstants, ExposurePushConstants, LightingUniform,
    ShadowUniform, MAX_SHADOW_CASCADES,
};
use crate::info::Info;
use crate::ren::error::{RenError, Result};
use crate::ren::settings::{Resolution, Settings};
use crate::ren::window::Window;
use crate::scene::MeshData;

use allocator::ResourceAllocator;
use device::{config::QueueFamilyType, Device};
use frame::Frame;
use immediate::ImmediateSubmit;
use instance::Instance;
use mesh::Mesh;
use pass::PipelineSet;
use pass::shadow::ShadowTargets;
use surface::Surface;
use swapchain::{SurfaceSupport, Swapchain};
use targets::RenderTargetSet;

use ash::{vk, Entry};
use glam::{Mat4, Vec3, Vec4};
use log::{info, warn};
use std::mem::ManuallyDrop;

const FENCE_TIMEOUT_NS: u64 = 10_000_000_000;
const ACQUIRE_TIMEOUT_NS: u64 = 10_000_000_000;

const CASCADE_HALF_EXTENTS: [f32; MAX_SHADOW_CASCADES] = [8.0, 20.0, 50.0, 120.0];
const CASCADE_SPLITS: [f32; MAX_SHADOW_CASCADES] = [15.0, 40.0, 90.0, 200.0];
const LIGHT_DIRECTION: Vec3 = Vec3::new(-0.4, -1.0, -0.3);

pub type OverlayHook = Box<dyn FnMut(vk::CommandBuffer)>;

pub struct Renderer {
    settings: Settings,

    #[allow(unused)]
    entry: Entry,
    instance: Instance,
    surface: Surface,
    device: Device,
    swapchain: Swapchain,
    surface_support: SurfaceSupport,
    allocator: ManuallyDrop<ResourceAllocator>,
    immediate: ImmediateSubmit,

    pipelines: PipelineSet,
    shadow_targets: ShadowTargets,
    /// None between a deferred rebuild (minimized window) and the next
    /// successful one.
    targets: Option<RenderTargetSet>,

    frames: Vec<Frame>,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    frame_count: u64,
    rebuild_pending: bool,

    meshes: Vec<Mesh>,
    overlay: Option<OverlayHook>,
}

impl Renderer {
    pub fn new(info: &Info, settings: Settings, window: &Window) -> Result<Self> {
        let entry = unsafe { Entry::load()? };
        let instance = Instance::new(&entry, info)?;
        let surface = Surface::new(&entry, &instance.handle, window)?;
        let device = Device::new(&instance.handle, &surface)?;
        let (swapchain, surface_support) =
            Swapchain::new(&instance, &device, &surface, &settings.resolution)?;

        let limits =
            unsafe { instance.handle.get_physical_device_properties(device.physical_device) }
                .limits;
        let mut allocator = ResourceAllocator::new(
            instance.handle.clone(),
            device.handle.clone(),
            device.physical_device,
            limits.min_uniform_buffer_offset_alignment as usize,
        )?;

        let immediate = ImmediateSubmit::new(&device)?;
        let pipelines = PipelineSet::new(&device.handle, swapchain.format, &settings)?;

        let plan = targets::target_extents(swapchain.extent, &settings);
        let mut shadow_targets = ShadowTargets::new(
            &device.handle,
            &mut allocator.handle,
            &plan.shadow,
            pipelines.shadow.render_pass,
            settings.buffering,
        )?;

        let targets = RenderTargetSet::new(
            &device.handle,
            &mut allocator.handle,
            &pipelines,
            &settings,
            &swapchain,
            &mut shadow_targets,
        )?;
        targets.link_all(&device.handle, &shadow_targets, pipelines.sampler);

        let frames = Frame::generator(&device, settings.buffering)?;
        let graphics_queue = device.get_queue(QueueFamilyType::Graphics);
        let present_queue = device.get_queue(QueueFamilyType::Present);

        info!(
            "renderer ready: {} frame slots, {} swapchain images, {} shadow cascades",
            frames.len(),
            swapchain.image_count(),
            shadow_targets.cascades.len()
        );

        Ok(Self {
            settings,
            entry,
            instance,
            surface,
            device,
            swapchain,
            surface_support,
            allocator: ManuallyDrop::new(allocator),
            immediate,
            pipelines,
            shadow_targets,
            targets: Some(targets),
            frames,
            graphics_queue,
            present_queue,
            frame_count: 0,
            rebuild_pending: false,
            meshes: Vec::new(),
            overlay: None,
        })
    }

    pub fn set_overlay(&mut self, overlay: OverlayHook) {
        self.overlay = Some(overlay);
    }

    /// Marks the surface resources stale; the next `draw` rebuilds them
    /// against `resolution` before rendering.
    pub fn schedule_rebuild(&mut self, resolution: Resolution) {
        self.settings.resolution = resolution;
        self.rebuild_pending = true;
    }

    pub fn upload_scene(&mut self, meshes: &[MeshData]) -> Result<()> {
        let ResourceAllocator { handle: allocator, global_resources, .. } = &mut *self.allocator;
        for data in meshes {
            let mesh = Mesh::new(
                &self.device.handle,
                allocator,
                global_resources,
                &mut self.immediate,
                &data.indices,
                &data.vertices,
                &data.surfaces,
            )?;
            info!("uploaded mesh '{}' ({} indices)", data.name, data.indices.len());
            self.meshes.push(mesh);
        }
        Ok(())
    }

    /// Renders and presents one frame. `drawable` is the window's current
    /// drawable size; a zero extent defers all work until the window comes
    /// back. Out-of-date surfaces are rebuilt and retried up to the settings
    /// limit before the surface is declared unavailable.
    pub fn draw(&mut self, drawable: Resolution) -> Result<()> {
        if self.rebuild_pending || self.targets.is_none() {
            if !self.rebuild_surface_resources(drawable)? {
                return Ok(());
            }
        }

        let slot = (self.frame_count % self.frames.len() as u64) as usize;
        let (command_buffer, acquire_semaphore, render_semaphore, render_fence) = {
            let frame = &self.frames[slot];
            (
                frame.command_buffer,
                frame.acquire_semaphore,
                frame.render_semaphore,
                frame.render_fence,
            )
        };

        unsafe {
            match self.device.handle.wait_for_fences(&[render_fence], true, FENCE_TIMEOUT_NS) {
                Ok(()) => {}
                Err(vk::Result::TIMEOUT) => return Err(RenError::GpuTimeout),
                Err(e) => return Err(e.into()),
            }
        }

        let mut attempts = 0;
        let image_index = loop {
            let acquired = unsafe {
                self.swapchain.device.acquire_next_image(
                    self.swapchain.khr,
                    ACQUIRE_TIMEOUT_NS,
                    acquire_semaphore,
                    vk::Fence::null(),
                )
            };
            match acquired {
                Ok((index, suboptimal)) => {
                    if suboptimal {
                        self.rebuild_pending = true;
                    }
                    break index;
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    attempts += 1;
                    if attempts >= self.settings.rebuild_attempt_limit {
                        return Err(RenError::SurfaceUnavailable(attempts));
                    }
                    warn!("acquire reported out-of-date surface, rebuilding (attempt {attempts})");
                    if !self.rebuild_surface_resources(drawable)? {
                        return Ok(());
                    }
                }
                Err(vk::Result::TIMEOUT) => return Err(RenError::GpuTimeout),
                Err(e) => return Err(e.into()),
            }
        };

        // The fence is only reset once a submit is guaranteed to re-signal it.
        unsafe { self.device.handle.reset_fences(&[render_fence])? };

        self.update_uniforms(image_index as usize, slot);

        unsafe {
            self.device
                .handle
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device.handle.begin_command_buffer(command_buffer, &begin_info)?;
        }

        self.record_frame(command_buffer, image_index as usize, slot);

        unsafe { self.device.handle.end_command_buffer(command_buffer)? };

        let command_buffer_infos =
            [vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer)];
        let wait_semaphore_infos = [vk::SemaphoreSubmitInfo::default()
            .semaphore(acquire_semaphore)
            .stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)];
        let signal_semaphore_infos = [vk::SemaphoreSubmitInfo::default()
            .semaphore(render_semaphore)
            .stage_mask(vk::PipelineStageFlags2::ALL_GRAPHICS)];
        let submit_infos = [frame::get_submit_info(
            &command_buffer_infos,
            &wait_semaphore_infos,
            &signal_semaphore_infos,
        )];

        unsafe {
            self.device.handle.queue_submit2(self.graphics_queue, &submit_infos, render_fence)?
        };

        let swapchains = [self.swapchain.khr];
        let image_indices = [image_index];
        let wait_semaphores = [render_semaphore];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.swapchain.device.queue_present(self.present_queue, &present_info) } {
            Ok(false) => {}
            Ok(true) => self.rebuild_pending = true,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) | Err(vk::Result::SUBOPTIMAL_KHR) => {
                self.rebuild_pending = true
            }
            Err(e) => return Err(e.into()),
        }

        self.frame_count += 1;
        Ok(())
    }

    /// Tears down the swapchain-sized generation and builds a new one.
    /// Returns `Ok(false)` when the drawable area is zero and the rebuild was
    /// deferred; the caller simply skips the frame.
    fn rebuild_surface_resources(&mut self, drawable: Resolution) -> Result<bool> {
        if drawable.is_zero() {
            self.rebuild_pending = true;
            return Ok(false);
        }

        unsafe { self.device.handle.device_wait_idle()? };

        if let Some(mut targets) = self.targets.take() {
            targets.destroy(&self.device.handle, &mut self.allocator.handle);
        }

        self.surface_support =
            swapchain::query_surface_support(self.device.physical_device, &self.surface)?;
        if swapchain::select_swapchain_extent(&self.surface_support.capabilities, &drawable)
            .is_none()
        {
            // The surface itself reports a zero extent; stay deferred.
            self.rebuild_pending = true;
            return Ok(false);
        }

        self.settings.resolution = drawable;
        self.swapchain.recreate(&self.device, &self.surface, &self.surface_support, &drawable)?;

        let targets = RenderTargetSet::new(
            &self.device.handle,
            &mut self.allocator.handle,
            &self.pipelines,
            &self.settings,
            &self.swapchain,
            &mut self.shadow_targets,
        )?;
        targets.link_all(&self.device.handle, &self.shadow_targets, self.pipelines.sampler);
        self.targets = Some(targets);
        self.rebuild_pending = false;
        Ok(true)
    }

    /// `image_slot` picks the swapchain-image-scoped uniforms; `frame_slot`
    /// picks the fence-guarded shadow uniforms.
    fn update_uniforms(&mut self, image_slot: usize, frame_slot: usize) {
        let Some(targets) = self.targets.as_mut() else { return };
        let extent = targets.extent;
        let time = self.frame_count as f32 * 0.008;

        let eye = Vec3::new(6.0 * time.cos(), 3.0, 6.0 * time.sin());
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let aspect = extent.width as f32 / extent.height as f32;
        let mut proj = Mat4::perspective_rh(60f32.to_radians(), aspect, 0.1, 250.0);
        // Vulkan clip space has Y pointing down.
        proj.y_axis.y *= -1.0;

        targets.gbuffer[image_slot].write_camera(CameraUniform {
            view,
            proj,
            view_proj: proj * view,
            position: Vec4::from((eye, 1.0)),
        });

        let light_direction = LIGHT_DIRECTION.normalize();
        let light_view = Mat4::look_at_rh(-light_direction * 100.0, Vec3::ZERO, Vec3::Y);

        let cascade_count = self.shadow_targets.cascades.len();
        let mut shadow_uniforms = Vec::with_capacity(cascade_count);
        let mut cascade_view_proj = [Mat4::IDENTITY; MAX_SHADOW_CASCADES];
        for cascade in 0..cascade_count {
            let half = CASCADE_HALF_EXTENTS[cascade];
            let light_proj = Mat4::orthographic_rh(-half, half, -half, half, 0.1, 200.0);
            let view_proj = light_proj * light_view;
            cascade_view_proj[cascade] = view_proj;
            shadow_uniforms.push(ShadowUniform { light_view_proj: view_proj });
        }
        self.shadow_targets.write_uniforms(&shadow_uniforms, frame_slot);

        targets.lighting[image_slot].write_uniforms(LightingUniform {
            cascade_view_proj,
            cascade_splits: Vec4::from_array(CASCADE_SPLITS),
            light_direction: Vec4::from((light_direction, 0.0)),
            light_color: Vec4::new(1.0, 0.96, 0.9, 1.0),
            camera_position: Vec4::from((eye, 1.0)),
        });
    }

    fn record_frame(&mut self, command_buffer: vk::CommandBuffer, image_slot: usize, frame_slot: usize) {
        let Some(targets) = self.targets.as_ref() else { return };
        let device_handle = &self.device.handle;

        // Shadow cascades
        for cascade in &self.shadow_targets.cascades {
            let extent =
                vk::Extent2D::default().width(cascade.resolution).height(cascade.resolution);
            let clear_values = [depth_clear_value()];
            let begin_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.pipelines.shadow.render_pass)
                .framebuffer(cascade.framebuffer)
                .render_area(vk::Rect2D::default().extent(extent))
                .clear_values(&clear_values);

            unsafe {
                device_handle.cmd_begin_render_pass(
                    command_buffer,
                    &begin_info,
                    vk::SubpassContents::INLINE,
                );
                device_handle.cmd_bind_pipeline(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipelines.shadow.pipeline,
                );
                device_handle.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipelines.shadow.layout,
                    0,
                    &[cascade.sets[frame_slot]],
                    &[],
                );
            }
            set_viewport_scissor(device_handle, command_buffer, extent);
            draw_meshes(
                device_handle,
                command_buffer,
                self.pipelines.shadow.layout,
                &self.meshes,
            );
            unsafe { device_handle.cmd_end_render_pass(command_buffer) };
        }

        // Geometry
        let gbuffer = &targets.gbuffer[image_slot];
        {
            let clear_values = [
                color_clear_value(0.0, 0.0, 0.0, 0.0),
                color_clear_value(0.0, 0.0, 0.0, 0.0),
                depth_clear_value(),
            ];
            let begin_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.pipelines.gbuffer.render_pass)
                .framebuffer(gbuffer.framebuffer)
                .render_area(vk::Rect2D::default().extent(gbuffer.extent))
                .clear_values(&clear_values);

            unsafe {
                device_handle.cmd_begin_render_pass(
                    command_buffer,
                    &begin_info,
                    vk::SubpassContents::INLINE,
                );
                device_handle.cmd_bind_pipeline(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipelines.gbuffer.pipeline,
                );
                device_handle.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipelines.gbuffer.layout,
                    0,
                    &[gbuffer.set],
                    &[],
                );
            }
            set_viewport_scissor(device_handle, command_buffer, gbuffer.extent);
            draw_meshes(
                device_handle,
                command_buffer,
                self.pipelines.gbuffer.layout,
                &self.meshes,
            );
            unsafe { device_handle.cmd_end_render_pass(command_buffer) };
        }

        // Lighting
        let lighting = &targets.lighting[image_slot];
        {
            let clear_values = [color_clear_value(0.0, 0.0, 0.0, 1.0)];
            let begin_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.pipelines.lighting.render_pass)
                .framebuffer(lighting.framebuffer)
                .render_area(vk::Rect2D::default().extent(lighting.extent))
                .clear_values(&clear_values);

            unsafe {
                device_handle.cmd_begin_render_pass(
                    command_buffer,
                    &begin_info,
                    vk::SubpassContents::INLINE,
                );
                device_handle.cmd_bind_pipeline(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipelines.lighting.pipeline,
                );
                device_handle.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipelines.lighting.layout,
                    0,
                    &[lighting.set],
                    &[],
                );
            }
            set_viewport_scissor(device_handle, command_buffer, lighting.extent);
            unsafe {
                device_handle.cmd_draw(command_buffer, 3, 1, 0, 0);
                device_handle.cmd_end_render_pass(command_buffer);
            }
        }

        // Auto exposure
        let exposure = &targets.exposure[image_slot];
        {
            let (min_luminance, max_luminance) = self.settings.exposure_bounds;
            let push = ExposurePushConstants {
                min_log_luminance: min_luminance.ln(),
                max_log_luminance: max_luminance.ln(),
                pixel_count: lighting.extent.width * lighting.extent.height,
                _pad: 0,
            };
            unsafe {
                device_handle.cmd_bind_pipeline(
                    command_buffer,
                    vk::PipelineBindPoint::COMPUTE,
                    self.pipelines.exposure.pipeline,
                );
                device_handle.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::COMPUTE,
                    self.pipelines.exposure.layout,
                    0,
                    &[exposure.set],
                    &[],
                );
                device_handle.cmd_push_constants(
                    command_buffer,
                    self.pipelines.exposure.layout,
                    vk::ShaderStageFlags::COMPUTE,
                    0,
                    bytemuck::bytes_of(&push),
                );
                device_handle.cmd_dispatch(
                    command_buffer,
                    dispatch_groups(lighting.extent.width, pass::exposure::EXPOSURE_WORKGROUP_SIZE),
                    dispatch_groups(lighting.extent.height, pass::exposure::EXPOSURE_WORKGROUP_SIZE),
                    1,
                );
            }
            image::compute_barrier(device_handle, command_buffer);
        }

        // Bloom downsample chain
        let bloom = &targets.bloom[image_slot];
        {
            let mut src_extent = lighting.extent;
            for level in &bloom.levels {
                image::transition(
                    device_handle,
                    command_buffer,
                    level.image.handle,
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::GENERAL,
                );

                let push = BloomPushConstants {
                    src_width: src_extent.width,
                    src_height: src_extent.height,
                    dst_width: level.extent.width,
                    dst_height: level.extent.height,
                };
                unsafe {
                    device_handle.cmd_bind_pipeline(
                        command_buffer,
                        vk::PipelineBindPoint::COMPUTE,
                        self.pipelines.bloom.pipeline,
                    );
                    device_handle.cmd_bind_descriptor_sets(
                        command_buffer,
                        vk::PipelineBindPoint::COMPUTE,
                        self.pipelines.bloom.layout,
                        0,
                        &[level.set],
                        &[],
                    );
                    device_handle.cmd_push_constants(
                        command_buffer,
                        self.pipelines.bloom.layout,
                        vk::ShaderStageFlags::COMPUTE,
                        0,
                        bytemuck::bytes_of(&push),
                    );
                    device_handle.cmd_dispatch(
                        command_buffer,
                        dispatch_groups(level.extent.width, pass::bloom::BLOOM_WORKGROUP_SIZE),
                        dispatch_groups(level.extent.height, pass::bloom::BLOOM_WORKGROUP_SIZE),
                        1,
                    );
                }
                image::compute_barrier(device_handle, command_buffer);
                src_extent = level.extent;
            }
        }

        // Composite to the swapchain
        let composite = &targets.composite[image_slot];
        {
            let clear_values = [color_clear_value(0.0, 0.0, 0.0, 1.0)];
            let begin_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.pipelines.composite.render_pass)
                .framebuffer(composite.framebuffer)
                .render_area(vk::Rect2D::default().extent(composite.extent))
                .clear_values(&clear_values);

            unsafe {
                device_handle.cmd_begin_render_pass(
                    command_buffer,
                    &begin_info,
                    vk::SubpassContents::INLINE,
                );
                device_handle.cmd_bind_pipeline(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipelines.composite.pipeline,
                );
                device_handle.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipelines.composite.layout,
                    0,
                    &[composite.set],
                    &[],
                );
            }
            set_viewport_scissor(device_handle, command_buffer, composite.extent);
            unsafe { device_handle.cmd_draw(command_buffer, 3, 1, 0, 0) };

            if let Some(overlay) = self.overlay.as_mut() {
                overlay(command_buffer);
            }

            unsafe { device_handle.cmd_end_render_pass(command_buffer) };
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = unsafe { self.device.handle.device_wait_idle() };

        for frame in &mut self.frames {
            frame.drop(&self.device.handle);
        }
        if let Some(mut targets) = self.targets.take() {
            targets.destroy(&self.device.handle, &mut self.allocator.handle);
        }
        let Self { shadow_targets, device, allocator, .. } = self;
        shadow_targets.destroy(&device.handle, &mut allocator.handle);
        self.pipelines.drop(&self.device.handle);
        self.immediate.drop(&self.device.handle);
        self.swapchain.drop(&self.device.handle);
        self.allocator.drop(&self.device.handle);
        // The allocator's backing state must go before the device it wraps.
        unsafe { ManuallyDrop::drop(&mut self.allocator) };
        self.device.drop();
        self.surface.drop();
        self.instance.drop();
    }
}

fn set_viewport_scissor(
    device_handle: &ash::Device,
    command_buffer: vk::CommandBuffer,
    extent: vk::Extent2D,
) {
    let viewport = vk::Viewport::default()
        .width(extent.width as f32)
        .height(extent.height as f32)
        .max_depth(1.0);
    let scissor = vk::Rect2D::default().extent(extent);
    unsafe {
        device_handle.cmd_set_viewport(command_buffer, 0, &[viewport]);
        device_handle.cmd_set_scissor(command_buffer, 0, &[scissor]);
    }
}

fn draw_meshes(
    device_handle: &ash::Device,
    command_buffer: vk::CommandBuffer,
    layout: vk::PipelineLayout,
    meshes: &[Mesh],
) {
    for mesh in meshes {
        let push = DrawPushConstants {
            transform: Mat4::IDENTITY,
            vertex_buffer_address: mesh.vertex_buffer_address,
            _pad: 0,
        };
        unsafe {
            device_handle.cmd_push_constants(
                command_buffer,
                layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::bytes_of(&push),
            );
            device_handle.cmd_bind_index_buffer(
                command_buffer,
                mesh.index_buffer.handle,
                0,
                vk::IndexType::UINT32,
            );
            // One draw per gltf primitive range.
            for surface in &mesh.surfaces {
                device_handle.cmd_draw_indexed(
                    command_buffer,
                    surface.count,
                    1,
                    surface.start_index,
                    0,
                    0,
                );
            }
        }
    }
}

fn dispatch_groups(size: u32, workgroup: u32) -> u32 {
    size.div_ceil(workgroup)
}

fn color_clear_value(r: f32, g: f32, b: f32, a: f32) -> vk::ClearValue {
    vk::ClearValue { color: vk::ClearColorValue { float32: [r, g, b, a] } }
}

fn depth_clear_value() -> vk::ClearValue {
    vk::ClearValue {
        depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_groups_round_up() {
        assert_eq!(dispatch_groups(1920, 16), 120);
        assert_eq!(dispatch_groups(1921, 16), 121);
        assert_eq!(dispatch_groups(1, 16), 1);
    }
}
