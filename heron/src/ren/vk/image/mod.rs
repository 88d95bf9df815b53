use crate::ren::error::Result;
use crate::ren::vk::allocator::AllocatedResources;

use ash::{vk, Device as DeviceHandle};
use gpu_allocator::{vulkan as vka, MemoryLocation};

#[allow(unused)]
pub struct Image {
    pub handle: vk::Image,
    pub view: vk::ImageView,
    pub extent_3d: vk::Extent3D,
    pub extent_2d: vk::Extent2D,
    pub format: vk::Format,
}

impl Image {
    pub fn new(
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        resources: &mut AllocatedResources,
        name: &str,
        format: vk::Format,
        extent: vk::Extent3D,
        usage: vk::ImageUsageFlags,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Result<Self> {
        // A zero-sized image is an invalid construction; callers gate on the
        // drawable extent before getting here.
        assert!(
            extent.width > 0 && extent.height > 0,
            "heron::ren::vk::image - zero-sized image requested ({name})"
        );

        let image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(extent)
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage);

        let image = unsafe { device_handle.create_image(&image_create_info, None)? };
        let requirements = unsafe { device_handle.get_image_memory_requirements(image) };

        let allocation = allocator.allocate(&vka::AllocationCreateDesc {
            name,
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: vka::AllocationScheme::GpuAllocatorManaged,
        })?;

        unsafe { device_handle.bind_image_memory(image, allocation.memory(), allocation.offset())? };

        let view_create_info = vk::ImageViewCreateInfo::default()
            .view_type(vk::ImageViewType::TYPE_2D)
            .image(image)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1)
                    .aspect_mask(aspect_mask),
            );

        let view = unsafe { device_handle.create_image_view(&view_create_info, None)? };

        resources.add_image(image, view, allocation);

        let extent_2d = vk::Extent2D::default().width(extent.width).height(extent.height);

        Ok(Self { handle: image, view, extent_3d: extent, extent_2d, format })
    }
}

pub fn get_subresource_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange::default()
        .aspect_mask(aspect_mask)
        .base_mip_level(0)
        .level_count(vk::REMAINING_MIP_LEVELS)
        .base_array_layer(0)
        .layer_count(vk::REMAINING_ARRAY_LAYERS)
}

/// Blunt full-pipeline layout transition; per-stage hazards inside render
/// passes are expressed as subpass dependencies instead.
pub fn transition(
    device_handle: &DeviceHandle,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let aspect_mask = if new_layout == vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    };
    let image_barriers = [vk::ImageMemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .src_access_mask(vk::AccessFlags2::MEMORY_WRITE)
        .dst_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .dst_access_mask(vk::AccessFlags2::MEMORY_WRITE | vk::AccessFlags2::MEMORY_READ)
        .old_layout(old_layout)
        .new_layout(new_layout)
        .subresource_range(get_subresource_range(aspect_mask))
        .image(image)];

    let dependency_info = vk::DependencyInfo::default().image_memory_barriers(&image_barriers);

    unsafe { device_handle.cmd_pipeline_barrier2(command_buffer, &dependency_info) };
}

/// Write-to-read barrier between successive compute dispatches (auto-exposure
/// and the bloom chain run outside any render pass).
pub fn compute_barrier(device_handle: &DeviceHandle, command_buffer: vk::CommandBuffer) {
    let memory_barriers = [vk::MemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::COMPUTE_SHADER)
        .src_access_mask(vk::AccessFlags2::SHADER_WRITE)
        .dst_stage_mask(
            vk::PipelineStageFlags2::COMPUTE_SHADER | vk::PipelineStageFlags2::FRAGMENT_SHADER,
        )
        .dst_access_mask(vk::AccessFlags2::SHADER_READ)];

    let dependency_info = vk::DependencyInfo::default().memory_barriers(&memory_barriers);

    unsafe { device_handle.cmd_pipeline_barrier2(command_buffer, &dependency_info) };
}
