use crate::ren::error::Result;
use crate::ren::vk::device::{config::QueueFamilyType, Device};

use ash::{vk, Device as DeviceHandle};

/// Per-frame-slot command recording and synchronization state. The sync
/// primitives survive swapchain recreation; only image-dependent resources
/// are rebuilt.
pub struct Frame {
    pub command_pool: vk::CommandPool,
    pub command_buffer: vk::CommandBuffer,

    /// Signaled by acquire, waited by the submit at color-attachment-output.
    pub acquire_semaphore: vk::Semaphore,
    /// Signaled by the submit, waited by present.
    pub render_semaphore: vk::Semaphore,
    /// In-flight fence bounding the CPU to `buffering` frames ahead.
    pub render_fence: vk::Fence,
}

impl Frame {
    pub fn new(device: &Device) -> Result<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(device.queue_families.get_family_index(QueueFamilyType::Graphics));

        let command_pool = unsafe { device.handle.create_command_pool(&pool_create_info, None)? };

        let buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .command_buffer_count(1)
            .level(vk::CommandBufferLevel::PRIMARY);

        let command_buffers =
            unsafe { device.handle.allocate_command_buffers(&buffer_allocate_info)? };

        Ok(Self {
            command_pool,
            command_buffer: command_buffers[0],
            acquire_semaphore: create_semaphore(&device.handle)?,
            render_semaphore: create_semaphore(&device.handle)?,
            render_fence: create_fence(&device.handle, vk::FenceCreateFlags::SIGNALED)?,
        })
    }

    pub fn generator(device: &Device, buffering: u32) -> Result<Vec<Frame>> {
        (0..buffering).map(|_index| Frame::new(device)).collect()
    }

    pub fn drop(&mut self, device_handle: &DeviceHandle) {
        unsafe {
            device_handle.destroy_command_pool(self.command_pool, None);
            device_handle.destroy_fence(self.render_fence, None);
            device_handle.destroy_semaphore(self.render_semaphore, None);
            device_handle.destroy_semaphore(self.acquire_semaphore, None);
        }
    }
}

fn create_semaphore(device_handle: &DeviceHandle) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = unsafe { device_handle.create_semaphore(&create_info, None)? };
    Ok(semaphore)
}

fn create_fence(device_handle: &DeviceHandle, flags: vk::FenceCreateFlags) -> Result<vk::Fence> {
    let create_info = vk::FenceCreateInfo::default().flags(flags);
    let fence = unsafe { device_handle.create_fence(&create_info, None)? };
    Ok(fence)
}

pub fn get_submit_info<'a>(
    command_buffer_infos: &'a [vk::CommandBufferSubmitInfo<'a>],
    wait_semaphore_infos: &'a [vk::SemaphoreSubmitInfo<'a>],
    signal_semaphore_infos: &'a [vk::SemaphoreSubmitInfo<'a>],
) -> vk::SubmitInfo2<'a> {
    vk::SubmitInfo2::default()
        .command_buffer_infos(command_buffer_infos)
        .wait_semaphore_infos(wait_semaphore_infos)
        .signal_semaphore_infos(signal_semaphore_infos)
}
