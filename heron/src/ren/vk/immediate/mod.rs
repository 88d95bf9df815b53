use crate::ren::error::{RenError, Result};
use crate::ren::vk::device::{config::QueueFamilyType, Device};

use ash::{vk, Device as DeviceHandle};

const SUBMIT_TIMEOUT_NS: u64 = 10_000_000_000;

/// One-shot command submission for uploads outside the frame loop; blocks
/// until the work completes. Coarse, but asset upload is off the critical
/// frame path.
pub struct ImmediateSubmit {
    pub command_pool: vk::CommandPool,
    pub command_buffer: vk::CommandBuffer,
    pub fence: vk::Fence,
    queue: vk::Queue,
}

impl ImmediateSubmit {
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

        let fence_create_info = vk::FenceCreateInfo::default();
        let fence = unsafe { device.handle.create_fence(&fence_create_info, None)? };

        Ok(Self {
            command_pool,
            command_buffer: command_buffers[0],
            fence,
            queue: device.get_queue(QueueFamilyType::Graphics),
        })
    }

    pub fn submit(
        &mut self,
        device_handle: &DeviceHandle,
        record: &dyn Fn(vk::CommandBuffer),
    ) -> Result<()> {
        unsafe {
            device_handle
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device_handle.begin_command_buffer(self.command_buffer, &begin_info)?;

            record(self.command_buffer);

            device_handle.end_command_buffer(self.command_buffer)?;

            let command_buffer_infos =
                [vk::CommandBufferSubmitInfo::default().command_buffer(self.command_buffer)];
            let submit_info =
                [vk::SubmitInfo2::default().command_buffer_infos(&command_buffer_infos)];
            device_handle.queue_submit2(self.queue, &submit_info, self.fence)?;

            match device_handle.wait_for_fences(&[self.fence], true, SUBMIT_TIMEOUT_NS) {
                Ok(()) => {}
                Err(vk::Result::TIMEOUT) => return Err(RenError::GpuTimeout),
                Err(e) => return Err(e.into()),
            }
            device_handle.reset_fences(&[self.fence])?;
        }
        Ok(())
    }

    pub fn drop(&mut self, device_handle: &DeviceHandle) {
        unsafe {
            device_handle.destroy_fence(self.fence, None);
            device_handle.destroy_command_pool(self.command_pool, None);
        }
    }
}
