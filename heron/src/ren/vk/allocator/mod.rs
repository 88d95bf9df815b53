use crate::ren::error::Result;

use ash::{vk, Device as DeviceHandle, Instance as InstanceHandle};
use gpu_allocator::vulkan as vka;
use std::collections::VecDeque;

/// Deferred-destruction queue for GPU resources that share one lifetime.
/// Each render-target generation (and the resolution-independent shadow set)
/// owns its own queue, so a whole generation is torn down in one call.
pub struct AllocatedResources {
    pub images: VecDeque<(vk::Image, vk::ImageView, vka::Allocation)>,
    pub buffers: VecDeque<(vk::Buffer, vka::Allocation)>,
}

impl AllocatedResources {
    pub fn new() -> Self {
        Self {
            images: VecDeque::new(),
            buffers: VecDeque::new(),
        }
    }

    pub fn add_image(&mut self, image: vk::Image, view: vk::ImageView, allocation: vka::Allocation) {
        self.images.push_back((image, view, allocation));
    }

    pub fn add_buffer(&mut self, buffer: vk::Buffer, allocation: vka::Allocation) {
        self.buffers.push_back((buffer, allocation));
    }

    pub fn drop(&mut self, device_handle: &DeviceHandle, allocator: &mut vka::Allocator) {
        while let Some((image, view, allocation)) = self.images.pop_front() {
            unsafe {
                device_handle.destroy_image_view(view, None);
                device_handle.destroy_image(image, None);
            }
            let _ = allocator.free(allocation);
        }
        while let Some((buffer, allocation)) = self.buffers.pop_front() {
            unsafe { device_handle.destroy_buffer(buffer, None) };
            let _ = allocator.free(allocation);
        }
    }
}

pub struct ResourceAllocator {
    pub handle: vka::Allocator,
    pub global_resources: AllocatedResources,
    pub min_alignment: usize,
}

impl ResourceAllocator {
    pub fn new(
        instance: InstanceHandle,
        device: DeviceHandle,
        physical_device: vk::PhysicalDevice,
        min_alignment: usize,
    ) -> Result<Self> {
        let handle = vka::Allocator::new(&vka::AllocatorCreateDesc {
            instance,
            device,
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: true,
            allocation_sizes: Default::default(),
        })?;

        Ok(Self {
            handle,
            global_resources: AllocatedResources::new(),
            min_alignment,
        })
    }

    pub fn drop(&mut self, device_handle: &DeviceHandle) {
        self.global_resources.drop(device_handle, &mut self.handle);
        #[cfg(feature = "debug")]
        self.handle.report_memory_leaks(log::Level::Error);
    }
}
