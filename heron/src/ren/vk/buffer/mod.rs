use crate::ren::error::Result;
use crate::ren::vk::allocator::AllocatedResources;

use ash::{vk, Device as DeviceHandle};
use gpu_allocator::{vulkan as vka, MemoryLocation};

#[allow(unused)]
pub struct Buffer {
    pub handle: vk::Buffer,
    pub size: vk::DeviceSize,
    pub memory: vk::DeviceMemory,

    pub usage: vk::BufferUsageFlags,
    pub location: MemoryLocation,
    pub min_alignment: usize,
}

impl Buffer {
    /// Creates a buffer and hands the allocation back to the caller; used for
    /// staging buffers and persistently-mapped uniform buffers whose mapped
    /// pointer must stay reachable for per-frame writes.
    pub fn create(
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        name: &str,
        location: MemoryLocation,
    ) -> Result<(Self, vka::Allocation)> {
        let create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device_handle.create_buffer(&create_info, None)? };

        let requirements = unsafe { device_handle.get_buffer_memory_requirements(buffer) };
        let allocation = allocator.allocate(&vka::AllocationCreateDesc {
            name,
            requirements,
            location,
            linear: true,
            allocation_scheme: vka::AllocationScheme::DedicatedBuffer(buffer),
        })?;

        let memory = unsafe { allocation.memory() };
        unsafe { device_handle.bind_buffer_memory(buffer, memory, 0)? };

        Ok((
            Self {
                handle: buffer,
                size,
                memory,
                usage,
                location,
                min_alignment: requirements.alignment as usize,
            },
            allocation,
        ))
    }

    /// Creates a buffer whose allocation is queued on `resources` and freed
    /// with that queue's generation.
    pub fn new(
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        resources: &mut AllocatedResources,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        name: &str,
        location: MemoryLocation,
    ) -> Result<Self> {
        let (buffer, allocation) =
            Self::create(device_handle, allocator, size, usage, name, location)?;
        resources.add_buffer(buffer.handle, allocation);
        Ok(buffer)
    }

    pub fn upload<T: Copy>(
        &self,
        src: &[T],
        dst: &mut vka::Allocation,
        start_offset: usize,
    ) -> presser::CopyRecord {
        // Failure here means the allocation is not host-mapped; that is a
        // misuse of the buffer, not a runtime condition.
        presser::copy_from_slice_to_offset_with_align(src, dst, start_offset, self.min_alignment)
            .expect("heron::ren::vk::buffer - upload into unmapped allocation")
    }

    pub fn destroy(self, device_handle: &DeviceHandle, allocator: &mut vka::Allocator, allocation: vka::Allocation) {
        unsafe { device_handle.destroy_buffer(self.handle, None) };
        let _ = allocator.free(allocation);
    }
}
