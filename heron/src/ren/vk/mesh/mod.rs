use crate::gpu::{Vertex, VERTEX_SIZE};
use crate::ren::error::Result;
use crate::ren::vk::{
    allocator::AllocatedResources, buffer::Buffer, immediate::ImmediateSubmit,
};
use crate::scene::Surface;

use ash::{vk, Device as DeviceHandle};
use gpu_allocator::{vulkan as vka, MemoryLocation};

pub const INDEX_SIZE: u64 = size_of::<u32>() as u64;

/// GPU-resident mesh; vertices are read through the buffer device address
/// from push constants, indices through a regular index binding. `surfaces`
/// carries the per-primitive draw ranges over the index buffer.
pub struct Mesh {
    pub index_buffer: Buffer,
    pub vertex_buffer: Buffer,
    pub vertex_buffer_address: vk::DeviceAddress,
    pub surfaces: Vec<Surface>,
}

impl Mesh {
    pub fn new(
        device_handle: &DeviceHandle,
        allocator: &mut vka::Allocator,
        resources: &mut AllocatedResources,
        immediate: &mut ImmediateSubmit,
        indices: &[u32],
        vertices: &[Vertex],
        surfaces: &[Surface],
    ) -> Result<Self> {
        let index_buffer_size = indices.len() as u64 * INDEX_SIZE;
        let index_buffer = Buffer::new(
            device_handle,
            allocator,
            resources,
            index_buffer_size,
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            "mesh_indices",
            MemoryLocation::GpuOnly,
        )?;

        let vertex_buffer_size = vertices.len() as u64 * VERTEX_SIZE;
        let vertex_buffer = Buffer::new(
            device_handle,
            allocator,
            resources,
            vertex_buffer_size,
            vk::BufferUsageFlags::STORAGE_BUFFER
                | vk::BufferUsageFlags::TRANSFER_DST
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            "mesh_vertices",
            MemoryLocation::GpuOnly,
        )?;

        let vertex_buffer_address = unsafe {
            device_handle.get_buffer_device_address(
                &vk::BufferDeviceAddressInfo::default().buffer(vertex_buffer.handle),
            )
        };

        let (staging_buffer, mut staging_allocation) = Buffer::create(
            device_handle,
            allocator,
            index_buffer_size + vertex_buffer_size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            "mesh_staging",
            MemoryLocation::CpuToGpu,
        )?;

        let vertices_record = staging_buffer.upload(vertices, &mut staging_allocation, 0);
        staging_buffer.upload(
            indices,
            &mut staging_allocation,
            vertices_record.copy_end_offset_padded,
        );

        immediate.submit(device_handle, &|command_buffer: vk::CommandBuffer| unsafe {
            device_handle.cmd_copy_buffer(
                command_buffer,
                staging_buffer.handle,
                vertex_buffer.handle,
                &[vk::BufferCopy::default().src_offset(0).dst_offset(0).size(vertex_buffer_size)],
            );

            device_handle.cmd_copy_buffer(
                command_buffer,
                staging_buffer.handle,
                index_buffer.handle,
                &[vk::BufferCopy::default()
                    .src_offset(vertices_record.copy_end_offset_padded as u64)
                    .dst_offset(0)
                    .size(index_buffer_size)],
            );
        })?;

        staging_buffer.destroy(device_handle, allocator, staging_allocation);

        Ok(Self {
            index_buffer,
            vertex_buffer,
            vertex_buffer_address,
            surfaces: surfaces.to_vec(),
        })
    }
}
