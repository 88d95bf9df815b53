use crate::ren::error::Result;

use ash::{vk, Device as DeviceHandle};

pub struct DescriptorSetLayoutBuilder<'a> {
    pub bindings: Vec<vk::DescriptorSetLayoutBinding<'a>>,
}

impl DescriptorSetLayoutBuilder<'_> {
    pub fn default() -> Self {
        Self { bindings: vec![] }
    }

    pub fn add_binding(self, binding: u32, descriptor_type: vk::DescriptorType) -> Self {
        self.add_binding_array(binding, descriptor_type, 1)
    }

    pub fn add_binding_array(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        count: u32,
    ) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding)
                .descriptor_count(count)
                .descriptor_type(descriptor_type),
        );
        self
    }

    pub fn build(
        &mut self,
        device_handle: &DeviceHandle,
        shader_stages: vk::ShaderStageFlags,
    ) -> Result<vk::DescriptorSetLayout> {
        self.bindings
            .iter_mut()
            .for_each(|binding| binding.stage_flags |= shader_stages);

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&self.bindings);

        let layout = unsafe { device_handle.create_descriptor_set_layout(&create_info, None)? };
        Ok(layout)
    }
}

/// Pool sizing declared by each pipeline; the render-target set sums these
/// across all stages before creating the one shared pool per generation.
#[derive(Clone, Debug, Default)]
pub struct DescriptorPoolRequirements {
    pub sizes: Vec<vk::DescriptorPoolSize>,
    pub max_sets: u32,
}

impl DescriptorPoolRequirements {
    pub fn new(max_sets: u32, sizes: &[(vk::DescriptorType, u32)]) -> Self {
        Self {
            sizes: sizes
                .iter()
                .map(|&(ty, descriptor_count)| {
                    vk::DescriptorPoolSize::default().ty(ty).descriptor_count(descriptor_count)
                })
                .collect(),
            max_sets,
        }
    }

    pub fn merge(requirements: &[DescriptorPoolRequirements]) -> Self {
        let mut merged = DescriptorPoolRequirements::default();
        for requirement in requirements {
            merged.max_sets += requirement.max_sets;
            for size in &requirement.sizes {
                match merged.sizes.iter_mut().find(|existing| existing.ty == size.ty) {
                    Some(existing) => existing.descriptor_count += size.descriptor_count,
                    None => merged.sizes.push(*size),
                }
            }
        }
        merged
    }
}

pub fn create_pool(
    device_handle: &DeviceHandle,
    requirements: &DescriptorPoolRequirements,
) -> Result<vk::DescriptorPool> {
    let create_info = vk::DescriptorPoolCreateInfo::default()
        .max_sets(requirements.max_sets)
        .pool_sizes(&requirements.sizes);

    let pool = unsafe { device_handle.create_descriptor_pool(&create_info, None)? };
    Ok(pool)
}

pub fn allocate_sets(
    device_handle: &DeviceHandle,
    pool: vk::DescriptorPool,
    layouts: &[vk::DescriptorSetLayout],
) -> Result<Vec<vk::DescriptorSet>> {
    let allocate_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(layouts);

    let sets = unsafe { device_handle.allocate_descriptor_sets(&allocate_info)? };
    Ok(sets)
}

/// One pending descriptor update. Cross-stage linking computes these first
/// and applies a whole frame-slot's worth in a single driver call, so a web
/// of links is either fully applied or not applied at all.
#[derive(Clone, Debug, PartialEq)]
pub enum DescriptorWrite {
    Buffer {
        set: vk::DescriptorSet,
        binding: u32,
        ty: vk::DescriptorType,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    },
    /// Covers single images and arrays; `descriptor_count` follows the view
    /// list length. Pass a null sampler for storage images.
    Images {
        set: vk::DescriptorSet,
        binding: u32,
        ty: vk::DescriptorType,
        sampler: vk::Sampler,
        views: Vec<(vk::ImageView, vk::ImageLayout)>,
    },
}

impl DescriptorWrite {
    pub fn descriptor_count(&self) -> u32 {
        match self {
            DescriptorWrite::Buffer { .. } => 1,
            DescriptorWrite::Images { views, .. } => views.len() as u32,
        }
    }
}

pub fn apply_writes(device_handle: &DeviceHandle, writes: &[DescriptorWrite]) {
    // A write with zero descriptors is not a valid update; empty array links
    // are dropped here instead of at every call site.
    let writes: Vec<&DescriptorWrite> =
        writes.iter().filter(|write| write.descriptor_count() > 0).collect();

    let mut buffer_infos: Vec<[vk::DescriptorBufferInfo; 1]> = Vec::with_capacity(writes.len());
    let mut image_infos: Vec<Vec<vk::DescriptorImageInfo>> = Vec::with_capacity(writes.len());

    for write in &writes {
        match write {
            DescriptorWrite::Buffer { buffer, offset, range, .. } => buffer_infos.push([
                vk::DescriptorBufferInfo::default()
                    .buffer(*buffer)
                    .offset(*offset)
                    .range(*range),
            ]),
            DescriptorWrite::Images { sampler, views, .. } => image_infos.push(
                views
                    .iter()
                    .map(|&(view, layout)| {
                        vk::DescriptorImageInfo::default()
                            .sampler(*sampler)
                            .image_view(view)
                            .image_layout(layout)
                    })
                    .collect(),
            ),
        }
    }

    let mut buffer_cursor = 0;
    let mut image_cursor = 0;
    let vk_writes: Vec<vk::WriteDescriptorSet> = writes
        .iter()
        .map(|&write| match write {
            DescriptorWrite::Buffer { set, binding, ty, .. } => {
                let info = &buffer_infos[buffer_cursor];
                buffer_cursor += 1;
                vk::WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .descriptor_type(*ty)
                    .buffer_info(info)
            }
            DescriptorWrite::Images { set, binding, ty, .. } => {
                let info = &image_infos[image_cursor];
                image_cursor += 1;
                vk::WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .descriptor_type(*ty)
                    .image_info(info)
            }
        })
        .collect();

    unsafe { device_handle.update_descriptor_sets(&vk_writes, &[]) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_requirements_merge_by_descriptor_type() {
        let a = DescriptorPoolRequirements::new(
            3,
            &[
                (vk::DescriptorType::UNIFORM_BUFFER, 3),
                (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 6),
            ],
        );
        let b = DescriptorPoolRequirements::new(
            2,
            &[
                (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 2),
                (vk::DescriptorType::STORAGE_IMAGE, 2),
            ],
        );

        let merged = DescriptorPoolRequirements::merge(&[a, b]);
        assert_eq!(merged.max_sets, 5);
        assert_eq!(merged.sizes.len(), 3);

        let count_of = |ty: vk::DescriptorType| {
            merged.sizes.iter().find(|size| size.ty == ty).map(|size| size.descriptor_count)
        };
        assert_eq!(count_of(vk::DescriptorType::UNIFORM_BUFFER), Some(3));
        assert_eq!(count_of(vk::DescriptorType::COMBINED_IMAGE_SAMPLER), Some(8));
        assert_eq!(count_of(vk::DescriptorType::STORAGE_IMAGE), Some(2));
    }

    #[test]
    fn empty_image_links_carry_no_descriptors() {
        let empty = DescriptorWrite::Images {
            set: vk::DescriptorSet::null(),
            binding: 4,
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            sampler: vk::Sampler::null(),
            views: vec![],
        };
        assert_eq!(empty.descriptor_count(), 0);

        let single = DescriptorWrite::Images {
            set: vk::DescriptorSet::null(),
            binding: 1,
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            sampler: vk::Sampler::null(),
            views: vec![(vk::ImageView::null(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)],
        };
        assert_eq!(single.descriptor_count(), 1);

        let buffer = DescriptorWrite::Buffer {
            set: vk::DescriptorSet::null(),
            binding: 0,
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            buffer: vk::Buffer::null(),
            offset: 0,
            range: 64,
        };
        assert_eq!(buffer.descriptor_count(), 1);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        let merged = DescriptorPoolRequirements::merge(&[]);
        assert_eq!(merged.max_sets, 0);
        assert!(merged.sizes.is_empty());
    }
}
