use crate::ren::error::{RenError, Result};
use crate::ren::vk::surface::Surface;

use ash::{khr, vk, Instance};
use std::collections::HashSet;
use std::ffi::{c_char, CStr};

/// Minimum per-stage descriptor limits a device must meet; derived from the
/// lighting stage, which binds the gbuffer plus every shadow cascade at once.
pub const MIN_SAMPLED_IMAGE_DESCRIPTORS: u32 = 16;
pub const MIN_UNIFORM_BUFFER_DESCRIPTORS: u32 = 8;
pub const MIN_STORAGE_IMAGE_DESCRIPTORS: u32 = 4;

pub struct DeviceConfig<'a> {
    pub extensions: Vec<&'a CStr>,
    pub features: vk::PhysicalDeviceFeatures,
    pub vk_13_features: vk::PhysicalDeviceVulkan13Features<'a>,
    pub vk_12_features: vk::PhysicalDeviceVulkan12Features<'a>,
    pub queue_create_infos: Vec<vk::DeviceQueueCreateInfo<'a>>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct PhysicalDeviceProperties {
    pub device_type_rank: u32,
    pub max_image_dimension_2d: u32,
}

impl PartialOrd for PhysicalDeviceProperties {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PhysicalDeviceProperties {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Lower rank first (discrete before integrated); larger image limit
        // breaks ties.
        self.device_type_rank
            .cmp(&other.device_type_rank)
            .then(other.max_image_dimension_2d.cmp(&self.max_image_dimension_2d))
    }
}

impl PhysicalDeviceProperties {
    pub fn new(properties: &vk::PhysicalDeviceProperties) -> Self {
        Self {
            device_type_rank: rank_device_type(properties.device_type),
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
        }
    }
}

pub fn rank_device_type(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 0,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
        _ => u32::MAX,
    }
}

#[allow(unused)]
pub enum QueueFamilyType {
    Graphics,
    Present,
    Compute,
}

#[derive(Clone, PartialEq, Eq, PartialOrd)]
pub struct PhysicalDeviceQueueFamilies {
    pub graphics_family_index: Option<u32>,
    pub present_family_index: Option<u32>,
    pub compute_family_index: Option<u32>,
}

// Hardcoded; we only need one queue from each family.
const QUEUE_PRIORITIES: [f32; 1] = [1.0];

impl PhysicalDeviceQueueFamilies {
    pub fn new() -> Self {
        Self {
            graphics_family_index: None,
            present_family_index: None,
            compute_family_index: None,
        }
    }

    pub fn get_family_index(&self, family_type: QueueFamilyType) -> u32 {
        match family_type {
            QueueFamilyType::Graphics => self.graphics_family_index.unwrap_or(u32::MAX),
            QueueFamilyType::Present => self.present_family_index.unwrap_or(u32::MAX),
            QueueFamilyType::Compute => self.compute_family_index.unwrap_or(u32::MAX),
        }
    }

    pub fn get_unique_indices(&self) -> Vec<u32> {
        let mut unique_indices = HashSet::new();
        for index in [
            self.graphics_family_index,
            self.present_family_index,
            self.compute_family_index,
        ]
        .into_iter()
        .flatten()
        {
            unique_indices.insert(index);
        }
        unique_indices.into_iter().collect()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ValidPhysicalDevice {
    pub handle: vk::PhysicalDevice,
    pub properties: PhysicalDeviceProperties,
    pub queue_families: PhysicalDeviceQueueFamilies,
}

impl PartialOrd for ValidPhysicalDevice {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValidPhysicalDevice {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.properties.cmp(&other.properties)
    }
}

impl DeviceConfig<'_> {
    pub fn new(instance: &Instance, valid_physical_device: &ValidPhysicalDevice) -> Result<Self> {
        let extensions = vec![khr::swapchain::NAME];

        validate_extensions(instance, valid_physical_device.handle, &extensions)?;

        let features: vk::PhysicalDeviceFeatures = Default::default();

        let mut vk_13_features: vk::PhysicalDeviceVulkan13Features = Default::default();
        vk_13_features.synchronization2 = vk::TRUE;

        let mut vk_12_features: vk::PhysicalDeviceVulkan12Features = Default::default();
        vk_12_features.buffer_device_address = vk::TRUE;

        let queue_create_infos = valid_physical_device
            .queue_families
            .get_unique_indices()
            .into_iter()
            .map(|index| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(index)
                    .queue_priorities(&QUEUE_PRIORITIES)
            })
            .collect();

        Ok(Self { extensions, features, vk_13_features, vk_12_features, queue_create_infos })
    }

    pub fn get_extensions(&self) -> Vec<*const c_char> {
        self.extensions.iter().map(|extension| extension.as_ptr()).collect()
    }
}

pub fn validate_physical_device(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    surface: &Surface,
) -> Result<ValidPhysicalDevice> {
    let properties = unsafe { instance.get_physical_device_properties(physical_device) };

    if rank_device_type(properties.device_type) == u32::MAX {
        return Err(RenError::NoSuitablePhysicalDevice);
    }
    validate_descriptor_limits(&properties.limits)?;
    validate_physical_device_feature_requirements(instance, physical_device)?;

    let queue_family_properties =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
    let queue_families = select_queue_families(&queue_family_properties, |queue_family_index| {
        unsafe {
            surface
                .instance
                .get_physical_device_surface_support(physical_device, queue_family_index, surface.khr)
                .unwrap_or(false)
        }
    })?;

    Ok(ValidPhysicalDevice {
        handle: physical_device,
        properties: PhysicalDeviceProperties::new(&properties),
        queue_families,
    })
}

pub fn validate_descriptor_limits(limits: &vk::PhysicalDeviceLimits) -> Result<()> {
    if limits.max_per_stage_descriptor_sampled_images < MIN_SAMPLED_IMAGE_DESCRIPTORS
        || limits.max_per_stage_descriptor_uniform_buffers < MIN_UNIFORM_BUFFER_DESCRIPTORS
        || limits.max_per_stage_descriptor_storage_images < MIN_STORAGE_IMAGE_DESCRIPTORS
    {
        return Err(RenError::NoSuitablePhysicalDevice);
    }
    Ok(())
}

fn validate_extensions(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    extensions: &[&CStr],
) -> Result<()> {
    let device_extension_properties =
        unsafe { instance.enumerate_device_extension_properties(physical_device)? };

    for extension in extensions {
        let supported = device_extension_properties.iter().any(|property| {
            property.extension_name_as_c_str().is_ok_and(|name| name == *extension)
        });
        if !supported {
            return Err(RenError::ExtensionNotSupported(extension.to_string_lossy().into_owned()));
        }
    }
    Ok(())
}

fn validate_physical_device_feature_requirements(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<()> {
    let mut vk_13_features: vk::PhysicalDeviceVulkan13Features = Default::default();
    let mut vk_12_features: vk::PhysicalDeviceVulkan12Features = Default::default();
    let mut features_2 = vk::PhysicalDeviceFeatures2::default()
        .push_next(&mut vk_13_features)
        .push_next(&mut vk_12_features);

    unsafe { instance.get_physical_device_features2(physical_device, &mut features_2) };

    if vk_13_features.synchronization2 == vk::FALSE {
        return Err(RenError::FeatureNotSupported("vk_13_synchronization2".into()));
    }
    if vk_12_features.buffer_device_address == vk::FALSE {
        return Err(RenError::FeatureNotSupported("vk_12_buffer_device_address".into()));
    }
    Ok(())
}

/// Queue family policy: one family with graphics+transfer, one able to present
/// to the target surface, one with compute. The three may alias.
pub fn select_queue_families(
    queue_family_properties: &[vk::QueueFamilyProperties],
    surface_support: impl Fn(u32) -> bool,
) -> Result<PhysicalDeviceQueueFamilies> {
    let mut families = PhysicalDeviceQueueFamilies::new();

    for (queue_family_index, family) in queue_family_properties.iter().enumerate() {
        let qfi = queue_family_index as u32;
        if families.graphics_family_index.is_none()
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER)
        {
            families.graphics_family_index = Some(qfi);
        }
        if families.compute_family_index.is_none()
            && family.queue_flags.contains(vk::QueueFlags::COMPUTE)
        {
            families.compute_family_index = Some(qfi);
        }
        if families.present_family_index.is_none() && surface_support(qfi) {
            families.present_family_index = Some(qfi);
        }
    }

    if families.graphics_family_index.is_none() {
        return Err(RenError::NoSuitableQueueFamily("graphics"));
    }
    if families.present_family_index.is_none() {
        return Err(RenError::NoSuitableQueueFamily("present"));
    }
    if families.compute_family_index.is_none() {
        return Err(RenError::NoSuitableQueueFamily("compute"));
    }

    Ok(families)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties::default().queue_flags(flags)
    }

    #[test]
    fn discrete_devices_rank_before_integrated() {
        let discrete = PhysicalDeviceProperties {
            device_type_rank: rank_device_type(vk::PhysicalDeviceType::DISCRETE_GPU),
            max_image_dimension_2d: 4096,
        };
        let integrated = PhysicalDeviceProperties {
            device_type_rank: rank_device_type(vk::PhysicalDeviceType::INTEGRATED_GPU),
            max_image_dimension_2d: 16384,
        };
        assert!(discrete < integrated);
    }

    #[test]
    fn cpu_devices_are_rejected() {
        assert_eq!(rank_device_type(vk::PhysicalDeviceType::CPU), u32::MAX);
    }

    #[test]
    fn queue_families_may_alias_on_a_single_universal_family() {
        let properties = [family(
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER | vk::QueueFlags::COMPUTE,
        )];
        let families = select_queue_families(&properties, |_| true).unwrap();
        assert_eq!(families.graphics_family_index, Some(0));
        assert_eq!(families.present_family_index, Some(0));
        assert_eq!(families.compute_family_index, Some(0));
        assert_eq!(families.get_unique_indices(), vec![0]);
    }

    #[test]
    fn split_families_are_found() {
        let properties = [
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER),
        ];
        let families = select_queue_families(&properties, |index| index == 1).unwrap();
        assert_eq!(families.graphics_family_index, Some(0));
        assert_eq!(families.compute_family_index, Some(1));
        assert_eq!(families.present_family_index, Some(1));
        let mut unique = families.get_unique_indices();
        unique.sort();
        assert_eq!(unique, vec![0, 1]);
    }

    #[test]
    fn missing_present_support_fails() {
        let properties = [family(
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER | vk::QueueFlags::COMPUTE,
        )];
        let result = select_queue_families(&properties, |_| false);
        assert!(matches!(result, Err(RenError::NoSuitableQueueFamily("present"))));
    }

    #[test]
    fn descriptor_limits_below_minimum_fail() {
        let mut limits = vk::PhysicalDeviceLimits::default();
        limits.max_per_stage_descriptor_sampled_images = MIN_SAMPLED_IMAGE_DESCRIPTORS;
        limits.max_per_stage_descriptor_uniform_buffers = MIN_UNIFORM_BUFFER_DESCRIPTORS;
        limits.max_per_stage_descriptor_storage_images = MIN_STORAGE_IMAGE_DESCRIPTORS;
        assert!(validate_descriptor_limits(&limits).is_ok());

        limits.max_per_stage_descriptor_sampled_images = MIN_SAMPLED_IMAGE_DESCRIPTORS - 1;
        assert!(validate_descriptor_limits(&limits).is_err());
    }
}
