pub mod config;

use crate::ren::error::{RenError, Result};
use crate::ren::vk::surface::Surface;

use config::{PhysicalDeviceProperties, PhysicalDeviceQueueFamilies, QueueFamilyType};

use ash::{vk, Device as DeviceHandle, Instance};
use log::info;

#[allow(unused)]
pub struct Device {
    pub physical_device: vk::PhysicalDevice,
    pub physical_device_properties: PhysicalDeviceProperties,
    pub queue_families: PhysicalDeviceQueueFamilies,
    pub handle: DeviceHandle,
}

impl Device {
    pub fn new(instance: &Instance, surface: &Surface) -> Result<Self> {
        let physical_devices = unsafe { instance.enumerate_physical_devices()? };

        let mut suitable_physical_devices: Vec<_> = physical_devices
            .iter()
            .filter_map(|&physical_device| {
                config::validate_physical_device(instance, physical_device, surface).ok()
            })
            .collect();

        suitable_physical_devices.sort();

        let selected_physical_device = suitable_physical_devices
            .first()
            .ok_or(RenError::NoSuitablePhysicalDevice)?;

        info!(
            "selected physical device (type rank {}, max 2d dimension {})",
            selected_physical_device.properties.device_type_rank,
            selected_physical_device.properties.max_image_dimension_2d
        );

        let mut device_config = config::DeviceConfig::new(instance, selected_physical_device)?;
        let extensions = device_config.get_extensions();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&device_config.queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&device_config.features)
            .push_next(&mut device_config.vk_13_features)
            .push_next(&mut device_config.vk_12_features);

        let device = unsafe {
            instance.create_device(selected_physical_device.handle, &create_info, None)?
        };

        Ok(Self {
            physical_device: selected_physical_device.handle,
            physical_device_properties: selected_physical_device.properties.clone(),
            queue_families: selected_physical_device.queue_families.clone(),
            handle: device,
        })
    }

    pub fn get_queue(&self, queue_family_type: QueueFamilyType) -> vk::Queue {
        let queue_family_index = self.queue_families.get_family_index(queue_family_type);
        unsafe { self.handle.get_device_queue(queue_family_index, 0) }
    }

    pub fn drop(&mut self) {
        unsafe { self.handle.destroy_device(None) };
    }
}
