use crate::ren::error::{RenError, Result};

use ash::{vk, Entry, khr};
#[cfg(feature = "debug")]
use ash::ext;
use std::ffi::{c_char, CStr};

pub struct InstanceConfig<'a> {
    layers: Vec<&'a CStr>,
    extensions: Vec<&'a CStr>,
}

impl InstanceConfig<'_> {
    pub fn new(entry: &Entry) -> Result<Self> {
        let layers = vec![
            #[cfg(feature = "debug")]
            c"VK_LAYER_KHRONOS_validation",
        ];

        validate_layers(entry, &layers)?;

        let extensions = vec![
            khr::get_physical_device_properties2::NAME,
            khr::surface::NAME,
            #[cfg(target_os = "windows")]
            khr::win32_surface::NAME,
            #[cfg(target_os = "linux")]
            khr::xcb_surface::NAME,
            #[cfg(feature = "debug")]
            ext::debug_utils::NAME,
        ];

        validate_extensions(entry, &extensions)?;

        Ok(Self { layers, extensions })
    }

    pub fn get_layers(&self) -> Vec<*const c_char> {
        self.layers.iter().map(|layer| layer.as_ptr()).collect()
    }

    pub fn get_extensions(&self) -> Vec<*const c_char> {
        self.extensions.iter().map(|extension| extension.as_ptr()).collect()
    }
}

fn validate_layers(entry: &Entry, layers: &[&CStr]) -> Result<()> {
    let instance_layer_properties = unsafe { entry.enumerate_instance_layer_properties()? };

    for layer in layers {
        let supported = instance_layer_properties.iter().any(|property| {
            property.layer_name_as_c_str().is_ok_and(|name| name == *layer)
        });
        if !supported {
            return Err(RenError::LayerNotSupported(layer.to_string_lossy().into_owned()));
        }
    }
    Ok(())
}

fn validate_extensions(entry: &Entry, extensions: &[&CStr]) -> Result<()> {
    let instance_extension_properties =
        unsafe { entry.enumerate_instance_extension_properties(None)? };

    for extension in extensions {
        let supported = instance_extension_properties.iter().any(|property| {
            property.extension_name_as_c_str().is_ok_and(|name| name == *extension)
        });
        if !supported {
            return Err(RenError::ExtensionNotSupported(extension.to_string_lossy().into_owned()));
        }
    }
    Ok(())
}
