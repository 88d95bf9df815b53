use crate::ren::error::{RenError, Result};
use crate::ren::settings::Resolution;
use crate::ren::vk::{device::Device, instance::Instance, surface::Surface};

use ash::{khr, vk, Device as DeviceHandle};
use log::info;
use std::cmp;

pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

#[allow(unused)]
pub struct Swapchain {
    pub device: khr::swapchain::Device,
    pub khr: vk::SwapchainKHR,
    pub format: vk::Format,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    pub fn new(
        instance: &Instance,
        device: &Device,
        surface: &Surface,
        resolution: &Resolution,
    ) -> Result<(Swapchain, SurfaceSupport)> {
        let surface_support = query_surface_support(device.physical_device, surface)?;
        let swapchain_device = khr::swapchain::Device::new(&instance.handle, &device.handle);
        let swapchain = Self::create(
            swapchain_device,
            device,
            surface,
            &surface_support,
            resolution,
            vk::SwapchainKHR::null(),
        )?;
        Ok((swapchain, surface_support))
    }

    /// Replaces the swapchain in place, handing the old handle to the driver
    /// through `old_swapchain` so presentation continues without a gap. Must
    /// only be called with a nonzero drawable extent; the frame loop defers
    /// rebuilds while the window is minimized.
    pub fn recreate(
        &mut self,
        device: &Device,
        surface: &Surface,
        surface_support: &SurfaceSupport,
        resolution: &Resolution,
    ) -> Result<()> {
        debug_assert!(!resolution.is_zero(), "swapchain recreated with zero extent");

        let old_khr = self.khr;
        let old_image_views = std::mem::take(&mut self.image_views);

        let next = Self::create(
            self.device.clone(),
            device,
            surface,
            surface_support,
            resolution,
            old_khr,
        )?;

        unsafe {
            old_image_views
                .iter()
                .for_each(|image_view| device.handle.destroy_image_view(*image_view, None));
            self.device.destroy_swapchain(old_khr, None);
        }

        info!(
            "swapchain recreated: {}x{} -> {}x{}, {} images",
            self.extent.width,
            self.extent.height,
            next.extent.width,
            next.extent.height,
            next.images.len()
        );

        *self = next;
        Ok(())
    }

    fn create(
        swapchain_device: khr::swapchain::Device,
        device: &Device,
        surface: &Surface,
        surface_support: &SurfaceSupport,
        resolution: &Resolution,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<Self> {
        let surface_format = select_surface_format(&surface_support.formats);
        let present_mode = select_present_mode(&surface_support.present_modes);
        let swapchain_extent = select_swapchain_extent(&surface_support.capabilities, resolution)
            .ok_or(RenError::SurfaceUnavailable(0))?;
        let min_image_count = select_swapchain_min_image_count(&surface_support.capabilities);
        let (image_sharing_mode, queue_family_indices) = get_queue_family_config(device);

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.khr)
            .min_image_count(min_image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(swapchain_extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(image_sharing_mode)
            .pre_transform(surface_support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        if !queue_family_indices.is_empty() {
            create_info = create_info.queue_family_indices(&queue_family_indices)
        };

        let khr = unsafe { swapchain_device.create_swapchain(&create_info, None)? };
        let images = unsafe { swapchain_device.get_swapchain_images(khr)? };
        let image_views = images
            .iter()
            .map(|swapchain_image| {
                let create_info = vk::ImageViewCreateInfo::default()
                    .image(*swapchain_image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk::ImageAspectFlags::COLOR)
                            .base_mip_level(0)
                            .level_count(1)
                            .base_array_layer(0)
                            .layer_count(1),
                    );

                unsafe {
                    device
                        .handle
                        .create_image_view(&create_info, None)
                        .map_err(RenError::from)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            device: swapchain_device,
            khr,
            format: surface_format.format,
            images,
            image_views,
            extent: swapchain_extent,
        })
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn drop(&mut self, device_handle: &DeviceHandle) {
        unsafe {
            self.image_views
                .iter()
                .for_each(|image_view| device_handle.destroy_image_view(*image_view, None));
            self.image_views.clear();
            self.images.clear();
            self.device.destroy_swapchain(self.khr, None);
        };
    }
}

pub fn query_surface_support(
    physical_device: vk::PhysicalDevice,
    surface: &Surface,
) -> Result<SurfaceSupport> {
    let capabilities = unsafe {
        surface
            .instance
            .get_physical_device_surface_capabilities(physical_device, surface.khr)?
    };

    let formats = unsafe {
        surface
            .instance
            .get_physical_device_surface_formats(physical_device, surface.khr)?
    };
    if formats.is_empty() {
        return Err(RenError::NoSurfaceFormats);
    }

    let present_modes = unsafe {
        surface
            .instance
            .get_physical_device_surface_present_modes(physical_device, surface.khr)?
    };
    if present_modes.is_empty() {
        return Err(RenError::NoPresentModes);
    }

    Ok(SurfaceSupport { capabilities, formats, present_modes })
}

pub const TARGET_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Ranking: the target format exactly, else any 8-bit sRGB-compatible format,
/// else whatever the surface reports first.
fn rank_surface_format(candidate: &vk::SurfaceFormatKHR) -> u32 {
    if candidate.format == TARGET_SURFACE_FORMAT.format
        && candidate.color_space == TARGET_SURFACE_FORMAT.color_space
    {
        return 0;
    }
    let srgb_compatible_8bit = matches!(
        candidate.format,
        vk::Format::B8G8R8A8_UNORM
            | vk::Format::B8G8R8A8_SRGB
            | vk::Format::R8G8B8A8_UNORM
            | vk::Format::R8G8B8A8_SRGB
    );
    if srgb_compatible_8bit && candidate.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR {
        return 1;
    }
    2
}

pub fn select_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .min_by_key(|format| rank_surface_format(format))
        .copied()
        .unwrap_or(TARGET_SURFACE_FORMAT)
}

/// Mailbox first (triple-buffering, no tearing), immediate as the low-latency
/// fallback, FIFO last; every conformant device supports FIFO.
fn rank_present_mode(candidate: vk::PresentModeKHR) -> u32 {
    match candidate {
        vk::PresentModeKHR::MAILBOX => 0,
        vk::PresentModeKHR::IMMEDIATE => 1,
        vk::PresentModeKHR::FIFO => 2,
        _ => 3,
    }
}

pub fn select_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    present_modes
        .iter()
        .copied()
        .filter(|&mode| rank_present_mode(mode) < 3)
        .min_by_key(|&mode| rank_present_mode(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Returns `None` for a zero (minimized) drawable area; zero-sized swapchain
/// images must never be constructed.
pub fn select_swapchain_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    resolution: &Resolution,
) -> Option<vk::Extent2D> {
    if resolution.is_zero() {
        return None;
    }

    // current_extent of u32::MAX means the surface takes its size from us.
    if capabilities.current_extent.width != u32::MAX {
        let current = capabilities.current_extent;
        if current.width == 0 || current.height == 0 {
            return None;
        }
        return Some(current);
    }

    let vk::SurfaceCapabilitiesKHR { min_image_extent, max_image_extent, .. } = *capabilities;
    Some(
        vk::Extent2D::default()
            .width(cmp::min(
                cmp::max(min_image_extent.width, resolution.width),
                max_image_extent.width,
            ))
            .height(cmp::min(
                cmp::max(min_image_extent.height, resolution.height),
                max_image_extent.height,
            )),
    )
}

pub fn select_swapchain_min_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let vk::SurfaceCapabilitiesKHR { min_image_count, max_image_count, .. } = *capabilities;
    let upper_bound = if max_image_count > 0 { max_image_count } else { u32::MAX };
    cmp::min(upper_bound, min_image_count + 1)
}

fn get_queue_family_config(device: &Device) -> (vk::SharingMode, Vec<u32>) {
    let Device { queue_families: qf, .. } = device;
    match qf.graphics_family_index == qf.present_family_index {
        true => (vk::SharingMode::EXCLUSIVE, vec![]),
        false => (vk::SharingMode::CONCURRENT, qf.get_unique_indices()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    #[test]
    fn target_surface_format_wins_when_present() {
        let formats = [
            format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let selected = select_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn srgb_compatible_format_beats_arbitrary_first() {
        let formats = [
            format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let selected = select_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn first_reported_format_is_the_last_resort() {
        let formats = [
            format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
            format(vk::Format::A2B10G10R10_UNORM_PACK32, vk::ColorSpaceKHR::HDR10_ST2084_EXT),
        ];
        let selected = select_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::R16G16B16A16_SFLOAT);
    }

    #[test]
    fn mailbox_preferred_then_immediate_then_fifo() {
        assert_eq!(
            select_present_mode(&[
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::MAILBOX,
                vk::PresentModeKHR::IMMEDIATE,
            ]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            select_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE]),
            vk::PresentModeKHR::IMMEDIATE
        );
        assert_eq!(
            select_present_mode(&[vk::PresentModeKHR::FIFO_RELAXED, vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn extent_is_clamped_to_surface_bounds() {
        let capabilities = vk::SurfaceCapabilitiesKHR::default()
            .current_extent(vk::Extent2D { width: u32::MAX, height: u32::MAX })
            .min_image_extent(vk::Extent2D { width: 64, height: 64 })
            .max_image_extent(vk::Extent2D { width: 1280, height: 720 });

        let extent =
            select_swapchain_extent(&capabilities, &Resolution::new(1920, 1080)).unwrap();
        assert_eq!((extent.width, extent.height), (1280, 720));

        let extent = select_swapchain_extent(&capabilities, &Resolution::new(16, 16)).unwrap();
        assert_eq!((extent.width, extent.height), (64, 64));
    }

    #[test]
    fn zero_extent_yields_no_swapchain() {
        let capabilities = vk::SurfaceCapabilitiesKHR::default()
            .current_extent(vk::Extent2D { width: u32::MAX, height: u32::MAX })
            .max_image_extent(vk::Extent2D { width: 1280, height: 720 });
        assert!(select_swapchain_extent(&capabilities, &Resolution::new(0, 0)).is_none());

        let minimized = vk::SurfaceCapabilitiesKHR::default()
            .current_extent(vk::Extent2D { width: 0, height: 0 });
        assert!(select_swapchain_extent(&minimized, &Resolution::new(800, 600)).is_none());
    }

    #[test]
    fn image_count_is_min_plus_one_clamped_to_device_max() {
        let capabilities = vk::SurfaceCapabilitiesKHR::default()
            .min_image_count(2)
            .max_image_count(8);
        assert_eq!(select_swapchain_min_image_count(&capabilities), 3);

        let tight = vk::SurfaceCapabilitiesKHR::default()
            .min_image_count(3)
            .max_image_count(3);
        assert_eq!(select_swapchain_min_image_count(&tight), 3);

        let unbounded = vk::SurfaceCapabilitiesKHR::default()
            .min_image_count(2)
            .max_image_count(0);
        assert_eq!(select_swapchain_min_image_count(&unbounded), 3);
    }
}
