use crate::ren::error::{RenError, Result};

use winit::{
    raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle},
    window::Window as WindowHandle,
};

#[cfg(target_os = "linux")]
use winit::raw_window_handle::{XcbDisplayHandle, XcbWindowHandle};
#[cfg(target_os = "windows")]
use winit::raw_window_handle::{Win32WindowHandle, WindowsDisplayHandle};

/// Raw platform handles extracted from the window collaborator; everything
/// the surface module needs to create a presentable surface.
#[derive(Debug)]
#[allow(unused)]
pub struct Window {
    #[cfg(target_os = "windows")]
    pub display: WindowsDisplayHandle,
    #[cfg(target_os = "windows")]
    pub window: Win32WindowHandle,

    #[cfg(target_os = "linux")]
    pub display: XcbDisplayHandle,
    #[cfg(target_os = "linux")]
    pub window: XcbWindowHandle,
}

impl Window {
    pub fn new(window: &WindowHandle) -> Result<Window> {
        let display_handle = window
            .display_handle()
            .map_err(|_| RenError::Window("failed to get display handle"))?;
        let display = match display_handle.as_raw() {
            #[cfg(target_os = "windows")]
            RawDisplayHandle::Windows(handle) => Ok(handle),
            #[cfg(target_os = "linux")]
            RawDisplayHandle::Xcb(handle) => Ok(handle),
            _ => Err(RenError::Window("unsupported display handle")),
        }?;

        let window_handle = window
            .window_handle()
            .map_err(|_| RenError::Window("failed to get window handle"))?;
        let window = match window_handle.as_raw() {
            #[cfg(target_os = "windows")]
            RawWindowHandle::Win32(handle) => Ok(handle),
            #[cfg(target_os = "linux")]
            RawWindowHandle::Xcb(handle) => Ok(handle),
            _ => Err(RenError::Window("unsupported window handle")),
        }?;

        Ok(Self { display, window })
    }
}
