use crate::ren::error::Result;
use crate::ren::window::Window;

use ash::{khr, vk, Entry, Instance};

#[allow(unused)]
pub struct Surface {
    pub instance: khr::surface::Instance,
    pub khr: vk::SurfaceKHR,
}

impl Surface {
    pub fn new(entry: &Entry, instance: &Instance, handle: &Window) -> Result<Self> {
        let surface_instance = khr::surface::Instance::new(entry, instance);

        #[cfg(target_os = "windows")]
        {
            use crate::ren::error::RenError;

            let khr_instance = khr::win32_surface::Instance::new(entry, instance);

            let hinstance = handle
                .window
                .hinstance
                .ok_or(RenError::Window("failed to obtain window hinstance"))?;
            let create_info = vk::Win32SurfaceCreateInfoKHR::default()
                .hwnd(handle.window.hwnd.into())
                .hinstance(hinstance.into());

            let khr = unsafe { khr_instance.create_win32_surface(&create_info, None)? };

            Ok(Self { instance: surface_instance, khr })
        }
        #[cfg(target_os = "linux")]
        {
            use crate::ren::error::RenError;

            let khr_instance = khr::xcb_surface::Instance::new(entry, instance);

            let connection = handle
                .display
                .connection
                .ok_or(RenError::Window("failed to obtain display connection"))?;
            let create_info = vk::XcbSurfaceCreateInfoKHR::default()
                .connection(connection.as_ptr() as *mut _)
                .window(handle.window.window.into());

            let khr = unsafe { khr_instance.create_xcb_surface(&create_info, None)? };

            Ok(Self { instance: surface_instance, khr })
        }
    }

    pub fn drop(&mut self) {
        unsafe { self.instance.destroy_surface(self.khr, None) };
    }
}
