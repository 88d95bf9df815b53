pub mod error;
pub mod settings;
pub mod vk;
pub mod window;

pub use error::{RenError, Result};
pub use settings::{Resolution, Settings, ShadowSettings};

use crate::info::Info;
use crate::scene::MeshData;

use winit::window::Window as WindowHandle;

/// Renderer facade; owns the backend and keeps the windowing and scene code
/// independent of the graphics API types.
pub struct Handle {
    api: vk::Renderer,
}

pub fn new(info: &Info, settings: Settings, window: &WindowHandle) -> Result<Handle> {
    let window = window::Window::new(window)?;
    Ok(Handle { api: vk::Renderer::new(info, settings, &window)? })
}

impl Handle {
    pub fn draw(&mut self, drawable: Resolution) -> Result<()> {
        self.api.draw(drawable)
    }

    pub fn schedule_rebuild(&mut self, resolution: Resolution) {
        self.api.schedule_rebuild(resolution);
    }

    pub fn upload_scene(&mut self, meshes: &[MeshData]) -> Result<()> {
        self.api.upload_scene(meshes)
    }

    pub fn set_overlay(&mut self, overlay: vk::OverlayHook) {
        self.api.set_overlay(overlay);
    }
}
