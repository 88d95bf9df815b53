use crate::info;
use crate::ren::{self, RenError, Resolution, Settings};
use crate::scene::{self, LoadStage, SceneSlot};

use log::{error, info as log_info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

pub struct App {
    name: String,
    settings: Settings,
    scene_path: Option<PathBuf>,
    scene_slot: Arc<SceneSlot>,

    window: Option<Arc<Window>>,
    ren: Option<ren::Handle>,
    scene_load_reported: bool,
    failed: bool,
}

impl App {
    pub fn new(name: &str, settings: Settings, scene_path: Option<PathBuf>) -> Self {
        Self {
            name: name.to_owned(),
            settings,
            scene_path,
            scene_slot: Arc::new(SceneSlot::new()),
            window: None,
            ren: None,
            scene_load_reported: false,
            failed: false,
        }
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: RenError) {
        error!("{error}");
        self.failed = true;
        event_loop.exit();
    }

    fn drawable_size(&self) -> Resolution {
        match &self.window {
            Some(window) => {
                let size = window.inner_size();
                Resolution::new(size.width, size.height)
            }
            None => Resolution::new(0, 0),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(self.name.clone())
            .with_inner_size(PhysicalSize::new(
                self.settings.resolution.width,
                self.settings.resolution.height,
            ))
            .with_resizable(true);

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("failed to create window: {e}");
                self.failed = true;
                event_loop.exit();
                return;
            }
        };

        let info = info::new(self.name.clone(), info::make_version(0, 0, 1, 0));
        let settings = std::mem::take(&mut self.settings);
        match ren::new(&info, settings, &window) {
            Ok(handle) => self.ren = Some(handle),
            Err(e) => return self.fail(event_loop, e),
        }

        if let Some(path) = self.scene_path.clone() {
            scene::load_async(self.scene_slot.clone(), path);
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(ren) = self.ren.as_mut() {
                    ren.schedule_rebuild(Resolution::new(size.width, size.height));
                }
            }
            WindowEvent::RedrawRequested => {
                if self.scene_slot.stage() == LoadStage::Ready {
                    if let (Some(meshes), Some(ren)) =
                        (self.scene_slot.take(), self.ren.as_mut())
                    {
                        if let Err(e) = ren.upload_scene(&meshes) {
                            return self.fail(event_loop, e);
                        }
                    }
                } else if self.scene_slot.stage() == LoadStage::Failed && !self.scene_load_reported
                {
                    warn!("continuing without scene assets");
                    self.scene_load_reported = true;
                }

                let drawable = self.drawable_size();
                if let Some(ren) = self.ren.as_mut() {
                    if let Err(e) = ren.draw(drawable) {
                        return self.fail(event_loop, e);
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log_info!("shutting down");
        self.ren = None;
    }
}
