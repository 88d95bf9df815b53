use heron::app::App;
use heron::ren::Settings;

use log::error;
use std::path::PathBuf;
use std::process::ExitCode;
use winit::event_loop::{ControlFlow, EventLoop};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional path to a gltf scene to load in the background.
    let scene_path = std::env::args().nth(1).map(PathBuf::from);

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("failed to create event loop: {e}");
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new("heron viewer", Settings::default(), scene_path);
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("event loop error: {e}");
        return ExitCode::FAILURE;
    }

    match app.failed() {
        true => ExitCode::FAILURE,
        false => ExitCode::SUCCESS,
    }
}
