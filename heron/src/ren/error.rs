use std::path::PathBuf;

use ash::vk;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenError>;

/// Unified error type for every fallible construction step in the renderer.
///
/// Swapchain out-of-date/suboptimal results never surface here; they are
/// consumed by the frame loop's rebuild path. Link-order violations are
/// programmer errors and assert instead.
#[derive(Debug, Error)]
pub enum RenError {
    #[error("failed to load Vulkan entry point: {0}")]
    EntryLoad(#[from] ash::LoadingError),

    #[error("instance layer not supported: {0}")]
    LayerNotSupported(String),

    #[error("extension not supported: {0}")]
    ExtensionNotSupported(String),

    #[error("device feature not supported: {0}")]
    FeatureNotSupported(String),

    #[error("no suitable physical device")]
    NoSuitablePhysicalDevice,

    #[error("unable to find suitable queue family: {0}")]
    NoSuitableQueueFamily(&'static str),

    #[error("no surface formats reported for physical device")]
    NoSurfaceFormats,

    #[error("no present modes reported for physical device")]
    NoPresentModes,

    #[error("failed to read shader binary {path}: {source}")]
    ShaderRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to compile pipeline: {0}")]
    PipelineCompile(vk::Result),

    #[error("gpu allocation failed: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    #[error("timed out waiting for in-flight fence; gpu hang suspected")]
    GpuTimeout,

    #[error("surface unavailable after {0} swapchain rebuild attempts")]
    SurfaceUnavailable(u32),

    #[error("unsupported window handle: {0}")]
    Window(&'static str),

    #[error("vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),
}
