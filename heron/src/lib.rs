pub mod app;
pub mod gpu;
pub mod info;
pub mod ren;
pub mod scene;
