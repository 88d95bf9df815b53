#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Per-cascade shadow map resolutions, widest frustum split first. These are
/// independent of the swapchain extent and survive swapchain recreation.
pub struct ShadowSettings {
    pub resolutions: Vec<u32>,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self { resolutions: vec![2048, 1536, 1024] }
    }
}

impl ShadowSettings {
    pub fn cascade_count(&self) -> u32 {
        self.resolutions.len() as u32
    }
}

pub struct Settings {
    pub resolution: Resolution,
    pub buffering: u32,
    pub shadow: ShadowSettings,
    pub bloom_downsample_levels: u32,
    pub exposure_bounds: (f32, f32),
    /// Upper bound on out-of-date acquire/rebuild retries per frame before
    /// the surface is declared unavailable.
    pub rebuild_attempt_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            buffering: 2,
            shadow: ShadowSettings::default(),
            bloom_downsample_levels: 5,
            exposure_bounds: (0.05, 4.0),
            rebuild_attempt_limit: 8,
        }
    }
}

#[allow(unused)]
impl Settings {
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn buffering(mut self, buffering: u32) -> Self {
        self.buffering = buffering;
        self
    }

    pub fn shadow(mut self, shadow: ShadowSettings) -> Self {
        self.shadow = shadow;
        self
    }

    pub fn bloom_downsample_levels(mut self, levels: u32) -> Self {
        self.bloom_downsample_levels = levels;
        self
    }

    pub fn exposure_bounds(mut self, bounds: (f32, f32)) -> Self {
        self.exposure_bounds = bounds;
        self
    }

    pub fn cascade_count(&self) -> u32 {
        self.shadow.cascade_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shadow_configuration_has_three_cascades() {
        let settings = Settings::default();
        assert_eq!(settings.cascade_count(), 3);
        assert_eq!(settings.shadow.resolutions, vec![2048, 1536, 1024]);
    }

    #[test]
    fn rebuild_retries_are_bounded_by_default() {
        assert!(Settings::default().rebuild_attempt_limit > 0);
    }

    #[test]
    fn builder_overrides_defaults() {
        let settings = Settings::default()
            .resolution(Resolution::new(800, 600))
            .buffering(3)
            .bloom_downsample_levels(2);
        assert_eq!(settings.resolution.width, 800);
        assert_eq!(settings.buffering, 3);
        assert_eq!(settings.bloom_downsample_levels, 2);
    }

    #[test]
    fn zero_extent_is_detected() {
        assert!(Resolution::new(0, 600).is_zero());
        assert!(Resolution::new(800, 0).is_zero());
        assert!(!Resolution::new(800, 600).is_zero());
    }
}
