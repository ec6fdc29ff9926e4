/// Quality knobs handed to whatever draws the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub shadows: bool,
    pub soft_shadows: bool,
    pub antialias: bool,
    pub power_preference: wgpu::PowerPreference,
    /// Allowed device pixel ratio range.
    pub pixel_ratio: (f32, f32),
    pixel_ratio_pinned: bool,
}

impl RenderSettings {
    pub fn new(low_graphics: bool) -> Self {
        let mut settings = Self {
            shadows: true,
            soft_shadows: true,
            antialias: true,
            power_preference: wgpu::PowerPreference::HighPerformance,
            pixel_ratio: (1.0, 2.0),
            pixel_ratio_pinned: false,
        };
        settings.set_low_graphics(low_graphics);
        settings
    }

    pub fn set_low_graphics(&mut self, enabled: bool) {
        self.shadows = !enabled;
        self.soft_shadows = !enabled;
        self.antialias = !enabled;
        self.power_preference =
            if enabled { wgpu::PowerPreference::LowPower } else { wgpu::PowerPreference::HighPerformance };
        self.pixel_ratio = if enabled || self.pixel_ratio_pinned { (1.0, 1.0) } else { (1.0, 2.0) };
    }

    /// Locks the pixel ratio at 1 for the rest of the session.
    pub fn pin_pixel_ratio(&mut self) {
        self.pixel_ratio_pinned = true;
        self.pixel_ratio = (1.0, 1.0);
    }

    pub fn is_pixel_ratio_pinned(&self) -> bool {
        self.pixel_ratio_pinned
    }

    pub fn effective_pixel_ratio(&self, device_ratio: f32) -> f32 {
        let (min, max) = self.pixel_ratio;
        if device_ratio.is_finite() {
            device_ratio.clamp(min, max)
        } else {
            min
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::new(false)
    }
}
