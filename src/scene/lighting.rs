use super::parse_hex_color;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    #[default]
    Day,
    Sunset,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 3] = [TimeOfDay::Day, TimeOfDay::Sunset, TimeOfDay::Night];

    /// Unknown names resolve to `Day`.
    pub fn parse_or_day(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sunset" => TimeOfDay::Sunset,
            "night" => TimeOfDay::Night,
            _ => TimeOfDay::Day,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeOfDay::Day => "day",
            TimeOfDay::Sunset => "sunset",
            TimeOfDay::Night => "night",
        }
    }

    pub fn next(self) -> Self {
        match self {
            TimeOfDay::Day => TimeOfDay::Sunset,
            TimeOfDay::Sunset => TimeOfDay::Night,
            TimeOfDay::Night => TimeOfDay::Day,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyParams {
    pub inclination: f32,
    pub azimuth: f32,
    pub turbidity: f32,
    pub rayleigh: f32,
}

/// One time-of-day bundle. Presets switch instantly; nothing interpolates between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingPreset {
    pub time_of_day: TimeOfDay,
    pub sun_position: Vec3,
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    pub sky: SkyParams,
    pub fog_color: &'static str,
    pub fog_near: f32,
    pub fog_far: f32,
}

impl LightingPreset {
    pub fn sun_direction(&self) -> Vec3 {
        self.sun_position.normalize_or_zero()
    }

    pub fn fog_rgb(&self) -> Vec3 {
        parse_hex_color(self.fog_color).unwrap_or(Vec3::ZERO)
    }

    pub fn accent_lights(&self) -> &'static [PointLight] {
        accent_lights(self.time_of_day)
    }
}

const DAY: LightingPreset = LightingPreset {
    time_of_day: TimeOfDay::Day,
    sun_position: Vec3::new(100.0, 100.0, 50.0),
    ambient_intensity: 0.8,
    directional_intensity: 1.5,
    sky: SkyParams { inclination: 0.3, azimuth: 0.15, turbidity: 8.0, rayleigh: 2.0 },
    fog_color: "#87CEEB",
    fog_near: 50.0,
    fog_far: 150.0,
};

const SUNSET: LightingPreset = LightingPreset {
    time_of_day: TimeOfDay::Sunset,
    sun_position: Vec3::new(100.0, 30.0, 50.0),
    ambient_intensity: 0.5,
    directional_intensity: 1.2,
    sky: SkyParams { inclination: 0.5, azimuth: 0.25, turbidity: 10.0, rayleigh: 2.0 },
    fog_color: "#ff9966",
    fog_near: 50.0,
    fog_far: 150.0,
};

const NIGHT: LightingPreset = LightingPreset {
    time_of_day: TimeOfDay::Night,
    sun_position: Vec3::new(-100.0, -20.0, -100.0),
    ambient_intensity: 0.3,
    directional_intensity: 0.4,
    sky: SkyParams { inclination: 0.7, azimuth: 0.0, turbidity: 0.1, rayleigh: 0.5 },
    fog_color: "#0a0a1a",
    fog_near: 30.0,
    fog_far: 100.0,
};

pub const fn lighting_preset(time_of_day: TimeOfDay) -> LightingPreset {
    match time_of_day {
        TimeOfDay::Day => DAY,
        TimeOfDay::Sunset => SUNSET,
        TimeOfDay::Night => NIGHT,
    }
}

pub fn lighting_preset_named(name: &str) -> LightingPreset {
    lighting_preset(TimeOfDay::parse_or_day(name))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub color: &'static str,
}

const NIGHT_LAMPS: [PointLight; 4] = [
    PointLight { position: Vec3::new(0.0, 10.0, 0.0), intensity: 0.5, range: 50.0, color: "#FFA500" },
    PointLight { position: Vec3::new(50.0, 10.0, 20.0), intensity: 0.5, range: 50.0, color: "#FFA500" },
    PointLight { position: Vec3::new(-40.0, 10.0, 20.0), intensity: 0.5, range: 50.0, color: "#FFA500" },
    PointLight { position: Vec3::new(0.0, 10.0, 70.0), intensity: 0.7, range: 60.0, color: "#FFA500" },
];

pub fn accent_lights(time_of_day: TimeOfDay) -> &'static [PointLight] {
    match time_of_day {
        TimeOfDay::Night => &NIGHT_LAMPS,
        TimeOfDay::Day | TimeOfDay::Sunset => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLight {
    pub sky_color: &'static str,
    pub ground_color: &'static str,
    pub intensity: f32,
    pub position: Vec3,
}

pub const HEMISPHERE: HemisphereLight = HemisphereLight {
    sky_color: "#87CEEB",
    ground_color: "#3d6b1f",
    intensity: 0.5,
    position: Vec3::new(0.0, 50.0, 0.0),
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub far: f32,
    pub half_extent: f32,
    pub bias: f32,
}

pub const SUN_SHADOWS: ShadowSettings =
    ShadowSettings { map_size: 2048, far: 200.0, half_extent: 100.0, bias: -0.0001 };

pub const SKY_DISTANCE: f32 = 450_000.0;

/// GPU-facing copy of a preset, laid out for a uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LightingUniform {
    /// xyz = direction towards the sun, w = directional intensity.
    pub sun: [f32; 4],
    /// x = ambient intensity, y = hemisphere intensity.
    pub ambient: [f32; 4],
    /// rgb = fog colour.
    pub fog_color: [f32; 4],
    /// x = near, y = far.
    pub fog_range: [f32; 4],
    /// inclination, azimuth, turbidity, rayleigh.
    pub sky: [f32; 4],
}

impl LightingUniform {
    pub fn from_preset(preset: &LightingPreset) -> Self {
        let dir = preset.sun_direction();
        let fog = preset.fog_rgb();
        Self {
            sun: [dir.x, dir.y, dir.z, preset.directional_intensity],
            ambient: [preset.ambient_intensity, HEMISPHERE.intensity, 0.0, 0.0],
            fog_color: [fog.x, fog.y, fog.z, 1.0],
            fog_range: [preset.fog_near, preset.fog_far, 0.0, 0.0],
            sky: [preset.sky.inclination, preset.sky.azimuth, preset.sky.turbidity, preset.sky.rayleigh],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
