use crate::config::{AppConfigOverrides, DEFAULT_CONFIG_PATH};
use crate::scene::TimeOfDay;
use crate::view::ViewMode;
use anyhow::{anyhow, bail, Context, Result};
use std::env;

pub const DEFAULT_FRAMES: u32 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    config_path: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    vsync: Option<bool>,
    time_of_day: Option<TimeOfDay>,
    view_mode: Option<ViewMode>,
    low_graphics: Option<bool>,
    frames: Option<u32>,
    windowed: Option<bool>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // program name
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config_path = Some(value),
                "width" => {
                    overrides.width = Some(value.parse::<u32>().with_context(|| format!("Invalid width '{value}'"))?);
                }
                "height" => {
                    overrides.height =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid height '{value}'"))?);
                }
                "vsync" => overrides.vsync = Some(parse_bool_flag("vsync", &value)?),
                "time-of-day" => overrides.time_of_day = Some(parse_time_of_day(&value)?),
                "view" => overrides.view_mode = Some(parse_view_mode(&value)?),
                "low-graphics" => overrides.low_graphics = Some(parse_bool_flag("low-graphics", &value)?),
                "frames" => {
                    overrides.frames =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid frame count '{value}'"))?);
                }
                "windowed" => overrides.windowed = Some(parse_bool_flag("windowed", &value)?),
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --width, --height, --vsync, --time-of-day, \
                     --view, --low-graphics, --frames, --windowed."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> &str {
        self.config_path.as_deref().unwrap_or(DEFAULT_CONFIG_PATH)
    }

    pub fn frames(&self) -> u32 {
        self.frames.unwrap_or(DEFAULT_FRAMES)
    }

    pub fn windowed(&self) -> bool {
        self.windowed.unwrap_or(false)
    }

    pub fn to_config_overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides {
            width: self.width,
            height: self.height,
            vsync: self.vsync,
            time_of_day: self.time_of_day,
            view_mode: self.view_mode,
            low_graphics: self.low_graphics,
        }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}

fn parse_time_of_day(value: &str) -> Result<TimeOfDay> {
    match value.to_ascii_lowercase().as_str() {
        "day" => Ok(TimeOfDay::Day),
        "sunset" => Ok(TimeOfDay::Sunset),
        "night" => Ok(TimeOfDay::Night),
        other => bail!("Invalid time-of-day '{other}'. Use day, sunset or night."),
    }
}

fn parse_view_mode(value: &str) -> Result<ViewMode> {
    match value.to_ascii_lowercase().as_str() {
        "orbital" | "orbit" => Ok(ViewMode::Orbital),
        "first-person" | "first_person" | "fp" => Ok(ViewMode::FirstPerson),
        other => bail!("Invalid view '{other}'. Use orbital or first-person."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_window_and_session_flags() {
        let args = ["app", "--width", "1600", "--vsync", "off", "--time-of-day", "Night", "--view", "first-person"];
        let overrides = CliOverrides::parse(args).expect("parse overrides");
        let config = overrides.to_config_overrides();
        assert_eq!(config.width, Some(1600));
        assert_eq!(config.vsync, Some(false));
        assert_eq!(config.time_of_day, Some(TimeOfDay::Night));
        assert_eq!(config.view_mode, Some(ViewMode::FirstPerson));
        assert_eq!(config.height, None);
    }

    #[test]
    fn harness_flags_have_defaults() {
        let overrides = CliOverrides::parse(["app"]).expect("parse");
        assert_eq!(overrides.config_path(), DEFAULT_CONFIG_PATH);
        assert_eq!(overrides.frames(), DEFAULT_FRAMES);
        assert!(!overrides.windowed());
        let overrides = CliOverrides::parse(["app", "--frames", "10", "--config", "alt.json"]).expect("parse");
        assert_eq!(overrides.frames(), 10);
        assert_eq!(overrides.config_path(), "alt.json");
    }

    #[test]
    fn latest_flag_wins() {
        let args = ["app", "--low-graphics", "on", "--low-graphics", "off"];
        let overrides = CliOverrides::parse(args).expect("parse overrides");
        assert_eq!(overrides.to_config_overrides().low_graphics, Some(false));
    }

    #[test]
    fn missing_value_errors() {
        let err = CliOverrides::parse(["app", "--width"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"));
    }

    #[test]
    fn rejects_unknown_flags_and_values() {
        assert!(CliOverrides::parse(["app", "--foo", "bar"]).unwrap_err().to_string().contains("Unknown flag"));
        assert!(CliOverrides::parse(["app", "--time-of-day", "dawn"]).is_err());
        assert!(CliOverrides::parse(["app", "--view", "top"]).is_err());
    }
}
