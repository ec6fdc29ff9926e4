use super::CampusApp;
use crate::campus::BuildingId;
use crate::events::CampusEvent;
use crate::input::InputEvent;
use crate::scene::TimeOfDay;
use crate::selection::ClickOutcome;
use crate::view::{CameraPreset, PlayerPose, ViewMode};
use glam::Vec3;
use tracing::{debug, info, warn};
use winit::keyboard::Key;

/// One scripted step of a headless session.
#[derive(Debug, Clone, PartialEq)]
pub enum WalkthroughStep {
    Frames(u32),
    Key { key: String, pressed: bool },
    Preset(CameraPreset),
    ClickBuilding(String),
    SetView(ViewMode),
    TimeOfDay(TimeOfDay),
    ContextLost,
    ContextRestored,
}

impl WalkthroughStep {
    pub fn press(key: &str) -> Self {
        Self::Key { key: key.to_string(), pressed: true }
    }

    pub fn release(key: &str) -> Self {
        Self::Key { key: key.to_string(), pressed: false }
    }

    /// Tour used by the harness binary: look around, pick a building, walk, change the light.
    pub fn tour(frames_per_leg: u32) -> Vec<Self> {
        vec![
            Self::Frames(frames_per_leg),
            Self::Preset(CameraPreset::Overview),
            Self::Frames(frames_per_leg),
            Self::ClickBuilding("firestone".to_string()),
            Self::TimeOfDay(TimeOfDay::Sunset),
            Self::SetView(ViewMode::FirstPerson),
            Self::press("w"),
            Self::Frames(frames_per_leg),
            Self::press("d"),
            Self::Frames(frames_per_leg / 2),
            Self::release("w"),
            Self::release("d"),
            Self::Frames(frames_per_leg),
            Self::TimeOfDay(TimeOfDay::Night),
            Self::ContextLost,
            Self::Frames(2),
            Self::ContextRestored,
            Self::press("v"),
            Self::Frames(frames_per_leg),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct WalkthroughReport {
    pub frames: u32,
    pub events: Vec<CampusEvent>,
    pub final_pose: PlayerPose,
    pub final_mode: ViewMode,
    pub selected: Option<BuildingId>,
    pub reloads: u32,
}

fn click_building(app: &mut CampusApp, id: &str) -> ClickOutcome {
    let Some(entity) = app.scene().building_entity(id) else {
        warn!(building = id, "walkthrough building not found");
        return ClickOutcome::Unchanged;
    };
    let Some(transform) = app.scene().transform(entity) else {
        return ClickOutcome::Unchanged;
    };
    let anchor = transform.translation + Vec3::Y * 2.0;
    match app.camera().project_point(anchor, app.viewport()) {
        Some(screen) => app.click(screen),
        None => {
            warn!(building = id, "building is behind the camera");
            ClickOutcome::Unchanged
        }
    }
}

/// Drives the app through `steps` at a fixed frame time.
pub fn run_walkthrough(app: &mut CampusApp, steps: &[WalkthroughStep], dt: f32) -> anyhow::Result<WalkthroughReport> {
    let mut frames = 0u32;
    let mut reloads = 0u32;
    let mut events = Vec::new();
    for step in steps {
        debug!(?step, "walkthrough step");
        match step {
            WalkthroughStep::Frames(count) => {
                for _ in 0..*count {
                    let report = app.frame(dt);
                    frames += 1;
                    events.extend(report.events);
                    if report.reload_due {
                        app.reload()?;
                        reloads += 1;
                    }
                }
            }
            WalkthroughStep::Key { key, pressed } => {
                app.push_input(InputEvent::Key { key: Key::Character(key.as_str().into()), pressed: *pressed });
            }
            WalkthroughStep::Preset(preset) => {
                app.apply_preset(*preset);
            }
            WalkthroughStep::ClickBuilding(id) => {
                let outcome = click_building(app, id);
                info!(building = id.as_str(), ?outcome, "walkthrough click");
            }
            WalkthroughStep::SetView(mode) => {
                app.set_view_mode(*mode);
            }
            WalkthroughStep::TimeOfDay(time_of_day) => app.set_time_of_day(*time_of_day),
            WalkthroughStep::ContextLost => {
                app.on_context_lost();
            }
            WalkthroughStep::ContextRestored => {
                app.on_context_restored();
            }
        }
    }
    events.extend(app.drain_events());
    let pose = app.movement().pose();
    info!(
        frames,
        reloads,
        x = pose.position.x,
        z = pose.position.z,
        mode = %app.view().mode(),
        "walkthrough finished"
    );
    Ok(WalkthroughReport {
        frames,
        events,
        final_pose: pose,
        final_mode: app.view().mode(),
        selected: app.selection().selected().cloned(),
        reloads,
    })
}
