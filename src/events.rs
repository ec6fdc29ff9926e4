use crate::campus::BuildingId;
use crate::resilience::RecoveryActions;
use crate::scene::TimeOfDay;
use crate::view::ViewMode;
use bevy_ecs::prelude::Resource;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum CampusEvent {
    ViewModeChanged { from: ViewMode, to: ViewMode },
    TimeOfDayChanged { time_of_day: TimeOfDay },
    LabelsToggled { visible: bool },
    LowGraphicsChanged { enabled: bool },
    BuildingSelected { id: BuildingId },
    SelectionCleared,
    PointerReleased,
    Recovery { actions: RecoveryActions },
    ReloadScheduled { delay: Duration, reason: String },
}

impl fmt::Display for CampusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampusEvent::ViewModeChanged { from, to } => write!(f, "ViewModeChanged from={from} to={to}"),
            CampusEvent::TimeOfDayChanged { time_of_day } => write!(f, "TimeOfDayChanged {time_of_day}"),
            CampusEvent::LabelsToggled { visible } => write!(f, "LabelsToggled visible={visible}"),
            CampusEvent::LowGraphicsChanged { enabled } => write!(f, "LowGraphicsChanged enabled={enabled}"),
            CampusEvent::BuildingSelected { id } => write!(f, "BuildingSelected id={id}"),
            CampusEvent::SelectionCleared => f.write_str("SelectionCleared"),
            CampusEvent::PointerReleased => f.write_str("PointerReleased"),
            CampusEvent::Recovery { actions } => write!(f, "Recovery actions={actions:?}"),
            CampusEvent::ReloadScheduled { delay, reason } => {
                write!(f, "ReloadScheduled in={:.1}s reason={reason}", delay.as_secs_f32())
            }
        }
    }
}

#[derive(Default, Resource)]
pub struct EventBus {
    events: Vec<CampusEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: CampusEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<CampusEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
