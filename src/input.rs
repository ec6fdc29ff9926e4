use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;
use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key, NamedKey};

pub const DEFAULT_BINDINGS_PATH: &str = "config/input.json";

/// Raw input collector. Events only record state here; the frame tick decides what they mean.
pub struct Input {
    bindings: InputBindings,
    pub mouse_delta: (f32, f32),
    pub wheel: f32,
    actions: Vec<(InputAction, bool)>,
    cursor_pos: Option<(f32, f32)>,
    left_pressed: bool,
    left_clicked: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(path: impl AsRef<Path>) -> Self {
        Self::with_bindings(InputBindings::load_or_default(path))
    }

    pub fn with_bindings(bindings: InputBindings) -> Self {
        Self {
            bindings,
            mouse_delta: (0.0, 0.0),
            wheel: 0.0,
            actions: Vec::new(),
            cursor_pos: None,
            left_pressed: false,
            left_clicked: false,
        }
    }

    pub fn push(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::Key { key, pressed } => {
                let actions: Vec<_> = self.bindings.actions_for_event_key(&key).collect();
                self.actions.extend(actions.into_iter().map(|action| (action, pressed)));
            }
            InputEvent::MouseMove { dx, dy } => {
                self.mouse_delta.0 += dx;
                self.mouse_delta.1 += dy;
            }
            InputEvent::Wheel { delta } => {
                self.wheel += delta;
            }
            InputEvent::MouseButton { button: MouseButton::Left, pressed } => {
                if pressed {
                    self.left_clicked = true;
                }
                self.left_pressed = pressed;
            }
            InputEvent::MouseButton { .. } => {}
            InputEvent::CursorPos { x, y } => {
                self.cursor_pos = Some((x, y));
            }
            InputEvent::Other => {}
        }
    }

    /// Bound actions in arrival order with their pressed state.
    pub fn take_actions(&mut self) -> Vec<(InputAction, bool)> {
        std::mem::take(&mut self.actions)
    }

    pub fn take_mouse_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.mouse_delta)
    }

    pub fn consume_wheel_delta(&mut self) -> Option<f32> {
        if self.wheel.abs() > 0.0 {
            Some(std::mem::take(&mut self.wheel))
        } else {
            None
        }
    }

    pub fn take_left_click(&mut self) -> bool {
        std::mem::take(&mut self.left_clicked)
    }

    pub fn left_held(&self) -> bool {
        self.left_pressed
    }

    pub fn cursor_position(&self) -> Option<(f32, f32)> {
        self.cursor_pos
    }

    pub fn clear_frame(&mut self) {
        self.actions.clear();
        self.mouse_delta = (0.0, 0.0);
        self.wheel = 0.0;
        self.left_clicked = false;
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::with_bindings(InputBindings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    /// Releases pointer capture and closes open overlays.
    Escape,
    ToggleView,
    ToggleLabels,
    CycleTimeOfDay,
    ToggleLowGraphics,
}

impl InputAction {
    fn from_str(value: &str) -> Option<Self> {
        match value {
            "move_forward" => Some(Self::MoveForward),
            "move_backward" => Some(Self::MoveBackward),
            "move_left" => Some(Self::MoveLeft),
            "move_right" => Some(Self::MoveRight),
            "escape" => Some(Self::Escape),
            "toggle_view" => Some(Self::ToggleView),
            "toggle_labels" => Some(Self::ToggleLabels),
            "cycle_time_of_day" => Some(Self::CycleTimeOfDay),
            "toggle_low_graphics" => Some(Self::ToggleLowGraphics),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputBindings {
    key_to_actions: HashMap<InputKeyBinding, Vec<InputAction>>,
}

impl InputBindings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read input bindings {}", path.display()))?;
        let config: InputConfigFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse input bindings {}", path.display()))?;
        Ok(Self::from_config(config, &path.display().to_string()))
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(bindings) => bindings,
            Err(err) => {
                warn!(error = ?err, "input bindings unavailable; using defaults");
                Self::default()
            }
        }
    }

    fn from_config(config: InputConfigFile, origin: &str) -> Self {
        let mut action_map = Self::default_action_map();
        for (action, keys) in config.into_overrides(origin) {
            action_map.insert(action, keys);
        }
        Self::from_action_map(action_map)
    }

    fn default_action_map() -> HashMap<InputAction, Vec<InputKeyBinding>> {
        use InputAction::*;
        let mut map = HashMap::new();
        map.insert(MoveForward, vec![InputKeyBinding::character("w"), InputKeyBinding::named(NamedKeyCode::ArrowUp)]);
        map.insert(
            MoveBackward,
            vec![InputKeyBinding::character("s"), InputKeyBinding::named(NamedKeyCode::ArrowDown)],
        );
        map.insert(MoveLeft, vec![InputKeyBinding::character("a"), InputKeyBinding::named(NamedKeyCode::ArrowLeft)]);
        map.insert(MoveRight, vec![InputKeyBinding::character("d"), InputKeyBinding::named(NamedKeyCode::ArrowRight)]);
        map.insert(Escape, vec![InputKeyBinding::named(NamedKeyCode::Escape)]);
        map.insert(ToggleView, vec![InputKeyBinding::character("v")]);
        map.insert(ToggleLabels, vec![InputKeyBinding::character("l")]);
        map.insert(CycleTimeOfDay, vec![InputKeyBinding::character("t")]);
        map.insert(ToggleLowGraphics, vec![InputKeyBinding::character("g")]);
        map
    }

    fn from_action_map(action_map: HashMap<InputAction, Vec<InputKeyBinding>>) -> Self {
        let mut key_to_actions: HashMap<InputKeyBinding, Vec<InputAction>> = HashMap::new();
        for (action, keys) in action_map {
            for key in keys {
                key_to_actions.entry(key).or_default().push(action);
            }
        }
        Self { key_to_actions }
    }

    pub fn actions_for_event_key(&self, key: &Key) -> impl Iterator<Item = InputAction> + '_ {
        InputKeyBinding::from_event_key(key)
            .and_then(|binding| self.key_to_actions.get(&binding))
            .into_iter()
            .flatten()
            .copied()
    }
}

impl Default for InputBindings {
    fn default() -> Self {
        Self::from_action_map(Self::default_action_map())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InputKeyBinding {
    Character(String),
    Named(NamedKeyCode),
}

impl InputKeyBinding {
    fn character(ch: &str) -> Self {
        Self::Character(ch.to_lowercase())
    }

    fn named(named: NamedKeyCode) -> Self {
        Self::Named(named)
    }

    fn from_event_key(key: &Key) -> Option<Self> {
        match key {
            Key::Character(ch) => {
                let s = ch.to_string();
                if s.is_empty() {
                    None
                } else {
                    Some(Self::Character(s.to_lowercase()))
                }
            }
            Key::Named(named) => NamedKeyCode::from_named_key(named).map(Self::Named),
            _ => None,
        }
    }

    fn from_config_value(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        if let Some(named) = NamedKeyCode::from_str(&normalized) {
            return Some(Self::Named(named));
        }
        (normalized.chars().count() == 1).then_some(Self::Character(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NamedKeyCode {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Escape,
    Space,
    Shift,
    Control,
}

impl NamedKeyCode {
    fn from_named_key(key: &NamedKey) -> Option<Self> {
        match key {
            NamedKey::ArrowUp => Some(Self::ArrowUp),
            NamedKey::ArrowDown => Some(Self::ArrowDown),
            NamedKey::ArrowLeft => Some(Self::ArrowLeft),
            NamedKey::ArrowRight => Some(Self::ArrowRight),
            NamedKey::Escape => Some(Self::Escape),
            NamedKey::Space => Some(Self::Space),
            NamedKey::Shift => Some(Self::Shift),
            NamedKey::Control => Some(Self::Control),
            _ => None,
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "up" | "arrow_up" | "arrowup" => Some(Self::ArrowUp),
            "down" | "arrow_down" | "arrowdown" => Some(Self::ArrowDown),
            "left" | "arrow_left" | "arrowleft" => Some(Self::ArrowLeft),
            "right" | "arrow_right" | "arrowright" => Some(Self::ArrowRight),
            "escape" | "esc" => Some(Self::Escape),
            "space" => Some(Self::Space),
            "shift" | "left_shift" | "right_shift" => Some(Self::Shift),
            "ctrl" | "control" | "left_ctrl" | "right_ctrl" => Some(Self::Control),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputConfigFile {
    #[serde(default)]
    bindings: HashMap<String, Vec<String>>,
}

impl InputConfigFile {
    fn into_overrides(self, origin: &str) -> HashMap<InputAction, Vec<InputKeyBinding>> {
        let mut overrides = HashMap::new();
        for (action_name, keys) in self.bindings {
            let Some(action) = InputAction::from_str(&action_name.trim().to_lowercase()) else {
                warn!(origin, action = %action_name, "unknown input action ignored");
                continue;
            };
            let mut parsed = Vec::new();
            for key in keys {
                match InputKeyBinding::from_config_value(&key) {
                    Some(binding) => parsed.push(binding),
                    None => warn!(origin, action = %action_name, key = %key, "unknown key ignored"),
                }
            }
            if parsed.is_empty() {
                warn!(origin, action = %action_name, "no valid keys; keeping defaults");
                continue;
            }
            overrides.insert(action, parsed);
        }
        overrides
    }
}

pub enum InputEvent {
    Key { key: Key, pressed: bool },
    MouseMove { dx: f32, dy: f32 },
    Wheel { delta: f32 },
    MouseButton { button: MouseButton, pressed: bool },
    CursorPos { x: f32, y: f32 },
    Other,
}

impl InputEvent {
    pub fn from_window_event(ev: &WindowEvent) -> Self {
        match ev {
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32,
                };
                InputEvent::Wheel { delta: d }
            }
            WindowEvent::CursorMoved { position, .. } => {
                InputEvent::CursorPos { x: position.x as f32, y: position.y as f32 }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                InputEvent::MouseButton { button: *button, pressed: *state == ElementState::Pressed }
            }
            WindowEvent::KeyboardInput { event, .. } => InputEvent::Key {
                key: event.logical_key.clone(),
                pressed: event.state == ElementState::Pressed,
            },
            _ => InputEvent::Other,
        }
    }

    pub fn from_device_event(ev: &DeviceEvent) -> Self {
        match ev {
            DeviceEvent::MouseMotion { delta: (dx, dy) } => InputEvent::MouseMove { dx: *dx as f32, dy: *dy as f32 },
            _ => InputEvent::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_wasd_share_movement_actions() {
        let bindings = InputBindings::default();
        let up: Vec<_> = bindings.actions_for_event_key(&Key::Named(NamedKey::ArrowUp)).collect();
        let w: Vec<_> = bindings.actions_for_event_key(&Key::Character("W".into())).collect();
        assert_eq!(up, vec![InputAction::MoveForward]);
        assert_eq!(w, up);
    }

    #[test]
    fn unbound_keys_produce_nothing() {
        let mut input = Input::new();
        input.push(InputEvent::Key { key: Key::Character("x".into()), pressed: true });
        assert!(input.take_actions().is_empty());
    }

    #[test]
    fn click_is_reported_once() {
        let mut input = Input::new();
        input.push(InputEvent::MouseButton { button: MouseButton::Left, pressed: true });
        assert!(input.take_left_click());
        assert!(!input.take_left_click());
        assert!(input.left_held());
    }
}
