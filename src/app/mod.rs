//! The viewer's state store. Input callbacks only record flags; [`CampusApp::frame`] is the one
//! place where camera, movement, animation and recovery state advance.

mod render_settings;
mod shell;
mod walkthrough;

pub use render_settings::RenderSettings;
pub use shell::run_windowed;
pub use walkthrough::{run_walkthrough, WalkthroughReport, WalkthroughStep};

use crate::avatar::{AvatarPresenter, AvatarSource, AvatarVariant, GaitParams, JointAngles, SkeletonPose, WalkCycle};
use crate::campus::BuildingRegistry;
use crate::config::{AppConfig, AppConfigOverrides};
use crate::events::{CampusEvent, EventBus};
use crate::input::{Input, InputAction, InputEvent, DEFAULT_BINDINGS_PATH};
use crate::resilience::{HeapUsage, MemoryProbe, MemorySample, RecoveryActions, ResilienceMonitor, ResilienceState};
use crate::scene::composer::{CampusScene, Label};
use crate::scene::{lighting_preset, LightingPreset, LightingUniform};
use crate::selection::{ClickOutcome, InfoPanelContent, Selection};
use crate::services::UserProfile;
use crate::view::{
    Camera3D, CameraPreset, ModeSwitch, MoveDirection, MovementController, NoCapture, PlayerPose, PointerCapture,
    ViewController, ViewMode, ViewState,
};
use anyhow::{Context, Result};
use bevy_ecs::entity::Entity;
use glam::{Vec2, Vec3};
use tracing::{debug, error, info};
use winit::dpi::PhysicalSize;

const ZOOM_STEP: f32 = 0.1;

const RENDERER_ACTIONS: RecoveryActions = RecoveryActions::FREE_GPU_RESOURCES
    .union(RecoveryActions::RECOMPILE_MATERIALS)
    .union(RecoveryActions::FORCE_REDRAW);

/// Loads config with CLI overrides on top, the same way both entry points start.
pub fn load_config(path: &str, overrides: &AppConfigOverrides) -> AppConfig {
    let mut config = AppConfig::load_or_default(path);
    config.apply_overrides(overrides);
    if !overrides.is_empty() {
        info!(fields = ?overrides.applied_fields(), "applied command line overrides");
    }
    config
}

/// What one frame produced.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub view_mode: ViewMode,
    pub pose: PlayerPose,
    pub joints: JointAngles,
    pub avatar: AvatarVariant,
    pub recovery: RecoveryActions,
    pub rendering_suspended: bool,
    pub reload_due: bool,
    pub events: Vec<CampusEvent>,
}

struct SceneProbe<'a> {
    scene: &'a mut CampusScene,
    heap: Option<HeapUsage>,
}

impl MemoryProbe for SceneProbe<'_> {
    fn sample(&mut self) -> MemorySample {
        let geometries = u32::try_from(self.scene.estimated_geometries()).unwrap_or(u32::MAX);
        MemorySample { heap: self.heap, textures: 0, geometries }
    }
}

pub struct CampusApp {
    config: AppConfig,
    registry: BuildingRegistry,
    scene: CampusScene,
    view: ViewController,
    movement: MovementController,
    walk: WalkCycle,
    skeleton: SkeletonPose,
    avatar: AvatarPresenter,
    avatar_source: AvatarSource,
    selection: Selection,
    resilience: ResilienceMonitor,
    events: EventBus,
    input: Input,
    render: RenderSettings,
    capture: Box<dyn PointerCapture>,
    viewport: PhysicalSize<u32>,
    hovered: Option<Entity>,
    heap: Option<HeapUsage>,
    rendering_suspended: bool,
    /// Recovery steps only the renderer can carry out, held until the shell drains them.
    renderer_actions: RecoveryActions,
}

impl CampusApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        let input = Input::from_config(DEFAULT_BINDINGS_PATH);
        Self::with_input(config, input)
    }

    pub fn with_input(config: AppConfig, input: Input) -> Result<Self> {
        let registry = BuildingRegistry::embedded().context("Failed to load the building registry")?;
        let scene = CampusScene::compose(&registry, &config.scene);
        let view = ViewController::new(&config);
        let movement = MovementController::new(&config.movement, &config.first_person);
        let walk = WalkCycle::new(GaitParams::from(&config.avatar));
        let avatar = AvatarPresenter::new(&config.avatar);
        let resilience = ResilienceMonitor::new(config.resilience.clone());
        let render = RenderSettings::new(config.session.low_graphics);
        let viewport = PhysicalSize::new(config.window.width, config.window.height);
        info!(buildings = registry.len(), mode = %view.mode(), "campus viewer ready");
        Ok(Self {
            config,
            registry,
            scene,
            view,
            movement,
            walk,
            skeleton: SkeletonPose::default(),
            avatar,
            avatar_source: AvatarSource::Default,
            selection: Selection::default(),
            resilience,
            events: EventBus::default(),
            input,
            render,
            capture: Box::new(NoCapture::default()),
            viewport,
            hovered: None,
            heap: None,
            rendering_suspended: false,
            renderer_actions: RecoveryActions::empty(),
        })
    }

    pub fn set_capture(&mut self, capture: Box<dyn PointerCapture>) {
        self.capture = capture;
    }

    /// Rebuilds every piece of session state, as a page reload would.
    pub fn reload(&mut self) -> Result<()> {
        let mut input = Input::new();
        std::mem::swap(&mut input, &mut self.input);
        input.clear_frame();
        let capture = std::mem::replace(&mut self.capture, Box::new(NoCapture::default()));
        let viewport = self.viewport;
        let source = self.avatar_source.clone();
        *self = Self::with_input(self.config.clone(), input)?;
        self.capture = capture;
        self.capture.release();
        self.viewport = viewport;
        self.avatar_source = source;
        info!("viewer state reloaded");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &BuildingRegistry {
        &self.registry
    }

    pub fn scene(&self) -> &CampusScene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut CampusScene {
        &mut self.scene
    }

    pub fn view_state(&self) -> ViewState {
        self.view.state()
    }

    pub fn view(&self) -> &ViewController {
        &self.view
    }

    pub fn movement(&self) -> &MovementController {
        &self.movement
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn resilience(&self) -> &ResilienceMonitor {
        &self.resilience
    }

    pub fn render_settings(&self) -> RenderSettings {
        self.render
    }

    pub fn avatar_source(&self) -> &AvatarSource {
        &self.avatar_source
    }

    pub fn avatar_variant(&self) -> AvatarVariant {
        self.avatar.variant()
    }

    pub fn viewport(&self) -> PhysicalSize<u32> {
        self.viewport
    }

    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.viewport = size;
        }
    }

    pub fn camera(&self) -> Camera3D {
        self.view.camera(&self.movement)
    }

    pub fn lighting(&self) -> LightingPreset {
        lighting_preset(self.view.state().time_of_day)
    }

    pub fn lighting_uniform(&self) -> LightingUniform {
        LightingUniform::from_preset(&self.lighting())
    }

    /// Bone rotations from the latest frame.
    pub fn skeleton(&self) -> &SkeletonPose {
        &self.skeleton
    }

    pub fn labels(&mut self) -> Vec<(Vec3, Label)> {
        let visible = self.view.state().show_labels;
        self.scene.labels(visible)
    }

    pub fn info_panel(&self) -> Option<InfoPanelContent> {
        self.selection.info_panel(&self.registry)
    }

    pub fn hovered(&self) -> Option<Entity> {
        self.hovered
    }

    pub fn drain_events(&mut self) -> Vec<CampusEvent> {
        self.events.drain()
    }

    pub fn apply_profile(&mut self, profile: &UserProfile) {
        self.avatar_source = AvatarSource::resolve(profile.avatar_url.as_deref());
        debug!(user = %profile.id, source = ?self.avatar_source, "avatar source resolved");
    }

    pub fn camera_denied(&mut self) {
        self.avatar_source = AvatarSource::camera_denied();
    }

    pub fn report_avatar_render_error(&mut self, detail: &str) {
        self.avatar.report_render_error(detail);
    }

    /// Latest JS-heap style reading, when the platform exposes one.
    pub fn set_heap_usage(&mut self, heap: Option<HeapUsage>) {
        self.heap = heap;
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) -> Option<ModeSwitch> {
        let switch = self.view.set_mode(mode, &mut self.movement, self.capture.as_mut())?;
        self.record_switch(switch);
        Some(switch)
    }

    pub fn toggle_view_mode(&mut self) -> Option<ModeSwitch> {
        self.set_view_mode(self.view.mode().toggled())
    }

    fn record_switch(&mut self, switch: ModeSwitch) {
        if switch.released_capture {
            self.events.push(CampusEvent::PointerReleased);
        }
        self.events.push(CampusEvent::ViewModeChanged { from: switch.from, to: switch.to });
        self.clear_hover();
    }

    pub fn set_time_of_day(&mut self, time_of_day: crate::scene::TimeOfDay) {
        if self.view.set_time_of_day(time_of_day) {
            self.events.push(CampusEvent::TimeOfDayChanged { time_of_day });
        }
    }

    pub fn set_show_labels(&mut self, visible: bool) {
        if self.view.state().show_labels != visible {
            self.view.set_show_labels(visible);
            self.events.push(CampusEvent::LabelsToggled { visible });
        }
    }

    pub fn set_low_graphics(&mut self, enabled: bool) {
        if self.view.set_low_graphics(enabled) {
            self.render.set_low_graphics(enabled);
            self.events.push(CampusEvent::LowGraphicsChanged { enabled });
        }
    }

    pub fn apply_preset(&mut self, preset: CameraPreset) -> bool {
        self.view.apply_preset(preset)
    }

    /// Escape: drop pointer capture and close the info panel.
    pub fn escape(&mut self) {
        if self.capture.is_captured() {
            self.capture.release();
            self.events.push(CampusEvent::PointerReleased);
        }
        if self.selection.close() == ClickOutcome::Cleared {
            self.events.push(CampusEvent::SelectionCleared);
        }
    }

    fn handle_action(&mut self, action: InputAction, pressed: bool) {
        let direction = match action {
            InputAction::MoveForward => Some(MoveDirection::Forward),
            InputAction::MoveBackward => Some(MoveDirection::Backward),
            InputAction::MoveLeft => Some(MoveDirection::Left),
            InputAction::MoveRight => Some(MoveDirection::Right),
            _ => None,
        };
        if let Some(direction) = direction {
            if self.view.is_first_person() {
                self.movement.set_key(direction, pressed);
            }
            return;
        }
        if !pressed {
            return;
        }
        match action {
            InputAction::Escape => self.escape(),
            InputAction::ToggleView => {
                self.toggle_view_mode();
            }
            InputAction::ToggleLabels => self.set_show_labels(!self.view.state().show_labels),
            InputAction::CycleTimeOfDay => self.set_time_of_day(self.view.state().time_of_day.next()),
            InputAction::ToggleLowGraphics => self.set_low_graphics(!self.view.state().low_graphics),
            _ => {}
        }
    }

    fn process_input(&mut self) {
        for (action, pressed) in self.input.take_actions() {
            self.handle_action(action, pressed);
        }
        let (dx, dy) = self.input.take_mouse_delta();
        let delta = Vec2::new(dx, dy);
        if delta != Vec2::ZERO {
            let looking = self.view.is_first_person() && self.capture.is_captured();
            let dragging = !self.view.is_first_person() && self.input.left_held();
            if looking || dragging {
                self.view.pointer_motion(delta, &mut self.movement);
            }
        }
        if let Some(wheel) = self.input.consume_wheel_delta() {
            self.view.zoom(1.0 - wheel * ZOOM_STEP);
        }
        if self.input.take_left_click() {
            match self.input.cursor_position() {
                Some((x, y)) => {
                    self.click(Vec2::new(x, y));
                }
                None if self.view.is_first_person() => {
                    self.click(self.viewport_centre());
                }
                None => {}
            }
        }
    }

    fn viewport_centre(&self) -> Vec2 {
        Vec2::new(self.viewport.width as f32 / 2.0, self.viewport.height as f32 / 2.0)
    }

    /// A click in first-person first grabs the pointer; once captured it picks through the
    /// crosshair. In orbital mode it picks under the cursor.
    pub fn click(&mut self, screen: Vec2) -> ClickOutcome {
        let screen = if self.view.is_first_person() {
            if !self.capture.is_captured() {
                self.capture.grab();
                return ClickOutcome::Unchanged;
            }
            self.viewport_centre()
        } else {
            screen
        };
        let hit = self
            .camera()
            .screen_ray(screen, self.viewport)
            .and_then(|(origin, dir)| self.scene.pick(origin, dir));
        let outcome = self.selection.click(hit.as_ref());
        match &outcome {
            ClickOutcome::Selected(id) => self.events.push(CampusEvent::BuildingSelected { id: id.clone() }),
            ClickOutcome::Cleared => self.events.push(CampusEvent::SelectionCleared),
            ClickOutcome::Unchanged => {}
        }
        outcome
    }

    fn clear_hover(&mut self) {
        if self.hovered.take().is_some() {
            self.scene.clear_hover();
        }
    }

    fn update_hover(&mut self) {
        if self.view.is_first_person() || self.scene.is_disposed() {
            self.clear_hover();
            return;
        }
        let Some((x, y)) = self.input.cursor_position() else {
            return;
        };
        let target = self
            .camera()
            .screen_ray(Vec2::new(x, y), self.viewport)
            .and_then(|(origin, dir)| self.scene.pick(origin, dir))
            .filter(|hit| hit.interactable)
            .map(|hit| hit.entity);
        if target == self.hovered {
            return;
        }
        if let Some(previous) = self.hovered.take() {
            self.scene.set_hover(previous, false);
        }
        if let Some(entity) = target {
            self.scene.set_hover(entity, true);
        }
        self.hovered = target;
    }

    pub fn on_context_lost(&mut self) -> RecoveryActions {
        let actions = self.resilience.on_context_lost();
        self.apply_recovery(actions);
        actions
    }

    pub fn on_context_restored(&mut self) -> RecoveryActions {
        let actions = self.resilience.on_context_restored();
        self.apply_recovery(actions);
        actions
    }

    pub fn on_surface_error(&mut self, error: &wgpu::SurfaceError) -> RecoveryActions {
        let actions = self.resilience.on_surface_error(error);
        self.apply_recovery(actions);
        actions
    }

    /// Pending GPU-side recovery steps: freeing resources, recompiling materials, forcing a redraw.
    pub fn take_renderer_actions(&mut self) -> RecoveryActions {
        std::mem::take(&mut self.renderer_actions)
    }

    fn apply_recovery(&mut self, actions: RecoveryActions) {
        if actions.is_empty() {
            return;
        }
        if actions.contains(RecoveryActions::SUSPEND_RENDERING) {
            self.rendering_suspended = true;
            self.movement.reset();
        }
        if actions.contains(RecoveryActions::RESUME_RENDERING) {
            self.rendering_suspended = false;
        }
        if actions.contains(RecoveryActions::ENTER_LOW_GRAPHICS) {
            self.set_low_graphics(true);
        }
        if actions.contains(RecoveryActions::PIN_PIXEL_RATIO) {
            self.render.pin_pixel_ratio();
        }
        if actions.contains(RecoveryActions::CLEAR_CACHES) {
            debug!("clearing cached gpu resources");
        }
        let for_renderer = actions & RENDERER_ACTIONS;
        if !for_renderer.is_empty() {
            debug!(actions = ?for_renderer, "renderer recovery queued");
            self.renderer_actions |= for_renderer;
        }
        if actions.contains(RecoveryActions::DISPOSE_SCENE) {
            self.hovered = None;
            self.scene.dispose();
        }
        self.events.push(CampusEvent::Recovery { actions });
        if actions.contains(RecoveryActions::SCHEDULE_RELOAD) {
            if let Some(reload) = self.resilience.scheduled_reload() {
                error!(reason = reload.reason.label(), "viewer reload scheduled");
                self.events.push(CampusEvent::ReloadScheduled {
                    delay: reload.delay,
                    reason: reload.reason.label().to_string(),
                });
            }
        }
    }

    pub fn frame(&mut self, dt: f32) -> FrameReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.process_input();

        let mut probe = SceneProbe { scene: &mut self.scene, heap: self.heap };
        let recovery = self.resilience.tick(dt, &mut probe);
        self.apply_recovery(recovery);

        let moving = self.view.is_first_person() && self.movement.state().is_moving();
        let joints = if self.rendering_suspended {
            JointAngles::NEUTRAL
        } else {
            if self.view.is_first_person() {
                self.movement.step(dt);
            }
            self.view.update();
            self.update_hover();
            self.walk.tick(dt, moving)
        };
        joints.apply_to(&mut self.skeleton);
        let avatar = self.avatar.tick(dt);
        if self.resilience.state() == ResilienceState::ContextLost {
            debug!("frame skipped while the graphics context is lost");
        }

        FrameReport {
            view_mode: self.view.mode(),
            pose: self.movement.pose(),
            joints,
            avatar,
            recovery,
            rendering_suspended: self.rendering_suspended,
            reload_due: self.resilience.reload_due(),
            events: self.events.drain(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputBindings;
    use crate::scene::TimeOfDay;
    use winit::keyboard::{Key, NamedKey};

    fn app() -> CampusApp {
        CampusApp::with_input(AppConfig::default(), Input::with_bindings(InputBindings::default()))
            .expect("campus app")
    }

    fn key(ch: &str, pressed: bool) -> InputEvent {
        InputEvent::Key { key: Key::Character(ch.into()), pressed }
    }

    #[test]
    fn movement_keys_ignored_in_orbital_mode() {
        let mut app = app();
        app.push_input(key("w", true));
        let report = app.frame(0.1);
        assert_eq!(report.view_mode, ViewMode::Orbital);
        assert!(!app.movement().state().is_moving());
        assert_eq!(report.pose, app.movement().spawn());
    }

    #[test]
    fn first_person_walk_moves_forward_and_animates() {
        let mut app = app();
        app.set_view_mode(ViewMode::FirstPerson);
        app.push_input(key("w", true));
        let mut report = app.frame(0.016);
        for _ in 0..30 {
            report = app.frame(0.016);
        }
        assert!(report.pose.position.z > app.movement().spawn().position.z);
        assert!((report.pose.position.y - app.config().first_person.eye_height).abs() < 1e-5);
        assert!(!report.joints.is_neutral());
        assert_ne!(app.skeleton().rotation(crate::avatar::Joint::LeftLeg), glam::Quat::IDENTITY);

        app.push_input(key("w", false));
        let report = app.frame(0.016);
        assert!(report.joints.is_neutral());
        assert_eq!(app.skeleton().rotation(crate::avatar::Joint::LeftLeg), glam::Quat::from_rotation_x(0.0));
    }

    #[test]
    fn renderer_recovery_steps_are_queued_until_drained() {
        let mut app = app();
        app.on_context_lost();
        assert_eq!(app.take_renderer_actions(), RecoveryActions::FREE_GPU_RESOURCES);
        assert!(app.take_renderer_actions().is_empty());

        app.on_context_restored();
        app.frame(0.016);
        let restored = app.take_renderer_actions();
        assert!(restored.contains(RecoveryActions::RECOMPILE_MATERIALS | RecoveryActions::FORCE_REDRAW));
        assert!(!restored.contains(RecoveryActions::FREE_GPU_RESOURCES));
    }

    #[test]
    fn toggle_keys_change_session_state() {
        let mut app = app();
        app.push_input(key("t", true));
        app.push_input(key("l", true));
        app.push_input(key("g", true));
        let report = app.frame(0.016);
        let state = app.view_state();
        assert_eq!(state.time_of_day, TimeOfDay::Sunset);
        assert!(!state.show_labels);
        assert!(state.low_graphics);
        assert!(!app.render_settings().shadows);
        assert!(report.events.contains(&CampusEvent::LowGraphicsChanged { enabled: true }));
        assert!(app.labels().is_empty());
    }

    #[test]
    fn leaving_first_person_releases_pointer() {
        let mut app = app();
        app.set_view_mode(ViewMode::FirstPerson);
        let first_click = app.click(Vec2::ZERO);
        assert_eq!(first_click, ClickOutcome::Unchanged);
        app.push_input(key("v", true));
        let report = app.frame(0.016);
        assert_eq!(report.view_mode, ViewMode::Orbital);
        assert!(report.events.contains(&CampusEvent::PointerReleased));
    }

    #[test]
    fn escape_closes_the_panel() {
        let mut app = app();
        let entity = app.scene().building_entity("firestone").expect("firestone");
        let id = app.scene().building_id(entity).cloned().expect("id");
        let hit = crate::scene::composer::PickHit { entity, distance: 1.0, building: Some(id), interactable: true };
        app.selection.click(Some(&hit));
        assert!(app.info_panel().is_some());
        app.push_input(InputEvent::Key { key: Key::Named(NamedKey::Escape), pressed: true });
        let report = app.frame(0.016);
        assert!(app.info_panel().is_none());
        assert!(report.events.contains(&CampusEvent::SelectionCleared));
    }

    #[test]
    fn critical_heap_disposes_scene_and_schedules_reload() {
        let mut app = app();
        app.set_heap_usage(Some(HeapUsage { used_bytes: 99, limit_bytes: 100 }));
        let report = app.frame(6.0);
        assert!(report.recovery.contains(RecoveryActions::DISPOSE_SCENE));
        assert!(app.scene().is_disposed());
        assert!(app.render_settings().is_pixel_ratio_pinned());
        assert!(report.events.iter().any(|e| matches!(e, CampusEvent::ReloadScheduled { .. })));
        app.frame(2.5);
        assert!(app.resilience().reload_due());
        app.reload().expect("reload");
        assert!(!app.scene().is_disposed());
        assert!(!app.resilience().reload_due());
    }

    #[test]
    fn profile_avatar_drives_source() {
        let mut app = app();
        let mut profile = UserProfile::new("u1", "a@b.edu", "Ada");
        profile.avatar_url = Some("https://models/ada.glb".into());
        app.apply_profile(&profile);
        assert_eq!(app.avatar_source(), &AvatarSource::Model { url: "https://models/ada.glb".into() });
        app.camera_denied();
        assert_eq!(app.avatar_source(), &AvatarSource::Default);
    }
}
