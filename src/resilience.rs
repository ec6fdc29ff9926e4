//! Graphics context loss and memory pressure handling.
//!
//! The monitor is a plain state machine fed with events and frame ticks. It never touches the
//! renderer; it answers with [`RecoveryActions`] for the caller to carry out. A scheduled reload
//! is terminal: once one is pending every further input is ignored.

pub mod surface;

pub use surface::{classify_surface_error, SurfaceFault};

use crate::config::ResilienceConfig;
use bitflags::bitflags;
use std::time::Duration;
use tracing::{debug, error, info, warn};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RecoveryActions: u32 {
        const SUSPEND_RENDERING = 1 << 0;
        const FREE_GPU_RESOURCES = 1 << 1;
        const RECOMPILE_MATERIALS = 1 << 2;
        const FORCE_REDRAW = 1 << 3;
        const RESUME_RENDERING = 1 << 4;
        const CLEAR_CACHES = 1 << 5;
        const ENTER_LOW_GRAPHICS = 1 << 6;
        const DISPOSE_SCENE = 1 << 7;
        const PIN_PIXEL_RATIO = 1 << 8;
        const SCHEDULE_RELOAD = 1 << 9;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResilienceState {
    Normal,
    ContextLost,
    ReloadScheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    RepeatedContextLoss,
    CriticalMemory,
}

impl ReloadReason {
    pub fn label(self) -> &'static str {
        match self {
            ReloadReason::RepeatedContextLoss => "repeated context loss",
            ReloadReason::CriticalMemory => "critical memory pressure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledReload {
    pub reason: ReloadReason,
    pub delay: Duration,
    /// Monitor clock time, in seconds, at which the reload should happen.
    pub due_at: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapUsage {
    pub used_bytes: u64,
    pub limit_bytes: u64,
}

impl HeapUsage {
    pub fn ratio(&self) -> Option<f64> {
        (self.limit_bytes > 0).then(|| self.used_bytes as f64 / self.limit_bytes as f64)
    }
}

/// One reading of memory counters. Heap figures are optional since not every platform has them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySample {
    pub heap: Option<HeapUsage>,
    pub textures: u32,
    pub geometries: u32,
}

pub trait MemoryProbe {
    fn sample(&mut self) -> MemorySample;
}

/// Probe that always reports the same reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedProbe(pub MemorySample);

impl MemoryProbe for FixedProbe {
    fn sample(&mut self) -> MemorySample {
        self.0
    }
}

pub struct ResilienceMonitor {
    config: ResilienceConfig,
    state: ResilienceState,
    consecutive_losses: u32,
    total_losses: u32,
    clock: f64,
    next_poll_at: f64,
    next_cleanup_at: f64,
    reload: Option<ScheduledReload>,
}

impl ResilienceMonitor {
    pub fn new(config: ResilienceConfig) -> Self {
        let next_poll_at = f64::from(config.initial_poll_delay_secs.max(0.0));
        let next_cleanup_at = f64::from(config.scheduled_cleanup_secs.max(0.0));
        Self {
            config,
            state: ResilienceState::Normal,
            consecutive_losses: 0,
            total_losses: 0,
            clock: 0.0,
            next_poll_at,
            next_cleanup_at,
            reload: None,
        }
    }

    pub fn state(&self) -> ResilienceState {
        self.state
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn total_losses(&self) -> u32 {
        self.total_losses
    }

    pub fn scheduled_reload(&self) -> Option<ScheduledReload> {
        self.reload
    }

    /// True once the monitor clock has passed the scheduled reload time.
    pub fn reload_due(&self) -> bool {
        self.reload.is_some_and(|reload| self.clock >= reload.due_at)
    }

    pub fn on_context_lost(&mut self) -> RecoveryActions {
        if self.reload.is_some() {
            return RecoveryActions::empty();
        }
        self.consecutive_losses += 1;
        self.total_losses += 1;
        self.state = ResilienceState::ContextLost;
        warn!(count = self.consecutive_losses, total = self.total_losses, "graphics context lost");
        let mut actions = RecoveryActions::SUSPEND_RENDERING | RecoveryActions::FREE_GPU_RESOURCES;
        if self.consecutive_losses >= self.config.reload_after_consecutive_losses {
            actions |= self.schedule_reload(ReloadReason::RepeatedContextLoss, self.config.context_loss_reload_delay());
        }
        actions
    }

    pub fn on_context_restored(&mut self) -> RecoveryActions {
        if self.reload.is_some() || self.state != ResilienceState::ContextLost {
            return RecoveryActions::empty();
        }
        self.state = ResilienceState::Normal;
        self.consecutive_losses = 0;
        info!(total = self.total_losses, "graphics context restored");
        let mut actions =
            RecoveryActions::RECOMPILE_MATERIALS | RecoveryActions::FORCE_REDRAW | RecoveryActions::RESUME_RENDERING;
        if self.total_losses >= self.config.low_graphics_after_losses {
            warn!(total = self.total_losses, "repeated context losses; requesting low graphics");
            actions |= RecoveryActions::ENTER_LOW_GRAPHICS;
        }
        actions
    }

    /// Advances the monitor clock, running the scheduled cleanup and the memory poll when due.
    pub fn tick(&mut self, dt: f32, probe: &mut dyn MemoryProbe) -> RecoveryActions {
        if dt.is_finite() && dt > 0.0 {
            self.clock += f64::from(dt);
        }
        if self.reload.is_some() {
            return RecoveryActions::empty();
        }
        let mut actions = RecoveryActions::empty();
        if self.clock >= self.next_cleanup_at {
            self.next_cleanup_at = self.clock + f64::from(self.config.scheduled_cleanup_secs.max(1.0));
            debug!("scheduled resource cleanup");
            actions |= RecoveryActions::CLEAR_CACHES;
        }
        if self.state == ResilienceState::Normal && self.clock >= self.next_poll_at {
            self.next_poll_at = self.clock + f64::from(self.config.memory_poll_secs.max(1.0));
            actions |= self.evaluate_memory(probe.sample());
        }
        actions
    }

    /// Applies the memory thresholds to one sample.
    pub fn evaluate_memory(&mut self, sample: MemorySample) -> RecoveryActions {
        if self.reload.is_some() {
            return RecoveryActions::empty();
        }
        let mut actions = RecoveryActions::empty();
        if sample.textures > self.config.texture_limit || sample.geometries > self.config.geometry_limit {
            warn!(textures = sample.textures, geometries = sample.geometries, "high GPU resource count");
            actions |= RecoveryActions::CLEAR_CACHES;
        }
        let Some(ratio) = sample.heap.and_then(|heap| heap.ratio()) else {
            return actions;
        };
        debug!(ratio, "memory sampled");
        if ratio > self.config.cleanup_memory_ratio {
            warn!(ratio, "high memory usage; cleaning up");
            actions |= RecoveryActions::CLEAR_CACHES | RecoveryActions::ENTER_LOW_GRAPHICS;
        }
        if ratio > self.config.emergency_memory_ratio {
            actions |= self.critical_memory();
        }
        actions
    }

    /// Emergency path: drop the scene and reload shortly after.
    pub fn critical_memory(&mut self) -> RecoveryActions {
        if self.reload.is_some() {
            return RecoveryActions::empty();
        }
        RecoveryActions::CLEAR_CACHES
            | RecoveryActions::DISPOSE_SCENE
            | RecoveryActions::PIN_PIXEL_RATIO
            | self.schedule_reload(ReloadReason::CriticalMemory, self.config.emergency_reload_delay())
    }

    fn schedule_reload(&mut self, reason: ReloadReason, delay: Duration) -> RecoveryActions {
        let reload = ScheduledReload { reason, delay, due_at: self.clock + delay.as_secs_f64() };
        error!(reason = reason.label(), delay_ms = delay.as_millis() as u64, "reload scheduled");
        self.reload = Some(reload);
        self.state = ResilienceState::ReloadScheduled;
        RecoveryActions::SCHEDULE_RELOAD
    }
}
