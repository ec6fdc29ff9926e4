use super::{RecoveryActions, ResilienceMonitor};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFault {
    /// The device or surface is gone and every GPU resource must be rebuilt.
    ContextLost,
    OutOfMemory,
    /// Outdated, timed out or unspecified; the next frame simply tries again.
    Transient,
}

pub fn classify_surface_error(error: &wgpu::SurfaceError) -> SurfaceFault {
    match error {
        wgpu::SurfaceError::Lost => SurfaceFault::ContextLost,
        wgpu::SurfaceError::OutOfMemory => SurfaceFault::OutOfMemory,
        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => {
            SurfaceFault::Transient
        }
    }
}

impl ResilienceMonitor {
    /// Feeds a frame acquisition failure into the recovery policy.
    pub fn on_surface_error(&mut self, error: &wgpu::SurfaceError) -> RecoveryActions {
        match classify_surface_error(error) {
            SurfaceFault::ContextLost => self.on_context_lost(),
            SurfaceFault::OutOfMemory => self.critical_memory(),
            SurfaceFault::Transient => {
                debug!(error = %error, "transient surface error");
                RecoveryActions::empty()
            }
        }
    }
}
