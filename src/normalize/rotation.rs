//! Display metrics tracking and rotation into the canonical basis
//!
//! Every pointer coordinate is mapped into [`Basis::Landscape90`] regardless of
//! how the device is currently held. Coordinates stay in pixels; nothing is
//! clamped or normalized to 0..1.
//!
//! | rotation | x'           | y'            |
//! |----------|--------------|---------------|
//! | 0        | height - y   | x             |
//! | 1        | x            | y             |
//! | 2        | y            | width - x     |
//! | 3        | width - x    | height - y    |

use tracing::{debug, info};

use crate::ingest::raw_event::{DisplayMetrics, Rotation};

use super::frames::{Basis, CoordinateSpace};

/// Affine map from raw pixel space into the canonical basis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanonicalTransform {
    metrics: DisplayMetrics,
}

impl CanonicalTransform {
    pub fn new(metrics: DisplayMetrics) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &DisplayMetrics {
        &self.metrics
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let width = self.metrics.width_px as f32;
        let height = self.metrics.height_px as f32;
        match self.metrics.rotation {
            Rotation::Rotation0 => (height - y, x),
            Rotation::Rotation90 => (x, y),
            Rotation::Rotation180 => (y, width - x),
            Rotation::Rotation270 => (width - x, height - y),
        }
    }

    pub fn space(&self) -> CoordinateSpace {
        CoordinateSpace {
            width_px: self.metrics.width_px,
            height_px: self.metrics.height_px,
            basis: Basis::Landscape90,
        }
    }
}

/// Latest display geometry announced by window events
#[derive(Clone, Debug, Default)]
pub struct MetricsState {
    current: Option<DisplayMetrics>,
    attached: bool,
}

impl MetricsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&DisplayMetrics> {
        self.current.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn attach(&mut self, metrics: DisplayMetrics) {
        info!(
            "Surface attached: {}x{} @ {}dpi, rotation {}",
            metrics.width_px,
            metrics.height_px,
            metrics.density_dpi,
            metrics.rotation.index()
        );
        self.attached = true;
        self.current = Some(metrics);
    }

    pub fn detach(&mut self) {
        info!("Surface detached");
        self.attached = false;
    }

    pub fn update(&mut self, metrics: DisplayMetrics) {
        if self.current.as_ref() != Some(&metrics) {
            debug!(
                "Display metrics changed: {}x{}, rotation {}",
                metrics.width_px,
                metrics.height_px,
                metrics.rotation.index()
            );
        }
        self.current = Some(metrics);
    }

    /// Transform in effect for an event captured with the given display snapshot
    ///
    /// Tracked window metrics take precedence; the snapshot only applies until
    /// the first window event has been seen.
    pub fn transform_for(&self, snapshot: &DisplayMetrics) -> CanonicalTransform {
        CanonicalTransform::new(self.current.unwrap_or(*snapshot))
    }
}
