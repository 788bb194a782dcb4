//! Rolling angle window and lagged velocity estimation.
//!
//! This module keeps the last few processed samples of the tracked joint and
//! derives angular velocity from them:
//! - Fixed-depth FIFO of (angle, effective length, timestamp) samples
//! - Lagged finite difference over `lag` samples for velocity
//!
//! Design note: pose landmarks jitter by a few pixels every frame. Differencing
//! adjacent frames amplifies that jitter, so velocity is taken between the
//! newest sample and the one `lag` samples older.

use std::collections::VecDeque;

use crate::constants::defaults;
use crate::error::{KinematicsError, Result};
use crate::geometry::deg_to_rad;
use crate::types::Sample;

/// Parameters for the rolling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    /// Maximum number of samples retained. Must be greater than `lag`.
    /// Typical: 8.
    pub depth: usize,

    /// Samples between the two ends of the finite difference.
    /// Range: [1, depth - 1]. Typical: 3 or 4.
    pub lag: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            depth: defaults::WINDOW_DEPTH,
            lag: defaults::VELOCITY_LAG,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lag == 0 {
            return Err(KinematicsError::InvalidConfig(
                "velocity lag must be at least 1".into(),
            ));
        }
        if self.depth < 4 || self.depth <= self.lag {
            return Err(KinematicsError::InvalidConfig(format!(
                "window depth {} must be at least 4 and exceed the velocity lag {}",
                self.depth, self.lag
            )));
        }
        Ok(())
    }
}

/// Fixed-depth window of recent samples.
#[derive(Debug, Clone)]
pub struct SignalWindow {
    samples: VecDeque<Sample>,
    config: WindowConfig,
    /// Total samples ever pushed (for diagnostics).
    pushed: u64,
}

impl SignalWindow {
    /// Create a window. Fails if the depth cannot hold a lagged pair.
    pub fn new(config: WindowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            samples: VecDeque::with_capacity(config.depth + 1),
            config,
            pushed: 0,
        })
    }

    /// Append a sample, evicting the oldest once capacity is exceeded.
    pub fn push_sample(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        if self.samples.len() > self.config.depth {
            self.samples.pop_front();
        }
        self.pushed += 1;
    }

    /// Angular velocity in rad/s between the newest sample and the one `lag`
    /// samples before it.
    ///
    /// Signed: negative while the joint angle is decreasing.
    pub fn angular_velocity(&self) -> Result<f64> {
        let lag = self.config.lag;
        let required = lag + 1;
        if self.samples.len() < required {
            return Err(KinematicsError::InsufficientSamples {
                required,
                available: self.samples.len(),
            });
        }

        let last = self.samples.len() - 1;
        let newest = &self.samples[last];
        let older = &self.samples[last - lag];

        let dt = newest.timestamp_s - older.timestamp_s;
        if dt == 0.0 {
            return Err(KinematicsError::DivisionByZero(
                "equal timestamps across the velocity lag",
            ));
        }

        Ok(deg_to_rad(newest.angle_deg - older.angle_deg) / dt)
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total samples pushed since creation or the last reset.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Drop all samples (start of a new session).
    pub fn reset(&mut self) {
        self.samples.clear();
        self.pushed = 0;
    }
}
