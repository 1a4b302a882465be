//! Antenna propagation model.
//!
//! Received power follows a log-distance path-loss model with an optional
//! directional gain:
//!
//! ```text
//! P(r, θ) = P_tx - 10·n·log10(max(r, r0) / r0) + G(θ)
//! ```
//!
//! - `P_tx` transmit power in dBm
//! - `n` path-loss exponent
//! - `r0` reference distance (points closer than `r0` receive `P_tx`)
//! - `G(θ)` pattern gain in dB, 0 for omnidirectional antennas
//!
//! The sector pattern is the parabolic 3-sector model
//! `G(θ) = -min(12·(θ/θ3dB)², A_m)` where θ is the bearing offset from
//! boresight and `A_m` the front-to-back ratio.
//!
//! Power is non-increasing in distance along any bearing, and the model is
//! defined for every real coordinate pair. Distance 0 yields the maximum.

use serde::Serialize;
use std::f64::consts::{PI, TAU};

/// Default transmit power in dBm.
pub const DEFAULT_TRANSMIT_POWER_DBM: f64 = 24.0;

/// Default path-loss exponent.
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 1.0;

/// Default reference distance.
pub const DEFAULT_REFERENCE_DISTANCE: f64 = 1.0;

/// Directional radiation pattern, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AntennaPattern {
    /// Same gain in every direction.
    Omni,
    /// Sector antenna pointing at `boresight_rad`.
    #[serde(rename_all = "camelCase")]
    Sector {
        /// Boresight bearing in radians (counter-clockwise from +x).
        boresight_rad: f64,
        /// Half-power (3 dB) beamwidth in radians.
        beamwidth_rad: f64,
        /// Maximum attenuation behind the antenna, in dB (positive).
        front_to_back_db: f64,
    },
}

impl AntennaPattern {
    /// Gain in dB for a point at bearing `bearing_rad` from the antenna.
    #[must_use]
    pub fn gain_db(&self, bearing_rad: f64) -> f64 {
        match *self {
            AntennaPattern::Omni => 0.0,
            AntennaPattern::Sector {
                boresight_rad,
                beamwidth_rad,
                front_to_back_db,
            } => {
                let offset = wrap_angle(bearing_rad - boresight_rad);
                let width = beamwidth_rad.abs().max(f64::EPSILON);
                -(12.0 * (offset / width).powi(2)).min(front_to_back_db.abs())
            }
        }
    }

    /// Returns the pattern name for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            AntennaPattern::Omni => "omni",
            AntennaPattern::Sector { .. } => "sector",
        }
    }
}

/// Wraps an angle into `[-π, π)`.
fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Static description of an antenna, published once at tower registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AntennaDescriptor {
    pub x: f64,
    pub y: f64,
    pub transmit_power_dbm: f64,
    pub path_loss_exponent: f64,
    pub reference_distance: f64,
    pub pattern: AntennaPattern,
}

/// Tower antenna. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Antenna {
    x: f64,
    y: f64,
    transmit_power_dbm: f64,
    path_loss_exponent: f64,
    reference_distance: f64,
    pattern: AntennaPattern,
}

impl Antenna {
    /// Omnidirectional antenna at `(x, y)` with default power parameters.
    #[must_use]
    pub fn omni(x: f64, y: f64) -> Self {
        Self::with_pattern(x, y, AntennaPattern::Omni)
    }

    /// Sector antenna at `(x, y)` with default power parameters.
    #[must_use]
    pub fn sector(
        x: f64,
        y: f64,
        boresight_rad: f64,
        beamwidth_rad: f64,
        front_to_back_db: f64,
    ) -> Self {
        Self::with_pattern(
            x,
            y,
            AntennaPattern::Sector {
                boresight_rad,
                beamwidth_rad,
                front_to_back_db,
            },
        )
    }

    /// Antenna at `(x, y)` with an explicit pattern.
    #[must_use]
    pub fn with_pattern(x: f64, y: f64, pattern: AntennaPattern) -> Self {
        Self {
            x,
            y,
            transmit_power_dbm: DEFAULT_TRANSMIT_POWER_DBM,
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
            reference_distance: DEFAULT_REFERENCE_DISTANCE,
            pattern,
        }
    }

    /// Sets transmit power and path-loss exponent.
    ///
    /// A negative exponent would make power grow with distance, so the
    /// magnitude is used.
    #[must_use]
    pub fn with_power(mut self, transmit_power_dbm: f64, path_loss_exponent: f64) -> Self {
        self.transmit_power_dbm = transmit_power_dbm;
        self.path_loss_exponent = path_loss_exponent.abs();
        self
    }

    /// Sets the reference distance below which no path loss applies.
    #[must_use]
    pub fn with_reference_distance(mut self, reference_distance: f64) -> Self {
        self.reference_distance = reference_distance.abs().max(f64::EPSILON);
        self
    }

    /// Antenna position.
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Transmit power in dBm.
    #[must_use]
    pub fn transmit_power_dbm(&self) -> f64 {
        self.transmit_power_dbm
    }

    /// Radiation pattern.
    #[must_use]
    pub fn pattern(&self) -> &AntennaPattern {
        &self.pattern
    }

    /// Euclidean distance from the antenna to `(x, y)`.
    #[must_use]
    pub fn distance(&self, x: f64, y: f64) -> f64 {
        (x - self.x).hypot(y - self.y)
    }

    /// Received power in dBm at `(x, y)`.
    #[must_use]
    pub fn power(&self, x: f64, y: f64) -> f64 {
        let r = self.distance(x, y);
        // Bearing is undefined at the antenna itself; use boresight.
        let gain = if r > 0.0 {
            self.pattern.gain_db((y - self.y).atan2(x - self.x))
        } else {
            0.0
        };
        self.power_at(r) + gain
    }

    /// Received power along boresight at distance `r`.
    fn power_at(&self, r: f64) -> f64 {
        let ratio = r.max(self.reference_distance) / self.reference_distance;
        self.transmit_power_dbm - 10.0 * self.path_loss_exponent * ratio.log10()
    }

    /// Distance along boresight at which received power falls to `power_dbm`.
    ///
    /// Returns `f64::INFINITY` for a lossless antenna and the reference
    /// distance when `power_dbm` is at or above transmit power.
    #[must_use]
    pub fn range_for_power(&self, power_dbm: f64) -> f64 {
        let budget = self.transmit_power_dbm - power_dbm;
        if budget <= 0.0 {
            return self.reference_distance;
        }
        if self.path_loss_exponent == 0.0 {
            return f64::INFINITY;
        }
        self.reference_distance * 10f64.powf(budget / (10.0 * self.path_loss_exponent))
    }

    /// Static descriptor for the registration event.
    #[must_use]
    pub fn descriptor(&self) -> AntennaDescriptor {
        AntennaDescriptor {
            x: self.x,
            y: self.y,
            transmit_power_dbm: self.transmit_power_dbm,
            path_loss_exponent: self.path_loss_exponent,
            reference_distance: self.reference_distance,
            pattern: self.pattern,
        }
    }
}
