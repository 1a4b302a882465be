//! Call admission policy.
//!
//! An [`AdmissionPolicy`] maps a load signal (the call timestamp in whole
//! seconds) to a failure probability in `[0, 1)`. The tower draws one uniform
//! value per Hello and [`AdmissionBands::classify`] places it in exactly one of
//! three bands:
//!
//! | Order          | Fail                | Connect          | Drop           |
//! |----------------|---------------------|------------------|----------------|
//! | `FailFirst`    | `[0, p)`            | `[p, upper)`     | `[upper, 1)`   |
//! | `SuccessFirst` | `[upper, upper+p)`  | `[0, upper)`     | the remainder  |
//!
//! Saturating policies are not special-cased: a probability of 0 empties the
//! fail band, and a probability above `upper` empties the connect band under
//! `FailFirst`.

use crate::errors::TowerError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Default upper bound of the connect band.
pub const DEFAULT_SUCCESS_UPPER_BOUND: f64 = 0.95;

/// Largest probability a policy may return.
const MAX_PROBABILITY: f64 = 1.0 - f64::EPSILON;

/// Seconds in one simulated day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Strategy returning the probability that a call attempt fails.
///
/// Implementations must be pure: the tower may share one policy across
/// actors and call it concurrently.
pub trait AdmissionPolicy: Send + Sync + fmt::Debug {
    /// Failure probability in `[0, 1)` for the given load signal.
    fn fail_probability(&self, load_signal: i64) -> f64;

    /// Policy name for logs.
    fn name(&self) -> &'static str;
}

/// Clamps an arbitrary value into `[0, 1)`. NaN maps to 0.
fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, MAX_PROBABILITY)
    }
}

/// Fails calls with a fixed probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPolicy {
    probability: f64,
}

impl ConstantPolicy {
    #[must_use]
    pub fn new(probability: f64) -> Self {
        Self {
            probability: clamp_probability(probability),
        }
    }
}

impl AdmissionPolicy for ConstantPolicy {
    fn fail_probability(&self, _load_signal: i64) -> f64 {
        self.probability
    }

    fn name(&self) -> &'static str {
        "constant"
    }
}

/// Time-of-day curve: raised cosine between `base` and `peak`.
///
/// The curve reaches `peak` at `peak_offset_secs` into each period and
/// `base` half a period later.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiurnalPolicy {
    base: f64,
    peak: f64,
    period_secs: i64,
    peak_offset_secs: i64,
}

impl DiurnalPolicy {
    /// Daily curve peaking at `peak_offset_secs` after midnight.
    #[must_use]
    pub fn daily(base: f64, peak: f64, peak_offset_secs: i64) -> Self {
        Self::new(base, peak, SECONDS_PER_DAY, peak_offset_secs)
    }

    #[must_use]
    pub fn new(base: f64, peak: f64, period_secs: i64, peak_offset_secs: i64) -> Self {
        Self {
            base: clamp_probability(base),
            peak: clamp_probability(peak),
            period_secs: period_secs.max(1),
            peak_offset_secs,
        }
    }
}

impl AdmissionPolicy for DiurnalPolicy {
    fn fail_probability(&self, load_signal: i64) -> f64 {
        let phase = (load_signal - self.peak_offset_secs).rem_euclid(self.period_secs);
        #[allow(clippy::cast_precision_loss)]
        let angle = TAU * phase as f64 / self.period_secs as f64;
        let weight = (1.0 + angle.cos()) / 2.0;
        clamp_probability(self.base + (self.peak - self.base) * weight)
    }

    fn name(&self) -> &'static str {
        "diurnal"
    }
}

/// One window of a [`StepPolicy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Window start, in seconds into the period.
    pub start_secs: i64,
    /// Failure probability from `start_secs` until the next step.
    pub probability: f64,
}

/// Piecewise-constant schedule repeating every `period_secs`.
///
/// Before the first step of a period the last step of the previous period
/// still applies.
#[derive(Debug, Clone, PartialEq)]
pub struct StepPolicy {
    period_secs: i64,
    steps: Vec<Step>,
}

impl StepPolicy {
    /// Builds a schedule. Steps are sorted by start time. An empty schedule
    /// never fails calls.
    #[must_use]
    pub fn new(period_secs: i64, mut steps: Vec<Step>) -> Self {
        let period_secs = period_secs.max(1);
        for step in &mut steps {
            step.start_secs = step.start_secs.rem_euclid(period_secs);
            step.probability = clamp_probability(step.probability);
        }
        steps.sort_by_key(|s| s.start_secs);
        Self { period_secs, steps }
    }
}

impl AdmissionPolicy for StepPolicy {
    fn fail_probability(&self, load_signal: i64) -> f64 {
        let phase = load_signal.rem_euclid(self.period_secs);
        self.steps
            .iter()
            .rev()
            .find(|s| s.start_secs <= phase)
            .or_else(|| self.steps.last())
            .map_or(0.0, |s| s.probability)
    }

    fn name(&self) -> &'static str {
        "step"
    }
}

/// Order in which the fail and connect bands are laid out over `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandOrder {
    /// Fail band first, then connect, then drop.
    #[default]
    FailFirst,
    /// Connect band first, then fail, then drop.
    SuccessFirst,
}

impl BandOrder {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BandOrder::FailFirst => "fail-first",
            BandOrder::SuccessFirst => "success-first",
        }
    }
}

impl fmt::Display for BandOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BandOrder {
    type Err = TowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-first" | "fail_first" => Ok(BandOrder::FailFirst),
            "success-first" | "success_first" => Ok(BandOrder::SuccessFirst),
            other => Err(TowerError::Config(format!("unknown band order: {other}"))),
        }
    }
}

/// Result of classifying one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Fail,
    Connect,
    Drop,
}

impl AdmissionOutcome {
    /// Returns the outcome as a string for metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            AdmissionOutcome::Fail => "fail",
            AdmissionOutcome::Connect => "connect",
            AdmissionOutcome::Drop => "drop",
        }
    }
}

/// Band layout shared by every Hello a tower handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionBands {
    success_upper_bound: f64,
    order: BandOrder,
}

impl Default for AdmissionBands {
    fn default() -> Self {
        Self {
            success_upper_bound: DEFAULT_SUCCESS_UPPER_BOUND,
            order: BandOrder::FailFirst,
        }
    }
}

impl AdmissionBands {
    /// Creates a band layout.
    ///
    /// # Errors
    ///
    /// Returns `TowerError::Config` if `success_upper_bound` is outside `[0, 1]`.
    pub fn new(success_upper_bound: f64, order: BandOrder) -> Result<Self, TowerError> {
        if !(0.0..=1.0).contains(&success_upper_bound) {
            return Err(TowerError::Config(format!(
                "success upper bound must be within [0, 1], got {success_upper_bound}"
            )));
        }
        Ok(Self {
            success_upper_bound,
            order,
        })
    }

    #[must_use]
    pub fn success_upper_bound(&self) -> f64 {
        self.success_upper_bound
    }

    #[must_use]
    pub fn order(&self) -> BandOrder {
        self.order
    }

    /// Places draw `u` in exactly one band.
    #[must_use]
    pub fn classify(&self, u: f64, fail_probability: f64) -> AdmissionOutcome {
        let upper = self.success_upper_bound;
        match self.order {
            BandOrder::FailFirst => {
                if u < fail_probability {
                    AdmissionOutcome::Fail
                } else if u < upper {
                    AdmissionOutcome::Connect
                } else {
                    AdmissionOutcome::Drop
                }
            }
            BandOrder::SuccessFirst => {
                if u < upper {
                    AdmissionOutcome::Connect
                } else if u < (upper + fail_probability).min(1.0) {
                    AdmissionOutcome::Fail
                } else {
                    AdmissionOutcome::Drop
                }
            }
        }
    }
}

/// Source of uniform draws in `[0, 1)`.
///
/// Injected into each tower so admission decisions can be replayed from a
/// seed or scripted in tests.
pub trait UniformDraw: Send {
    fn next_unit(&mut self) -> f64;
}

impl UniformDraw for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Builds a draw source from an optional seed.
#[must_use]
pub fn draw_source(seed: Option<u64>) -> Box<dyn UniformDraw> {
    match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(StdRng::from_entropy()),
    }
}
