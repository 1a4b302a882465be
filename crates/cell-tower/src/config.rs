//! Cell tower process configuration.
//!
//! Configuration is loaded from environment variables. The Redis URL may
//! carry credentials and is redacted in Debug output.

use crate::admission::{
    AdmissionBands, AdmissionPolicy, BandOrder, ConstantPolicy, DiurnalPolicy,
    DEFAULT_SUCCESS_UPPER_BOUND,
};
use crate::antenna::{
    Antenna, AntennaPattern, DEFAULT_PATH_LOSS_EXPONENT, DEFAULT_TRANSMIT_POWER_DBM,
};
use crate::actors::tower::{TowerSettings, DEFAULT_MIN_RECEIVE_POWER_DBM};
use crate::stream::publisher::{DEFAULT_INIT_CHANNEL, DEFAULT_TOWER_CHANNEL_TEMPLATE};
use crate::stream::{ChannelNames, PublishMode};

use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8090";

/// Default number of towers in the fleet.
pub const DEFAULT_TOWER_COUNT: usize = 4;

/// Default distance between neighbouring towers.
pub const DEFAULT_TOWER_SPACING: f64 = 10.0;

/// Default failure probability for the constant policy and the diurnal base.
pub const DEFAULT_FAIL_PROBABILITY: f64 = 0.1;

/// Default busy-hour failure probability for the diurnal policy.
pub const DEFAULT_PEAK_FAIL_PROBABILITY: f64 = 0.3;

/// Busy hour of the diurnal policy: 18:00.
pub const DEFAULT_PEAK_OFFSET_SECS: i64 = 18 * 3600;

/// Default sector front-to-back ratio in dB.
pub const DEFAULT_FRONT_TO_BACK_DB: f64 = 25.0;

/// Antenna pattern family used for every tower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AntennaKind {
    Omni,
    Sector {
        boresight_rad: f64,
        beamwidth_rad: f64,
        front_to_back_db: f64,
    },
}

/// Admission policy family used for every tower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyKind {
    Constant { probability: f64 },
    Diurnal { base: f64, peak: f64 },
}

impl PolicyKind {
    /// Build the policy. One instance is shared by the whole fleet.
    #[must_use]
    pub fn build(&self) -> Arc<dyn AdmissionPolicy> {
        match *self {
            PolicyKind::Constant { probability } => Arc::new(ConstantPolicy::new(probability)),
            PolicyKind::Diurnal { base, peak } => {
                Arc::new(DiurnalPolicy::daily(base, peak, DEFAULT_PEAK_OFFSET_SECS))
            }
        }
    }
}

/// Cell tower process configuration.
#[derive(Clone)]
pub struct Config {
    /// Redis connection URL for the event stream. Unset means events are
    /// only logged.
    pub redis_url: Option<SecretString>,

    /// Health endpoint bind address (default: "0.0.0.0:8090").
    pub health_bind_address: String,

    /// Number of towers to spawn.
    pub tower_count: usize,

    /// Distance between neighbouring towers on the layout grid.
    pub tower_spacing: f64,

    pub antenna: AntennaKind,

    /// Transmit power in dBm.
    pub transmit_power_dbm: f64,

    pub path_loss_exponent: f64,

    /// Signal reports are only sent above this power.
    pub min_receive_power_dbm: f64,

    /// Admission band layout.
    pub bands: AdmissionBands,

    pub policy: PolicyKind,

    pub publish_mode: PublishMode,

    /// Per-tower channel template; `{id}` is replaced by the tower id.
    pub tower_channel_template: String,

    pub init_channel: String,

    /// Approximate stream length cap for `XADD MAXLEN ~`.
    pub stream_max_len: Option<usize>,

    /// Seed for admission draws. Unset means entropy.
    pub rng_seed: Option<u64>,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field(
                "redis_url",
                &self.redis_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("health_bind_address", &self.health_bind_address)
            .field("tower_count", &self.tower_count)
            .field("tower_spacing", &self.tower_spacing)
            .field("antenna", &self.antenna)
            .field("transmit_power_dbm", &self.transmit_power_dbm)
            .field("path_loss_exponent", &self.path_loss_exponent)
            .field("min_receive_power_dbm", &self.min_receive_power_dbm)
            .field("bands", &self.bands)
            .field("policy", &self.policy)
            .field("publish_mode", &self.publish_mode)
            .field("tower_channel_template", &self.tower_channel_template)
            .field("init_channel", &self.init_channel)
            .field("stream_max_len", &self.stream_max_len)
            .field("rng_seed", &self.rng_seed)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{key}={raw}"))),
    }
}

fn parse_optional<T: FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    vars.get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("{key}={raw}")))
        })
        .transpose()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let redis_url = vars
            .get("REDIS_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| SecretString::from(url.clone()));

        let health_bind_address = vars
            .get("CELL_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let tower_count: usize = parse_var(vars, "CELL_TOWER_COUNT", DEFAULT_TOWER_COUNT)?;
        if tower_count == 0 {
            return Err(ConfigError::InvalidValue(
                "CELL_TOWER_COUNT must be at least 1".to_string(),
            ));
        }

        let tower_spacing = parse_var(vars, "CELL_TOWER_SPACING", DEFAULT_TOWER_SPACING)?;

        let antenna = match vars
            .get("CELL_ANTENNA")
            .map_or("omni".to_string(), |s| s.trim().to_ascii_lowercase())
            .as_str()
        {
            "omni" => AntennaKind::Omni,
            "sector" => AntennaKind::Sector {
                boresight_rad: parse_var(vars, "CELL_SECTOR_BORESIGHT_RAD", PI / 2.0)?,
                beamwidth_rad: parse_var(vars, "CELL_SECTOR_BEAMWIDTH_RAD", PI / 3.0)?,
                front_to_back_db: parse_var(
                    vars,
                    "CELL_SECTOR_FRONT_TO_BACK_DB",
                    DEFAULT_FRONT_TO_BACK_DB,
                )?,
            },
            other => {
                return Err(ConfigError::InvalidValue(format!("CELL_ANTENNA={other}")));
            }
        };

        let transmit_power_dbm =
            parse_var(vars, "CELL_TRANSMIT_POWER_DBM", DEFAULT_TRANSMIT_POWER_DBM)?;
        let path_loss_exponent =
            parse_var(vars, "CELL_PATH_LOSS_EXPONENT", DEFAULT_PATH_LOSS_EXPONENT)?;
        let min_receive_power_dbm =
            parse_var(vars, "CELL_MIN_RECEIVE_POWER_DBM", DEFAULT_MIN_RECEIVE_POWER_DBM)?;

        let success_upper_bound =
            parse_var(vars, "CELL_SUCCESS_UPPER_BOUND", DEFAULT_SUCCESS_UPPER_BOUND)?;
        let order: BandOrder = parse_var(vars, "CELL_BAND_ORDER", BandOrder::FailFirst)?;
        let bands = AdmissionBands::new(success_upper_bound, order)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let fail_probability =
            parse_var(vars, "CELL_FAIL_PROBABILITY", DEFAULT_FAIL_PROBABILITY)?;
        let policy = match vars
            .get("CELL_ADMISSION_POLICY")
            .map_or("constant".to_string(), |s| s.trim().to_ascii_lowercase())
            .as_str()
        {
            "constant" => PolicyKind::Constant {
                probability: fail_probability,
            },
            "diurnal" => PolicyKind::Diurnal {
                base: fail_probability,
                peak: parse_var(
                    vars,
                    "CELL_PEAK_FAIL_PROBABILITY",
                    DEFAULT_PEAK_FAIL_PROBABILITY,
                )?,
            },
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "CELL_ADMISSION_POLICY={other}"
                )));
            }
        };

        let publish_mode = parse_var(vars, "CELL_PUBLISH_MODE", PublishMode::Flush)?;

        let tower_channel_template = vars
            .get("CELL_TOWER_CHANNEL_TEMPLATE")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TOWER_CHANNEL_TEMPLATE.to_string());

        let init_channel = vars
            .get("CELL_INIT_CHANNEL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_INIT_CHANNEL.to_string());

        let stream_max_len = parse_optional(vars, "CELL_STREAM_MAXLEN")?;
        let rng_seed = parse_optional(vars, "CELL_RNG_SEED")?;

        Ok(Config {
            redis_url,
            health_bind_address,
            tower_count,
            tower_spacing,
            antenna,
            transmit_power_dbm,
            path_loss_exponent,
            min_receive_power_dbm,
            bands,
            policy,
            publish_mode,
            tower_channel_template,
            init_channel,
            stream_max_len,
            rng_seed,
        })
    }

    /// Channel names for every tower.
    #[must_use]
    pub fn channel_names(&self) -> ChannelNames {
        ChannelNames::new(&self.tower_channel_template, &self.init_channel)
    }

    /// Antenna for a tower at `(x, y)`.
    #[must_use]
    pub fn antenna_at(&self, x: f64, y: f64) -> Antenna {
        let antenna = match self.antenna {
            AntennaKind::Omni => Antenna::omni(x, y),
            AntennaKind::Sector {
                boresight_rad,
                beamwidth_rad,
                front_to_back_db,
            } => Antenna::with_pattern(
                x,
                y,
                AntennaPattern::Sector {
                    boresight_rad,
                    beamwidth_rad,
                    front_to_back_db,
                },
            ),
        };
        antenna.with_power(self.transmit_power_dbm, self.path_loss_exponent)
    }

    /// Settings for every tower, ids `"0".."n-1"`, laid out row by row on a
    /// square grid `tower_spacing` apart.
    #[must_use]
    pub fn tower_settings(&self) -> Vec<TowerSettings> {
        let policy = self.policy.build();
        let channels = self.channel_names();
        let columns = grid_columns(self.tower_count);

        (0..self.tower_count)
            .map(|index| {
                #[allow(clippy::cast_precision_loss)]
                let (x, y) = (
                    (index % columns) as f64 * self.tower_spacing,
                    (index / columns) as f64 * self.tower_spacing,
                );
                TowerSettings {
                    tower_id: index.to_string(),
                    antenna: self.antenna_at(x, y),
                    policy: Arc::clone(&policy),
                    bands: self.bands,
                    min_receive_power_dbm: self.min_receive_power_dbm,
                    publish_mode: self.publish_mode,
                    channels: channels.clone(),
                }
            })
            .collect()
    }

    /// Draw seed for the tower at `index`. Each tower gets its own stream.
    #[must_use]
    pub fn seed_for(&self, index: usize) -> Option<u64> {
        self.rng_seed
            .map(|seed| seed.wrapping_add(index as u64))
    }
}

/// Smallest column count whose square holds `count` towers.
fn grid_columns(count: usize) -> usize {
    let mut columns = 1;
    while columns * columns < count {
        columns += 1;
    }
    columns
}
