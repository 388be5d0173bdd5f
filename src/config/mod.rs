//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated, `*` for any)
    pub client_origin: String,
    /// Max input frames per second accepted from one connection
    pub input_rate_limit: u32,
    /// Simulation tunables
    pub arena: ArenaConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let arena = ArenaConfig::from_env()?;
        arena.validate()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            input_rate_limit: parse_var("INPUT_RATE_LIMIT", 60)?,
            arena,
        })
    }
}

/// Tunable constants of the arena simulation.
///
/// Distances are in world units, speeds in units per second.
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaConfig {
    /// Half of the square arena's side length
    pub half_size: f32,
    pub player_speed: f32,
    /// Horizontal collision radius of a player
    pub player_radius: f32,
    pub bullet_speed: f32,
    pub bullet_radius: f32,
    pub bullet_lifetime: Duration,
    pub fire_cooldown: Duration,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Hit points on spawn and respawn
    pub start_hp: i32,
    /// Spawn points keep this distance from the arena edge
    pub respawn_margin: f32,
    /// Upper bound for a single tick's dt
    pub max_tick_dt: Duration,
    /// Extra forward distance beyond the player radius where bullets appear
    pub muzzle_offset: f32,
    /// Height above ground where bullets appear
    pub muzzle_height: f32,
    /// Height of the body point used for hit tests
    pub body_offset: f32,
    pub standing_height: f32,
    /// Bullets above this height are discarded
    pub bullet_ceiling: f32,
    /// Seed for spawn-point randomization; random when unset
    pub seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_size: 20.0,
            player_speed: 7.0,
            player_radius: 0.6,
            bullet_speed: 16.0,
            bullet_radius: 0.02,
            bullet_lifetime: Duration::from_millis(2500),
            fire_cooldown: Duration::from_millis(100),
            tick_rate: 30,
            start_hp: 1,
            respawn_margin: 4.0,
            max_tick_dt: Duration::from_millis(100),
            muzzle_offset: 0.2,
            muzzle_height: 1.2,
            body_offset: 0.8,
            standing_height: 1.8,
            bullet_ceiling: 10.0,
            seed: None,
        }
    }
}

impl ArenaConfig {
    /// Overlay environment overrides on the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            half_size: parse_var("ARENA_HALF_SIZE", d.half_size)?,
            player_speed: parse_var("PLAYER_SPEED", d.player_speed)?,
            player_radius: parse_var("PLAYER_RADIUS", d.player_radius)?,
            bullet_speed: parse_var("BULLET_SPEED", d.bullet_speed)?,
            bullet_radius: parse_var("BULLET_RADIUS", d.bullet_radius)?,
            bullet_lifetime: Duration::from_millis(parse_var(
                "BULLET_LIFETIME_MS",
                d.bullet_lifetime.as_millis() as u64,
            )?),
            fire_cooldown: Duration::from_millis(parse_var(
                "FIRE_COOLDOWN_MS",
                d.fire_cooldown.as_millis() as u64,
            )?),
            tick_rate: parse_var("TICK_RATE", d.tick_rate)?,
            start_hp: parse_var("START_HP", d.start_hp)?,
            respawn_margin: parse_var("RESPAWN_MARGIN", d.respawn_margin)?,
            max_tick_dt: Duration::from_millis(parse_var(
                "MAX_TICK_DT_MS",
                d.max_tick_dt.as_millis() as u64,
            )?),
            seed: match env::var("ARENA_SEED") {
                Ok(raw) => Some(
                    raw.trim()
                        .parse()
                        .map_err(|_| ConfigError::Unparsable("ARENA_SEED"))?,
                ),
                Err(_) => None,
            },
            ..d
        })
    }

    /// Reject combinations the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("ARENA_HALF_SIZE", self.half_size),
            ("PLAYER_SPEED", self.player_speed),
            ("PLAYER_RADIUS", self.player_radius),
            ("BULLET_SPEED", self.bullet_speed),
            ("BULLET_RADIUS", self.bullet_radius),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(name, "must be a positive number"));
            }
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE", "must be at least 1"));
        }
        if self.start_hp < 1 {
            return Err(ConfigError::Invalid("START_HP", "must be at least 1"));
        }
        if self.player_radius >= self.half_size {
            return Err(ConfigError::Invalid(
                "PLAYER_RADIUS",
                "must be smaller than the arena half size",
            ));
        }
        if !(self.respawn_margin >= 0.0 && self.respawn_margin < self.half_size) {
            return Err(ConfigError::Invalid(
                "RESPAWN_MARGIN",
                "must leave a non-empty spawn area",
            ));
        }
        if self.max_tick_dt.is_zero() {
            return Err(ConfigError::Invalid("MAX_TICK_DT_MS", "must be non-zero"));
        }
        Ok(())
    }

    /// Full side length of the arena, as published to clients
    pub fn arena_size(&self) -> f32 {
        self.half_size * 2.0
    }

    /// Nominal duration of one tick
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate.max(1)))
    }

    /// Distance at which a bullet touches a player's body point
    pub fn hit_distance(&self) -> f32 {
        self.player_radius + self.bullet_radius
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Unparsable(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not parse environment variable: {0}")]
    Unparsable(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ArenaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.arena_size(), 40.0);
        assert_eq!(config.tick_duration(), Duration::from_micros(33_333));
    }

    #[test]
    fn radius_must_fit_inside_arena() {
        let config = ArenaConfig {
            player_radius: 25.0,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("PLAYER_RADIUS", _))
        ));
    }

    #[test]
    fn zero_tick_rate_rejected() {
        let config = ArenaConfig {
            tick_rate: 0,
            ..ArenaConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn margin_must_leave_spawn_area() {
        let config = ArenaConfig {
            respawn_margin: 20.0,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("RESPAWN_MARGIN", _))
        ));
    }
}
