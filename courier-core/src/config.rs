use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub realtime: RealtimeConfig,
    pub session: SessionConfig,
    pub reminders: ReminderConfig,
    pub sounds: SoundConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub cable_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub token: String,
    pub user_id: Option<i64>,
    pub conversation_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    pub scan_interval_secs: u64,
    pub upcoming_minutes: i64,
    pub starting_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundConfig {
    pub asset_dir: PathBuf,
    /// External command used to play an asset, e.g. `aplay` or `afplay`.
    /// Playback is muted when unset.
    pub player: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            cable_url: "ws://localhost:3000/cable".to_string(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 60,
            upcoming_minutes: 30,
            starting_minutes: 5,
        }
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("./sounds"),
            player: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ReminderConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs.max(1))
    }
}

impl Config {
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();

        let defaults = Config::default();

        Config {
            api: ApiConfig {
                base_url: env::var("API_BASE_URL").unwrap_or(defaults.api.base_url),
                timeout_secs: parse_var("API_TIMEOUT_SECS").unwrap_or(defaults.api.timeout_secs),
            },
            realtime: RealtimeConfig {
                cable_url: env::var("CABLE_URL").unwrap_or(defaults.realtime.cable_url),
            },
            session: SessionConfig {
                token: env::var("AUTH_TOKEN").unwrap_or_default(),
                user_id: parse_var("USER_ID"),
                conversation_id: parse_var("CONVERSATION_ID"),
            },
            reminders: ReminderConfig {
                scan_interval_secs: parse_var("REMINDER_SCAN_INTERVAL_SECS")
                    .unwrap_or(defaults.reminders.scan_interval_secs),
                upcoming_minutes: parse_var("REMINDER_UPCOMING_MINUTES")
                    .unwrap_or(defaults.reminders.upcoming_minutes),
                starting_minutes: parse_var("REMINDER_STARTING_MINUTES")
                    .unwrap_or(defaults.reminders.starting_minutes),
            },
            sounds: SoundConfig {
                asset_dir: env::var("SOUND_ASSET_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.sounds.asset_dir),
                player: env::var("SOUND_PLAYER").ok().filter(|s| !s.trim().is_empty()),
            },
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring unparseable value for {}: {:?}", name, raw);
                None
            }
        },
        Err(_) => None,
    }
}
