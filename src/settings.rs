//! Client configuration
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables
//! 2. `Settings.toml` in `LIQUID_SETTINGS_DIR` (if set and present)
//! 3. `Settings.toml` in the current directory (if present)
//! 4. Defaults

use serde::{Deserialize, Serialize};
use std::fs;

use crate::signaling::{IceServer, RtcConfiguration, DEFAULT_ICE_SERVERS};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LiquidSettings {
    pub service: ServiceSettings,
    pub rtc: RtcSettings,
    pub logging: LoggingSettings,
}

/// Ceremony service and relay location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Origin hosting the ceremony endpoints and the signaling relay
    pub origin: String,
    /// Label of the negotiated data channel
    pub channel_label: String,
}

/// Peer connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtcSettings {
    pub ice_servers: Vec<String>,
    pub ice_candidate_pool_size: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            origin: "https://localhost:5173".to_string(),
            channel_label: crate::signaling::CHANNEL_LABEL.to_string(),
        }
    }
}

impl Default for RtcSettings {
    fn default() -> Self {
        Self {
            ice_servers: DEFAULT_ICE_SERVERS.clone(),
            ice_candidate_pool_size: 10,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RtcSettings {
    /// Convert into the peer-connection configuration
    #[must_use]
    pub fn to_configuration(&self) -> RtcConfiguration {
        RtcConfiguration {
            ice_servers: vec![IceServer {
                urls: self.ice_servers.clone(),
            }],
            ice_candidate_pool_size: self.ice_candidate_pool_size,
        }
    }
}

impl LiquidSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::initialize_logging();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Initialize the logger; repeated initialization is a no-op
    fn initialize_logging() {
        env_logger::try_init().ok();
    }

    /// Load base settings from TOML file(s) or use defaults
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)?;
            settings = basic_toml::from_str(&toml_content)?;
            log::info!("loaded base settings from {}", default_config_path.display());
        }

        if let Ok(settings_dir) = std::env::var("LIQUID_SETTINGS_DIR") {
            let settings_path = std::path::Path::new(&settings_dir).join("Settings.toml");
            if settings_path.exists() {
                let toml_content = fs::read_to_string(&settings_path)?;
                settings = basic_toml::from_str(&toml_content)?;
                log::info!("overriding settings from {}", settings_path.display());
            }
        }

        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        if let Ok(origin) = std::env::var("LIQUID_ORIGIN") {
            settings.service.origin = origin;
        }
        if let Ok(label) = std::env::var("LIQUID_CHANNEL_LABEL") {
            settings.service.channel_label = label;
        }
        if let Ok(servers) = std::env::var("LIQUID_ICE_SERVERS") {
            settings.rtc.ice_servers = servers
                .split(',')
                .map(str::trim)
                .filter(|server| !server.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Ok(level) = std::env::var("LIQUID_LOG_LEVEL") {
            settings.logging.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "LIQUID_SETTINGS_DIR",
            "LIQUID_ORIGIN",
            "LIQUID_CHANNEL_LABEL",
            "LIQUID_ICE_SERVERS",
            "LIQUID_LOG_LEVEL",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = LiquidSettings::default();
        assert_eq!(settings.service.origin, "https://localhost:5173");
        assert_eq!(settings.service.channel_label, "liquid");
        assert_eq!(settings.rtc.ice_candidate_pool_size, 10);
        assert_eq!(settings.rtc.ice_servers.len(), 3);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    #[serial]
    fn test_env_overrides_win() {
        clear_env();
        std::env::set_var("LIQUID_ORIGIN", "https://auth.example.com");
        std::env::set_var("LIQUID_ICE_SERVERS", "stun:a.example.com:3478, stun:b.example.com:3478");
        std::env::set_var("LIQUID_LOG_LEVEL", "debug");

        let mut settings = LiquidSettings::default();
        LiquidSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.service.origin, "https://auth.example.com");
        assert_eq!(
            settings.rtc.ice_servers,
            vec!["stun:a.example.com:3478", "stun:b.example.com:3478"]
        );
        assert_eq!(settings.logging.level, "debug");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_settings_dir_file_overrides_defaults() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Settings.toml"),
            r#"
[service]
origin = "https://link.example.com"
channel_label = "liquid"

[rtc]
ice_servers = ["stun:stun.example.com:3478"]
ice_candidate_pool_size = 4

[logging]
level = "warn"
"#,
        )
        .unwrap();
        std::env::set_var("LIQUID_SETTINGS_DIR", dir.path());

        let settings = LiquidSettings::load_base_settings().unwrap();
        assert_eq!(settings.service.origin, "https://link.example.com");
        assert_eq!(settings.rtc.ice_candidate_pool_size, 4);
        assert_eq!(settings.logging.level, "warn");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_rtc_settings_convert_to_configuration() {
        clear_env();
        let settings = RtcSettings {
            ice_servers: vec!["stun:stun.example.com:3478".to_string()],
            ice_candidate_pool_size: 2,
        };
        let config = settings.to_configuration();
        assert_eq!(config.ice_servers.len(), 1);
        assert_eq!(config.ice_servers[0].urls, settings.ice_servers);
        assert_eq!(config.ice_candidate_pool_size, 2);
    }
}
