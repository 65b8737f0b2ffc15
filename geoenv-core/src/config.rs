use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::{DEFAULT_DAYS_BACK, MAX_DAYS_BACK};

pub const DEFAULT_EARTH_ENGINE_URL: &str = "https://earthengine.googleapis.com";
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8081";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_LAYER_TIMEOUT_SECONDS: u64 = 30;

/// Credentials and endpoint for the Earth Engine REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EarthEngineConfig {
    /// Cloud project the compute calls are billed to.
    pub project: Option<String>,

    /// OAuth2 bearer token. Refreshing it is up to the deployment.
    pub access_token: Option<String>,

    pub base_url: String,
}

impl Default for EarthEngineConfig {
    fn default() -> Self {
        Self {
            project: None,
            access_token: None,
            base_url: DEFAULT_EARTH_ENGINE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_URL.to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// default_days_back = 30
///
/// [earth_engine]
/// project = "my-project"
/// access_token = "ya29..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub earth_engine: EarthEngineConfig,
    pub weather: WeatherConfig,
    pub default_days_back: u32,
    pub request_timeout_secs: u64,
    pub layer_timeout_secs: u64,
    pub listen_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            earth_engine: EarthEngineConfig::default(),
            weather: WeatherConfig::default(),
            default_days_back: DEFAULT_DAYS_BACK,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            layer_timeout_secs: DEFAULT_LAYER_TIMEOUT_SECONDS,
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Load config from disk (or defaults when absent), then apply
    /// `GEOENV_*` environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(cfg)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "geoenv", "geoenv")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override fields from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(project) = get("GEOENV_EE_PROJECT") {
            self.earth_engine.project = Some(project);
        }
        if let Some(token) = get("GEOENV_EE_TOKEN") {
            self.earth_engine.access_token = Some(token);
        }
        if let Some(url) = get("GEOENV_EE_BASE_URL") {
            self.earth_engine.base_url = url;
        }
        if let Some(url) = get("GEOENV_WEATHER_BASE_URL") {
            self.weather.base_url = url;
        }
        if let Some(addr) = get("GEOENV_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(value) = get("GEOENV_DEFAULT_DAYS_BACK") {
            self.default_days_back = parse_number("GEOENV_DEFAULT_DAYS_BACK", &value)?;
        }
        if let Some(value) = get("GEOENV_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_secs = parse_number("GEOENV_REQUEST_TIMEOUT_SECONDS", &value)?;
        }
        if let Some(value) = get("GEOENV_LAYER_TIMEOUT_SECONDS") {
            self.layer_timeout_secs = parse_number("GEOENV_LAYER_TIMEOUT_SECONDS", &value)?;
        }

        self.validate()
    }

    /// Range checks for values that would otherwise fail or silently
    /// degrade every request.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DAYS_BACK).contains(&self.default_days_back) {
            return Err(anyhow!(
                "default_days_back (GEOENV_DEFAULT_DAYS_BACK) must be between 1 and {MAX_DAYS_BACK}, got {}",
                self.default_days_back
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!(
                "request_timeout_secs (GEOENV_REQUEST_TIMEOUT_SECONDS) must be greater than 0"
            ));
        }
        if self.layer_timeout_secs == 0 {
            return Err(anyhow!(
                "layer_timeout_secs (GEOENV_LAYER_TIMEOUT_SECONDS) must be greater than 0"
            ));
        }
        Ok(())
    }

    /// Store Earth Engine credentials.
    pub fn set_earth_engine_credentials(&mut self, project: String, access_token: String) {
        self.earth_engine.project = Some(project);
        self.earth_engine.access_token = Some(access_token);
    }

    pub fn is_earth_engine_configured(&self) -> bool {
        self.earth_engine.project.is_some() && self.earth_engine.access_token.is_some()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn layer_timeout(&self) -> Duration {
        Duration::from_secs(self.layer_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| anyhow!("Failed to parse {name}={value} as a number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_point_at_public_endpoints() {
        let cfg = Config::default();

        assert_eq!(cfg.earth_engine.base_url, DEFAULT_EARTH_ENGINE_URL);
        assert_eq!(cfg.weather.base_url, DEFAULT_WEATHER_URL);
        assert_eq!(cfg.default_days_back, 30);
        assert!(!cfg.is_earth_engine_configured());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let cfg: Config = toml::from_str(
            r#"
            default_days_back = 7

            [earth_engine]
            project = "demo-project"
            "#,
        )
        .expect("partial config must parse");

        assert_eq!(cfg.default_days_back, 7);
        assert_eq!(cfg.earth_engine.project.as_deref(), Some("demo-project"));
        assert_eq!(cfg.earth_engine.base_url, DEFAULT_EARTH_ENGINE_URL);
        assert_eq!(cfg.listen_addr, DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = Config::default();
        cfg.apply_overrides(lookup_from(&[
            ("GEOENV_EE_PROJECT", "env-project"),
            ("GEOENV_EE_TOKEN", "env-token"),
            ("GEOENV_DEFAULT_DAYS_BACK", "14"),
            ("GEOENV_LISTEN_ADDR", "127.0.0.1:9000"),
        ]))
        .expect("overrides must apply");

        assert!(cfg.is_earth_engine_configured());
        assert_eq!(cfg.default_days_back, 14);
        assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let mut cfg = Config::default();
        cfg.apply_overrides(lookup_from(&[("GEOENV_EE_TOKEN", "  ")]))
            .expect("overrides must apply");

        assert!(cfg.earth_engine.access_token.is_none());
    }

    #[test]
    fn bad_numeric_override_names_the_variable() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_overrides(lookup_from(&[("GEOENV_LAYER_TIMEOUT_SECONDS", "soon")]))
            .unwrap_err();

        assert!(err.to_string().contains("GEOENV_LAYER_TIMEOUT_SECONDS"));
    }

    #[test]
    fn out_of_range_default_days_back_is_rejected() {
        for value in ["0", "400"] {
            let mut cfg = Config::default();
            let err = cfg
                .apply_overrides(lookup_from(&[("GEOENV_DEFAULT_DAYS_BACK", value)]))
                .unwrap_err();

            assert!(err.to_string().contains("GEOENV_DEFAULT_DAYS_BACK"), "{value}");
        }

        let mut cfg = Config::default();
        cfg.apply_overrides(lookup_from(&[("GEOENV_DEFAULT_DAYS_BACK", "365")]))
            .expect("upper bound is allowed");
        assert_eq!(cfg.default_days_back, 365);
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_overrides(lookup_from(&[("GEOENV_LAYER_TIMEOUT_SECONDS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("GEOENV_LAYER_TIMEOUT_SECONDS"));

        let cfg: Config = toml::from_str("request_timeout_secs = 0").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }

    #[test]
    fn set_credentials_marks_configured() {
        let mut cfg = Config::default();
        cfg.set_earth_engine_credentials("p".into(), "t".into());

        assert!(cfg.is_earth_engine_configured());
        let round_trip: Config =
            toml::from_str(&toml::to_string_pretty(&cfg).unwrap()).unwrap();
        assert_eq!(round_trip.earth_engine.access_token.as_deref(), Some("t"));
    }
}
