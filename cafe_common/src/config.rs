//! Client configuration.
//!
//! Values come from built-in defaults, then an optional JSON file, then the
//! environment. The CLI applies its own flags on top of that.

use std::{env, fs::File};

use url::Url;

use crate::prelude::*;

/// The default port of a local `cafe` server.
const DEFAULT_SERVER_URL: &str = "http://localhost:59320/";

/// How to reach the scheduler, and how patiently to wait for it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the scheduler server.
    pub server_url: Url,
    /// How long a single HTTP request may take.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How often to ask the scheduler about a task we're waiting for.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Give up waiting for a task after this long. `None` waits forever.
    #[serde(with = "humantime_serde")]
    pub max_wait: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_url: Url::parse(DEFAULT_SERVER_URL)
                .expect("default server URL should be valid"),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
            max_wait: None,
        }
    }
}

impl Config {
    /// Load our configuration from `path` (or `$CAFE_CONFIG`, if set), and
    /// apply any environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let env_path = env::var_os("CAFE_CONFIG").map(PathBuf::from);
        let mut config = match path.or_else(|| env_path.as_deref()) {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Config> {
        trace!("reading config from {}", path.display());
        let f = File::open(path)
            .with_context(|| format!("can't open config file {}", path.display()))?;
        let config = serde_json::from_reader(f)
            .with_context(|| format!("can't parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Override settings using `lookup`, which maps variable names like
    /// `CAFE_SERVER_URL` to values.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CAFE_SERVER_URL") {
            self.server_url = Url::parse(&url)
                .with_context(|| format!("invalid CAFE_SERVER_URL {:?}", url))?;
        }
        if let Some(interval) = lookup("CAFE_POLL_INTERVAL") {
            self.poll_interval = parse_duration(&interval)
                .context("invalid CAFE_POLL_INTERVAL")?;
        }
        if let Some(max_wait) = lookup("CAFE_MAX_WAIT") {
            self.max_wait =
                Some(parse_duration(&max_wait).context("invalid CAFE_MAX_WAIT")?);
        }
        Ok(())
    }

    /// Make sure our settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval == Duration::from_secs(0) {
            return Err(format_err!("poll_interval must be greater than zero"));
        }
        if self.request_timeout == Duration::from_secs(0) {
            return Err(format_err!("request_timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Parse a human-friendly duration like `500ms` or `2m`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(s)
        .with_context(|| format!("can't parse duration {:?}", s))
}

#[test]
fn parse_partial_config_file() {
    let json = r#"{ "server_url": "http://scheduler:8080/", "poll_interval": "250ms" }"#;
    let config: Config = serde_json::from_str(json).expect("parse error");
    assert_eq!(config.server_url.as_str(), "http://scheduler:8080/");
    assert_eq!(config.poll_interval, Duration::from_millis(250));
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.max_wait, None);
}

#[test]
fn unknown_fields_are_rejected() {
    let json = r#"{ "pol_interval": "250ms" }"#;
    assert!(serde_json::from_str::<Config>(json).is_err());
}

#[test]
fn overrides_replace_file_values() {
    let mut config = Config::default();
    config
        .apply_overrides(|name| match name {
            "CAFE_SERVER_URL" => Some("http://10.0.0.5:59320/".to_owned()),
            "CAFE_MAX_WAIT" => Some("10m".to_owned()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.server_url.as_str(), "http://10.0.0.5:59320/");
    assert_eq!(config.max_wait, Some(Duration::from_secs(600)));
    assert_eq!(config.poll_interval, Duration::from_secs(1));
}

#[test]
fn zero_poll_interval_is_invalid() {
    let config = Config {
        poll_interval: Duration::from_secs(0),
        ..Config::default()
    };
    assert!(config.validate().is_err());
    assert!(Config::default().validate().is_ok());
}
