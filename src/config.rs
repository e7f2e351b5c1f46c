use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use snafu::ResultExt as _;
use url::Url;

use crate::error::{ApplicationError, ConfigLoadSnafu, PublicUrlSnafu};
use crate::service::session::SessionSettings;

/// Read from the environment (and `.env`), variable names being the upper-cased field names.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(rename = "host_address", default = "default_host")]
    pub host: SocketAddr,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Where uploaded videos are kept.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Base url the videos in `storage_dir` are served from, `http://<host>/media/` when unset.
    #[serde(default)]
    pub public_url: Option<Url>,
    /// JSON file with users and webinars to start with.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
    #[serde(default = "default_playback_tick", deserialize_with = "human_duration")]
    pub playback_tick: Duration,
    #[serde(default = "default_viewer_tick", deserialize_with = "human_duration")]
    pub viewer_tick: Duration,
    #[serde(default = "default_frame_buffer")]
    pub frame_buffer: usize,
}

impl Config {
    pub fn from_env() -> Result<Config, ApplicationError> {
        envy::from_env::<Config>().context(ConfigLoadSnafu)
    }

    pub fn public_url(&self) -> Result<Url, ApplicationError> {
        match &self.public_url {
            Some(url) => Ok(url.clone()),
            None => {
                let url = format!("http://{}/media/", self.host);
                Url::parse(&url).context(PublicUrlSnafu { url })
            }
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            playback_tick: self.playback_tick,
            viewer_tick: self.viewer_tick,
            frame_buffer: self.frame_buffer,
        }
    }
}

fn default_host() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("storage")
}

fn default_playback_tick() -> Duration {
    SessionSettings::default().playback_tick
}

fn default_viewer_tick() -> Duration {
    SessionSettings::default().viewer_tick
}

fn default_frame_buffer() -> usize {
    SessionSettings::default().frame_buffer
}

/// Accepts `1s`, `500ms`, `1m 30s` and the like.
fn human_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::from_iter(vars.iter().map(|(key, value)| (key.to_string(), value.to_string())))
    }

    #[test]
    fn everything_has_a_default() {
        let config = load(&[]).unwrap();

        assert_eq!(config.host, default_host());
        assert_eq!(config.seed_file, None);
        assert_eq!(config.public_url().unwrap().as_str(), "http://127.0.0.1:3000/media/");
        assert_eq!(config.session_settings(), SessionSettings::default());
    }

    #[test]
    fn reads_the_environment() {
        let config = load(&[
            ("HOST_ADDRESS", "0.0.0.0:8080"),
            ("STORAGE_DIR", "/var/lib/evergreen"),
            ("PUBLIC_URL", "https://cdn.example.com/videos/"),
            ("SEED_FILE", "seed.json"),
            ("PLAYBACK_TICK", "250ms"),
            ("VIEWER_TICK", "5s"),
            ("FRAME_BUFFER", "4"),
        ])
        .unwrap();

        assert_eq!(config.host.port(), 8080);
        assert_eq!(config.storage_dir, PathBuf::from("/var/lib/evergreen"));
        assert_eq!(config.public_url().unwrap().host_str(), Some("cdn.example.com"));
        assert_eq!(config.seed_file, Some(PathBuf::from("seed.json")));

        let settings = config.session_settings();
        assert_eq!(settings.playback_tick, Duration::from_millis(250));
        assert_eq!(settings.viewer_tick, Duration::from_secs(5));
        assert_eq!(settings.frame_buffer, 4);
    }

    #[test]
    fn rejects_unreadable_durations() {
        assert!(load(&[("PLAYBACK_TICK", "soon")]).is_err());
    }
}
