use crate::error::ShellError;
use serde::Deserialize;

pub const VERSION: &str = "0.1.0";
pub const FS_KEY: &str = "webTestOS_FS";
pub const WALLPAPER_KEY: &str = "webTestOS_Wallpaper";
pub const SNAPSHOT_PARAM: &str = "dir";

/// Session settings. The page may override any subset as a JSON object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub fs_key: String,
    pub wallpaper_key: String,
    pub snapshot_param: String,
    pub prompt: String,
    pub title: String,
    pub max_script_depth: usize,
    pub timer_period_ms: u32,
    pub log_level: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            fs_key: FS_KEY.into(),
            wallpaper_key: WALLPAPER_KEY.into(),
            snapshot_param: SNAPSHOT_PARAM.into(),
            prompt: "> ".into(),
            title: "WebTest OS".into(),
            max_script_depth: 16,
            timer_period_ms: 10,
            log_level: "info".into(),
        }
    }
}

impl ShellConfig {
    pub fn from_json(json: &str) -> Result<Self, ShellError> {
        let config: ShellConfig =
            serde_json::from_str(json).map_err(|e| ShellError::Config(e.to_string()))?;
        if config.timer_period_ms == 0 {
            return Err(ShellError::Config("timer_period_ms must be positive".into()));
        }
        Ok(config)
    }

    pub fn level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
