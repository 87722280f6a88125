use std::{env, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

pub static SETTINGS: Lazy<App> = Lazy::new(|| {
    App::get().unwrap_or_else(|why| {
        logging::error_file_async(format!(
            "I can't read the config context because {:?}",
            why
        ));
        Default::default()
    })
});

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    pub system: System,
}

const SYSTEM_REQUEST_TIMEOUT_SECONDS: &str = "SYSTEM_REQUEST_TIMEOUT_SECONDS";
const SYSTEM_CONNECT_TIMEOUT_SECONDS: &str = "SYSTEM_CONNECT_TIMEOUT_SECONDS";
const SYSTEM_PAGE_DELAY_MILLIS: &str = "SYSTEM_PAGE_DELAY_MILLIS";
const SYSTEM_SYMBOL_DELAY_MILLIS: &str = "SYSTEM_SYMBOL_DELAY_MILLIS";
const SYSTEM_OUTPUT_PATH: &str = "SYSTEM_OUTPUT_PATH";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct System {
    /// 整體請求超時（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// 連線超時（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Courtesy pause between the summary and analysis fetches of one symbol.
    #[serde(default = "default_page_delay")]
    pub page_delay_millis: u64,
    /// Courtesy pause between symbols in a batch run.
    #[serde(default = "default_symbol_delay")]
    pub symbol_delay_millis: u64,
    /// When non-empty, batch results are persisted here as pretty JSON.
    #[serde(default)]
    pub output_path: String,
}

fn default_request_timeout() -> u64 {
    15
}

fn default_connect_timeout() -> u64 {
    8
}

fn default_page_delay() -> u64 {
    1000
}

fn default_symbol_delay() -> u64 {
    2000
}

impl Default for System {
    fn default() -> Self {
        System {
            request_timeout_seconds: default_request_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            page_delay_millis: default_page_delay(),
            symbol_delay_millis: default_symbol_delay(),
            output_path: String::new(),
        }
    }
}

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 從 env 中讀取設定值，覆蓋設定檔內容
    fn override_with_env(mut self) -> Self {
        if let Ok(v) = env::var(SYSTEM_REQUEST_TIMEOUT_SECONDS) {
            if let Ok(secs) = u64::from_str(&v) {
                self.system.request_timeout_seconds = secs;
            }
        }

        if let Ok(v) = env::var(SYSTEM_CONNECT_TIMEOUT_SECONDS) {
            if let Ok(secs) = u64::from_str(&v) {
                self.system.connect_timeout_seconds = secs;
            }
        }

        if let Ok(v) = env::var(SYSTEM_PAGE_DELAY_MILLIS) {
            if let Ok(ms) = u64::from_str(&v) {
                self.system.page_delay_millis = ms;
            }
        }

        if let Ok(v) = env::var(SYSTEM_SYMBOL_DELAY_MILLIS) {
            if let Ok(ms) = u64::from_str(&v) {
                self.system.symbol_delay_millis = ms;
            }
        }

        if let Ok(v) = env::var(SYSTEM_OUTPUT_PATH) {
            self.system.output_path = v;
        }

        self
    }
}

fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
