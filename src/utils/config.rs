use std::path::PathBuf;

use crate::driver::web::WebDriverConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for captured element records
    pub json_dir: PathBuf,

    /// Directory for session audit logs
    pub log_dir: PathBuf,

    /// Browser launch settings (env defaults: LUMI_HEADLESS, LUMI_CDP_ENDPOINT)
    pub web: WebDriverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            json_dir: PathBuf::from("./JSONs"),
            log_dir: PathBuf::from("./logs"),
            web: WebDriverConfig::default(),
        }
    }
}
