use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "BOT_TOKEN")]
    pub bot_token: String,
    /// Conversations idle longer than this are dropped.
    #[envconfig(from = "SCRIPT_TTL_SECS", default = "86400")]
    pub script_ttl_secs: u64,
    #[envconfig(from = "SWEEP_INTERVAL_SECS", default = "60")]
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn script_ttl(&self) -> Duration {
        Duration::from_secs(self.script_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
