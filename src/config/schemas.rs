/// Configuration section structs, each defined once with embedded defaults
/// via the `config_struct!` macro.
use crate::config_struct;

config_struct! {
    /// Log Tailer settings.
    pub struct TailerConfig {
        log_path: String = String::new(),
        poll_interval_ms: u64 = 200,
        cold_start_scan_bytes: u64 = 5 * 1024 * 1024,
    }
}

config_struct! {
    /// Store (database) settings.
    pub struct StoreConfig {
        db_file_name: String = "lootwarden.db".to_string(),
    }
}

config_struct! {
    /// Valuation Engine toggles.
    pub struct ValuationConfig {
        trade_tax_enabled: bool = false,
        map_cost_enabled: bool = false,
        real_time_tracking_enabled: bool = false,
    }
}

config_struct! {
    /// Cloud Sync Worker settings. `base_url`/`anon_key` are populated from
    /// the environment at load time, never persisted to disk.
    pub struct CloudConfig {
        enabled: bool = false,
        uplink_period_secs: u64 = 60,
        downlink_period_secs: u64 = 300,
        request_timeout_secs: u64 = 10,
        base_url: String = String::new(),
        anon_key: String = String::new(),
    }
}

impl CloudConfig {
    /// The remote aggregation service is reachable only when both
    /// environment variables were present at startup.
    pub fn has_remote(&self) -> bool {
        !self.base_url.is_empty() && !self.anon_key.is_empty()
    }
}

config_struct! {
    /// Local HTTP boundary settings.
    pub struct WebserverConfig {
        host: String = "127.0.0.1".to_string(),
        port: u16 = 7890,
    }
}

impl WebserverConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

config_struct! {
    /// Top-level process configuration.
    pub struct Config {
        tailer: TailerConfig = TailerConfig::default(),
        store: StoreConfig = StoreConfig::default(),
        valuation: ValuationConfig = ValuationConfig::default(),
        cloud: CloudConfig = CloudConfig::default(),
        webserver: WebserverConfig = WebserverConfig::default(),
        portable: bool = false,
    }
}
