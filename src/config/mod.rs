/// Configuration module - organized config system with zero repetition
///
/// - `macros.rs` - the `config_struct!` macro for defining sections with
///   embedded defaults
/// - `schemas.rs` - every configuration section, defined once
/// - `utils.rs` - loading, reloading, and access utilities
///
/// ## Loading configuration at startup
/// ```ignore
/// use lootwarden::config::load_config;
/// load_config()?;
/// ```
///
/// ## Accessing configuration
/// ```ignore
/// use lootwarden::config::with_config;
/// let tax_on = with_config(|cfg| cfg.valuation.trade_tax_enabled);
/// ```
#[macro_use]
mod macros;

pub mod schemas;
pub mod utils;

pub use schemas::{CloudConfig, Config, StoreConfig, TailerConfig, ValuationConfig, WebserverConfig};

pub use utils::{
    default_config_path, get_config_clone, is_config_initialized, load_config,
    load_config_from_path, reload_config, reload_config_from_path, save_config, with_config,
    CONFIG,
};
