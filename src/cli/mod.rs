mod config;
pub use self::config::{Config, Host};

mod start;
pub use self::start::{Settings, get_config_path, settings, start};

pub mod commands;
