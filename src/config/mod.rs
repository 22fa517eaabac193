pub mod loader;

pub use loader::{
    load_config, write_default_config, AppConfig, ConfigError, LoggingSection,
    PersistenceSection, RuntimeSection,
};
