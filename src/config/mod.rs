pub mod settings;

pub use settings::{
    AppConfig, CacheSettings, PriorSettings, RefreshMode, RefreshSettings, ServerSettings,
};
