pub mod loader;
pub mod types;

pub use loader::{apply_env_overrides, load_settings, CONFIG_ENV};
pub use types::AuthSettings;
