use crate::log_error;
use crate::smoothing::core::snapshot_interpolation::snapshot_interpolation_settings::SnapshotInterpolationSettings;
use config::{Config, Environment, File};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load interpolation settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid interpolation settings: {0}")]
    Invalid(String),
}

pub struct SettingsLoader;

impl SettingsLoader {
    pub const ENV_PREFIX: &'static str = "SNAPSHOT_TIMELINE";

    /// Reads settings from `path` (format taken from the extension), then applies
    /// `SNAPSHOT_TIMELINE_*` environment overrides. Missing keys keep their defaults.
    pub fn load(path: &str) -> Result<SnapshotInterpolationSettings, SettingsError> {
        Self::load_with_env_prefix(path, Self::ENV_PREFIX)
    }

    pub fn load_with_env_prefix(
        path: &str,
        env_prefix: &str,
    ) -> Result<SnapshotInterpolationSettings, SettingsError> {
        let source = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
            .build()?;
        Ok(source.try_deserialize::<SnapshotInterpolationSettings>()?)
    }

    /// Like [`load`](Self::load), but also runs [`SnapshotInterpolationSettings::validate`].
    pub fn load_validated(path: &str) -> Result<SnapshotInterpolationSettings, SettingsError> {
        let settings = Self::load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_or_default(path: &str) -> SnapshotInterpolationSettings {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log_error!(format!("{}, falling back to defaults", e));
                SnapshotInterpolationSettings::default()
            }
        }
    }
}
