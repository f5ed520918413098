// quicksetup/src/config/repository.rs
use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::GBK;
use ini::{EscapePolicy, Ini, ParseOption};
use log::{debug, info, warn};

use super::{ConfigKey, ExamplesSource, MirrorSource, SetupConfig, CONFIG_FILE_NAME, CONFIG_SECTION};
use crate::error::SetupError;

/// Overrides where the config file lives.
pub const CONFIG_PATH_ENV: &str = "QUICKSETUP_CONFIG";

/// Persistence for [`SetupConfig`].
pub trait ConfigRepository: Send + Sync {
    fn load(&self) -> Result<SetupConfig, SetupError>;
    fn save(&self, config: &SetupConfig) -> Result<(), SetupError>;

    /// Update one field and persist the whole config straight away.
    fn set_and_save(&self, config: &mut SetupConfig, key: ConfigKey, value: &str) -> Result<(), SetupError> {
        config.set(key, value);
        self.save(config)
    }
}

/// INI file with a single `DEFAULT` section.
pub struct IniConfigRepository {
    config_path: PathBuf,
}

impl IniConfigRepository {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

// Paths on Windows carry backslashes; keep them literal both ways.
fn parse_options() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

fn read_value<'a>(ini: &'a Ini, key: ConfigKey) -> Option<&'a str> {
    ini.section(Some(CONFIG_SECTION))
        .and_then(|s| s.get(key.as_str()))
        .or_else(|| ini.section(None::<String>).and_then(|s| s.get(key.as_str())))
}

// Files written by older tools on Chinese Windows hosts use the GBK code
// page. Anything that is neither UTF-8 nor GBK is decoded lossily.
fn decode_config_text(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    let (text, _, had_errors) = GBK.decode(bytes);
    if had_errors {
        warn!("[CONFIG] Config file is neither UTF-8 nor GBK, decoding lossily");
        return String::from_utf8_lossy(bytes).into_owned();
    }
    debug!("[CONFIG] Decoded config file as GBK");
    text.into_owned()
}

fn config_from_ini(ini: &Ini) -> SetupConfig {
    let mut config = SetupConfig::default();
    if let Some(dir) = read_value(ini, ConfigKey::WorkingDirectory) {
        config.working_directory = dir.trim().to_string();
    }
    if let Some(label) = read_value(ini, ConfigKey::MirrorSource) {
        config.mirror_source = MirrorSource::parse(label).unwrap_or_else(|| {
            warn!("[CONFIG] Unknown mirror_source '{}', using {}", label, MirrorSource::default());
            MirrorSource::default()
        });
    }
    if let Some(label) = read_value(ini, ConfigKey::ExamplesSource) {
        config.examples_source = ExamplesSource::parse(label).unwrap_or_else(|| {
            warn!("[CONFIG] Unknown examples_source '{}', using {}", label, ExamplesSource::default());
            ExamplesSource::default()
        });
    }
    config
}

impl ConfigRepository for IniConfigRepository {
    fn load(&self) -> Result<SetupConfig, SetupError> {
        if !self.config_path.exists() {
            info!("[CONFIG] {} not found, writing defaults", self.config_path.display());
            let default_config = SetupConfig::default();
            self.save(&default_config)?;
            return Ok(default_config);
        }

        let bytes = match fs::read(&self.config_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("[CONFIG] Failed to read {} ({}), using defaults", self.config_path.display(), e);
                return Ok(SetupConfig::default());
            }
        };
        let text = decode_config_text(&bytes);
        let ini = Ini::load_from_str_opt(&text, parse_options()).unwrap_or_else(|e| {
            warn!("[CONFIG] {} is malformed ({}), falling back to defaults", self.config_path.display(), e);
            Ini::new()
        });
        let config = config_from_ini(&ini);
        debug!("[CONFIG] Loaded {:?}", config);
        Ok(config)
    }

    fn save(&self, config: &SetupConfig) -> Result<(), SetupError> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| SetupError::Config(format!("Failed to create {}: {}", parent.display(), e)))?;
            }
        }

        let mut ini = Ini::new();
        {
            let mut section = ini.with_section(Some(CONFIG_SECTION));
            for key in ConfigKey::ALL {
                section.set(key.as_str(), config.get(key));
            }
        }
        ini.write_to_file_policy(&self.config_path, EscapePolicy::Nothing)
            .map_err(|e| SetupError::Config(format!("Failed to write {}: {}", self.config_path.display(), e)))?;
        debug!("[CONFIG] Saved to {}", self.config_path.display());
        Ok(())
    }
}

/// `$QUICKSETUP_CONFIG`, else the config file name in the current directory.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    std::env::current_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_NAME))
}
