// quicksetup/src/config/mod.rs
use std::fmt;
use std::path::PathBuf;

pub mod repository;

pub use repository::{default_config_path, ConfigRepository, IniConfigRepository};

pub const CONFIG_FILE_NAME: &str = "autowsgr_quicksetup_config.ini";
pub const CONFIG_SECTION: &str = "DEFAULT";

/// Package index mirror used for pip install/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorSource {
    #[default]
    Default,
    Aliyun,
    Tsinghua,
}

impl MirrorSource {
    pub const ALL: [MirrorSource; 3] = [MirrorSource::Default, MirrorSource::Aliyun, MirrorSource::Tsinghua];

    pub fn label(&self) -> &'static str {
        match self {
            MirrorSource::Default => "Default",
            MirrorSource::Aliyun => "Aliyun",
            MirrorSource::Tsinghua => "Tsinghua",
        }
    }

    /// Accepts our labels case-insensitively plus the labels older config files were written with.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "default" | "默认" => Some(MirrorSource::Default),
            "aliyun" | "阿里云" => Some(MirrorSource::Aliyun),
            "tsinghua" | "清华大学" => Some(MirrorSource::Tsinghua),
            _ => None,
        }
    }

    /// `(index url, trusted host)`; `None` for the default index.
    pub fn index(&self) -> Option<(&'static str, &'static str)> {
        match self {
            MirrorSource::Default => None,
            MirrorSource::Aliyun => Some(("https://mirrors.aliyun.com/pypi/simple", "mirrors.aliyun.com")),
            MirrorSource::Tsinghua => Some(("https://pypi.tuna.tsinghua.edu.cn/simple", "pypi.tuna.tsinghua.edu.cn")),
        }
    }
}

impl fmt::Display for MirrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the example bundle is fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExamplesSource {
    #[default]
    GitHub,
    Moeyy,
}

impl ExamplesSource {
    pub const ALL: [ExamplesSource; 2] = [ExamplesSource::GitHub, ExamplesSource::Moeyy];

    pub fn label(&self) -> &'static str {
        match self {
            ExamplesSource::GitHub => "GitHub",
            ExamplesSource::Moeyy => "Moeyy",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "github" => Some(ExamplesSource::GitHub),
            "moeyy" | "moeyy加速" => Some(ExamplesSource::Moeyy),
            _ => None,
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            ExamplesSource::GitHub => "https://github.com/OpenWSGR/AutoWSGR-examples/archive/refs/heads/main.zip",
            ExamplesSource::Moeyy => {
                "https://github.moeyy.xyz/https://github.com/OpenWSGR/AutoWSGR-examples/archive/refs/heads/main.zip"
            }
        }
    }
}

impl fmt::Display for ExamplesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Keys of the persisted `DEFAULT` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    WorkingDirectory,
    MirrorSource,
    ExamplesSource,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 3] = [ConfigKey::WorkingDirectory, ConfigKey::MirrorSource, ConfigKey::ExamplesSource];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::WorkingDirectory => "working_directory",
            ConfigKey::MirrorSource => "mirror_source",
            ConfigKey::ExamplesSource => "examples_source",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetupConfig {
    /// Empty means "not chosen yet".
    pub working_directory: String,
    pub mirror_source: MirrorSource,
    pub examples_source: ExamplesSource,
}

impl SetupConfig {
    pub fn working_dir(&self) -> Option<PathBuf> {
        if self.working_directory.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.working_directory))
        }
    }

    pub fn get(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::WorkingDirectory => self.working_directory.clone(),
            ConfigKey::MirrorSource => self.mirror_source.label().to_string(),
            ConfigKey::ExamplesSource => self.examples_source.label().to_string(),
        }
    }

    /// Unknown enum labels fall back to the default variant, same as a read.
    pub fn set(&mut self, key: ConfigKey, value: &str) {
        match key {
            ConfigKey::WorkingDirectory => self.working_directory = value.to_string(),
            ConfigKey::MirrorSource => self.mirror_source = MirrorSource::parse(value).unwrap_or_default(),
            ConfigKey::ExamplesSource => self.examples_source = ExamplesSource::parse(value).unwrap_or_default(),
        }
    }
}
