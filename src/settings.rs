//! Configuration management for gaussjob.
//!
//! Program defaults can be customized through INI-format configuration files,
//! loaded with the following precedence:
//!
//! 1. Local configuration (`./gaussjob_config.cfg`)
//! 2. User configuration (`~/.config/gaussjob/gaussjob_config.cfg`)
//! 3. System configuration (`/etc/gaussjob/gaussjob_config.cfg`)
//! 4. Built-in defaults
//!
//! # Configuration File Format
//!
//! ```ini
//! [job]
//! title = Gaussian Input File Generated by AiiDA via AiiDA-Gaussian Plugin
//! route_tag = P
//! withmpi = false
//! parser_name = gaussian_base_parser
//!
//! [logging]
//! level = info
//! ```
//!
//! These values only seed the command-line tool; file names and exit codes of
//! a Gaussian calculation are fixed.

use crate::calcjob::GaussianCalculation;
use crate::gaussian_input::RouteTag;
use configparser::ini::{Ini, IniDefault};
use log::{debug, info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file searched for in each location.
pub const CONFIG_FILE_NAME: &str = "gaussjob_config.cfg";

/// Errors that can occur during configuration loading and processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// All program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProgramSettings {
    /// Defaults for generated calculations
    pub job: JobSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Defaults applied to calculations built by the command-line tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSettings {
    /// Title card of the generated input
    pub title: String,
    /// Route print level
    pub route_tag: RouteTag,
    /// Run Gaussian through MPI (default: false)
    pub withmpi: bool,
    /// Parser for the retrieved files (default: gaussian_base_parser)
    pub parser_name: String,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            title: GaussianCalculation::DEFAULT_TITLE.to_string(),
            route_tag: RouteTag::default(),
            withmpi: false,
            parser_name: GaussianCalculation::DEFAULT_PARSER.to_string(),
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level (default: "info")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// The configured level as a filter; unknown names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level '{}', using info", self.level);
            LevelFilter::Info
        })
    }

    /// Console logger filtered at the configured level.
    pub fn logger_builder(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        builder
            .filter_level(self.level_filter())
            .target(env_logger::Target::Stdout)
            .format_timestamp_millis();
        builder
    }
}

/// Configuration manager that handles loading and accessing program settings.
pub struct SettingsManager {
    settings: ProgramSettings,
    config_source: String,
    skipped: Vec<String>,
}

impl SettingsManager {
    /// Loads configuration from the available configuration files.
    ///
    /// A file that fails to parse or holds an invalid value is skipped with a
    /// warning, so a broken system file never hides a valid local one.
    pub fn load() -> Result<Self, ConfigError> {
        let manager = Self::load_layered(&Self::candidate_paths());
        debug!("Configuration loaded from: {}", manager.config_source);
        Ok(manager)
    }

    /// Configuration files in loading order, lowest precedence first.
    fn candidate_paths() -> Vec<(&'static str, PathBuf)> {
        let mut candidates = Vec::new();
        if let Some(path) = Self::get_system_config_path() {
            candidates.push(("system", path));
        }
        if let Some(path) = Self::get_user_config_path() {
            candidates.push(("user", path));
        }
        candidates.push(("local", PathBuf::from(CONFIG_FILE_NAME)));
        candidates
    }

    /// Applies each existing file in turn; later files override earlier ones.
    fn load_layered(candidates: &[(&str, PathBuf)]) -> Self {
        let mut settings = ProgramSettings::default();
        let mut config_source = "built-in defaults".to_string();
        let mut skipped = Vec::new();

        for (kind, path) in candidates {
            if !path.exists() {
                continue;
            }
            let mut layered = settings.clone();
            match Self::read_overrides(path).and_then(|overrides| layered.apply(&overrides)) {
                Ok(()) => {
                    settings = layered;
                    config_source = format!("{} config ({})", kind, path.display());
                    debug!("Loaded {} configuration from: {}", kind, path.display());
                }
                Err(e) => {
                    let message =
                        format!("Failed to load {} config from {}: {}", kind, path.display(), e);
                    warn!("{}", message);
                    skipped.push(message);
                }
            }
        }

        Self {
            settings,
            config_source,
            skipped,
        }
    }

    /// Loads a single configuration file on top of the built-in defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = ProgramSettings::default();
        settings.apply(&Self::read_overrides(path)?)?;
        Ok(Self {
            settings,
            config_source: format!("file ({})", path.display()),
            skipped: Vec::new(),
        })
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Files that were present but skipped, with the reason.
    ///
    /// Loading runs before the logger exists, so callers report these once
    /// logging is set up.
    pub fn skipped_files(&self) -> &[String] {
        &self.skipped
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &ProgramSettings {
        &self.settings
    }

    /// Gets the job defaults.
    pub fn job(&self) -> &JobSettings {
        &self.settings.job
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Reads the `section -> key -> value` map of an INI file.
    ///
    /// Only whole-line comments are recognised, so values may contain `#`
    /// and `;`.
    fn read_overrides(path: &Path) -> Result<HashMap<String, HashMap<String, Option<String>>>, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut options = IniDefault::default();
        options.enable_inline_comments = false;
        let mut ini = Ini::new_from_defaults(options);
        ini.read(content)
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;
        Ok(ini.get_map_ref().clone())
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/gaussjob").join(CONFIG_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("gaussjob").join(CONFIG_FILE_NAME))
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("gaussjob")
                    .join(CONFIG_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("gaussjob").join(CONFIG_FILE_NAME))
        }
    }

    /// Creates a commented configuration file with all options at their defaults.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        fs::write(path, Self::generate_template_content())?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    fn generate_template_content() -> String {
        let job = JobSettings::default();
        let logging = LoggingSettings::default();
        format!(
            r#"# gaussjob configuration file
#
# Files are loaded in order, later ones overriding earlier ones:
#
# 1. System config (/etc/gaussjob/{file})
# 2. User config (~/.config/gaussjob/{file})
# 3. Current working directory (./{file})
#
# Missing sections or values keep the built-in defaults shown below.
# Comments must start a line; a '#' or ';' after a value is part of it.

[job]
# Title card written into generated inputs
title = {title}

# Route print level: N, P, T (with or without the leading hash), or "default" for a bare hash
route_tag = {route_tag}

# Run Gaussian through the MPI launcher (Gaussian parallelizes itself; keep false)
withmpi = {withmpi}

# Parser the workflow engine applies to the retrieved files
parser_name = {parser_name}

[logging]
# Log level: error, warn, info, debug, trace
level = {level}
"#,
            file = CONFIG_FILE_NAME,
            title = job.title,
            route_tag = job.route_tag.letter(),
            withmpi = job.withmpi,
            parser_name = job.parser_name,
            level = logging.level,
        )
    }
}

impl ProgramSettings {
    /// Applies the values present in `overrides`, keeping everything else.
    fn apply(
        &mut self,
        overrides: &HashMap<String, HashMap<String, Option<String>>>,
    ) -> Result<(), ConfigError> {
        if let Some(job) = overrides.get("job") {
            if let Some(Some(title)) = job.get("title") {
                self.job.title = title.clone();
            }
            if let Some(Some(route_tag)) = job.get("route_tag") {
                self.job.route_tag = route_tag.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("Invalid route_tag: {}", route_tag))
                })?;
            }
            if let Some(Some(withmpi)) = job.get("withmpi") {
                self.job.withmpi = withmpi.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("Invalid withmpi value: {}", withmpi))
                })?;
            }
            if let Some(Some(parser_name)) = job.get("parser_name") {
                self.job.parser_name = parser_name.clone();
            }
        }

        if let Some(logging) = overrides.get("logging") {
            if let Some(Some(level)) = logging.get("level") {
                self.logging.level = level.clone();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_template_loads_back_as_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        SettingsManager::create_template(&path).unwrap();

        let manager = SettingsManager::load_from(&path).unwrap();
        assert_eq!(manager.settings(), &ProgramSettings::default());
    }

    #[test]
    fn test_partial_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[job]\nroute_tag = T\n\n[logging]\nlevel = debug\n").unwrap();

        let manager = SettingsManager::load_from(&path).unwrap();
        assert_eq!(manager.job().route_tag, RouteTag::Terse);
        assert_eq!(manager.job().parser_name, "gaussian_base_parser");
        assert!(!manager.job().withmpi);
        assert_eq!(manager.logging().level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        fs::write(&path, "[job]\nwithmpi = maybe\n").unwrap();
        assert!(matches!(
            SettingsManager::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));

        fs::write(&path, "[job]\nroute_tag = Q\n").unwrap();
        assert!(matches!(
            SettingsManager::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_later_files_take_precedence() {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("system.cfg");
        let local = dir.path().join("local.cfg");
        fs::write(&system, "[job]\nroute_tag = T\nparser_name = system_parser\n").unwrap();
        fs::write(&local, "[job]\nroute_tag = N\n\n[logging]\nlevel = debug\n").unwrap();

        let manager = SettingsManager::load_layered(&[
            ("system", system),
            ("user", dir.path().join("absent.cfg")),
            ("local", local.clone()),
        ]);
        assert_eq!(manager.job().route_tag, RouteTag::Normal);
        assert_eq!(manager.job().parser_name, "system_parser");
        assert_eq!(manager.logging().level_filter(), LevelFilter::Debug);
        assert_eq!(
            manager.config_source(),
            format!("local config ({})", local.display())
        );
    }

    #[test]
    fn test_invalid_file_does_not_hide_others() {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("system.cfg");
        let local = dir.path().join("local.cfg");
        fs::write(&system, "[job]\nparser_name = system_parser\n").unwrap();
        fs::write(&local, "[job]\nwithmpi = maybe\nparser_name = local_parser\n").unwrap();

        let manager =
            SettingsManager::load_layered(&[("system", system.clone()), ("local", local)]);
        assert_eq!(manager.job().parser_name, "system_parser");
        assert!(!manager.job().withmpi);
        assert_eq!(manager.skipped_files().len(), 1);
        assert_eq!(
            manager.config_source(),
            format!("system config ({})", system.display())
        );
    }

    #[test]
    fn test_values_keep_hash_and_semicolon() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "# header comment\n[job]\n; another comment\ntitle = Run #3; relaxed scan\nroute_tag = #T\n",
        )
        .unwrap();

        let manager = SettingsManager::load_from(&path).unwrap();
        assert_eq!(manager.job().title, "Run #3; relaxed scan");
        assert_eq!(manager.job().route_tag, RouteTag::Terse);
    }

    #[test]
    fn test_level_names_map_to_filters() {
        let filter = |level: &str| {
            LoggingSettings {
                level: level.to_string(),
            }
            .level_filter()
        };
        assert_eq!(filter("error"), LevelFilter::Error);
        assert_eq!(filter("warn"), LevelFilter::Warn);
        assert_eq!(filter("DEBUG"), LevelFilter::Debug);
        assert_eq!(filter("trace"), LevelFilter::Trace);
        assert_eq!(filter("off"), LevelFilter::Off);
    }

    #[test]
    fn test_logger_uses_configured_level() {
        let debug = LoggingSettings {
            level: "debug".to_string(),
        };
        assert_eq!(debug.logger_builder().build().filter(), LevelFilter::Debug);

        let quiet = LoggingSettings {
            level: "warn".to_string(),
        };
        assert_eq!(quiet.logger_builder().build().filter(), LevelFilter::Warn);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let logging = LoggingSettings {
            level: "chatty".to_string(),
        };
        assert_eq!(logging.level_filter(), LevelFilter::Info);
    }
}
