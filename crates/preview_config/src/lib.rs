pub mod monitor;

use dirs::Dirs;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

static CONFIG: Lazy<RwLock<Arc<Config>>> = Lazy::new(|| RwLock::new(Arc::new(Config::default())));

static CONFIG_FILE: OnceCell<PathBuf> = OnceCell::new();

struct LoadedConfig {
    config: Config,
    maybe_error: Option<toml::de::Error>,
}

fn load_config(config_file: &Path) -> LoadedConfig {
    if let Some(parent) = config_file.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let mut maybe_error = None;
    let config = std::fs::read_to_string(config_file)
        .ok()
        .and_then(|contents| {
            toml::from_str(&contents)
                .map_err(|err| {
                    maybe_error.replace(err);
                })
                .ok()
        })
        .unwrap_or_default();

    LoadedConfig {
        config,
        maybe_error,
    }
}

/// Loads the config file once when the program starts.
///
/// The file given on the command line wins over the default location. A
/// missing file is not an error, the defaults are used; a malformed one is
/// returned alongside the defaults so that the caller can report it.
pub fn load_config_on_startup(
    specified_config_file: Option<PathBuf>,
) -> (Arc<Config>, Option<toml::de::Error>) {
    let Some(config_file) = specified_config_file.or_else(Dirs::config_file) else {
        return (config(), None);
    };

    let LoadedConfig {
        config: loaded_config,
        maybe_error,
    } = load_config(&config_file);

    CONFIG_FILE.set(config_file).ok();
    *CONFIG.write() = Arc::new(loaded_config);

    (config(), maybe_error)
}

/// Re-reads the config file, keeping the current config if it's malformed.
pub fn reload_config() -> Option<toml::de::Error> {
    let config_file = config_file()?;

    let LoadedConfig {
        config,
        maybe_error,
    } = load_config(config_file);

    match maybe_error {
        Some(err) => Some(err),
        None => {
            *CONFIG.write() = Arc::new(config);
            None
        }
    }
}

/// Returns a snapshot of the current global config.
///
/// The config is replaced wholesale on reload, a snapshot never changes
/// under the caller.
pub fn config() -> Arc<Config> {
    CONFIG.read().clone()
}

pub fn config_file() -> Option<&'static PathBuf> {
    CONFIG_FILE.get()
}

/// Replaces the `[preview]` section with the settings pushed by the editor.
pub fn update_preview_settings(preview: PreviewSettings) {
    let mut current = CONFIG.write();
    *current = Arc::new(Config {
        log: current.log.clone(),
        preview,
    });
}

/// Source of the render settings, queried afresh for every render.
pub trait ConfigSource: Send + Sync {
    fn preview_settings(&self) -> PreviewSettings;
}

/// [`ConfigSource`] backed by the global config.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalConfig;

impl ConfigSource for GlobalConfig {
    fn preview_settings(&self) -> PreviewSettings {
        config().preview.clone()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LogConfig {
    /// Specify the log file path.
    ///
    /// This path must be an absolute path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,

    /// Specify the max log level.
    pub max_level: String,

    /// Specify the log target to enable more detailed logging.
    ///
    /// ```toml
    /// [log]
    /// log-target = "preview_server=trace,rpc=debug"
    /// ```
    pub log_target: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            max_level: "debug".into(),
            log_target: "".into(),
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }))
}

/// Render settings.
///
/// Editors push their own settings using camelCase names, which are accepted
/// as aliases of the kebab-case keys used in `config.toml`. Unknown keys are
/// ignored here since editors tend to forward their whole settings section.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct PreviewSettings {
    /// Re-render when a document is opened or the active editor changes.
    #[serde(alias = "autoPreview")]
    pub auto_preview: bool,

    /// Re-render on every text change.
    #[serde(alias = "updateWhenTyping")]
    pub update_when_typing: bool,

    /// Give the focus back to the document after the preview is created.
    #[serde(alias = "preserveFocus")]
    pub preserve_focus: bool,

    /// Close the preview once every previewed document is closed.
    #[serde(alias = "autoClosePreview")]
    pub auto_close_preview: bool,

    /// Follow the active document. When off, the preview stays on the first
    /// document it rendered until that document is closed.
    #[serde(alias = "switchOnSeparateFileChange")]
    pub switch_on_separate_file_change: bool,

    /// CSS color painted behind the preview.
    #[serde(
        alias = "previewBackgroundColor",
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub preview_background_color: Option<String>,

    /// Script rendering the documents instead of the built-in compiler,
    /// relative to the workspace root.
    #[serde(
        alias = "rendererPath",
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub renderer_path: Option<String>,

    /// Program running the renderer script.
    #[serde(alias = "rendererRuntime")]
    pub renderer_runtime: String,

    /// Upper bound of a single external render.
    #[serde(alias = "rendererTimeoutMs")]
    pub renderer_timeout_ms: u64,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            auto_preview: false,
            update_when_typing: true,
            preserve_focus: true,
            auto_close_preview: true,
            switch_on_separate_file_change: true,
            preview_background_color: None,
            renderer_path: None,
            renderer_runtime: "node".into(),
            renderer_timeout_ms: 10_000,
        }
    }
}

impl PreviewSettings {
    pub fn renderer_timeout(&self) -> Duration {
        Duration::from_millis(self.renderer_timeout_ms)
    }

    pub fn background_color(&self) -> Option<&str> {
        self.preview_background_color.as_deref()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Log configuration.
    pub log: LogConfig,

    /// Preview configuration.
    pub preview: PreviewSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        let toml_content = r##"
          [log]
          max-level = "trace"
          log-file = "/tmp/mjml-preview.log"

          [preview]
          auto-preview = true
          preview-background-color = "#fff"
          renderer-path = "scripts/render.js"
          renderer-timeout-ms = 5000
"##;
        let user_config: Config =
            toml::from_str(toml_content).expect("Failed to deserialize config");

        assert_eq!(
            user_config,
            Config {
                log: LogConfig {
                    log_file: Some("/tmp/mjml-preview.log".to_string()),
                    max_level: "trace".to_string(),
                    ..Default::default()
                },
                preview: PreviewSettings {
                    auto_preview: true,
                    preview_background_color: Some("#fff".to_string()),
                    renderer_path: Some("scripts/render.js".to_string()),
                    renderer_timeout_ms: 5000,
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(toml::from_str::<Config>("[plugin]\nenable = true").is_err());
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        toml::to_string_pretty(&config).expect("Serialize config is okay");
    }

    #[test]
    fn test_editor_settings_aliases() {
        let settings: PreviewSettings = serde_json::from_value(serde_json::json!({
            "autoPreview": true,
            "updateWhenTyping": false,
            "preserveFocus": false,
            "autoClosePreview": false,
            "switchOnSeparateFileChange": false,
            "previewBackgroundColor": "",
            "rendererPath": "render.js",
            "beautify": true,
        }))
        .unwrap();

        assert!(settings.auto_preview);
        assert!(!settings.update_when_typing);
        assert!(!settings.preserve_focus);
        assert!(!settings.auto_close_preview);
        assert!(!settings.switch_on_separate_file_change);
        assert_eq!(settings.background_color(), None);
        assert_eq!(settings.renderer_path.as_deref(), Some("render.js"));
        assert_eq!(settings.renderer_runtime, "node");
        assert_eq!(settings.renderer_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("config.toml");

        std::fs::write(&config_file, "[preview]\nauto-close-preview = false\n").unwrap();
        let LoadedConfig {
            config,
            maybe_error,
        } = load_config(&config_file);
        assert!(maybe_error.is_none());
        assert!(!config.preview.auto_close_preview);

        std::fs::write(&config_file, "[preview]\nauto-close-preview = 1\n").unwrap();
        let LoadedConfig {
            config,
            maybe_error,
        } = load_config(&config_file);
        assert!(maybe_error.is_some());
        assert_eq!(config, Config::default());

        let LoadedConfig {
            config,
            maybe_error,
        } = load_config(&dir.path().join("missing.toml"));
        assert!(maybe_error.is_none());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_update_preview_settings() {
        update_preview_settings(PreviewSettings {
            preview_background_color: Some("red".into()),
            ..Default::default()
        });
        assert_eq!(
            GlobalConfig.preview_settings().background_color(),
            Some("red")
        );
    }
}
