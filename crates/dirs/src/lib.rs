use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::OnceLock;

pub struct Dirs;

impl Dirs {
    /// Project directory specifically for mjml-preview.
    ///
    /// Returns `None` when no home directory can be determined, e.g. in some
    /// sandboxed environments.
    pub fn project() -> Option<&'static ProjectDirs> {
        static CELL: OnceLock<Option<ProjectDirs>> = OnceLock::new();

        CELL.get_or_init(|| ProjectDirs::from("io", "mjml", "mjml-preview"))
            .as_ref()
    }

    /// Default location of the config file.
    ///
    /// Linux: ~/.config/mjml-preview/config.toml
    /// macOS: ~/Library/Application Support/io.mjml.mjml-preview/config.toml
    /// Windows: ~\AppData\Roaming\mjml\mjml-preview\config\config.toml
    pub fn config_file() -> Option<PathBuf> {
        Self::project().map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
