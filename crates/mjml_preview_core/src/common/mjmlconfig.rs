//! `.mjmlconfig` lookup.

use std::path::{Path, PathBuf};

/// Name of the MJML config file.
pub const MJML_CONFIG_FILE: &str = ".mjmlconfig";

/// Find the closest directory holding a `.mjmlconfig`, walking up from the
/// directory of `path`.
///
/// # Arguments
///
/// * `path` - Path to a document
///
/// # Returns
///
/// The directory containing the config file, or `None` if no ancestor has one.
pub fn find_mjmlconfig_dir(path: &Path) -> Option<PathBuf> {
    let mut current = path.parent()?;

    loop {
        if current.join(MJML_CONFIG_FILE).is_file() {
            return Some(current.to_path_buf());
        }

        current = current.parent()?;
    }
}
