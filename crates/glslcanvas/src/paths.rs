use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const CONFIG_FILE_NAME: &str = "pages.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "glslcanvas";
const APPLICATION: &str = "glslcanvas";

/// Page table shipped with the workspace.
pub fn bundled_config() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../shaders")
        .join(CONFIG_FILE_NAME)
}

/// `pages.toml` in the user's config directory, if the platform has one.
pub fn user_config() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Picks the page table: an explicit path (flag or `GLSLCANVAS_CONFIG`) must
/// exist; otherwise the user config wins over the bundled one.
pub fn resolve_config(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_config_from(explicit, user_config(), bundled_config())
}

fn resolve_config_from(
    explicit: Option<&Path>,
    user: Option<PathBuf>,
    bundled: PathBuf,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(anyhow!("config file {} does not exist", path.display()));
        }
        return Ok(path.to_path_buf());
    }

    if let Some(path) = user.filter(|path| path.is_file()) {
        tracing::debug!(path = %path.display(), "using user page table");
        return Ok(path);
    }

    if bundled.is_file() {
        tracing::debug!(path = %bundled.display(), "using bundled page table");
        return Ok(bundled);
    }

    Err(anyhow!(
        "no page table found; pass --config or create {}",
        user_config()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| CONFIG_FILE_NAME.to_string())
    ))
}
