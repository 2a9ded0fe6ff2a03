//! Page table for the preview window: named vertex/fragment pairs plus the
//! canvas placement, read from TOML.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    fn io(path: &Path, source: io::Error) -> Self {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageConfig {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_page: Option<String>,
    #[serde(default)]
    pub canvas: CanvasSection,
    #[serde(default)]
    pub pages: BTreeMap<String, Page>,
    /// Directory page paths are resolved against; set by [`PageConfig::load`].
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CanvasSection {
    /// Canvas top-left corner inside the window, in pixels.
    #[serde(default)]
    pub offset: [f32; 2],
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

/// Shader text of one page, read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    pub name: String,
    pub title: String,
    pub vertex: String,
    pub fragment: String,
}

impl PageConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: PageConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates `path`; page files resolve relative to its
    /// directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|err| ConfigError::io(path, err))?;
        let mut config = Self::from_toml_str(&input)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.pages.is_empty() {
            return Err(ConfigError::Invalid(
                "config must define at least one page".into(),
            ));
        }

        for (name, page) in &self.pages {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("page names may not be empty".into()));
            }
            if page.vertex.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "page '{name}' has an empty vertex path"
                )));
            }
            if page.fragment.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "page '{name}' has an empty fragment path"
                )));
            }
        }

        if let Some(default_page) = &self.default_page {
            if !self.pages.contains_key(default_page) {
                return Err(ConfigError::Invalid(format!(
                    "default_page references unknown page '{default_page}'"
                )));
            }
        }

        Ok(())
    }

    pub fn page(&self, name: &str) -> Option<&Page> {
        self.pages.get(name)
    }

    /// Page names in iteration (name) order.
    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    /// `default_page` when set, otherwise the first page by name.
    pub fn default_page(&self) -> Option<&str> {
        self.default_page
            .as_deref()
            .or_else(|| self.page_names().next())
    }

    /// The page after `name`, wrapping around.
    pub fn next_page(&self, name: &str) -> Option<&str> {
        self.step(name, 1)
    }

    /// The page before `name`, wrapping around.
    pub fn previous_page(&self, name: &str) -> Option<&str> {
        self.step(name, -1)
    }

    fn step(&self, name: &str, delta: isize) -> Option<&str> {
        let names: Vec<&str> = self.page_names().collect();
        let index = names.iter().position(|candidate| *candidate == name)?;
        let len = names.len() as isize;
        let next = (index as isize + delta).rem_euclid(len) as usize;
        names.get(next).copied()
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Reads both shader files of `name`. The title falls back to the page
    /// name.
    pub fn read_page(&self, name: &str) -> Result<PageSource, ConfigError> {
        let page = self
            .page(name)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown page '{name}'")))?;
        let vertex_path = self.resolve_path(&page.vertex);
        let fragment_path = self.resolve_path(&page.fragment);
        let vertex =
            fs::read_to_string(&vertex_path).map_err(|err| ConfigError::io(&vertex_path, err))?;
        let fragment = fs::read_to_string(&fragment_path)
            .map_err(|err| ConfigError::io(&fragment_path, err))?;

        Ok(PageSource {
            name: name.to_string(),
            title: page.title.clone().unwrap_or_else(|| name.to_string()),
            vertex,
            fragment,
        })
    }
}
