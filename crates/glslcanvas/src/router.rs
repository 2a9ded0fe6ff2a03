use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use canvas::window::{Navigation, RoutedSource, ShaderRouter};
use canvas::ShaderSource;
use pageconfig::PageConfig;

/// Walks the page table in name order.
pub struct PageRouter {
    config: PageConfig,
    current: String,
}

impl PageRouter {
    /// Starts at `page`, or at the table's default page.
    pub fn new(config: PageConfig, page: Option<&str>) -> Result<Self> {
        let current = match page {
            Some(name) if config.page(name).is_some() => name.to_string(),
            Some(name) => {
                let known: Vec<&str> = config.page_names().collect();
                return Err(anyhow!(
                    "unknown page '{name}'; available pages: {}",
                    known.join(", ")
                ));
            }
            None => config
                .default_page()
                .ok_or_else(|| anyhow!("page table has no pages"))?
                .to_string(),
        };
        Ok(Self { config, current })
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    fn read_current(&self) -> Result<RoutedSource> {
        let page = self
            .config
            .read_page(&self.current)
            .with_context(|| format!("failed to load page '{}'", self.current))?;
        tracing::info!(page = %page.name, title = %page.title, "loaded page");
        Ok(RoutedSource {
            title: page.title,
            source: ShaderSource::new(page.vertex, page.fragment),
        })
    }
}

impl ShaderRouter for PageRouter {
    fn load(&mut self) -> Result<RoutedSource> {
        self.read_current()
    }

    fn navigate(&mut self, navigation: Navigation) -> Result<RoutedSource> {
        let target = match navigation {
            Navigation::Next => self.config.next_page(&self.current),
            Navigation::Previous => self.config.previous_page(&self.current),
            Navigation::Reload => Some(self.current.as_str()),
        };
        if let Some(target) = target {
            self.current = target.to_string();
        }
        self.read_current()
    }
}

/// A single vertex/fragment pair given on the command line.
pub struct FileRouter {
    vertex: PathBuf,
    fragment: PathBuf,
}

impl FileRouter {
    pub fn new(vertex: PathBuf, fragment: PathBuf) -> Self {
        Self { vertex, fragment }
    }

    fn read(&self) -> Result<RoutedSource> {
        let vertex = fs::read_to_string(&self.vertex)
            .with_context(|| format!("failed to read {}", self.vertex.display()))?;
        let fragment = fs::read_to_string(&self.fragment)
            .with_context(|| format!("failed to read {}", self.fragment.display()))?;
        let title = self
            .fragment
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "glslcanvas".to_string());
        Ok(RoutedSource {
            title,
            source: ShaderSource::new(vertex, fragment),
        })
    }
}

impl ShaderRouter for FileRouter {
    fn load(&mut self) -> Result<RoutedSource> {
        self.read()
    }

    /// There is only one pair, so every navigation re-reads it.
    fn navigate(&mut self, _navigation: Navigation) -> Result<RoutedSource> {
        self.read()
    }
}
