use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canvas::window::{self, WindowConfig};
use canvas::CanvasOffset;
use pageconfig::PageConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::paths::resolve_config;
use crate::router::{FileRouter, PageRouter};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    if cli.list_pages {
        let (path, config) = load_page_table(&cli)?;
        print_pages(&path, &config);
        return Ok(());
    }

    let mut window_config = WindowConfig {
        gpu_power: cli.gpu_power,
        ..WindowConfig::default()
    };
    if let Some(size) = cli.size {
        window_config.size = size;
    }

    if let (Some(vertex), Some(fragment)) = (cli.vertex.clone(), cli.fragment.clone()) {
        tracing::info!(
            vertex = %vertex.display(),
            fragment = %fragment.display(),
            "previewing shader files"
        );
        if let Some(offset) = cli.offset {
            window_config.offset = offset;
        }
        return window::run(window_config, FileRouter::new(vertex, fragment));
    }

    let (path, config) = load_page_table(&cli)?;
    window_config.offset = cli.offset.unwrap_or_else(|| {
        let [left, top] = config.canvas.offset;
        CanvasOffset::new(left, top)
    });
    let router = PageRouter::new(config, cli.page.as_deref())?;
    tracing::info!(
        config = %path.display(),
        page = router.current(),
        size = %window_config.size,
        gpu_power = %window_config.gpu_power,
        "opening preview window"
    );
    window::run(window_config, router)
}

fn load_page_table(cli: &Cli) -> Result<(PathBuf, PageConfig)> {
    let path = resolve_config(cli.config.as_deref())?;
    let config = PageConfig::load(&path)
        .with_context(|| format!("failed to load page table {}", path.display()))?;
    Ok((path, config))
}

fn print_pages(path: &Path, config: &PageConfig) {
    let default_page = config.default_page();
    println!("Pages in {}:", path.display());
    for name in config.page_names() {
        let marker = if Some(name) == default_page { '*' } else { ' ' };
        let Some(page) = config.page(name) else {
            continue;
        };
        println!(
            "{marker} {name:<16} {:<24} {} + {}",
            page.title.as_deref().unwrap_or("-"),
            page.vertex.display(),
            page.fragment.display()
        );
    }
}
