use std::path::PathBuf;

use canvas::{CanvasOffset, GpuPowerPreference, Resolution};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "glslcanvas",
    author,
    version,
    about = "Live GLSL shader preview window"
)]
pub struct Cli {
    /// Page table TOML; defaults to the user config, then the bundled pages.
    #[arg(long, value_name = "FILE", env = "GLSLCANVAS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Page to open instead of the table's default page.
    #[arg(long, value_name = "NAME", conflicts_with = "vertex")]
    pub page: Option<String>,

    /// Vertex shader file; bypasses the page table (requires `--fragment`).
    #[arg(long, value_name = "FILE", requires = "fragment")]
    pub vertex: Option<PathBuf>,

    /// Fragment shader file; bypasses the page table (requires `--vertex`).
    #[arg(long, value_name = "FILE", requires = "vertex")]
    pub fragment: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<Resolution>,

    /// Canvas offset inside the window, overriding the page table (e.g. `0,40`).
    #[arg(long, value_name = "X,Y", value_parser = parse_offset)]
    pub offset: Option<CanvasOffset>,

    /// GPU adapter preference: `high` (default) or `low`.
    #[arg(
        long,
        value_name = "POWER",
        value_parser = parse_gpu_power,
        default_value_t = GpuPowerPreference::default()
    )]
    pub gpu_power: GpuPowerPreference,

    /// Print the page table and exit without opening a window.
    #[arg(long)]
    pub list_pages: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(spec: &str) -> Result<Resolution, String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }

    Ok(Resolution::new(width, height))
}

pub fn parse_offset(spec: &str) -> Result<CanvasOffset, String> {
    let (left, top) = spec
        .trim()
        .split_once(',')
        .ok_or_else(|| "expected X,Y format, e.g. 0,40".to_string())?;
    let left: f32 = left
        .trim()
        .parse()
        .map_err(|_| format!("invalid horizontal offset '{}'", left.trim()))?;
    let top: f32 = top
        .trim()
        .parse()
        .map_err(|_| format!("invalid vertical offset '{}'", top.trim()))?;
    if !left.is_finite() || !top.is_finite() {
        return Err("offsets must be finite".to_string());
    }
    Ok(CanvasOffset::new(left, top))
}

pub fn parse_gpu_power(value: &str) -> Result<GpuPowerPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "high" | "high-performance" | "performance" => Ok(GpuPowerPreference::High),
        "low" | "low-power" | "battery" => Ok(GpuPowerPreference::Low),
        other => Err(format!("unknown GPU power preference '{other}' (expected high or low)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1280x720"), Ok(Resolution::new(1280, 720)));
        assert_eq!(parse_size(" 640 X 480 "), Ok(Resolution::new(640, 480)));
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("1280").is_err());
        assert!(parse_size("widexhigh").is_err());
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_offset("0,40"), Ok(CanvasOffset::new(0.0, 40.0)));
        assert_eq!(parse_offset(" 12.5 , -3 "), Ok(CanvasOffset::new(12.5, -3.0)));
        assert!(parse_offset("12").is_err());
        assert!(parse_offset("a,b").is_err());
        assert!(parse_offset("inf,0").is_err());
    }

    #[test]
    fn parses_gpu_power() {
        assert_eq!(parse_gpu_power("LOW"), Ok(GpuPowerPreference::Low));
        assert_eq!(parse_gpu_power("high"), Ok(GpuPowerPreference::High));
        assert!(parse_gpu_power("medium").is_err());
    }

    #[test]
    fn vertex_and_fragment_go_together() {
        let err = Cli::try_parse_from(["glslcanvas", "--vertex", "v.glsl"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "glslcanvas",
            "--vertex",
            "v.glsl",
            "--fragment",
            "f.glsl",
            "--size",
            "320x200",
        ])
        .unwrap();
        assert_eq!(cli.vertex, Some(PathBuf::from("v.glsl")));
        assert_eq!(cli.size, Some(Resolution::new(320, 200)));
    }

    #[test]
    fn page_conflicts_with_explicit_files() {
        let err = Cli::try_parse_from([
            "glslcanvas",
            "--page",
            "wak",
            "--vertex",
            "v.glsl",
            "--fragment",
            "f.glsl",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
