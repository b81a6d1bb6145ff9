//! Configuration management for fcover.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::colormaps::get_colormap;
use crate::error::{FcoverError, Result};
use crate::extract::DEFAULT_VARIABLE;

/// Command-line arguments for fcover
#[derive(Parser, Debug)]
#[command(name = "fcover")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the raster files (searched recursively)
    #[arg(short, long, env = "FCOVER_ROOT_DIR")]
    pub root_dir: Option<PathBuf>,

    /// GeoJSON file listing the named zones
    #[arg(short, long, env = "FCOVER_ZONES")]
    pub zones: Option<PathBuf>,

    /// Data variable to extract
    #[arg(short, long, env = "FCOVER_VARIABLE")]
    pub variable: Option<String>,

    /// Path to JSON configuration file
    #[arg(short, long, env = "FCOVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FCOVER_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do once the archive is indexed
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the available display dates
    Dates,
    /// List the zone names
    Zones,
    /// Extract the grid of a zone at a date
    Extract {
        /// Display date, e.g. 05-03-2023
        date: String,
        /// Zone name
        zone: String,
        /// Print the whole grid as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Render the grid of a zone at a date to a PNG file
    Plot {
        /// Display date, e.g. 05-03-2023
        date: String,
        /// Zone name
        zone: String,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        colormap: Option<String>,
        /// Pixels per grid cell
        #[arg(long)]
        scale: Option<u32>,
    },
    /// Pick dates and zones from stdin and re-render on every change
    Interactive {
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

/// Data source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root of the raster directory tree
    #[serde(default)]
    pub root_dir: Option<PathBuf>,

    /// GeoJSON zone catalog
    #[serde(default)]
    pub zone_catalog: Option<PathBuf>,

    /// Variable read from each raster file
    #[serde(default = "default_variable")]
    pub variable: String,
}

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Colormap name
    #[serde(default = "default_colormap")]
    pub colormap: String,

    /// Pixels per grid cell
    #[serde(default = "default_scale")]
    pub scale: u32,

    /// Where rendered images are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Render configuration
    #[serde(default)]
    pub render: RenderConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, Command)> {
        Self::from_args(Args::parse())
    }

    /// Build the configuration from already parsed arguments
    pub fn from_args(args: Args) -> Result<(Self, Command)> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if args.root_dir.is_some() {
            config.data.root_dir = args.root_dir;
        }
        if args.zones.is_some() {
            config.data.zone_catalog = args.zones;
        }
        if let Some(variable) = args.variable {
            config.data.variable = variable;
        }
        if let Some(log_level) = args.log_level {
            config.log_level = log_level;
        }

        match &args.command {
            Command::Plot {
                output_dir,
                colormap,
                scale,
                ..
            } => {
                if let Some(dir) = output_dir {
                    config.render.output_dir = dir.clone();
                }
                if let Some(colormap) = colormap {
                    config.render.colormap = colormap.clone();
                }
                if let Some(scale) = scale {
                    config.render.scale = *scale;
                }
            }
            Command::Interactive {
                output_dir: Some(dir),
            } => config.render.output_dir = dir.clone(),
            _ => {}
        }

        Ok((config, args.command))
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.data.root_dir.is_some() {
            self.data.root_dir = other.data.root_dir;
        }
        if other.data.zone_catalog.is_some() {
            self.data.zone_catalog = other.data.zone_catalog;
        }
        self.data.variable = other.data.variable;
        self.render = other.render;
        self.log_level = other.log_level;
    }

    /// Raster root, required by every command
    pub fn root_dir(&self) -> Result<&Path> {
        self.data.root_dir.as_deref().ok_or_else(|| FcoverError::Config {
            message: "No raster directory configured (use --root-dir or FCOVER_ROOT_DIR)"
                .to_string(),
        })
    }

    /// Zone catalog, required by every command
    pub fn zone_catalog(&self) -> Result<&Path> {
        self.data.zone_catalog.as_deref().ok_or_else(|| FcoverError::Config {
            message: "No zone catalog configured (use --zones or FCOVER_ZONES)".to_string(),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.root_dir()?;
        self.zone_catalog()?;

        if self.data.variable.trim().is_empty() {
            return Err(FcoverError::Config {
                message: "Variable name cannot be empty".to_string(),
            });
        }

        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(FcoverError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        if get_colormap(&self.render.colormap).is_err() {
            return Err(FcoverError::Config {
                message: format!("Unknown colormap: {}", self.render.colormap),
            });
        }

        if self.render.scale == 0 || self.render.scale > 64 {
            return Err(FcoverError::Config {
                message: format!(
                    "Invalid scale: {}. Must be between 1 and 64",
                    self.render.scale
                ),
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            render: RenderConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            zone_catalog: None,
            variable: default_variable(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            colormap: default_colormap(),
            scale: default_scale(),
            output_dir: default_output_dir(),
        }
    }
}

// Default value functions for serde
fn default_variable() -> String {
    DEFAULT_VARIABLE.to_string()
}

fn default_colormap() -> String {
    "yl_gn".to_string()
}

fn default_scale() -> u32 {
    4
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "info".to_string()
}
