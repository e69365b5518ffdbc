use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::geometry::Rect;

pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stratum")
        .join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: LayoutSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    Cascade,
    Tile,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    #[serde(default)]
    pub default_mode: LayoutMode,
    #[serde(default)]
    pub floating: FloatingSettings,
    #[serde(default)]
    pub split: SplitSettings,
    #[serde(default)]
    pub tile: TileSettings,
    /// Rect given to placeholder windows, in pixels.
    #[serde(default = "default_place_holder_rect")]
    pub place_holder_rect: Rect,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            default_mode: LayoutMode::default(),
            floating: FloatingSettings::default(),
            split: SplitSettings::default(),
            tile: TileSettings::default(),
            place_holder_rect: default_place_holder_rect(),
        }
    }
}

/// Floating window geometry. Lengths are virtual pixels, scaled by each
/// display's pixel ratio at layout time.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct FloatingSettings {
    /// Fraction of the display size used for the default cascade rect.
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f32,
    #[serde(default = "default_title_bar_height")]
    pub title_bar_height: u32,
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_corner_width")]
    pub frame_corner_width: u32,
    #[serde(default = "default_hot_zone")]
    pub hot_zone: u32,
    #[serde(default = "default_min_vertical_floating_width")]
    pub min_vertical_floating_width: u32,
    #[serde(default = "default_min_vertical_floating_height")]
    pub min_vertical_floating_height: u32,
    #[serde(default = "default_max_floating_size")]
    pub max_floating_size: u32,
    /// Replaces the computed default cascade rect when set.
    #[serde(default)]
    pub default_float_rect: Option<Rect>,
    /// Windows whose initial bottom edge lands below this line are moved to
    /// the top of the limit rect.
    #[serde(default)]
    pub floating_bottom_pos_y: Option<u32>,
    #[serde(default = "yes")]
    pub decoration_enabled: bool,
}

impl Default for FloatingSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: default_aspect_ratio(),
            title_bar_height: default_title_bar_height(),
            frame_width: default_frame_width(),
            frame_corner_width: default_frame_corner_width(),
            hot_zone: default_hot_zone(),
            min_vertical_floating_width: default_min_vertical_floating_width(),
            min_vertical_floating_height: default_min_vertical_floating_height(),
            max_floating_size: default_max_floating_size(),
            default_float_rect: None,
            floating_bottom_pos_y: None,
            decoration_enabled: yes(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SplitSettings {
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f32,
    #[serde(default = "default_divider_width")]
    pub divider_width: u32,
    #[serde(default = "default_min_vertical_split_height")]
    pub min_vertical_split_height: u32,
    #[serde(default = "default_min_horizontal_split_width")]
    pub min_horizontal_split_width: u32,
    /// Extra ratios the divider snaps to when a drag ends.
    #[serde(default)]
    pub split_ratio_points: Vec<f32>,
    /// Divider ratios beyond which split mode is exited, `[low, high]`.
    #[serde(default)]
    pub exit_split_ratios: Option<[f32; 2]>,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            split_ratio: default_split_ratio(),
            divider_width: default_divider_width(),
            min_vertical_split_height: default_min_vertical_split_height(),
            min_horizontal_split_width: default_min_horizontal_split_width(),
            split_ratio_points: Vec::new(),
            exit_split_ratios: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct TileSettings {
    #[serde(default = "default_tile_edge_interval")]
    pub edge_interval: u32,
    #[serde(default = "default_tile_mid_interval")]
    pub mid_interval: u32,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            edge_interval: default_tile_edge_interval(),
            mid_interval: default_tile_mid_interval(),
        }
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.floating.validate());

        issues.extend(self.split.validate());

        if self.place_holder_rect.is_degenerate() {
            issues.push(format!(
                "place_holder_rect must have a non-zero size, got {}",
                self.place_holder_rect
            ));
        }

        issues
    }
}

impl FloatingSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(self.aspect_ratio > 0.0 && self.aspect_ratio <= 1.0) {
            issues.push(format!(
                "floating.aspect_ratio must be in (0, 1], got {}",
                self.aspect_ratio
            ));
        }

        if self.title_bar_height == 0 {
            issues.push("floating.title_bar_height must be positive".to_string());
        }

        if self.min_vertical_floating_width > self.max_floating_size
            || self.min_vertical_floating_height > self.max_floating_size
        {
            issues.push(format!(
                "floating minimum size {}x{} exceeds max_floating_size {}",
                self.min_vertical_floating_width,
                self.min_vertical_floating_height,
                self.max_floating_size
            ));
        }

        if let Some(rect) = self.default_float_rect
            && rect.is_degenerate()
        {
            issues.push(format!("floating.default_float_rect must not be degenerate, got {rect}"));
        }

        issues
    }
}

impl SplitSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            issues.push(format!("split.split_ratio must be in (0, 1), got {}", self.split_ratio));
        }

        for point in &self.split_ratio_points {
            if !(*point > 0.0 && *point < 1.0) {
                issues.push(format!("split.split_ratio_points entry {point} is outside (0, 1)"));
            }
        }

        if let Some([low, high]) = self.exit_split_ratios
            && !(0.0 < low && low < high && high < 1.0)
        {
            issues.push(format!(
                "split.exit_split_ratios must satisfy 0 < low < high < 1, got [{low}, {high}]"
            ));
        }

        if self.divider_width == 0 {
            issues.push("split.divider_width must be positive".to_string());
        }

        issues
    }
}

fn yes() -> bool { true }

fn default_aspect_ratio() -> f32 { 0.66 }

fn default_title_bar_height() -> u32 { 37 }

fn default_frame_width() -> u32 { 5 }

fn default_frame_corner_width() -> u32 { 16 }

fn default_hot_zone() -> u32 { 20 }

fn default_min_vertical_floating_width() -> u32 { 240 }

fn default_min_vertical_floating_height() -> u32 { 320 }

fn default_max_floating_size() -> u32 { 2560 }

fn default_split_ratio() -> f32 { 0.5 }

fn default_divider_width() -> u32 { 8 }

fn default_min_vertical_split_height() -> u32 { 240 }

fn default_min_horizontal_split_width() -> u32 { 320 }

fn default_tile_edge_interval() -> u32 { 48 }

fn default_tile_mid_interval() -> u32 { 24 }

fn default_place_holder_rect() -> Rect { Rect::new(0, 0, 512, 512) }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Reads `path` if it exists, otherwise returns the defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Config::default()) }
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }
}
