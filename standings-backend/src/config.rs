use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use standings_common::{LabelSet, LayoutVariant};

use crate::module::renderer::{StandingsRenderer, Theme};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingsConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub labels: LabelConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Initial label values for a new session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_subtitle")]
    pub subtitle: String,
    #[serde(default = "default_period_label")]
    pub period_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub variant: LayoutVariant,

    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Extra font files to load on top of the system fonts
    #[serde(default = "default_fonts_dir")]
    pub fonts_dir: String,

    #[serde(default = "default_footer_text")]
    pub footer_text: String,

    #[serde(default)]
    pub theme: Theme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Upscale factor applied when rasterizing
    #[serde(default = "default_scale")]
    pub scale: f32,

    /// JPEG quality, 1-100
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Fill colour behind the card
    #[serde(default = "default_background")]
    pub background: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_title() -> String {
    LabelSet::DEFAULT_TITLE.to_string()
}

fn default_subtitle() -> String {
    LabelSet::DEFAULT_SUBTITLE.to_string()
}

fn default_period_label() -> String {
    LabelSet::DEFAULT_PERIOD_LABEL.to_string()
}

fn default_font_family() -> String {
    "Consolas".to_string()
}

fn default_fonts_dir() -> String {
    "fonts".to_string()
}

fn default_footer_text() -> String {
    StandingsRenderer::DEFAULT_FOOTER.to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_scale() -> f32 {
    2.0
}

fn default_quality() -> u8 {
    95
}

fn default_background() -> String {
    "#f5f5f5".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3030
}

fn default_enable_cors() -> bool {
    false
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: default_subtitle(),
            period_label: default_period_label(),
        }
    }
}

impl LabelConfig {
    pub fn to_label_set(&self) -> LabelSet {
        LabelSet::new(&self.title, &self.subtitle, &self.period_label)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            variant: LayoutVariant::default(),
            font_family: default_font_family(),
            fonts_dir: default_fonts_dir(),
            footer_text: default_footer_text(),
            theme: Theme::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            scale: default_scale(),
            quality: default_quality(),
            background: default_background(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl Default for StandingsConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            labels: LabelConfig::default(),
            render: RenderConfig::default(),
            export: ExportConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl StandingsConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: StandingsConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            // Logging is not initialized yet at this point
            eprintln!("Config file {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub static CONFIG: OnceLock<StandingsConfig> = OnceLock::new();

/// Load the configuration once for the whole process.
pub fn read_config(path: impl AsRef<Path>) -> anyhow::Result<&'static StandingsConfig> {
    let config = StandingsConfig::load_or_default(path)?;
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_export_contract() {
        let config = StandingsConfig::default();
        assert_eq!(config.export.scale, 2.0);
        assert_eq!(config.export.quality, 95);
        assert_eq!(config.export.background, "#f5f5f5");
        assert_eq!(config.labels.to_label_set(), LabelSet::default());
        assert_eq!(config.render.variant, LayoutVariant::SingleColumn);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r##"
log_level = "debug"

[labels]
title = "PMCO"

[render]
variant = "two-column"

[render.theme]
accent = "#00FFAA"

[export]
quality = 80
"##,
        )
        .unwrap();

        let config = StandingsConfig::from_file(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.labels.title, "PMCO");
        assert_eq!(config.labels.subtitle, "Season 1");
        assert_eq!(config.render.variant, LayoutVariant::TwoColumn);
        assert_eq!(config.render.theme.accent, "#00FFAA");
        assert_eq!(config.render.theme.row_dark, Theme::default().row_dark);
        assert_eq!(config.export.quality, 80);
        assert_eq!(config.export.scale, 2.0);
        assert_eq!(config.server_address(), "127.0.0.1:3030");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StandingsConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = [").unwrap();
        assert!(StandingsConfig::from_file(&path).is_err());
    }
}
