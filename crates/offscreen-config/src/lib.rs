//! Offscreen views configuration
//!
//! Loads settings from `offscreen.toml`, with environment variables layered
//! on top for quick overrides while embedding.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "offscreen.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OffscreenConfig {
    /// Defaults used by the view factory
    pub view: ViewConfig,
    /// Render target settings
    pub render: RenderConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Default parameters for newly created views
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// View type tag (e.g. "OffscreenWebView")
    pub class_name: String,
    /// Object name handed to the widget toolkit
    pub object_name: String,
    /// Consumer texture id
    pub texture_id: u32,
    /// Initial texture width in pixels
    pub texture_width: u32,
    /// Initial texture height in pixels
    pub texture_height: u32,
}

/// Render target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// RGBA color used when the widget has not been created yet
    pub fill_color: [u8; 4],
    /// Flip texture coordinates vertically (GL origin is bottom-left)
    pub flip_y: bool,
    /// Allocation granularity for the pixel buffer, in pixels
    pub size_granularity: u32,
    /// Largest width or height a surface may be locked with
    pub max_texture_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// env_logger filter string (e.g. "offscreen_view=debug")
    pub filter: Option<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            class_name: "OffscreenWebView".to_string(),
            object_name: "MyWebView".to_string(),
            texture_id: 0,
            texture_width: 512,
            texture_height: 512,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fill_color: [255, 255, 255, 255],
            flip_y: true,
            size_granularity: 1,
            max_texture_size: 8192,
        }
    }
}

impl OffscreenConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the offscreen.toml configuration file
    ///
    /// # Returns
    /// * `Ok(OffscreenConfig)` - Successfully loaded configuration
    /// * `Err(String)` - Error message if loading failed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Load configuration from `offscreen.toml` in the current directory
    /// or return default configuration if the file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file(CONFIG_FILE_NAME).unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(class_name) = std::env::var("OFFSCREEN_VIEW_CLASS") {
            self.view.class_name = class_name;
        }
        if let Ok(object_name) = std::env::var("OFFSCREEN_OBJECT_NAME") {
            self.view.object_name = object_name;
        }
        if let Ok(val) = std::env::var("OFFSCREEN_TEXTURE_WIDTH") {
            if let Ok(width) = val.parse::<u32>() {
                self.view.texture_width = width;
            }
        }
        if let Ok(val) = std::env::var("OFFSCREEN_TEXTURE_HEIGHT") {
            if let Ok(height) = val.parse::<u32>() {
                self.view.texture_height = height;
            }
        }

        if let Ok(val) = std::env::var("OFFSCREEN_FILL_COLOR") {
            if let Some(color) = parse_hex_color(&val) {
                self.render.fill_color = color;
            }
        }
        if let Ok(val) = std::env::var("OFFSCREEN_FLIP_Y") {
            self.render.flip_y = val == "1" || val.eq_ignore_ascii_case("true");
        }

        if let Ok(filter) = std::env::var("OFFSCREEN_LOG") {
            self.logging.filter = Some(filter);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from offscreen.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

/// Parse `#rrggbb` or `#rrggbbaa` (leading `#` optional) into RGBA bytes.
pub fn parse_hex_color(value: &str) -> Option<[u8; 4]> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok();
    let alpha = if hex.len() == 8 { channel(3)? } else { 255 };
    Some([channel(0)?, channel(1)?, channel(2)?, alpha])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = OffscreenConfig::default();
        assert_eq!(config.view.class_name, "OffscreenWebView");
        assert_eq!(config.view.object_name, "MyWebView");
        assert_eq!((config.view.texture_width, config.view.texture_height), (512, 512));
        assert_eq!(config.render.fill_color, [255, 255, 255, 255]);
        assert!(config.render.flip_y);
    }

    #[test]
    fn test_toml_serialization() {
        let config = OffscreenConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: OffscreenConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.view.texture_width, 512);
        assert_eq!(parsed.render.max_texture_size, 8192);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[view]\nclass_name = \"OffscreenView\"\ntexture_width = 800\n\n[render]\nflip_y = false"
        )
        .unwrap();

        let config = OffscreenConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.view.class_name, "OffscreenView");
        assert_eq!(config.view.texture_width, 800);
        // Unspecified keys keep their defaults.
        assert_eq!(config.view.texture_height, 512);
        assert!(!config.render.flip_y);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = OffscreenConfig::load_from_file("/nonexistent/offscreen.toml").unwrap_err();
        assert!(err.starts_with("Failed to read config file"));
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("OFFSCREEN_VIEW_CLASS", "OffscreenView");
            std::env::set_var("OFFSCREEN_TEXTURE_HEIGHT", "600");
            std::env::set_var("OFFSCREEN_FILL_COLOR", "#00000080");
        }

        let mut config = OffscreenConfig::default();
        config.merge_with_env();

        assert_eq!(config.view.class_name, "OffscreenView");
        assert_eq!(config.view.texture_height, 600);
        assert_eq!(config.render.fill_color, [0, 0, 0, 0x80]);

        unsafe {
            std::env::remove_var("OFFSCREEN_VIEW_CLASS");
            std::env::remove_var("OFFSCREEN_TEXTURE_HEIGHT");
            std::env::remove_var("OFFSCREEN_FILL_COLOR");
        }
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ffffff"), Some([255, 255, 255, 255]));
        assert_eq!(parse_hex_color("102030ff"), Some([0x10, 0x20, 0x30, 0xff]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gggggg"), None);
    }
}
