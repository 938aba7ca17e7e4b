//! Configuration for the shell driver
//!
//! Loads settings from `config/vr_shell.json` or falls back to defaults if missing

use anyhow::{Context, Result};
use render_gl::{ContextPriority, DepthBufferPolicy, FramebufferDesc, SurfaceRequest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

/// Logging verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    /// Warnings and errors only
    Silent,
    /// Startup, shutdown and the per-second frame report (default)
    #[default]
    Summary,
    /// Summary + menu transitions and console traffic
    Normal,
    /// Everything, including per-frame event traces
    Verbose,
}

impl LogLevel {
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Silent => LevelFilter::WARN,
            LogLevel::Summary => LevelFilter::INFO,
            LogLevel::Normal => LevelFilter::DEBUG,
            LogLevel::Verbose => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl From<Priority> for ContextPriority {
    fn from(p: Priority) -> Self {
        match p {
            Priority::Low => ContextPriority::Low,
            Priority::Medium => ContextPriority::Medium,
            Priority::High => ContextPriority::High,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Surface and eye buffer settings
    pub graphics: GraphicsConfig,

    /// Shader program settings
    pub shader: ShaderConfig,

    /// Menu settings
    pub gui: GuiConfig,

    /// Frame loop settings
    pub run: RunConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// Requested GL ES major version; lower versions are tried on failure
    pub gles_version: i32,

    /// Context priority hint
    #[serde(default)]
    pub priority: Priority,

    /// Eye buffer width in pixels
    pub eye_width: i32,

    /// Eye buffer height in pixels
    pub eye_height: i32,

    /// MSAA sample count; 1 disables multisampling
    pub multisamples: i32,

    /// Keep the depth buffer after resolve
    pub resolve_depth: bool,

    /// Render both eyes in one pass
    pub use_multiview: bool,

    /// One depth buffer for the whole swap chain instead of one per image
    #[serde(default)]
    pub shared_depth_buffer: bool,

    /// Extension string reported by the headless device
    pub extensions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Minimum GLSL version for built programs
    pub glsl_version: u32,

    /// Panic instead of falling back to the empty program on build failure
    pub abort_on_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuiConfig {
    /// Menu fade-in and fade-out time in seconds
    pub fade_time: f32,

    /// Pulse swipe hints next to the carousel
    pub show_swipe_hints: bool,

    /// Touchpad travel that turns a touch into a swipe
    pub swipe_distance: f32,

    /// Distance of the menu in front of the viewer in meters
    pub menu_distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Display refresh rate
    pub hz: u32,

    /// Frames to run before shutting down
    pub frames: u64,

    /// Sleep to hold the refresh rate instead of running flat out
    pub paced: bool,

    /// Display pipeline depth in frames, for predicted display times
    pub prediction_frames: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            graphics: GraphicsConfig {
                gles_version: 3,
                priority: Priority::Medium,
                eye_width: 1024,
                eye_height: 1024,
                multisamples: 4,
                resolve_depth: false,
                use_multiview: false,
                shared_depth_buffer: false,
                extensions: "GL_EXT_multisampled_render_to_texture GL_EXT_texture_border_clamp".to_string(),
            },
            shader: ShaderConfig {
                glsl_version: 300,
                abort_on_error: false,
            },
            gui: GuiConfig {
                fade_time: 0.25,
                show_swipe_hints: true,
                swipe_distance: 0.3,
                menu_distance: 1.8,
            },
            run: RunConfig {
                hz: 72,
                frames: 480,
                paced: false,
                prediction_frames: 2.0,
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path, or use defaults if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("no config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
        let config: AppConfig =
            serde_json::from_str(&content).with_context(|| format!("parsing config file {}", path.display()))?;

        tracing::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        // Serialize with pretty printing
        let content = serde_json::to_string_pretty(self).context("serializing config")?;
        fs::write(path, content).with_context(|| format!("writing config file {}", path.display()))?;

        tracing::info!("saved configuration to {}", path.display());
        Ok(())
    }

    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        Path::new("config").join("vr_shell.json")
    }

    pub fn surface_request(&self) -> SurfaceRequest {
        SurfaceRequest {
            gles_version: self.graphics.gles_version,
            priority: self.graphics.priority.into(),
            ..SurfaceRequest::default()
        }
    }

    pub fn framebuffer_desc(&self) -> FramebufferDesc {
        let g = &self.graphics;
        FramebufferDesc {
            width: g.eye_width,
            height: g.eye_height,
            multisamples: g.multisamples,
            resolve_depth: g.resolve_depth,
            use_multiview: g.use_multiview,
            depth_policy: if g.shared_depth_buffer {
                DepthBufferPolicy::Shared
            } else {
                DepthBufferPolicy::SeparatePerIndex
            },
            ..FramebufferDesc::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("vr_shell_config_{}_{name}", std::process::id()))
            .join("vr_shell.json")
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.graphics.eye_width, 1024);
        assert_eq!(config.run.hz, 72);
        assert_eq!(config.logging.level, LogLevel::Summary);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from(&temp_path("missing")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("saved");
        let mut config = AppConfig::default();
        config.gui.fade_time = 0.5;
        config.graphics.priority = Priority::High;
        config.save_to(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"priority\": \"high\""));
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_parse_error_names_file() {
        let path = temp_path("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(format!("{err}").contains("parsing config file"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_optional_sections_default() {
        let json = serde_json::to_value(AppConfig::default()).unwrap();
        let mut obj = json.as_object().unwrap().clone();
        obj.remove("logging");
        let config: AppConfig = serde_json::from_value(serde_json::Value::Object(obj)).unwrap();
        assert_eq!(config.logging.level, LogLevel::Summary);
    }

    #[test]
    fn test_framebuffer_desc_maps_depth_policy() {
        let mut config = AppConfig::default();
        assert_eq!(config.framebuffer_desc().depth_policy, DepthBufferPolicy::SeparatePerIndex);
        config.graphics.shared_depth_buffer = true;
        let desc = config.framebuffer_desc();
        assert_eq!(desc.depth_policy, DepthBufferPolicy::Shared);
        assert_eq!(desc.multisamples, 4);
        assert_eq!(config.surface_request().priority, ContextPriority::Medium);
    }
}
