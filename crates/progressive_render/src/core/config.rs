//! # Renderer Configuration
//!
//! Serializable settings for the progressive renderer. Every struct here
//! implements [`Config`], so a whole setup can be loaded from `.toml` or
//! `.ron` and validated before a renderer is built from it.
//!
//! Missing fields fall back to their defaults, which lets a file override
//! only the values it cares about.

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};

/// What the renderer draws each sub-frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Ray-marched volume cuboid, single sample per pixel
    Cuboid,
    /// Ray-marched volume cuboid with jittered multi-frame accumulation
    AccumulatedCuboid,
    /// Polygonal scene graph traversal with multi-frame accumulation
    SceneGraph,
}

impl RenderMode {
    /// Whether sub-frames are folded into the accumulation stage
    pub fn accumulates(self) -> bool {
        !matches!(self, Self::Cuboid)
    }
}

/// Storage precision of intermediate and accumulation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePrecision {
    /// 8 bits per channel, normalized
    #[default]
    Byte,
    /// 16-bit float per channel
    Half,
    /// 32-bit float per channel
    Float,
}

/// Initial camera placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Eye position in world space
    pub eye: [f32; 3],
    /// Look-at target in world space
    pub center: [f32; 3],
    /// Up direction
    pub up: [f32; 3],
    /// Vertical field of view in degrees
    pub fovy_degrees: f32,
    /// Near clipping plane distance
    pub near: f32,
    /// Far clipping plane distance
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, 2.0],
            center: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fovy_degrees: 45.0,
            near: 0.1,
            far: 10.0,
        }
    }
}

impl Config for CameraConfig {}

/// Parameters of the volume cuboid pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Edge lengths of the cuboid the volume is mapped onto
    pub extent: [f32; 3],
    /// Voxel dimensions of the streamed volume
    pub dimensions: [i32; 3],
    /// Ray-marching step scale
    pub dt_scale: f32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            extent: [2.0, 2.0, 2.0],
            dimensions: [64, 64, 64],
            dt_scale: 0.2,
        }
    }
}

impl Config for VolumeConfig {}

/// Top-level renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// What is drawn each sub-frame
    pub render_mode: RenderMode,
    /// Resolution of the intermediate and accumulation targets
    pub frame_size: (u32, u32),
    /// Resolution of the display target
    pub canvas_size: (u32, u32),
    /// Number of jittered sub-frames accumulated per image
    pub multi_frame_number: u32,
    /// Display clear color (RGBA)
    pub clear_color: [f32; 4],
    /// Storage precision of intermediate targets
    pub frame_precision: FramePrecision,
    /// Initial camera
    pub camera: CameraConfig,
    /// Volume pass parameters
    pub volume: VolumeConfig,
    /// Default log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::AccumulatedCuboid,
            frame_size: (800, 600),
            canvas_size: (800, 600),
            multi_frame_number: 64,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            frame_precision: FramePrecision::Byte,
            camera: CameraConfig::default(),
            volume: VolumeConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config for RendererConfig {}

impl RendererConfig {
    /// Set the render mode
    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// Set frame and canvas size together
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self.canvas_size = (width, height);
        self
    }

    /// Set the number of accumulated sub-frames
    pub fn with_multi_frame_number(mut self, count: u32) -> Self {
        self.multi_frame_number = count;
        self
    }

    /// Set the frame precision
    pub fn with_frame_precision(mut self, precision: FramePrecision) -> Self {
        self.frame_precision = precision;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg.to_string())) };

        if self.frame_size.0 == 0 || self.frame_size.1 == 0 {
            return invalid("frame size must be non-zero in both dimensions");
        }
        if self.canvas_size.0 == 0 || self.canvas_size.1 == 0 {
            return invalid("canvas size must be non-zero in both dimensions");
        }
        if self.multi_frame_number == 0 {
            return invalid("multi-frame number must be at least 1");
        }
        if self.clear_color.iter().any(|c| !c.is_finite() || !(0.0..=1.0).contains(c)) {
            return invalid("clear color channels must be finite and within [0, 1]");
        }

        let camera = &self.camera;
        if !(camera.near > 0.0 && camera.far > camera.near) {
            return invalid("camera clip planes must satisfy 0 < near < far");
        }
        if !(camera.fovy_degrees > 0.0 && camera.fovy_degrees < 180.0) {
            return invalid("camera field of view must be within (0, 180) degrees");
        }

        if self.volume.dimensions.iter().any(|d| *d <= 0) {
            return invalid("volume dimensions must be positive");
        }
        if self.volume.dt_scale <= 0.0 {
            return invalid("volume step scale must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RendererConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_multi_frame_number_rejected() {
        let config = RendererConfig::default().with_multi_frame_number(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_inverted_clip_planes_rejected() {
        let mut config = RendererConfig::default();
        config.camera.near = 5.0;
        config.camera.far = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: RendererConfig = toml::from_str(
            r#"
            render_mode = "scene_graph"
            multi_frame_number = 16

            [camera]
            eye = [1.0, 2.0, 3.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.render_mode, RenderMode::SceneGraph);
        assert_eq!(config.multi_frame_number, 16);
        assert_eq!(config.frame_size, (800, 600));
        assert_eq!(config.camera.eye, [1.0, 2.0, 3.0]);
        assert_eq!(config.camera.far, 10.0);
    }

    #[test]
    fn test_ron_roundtrip_through_file() {
        let path = std::env::temp_dir().join(format!("progressive_render_cfg_{}.ron", std::process::id()));
        let config = RendererConfig::default()
            .with_render_mode(RenderMode::Cuboid)
            .with_size(320, 200);

        config.save_to_file(&path).unwrap();
        let loaded = RendererConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = RendererConfig::load_from_file("settings.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
