//! Render configuration.
//!
//! A [`RenderConfig`] is built once at startup and handed by value to the
//! [`GraphicsStateGuardian`](crate::gsg::GraphicsStateGuardian). Nothing in the hot path reads
//! configuration from anywhere else.

use std::env;
use std::str::FromStr;

/// How textures whose size is not a power of two are handled.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AutoTextureScale {
  /// Sizes are used as-is.
  None,
  /// Scale down to the previous power of two.
  Down,
  /// Scale (or pad) up to the next power of two.
  Up,
}

impl FromStr for AutoTextureScale {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "none" | "0" | "false" => Ok(AutoTextureScale::None),
      "down" => Ok(AutoTextureScale::Down),
      "up" | "1" | "true" => Ok(AutoTextureScale::Up),
      other => Err(format!("unknown texture scale: {}", other)),
    }
  }
}

/// Immutable render configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderConfig {
  /// Minimum number of requested samples before a buffer gets a multisample framebuffer.
  pub multisample_usage_hint: u32,
  /// Allow bindless texture handles when the backend supports them.
  pub use_bindless_textures: bool,
  /// Issue memory barriers for textures written by image stores.
  pub enable_memory_barriers: bool,
  /// Combine depth and stencil into a single packed plane whenever possible.
  pub prefer_depth_stencil: bool,
  /// Number of driver errors reported before error checking is suppressed.
  pub max_errors_reported: usize,
  /// Log the reflected layout of every linked shader program.
  pub dump_shader_binaries: bool,
  /// Power-of-two policy of the texture system.
  pub textures_power_2: AutoTextureScale,
  /// Never generate mipmaps.
  pub ignore_mipmaps: bool,
  /// Generate mipmaps for every texture.
  pub force_mipmaps: bool,
  /// Always give offscreen buffers a color plane.
  pub force_fbo_color: bool,
  /// Budget of resident texture and buffer memory, in bytes.
  pub graphics_memory_limit: Option<usize>,
}

impl Default for RenderConfig {
  fn default() -> Self {
    RenderConfig {
      multisample_usage_hint: 1,
      use_bindless_textures: false,
      enable_memory_barriers: true,
      prefer_depth_stencil: true,
      max_errors_reported: 20,
      dump_shader_binaries: false,
      textures_power_2: AutoTextureScale::None,
      ignore_mipmaps: false,
      force_mipmaps: false,
      force_fbo_color: true,
      graphics_memory_limit: None,
    }
  }
}

impl RenderConfig {
  /// Build a configuration from `GSG_*` environment variables, falling back to defaults.
  ///
  /// Malformed values are logged and ignored.
  pub fn from_env() -> Self {
    let mut config = RenderConfig::default();

    read_var("GSG_MULTISAMPLE_USAGE_HINT", &mut config.multisample_usage_hint);
    read_var("GSG_USE_BINDLESS_TEXTURES", &mut config.use_bindless_textures);
    read_var("GSG_ENABLE_MEMORY_BARRIERS", &mut config.enable_memory_barriers);
    read_var("GSG_PREFER_DEPTH_STENCIL", &mut config.prefer_depth_stencil);
    read_var("GSG_MAX_ERRORS_REPORTED", &mut config.max_errors_reported);
    read_var("GSG_DUMP_SHADER_BINARIES", &mut config.dump_shader_binaries);
    read_var("GSG_TEXTURES_POWER_2", &mut config.textures_power_2);
    read_var("GSG_IGNORE_MIPMAPS", &mut config.ignore_mipmaps);
    read_var("GSG_FORCE_MIPMAPS", &mut config.force_mipmaps);
    read_var("GSG_FORCE_FBO_COLOR", &mut config.force_fbo_color);

    if let Ok(limit) = env::var("GSG_GRAPHICS_MEMORY_LIMIT") {
      match limit.trim().parse::<usize>() {
        Ok(0) => config.graphics_memory_limit = None,
        Ok(bytes) => config.graphics_memory_limit = Some(bytes),
        Err(e) => log::warn!("ignoring GSG_GRAPHICS_MEMORY_LIMIT={}: {}", limit, e),
      }
    }

    config
  }

  pub fn with_multisample_usage_hint(self, multisample_usage_hint: u32) -> Self {
    RenderConfig {
      multisample_usage_hint,
      ..self
    }
  }

  pub fn with_bindless_textures(self, use_bindless_textures: bool) -> Self {
    RenderConfig {
      use_bindless_textures,
      ..self
    }
  }

  pub fn with_memory_barriers(self, enable_memory_barriers: bool) -> Self {
    RenderConfig {
      enable_memory_barriers,
      ..self
    }
  }

  pub fn with_prefer_depth_stencil(self, prefer_depth_stencil: bool) -> Self {
    RenderConfig {
      prefer_depth_stencil,
      ..self
    }
  }

  pub fn with_max_errors_reported(self, max_errors_reported: usize) -> Self {
    RenderConfig {
      max_errors_reported,
      ..self
    }
  }

  pub fn with_dump_shader_binaries(self, dump_shader_binaries: bool) -> Self {
    RenderConfig {
      dump_shader_binaries,
      ..self
    }
  }

  pub fn with_textures_power_2(self, textures_power_2: AutoTextureScale) -> Self {
    RenderConfig {
      textures_power_2,
      ..self
    }
  }

  pub fn with_force_fbo_color(self, force_fbo_color: bool) -> Self {
    RenderConfig {
      force_fbo_color,
      ..self
    }
  }

  pub fn with_ignore_mipmaps(self, ignore_mipmaps: bool) -> Self {
    RenderConfig {
      ignore_mipmaps,
      ..self
    }
  }

  pub fn with_force_mipmaps(self, force_mipmaps: bool) -> Self {
    RenderConfig {
      force_mipmaps,
      ..self
    }
  }

  pub fn with_graphics_memory_limit(self, graphics_memory_limit: Option<usize>) -> Self {
    RenderConfig {
      graphics_memory_limit,
      ..self
    }
  }
}

fn read_var<T>(key: &str, slot: &mut T)
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  if let Ok(value) = env::var(key) {
    match parse_value::<T>(&value) {
      Ok(parsed) => *slot = parsed,
      Err(e) => log::warn!("ignoring {}={}: {}", key, value, e),
    }
  }
}

fn parse_value<T>(value: &str) -> Result<T, String>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  let value = value.trim();

  // accept the usual boolean spellings for flags
  let normalized = match value.to_ascii_lowercase().as_str() {
    "1" | "yes" | "on" | "#t" => "true".to_owned(),
    "0" | "no" | "off" | "#f" => "false".to_owned(),
    _ => value.to_owned(),
  };

  normalized
    .parse::<T>()
    .or_else(|_| value.parse::<T>())
    .map_err(|e| e.to_string())
}
