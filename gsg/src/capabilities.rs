//! Capability flags and fixed limits of a rendering context.
//!
//! Capabilities are queried once, when the [`GraphicsStateGuardian`] is created, and are the only
//! source of truth for what the device can do. Every capability-gated branch in this crate asks
//! for them instead of querying the backend again.
//!
//! [`GraphicsStateGuardian`]: crate::gsg::GraphicsStateGuardian

use bitflags::bitflags;

bitflags! {
  /// Set of features a backend supports.
  #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
  pub struct Capabilities: u32 {
    /// Framebuffer objects (offscreen render targets).
    const FRAMEBUFFER_OBJECT = 1 << 0;
    /// Multisample renderbuffers.
    const FRAMEBUFFER_MULTISAMPLE = 1 << 1;
    /// Coverage-sampled multisample renderbuffers (vendor extension).
    const FRAMEBUFFER_MULTISAMPLE_COVERAGE = 1 << 2;
    /// Framebuffer-to-framebuffer blits.
    const FRAMEBUFFER_BLIT = 1 << 3;
    /// Packed depth-stencil formats.
    const DEPTH_STENCIL = 1 << 4;
    /// Framebuffers without any attachment.
    const EMPTY_FRAMEBUFFER = 1 << 5;
    /// Bindless texture handles.
    const BINDLESS_TEXTURE = 1 << 6;
    /// Compute shaders.
    const COMPUTE_SHADERS = 1 << 7;
    /// Tessellation shaders.
    const TESSELLATION_SHADERS = 1 << 8;
    /// Geometry shaders.
    const GEOMETRY_SHADERS = 1 << 9;
    /// Image load / store units.
    const IMAGE_LOAD_STORE = 1 << 10;
    /// Sampler objects.
    const SAMPLER_OBJECTS = 1 << 11;
    /// Double-precision uniforms.
    const DOUBLE_UNIFORMS = 1 << 12;
    /// Hardware mipmap generation.
    const GENERATE_MIPMAP = 1 << 13;
    /// Vertex array objects.
    const VERTEX_ARRAY_OBJECT = 1 << 14;
    /// sRGB-encoded framebuffers.
    const SRGB_FRAMEBUFFER = 1 << 15;
    /// Per-attachment clears.
    const CLEAR_BUFFER = 1 << 16;
    /// Legacy fixed-function vertex arrays.
    const LEGACY_VERTEX_ARRAYS = 1 << 17;
    /// Multisampled rendering has been enabled on at least one buffer.
    const MULTISAMPLE = 1 << 18;
  }
}

/// Fixed limits of a rendering context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Limits {
  pub max_texture_units: u32,
  pub max_image_units: u32,
  pub max_fb_samples: u32,
  pub max_color_targets: u32,
  pub max_texture_size: u32,
  pub max_vertex_attribs: u32,
}

impl Default for Limits {
  fn default() -> Self {
    Limits {
      max_texture_units: 16,
      max_image_units: 0,
      max_fb_samples: 0,
      max_color_targets: 1,
      max_texture_size: 2048,
      max_vertex_attribs: 16,
    }
  }
}

/// Information about the driver behind a backend.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DriverInfo {
  pub vendor: String,
  pub renderer: String,
  pub version: String,
  pub shading_language_version: String,
}
