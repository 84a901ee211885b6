//! Framebuffer properties.
//!
//! The same type is used to request bitplanes from a buffer and to advertise what it actually
//! provides. A buffer only ever advertises what it can deliver; requests are normalized when the
//! buffer is opened and refined from the real bit depths after each rebuild.

use std::fmt;

use crate::backend::framebuffer::BitplaneSizes;
use crate::texture::{ComponentType, Format, Texture};

/// Bitplanes of a framebuffer.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameBufferProperties {
  /// Sum of the red, green and blue bits; `1` means “any color buffer”.
  pub color_bits: u32,
  pub red_bits: u32,
  pub green_bits: u32,
  pub blue_bits: u32,
  pub alpha_bits: u32,
  pub depth_bits: u32,
  pub stencil_bits: u32,
  pub float_color: bool,
  pub float_depth: bool,
  pub srgb_color: bool,
  pub rgb_color: bool,
  /// Auxiliary 8-bit RGBA planes.
  pub aux_rgba: u32,
  /// Auxiliary half-float RGBA planes.
  pub aux_hrgba: u32,
  /// Auxiliary float RGBA planes.
  pub aux_float: u32,
  pub multisamples: u32,
  pub coverage_samples: u32,
  pub back_buffers: u32,
  pub accum_bits: u32,
}

impl FrameBufferProperties {
  /// Maximum number of planes of each auxiliary kind.
  pub const MAX_AUX: u32 = 4;

  /// A plain RGBA8 + depth24 request.
  pub fn rgba_depth() -> Self {
    FrameBufferProperties {
      color_bits: 24,
      red_bits: 8,
      green_bits: 8,
      blue_bits: 8,
      alpha_bits: 8,
      depth_bits: 24,
      rgb_color: true,
      ..Default::default()
    }
  }

  pub fn set_rgba_bits(&mut self, red: u32, green: u32, blue: u32, alpha: u32) {
    self.red_bits = red;
    self.green_bits = green;
    self.blue_bits = blue;
    self.alpha_bits = alpha;
    self.color_bits = red + green + blue;
  }

  /// Total number of auxiliary planes.
  pub fn aux_count(&self) -> u32 {
    self.aux_rgba + self.aux_hrgba + self.aux_float
  }

  pub fn is_multisample(&self) -> bool {
    self.multisamples > 0
  }

  /// Refine color bits from what an attachment actually provides.
  pub(crate) fn update_color(&mut self, sizes: &BitplaneSizes) {
    self.set_rgba_bits(sizes.red, sizes.green, sizes.blue, sizes.alpha);
    self.float_color = sizes.float_color;
  }

  /// Refine depth bits from what an attachment actually provides.
  pub(crate) fn update_depth(&mut self, sizes: &BitplaneSizes) {
    self.depth_bits = sizes.depth;
    self.float_depth = sizes.float_depth;
  }

  /// Give a texture the format of the color plane.
  pub(crate) fn setup_color_texture(&self, tex: &Texture) {
    let (format, component_type) = if self.srgb_color {
      if self.alpha_bits > 0 {
        (Format::SrgbAlpha, ComponentType::UnsignedByte)
      } else {
        (Format::Srgb, ComponentType::UnsignedByte)
      }
    } else if self.float_color {
      if self.color_bits > 16 * 3 || self.alpha_bits > 16 {
        (Format::Rgba32, ComponentType::Float)
      } else {
        (Format::Rgba16, ComponentType::HalfFloat)
      }
    } else if self.color_bits > 8 * 3 || self.alpha_bits > 8 {
      (Format::Rgba16, ComponentType::UnsignedShort)
    } else if self.alpha_bits > 0 {
      (Format::Rgba8, ComponentType::UnsignedByte)
    } else {
      (Format::Rgb, ComponentType::UnsignedByte)
    };

    tex.set_format(format);
    tex.set_component_type(component_type);
  }

  /// Give a texture the format of the depth plane.
  pub(crate) fn setup_depth_texture(&self, tex: &Texture) {
    if self.float_depth {
      tex.set_format(Format::DepthComponent32);
      tex.set_component_type(ComponentType::Float);
      return;
    }

    let format = if self.depth_bits > 24 {
      Format::DepthComponent32
    } else if self.depth_bits > 16 {
      Format::DepthComponent24
    } else if self.depth_bits > 0 {
      Format::DepthComponent16
    } else {
      Format::DepthComponent
    };

    tex.set_format(format);
    tex.set_component_type(ComponentType::UnsignedInt);
  }
}

impl fmt::Display for FrameBufferProperties {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    write!(
      f,
      "color={} ({}/{}/{}) alpha={} depth={} stencil={}",
      self.color_bits,
      self.red_bits,
      self.green_bits,
      self.blue_bits,
      self.alpha_bits,
      self.depth_bits,
      self.stencil_bits
    )?;

    if self.float_color {
      f.write_str(" float-color")?;
    }

    if self.float_depth {
      f.write_str(" float-depth")?;
    }

    if self.srgb_color {
      f.write_str(" srgb")?;
    }

    if self.aux_count() > 0 {
      write!(
        f,
        " aux={}/{}/{}",
        self.aux_rgba, self.aux_hrgba, self.aux_float
      )?;
    }

    if self.multisamples > 0 {
      write!(f, " samples={}", self.multisamples)?;
    }

    if self.coverage_samples > 0 {
      write!(f, " coverage={}", self.coverage_samples)?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rgba_bits() {
    let mut props = FrameBufferProperties::default();
    props.set_rgba_bits(8, 8, 8, 0);

    assert_eq!(props.color_bits, 24);
    assert_eq!(props.alpha_bits, 0);
  }

  #[test]
  fn depth_texture_formats() {
    let tex = Texture::new_2d("depth", 4, 4);
    let mut props = FrameBufferProperties::default();

    props.depth_bits = 24;
    props.setup_depth_texture(&tex);
    assert_eq!(tex.format(), Format::DepthComponent24);

    props.float_depth = true;
    props.setup_depth_texture(&tex);
    assert_eq!(tex.format(), Format::DepthComponent32);
    assert_eq!(tex.component_type(), ComponentType::Float);
  }

  #[test]
  fn display() {
    let mut props = FrameBufferProperties::rgba_depth();
    props.aux_rgba = 2;

    assert_eq!(
      props.to_string(),
      "color=24 (8/8/8) alpha=8 depth=24 stencil=0 aux=2/0/0"
    );
  }
}
