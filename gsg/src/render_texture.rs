//! Render-to-texture requests.

use crate::backend::framebuffer::Attachment;
use crate::texture::Texture;

/// Number of bitplane slots of a buffer.
pub const RTP_COUNT: usize = 16;

/// Bitplane a texture is rendered into.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum RenderTexturePlane {
  DepthStencil,
  Color,
  AuxRgba(u8),
  AuxHrgba(u8),
  AuxFloat(u8),
  Depth,
}

impl RenderTexturePlane {
  /// Slot of the plane in a buffer's bitplane table.
  pub fn index(self) -> usize {
    match self {
      RenderTexturePlane::DepthStencil => 0,
      RenderTexturePlane::Color => 1,
      RenderTexturePlane::AuxRgba(i) => 2 + (i as usize).min(3),
      RenderTexturePlane::AuxHrgba(i) => 6 + (i as usize).min(3),
      RenderTexturePlane::AuxFloat(i) => 10 + (i as usize).min(3),
      RenderTexturePlane::Depth => 14,
    }
  }

  /// Plane stored at `index`, if any. Slot 15 is reserved.
  pub fn from_index(index: usize) -> Option<Self> {
    match index {
      0 => Some(RenderTexturePlane::DepthStencil),
      1 => Some(RenderTexturePlane::Color),
      2..=5 => Some(RenderTexturePlane::AuxRgba(index as u8 - 2)),
      6..=9 => Some(RenderTexturePlane::AuxHrgba(index as u8 - 6)),
      10..=13 => Some(RenderTexturePlane::AuxFloat(index as u8 - 10)),
      14 => Some(RenderTexturePlane::Depth),
      _ => None,
    }
  }

  pub fn is_depth(self) -> bool {
    matches!(
      self,
      RenderTexturePlane::Depth | RenderTexturePlane::DepthStencil
    )
  }

  pub fn is_aux(self) -> bool {
    matches!(
      self,
      RenderTexturePlane::AuxRgba(_)
        | RenderTexturePlane::AuxHrgba(_)
        | RenderTexturePlane::AuxFloat(_)
    )
  }

  /// Attachment a depth plane goes to. Color planes get their attachment at rebuild time.
  pub(crate) fn depth_attachment(self) -> Option<Attachment> {
    match self {
      RenderTexturePlane::DepthStencil => Some(Attachment::DepthStencil),
      RenderTexturePlane::Depth => Some(Attachment::Depth),
      _ => None,
    }
  }
}

/// How a texture receives a buffer's contents.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RenderTextureMode {
  /// Attach the texture to the framebuffer, or copy if it cannot be attached.
  BindOrCopy,
  /// Copy the plane into the texture after each frame.
  CopyTexture,
}

/// A texture a buffer renders into.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderTexture {
  pub texture: Texture,
  pub plane: RenderTexturePlane,
  pub mode: RenderTextureMode,
}

impl RenderTexture {
  pub fn new(texture: Texture, plane: RenderTexturePlane, mode: RenderTextureMode) -> Self {
    RenderTexture {
      texture,
      plane,
      mode,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plane_indices() {
    for index in 0..RTP_COUNT - 1 {
      let plane = RenderTexturePlane::from_index(index).unwrap();
      assert_eq!(plane.index(), index);
    }

    assert_eq!(RenderTexturePlane::from_index(RTP_COUNT - 1), None);
    assert_eq!(RenderTexturePlane::AuxFloat(3).index(), 13);
  }
}
