//! Framebuffer backend interface.

use bitflags::bitflags;
use std::error;
use std::fmt;

use crate::backend::texture::TextureTarget;

/// Framebuffer binding point.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FramebufferTarget {
  Draw,
  Read,
  Both,
}

/// Attachment point of a framebuffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Attachment {
  Depth,
  Stencil,
  DepthStencil,
  Color(u32),
}

/// Internal format of a renderbuffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RenderbufferFormat {
  Depth16,
  Depth24,
  Depth32,
  Depth32F,
  Depth24Stencil8,
  Depth32FStencil8,
  Stencil8,
  R8,
  Rg8,
  Rgb8,
  Rgba8,
  Srgb8,
  Srgb8Alpha8,
  Rgb10A2,
  Rgba16,
  Rgb16F,
  Rgba16F,
  Rgb32F,
  Rgba32F,
}

impl RenderbufferFormat {
  /// Bytes taken by one sample.
  pub fn bytes_per_sample(self) -> usize {
    match self {
      RenderbufferFormat::Stencil8 | RenderbufferFormat::R8 => 1,
      RenderbufferFormat::Depth16 | RenderbufferFormat::Rg8 => 2,
      RenderbufferFormat::Rgb8 | RenderbufferFormat::Srgb8 => 3,
      RenderbufferFormat::Depth24
      | RenderbufferFormat::Depth32
      | RenderbufferFormat::Depth32F
      | RenderbufferFormat::Depth24Stencil8
      | RenderbufferFormat::Rgba8
      | RenderbufferFormat::Srgb8Alpha8
      | RenderbufferFormat::Rgb10A2 => 4,
      RenderbufferFormat::Rgb16F => 6,
      RenderbufferFormat::Depth32FStencil8
      | RenderbufferFormat::Rgba16
      | RenderbufferFormat::Rgba16F => 8,
      RenderbufferFormat::Rgb32F => 12,
      RenderbufferFormat::Rgba32F => 16,
    }
  }
}

/// Sample counts of a multisample renderbuffer.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Samples {
  /// Color / depth samples; `0` for a single-sample renderbuffer.
  pub samples: u32,
  /// Coverage samples (vendor extension); `0` when unused.
  pub coverage: u32,
}

/// Bit depths actually provided by an attachment.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct BitplaneSizes {
  pub red: u32,
  pub green: u32,
  pub blue: u32,
  pub alpha: u32,
  pub depth: u32,
  pub stencil: u32,
  /// Samples actually allocated.
  pub samples: u32,
  /// Whether color components are floating-point.
  pub float_color: bool,
  /// Whether the depth component is floating-point.
  pub float_depth: bool,
}

impl BitplaneSizes {
  pub fn color_bits(&self) -> u32 {
    self.red + self.green + self.blue
  }
}

bitflags! {
  /// Planes copied by a framebuffer blit or cleared by a clear.
  #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
  pub struct BlitMask: u32 {
    const COLOR = 1 << 0;
    const DEPTH = 1 << 1;
    const STENCIL = 1 << 2;
  }
}

/// Values used when clearing a framebuffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearValues {
  pub mask: BlitMask,
  pub color: [f32; 4],
  pub depth: f32,
  pub stencil: u32,
}

impl Default for ClearValues {
  fn default() -> Self {
    ClearValues {
      mask: BlitMask::all(),
      color: [0., 0., 0., 0.],
      depth: 1.,
      stencil: 0,
    }
  }
}

/// Framebuffer error.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FramebufferError {
  /// The backend has no framebuffer object support.
  Unsupported,
  /// Incomplete error.
  ///
  /// This happens when finalizing the construction of the framebuffer.
  Incomplete(IncompleteReason),
}

impl fmt::Display for FramebufferError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      FramebufferError::Unsupported => f.write_str("framebuffer objects unsupported"),
      FramebufferError::Incomplete(ref e) => write!(f, "incomplete framebuffer: {}", e),
    }
  }
}

impl From<IncompleteReason> for FramebufferError {
  fn from(e: IncompleteReason) -> Self {
    FramebufferError::Incomplete(e)
  }
}

impl error::Error for FramebufferError {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match self {
      FramebufferError::Unsupported => None,
      FramebufferError::Incomplete(e) => Some(e),
    }
  }
}

/// Reason a framebuffer is incomplete.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IncompleteReason {
  /// Incomplete framebuffer.
  Undefined,
  /// Incomplete attachment (color / depth).
  IncompleteAttachment,
  /// An attachment was missing.
  MissingAttachment,
  /// Incomplete draw buffer.
  IncompleteDrawBuffer,
  /// Incomplete read buffer.
  IncompleteReadBuffer,
  /// Unsupported combination of attachments.
  Unsupported,
  /// Inconsistent multisample attachments.
  IncompleteMultisample,
  /// Inconsistent layered attachments.
  IncompleteLayerTargets,
  /// Attachments of different sizes.
  IncompleteDimensions,
  /// Any status the backend does not know.
  Unknown(u32),
}

impl fmt::Display for IncompleteReason {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      IncompleteReason::Undefined => write!(f, "incomplete reason"),
      IncompleteReason::IncompleteAttachment => write!(f, "incomplete attachment"),
      IncompleteReason::MissingAttachment => write!(f, "missing attachment"),
      IncompleteReason::IncompleteDrawBuffer => write!(f, "incomplete draw buffer"),
      IncompleteReason::IncompleteReadBuffer => write!(f, "incomplete read buffer"),
      IncompleteReason::Unsupported => write!(f, "unsupported"),
      IncompleteReason::IncompleteMultisample => write!(f, "incomplete multisample"),
      IncompleteReason::IncompleteLayerTargets => write!(f, "incomplete layer targets"),
      IncompleteReason::IncompleteDimensions => write!(f, "incomplete dimensions"),
      IncompleteReason::Unknown(status) => write!(f, "unknown status 0x{:x}", status),
    }
  }
}

impl error::Error for IncompleteReason {}

pub unsafe trait FramebufferBackend {
  unsafe fn gen_framebuffer(&mut self) -> u32;

  unsafe fn delete_framebuffer(&mut self, framebuffer: u32);

  /// Bind `framebuffer` to `target`. `0` is the host's default framebuffer.
  unsafe fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: u32);

  unsafe fn gen_renderbuffer(&mut self) -> u32;

  unsafe fn delete_renderbuffer(&mut self, renderbuffer: u32);

  /// Allocate the storage of a renderbuffer and return what was actually allocated.
  unsafe fn renderbuffer_storage(
    &mut self,
    renderbuffer: u32,
    format: RenderbufferFormat,
    width: u32,
    height: u32,
    samples: Samples,
  ) -> BitplaneSizes;

  /// Attach a renderbuffer to the bound draw framebuffer.
  unsafe fn attach_renderbuffer(&mut self, attachment: Attachment, renderbuffer: u32);

  /// Attach a texture image to the bound draw framebuffer and return its bit depths.
  ///
  /// Cube map faces are attached with [`TextureTarget::CubeMapFace`].
  unsafe fn attach_texture(
    &mut self,
    attachment: Attachment,
    texture: u32,
    target: TextureTarget,
    level: u32,
  ) -> BitplaneSizes;

  /// Remove whatever is attached at `attachment` on the bound draw framebuffer.
  unsafe fn detach(&mut self, attachment: Attachment);

  /// Select the color attachments written by the bound draw framebuffer. An empty slice means
  /// no color output.
  unsafe fn set_draw_buffers(&mut self, buffers: &[Attachment]);

  /// Select the color attachment read from on the bound read framebuffer.
  unsafe fn set_read_buffer(&mut self, buffer: Option<Attachment>);

  /// Size used by a framebuffer without attachments.
  unsafe fn set_default_framebuffer_size(&mut self, width: u32, height: u32);

  /// Completeness of the bound draw framebuffer.
  unsafe fn framebuffer_status(&mut self) -> Result<(), IncompleteReason>;

  /// Blit the bound read framebuffer into the bound draw framebuffer.
  unsafe fn blit_framebuffer(&mut self, width: u32, height: u32, mask: BlitMask);

  /// Clear the bound draw framebuffer.
  unsafe fn clear(&mut self, values: &ClearValues);

  /// Clear a single color attachment of the bound draw framebuffer.
  unsafe fn clear_color_attachment(&mut self, index: u32, color: [f32; 4]);

  /// Copy the bound read framebuffer's `source` plane into level 0 of `texture`.
  unsafe fn copy_to_texture(
    &mut self,
    source: Attachment,
    texture: u32,
    target: TextureTarget,
    width: u32,
    height: u32,
  );

  unsafe fn set_srgb_framebuffer(&mut self, enabled: bool);

  unsafe fn set_multisample(&mut self, enabled: bool);
}
