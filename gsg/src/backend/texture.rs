//! Texture backend interface.

use bitflags::bitflags;
use std::error;
use std::fmt;

use crate::texture::{ComponentType, Format, SamplerState, TextureType};

/// Target a texture object is bound to or attached from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TextureTarget {
  Texture1D,
  Texture2D,
  Texture3D,
  Texture2DArray,
  CubeMap,
  /// A single face of a cube map, `0..6`.
  CubeMapFace(u8),
  Buffer,
}

impl TextureTarget {
  pub fn from_texture_type(ty: TextureType) -> Self {
    match ty {
      TextureType::Texture1D => TextureTarget::Texture1D,
      TextureType::Texture2D => TextureTarget::Texture2D,
      TextureType::Texture3D => TextureTarget::Texture3D,
      TextureType::Texture2DArray => TextureTarget::Texture2DArray,
      TextureType::CubeMap => TextureTarget::CubeMap,
      TextureType::BufferTexture => TextureTarget::Buffer,
    }
  }
}

bitflags! {
  /// Memory barrier bits.
  #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
  pub struct MemoryBarrier: u32 {
    const TEXTURE_FETCH = 1 << 0;
    const SHADER_IMAGE_ACCESS = 1 << 1;
    const TEXTURE_UPDATE = 1 << 2;
    const FRAMEBUFFER = 1 << 3;
    const VERTEX_ATTRIB_ARRAY = 1 << 4;
    const ELEMENT_ARRAY = 1 << 5;
  }
}

/// Access an image unit is bound with.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ImageAccess {
  ReadOnly,
  WriteOnly,
  ReadWrite,
}

impl ImageAccess {
  pub fn is_writable(self) -> bool {
    !matches!(self, ImageAccess::ReadOnly)
  }
}

/// Storage request for a texture object.
#[derive(Clone, Copy, Debug)]
pub struct TextureUpload<'a> {
  pub target: TextureTarget,
  pub format: Format,
  pub component_type: ComponentType,
  pub width: u32,
  pub height: u32,
  pub depth: u32,
  pub mipmaps: bool,
  /// Texels, or `None` to only allocate storage.
  pub texels: Option<&'a [u8]>,
}

/// Texture errors.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TextureError {
  /// A texture’s storage failed to be created.
  ///
  /// The carried [`String`] gives the reason of the failure.
  TextureStorageCreationFailed(String),
  /// Not enough texel data provided for the given size.
  ///
  /// The first [`usize`] is the number of expected bytes and the second the number provided.
  NotEnoughPixels(usize, usize),
  /// Unsupported pixel format.
  UnsupportedPixelFormat(Format, ComponentType),
}

impl TextureError {
  pub fn texture_storage_creation_failed(reason: impl Into<String>) -> Self {
    TextureError::TextureStorageCreationFailed(reason.into())
  }
}

impl fmt::Display for TextureError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      TextureError::TextureStorageCreationFailed(ref e) => {
        write!(f, "texture storage creation failed: {}", e)
      }

      TextureError::NotEnoughPixels(expected, provided) => write!(
        f,
        "not enough texels provided: expected {} bytes, provided {} bytes",
        expected, provided
      ),

      TextureError::UnsupportedPixelFormat(format, ty) => {
        write!(f, "unsupported pixel format: {:?} ({:?})", format, ty)
      }
    }
  }
}

impl error::Error for TextureError {}

pub unsafe trait TextureBackend {
  unsafe fn gen_texture(&mut self) -> u32;

  unsafe fn delete_texture(&mut self, texture: u32);

  /// Bind `texture` to `target` on texture unit `unit`. `0` unbinds.
  unsafe fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: u32);

  /// Allocate (and optionally fill) the storage of `texture`.
  ///
  /// Returns the number of bytes resident on the device.
  unsafe fn upload_texture(
    &mut self,
    texture: u32,
    upload: &TextureUpload,
  ) -> Result<usize, TextureError>;

  unsafe fn generate_mipmap(&mut self, target: TextureTarget, texture: u32);

  /// Bindless handle of `texture`, optionally combined with a sampler object.
  unsafe fn texture_handle(&mut self, texture: u32, sampler: Option<u32>) -> u64;

  unsafe fn make_handle_resident(&mut self, handle: u64, resident: bool);

  unsafe fn gen_sampler(&mut self) -> u32;

  unsafe fn delete_sampler(&mut self, sampler: u32);

  /// Bind `sampler` to texture unit `unit`. `0` unbinds.
  unsafe fn bind_sampler(&mut self, unit: u32, sampler: u32);

  unsafe fn apply_sampler_state(&mut self, sampler: u32, state: &SamplerState);

  /// Bind a texture level to an image unit. `texture == 0` unbinds the unit.
  unsafe fn bind_image_texture(
    &mut self,
    unit: u32,
    texture: u32,
    level: u32,
    access: ImageAccess,
    format: Format,
    component_type: ComponentType,
  );

  unsafe fn memory_barrier(&mut self, barriers: MemoryBarrier);
}
