//! Texture contexts.

use crate::backend::texture::{MemoryBarrier, TextureTarget};
use crate::prepared::SamplerKey;
use crate::resource::{impl_resource_context, Residency};
use crate::texture::{TextureId, TextureShape};

/// A bindless handle made for a texture, possibly through a sampler object.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BindlessHandle {
  pub handle: u64,
  pub sampler: Option<SamplerKey>,
  pub resident: bool,
}

/// GPU copy of a [`Texture`](crate::texture::Texture).
#[derive(Debug)]
pub struct TextureContext {
  pub(crate) texture: TextureId,
  pub(crate) handle: u32,
  pub(crate) target: TextureTarget,
  pub(crate) residency: Residency,
  pub(crate) data_size_bytes: usize,
  pub(crate) active: bool,
  // modification counter of the texture when last uploaded
  pub(crate) uploaded_modified: Option<u64>,
  pub(crate) uploaded_shape: Option<TextureShape>,
  pub(crate) bindless: Option<BindlessHandle>,
  // frozen by a bindless handle; shape changes recreate the texture object
  pub(crate) immutable: bool,
  // barriers needed before the texture can be read again after an image store
  pub(crate) pending_barriers: MemoryBarrier,
}

impl TextureContext {
  pub(crate) fn new(texture: TextureId, handle: u32, target: TextureTarget) -> Self {
    TextureContext {
      texture,
      handle,
      target,
      residency: Residency::Unloaded,
      data_size_bytes: 0,
      active: false,
      uploaded_modified: None,
      uploaded_shape: None,
      bindless: None,
      immutable: false,
      pending_barriers: MemoryBarrier::empty(),
    }
  }

  pub fn texture_id(&self) -> TextureId {
    self.texture
  }

  pub fn target(&self) -> TextureTarget {
    self.target
  }

  pub fn bindless(&self) -> Option<BindlessHandle> {
    self.bindless
  }

  pub fn is_immutable(&self) -> bool {
    self.immutable
  }

  pub fn pending_barriers(&self) -> MemoryBarrier {
    self.pending_barriers
  }

  /// Whether the texture needs `barriers` issued before it is used again.
  pub fn needs_barrier(&self, barriers: MemoryBarrier) -> bool {
    self.pending_barriers.intersects(barriers)
  }

  /// Record that the texture was written through an image unit.
  pub(crate) fn mark_incoherent(&mut self) {
    self.pending_barriers = MemoryBarrier::TEXTURE_FETCH
      | MemoryBarrier::SHADER_IMAGE_ACCESS
      | MemoryBarrier::TEXTURE_UPDATE
      | MemoryBarrier::FRAMEBUFFER;
  }

  /// Whether a texture at modification `modified` requires a re-upload.
  pub(crate) fn is_stale(&self, modified: u64) -> bool {
    self.residency == Residency::Unloaded || self.uploaded_modified != Some(modified)
  }

  /// Reset to an empty, unloaded context around a fresh handle.
  pub(crate) fn reset(&mut self, handle: u32) {
    self.handle = handle;
    self.residency = Residency::Unloaded;
    self.data_size_bytes = 0;
    self.uploaded_modified = None;
    self.uploaded_shape = None;
    self.bindless = None;
    self.immutable = false;
    self.pending_barriers = MemoryBarrier::empty();
  }
}

impl_resource_context!(TextureContext);
