//! Prepared-objects table.
//!
//! Contexts are stored in arenas and referred to by key. CPU-side resources are mapped to their
//! context by identifier, so that a resource never holds a pointer into the guardian.

use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;

use crate::resource::buffer::{IndexBufferContext, VertexBufferContext};
use crate::resource::geom::GeomContext;
use crate::resource::sampler::SamplerContext;
use crate::resource::texture::TextureContext;
use crate::resource::ResourceContext;
use crate::texture::{SamplerState, TextureId};

new_key_type! {
  /// Key of a [`TextureContext`].
  pub struct TextureKey;
  /// Key of a [`SamplerContext`].
  pub struct SamplerKey;
  /// Key of a [`VertexBufferContext`].
  pub struct VertexBufferKey;
  /// Key of an [`IndexBufferContext`].
  pub struct IndexBufferKey;
  /// Key of a [`GeomContext`].
  pub struct GeomKey;
}

/// Key of any evictable context.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResourceKey {
  Texture(TextureKey),
  Sampler(SamplerKey),
  VertexBuffer(VertexBufferKey),
  IndexBuffer(IndexBufferKey),
}

impl From<TextureKey> for ResourceKey {
  fn from(key: TextureKey) -> Self {
    ResourceKey::Texture(key)
  }
}

impl From<SamplerKey> for ResourceKey {
  fn from(key: SamplerKey) -> Self {
    ResourceKey::Sampler(key)
  }
}

impl From<VertexBufferKey> for ResourceKey {
  fn from(key: VertexBufferKey) -> Self {
    ResourceKey::VertexBuffer(key)
  }
}

impl From<IndexBufferKey> for ResourceKey {
  fn from(key: IndexBufferKey) -> Self {
    ResourceKey::IndexBuffer(key)
  }
}

/// All contexts prepared on one guardian.
#[derive(Debug, Default)]
pub struct PreparedObjects {
  pub(crate) textures: SlotMap<TextureKey, TextureContext>,
  pub(crate) texture_ids: HashMap<TextureId, TextureKey>,
  pub(crate) samplers: SlotMap<SamplerKey, SamplerContext>,
  pub(crate) sampler_states: HashMap<SamplerState, SamplerKey>,
  pub(crate) vertex_buffers: SlotMap<VertexBufferKey, VertexBufferContext>,
  pub(crate) vertex_buffer_ids: HashMap<u64, VertexBufferKey>,
  pub(crate) index_buffers: SlotMap<IndexBufferKey, IndexBufferContext>,
  pub(crate) index_buffer_ids: HashMap<u64, IndexBufferKey>,
  pub(crate) geoms: SlotMap<GeomKey, GeomContext>,
  pub(crate) geom_ids: HashMap<u64, GeomKey>,
}

impl PreparedObjects {
  pub fn texture(&self, key: TextureKey) -> Option<&TextureContext> {
    self.textures.get(key)
  }

  pub fn texture_key(&self, id: TextureId) -> Option<TextureKey> {
    self.texture_ids.get(&id).copied()
  }

  pub fn sampler(&self, key: SamplerKey) -> Option<&SamplerContext> {
    self.samplers.get(key)
  }

  pub fn vertex_buffer(&self, key: VertexBufferKey) -> Option<&VertexBufferContext> {
    self.vertex_buffers.get(key)
  }

  pub fn index_buffer(&self, key: IndexBufferKey) -> Option<&IndexBufferContext> {
    self.index_buffers.get(key)
  }

  pub fn geom(&self, key: GeomKey) -> Option<&GeomContext> {
    self.geoms.get(key)
  }

  /// Bookkeeping of any evictable context.
  pub fn context(&self, key: ResourceKey) -> Option<&dyn ResourceContext> {
    match key {
      ResourceKey::Texture(k) => self.textures.get(k).map(|c| c as &dyn ResourceContext),
      ResourceKey::Sampler(k) => self.samplers.get(k).map(|c| c as &dyn ResourceContext),
      ResourceKey::VertexBuffer(k) => self.vertex_buffers.get(k).map(|c| c as &dyn ResourceContext),
      ResourceKey::IndexBuffer(k) => self.index_buffers.get(k).map(|c| c as &dyn ResourceContext),
    }
  }

  pub(crate) fn context_mut(&mut self, key: ResourceKey) -> Option<&mut dyn ResourceContext> {
    match key {
      ResourceKey::Texture(k) => self.textures.get_mut(k).map(|c| c as &mut dyn ResourceContext),
      ResourceKey::Sampler(k) => self.samplers.get_mut(k).map(|c| c as &mut dyn ResourceContext),
      ResourceKey::VertexBuffer(k) => self
        .vertex_buffers
        .get_mut(k)
        .map(|c| c as &mut dyn ResourceContext),
      ResourceKey::IndexBuffer(k) => self
        .index_buffers
        .get_mut(k)
        .map(|c| c as &mut dyn ResourceContext),
    }
  }

  /// Bytes resident on the device across every evictable context.
  pub fn resident_bytes(&self) -> usize {
    self.textures.values().map(|c| c.data_size_bytes).sum::<usize>()
      + self.samplers.values().map(|c| c.data_size_bytes).sum::<usize>()
      + self.vertex_buffers.values().map(|c| c.data_size_bytes).sum::<usize>()
      + self.index_buffers.values().map(|c| c.data_size_bytes).sum::<usize>()
  }

  /// Clear the used-this-frame flag of every context.
  pub(crate) fn end_frame(&mut self) {
    self.textures.values_mut().for_each(|c| c.active = false);
    self.samplers.values_mut().for_each(|c| c.active = false);
    self.vertex_buffers.values_mut().for_each(|c| c.active = false);
    self.index_buffers.values_mut().for_each(|c| c.active = false);
  }

  pub fn num_textures(&self) -> usize {
    self.textures.len()
  }

  pub fn num_samplers(&self) -> usize {
    self.samplers.len()
  }

  pub fn num_vertex_buffers(&self) -> usize {
    self.vertex_buffers.len()
  }

  pub fn num_index_buffers(&self) -> usize {
    self.index_buffers.len()
  }

  pub fn num_geoms(&self) -> usize {
    self.geoms.len()
  }
}
