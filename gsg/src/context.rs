//! Draw context.
//!
//! [`DrawContext`] is the part of the guardian the shader binder and the offscreen buffers work
//! against: the backend, what it can do, what is bound on it and every prepared resource. It is
//! split out of the guardian so that buffers and shader contexts, which the guardian also owns,
//! can borrow it mutably while being borrowed themselves.

use crossbeam_channel::Receiver;
use log::{debug, error, warn};
use std::collections::HashSet;

use crate::backend::buffer::BufferTarget;
use crate::backend::framebuffer::FramebufferTarget;
use crate::backend::texture::{ImageAccess, MemoryBarrier, TextureTarget, TextureUpload};
use crate::backend::Backend;
use crate::capabilities::{Capabilities, Limits};
use crate::config::RenderConfig;
use crate::fb_props::FrameBufferProperties;
use crate::geom::{Geom, GeomVertexArrayData, IndexData};
use crate::lru::{eviction_channel, EvictionHandle, EvictionRequest, Lru};
use crate::prepared::{
  GeomKey, IndexBufferKey, PreparedObjects, ResourceKey, SamplerKey, TextureKey, VertexBufferKey,
};
use crate::resource::buffer::{IndexBufferContext, VertexBufferContext};
use crate::resource::geom::GeomContext;
use crate::resource::sampler::SamplerContext;
use crate::resource::texture::{BindlessHandle, TextureContext};
use crate::resource::{Residency, ResourceContext};
use crate::state::{Bind, BoundState};
use crate::texture::{SamplerState, Texture};

/// Backend plus everything the guardian knows about it.
#[derive(Debug)]
pub struct DrawContext<B> {
  pub(crate) backend: B,
  pub(crate) caps: Capabilities,
  pub(crate) limits: Limits,
  pub(crate) config: RenderConfig,
  pub(crate) state: BoundState,
  pub(crate) prepared: PreparedObjects,
  pub(crate) lru: Lru<ResourceKey>,
  // textures written through image units since the last barrier
  pub(crate) barrier_pending: HashSet<TextureKey>,
  // renderbuffer memory of every offscreen buffer; never evictable
  pub(crate) framebuffer_memory: usize,
  pub(crate) eviction_handle: EvictionHandle,
  pub(crate) evictions: Receiver<EvictionRequest>,
  pub(crate) current_properties: Option<FrameBufferProperties>,
  pub(crate) errors_reported: usize,
}

impl<B> DrawContext<B>
where
  B: Backend,
{
  pub(crate) fn new(backend: B, caps: Capabilities, limits: Limits, config: RenderConfig) -> Self {
    // the backend keeps the last texture unit for uploads and copies
    let texture_units = limits.max_texture_units.saturating_sub(1);
    let image_units = if caps.contains(Capabilities::IMAGE_LOAD_STORE) {
      limits.max_image_units
    } else {
      0
    };
    let (eviction_handle, evictions) = eviction_channel();

    DrawContext {
      backend,
      caps,
      limits,
      config,
      state: BoundState::new(texture_units, image_units),
      prepared: PreparedObjects::default(),
      lru: Lru::new(),
      barrier_pending: HashSet::new(),
      framebuffer_memory: 0,
      eviction_handle,
      evictions,
      current_properties: None,
      errors_reported: 0,
    }
  }

  pub fn capabilities(&self) -> Capabilities {
    self.caps
  }

  pub fn limits(&self) -> &Limits {
    &self.limits
  }

  pub fn config(&self) -> &RenderConfig {
    &self.config
  }

  pub fn prepared(&self) -> &PreparedObjects {
    &self.prepared
  }

  pub fn bound_state(&self) -> &BoundState {
    &self.state
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  pub fn backend_mut(&mut self) -> &mut B {
    &mut self.backend
  }

  /// Texture units available to shaders.
  pub fn texture_units(&self) -> u32 {
    self.state.texture_units()
  }

  /// Image units available to shaders.
  pub fn image_units(&self) -> u32 {
    self.state.image_units()
  }

  /// Bytes resident on the device, renderbuffers included.
  pub fn resident_bytes(&self) -> usize {
    self.prepared.resident_bytes() + self.framebuffer_memory
  }

  /// Renderbuffer bytes of every offscreen buffer.
  pub fn framebuffer_memory(&self) -> usize {
    self.framebuffer_memory
  }

  /// Properties of the framebuffer currently rendered to.
  pub fn current_properties(&self) -> Option<&FrameBufferProperties> {
    self.current_properties.as_ref()
  }

  pub fn set_current_properties(&mut self, properties: Option<FrameBufferProperties>) {
    self.current_properties = properties;
  }

  /// Make the backend current and apply the eviction requests queued since the last frame.
  pub fn begin_frame(&mut self) -> bool {
    if !unsafe { self.backend.make_current() } {
      error!("cannot make the rendering context current");
      return false;
    }

    let requests: Vec<EvictionRequest> = self.evictions.try_iter().collect();
    for request in requests {
      match request {
        EvictionRequest::Evict(key) => {
          self.evict(key);
        }

        EvictionRequest::ShrinkTo(limit) => {
          self.shrink_to(limit);
        }

        EvictionRequest::EvictAll => {
          self.evict_all();
        }
      }
    }

    true
  }

  /// Enforce the memory budget, then start a new usage epoch.
  pub fn end_frame(&mut self) {
    if let Some(limit) = self.config.graphics_memory_limit {
      self.shrink_to(limit);
    }

    self.prepared.end_frame();
    self.report_errors();
  }

  /// Log pending driver errors. Returns the number of errors found.
  ///
  /// Only debug builds check; checking stops for good after
  /// [`RenderConfig::max_errors_reported`] errors.
  pub fn report_errors(&mut self) -> usize {
    if !cfg!(debug_assertions) || self.errors_reported >= self.config.max_errors_reported {
      return 0;
    }

    let mut found = 0;
    while let Some(e) = unsafe { self.backend.get_error() } {
      error!("driver error: {}", e);
      found += 1;
      self.errors_reported += 1;

      if self.errors_reported >= self.config.max_errors_reported {
        warn!(
          "{} driver errors reported; no longer checking for errors",
          self.errors_reported
        );
        break;
      }
    }

    found
  }

  pub fn bind_fbo(&mut self, handle: u32) {
    unsafe {
      self
        .state
        .bind_framebuffer(&mut self.backend, FramebufferTarget::Both, handle, Bind::Cached)
    };
  }

  /// Get or create the context of `texture`.
  pub fn prepare_texture(&mut self, texture: &Texture) -> TextureKey {
    if let Some(key) = self.prepared.texture_key(texture.id()) {
      return key;
    }

    let handle = unsafe { self.backend.gen_texture() };
    let target = TextureTarget::from_texture_type(texture.texture_type());
    let key = self
      .prepared
      .textures
      .insert(TextureContext::new(texture.id(), handle, target));
    self.prepared.texture_ids.insert(texture.id(), key);

    debug!("prepared texture {} as {}", texture.name(), handle);
    key
  }

  /// Delete the context of a texture. Returns whether it existed.
  pub fn release_texture(&mut self, key: TextureKey) -> bool {
    let ctx = match self.prepared.textures.remove(key) {
      Some(ctx) => ctx,
      None => return false,
    };

    self.prepared.texture_ids.remove(&ctx.texture);
    self.lru.dequeue(ResourceKey::Texture(key));
    self.barrier_pending.remove(&key);

    unsafe {
      self.state.unbind_texture(&mut self.backend, ctx.handle);

      if let Some(bindless) = ctx.bindless.filter(|b| b.resident) {
        self.backend.make_handle_resident(bindless.handle, false);
      }

      self.backend.delete_texture(ctx.handle);
    }

    true
  }

  /// Bring the context of `texture` up to date, uploading if it is stale.
  ///
  /// Returns `false` if the texture could not be uploaded.
  pub fn update_texture(&mut self, key: TextureKey, texture: &Texture) -> bool {
    let force_mipmaps = self.config.force_mipmaps;
    let ignore_mipmaps = self.config.ignore_mipmaps;
    let can_generate_mipmaps = self.caps.contains(Capabilities::GENERATE_MIPMAP);

    let ctx = match self.prepared.textures.get_mut(key) {
      Some(ctx) => ctx,
      None => return false,
    };

    self.lru.touch(ResourceKey::Texture(key));
    ctx.active = true;

    let modified = texture.modified();
    if !ctx.is_stale(modified) {
      return true;
    }

    let mut shape = texture.shape();
    shape.mipmaps = (shape.mipmaps || force_mipmaps) && !ignore_mipmaps;

    // bindless handles freeze the storage; a new shape needs a new texture object
    if ctx.immutable && ctx.uploaded_shape.map_or(false, |s| s != shape) {
      debug!("recreating immutable texture {}", texture.name());

      unsafe {
        self.state.unbind_texture(&mut self.backend, ctx.handle);

        if let Some(bindless) = ctx.bindless.filter(|b| b.resident) {
          self.backend.make_handle_resident(bindless.handle, false);
        }

        self.backend.delete_texture(ctx.handle);
        let handle = self.backend.gen_texture();
        ctx.reset(handle);
      }
    }

    let [width, height, depth] = shape.size;
    let backend = &mut self.backend;
    let handle = ctx.handle;
    let target = ctx.target;

    let (result, has_texels) = texture.with_ram_image(|texels| {
      let upload = TextureUpload {
        target,
        format: shape.format,
        component_type: shape.component_type,
        width,
        height,
        depth,
        mipmaps: shape.mipmaps,
        texels,
      };

      (unsafe { backend.upload_texture(handle, &upload) }, texels.is_some())
    });

    match result {
      Ok(bytes) => {
        if shape.mipmaps && has_texels && can_generate_mipmaps {
          unsafe { self.backend.generate_mipmap(target, handle) };
        }

        ctx.data_size_bytes = bytes;
        ctx.residency = Residency::Resident;
        ctx.uploaded_modified = Some(modified);
        ctx.uploaded_shape = Some(shape);
        true
      }

      Err(e) => {
        error!("cannot upload texture {}: {}", texture.name(), e);
        false
      }
    }
  }

  /// Mark a texture as used this frame.
  pub fn touch_texture(&mut self, key: TextureKey) {
    if let Some(ctx) = self.prepared.textures.get_mut(key) {
      ctx.active = true;
      self.lru.touch(ResourceKey::Texture(key));
    }
  }

  /// Bind a prepared texture to a texture unit.
  pub fn bind_texture_unit(&mut self, unit: u32, key: TextureKey) {
    if let Some(ctx) = self.prepared.textures.get(key) {
      unsafe {
        self
          .state
          .bind_texture(&mut self.backend, unit, ctx.target, ctx.handle, Bind::Cached)
      };
    }
  }

  pub fn unbind_texture_unit(&mut self, unit: u32) {
    unsafe { self.state.unbind_texture_unit(&mut self.backend, unit) };
  }

  /// Bind a texture level to an image unit.
  pub fn bind_image_unit(&mut self, unit: u32, key: TextureKey, level: u32, access: ImageAccess) {
    let ctx = match self.prepared.textures.get(key) {
      Some(ctx) => ctx,
      None => return,
    };

    let shape = match ctx.uploaded_shape {
      Some(shape) => shape,
      None => return,
    };

    unsafe {
      self.backend.bind_image_texture(
        unit,
        ctx.handle,
        level,
        access,
        shape.format,
        shape.component_type,
      )
    };
    self.state.set_image_unit(unit, ctx.handle);
  }

  pub fn unbind_image_unit(&mut self, unit: u32) {
    unsafe { self.state.unbind_image_unit(&mut self.backend, unit) };
  }

  /// Get or create the sampler object for `state`.
  pub fn prepare_sampler(&mut self, state: &SamplerState) -> SamplerKey {
    if let Some(&key) = self.prepared.sampler_states.get(state) {
      return key;
    }

    let handle = unsafe { self.backend.gen_sampler() };
    let key = self.prepared.samplers.insert(SamplerContext::new(*state, handle));
    self.prepared.sampler_states.insert(*state, key);
    key
  }

  pub fn release_sampler(&mut self, key: SamplerKey) -> bool {
    let ctx = match self.prepared.samplers.remove(key) {
      Some(ctx) => ctx,
      None => return false,
    };

    self.prepared.sampler_states.remove(&ctx.state);
    self.lru.dequeue(ResourceKey::Sampler(key));
    self.revoke_sampler_handles(key);

    unsafe {
      self.state.unbind_sampler(&mut self.backend, ctx.handle);
      self.backend.delete_sampler(ctx.handle);
    }

    true
  }

  /// Make sure the sampler object of `key` holds its state. Returns its handle.
  fn update_sampler(&mut self, key: SamplerKey) -> Option<u32> {
    let ctx = self.prepared.samplers.get_mut(key)?;

    if ctx.residency == Residency::Unloaded {
      unsafe { self.backend.apply_sampler_state(ctx.handle, &ctx.state) };
      ctx.residency = Residency::Resident;
    }

    ctx.active = true;
    self.lru.touch(ResourceKey::Sampler(key));
    Some(ctx.handle)
  }

  /// Apply sampling parameters to a texture unit.
  pub fn apply_sampler(&mut self, unit: u32, state: &SamplerState) {
    if !self.caps.contains(Capabilities::SAMPLER_OBJECTS) {
      return;
    }

    let key = self.prepare_sampler(state);
    if let Some(handle) = self.update_sampler(key) {
      unsafe { self.state.bind_sampler(&mut self.backend, unit, handle) };
    }
  }

  /// Resident bindless handle of a prepared, up-to-date texture sampled with `sampler`.
  pub fn bindless_handle(&mut self, key: TextureKey, sampler: &SamplerState) -> Option<u64> {
    if !self.caps.contains(Capabilities::BINDLESS_TEXTURE) {
      return None;
    }

    let sampler_key = if self.caps.contains(Capabilities::SAMPLER_OBJECTS) {
      Some(self.prepare_sampler(sampler))
    } else {
      None
    };
    let sampler_handle = match sampler_key {
      Some(k) => Some(self.update_sampler(k)?),
      None => None,
    };

    let ctx = self.prepared.textures.get_mut(key)?;

    match ctx.bindless {
      Some(ref mut bindless) if bindless.sampler == sampler_key => {
        if !bindless.resident {
          unsafe { self.backend.make_handle_resident(bindless.handle, true) };
          bindless.resident = true;
        }

        return Some(bindless.handle);
      }

      Some(bindless) if bindless.resident => unsafe {
        self.backend.make_handle_resident(bindless.handle, false);
      },

      _ => (),
    }

    let handle = unsafe {
      let handle = self.backend.texture_handle(ctx.handle, sampler_handle);
      self.backend.make_handle_resident(handle, true);
      handle
    };

    ctx.bindless = Some(BindlessHandle {
      handle,
      sampler: sampler_key,
      resident: true,
    });
    ctx.immutable = true;

    Some(handle)
  }

  // revoke the residency of every bindless handle made through a sampler
  fn revoke_sampler_handles(&mut self, sampler: SamplerKey) {
    for ctx in self.prepared.textures.values_mut() {
      if let Some(bindless) = ctx.bindless.as_mut() {
        if bindless.sampler == Some(sampler) && bindless.resident {
          unsafe { self.backend.make_handle_resident(bindless.handle, false) };
          bindless.resident = false;
        }
      }
    }
  }

  pub fn prepare_vertex_buffer(&mut self, array: &GeomVertexArrayData) -> VertexBufferKey {
    if let Some(&key) = self.prepared.vertex_buffer_ids.get(&array.id()) {
      return key;
    }

    let handle = unsafe { self.backend.gen_buffer() };
    let key = self
      .prepared
      .vertex_buffers
      .insert(VertexBufferContext::new(array.id(), handle));
    self.prepared.vertex_buffer_ids.insert(array.id(), key);
    key
  }

  pub fn release_vertex_buffer(&mut self, key: VertexBufferKey) -> bool {
    let ctx = match self.prepared.vertex_buffers.remove(key) {
      Some(ctx) => ctx,
      None => return false,
    };

    self.prepared.vertex_buffer_ids.remove(&ctx.array);
    self.lru.dequeue(ResourceKey::VertexBuffer(key));

    unsafe {
      self.state.unbind_buffer(&mut self.backend, ctx.handle);
      self.backend.delete_buffer(ctx.handle);
    }

    true
  }

  /// Bind the buffer of `array` to the array target, uploading it if stale. Returns its handle.
  pub fn apply_vertex_buffer(&mut self, array: &GeomVertexArrayData) -> Option<u32> {
    let key = self.prepare_vertex_buffer(array);
    let ctx = self.prepared.vertex_buffers.get_mut(key)?;

    unsafe {
      self
        .state
        .bind_buffer(&mut self.backend, BufferTarget::Array, ctx.handle, Bind::Cached)
    };

    let modified = array.modified();
    if ctx.residency == Residency::Unloaded || ctx.uploaded_modified != Some(modified) {
      let backend = &mut self.backend;
      let result = array.with_data(|data| unsafe {
        backend.upload_buffer(BufferTarget::Array, data, array.usage())
      });

      match result {
        Ok(bytes) => {
          ctx.data_size_bytes = bytes;
          ctx.residency = Residency::Resident;
          ctx.uploaded_modified = Some(modified);
        }

        Err(e) => {
          error!("cannot upload vertex buffer: {}", e);
          return None;
        }
      }
    }

    ctx.active = true;
    let handle = ctx.handle;
    self.lru.touch(ResourceKey::VertexBuffer(key));

    Some(handle)
  }

  pub fn prepare_index_buffer(&mut self, indices: &IndexData) -> IndexBufferKey {
    if let Some(&key) = self.prepared.index_buffer_ids.get(&indices.id()) {
      return key;
    }

    let handle = unsafe { self.backend.gen_buffer() };
    let key = self
      .prepared
      .index_buffers
      .insert(IndexBufferContext::new(indices.id(), handle));
    self.prepared.index_buffer_ids.insert(indices.id(), key);
    key
  }

  pub fn release_index_buffer(&mut self, key: IndexBufferKey) -> bool {
    let ctx = match self.prepared.index_buffers.remove(key) {
      Some(ctx) => ctx,
      None => return false,
    };

    self.prepared.index_buffer_ids.remove(&ctx.indices);
    self.lru.dequeue(ResourceKey::IndexBuffer(key));

    unsafe {
      self.state.unbind_buffer(&mut self.backend, ctx.handle);
      self.backend.delete_buffer(ctx.handle);
    }

    true
  }

  /// Bind the buffer of `indices` to the element target, uploading it if stale.
  pub fn apply_index_buffer(&mut self, indices: &IndexData) -> Option<u32> {
    let key = self.prepare_index_buffer(indices);
    let ctx = self.prepared.index_buffers.get_mut(key)?;

    unsafe {
      self.state.bind_buffer(
        &mut self.backend,
        BufferTarget::ElementArray,
        ctx.handle,
        Bind::Cached,
      )
    };

    let modified = indices.modified();
    if ctx.residency == Residency::Unloaded || ctx.uploaded_modified != Some(modified) {
      let backend = &mut self.backend;
      let result = indices.with_data(|data| unsafe {
        backend.upload_buffer(BufferTarget::ElementArray, data, indices.usage())
      });

      match result {
        Ok(bytes) => {
          ctx.data_size_bytes = bytes;
          ctx.residency = Residency::Resident;
          ctx.uploaded_modified = Some(modified);
        }

        Err(e) => {
          error!("cannot upload index buffer: {}", e);
          return None;
        }
      }
    }

    ctx.active = true;
    let handle = ctx.handle;
    self.lru.touch(ResourceKey::IndexBuffer(key));

    Some(handle)
  }

  pub fn prepare_geom(&mut self, geom: &Geom) -> GeomKey {
    if let Some(&key) = self.prepared.geom_ids.get(&geom.id()) {
      return key;
    }

    let vao = if self.caps.contains(Capabilities::VERTEX_ARRAY_OBJECT) {
      unsafe { self.backend.gen_vertex_array() }
    } else {
      0
    };

    let key = self.prepared.geoms.insert(GeomContext::new(geom.id(), vao));
    self.prepared.geom_ids.insert(geom.id(), key);
    key
  }

  pub fn release_geom(&mut self, key: GeomKey) -> bool {
    let ctx = match self.prepared.geoms.remove(key) {
      Some(ctx) => ctx,
      None => return false,
    };

    self.prepared.geom_ids.remove(&ctx.geom);

    if ctx.vao != 0 {
      unsafe {
        self.state.bind_vertex_array(&mut self.backend, 0, Bind::Cached);
        self.backend.delete_vertex_array(ctx.vao);
      }
    }

    true
  }

  /// Bind the vertex array object of a geom.
  pub fn bind_geom(&mut self, geom: &Geom) -> GeomKey {
    let key = self.prepare_geom(geom);

    if let Some(ctx) = self.prepared.geoms.get(key) {
      unsafe {
        self
          .state
          .bind_vertex_array(&mut self.backend, ctx.vao, Bind::Cached)
      };
    }

    key
  }

  /// Evict the data of a context, keeping a fresh, empty handle around.
  ///
  /// Returns `false` if nothing was evicted: the context is gone, in use this frame or already
  /// unloaded.
  pub fn evict(&mut self, key: ResourceKey) -> bool {
    self.lru.dequeue(key);

    let (active, residency) = match self.prepared.context(key) {
      Some(ctx) => (ctx.is_active(), ctx.residency()),
      None => return false,
    };

    if active {
      self.lru.touch(key);
      return false;
    }

    if residency == Residency::Unloaded {
      return false;
    }

    match key {
      ResourceKey::Texture(k) => self.evict_texture(k),
      ResourceKey::Sampler(k) => self.evict_sampler(k),
      ResourceKey::VertexBuffer(k) => self.evict_vertex_buffer(k),
      ResourceKey::IndexBuffer(k) => self.evict_index_buffer(k),
    }

    true
  }

  fn evict_texture(&mut self, key: TextureKey) {
    if let Some(ctx) = self.prepared.textures.get_mut(key) {
      debug!("evicting texture {}", ctx.handle);

      unsafe {
        self.state.unbind_texture(&mut self.backend, ctx.handle);

        if let Some(bindless) = ctx.bindless.filter(|b| b.resident) {
          self.backend.make_handle_resident(bindless.handle, false);
        }

        self.backend.delete_texture(ctx.handle);
        let handle = self.backend.gen_texture();
        ctx.reset(handle);
      }

      self.barrier_pending.remove(&key);
    }
  }

  fn evict_sampler(&mut self, key: SamplerKey) {
    self.revoke_sampler_handles(key);

    if let Some(ctx) = self.prepared.samplers.get_mut(key) {
      unsafe {
        self.state.unbind_sampler(&mut self.backend, ctx.handle);
        self.backend.delete_sampler(ctx.handle);
        ctx.handle = self.backend.gen_sampler();
      }

      ctx.residency = Residency::Unloaded;
      ctx.data_size_bytes = 0;
    }
  }

  fn evict_vertex_buffer(&mut self, key: VertexBufferKey) {
    if let Some(ctx) = self.prepared.vertex_buffers.get_mut(key) {
      unsafe {
        self.state.unbind_buffer(&mut self.backend, ctx.handle);
        self.backend.delete_buffer(ctx.handle);
        let handle = self.backend.gen_buffer();
        ctx.reset(handle);
      }
    }
  }

  fn evict_index_buffer(&mut self, key: IndexBufferKey) {
    if let Some(ctx) = self.prepared.index_buffers.get_mut(key) {
      unsafe {
        self.state.unbind_buffer(&mut self.backend, ctx.handle);
        self.backend.delete_buffer(ctx.handle);
        let handle = self.backend.gen_buffer();
        ctx.reset(handle);
      }
    }
  }

  /// Evict least recently used contexts until resident memory fits in `limit` bytes.
  ///
  /// Returns the number of contexts evicted.
  pub fn shrink_to(&mut self, limit: usize) -> usize {
    let mut evicted = 0;

    // every key is visited at most once; active ones go back to the tail
    for _ in 0..self.lru.len() {
      if self.resident_bytes() <= limit {
        break;
      }

      match self.lru.pop_front() {
        Some(key) => {
          if self.evict(key) {
            evicted += 1;
          }
        }

        None => break,
      }
    }

    if self.resident_bytes() > limit {
      warn!(
        "{} bytes resident, over the {} bytes budget",
        self.resident_bytes(),
        limit
      );
    }

    evicted
  }

  /// Evict every context not used this frame.
  pub fn evict_all(&mut self) -> usize {
    let mut evicted = 0;

    for _ in 0..self.lru.len() {
      match self.lru.pop_front() {
        Some(key) => {
          if self.evict(key) {
            evicted += 1;
          }
        }

        None => break,
      }
    }

    evicted
  }

  /// Record that a texture was written through an image unit.
  pub fn mark_incoherent(&mut self, key: TextureKey) {
    if !self.config.enable_memory_barriers {
      return;
    }

    if let Some(ctx) = self.prepared.textures.get_mut(key) {
      ctx.mark_incoherent();
      self.barrier_pending.insert(key);
    }
  }

  /// Issue a memory barrier and clear the matching pending bits.
  pub fn issue_memory_barrier(&mut self, barriers: MemoryBarrier) {
    if !self.config.enable_memory_barriers
      || !self.caps.contains(Capabilities::IMAGE_LOAD_STORE)
      || barriers.is_empty()
    {
      return;
    }

    debug!("issuing memory barrier {:?}", barriers);
    unsafe { self.backend.memory_barrier(barriers) };

    let textures = &mut self.prepared.textures;
    self.barrier_pending.retain(|key| match textures.get_mut(*key) {
      Some(ctx) => {
        ctx.pending_barriers.remove(barriers);
        !ctx.pending_barriers.is_empty()
      }

      None => false,
    });
  }

  /// Whether any texture still waits for one of `barriers`.
  pub fn needs_barrier(&self, barriers: MemoryBarrier) -> bool {
    self.barrier_pending.iter().any(|key| {
      self
        .prepared
        .textures
        .get(*key)
        .map_or(false, |ctx| ctx.needs_barrier(barriers))
    })
  }
}
