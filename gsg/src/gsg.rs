//! The graphics state guardian.
//!
//! [`GraphicsStateGuardian`] is the front door of the crate. It wraps a backend and owns
//! everything prepared on it: resource contexts, shader contexts and offscreen buffers. It is
//! `!Send` and `!Sync`; the only way to reach it from another thread is an [`EvictionHandle`].
//!
//! Nothing in the per-frame path returns an error: failures are reported as `false`, logged, and
//! remembered where they must be (a shader's error flag, a buffer staying dirty).

use log::{debug, error, info, warn};
use slotmap::SlotMap;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::backend::texture::MemoryBarrier;
use crate::backend::Backend;
use crate::capabilities::{Capabilities, DriverInfo, Limits};
use crate::config::RenderConfig;
use crate::context::DrawContext;
use crate::fb_props::FrameBufferProperties;
use crate::geom::{Geom, GeomVertexArrayData, IndexData};
use crate::graphics_buffer::depth_sharing;
use crate::graphics_buffer::{BufferId, GraphicsBuffer};
use crate::host::FrameMode;
use crate::lru::EvictionHandle;
use crate::prepared::{
  GeomKey, IndexBufferKey, PreparedObjects, ResourceKey, SamplerKey, TextureKey, VertexBufferKey,
};
use crate::render_state::{RenderState, StateDeps};
use crate::shader::{Shader, ShaderContext, ShaderId};
use crate::state::Bind;
use crate::texture::{SamplerState, Texture};
use crate::transform::TransformSource;

/// Backend-neutral rendering front door.
#[derive(Debug)]
pub struct GraphicsStateGuardian<B> {
  ctx: DrawContext<B>,
  driver_info: DriverInfo,
  shaders: HashMap<ShaderId, ShaderContext>,
  buffers: SlotMap<BufferId, GraphicsBuffer>,
  // shader whose program is current
  current_shader: Option<ShaderId>,
  // shader whose vertex attributes are enabled
  vertex_arrays_shader: Option<ShaderId>,
  _phantom: PhantomData<Rc<()>>,
}

impl<B> GraphicsStateGuardian<B>
where
  B: Backend,
{
  /// Wrap a backend whose context is current on the calling thread, probing what it can do.
  pub fn new(mut backend: B, config: RenderConfig) -> Self {
    let (mut caps, limits, driver_info) = unsafe {
      let (caps, limits) = backend.capabilities();
      (caps, limits, backend.driver_info())
    };

    // set by the first buffer that gets multisample bitplanes
    caps.remove(Capabilities::MULTISAMPLE);

    if !config.use_bindless_textures {
      caps.remove(Capabilities::BINDLESS_TEXTURE);
    }

    info!(
      "{} {} ({}), GLSL {}",
      driver_info.vendor,
      driver_info.renderer,
      driver_info.version,
      driver_info.shading_language_version
    );
    debug!("capabilities: {:?}", caps);
    debug!("limits: {:?}", limits);

    GraphicsStateGuardian {
      ctx: DrawContext::new(backend, caps, limits, config),
      driver_info,
      shaders: HashMap::new(),
      buffers: SlotMap::with_key(),
      current_shader: None,
      vertex_arrays_shader: None,
      _phantom: PhantomData,
    }
  }

  pub fn context(&self) -> &DrawContext<B> {
    &self.ctx
  }

  pub fn context_mut(&mut self) -> &mut DrawContext<B> {
    &mut self.ctx
  }

  pub fn backend(&self) -> &B {
    self.ctx.backend()
  }

  pub fn backend_mut(&mut self) -> &mut B {
    self.ctx.backend_mut()
  }

  pub fn capabilities(&self) -> Capabilities {
    self.ctx.caps
  }

  pub fn limits(&self) -> &Limits {
    &self.ctx.limits
  }

  pub fn config(&self) -> &RenderConfig {
    &self.ctx.config
  }

  pub fn driver_info(&self) -> &DriverInfo {
    &self.driver_info
  }

  pub fn prepared(&self) -> &PreparedObjects {
    &self.ctx.prepared
  }

  /// Make the backend's context current on the calling thread.
  ///
  /// Cached binding state is dropped: another user of the context may have changed it.
  pub fn make_current(&mut self) -> bool {
    if !unsafe { self.ctx.backend.make_current() } {
      error!("cannot make the rendering context current");
      return false;
    }

    self.ctx.state.invalidate();
    true
  }

  pub fn begin_frame(&mut self) -> bool {
    self.ctx.begin_frame()
  }

  pub fn end_frame(&mut self) {
    self.ctx.end_frame();
  }

  pub fn current_properties(&self) -> Option<&FrameBufferProperties> {
    self.ctx.current_properties()
  }

  pub fn set_current_properties(&mut self, properties: Option<FrameBufferProperties>) {
    self.ctx.set_current_properties(properties);
  }

  pub fn supports_framebuffer_object(&self) -> bool {
    self.ctx.caps.contains(Capabilities::FRAMEBUFFER_OBJECT)
  }

  pub fn supports_framebuffer_multisample(&self) -> bool {
    self.ctx.caps.contains(Capabilities::FRAMEBUFFER_MULTISAMPLE)
  }

  pub fn supports_framebuffer_blit(&self) -> bool {
    self.ctx.caps.contains(Capabilities::FRAMEBUFFER_BLIT)
  }

  pub fn supports_depth_stencil(&self) -> bool {
    self.ctx.caps.contains(Capabilities::DEPTH_STENCIL)
  }

  pub fn supports_bindless_texture(&self) -> bool {
    self.ctx.caps.contains(Capabilities::BINDLESS_TEXTURE)
  }

  pub fn supports_compute_shaders(&self) -> bool {
    self.ctx.caps.contains(Capabilities::COMPUTE_SHADERS)
  }

  pub fn supports_geometry_shaders(&self) -> bool {
    self.ctx.caps.contains(Capabilities::GEOMETRY_SHADERS)
  }

  pub fn supports_tessellation_shaders(&self) -> bool {
    self.ctx.caps.contains(Capabilities::TESSELLATION_SHADERS)
  }

  pub fn supports_image_load_store(&self) -> bool {
    self.ctx.caps.contains(Capabilities::IMAGE_LOAD_STORE)
  }

  pub fn supports_sampler_objects(&self) -> bool {
    self.ctx.caps.contains(Capabilities::SAMPLER_OBJECTS)
  }

  pub fn supports_generate_mipmap(&self) -> bool {
    self.ctx.caps.contains(Capabilities::GENERATE_MIPMAP)
  }

  pub fn supports_srgb_framebuffer(&self) -> bool {
    self.ctx.caps.contains(Capabilities::SRGB_FRAMEBUFFER)
  }

  /// Whether a buffer got multisample bitplanes on this device.
  pub fn supports_multisample(&self) -> bool {
    self.ctx.caps.contains(Capabilities::MULTISAMPLE)
  }

  pub fn prepare_texture(&mut self, texture: &Texture) -> TextureKey {
    self.ctx.prepare_texture(texture)
  }

  pub fn release_texture(&mut self, key: TextureKey) -> bool {
    self.ctx.release_texture(key)
  }

  /// Upload `texture` if its context is stale. Returns `false` if the upload failed.
  pub fn update_texture(&mut self, texture: &Texture) -> bool {
    let key = self.ctx.prepare_texture(texture);
    self.ctx.update_texture(key, texture)
  }

  pub fn prepare_sampler(&mut self, state: &SamplerState) -> SamplerKey {
    self.ctx.prepare_sampler(state)
  }

  pub fn release_sampler(&mut self, key: SamplerKey) -> bool {
    self.ctx.release_sampler(key)
  }

  pub fn prepare_vertex_buffer(&mut self, array: &GeomVertexArrayData) -> VertexBufferKey {
    self.ctx.prepare_vertex_buffer(array)
  }

  pub fn release_vertex_buffer(&mut self, key: VertexBufferKey) -> bool {
    self.ctx.release_vertex_buffer(key)
  }

  pub fn prepare_index_buffer(&mut self, indices: &IndexData) -> IndexBufferKey {
    self.ctx.prepare_index_buffer(indices)
  }

  pub fn release_index_buffer(&mut self, key: IndexBufferKey) -> bool {
    self.ctx.release_index_buffer(key)
  }

  pub fn prepare_geom(&mut self, geom: &Geom) -> GeomKey {
    self.ctx.prepare_geom(geom)
  }

  pub fn release_geom(&mut self, key: GeomKey) -> bool {
    self.ctx.release_geom(key)
  }

  /// Compile `shader` if it is not already. Returns `false` if it cannot be used.
  ///
  /// A shader failing to compile gets its error flag set and is never compiled again.
  pub fn prepare_shader(&mut self, shader: &Shader) -> bool {
    if shader.error_flag() {
      return false;
    }

    if let Some(sc) = self.shaders.get(&shader.id()) {
      if sc.is_valid() {
        return true;
      }
    }

    // an invalid context lost an input; start over from the sources
    self.forget_shader(shader.id());
    if let Some(mut sc) = self.shaders.remove(&shader.id()) {
      debug!("rebuilding shader {}", shader.name());
      sc.release(&mut self.ctx);
    }

    match ShaderContext::new(&mut self.ctx, shader) {
      Ok(sc) => {
        self.shaders.insert(shader.id(), sc);
        true
      }

      Err(e) => {
        error!("cannot compile shader {}: {}", shader.name(), e);
        shader.set_error_flag();
        false
      }
    }
  }

  /// Delete the program of a shader. Returns whether it was prepared.
  pub fn release_shader(&mut self, id: ShaderId) -> bool {
    self.forget_shader(id);

    match self.shaders.remove(&id) {
      Some(mut sc) => {
        sc.release(&mut self.ctx);
        true
      }

      None => false,
    }
  }

  pub fn shader_context(&self, id: ShaderId) -> Option<&ShaderContext> {
    self.shaders.get(&id)
  }

  pub fn current_shader(&self) -> Option<ShaderId> {
    self.current_shader
  }

  // undo what the context of `id` bound and stop tracking it as current
  fn forget_shader(&mut self, id: ShaderId) {
    let sc = self.shaders.get(&id);

    if self.current_shader == Some(id) {
      self.current_shader = None;
      if let Some(sc) = sc {
        sc.disable_texture_bindings(&mut self.ctx);
      }
    }

    if self.vertex_arrays_shader == Some(id) {
      self.vertex_arrays_shader = None;
      if let Some(sc) = sc {
        sc.disable_vertex_arrays(&mut self.ctx);
      }
    }
  }

  /// Evict the data of one context. See [`DrawContext::evict`].
  pub fn evict_lru(&mut self, key: ResourceKey) -> bool {
    self.ctx.evict(key)
  }

  /// Evict least recently used contexts until `limit` bytes are resident.
  pub fn shrink_to(&mut self, limit: usize) -> usize {
    self.ctx.shrink_to(limit)
  }

  pub fn evict_all(&mut self) -> usize {
    self.ctx.evict_all()
  }

  /// A handle other threads can queue eviction requests with.
  pub fn eviction_handle(&self) -> EvictionHandle {
    self.ctx.eviction_handle.clone()
  }

  pub fn resident_bytes(&self) -> usize {
    self.ctx.resident_bytes()
  }

  pub fn issue_memory_barrier(&mut self, barriers: MemoryBarrier) {
    self.ctx.issue_memory_barrier(barriers);
  }

  pub fn bind_fbo(&mut self, handle: u32) {
    self.ctx.bind_fbo(handle);
  }

  /// Log pending driver errors. Returns how many were found.
  pub fn report_my_gl_errors(&mut self) -> usize {
    self.ctx.report_errors()
  }

  /// Apply a render state: make its shader current and push every parameter depending on
  /// `altered`.
  ///
  /// Every parameter is pushed when the shader changes. Returns `false` if the shader cannot be
  /// used; nothing drawn afterwards is shaded until a usable state is set.
  pub fn set_state_and_transform(
    &mut self,
    state: &RenderState,
    transforms: &dyn TransformSource,
    altered: StateDeps,
  ) -> bool {
    let shader = match state.shader {
      Some(ref shader) => shader,
      None => {
        self.unbind_shader();
        return true;
      }
    };

    if !self.prepare_shader(shader) {
      self.unbind_shader();
      return false;
    }

    let id = shader.id();
    let mut altered = altered;

    if self.current_shader != Some(id) {
      self.unbind_shader();

      let sc = match self.shaders.get(&id) {
        Some(sc) => sc,
        None => return false,
      };

      unsafe {
        self
          .ctx
          .state
          .use_program(&mut self.ctx.backend, sc.program(), Bind::Cached)
      };

      self.current_shader = Some(id);
      altered = StateDeps::all();
    }

    let sc = match self.shaders.get_mut(&id) {
      Some(sc) => sc,
      None => return false,
    };

    if !sc.issue_parameters(&mut self.ctx, state, transforms, altered) {
      warn!("shader {} lost its parameters", shader.name());
      self.forget_shader(id);
      return false;
    }

    if altered.intersects(StateDeps::TEXTURE | StateDeps::SHADER_INPUTS)
      && !sc.update_texture_bindings(&mut self.ctx, state)
    {
      self.forget_shader(id);
      return false;
    }

    true
  }

  // stop using the current program
  fn unbind_shader(&mut self) {
    if let Some(id) = self.current_shader.take() {
      if let Some(sc) = self.shaders.get(&id) {
        sc.disable_texture_bindings(&mut self.ctx);
      }
    }

    if let Some(id) = self.vertex_arrays_shader.take() {
      if let Some(sc) = self.shaders.get(&id) {
        sc.disable_vertex_arrays(&mut self.ctx);
      }
    }

    unsafe { self.ctx.state.use_program(&mut self.ctx.backend, 0, Bind::Cached) };
  }

  /// Draw `geom` with the current shader.
  pub fn draw_geom(&mut self, geom: &Geom) -> bool {
    let id = match self.current_shader {
      Some(id) => id,
      None => {
        error!("no shader to draw geom {} with", geom.id());
        return false;
      }
    };

    let sc = match self.shaders.get(&id) {
      Some(sc) => sc,
      None => return false,
    };

    self.ctx.bind_geom(geom);

    if !sc.update_vertex_arrays(&mut self.ctx, geom) {
      return false;
    }

    self.vertex_arrays_shader = Some(id);

    match geom.indices() {
      Some(indices) => {
        if self.ctx.apply_index_buffer(indices).is_none() {
          return false;
        }

        unsafe {
          self.ctx.backend.draw_elements(
            geom.primitive(),
            indices.num_indices(),
            indices.index_type(),
            0,
          )
        };
      }

      None => unsafe {
        self
          .ctx
          .backend
          .draw_arrays(geom.primitive(), 0, geom.vertex_data().num_rows())
      },
    }

    true
  }

  /// Register an offscreen buffer. It is closed until [`open_buffer`](Self::open_buffer).
  pub fn make_buffer(&mut self, buffer: GraphicsBuffer) -> BufferId {
    debug!("new buffer {}", buffer.name());
    self.buffers.insert(buffer)
  }

  pub fn buffer(&self, id: BufferId) -> Option<&GraphicsBuffer> {
    self.buffers.get(id)
  }

  pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut GraphicsBuffer> {
    self.buffers.get_mut(id)
  }

  pub fn buffers(&self) -> impl Iterator<Item = (BufferId, &GraphicsBuffer)> {
    self.buffers.iter()
  }

  pub fn open_buffer(&mut self, id: BufferId) -> bool {
    match self.buffers.get_mut(id) {
      Some(buffer) => buffer.open(&mut self.ctx),
      None => false,
    }
  }

  /// Close a buffer, severing every depth-sharing link it is part of.
  pub fn close_buffer(&mut self, id: BufferId) {
    depth_sharing::sever(&mut self.buffers, id);

    if let Some(buffer) = self.buffers.get_mut(id) {
      buffer.close(&mut self.ctx);
    }
  }

  /// Close and forget a buffer.
  pub fn remove_buffer(&mut self, id: BufferId) -> Option<GraphicsBuffer> {
    self.close_buffer(id);
    self.buffers.remove(id)
  }

  /// Begin a frame on a buffer. Returns `false` if nothing must be rendered to it.
  pub fn begin_buffer_frame(&mut self, id: BufferId, mode: FrameMode) -> bool {
    let host_lost = match self.buffers.get(id) {
      Some(buffer) => buffer.host_lost(),
      None => return false,
    };

    if host_lost {
      info!("host of buffer {:?} went away; closing it", id);
      self.close_buffer(id);

      if let Some(buffer) = self.buffers.get_mut(id) {
        buffer.drop_host();
      }

      return false;
    }

    let shared = depth_sharing::shared_depth(&self.buffers, id);

    let (began, depth_changed) = match self.buffers.get_mut(id) {
      Some(buffer) => {
        let before = depth_sharing::owned_depth(buffer);
        let began = buffer.begin_frame(&mut self.ctx, mode, shared.as_ref());
        (began, depth_sharing::owned_depth(buffer) != before)
      }

      None => return false,
    };

    // sharers still attach the renderbuffers this buffer just replaced
    if depth_changed {
      let marked = depth_sharing::invalidate_dependents(&mut self.buffers, id);
      if marked > 0 {
        debug!("depth planes of {:?} changed; rebuilding {} sharers", id, marked);
      }
    }

    began
  }

  /// End the frame of a buffer.
  pub fn end_buffer_frame(&mut self, id: BufferId, mode: FrameMode) {
    let depth_writer = depth_sharing::is_depth_writer(&self.buffers, id);

    if let Some(buffer) = self.buffers.get_mut(id) {
      buffer.end_frame(&mut self.ctx, mode, depth_writer);
    }
  }

  /// Render into face `face` of the cube maps bound to a buffer.
  pub fn select_cube_map(&mut self, id: BufferId, face: usize) {
    let depth_writer = depth_sharing::is_depth_writer(&self.buffers, id);

    if let Some(buffer) = self.buffers.get_mut(id) {
      buffer.select_cube_map(&mut self.ctx, face, depth_writer);
    }
  }

  /// Clear the planes of a buffer that have a clear value.
  pub fn clear_buffer(&mut self, id: BufferId) {
    if let Some(buffer) = self.buffers.get_mut(id) {
      buffer.clear(&mut self.ctx);
    }
  }

  /// Make buffer `id` render with the depth plane of `other`.
  ///
  /// Returns `false`, changing nothing, if the buffers cannot share.
  pub fn share_depth_buffer(&mut self, id: BufferId, other: BufferId) -> bool {
    match depth_sharing::share(&mut self.buffers, id, other) {
      Ok(()) => true,

      Err(e) => {
        error!("cannot share depth buffer: {}", e);
        false
      }
    }
  }

  /// Give buffer `id` its own depth plane back. Returns whether it was sharing.
  pub fn unshare_depth_buffer(&mut self, id: BufferId) -> bool {
    depth_sharing::unshare(&mut self.buffers, id)
  }
}
