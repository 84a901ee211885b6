//! Offscreen buffers.
//!
//! A [`GraphicsBuffer`] renders into framebuffer objects. Its bitplanes are either textures the
//! application asked to render into, or renderbuffers the buffer allocates itself. The
//! framebuffer objects are (re)built lazily, at the beginning of the first frame following a
//! change (opening, resizing, a new set of render textures, a depth-sharing change).
//!
//! Buffers live in the guardian's arena and refer to each other by [`BufferId`] only, which is
//! what depth-buffer sharing uses: a buffer can render with the depth renderbuffer of another one
//! of the same size. See [`depth_sharing`].
//!
//! Lifecycle:
//!
//! ```text
//! Closed --open--> Open(Dirty) --rebuild--> Open(Clean)
//!                       ^                        |
//!                       +----- resize, share ----+
//! Open(_) --close--> Closed
//! ```

mod bitplanes;
pub mod depth_sharing;

use log::{debug, info, warn};
use slotmap::new_key_type;
use std::fmt;

use crate::backend::framebuffer::{Attachment, BitplaneSizes, BlitMask, ClearValues};
use crate::backend::texture::{MemoryBarrier, TextureTarget};
use crate::backend::Backend;
use crate::capabilities::{Capabilities, Limits};
use crate::config::RenderConfig;
use crate::context::DrawContext;
use crate::fb_props::FrameBufferProperties;
use crate::host::{FrameMode, HostSurface};
use crate::prepared::TextureKey;
use crate::render_texture::{RenderTexture, RenderTextureMode, RenderTexturePlane, RTP_COUNT};
use crate::texture::Texture;

use self::depth_sharing::SharedDepth;

new_key_type! {
  /// Key of a [`GraphicsBuffer`] in the guardian's arena.
  pub struct BufferId;
}

/// Whether the framebuffer objects match the buffer's settings.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RebuildState {
  Clean,
  Dirty,
  Rebuilding,
}

/// Lifecycle state of a buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BufferState {
  Closed,
  Open(RebuildState),
}

// a texture attached to one of the framebuffer objects
#[derive(Clone, Copy, Debug)]
struct AttachedTexture {
  key: TextureKey,
  handle: u32,
  target: TextureTarget,
  mipmaps: bool,
}

/// An offscreen render target.
pub struct GraphicsBuffer {
  name: String,
  sort: i32,
  size: [u32; 2],
  requested: FrameBufferProperties,
  fb_properties: FrameBufferProperties,
  host: Option<Box<dyn HostSurface>>,
  track_host_size: bool,
  state: BufferState,

  textures: Vec<RenderTexture>,
  textures_seq: u64,
  built_textures_seq: Option<u64>,

  clear_colors: [Option<[f32; 4]>; RTP_COUNT],
  clear_depth: Option<f32>,
  clear_stencil: Option<u32>,

  // framebuffer objects; one per cube map face
  fbos: Vec<u32>,
  fbo_multisample: u32,
  rb: [u32; RTP_COUNT],
  rb_sizes: [BitplaneSizes; RTP_COUNT],
  rb_bytes: [usize; RTP_COUNT],
  rbm: [u32; RTP_COUNT],
  rbm_bytes: [usize; RTP_COUNT],
  // allocated size; may be padded past `size`
  rb_size: [u32; 2],
  // bytes currently accounted in the draw context
  memory: usize,
  requested_multisamples: u32,
  requested_coverage_samples: u32,
  use_depth_stencil: bool,
  have_any_color: bool,
  initial_clear: bool,
  plane_attachments: [Option<Attachment>; RTP_COUNT],
  attachments: Vec<Attachment>,
  attached: Vec<AttachedTexture>,

  shared_depth: Option<BufferId>,
  depth_sharers: Vec<BufferId>,

  bound_face: Option<usize>,
  srgb_enabled: bool,
  flip_ready: bool,
}

impl fmt::Debug for GraphicsBuffer {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    f.debug_struct("GraphicsBuffer")
      .field("name", &self.name)
      .field("sort", &self.sort)
      .field("size", &self.size)
      .field("state", &self.state)
      .field("fb_properties", &self.fb_properties)
      .field("has_host", &self.host.is_some())
      .field("fbos", &self.fbos)
      .field("fbo_multisample", &self.fbo_multisample)
      .field("shared_depth", &self.shared_depth)
      .field("depth_sharers", &self.depth_sharers)
      .finish()
  }
}

impl GraphicsBuffer {
  pub fn new(
    name: impl Into<String>,
    size: [u32; 2],
    properties: FrameBufferProperties,
    sort: i32,
  ) -> Self {
    GraphicsBuffer {
      name: name.into(),
      sort,
      size,
      requested: properties,
      fb_properties: properties,
      host: None,
      track_host_size: false,
      state: BufferState::Closed,
      textures: Vec::new(),
      textures_seq: 0,
      built_textures_seq: None,
      clear_colors: [None; RTP_COUNT],
      clear_depth: None,
      clear_stencil: None,
      fbos: Vec::new(),
      fbo_multisample: 0,
      rb: [0; RTP_COUNT],
      rb_sizes: [BitplaneSizes::default(); RTP_COUNT],
      rb_bytes: [0; RTP_COUNT],
      rbm: [0; RTP_COUNT],
      rbm_bytes: [0; RTP_COUNT],
      rb_size: [0, 0],
      memory: 0,
      requested_multisamples: 0,
      requested_coverage_samples: 0,
      use_depth_stencil: false,
      have_any_color: false,
      initial_clear: true,
      plane_attachments: [None; RTP_COUNT],
      attachments: Vec::new(),
      attached: Vec::new(),
      shared_depth: None,
      depth_sharers: Vec::new(),
      bound_face: None,
      srgb_enabled: false,
      flip_ready: false,
    }
  }

  /// Host the buffer on a surface, optionally following its size.
  pub fn with_host(mut self, host: Box<dyn HostSurface>, track_host_size: bool) -> Self {
    self.host = Some(host);
    self.track_host_size = track_host_size;
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn sort(&self) -> i32 {
    self.sort
  }

  pub fn set_sort(&mut self, sort: i32) {
    self.sort = sort;
  }

  pub fn size(&self) -> [u32; 2] {
    self.size
  }

  pub fn x_size(&self) -> u32 {
    self.size[0]
  }

  pub fn y_size(&self) -> u32 {
    self.size[1]
  }

  /// Resize the buffer. The framebuffer objects are rebuilt at the next frame.
  pub fn set_size(&mut self, x: u32, y: u32) {
    if self.size != [x, y] {
      self.size = [x, y];
      self.mark_dirty();
    }
  }

  /// Allocated size of the bitplanes; the logical size, possibly padded to powers of two.
  pub fn bitplane_size(&self) -> [u32; 2] {
    self.rb_size
  }

  /// Properties as requested at creation.
  pub fn requested_properties(&self) -> &FrameBufferProperties {
    &self.requested
  }

  /// Properties the buffer provides.
  pub fn fb_properties(&self) -> &FrameBufferProperties {
    &self.fb_properties
  }

  pub fn state(&self) -> BufferState {
    self.state
  }

  pub fn is_valid(&self) -> bool {
    matches!(self.state, BufferState::Open(_))
  }

  /// Whether the framebuffer objects must be rebuilt before rendering.
  pub fn needs_rebuild(&self) -> bool {
    !matches!(self.state, BufferState::Open(RebuildState::Clean))
  }

  pub(crate) fn mark_dirty(&mut self) {
    if let BufferState::Open(ref mut rebuild) = self.state {
      *rebuild = RebuildState::Dirty;
    }
  }

  pub fn has_host(&self) -> bool {
    self.host.is_some()
  }

  pub fn host(&self) -> Option<&dyn HostSurface> {
    self.host.as_deref()
  }

  /// Whether the buffer is hosted on a surface that went away.
  pub fn host_lost(&self) -> bool {
    self.host.as_ref().map_or(false, |host| !host.is_valid())
  }

  pub(crate) fn drop_host(&mut self) {
    self.host = None;
  }

  /// Request that `texture` receives the contents of `plane`.
  pub fn add_render_texture(
    &mut self,
    texture: Texture,
    plane: RenderTexturePlane,
    mode: RenderTextureMode,
  ) {
    self.textures.push(RenderTexture::new(texture, plane, mode));
    self.textures_seq += 1;
  }

  pub fn clear_render_textures(&mut self) {
    if !self.textures.is_empty() {
      self.textures.clear();
      self.textures_seq += 1;
    }
  }

  /// Render-to-texture requests, with the mode the buffer settled on for each.
  pub fn render_textures(&self) -> &[RenderTexture] {
    &self.textures
  }

  /// Clear color of a color plane. Returns `false` for depth planes.
  pub fn set_clear_color(
    &mut self,
    plane: RenderTexturePlane,
    color: Option<[f32; 4]>,
  ) -> bool {
    if plane.is_depth() {
      return false;
    }

    self.clear_colors[plane.index()] = color;
    true
  }

  pub fn clear_color(&self, plane: RenderTexturePlane) -> Option<[f32; 4]> {
    self.clear_colors[plane.index()]
  }

  pub fn set_clear_depth(&mut self, depth: Option<f32>) {
    self.clear_depth = depth;
  }

  pub fn set_clear_stencil(&mut self, stencil: Option<u32>) {
    self.clear_stencil = stencil;
  }

  pub fn is_any_clear_active(&self) -> bool {
    self.clear_colors.iter().any(Option::is_some)
      || self.clear_depth.is_some()
      || self.clear_stencil.is_some()
  }

  /// Buffer whose depth plane this buffer renders with.
  pub fn shared_depth_buffer(&self) -> Option<BufferId> {
    self.shared_depth
  }

  /// Buffers rendering with this buffer's depth plane.
  pub fn depth_sharers(&self) -> &[BufferId] {
    &self.depth_sharers
  }

  pub fn multisample_count(&self) -> u32 {
    self.fb_properties.multisamples
  }

  pub fn coverage_sample_count(&self) -> u32 {
    self.fb_properties.coverage_samples
  }

  /// FBO-backed buffers always render straight into textures.
  pub fn supports_render_texture(&self) -> bool {
    true
  }

  pub fn num_fbos(&self) -> usize {
    self.fbos.len()
  }

  pub fn fbo(&self, index: usize) -> Option<u32> {
    self.fbos.get(index).copied()
  }

  /// The multisample framebuffer object, if any.
  pub fn multisample_fbo(&self) -> Option<u32> {
    (self.fbo_multisample != 0).then(|| self.fbo_multisample)
  }

  /// Renderbuffer backing `plane`, if it is not a texture.
  pub fn renderbuffer(&self, plane: RenderTexturePlane) -> Option<u32> {
    let rb = self.rb[plane.index()];
    (rb != 0).then(|| rb)
  }

  /// Attachment `plane` was bound to at the last rebuild.
  pub fn plane_attachment(&self, plane: RenderTexturePlane) -> Option<Attachment> {
    self.plane_attachments[plane.index()]
  }

  /// Bytes of renderbuffer storage.
  pub fn framebuffer_memory(&self) -> usize {
    self.memory
  }

  /// Cube map face currently rendered to.
  pub fn bound_face(&self) -> Option<usize> {
    self.bound_face
  }

  /// Whether a frame was rendered and not yet flipped.
  pub fn is_flip_ready(&self) -> bool {
    self.flip_ready
  }

  /// Acknowledge the last rendered frame.
  pub fn end_flip(&mut self) {
    self.flip_ready = false;
  }

  /// Open the buffer, normalizing its properties to what the device will deliver.
  pub fn open<B>(&mut self, ctx: &mut DrawContext<B>) -> bool
  where
    B: Backend,
  {
    if self.is_valid() {
      return true;
    }

    if self.host_lost() {
      warn!("{}: cannot open on a closed host", self.name);
      return false;
    }

    if !ctx.caps.contains(Capabilities::FRAMEBUFFER_OBJECT) {
      info!("{}: framebuffer objects unsupported", self.name);
      return false;
    }

    let properties = normalize_properties(&self.requested, ctx.caps, &ctx.limits, &ctx.config);
    debug!("{}: opened with {}", self.name, properties);

    self.fb_properties = properties;
    self.requested_multisamples = properties.multisamples;
    self.requested_coverage_samples = properties.coverage_samples;
    self.initial_clear = true;
    self.built_textures_seq = None;
    self.state = BufferState::Open(RebuildState::Dirty);

    true
  }

  /// Release every framebuffer object and renderbuffer.
  ///
  /// Depth-sharing links must be severed by the caller, which owns the other buffers.
  pub(crate) fn close<B>(&mut self, ctx: &mut DrawContext<B>)
  where
    B: Backend,
  {
    if self.state == BufferState::Closed {
      return;
    }

    self.release_bitplanes(ctx);
    self.bound_face = None;
    self.state = BufferState::Closed;
    debug!("{}: closed", self.name);
  }

  /// Prepare the buffer for rendering.
  ///
  /// Returns `false` if the frame must be skipped.
  pub(crate) fn begin_frame<B>(
    &mut self,
    ctx: &mut DrawContext<B>,
    mode: FrameMode,
    shared: Option<&SharedDepth>,
  ) -> bool
  where
    B: Backend,
  {
    if !self.is_valid() {
      return false;
    }

    self.bound_face = None;

    let ready = match self.host {
      Some(ref mut host) => host.begin_frame(FrameMode::Parasite),
      None => ctx.begin_frame(),
    };

    if !ready {
      return false;
    }

    match mode {
      FrameMode::Render => {
        if self.built_textures_seq != Some(self.textures_seq) || self.attachments_lost(ctx) {
          self.mark_dirty();
        }

        if self.track_host_size {
          if let Some(size) = self.host.as_ref().map(|host| host.size()) {
            if size != self.size {
              self.mark_dirty();
            }
          }
        }

        if !self.rebuild_bitplanes(ctx, shared) {
          return false;
        }

        self.touch_attached(ctx);

        // image stores into attached textures must land before the framebuffer is written
        if self.fbo_multisample == 0
          && self.any_attached_needs_barrier(ctx, MemoryBarrier::FRAMEBUFFER)
        {
          ctx.issue_memory_barrier(MemoryBarrier::FRAMEBUFFER);
        }
      }

      FrameMode::Refresh | FrameMode::Parasite => {
        self.rebuild_bitplanes(ctx, shared);
      }
    }

    if self.fb_properties.srgb_color && ctx.caps.contains(Capabilities::SRGB_FRAMEBUFFER) {
      unsafe { ctx.state.set_srgb_framebuffer(&mut ctx.backend, true) };
      self.srgb_enabled = true;
    }

    ctx.current_properties = Some(self.fb_properties);
    true
  }

  /// Finish a frame: resolve, copy to textures, unbind, generate mipmaps, then hand over to the
  /// host and flag the frame as ready to flip.
  ///
  /// `depth_writer` tells whether this buffer is the one resolving the shared depth plane.
  pub(crate) fn end_frame<B>(
    &mut self,
    ctx: &mut DrawContext<B>,
    mode: FrameMode,
    depth_writer: bool,
  ) where
    B: Backend,
  {
    if !self.is_valid() {
      return;
    }

    if self.requested_multisamples > 0 && self.fbo_multisample != 0 {
      self.resolve_multisamples(ctx, depth_writer);
    }

    if mode == FrameMode::Render {
      self.copy_to_textures(ctx, self.bound_face.unwrap_or(0));
    }

    ctx.bind_fbo(0);
    self.bound_face = None;

    if self.srgb_enabled {
      unsafe { ctx.state.set_srgb_framebuffer(&mut ctx.backend, false) };
      self.srgb_enabled = false;
    }

    if mode == FrameMode::Render {
      self.generate_mipmaps(ctx);
    }

    match self.host {
      Some(ref mut host) => host.end_frame(FrameMode::Parasite),
      None => ctx.end_frame(),
    }

    if mode == FrameMode::Render {
      self.flip_ready = true;
    }

    ctx.report_errors();
  }

  /// Render into face `face` of the cube maps attached to the buffer.
  pub(crate) fn select_cube_map<B>(
    &mut self,
    ctx: &mut DrawContext<B>,
    face: usize,
    depth_writer: bool,
  ) where
    B: Backend,
  {
    if face >= self.fbos.len() {
      warn!(
        "{}: no face {} to select; {} framebuffer object(s)",
        self.name,
        face,
        self.fbos.len()
      );
      return;
    }

    if self.bound_face == Some(face) {
      return;
    }

    if let Some(previous) = self.bound_face {
      if self.requested_multisamples > 0 && self.fbo_multisample != 0 {
        self.resolve_multisamples(ctx, depth_writer);
      }

      self.copy_to_textures(ctx, previous);
    }

    if self.fbo_multisample == 0 {
      ctx.bind_fbo(self.fbos[face]);
    } else {
      ctx.bind_fbo(self.fbo_multisample);
    }

    self.bound_face = Some(face);
  }

  /// Clear the planes that have a clear value.
  pub(crate) fn clear<B>(&mut self, ctx: &mut DrawContext<B>)
  where
    B: Backend,
  {
    if !self.is_valid() || !self.is_any_clear_active() {
      return;
    }

    let mut values = ClearValues {
      mask: BlitMask::empty(),
      ..ClearValues::default()
    };

    if ctx.caps.contains(Capabilities::CLEAR_BUFFER) {
      for (index, color) in self.clear_colors.iter().enumerate() {
        if let (Some(color), Some(Attachment::Color(i))) = (color, self.plane_attachments[index]) {
          unsafe { ctx.backend.clear_color_attachment(i, *color) };
        }
      }
    } else if let Some(color) = self.clear_colors[RenderTexturePlane::Color.index()] {
      values.mask |= BlitMask::COLOR;
      values.color = color;
    }

    if let Some(depth) = self.clear_depth {
      values.mask |= BlitMask::DEPTH;
      values.depth = depth;
    }

    if let Some(stencil) = self.clear_stencil {
      values.mask |= BlitMask::STENCIL;
      values.stencil = stencil;
    }

    if !values.mask.is_empty() {
      unsafe { ctx.backend.clear(&values) };
    }
  }

  // whether an attached texture lost its storage since the last rebuild
  fn attachments_lost<B>(&self, ctx: &DrawContext<B>) -> bool {
    self.attached.iter().any(|attached| {
      ctx
        .prepared
        .texture(attached.key)
        .map_or(true, |tc| tc.handle != attached.handle || tc.uploaded_shape.is_none())
    })
  }

  fn touch_attached<B>(&self, ctx: &mut DrawContext<B>)
  where
    B: Backend,
  {
    for attached in &self.attached {
      ctx.touch_texture(attached.key);
    }
  }

  fn any_attached_needs_barrier<B>(&self, ctx: &DrawContext<B>, barrier: MemoryBarrier) -> bool {
    self.attached.iter().any(|attached| {
      ctx
        .prepared
        .texture(attached.key)
        .map_or(false, |tc| tc.needs_barrier(barrier))
    })
  }
}

/// Normalize requested properties to what a framebuffer object delivers on this device.
pub fn normalize_properties(
  requested: &FrameBufferProperties,
  caps: Capabilities,
  limits: &Limits,
  config: &RenderConfig,
) -> FrameBufferProperties {
  let mut props = *requested;

  // asking for rgb color is enough to get a color plane
  if props.color_bits == 0 && props.rgb_color {
    props.color_bits = 1;
    props.red_bits = 1;
    props.green_bits = 1;
    props.blue_bits = 1;
  }

  if config.force_fbo_color && props.color_bits == 0 {
    props.color_bits = 1;
  }

  props.depth_bits = match props.depth_bits {
    0 => 0,
    1..=16 => 16,
    17..=24 => 24,
    _ => 32,
  };

  props.color_bits = props.color_bits.min(96);
  props.red_bits = props.red_bits.min(32);
  props.green_bits = props.green_bits.min(32);
  props.blue_bits = props.blue_bits.min(32);
  props.alpha_bits = props.alpha_bits.min(32);

  if props.float_depth {
    props.depth_bits = 32;
  }

  if props.color_bits > 16 * 3 {
    props.float_color = true;
  }

  if props.srgb_color {
    let alpha = if props.alpha_bits > 0 { 8 } else { 0 };
    props.set_rgba_bits(8, 8, 8, alpha);
    props.float_color = false;
  }

  if !caps.contains(Capabilities::DEPTH_STENCIL) {
    props.stencil_bits = 0;
  } else if props.stencil_bits > 0 {
    props.stencil_bits = 8;
    props.depth_bits = props.depth_bits.max(24);
  }

  props.accum_bits = 0;

  let blit = caps.contains(Capabilities::FRAMEBUFFER_BLIT);
  let mut samples = if caps.contains(Capabilities::FRAMEBUFFER_MULTISAMPLE) && blit {
    props.multisamples
  } else {
    0
  };

  if samples < config.multisample_usage_hint {
    samples = 0;
  }

  let mut coverage = 0;
  if caps.contains(Capabilities::FRAMEBUFFER_MULTISAMPLE_COVERAGE) && blit {
    // the extension only knows 4 or 8 color samples, with 8 or 16 coverage samples
    coverage = props.coverage_samples;

    if coverage > 0 && coverage <= 8 {
      samples = 4;
      coverage = 8;
    } else if coverage > 8 {
      samples = if samples < 8 { 4 } else { 8 };
      coverage = 16;
    }
  }

  samples = samples.min(limits.max_fb_samples);
  if samples == 0 {
    coverage = 0;
  }

  props.multisamples = samples;
  props.coverage_samples = coverage;

  props.aux_rgba = props.aux_rgba.min(FrameBufferProperties::MAX_AUX);
  props.aux_hrgba = props.aux_hrgba.min(FrameBufferProperties::MAX_AUX);
  props.aux_float = props.aux_float.min(FrameBufferProperties::MAX_AUX);

  let mut available = limits.max_color_targets;
  if 1 + props.aux_count() > available {
    if props.color_bits > 0 && available > 0 {
      available -= 1;
    }

    props.aux_rgba = props.aux_rgba.min(available);
    available -= props.aux_rgba;
    props.aux_hrgba = props.aux_hrgba.min(available);
    available -= props.aux_hrgba;
    props.aux_float = props.aux_float.min(available);
  }

  props.back_buffers = 0;
  props.rgb_color = true;

  props
}
