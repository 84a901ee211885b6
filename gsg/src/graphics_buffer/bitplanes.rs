//! Framebuffer objects and renderbuffers of a buffer.

use log::{debug, error, trace, warn};

use crate::backend::framebuffer::{
  Attachment, BitplaneSizes, BlitMask, ClearValues, FramebufferTarget, RenderbufferFormat, Samples,
};
use crate::backend::texture::{MemoryBarrier, TextureTarget};
use crate::backend::Backend;
use crate::capabilities::Capabilities;
use crate::config::AutoTextureScale;
use crate::context::DrawContext;
use crate::graphics_buffer::depth_sharing::SharedDepth;
use crate::graphics_buffer::{AttachedTexture, BufferState, GraphicsBuffer, RebuildState};
use crate::render_texture::{RenderTextureMode, RenderTexturePlane, RTP_COUNT};
use crate::state::Bind;
use crate::texture::{up_to_power_2, ComponentType, Format, Texture, TextureId, TextureType};

const CUBE_MAP_FACES: usize = 6;

// clear applied once to freshly built framebuffers
const INITIAL_CLEAR: ClearValues = ClearValues {
  mask: BlitMask::all(),
  color: [0., 0., 0., 1.],
  depth: 1.,
  stencil: 0,
};

// bytes of one pixel, from the bit depths an allocation reported
fn pixel_bytes(sizes: &BitplaneSizes) -> usize {
  let bits = sizes.red + sizes.green + sizes.blue + sizes.alpha + sizes.depth + sizes.stencil;
  (bits as usize + 7) / 8
}

impl GraphicsBuffer {
  /// Make the framebuffer objects match the buffer's settings, then bind the one to render to.
  ///
  /// Returns `false` if the buffer is not ready to render; it stays dirty and the next frame
  /// tries again.
  pub(crate) fn rebuild_bitplanes<B>(
    &mut self,
    ctx: &mut DrawContext<B>,
    shared: Option<&SharedDepth>,
  ) -> bool
  where
    B: Backend,
  {
    match self.state {
      BufferState::Closed => return false,

      BufferState::Open(RebuildState::Clean) => {
        let fbo = self
          .multisample_fbo()
          .or_else(|| self.fbos.first().copied())
          .unwrap_or(0);
        ctx.bind_fbo(fbo);
        return true;
      }

      BufferState::Open(_) => (),
    }

    self.state = BufferState::Open(RebuildState::Rebuilding);
    trace!("{}: rebuilding bitplanes", self.name);

    if self.track_host_size {
      if let Some(size) = self.host.as_ref().map(|host| host.size()) {
        self.size = size;
      }
    }

    let [mut width, mut height] = [self.size[0].max(1), self.size[1].max(1)];
    if ctx.config.textures_power_2 != AutoTextureScale::None {
      width = up_to_power_2(width);
      height = up_to_power_2(height);
    }

    let rb_resize = self.rb_size != [width, height];
    self.rb_size = [width, height];

    // sort the render-to-texture requests into planes; first come, first served
    let mut attach: [Option<Texture>; RTP_COUNT] = Default::default();
    let mut num_fbos = 1;

    for rt in &mut self.textures {
      if rt.mode != RenderTextureMode::BindOrCopy {
        continue;
      }

      let texture_type = rt.texture.texture_type();
      if texture_type != TextureType::Texture2D && texture_type != TextureType::CubeMap {
        debug!(
          "{}: cannot bind {:?} {}; copying instead",
          self.name,
          texture_type,
          rt.texture.name()
        );
        rt.mode = RenderTextureMode::CopyTexture;
        continue;
      }

      let slot = rt.plane.index();
      if attach[slot].is_some() {
        debug!(
          "{}: {:?} already has a texture; copying into {} instead",
          self.name,
          rt.plane,
          rt.texture.name()
        );
        rt.mode = RenderTextureMode::CopyTexture;
        continue;
      }

      if texture_type == TextureType::CubeMap {
        num_fbos = CUBE_MAP_FACES;
      }

      attach[slot] = Some(rt.texture.clone());
    }

    let ds = RenderTexturePlane::DepthStencil.index();
    let depth = RenderTexturePlane::Depth.index();
    let color = RenderTexturePlane::Color.index();

    // depth-stencil or plain depth; bound textures decide first, then a stencil request
    self.use_depth_stencil = false;
    if ctx.caps.contains(Capabilities::DEPTH_STENCIL) {
      let props = &self.fb_properties;
      self.use_depth_stencil = if attach[ds].is_some() {
        true
      } else if attach[depth].is_some() {
        false
      } else if props.stencil_bits > 0 {
        true
      } else if props.depth_bits > 24 || props.float_depth {
        false
      } else {
        props.depth_bits > 0 && ctx.config.prefer_depth_stencil
      };
    } else if attach[ds].is_some() && attach[depth].is_none() {
      attach.swap(ds, depth);
    }

    self.fb_properties.stencil_bits = if self.use_depth_stencil { 8 } else { 0 };

    if self.use_depth_stencil && attach[depth].is_some() {
      warn!(
        "{}: depth and depth-stencil planes cannot both be bound; dropping depth",
        self.name
      );
      attach[depth] = None;
    }

    let want_depth =
      self.use_depth_stencil || attach[depth].is_some() || self.fb_properties.depth_bits > 0;
    let want_color = attach[color].is_some() || self.fb_properties.color_bits > 0;
    let aux_planes = self.aux_planes();
    self.have_any_color = want_color || !aux_planes.is_empty();

    // framebuffer objects: one per cube map face
    while self.fbos.len() < num_fbos {
      let fbo = unsafe { ctx.backend.gen_framebuffer() };
      self.fbos.push(fbo);
    }

    while self.fbos.len() > num_fbos {
      if let Some(fbo) = self.fbos.pop() {
        unsafe {
          ctx.state.unbind_framebuffer(&mut ctx.backend, fbo);
          ctx.backend.delete_framebuffer(fbo);
        }
      }
    }

    self.attached.clear();
    self.plane_attachments = [None; RTP_COUNT];

    let previous_attachments = std::mem::take(&mut self.attachments);
    let mut allocated = [false; RTP_COUNT];
    let mut bound: Vec<TextureId> = Vec::new();

    for face in 0..num_fbos {
      ctx.bind_fbo(self.fbos[face]);
      let mut attachments = Vec::new();

      if self.use_depth_stencil {
        let plane = RenderTexturePlane::DepthStencil;
        self.bind_slot(
          ctx,
          face,
          &attach,
          plane,
          Attachment::DepthStencil,
          shared,
          &mut allocated,
          &mut bound,
        );
        attachments.push(Attachment::DepthStencil);
      } else if want_depth {
        let plane = RenderTexturePlane::Depth;
        self.bind_slot(
          ctx,
          face,
          &attach,
          plane,
          Attachment::Depth,
          shared,
          &mut allocated,
          &mut bound,
        );
        attachments.push(Attachment::Depth);
      }

      let mut next = 0;
      if want_color {
        let plane = RenderTexturePlane::Color;
        self.bind_slot(
          ctx,
          face,
          &attach,
          plane,
          Attachment::Color(next),
          shared,
          &mut allocated,
          &mut bound,
        );
        attachments.push(Attachment::Color(next));
        next += 1;
      }

      for &plane in &aux_planes {
        self.bind_slot(
          ctx,
          face,
          &attach,
          plane,
          Attachment::Color(next),
          shared,
          &mut allocated,
          &mut bound,
        );
        attachments.push(Attachment::Color(next));
        next += 1;
      }

      if self.have_any_color || want_depth {
        if self.initial_clear {
          unsafe { ctx.backend.clear(&INITIAL_CLEAR) };
        }
      } else if ctx.caps.contains(Capabilities::EMPTY_FRAMEBUFFER) {
        unsafe { ctx.backend.set_default_framebuffer_size(width, height) };
      } else {
        // some attachment is required; render into a throwaway color plane
        let plane = RenderTexturePlane::Color;
        self.bind_slot(
          ctx,
          face,
          &attach,
          plane,
          Attachment::Color(0),
          shared,
          &mut allocated,
          &mut bound,
        );
        attachments.push(Attachment::Color(0));
      }

      for attachment in &previous_attachments {
        if !attachments.contains(attachment) {
          unsafe { ctx.backend.detach(*attachment) };
        }
      }

      self.set_color_buffers(ctx);
      self.attachments = attachments;
    }

    // renderbuffers no plane uses anymore
    for slot in 0..RTP_COUNT {
      if !allocated[slot] && self.rb[slot] != 0 {
        unsafe { ctx.backend.delete_renderbuffer(self.rb[slot]) };
        self.rb[slot] = 0;
        self.rb_bytes[slot] = 0;
        self.rb_sizes[slot] = BitplaneSizes::default();
      }
    }

    if self.requested_multisamples > 0 {
      self.build_multisample(ctx, &attach, want_depth, want_color, &aux_planes, rb_resize);
    } else {
      self.release_multisample(ctx);
      unsafe { ctx.state.set_multisample(&mut ctx.backend, false) };
    }

    if !self.have_any_color {
      self.fb_properties.set_rgba_bits(0, 0, 0, 0);
    }

    self.update_memory(ctx);
    self.initial_clear = false;
    self.built_textures_seq = Some(self.textures_seq);

    // requests that did not make it into a plane are copied instead
    for rt in &mut self.textures {
      if rt.mode == RenderTextureMode::BindOrCopy && !bound.contains(&rt.texture.id()) {
        debug!(
          "{}: {:?} is not provided; copying into {} instead",
          self.name,
          rt.plane,
          rt.texture.name()
        );
        rt.mode = RenderTextureMode::CopyTexture;
      }
    }

    if !self.check_framebuffers(ctx) {
      return false;
    }

    let fbo = self
      .multisample_fbo()
      .or_else(|| self.fbos.first().copied())
      .unwrap_or(0);
    ctx.bind_fbo(fbo);

    self.state = BufferState::Open(RebuildState::Clean);
    debug!("{}: bitplanes rebuilt; {}", self.name, self.fb_properties);

    true
  }

  // auxiliary planes provided, in attachment order
  fn aux_planes(&self) -> Vec<RenderTexturePlane> {
    let props = &self.fb_properties;

    (0..props.aux_rgba as u8)
      .map(RenderTexturePlane::AuxRgba)
      .chain((0..props.aux_hrgba as u8).map(RenderTexturePlane::AuxHrgba))
      .chain((0..props.aux_float as u8).map(RenderTexturePlane::AuxFloat))
      .collect()
  }

  // draw into and read from the first color attachment, if any
  fn set_color_buffers<B>(&self, ctx: &mut DrawContext<B>)
  where
    B: Backend,
  {
    unsafe {
      if self.have_any_color {
        ctx.backend.set_draw_buffers(&[Attachment::Color(0)]);
        ctx.backend.set_read_buffer(Some(Attachment::Color(0)));
      } else {
        ctx.backend.set_draw_buffers(&[]);
        ctx.backend.set_read_buffer(None);
      }
    }
  }

  /// Attach a texture or a renderbuffer to a plane of the bound framebuffer object.
  #[allow(clippy::too_many_arguments)]
  fn bind_slot<B>(
    &mut self,
    ctx: &mut DrawContext<B>,
    face: usize,
    attach: &[Option<Texture>; RTP_COUNT],
    plane: RenderTexturePlane,
    attachment: Attachment,
    shared: Option<&SharedDepth>,
    allocated: &mut [bool; RTP_COUNT],
    bound: &mut Vec<TextureId>,
  ) where
    B: Backend,
  {
    let slot = plane.index();
    let [width, height] = self.rb_size;
    self.plane_attachments[slot] = Some(attachment);

    // a 2D texture only covers the first face
    let texture = attach[slot]
      .as_ref()
      .filter(|tex| (face as u32) < tex.z_size());

    if let Some(tex) = texture {
      tex.set_render_to_texture(true);
      tex.set_size(width, height, 1);
      tex.set_pad_size(
        width.saturating_sub(self.size[0]),
        height.saturating_sub(self.size[1]),
        0,
      );
      self.setup_plane_texture(plane, tex);

      let key = ctx.prepare_texture(tex);
      if !ctx.update_texture(key, tex) {
        error!("{}: cannot allocate {} for {:?}", self.name, tex.name(), plane);
        return;
      }

      let (handle, target) = match ctx.prepared.texture(key) {
        Some(tc) => (tc.handle, tc.target),
        None => return,
      };

      let attach_target = match target {
        TextureTarget::CubeMap => TextureTarget::CubeMapFace(face as u8),
        target => target,
      };

      debug!("{}: binding {} to {:?}", self.name, tex.name(), attachment);
      let sizes = unsafe { ctx.backend.attach_texture(attachment, handle, attach_target, 0) };
      self.update_properties(plane, attachment, &sizes);

      self.attached.push(AttachedTexture {
        key,
        handle,
        target,
        mipmaps: tex.uses_mipmaps(),
      });

      if !bound.contains(&tex.id()) {
        bound.push(tex.id());
      }

      return;
    }

    // the owner of a shared depth plane provides the renderbuffer
    if let Some((rb, sizes)) = shared.and_then(|shared| shared.get(plane)) {
      unsafe { ctx.backend.attach_renderbuffer(attachment, rb) };
      self.update_properties(plane, attachment, &sizes);
      return;
    } else if shared.is_some() && plane.is_depth() {
      debug!("{}: shared depth buffer has no {:?} plane", self.name, plane);
    }

    if !allocated[slot] {
      let mut format = self.renderbuffer_format(plane);

      if self.rb[slot] == 0 {
        self.rb[slot] = unsafe { ctx.backend.gen_renderbuffer() };
      }

      let rb = self.rb[slot];
      let mut sizes =
        unsafe { ctx.backend.renderbuffer_storage(rb, format, width, height, Samples::default()) };

      // 32-bit fixed-point depth is optional; 32-bit float is not
      if format == RenderbufferFormat::Depth32 && sizes.depth < 32 {
        format = RenderbufferFormat::Depth32F;
        sizes = unsafe {
          ctx
            .backend
            .renderbuffer_storage(rb, format, width, height, Samples::default())
        };
        sizes.float_depth = true;
      }

      trace!("{}: {:?} renderbuffer {} as {:?}", self.name, plane, rb, format);

      self.rb_sizes[slot] = sizes;
      self.rb_bytes[slot] = width as usize * height as usize * pixel_bytes(&sizes);
      allocated[slot] = true;
    }

    let sizes = self.rb_sizes[slot];
    unsafe { ctx.backend.attach_renderbuffer(attachment, self.rb[slot]) };
    self.update_properties(plane, attachment, &sizes);
  }

  // refine the advertised properties from what an attachment provides
  fn update_properties(
    &mut self,
    plane: RenderTexturePlane,
    attachment: Attachment,
    sizes: &BitplaneSizes,
  ) {
    match plane {
      RenderTexturePlane::DepthStencil => {
        self.fb_properties.update_depth(sizes);
        self.fb_properties.stencil_bits = sizes.stencil;
      }

      RenderTexturePlane::Depth => self.fb_properties.update_depth(sizes),

      _ if attachment == Attachment::Color(0) => self.fb_properties.update_color(sizes),

      _ => (),
    }
  }

  fn setup_plane_texture(&self, plane: RenderTexturePlane, tex: &Texture) {
    match plane {
      RenderTexturePlane::Depth => self.fb_properties.setup_depth_texture(tex),

      RenderTexturePlane::DepthStencil => {
        tex.set_format(Format::DepthStencil);

        if self.fb_properties.float_depth {
          tex.set_component_type(ComponentType::Float);
        } else {
          tex.set_component_type(ComponentType::UnsignedInt24_8);
        }
      }

      RenderTexturePlane::AuxHrgba(_) => {
        tex.set_format(Format::Rgba16);
        tex.set_component_type(ComponentType::HalfFloat);
      }

      RenderTexturePlane::AuxFloat(_) => {
        tex.set_format(Format::Rgba32);
        tex.set_component_type(ComponentType::Float);
      }

      RenderTexturePlane::Color | RenderTexturePlane::AuxRgba(_) => {
        self.fb_properties.setup_color_texture(tex)
      }
    }
  }

  fn renderbuffer_format(&self, plane: RenderTexturePlane) -> RenderbufferFormat {
    let props = &self.fb_properties;

    match plane {
      RenderTexturePlane::DepthStencil => {
        if props.depth_bits > 24 || props.float_depth {
          RenderbufferFormat::Depth32FStencil8
        } else {
          RenderbufferFormat::Depth24Stencil8
        }
      }

      RenderTexturePlane::Depth => {
        if props.float_depth {
          RenderbufferFormat::Depth32F
        } else if props.depth_bits > 24 {
          RenderbufferFormat::Depth32
        } else if props.depth_bits > 16 {
          RenderbufferFormat::Depth24
        } else {
          RenderbufferFormat::Depth16
        }
      }

      RenderTexturePlane::AuxRgba(_) => RenderbufferFormat::Rgba8,
      RenderTexturePlane::AuxHrgba(_) => RenderbufferFormat::Rgba16F,
      RenderTexturePlane::AuxFloat(_) => RenderbufferFormat::Rgba32F,

      RenderTexturePlane::Color => {
        let wide = props.color_bits > 16 * 3
          || props.red_bits > 16
          || props.green_bits > 16
          || props.blue_bits > 16;

        if props.alpha_bits == 0 {
          if props.srgb_color {
            RenderbufferFormat::Srgb8
          } else if wide {
            RenderbufferFormat::Rgb32F
          } else if props.float_color {
            RenderbufferFormat::Rgb16F
          } else if props.color_bits > 8 * 3 {
            RenderbufferFormat::Rgba16
          } else {
            RenderbufferFormat::Rgb8
          }
        } else if props.srgb_color {
          RenderbufferFormat::Srgb8Alpha8
        } else if props.color_bits > 16 * 3 {
          RenderbufferFormat::Rgba32F
        } else if props.float_color {
          RenderbufferFormat::Rgba16F
        } else if props.color_bits > 8 * 3 {
          RenderbufferFormat::Rgba16
        } else {
          RenderbufferFormat::Rgba8
        }
      }
    }
  }

  // format of a multisample renderbuffer
  fn multisample_format(
    &self,
    plane: RenderTexturePlane,
    texture: Option<&Texture>,
  ) -> RenderbufferFormat {
    let props = &self.fb_properties;

    match plane {
      RenderTexturePlane::DepthStencil => {
        if props.float_depth {
          RenderbufferFormat::Depth32FStencil8
        } else {
          RenderbufferFormat::Depth24Stencil8
        }
      }

      RenderTexturePlane::Depth => {
        if props.float_depth {
          return RenderbufferFormat::Depth32F;
        }

        match texture.map(Texture::format) {
          Some(Format::DepthComponent16) => RenderbufferFormat::Depth16,
          Some(Format::DepthComponent24) => RenderbufferFormat::Depth24,
          Some(Format::DepthComponent32) => RenderbufferFormat::Depth32,
          _ if props.depth_bits > 24 => RenderbufferFormat::Depth32,
          _ if props.depth_bits > 16 => RenderbufferFormat::Depth24,
          _ => RenderbufferFormat::Depth16,
        }
      }

      RenderTexturePlane::AuxHrgba(_) => RenderbufferFormat::Rgba16F,
      RenderTexturePlane::AuxFloat(_) => RenderbufferFormat::Rgba32F,

      RenderTexturePlane::Color | RenderTexturePlane::AuxRgba(_) => {
        if props.srgb_color {
          RenderbufferFormat::Srgb8Alpha8
        } else if props.float_color && props.color_bits > 16 * 3 {
          RenderbufferFormat::Rgba32F
        } else if props.float_color {
          RenderbufferFormat::Rgba16F
        } else {
          RenderbufferFormat::Rgba8
        }
      }
    }
  }

  // the multisample framebuffer object mirrors the plane set of the regular ones
  fn build_multisample<B>(
    &mut self,
    ctx: &mut DrawContext<B>,
    attach: &[Option<Texture>; RTP_COUNT],
    want_depth: bool,
    want_color: bool,
    aux_planes: &[RenderTexturePlane],
    rb_resize: bool,
  ) where
    B: Backend,
  {
    if self.fbo_multisample == 0 {
      self.fbo_multisample = unsafe { ctx.backend.gen_framebuffer() };
    }

    ctx.bind_fbo(self.fbo_multisample);

    let mut planes = Vec::new();
    if self.use_depth_stencil {
      planes.push((RenderTexturePlane::DepthStencil, Attachment::DepthStencil));
    } else if want_depth {
      planes.push((RenderTexturePlane::Depth, Attachment::Depth));
    }

    let mut next = 0;
    if want_color {
      planes.push((RenderTexturePlane::Color, Attachment::Color(next)));
      next += 1;
    }

    for &plane in aux_planes {
      planes.push((plane, Attachment::Color(next)));
      next += 1;
    }

    let samples = Samples {
      samples: self.requested_multisamples,
      coverage: self.requested_coverage_samples,
    };
    let [width, height] = self.rb_size;
    let mut used = [false; RTP_COUNT];

    for &(plane, attachment) in &planes {
      let slot = plane.index();
      used[slot] = true;

      if self.rbm[slot] != 0 && !rb_resize {
        continue;
      }

      if self.rbm[slot] != 0 {
        unsafe { ctx.backend.delete_renderbuffer(self.rbm[slot]) };
      }

      let format = self.multisample_format(plane, attach[slot].as_ref());
      let rb = unsafe { ctx.backend.gen_renderbuffer() };
      let sizes = unsafe { ctx.backend.renderbuffer_storage(rb, format, width, height, samples) };

      if sizes.samples != samples.samples {
        debug!(
          "{}: asked {} samples for {:?}, got {}",
          self.name, samples.samples, plane, sizes.samples
        );
      }

      unsafe { ctx.backend.attach_renderbuffer(attachment, rb) };

      self.rbm[slot] = rb;
      self.rbm_bytes[slot] = width as usize
        * height as usize
        * format.bytes_per_sample()
        * sizes.samples.max(1) as usize;
    }

    for slot in 0..RTP_COUNT {
      if !used[slot] && self.rbm[slot] != 0 {
        unsafe { ctx.backend.delete_renderbuffer(self.rbm[slot]) };
        self.rbm[slot] = 0;
        self.rbm_bytes[slot] = 0;
      }
    }

    self.set_color_buffers(ctx);
    unsafe { ctx.state.set_multisample(&mut ctx.backend, true) };

    if self.initial_clear {
      unsafe { ctx.backend.clear(&INITIAL_CLEAR) };
    }

    // antialiased rendering is now possible on this device
    ctx.caps |= Capabilities::MULTISAMPLE;
  }

  fn release_multisample<B>(&mut self, ctx: &mut DrawContext<B>)
  where
    B: Backend,
  {
    for slot in 0..RTP_COUNT {
      if self.rbm[slot] != 0 {
        unsafe { ctx.backend.delete_renderbuffer(self.rbm[slot]) };
        self.rbm[slot] = 0;
        self.rbm_bytes[slot] = 0;
      }
    }

    if self.fbo_multisample != 0 {
      unsafe {
        ctx.state.unbind_framebuffer(&mut ctx.backend, self.fbo_multisample);
        ctx.backend.delete_framebuffer(self.fbo_multisample);
      }

      self.fbo_multisample = 0;
    }
  }

  // account renderbuffer storage in the draw context
  fn update_memory<B>(&mut self, ctx: &mut DrawContext<B>) {
    let memory = self.rb_bytes.iter().sum::<usize>() + self.rbm_bytes.iter().sum::<usize>();
    ctx.framebuffer_memory = ctx.framebuffer_memory.saturating_sub(self.memory) + memory;
    self.memory = memory;
  }

  // completeness of every framebuffer object; the first failure is reported
  fn check_framebuffers<B>(&mut self, ctx: &mut DrawContext<B>) -> bool
  where
    B: Backend,
  {
    let fbos: Vec<u32> = self
      .fbos
      .iter()
      .copied()
      .chain(self.multisample_fbo())
      .collect();

    for fbo in fbos {
      ctx.bind_fbo(fbo);

      if let Err(reason) = unsafe { ctx.backend.framebuffer_status() } {
        error!("{}: framebuffer {} incomplete: {}", self.name, fbo, reason);
        ctx.bind_fbo(0);
        self.state = BufferState::Open(RebuildState::Dirty);
        return false;
      }
    }

    true
  }

  /// Delete every framebuffer object and renderbuffer.
  pub(crate) fn release_bitplanes<B>(&mut self, ctx: &mut DrawContext<B>)
  where
    B: Backend,
  {
    for slot in 0..RTP_COUNT {
      if self.rb[slot] != 0 {
        unsafe { ctx.backend.delete_renderbuffer(self.rb[slot]) };
        self.rb[slot] = 0;
      }

      self.rb_bytes[slot] = 0;
      self.rb_sizes[slot] = BitplaneSizes::default();
    }

    self.release_multisample(ctx);

    for fbo in self.fbos.drain(..) {
      unsafe {
        ctx.state.unbind_framebuffer(&mut ctx.backend, fbo);
        ctx.backend.delete_framebuffer(fbo);
      }
    }

    self.update_memory(ctx);
    self.rb_size = [0, 0];
    self.attached.clear();
    self.attachments.clear();
    self.plane_attachments = [None; RTP_COUNT];
  }

  /// Filter the multisample planes down into the framebuffer of the bound face.
  pub(crate) fn resolve_multisamples<B>(&mut self, ctx: &mut DrawContext<B>, depth_writer: bool)
  where
    B: Backend,
  {
    let fbo = match self.fbos.get(self.bound_face.unwrap_or(0)) {
      Some(&fbo) => fbo,
      None => return,
    };

    if ctx.config.enable_memory_barriers
      && self.any_attached_needs_barrier(ctx, MemoryBarrier::FRAMEBUFFER)
    {
      ctx.issue_memory_barrier(MemoryBarrier::FRAMEBUFFER);
    }

    unsafe {
      ctx
        .state
        .bind_framebuffer(&mut ctx.backend, FramebufferTarget::Draw, fbo, Bind::Cached);
      ctx.state.bind_framebuffer(
        &mut ctx.backend,
        FramebufferTarget::Read,
        self.fbo_multisample,
        Bind::Cached,
      );
    }

    let has_depth = self.rbm[RenderTexturePlane::DepthStencil.index()] != 0
      || self.rbm[RenderTexturePlane::Depth.index()] != 0;

    let mut mask = BlitMask::empty();
    if self.have_any_color {
      mask |= BlitMask::COLOR;
    }

    // a shared depth plane is resolved by a single member of the group
    if has_depth && depth_writer {
      mask |= BlitMask::DEPTH | BlitMask::STENCIL;
    }

    let [width, height] = self.rb_size;
    if !mask.is_empty() {
      unsafe { ctx.backend.blit_framebuffer(width, height, mask) };
    }

    // the remaining color planes, one at a time
    let color_attachments = self
      .attachments
      .iter()
      .filter(|attachment| matches!(attachment, Attachment::Color(i) if *i > 0))
      .copied()
      .collect::<Vec<_>>();

    for attachment in color_attachments {
      unsafe {
        ctx.backend.set_read_buffer(Some(attachment));
        ctx.backend.set_draw_buffers(&[attachment]);
        ctx.backend.blit_framebuffer(width, height, BlitMask::COLOR);
      }
    }

    self.set_color_buffers(ctx);
  }

  /// Copy the planes of copy-mode render textures out of the framebuffer of `face`.
  pub(crate) fn copy_to_textures<B>(&mut self, ctx: &mut DrawContext<B>, face: usize)
  where
    B: Backend,
  {
    let fbo = match self.fbos.get(face) {
      Some(&fbo) => fbo,
      None => return,
    };

    let [width, height] = self.size;
    let mut copied = false;

    for index in 0..self.textures.len() {
      let (texture, plane) = match self.textures.get(index) {
        Some(rt) if rt.mode == RenderTextureMode::CopyTexture => (rt.texture.clone(), rt.plane),
        _ => continue,
      };

      // a depth plane dropped in favor of depth-stencil is read from the latter
      let provided = match plane {
        RenderTexturePlane::Depth => self.plane_attachments[plane.index()]
          .or(self.plane_attachments[RenderTexturePlane::DepthStencil.index()]),
        _ => self.plane_attachments[plane.index()],
      };

      let source = match provided {
        Some(attachment) => attachment,
        None => {
          trace!("{}: no {:?} plane to copy into {}", self.name, plane, texture.name());
          continue;
        }
      };

      let face_target = match texture.texture_type() {
        TextureType::Texture2D => {
          texture.set_size(width, height, 1);
          None
        }

        TextureType::CubeMap => {
          texture.set_size(width, height, CUBE_MAP_FACES as u32);
          Some(TextureTarget::CubeMapFace(face as u8))
        }

        ty => {
          warn!("{}: cannot copy into {:?} {}", self.name, ty, texture.name());
          continue;
        }
      };

      self.setup_plane_texture(plane, &texture);

      let key = ctx.prepare_texture(&texture);
      if !ctx.update_texture(key, &texture) {
        continue;
      }

      let (handle, target) = match ctx.prepared.texture(key) {
        Some(tc) => (tc.handle, face_target.unwrap_or(tc.target)),
        None => continue,
      };

      unsafe {
        ctx
          .state
          .bind_framebuffer(&mut ctx.backend, FramebufferTarget::Read, fbo, Bind::Cached);

        if let Attachment::Color(_) = source {
          ctx.backend.set_read_buffer(Some(source));
        }

        ctx.backend.copy_to_texture(source, handle, target, width, height);
      }

      copied = true;
    }

    if copied && self.have_any_color {
      unsafe { ctx.backend.set_read_buffer(Some(Attachment::Color(0))) };
    }
  }

  /// Regenerate the mipmaps of attached textures that use them; once per attachment, so once per
  /// face of a cube map.
  pub(crate) fn generate_mipmaps<B>(&mut self, ctx: &mut DrawContext<B>)
  where
    B: Backend,
  {
    let config = &ctx.config;
    if config.ignore_mipmaps && !config.force_mipmaps {
      return;
    }

    if !ctx.caps.contains(Capabilities::GENERATE_MIPMAP) {
      return;
    }

    let force = config.force_mipmaps;
    for attached in &self.attached {
      if attached.mipmaps || force {
        unsafe { ctx.backend.generate_mipmap(attached.target, attached.handle) };
      }
    }
  }
}
