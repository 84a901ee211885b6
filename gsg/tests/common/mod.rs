//! Recording backend shared by the integration tests.
//!
//! Every call the guardian makes is appended to [`MockBackend::calls`]. Handles come from a single
//! counter, so every object of every kind gets a distinct, non-zero handle.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use gsg::backend::buffer::{AttribFormat, BufferBackend, BufferError, BufferTarget, LegacyArray};
use gsg::backend::framebuffer::{
  Attachment, BitplaneSizes, BlitMask, ClearValues, FramebufferBackend, FramebufferTarget,
  IncompleteReason, RenderbufferFormat, Samples,
};
use gsg::backend::query::{DriverError, QueryBackend};
use gsg::backend::shader::{
  ActiveParameter, ParamType, ProgramError, ShaderBackend, StageSource, UniformData,
};
use gsg::backend::texture::{
  ImageAccess, MemoryBarrier, TextureBackend, TextureError, TextureTarget, TextureUpload,
};
use gsg::capabilities::{Capabilities, DriverInfo, Limits};
use gsg::config::RenderConfig;
use gsg::fb_props::FrameBufferProperties;
use gsg::geom::{IndexType, PrimitiveType, UsageHint};
use gsg::host::{FrameMode, HostSurface};
use gsg::texture::{texel_size, ComponentType, Format, SamplerState};
use gsg::GraphicsStateGuardian;

/// Uniform data, owned.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
  Float(u8, Vec<f32>),
  Double(u8, Vec<f64>),
  Int(u8, Vec<i32>),
  UInt(u8, Vec<u32>),
  FloatMatrix(u8, Vec<f32>),
  DoubleMatrix(u8, Vec<f64>),
  TextureHandle(u64),
}

impl<'a> From<UniformData<'a>> for UniformValue {
  fn from(data: UniformData<'a>) -> Self {
    match data {
      UniformData::Float(n, v) => UniformValue::Float(n, v.to_vec()),
      UniformData::Double(n, v) => UniformValue::Double(n, v.to_vec()),
      UniformData::Int(n, v) => UniformValue::Int(n, v.to_vec()),
      UniformData::UInt(n, v) => UniformValue::UInt(n, v.to_vec()),
      UniformData::FloatMatrix(n, v) => UniformValue::FloatMatrix(n, v.to_vec()),
      UniformData::DoubleMatrix(n, v) => UniformValue::DoubleMatrix(n, v.to_vec()),
      UniformData::TextureHandle(h) => UniformValue::TextureHandle(h),
    }
  }
}

/// A recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
  MakeCurrent,

  GenTexture(u32),
  DeleteTexture(u32),
  BindTexture {
    unit: u32,
    target: TextureTarget,
    texture: u32,
  },
  UploadTexture {
    texture: u32,
    target: TextureTarget,
    format: Format,
    size: [u32; 3],
    mipmaps: bool,
  },
  GenerateMipmap(TextureTarget, u32),
  MakeHandleResident(u64, bool),
  GenSampler(u32),
  DeleteSampler(u32),
  BindSampler(u32, u32),
  BindImage {
    unit: u32,
    texture: u32,
    access: ImageAccess,
  },
  MemoryBarrier(MemoryBarrier),

  GenFramebuffer(u32),
  DeleteFramebuffer(u32),
  BindFramebuffer(FramebufferTarget, u32),
  GenRenderbuffer(u32),
  DeleteRenderbuffer(u32),
  RenderbufferStorage {
    renderbuffer: u32,
    format: RenderbufferFormat,
    size: [u32; 2],
    samples: u32,
  },
  AttachRenderbuffer {
    framebuffer: u32,
    attachment: Attachment,
    renderbuffer: u32,
  },
  AttachTexture {
    framebuffer: u32,
    attachment: Attachment,
    texture: u32,
    target: TextureTarget,
  },
  Detach {
    framebuffer: u32,
    attachment: Attachment,
  },
  DrawBuffers {
    framebuffer: u32,
    buffers: Vec<Attachment>,
  },
  ReadBuffer {
    framebuffer: u32,
    buffer: Option<Attachment>,
  },
  DefaultFramebufferSize(u32, u32),
  Blit {
    draw: u32,
    read: u32,
    mask: BlitMask,
  },
  Clear {
    framebuffer: u32,
    mask: BlitMask,
  },
  ClearColorAttachment(u32, [f32; 4]),
  CopyToTexture {
    read: u32,
    source: Attachment,
    texture: u32,
    target: TextureTarget,
  },
  SrgbFramebuffer(bool),
  Multisample(bool),

  CompileProgram(u32),
  DeleteProgram(u32),
  UseProgram(u32),
  SetUniform(i32, UniformValue),

  GenBuffer(u32),
  DeleteBuffer(u32),
  BindBuffer(BufferTarget, u32),
  UploadBuffer(BufferTarget, usize),
  GenVertexArray(u32),
  DeleteVertexArray(u32),
  BindVertexArray(u32),
  EnableAttrib(u32),
  DisableAttrib(u32),
  AttribDefault(u32, [f32; 4]),
  DrawArrays(PrimitiveType, usize),
  DrawElements(PrimitiveType, usize, IndexType),
}

/// A backend that records what it is asked to do.
#[derive(Debug)]
pub struct MockBackend {
  pub caps: Capabilities,
  pub limits: Limits,
  pub calls: Vec<Call>,
  /// Reflected uniforms of every linked program.
  pub uniforms: Vec<ActiveParameter>,
  /// Reflected attributes of every linked program.
  pub attributes: Vec<ActiveParameter>,
  /// Completeness reported for every framebuffer.
  pub framebuffer_status: Result<(), IncompleteReason>,
  /// Link error returned by every compilation.
  pub link_error: Option<String>,
  /// Whether 32-bit fixed-point depth renderbuffers are only 24 bits deep.
  pub no_depth32: bool,
  /// Whether the context can be made current.
  pub context_lost: bool,
  pub errors: Vec<DriverError>,
  next_handle: u32,
  draw_framebuffer: u32,
  read_framebuffer: u32,
  texture_formats: HashMap<u32, (Format, ComponentType)>,
}

impl Default for MockBackend {
  fn default() -> Self {
    MockBackend {
      caps: full_caps(),
      limits: limits(),
      calls: Vec::new(),
      uniforms: Vec::new(),
      attributes: Vec::new(),
      framebuffer_status: Ok(()),
      link_error: None,
      no_depth32: false,
      context_lost: false,
      errors: Vec::new(),
      next_handle: 1,
      draw_framebuffer: 0,
      read_framebuffer: 0,
      texture_formats: HashMap::new(),
    }
  }
}

impl MockBackend {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_caps(mut self, caps: Capabilities) -> Self {
    self.caps = caps;
    self
  }

  pub fn with_uniforms(mut self, uniforms: Vec<ActiveParameter>) -> Self {
    self.uniforms = uniforms;
    self
  }

  pub fn with_attributes(mut self, attributes: Vec<ActiveParameter>) -> Self {
    self.attributes = attributes;
    self
  }

  fn handle(&mut self) -> u32 {
    let handle = self.next_handle;
    self.next_handle += 1;
    handle
  }

  /// Drain the call log.
  pub fn take_calls(&mut self) -> Vec<Call> {
    std::mem::take(&mut self.calls)
  }

  /// Blits recorded so far, as `(draw, read, mask)`.
  pub fn blits(&self) -> Vec<(u32, u32, BlitMask)> {
    self
      .calls
      .iter()
      .filter_map(|call| match *call {
        Call::Blit { draw, read, mask } => Some((draw, read, mask)),
        _ => None,
      })
      .collect()
  }

  /// Every value pushed to `location`, in order.
  pub fn uniform_values(&self, location: i32) -> Vec<UniformValue> {
    self
      .calls
      .iter()
      .filter_map(|call| match call {
        Call::SetUniform(loc, value) if *loc == location => Some(value.clone()),
        _ => None,
      })
      .collect()
  }

  pub fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
    self.calls.iter().filter(|call| f(call)).count()
  }

  pub fn draw_framebuffer(&self) -> u32 {
    self.draw_framebuffer
  }

  pub fn read_framebuffer(&self) -> u32 {
    self.read_framebuffer
  }
}

// bit depths of a texture image, from its format
fn texture_sizes(format: Format, component_type: ComponentType) -> BitplaneSizes {
  let float = matches!(component_type, ComponentType::Float | ComponentType::HalfFloat);
  let bits = match component_type {
    ComponentType::UnsignedByte => 8,
    ComponentType::UnsignedShort | ComponentType::HalfFloat => 16,
    _ => 32,
  };

  match format {
    Format::DepthStencil if float => depth_sizes(32, 8, true),
    Format::DepthStencil => depth_sizes(24, 8, false),
    Format::DepthComponent16 => depth_sizes(16, 0, false),
    Format::DepthComponent24 | Format::DepthComponent => depth_sizes(24, 0, false),
    Format::DepthComponent32 => depth_sizes(32, 0, float),
    Format::Srgb | Format::Rgb => color_sizes(8, 0, false),
    Format::Rgba8 | Format::SrgbAlpha => color_sizes(8, 8, false),
    Format::Rgba | Format::Rgba16 | Format::Rgba32 => color_sizes(bits, bits, float),
    Format::Red | Format::R32 | Format::R32i => BitplaneSizes {
      red: bits,
      float_color: float,
      ..Default::default()
    },
    Format::Rg => BitplaneSizes {
      red: bits,
      green: bits,
      float_color: float,
      ..Default::default()
    },
  }
}

fn color_sizes(bits: u32, alpha: u32, float: bool) -> BitplaneSizes {
  BitplaneSizes {
    red: bits,
    green: bits,
    blue: bits,
    alpha,
    float_color: float,
    ..Default::default()
  }
}

fn depth_sizes(depth: u32, stencil: u32, float: bool) -> BitplaneSizes {
  BitplaneSizes {
    depth,
    stencil,
    float_depth: float,
    ..Default::default()
  }
}

fn renderbuffer_sizes(format: RenderbufferFormat) -> BitplaneSizes {
  match format {
    RenderbufferFormat::Depth16 => depth_sizes(16, 0, false),
    RenderbufferFormat::Depth24 => depth_sizes(24, 0, false),
    RenderbufferFormat::Depth32 => depth_sizes(32, 0, false),
    RenderbufferFormat::Depth32F => depth_sizes(32, 0, true),
    RenderbufferFormat::Depth24Stencil8 => depth_sizes(24, 8, false),
    RenderbufferFormat::Depth32FStencil8 => depth_sizes(32, 8, true),
    RenderbufferFormat::Stencil8 => depth_sizes(0, 8, false),
    RenderbufferFormat::R8 => BitplaneSizes {
      red: 8,
      ..Default::default()
    },
    RenderbufferFormat::Rg8 => BitplaneSizes {
      red: 8,
      green: 8,
      ..Default::default()
    },
    RenderbufferFormat::Rgb8 | RenderbufferFormat::Srgb8 => color_sizes(8, 0, false),
    RenderbufferFormat::Rgba8 | RenderbufferFormat::Srgb8Alpha8 => color_sizes(8, 8, false),
    RenderbufferFormat::Rgb10A2 => BitplaneSizes {
      red: 10,
      green: 10,
      blue: 10,
      alpha: 2,
      ..Default::default()
    },
    RenderbufferFormat::Rgba16 => color_sizes(16, 16, false),
    RenderbufferFormat::Rgb16F => color_sizes(16, 0, true),
    RenderbufferFormat::Rgba16F => color_sizes(16, 16, true),
    RenderbufferFormat::Rgb32F => color_sizes(32, 0, true),
    RenderbufferFormat::Rgba32F => color_sizes(32, 32, true),
  }
}

unsafe impl QueryBackend for MockBackend {
  unsafe fn make_current(&mut self) -> bool {
    self.calls.push(Call::MakeCurrent);
    !self.context_lost
  }

  unsafe fn capabilities(&mut self) -> (Capabilities, Limits) {
    (self.caps, self.limits)
  }

  unsafe fn driver_info(&mut self) -> DriverInfo {
    DriverInfo {
      vendor: "mock".to_owned(),
      renderer: "recording backend".to_owned(),
      version: "3.3".to_owned(),
      shading_language_version: "3.30".to_owned(),
    }
  }

  unsafe fn has_extension(&mut self, _: &str) -> bool {
    false
  }

  unsafe fn get_error(&mut self) -> Option<DriverError> {
    if self.errors.is_empty() {
      None
    } else {
      Some(self.errors.remove(0))
    }
  }
}

unsafe impl TextureBackend for MockBackend {
  unsafe fn gen_texture(&mut self) -> u32 {
    let handle = self.handle();
    self.calls.push(Call::GenTexture(handle));
    handle
  }

  unsafe fn delete_texture(&mut self, texture: u32) {
    self.texture_formats.remove(&texture);
    self.calls.push(Call::DeleteTexture(texture));
  }

  unsafe fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: u32) {
    self.calls.push(Call::BindTexture {
      unit,
      target,
      texture,
    });
  }

  unsafe fn upload_texture(
    &mut self,
    texture: u32,
    upload: &TextureUpload,
  ) -> Result<usize, TextureError> {
    if let Some(texels) = upload.texels {
      let needed = upload.width as usize
        * upload.height as usize
        * upload.depth as usize
        * texel_size(upload.format, upload.component_type);

      if texels.len() < needed {
        return Err(TextureError::NotEnoughPixels(needed, texels.len()));
      }
    }

    self.calls.push(Call::UploadTexture {
      texture,
      target: upload.target,
      format: upload.format,
      size: [upload.width, upload.height, upload.depth],
      mipmaps: upload.mipmaps,
    });

    self
      .texture_formats
      .insert(texture, (upload.format, upload.component_type));

    let bytes = upload.width as usize
      * upload.height as usize
      * upload.depth.max(1) as usize
      * texel_size(upload.format, upload.component_type);

    Ok(bytes)
  }

  unsafe fn generate_mipmap(&mut self, target: TextureTarget, texture: u32) {
    self.calls.push(Call::GenerateMipmap(target, texture));
  }

  unsafe fn texture_handle(&mut self, texture: u32, sampler: Option<u32>) -> u64 {
    (u64::from(sampler.unwrap_or(0)) << 32) | u64::from(texture)
  }

  unsafe fn make_handle_resident(&mut self, handle: u64, resident: bool) {
    self.calls.push(Call::MakeHandleResident(handle, resident));
  }

  unsafe fn gen_sampler(&mut self) -> u32 {
    let handle = self.handle();
    self.calls.push(Call::GenSampler(handle));
    handle
  }

  unsafe fn delete_sampler(&mut self, sampler: u32) {
    self.calls.push(Call::DeleteSampler(sampler));
  }

  unsafe fn bind_sampler(&mut self, unit: u32, sampler: u32) {
    self.calls.push(Call::BindSampler(unit, sampler));
  }

  unsafe fn apply_sampler_state(&mut self, _: u32, _: &SamplerState) {}

  unsafe fn bind_image_texture(
    &mut self,
    unit: u32,
    texture: u32,
    _: u32,
    access: ImageAccess,
    _: Format,
    _: ComponentType,
  ) {
    self.calls.push(Call::BindImage {
      unit,
      texture,
      access,
    });
  }

  unsafe fn memory_barrier(&mut self, barriers: MemoryBarrier) {
    self.calls.push(Call::MemoryBarrier(barriers));
  }
}

unsafe impl FramebufferBackend for MockBackend {
  unsafe fn gen_framebuffer(&mut self) -> u32 {
    let handle = self.handle();
    self.calls.push(Call::GenFramebuffer(handle));
    handle
  }

  unsafe fn delete_framebuffer(&mut self, framebuffer: u32) {
    self.calls.push(Call::DeleteFramebuffer(framebuffer));
  }

  unsafe fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: u32) {
    match target {
      FramebufferTarget::Draw => self.draw_framebuffer = framebuffer,
      FramebufferTarget::Read => self.read_framebuffer = framebuffer,
      FramebufferTarget::Both => {
        self.draw_framebuffer = framebuffer;
        self.read_framebuffer = framebuffer;
      }
    }

    self.calls.push(Call::BindFramebuffer(target, framebuffer));
  }

  unsafe fn gen_renderbuffer(&mut self) -> u32 {
    let handle = self.handle();
    self.calls.push(Call::GenRenderbuffer(handle));
    handle
  }

  unsafe fn delete_renderbuffer(&mut self, renderbuffer: u32) {
    self.calls.push(Call::DeleteRenderbuffer(renderbuffer));
  }

  unsafe fn renderbuffer_storage(
    &mut self,
    renderbuffer: u32,
    format: RenderbufferFormat,
    width: u32,
    height: u32,
    samples: Samples,
  ) -> BitplaneSizes {
    self.calls.push(Call::RenderbufferStorage {
      renderbuffer,
      format,
      size: [width, height],
      samples: samples.samples,
    });

    let mut sizes = renderbuffer_sizes(format);
    if format == RenderbufferFormat::Depth32 && self.no_depth32 {
      sizes.depth = 24;
    }

    sizes.samples = samples.samples.min(self.limits.max_fb_samples);
    sizes
  }

  unsafe fn attach_renderbuffer(&mut self, attachment: Attachment, renderbuffer: u32) {
    self.calls.push(Call::AttachRenderbuffer {
      framebuffer: self.draw_framebuffer,
      attachment,
      renderbuffer,
    });
  }

  unsafe fn attach_texture(
    &mut self,
    attachment: Attachment,
    texture: u32,
    target: TextureTarget,
    _: u32,
  ) -> BitplaneSizes {
    self.calls.push(Call::AttachTexture {
      framebuffer: self.draw_framebuffer,
      attachment,
      texture,
      target,
    });

    match self.texture_formats.get(&texture) {
      Some(&(format, component_type)) => texture_sizes(format, component_type),
      None => BitplaneSizes::default(),
    }
  }

  unsafe fn detach(&mut self, attachment: Attachment) {
    self.calls.push(Call::Detach {
      framebuffer: self.draw_framebuffer,
      attachment,
    });
  }

  unsafe fn set_draw_buffers(&mut self, buffers: &[Attachment]) {
    self.calls.push(Call::DrawBuffers {
      framebuffer: self.draw_framebuffer,
      buffers: buffers.to_vec(),
    });
  }

  unsafe fn set_read_buffer(&mut self, buffer: Option<Attachment>) {
    self.calls.push(Call::ReadBuffer {
      framebuffer: self.read_framebuffer,
      buffer,
    });
  }

  unsafe fn set_default_framebuffer_size(&mut self, width: u32, height: u32) {
    self.calls.push(Call::DefaultFramebufferSize(width, height));
  }

  unsafe fn framebuffer_status(&mut self) -> Result<(), IncompleteReason> {
    self.framebuffer_status.clone()
  }

  unsafe fn blit_framebuffer(&mut self, _: u32, _: u32, mask: BlitMask) {
    self.calls.push(Call::Blit {
      draw: self.draw_framebuffer,
      read: self.read_framebuffer,
      mask,
    });
  }

  unsafe fn clear(&mut self, values: &ClearValues) {
    self.calls.push(Call::Clear {
      framebuffer: self.draw_framebuffer,
      mask: values.mask,
    });
  }

  unsafe fn clear_color_attachment(&mut self, index: u32, color: [f32; 4]) {
    self.calls.push(Call::ClearColorAttachment(index, color));
  }

  unsafe fn copy_to_texture(
    &mut self,
    source: Attachment,
    texture: u32,
    target: TextureTarget,
    _: u32,
    _: u32,
  ) {
    self.calls.push(Call::CopyToTexture {
      read: self.read_framebuffer,
      source,
      texture,
      target,
    });
  }

  unsafe fn set_srgb_framebuffer(&mut self, enabled: bool) {
    self.calls.push(Call::SrgbFramebuffer(enabled));
  }

  unsafe fn set_multisample(&mut self, enabled: bool) {
    self.calls.push(Call::Multisample(enabled));
  }
}

unsafe impl ShaderBackend for MockBackend {
  unsafe fn compile_program(&mut self, _: &[StageSource]) -> Result<u32, ProgramError> {
    if let Some(ref reason) = self.link_error {
      return Err(ProgramError::link_failed(reason.clone()));
    }

    let handle = self.handle();
    self.calls.push(Call::CompileProgram(handle));
    Ok(handle)
  }

  unsafe fn delete_program(&mut self, program: u32) {
    self.calls.push(Call::DeleteProgram(program));
  }

  unsafe fn use_program(&mut self, program: u32) {
    self.calls.push(Call::UseProgram(program));
  }

  unsafe fn active_uniforms(&mut self, _: u32) -> Vec<ActiveParameter> {
    self.uniforms.clone()
  }

  unsafe fn active_attributes(&mut self, _: u32) -> Vec<ActiveParameter> {
    self.attributes.clone()
  }

  unsafe fn set_uniform(&mut self, location: i32, data: UniformData) {
    self.calls.push(Call::SetUniform(location, data.into()));
  }
}

unsafe impl BufferBackend for MockBackend {
  unsafe fn gen_buffer(&mut self) -> u32 {
    let handle = self.handle();
    self.calls.push(Call::GenBuffer(handle));
    handle
  }

  unsafe fn delete_buffer(&mut self, buffer: u32) {
    self.calls.push(Call::DeleteBuffer(buffer));
  }

  unsafe fn bind_buffer(&mut self, target: BufferTarget, buffer: u32) {
    self.calls.push(Call::BindBuffer(target, buffer));
  }

  unsafe fn upload_buffer(
    &mut self,
    target: BufferTarget,
    data: &[u8],
    _: UsageHint,
  ) -> Result<usize, BufferError> {
    self.calls.push(Call::UploadBuffer(target, data.len()));
    Ok(data.len())
  }

  unsafe fn gen_vertex_array(&mut self) -> u32 {
    let handle = self.handle();
    self.calls.push(Call::GenVertexArray(handle));
    handle
  }

  unsafe fn delete_vertex_array(&mut self, vao: u32) {
    self.calls.push(Call::DeleteVertexArray(vao));
  }

  unsafe fn bind_vertex_array(&mut self, vao: u32) {
    self.calls.push(Call::BindVertexArray(vao));
  }

  unsafe fn enable_vertex_attrib(&mut self, location: u32, _: &AttribFormat) {
    self.calls.push(Call::EnableAttrib(location));
  }

  unsafe fn disable_vertex_attrib(&mut self, location: u32) {
    self.calls.push(Call::DisableAttrib(location));
  }

  unsafe fn set_vertex_attrib_default(&mut self, location: u32, value: [f32; 4]) {
    self.calls.push(Call::AttribDefault(location, value));
  }

  unsafe fn enable_legacy_array(&mut self, _: LegacyArray, _: &AttribFormat) {}

  unsafe fn disable_legacy_array(&mut self, _: LegacyArray) {}

  unsafe fn set_legacy_default(&mut self, _: LegacyArray, _: [f32; 4]) {}

  unsafe fn draw_arrays(&mut self, primitive: PrimitiveType, _: usize, count: usize) {
    self.calls.push(Call::DrawArrays(primitive, count));
  }

  unsafe fn draw_elements(
    &mut self,
    primitive: PrimitiveType,
    count: usize,
    index_type: IndexType,
    _: usize,
  ) {
    self.calls.push(Call::DrawElements(primitive, count, index_type));
  }
}

/// Host surface whose liveness and size the test controls.
#[derive(Clone, Debug)]
pub struct MockHost {
  pub valid: Rc<Cell<bool>>,
  pub size: Rc<Cell<[u32; 2]>>,
  pub frames: Rc<Cell<usize>>,
}

impl MockHost {
  pub fn new(size: [u32; 2]) -> Self {
    MockHost {
      valid: Rc::new(Cell::new(true)),
      size: Rc::new(Cell::new(size)),
      frames: Rc::new(Cell::new(0)),
    }
  }
}

impl HostSurface for MockHost {
  fn begin_frame(&mut self, _: FrameMode) -> bool {
    self.valid.get()
  }

  fn end_frame(&mut self, _: FrameMode) {
    self.frames.set(self.frames.get() + 1);
  }

  fn size(&self) -> [u32; 2] {
    self.size.get()
  }

  fn fb_properties(&self) -> FrameBufferProperties {
    FrameBufferProperties::rgba_depth()
  }

  fn is_valid(&self) -> bool {
    self.valid.get()
  }
}

pub fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// Everything but the vendor and legacy features.
pub fn full_caps() -> Capabilities {
  Capabilities::all()
    - Capabilities::FRAMEBUFFER_MULTISAMPLE_COVERAGE
    - Capabilities::LEGACY_VERTEX_ARRAYS
    - Capabilities::BINDLESS_TEXTURE
    - Capabilities::MULTISAMPLE
}

pub fn limits() -> Limits {
  Limits {
    max_texture_units: 16,
    max_image_units: 8,
    max_fb_samples: 8,
    max_color_targets: 8,
    max_texture_size: 4096,
    max_vertex_attribs: 16,
  }
}

pub fn guardian() -> GraphicsStateGuardian<MockBackend> {
  guardian_with(MockBackend::new(), RenderConfig::default())
}

pub fn guardian_with(
  backend: MockBackend,
  config: RenderConfig,
) -> GraphicsStateGuardian<MockBackend> {
  init_logger();
  GraphicsStateGuardian::new(backend, config)
}

pub fn param(name: &str, location: i32, ty: ParamType, size: usize) -> ActiveParameter {
  ActiveParameter {
    name: name.to_owned(),
    location,
    size,
    ty,
  }
}
