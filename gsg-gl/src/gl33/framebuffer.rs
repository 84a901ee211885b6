use gl::types::*;
use gsg::backend::framebuffer::{
  Attachment, BitplaneSizes, BlitMask, ClearValues, FramebufferBackend, FramebufferTarget,
  IncompleteReason, RenderbufferFormat, Samples,
};
use gsg::backend::texture::TextureTarget;

use crate::gl33::texture::opengl_target;
use crate::gl33::GL33;

unsafe impl FramebufferBackend for GL33 {
  unsafe fn gen_framebuffer(&mut self) -> u32 {
    let mut handle: GLuint = 0;
    gl::GenFramebuffers(1, &mut handle);
    handle
  }

  unsafe fn delete_framebuffer(&mut self, framebuffer: u32) {
    gl::DeleteFramebuffers(1, &framebuffer);
  }

  unsafe fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: u32) {
    gl::BindFramebuffer(opengl_framebuffer_target(target), framebuffer);
  }

  unsafe fn gen_renderbuffer(&mut self) -> u32 {
    let mut handle: GLuint = 0;
    gl::GenRenderbuffers(1, &mut handle);
    handle
  }

  unsafe fn delete_renderbuffer(&mut self, renderbuffer: u32) {
    self.state.forget_renderbuffer(renderbuffer);
    gl::DeleteRenderbuffers(1, &renderbuffer);
  }

  unsafe fn renderbuffer_storage(
    &mut self,
    renderbuffer: u32,
    format: RenderbufferFormat,
    width: u32,
    height: u32,
    samples: Samples,
  ) -> BitplaneSizes {
    self.state.bind_renderbuffer(renderbuffer);

    let iformat = opengl_renderbuffer_format(format);

    if samples.samples > 0 {
      gl::RenderbufferStorageMultisample(
        gl::RENDERBUFFER,
        samples.samples as GLsizei,
        iformat,
        width as GLsizei,
        height as GLsizei,
      );
    } else {
      gl::RenderbufferStorage(gl::RENDERBUFFER, iformat, width as GLsizei, height as GLsizei);
    }

    let query = |pname| {
      let mut value: GLint = 0;
      gl::GetRenderbufferParameteriv(gl::RENDERBUFFER, pname, &mut value);
      value.max(0) as u32
    };

    BitplaneSizes {
      red: query(gl::RENDERBUFFER_RED_SIZE),
      green: query(gl::RENDERBUFFER_GREEN_SIZE),
      blue: query(gl::RENDERBUFFER_BLUE_SIZE),
      alpha: query(gl::RENDERBUFFER_ALPHA_SIZE),
      depth: query(gl::RENDERBUFFER_DEPTH_SIZE),
      stencil: query(gl::RENDERBUFFER_STENCIL_SIZE),
      samples: query(gl::RENDERBUFFER_SAMPLES),
      float_color: matches!(
        format,
        RenderbufferFormat::Rgb16F
          | RenderbufferFormat::Rgba16F
          | RenderbufferFormat::Rgb32F
          | RenderbufferFormat::Rgba32F
      ),
      float_depth: matches!(
        format,
        RenderbufferFormat::Depth32F | RenderbufferFormat::Depth32FStencil8
      ),
    }
  }

  unsafe fn attach_renderbuffer(&mut self, attachment: Attachment, renderbuffer: u32) {
    gl::FramebufferRenderbuffer(
      gl::DRAW_FRAMEBUFFER,
      opengl_attachment(attachment),
      gl::RENDERBUFFER,
      renderbuffer,
    );
  }

  unsafe fn attach_texture(
    &mut self,
    attachment: Attachment,
    texture: u32,
    target: TextureTarget,
    level: u32,
  ) -> BitplaneSizes {
    let gl_attachment = opengl_attachment(attachment);

    match target {
      TextureTarget::Texture2D | TextureTarget::CubeMapFace(_) => gl::FramebufferTexture2D(
        gl::DRAW_FRAMEBUFFER,
        gl_attachment,
        opengl_target(target),
        texture,
        level as GLint,
      ),

      // layered attachment
      _ => gl::FramebufferTexture(gl::DRAW_FRAMEBUFFER, gl_attachment, texture, level as GLint),
    }

    attachment_sizes(attachment)
  }

  unsafe fn detach(&mut self, attachment: Attachment) {
    gl::FramebufferRenderbuffer(
      gl::DRAW_FRAMEBUFFER,
      opengl_attachment(attachment),
      gl::RENDERBUFFER,
      0,
    );
  }

  unsafe fn set_draw_buffers(&mut self, buffers: &[Attachment]) {
    if buffers.is_empty() {
      gl::DrawBuffer(gl::NONE);
    } else {
      let buffers: Vec<GLenum> = buffers.iter().map(|&a| opengl_attachment(a)).collect();
      gl::DrawBuffers(buffers.len() as GLsizei, buffers.as_ptr());
    }
  }

  unsafe fn set_read_buffer(&mut self, buffer: Option<Attachment>) {
    gl::ReadBuffer(buffer.map_or(gl::NONE, opengl_attachment));
  }

  unsafe fn set_default_framebuffer_size(&mut self, width: u32, height: u32) {
    if self.state.version_at_least(4, 3)
      || self.state.has_extension("GL_ARB_framebuffer_no_attachments")
    {
      gl::FramebufferParameteri(
        gl::DRAW_FRAMEBUFFER,
        gl::FRAMEBUFFER_DEFAULT_WIDTH,
        width as GLint,
      );
      gl::FramebufferParameteri(
        gl::DRAW_FRAMEBUFFER,
        gl::FRAMEBUFFER_DEFAULT_HEIGHT,
        height as GLint,
      );
    }
  }

  unsafe fn framebuffer_status(&mut self) -> Result<(), IncompleteReason> {
    get_framebuffer_status()
  }

  unsafe fn blit_framebuffer(&mut self, width: u32, height: u32, mask: BlitMask) {
    let mut bits: GLbitfield = 0;

    if mask.contains(BlitMask::COLOR) {
      bits |= gl::COLOR_BUFFER_BIT;
    }

    if mask.contains(BlitMask::DEPTH) {
      bits |= gl::DEPTH_BUFFER_BIT;
    }

    if mask.contains(BlitMask::STENCIL) {
      bits |= gl::STENCIL_BUFFER_BIT;
    }

    let (w, h) = (width as GLint, height as GLint);
    gl::BlitFramebuffer(0, 0, w, h, 0, 0, w, h, bits, gl::NEAREST);
  }

  unsafe fn clear(&mut self, values: &ClearValues) {
    let mut bits: GLbitfield = 0;

    if values.mask.contains(BlitMask::COLOR) {
      let [r, g, b, a] = values.color;
      gl::ClearColor(r, g, b, a);
      bits |= gl::COLOR_BUFFER_BIT;
    }

    if values.mask.contains(BlitMask::DEPTH) {
      gl::ClearDepth(values.depth as GLdouble);
      gl::DepthMask(gl::TRUE);
      bits |= gl::DEPTH_BUFFER_BIT;
    }

    if values.mask.contains(BlitMask::STENCIL) {
      gl::ClearStencil(values.stencil as GLint);
      bits |= gl::STENCIL_BUFFER_BIT;
    }

    if bits != 0 {
      gl::Clear(bits);
    }
  }

  unsafe fn clear_color_attachment(&mut self, index: u32, color: [f32; 4]) {
    gl::ClearBufferfv(gl::COLOR, index as GLint, color.as_ptr());
  }

  unsafe fn copy_to_texture(
    &mut self,
    source: Attachment,
    texture: u32,
    target: TextureTarget,
    width: u32,
    height: u32,
  ) {
    if let Attachment::Color(_) = source {
      gl::ReadBuffer(opengl_attachment(source));
    }

    let bind_target = match target {
      TextureTarget::CubeMapFace(_) => gl::TEXTURE_CUBE_MAP,
      t => opengl_target(t),
    };

    self.state.bind_scratch_texture(bind_target, texture);
    gl::CopyTexSubImage2D(
      opengl_target(target),
      0,
      0,
      0,
      0,
      0,
      width as GLsizei,
      height as GLsizei,
    );
  }

  unsafe fn set_srgb_framebuffer(&mut self, enabled: bool) {
    if enabled {
      gl::Enable(gl::FRAMEBUFFER_SRGB);
    } else {
      gl::Disable(gl::FRAMEBUFFER_SRGB);
    }
  }

  unsafe fn set_multisample(&mut self, enabled: bool) {
    if enabled {
      gl::Enable(gl::MULTISAMPLE);
    } else {
      gl::Disable(gl::MULTISAMPLE);
    }
  }
}

fn get_framebuffer_status() -> Result<(), IncompleteReason> {
  let status = unsafe { gl::CheckFramebufferStatus(gl::DRAW_FRAMEBUFFER) };

  match status {
    gl::FRAMEBUFFER_COMPLETE => Ok(()),
    gl::FRAMEBUFFER_UNDEFINED => Err(IncompleteReason::Undefined),
    gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => Err(IncompleteReason::IncompleteAttachment),
    gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => Err(IncompleteReason::MissingAttachment),
    gl::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => Err(IncompleteReason::IncompleteDrawBuffer),
    gl::FRAMEBUFFER_INCOMPLETE_READ_BUFFER => Err(IncompleteReason::IncompleteReadBuffer),
    gl::FRAMEBUFFER_UNSUPPORTED => Err(IncompleteReason::Unsupported),
    gl::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => Err(IncompleteReason::IncompleteMultisample),
    gl::FRAMEBUFFER_INCOMPLETE_LAYER_TARGETS => Err(IncompleteReason::IncompleteLayerTargets),
    _ => Err(IncompleteReason::Unknown(status)),
  }
}

// bit depths of what is attached at `attachment` on the draw framebuffer
unsafe fn attachment_sizes(attachment: Attachment) -> BitplaneSizes {
  let query = |attachment: GLenum, pname: GLenum| {
    let mut value: GLint = 0;
    gl::GetFramebufferAttachmentParameteriv(gl::DRAW_FRAMEBUFFER, attachment, pname, &mut value);
    value.max(0) as u32
  };

  let mut sizes = BitplaneSizes::default();

  match attachment {
    Attachment::Color(_) => {
      let a = opengl_attachment(attachment);
      sizes.red = query(a, gl::FRAMEBUFFER_ATTACHMENT_RED_SIZE);
      sizes.green = query(a, gl::FRAMEBUFFER_ATTACHMENT_GREEN_SIZE);
      sizes.blue = query(a, gl::FRAMEBUFFER_ATTACHMENT_BLUE_SIZE);
      sizes.alpha = query(a, gl::FRAMEBUFFER_ATTACHMENT_ALPHA_SIZE);
      sizes.float_color = query(a, gl::FRAMEBUFFER_ATTACHMENT_COMPONENT_TYPE) == gl::FLOAT;
    }

    Attachment::Depth | Attachment::DepthStencil => {
      sizes.depth = query(gl::DEPTH_ATTACHMENT, gl::FRAMEBUFFER_ATTACHMENT_DEPTH_SIZE);
      sizes.float_depth =
        query(gl::DEPTH_ATTACHMENT, gl::FRAMEBUFFER_ATTACHMENT_COMPONENT_TYPE) == gl::FLOAT;

      if attachment == Attachment::DepthStencil {
        sizes.stencil = query(gl::STENCIL_ATTACHMENT, gl::FRAMEBUFFER_ATTACHMENT_STENCIL_SIZE);
      }
    }

    Attachment::Stencil => {
      sizes.stencil = query(gl::STENCIL_ATTACHMENT, gl::FRAMEBUFFER_ATTACHMENT_STENCIL_SIZE);
    }
  }

  sizes
}

fn opengl_framebuffer_target(target: FramebufferTarget) -> GLenum {
  match target {
    FramebufferTarget::Draw => gl::DRAW_FRAMEBUFFER,
    FramebufferTarget::Read => gl::READ_FRAMEBUFFER,
    FramebufferTarget::Both => gl::FRAMEBUFFER,
  }
}

fn opengl_attachment(attachment: Attachment) -> GLenum {
  match attachment {
    Attachment::Depth => gl::DEPTH_ATTACHMENT,
    Attachment::Stencil => gl::STENCIL_ATTACHMENT,
    Attachment::DepthStencil => gl::DEPTH_STENCIL_ATTACHMENT,
    Attachment::Color(i) => gl::COLOR_ATTACHMENT0 + i,
  }
}

fn opengl_renderbuffer_format(format: RenderbufferFormat) -> GLenum {
  match format {
    RenderbufferFormat::Depth16 => gl::DEPTH_COMPONENT16,
    RenderbufferFormat::Depth24 => gl::DEPTH_COMPONENT24,
    RenderbufferFormat::Depth32 => gl::DEPTH_COMPONENT32,
    RenderbufferFormat::Depth32F => gl::DEPTH_COMPONENT32F,
    RenderbufferFormat::Depth24Stencil8 => gl::DEPTH24_STENCIL8,
    RenderbufferFormat::Depth32FStencil8 => gl::DEPTH32F_STENCIL8,
    RenderbufferFormat::Stencil8 => gl::STENCIL_INDEX8,
    RenderbufferFormat::R8 => gl::R8,
    RenderbufferFormat::Rg8 => gl::RG8,
    RenderbufferFormat::Rgb8 => gl::RGB8,
    RenderbufferFormat::Rgba8 => gl::RGBA8,
    RenderbufferFormat::Srgb8 => gl::SRGB8,
    RenderbufferFormat::Srgb8Alpha8 => gl::SRGB8_ALPHA8,
    RenderbufferFormat::Rgb10A2 => gl::RGB10_A2,
    RenderbufferFormat::Rgba16 => gl::RGBA16,
    RenderbufferFormat::Rgb16F => gl::RGB16F,
    RenderbufferFormat::Rgba16F => gl::RGBA16F,
    RenderbufferFormat::Rgb32F => gl::RGB32F,
    RenderbufferFormat::Rgba32F => gl::RGBA32F,
  }
}
