use gl::types::*;
use gsg::backend::texture::{
  ImageAccess, MemoryBarrier, TextureBackend, TextureError, TextureTarget, TextureUpload,
};
use gsg::texture::{texel_size, ComponentType, Filter, Format, SamplerState, Wrap};
use std::os::raw::c_void;
use std::ptr;

use crate::gl33::GL33;

// GL_EXT_texture_filter_anisotropic, core since 4.6
const TEXTURE_MAX_ANISOTROPY: GLenum = 0x84FE;

unsafe impl TextureBackend for GL33 {
  unsafe fn gen_texture(&mut self) -> u32 {
    let mut texture: GLuint = 0;
    gl::GenTextures(1, &mut texture);
    texture
  }

  unsafe fn delete_texture(&mut self, texture: u32) {
    gl::DeleteTextures(1, &texture);
  }

  unsafe fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: u32) {
    self.state.set_texture_unit(unit);
    gl::BindTexture(opengl_target(target), texture);
  }

  unsafe fn upload_texture(
    &mut self,
    texture: u32,
    upload: &TextureUpload,
  ) -> Result<usize, TextureError> {
    let (format, iformat, encoding) = opengl_pixel_format(upload.format, upload.component_type)
      .ok_or(TextureError::UnsupportedPixelFormat(
        upload.format,
        upload.component_type,
      ))?;

    let target = opengl_target(upload.target);
    let width = upload.width.max(1);
    let height = upload.height.max(1);
    let depth = upload.depth.max(1);
    let texel_bytes = texel_size(upload.format, upload.component_type);
    let layer_bytes = width as usize * height as usize * texel_bytes;
    let expected = match upload.target {
      TextureTarget::Texture1D | TextureTarget::Texture2D | TextureTarget::CubeMapFace(_) => {
        layer_bytes
      }
      TextureTarget::CubeMap => layer_bytes * 6,
      _ => layer_bytes * depth as usize,
    };

    if let Some(texels) = upload.texels {
      if texels.len() < expected {
        return Err(TextureError::NotEnoughPixels(expected, texels.len()));
      }
    }

    let bind_target = match upload.target {
      TextureTarget::CubeMapFace(_) => gl::TEXTURE_CUBE_MAP,
      _ => target,
    };
    self.state.bind_scratch_texture(bind_target, texture);
    set_unpack_alignment(texel_bytes);

    let levels = if upload.mipmaps {
      mipmap_levels(width.max(height).max(depth))
    } else {
      1
    };

    let data = |offset: usize| -> *const c_void {
      upload
        .texels
        .map_or(ptr::null(), |t| t[offset..].as_ptr() as *const c_void)
    };

    match upload.target {
      TextureTarget::Texture1D => {
        for level in 0..levels {
          let w = (width >> level).max(1);
          let texels = if level == 0 { data(0) } else { ptr::null() };
          gl::TexImage1D(
            target,
            level as GLint,
            iformat as GLint,
            w as GLsizei,
            0,
            format,
            encoding,
            texels,
          );
        }
      }

      TextureTarget::Texture2D | TextureTarget::CubeMapFace(_) => {
        for level in 0..levels {
          let w = (width >> level).max(1);
          let h = (height >> level).max(1);
          let texels = if level == 0 { data(0) } else { ptr::null() };
          gl::TexImage2D(
            target,
            level as GLint,
            iformat as GLint,
            w as GLsizei,
            h as GLsizei,
            0,
            format,
            encoding,
            texels,
          );
        }
      }

      TextureTarget::CubeMap => {
        for face in 0..6 {
          for level in 0..levels {
            let w = (width >> level).max(1);
            let h = (height >> level).max(1);
            let texels = if level == 0 {
              data(face as usize * layer_bytes)
            } else {
              ptr::null()
            };
            gl::TexImage2D(
              gl::TEXTURE_CUBE_MAP_POSITIVE_X + face,
              level as GLint,
              iformat as GLint,
              w as GLsizei,
              h as GLsizei,
              0,
              format,
              encoding,
              texels,
            );
          }
        }
      }

      TextureTarget::Texture3D | TextureTarget::Texture2DArray => {
        let layered = upload.target == TextureTarget::Texture2DArray;

        for level in 0..levels {
          let w = (width >> level).max(1);
          let h = (height >> level).max(1);
          let d = if layered { depth } else { (depth >> level).max(1) };
          let texels = if level == 0 { data(0) } else { ptr::null() };
          gl::TexImage3D(
            target,
            level as GLint,
            iformat as GLint,
            w as GLsizei,
            h as GLsizei,
            d as GLsizei,
            0,
            format,
            encoding,
            texels,
          );
        }
      }

      TextureTarget::Buffer => {
        return Err(TextureError::texture_storage_creation_failed(
          "buffer textures have no image storage",
        ));
      }
    }

    gl::TexParameteri(bind_target, gl::TEXTURE_BASE_LEVEL, 0);
    gl::TexParameteri(bind_target, gl::TEXTURE_MAX_LEVEL, levels as GLint - 1);

    if gl::GetError() == gl::OUT_OF_MEMORY {
      return Err(TextureError::texture_storage_creation_failed(format!(
        "out of memory allocating {} bytes",
        expected
      )));
    }

    // a full mipmap chain adds a third
    let resident = if levels > 1 { expected + expected / 3 } else { expected };
    Ok(resident)
  }

  unsafe fn generate_mipmap(&mut self, target: TextureTarget, texture: u32) {
    let target = match target {
      TextureTarget::CubeMapFace(_) => gl::TEXTURE_CUBE_MAP,
      t => opengl_target(t),
    };

    self.state.bind_scratch_texture(target, texture);
    gl::GenerateMipmap(target);
  }

  unsafe fn texture_handle(&mut self, texture: u32, sampler: Option<u32>) -> u64 {
    match (self.state.bindless, sampler) {
      (Some(fns), Some(sampler)) => (fns.get_texture_sampler_handle)(texture, sampler),
      (Some(fns), None) => (fns.get_texture_handle)(texture),
      (None, _) => 0,
    }
  }

  unsafe fn make_handle_resident(&mut self, handle: u64, resident: bool) {
    if let Some(fns) = self.state.bindless {
      if resident {
        (fns.make_resident)(handle);
      } else {
        (fns.make_non_resident)(handle);
      }
    }
  }

  unsafe fn gen_sampler(&mut self) -> u32 {
    let mut sampler: GLuint = 0;
    gl::GenSamplers(1, &mut sampler);
    sampler
  }

  unsafe fn delete_sampler(&mut self, sampler: u32) {
    gl::DeleteSamplers(1, &sampler);
  }

  unsafe fn bind_sampler(&mut self, unit: u32, sampler: u32) {
    gl::BindSampler(unit, sampler);
  }

  unsafe fn apply_sampler_state(&mut self, sampler: u32, state: &SamplerState) {
    gl::SamplerParameteri(sampler, gl::TEXTURE_WRAP_S, opengl_wrap(state.wrap_u) as GLint);
    gl::SamplerParameteri(sampler, gl::TEXTURE_WRAP_T, opengl_wrap(state.wrap_v) as GLint);
    gl::SamplerParameteri(sampler, gl::TEXTURE_WRAP_R, opengl_wrap(state.wrap_w) as GLint);
    gl::SamplerParameteri(
      sampler,
      gl::TEXTURE_MIN_FILTER,
      opengl_filter(state.min_filter) as GLint,
    );
    gl::SamplerParameteri(
      sampler,
      gl::TEXTURE_MAG_FILTER,
      opengl_mag_filter(state.mag_filter) as GLint,
    );

    if state.compare {
      gl::SamplerParameteri(
        sampler,
        gl::TEXTURE_COMPARE_MODE,
        gl::COMPARE_REF_TO_TEXTURE as GLint,
      );
      gl::SamplerParameteri(sampler, gl::TEXTURE_COMPARE_FUNC, gl::LEQUAL as GLint);
    } else {
      gl::SamplerParameteri(sampler, gl::TEXTURE_COMPARE_MODE, gl::NONE as GLint);
    }

    if self.state.version_at_least(4, 6)
      || self.state.has_extension("GL_EXT_texture_filter_anisotropic")
      || self.state.has_extension("GL_ARB_texture_filter_anisotropic")
    {
      gl::SamplerParameterf(
        sampler,
        TEXTURE_MAX_ANISOTROPY,
        state.anisotropic_degree.max(1) as GLfloat,
      );
    }
  }

  unsafe fn bind_image_texture(
    &mut self,
    unit: u32,
    texture: u32,
    level: u32,
    access: ImageAccess,
    format: Format,
    component_type: ComponentType,
  ) {
    let iformat = opengl_pixel_format(format, component_type).map_or(gl::RGBA8, |(_, i, _)| i);
    let access = match access {
      ImageAccess::ReadOnly => gl::READ_ONLY,
      ImageAccess::WriteOnly => gl::WRITE_ONLY,
      ImageAccess::ReadWrite => gl::READ_WRITE,
    };

    // whole level, every layer
    gl::BindImageTexture(unit, texture, level as GLint, gl::TRUE, 0, access, iformat);
  }

  unsafe fn memory_barrier(&mut self, barriers: MemoryBarrier) {
    let mut bits: GLbitfield = 0;

    if barriers.contains(MemoryBarrier::TEXTURE_FETCH) {
      bits |= gl::TEXTURE_FETCH_BARRIER_BIT;
    }

    if barriers.contains(MemoryBarrier::SHADER_IMAGE_ACCESS) {
      bits |= gl::SHADER_IMAGE_ACCESS_BARRIER_BIT;
    }

    if barriers.contains(MemoryBarrier::TEXTURE_UPDATE) {
      bits |= gl::TEXTURE_UPDATE_BARRIER_BIT;
    }

    if barriers.contains(MemoryBarrier::FRAMEBUFFER) {
      bits |= gl::FRAMEBUFFER_BARRIER_BIT;
    }

    if barriers.contains(MemoryBarrier::VERTEX_ATTRIB_ARRAY) {
      bits |= gl::VERTEX_ATTRIB_ARRAY_BARRIER_BIT;
    }

    if barriers.contains(MemoryBarrier::ELEMENT_ARRAY) {
      bits |= gl::ELEMENT_ARRAY_BARRIER_BIT;
    }

    if bits != 0 && self.state.version_at_least(4, 2) {
      gl::MemoryBarrier(bits);
    }
  }
}

pub(crate) fn opengl_target(target: TextureTarget) -> GLenum {
  match target {
    TextureTarget::Texture1D => gl::TEXTURE_1D,
    TextureTarget::Texture2D => gl::TEXTURE_2D,
    TextureTarget::Texture3D => gl::TEXTURE_3D,
    TextureTarget::Texture2DArray => gl::TEXTURE_2D_ARRAY,
    TextureTarget::CubeMap => gl::TEXTURE_CUBE_MAP,
    TextureTarget::CubeMapFace(face) => gl::TEXTURE_CUBE_MAP_POSITIVE_X + face.min(5) as GLenum,
    TextureTarget::Buffer => gl::TEXTURE_BUFFER,
  }
}

fn opengl_wrap(wrap: Wrap) -> GLenum {
  match wrap {
    Wrap::ClampToEdge => gl::CLAMP_TO_EDGE,
    Wrap::Repeat => gl::REPEAT,
    Wrap::MirroredRepeat => gl::MIRRORED_REPEAT,
    Wrap::ClampToBorder => gl::CLAMP_TO_BORDER,
  }
}

fn opengl_filter(filter: Filter) -> GLenum {
  match filter {
    Filter::Nearest => gl::NEAREST,
    Filter::Linear => gl::LINEAR,
    Filter::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
    Filter::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
    Filter::NearestMipmapLinear => gl::NEAREST_MIPMAP_LINEAR,
    Filter::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
  }
}

// magnification never samples mipmaps
fn opengl_mag_filter(filter: Filter) -> GLenum {
  match filter {
    Filter::Nearest | Filter::NearestMipmapNearest | Filter::NearestMipmapLinear => gl::NEAREST,
    _ => gl::LINEAR,
  }
}

/// OpenGL `(format, internal format, type)` of a pixel format.
pub(crate) fn opengl_pixel_format(
  format: Format,
  component_type: ComponentType,
) -> Option<(GLenum, GLenum, GLenum)> {
  use ComponentType as C;

  match (format, component_type) {
    (Format::DepthStencil, C::UnsignedInt24_8) => {
      Some((gl::DEPTH_STENCIL, gl::DEPTH24_STENCIL8, gl::UNSIGNED_INT_24_8))
    }
    (Format::DepthStencil, C::Float) => Some((
      gl::DEPTH_STENCIL,
      gl::DEPTH32F_STENCIL8,
      gl::FLOAT_32_UNSIGNED_INT_24_8_REV,
    )),
    (Format::DepthComponent, C::Float) | (Format::DepthComponent32, C::Float) => {
      Some((gl::DEPTH_COMPONENT, gl::DEPTH_COMPONENT32F, gl::FLOAT))
    }
    (Format::DepthComponent, t) | (Format::DepthComponent24, t) => {
      Some((gl::DEPTH_COMPONENT, gl::DEPTH_COMPONENT24, opengl_type(t)?))
    }
    (Format::DepthComponent16, t) => {
      Some((gl::DEPTH_COMPONENT, gl::DEPTH_COMPONENT16, opengl_type(t)?))
    }
    (Format::DepthComponent32, t) => {
      Some((gl::DEPTH_COMPONENT, gl::DEPTH_COMPONENT32, opengl_type(t)?))
    }

    (Format::Red, C::UnsignedByte) => Some((gl::RED, gl::R8, gl::UNSIGNED_BYTE)),
    (Format::Red, C::HalfFloat) => Some((gl::RED, gl::R16F, gl::HALF_FLOAT)),
    (Format::Red, C::Float) | (Format::R32, C::Float) => Some((gl::RED, gl::R32F, gl::FLOAT)),
    (Format::R32, C::UnsignedInt) => Some((gl::RED_INTEGER, gl::R32UI, gl::UNSIGNED_INT)),
    (Format::R32i, C::Int) | (Format::R32, C::Int) => Some((gl::RED_INTEGER, gl::R32I, gl::INT)),

    (Format::Rg, C::UnsignedByte) => Some((gl::RG, gl::RG8, gl::UNSIGNED_BYTE)),
    (Format::Rg, C::HalfFloat) => Some((gl::RG, gl::RG16F, gl::HALF_FLOAT)),
    (Format::Rg, C::Float) => Some((gl::RG, gl::RG32F, gl::FLOAT)),

    (Format::Rgb, C::UnsignedByte) => Some((gl::RGB, gl::RGB8, gl::UNSIGNED_BYTE)),
    (Format::Rgb, C::UnsignedShort) => Some((gl::RGB, gl::RGB16, gl::UNSIGNED_SHORT)),
    (Format::Rgb, C::HalfFloat) => Some((gl::RGB, gl::RGB16F, gl::HALF_FLOAT)),
    (Format::Rgb, C::Float) => Some((gl::RGB, gl::RGB32F, gl::FLOAT)),

    (Format::Rgba, C::UnsignedByte) | (Format::Rgba8, C::UnsignedByte) => {
      Some((gl::RGBA, gl::RGBA8, gl::UNSIGNED_BYTE))
    }
    (Format::Rgba, C::UnsignedShort) | (Format::Rgba16, C::UnsignedShort) => {
      Some((gl::RGBA, gl::RGBA16, gl::UNSIGNED_SHORT))
    }
    (Format::Rgba, C::HalfFloat) | (Format::Rgba16, C::HalfFloat) => {
      Some((gl::RGBA, gl::RGBA16F, gl::HALF_FLOAT))
    }
    (Format::Rgba, C::Float) | (Format::Rgba32, C::Float) => {
      Some((gl::RGBA, gl::RGBA32F, gl::FLOAT))
    }

    (Format::Srgb, C::UnsignedByte) => Some((gl::RGB, gl::SRGB8, gl::UNSIGNED_BYTE)),
    (Format::SrgbAlpha, C::UnsignedByte) => Some((gl::RGBA, gl::SRGB8_ALPHA8, gl::UNSIGNED_BYTE)),

    _ => None,
  }
}

fn opengl_type(component_type: ComponentType) -> Option<GLenum> {
  match component_type {
    ComponentType::UnsignedByte => Some(gl::UNSIGNED_BYTE),
    ComponentType::UnsignedShort => Some(gl::UNSIGNED_SHORT),
    ComponentType::UnsignedInt => Some(gl::UNSIGNED_INT),
    ComponentType::Int => Some(gl::INT),
    ComponentType::HalfFloat => Some(gl::HALF_FLOAT),
    ComponentType::Float => Some(gl::FLOAT),
    ComponentType::UnsignedInt24_8 => None,
  }
}

fn mipmap_levels(size: u32) -> u32 {
  32 - size.max(1).leading_zeros()
}

// set the unpack alignment for uploading aligned texels
fn set_unpack_alignment(texel_bytes: usize) {
  let unpack_alignment = match texel_bytes {
    1 => 1,
    2 => 2,
    3 => 1,
    4 => 4,
    _ => 8,
  };

  unsafe { gl::PixelStorei(gl::UNPACK_ALIGNMENT, unpack_alignment) };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mipmap_level_count() {
    assert_eq!(mipmap_levels(1), 1);
    assert_eq!(mipmap_levels(2), 2);
    assert_eq!(mipmap_levels(256), 9);
    assert_eq!(mipmap_levels(300), 9);
  }

  #[test]
  fn packed_depth_stencil_format() {
    assert_eq!(
      opengl_pixel_format(Format::DepthStencil, ComponentType::UnsignedInt24_8),
      Some((gl::DEPTH_STENCIL, gl::DEPTH24_STENCIL8, gl::UNSIGNED_INT_24_8))
    );
    assert_eq!(
      opengl_pixel_format(Format::DepthStencil, ComponentType::UnsignedByte),
      None
    );
  }

  #[test]
  fn cube_map_faces_are_consecutive() {
    assert_eq!(
      opengl_target(TextureTarget::CubeMapFace(3)),
      gl::TEXTURE_CUBE_MAP_NEGATIVE_Y
    );
  }
}
