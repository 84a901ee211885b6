//! Extension entry points.

use gl::types::*;
use std::mem;
use std::os::raw::c_void;

type GetTextureHandle = extern "system" fn(GLuint) -> GLuint64;
type GetTextureSamplerHandle = extern "system" fn(GLuint, GLuint) -> GLuint64;
type MakeHandleResident = extern "system" fn(GLuint64);
type UniformHandle = extern "system" fn(GLint, GLuint64);

/// `GL_ARB_bindless_texture`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BindlessFns {
  pub(crate) get_texture_handle: GetTextureHandle,
  pub(crate) get_texture_sampler_handle: GetTextureSamplerHandle,
  pub(crate) make_resident: MakeHandleResident,
  pub(crate) make_non_resident: MakeHandleResident,
  pub(crate) uniform_handle: UniformHandle,
}

impl BindlessFns {
  /// Load every entry point; `None` if any is missing.
  pub(crate) unsafe fn load<F>(loader: &mut F) -> Option<Self>
  where
    F: FnMut(&str) -> *const c_void,
  {
    Some(BindlessFns {
      get_texture_handle: mem::transmute::<*const c_void, GetTextureHandle>(load_fn(
        loader,
        "glGetTextureHandleARB",
      )?),
      get_texture_sampler_handle: mem::transmute::<*const c_void, GetTextureSamplerHandle>(
        load_fn(loader, "glGetTextureSamplerHandleARB")?,
      ),
      make_resident: mem::transmute::<*const c_void, MakeHandleResident>(load_fn(
        loader,
        "glMakeTextureHandleResidentARB",
      )?),
      make_non_resident: mem::transmute::<*const c_void, MakeHandleResident>(load_fn(
        loader,
        "glMakeTextureHandleNonResidentARB",
      )?),
      uniform_handle: mem::transmute::<*const c_void, UniformHandle>(load_fn(
        loader,
        "glUniformHandleui64ARB",
      )?),
    })
  }
}

fn load_fn<F>(loader: &mut F, name: &str) -> Option<*const c_void>
where
  F: FnMut(&str) -> *const c_void,
{
  let ptr = loader(name);
  (!ptr.is_null()).then(|| ptr)
}
