//! Backend interfacing.
//!
//! Backends implement the traits of this module. They are `unsafe` because the core cannot check
//! that handles passed around are valid for the wrapped graphics API; the core guarantees it only
//! passes handles it got from the same backend, and only from the thread that made the backend
//! current.
//!
//! All traits are lumped together in [`Backend`], which is automatically implemented.

pub mod buffer;
pub mod framebuffer;
pub mod query;
pub mod shader;
pub mod texture;

use self::buffer::BufferBackend;
use self::framebuffer::FramebufferBackend;
use self::query::QueryBackend;
use self::shader::ShaderBackend;
use self::texture::TextureBackend;

/// A complete backend.
pub trait Backend:
  BufferBackend + FramebufferBackend + QueryBackend + ShaderBackend + TextureBackend
{
}

impl<B> Backend for B where
  B: ?Sized + BufferBackend + FramebufferBackend + QueryBackend + ShaderBackend + TextureBackend
{
}
