//! Bound-object cache.
//!
//! [`BoundState`] mirrors what is currently bound on the backend so that redundant binds are
//! skipped. It is also what eviction queries to know whether a resource must be unbound before
//! its handle is deleted.

use std::marker::PhantomData;

use crate::backend::buffer::{BufferBackend, BufferTarget};
use crate::backend::framebuffer::{FramebufferBackend, FramebufferTarget};
use crate::backend::shader::ShaderBackend;
use crate::backend::texture::{ImageAccess, TextureBackend, TextureTarget};
use crate::texture::{ComponentType, Format};

/// Cached value.
///
/// A cached value is used to prevent issuing costly GPU commands if we know the target value is
/// already set to what the command tries to set.
///
/// Note: do not confuse [`Cached`] with [`Bind`]. The latter overrides the cache for a single
/// call; it cannot be used to invalidate a setting for later use.
#[derive(Debug)]
struct Cached<T>(Option<T>)
where
  T: PartialEq;

impl<T> Cached<T>
where
  T: PartialEq,
{
  fn new(initial: T) -> Self {
    Cached(Some(initial))
  }

  /// Explicitly invalidate a value.
  fn invalidate(&mut self) {
    self.0 = None;
  }

  fn set(&mut self, value: T) {
    self.0 = Some(value);
  }

  fn get(&self) -> Option<&T> {
    self.0.as_ref()
  }

  /// A non-cached value is always invalid. A cached value is invalid if it differs from
  /// `new_val`.
  fn is_invalid(&self, new_val: &T) -> bool {
    match &self.0 {
      Some(ref t) => t != new_val,
      _ => true,
    }
  }
}

/// Should the binding be cached or forced to the provided value?
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Bind {
  Forced,
  Cached,
}

/// What is bound on the backend.
#[derive(Debug)]
pub struct BoundState {
  _a: PhantomData<*const ()>, // !Send and !Sync

  draw_framebuffer: Cached<u32>,
  read_framebuffer: Cached<u32>,
  program: Cached<u32>,
  vertex_array: Cached<u32>,
  array_buffer: Cached<u32>,
  element_array_buffer: Cached<u32>,

  // per texture unit
  textures: Vec<Cached<(TextureTarget, u32)>>,
  samplers: Vec<Cached<u32>>,
  images: Vec<Cached<u32>>,

  srgb_framebuffer: Cached<bool>,
  multisample: Cached<bool>,
}

impl BoundState {
  pub fn new(texture_units: u32, image_units: u32) -> Self {
    BoundState {
      _a: PhantomData,
      draw_framebuffer: Cached::new(0),
      read_framebuffer: Cached::new(0),
      program: Cached::new(0),
      vertex_array: Cached::new(0),
      array_buffer: Cached::new(0),
      element_array_buffer: Cached::new(0),
      textures: (0..texture_units).map(|_| Cached(None)).collect(),
      samplers: (0..texture_units).map(|_| Cached::new(0)).collect(),
      images: (0..image_units).map(|_| Cached::new(0)).collect(),
      srgb_framebuffer: Cached(None),
      multisample: Cached(None),
    }
  }

  /// Forget everything; the next binds all hit the backend.
  pub fn invalidate(&mut self) {
    self.draw_framebuffer.invalidate();
    self.read_framebuffer.invalidate();
    self.program.invalidate();
    self.vertex_array.invalidate();
    self.array_buffer.invalidate();
    self.element_array_buffer.invalidate();
    self.textures.iter_mut().for_each(Cached::invalidate);
    self.samplers.iter_mut().for_each(Cached::invalidate);
    self.images.iter_mut().for_each(Cached::invalidate);
    self.srgb_framebuffer.invalidate();
    self.multisample.invalidate();
  }

  pub fn texture_units(&self) -> u32 {
    self.textures.len() as u32
  }

  pub fn image_units(&self) -> u32 {
    self.images.len() as u32
  }

  pub fn draw_framebuffer(&self) -> Option<u32> {
    self.draw_framebuffer.get().copied()
  }

  pub fn current_program(&self) -> Option<u32> {
    self.program.get().copied()
  }

  pub unsafe fn bind_framebuffer<B>(
    &mut self,
    backend: &mut B,
    target: FramebufferTarget,
    handle: u32,
    bind: Bind,
  ) where
    B: ?Sized + FramebufferBackend,
  {
    match target {
      FramebufferTarget::Both => {
        if bind == Bind::Forced
          || self.draw_framebuffer.is_invalid(&handle)
          || self.read_framebuffer.is_invalid(&handle)
        {
          backend.bind_framebuffer(FramebufferTarget::Both, handle);
          self.draw_framebuffer.set(handle);
          self.read_framebuffer.set(handle);
        }
      }

      FramebufferTarget::Draw => {
        if bind == Bind::Forced || self.draw_framebuffer.is_invalid(&handle) {
          backend.bind_framebuffer(FramebufferTarget::Draw, handle);
          self.draw_framebuffer.set(handle);
        }
      }

      FramebufferTarget::Read => {
        if bind == Bind::Forced || self.read_framebuffer.is_invalid(&handle) {
          backend.bind_framebuffer(FramebufferTarget::Read, handle);
          self.read_framebuffer.set(handle);
        }
      }
    }
  }

  /// Unbind `handle` from every framebuffer binding point it occupies.
  pub unsafe fn unbind_framebuffer<B>(&mut self, backend: &mut B, handle: u32)
  where
    B: ?Sized + FramebufferBackend,
  {
    if self.draw_framebuffer.get() == Some(&handle) {
      self.bind_framebuffer(backend, FramebufferTarget::Draw, 0, Bind::Cached);
    }

    if self.read_framebuffer.get() == Some(&handle) {
      self.bind_framebuffer(backend, FramebufferTarget::Read, 0, Bind::Cached);
    }
  }

  pub unsafe fn use_program<B>(&mut self, backend: &mut B, handle: u32, bind: Bind)
  where
    B: ?Sized + ShaderBackend,
  {
    if bind == Bind::Forced || self.program.is_invalid(&handle) {
      backend.use_program(handle);
      self.program.set(handle);
    }
  }

  pub unsafe fn bind_vertex_array<B>(&mut self, backend: &mut B, handle: u32, bind: Bind)
  where
    B: ?Sized + BufferBackend,
  {
    if bind == Bind::Forced || self.vertex_array.is_invalid(&handle) {
      backend.bind_vertex_array(handle);
      self.vertex_array.set(handle);

      // element buffer bindings are part of the vertex array state
      self.element_array_buffer.invalidate();
    }
  }

  pub unsafe fn bind_buffer<B>(
    &mut self,
    backend: &mut B,
    target: BufferTarget,
    handle: u32,
    bind: Bind,
  ) where
    B: ?Sized + BufferBackend,
  {
    let cached = match target {
      BufferTarget::Array => &mut self.array_buffer,
      BufferTarget::ElementArray => &mut self.element_array_buffer,
    };

    if bind == Bind::Forced || cached.is_invalid(&handle) {
      backend.bind_buffer(target, handle);
      cached.set(handle);
    }
  }

  /// Unbind `handle` from the buffer binding point it occupies, if any. Returns whether it was
  /// bound.
  pub unsafe fn unbind_buffer<B>(&mut self, backend: &mut B, handle: u32) -> bool
  where
    B: ?Sized + BufferBackend,
  {
    let mut was_bound = false;

    if self.array_buffer.get() == Some(&handle) {
      self.bind_buffer(backend, BufferTarget::Array, 0, Bind::Cached);
      was_bound = true;
    }

    if self.element_array_buffer.get() == Some(&handle) {
      self.bind_buffer(backend, BufferTarget::ElementArray, 0, Bind::Cached);
      was_bound = true;
    }

    was_bound
  }

  pub unsafe fn bind_texture<B>(
    &mut self,
    backend: &mut B,
    unit: u32,
    target: TextureTarget,
    handle: u32,
    bind: Bind,
  ) where
    B: ?Sized + TextureBackend,
  {
    let value = (target, handle);

    match self.textures.get_mut(unit as usize) {
      Some(cached) => {
        if bind == Bind::Forced || cached.is_invalid(&value) {
          backend.bind_texture(unit, target, handle);
          cached.set(value);
        }
      }

      None => {
        // out of the tracked range; never cache
        backend.bind_texture(unit, target, handle);
      }
    }
  }

  /// Clear a texture unit.
  pub unsafe fn unbind_texture_unit<B>(&mut self, backend: &mut B, unit: u32)
  where
    B: ?Sized + TextureBackend,
  {
    let target = match self.textures.get(unit as usize).and_then(Cached::get) {
      Some(&(_, 0)) => return,
      Some(&(target, _)) => target,
      None => TextureTarget::Texture2D,
    };

    self.bind_texture(backend, unit, target, 0, Bind::Cached);
  }

  /// Unbind `handle` from every texture unit it is bound to. Returns the number of units
  /// cleared.
  pub unsafe fn unbind_texture<B>(&mut self, backend: &mut B, handle: u32) -> usize
  where
    B: ?Sized + TextureBackend,
  {
    let units: Vec<(u32, TextureTarget)> = self
      .textures
      .iter()
      .enumerate()
      .filter_map(|(unit, cached)| match cached.get() {
        Some(&(target, h)) if h == handle => Some((unit as u32, target)),
        _ => None,
      })
      .collect();

    for &(unit, target) in &units {
      self.bind_texture(backend, unit, target, 0, Bind::Cached);
    }

    let images: Vec<u32> = self
      .images
      .iter()
      .enumerate()
      .filter_map(|(unit, cached)| (cached.get() == Some(&handle)).then(|| unit as u32))
      .collect();

    for &unit in &images {
      self.unbind_image_unit(backend, unit);
    }

    units.len() + images.len()
  }

  pub unsafe fn bind_sampler<B>(&mut self, backend: &mut B, unit: u32, handle: u32)
  where
    B: ?Sized + TextureBackend,
  {
    match self.samplers.get_mut(unit as usize) {
      Some(cached) => {
        if cached.is_invalid(&handle) {
          backend.bind_sampler(unit, handle);
          cached.set(handle);
        }
      }

      None => backend.bind_sampler(unit, handle),
    }
  }

  /// Unbind a sampler object from every unit it is bound to.
  pub unsafe fn unbind_sampler<B>(&mut self, backend: &mut B, handle: u32) -> usize
  where
    B: ?Sized + TextureBackend,
  {
    let units: Vec<u32> = self
      .samplers
      .iter()
      .enumerate()
      .filter_map(|(unit, cached)| (cached.get() == Some(&handle)).then(|| unit as u32))
      .collect();

    for &unit in &units {
      self.bind_sampler(backend, unit, 0);
    }

    units.len()
  }

  /// Record that `handle` was bound to image unit `unit`.
  pub fn set_image_unit(&mut self, unit: u32, handle: u32) {
    if let Some(cached) = self.images.get_mut(unit as usize) {
      cached.set(handle);
    }
  }

  pub unsafe fn unbind_image_unit<B>(&mut self, backend: &mut B, unit: u32)
  where
    B: ?Sized + TextureBackend,
  {
    if let Some(cached) = self.images.get_mut(unit as usize) {
      if cached.is_invalid(&0) {
        backend.bind_image_texture(
          unit,
          0,
          0,
          ImageAccess::ReadOnly,
          Format::Rgba,
          ComponentType::UnsignedByte,
        );
        cached.set(0);
      }
    }
  }

  pub unsafe fn set_srgb_framebuffer<B>(&mut self, backend: &mut B, enabled: bool)
  where
    B: ?Sized + FramebufferBackend,
  {
    if self.srgb_framebuffer.is_invalid(&enabled) {
      backend.set_srgb_framebuffer(enabled);
      self.srgb_framebuffer.set(enabled);
    }
  }

  pub unsafe fn set_multisample<B>(&mut self, backend: &mut B, enabled: bool)
  where
    B: ?Sized + FramebufferBackend,
  {
    if self.multisample.is_invalid(&enabled) {
      backend.set_multisample(enabled);
      self.multisample.set(enabled);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cached_values() {
    let mut cached = Cached::new(3);
    assert!(!cached.is_invalid(&3));
    assert!(cached.is_invalid(&4));

    cached.invalidate();
    assert!(cached.is_invalid(&3));

    cached.set(4);
    assert!(!cached.is_invalid(&4));
  }
}
