//! Host surfaces.
//!
//! An offscreen buffer may live on a host: the window (or any other surface) whose context it
//! renders with. The host is told when a parasite buffer frame begins and ends, and a buffer can
//! follow its host's size.

use crate::fb_props::FrameBufferProperties;

/// Kind of frame being rendered.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FrameMode {
  /// A regular frame.
  Render,
  /// A frame of a buffer living on this surface.
  Parasite,
  /// Redraw of the previous frame; no render-to-texture side effect.
  Refresh,
}

/// A surface a buffer can be hosted on.
pub trait HostSurface {
  /// Prepare the surface for a frame. Returns `false` if it is not ready.
  fn begin_frame(&mut self, mode: FrameMode) -> bool;

  fn end_frame(&mut self, mode: FrameMode);

  /// Size of the surface, in pixels.
  fn size(&self) -> [u32; 2];

  fn fb_properties(&self) -> FrameBufferProperties;

  /// Whether the surface is still alive. A buffer on a dead host is closed.
  fn is_valid(&self) -> bool;
}
