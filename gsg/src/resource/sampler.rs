//! Sampler contexts.

use crate::resource::{impl_resource_context, Residency};
use crate::texture::SamplerState;

/// GPU sampler object for one [`SamplerState`].
#[derive(Debug)]
pub struct SamplerContext {
  pub(crate) state: SamplerState,
  pub(crate) handle: u32,
  pub(crate) residency: Residency,
  pub(crate) data_size_bytes: usize,
  pub(crate) active: bool,
}

impl SamplerContext {
  pub(crate) fn new(state: SamplerState, handle: u32) -> Self {
    SamplerContext {
      state,
      handle,
      residency: Residency::Unloaded,
      data_size_bytes: 0,
      active: false,
    }
  }

  pub fn state(&self) -> &SamplerState {
    &self.state
  }
}

impl_resource_context!(SamplerContext);
