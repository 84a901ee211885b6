//! GPU copies of CPU-side resources.
//!
//! Every context wraps one backend handle plus the bookkeeping the memory budget needs: how many
//! bytes are resident, whether the resource was used this frame, and whether it is currently
//! unloaded. Contexts live in the guardian's [`PreparedObjects`] arenas; nothing else owns them.
//!
//! [`PreparedObjects`]: crate::prepared::PreparedObjects

pub mod buffer;
pub mod geom;
pub mod sampler;
pub mod texture;

/// Residency of a context's data on the device.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Residency {
  /// Data has been uploaded and is resident.
  Resident,
  /// The handle exists but holds no data; the next use re-uploads.
  Unloaded,
}

/// Common bookkeeping of every evictable context.
pub trait ResourceContext {
  /// Backend handle. Always a valid name, even when unloaded.
  fn handle(&self) -> u32;

  fn residency(&self) -> Residency;

  /// Bytes resident on the device.
  fn data_size_bytes(&self) -> usize;

  /// Whether the resource was used during the current frame.
  fn is_active(&self) -> bool;

  fn set_active(&mut self, active: bool);

  fn is_resident(&self) -> bool {
    self.residency() == Residency::Resident
  }
}

macro_rules! impl_resource_context {
  ($t:ty) => {
    impl $crate::resource::ResourceContext for $t {
      fn handle(&self) -> u32 {
        self.handle
      }

      fn residency(&self) -> $crate::resource::Residency {
        self.residency
      }

      fn data_size_bytes(&self) -> usize {
        self.data_size_bytes
      }

      fn is_active(&self) -> bool {
        self.active
      }

      fn set_active(&mut self, active: bool) {
        self.active = active;
      }
    }
  };
}

pub(crate) use impl_resource_context;
