//! Vertex and index buffer contexts.

use crate::resource::{impl_resource_context, Residency};

/// GPU copy of a [`GeomVertexArrayData`](crate::geom::GeomVertexArrayData).
#[derive(Debug)]
pub struct VertexBufferContext {
  pub(crate) array: u64,
  pub(crate) handle: u32,
  pub(crate) residency: Residency,
  pub(crate) data_size_bytes: usize,
  pub(crate) active: bool,
  pub(crate) uploaded_modified: Option<u64>,
}

impl VertexBufferContext {
  pub(crate) fn new(array: u64, handle: u32) -> Self {
    VertexBufferContext {
      array,
      handle,
      residency: Residency::Unloaded,
      data_size_bytes: 0,
      active: false,
      uploaded_modified: None,
    }
  }

  /// Identifier of the vertex array this context mirrors.
  pub fn array_id(&self) -> u64 {
    self.array
  }

  pub(crate) fn reset(&mut self, handle: u32) {
    self.handle = handle;
    self.residency = Residency::Unloaded;
    self.data_size_bytes = 0;
    self.uploaded_modified = None;
  }
}

impl_resource_context!(VertexBufferContext);

/// GPU copy of an [`IndexData`](crate::geom::IndexData).
#[derive(Debug)]
pub struct IndexBufferContext {
  pub(crate) indices: u64,
  pub(crate) handle: u32,
  pub(crate) residency: Residency,
  pub(crate) data_size_bytes: usize,
  pub(crate) active: bool,
  pub(crate) uploaded_modified: Option<u64>,
}

impl IndexBufferContext {
  pub(crate) fn new(indices: u64, handle: u32) -> Self {
    IndexBufferContext {
      indices,
      handle,
      residency: Residency::Unloaded,
      data_size_bytes: 0,
      active: false,
      uploaded_modified: None,
    }
  }

  pub fn index_data_id(&self) -> u64 {
    self.indices
  }

  pub(crate) fn reset(&mut self, handle: u32) {
    self.handle = handle;
    self.residency = Residency::Unloaded;
    self.data_size_bytes = 0;
    self.uploaded_modified = None;
  }
}

impl_resource_context!(IndexBufferContext);
