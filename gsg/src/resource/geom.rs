//! Geom contexts.

/// Per-geom GPU state: the vertex array object the geom's attribute layout is recorded in.
///
/// Geom contexts hold no data of their own and are never evicted; their buffers are.
#[derive(Debug)]
pub struct GeomContext {
  pub(crate) geom: u64,
  /// Vertex array object, `0` when the backend has none.
  pub(crate) vao: u32,
}

impl GeomContext {
  pub(crate) fn new(geom: u64, vao: u32) -> Self {
    GeomContext { geom, vao }
  }

  pub fn geom_id(&self) -> u64 {
    self.geom
  }

  pub fn vertex_array(&self) -> u32 {
    self.vao
  }
}
