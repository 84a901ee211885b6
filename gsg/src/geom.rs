//! CPU-side geometry.
//!
//! Vertex data is organized in arrays of interleaved, named columns. Shaders find their
//! attributes by column name.

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GEOM_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
  NEXT_GEOM_ID.fetch_add(1, Ordering::Relaxed)
}

/// Numeric type of a vertex column or index.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NumericType {
  U8,
  U16,
  U32,
  I8,
  I16,
  I32,
  F32,
  F64,
}

impl NumericType {
  pub fn bytes(self) -> usize {
    match self {
      NumericType::U8 | NumericType::I8 => 1,
      NumericType::U16 | NumericType::I16 => 2,
      NumericType::U32 | NumericType::I32 | NumericType::F32 => 4,
      NumericType::F64 => 8,
    }
  }
}

/// Index element type.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IndexType {
  U8,
  U16,
  U32,
}

impl IndexType {
  pub fn bytes(self) -> usize {
    match self {
      IndexType::U8 => 1,
      IndexType::U16 => 2,
      IndexType::U32 => 4,
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PrimitiveType {
  Points,
  Lines,
  LineStrip,
  Triangles,
  TriangleStrip,
  TriangleFan,
  Patches,
}

/// Expected update frequency of a buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UsageHint {
  Static,
  Dynamic,
  Stream,
}

/// A named column inside an interleaved vertex array.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct GeomVertexColumn {
  pub name: String,
  pub components: u8,
  pub numeric_type: NumericType,
  /// Byte offset inside a vertex.
  pub offset: usize,
  pub normalized: bool,
}

impl GeomVertexColumn {
  pub fn new(name: impl Into<String>, components: u8, numeric_type: NumericType) -> Self {
    GeomVertexColumn {
      name: name.into(),
      components,
      numeric_type,
      offset: 0,
      normalized: false,
    }
  }

  pub fn normalized(self) -> Self {
    GeomVertexColumn {
      normalized: true,
      ..self
    }
  }

  pub fn bytes(&self) -> usize {
    self.components as usize * self.numeric_type.bytes()
  }
}

#[derive(Debug)]
struct ArrayData {
  id: u64,
  columns: Vec<GeomVertexColumn>,
  stride: usize,
  usage: UsageHint,
  data: Vec<u8>,
  modified: u64,
}

/// One interleaved vertex array.
#[derive(Clone, Debug)]
pub struct GeomVertexArrayData(Rc<RefCell<ArrayData>>);

impl GeomVertexArrayData {
  /// Create an array; column offsets are computed from declaration order.
  pub fn new(columns: impl IntoIterator<Item = GeomVertexColumn>, usage: UsageHint) -> Self {
    let mut stride = 0;
    let columns = columns
      .into_iter()
      .map(|mut column| {
        column.offset = stride;
        stride += column.bytes();
        column
      })
      .collect();

    GeomVertexArrayData(Rc::new(RefCell::new(ArrayData {
      id: next_id(),
      columns,
      stride,
      usage,
      data: Vec::new(),
      modified: 1,
    })))
  }

  fn inner(&self) -> Ref<ArrayData> {
    self.0.borrow()
  }

  pub fn id(&self) -> u64 {
    self.inner().id
  }

  pub fn stride(&self) -> usize {
    self.inner().stride
  }

  pub fn usage(&self) -> UsageHint {
    self.inner().usage
  }

  pub fn column(&self, name: &str) -> Option<GeomVertexColumn> {
    self.inner().columns.iter().find(|c| c.name == name).cloned()
  }

  pub fn num_rows(&self) -> usize {
    let inner = self.inner();

    if inner.stride == 0 {
      0
    } else {
      inner.data.len() / inner.stride
    }
  }

  pub fn set_data(&self, data: Vec<u8>) {
    let mut inner = self.0.borrow_mut();
    inner.data = data;
    inner.modified += 1;
  }

  pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
    f(&self.inner().data)
  }

  pub fn data_size_bytes(&self) -> usize {
    self.inner().data.len()
  }

  pub fn modified(&self) -> u64 {
    self.inner().modified
  }
}

/// A set of vertex arrays describing the same vertices.
#[derive(Clone, Debug)]
pub struct GeomVertexData {
  arrays: Vec<GeomVertexArrayData>,
}

impl GeomVertexData {
  pub fn new(arrays: Vec<GeomVertexArrayData>) -> Self {
    GeomVertexData { arrays }
  }

  pub fn arrays(&self) -> &[GeomVertexArrayData] {
    &self.arrays
  }

  /// Find the array and column holding the column `name`.
  pub fn find_column(&self, name: &str) -> Option<(&GeomVertexArrayData, GeomVertexColumn)> {
    self
      .arrays
      .iter()
      .find_map(|array| array.column(name).map(|column| (array, column)))
  }

  pub fn num_rows(&self) -> usize {
    self
      .arrays
      .first()
      .map(GeomVertexArrayData::num_rows)
      .unwrap_or(0)
  }
}

#[derive(Debug)]
struct IndexDataInner {
  id: u64,
  index_type: IndexType,
  usage: UsageHint,
  data: Vec<u8>,
  modified: u64,
}

/// Vertex indices of a primitive.
#[derive(Clone, Debug)]
pub struct IndexData(Rc<RefCell<IndexDataInner>>);

impl IndexData {
  pub fn new(index_type: IndexType, usage: UsageHint, data: Vec<u8>) -> Self {
    IndexData(Rc::new(RefCell::new(IndexDataInner {
      id: next_id(),
      index_type,
      usage,
      data,
      modified: 1,
    })))
  }

  pub fn from_u16(indices: &[u16]) -> Self {
    let data = indices.iter().flat_map(|i| i.to_ne_bytes()).collect();
    IndexData::new(IndexType::U16, UsageHint::Static, data)
  }

  pub fn id(&self) -> u64 {
    self.0.borrow().id
  }

  pub fn index_type(&self) -> IndexType {
    self.0.borrow().index_type
  }

  pub fn usage(&self) -> UsageHint {
    self.0.borrow().usage
  }

  pub fn num_indices(&self) -> usize {
    let inner = self.0.borrow();
    inner.data.len() / inner.index_type.bytes()
  }

  pub fn set_data(&self, data: Vec<u8>) {
    let mut inner = self.0.borrow_mut();
    inner.data = data;
    inner.modified += 1;
  }

  pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
    f(&self.0.borrow().data)
  }

  pub fn modified(&self) -> u64 {
    self.0.borrow().modified
  }
}

/// A drawable primitive: vertex data plus optional indices.
#[derive(Clone, Debug)]
pub struct Geom {
  id: u64,
  primitive: PrimitiveType,
  vertex_data: GeomVertexData,
  indices: Option<IndexData>,
}

impl Geom {
  pub fn new(
    primitive: PrimitiveType,
    vertex_data: GeomVertexData,
    indices: Option<IndexData>,
  ) -> Self {
    Geom {
      id: next_id(),
      primitive,
      vertex_data,
      indices,
    }
  }

  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn primitive(&self) -> PrimitiveType {
    self.primitive
  }

  pub fn vertex_data(&self) -> &GeomVertexData {
    &self.vertex_data
  }

  pub fn indices(&self) -> Option<&IndexData> {
    self.indices.as_ref()
  }
}
