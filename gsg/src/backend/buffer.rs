//! Vertex / index buffer and vertex array backend interface.

use std::error;
use std::fmt;

use crate::geom::{IndexType, NumericType, PrimitiveType, UsageHint};

/// Buffer binding point.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BufferTarget {
  Array,
  ElementArray,
}

/// Layout of a vertex attribute inside a bound array buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AttribFormat {
  pub components: u8,
  pub numeric_type: NumericType,
  pub normalized: bool,
  pub stride: usize,
  pub offset: usize,
  pub divisor: u32,
}

/// Fixed-function vertex array.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LegacyArray {
  Vertex,
  Normal,
  Color,
  SecondaryColor,
  FogCoord,
  TexCoord(u32),
}

/// Buffer errors.
#[non_exhaustive]
#[derive(Debug, Eq, PartialEq)]
pub enum BufferError {
  /// The device could not allocate the requested amount of bytes.
  CannotCreate { size: usize },
}

impl fmt::Display for BufferError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      BufferError::CannotCreate { size } => {
        write!(f, "cannot create buffer of {} bytes", size)
      }
    }
  }
}

impl error::Error for BufferError {}

pub unsafe trait BufferBackend {
  unsafe fn gen_buffer(&mut self) -> u32;

  unsafe fn delete_buffer(&mut self, buffer: u32);

  /// Bind `buffer` to `target`. `0` unbinds.
  unsafe fn bind_buffer(&mut self, target: BufferTarget, buffer: u32);

  /// Fill the buffer bound at `target`. Returns the number of bytes resident on the device.
  unsafe fn upload_buffer(
    &mut self,
    target: BufferTarget,
    data: &[u8],
    usage: UsageHint,
  ) -> Result<usize, BufferError>;

  unsafe fn gen_vertex_array(&mut self) -> u32;

  unsafe fn delete_vertex_array(&mut self, vao: u32);

  unsafe fn bind_vertex_array(&mut self, vao: u32);

  /// Source generic attribute `location` from the bound array buffer.
  unsafe fn enable_vertex_attrib(&mut self, location: u32, format: &AttribFormat);

  unsafe fn disable_vertex_attrib(&mut self, location: u32);

  /// Constant value of a disabled generic attribute.
  unsafe fn set_vertex_attrib_default(&mut self, location: u32, value: [f32; 4]);

  /// Source a fixed-function array from the bound array buffer.
  unsafe fn enable_legacy_array(&mut self, array: LegacyArray, format: &AttribFormat);

  unsafe fn disable_legacy_array(&mut self, array: LegacyArray);

  /// Constant value of a disabled fixed-function array.
  unsafe fn set_legacy_default(&mut self, array: LegacyArray, value: [f32; 4]);

  unsafe fn draw_arrays(&mut self, primitive: PrimitiveType, first: usize, count: usize);

  unsafe fn draw_elements(
    &mut self,
    primitive: PrimitiveType,
    count: usize,
    index_type: IndexType,
    offset: usize,
  );
}
