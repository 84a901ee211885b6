use gl::types::*;
use gsg::backend::buffer::{AttribFormat, BufferBackend, BufferError, BufferTarget, LegacyArray};
use gsg::geom::{IndexType, NumericType, PrimitiveType, UsageHint};
use std::os::raw::c_void;

use crate::gl33::GL33;

unsafe impl BufferBackend for GL33 {
  unsafe fn gen_buffer(&mut self) -> u32 {
    let mut buffer: GLuint = 0;
    gl::GenBuffers(1, &mut buffer);
    buffer
  }

  unsafe fn delete_buffer(&mut self, buffer: u32) {
    gl::DeleteBuffers(1, &buffer);
  }

  unsafe fn bind_buffer(&mut self, target: BufferTarget, buffer: u32) {
    gl::BindBuffer(opengl_buffer_target(target), buffer);
  }

  unsafe fn upload_buffer(
    &mut self,
    target: BufferTarget,
    data: &[u8],
    usage: UsageHint,
  ) -> Result<usize, BufferError> {
    let size = data.len();

    gl::BufferData(
      opengl_buffer_target(target),
      size as GLsizeiptr,
      data.as_ptr() as *const c_void,
      opengl_usage(usage),
    );

    if gl::GetError() == gl::OUT_OF_MEMORY {
      return Err(BufferError::CannotCreate { size });
    }

    Ok(size)
  }

  unsafe fn gen_vertex_array(&mut self) -> u32 {
    let mut vao: GLuint = 0;
    gl::GenVertexArrays(1, &mut vao);
    vao
  }

  unsafe fn delete_vertex_array(&mut self, vao: u32) {
    gl::DeleteVertexArrays(1, &vao);
  }

  unsafe fn bind_vertex_array(&mut self, vao: u32) {
    gl::BindVertexArray(vao);
  }

  unsafe fn enable_vertex_attrib(&mut self, location: u32, format: &AttribFormat) {
    set_attrib_pointer(location, format);
    gl::EnableVertexAttribArray(location);
    gl::VertexAttribDivisor(location, format.divisor);
  }

  unsafe fn disable_vertex_attrib(&mut self, location: u32) {
    gl::DisableVertexAttribArray(location);
  }

  unsafe fn set_vertex_attrib_default(&mut self, location: u32, value: [f32; 4]) {
    gl::VertexAttrib4fv(location, value.as_ptr());
  }

  unsafe fn enable_legacy_array(&mut self, array: LegacyArray, format: &AttribFormat) {
    self.enable_vertex_attrib(legacy_location(array), format);
  }

  unsafe fn disable_legacy_array(&mut self, array: LegacyArray) {
    gl::DisableVertexAttribArray(legacy_location(array));
  }

  unsafe fn set_legacy_default(&mut self, array: LegacyArray, value: [f32; 4]) {
    gl::VertexAttrib4fv(legacy_location(array), value.as_ptr());
  }

  unsafe fn draw_arrays(&mut self, primitive: PrimitiveType, first: usize, count: usize) {
    gl::DrawArrays(
      opengl_primitive(primitive),
      first as GLint,
      count as GLsizei,
    );
  }

  unsafe fn draw_elements(
    &mut self,
    primitive: PrimitiveType,
    count: usize,
    index_type: IndexType,
    offset: usize,
  ) {
    gl::DrawElements(
      opengl_primitive(primitive),
      count as GLsizei,
      opengl_index_type(index_type),
      offset as *const c_void,
    );
  }
}

// integer columns not normalized keep their integer type in the shader
unsafe fn set_attrib_pointer(location: u32, format: &AttribFormat) {
  let stride = format.stride as GLsizei;
  let offset = format.offset as *const c_void;
  let size = format.components as GLint;
  let ty = opengl_numeric_type(format.numeric_type);

  match format.numeric_type {
    NumericType::F32 => {
      gl::VertexAttribPointer(location, size, ty, gl::FALSE, stride, offset);
    }

    NumericType::F64 => {
      gl::VertexAttribLPointer(location, size, ty, stride, offset);
    }

    _ if format.normalized => {
      gl::VertexAttribPointer(location, size, ty, gl::TRUE, stride, offset);
    }

    _ => {
      gl::VertexAttribIPointer(location, size, ty, stride, offset);
    }
  }
}

// generic locations aliased by the fixed-function arrays on common drivers
fn legacy_location(array: LegacyArray) -> u32 {
  match array {
    LegacyArray::Vertex => 0,
    LegacyArray::Normal => 2,
    LegacyArray::Color => 3,
    LegacyArray::SecondaryColor => 4,
    LegacyArray::FogCoord => 5,
    LegacyArray::TexCoord(i) => 8 + i,
  }
}

fn opengl_buffer_target(target: BufferTarget) -> GLenum {
  match target {
    BufferTarget::Array => gl::ARRAY_BUFFER,
    BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
  }
}

fn opengl_usage(usage: UsageHint) -> GLenum {
  match usage {
    UsageHint::Static => gl::STATIC_DRAW,
    UsageHint::Dynamic => gl::DYNAMIC_DRAW,
    UsageHint::Stream => gl::STREAM_DRAW,
  }
}

fn opengl_numeric_type(ty: NumericType) -> GLenum {
  match ty {
    NumericType::U8 => gl::UNSIGNED_BYTE,
    NumericType::U16 => gl::UNSIGNED_SHORT,
    NumericType::U32 => gl::UNSIGNED_INT,
    NumericType::I8 => gl::BYTE,
    NumericType::I16 => gl::SHORT,
    NumericType::I32 => gl::INT,
    NumericType::F32 => gl::FLOAT,
    NumericType::F64 => gl::DOUBLE,
  }
}

fn opengl_index_type(ty: IndexType) -> GLenum {
  match ty {
    IndexType::U8 => gl::UNSIGNED_BYTE,
    IndexType::U16 => gl::UNSIGNED_SHORT,
    IndexType::U32 => gl::UNSIGNED_INT,
  }
}

fn opengl_primitive(primitive: PrimitiveType) -> GLenum {
  match primitive {
    PrimitiveType::Points => gl::POINTS,
    PrimitiveType::Lines => gl::LINES,
    PrimitiveType::LineStrip => gl::LINE_STRIP,
    PrimitiveType::Triangles => gl::TRIANGLES,
    PrimitiveType::TriangleStrip => gl::TRIANGLE_STRIP,
    PrimitiveType::TriangleFan => gl::TRIANGLE_FAN,
    PrimitiveType::Patches => gl::PATCHES,
  }
}
