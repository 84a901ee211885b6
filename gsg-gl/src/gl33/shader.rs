use gl::types::*;
use gsg::backend::shader::{
  ActiveParameter, ParamType, ProgramError, SamplerKind, ScalarType, ShaderBackend, StageError,
  StageSource, StageType, UniformData,
};
use gsg::texture::TextureType;
use std::ffi::CString;
use std::ptr::{null, null_mut};

use crate::gl33::GL33;

unsafe impl ShaderBackend for GL33 {
  unsafe fn compile_program(&mut self, stages: &[StageSource]) -> Result<u32, ProgramError> {
    let mut handles = Vec::with_capacity(stages.len());

    for stage in stages {
      match self.compile_stage(stage) {
        Ok(handle) => handles.push(handle),

        Err(e) => {
          for handle in handles {
            gl::DeleteShader(handle);
          }

          return Err(e.into());
        }
      }
    }

    let program = gl::CreateProgram();

    for &handle in &handles {
      gl::AttachShader(program, handle);
    }

    let linked = link(program);

    // the program keeps the compiled code
    for handle in handles {
      gl::DetachShader(program, handle);
      gl::DeleteShader(handle);
    }

    match linked {
      Ok(()) => Ok(program),

      Err(e) => {
        gl::DeleteProgram(program);
        Err(e)
      }
    }
  }

  unsafe fn delete_program(&mut self, program: u32) {
    gl::DeleteProgram(program);
  }

  unsafe fn use_program(&mut self, program: u32) {
    gl::UseProgram(program);
  }

  unsafe fn active_uniforms(&mut self, program: u32) -> Vec<ActiveParameter> {
    active_parameters(
      program,
      gl::ACTIVE_UNIFORMS,
      gl::ACTIVE_UNIFORM_MAX_LENGTH,
      gl::GetActiveUniform,
      gl::GetUniformLocation,
    )
  }

  unsafe fn active_attributes(&mut self, program: u32) -> Vec<ActiveParameter> {
    active_parameters(
      program,
      gl::ACTIVE_ATTRIBUTES,
      gl::ACTIVE_ATTRIBUTE_MAX_LENGTH,
      gl::GetActiveAttrib,
      gl::GetAttribLocation,
    )
  }

  unsafe fn set_uniform(&mut self, location: i32, data: UniformData) {
    match data {
      UniformData::Float(n, values) => {
        let count = element_count(n, values.len());
        let ptr = values.as_ptr();

        match n {
          1 => gl::Uniform1fv(location, count, ptr),
          2 => gl::Uniform2fv(location, count, ptr),
          3 => gl::Uniform3fv(location, count, ptr),
          _ => gl::Uniform4fv(location, count, ptr),
        }
      }

      UniformData::Double(n, values) => {
        let count = element_count(n, values.len());
        let ptr = values.as_ptr();

        match n {
          1 => gl::Uniform1dv(location, count, ptr),
          2 => gl::Uniform2dv(location, count, ptr),
          3 => gl::Uniform3dv(location, count, ptr),
          _ => gl::Uniform4dv(location, count, ptr),
        }
      }

      UniformData::Int(n, values) => {
        let count = element_count(n, values.len());
        let ptr = values.as_ptr();

        match n {
          1 => gl::Uniform1iv(location, count, ptr),
          2 => gl::Uniform2iv(location, count, ptr),
          3 => gl::Uniform3iv(location, count, ptr),
          _ => gl::Uniform4iv(location, count, ptr),
        }
      }

      UniformData::UInt(n, values) => {
        let count = element_count(n, values.len());
        let ptr = values.as_ptr();

        match n {
          1 => gl::Uniform1uiv(location, count, ptr),
          2 => gl::Uniform2uiv(location, count, ptr),
          3 => gl::Uniform3uiv(location, count, ptr),
          _ => gl::Uniform4uiv(location, count, ptr),
        }
      }

      UniformData::FloatMatrix(dim, values) => {
        let count = element_count(dim * dim, values.len());
        let ptr = values.as_ptr();

        match dim {
          2 => gl::UniformMatrix2fv(location, count, gl::FALSE, ptr),
          3 => gl::UniformMatrix3fv(location, count, gl::FALSE, ptr),
          _ => gl::UniformMatrix4fv(location, count, gl::FALSE, ptr),
        }
      }

      UniformData::DoubleMatrix(dim, values) => {
        let count = element_count(dim * dim, values.len());
        let ptr = values.as_ptr();

        match dim {
          2 => gl::UniformMatrix2dv(location, count, gl::FALSE, ptr),
          3 => gl::UniformMatrix3dv(location, count, gl::FALSE, ptr),
          _ => gl::UniformMatrix4dv(location, count, gl::FALSE, ptr),
        }
      }

      UniformData::TextureHandle(handle) => {
        if let Some(fns) = self.state.bindless {
          (fns.uniform_handle)(location, handle);
        }
      }
    }
  }
}

impl GL33 {
  unsafe fn compile_stage(&mut self, stage: &StageSource) -> Result<GLuint, StageError> {
    let ty = stage.ty;
    let supported = match ty {
      StageType::TessellationControlShader | StageType::TessellationEvaluationShader => {
        self.state.version_at_least(4, 0)
      }
      StageType::ComputeShader => {
        self.state.version_at_least(4, 3) || self.state.has_extension("GL_ARB_compute_shader")
      }
      _ => true,
    };

    if !supported {
      return Err(StageError::UnsupportedType(ty));
    }

    let c_src = CString::new(stage.source.as_bytes()).map_err(|_| {
      StageError::CompilationFailed(ty, "source contains a nul byte".to_owned())
    })?;

    let handle = gl::CreateShader(opengl_shader_type(ty));

    if handle == 0 {
      return Err(StageError::CompilationFailed(
        ty,
        "unable to create shader stage".to_owned(),
      ));
    }

    gl::ShaderSource(handle, 1, [c_src.as_ptr()].as_ptr(), null());
    gl::CompileShader(handle);

    let mut compiled: GLint = gl::FALSE.into();
    gl::GetShaderiv(handle, gl::COMPILE_STATUS, &mut compiled);

    if compiled == gl::TRUE.into() {
      Ok(handle)
    } else {
      let mut log_len: GLint = 0;
      gl::GetShaderiv(handle, gl::INFO_LOG_LENGTH, &mut log_len);

      let mut log: Vec<u8> = Vec::with_capacity(log_len.max(0) as usize);
      gl::GetShaderInfoLog(handle, log_len, null_mut(), log.as_mut_ptr() as *mut GLchar);

      gl::DeleteShader(handle);

      log.set_len(log_len.max(0) as usize);

      Err(StageError::CompilationFailed(ty, info_log(log)))
    }
  }
}

unsafe fn link(handle: GLuint) -> Result<(), ProgramError> {
  gl::LinkProgram(handle);

  let mut linked: GLint = gl::FALSE.into();
  gl::GetProgramiv(handle, gl::LINK_STATUS, &mut linked);

  if linked == gl::TRUE.into() {
    Ok(())
  } else {
    let mut log_len: GLint = 0;
    gl::GetProgramiv(handle, gl::INFO_LOG_LENGTH, &mut log_len);

    let mut log: Vec<u8> = Vec::with_capacity(log_len.max(0) as usize);
    gl::GetProgramInfoLog(handle, log_len, null_mut(), log.as_mut_ptr() as *mut GLchar);

    log.set_len(log_len.max(0) as usize);

    Err(ProgramError::link_failed(info_log(log)))
  }
}

// info logs are nul-terminated
fn info_log(mut log: Vec<u8>) -> String {
  if let Some(nul) = log.iter().position(|&b| b == 0) {
    log.truncate(nul);
  }

  String::from_utf8_lossy(&log).into_owned()
}

type GetActive =
  unsafe fn(GLuint, GLuint, GLsizei, *mut GLsizei, *mut GLint, *mut GLenum, *mut GLchar);
type GetLocation = unsafe fn(GLuint, *const GLchar) -> GLint;

unsafe fn active_parameters(
  program: GLuint,
  count_pname: GLenum,
  max_len_pname: GLenum,
  get_active: GetActive,
  get_location: GetLocation,
) -> Vec<ActiveParameter> {
  let mut count: GLint = 0;
  gl::GetProgramiv(program, count_pname, &mut count);

  let mut max_len: GLint = 0;
  gl::GetProgramiv(program, max_len_pname, &mut max_len);

  let mut params = Vec::with_capacity(count.max(0) as usize);
  let mut name_buf = vec![0u8; max_len.max(1) as usize];

  for index in 0..count.max(0) as GLuint {
    let mut len: GLsizei = 0;
    let mut size: GLint = 0;
    let mut ty: GLenum = 0;

    get_active(
      program,
      index,
      name_buf.len() as GLsizei,
      &mut len,
      &mut size,
      &mut ty,
      name_buf.as_mut_ptr() as *mut GLchar,
    );

    let name = String::from_utf8_lossy(&name_buf[..len.max(0) as usize]).into_owned();

    // the location is looked up by the reported name, array suffix included
    let location = match CString::new(name.as_bytes()) {
      Ok(c_name) => get_location(program, c_name.as_ptr()),
      Err(_) => -1,
    };

    params.push(ActiveParameter {
      name,
      location,
      size: size.max(1) as usize,
      ty: param_type(ty),
    });
  }

  params
}

fn element_count(components: u8, len: usize) -> GLsizei {
  (len / components.max(1) as usize) as GLsizei
}

fn opengl_shader_type(t: StageType) -> GLenum {
  match t {
    StageType::VertexShader => gl::VERTEX_SHADER,
    StageType::TessellationControlShader => gl::TESS_CONTROL_SHADER,
    StageType::TessellationEvaluationShader => gl::TESS_EVALUATION_SHADER,
    StageType::GeometryShader => gl::GEOMETRY_SHADER,
    StageType::FragmentShader => gl::FRAGMENT_SHADER,
    StageType::ComputeShader => gl::COMPUTE_SHADER,
  }
}

fn param_type(ty: GLenum) -> ParamType {
  use ParamType::{Image, Matrix, Sampler, Vector};
  use SamplerKind as K;
  use ScalarType as S;
  use TextureType as T;

  match ty {
    gl::FLOAT => Vector(S::Float, 1),
    gl::FLOAT_VEC2 => Vector(S::Float, 2),
    gl::FLOAT_VEC3 => Vector(S::Float, 3),
    gl::FLOAT_VEC4 => Vector(S::Float, 4),
    gl::DOUBLE => Vector(S::Double, 1),
    gl::DOUBLE_VEC2 => Vector(S::Double, 2),
    gl::DOUBLE_VEC3 => Vector(S::Double, 3),
    gl::DOUBLE_VEC4 => Vector(S::Double, 4),
    gl::INT => Vector(S::Int, 1),
    gl::INT_VEC2 => Vector(S::Int, 2),
    gl::INT_VEC3 => Vector(S::Int, 3),
    gl::INT_VEC4 => Vector(S::Int, 4),
    gl::UNSIGNED_INT => Vector(S::UInt, 1),
    gl::UNSIGNED_INT_VEC2 => Vector(S::UInt, 2),
    gl::UNSIGNED_INT_VEC3 => Vector(S::UInt, 3),
    gl::UNSIGNED_INT_VEC4 => Vector(S::UInt, 4),
    gl::BOOL => Vector(S::Bool, 1),
    gl::BOOL_VEC2 => Vector(S::Bool, 2),
    gl::BOOL_VEC3 => Vector(S::Bool, 3),
    gl::BOOL_VEC4 => Vector(S::Bool, 4),

    gl::FLOAT_MAT2 => Matrix(S::Float, 2),
    gl::FLOAT_MAT3 => Matrix(S::Float, 3),
    gl::FLOAT_MAT4 => Matrix(S::Float, 4),
    gl::DOUBLE_MAT2 => Matrix(S::Double, 2),
    gl::DOUBLE_MAT3 => Matrix(S::Double, 3),
    gl::DOUBLE_MAT4 => Matrix(S::Double, 4),

    gl::SAMPLER_1D => Sampler(K::Float, T::Texture1D),
    gl::SAMPLER_2D => Sampler(K::Float, T::Texture2D),
    gl::SAMPLER_3D => Sampler(K::Float, T::Texture3D),
    gl::SAMPLER_2D_ARRAY => Sampler(K::Float, T::Texture2DArray),
    gl::SAMPLER_CUBE => Sampler(K::Float, T::CubeMap),
    gl::SAMPLER_BUFFER => Sampler(K::Float, T::BufferTexture),
    gl::INT_SAMPLER_1D => Sampler(K::Int, T::Texture1D),
    gl::INT_SAMPLER_2D => Sampler(K::Int, T::Texture2D),
    gl::INT_SAMPLER_3D => Sampler(K::Int, T::Texture3D),
    gl::INT_SAMPLER_2D_ARRAY => Sampler(K::Int, T::Texture2DArray),
    gl::INT_SAMPLER_CUBE => Sampler(K::Int, T::CubeMap),
    gl::INT_SAMPLER_BUFFER => Sampler(K::Int, T::BufferTexture),
    gl::UNSIGNED_INT_SAMPLER_1D => Sampler(K::UInt, T::Texture1D),
    gl::UNSIGNED_INT_SAMPLER_2D => Sampler(K::UInt, T::Texture2D),
    gl::UNSIGNED_INT_SAMPLER_3D => Sampler(K::UInt, T::Texture3D),
    gl::UNSIGNED_INT_SAMPLER_2D_ARRAY => Sampler(K::UInt, T::Texture2DArray),
    gl::UNSIGNED_INT_SAMPLER_CUBE => Sampler(K::UInt, T::CubeMap),
    gl::UNSIGNED_INT_SAMPLER_BUFFER => Sampler(K::UInt, T::BufferTexture),
    gl::SAMPLER_1D_SHADOW => Sampler(K::Shadow, T::Texture1D),
    gl::SAMPLER_2D_SHADOW => Sampler(K::Shadow, T::Texture2D),
    gl::SAMPLER_2D_ARRAY_SHADOW => Sampler(K::Shadow, T::Texture2DArray),
    gl::SAMPLER_CUBE_SHADOW => Sampler(K::Shadow, T::CubeMap),

    gl::IMAGE_1D => Image(K::Float, T::Texture1D),
    gl::IMAGE_2D => Image(K::Float, T::Texture2D),
    gl::IMAGE_3D => Image(K::Float, T::Texture3D),
    gl::IMAGE_2D_ARRAY => Image(K::Float, T::Texture2DArray),
    gl::IMAGE_CUBE => Image(K::Float, T::CubeMap),
    gl::IMAGE_BUFFER => Image(K::Float, T::BufferTexture),
    gl::INT_IMAGE_1D => Image(K::Int, T::Texture1D),
    gl::INT_IMAGE_2D => Image(K::Int, T::Texture2D),
    gl::INT_IMAGE_3D => Image(K::Int, T::Texture3D),
    gl::INT_IMAGE_2D_ARRAY => Image(K::Int, T::Texture2DArray),
    gl::INT_IMAGE_CUBE => Image(K::Int, T::CubeMap),
    gl::INT_IMAGE_BUFFER => Image(K::Int, T::BufferTexture),
    gl::UNSIGNED_INT_IMAGE_1D => Image(K::UInt, T::Texture1D),
    gl::UNSIGNED_INT_IMAGE_2D => Image(K::UInt, T::Texture2D),
    gl::UNSIGNED_INT_IMAGE_3D => Image(K::UInt, T::Texture3D),
    gl::UNSIGNED_INT_IMAGE_2D_ARRAY => Image(K::UInt, T::Texture2DArray),
    gl::UNSIGNED_INT_IMAGE_CUBE => Image(K::UInt, T::CubeMap),
    gl::UNSIGNED_INT_IMAGE_BUFFER => Image(K::UInt, T::BufferTexture),

    _ => ParamType::Unknown(ty),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn info_log_stops_at_nul() {
    assert_eq!(info_log(b"0:1: error\0\0".to_vec()), "0:1: error");
    assert_eq!(info_log(Vec::new()), "");
  }

  #[test]
  fn reflected_types() {
    assert_eq!(param_type(gl::FLOAT_MAT4), ParamType::Matrix(ScalarType::Float, 4));
    assert_eq!(
      param_type(gl::SAMPLER_2D_SHADOW),
      ParamType::Sampler(SamplerKind::Shadow, TextureType::Texture2D)
    );
    assert_eq!(param_type(0xdead), ParamType::Unknown(0xdead));
  }

  #[test]
  fn uniform_element_count() {
    assert_eq!(element_count(4, 12), 3);
    assert_eq!(element_count(16, 16), 1);
  }
}
