//! Shader contexts.
//!
//! A [`ShaderContext`] is a linked program plus the binding specs reflected from it. It is
//! created once per shader per guardian, and driven by the guardian every time the render state
//! changes:
//!
//! 1. [`ShaderContext::issue_parameters`] pushes the uniforms whose dependencies changed,
//! 2. [`ShaderContext::update_texture_bindings`] binds textures and images,
//! 3. [`ShaderContext::update_vertex_arrays`] sources attributes for each geom drawn.
//!
//! A context that loses a required input releases its program and becomes invalid; the guardian
//! rebuilds it on next use.

use log::{debug, error, info, warn};

use crate::backend::buffer::AttribFormat;
use crate::backend::shader::{ActiveParameter, ParamType, ScalarType, StageType, UniformData};
use crate::backend::texture::{ImageAccess, MemoryBarrier};
use crate::backend::Backend;
use crate::capabilities::Capabilities;
use crate::context::DrawContext;
use crate::geom::Geom;
use crate::render_state::{PtrData, RenderState, ShaderInput, StateDeps};
use crate::shader::parse::{classify_attribute, classify_uniform, Uniform};
use crate::shader::spec::{
  ImageSpec, MatSpec, MatValue, PtrSpec, TexSource, TexSpec, VarSource, VarSpec,
};
use crate::shader::{Shader, ShaderError, ShaderId, ShaderLanguage};
use crate::state::Bind;
use crate::texture::{SamplerState, Texture};
use crate::transform::TransformSource;

/// Outcome of pushing a pointer spec.
enum PtrPush {
  Pushed,
  TooSmall { supplied: usize },
  Incompatible,
}

/// A linked program and its binding specs.
#[derive(Debug)]
pub struct ShaderContext {
  shader: ShaderId,
  program: u32,
  valid: bool,
  mat_specs: Vec<MatSpec>,
  ptr_specs: Vec<PtrSpec>,
  tex_specs: Vec<TexSpec>,
  img_specs: Vec<ImageSpec>,
  var_specs: Vec<VarSpec>,
  // bindless handle last pushed to each sampler, if any
  tex_handles: Vec<Option<u64>>,
}

impl ShaderContext {
  /// Compile `shader` and reflect its parameters.
  pub fn new<B>(ctx: &mut DrawContext<B>, shader: &Shader) -> Result<Self, ShaderError>
  where
    B: Backend,
  {
    if shader.language() != ShaderLanguage::Glsl {
      return Err(ShaderError::UnsupportedLanguage(shader.language()));
    }

    let stages: Vec<_> = shader.stages().collect();
    if stages.is_empty() {
      return Err(ShaderError::NoStages);
    }

    for stage in &stages {
      let needed = match stage.ty {
        StageType::TessellationControlShader | StageType::TessellationEvaluationShader => {
          Capabilities::TESSELLATION_SHADERS
        }
        StageType::GeometryShader => Capabilities::GEOMETRY_SHADERS,
        StageType::ComputeShader => Capabilities::COMPUTE_SHADERS,
        StageType::VertexShader | StageType::FragmentShader => Capabilities::empty(),
      };

      if !ctx.caps.contains(needed) {
        return Err(ShaderError::UnsupportedStage(stage.ty));
      }
    }

    let program = unsafe { ctx.backend.compile_program(&stages)? };
    unsafe { ctx.state.use_program(&mut ctx.backend, program, Bind::Cached) };

    let uniforms = unsafe { ctx.backend.active_uniforms(program) };
    let attributes = unsafe { ctx.backend.active_attributes(program) };

    if ctx.config.dump_shader_binaries {
      info!("program {} ({}):", program, shader.name());

      for p in uniforms.iter().chain(&attributes) {
        info!("  {} @ {}: {:?} x {}", p.name, p.location, p.ty, p.size);
      }
    }

    let mut sc = ShaderContext {
      shader: shader.id(),
      program,
      valid: true,
      mat_specs: Vec::new(),
      ptr_specs: Vec::new(),
      tex_specs: Vec::new(),
      img_specs: Vec::new(),
      var_specs: Vec::new(),
      tex_handles: Vec::new(),
    };

    sc.reflect_uniforms(ctx, shader, &uniforms);
    sc.reflect_attributes(ctx, shader, &attributes);
    sc.tex_handles = vec![None; sc.tex_specs.len()];

    debug!(
      "shader {}: {} matrix, {} pointer, {} texture, {} image, {} vertex parameters",
      shader.name(),
      sc.mat_specs.len(),
      sc.ptr_specs.len(),
      sc.tex_specs.len(),
      sc.img_specs.len(),
      sc.var_specs.len()
    );

    Ok(sc)
  }

  fn reflect_uniforms<B>(
    &mut self,
    ctx: &mut DrawContext<B>,
    shader: &Shader,
    uniforms: &[ActiveParameter],
  ) where
    B: Backend,
  {
    let texture_units = ctx.texture_units();
    let image_units = if ctx.caps.contains(Capabilities::IMAGE_LOAD_STORE) {
      ctx.image_units()
    } else {
      0
    };
    let mut next_unit = 0;
    let mut next_image = 0;

    for param in uniforms {
      if param.ty.is_double() && !ctx.caps.contains(Capabilities::DOUBLE_UNIFORMS) {
        error!(
          "{}: {} is double precision, which this device cannot bind",
          shader.name(),
          param.name
        );
        continue;
      }

      let classified = match classify_uniform(param) {
        Ok(classified) => classified,
        Err(e) => {
          error!("{}: {}", shader.name(), e);
          continue;
        }
      };

      match classified {
        Uniform::Mat(spec) => self.mat_specs.push(spec),

        Uniform::Ptr(spec) => self.ptr_specs.push(spec),

        Uniform::Texture(mut spec) => {
          if next_unit >= texture_units {
            error!(
              "{}: out of texture units for {}; only {} available",
              shader.name(),
              spec.name,
              texture_units
            );
            continue;
          }

          if param.size > 1 {
            warn!(
              "{}: sampler array {} has {} elements; only the first is bound",
              shader.name(),
              spec.name,
              param.size
            );
          }

          spec.unit = next_unit;
          next_unit += 1;

          unsafe {
            ctx
              .backend
              .set_uniform(spec.location, UniformData::Int(1, &[spec.unit as i32]))
          };
          self.tex_specs.push(spec);
        }

        Uniform::Image(mut spec) => {
          if next_image >= image_units {
            error!(
              "{}: cannot bind image {}; {} image units available",
              shader.name(),
              spec.name,
              image_units
            );
            continue;
          }

          spec.unit = next_image;
          next_image += 1;

          unsafe {
            ctx
              .backend
              .set_uniform(spec.location, UniformData::Int(1, &[spec.unit as i32]))
          };
          self.img_specs.push(spec);
        }

        Uniform::Ignored => {
          debug!("{}: ignoring parameter {}", shader.name(), param.name);
        }
      }
    }
  }

  fn reflect_attributes<B>(
    &mut self,
    ctx: &mut DrawContext<B>,
    shader: &Shader,
    attributes: &[ActiveParameter],
  ) where
    B: Backend,
  {
    for param in attributes {
      let source = match classify_attribute(&param.name) {
        Ok(Some(source)) => source,
        Ok(None) => continue,
        Err(e) => {
          error!("{}: {}", shader.name(), e);
          continue;
        }
      };

      if let VarSource::Legacy(array) = source {
        if !ctx.caps.contains(Capabilities::LEGACY_VERTEX_ARRAYS) {
          warn!(
            "{}: {} needs fixed-function array {:?}, which this device lacks",
            shader.name(),
            param.name,
            array
          );
          continue;
        }
      } else if param.location < 0 {
        continue;
      }

      self.var_specs.push(VarSpec {
        name: param.name.clone(),
        location: param.location,
        source,
      });
    }
  }

  pub fn shader_id(&self) -> ShaderId {
    self.shader
  }

  pub fn program(&self) -> u32 {
    self.program
  }

  /// Whether the program is still usable. An invalid context has released its program.
  pub fn is_valid(&self) -> bool {
    self.valid
  }

  pub fn mat_specs(&self) -> &[MatSpec] {
    &self.mat_specs
  }

  pub fn ptr_specs(&self) -> &[PtrSpec] {
    &self.ptr_specs
  }

  pub fn tex_specs(&self) -> &[TexSpec] {
    &self.tex_specs
  }

  pub fn img_specs(&self) -> &[ImageSpec] {
    &self.img_specs
  }

  pub fn var_specs(&self) -> &[VarSpec] {
    &self.var_specs
  }

  /// Delete the program and mark the context invalid. Spec lists are kept so that bindings
  /// made through them can still be undone.
  pub fn release<B>(&mut self, ctx: &mut DrawContext<B>)
  where
    B: Backend,
  {
    if !self.valid {
      return;
    }

    unsafe {
      if ctx.state.current_program() == Some(self.program) {
        ctx.state.use_program(&mut ctx.backend, 0, Bind::Cached);
      }

      ctx.backend.delete_program(self.program);
    }

    self.valid = false;
  }

  /// Push every parameter depending on `altered`.
  ///
  /// The program must be current. Returns `false` if the context became invalid.
  pub fn issue_parameters<B>(
    &mut self,
    ctx: &mut DrawContext<B>,
    state: &RenderState,
    transforms: &dyn TransformSource,
    altered: StateDeps,
  ) -> bool
  where
    B: Backend,
  {
    if !self.valid {
      return false;
    }

    let double_uniforms = ctx.caps.contains(Capabilities::DOUBLE_UNIFORMS);

    for i in 0..self.ptr_specs.len() {
      let spec = &self.ptr_specs[i];
      if !spec.deps.intersects(altered) {
        continue;
      }

      let converted;
      let data = match state.inputs.get(&spec.input_name) {
        Some(ShaderInput::Ptr(data)) => data,

        Some(ShaderInput::Matrix(m)) => {
          converted = PtrData::Float(m.as_mat4().to_cols_array().to_vec());
          &converted
        }

        Some(_) => {
          error!("shader input {} is not numeric", spec.input_name);
          continue;
        }

        None => {
          error!("shader input {} is not present", spec.input_name);
          self.release(ctx);
          return false;
        }
      };

      match push_ptr(&mut ctx.backend, spec, data, double_uniforms) {
        PtrPush::Pushed => (),

        PtrPush::TooSmall { supplied } => {
          error!(
            "shader input {} has {} scalars; {:?} of {} components declared",
            spec.input_name,
            supplied,
            spec.array_size,
            spec.components()
          );
          self.release(ctx);
          return false;
        }

        PtrPush::Incompatible => {
          error!(
            "shader input {} holds {} data, incompatible with {:?}",
            spec.input_name,
            data.type_name(),
            spec.ty
          );
        }
      }
    }

    for spec in &self.mat_specs {
      if !spec.deps.intersects(altered) {
        continue;
      }

      let m = match spec.fetch(state, transforms) {
        Some(m) => m,
        None => continue,
      };

      unsafe {
        match spec.extract(&m) {
          MatValue::Mat4(m) => ctx
            .backend
            .set_uniform(spec.location, UniformData::FloatMatrix(4, &m.to_cols_array())),

          MatValue::Mat3(m) => ctx
            .backend
            .set_uniform(spec.location, UniformData::FloatMatrix(3, &m.to_cols_array())),

          MatValue::Vector(v, n) => ctx
            .backend
            .set_uniform(spec.location, UniformData::Float(n, &v[..n as usize])),
        }
      }
    }

    true
  }

  /// Bind the images and textures the shader samples.
  ///
  /// The program must be current. Returns `false` if the context is invalid.
  pub fn update_texture_bindings<B>(
    &mut self,
    ctx: &mut DrawContext<B>,
    state: &RenderState,
  ) -> bool
  where
    B: Backend,
  {
    if !self.valid {
      return false;
    }

    let mut barriers = MemoryBarrier::empty();
    let mut written = Vec::new();

    for spec in &self.img_specs {
      let (texture, access, level) = match state.inputs.get(&spec.name) {
        Some(ShaderInput::Image {
          texture,
          access,
          level,
        }) => (texture, *access, *level),
        Some(ShaderInput::Texture(texture, _)) => (texture, ImageAccess::ReadWrite, 0),
        _ => {
          warn!("image input {} is not present", spec.name);
          ctx.unbind_image_unit(spec.unit);
          continue;
        }
      };

      if texture.texture_type() != spec.desired {
        warn!(
          "image {} expects a {:?} texture, got {:?}",
          spec.name,
          spec.desired,
          texture.texture_type()
        );
        ctx.unbind_image_unit(spec.unit);
        continue;
      }

      let key = ctx.prepare_texture(texture);
      if !ctx.update_texture(key, texture) {
        ctx.unbind_image_unit(spec.unit);
        continue;
      }

      if ctx
        .prepared
        .texture(key)
        .map_or(false, |c| c.needs_barrier(MemoryBarrier::SHADER_IMAGE_ACCESS))
      {
        barriers |= MemoryBarrier::SHADER_IMAGE_ACCESS;
      }

      ctx.bind_image_unit(spec.unit, key, level, access);

      if access.is_writable() {
        written.push(key);
      }
    }

    let use_bindless =
      ctx.config.use_bindless_textures && ctx.caps.contains(Capabilities::BINDLESS_TEXTURE);

    for (spec, pushed_handle) in self.tex_specs.iter().zip(self.tex_handles.iter_mut()) {
      let (texture, sampler) = match resolve_texture(spec, state) {
        Some(resolved) => resolved,
        None => {
          ctx.unbind_texture_unit(spec.unit);
          continue;
        }
      };

      if texture.texture_type() != spec.desired {
        warn!(
          "sampler {} expects a {:?} texture, got {:?}; keeping the previous binding",
          spec.name,
          spec.desired,
          texture.texture_type()
        );
        continue;
      }

      let key = ctx.prepare_texture(&texture);
      if !ctx.update_texture(key, &texture) {
        ctx.unbind_texture_unit(spec.unit);
        continue;
      }

      if ctx
        .prepared
        .texture(key)
        .map_or(false, |c| c.needs_barrier(MemoryBarrier::TEXTURE_FETCH))
      {
        barriers |= MemoryBarrier::TEXTURE_FETCH;
      }

      let sampler = sampler.unwrap_or_else(|| texture.sampler());

      if use_bindless && !texture.is_render_to_texture() {
        if let Some(handle) = ctx.bindless_handle(key, &sampler) {
          if *pushed_handle != Some(handle) {
            unsafe {
              ctx
                .backend
                .set_uniform(spec.location, UniformData::TextureHandle(handle))
            };
            *pushed_handle = Some(handle);
          }

          continue;
        }
      }

      // back from bindless: the sampler uniform must name its unit again
      if pushed_handle.take().is_some() {
        unsafe {
          ctx
            .backend
            .set_uniform(spec.location, UniformData::Int(1, &[spec.unit as i32]))
        };
      }

      ctx.bind_texture_unit(spec.unit, key);
      ctx.apply_sampler(spec.unit, &sampler);
    }

    if !barriers.is_empty() {
      ctx.issue_memory_barrier(barriers);
    }

    for key in written {
      ctx.mark_incoherent(key);
    }

    true
  }

  /// Unbind every texture unit and image unit this context binds.
  pub fn disable_texture_bindings<B>(&self, ctx: &mut DrawContext<B>)
  where
    B: Backend,
  {
    for spec in &self.tex_specs {
      ctx.unbind_texture_unit(spec.unit);
    }

    for spec in &self.img_specs {
      ctx.unbind_image_unit(spec.unit);
    }
  }

  /// Source every vertex attribute from `geom`'s vertex data.
  ///
  /// The geom's vertex array object must be bound. Returns `false` if a buffer could not be
  /// uploaded or the context is invalid.
  pub fn update_vertex_arrays<B>(&self, ctx: &mut DrawContext<B>, geom: &Geom) -> bool
  where
    B: Backend,
  {
    if !self.valid {
      return false;
    }

    let data = geom.vertex_data();

    for spec in &self.var_specs {
      let column_name = spec.column_name();

      match data.find_column(&column_name) {
        Some((array, column)) => {
          if ctx.apply_vertex_buffer(array).is_none() {
            return false;
          }

          let format = AttribFormat {
            components: column.components,
            numeric_type: column.numeric_type,
            normalized: column.normalized,
            stride: array.stride(),
            offset: column.offset,
            divisor: 0,
          };

          unsafe {
            match spec.source {
              VarSource::Column(_) => ctx
                .backend
                .enable_vertex_attrib(spec.location as u32, &format),
              VarSource::Legacy(legacy) => ctx.backend.enable_legacy_array(legacy, &format),
            }
          }
        }

        None => unsafe {
          let value = spec.default_value();

          match spec.source {
            VarSource::Column(_) => {
              ctx.backend.disable_vertex_attrib(spec.location as u32);
              ctx.backend.set_vertex_attrib_default(spec.location as u32, value);
            }

            VarSource::Legacy(legacy) => {
              ctx.backend.disable_legacy_array(legacy);
              ctx.backend.set_legacy_default(legacy, value);
            }
          }
        },
      }
    }

    true
  }

  /// Disable every vertex attribute this context enables.
  pub fn disable_vertex_arrays<B>(&self, ctx: &mut DrawContext<B>)
  where
    B: Backend,
  {
    for spec in &self.var_specs {
      unsafe {
        match spec.source {
          VarSource::Column(_) => ctx.backend.disable_vertex_attrib(spec.location as u32),
          VarSource::Legacy(legacy) => ctx.backend.disable_legacy_array(legacy),
        }
      }
    }
  }
}

/// Texture and sampling override feeding a sampler, after the related-texture suffix.
fn resolve_texture(spec: &TexSpec, state: &RenderState) -> Option<(Texture, Option<SamplerState>)> {
  let (texture, sampler) = match spec.source {
    TexSource::Named(ref name) => match state.inputs.get(name)? {
      ShaderInput::Texture(texture, sampler) => (texture.clone(), *sampler),
      ShaderInput::Image { texture, .. } => (texture.clone(), None),
      _ => {
        warn!("shader input {} is not a texture", name);
        return None;
      }
    },

    TexSource::Stage(index) => {
      let stage = state.textures.on_stage(index)?;
      (stage.texture.clone(), stage.sampler)
    }
  };

  match spec.suffix {
    Some(ref suffix) => texture.load_related(suffix).map(|related| (related, sampler)),
    None => Some((texture, sampler)),
  }
}

/// Push the data of a pointer spec, converting it to the declared uniform type.
fn push_ptr<B>(backend: &mut B, spec: &PtrSpec, data: &PtrData, double_uniforms: bool) -> PtrPush
where
  B: Backend,
{
  let count = match spec.scalars_to_read(data.len()) {
    Some(count) => count,
    None => return PtrPush::TooSmall {
      supplied: data.len(),
    },
  };

  let (dim, matrix) = match spec.ty {
    ParamType::Vector(_, n) => (n, false),
    ParamType::Matrix(_, n) => (n, true),
    _ => return PtrPush::Incompatible,
  };

  unsafe {
    match (spec.scalar_type(), data) {
      (ScalarType::Float, PtrData::Float(v)) => {
        push_floats(backend, spec, dim, matrix, &v[..count])
      }

      (ScalarType::Float, PtrData::Double(v)) => {
        let v: Vec<f32> = v[..count].iter().map(|x| *x as f32).collect();
        push_floats(backend, spec, dim, matrix, &v)
      }

      (ScalarType::Float, PtrData::Int(v)) => {
        let v: Vec<f32> = v[..count].iter().map(|x| *x as f32).collect();
        push_floats(backend, spec, dim, matrix, &v)
      }

      (ScalarType::Float, PtrData::UInt(v)) => {
        let v: Vec<f32> = v[..count].iter().map(|x| *x as f32).collect();
        push_floats(backend, spec, dim, matrix, &v)
      }

      (ScalarType::Double, _) if !double_uniforms => return PtrPush::Incompatible,

      (ScalarType::Double, data) => {
        let v: Vec<f64> = match data {
          PtrData::Float(v) => v[..count].iter().map(|x| *x as f64).collect(),
          PtrData::Double(v) => v[..count].to_vec(),
          PtrData::Int(v) => v[..count].iter().map(|x| *x as f64).collect(),
          PtrData::UInt(v) => v[..count].iter().map(|x| *x as f64).collect(),
        };

        let uniform = if matrix {
          UniformData::DoubleMatrix(dim, &v)
        } else {
          UniformData::Double(dim, &v)
        };
        backend.set_uniform(spec.location, uniform);
      }

      (_, _) if matrix => return PtrPush::Incompatible,

      (ScalarType::Int | ScalarType::Bool, PtrData::Int(v)) => {
        backend.set_uniform(spec.location, UniformData::Int(dim, &v[..count]))
      }

      (ScalarType::Int | ScalarType::Bool, PtrData::UInt(v)) => {
        let v: Vec<i32> = v[..count].iter().map(|x| *x as i32).collect();
        backend.set_uniform(spec.location, UniformData::Int(dim, &v))
      }

      (ScalarType::UInt, PtrData::UInt(v)) => {
        backend.set_uniform(spec.location, UniformData::UInt(dim, &v[..count]))
      }

      (ScalarType::UInt, PtrData::Int(v)) => {
        let v: Vec<u32> = v[..count].iter().map(|x| *x as u32).collect();
        backend.set_uniform(spec.location, UniformData::UInt(dim, &v))
      }

      _ => return PtrPush::Incompatible,
    }
  }

  PtrPush::Pushed
}

unsafe fn push_floats<B>(backend: &mut B, spec: &PtrSpec, dim: u8, matrix: bool, v: &[f32])
where
  B: Backend,
{
  let uniform = if matrix {
    UniformData::FloatMatrix(dim, v)
  } else {
    UniformData::Float(dim, v)
  };

  backend.set_uniform(spec.location, uniform);
}
