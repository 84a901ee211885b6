mod common;

use glam::{dvec3, DMat4};

use gsg::backend::shader::{ActiveParameter, ParamType, SamplerKind, ScalarType};
use gsg::backend::texture::{ImageAccess, MemoryBarrier, TextureTarget};
use gsg::capabilities::Capabilities;
use gsg::config::RenderConfig;
use gsg::geom::{
  Geom, GeomVertexArrayData, GeomVertexColumn, GeomVertexData, NumericType, PrimitiveType,
  UsageHint,
};
use gsg::render_state::{RenderState, ShaderInput, ShaderInputs, StateDeps, TextureAttrib};
use gsg::resource::ResourceContext;
use gsg::shader::Shader;
use gsg::texture::{Texture, TextureType};
use gsg::transform::TransformState;
use gsg::GraphicsStateGuardian;

use common::{full_caps, guardian_with, param, Call, MockBackend, UniformValue};

const MAT4: ParamType = ParamType::Matrix(ScalarType::Float, 4);
const VEC4: ParamType = ParamType::Vector(ScalarType::Float, 4);

fn shader(name: &str) -> Shader {
  Shader::glsl(name, "void main() {}", "void main() {}")
}

fn guardian(backend: MockBackend) -> GraphicsStateGuardian<MockBackend> {
  guardian_with(backend, Default::default())
}

fn transforms() -> TransformState {
  let model = DMat4::from_translation(dvec3(1., -2., 3.)) * DMat4::from_rotation_y(0.3);
  let view = DMat4::look_at_rh(dvec3(4., 5., 6.), dvec3(0., 0., 0.), dvec3(0., 1., 0.));
  let projection = DMat4::perspective_rh_gl(1.1, 16. / 9., 0.1, 250.);

  TransformState::new(model, view, projection)
}

fn sampler_2d(name: &str, location: i32) -> ActiveParameter {
  param(
    name,
    location,
    ParamType::Sampler(SamplerKind::Float, TextureType::Texture2D),
    1,
  )
}

fn textured(texture: &Texture) -> TextureAttrib {
  TextureAttrib::new().with_stage("default", texture.clone())
}

fn texture_handle(gsg: &GraphicsStateGuardian<MockBackend>, texture: &Texture) -> u32 {
  let key = gsg.prepared().texture_key(texture.id()).unwrap();
  gsg.prepared().texture(key).unwrap().handle()
}

// texture bound to `unit` by every BindTexture call, in order
fn unit_bindings(gsg: &GraphicsStateGuardian<MockBackend>, unit: u32) -> Vec<u32> {
  gsg
    .backend()
    .calls
    .iter()
    .filter_map(|call| match *call {
      Call::BindTexture { unit: u, texture, .. } if u == unit => Some(texture),
      _ => None,
    })
    .collect()
}

fn last_matrix(gsg: &GraphicsStateGuardian<MockBackend>, location: i32) -> Vec<f32> {
  match gsg.backend().uniform_values(location).pop() {
    Some(UniformValue::FloatMatrix(4, values)) => values,
    other => panic!("expected a 4x4 float matrix at {}, got {:?}", location, other),
  }
}

#[test]
fn model_view_projection_matches_the_camera() {
  let backend =
    MockBackend::new().with_uniforms(vec![param("p3d_ModelViewProjectionMatrix", 0, MAT4, 1)]);
  let mut gsg = guardian(backend);
  let state = RenderState::new().with_shader(shader("mvp"));
  let transforms = transforms();

  assert!(gsg.set_state_and_transform(&state, &transforms, StateDeps::all()));

  let expected = (transforms.projection * transforms.view * transforms.model)
    .as_mat4()
    .to_cols_array();
  let pushed = last_matrix(&gsg, 0);

  assert_eq!(pushed.len(), 16);
  for (a, b) in pushed.iter().zip(expected.iter()) {
    assert!((a - b).abs() < 1e-5, "{} != {}", a, b);
  }
}

#[test]
fn matrices_follow_what_changed() {
  let backend =
    MockBackend::new().with_uniforms(vec![param("p3d_ModelViewProjectionMatrix", 0, MAT4, 1)]);
  let mut gsg = guardian(backend);
  let state = RenderState::new().with_shader(shader("deps"));
  let mut transforms = transforms();

  assert!(gsg.set_state_and_transform(&state, &transforms, StateDeps::empty()));
  assert_eq!(gsg.backend().uniform_values(0).len(), 1);

  // same shader, nothing the matrix depends on
  assert!(gsg.set_state_and_transform(&state, &transforms, StateDeps::SHADER_INPUTS));
  assert_eq!(gsg.backend().uniform_values(0).len(), 1);

  transforms.model = DMat4::from_scale(dvec3(2., 2., 2.));
  assert!(gsg.set_state_and_transform(&state, &transforms, StateDeps::TRANSFORM));
  assert_eq!(gsg.backend().uniform_values(0).len(), 2);

  let expected = (transforms.projection * transforms.view * transforms.model)
    .as_mat4()
    .to_cols_array();
  let pushed = last_matrix(&gsg, 0);
  for (a, b) in pushed.iter().zip(expected.iter()) {
    assert!((a - b).abs() < 1e-5);
  }
}

#[test]
fn short_arrays_invalidate_the_shader() {
  let backend = MockBackend::new().with_uniforms(vec![param("offsets", 3, VEC4, 2)]);
  let mut gsg = guardian(backend);
  let shader = shader("offsets");

  let state = RenderState::new()
    .with_shader(shader.clone())
    .with_inputs(ShaderInputs::new().with("offsets", vec![0f32; 4]));

  assert!(!gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::all()));

  let program = gsg.shader_context(shader.id()).unwrap().program();
  assert!(!gsg.shader_context(shader.id()).unwrap().is_valid());
  assert!(gsg.backend().calls.contains(&Call::DeleteProgram(program)));
  assert!(gsg.backend().uniform_values(3).is_empty());
  assert_eq!(gsg.current_shader(), None);

  // enough data: the context is rebuilt and only the declared elements are read
  let values: Vec<f32> = (0..12).map(|i| i as f32).collect();
  let state = state.with_inputs(ShaderInputs::new().with("offsets", values));

  assert!(gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::all()));
  assert!(gsg.shader_context(shader.id()).unwrap().is_valid());
  assert_eq!(
    gsg.backend().uniform_values(3),
    [UniformValue::Float(4, (0..8).map(|i| i as f32).collect())]
  );
}

#[test]
fn unsized_inputs_take_what_is_supplied() {
  let backend = MockBackend::new().with_uniforms(vec![param("k_weights", 1, VEC4, 4)]);
  let mut gsg = guardian(backend);

  let state = RenderState::new()
    .with_shader(shader("weights"))
    .with_inputs(ShaderInputs::new().with("weights", vec![1f32; 10]));

  assert!(gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::all()));
  assert_eq!(
    gsg.backend().uniform_values(1),
    [UniformValue::Float(4, vec![1.; 8])]
  );
}

#[test]
fn samplers_get_their_own_units() {
  let backend = MockBackend::new().with_uniforms(vec![
    param(
      "p3d_Texture0",
      4,
      ParamType::Sampler(SamplerKind::Float, TextureType::Texture2D),
      1,
    ),
    param(
      "envmap",
      5,
      ParamType::Sampler(SamplerKind::Float, TextureType::CubeMap),
      1,
    ),
  ]);
  let mut gsg = guardian(backend);
  let shader = shader("textured");

  assert!(gsg.prepare_shader(&shader));
  assert_eq!(gsg.backend().uniform_values(4), [UniformValue::Int(1, vec![0])]);
  assert_eq!(gsg.backend().uniform_values(5), [UniformValue::Int(1, vec![1])]);

  let units: Vec<u32> = gsg
    .shader_context(shader.id())
    .unwrap()
    .tex_specs()
    .iter()
    .map(|spec| spec.unit)
    .collect();
  assert_eq!(units, [0, 1]);

  let (base, env) = (Texture::new_2d("base", 2, 2), Texture::new_cube_map("env", 2));
  let state = RenderState::new()
    .with_shader(shader)
    .with_textures(TextureAttrib::new().with_stage("default", base.clone()))
    .with_inputs(ShaderInputs::new().with("envmap", env.clone()));

  assert!(gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::all()));

  let handle = |tex: &Texture| {
    let key = gsg.prepared().texture_key(tex.id()).unwrap();
    gsg.prepared().texture(key).unwrap().handle()
  };

  assert!(gsg.backend().calls.contains(&Call::BindTexture {
    unit: 0,
    target: TextureTarget::Texture2D,
    texture: handle(&base),
  }));
  assert!(gsg.backend().calls.contains(&Call::BindTexture {
    unit: 1,
    target: TextureTarget::CubeMap,
    texture: handle(&env),
  }));
}

#[test]
fn link_failures_flag_the_shader() {
  let mut backend = MockBackend::new();
  backend.link_error = Some("undefined reference to main".to_owned());
  let mut gsg = guardian(backend);
  let shader = shader("broken");

  let state = RenderState::new().with_shader(shader.clone());
  assert!(!gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::all()));
  assert!(shader.error_flag());
  assert!(gsg.shader_context(shader.id()).is_none());

  // never compiled again, even once the driver would cooperate
  gsg.backend_mut().link_error = None;
  assert!(!gsg.prepare_shader(&shader));
  assert_eq!(
    gsg.backend().count(|c| matches!(c, Call::CompileProgram(_))),
    0
  );
}

#[test]
fn releasing_the_current_shader_unbinds_it() {
  let backend =
    MockBackend::new().with_uniforms(vec![param("p3d_ModelViewProjectionMatrix", 0, MAT4, 1)]);
  let mut gsg = guardian(backend);
  let shader = shader("released");
  let state = RenderState::new().with_shader(shader.clone());

  assert!(gsg.set_state_and_transform(&state, &transforms(), StateDeps::all()));
  assert_eq!(gsg.current_shader(), Some(shader.id()));

  let program = gsg.shader_context(shader.id()).unwrap().program();
  assert!(gsg.release_shader(shader.id()));
  assert!(!gsg.release_shader(shader.id()));

  assert_eq!(gsg.current_shader(), None);
  assert!(gsg.backend().calls.contains(&Call::DeleteProgram(program)));
  assert_eq!(gsg.backend().calls.last(), Some(&Call::DeleteProgram(program)));
}

#[test]
fn absent_inputs_invalidate_the_shader_and_unbind_its_textures() {
  let backend = MockBackend::new().with_uniforms(vec![
    sampler_2d("p3d_Texture0", 4),
    param("tint", 6, VEC4, 1),
  ]);
  let mut gsg = guardian(backend);
  let shader = shader("tinted");
  let base = Texture::new_2d("base", 2, 2);

  let state = RenderState::new()
    .with_shader(shader.clone())
    .with_textures(textured(&base))
    .with_inputs(ShaderInputs::new().with("tint", vec![1f32; 4]));

  assert!(gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::all()));
  let handle = texture_handle(&gsg, &base);
  assert_eq!(unit_bindings(&gsg, 0), [handle]);

  let program = gsg.shader_context(shader.id()).unwrap().program();
  gsg.backend_mut().take_calls();

  let untinted = state.clone().with_inputs(ShaderInputs::new());
  let transforms = TransformState::default();
  assert!(!gsg.set_state_and_transform(&untinted, &transforms, StateDeps::all()));

  assert!(!gsg.shader_context(shader.id()).unwrap().is_valid());
  assert!(gsg.backend().calls.contains(&Call::DeleteProgram(program)));
  assert_eq!(gsg.current_shader(), None);
  assert_eq!(unit_bindings(&gsg, 0), [0]);

  // nothing is left for the next state to undo
  gsg.backend_mut().take_calls();
  let unshaded = RenderState::new();
  assert!(gsg.set_state_and_transform(&unshaded, &TransformState::default(), StateDeps::all()));
  assert!(unit_bindings(&gsg, 0).is_empty());

  // the input is back: the program is built anew
  assert!(gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::all()));
  assert!(gsg.shader_context(shader.id()).unwrap().is_valid());
  assert_ne!(gsg.shader_context(shader.id()).unwrap().program(), program);
}

#[test]
fn mismatched_sampler_types_keep_the_previous_binding() {
  let backend = MockBackend::new().with_uniforms(vec![sampler_2d("p3d_Texture0", 4)]);
  let mut gsg = guardian(backend);
  let shader = shader("flat");
  let base = Texture::new_2d("base", 2, 2);

  let state = RenderState::new()
    .with_shader(shader.clone())
    .with_textures(textured(&base));
  assert!(gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::all()));
  assert_eq!(unit_bindings(&gsg, 0).len(), 1);

  gsg.backend_mut().take_calls();
  let cube = RenderState::new()
    .with_shader(shader)
    .with_textures(textured(&Texture::new_cube_map("env", 2)));

  assert!(gsg.set_state_and_transform(&cube, &TransformState::default(), StateDeps::TEXTURE));
  assert!(unit_bindings(&gsg, 0).is_empty());
}

#[test]
fn image_writes_are_fenced_by_one_barrier() {
  let backend = MockBackend::new().with_uniforms(vec![
    sampler_2d("p3d_Texture0", 4),
    param(
      "canvas",
      7,
      ParamType::Image(SamplerKind::Float, TextureType::Texture2D),
      1,
    ),
  ]);
  let mut gsg = guardian(backend);
  let canvas = Texture::new_2d("canvas", 4, 4);

  let image = ShaderInput::Image {
    texture: canvas.clone(),
    access: ImageAccess::ReadWrite,
    level: 0,
  };
  let state = RenderState::new()
    .with_shader(shader("paint"))
    .with_textures(textured(&canvas))
    .with_inputs(ShaderInputs::new().with("canvas", image));

  assert!(gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::all()));
  assert_eq!(gsg.backend().count(|c| matches!(c, Call::MemoryBarrier(_))), 0);
  assert!(gsg.context().needs_barrier(MemoryBarrier::TEXTURE_FETCH));

  assert!(gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::TEXTURE));

  let barriers: Vec<MemoryBarrier> = gsg
    .backend()
    .calls
    .iter()
    .filter_map(|call| match *call {
      Call::MemoryBarrier(b) => Some(b),
      _ => None,
    })
    .collect();
  assert_eq!(
    barriers,
    [MemoryBarrier::TEXTURE_FETCH | MemoryBarrier::SHADER_IMAGE_ACCESS]
  );
}

#[test]
fn bindless_handles_replace_texture_units() {
  let backend = MockBackend::new()
    .with_caps(full_caps() | Capabilities::BINDLESS_TEXTURE)
    .with_uniforms(vec![sampler_2d("p3d_Texture0", 4)]);
  let config = RenderConfig::default().with_bindless_textures(true);
  let mut gsg = guardian_with(backend, config);
  let base = Texture::new_2d("base", 2, 2);

  let state = RenderState::new()
    .with_shader(shader("bindless"))
    .with_textures(textured(&base));
  assert!(gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::all()));

  let resident: Vec<u64> = gsg
    .backend()
    .calls
    .iter()
    .filter_map(|call| match *call {
      Call::MakeHandleResident(h, true) => Some(h),
      _ => None,
    })
    .collect();
  assert_eq!(resident.len(), 1);

  let handle = texture_handle(&gsg, &base);
  assert_eq!(resident[0] & 0xffff_ffff, u64::from(handle));
  assert!(!unit_bindings(&gsg, 0).contains(&handle));
  assert_eq!(
    gsg.backend().uniform_values(4),
    [UniformValue::Int(1, vec![0]), UniformValue::TextureHandle(resident[0])]
  );

  // an unchanged handle is not pushed again
  assert!(gsg.set_state_and_transform(&state, &TransformState::default(), StateDeps::TEXTURE));
  assert_eq!(gsg.backend().uniform_values(4).len(), 2);
}

#[test]
fn double_uniforms_need_device_support() {
  let uniforms = vec![param("offset", 2, ParamType::Vector(ScalarType::Double, 4), 1)];

  let backend = MockBackend::new()
    .with_caps(full_caps() - Capabilities::DOUBLE_UNIFORMS)
    .with_uniforms(uniforms.clone());
  let mut gsg = guardian(backend);
  let single = shader("single");
  assert!(gsg.prepare_shader(&single));
  assert!(gsg.shader_context(single.id()).unwrap().ptr_specs().is_empty());

  let mut gsg = guardian(MockBackend::new().with_uniforms(uniforms));
  let double = shader("double");
  assert!(gsg.prepare_shader(&double));
  assert_eq!(gsg.shader_context(double.id()).unwrap().ptr_specs().len(), 1);
}

#[test]
fn switching_shaders_unbinds_the_previous_one() {
  let backend = MockBackend::new()
    .with_uniforms(vec![sampler_2d("p3d_Texture0", 4)])
    .with_attributes(vec![param("p3d_Vertex", 0, VEC4, 1)]);
  let mut gsg = guardian(backend);
  let base = Texture::new_2d("base", 2, 2);

  let array = GeomVertexArrayData::new(
    vec![GeomVertexColumn::new("vertex", 3, NumericType::F32)],
    UsageHint::Static,
  );
  array.set_data(vec![0; 36]);
  let geom = Geom::new(PrimitiveType::Triangles, GeomVertexData::new(vec![array]), None);

  let first = RenderState::new()
    .with_shader(shader("first"))
    .with_textures(textured(&base));
  assert!(gsg.set_state_and_transform(&first, &TransformState::default(), StateDeps::all()));
  assert!(gsg.draw_geom(&geom));
  assert!(gsg.backend().calls.contains(&Call::EnableAttrib(0)));

  gsg.backend_mut().take_calls();
  let second = RenderState::new().with_shader(shader("second"));
  assert!(gsg.set_state_and_transform(&second, &TransformState::default(), StateDeps::all()));

  assert_eq!(unit_bindings(&gsg, 0), [0]);
  assert!(gsg.backend().calls.contains(&Call::DisableAttrib(0)));
}
