//! Binding specs.
//!
//! Introspecting a linked program yields one spec per parameter the binder knows how to feed.
//! Specs only describe *where* a value comes from and *how* it is shaped; fetching the value
//! happens at issue time, against the current render state.

use glam::{DMat4, DVec4, Mat3, Mat4};

use crate::backend::buffer::LegacyArray;
use crate::backend::shader::{ParamType, SamplerKind, ScalarType};
use crate::render_state::{Material, RenderState, StateDeps};
use crate::texture::TextureType;
use crate::transform::{CoordSys, TransformSource};

/// Where one operand of a matrix spec comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MatInput {
  Coord(CoordSys),
  /// Material packed in a matrix: ambient, diffuse, emission and specular rows, shininess in the
  /// last cell.
  Material,
  /// Color scale in the first row.
  ColorScale,
  Identity,
}

impl MatInput {
  pub fn deps(&self) -> StateDeps {
    match self {
      MatInput::Coord(sys) => coord_deps(sys),
      MatInput::Material => StateDeps::MATERIAL,
      MatInput::ColorScale => StateDeps::COLOR_SCALE,
      MatInput::Identity => StateDeps::empty(),
    }
  }
}

fn coord_deps(sys: &CoordSys) -> StateDeps {
  match sys {
    CoordSys::Model => StateDeps::TRANSFORM | StateDeps::VIEW,
    CoordSys::World | CoordSys::View => StateDeps::VIEW,
    CoordSys::ApiView => StateDeps::empty(),
    CoordSys::ApiClip => StateDeps::PROJECTION,
    CoordSys::Node(_) => StateDeps::VIEW | StateDeps::FRAME,
  }
}

/// How the operands of a matrix spec are combined.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MatFunc {
  /// Only the first operand.
  First,
  /// Conversion from the first operand's space to the second operand's space.
  Compose,
}

/// Part of the computed matrix pushed to the uniform.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MatPiece {
  Whole,
  Transpose,
  Row(u8),
  Col(u8),
  Upper3x3,
  Transpose3x3,
  /// Single cell, `(row, column)`.
  Cell(u8, u8),
}

/// A uniform fed from transforms, material or color scale.
#[derive(Clone, Debug, PartialEq)]
pub struct MatSpec {
  pub name: String,
  pub location: i32,
  pub func: MatFunc,
  pub parts: [MatInput; 2],
  pub piece: MatPiece,
  pub deps: StateDeps,
  /// Scalars pushed for row, column and cell pieces.
  pub components: u8,
}

impl MatSpec {
  pub fn new(
    name: impl Into<String>,
    func: MatFunc,
    parts: [MatInput; 2],
    piece: MatPiece,
  ) -> Self {
    let deps = match func {
      MatFunc::First => parts[0].deps(),
      MatFunc::Compose => parts[0].deps() | parts[1].deps(),
    };

    let components = match piece {
      MatPiece::Whole | MatPiece::Transpose => 16,
      MatPiece::Upper3x3 | MatPiece::Transpose3x3 => 9,
      MatPiece::Row(_) | MatPiece::Col(_) => 4,
      MatPiece::Cell(..) => 1,
    };

    MatSpec {
      name: name.into(),
      location: -1,
      func,
      parts,
      piece,
      deps,
      components,
    }
  }

  pub fn at(mut self, location: i32) -> Self {
    self.location = location;
    self
  }

  /// Number of scalars pushed for vector pieces; clamped to the piece's width.
  pub fn with_components(mut self, components: u8) -> Self {
    if matches!(self.piece, MatPiece::Row(_) | MatPiece::Col(_)) {
      self.components = components.clamp(1, 4);
    }

    self
  }

  /// Compute the full matrix, if every operand is available.
  pub fn fetch(&self, state: &RenderState, transforms: &dyn TransformSource) -> Option<DMat4> {
    match self.func {
      MatFunc::First => fetch_input(&self.parts[0], state, transforms),
      MatFunc::Compose => match self.parts {
        [MatInput::Coord(ref from), MatInput::Coord(ref to)] => transforms.compose(from, to),
        [ref a, ref b] => {
          let a = fetch_input(a, state, transforms)?;
          let b = fetch_input(b, state, transforms)?;
          Some(b * a)
        }
      },
    }
  }

  /// Narrow `m` to single precision and extract the piece of this spec.
  pub fn extract(&self, m: &DMat4) -> MatValue {
    let m = m.as_mat4();

    match self.piece {
      MatPiece::Whole => MatValue::Mat4(m),
      MatPiece::Transpose => MatValue::Mat4(m.transpose()),
      MatPiece::Row(i) => MatValue::Vector(m.row(i as usize).to_array(), self.components),
      MatPiece::Col(i) => MatValue::Vector(m.col(i as usize).to_array(), self.components),
      MatPiece::Upper3x3 => MatValue::Mat3(Mat3::from_mat4(m)),
      MatPiece::Transpose3x3 => MatValue::Mat3(Mat3::from_mat4(m).transpose()),
      MatPiece::Cell(r, c) => {
        let cell = m.col(c as usize)[r as usize];
        MatValue::Vector([cell, 0., 0., 0.], 1)
      }
    }
  }
}

/// Value extracted from a matrix, ready to push.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatValue {
  Mat4(Mat4),
  Mat3(Mat3),
  /// Up to four scalars; the second field is how many are used.
  Vector([f32; 4], u8),
}

fn fetch_input(
  input: &MatInput,
  state: &RenderState,
  transforms: &dyn TransformSource,
) -> Option<DMat4> {
  match input {
    MatInput::Coord(sys) => transforms.to_api_view(sys),
    MatInput::Material => Some(material_matrix(&state.material.unwrap_or_default())),
    MatInput::ColorScale => {
      let scale = state.color_scale.map(|c| c.as_dvec4()).unwrap_or(DVec4::ONE);
      Some(DMat4::from_cols(scale, DVec4::ZERO, DVec4::ZERO, DVec4::ZERO).transpose())
    }
    MatInput::Identity => Some(DMat4::IDENTITY),
  }
}

/// Material packed in rows: ambient, diffuse, emission, specular; shininess overrides the last
/// cell.
pub fn material_matrix(material: &Material) -> DMat4 {
  let mut specular = material.specular.as_dvec4();
  specular.w = material.shininess as f64;

  DMat4::from_cols(
    material.ambient.as_dvec4(),
    material.diffuse.as_dvec4(),
    material.emission.as_dvec4(),
    specular,
  )
  .transpose()
}

/// Declared size of a pointer parameter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArraySize {
  /// Exactly this many elements must be supplied.
  Declared(usize),
  /// Any number of elements from one up to this maximum.
  Unsized(usize),
}

/// A uniform fed from a named numeric input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PtrSpec {
  pub name: String,
  /// Name of the shader input read.
  pub input_name: String,
  pub location: i32,
  /// Vector or matrix type of one element.
  pub ty: ParamType,
  pub array_size: ArraySize,
  pub deps: StateDeps,
}

impl PtrSpec {
  /// Scalars in one element.
  pub fn components(&self) -> usize {
    self.ty.components().unwrap_or(1)
  }

  pub fn scalar_type(&self) -> ScalarType {
    self.ty.scalar_type().unwrap_or(ScalarType::Float)
  }

  /// Number of scalars to read out of `supplied`, or `None` if too few were supplied.
  pub fn scalars_to_read(&self, supplied: usize) -> Option<usize> {
    let components = self.components();

    match self.array_size {
      ArraySize::Declared(n) => {
        let needed = n * components;
        (supplied >= needed).then(|| needed)
      }

      ArraySize::Unsized(max) => {
        let elements = (supplied / components).min(max);
        (elements > 0).then(|| elements * components)
      }
    }
  }
}

/// Where a sampler's texture comes from.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TexSource {
  /// A named shader input.
  Named(String),
  /// The n-th enabled texture stage.
  Stage(usize),
}

/// A sampler uniform.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TexSpec {
  pub name: String,
  pub location: i32,
  pub unit: u32,
  pub source: TexSource,
  /// Related-texture suffix applied to the resolved texture.
  pub suffix: Option<String>,
  pub desired: TextureType,
  pub kind: SamplerKind,
}

/// An image uniform.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageSpec {
  pub name: String,
  pub location: i32,
  pub unit: u32,
  pub desired: TextureType,
  pub kind: SamplerKind,
}

/// Where a vertex attribute is sourced from.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum VarSource {
  /// A named column of the vertex data, through a generic attribute.
  Column(String),
  /// A fixed-function array.
  Legacy(LegacyArray),
}

/// A vertex attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VarSpec {
  pub name: String,
  pub location: i32,
  pub source: VarSource,
}

impl VarSpec {
  /// Name of the vertex column read by this attribute.
  pub fn column_name(&self) -> String {
    match self.source {
      VarSource::Column(ref name) => name.clone(),
      VarSource::Legacy(array) => legacy_column_name(array),
    }
  }

  /// Constant value used when the vertex data has no such column.
  pub fn default_value(&self) -> [f32; 4] {
    if self.column_name() == "color" {
      [1., 1., 1., 1.]
    } else {
      [0., 0., 0., 1.]
    }
  }
}

fn legacy_column_name(array: LegacyArray) -> String {
  match array {
    LegacyArray::Vertex => "vertex".to_owned(),
    LegacyArray::Normal => "normal".to_owned(),
    LegacyArray::Color => "color".to_owned(),
    LegacyArray::SecondaryColor => "color.1".to_owned(),
    LegacyArray::FogCoord => "fogcoord".to_owned(),
    LegacyArray::TexCoord(0) => "texcoord".to_owned(),
    LegacyArray::TexCoord(n) => format!("texcoord.{}", n),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transform::TransformState;
  use glam::{DVec3, Vec4};

  #[test]
  fn mvp_composition() {
    let transforms = TransformState::new(
      DMat4::from_translation(DVec3::new(0., 0., -5.)),
      DMat4::IDENTITY,
      DMat4::perspective_rh_gl(1., 1., 0.5, 50.),
    );
    let spec = MatSpec::new(
      "mvp",
      MatFunc::Compose,
      [MatInput::Coord(CoordSys::Model), MatInput::Coord(CoordSys::ApiClip)],
      MatPiece::Whole,
    );
    let m = spec.fetch(&RenderState::new(), &transforms).unwrap();

    assert!(m.abs_diff_eq(transforms.projection * transforms.model, 1e-9));
    assert_eq!(
      spec.deps,
      StateDeps::TRANSFORM | StateDeps::VIEW | StateDeps::PROJECTION
    );
  }

  #[test]
  fn material_rows() {
    let state = RenderState::new().with_material(Material {
      ambient: Vec4::new(0.1, 0.2, 0.3, 1.),
      diffuse: Vec4::new(0.4, 0.5, 0.6, 1.),
      emission: Vec4::ZERO,
      specular: Vec4::new(1., 1., 1., 1.),
      shininess: 32.,
    });
    let transforms = TransformState::default();

    let diffuse = MatSpec::new(
      "p3d_Material.diffuse",
      MatFunc::First,
      [MatInput::Material, MatInput::Identity],
      MatPiece::Row(1),
    )
    .with_components(3);
    let m = diffuse.fetch(&state, &transforms).unwrap();
    assert_eq!(diffuse.extract(&m), MatValue::Vector([0.4, 0.5, 0.6, 1.], 3));

    let shininess = MatSpec::new(
      "p3d_Material.shininess",
      MatFunc::First,
      [MatInput::Material, MatInput::Identity],
      MatPiece::Cell(3, 3),
    );
    assert_eq!(shininess.extract(&m), MatValue::Vector([32., 0., 0., 0.], 1));
  }

  #[test]
  fn default_color_scale() {
    let spec = MatSpec::new(
      "p3d_ColorScale",
      MatFunc::First,
      [MatInput::ColorScale, MatInput::Identity],
      MatPiece::Row(0),
    );
    let m = spec
      .fetch(&RenderState::new(), &TransformState::default())
      .unwrap();

    assert_eq!(spec.extract(&m), MatValue::Vector([1., 1., 1., 1.], 4));
  }

  #[test]
  fn pointer_sizes() {
    let declared = PtrSpec {
      name: "weights".to_owned(),
      input_name: "weights".to_owned(),
      location: 0,
      ty: ParamType::Vector(ScalarType::Float, 4),
      array_size: ArraySize::Declared(8),
      deps: StateDeps::SHADER_INPUTS,
    };

    assert_eq!(declared.scalars_to_read(31), None);
    assert_eq!(declared.scalars_to_read(32), Some(32));
    assert_eq!(declared.scalars_to_read(40), Some(32));

    let unsized_spec = PtrSpec {
      array_size: ArraySize::Unsized(4),
      ..declared
    };

    assert_eq!(unsized_spec.scalars_to_read(3), None);
    assert_eq!(unsized_spec.scalars_to_read(9), Some(8));
    assert_eq!(unsized_spec.scalars_to_read(64), Some(16));
  }
}
