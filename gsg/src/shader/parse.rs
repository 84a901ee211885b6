//! Parameter name classification.
//!
//! Uniform and attribute names follow a small naming convention: reserved `p3d_` names for
//! engine-provided state, shorthand transform names tokenized on `_`, `k_`-prefixed unsized
//! inputs, and plain names for everything the application supplies by name.

use std::error;
use std::fmt;

use crate::backend::buffer::LegacyArray;
use crate::backend::shader::{ActiveParameter, ParamType, ScalarType};
use crate::render_state::StateDeps;
use crate::shader::spec::{
  ArraySize, ImageSpec, MatFunc, MatInput, MatPiece, MatSpec, PtrSpec, TexSource, TexSpec,
  VarSource,
};
use crate::transform::CoordSys;

/// Naming errors. None of them is fatal; the parameter is skipped.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
  /// The parameter's type does not match what its name requires.
  WrongType { name: String, expected: &'static str },
  /// A shorthand name that cannot be tokenized.
  BadShorthand(String),
  /// A reserved matrix declared in double precision.
  DoubleMatrix(String),
  /// A reserved attribute name nobody provides.
  UnknownAttribute(String),
}

impl fmt::Display for ParseError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      ParseError::WrongType { ref name, expected } => {
        write!(f, "{} should be declared as {}", name, expected)
      }

      ParseError::BadShorthand(ref name) => write!(f, "cannot parse parameter name {}", name),

      ParseError::DoubleMatrix(ref name) => {
        write!(f, "{} must be single precision", name)
      }

      ParseError::UnknownAttribute(ref name) => write!(f, "unrecognized vertex attribute {}", name),
    }
  }
}

impl error::Error for ParseError {}

/// What a uniform turned out to be.
///
/// Texture and image specs come out with unit `0`; units are assigned by the shader context.
#[derive(Clone, Debug, PartialEq)]
pub enum Uniform {
  Mat(MatSpec),
  Ptr(PtrSpec),
  Texture(TexSpec),
  Image(ImageSpec),
  Ignored,
}

/// Remove a trailing `[n]` from a reflected name.
pub fn strip_array_suffix(name: &str) -> &str {
  match name.rfind('[') {
    Some(index) if name.ends_with(']') => &name[..index],
    _ => name,
  }
}

pub fn classify_uniform(param: &ActiveParameter) -> Result<Uniform, ParseError> {
  let name = strip_array_suffix(&param.name);

  if let Some(reserved) = name.strip_prefix("p3d_") {
    return classify_reserved(name, reserved, param);
  }

  match param.ty {
    ParamType::Sampler(kind, desired) => {
      return Ok(Uniform::Texture(TexSpec {
        name: name.to_owned(),
        location: param.location,
        unit: 0,
        source: TexSource::Named(name.to_owned()),
        suffix: None,
        desired,
        kind,
      }));
    }

    ParamType::Image(kind, desired) => {
      return Ok(Uniform::Image(ImageSpec {
        name: name.to_owned(),
        location: param.location,
        unit: 0,
        desired,
        kind,
      }));
    }

    ParamType::Unknown(_) => return Ok(Uniform::Ignored),

    _ => (),
  }

  if let Some(spec) = classify_shorthand(name, param)? {
    return Ok(Uniform::Mat(spec.at(param.location)));
  }

  let (input_name, array_size) = match name.strip_prefix("k_") {
    Some(stripped) => (stripped, ArraySize::Unsized(param.size.max(1))),
    None => (name, ArraySize::Declared(param.size.max(1))),
  };

  Ok(Uniform::Ptr(PtrSpec {
    name: name.to_owned(),
    input_name: input_name.to_owned(),
    location: param.location,
    ty: param.ty,
    array_size,
    deps: StateDeps::SHADER_INPUTS,
  }))
}

fn classify_reserved(
  name: &str,
  reserved: &str,
  param: &ActiveParameter,
) -> Result<Uniform, ParseError> {
  if let Some(stage) = reserved.strip_prefix("Texture") {
    let (index, suffix) = match stage.split_once('_') {
      Some((index, suffix)) => (index, Some(suffix.to_owned())),
      None => (stage, None),
    };

    let index = match index.parse::<usize>() {
      Ok(index) => index,
      Err(_) => return Ok(Uniform::Ignored),
    };

    return match param.ty {
      ParamType::Sampler(kind, desired) => Ok(Uniform::Texture(TexSpec {
        name: name.to_owned(),
        location: param.location,
        unit: 0,
        source: TexSource::Stage(index),
        suffix,
        desired,
        kind,
      })),

      _ => Err(wrong_type(name, "a sampler")),
    };
  }

  if reserved == "ColorScale" {
    let components = float_vector(name, param)?;
    let spec = MatSpec::new(
      name,
      MatFunc::First,
      [MatInput::ColorScale, MatInput::Identity],
      MatPiece::Row(0),
    );

    return Ok(Uniform::Mat(spec.with_components(components).at(param.location)));
  }

  if let Some(member) = reserved.strip_prefix("Material.") {
    let piece = match member {
      "ambient" => MatPiece::Row(0),
      "diffuse" => MatPiece::Row(1),
      "emission" => MatPiece::Row(2),
      "specular" => MatPiece::Row(3),
      "shininess" => MatPiece::Cell(3, 3),
      _ => return Ok(Uniform::Ignored),
    };

    let components = float_vector(name, param)?;
    let spec = MatSpec::new(name, MatFunc::First, [MatInput::Material, MatInput::Identity], piece);

    return Ok(Uniform::Mat(spec.with_components(components).at(param.location)));
  }

  if reserved == "NormalMatrix" {
    let piece = match reserved_matrix_dim(name, param)? {
      3 => MatPiece::Transpose3x3,
      _ => MatPiece::Transpose,
    };
    let spec = MatSpec::new(
      name,
      MatFunc::Compose,
      [MatInput::Coord(CoordSys::ApiView), MatInput::Coord(CoordSys::Model)],
      piece,
    );

    return Ok(Uniform::Mat(spec.at(param.location)));
  }

  let (base, inverse, transpose) = if let Some(base) = reserved.strip_suffix("InverseTranspose") {
    (base, true, true)
  } else if let Some(base) = reserved.strip_suffix("Inverse") {
    (base, true, false)
  } else if let Some(base) = reserved.strip_suffix("Transpose") {
    (base, false, true)
  } else {
    (reserved, false, false)
  };

  let (from, to) = match base {
    "ModelViewProjectionMatrix" => (CoordSys::Model, CoordSys::ApiClip),
    "ModelViewMatrix" => (CoordSys::Model, CoordSys::ApiView),
    "ProjectionMatrix" => (CoordSys::ApiView, CoordSys::ApiClip),
    "ModelMatrix" => (CoordSys::Model, CoordSys::World),
    "ViewMatrix" => (CoordSys::World, CoordSys::ApiView),
    "ViewProjectionMatrix" => (CoordSys::World, CoordSys::ApiClip),
    _ => return Ok(Uniform::Ignored),
  };

  let parts = if inverse {
    [MatInput::Coord(to), MatInput::Coord(from)]
  } else {
    [MatInput::Coord(from), MatInput::Coord(to)]
  };

  let piece = match (reserved_matrix_dim(name, param)?, transpose) {
    (3, false) => MatPiece::Upper3x3,
    (3, true) => MatPiece::Transpose3x3,
    (_, false) => MatPiece::Whole,
    (_, true) => MatPiece::Transpose,
  };

  Ok(Uniform::Mat(
    MatSpec::new(name, MatFunc::Compose, parts, piece).at(param.location),
  ))
}

fn wrong_type(name: &str, expected: &'static str) -> ParseError {
  ParseError::WrongType {
    name: name.to_owned(),
    expected,
  }
}

/// Dimension of a reserved matrix uniform.
fn reserved_matrix_dim(name: &str, param: &ActiveParameter) -> Result<u8, ParseError> {
  match param.ty {
    ParamType::Matrix(ScalarType::Float, dim @ (3 | 4)) => Ok(dim),
    ParamType::Matrix(ScalarType::Double, _) => Err(ParseError::DoubleMatrix(name.to_owned())),
    _ => Err(wrong_type(name, "mat3 or mat4")),
  }
}

/// Component count of a single-precision vector uniform.
fn float_vector(name: &str, param: &ActiveParameter) -> Result<u8, ParseError> {
  match param.ty {
    ParamType::Vector(ScalarType::Float, n) => Ok(n),
    _ => Err(wrong_type(name, "a float vector")),
  }
}

/// Recognize shorthand transform names: `trans_a_to_b`, `tpose_a_to_b`, `row<i>_a_to_b`,
/// `col<i>_a_to_b`, `{m,w,v,c}strans_x` and `{m,w,v,c}spos_x`.
///
/// Returns `Ok(None)` when the name is not a shorthand at all.
fn classify_shorthand(name: &str, param: &ActiveParameter) -> Result<Option<MatSpec>, ParseError> {
  let tokens: Vec<&str> = name.split('_').collect();
  let keyword = tokens[0];

  let vector_piece = match keyword {
    "row0" | "row1" | "row2" | "row3" => Some(MatPiece::Row(keyword.as_bytes()[3] - b'0')),
    "col0" | "col1" | "col2" | "col3" => Some(MatPiece::Col(keyword.as_bytes()[3] - b'0')),
    _ => None,
  };

  if keyword == "trans" || keyword == "tpose" || vector_piece.is_some() {
    if tokens.len() != 4 || tokens[2] != "to" {
      return Err(ParseError::BadShorthand(name.to_owned()));
    }

    let parts = [
      MatInput::Coord(CoordSys::from_token(tokens[1])),
      MatInput::Coord(CoordSys::from_token(tokens[3])),
    ];

    let spec = match vector_piece {
      Some(piece) => {
        let components = float_vector(name, param)?;
        MatSpec::new(name, MatFunc::Compose, parts, piece).with_components(components)
      }

      None => {
        let piece = matrix_piece(name, param, keyword == "tpose")?;
        MatSpec::new(name, MatFunc::Compose, parts, piece)
      }
    };

    return Ok(Some(spec));
  }

  let (space, position) = match keyword {
    "mstrans" => (CoordSys::Model, false),
    "wstrans" => (CoordSys::World, false),
    "vstrans" => (CoordSys::View, false),
    "cstrans" => (CoordSys::ApiClip, false),
    "mspos" => (CoordSys::Model, true),
    "wspos" => (CoordSys::World, true),
    "vspos" => (CoordSys::View, true),
    "cspos" => (CoordSys::ApiClip, true),
    _ => return Ok(None),
  };

  let node = tokens[1..].join("_");
  if node.is_empty() {
    return Err(ParseError::BadShorthand(name.to_owned()));
  }

  let parts = [MatInput::Coord(CoordSys::Node(node)), MatInput::Coord(space)];

  let spec = if position {
    let components = float_vector(name, param)?;
    MatSpec::new(name, MatFunc::Compose, parts, MatPiece::Col(3)).with_components(components)
  } else {
    let piece = matrix_piece(name, param, false)?;
    MatSpec::new(name, MatFunc::Compose, parts, piece)
  };

  Ok(Some(spec))
}

fn matrix_piece(
  name: &str,
  param: &ActiveParameter,
  transpose: bool,
) -> Result<MatPiece, ParseError> {
  match (param.ty, transpose) {
    (ParamType::Matrix(ScalarType::Float, 4), false) => Ok(MatPiece::Whole),
    (ParamType::Matrix(ScalarType::Float, 4), true) => Ok(MatPiece::Transpose),
    (ParamType::Matrix(ScalarType::Float, 3), false) => Ok(MatPiece::Upper3x3),
    (ParamType::Matrix(ScalarType::Float, 3), true) => Ok(MatPiece::Transpose3x3),
    _ => Err(wrong_type(name, "mat3 or mat4")),
  }
}

/// Classify a vertex attribute. `Ok(None)` means the attribute is fed by the driver itself.
pub fn classify_attribute(name: &str) -> Result<Option<VarSource>, ParseError> {
  let name = strip_array_suffix(name);

  if let Some(builtin) = name.strip_prefix("gl_") {
    let array = match builtin {
      "Vertex" => LegacyArray::Vertex,
      "Normal" => LegacyArray::Normal,
      "Color" => LegacyArray::Color,
      "SecondaryColor" => LegacyArray::SecondaryColor,
      "FogCoord" => LegacyArray::FogCoord,
      _ => match builtin
        .strip_prefix("MultiTexCoord")
        .and_then(|n| n.parse::<u32>().ok())
      {
        Some(n) => LegacyArray::TexCoord(n),
        None => return Ok(None),
      },
    };

    return Ok(Some(VarSource::Legacy(array)));
  }

  if let Some(reserved) = name.strip_prefix("p3d_") {
    let column = match reserved {
      "Vertex" => "vertex".to_owned(),
      "Normal" => "normal".to_owned(),
      "Color" => "color".to_owned(),
      "MultiTexCoord0" => "texcoord".to_owned(),
      _ => {
        if let Some(n) = reserved.strip_prefix("MultiTexCoord") {
          indexed_column("texcoord", n, name)?
        } else if let Some(n) = reserved.strip_prefix("Tangent") {
          indexed_column("tangent", n, name)?
        } else if let Some(n) = reserved.strip_prefix("Binormal") {
          indexed_column("binormal", n, name)?
        } else {
          return Err(ParseError::UnknownAttribute(name.to_owned()));
        }
      }
    };

    return Ok(Some(VarSource::Column(column)));
  }

  Ok(Some(VarSource::Column(name.to_owned())))
}

fn indexed_column(base: &str, index: &str, name: &str) -> Result<String, ParseError> {
  if index.is_empty() {
    return Ok(base.to_owned());
  }

  match index.parse::<u32>() {
    Ok(n) => Ok(format!("{}.{}", base, n)),
    Err(_) => Err(ParseError::UnknownAttribute(name.to_owned())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::shader::SamplerKind;
  use crate::texture::TextureType;

  fn param(name: &str, ty: ParamType) -> ActiveParameter {
    ActiveParameter {
      name: name.to_owned(),
      location: 7,
      size: 1,
      ty,
    }
  }

  fn mat4() -> ParamType {
    ParamType::Matrix(ScalarType::Float, 4)
  }

  fn mat_spec(p: ActiveParameter) -> MatSpec {
    match classify_uniform(&p) {
      Ok(Uniform::Mat(spec)) => spec,
      other => panic!("{} classified as {:?}", p.name, other),
    }
  }

  #[test]
  fn array_suffixes() {
    assert_eq!(strip_array_suffix("lights[0]"), "lights");
    assert_eq!(strip_array_suffix("p3d_Material.ambient"), "p3d_Material.ambient");
    assert_eq!(strip_array_suffix("x[12]"), "x");
  }

  #[test]
  fn reserved_matrices() {
    let mvp = mat_spec(param("p3d_ModelViewProjectionMatrix", mat4()));
    assert_eq!(mvp.location, 7);
    assert_eq!(mvp.func, MatFunc::Compose);
    assert_eq!(
      mvp.parts,
      [MatInput::Coord(CoordSys::Model), MatInput::Coord(CoordSys::ApiClip)]
    );
    assert_eq!(mvp.piece, MatPiece::Whole);

    let inv = mat_spec(param("p3d_ModelViewMatrixInverseTranspose", mat4()));
    assert_eq!(
      inv.parts,
      [MatInput::Coord(CoordSys::ApiView), MatInput::Coord(CoordSys::Model)]
    );
    assert_eq!(inv.piece, MatPiece::Transpose);

    let view3 = mat_spec(param("p3d_ViewMatrix", ParamType::Matrix(ScalarType::Float, 3)));
    assert_eq!(view3.piece, MatPiece::Upper3x3);

    let normal = mat_spec(param("p3d_NormalMatrix", ParamType::Matrix(ScalarType::Float, 3)));
    assert_eq!(normal.piece, MatPiece::Transpose3x3);
  }

  #[test]
  fn reserved_double_matrix_rejected() {
    let p = param("p3d_ProjectionMatrix", ParamType::Matrix(ScalarType::Double, 4));
    assert_eq!(
      classify_uniform(&p),
      Err(ParseError::DoubleMatrix("p3d_ProjectionMatrix".to_owned()))
    );
  }

  #[test]
  fn texture_stages() {
    let p = param(
      "p3d_Texture1_normal",
      ParamType::Sampler(SamplerKind::Float, TextureType::Texture2D),
    );

    match classify_uniform(&p) {
      Ok(Uniform::Texture(spec)) => {
        assert_eq!(spec.source, TexSource::Stage(1));
        assert_eq!(spec.suffix.as_deref(), Some("normal"));
      }

      other => panic!("unexpected {:?}", other),
    }

    let bad = param("p3d_Texture0", ParamType::Vector(ScalarType::Float, 4));
    assert!(matches!(classify_uniform(&bad), Err(ParseError::WrongType { .. })));
  }

  #[test]
  fn material_members() {
    let p = param("p3d_Material.specular", ParamType::Vector(ScalarType::Float, 3));
    let spec = mat_spec(p);

    assert_eq!(spec.piece, MatPiece::Row(3));
    assert_eq!(spec.components, 3);
    assert_eq!(spec.deps, StateDeps::MATERIAL);
  }

  #[test]
  fn shorthand() {
    let spec = mat_spec(param("trans_model_to_world", mat4()));
    assert_eq!(
      spec.parts,
      [MatInput::Coord(CoordSys::Model), MatInput::Coord(CoordSys::World)]
    );

    let row = mat_spec(param("row3_world_to_lamp", ParamType::Vector(ScalarType::Float, 3)));
    assert_eq!(row.piece, MatPiece::Row(3));
    assert_eq!(row.parts[1], MatInput::Coord(CoordSys::Node("lamp".to_owned())));

    let pos = mat_spec(param("wspos_street_lamp", ParamType::Vector(ScalarType::Float, 4)));
    assert_eq!(pos.piece, MatPiece::Col(3));
    assert_eq!(
      pos.parts,
      [
        MatInput::Coord(CoordSys::Node("street_lamp".to_owned())),
        MatInput::Coord(CoordSys::World)
      ]
    );
    assert!(pos.deps.contains(StateDeps::FRAME));
  }

  #[test]
  fn bad_shorthand() {
    let p = param("trans_model_world", mat4());
    assert_eq!(
      classify_uniform(&p),
      Err(ParseError::BadShorthand("trans_model_world".to_owned()))
    );

    let p = param("tpose_model_to_world", ParamType::Vector(ScalarType::Float, 4));
    assert!(matches!(classify_uniform(&p), Err(ParseError::WrongType { .. })));
  }

  #[test]
  fn pointers() {
    let mut p = param("k_weights[0]", ParamType::Vector(ScalarType::Float, 4));
    p.size = 8;

    match classify_uniform(&p) {
      Ok(Uniform::Ptr(spec)) => {
        assert_eq!(spec.name, "k_weights");
        assert_eq!(spec.input_name, "weights");
        assert_eq!(spec.array_size, ArraySize::Unsized(8));
      }

      other => panic!("unexpected {:?}", other),
    }

    match classify_uniform(&param("tint", ParamType::Vector(ScalarType::Float, 3))) {
      Ok(Uniform::Ptr(spec)) => assert_eq!(spec.array_size, ArraySize::Declared(1)),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn unknown_reserved_uniform_ignored() {
    let p = param("p3d_LightSource.color", ParamType::Vector(ScalarType::Float, 4));
    assert_eq!(classify_uniform(&p), Ok(Uniform::Ignored));
  }

  #[test]
  fn attributes() {
    assert_eq!(
      classify_attribute("p3d_Vertex"),
      Ok(Some(VarSource::Column("vertex".to_owned())))
    );
    assert_eq!(
      classify_attribute("p3d_MultiTexCoord2"),
      Ok(Some(VarSource::Column("texcoord.2".to_owned())))
    );
    assert_eq!(
      classify_attribute("p3d_Tangent"),
      Ok(Some(VarSource::Column("tangent".to_owned())))
    );
    assert_eq!(
      classify_attribute("p3d_Binormal1"),
      Ok(Some(VarSource::Column("binormal.1".to_owned())))
    );
    assert_eq!(
      classify_attribute("gl_MultiTexCoord3"),
      Ok(Some(VarSource::Legacy(LegacyArray::TexCoord(3))))
    );
    assert_eq!(classify_attribute("gl_VertexID"), Ok(None));
    assert_eq!(
      classify_attribute("offset"),
      Ok(Some(VarSource::Column("offset".to_owned())))
    );
    assert!(classify_attribute("p3d_Whatever").is_err());
  }
}
