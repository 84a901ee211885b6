//! Coordinate systems and transform sources.
//!
//! The binder never stores transforms; it asks a [`TransformSource`] for the conversion between
//! two coordinate systems each time a matrix parameter is issued. Everything is computed in double
//! precision and narrowed to single precision only when pushed.

use glam::DMat4;
use std::collections::HashMap;

/// A named coordinate system.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum CoordSys {
  /// Space of the object being drawn.
  Model,
  World,
  /// Camera space, in the engine's coordinate convention.
  View,
  /// Camera space, in the graphics API's convention.
  ApiView,
  /// Clip space of the graphics API.
  ApiClip,
  /// Space of a named node.
  Node(String),
}

impl CoordSys {
  /// Parse a coordinate-system token of a shorthand parameter name.
  ///
  /// Unknown tokens name a node.
  pub fn from_token(token: &str) -> Self {
    match token {
      "model" => CoordSys::Model,
      "world" => CoordSys::World,
      "view" => CoordSys::View,
      "apiview" => CoordSys::ApiView,
      "clip" | "apiclip" => CoordSys::ApiClip,
      name => CoordSys::Node(name.to_owned()),
    }
  }
}

/// Source of the transforms a shader may ask for.
pub trait TransformSource {
  /// Matrix converting `sys` coordinates to API view coordinates, if known this frame.
  fn to_api_view(&self, sys: &CoordSys) -> Option<DMat4>;

  /// Matrix converting API view coordinates to `sys` coordinates, if known this frame.
  fn from_api_view(&self, sys: &CoordSys) -> Option<DMat4>;

  /// Matrix converting `from` coordinates to `to` coordinates.
  fn compose(&self, from: &CoordSys, to: &CoordSys) -> Option<DMat4> {
    let to_view = self.to_api_view(from)?;
    let from_view = self.from_api_view(to)?;
    Some(from_view * to_view)
  }
}

/// Transforms of the object being drawn and of the camera drawing it.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformState {
  /// Model to world.
  pub model: DMat4,
  /// World to view.
  pub view: DMat4,
  /// View to API view (coordinate convention change).
  pub cs_transform: DMat4,
  /// API view to API clip.
  pub projection: DMat4,
  /// Node to world, by node name.
  pub nodes: HashMap<String, DMat4>,
}

impl Default for TransformState {
  fn default() -> Self {
    TransformState {
      model: DMat4::IDENTITY,
      view: DMat4::IDENTITY,
      cs_transform: DMat4::IDENTITY,
      projection: DMat4::IDENTITY,
      nodes: HashMap::new(),
    }
  }
}

impl TransformState {
  pub fn new(model: DMat4, view: DMat4, projection: DMat4) -> Self {
    TransformState {
      model,
      view,
      projection,
      ..TransformState::default()
    }
  }

  pub fn with_node(mut self, name: impl Into<String>, node_to_world: DMat4) -> Self {
    self.nodes.insert(name.into(), node_to_world);
    self
  }

  fn world_to_api_view(&self) -> DMat4 {
    self.cs_transform * self.view
  }
}

impl TransformSource for TransformState {
  fn to_api_view(&self, sys: &CoordSys) -> Option<DMat4> {
    match sys {
      CoordSys::Model => Some(self.world_to_api_view() * self.model),
      CoordSys::World => Some(self.world_to_api_view()),
      CoordSys::View => Some(self.cs_transform),
      CoordSys::ApiView => Some(DMat4::IDENTITY),
      CoordSys::ApiClip => invert(&self.projection),
      CoordSys::Node(name) => self
        .nodes
        .get(name)
        .map(|node| self.world_to_api_view() * *node),
    }
  }

  fn from_api_view(&self, sys: &CoordSys) -> Option<DMat4> {
    match sys {
      CoordSys::ApiClip => Some(self.projection),
      CoordSys::ApiView => Some(DMat4::IDENTITY),
      other => self.to_api_view(other).and_then(|m| invert(&m)),
    }
  }
}

/// Inverse of `m`, unless it is singular.
fn invert(m: &DMat4) -> Option<DMat4> {
  let det = m.determinant();

  if det == 0. || !det.is_finite() {
    None
  } else {
    Some(m.inverse())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use glam::{DVec3, DVec4};

  fn state() -> TransformState {
    TransformState::new(
      DMat4::from_translation(DVec3::new(1., 2., 3.)),
      DMat4::look_at_rh(DVec3::new(0., -10., 2.), DVec3::ZERO, DVec3::Z),
      DMat4::perspective_rh_gl(1., 1.5, 0.1, 100.),
    )
    .with_node("lamp", DMat4::from_translation(DVec3::new(5., 0., 0.)))
  }

  #[test]
  fn model_to_clip() {
    let s = state();
    let mvp = s.compose(&CoordSys::Model, &CoordSys::ApiClip).unwrap();
    let expected = s.projection * s.view * s.model;

    assert!(mvp.abs_diff_eq(expected, 1e-9));
  }

  #[test]
  fn inverse_chain() {
    let s = state();
    let forward = s.compose(&CoordSys::Model, &CoordSys::ApiClip).unwrap();
    let backward = s.compose(&CoordSys::ApiClip, &CoordSys::Model).unwrap();

    assert!((forward * backward).abs_diff_eq(DMat4::IDENTITY, 1e-9));
  }

  #[test]
  fn node_position() {
    let s = state();
    let lamp_to_world = s.compose(&CoordSys::Node("lamp".to_owned()), &CoordSys::World).unwrap();

    assert!(lamp_to_world.w_axis.abs_diff_eq(DVec4::new(5., 0., 0., 1.), 1e-9));
    assert!(s.compose(&CoordSys::Node("ghost".to_owned()), &CoordSys::World).is_none());
  }

  #[test]
  fn tokens() {
    assert_eq!(CoordSys::from_token("model"), CoordSys::Model);
    assert_eq!(CoordSys::from_token("clip"), CoordSys::ApiClip);
    assert_eq!(CoordSys::from_token("lamp"), CoordSys::Node("lamp".to_owned()));
  }
}
