//! CPU-side textures.
//!
//! A [`Texture`] is a cheap, clonable handle over shared texture data. The guardian never owns
//! textures; it prepares a GPU copy of them (a [`TextureContext`]) on first use and keeps it in
//! sync with the texture's modification counter.
//!
//! [`TextureContext`]: crate::resource::texture::TextureContext

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a texture.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TextureId(u64);

/// Dimensionality of a texture.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TextureType {
  Texture1D,
  Texture2D,
  Texture3D,
  Texture2DArray,
  CubeMap,
  BufferTexture,
}

/// Texel format.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Format {
  DepthStencil,
  DepthComponent,
  DepthComponent16,
  DepthComponent24,
  DepthComponent32,
  Red,
  Rg,
  Rgb,
  Rgba,
  Rgba8,
  Rgba16,
  Rgba32,
  R32,
  R32i,
  Srgb,
  SrgbAlpha,
}

impl Format {
  /// Number of components of a texel.
  pub fn components(self) -> usize {
    match self {
      Format::DepthStencil
      | Format::DepthComponent
      | Format::DepthComponent16
      | Format::DepthComponent24
      | Format::DepthComponent32
      | Format::Red
      | Format::R32
      | Format::R32i => 1,
      Format::Rg => 2,
      Format::Rgb | Format::Srgb => 3,
      Format::Rgba | Format::Rgba8 | Format::Rgba16 | Format::Rgba32 | Format::SrgbAlpha => 4,
    }
  }

  pub fn is_depth(self) -> bool {
    matches!(
      self,
      Format::DepthStencil
        | Format::DepthComponent
        | Format::DepthComponent16
        | Format::DepthComponent24
        | Format::DepthComponent32
    )
  }
}

/// Type of a texel component.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ComponentType {
  UnsignedByte,
  UnsignedShort,
  UnsignedInt,
  Int,
  HalfFloat,
  Float,
  /// Packed 24-bit depth and 8-bit stencil.
  UnsignedInt24_8,
}

impl ComponentType {
  pub fn bytes(self) -> usize {
    match self {
      ComponentType::UnsignedByte => 1,
      ComponentType::UnsignedShort | ComponentType::HalfFloat => 2,
      ComponentType::UnsignedInt
      | ComponentType::Int
      | ComponentType::Float
      | ComponentType::UnsignedInt24_8 => 4,
    }
  }
}

/// Bytes taken by one texel.
pub fn texel_size(format: Format, component_type: ComponentType) -> usize {
  match (format, component_type) {
    (Format::DepthStencil, ComponentType::Float) => 8,
    (Format::DepthStencil, _) => 4,
    _ => format.components() * component_type.bytes(),
  }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Filter {
  Nearest,
  Linear,
  NearestMipmapNearest,
  LinearMipmapNearest,
  NearestMipmapLinear,
  LinearMipmapLinear,
}

impl Filter {
  pub fn uses_mipmaps(self) -> bool {
    !matches!(self, Filter::Nearest | Filter::Linear)
  }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Wrap {
  ClampToEdge,
  Repeat,
  MirroredRepeat,
  ClampToBorder,
}

/// Sampling parameters.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SamplerState {
  pub wrap_u: Wrap,
  pub wrap_v: Wrap,
  pub wrap_w: Wrap,
  pub min_filter: Filter,
  pub mag_filter: Filter,
  pub anisotropic_degree: u8,
  /// Depth comparison for shadow samplers.
  pub compare: bool,
}

impl Default for SamplerState {
  fn default() -> Self {
    SamplerState {
      wrap_u: Wrap::Repeat,
      wrap_v: Wrap::Repeat,
      wrap_w: Wrap::Repeat,
      min_filter: Filter::Linear,
      mag_filter: Filter::Linear,
      anisotropic_degree: 1,
      compare: false,
    }
  }
}

/// Shape of a texture's storage: what cannot change under a frozen (bindless) GPU copy.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TextureShape {
  pub texture_type: TextureType,
  pub format: Format,
  pub component_type: ComponentType,
  pub size: [u32; 3],
  pub mipmaps: bool,
}

#[derive(Debug)]
struct TextureData {
  id: TextureId,
  name: String,
  texture_type: TextureType,
  format: Format,
  component_type: ComponentType,
  size: [u32; 3],
  pad: [u32; 3],
  sampler: SamplerState,
  ram_image: Option<Vec<u8>>,
  related: HashMap<String, Texture>,
  render_to_texture: bool,
  modified: u64,
}

/// A shared CPU-side texture.
#[derive(Clone, Debug)]
pub struct Texture(Rc<RefCell<TextureData>>);

impl Texture {
  pub fn new(name: impl Into<String>, texture_type: TextureType) -> Self {
    let id = TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed));
    let data = TextureData {
      id,
      name: name.into(),
      texture_type,
      format: Format::Rgba,
      component_type: ComponentType::UnsignedByte,
      size: [1, 1, 1],
      pad: [0, 0, 0],
      sampler: SamplerState::default(),
      ram_image: None,
      related: HashMap::new(),
      render_to_texture: false,
      modified: 1,
    };

    Texture(Rc::new(RefCell::new(data)))
  }

  /// Convenience constructor for a 2D texture of the given size.
  pub fn new_2d(name: impl Into<String>, width: u32, height: u32) -> Self {
    let tex = Texture::new(name, TextureType::Texture2D);
    tex.set_size(width, height, 1);
    tex
  }

  /// Convenience constructor for a cube map with square faces.
  pub fn new_cube_map(name: impl Into<String>, size: u32) -> Self {
    let tex = Texture::new(name, TextureType::CubeMap);
    tex.set_size(size, size, 6);
    tex
  }

  fn data(&self) -> Ref<TextureData> {
    self.0.borrow()
  }

  fn modify(&self, f: impl FnOnce(&mut TextureData)) {
    let mut data = self.0.borrow_mut();
    f(&mut data);
    data.modified += 1;
  }

  pub fn id(&self) -> TextureId {
    self.data().id
  }

  pub fn name(&self) -> String {
    self.data().name.clone()
  }

  pub fn texture_type(&self) -> TextureType {
    self.data().texture_type
  }

  pub fn format(&self) -> Format {
    self.data().format
  }

  pub fn set_format(&self, format: Format) {
    if self.format() != format {
      self.modify(|data| data.format = format);
    }
  }

  pub fn component_type(&self) -> ComponentType {
    self.data().component_type
  }

  pub fn set_component_type(&self, component_type: ComponentType) {
    if self.component_type() != component_type {
      self.modify(|data| data.component_type = component_type);
    }
  }

  pub fn x_size(&self) -> u32 {
    self.data().size[0]
  }

  pub fn y_size(&self) -> u32 {
    self.data().size[1]
  }

  pub fn z_size(&self) -> u32 {
    self.data().size[2]
  }

  pub fn size(&self) -> [u32; 3] {
    self.data().size
  }

  pub fn set_size(&self, x: u32, y: u32, z: u32) {
    let z = if self.texture_type() == TextureType::CubeMap {
      6
    } else {
      z
    };

    if self.size() != [x, y, z] {
      self.modify(|data| data.size = [x, y, z]);
    }
  }

  /// Unused texels past the logical size.
  pub fn pad_size(&self) -> [u32; 3] {
    self.data().pad
  }

  pub fn set_pad_size(&self, x: u32, y: u32, z: u32) {
    let mut data = self.0.borrow_mut();
    data.pad = [x, y, z];
  }

  pub fn sampler(&self) -> SamplerState {
    self.data().sampler
  }

  pub fn set_sampler(&self, sampler: SamplerState) {
    if self.sampler() != sampler {
      self.modify(|data| data.sampler = sampler);
    }
  }

  pub fn uses_mipmaps(&self) -> bool {
    self.data().sampler.min_filter.uses_mipmaps()
  }

  pub fn has_ram_image(&self) -> bool {
    self.data().ram_image.is_some()
  }

  pub fn set_ram_image(&self, texels: Vec<u8>) {
    self.modify(|data| data.ram_image = Some(texels));
  }

  pub fn clear_ram_image(&self) {
    self.modify(|data| data.ram_image = None);
  }

  /// Run `f` with the texels of the texture, if any.
  pub fn with_ram_image<R>(&self, f: impl FnOnce(Option<&[u8]>) -> R) -> R {
    let data = self.data();
    f(data.ram_image.as_deref())
  }

  /// Register a texture related to this one (normal map, gloss map…) under `suffix`.
  pub fn add_related(&self, suffix: impl Into<String>, texture: Texture) {
    self.0.borrow_mut().related.insert(suffix.into(), texture);
  }

  /// Texture related to this one under `suffix`, if any.
  pub fn load_related(&self, suffix: &str) -> Option<Texture> {
    self.data().related.get(suffix).cloned()
  }

  /// Whether the texture is the target of an offscreen buffer.
  pub fn is_render_to_texture(&self) -> bool {
    self.data().render_to_texture
  }

  pub fn set_render_to_texture(&self, render_to_texture: bool) {
    self.0.borrow_mut().render_to_texture = render_to_texture;
  }

  /// Modification counter; bumped each time the texture changes in a way the GPU copy must
  /// follow.
  pub fn modified(&self) -> u64 {
    self.data().modified
  }

  pub fn shape(&self) -> TextureShape {
    let data = self.data();

    TextureShape {
      texture_type: data.texture_type,
      format: data.format,
      component_type: data.component_type,
      size: data.size,
      mipmaps: data.sampler.min_filter.uses_mipmaps(),
    }
  }

  /// Size in bytes of the base level.
  pub fn expected_ram_image_size(&self) -> usize {
    let data = self.data();
    let [x, y, z] = data.size;
    x as usize * y as usize * z as usize * texel_size(data.format, data.component_type)
  }
}

impl PartialEq for Texture {
  fn eq(&self, rhs: &Self) -> bool {
    Rc::ptr_eq(&self.0, &rhs.0)
  }
}

impl Eq for Texture {}

/// Smallest power of two greater than or equal to `value`.
pub fn up_to_power_2(value: u32) -> u32 {
  if value <= 1 {
    1
  } else {
    value.next_power_of_two()
  }
}

/// Largest power of two smaller than or equal to `value`.
pub fn down_to_power_2(value: u32) -> u32 {
  if value == 0 {
    0
  } else {
    1 << (31 - value.leading_zeros())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn powers_of_two() {
    assert_eq!(up_to_power_2(0), 1);
    assert_eq!(up_to_power_2(1), 1);
    assert_eq!(up_to_power_2(300), 512);
    assert_eq!(up_to_power_2(512), 512);
    assert_eq!(down_to_power_2(300), 256);
    assert_eq!(down_to_power_2(1), 1);
    assert_eq!(down_to_power_2(0), 0);
  }

  #[test]
  fn modification_counter() {
    let tex = Texture::new_2d("t", 4, 4);
    let m = tex.modified();

    tex.set_size(4, 4, 1);
    assert_eq!(tex.modified(), m);

    tex.set_format(Format::Rgba16);
    assert!(tex.modified() > m);
  }

  #[test]
  fn cube_maps_have_six_faces() {
    let tex = Texture::new_cube_map("cube", 64);
    assert_eq!(tex.size(), [64, 64, 6]);

    tex.set_size(32, 32, 1);
    assert_eq!(tex.z_size(), 6);
  }

  #[test]
  fn related_textures() {
    let tex = Texture::new_2d("diffuse", 4, 4);
    let normal = Texture::new_2d("normal", 4, 4);
    tex.add_related("normal", normal.clone());

    assert_eq!(tex.load_related("normal"), Some(normal));
    assert_eq!(tex.load_related("gloss"), None);
  }

  #[test]
  fn texel_sizes() {
    assert_eq!(texel_size(Format::Rgba, ComponentType::UnsignedByte), 4);
    assert_eq!(texel_size(Format::Rgba32, ComponentType::Float), 16);
    assert_eq!(
      texel_size(Format::DepthStencil, ComponentType::UnsignedInt24_8),
      4
    );
  }
}
