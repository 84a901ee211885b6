//! # Graphics state guardian
//!
//! The core of a real-time renderer: a backend-neutral layer between a scene graph and a
//! graphics API. It keeps track of what is bound on the device, prepares CPU-side resources
//! (textures, samplers, vertex and index buffers, geoms and shaders) into device contexts, pushes
//! scene-derived values into shader parameters and manages offscreen render targets.
//!
//! The crate never talks to a graphics API itself. A backend implements the traits of
//! [`backend`]; the `gsg-gl` crate provides one for OpenGL 3.3+.
//!
//! # What’s included?
//!
//! - **Resource contexts**: every prepared resource has a context holding its device handle, its
//!   residency and its size. Contexts are tracked in a least-recently-used queue and evicted when
//!   the device memory budget is exceeded. Eviction never fails and can be requested from other
//!   threads through an [`EvictionHandle`](lru::EvictionHandle).
//! - **Shader parameter binding**: a compiled shader's uniforms and attributes are classified by
//!   name (`p3d_ModelViewProjectionMatrix`, `p3d_Texture0`, `trans_model_to_clip_of_light`…) and
//!   bound to transforms, material, textures, vertex columns and named shader inputs. Parameters
//!   are only pushed when what they depend on changed.
//! - **Offscreen buffers**: [`GraphicsBuffer`](graphics_buffer::GraphicsBuffer)s render into
//!   framebuffer objects, directly into textures when possible, with multisampling, cube maps and
//!   depth planes shared between buffers.
//!
//! # Capabilities
//!
//! What the device can do is queried once, when the
//! [`GraphicsStateGuardian`](gsg::GraphicsStateGuardian) is created. Everything degrades
//! gracefully: a missing capability is logged and the feature falls back or is skipped.
//!
//! # Feature flags
//!
//! - `serde`: `Serialize` and `Deserialize` for [`RenderConfig`](config::RenderConfig) and
//!   [`FrameBufferProperties`](fb_props::FrameBufferProperties).

pub mod backend;
pub mod capabilities;
pub mod config;
pub mod context;
pub mod fb_props;
pub mod geom;
pub mod graphics_buffer;
pub mod gsg;
pub mod host;
pub mod lru;
pub mod prepared;
pub mod render_state;
pub mod render_texture;
pub mod resource;
pub mod shader;
pub mod state;
pub mod texture;
pub mod transform;

pub use crate::gsg::GraphicsStateGuardian;
