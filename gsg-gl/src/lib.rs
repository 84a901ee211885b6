//! OpenGL backends.
//!
//! This crate exports [OpenGL](https://www.khronos.org/opengl/) backends for
//! [gsg](https://crates.io/crates/gsg). The OpenGL function pointers must be loaded (with
//! [`gl::load_with`]) and the context made current before a backend is created.

pub mod gl33;

pub use gl33::GL33;
