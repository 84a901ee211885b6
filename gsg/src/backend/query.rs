//! Context and capability query backend interface.

use std::fmt;

use crate::capabilities::{Capabilities, DriverInfo, Limits};

/// An error code reported by the driver.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DriverError {
  InvalidEnum,
  InvalidValue,
  InvalidOperation,
  InvalidFramebufferOperation,
  OutOfMemory,
  StackOverflow,
  StackUnderflow,
  Other(u32),
}

impl fmt::Display for DriverError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      DriverError::InvalidEnum => f.write_str("invalid enum"),
      DriverError::InvalidValue => f.write_str("invalid value"),
      DriverError::InvalidOperation => f.write_str("invalid operation"),
      DriverError::InvalidFramebufferOperation => f.write_str("invalid framebuffer operation"),
      DriverError::OutOfMemory => f.write_str("out of memory"),
      DriverError::StackOverflow => f.write_str("stack overflow"),
      DriverError::StackUnderflow => f.write_str("stack underflow"),
      DriverError::Other(code) => write!(f, "error 0x{:x}", code),
    }
  }
}

pub unsafe trait QueryBackend {
  /// Make the wrapped context current on the calling thread.
  unsafe fn make_current(&mut self) -> bool;

  unsafe fn capabilities(&mut self) -> (Capabilities, Limits);

  unsafe fn driver_info(&mut self) -> DriverInfo;

  unsafe fn has_extension(&mut self, name: &str) -> bool;

  /// Next pending driver error, if any.
  unsafe fn get_error(&mut self) -> Option<DriverError>;
}
