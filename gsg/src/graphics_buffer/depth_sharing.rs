//! Depth-buffer sharing between buffers.
//!
//! A buffer sharing the depth plane of another one keeps its id, and the other buffer lists it
//! as a dependent. Both sides are always updated together, so that closing either buffer can
//! sever every link without leaving a dangling id behind.
//!
//! Links can chain; renderbuffers are looked up on the root of the chain. Members of a group
//! (the root and all its transitive dependents) render into the same depth plane, and only one
//! of them resolves multisampled depth into it: the member with the highest sort, the last one
//! in group order on ties.

use log::debug;
use slotmap::SlotMap;
use std::collections::VecDeque;
use std::error;
use std::fmt;

use crate::backend::framebuffer::BitplaneSizes;
use crate::graphics_buffer::{BufferId, GraphicsBuffer};
use crate::render_texture::RenderTexturePlane;

/// Why two buffers cannot share a depth plane.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShareDepthError {
  /// A buffer cannot share with itself.
  SameBuffer,
  /// One of the buffers does not exist.
  MissingBuffer,
  /// The link would close a cycle.
  Cycle,
  /// Widths differ.
  Width(u32, u32),
  /// Heights differ.
  Height(u32, u32),
  /// Multisample counts differ.
  Multisamples(u32, u32),
  /// Coverage sample counts differ.
  CoverageSamples(u32, u32),
}

impl fmt::Display for ShareDepthError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      ShareDepthError::SameBuffer => f.write_str("a buffer cannot share its own depth buffer"),
      ShareDepthError::MissingBuffer => f.write_str("no such buffer"),
      ShareDepthError::Cycle => f.write_str("depth sharing cycle"),
      ShareDepthError::Width(a, b) => write!(f, "non-matching width: {} and {}", a, b),
      ShareDepthError::Height(a, b) => write!(f, "non-matching height: {} and {}", a, b),
      ShareDepthError::Multisamples(a, b) => {
        write!(f, "non-matching multisamples: {} and {}", a, b)
      }
      ShareDepthError::CoverageSamples(a, b) => {
        write!(f, "non-matching coverage samples: {} and {}", a, b)
      }
    }
  }
}

impl error::Error for ShareDepthError {}

/// Depth renderbuffers of the root of a sharing chain.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SharedDepth {
  pub depth_stencil: Option<(u32, BitplaneSizes)>,
  pub depth: Option<(u32, BitplaneSizes)>,
}

impl SharedDepth {
  pub(crate) fn get(&self, plane: RenderTexturePlane) -> Option<(u32, BitplaneSizes)> {
    match plane {
      RenderTexturePlane::DepthStencil => self.depth_stencil,
      RenderTexturePlane::Depth => self.depth,
      _ => None,
    }
  }
}

/// Make `id` render with the depth plane of `other`.
///
/// Nothing changes on error.
pub fn share(
  buffers: &mut SlotMap<BufferId, GraphicsBuffer>,
  id: BufferId,
  other: BufferId,
) -> Result<(), ShareDepthError> {
  if id == other {
    return Err(ShareDepthError::SameBuffer);
  }

  let (a, b) = match (buffers.get(id), buffers.get(other)) {
    (Some(a), Some(b)) => (a, b),
    _ => return Err(ShareDepthError::MissingBuffer),
  };

  if a.x_size() != b.x_size() {
    return Err(ShareDepthError::Width(a.x_size(), b.x_size()));
  }

  if a.y_size() != b.y_size() {
    return Err(ShareDepthError::Height(a.y_size(), b.y_size()));
  }

  if a.multisample_count() != b.multisample_count() {
    return Err(ShareDepthError::Multisamples(
      a.multisample_count(),
      b.multisample_count(),
    ));
  }

  if a.coverage_sample_count() != b.coverage_sample_count() {
    return Err(ShareDepthError::CoverageSamples(
      a.coverage_sample_count(),
      b.coverage_sample_count(),
    ));
  }

  if chain(buffers, other).contains(&id) {
    return Err(ShareDepthError::Cycle);
  }

  unshare(buffers, id);

  if let Some(b) = buffers.get_mut(other) {
    b.depth_sharers.push(id);
    b.mark_dirty();
  }

  if let Some(a) = buffers.get_mut(id) {
    a.shared_depth = Some(other);
    a.mark_dirty();
  }

  debug!("{:?} now shares the depth buffer of {:?}", id, other);
  Ok(())
}

/// Stop `id` from sharing another buffer's depth plane. Returns whether it did.
pub fn unshare(buffers: &mut SlotMap<BufferId, GraphicsBuffer>, id: BufferId) -> bool {
  let other = match buffers.get_mut(id) {
    Some(buffer) => match buffer.shared_depth.take() {
      Some(other) => {
        buffer.mark_dirty();
        other
      }

      None => return false,
    },

    None => return false,
  };

  if let Some(other) = buffers.get_mut(other) {
    other.depth_sharers.retain(|sharer| *sharer != id);
  }

  true
}

/// Sever every depth-sharing link of `id`, in both directions.
pub fn sever(buffers: &mut SlotMap<BufferId, GraphicsBuffer>, id: BufferId) {
  unshare(buffers, id);

  let sharers = match buffers.get_mut(id) {
    Some(buffer) => std::mem::take(&mut buffer.depth_sharers),
    None => return,
  };

  for sharer in sharers {
    if let Some(buffer) = buffers.get_mut(sharer) {
      if buffer.shared_depth == Some(id) {
        buffer.shared_depth = None;
        buffer.mark_dirty();
      }
    }
  }
}

// `id` followed by the buffers it transitively shares with
fn chain(buffers: &SlotMap<BufferId, GraphicsBuffer>, id: BufferId) -> Vec<BufferId> {
  let mut chain = vec![id];
  let mut current = id;

  while let Some(next) = buffers.get(current).and_then(|b| b.shared_depth) {
    if chain.contains(&next) || chain.len() > buffers.len() {
      break;
    }

    chain.push(next);
    current = next;
  }

  chain
}

/// Buffer owning the depth plane `id` renders with.
pub fn root(buffers: &SlotMap<BufferId, GraphicsBuffer>, id: BufferId) -> BufferId {
  chain(buffers, id).last().copied().unwrap_or(id)
}

/// Every buffer rendering into the same depth plane as `id`, root first.
pub fn group(buffers: &SlotMap<BufferId, GraphicsBuffer>, id: BufferId) -> Vec<BufferId> {
  let root = root(buffers, id);
  let mut group = vec![root];
  let mut queue = VecDeque::from(vec![root]);

  while let Some(current) = queue.pop_front() {
    if let Some(buffer) = buffers.get(current) {
      for &sharer in &buffer.depth_sharers {
        if !group.contains(&sharer) {
          group.push(sharer);
          queue.push_back(sharer);
        }
      }
    }
  }

  group
}

/// Whether `id` resolves multisampled depth into the shared depth plane.
pub fn is_depth_writer(buffers: &SlotMap<BufferId, GraphicsBuffer>, id: BufferId) -> bool {
  let group = group(buffers, id);
  if group.len() <= 1 {
    return true;
  }

  let mut writer = None;
  let mut max_sort = i32::MIN;

  for member in group {
    if let Some(buffer) = buffers.get(member) {
      if buffer.sort() >= max_sort {
        max_sort = buffer.sort();
        writer = Some(member);
      }
    }
  }

  writer == Some(id)
}

/// Depth renderbuffers `id` must attach instead of its own, if it shares them.
pub fn shared_depth(
  buffers: &SlotMap<BufferId, GraphicsBuffer>,
  id: BufferId,
) -> Option<SharedDepth> {
  buffers.get(id)?.shared_depth?;

  let root = root(buffers, id);
  if root == id {
    return None;
  }

  buffers.get(root).map(owned_depth)
}

/// Depth renderbuffers `buffer` allocated itself.
pub fn owned_depth(buffer: &GraphicsBuffer) -> SharedDepth {
  let plane = |plane: RenderTexturePlane| {
    let index = plane.index();
    (buffer.rb[index] != 0).then(|| (buffer.rb[index], buffer.rb_sizes[index]))
  };

  SharedDepth {
    depth_stencil: plane(RenderTexturePlane::DepthStencil),
    depth: plane(RenderTexturePlane::Depth),
  }
}

/// Mark every buffer rendering with the depth plane of `id` for a rebuild. Returns how many
/// were marked.
pub fn invalidate_dependents(
  buffers: &mut SlotMap<BufferId, GraphicsBuffer>,
  id: BufferId,
) -> usize {
  let mut dependents = Vec::new();
  let mut queue = VecDeque::from(vec![id]);

  while let Some(current) = queue.pop_front() {
    if let Some(buffer) = buffers.get(current) {
      for &sharer in &buffer.depth_sharers {
        if sharer != id && !dependents.contains(&sharer) {
          dependents.push(sharer);
          queue.push_back(sharer);
        }
      }
    }
  }

  for &dependent in &dependents {
    if let Some(buffer) = buffers.get_mut(dependent) {
      buffer.mark_dirty();
    }
  }

  dependents.len()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fb_props::FrameBufferProperties;

  fn buffers(sizes: &[[u32; 2]]) -> (SlotMap<BufferId, GraphicsBuffer>, Vec<BufferId>) {
    let mut buffers = SlotMap::with_key();
    let ids = sizes
      .iter()
      .enumerate()
      .map(|(i, size)| {
        buffers.insert(GraphicsBuffer::new(
          format!("buffer{}", i),
          *size,
          FrameBufferProperties::default(),
          i as i32,
        ))
      })
      .collect();

    (buffers, ids)
  }

  #[test]
  fn bidirectional_registration() {
    let (mut buffers, ids) = buffers(&[[64, 64], [64, 64]]);

    share(&mut buffers, ids[0], ids[1]).unwrap();
    assert_eq!(buffers[ids[0]].shared_depth_buffer(), Some(ids[1]));
    assert_eq!(buffers[ids[1]].depth_sharers(), &[ids[0]]);

    assert!(unshare(&mut buffers, ids[0]));
    assert!(!unshare(&mut buffers, ids[0]));
    assert!(buffers[ids[1]].depth_sharers().is_empty());
  }

  #[test]
  fn mismatch_changes_nothing() {
    let (mut buffers, ids) = buffers(&[[64, 64], [64, 64], [32, 64]]);

    share(&mut buffers, ids[0], ids[1]).unwrap();
    assert_eq!(
      share(&mut buffers, ids[0], ids[2]),
      Err(ShareDepthError::Width(64, 32))
    );

    // the previous link survives
    assert_eq!(buffers[ids[0]].shared_depth_buffer(), Some(ids[1]));
    assert_eq!(buffers[ids[1]].depth_sharers(), &[ids[0]]);
    assert!(buffers[ids[2]].depth_sharers().is_empty());
  }

  #[test]
  fn self_and_cycles() {
    let (mut buffers, ids) = buffers(&[[8, 8], [8, 8], [8, 8]]);

    assert_eq!(
      share(&mut buffers, ids[0], ids[0]),
      Err(ShareDepthError::SameBuffer)
    );

    share(&mut buffers, ids[0], ids[1]).unwrap();
    share(&mut buffers, ids[1], ids[2]).unwrap();
    assert_eq!(
      share(&mut buffers, ids[2], ids[0]),
      Err(ShareDepthError::Cycle)
    );

    assert_eq!(root(&buffers, ids[0]), ids[2]);
    assert_eq!(group(&buffers, ids[0]), vec![ids[2], ids[1], ids[0]]);
  }

  #[test]
  fn sever_both_directions() {
    let (mut buffers, ids) = buffers(&[[8, 8], [8, 8], [8, 8]]);

    share(&mut buffers, ids[0], ids[1]).unwrap();
    share(&mut buffers, ids[2], ids[1]).unwrap();
    share(&mut buffers, ids[1], ids[0]).unwrap_err();

    sever(&mut buffers, ids[1]);
    assert_eq!(buffers[ids[0]].shared_depth_buffer(), None);
    assert_eq!(buffers[ids[2]].shared_depth_buffer(), None);
    assert!(buffers[ids[1]].depth_sharers().is_empty());
  }

  #[test]
  fn highest_sort_writes_depth() {
    let (mut buffers, ids) = buffers(&[[8, 8], [8, 8], [8, 8]]);
    buffers[ids[0]].set_sort(1);
    buffers[ids[1]].set_sort(2);
    buffers[ids[2]].set_sort(3);

    share(&mut buffers, ids[1], ids[0]).unwrap();
    share(&mut buffers, ids[2], ids[0]).unwrap();

    let writers: Vec<bool> = ids.iter().map(|id| is_depth_writer(&buffers, *id)).collect();
    assert_eq!(writers, vec![false, false, true]);
  }

  #[test]
  fn ties_go_to_the_last_member() {
    let (mut buffers, ids) = buffers(&[[8, 8], [8, 8]]);
    buffers[ids[0]].set_sort(5);
    buffers[ids[1]].set_sort(5);

    share(&mut buffers, ids[1], ids[0]).unwrap();
    assert!(!is_depth_writer(&buffers, ids[0]));
    assert!(is_depth_writer(&buffers, ids[1]));
  }

  #[test]
  fn lone_buffer_writes_depth() {
    let (buffers, ids) = buffers(&[[8, 8]]);
    assert!(is_depth_writer(&buffers, ids[0]));
    assert_eq!(shared_depth(&buffers, ids[0]), None);
  }
}
