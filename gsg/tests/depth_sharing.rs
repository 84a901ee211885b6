mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gsg::backend::framebuffer::Attachment;
use gsg::fb_props::FrameBufferProperties;
use gsg::graphics_buffer::{BufferId, BufferState, GraphicsBuffer, RebuildState};
use gsg::host::FrameMode;
use gsg::render_texture::{RenderTextureMode, RenderTexturePlane};
use gsg::texture::Texture;
use gsg::GraphicsStateGuardian;

use common::{guardian, Call, MockBackend};

fn add_buffer(
  gsg: &mut GraphicsStateGuardian<MockBackend>,
  name: &str,
  size: [u32; 2],
  sort: i32,
) -> BufferId {
  let buffer = GraphicsBuffer::new(name, size, FrameBufferProperties::rgba_depth(), sort);
  let id = gsg.make_buffer(buffer);
  assert!(gsg.open_buffer(id));
  id
}

fn render(gsg: &mut GraphicsStateGuardian<MockBackend>, id: BufferId) {
  assert!(gsg.begin_buffer_frame(id, FrameMode::Render));
  gsg.end_buffer_frame(id, FrameMode::Render);
}

// every link is registered on both ends, exactly once, and chains never loop
fn assert_consistent(gsg: &GraphicsStateGuardian<MockBackend>) {
  for (id, buffer) in gsg.buffers() {
    if let Some(other) = buffer.shared_depth_buffer() {
      let owner = gsg.buffer(other).expect("sharing with a removed buffer");
      let count = owner.depth_sharers().iter().filter(|s| **s == id).count();
      assert_eq!(count, 1, "{} missing from the sharers of {}", buffer.name(), owner.name());
    }

    for &sharer in buffer.depth_sharers() {
      let sharer = gsg.buffer(sharer).expect("removed buffer listed as a sharer");
      assert_eq!(sharer.shared_depth_buffer(), Some(id));
    }

    let mut seen = vec![id];
    let mut current = buffer.shared_depth_buffer();
    while let Some(next) = current {
      assert!(!seen.contains(&next), "depth sharing cycle through {}", buffer.name());
      seen.push(next);
      current = gsg.buffer(next).and_then(GraphicsBuffer::shared_depth_buffer);
    }
  }
}

#[test]
fn links_are_registered_on_both_ends() {
  let mut gsg = guardian();
  let a = add_buffer(&mut gsg, "a", [64, 64], 0);
  let b = add_buffer(&mut gsg, "b", [64, 64], 1);

  assert!(gsg.share_depth_buffer(b, a));
  assert_eq!(gsg.buffer(b).unwrap().shared_depth_buffer(), Some(a));
  assert_eq!(gsg.buffer(a).unwrap().depth_sharers(), &[b]);

  assert!(gsg.unshare_depth_buffer(b));
  assert!(!gsg.unshare_depth_buffer(b));
  assert_eq!(gsg.buffer(b).unwrap().shared_depth_buffer(), None);
  assert!(gsg.buffer(a).unwrap().depth_sharers().is_empty());
}

#[test]
fn refused_links_change_nothing() {
  let mut gsg = guardian();
  let a = add_buffer(&mut gsg, "a", [64, 64], 0);
  let b = add_buffer(&mut gsg, "b", [64, 64], 0);
  let small = add_buffer(&mut gsg, "small", [32, 64], 0);

  assert!(!gsg.share_depth_buffer(a, a));
  assert!(!gsg.share_depth_buffer(small, a));
  assert_eq!(gsg.buffer(small).unwrap().shared_depth_buffer(), None);
  assert!(gsg.buffer(a).unwrap().depth_sharers().is_empty());

  assert!(gsg.share_depth_buffer(a, b));
  assert!(!gsg.share_depth_buffer(b, a));
  assert_eq!(gsg.buffer(b).unwrap().shared_depth_buffer(), None);
  assert_eq!(gsg.buffer(a).unwrap().shared_depth_buffer(), Some(b));

  assert_consistent(&gsg);
}

#[test]
fn resharing_moves_the_link() {
  let mut gsg = guardian();
  let a = add_buffer(&mut gsg, "a", [64, 64], 0);
  let b = add_buffer(&mut gsg, "b", [64, 64], 0);
  let c = add_buffer(&mut gsg, "c", [64, 64], 0);

  assert!(gsg.share_depth_buffer(c, a));
  assert!(gsg.share_depth_buffer(c, b));

  assert!(gsg.buffer(a).unwrap().depth_sharers().is_empty());
  assert_eq!(gsg.buffer(b).unwrap().depth_sharers(), &[c]);
  assert_consistent(&gsg);
}

#[test]
fn closing_severs_both_directions() {
  let mut gsg = guardian();
  let a = add_buffer(&mut gsg, "a", [64, 64], 0);
  let b = add_buffer(&mut gsg, "b", [64, 64], 0);
  let c = add_buffer(&mut gsg, "c", [64, 64], 0);
  let d = add_buffer(&mut gsg, "d", [64, 64], 0);

  assert!(gsg.share_depth_buffer(b, a));
  assert!(gsg.share_depth_buffer(c, a));
  assert!(gsg.share_depth_buffer(a, d));

  gsg.close_buffer(a);

  assert_eq!(gsg.buffer(a).unwrap().state(), BufferState::Closed);
  assert_eq!(gsg.buffer(a).unwrap().shared_depth_buffer(), None);
  assert!(gsg.buffer(a).unwrap().depth_sharers().is_empty());
  assert!(gsg.buffer(d).unwrap().depth_sharers().is_empty());

  for id in [b, c] {
    let buffer = gsg.buffer(id).unwrap();
    assert_eq!(buffer.shared_depth_buffer(), None);
    assert_eq!(buffer.state(), BufferState::Open(RebuildState::Dirty));
  }

  assert_consistent(&gsg);
}

#[test]
fn sharer_attaches_the_owner_renderbuffer() {
  let mut gsg = guardian();
  let owner = add_buffer(&mut gsg, "owner", [64, 64], 0);
  let sharer = add_buffer(&mut gsg, "sharer", [64, 64], 1);
  assert!(gsg.share_depth_buffer(sharer, owner));

  render(&mut gsg, owner);
  let rb = gsg
    .buffer(owner)
    .unwrap()
    .renderbuffer(RenderTexturePlane::DepthStencil)
    .expect("owner has no depth-stencil renderbuffer");

  render(&mut gsg, sharer);
  let sharer_buffer = gsg.buffer(sharer).unwrap();
  let fbo = sharer_buffer.fbo(0).unwrap();

  assert_eq!(sharer_buffer.renderbuffer(RenderTexturePlane::DepthStencil), None);
  assert_eq!(sharer_buffer.fb_properties().depth_bits, 24);
  assert!(gsg.backend().calls.contains(&Call::AttachRenderbuffer {
    framebuffer: fbo,
    attachment: Attachment::DepthStencil,
    renderbuffer: rb,
  }));
}

#[test]
fn chains_resolve_to_the_root() {
  let mut gsg = guardian();
  let root = add_buffer(&mut gsg, "root", [64, 64], 0);
  let middle = add_buffer(&mut gsg, "middle", [64, 64], 0);
  let leaf = add_buffer(&mut gsg, "leaf", [64, 64], 0);

  assert!(gsg.share_depth_buffer(middle, root));
  assert!(gsg.share_depth_buffer(leaf, middle));

  render(&mut gsg, root);
  let rb = gsg
    .buffer(root)
    .unwrap()
    .renderbuffer(RenderTexturePlane::DepthStencil)
    .unwrap();

  render(&mut gsg, leaf);
  let fbo = gsg.buffer(leaf).unwrap().fbo(0).unwrap();

  assert!(gsg.backend().calls.contains(&Call::AttachRenderbuffer {
    framebuffer: fbo,
    attachment: Attachment::DepthStencil,
    renderbuffer: rb,
  }));
}

#[test]
fn random_operations_keep_links_symmetric() {
  let mut rng = StdRng::seed_from_u64(0x5eed);
  let mut gsg = guardian();
  let mut ids: Vec<BufferId> = (0..6)
    .map(|i| add_buffer(&mut gsg, &format!("buffer{}", i), [32, 32], i))
    .collect();

  for step in 0..500 {
    let i = ids[rng.gen_range(0..ids.len())];
    let j = ids[rng.gen_range(0..ids.len())];

    match rng.gen_range(0..10) {
      0..=4 => {
        gsg.share_depth_buffer(i, j);
      }

      5 | 6 => {
        gsg.unshare_depth_buffer(i);
      }

      7 => {
        gsg.close_buffer(i);
        assert!(gsg.open_buffer(i));
      }

      8 => {
        let removed = gsg.remove_buffer(i).unwrap();
        ids.retain(|id| *id != i);

        assert_eq!(removed.shared_depth_buffer(), None);
        assert!(removed.depth_sharers().is_empty());

        let name = format!("buffer{}", 6 + step);
        ids.push(add_buffer(&mut gsg, &name, [32, 32], step));
      }

      _ => {
        if gsg.buffer(i).unwrap().is_valid() {
          render(&mut gsg, i);
        }
      }
    }

    assert_consistent(&gsg);
  }
}

#[test]
fn sharers_rebuild_when_the_owner_replaces_its_depth() {
  let mut gsg = guardian();
  let owner = add_buffer(&mut gsg, "owner", [64, 64], 0);
  let sharer = add_buffer(&mut gsg, "sharer", [64, 64], 1);
  assert!(gsg.share_depth_buffer(sharer, owner));

  // depth goes to a texture first, so the owner holds no renderbuffer to share
  let depth = Texture::new_2d("depth", 1, 1);
  gsg.buffer_mut(owner).unwrap().add_render_texture(
    depth,
    RenderTexturePlane::Depth,
    RenderTextureMode::BindOrCopy,
  );

  render(&mut gsg, owner);
  render(&mut gsg, sharer);
  assert_eq!(gsg.buffer(owner).unwrap().renderbuffer(RenderTexturePlane::DepthStencil), None);
  assert_eq!(gsg.buffer(sharer).unwrap().state(), BufferState::Open(RebuildState::Clean));

  gsg.buffer_mut(owner).unwrap().clear_render_textures();
  render(&mut gsg, owner);

  let rb = gsg
    .buffer(owner)
    .unwrap()
    .renderbuffer(RenderTexturePlane::DepthStencil)
    .expect("owner has no depth-stencil renderbuffer");
  assert_eq!(gsg.buffer(sharer).unwrap().state(), BufferState::Open(RebuildState::Dirty));

  render(&mut gsg, sharer);
  let fbo = gsg.buffer(sharer).unwrap().fbo(0).unwrap();

  assert!(gsg.backend().calls.contains(&Call::AttachRenderbuffer {
    framebuffer: fbo,
    attachment: Attachment::DepthStencil,
    renderbuffer: rb,
  }));
  assert_consistent(&gsg);
}
