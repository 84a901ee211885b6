mod common;

use gsg::backend::framebuffer::{BlitMask, RenderbufferFormat};
use gsg::capabilities::Capabilities;
use gsg::config::RenderConfig;
use gsg::fb_props::FrameBufferProperties;
use gsg::graphics_buffer::{BufferId, GraphicsBuffer};
use gsg::host::FrameMode;
use gsg::GraphicsStateGuardian;

use common::{guardian, guardian_with, Call, MockBackend};

fn multisampled(samples: u32) -> FrameBufferProperties {
  FrameBufferProperties {
    multisamples: samples,
    ..FrameBufferProperties::rgba_depth()
  }
}

fn add_buffer(gsg: &mut GraphicsStateGuardian<MockBackend>, name: &str, sort: i32) -> BufferId {
  let id = gsg.make_buffer(GraphicsBuffer::new(name, [64, 64], multisampled(4), sort));
  assert!(gsg.open_buffer(id));
  id
}

fn render(gsg: &mut GraphicsStateGuardian<MockBackend>, id: BufferId) {
  assert!(gsg.begin_buffer_frame(id, FrameMode::Render));
  gsg.end_buffer_frame(id, FrameMode::Render);
}

// mask of the resolve blit reading from the multisample framebuffer of `id`
fn resolve_mask(gsg: &GraphicsStateGuardian<MockBackend>, id: BufferId) -> Option<BlitMask> {
  let buffer = gsg.buffer(id)?;
  let fbo_ms = buffer.multisample_fbo()?;
  let fbo = buffer.fbo(0)?;

  gsg
    .backend()
    .blits()
    .into_iter()
    .filter(|&(draw, read, _)| draw == fbo && read == fbo_ms)
    .map(|(_, _, mask)| mask)
    .last()
}

#[test]
fn multisample_buffers_resolve_into_their_framebuffer() {
  let mut gsg = guardian();
  assert!(!gsg.capabilities().contains(Capabilities::MULTISAMPLE));

  let id = add_buffer(&mut gsg, "msaa", 0);
  render(&mut gsg, id);

  let buffer = gsg.buffer(id).unwrap();
  assert_eq!(buffer.multisample_count(), 4);
  assert!(buffer.multisample_fbo().is_some());
  assert!(gsg.capabilities().contains(Capabilities::MULTISAMPLE));

  let samples: Vec<u32> = gsg
    .backend()
    .calls
    .iter()
    .filter_map(|call| match *call {
      Call::RenderbufferStorage { samples, .. } if samples > 0 => Some(samples),
      _ => None,
    })
    .collect();
  assert_eq!(samples, [4, 4]);

  assert_eq!(
    resolve_mask(&gsg, id),
    Some(BlitMask::COLOR | BlitMask::DEPTH | BlitMask::STENCIL)
  );
}

#[test]
fn one_member_of_a_sharing_group_resolves_depth() {
  let mut gsg = guardian();
  let low = add_buffer(&mut gsg, "low", 1);
  let mid = add_buffer(&mut gsg, "mid", 2);
  let high = add_buffer(&mut gsg, "high", 3);

  assert!(gsg.share_depth_buffer(low, high));
  assert!(gsg.share_depth_buffer(mid, high));

  for id in [high, low, mid] {
    render(&mut gsg, id);
  }

  let depth = BlitMask::DEPTH | BlitMask::STENCIL;
  assert_eq!(resolve_mask(&gsg, high), Some(BlitMask::COLOR | depth));
  assert_eq!(resolve_mask(&gsg, low), Some(BlitMask::COLOR));
  assert_eq!(resolve_mask(&gsg, mid), Some(BlitMask::COLOR));

  // sorting a sharer last hands it the resolve
  gsg.buffer_mut(low).unwrap().set_sort(10);
  gsg.backend_mut().take_calls();

  for id in [high, low, mid] {
    render(&mut gsg, id);
  }

  assert_eq!(resolve_mask(&gsg, high), Some(BlitMask::COLOR));
  assert_eq!(resolve_mask(&gsg, low), Some(BlitMask::COLOR | depth));
  assert_eq!(resolve_mask(&gsg, mid), Some(BlitMask::COLOR));
}

#[test]
fn equal_sorts_elect_a_single_writer() {
  let mut gsg = guardian();
  let ids: Vec<BufferId> = ["a", "b", "c"]
    .iter()
    .map(|name| add_buffer(&mut gsg, name, 0))
    .collect();

  assert!(gsg.share_depth_buffer(ids[1], ids[0]));
  assert!(gsg.share_depth_buffer(ids[2], ids[0]));

  for &id in &ids {
    render(&mut gsg, id);
  }

  let writers = ids
    .iter()
    .filter(|&&id| resolve_mask(&gsg, id).map_or(false, |m| m.contains(BlitMask::DEPTH)))
    .count();
  assert_eq!(writers, 1);
}

#[test]
fn samples_below_the_usage_hint_are_dropped() {
  let config = RenderConfig::default().with_multisample_usage_hint(8);
  let mut gsg = guardian_with(MockBackend::new(), config);

  let id = gsg.make_buffer(GraphicsBuffer::new("hinted", [32, 32], multisampled(4), 0));
  assert!(gsg.open_buffer(id));
  render(&mut gsg, id);

  let buffer = gsg.buffer(id).unwrap();
  assert_eq!(buffer.multisample_count(), 0);
  assert_eq!(buffer.multisample_fbo(), None);
  assert!(gsg.backend().blits().is_empty());
}

#[test]
fn sample_counts_are_capped_by_the_device() {
  let mut backend = MockBackend::new();
  backend.limits.max_fb_samples = 2;
  let mut gsg = guardian_with(backend, RenderConfig::default());

  let id = gsg.make_buffer(GraphicsBuffer::new("capped", [32, 32], multisampled(16), 0));
  assert!(gsg.open_buffer(id));
  render(&mut gsg, id);

  assert_eq!(gsg.buffer(id).unwrap().multisample_count(), 2);
  assert!(gsg.backend().calls.iter().any(|call| matches!(
    call,
    Call::RenderbufferStorage {
      format: RenderbufferFormat::Depth24Stencil8,
      samples: 2,
      ..
    }
  )));
}

#[test]
fn without_blit_there_is_no_multisampling() {
  let backend = MockBackend::new().with_caps(common::full_caps() - Capabilities::FRAMEBUFFER_BLIT);
  let mut gsg = guardian_with(backend, RenderConfig::default());

  let id = gsg.make_buffer(GraphicsBuffer::new("plain", [32, 32], multisampled(4), 0));
  assert!(gsg.open_buffer(id));
  render(&mut gsg, id);

  assert_eq!(gsg.buffer(id).unwrap().multisample_fbo(), None);
  assert!(!gsg.capabilities().contains(Capabilities::MULTISAMPLE));
}
