//! Least-recently-used queue of evictable contexts.
//!
//! The queue only orders keys; the policy (what is resident, what may be evicted right now) lives
//! in the guardian. Eviction requests raised on other threads go through an [`EvictionHandle`]
//! and are applied on the draw thread at the next frame.

use std::collections::HashMap;
use std::hash::Hash;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::prepared::ResourceKey;

#[derive(Clone, Copy, Debug)]
struct Link<K> {
  prev: Option<K>,
  next: Option<K>,
}

/// Queue of keys, least recently used first.
///
/// Keys are chained through a map, so touching and dequeuing a key is constant time.
#[derive(Debug)]
pub struct Lru<K> {
  links: HashMap<K, Link<K>>,
  head: Option<K>,
  tail: Option<K>,
}

impl<K> Default for Lru<K> {
  fn default() -> Self {
    Lru {
      links: HashMap::new(),
      head: None,
      tail: None,
    }
  }
}

impl<K> Lru<K>
where
  K: Copy + Eq + Hash,
{
  pub fn new() -> Self {
    Self::default()
  }

  /// Mark `key` as most recently used, enqueuing it if needed.
  pub fn touch(&mut self, key: K) {
    if self.tail == Some(key) {
      return;
    }

    self.dequeue(key);

    let link = Link {
      prev: self.tail,
      next: None,
    };

    match self.tail.and_then(|tail| self.links.get_mut(&tail)) {
      Some(tail) => tail.next = Some(key),
      None => self.head = Some(key),
    }

    self.links.insert(key, link);
    self.tail = Some(key);
  }

  /// Remove `key` from the queue. Returns whether it was enqueued.
  pub fn dequeue(&mut self, key: K) -> bool {
    let link = match self.links.remove(&key) {
      Some(link) => link,
      None => return false,
    };

    match link.prev.and_then(|prev| self.links.get_mut(&prev)) {
      Some(prev) => prev.next = link.next,
      None => self.head = link.next,
    }

    match link.next.and_then(|next| self.links.get_mut(&next)) {
      Some(next) => next.prev = link.prev,
      None => self.tail = link.prev,
    }

    true
  }

  /// Pop the least recently used key.
  pub fn pop_front(&mut self) -> Option<K> {
    let head = self.head?;
    self.dequeue(head);
    Some(head)
  }

  pub fn contains(&self, key: K) -> bool {
    self.links.contains_key(&key)
  }

  pub fn len(&self) -> usize {
    self.links.len()
  }

  pub fn is_empty(&self) -> bool {
    self.links.is_empty()
  }

  pub fn clear(&mut self) {
    self.links.clear();
    self.head = None;
    self.tail = None;
  }
}

/// Eviction request sent from another thread.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EvictionRequest {
  /// Evict one context.
  Evict(ResourceKey),
  /// Evict until resident memory fits in the given number of bytes.
  ShrinkTo(usize),
  /// Evict everything that is not in use.
  EvictAll,
}

/// Thread-safe sender of eviction requests.
///
/// Backend calls are not allowed off the draw thread, so requests are only queued here and
/// applied by the guardian's next `begin_frame`.
#[derive(Clone, Debug)]
pub struct EvictionHandle {
  sender: Sender<EvictionRequest>,
}

impl EvictionHandle {
  /// Queue a request. Returns `false` if the guardian is gone.
  pub fn request(&self, request: EvictionRequest) -> bool {
    self.sender.send(request).is_ok()
  }
}

pub(crate) fn eviction_channel() -> (EvictionHandle, Receiver<EvictionRequest>) {
  let (sender, receiver) = unbounded();
  (EvictionHandle { sender }, receiver)
}
