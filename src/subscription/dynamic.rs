use smallvec::SmallVec;

use super::Subscription;

/// Id-keyed bag of children.
///
/// Operators that run a changing set of inner subscriptions (merge, the
/// overlapping buffer/window variants) keep the id handed out by `add` and
/// drop exactly that child when its inner stream ends. Most operators hold
/// one or two children at a time, so storage is inline up to two entries.
pub struct DynamicSubscriptions<U> {
  next_id: usize,
  items: SmallVec<[(usize, U); 2]>,
}

impl<U> Default for DynamicSubscriptions<U> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<U> DynamicSubscriptions<U> {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// Add an item and return its id. Ids are never reused.
  #[inline]
  pub fn add(&mut self, item: U) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.items.push((id, item));
    id
  }

  pub fn remove(&mut self, id: usize) -> Option<U> {
    self.items.iter().position(|(i, _)| *i == id).map(|pos| self.items.remove(pos).1)
  }

  #[inline]
  pub fn contains(&self, id: usize) -> bool { self.items.iter().any(|(i, _)| *i == id) }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = &U> { self.items.iter().map(|(_, item)| item) }

  /// Take every item out, leaving the container empty.
  #[inline]
  pub fn take_all(&mut self) -> SmallVec<[U; 2]> {
    self.items.drain(..).map(|(_, item)| item).collect()
  }
}

impl<U: Subscription> DynamicSubscriptions<U> {
  /// Unsubscribe all items and clear the container.
  pub fn unsubscribe_all(&mut self) {
    for item in self.take_all() {
      item.unsubscribe();
    }
  }
}
