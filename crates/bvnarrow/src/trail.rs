//! This module contains the data structure used to record reversible changes.
//! Every engine records the changes it makes as events on its own [`Trail`].
//! When the search process backtracks, the events are handed back in reverse
//! order so that each change can be undone.

use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
/// An append-only sequence of reversible events, divided into levels.
pub(crate) struct Trail<E> {
	/// The recorded entries, most recent last.
	entries: Vec<TrailEntry<E>>,
	/// The number of [`TrailEntry::LevelMark`] entries in `entries`.
	levels: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An entry on the [`Trail`].
enum TrailEntry<E> {
	/// The start of a new level, created by [`Trail::push_level`].
	LevelMark,
	/// A change that has to be undone when its level is popped.
	Event(E),
}

impl<E> Trail<E> {
	/// Return the current decision level
	pub(crate) fn decision_level(&self) -> usize {
		self.levels
	}

	/// Returns the number of events recorded on the trail, excluding level marks.
	pub(crate) fn len(&self) -> usize {
		self.entries.len() - self.levels
	}

	/// Undo the `n` most recent levels.
	///
	/// The events recorded since the corresponding calls to [`Self::push_level`]
	/// are passed to `undo`, most recent first.
	///
	/// # Panics
	///
	/// Panics if `n` is larger than the current decision level.
	pub(crate) fn pop_levels(&mut self, n: usize, mut undo: impl FnMut(E)) {
		assert!(
			n <= self.levels,
			"unable to pop {n} levels from a trail at decision level {}",
			self.levels
		);
		let mut remaining = n;
		let mut undone = 0;
		while remaining > 0 {
			match self.entries.pop() {
				Some(TrailEntry::LevelMark) => {
					remaining -= 1;
					self.levels -= 1;
				}
				Some(TrailEntry::Event(event)) => {
					undone += 1;
					undo(event);
				}
				None => unreachable!("level marks are counted"),
			}
		}
		trace!(levels = n, events = undone, "pop trail levels");
	}

	/// Start a new level to which the trail can be restored.
	pub(crate) fn push_level(&mut self) {
		self.entries.push(TrailEntry::LevelMark);
		self.levels += 1;
	}

	/// Record an event that has to be undone when the current level is popped.
	///
	/// Events at the root level can never be undone, and are dropped.
	pub(crate) fn record(&mut self, event: E) {
		if self.levels > 0 {
			self.entries.push(TrailEntry::Event(event));
		}
	}
}

impl<E> Default for Trail<E> {
	fn default() -> Self {
		Self {
			entries: Vec::new(),
			levels: 0,
		}
	}
}
