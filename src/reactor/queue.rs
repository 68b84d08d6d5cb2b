use super::event::Event;
use std::collections::VecDeque;

/// FIFO queue per priority level, drained highest priority first
pub struct EventQueue {
	queues: [VecDeque<Event>; 3],
}

impl EventQueue {
	pub fn new() -> Self {
		Self {
			queues: Default::default(),
		}
	}

	pub fn push(&mut self, event: Event) {
		let priority = event.priority();
		self.queues[priority.as_index()].push_back(event);
	}

	pub fn pop(&mut self) -> Option<Event> {
		self.queues.iter_mut().find_map(|queue| queue.pop_front())
	}

	pub fn len(&self) -> usize {
		self.queues.iter().map(VecDeque::len).sum()
	}
}

impl Default for EventQueue {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reactor::event::{InputEvent, MediaEvent, PlayerEvent, TelemetryEvent};

	#[test]
	fn test_higher_priority_pops_first() {
		let mut queue = EventQueue::new();
		queue.push(Event::Telemetry(TelemetryEvent::IncrementView {
			story_id: "1".into(),
		}));
		queue.push(Event::Player(PlayerEvent::Next));
		queue.push(Event::Input(InputEvent::CloseButton));
		assert_eq!(queue.len(), 3);

		assert!(matches!(queue.pop(), Some(Event::Input(InputEvent::CloseButton))));
		assert!(matches!(queue.pop(), Some(Event::Player(PlayerEvent::Next))));
		assert!(matches!(queue.pop(), Some(Event::Telemetry(_))));
		assert_eq!(queue.len(), 0);
	}

	#[test]
	fn test_same_priority_is_fifo() {
		let mut queue = EventQueue::new();
		queue.push(Event::Player(PlayerEvent::Next));
		queue.push(Event::Player(PlayerEvent::Prev));

		assert!(matches!(queue.pop(), Some(Event::Player(PlayerEvent::Next))));
		assert!(matches!(queue.pop(), Some(Event::Player(PlayerEvent::Prev))));
	}

	#[test]
	fn test_clip_commands_keep_order_with_player_events() {
		let mut queue = EventQueue::new();
		queue.push(Event::Player(PlayerEvent::Next));
		queue.push(Event::Media(MediaEvent::PlayClip {
			index: 1,
			activation: 2,
		}));
		queue.push(Event::Media(MediaEvent::StopClip {
			index: 1,
			activation: 2,
		}));

		assert!(matches!(queue.pop(), Some(Event::Player(PlayerEvent::Next))));
		assert!(matches!(queue.pop(), Some(Event::Media(MediaEvent::PlayClip { .. }))));
		assert!(matches!(queue.pop(), Some(Event::Media(MediaEvent::StopClip { .. }))));
	}
}
