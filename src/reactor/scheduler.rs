use super::event::Event;
use super::queue::EventQueue;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Handle for a scheduled event, chosen by the component that arms it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

struct ScheduledEvent {
	emit_at: Instant,
	timer: TimerId,
	event: Event,
}

impl PartialEq for ScheduledEvent {
	fn eq(&self, other: &Self) -> bool {
		self.emit_at == other.emit_at
	}
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ScheduledEvent {
	fn cmp(&self, other: &Self) -> Ordering {
		other.emit_at.cmp(&self.emit_at)
	}
}

pub struct Scheduler {
	pending: BinaryHeap<ScheduledEvent>,
}

impl Scheduler {
	pub fn new() -> Self {
		Self {
			pending: BinaryHeap::new(),
		}
	}

	/// Schedule an event to fire after `delay`
	pub fn schedule(&mut self, timer: TimerId, event: Event, delay: Duration) {
		self.schedule_at(timer, event, Instant::now() + delay);
	}

	fn schedule_at(&mut self, timer: TimerId, event: Event, emit_at: Instant) {
		self.pending.push(ScheduledEvent {
			emit_at,
			timer,
			event,
		});
	}

	/// Drop every pending event armed under `timer`
	pub fn cancel(&mut self, timer: TimerId) {
		let before = self.len();
		self.pending.retain(|s| s.timer != timer);
		let removed = before - self.len();
		if removed > 0 {
			log::trace!("Cancelled {:?} ({} pending)", timer, removed);
		}
	}

	/// Poll and drain ready events into the queue
	pub fn tick(&mut self, queue: &mut EventQueue) {
		self.tick_at(Instant::now(), queue);
	}

	fn tick_at(&mut self, now: Instant, queue: &mut EventQueue) {
		while let Some(scheduled) = self.pending.peek() {
			if scheduled.emit_at > now {
				break;
			}
			if let Some(scheduled) = self.pending.pop() {
				queue.push(scheduled.event);
			}
		}
	}

	/// Time until the next pending event, if any
	pub fn next_due(&self) -> Option<Duration> {
		self.pending
			.peek()
			.map(|s| s.emit_at.saturating_duration_since(Instant::now()))
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}
}

impl Default for Scheduler {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reactor::event::PlayerEvent;

	fn tick_event(id: u64) -> Event {
		Event::Player(PlayerEvent::Tick { timer: TimerId(id) })
	}

	#[test]
	fn test_fires_in_deadline_order() {
		let mut scheduler = Scheduler::new();
		let mut queue = EventQueue::new();
		let start = Instant::now();

		scheduler.schedule_at(TimerId(2), tick_event(2), start + Duration::from_millis(100));
		scheduler.schedule_at(TimerId(1), tick_event(1), start + Duration::from_millis(50));

		scheduler.tick_at(start + Duration::from_millis(60), &mut queue);
		assert!(matches!(
			queue.pop(),
			Some(Event::Player(PlayerEvent::Tick { timer: TimerId(1) }))
		));
		assert!(queue.pop().is_none());

		scheduler.tick_at(start + Duration::from_millis(100), &mut queue);
		assert!(matches!(
			queue.pop(),
			Some(Event::Player(PlayerEvent::Tick { timer: TimerId(2) }))
		));
	}

	#[test]
	fn test_cancelled_timer_never_fires() {
		let mut scheduler = Scheduler::new();
		let mut queue = EventQueue::new();
		let start = Instant::now();

		scheduler.schedule_at(TimerId(7), tick_event(7), start);
		scheduler.schedule_at(TimerId(8), tick_event(8), start);
		scheduler.cancel(TimerId(7));
		assert_eq!(scheduler.len(), 1);

		scheduler.tick_at(start + Duration::from_secs(1), &mut queue);
		assert!(matches!(
			queue.pop(),
			Some(Event::Player(PlayerEvent::Tick { timer: TimerId(8) }))
		));
		assert!(queue.pop().is_none());
	}
}
