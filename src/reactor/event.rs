use super::scheduler::TimerId;
use crate::api::Story;
use eframe::egui;
use std::time::Duration;

#[derive(Clone, Debug)]
pub enum Event {
	Source(SourceEvent),
	Input(InputEvent),
	Player(PlayerEvent),
	Media(MediaEvent),
	Telemetry(TelemetryEvent),
}

impl Event {
	pub fn priority(&self) -> Priority {
		match self {
			Event::Source(_) => Priority::High,
			Event::Input(_) => Priority::High,
			// Player and media share a level so clip start/stop stay in emission order
			Event::Player(_) => Priority::Normal,
			Event::Media(_) => Priority::Normal,
			Event::Telemetry(_) => Priority::Low,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
	High = 0,
	Normal = 1,
	Low = 2,
}

impl Priority {
	pub fn as_index(&self) -> usize {
		*self as usize
	}
}

#[derive(Clone, Debug)]
pub enum SourceEvent {
	/// Read the manifest and open the player on its stories
	OpenStories,
}

/// Raw input, before the adapter decides what it means
#[derive(Clone, Debug)]
pub enum InputEvent {
	KeyPressed(egui::Key),
	/// Finger down (or primary mouse press) over the story surface
	GestureStart { pos: egui::Pos2 },
	GestureEnd { pos: egui::Pos2 },
	OpenTrigger,
	CloseButton,
	NextButton,
	PrevButton,
}

#[derive(Clone, Debug)]
pub enum PlayerEvent {
	Open { stories: Vec<Story> },
	Close,
	Next,
	Prev,
	/// Periodic image progress tick
	Tick { timer: TimerId },
	/// The clip of `activation` began playing
	ClipStarted { activation: u64 },
	/// The clip of `activation` played to its end
	ClipEnded { activation: u64 },
}

#[derive(Clone, Debug)]
pub enum MediaEvent {
	/// Decode media for a freshly opened session
	Load { stories: Vec<Story> },
	/// Start the clip at `index` once it is ready
	PlayClip { index: usize, activation: u64 },
	/// Pause and rewind the clip at `index`, retiring `activation` and every older one
	StopClip { index: usize, activation: u64 },
}

#[derive(Clone, Debug)]
pub enum TelemetryEvent {
	IncrementView { story_id: String },
}

/// Response from component.handle()
#[derive(Default)]
pub struct ComponentResponse {
	/// Events to dispatch immediately
	pub events: Vec<Event>,
	/// Timers to arm (id, event, delay)
	pub scheduled: Vec<(TimerId, Event, Duration)>,
	/// Timers to disarm, applied before anything else in this response
	pub cancelled: Vec<TimerId>,
}

impl ComponentResponse {
	pub fn none() -> Self {
		Self::default()
	}

	pub fn emit(event: Event) -> Self {
		Self {
			events: vec![event],
			..Default::default()
		}
	}

	pub fn emit_many(events: Vec<Event>) -> Self {
		Self {
			events,
			..Default::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty() && self.scheduled.is_empty() && self.cancelled.is_empty()
	}
}
