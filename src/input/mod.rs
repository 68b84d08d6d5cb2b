use crate::reactor::{ComponentResponse, Event, InputEvent, PlayerEvent, SourceEvent};
use crate::types::NavDirection;
use eframe::egui;

/// Tracks one touch/drag gesture and decides whether it was a horizontal swipe
pub struct SwipeTracker {
	start: Option<egui::Pos2>,
	threshold: f32,
}

impl SwipeTracker {
	pub fn new(threshold: f32) -> Self {
		Self {
			start: None,
			threshold,
		}
	}

	pub fn start(&mut self, pos: egui::Pos2) {
		self.start = Some(pos);
	}

	/// Forget a gesture that never finished
	pub fn reset(&mut self) {
		self.start = None;
	}

	/// Finish the gesture. A leftward finger movement means "next".
	pub fn end(&mut self, pos: egui::Pos2) -> Option<NavDirection> {
		let start = self.start.take()?;
		let dx = start.x - pos.x;
		let dy = start.y - pos.y;

		if dx.abs() < self.threshold || dy.abs() > dx.abs() {
			return None;
		}
		if dx > 0.0 {
			Some(NavDirection::Next)
		} else {
			Some(NavDirection::Prev)
		}
	}
}

/// Turns raw keyboard, pointer and button input into player commands
pub struct InputAdapter {
	swipe: SwipeTracker,
}

impl InputAdapter {
	pub fn new(swipe_threshold: f32) -> Self {
		Self {
			swipe: SwipeTracker::new(swipe_threshold),
		}
	}

	/// `player_open` gates everything except the open trigger
	pub fn handle(&mut self, event: &Event, player_open: bool) -> ComponentResponse {
		let Event::Input(input) = event else {
			return ComponentResponse::none();
		};

		if let InputEvent::OpenTrigger = input {
			self.swipe.reset();
			return ComponentResponse::emit(Event::Source(SourceEvent::OpenStories));
		}
		if !player_open {
			self.swipe.reset();
			return ComponentResponse::none();
		}

		let command = match input {
			InputEvent::KeyPressed(key) => match key {
				egui::Key::Escape => Some(PlayerEvent::Close),
				egui::Key::ArrowRight => Some(PlayerEvent::Next),
				egui::Key::ArrowLeft => Some(PlayerEvent::Prev),
				_ => None,
			},
			InputEvent::GestureStart { pos } => {
				self.swipe.start(*pos);
				None
			}
			InputEvent::GestureEnd { pos } => self.swipe.end(*pos).map(|direction| {
				log::debug!("Swipe {:?}", direction);
				match direction {
					NavDirection::Next => PlayerEvent::Next,
					NavDirection::Prev => PlayerEvent::Prev,
				}
			}),
			InputEvent::CloseButton => Some(PlayerEvent::Close),
			InputEvent::NextButton => Some(PlayerEvent::Next),
			InputEvent::PrevButton => Some(PlayerEvent::Prev),
			InputEvent::OpenTrigger => None,
		};

		// A gesture never spans two sessions
		if matches!(command, Some(PlayerEvent::Close)) {
			self.swipe.reset();
		}

		match command {
			Some(command) => ComponentResponse::emit(Event::Player(command)),
			None => ComponentResponse::none(),
		}
	}
}
