use crate::api::Story;
use crate::reactor::{
	ComponentResponse, Event, MediaEvent, PlayerEvent, TelemetryEvent, TimerId,
};
use crate::settings::Settings;
use crate::types::{MediaKind, NavDirection, PlayerState};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct PlayerConfig {
	/// How long a still image stays on screen
	pub image_duration: Duration,
	/// Period of the progress tick
	pub tick_interval: Duration,
}

impl PlayerConfig {
	pub fn from_settings(settings: &Settings) -> Self {
		Self {
			image_duration: settings.image_duration(),
			tick_interval: settings.tick_interval(),
		}
	}

	/// Whole ticks an image stays up before auto-advancing, rounded up
	fn ticks_per_image(&self) -> u32 {
		let interval = self.tick_interval.as_micros();
		if interval == 0 {
			return 0;
		}
		u32::try_from(self.image_duration.as_micros().div_ceil(interval)).unwrap_or(u32::MAX)
	}
}

impl Default for PlayerConfig {
	fn default() -> Self {
		Self {
			image_duration: Duration::from_millis(5000),
			tick_interval: Duration::from_millis(50),
		}
	}
}

/// Runtime state of one open-to-close run of the overlay
pub struct PlayerSession {
	stories: Vec<Story>,
	current: usize,
	/// Ticks elapsed on the current image
	ticks: u32,
	timer: Option<TimerId>,
	/// Activation number of the current item, 0 before the first one
	activation: u64,
	view_reported: bool,
}

impl PlayerSession {
	fn current_story(&self) -> &Story {
		&self.stories[self.current]
	}

	/// Stop whatever the current item is doing. Must run before the next activation.
	fn deactivate(&mut self, response: &mut ComponentResponse) {
		if self.activation == 0 {
			return;
		}
		if let Some(timer) = self.timer.take() {
			response.cancelled.push(timer);
		}
		if self.current_story().kind == MediaKind::Video {
			response.events.push(Event::Media(MediaEvent::StopClip {
				index: self.current,
				activation: self.activation,
			}));
		}
	}

	pub fn len(&self) -> usize {
		self.stories.len()
	}

	pub fn current_index(&self) -> usize {
		self.current
	}
}

pub struct StoryPlayer {
	config: PlayerConfig,
	session: Option<PlayerSession>,
	next_timer: u64,
	activations: u64,
}

impl StoryPlayer {
	pub fn new(config: PlayerConfig) -> Self {
		log::info!(
			"Initializing player (image {:?}, tick {:?})",
			config.image_duration,
			config.tick_interval
		);
		Self {
			config,
			session: None,
			next_timer: 0,
			activations: 0,
		}
	}

	pub fn handle(&mut self, event: &Event) -> ComponentResponse {
		let mut response = ComponentResponse::none();

		match event {
			Event::Player(PlayerEvent::Open { stories }) => {
				self.open(stories.clone(), &mut response);
			}
			Event::Player(PlayerEvent::Close) => {
				self.close(&mut response);
			}
			Event::Player(PlayerEvent::Next) => {
				self.navigate(NavDirection::Next, &mut response);
			}
			Event::Player(PlayerEvent::Prev) => {
				self.navigate(NavDirection::Prev, &mut response);
			}
			Event::Player(PlayerEvent::Tick { timer }) => {
				self.on_tick(*timer, &mut response);
			}
			Event::Player(PlayerEvent::ClipStarted { activation }) => {
				let Some(session) = self.session.as_mut() else {
					return response;
				};
				if session.activation != *activation {
					log::debug!("Ignoring start of stale clip activation {}", activation);
					return response;
				}
				if !session.view_reported {
					session.view_reported = true;
					Self::report_view(session.current_story(), &mut response);
				}
			}
			Event::Player(PlayerEvent::ClipEnded { activation }) => {
				let is_current = self
					.session
					.as_ref()
					.is_some_and(|s| s.activation == *activation);
				if is_current {
					log::debug!("Clip ended, advancing");
					self.navigate(NavDirection::Next, &mut response);
				}
			}
			_ => {}
		}

		response
	}

	fn open(&mut self, stories: Vec<Story>, response: &mut ComponentResponse) {
		if stories.is_empty() {
			log::info!("Open ignored: no stories");
			return;
		}

		if let Some(mut old) = self.session.take() {
			log::info!("Re-opening over an active session");
			old.deactivate(response);
		}

		log::info!("Opening player with {} stories", stories.len());
		self.session = Some(PlayerSession {
			stories,
			current: 0,
			ticks: 0,
			timer: None,
			activation: 0,
			view_reported: false,
		});
		self.activate(0, response);
	}

	fn close(&mut self, response: &mut ComponentResponse) {
		match self.session.take() {
			Some(mut session) => {
				log::info!("Closing player at {}/{}", session.current + 1, session.len());
				session.deactivate(response);
			}
			None => log::debug!("Close ignored: player not open"),
		}
	}

	fn navigate(&mut self, direction: NavDirection, response: &mut ComponentResponse) {
		let Some(session) = self.session.as_ref() else {
			log::debug!("Navigate ignored: player not open");
			return;
		};
		let old_index = session.current;
		let new_index = direction.step(old_index, session.len());
		log::debug!(
			"Navigate {:?}: {} -> {} (of {})",
			direction,
			old_index,
			new_index,
			session.len()
		);
		self.activate(new_index, response);
	}

	/// Move display focus to `index`, tearing down the previous item first
	fn activate(&mut self, index: usize, response: &mut ComponentResponse) {
		self.activations += 1;
		let activation = self.activations;
		let timer = TimerId(self.next_timer);
		let tick_interval = self.config.tick_interval;

		let Some(session) = self.session.as_mut() else {
			return;
		};

		session.deactivate(response);
		session.current = index;
		session.ticks = 0;
		session.activation = activation;
		session.view_reported = false;

		match session.current_story().kind {
			MediaKind::Video => {
				response.events.push(Event::Media(MediaEvent::PlayClip {
					index,
					activation,
				}));
			}
			MediaKind::Image => {
				session.view_reported = true;
				Self::report_view(session.current_story(), response);

				self.next_timer += 1;
				session.timer = Some(timer);
				response.scheduled.push((
					timer,
					Event::Player(PlayerEvent::Tick { timer }),
					tick_interval,
				));
			}
		}
	}

	fn on_tick(&mut self, timer: TimerId, response: &mut ComponentResponse) {
		let ticks_per_image = self.config.ticks_per_image();
		let tick_interval = self.config.tick_interval;

		let Some(session) = self.session.as_mut() else {
			return;
		};
		if session.timer != Some(timer) {
			log::trace!("Dropping tick from stale {:?}", timer);
			return;
		}

		session.ticks += 1;
		if session.ticks >= ticks_per_image {
			session.timer = None;
			self.navigate(NavDirection::Next, response);
		} else {
			response.scheduled.push((
				timer,
				Event::Player(PlayerEvent::Tick { timer }),
				tick_interval,
			));
		}
	}

	fn report_view(story: &Story, response: &mut ComponentResponse) {
		if let Some(story_id) = &story.story_id {
			response.events.push(Event::Telemetry(TelemetryEvent::IncrementView {
				story_id: story_id.clone(),
			}));
		}
	}

	// Accessors for ViewManager

	pub fn state(&self) -> PlayerState {
		match &self.session {
			None => PlayerState::Closed,
			Some(session) => match session.current_story().kind {
				MediaKind::Image => PlayerState::ShowingImage(session.current),
				MediaKind::Video => PlayerState::ShowingVideo(session.current),
			},
		}
	}

	pub fn is_open(&self) -> bool {
		self.session.is_some()
	}

	pub fn session(&self) -> Option<&PlayerSession> {
		self.session.as_ref()
	}

	/// Live progress of the current image, 0..=100
	pub fn progress_percent(&self) -> f32 {
		let Some(session) = &self.session else {
			return 0.0;
		};
		let ticks_per_image = self.config.ticks_per_image();
		if ticks_per_image == 0 {
			return 100.0;
		}
		let percent = u64::from(session.ticks) * 100 / u64::from(ticks_per_image);
		percent.min(100) as f32
	}

	/// Width of every progress bar, in percent
	pub fn bar_widths(&self) -> Vec<f32> {
		let Some(session) = &self.session else {
			return Vec::new();
		};
		let live = self.progress_percent();
		(0..session.len())
			.map(|i| {
				if i < session.current {
					100.0
				} else if i == session.current {
					live
				} else {
					0.0
				}
			})
			.collect()
	}

	/// The progress row is hidden while a clip plays
	pub fn progress_visible(&self) -> bool {
		matches!(self.state(), PlayerState::ShowingImage(_))
	}
}
