pub mod event;
pub mod queue;
pub mod scheduler;

pub use event::{
	ComponentResponse, Event, InputEvent, MediaEvent, PlayerEvent, SourceEvent, TelemetryEvent,
};
pub use queue::EventQueue;
pub use scheduler::{Scheduler, TimerId};

use crate::api::{QrMenuClient, StoryManifest};
use crate::input::InputAdapter;
use crate::media::MediaCache;
use crate::player::{PlayerConfig, StoryPlayer};
use crate::settings::Settings;
use crate::telemetry::ViewReporter;
use crate::view::ViewManager;
use eframe::egui;
use std::sync::Arc;

pub struct Reactor {
	queue: EventQueue,
	scheduler: Scheduler,
	/// `None` disables the player: the open trigger is never shown
	manifest: Option<StoryManifest>,

	pub input: InputAdapter,
	pub player: StoryPlayer,
	pub media: MediaCache,
	pub telemetry: ViewReporter,
	pub view: ViewManager,
}

impl Reactor {
	pub fn new(ctx: &egui::Context, settings: &Settings) -> Self {
		log::info!("Initializing all components");

		let client = match QrMenuClient::new(&settings.server_url, settings.request_timeout()) {
			Ok(client) => Some(Arc::new(client)),
			Err(e) => {
				log::error!("Failed to build HTTP client: {}", e);
				None
			}
		};

		let manifest = settings.manifest.clone().map(StoryManifest::new);
		match &manifest {
			Some(m) => log::info!("Stories from {}", m.path().display()),
			None => log::warn!("No story manifest configured, player disabled"),
		}

		let reactor = Self {
			queue: EventQueue::new(),
			scheduler: Scheduler::new(),
			input: InputAdapter::new(settings.swipe_threshold_px),
			player: StoryPlayer::new(PlayerConfig::from_settings(settings)),
			media: MediaCache::new(ctx, client.clone()),
			telemetry: ViewReporter::new(client),
			view: ViewManager::new(manifest.is_some()),
			manifest,
		};
		log::info!("Initialization complete");

		reactor
	}

	fn process_response(&mut self, response: ComponentResponse) {
		if response.is_empty() {
			return;
		}
		for timer in response.cancelled {
			self.scheduler.cancel(timer);
		}
		for e in response.events {
			self.queue.push(e);
		}
		for (timer, e, d) in response.scheduled {
			self.scheduler.schedule(timer, e, d);
		}
	}

	pub fn tick(&mut self, ctx: &egui::Context) {
		// Drain due timers
		self.scheduler.tick(&mut self.queue);

		// Poll async components
		let media_response = self.media.poll();
		self.process_response(media_response);

		self.drain_queue();

		// Render
		let events = self.view.render(ctx, &self.player, &self.media);
		for event in events {
			self.queue.push(event);
		}
		self.drain_queue();

		if self.player.is_open() {
			let wait = self
				.scheduler
				.next_due()
				.unwrap_or(std::time::Duration::from_millis(16));
			ctx.request_repaint_after(wait);
		}
	}

	/// Process the event queue until empty
	fn drain_queue(&mut self) {
		let mut iterations = 0;
		while let Some(event) = self.queue.pop() {
			log::trace!("Processing event: {:?}", event);
			let response = self.route(&event);
			self.process_response(response);

			iterations += 1;
			if iterations > 1000 {
				log::warn!(
					"Event loop exceeded 1000 iterations, breaking ({} left)",
					self.queue.len()
				);
				break;
			}
		}
	}

	fn route(&mut self, event: &Event) -> ComponentResponse {
		match event {
			Event::Source(e) => self.handle_source(e),
			Event::Input(_) => self.input.handle(event, self.player.is_open()),
			Event::Player(_) => self.player.handle(event),
			Event::Media(_) => self.media.handle(event),
			Event::Telemetry(_) => self.telemetry.handle(event),
		}
	}

	fn handle_source(&mut self, event: &SourceEvent) -> ComponentResponse {
		match event {
			SourceEvent::OpenStories => {
				let Some(manifest) = &self.manifest else {
					log::debug!("Open ignored: player disabled");
					return ComponentResponse::none();
				};
				let stories = match manifest.load() {
					Ok(stories) => stories,
					Err(e) => {
						log::warn!("Failed to read {}: {}", manifest.path().display(), e);
						Vec::new()
					}
				};
				if stories.is_empty() {
					log::info!("Manifest has no stories, nothing to open");
					return ComponentResponse::none();
				}
				log::info!("Source open: {} stories", stories.len());
				ComponentResponse::emit_many(vec![
					Event::Media(MediaEvent::Load {
						stories: stories.clone(),
					}),
					Event::Player(PlayerEvent::Open { stories }),
				])
			}
		}
	}
}

impl eframe::App for Reactor {
	fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
		self.tick(ctx);
	}
}
