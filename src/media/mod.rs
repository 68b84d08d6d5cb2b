use crate::api::{MediaSource, QrMenuClient, Story};
use crate::reactor::{ComponentResponse, Event, MediaEvent, PlayerEvent};
use crate::types::MediaKind;
use eframe::egui;
use image::AnimationDecoder;
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Frames shorter than this are shown for `FALLBACK_FRAME_DELAY` instead
const MIN_FRAME_DELAY: Duration = Duration::from_millis(20);
const FALLBACK_FRAME_DELAY: Duration = Duration::from_millis(100);

/// Media decoded off the UI thread, not yet uploaded as textures
pub enum DecodedMedia {
	Still(egui::ColorImage),
	Clip(Vec<(egui::ColorImage, Duration)>),
}

pub fn decode_media(bytes: &[u8], kind: MediaKind) -> anyhow::Result<DecodedMedia> {
	match kind {
		MediaKind::Image => {
			let img = image::load_from_memory(bytes)?;
			Ok(DecodedMedia::Still(to_color_image(img.to_rgba8())))
		}
		MediaKind::Video => {
			let frames = match image::guess_format(bytes)? {
				image::ImageFormat::Gif => {
					image::codecs::gif::GifDecoder::new(Cursor::new(bytes))?
						.into_frames()
						.collect_frames()?
				}
				image::ImageFormat::WebP => {
					image::codecs::webp::WebPDecoder::new(Cursor::new(bytes))?
						.into_frames()
						.collect_frames()?
				}
				other => anyhow::bail!("unsupported clip format {:?}", other),
			};

			let frames = frames
				.into_iter()
				.map(|frame| {
					let delay = Duration::from(frame.delay());
					let delay = if delay < MIN_FRAME_DELAY {
						FALLBACK_FRAME_DELAY
					} else {
						delay
					};
					(to_color_image(frame.into_buffer()), delay)
				})
				.collect();
			Ok(DecodedMedia::Clip(frames))
		}
	}
}

fn to_color_image(buffer: image::RgbaImage) -> egui::ColorImage {
	let size = [buffer.width() as usize, buffer.height() as usize];
	egui::ColorImage::from_rgba_unmultiplied(size, buffer.as_flat_samples().as_slice())
}

/// Playback position of a clip
pub struct ClipClock {
	delays: Vec<Duration>,
	frame: usize,
	elapsed: Duration,
	playing: bool,
}

impl ClipClock {
	pub fn new(delays: Vec<Duration>) -> Self {
		Self {
			delays,
			frame: 0,
			elapsed: Duration::ZERO,
			playing: false,
		}
	}

	/// Fails when there is nothing to play
	pub fn play(&mut self) -> anyhow::Result<()> {
		if self.delays.is_empty() {
			anyhow::bail!("clip has no frames");
		}
		self.playing = true;
		Ok(())
	}

	pub fn pause(&mut self) {
		self.playing = false;
	}

	pub fn rewind(&mut self) {
		self.frame = 0;
		self.elapsed = Duration::ZERO;
	}

	/// Move forward by `dt`. Returns true when the clip reaches its end.
	pub fn advance(&mut self, dt: Duration) -> bool {
		if !self.playing {
			return false;
		}
		self.elapsed += dt;
		while self.elapsed >= self.delays[self.frame] {
			self.elapsed -= self.delays[self.frame];
			if self.frame + 1 == self.delays.len() {
				self.playing = false;
				self.elapsed = Duration::ZERO;
				return true;
			}
			self.frame += 1;
		}
		false
	}

	pub fn frame(&self) -> usize {
		self.frame
	}

	pub fn is_playing(&self) -> bool {
		self.playing
	}
}

pub enum LoadedMedia {
	Image {
		texture: egui::TextureHandle,
	},
	Clip {
		frames: Vec<egui::TextureHandle>,
		clock: ClipClock,
	},
}

pub enum MediaSlot {
	Loading,
	Ready(LoadedMedia),
	Failed(String),
}

pub enum MediaMessage {
	Loaded {
		generation: u64,
		index: usize,
		result: Result<DecodedMedia, String>,
	},
}

/// Clip the player asked for, and how far its start got
struct ActiveClip {
	index: usize,
	activation: u64,
	started: bool,
	rejected: bool,
}

pub struct MediaCache {
	slots: Vec<MediaSlot>,
	/// Bumped on every load so results from an older session are dropped
	generation: u64,
	active: Option<ActiveClip>,
	/// Newest activation a play was requested for
	latest_play: u64,
	/// Every activation up to this one has been stopped
	retired: u64,
	last_poll: Instant,
	client: Option<Arc<QrMenuClient>>,
	sender: mpsc::Sender<MediaMessage>,
	receiver: mpsc::Receiver<MediaMessage>,
	egui_ctx: egui::Context,
}

impl MediaCache {
	pub fn new(ctx: &egui::Context, client: Option<Arc<QrMenuClient>>) -> Self {
		log::info!("[Media] Initializing");
		let (sender, receiver) = mpsc::channel(100);
		Self {
			slots: Vec::new(),
			generation: 0,
			active: None,
			latest_play: 0,
			retired: 0,
			last_poll: Instant::now(),
			client,
			sender,
			receiver,
			egui_ctx: ctx.clone(),
		}
	}

	pub fn poll(&mut self) -> ComponentResponse {
		let now = Instant::now();
		let dt = now.saturating_duration_since(self.last_poll);
		self.last_poll = now;

		let mut responses = Vec::new();
		while let Ok(msg) = self.receiver.try_recv() {
			match msg {
				MediaMessage::Loaded {
					generation,
					index,
					result,
				} => {
					if generation != self.generation {
						log::debug!("[Media] Dropping result from old load {}", generation);
						continue;
					}
					self.install(index, result);
				}
			}
		}

		let was_started = self.active.as_ref().is_some_and(|a| a.started);
		self.try_start(&mut responses);

		if was_started {
			if let Some(active) = &self.active {
				let activation = active.activation;
				if let Some(MediaSlot::Ready(LoadedMedia::Clip { clock, .. })) =
					self.slots.get_mut(active.index)
				{
					if clock.advance(dt) {
						log::debug!("[Media] Clip {} ended", active.index);
						responses.push(Event::Player(PlayerEvent::ClipEnded { activation }));
					}
				}
			}
		}

		ComponentResponse::emit_many(responses)
	}

	pub fn handle(&mut self, event: &Event) -> ComponentResponse {
		let mut responses = Vec::new();

		match event {
			Event::Media(MediaEvent::Load { stories }) => {
				self.generation += 1;
				self.active = None;
				self.slots = stories.iter().map(|_| MediaSlot::Loading).collect();
				log::info!(
					"[Media] Loading {} stories (generation {})",
					stories.len(),
					self.generation
				);
				for (index, story) in stories.iter().enumerate() {
					self.spawn_load(index, story.clone());
				}
			}
			Event::Media(MediaEvent::PlayClip { index, activation }) => {
				if *activation <= self.retired || *activation < self.latest_play {
					log::debug!(
						"[Media] Ignoring PlayClip {} from stale activation {}",
						index,
						activation
					);
					return ComponentResponse::none();
				}
				log::debug!("[Media] PlayClip {} (activation {})", index, activation);
				self.latest_play = *activation;
				self.active = Some(ActiveClip {
					index: *index,
					activation: *activation,
					started: false,
					rejected: false,
				});
				self.try_start(&mut responses);
			}
			Event::Media(MediaEvent::StopClip { index, activation }) => {
				self.retired = self.retired.max(*activation);
				// A newer activation may already own the same clip
				let replayed = self
					.active
					.as_ref()
					.is_some_and(|a| a.index == *index && a.activation > *activation);
				if !replayed {
					if let Some(MediaSlot::Ready(LoadedMedia::Clip { clock, .. })) =
						self.slots.get_mut(*index)
					{
						clock.pause();
						clock.rewind();
					}
				}
				if self.active.as_ref().is_some_and(|a| a.activation <= *activation) {
					self.active = None;
				}
			}
			_ => {}
		}

		ComponentResponse::emit_many(responses)
	}

	/// Start the requested clip if its frames are in. A failed start is not retried.
	fn try_start(&mut self, responses: &mut Vec<Event>) {
		let Some(active) = self.active.as_mut() else {
			return;
		};
		if active.started || active.rejected {
			return;
		}

		let result = match self.slots.get_mut(active.index) {
			Some(MediaSlot::Ready(LoadedMedia::Clip { clock, .. })) => {
				clock.rewind();
				clock.play()
			}
			Some(MediaSlot::Ready(LoadedMedia::Image { .. })) => {
				Err(anyhow::anyhow!("story is a still image"))
			}
			Some(MediaSlot::Failed(error)) => Err(anyhow::anyhow!("{}", error)),
			Some(MediaSlot::Loading) | None => return,
		};

		match result {
			Ok(()) => {
				active.started = true;
				log::debug!("[Media] Clip {} playing", active.index);
				responses.push(Event::Player(PlayerEvent::ClipStarted {
					activation: active.activation,
				}));
			}
			Err(e) => {
				active.rejected = true;
				log::debug!("[Media] Clip {} refused to play: {}", active.index, e);
			}
		}
	}

	fn install(&mut self, index: usize, result: Result<DecodedMedia, String>) {
		let Some(slot) = self.slots.get_mut(index) else {
			return;
		};
		*slot = match result {
			Ok(DecodedMedia::Still(image)) => {
				log::info!("[Media] Image {} loaded", index);
				let texture = self.egui_ctx.load_texture(
					format!("story-{}", index),
					image,
					egui::TextureOptions::LINEAR,
				);
				MediaSlot::Ready(LoadedMedia::Image { texture })
			}
			Ok(DecodedMedia::Clip(frames)) => {
				log::info!("[Media] Clip {} loaded ({} frames)", index, frames.len());
				let mut textures = Vec::with_capacity(frames.len());
				let mut delays = Vec::with_capacity(frames.len());
				for (n, (image, delay)) in frames.into_iter().enumerate() {
					textures.push(self.egui_ctx.load_texture(
						format!("story-{}-{}", index, n),
						image,
						egui::TextureOptions::LINEAR,
					));
					delays.push(delay);
				}
				MediaSlot::Ready(LoadedMedia::Clip {
					frames: textures,
					clock: ClipClock::new(delays),
				})
			}
			Err(error) => {
				log::error!("[Media] Story {} failed to load: {}", index, error);
				MediaSlot::Failed(error)
			}
		};
	}

	fn spawn_load(&self, index: usize, story: Story) {
		let sender = self.sender.clone();
		let ctx = self.egui_ctx.clone();
		let client = self.client.clone();
		let generation = self.generation;

		tokio::spawn(async move {
			let result: anyhow::Result<DecodedMedia> = async {
				let bytes = match &story.source {
					MediaSource::File(path) => tokio::fs::read(path).await?,
					MediaSource::Remote(url) => match &client {
						Some(client) => client.fetch_bytes(url).await?,
						None => anyhow::bail!("no HTTP client for {}", url),
					},
				};
				let kind = story.kind;
				tokio::task::spawn_blocking(move || decode_media(&bytes, kind)).await?
			}
			.await;

			let _ = sender
				.send(MediaMessage::Loaded {
					generation,
					index,
					result: result.map_err(|e| format!("{}: {}", story.source, e)),
				})
				.await;
			ctx.request_repaint();
		});
	}

	pub fn slot(&self, index: usize) -> Option<&MediaSlot> {
		self.slots.get(index)
	}

	/// Texture to draw for `index` right now
	pub fn texture(&self, index: usize) -> Option<&egui::TextureHandle> {
		match self.slots.get(index)? {
			MediaSlot::Ready(LoadedMedia::Image { texture }) => Some(texture),
			MediaSlot::Ready(LoadedMedia::Clip { frames, clock }) => frames.get(clock.frame()),
			_ => None,
		}
	}

	/// True while the requested clip is actually running
	pub fn is_clip_playing(&self) -> bool {
		let Some(active) = &self.active else {
			return false;
		};
		matches!(
			self.slots.get(active.index),
			Some(MediaSlot::Ready(LoadedMedia::Clip { clock, .. })) if clock.is_playing()
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{Delay, Frame, RgbaImage};

	fn ms(n: u64) -> Duration {
		Duration::from_millis(n)
	}

	fn gif_bytes(frame_delays_ms: &[u32]) -> Vec<u8> {
		let mut buf = Vec::new();
		{
			let mut encoder = image::codecs::gif::GifEncoder::new(&mut buf);
			let frames = frame_delays_ms.iter().map(|d| {
				Frame::from_parts(
					RgbaImage::new(2, 2),
					0,
					0,
					Delay::from_numer_denom_ms(*d, 1),
				)
			});
			encoder.encode_frames(frames).unwrap();
		}
		buf
	}

	fn clip(delays_ms: &[u64]) -> DecodedMedia {
		DecodedMedia::Clip(
			delays_ms
				.iter()
				.map(|d| (egui::ColorImage::new([1, 1], egui::Color32::BLACK), ms(*d)))
				.collect(),
		)
	}

	fn cache_with(media: Vec<Result<DecodedMedia, String>>) -> MediaCache {
		let mut cache = MediaCache::new(&egui::Context::default(), None);
		cache.slots = media.iter().map(|_| MediaSlot::Loading).collect();
		for (index, result) in media.into_iter().enumerate() {
			cache.install(index, result);
		}
		cache
	}

	#[test]
	fn test_clock_runs_to_end_once() {
		let mut clock = ClipClock::new(vec![ms(100), ms(100), ms(100)]);
		assert!(!clock.advance(ms(500)));

		clock.play().unwrap();
		assert!(!clock.advance(ms(150)));
		assert_eq!(clock.frame(), 1);
		assert!(clock.advance(ms(150)));
		assert!(!clock.is_playing());
		assert!(!clock.advance(ms(150)));

		clock.rewind();
		assert_eq!(clock.frame(), 0);
	}

	#[test]
	fn test_empty_clip_refuses_to_play() {
		let mut clock = ClipClock::new(Vec::new());
		assert!(clock.play().is_err());
		assert!(!clock.advance(ms(100)));
	}

	#[test]
	fn test_decode_gif_clip() {
		let bytes = gif_bytes(&[100, 0]);
		let DecodedMedia::Clip(frames) = decode_media(&bytes, MediaKind::Video).unwrap() else {
			panic!("expected a clip");
		};
		assert_eq!(frames.len(), 2);
		assert_eq!(frames[0].1, ms(100));
		assert_eq!(frames[1].1, FALLBACK_FRAME_DELAY);
		assert_eq!(frames[0].0.size, [2, 2]);
	}

	#[test]
	fn test_decode_still_image() {
		let mut buf = Vec::new();
		RgbaImage::new(3, 1)
			.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
			.unwrap();
		let DecodedMedia::Still(image) = decode_media(&buf, MediaKind::Image).unwrap() else {
			panic!("expected a still");
		};
		assert_eq!(image.size, [3, 1]);
	}

	#[test]
	fn test_decode_rejects_non_animated_clip() {
		let mut buf = Vec::new();
		RgbaImage::new(1, 1)
			.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
			.unwrap();
		assert!(decode_media(&buf, MediaKind::Video).is_err());
		assert!(decode_media(b"not media", MediaKind::Image).is_err());
	}

	#[test]
	fn test_play_ready_clip_reports_start() {
		let mut cache = cache_with(vec![Ok(clip(&[100, 100]))]);
		let response = cache.handle(&Event::Media(MediaEvent::PlayClip {
			index: 0,
			activation: 4,
		}));

		assert!(matches!(
			response.events.as_slice(),
			[Event::Player(PlayerEvent::ClipStarted { activation: 4 })]
		));
		assert!(cache.is_clip_playing());
	}

	#[test]
	fn test_clip_waits_for_load_then_starts() {
		let mut cache = cache_with(Vec::new());
		cache.slots = vec![MediaSlot::Loading];

		let response = cache.handle(&Event::Media(MediaEvent::PlayClip {
			index: 0,
			activation: 1,
		}));
		assert!(response.events.is_empty());

		cache.install(0, Ok(clip(&[100])));
		let response = cache.poll();
		assert!(matches!(
			response.events.as_slice(),
			[Event::Player(PlayerEvent::ClipStarted { activation: 1 })]
		));
	}

	#[test]
	fn test_failed_clip_is_silently_rejected() {
		let mut cache = cache_with(vec![Err("boom".into())]);
		let response = cache.handle(&Event::Media(MediaEvent::PlayClip {
			index: 0,
			activation: 1,
		}));
		assert!(response.events.is_empty());
		assert!(cache.poll().events.is_empty());
		assert!(!cache.is_clip_playing());
	}

	#[test]
	fn test_stop_rewinds_and_forgets_clip() {
		let mut cache = cache_with(vec![Ok(clip(&[10_000, 10_000]))]);
		cache.handle(&Event::Media(MediaEvent::PlayClip {
			index: 0,
			activation: 1,
		}));
		if let Some(MediaSlot::Ready(LoadedMedia::Clip { clock, .. })) = cache.slots.get_mut(0) {
			clock.advance(ms(15_000));
			assert_eq!(clock.frame(), 1);
		}

		cache.handle(&Event::Media(MediaEvent::StopClip {
			index: 0,
			activation: 1,
		}));
		assert!(!cache.is_clip_playing());
		match cache.slot(0) {
			Some(MediaSlot::Ready(LoadedMedia::Clip { clock, .. })) => {
				assert_eq!(clock.frame(), 0);
				assert!(!clock.is_playing());
			}
			_ => panic!("clip slot missing"),
		}
	}

	#[test]
	fn test_play_after_its_stop_is_ignored() {
		let mut cache = cache_with(vec![Ok(clip(&[100])), Ok(clip(&[100]))]);
		cache.handle(&Event::Media(MediaEvent::StopClip {
			index: 1,
			activation: 3,
		}));

		let response = cache.handle(&Event::Media(MediaEvent::PlayClip {
			index: 1,
			activation: 3,
		}));
		assert!(response.events.is_empty());
		assert!(!cache.is_clip_playing());
	}

	#[test]
	fn test_older_play_does_not_replace_newer_one() {
		let mut cache = cache_with(vec![Ok(clip(&[100])), Ok(clip(&[100]))]);
		cache.handle(&Event::Media(MediaEvent::PlayClip {
			index: 1,
			activation: 5,
		}));
		let response = cache.handle(&Event::Media(MediaEvent::PlayClip {
			index: 0,
			activation: 4,
		}));
		assert!(response.events.is_empty());
		assert!(cache.is_clip_playing());
		assert!(matches!(&cache.active, Some(active) if active.index == 1));

		// Stopping an older activation leaves the newer clip running
		cache.handle(&Event::Media(MediaEvent::StopClip {
			index: 0,
			activation: 4,
		}));
		assert!(cache.is_clip_playing());
	}
}
