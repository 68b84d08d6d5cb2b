use crate::media::{MediaCache, MediaSlot};
use crate::player::StoryPlayer;
use crate::reactor::{Event, InputEvent};
use crate::types::PlayerState;
use eframe::egui;

const BAR_HEIGHT: f32 = 3.0;
const BAR_GAP: f32 = 4.0;
const OVERLAY_MARGIN: f32 = 12.0;

/// Keys the player reacts to while open
const PLAYER_KEYS: [egui::Key; 3] = [egui::Key::Escape, egui::Key::ArrowRight, egui::Key::ArrowLeft];

pub struct ViewManager {
	/// False when there is no manifest; the trigger is then not drawn
	stories_enabled: bool,
}

impl ViewManager {
	pub fn new(stories_enabled: bool) -> Self {
		Self { stories_enabled }
	}

	/// Main render function of the whole thing
	pub fn render(
		&mut self,
		ctx: &egui::Context,
		player: &StoryPlayer,
		media: &MediaCache,
	) -> Vec<Event> {
		let mut events = Vec::new();
		let player_open = player.is_open();

		if player_open {
			Self::collect_player_input(ctx, &mut events);
		}

		self.render_page(ctx, player_open, &mut events);

		if player_open {
			self.render_overlay(ctx, player, media);
			self.render_controls(ctx, &mut events);
		}

		events
	}

	fn collect_player_input(ctx: &egui::Context, events: &mut Vec<Event>) {
		ctx.input(|i| {
			for key in PLAYER_KEYS {
				if i.key_pressed(key) {
					events.push(Event::Input(InputEvent::KeyPressed(key)));
				}
			}

			// Touch input is also reported as a simulated pointer; use one or the other
			let has_touch = i.events.iter().any(|e| matches!(e, egui::Event::Touch { .. }));
			for event in &i.events {
				match event {
					egui::Event::Touch { phase, pos, .. } => match phase {
						egui::TouchPhase::Start => {
							events.push(Event::Input(InputEvent::GestureStart { pos: *pos }));
						}
						egui::TouchPhase::End => {
							events.push(Event::Input(InputEvent::GestureEnd { pos: *pos }));
						}
						_ => {}
					},
					egui::Event::PointerButton {
						pos,
						button: egui::PointerButton::Primary,
						pressed,
						..
					} if !has_touch => {
						let pos = *pos;
						events.push(Event::Input(if *pressed {
							InputEvent::GestureStart { pos }
						} else {
							InputEvent::GestureEnd { pos }
						}));
					}
					_ => {}
				}
			}
		});
	}

	fn render_page(&self, ctx: &egui::Context, player_open: bool, events: &mut Vec<Event>) {
		egui::CentralPanel::default().show(ctx, |ui| {
			if player_open {
				ui.disable();
			}
			ui.vertical_centered(|ui| {
				ui.add_space(24.0);
				ui.heading("QrMenu");
				ui.add_space(12.0);

				if self.stories_enabled {
					let trigger = egui::Button::new(egui::RichText::new("● Stories").size(18.0))
						.rounding(24.0)
						.min_size(egui::vec2(120.0, 48.0));
					if ui.add(trigger).clicked() {
						events.push(Event::Input(InputEvent::OpenTrigger));
					}
				}
			});
		});
	}

	fn render_overlay(&self, ctx: &egui::Context, player: &StoryPlayer, media: &MediaCache) {
		let Some(session) = player.session() else {
			return;
		};
		let index = session.current_index();
		let screen_rect = ctx.screen_rect();

		egui::Area::new(egui::Id::new("story_overlay"))
			.fixed_pos(screen_rect.min)
			.order(egui::Order::Middle)
			.movable(false)
			.show(ctx, |ui| {
				// Swallow clicks so nothing underneath reacts
				ui.allocate_rect(screen_rect, egui::Sense::click());

				let painter = ui.painter();
				painter.rect_filled(
					screen_rect,
					0.0,
					egui::Color32::from_rgba_unmultiplied(0, 0, 0, 240),
				);

				let content_rect = screen_rect.shrink2(egui::vec2(
					OVERLAY_MARGIN,
					OVERLAY_MARGIN * 2.0 + BAR_HEIGHT,
				));

				// Only the current item is ever drawn
				match media.slot(index) {
					Some(MediaSlot::Ready(_)) => {
						if let Some(texture) = media.texture(index) {
							let rect = fit_rect(texture.size_vec2(), content_rect);
							painter.image(
								texture.id(),
								rect,
								egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
								egui::Color32::WHITE,
							);
						}
						// A clip that refused to start stays on its first frame
						if matches!(player.state(), PlayerState::ShowingVideo(_))
							&& !media.is_clip_playing()
						{
							painter.text(
								content_rect.center(),
								egui::Align2::CENTER_CENTER,
								"⏸",
								egui::FontId::proportional(48.0),
								egui::Color32::from_white_alpha(180),
							);
						}
					}
					Some(MediaSlot::Failed(_)) => {
						painter.text(
							content_rect.center(),
							egui::Align2::CENTER_CENTER,
							"This story could not be loaded",
							egui::FontId::proportional(18.0),
							egui::Color32::LIGHT_GRAY,
						);
					}
					Some(MediaSlot::Loading) | None => {
						let spinner_rect = egui::Rect::from_center_size(
							content_rect.center(),
							egui::vec2(32.0, 32.0),
						);
						ui.put(spinner_rect, egui::Spinner::new().size(32.0));
					}
				}

				if player.progress_visible() {
					Self::paint_progress_bars(ui.painter(), screen_rect, &player.bar_widths());
				}

				let font_size = (screen_rect.height() * 0.02).max(12.0);
				Self::paint_outlined_text(
					ui.painter(),
					egui::pos2(screen_rect.center().x, screen_rect.bottom() - OVERLAY_MARGIN),
					egui::Align2::CENTER_BOTTOM,
					&format!("{} / {}", index + 1, session.len()),
					egui::FontId::proportional(font_size),
					egui::Color32::WHITE,
					(font_size * 0.05).max(1.0),
				);
			});
	}

	fn paint_progress_bars(painter: &egui::Painter, screen_rect: egui::Rect, widths: &[f32]) {
		if widths.is_empty() {
			return;
		}
		let count = widths.len() as f32;
		let row_width = screen_rect.width() - OVERLAY_MARGIN * 2.0;
		let bar_width = ((row_width - BAR_GAP * (count - 1.0)) / count).max(1.0);
		let top = screen_rect.top() + OVERLAY_MARGIN;

		for (i, percent) in widths.iter().enumerate() {
			let left = screen_rect.left() + OVERLAY_MARGIN + i as f32 * (bar_width + BAR_GAP);
			let track = egui::Rect::from_min_size(
				egui::pos2(left, top),
				egui::vec2(bar_width, BAR_HEIGHT),
			);
			painter.rect_filled(track, BAR_HEIGHT * 0.5, egui::Color32::from_white_alpha(70));

			let fill = bar_width * percent.clamp(0.0, 100.0) / 100.0;
			if fill > 0.0 {
				let filled = egui::Rect::from_min_size(track.min, egui::vec2(fill, BAR_HEIGHT));
				painter.rect_filled(filled, BAR_HEIGHT * 0.5, egui::Color32::WHITE);
			}
		}
	}

	fn render_controls(&self, ctx: &egui::Context, events: &mut Vec<Event>) {
		let margin = OVERLAY_MARGIN;
		let button = |text: &str| {
			egui::Button::new(egui::RichText::new(text).size(22.0))
				.fill(egui::Color32::from_black_alpha(120))
				.min_size(egui::vec2(44.0, 44.0))
		};

		egui::Area::new(egui::Id::new("story_close"))
			.anchor(
				egui::Align2::RIGHT_TOP,
				egui::vec2(-margin, margin * 2.0 + BAR_HEIGHT),
			)
			.order(egui::Order::Foreground)
			.show(ctx, |ui| {
				if ui.add(button("✖")).clicked() {
					events.push(Event::Input(InputEvent::CloseButton));
				}
			});

		egui::Area::new(egui::Id::new("story_prev"))
			.anchor(egui::Align2::LEFT_CENTER, egui::vec2(margin, 0.0))
			.order(egui::Order::Foreground)
			.show(ctx, |ui| {
				if ui.add(button("◀")).clicked() {
					events.push(Event::Input(InputEvent::PrevButton));
				}
			});

		egui::Area::new(egui::Id::new("story_next"))
			.anchor(egui::Align2::RIGHT_CENTER, egui::vec2(-margin, 0.0))
			.order(egui::Order::Foreground)
			.show(ctx, |ui| {
				if ui.add(button("▶")).clicked() {
					events.push(Event::Input(InputEvent::NextButton));
				}
			});
	}

	fn paint_outlined_text(
		painter: &egui::Painter,
		pos: egui::Pos2,
		anchor: egui::Align2,
		text: &str,
		font_id: egui::FontId,
		color: egui::Color32,
		stroke_width: f32,
	) {
		let offsets = [
			egui::vec2(-stroke_width, -stroke_width),
			egui::vec2(stroke_width, -stroke_width),
			egui::vec2(-stroke_width, stroke_width),
			egui::vec2(stroke_width, stroke_width),
		];
		let shadow_color = egui::Color32::from_black_alpha(color.a() / 2);

		for offset in offsets {
			painter.text(pos + offset, anchor, text, font_id.clone(), shadow_color);
		}
		painter.text(pos, anchor, text, font_id, color);
	}
}

/// Largest rect with the aspect ratio of `size` that fits centered in `bounds`
fn fit_rect(size: egui::Vec2, bounds: egui::Rect) -> egui::Rect {
	if size.x <= 0.0 || size.y <= 0.0 {
		return bounds;
	}
	let scale = (bounds.width() / size.x).min(bounds.height() / size.y);
	egui::Rect::from_center_size(bounds.center(), size * scale)
}
