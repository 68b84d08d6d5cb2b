#![windows_subsystem = "windows"]

mod api;
mod input;
mod media;
mod player;
mod reactor;
mod settings;
mod telemetry;
mod types;
mod view;

use reactor::Reactor;
use settings::Settings;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> eframe::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let mut settings = Settings::load();
	if let Some(manifest) = std::env::args_os().nth(1) {
		settings.manifest = Some(PathBuf::from(manifest));
	}

	let native_options = eframe::NativeOptions {
		viewport: eframe::egui::ViewportBuilder::default()
			.with_inner_size([420.0, 760.0])
			.with_title("QrMenu Stories"),
		..Default::default()
	};

	eframe::run_native(
		"QrMenu Stories",
		native_options,
		Box::new(move |cc| Ok(Box::new(Reactor::new(&cc.egui_ctx, &settings)))),
	)
}
