use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration, read from `config.toml` in the platform config dir
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Story manifest. Without one the player stays disabled.
	pub manifest: Option<PathBuf>,
	pub server_url: String,
	pub image_duration_ms: u64,
	pub tick_interval_ms: u64,
	pub swipe_threshold_px: f32,
	pub request_timeout_ms: u64,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			manifest: None,
			server_url: "http://localhost:5000".to_owned(),
			image_duration_ms: 5000,
			tick_interval_ms: 50,
			swipe_threshold_px: 50.0,
			request_timeout_ms: 10_000,
		}
	}
}

impl Settings {
	pub fn config_path() -> Option<PathBuf> {
		directories::ProjectDirs::from("", "", "qrmenu-stories")
			.map(|dirs| dirs.config_dir().join("config.toml"))
	}

	/// Load settings from the default location, falling back to defaults
	pub fn load() -> Self {
		let Some(path) = Self::config_path() else {
			log::warn!("No config directory available, using defaults");
			return Self::default();
		};
		if !path.exists() {
			log::info!("No config at {}, using defaults", path.display());
			return Self::default();
		}
		match Self::load_from(&path) {
			Ok(settings) => {
				log::info!("Loaded config from {}", path.display());
				settings
			}
			Err(e) => {
				log::error!("Failed to read config {}: {}", path.display(), e);
				Self::default()
			}
		}
	}

	pub fn load_from(path: &Path) -> anyhow::Result<Self> {
		let text = std::fs::read_to_string(path)?;
		let mut settings: Settings = toml::from_str(&text)?;
		if settings.tick_interval_ms == 0 {
			log::warn!("tick_interval_ms must be positive, using 50");
			settings.tick_interval_ms = 50;
		}
		Ok(settings)
	}

	pub fn image_duration(&self) -> Duration {
		Duration::from_millis(self.image_duration_ms)
	}

	pub fn tick_interval(&self) -> Duration {
		Duration::from_millis(self.tick_interval_ms)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_partial_file_merges_with_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(
			&path,
			"manifest = \"/srv/menu/stories.toml\"\nimage_duration_ms = 3000\n",
		)
		.unwrap();

		let settings = Settings::load_from(&path).unwrap();
		assert_eq!(settings.manifest, Some(PathBuf::from("/srv/menu/stories.toml")));
		assert_eq!(settings.image_duration(), Duration::from_secs(3));
		assert_eq!(settings.tick_interval(), Duration::from_millis(50));
		assert_eq!(settings.server_url, "http://localhost:5000");
	}

	#[test]
	fn test_zero_tick_interval_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, "tick_interval_ms = 0\n").unwrap();

		let settings = Settings::load_from(&path).unwrap();
		assert_eq!(settings.tick_interval_ms, 50);
	}

	#[test]
	fn test_malformed_file_errors() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, "image_duration_ms = \"soon\"\n").unwrap();
		assert!(Settings::load_from(&path).is_err());
	}
}
