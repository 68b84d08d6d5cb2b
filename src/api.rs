use crate::types::MediaKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a story's media lives
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
	File(PathBuf),
	Remote(String),
}

impl MediaSource {
	fn resolve(raw: &str, base_dir: &Path) -> Self {
		if raw.starts_with("http://") || raw.starts_with("https://") {
			MediaSource::Remote(raw.to_owned())
		} else {
			MediaSource::File(base_dir.join(raw))
		}
	}

	fn extension(&self) -> String {
		let name = match self {
			MediaSource::File(path) => path.to_string_lossy().into_owned(),
			MediaSource::Remote(url) => {
				url.split(['?', '#']).next().unwrap_or_default().to_owned()
			}
		};
		Path::new(&name)
			.extension()
			.map(|e| e.to_string_lossy().into_owned())
			.unwrap_or_default()
	}
}

impl std::fmt::Display for MediaSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			MediaSource::File(path) => write!(f, "{}", path.display()),
			MediaSource::Remote(url) => f.write_str(url),
		}
	}
}

/// One playable story
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
	pub kind: MediaKind,
	pub source: MediaSource,
	/// Id used for view reporting. `None` means the story is never reported.
	pub story_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
	kind: Option<MediaKind>,
	source: String,
	#[serde(default, alias = "id")]
	story_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ManifestFile {
	#[serde(default)]
	stories: Vec<ManifestEntry>,
}

/// Ordered list of stories, read from a TOML or JSON manifest
pub struct StoryManifest {
	path: PathBuf,
}

impl StoryManifest {
	pub fn new(path: PathBuf) -> Self {
		Self { path }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Read the manifest from disk. Entries keep their file order.
	pub fn load(&self) -> anyhow::Result<Vec<Story>> {
		let text = std::fs::read_to_string(&self.path)?;
		let is_json = self
			.path
			.extension()
			.is_some_and(|e| e.eq_ignore_ascii_case("json"));
		let base_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
		parse_manifest(&text, is_json, base_dir)
	}
}

fn parse_manifest(text: &str, is_json: bool, base_dir: &Path) -> anyhow::Result<Vec<Story>> {
	let file: ManifestFile = if is_json {
		serde_json::from_str(text)?
	} else {
		toml::from_str(text)?
	};

	let stories = file
		.stories
		.into_iter()
		.map(|entry| {
			let source = MediaSource::resolve(&entry.source, base_dir);
			let kind = entry
				.kind
				.unwrap_or_else(|| MediaKind::from_extension(&source.extension()));
			let story_id = entry
				.story_id
				.map(|id| id.trim().to_owned())
				.filter(|id| !id.is_empty());
			Story {
				kind,
				source,
				story_id,
			}
		})
		.collect();

	Ok(stories)
}

pub struct QrMenuClient {
	client: reqwest::Client,
	base_url: String,
}

impl QrMenuClient {
	pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
		let client = reqwest::Client::builder()
			.user_agent("QrMenuStories/0.1")
			.timeout(timeout)
			.build()?;
		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_owned(),
		})
	}

	pub fn increment_view_url(&self, story_id: &str) -> String {
		format!("{}/Story/IncrementView/{}", self.base_url, story_id)
	}

	/// POST a view increment. The response body is never read.
	pub async fn increment_view(&self, story_id: &str) -> anyhow::Result<()> {
		let url = self.increment_view_url(story_id);
		let response = self.client.post(&url).send().await?;

		let status = response.status();
		if !status.is_success() {
			anyhow::bail!("HTTP {}: {}", status.as_u16(), url);
		}
		Ok(())
	}

	/// Download a remote media file
	pub async fn fetch_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
		let response = self.client.get(url).send().await?;
		if !response.status().is_success() {
			anyhow::bail!("HTTP Status: {}", response.status());
		}
		Ok(response.bytes().await?.to_vec())
	}
}
