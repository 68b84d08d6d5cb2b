use serde::{Deserialize, Serialize};

/// Kind of media a story plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
	Image,
	Video,
}

impl MediaKind {
	/// Guess the kind from a file extension. Animated formats count as clips.
	pub fn from_extension(ext: &str) -> Self {
		match ext.to_lowercase().as_str() {
			"mp4" | "webm" | "mov" | "gif" | "webp" => MediaKind::Video,
			_ => MediaKind::Image,
		}
	}
}

/// Navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
	Next,
	Prev,
}

impl NavDirection {
	/// Step `index` one slot in this direction, wrapping within `len`
	pub fn step(self, index: usize, len: usize) -> usize {
		if len == 0 {
			return 0;
		}
		match self {
			NavDirection::Next => (index + 1) % len,
			NavDirection::Prev => (index + len - 1) % len,
		}
	}
}

/// Player state as seen from the outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
	Closed,
	ShowingImage(usize),
	ShowingVideo(usize),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_step_wraps_both_ways() {
		assert_eq!(NavDirection::Next.step(2, 3), 0);
		assert_eq!(NavDirection::Prev.step(0, 3), 2);
		assert_eq!(NavDirection::Next.step(0, 1), 0);
		assert_eq!(NavDirection::Prev.step(0, 1), 0);
	}

	#[test]
	fn test_kind_from_extension() {
		assert_eq!(MediaKind::from_extension("PNG"), MediaKind::Image);
		assert_eq!(MediaKind::from_extension("jpg"), MediaKind::Image);
		assert_eq!(MediaKind::from_extension("gif"), MediaKind::Video);
		assert_eq!(MediaKind::from_extension("mp4"), MediaKind::Video);
	}
}
