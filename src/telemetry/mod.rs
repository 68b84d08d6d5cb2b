use crate::api::QrMenuClient;
use crate::reactor::{ComponentResponse, Event, TelemetryEvent};
use std::sync::Arc;

/// Best-effort view counter. Requests are detached and their outcome only logged.
pub struct ViewReporter {
	client: Option<Arc<QrMenuClient>>,
	sent: u64,
}

impl ViewReporter {
	pub fn new(client: Option<Arc<QrMenuClient>>) -> Self {
		if client.is_none() {
			log::warn!("[Telemetry] No HTTP client, view reports disabled");
		}
		Self { client, sent: 0 }
	}

	pub fn handle(&mut self, event: &Event) -> ComponentResponse {
		if let Event::Telemetry(TelemetryEvent::IncrementView { story_id }) = event {
			if story_id.is_empty() {
				return ComponentResponse::none();
			}
			if let Some(client) = &self.client {
				self.sent += 1;
				log::debug!("[Telemetry] IncrementView {} (#{})", story_id, self.sent);
				Self::spawn_increment(client.clone(), story_id.clone());
			}
		}
		ComponentResponse::none()
	}

	fn spawn_increment(client: Arc<QrMenuClient>, story_id: String) {
		tokio::spawn(async move {
			match client.increment_view(&story_id).await {
				Ok(()) => log::trace!("[Telemetry] View counted for {}", story_id),
				Err(e) => log::debug!("[Telemetry] View report for {} failed: {}", story_id, e),
			}
		});
	}

	/// Number of reports handed to the network so far
	#[cfg(test)]
	pub fn sent(&self) -> u64 {
		self.sent
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn test_failed_report_is_swallowed() {
		// Nothing listens on port 9 (discard); the request fails in the background
		let client = QrMenuClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
		let mut reporter = ViewReporter::new(Some(Arc::new(client)));

		let response = reporter.handle(&Event::Telemetry(TelemetryEvent::IncrementView {
			story_id: "5".into(),
		}));
		assert!(response.is_empty());
		assert_eq!(reporter.sent(), 1);

		tokio::time::sleep(Duration::from_millis(300)).await;
	}

	#[test]
	fn test_disabled_reporter_sends_nothing() {
		let mut reporter = ViewReporter::new(None);
		reporter.handle(&Event::Telemetry(TelemetryEvent::IncrementView {
			story_id: "5".into(),
		}));
		assert_eq!(reporter.sent(), 0);
	}

	#[test]
	fn test_empty_id_is_not_sent() {
		let client = QrMenuClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
		let mut reporter = ViewReporter::new(Some(Arc::new(client)));
		reporter.handle(&Event::Telemetry(TelemetryEvent::IncrementView {
			story_id: String::new(),
		}));
		assert_eq!(reporter.sent(), 0);
	}
}
