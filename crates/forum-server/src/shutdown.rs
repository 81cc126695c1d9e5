//! Shutdown signalling between the accept loop, open connections and the caller.

use tokio::sync::broadcast;

#[derive(Clone)]
pub struct ShutdownCoordinator {
	tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
	pub fn new() -> Self {
		let (tx, _) = broadcast::channel(4);
		Self { tx }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<()> {
		self.tx.subscribe()
	}

	/// Ask every subscriber to stop
	pub fn shutdown(&self) {
		// No receivers just means nothing is running yet
		let _ = self.tx.send(());
	}

	/// Trigger shutdown on Ctrl-C
	pub fn shutdown_on_ctrl_c(&self) {
		let coordinator = self.clone();
		tokio::spawn(async move {
			match tokio::signal::ctrl_c().await {
				Ok(()) => {
					tracing::info!("received Ctrl-C, shutting down");
					coordinator.shutdown();
				}
				Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl-C"),
			}
		});
	}
}

impl Default for ShutdownCoordinator {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_all_subscribers_notified() {
		let coordinator = ShutdownCoordinator::new();
		let mut first = coordinator.subscribe();
		let mut second = coordinator.subscribe();

		coordinator.shutdown();

		assert!(first.recv().await.is_ok());
		assert!(second.recv().await.is_ok());
	}

	#[rstest]
	fn test_shutdown_without_subscribers_is_harmless() {
		ShutdownCoordinator::new().shutdown();
	}
}
