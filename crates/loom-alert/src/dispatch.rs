// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Detached execution of capture pipelines.

use std::future::Future;

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tracing::warn;

use crate::guard::Guarded;

/// Handle to a capture running in the background.
///
/// Dropping it does not cancel the capture.
#[derive(Debug)]
pub struct CaptureHandle {
	done: Option<oneshot::Receiver<()>>,
}

impl CaptureHandle {
	/// A handle for a capture that was skipped.
	pub(crate) fn noop() -> Self {
		Self { done: None }
	}

	/// True when the capture was actually dispatched.
	pub fn is_dispatched(&self) -> bool {
		self.done.is_some()
	}

	/// Waits until the capture pipeline has finished, whatever its outcome.
	pub async fn completed(self) {
		if let Some(done) = self.done {
			let _ = done.await;
		}
	}
}

/// Runs `task` on the ambient tokio runtime, or on a dedicated thread with
/// its own current-thread runtime when there is none.
///
/// Panics inside `task` are contained. `task` is polled as a guarded
/// future, so the installed panic hook never reports them.
pub(crate) fn spawn_detached<F>(task: F) -> CaptureHandle
where
	F: Future<Output = ()> + Send + 'static,
{
	let (tx, rx) = oneshot::channel();
	let task = async move {
		if let Err(details) = Guarded::new(task).await {
			if cfg!(debug_assertions) {
				warn!(message = %details.message, "Alert capture pipeline panicked");
			}
		}
		let _ = tx.send(());
	};

	if let Ok(handle) = Handle::try_current() {
		handle.spawn(task);
		return CaptureHandle { done: Some(rx) };
	}

	let spawned = std::thread::Builder::new()
		.name("loom-alert".to_string())
		.spawn(move || match Builder::new_current_thread().enable_all().build() {
			Ok(runtime) => runtime.block_on(task),
			Err(e) => {
				if cfg!(debug_assertions) {
					warn!(error = %e, "Failed to start alert runtime");
				}
			}
		});

	match spawned {
		Ok(_) => CaptureHandle { done: Some(rx) },
		Err(e) => {
			if cfg!(debug_assertions) {
				warn!(error = %e, "Failed to spawn alert thread");
			}
			CaptureHandle::noop()
		}
	}
}
