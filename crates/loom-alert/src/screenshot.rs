// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Optional screenshot attachment for hook-triggered reports.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, trace};

use crate::panic_hook;

/// Wait applied before capturing while a redraw is pending.
pub const REDRAW_GRACE: Duration = Duration::from_millis(250);

/// Budget for one capture attempt.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(3);

/// Error type returned by screenshot providers.
pub type ScreenshotError = Box<dyn std::error::Error + Send + Sync>;

/// Produces PNG screenshots of the host application's UI.
#[async_trait]
pub trait ScreenshotProvider: Send + Sync {
	/// Captures the current frame as PNG bytes.
	async fn capture(&self) -> Result<Vec<u8>, ScreenshotError>;

	/// True while a frame is still being drawn.
	fn redraw_pending(&self) -> bool {
		false
	}
}

/// Attempts one capture. Every failure, panic, timeout, or empty image
/// yields `None`.
pub(crate) async fn capture_screenshot(provider: &dyn ScreenshotProvider) -> Option<Vec<u8>> {
	let attempt = AssertUnwindSafe(attempt_capture(provider)).catch_unwind().await;
	match attempt {
		Ok(png) => png,
		Err(payload) => {
			// Details the hook recorded for this panic are stale once it is caught here.
			panic_hook::take_deferred();
			debug!(
				message = %panic_hook::panic_message(payload.as_ref()),
				"Screenshot provider panicked"
			);
			None
		}
	}
}

async fn attempt_capture(provider: &dyn ScreenshotProvider) -> Option<Vec<u8>> {
	if provider.redraw_pending() {
		trace!("Redraw pending, delaying screenshot");
		tokio::time::sleep(REDRAW_GRACE).await;
	}

	match tokio::time::timeout(CAPTURE_TIMEOUT, provider.capture()).await {
		Ok(Ok(png)) if !png.is_empty() => Some(png),
		Ok(Ok(_)) => {
			debug!("Screenshot provider returned an empty image");
			None
		}
		Ok(Err(e)) => {
			debug!(error = %e, "Screenshot capture failed");
			None
		}
		Err(_) => {
			debug!(timeout_ms = CAPTURE_TIMEOUT.as_millis() as u64, "Screenshot capture timed out");
			None
		}
	}
}
