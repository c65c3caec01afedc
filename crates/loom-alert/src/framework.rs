// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-wide hook for errors surfaced by a UI or application framework.
//!
//! Frameworks that catch errors themselves (render failures, widget
//! callbacks, request handlers) call [`report_framework_error`]. Handlers
//! are registered with [`set_framework_hook`] and, like `std::panic`
//! hooks, are expected to chain to whatever [`take_framework_hook`]
//! returned before them.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;

/// An error caught by a framework rather than by the Rust runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameworkError {
	/// Framework or library that caught the error.
	pub library: Option<String>,
	pub error_type: String,
	pub message: String,
	/// What the framework was doing, e.g. "while rendering SettingsPage".
	pub context: Option<String>,
	pub stack_trace: Option<String>,
}

impl FrameworkError {
	pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error_type: error_type.into(),
			message: message.into(),
			..Default::default()
		}
	}

	/// Builds a framework error from any [`std::error::Error`].
	pub fn from_error<E>(error: &E) -> Self
	where
		E: std::error::Error + ?Sized,
	{
		let report = loom_alert_core::ExceptionReport::from_error(loom_alert_core::ErrorOrigin::Framework, error);
		Self::new(report.error_type, report.message)
	}

	pub fn with_library(mut self, library: impl Into<String>) -> Self {
		self.library = Some(library.into());
		self
	}

	pub fn with_context(mut self, context: impl Into<String>) -> Self {
		self.context = Some(context.into());
		self
	}

	pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
		self.stack_trace = Some(stack_trace.into());
		self
	}
}

impl fmt::Display for FrameworkError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.error_type, self.message)
	}
}

/// A registered framework error handler.
pub type FrameworkHook = Arc<dyn Fn(&FrameworkError) + Send + Sync>;

static HOOK: RwLock<Option<FrameworkHook>> = RwLock::new(None);

/// Registers `hook`, replacing the current one.
pub fn set_framework_hook(hook: FrameworkHook) {
	*HOOK.write() = Some(hook);
}

/// Unregisters the current hook and returns it, or the default logging
/// hook when none was registered.
pub fn take_framework_hook() -> FrameworkHook {
	HOOK.write().take().unwrap_or_else(default_hook)
}

/// Hands `error` to the registered hook.
pub fn report_framework_error(error: &FrameworkError) {
	let hook = HOOK.read().clone().unwrap_or_else(default_hook);
	hook(error);
}

fn default_hook() -> FrameworkHook {
	Arc::new(|error: &FrameworkError| {
		error!(
			library = error.library.as_deref().unwrap_or("unknown"),
			error_type = %error.error_type,
			context = error.context.as_deref().unwrap_or(""),
			"{}",
			error.message
		);
	})
}
