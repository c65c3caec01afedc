// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error alerting SDK for Loom that relays failures to a Telegram chat.
//!
//! # Features
//!
//! - **Panic and framework hooks**: chained in front of existing handlers
//! - **HTML-safe delivery**: oversized or malformed markup is sent as plain
//!   text, and a markup rejection from Telegram triggers one plain-text resend
//! - **Device context**: platform, OS, device, app, IP, and locale, collected
//!   once and cached
//! - **HTTP failure reporting**: [`HttpErrorInterceptor`] wraps `reqwest`
//! - **Screenshots**: optional, via a host-supplied [`ScreenshotProvider`]
//!
//! # Example
//!
//! ```ignore
//! use loom_alert::{AlertConfig, AlertReporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reporter = AlertReporter::new();
//!     reporter.init(
//!         AlertConfig::builder()
//!             .bot_token("123456:ABC-DEF")
//!             .chat_id("-1001234567890")
//!             .environment("production")
//!             .release("2.4.1"),
//!     )?;
//!
//!     // Panics are now reported automatically.
//!     reporter.capture_message("Service started").completed().await;
//!
//!     let value = reporter.run_guarded(async { risky_work().await }).await;
//!     Ok(())
//! }
//! ```

pub mod backtrace;
mod client;
mod collector;
mod dispatch;
mod error;
pub mod framework;
mod guard;
mod interceptor;
mod panic_hook;
mod reporter;
mod screenshot;

pub use client::{DeliveryGate, DeliveryReceipt, TelegramClient, TextMode};
pub use collector::{ContextCollector, HostProbe, SystemProbe};
pub use dispatch::CaptureHandle;
pub use error::{AlertSdkError, Result};
pub use framework::{report_framework_error, FrameworkError};
pub use guard::Guarded;
pub use interceptor::{HttpErrorInterceptor, StatusPredicate};
pub use panic_hook::{panic_message, PanicDetails};
pub use reporter::{AlertReporter, ReporterOptions};
pub use screenshot::{ScreenshotError, ScreenshotProvider, CAPTURE_TIMEOUT, REDRAW_GRACE};

// Re-export core types for convenience
pub use loom_alert_core::{
	html, template, AlertConfig, AlertConfigBuilder, AppInfo, BotToken, ConfigError,
	DeviceContext, ErrorOrigin, ExceptionReport, HttpErrorReport, ParseErrorRule, ReportHeader,
};

/// Logs a swallowed delivery failure. Silent in release builds.
pub(crate) fn log_delivery_failure(error: &AlertSdkError, message: &str) {
	if cfg!(debug_assertions) {
		tracing::warn!(error = %error, "{}", message);
	}
}
