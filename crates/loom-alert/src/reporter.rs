// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The alert reporter facade.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use loom_alert_core::template::{
	format_exception_report, format_http_error_report, format_message_report, safe_to_string,
};
use loom_alert_core::{
	AlertConfig, AlertConfigBuilder, DeviceContext, ErrorOrigin, ExceptionReport, HttpErrorReport,
	ReportHeader,
};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::client::TelegramClient;
use crate::collector::{ContextCollector, SystemProbe};
use crate::dispatch::{spawn_detached, CaptureHandle};
use crate::error::Result;
use crate::framework::{self, FrameworkError};
use crate::guard::Guarded;
use crate::interceptor::report_from_exchange;
use crate::panic_hook::{install_panic_hook, PanicDetails};
use crate::screenshot::{capture_screenshot, ScreenshotProvider};

/// Options fixed when a reporter is constructed.
#[derive(Clone)]
pub struct ReporterOptions {
	/// Install the panic and framework hooks on first `init`.
	pub install_hooks: bool,
	/// Source of device context; defaults to the running host.
	pub probe: Option<Arc<dyn SystemProbe>>,
}

impl Default for ReporterOptions {
	fn default() -> Self {
		Self {
			install_hooks: true,
			probe: None,
		}
	}
}

struct ReporterState {
	config: AlertConfig,
	client: TelegramClient,
}

struct ReporterInner {
	state: RwLock<Option<Arc<ReporterState>>>,
	collector: ContextCollector,
	screenshot_provider: RwLock<Option<Arc<dyn ScreenshotProvider>>>,
	install_hooks: bool,
	hooks_installed: Once,
}

/// Captures errors and relays them to a Telegram chat.
///
/// Every capture operation is a no-op until [`init`](Self::init) succeeds.
/// Captures run in the background; the returned [`CaptureHandle`] may be
/// dropped or awaited.
///
/// # Example
///
/// ```ignore
/// use loom_alert::{AlertConfig, AlertReporter};
///
/// let reporter = AlertReporter::new();
/// reporter.init(
///     AlertConfig::builder()
///         .bot_token(std::env::var("TELEGRAM_BOT_TOKEN")?)
///         .chat_id("-1001234567890")
///         .environment("production"),
/// )?;
///
/// reporter.capture_message("Deploy finished");
/// ```
#[derive(Clone)]
pub struct AlertReporter {
	inner: Arc<ReporterInner>,
}

impl AlertReporter {
	pub fn new() -> Self {
		Self::with_options(ReporterOptions::default())
	}

	pub fn with_options(options: ReporterOptions) -> Self {
		let collector = match options.probe {
			Some(probe) => ContextCollector::with_probe(probe),
			None => ContextCollector::new(),
		};

		Self {
			inner: Arc::new(ReporterInner {
				state: RwLock::new(None),
				collector,
				screenshot_provider: RwLock::new(None),
				install_hooks: options.install_hooks,
				hooks_installed: Once::new(),
			}),
		}
	}

	/// Validates `builder`, replaces the active configuration and, the first
	/// time, installs the panic and framework hooks.
	///
	/// On error the previous state is left untouched.
	pub fn init(&self, builder: AlertConfigBuilder) -> Result<()> {
		let config = builder.build()?;
		let client = TelegramClient::new(&config)?;

		self.inner
			.collector
			.reconfigure(config.app().clone(), config.ip_lookup_url());

		info!(
			chat_id = %config.chat_id(),
			environment = config.environment().unwrap_or("unset"),
			enabled = client.gate().allows_delivery(),
			"Alert reporter initialized"
		);

		*self.inner.state.write() = Some(Arc::new(ReporterState { config, client }));

		if self.inner.install_hooks {
			self.inner.hooks_installed.call_once(|| {
				install_panic_hook(self.clone());
				self.install_framework_hook();
				debug!("Alert hooks installed");
			});
		}

		Ok(())
	}

	pub fn is_initialized(&self) -> bool {
		self.inner.state.read().is_some()
	}

	/// The active configuration, if initialized.
	pub fn config(&self) -> Option<AlertConfig> {
		self.state().map(|state| state.config.clone())
	}

	/// Registers the screenshot source used by hook-triggered reports.
	pub fn set_screenshot_provider(&self, provider: Arc<dyn ScreenshotProvider>) {
		*self.inner.screenshot_provider.write() = Some(provider);
	}

	/// Reports an exception.
	pub fn capture_exception(&self, report: ExceptionReport) -> CaptureHandle {
		self.dispatch(false, move |header, context| {
			format_exception_report(&report, header, context)
		})
	}

	/// Reports a `std::error::Error` and its source chain, with an optional
	/// stack trace.
	pub fn capture_error<E>(&self, error: &E, stack_trace: Option<String>) -> CaptureHandle
	where
		E: std::error::Error + ?Sized,
	{
		if !self.is_initialized() {
			return CaptureHandle::noop();
		}
		let mut report = ExceptionReport::from_error(ErrorOrigin::Manual, error);
		report.stack_trace = stack_trace;
		self.capture_exception(report)
	}

	/// Reports a free-form message.
	pub fn capture_message(&self, message: impl Into<String>) -> CaptureHandle {
		let message = message.into();
		self.dispatch(false, move |header, context| {
			format_message_report(&message, header, context)
		})
	}

	/// Reports a failed HTTP exchange.
	pub fn capture_http_error(&self, report: HttpErrorReport) -> CaptureHandle {
		self.dispatch(false, move |header, context| {
			format_http_error_report(&report, header, context)
		})
	}

	/// Reports a failed HTTP exchange given as `http` request and response.
	///
	/// Without `error` the status reason phrase is reported as the error.
	pub fn capture_http_error_from_response<Req, Res>(
		&self,
		request: &http::Request<Req>,
		response: &http::Response<Res>,
		error: Option<&(dyn std::error::Error + '_)>,
		stack_trace: Option<String>,
	) -> CaptureHandle
	where
		Req: AsRef<[u8]>,
		Res: AsRef<[u8]>,
	{
		if !self.is_initialized() {
			return CaptureHandle::noop();
		}
		let mut report = report_from_exchange(request, response);
		if let Some(error) = error {
			report.error = Some(safe_to_string(error));
		}
		report.stack_trace = stack_trace;
		self.capture_http_error(report)
	}

	/// Reports a panic. Used by the panic hook and [`run_guarded`](Self::run_guarded).
	pub fn capture_panic(&self, details: PanicDetails) -> CaptureHandle {
		let mut report = ExceptionReport::new(ErrorOrigin::Panic, "panic", details.message);
		report.location = details.location;
		report.stack_trace = details.stack_trace;
		report.context = details.thread.map(|name| format!("thread '{name}'"));

		self.dispatch(true, move |header, context| {
			format_exception_report(&report, header, context)
		})
	}

	/// Reports an error caught by a UI framework.
	pub fn capture_framework_error(&self, error: &FrameworkError) -> CaptureHandle {
		let mut report = ExceptionReport::new(
			ErrorOrigin::Framework,
			error.error_type.clone(),
			error.message.clone(),
		);
		report.stack_trace = error.stack_trace.clone();
		report.context = match (&error.library, &error.context) {
			(Some(library), Some(context)) => Some(format!("{library}: {context}")),
			(Some(library), None) => Some(library.clone()),
			(None, context) => context.clone(),
		};

		self.dispatch(true, move |header, context| {
			format_exception_report(&report, header, context)
		})
	}

	/// Runs `future`, reporting a panic inside it instead of unwinding.
	///
	/// Returns `None` when the future panicked. The report is dispatched in
	/// the background.
	pub async fn run_guarded<F>(&self, future: F) -> Option<F::Output>
	where
		F: Future,
	{
		match Guarded::new(future).await {
			Ok(output) => Some(output),
			Err(details) => {
				debug!(message = %details.message, "Guarded future panicked");
				self.capture_panic(details);
				None
			}
		}
	}

	fn state(&self) -> Option<Arc<ReporterState>> {
		self.inner.state.read().clone()
	}

	fn install_framework_hook(&self) {
		let previous = framework::take_framework_hook();
		let reporter = self.clone();

		framework::set_framework_hook(Arc::new(move |error: &FrameworkError| {
			let _ = panic::catch_unwind(AssertUnwindSafe(|| {
				reporter.capture_framework_error(error);
			}));
			previous(error);
		}));
	}

	/// Formats and sends one report in the background.
	fn dispatch<F>(&self, with_screenshot: bool, render: F) -> CaptureHandle
	where
		F: FnOnce(&ReportHeader, Option<&DeviceContext>) -> String + Send + 'static,
	{
		let Some(state) = self.state() else {
			return CaptureHandle::noop();
		};
		if !state.client.gate().allows_delivery() {
			return CaptureHandle::noop();
		}
		let inner = Arc::clone(&self.inner);

		spawn_detached(async move {
			let config = &state.config;
			let context = if config.include_device_context() {
				inner.collector.collect(config.include_ip()).await
			} else {
				None
			};

			let header = ReportHeader::from_config(config);
			let text = render(&header, context.as_deref());
			state.client.send(&text).await;

			if !(with_screenshot && config.attach_screenshot()) {
				return;
			}
			let provider = inner.screenshot_provider.read().clone();
			if let Some(provider) = provider {
				if let Some(png) = capture_screenshot(provider.as_ref()).await {
					state.client.send_photo(png, Some(&text)).await;
				}
			}
		})
	}
}

impl Default for AlertReporter {
	fn default() -> Self {
		Self::new()
	}
}
