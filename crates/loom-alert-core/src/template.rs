// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Report templates.
//!
//! Pure functions turning an exception, a message, or a failed HTTP exchange
//! into Telegram HTML. Only the structural markup written here is trusted;
//! every interpolated value goes through [`escape_html`] first.

use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::AlertConfig;
use crate::context::DeviceContext;
use crate::html::{escape_html, truncate_with_marker};

/// Response body budget in the HTTP error template.
pub const HTTP_RESPONSE_BODY_BUDGET: usize = 500;
/// Request body budget in the HTTP error template.
pub const HTTP_REQUEST_BODY_BUDGET: usize = 800;
/// Stack trace budget in the HTTP error template.
pub const HTTP_STACK_TRACE_BUDGET: usize = 600;
/// Stack trace budget in the exception template.
pub const EXCEPTION_STACK_TRACE_BUDGET: usize = 2500;

const EMOJI_EXCEPTION: &str = "🚨";
const EMOJI_PANIC: &str = "💥";
const EMOJI_FRAMEWORK: &str = "🧩";
const EMOJI_MESSAGE: &str = "💬";
const EMOJI_HTTP: &str = "🌐";
const EMOJI_DEVICE: &str = "📱";
const EMOJI_SERVER_ERROR: &str = "🔥";
const EMOJI_CLIENT_ERROR: &str = "⚠️";
const EMOJI_OTHER_ERROR: &str = "❗";

/// Fields shared by every report header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHeader {
	pub environment: Option<String>,
	pub release: Option<String>,
	pub timestamp: DateTime<Utc>,
}

impl ReportHeader {
	/// Header for a report raised now under `config`.
	pub fn from_config(config: &AlertConfig) -> Self {
		Self {
			environment: config.environment().map(str::to_string),
			release: config.release().map(str::to_string),
			timestamp: Utc::now(),
		}
	}
}

/// Where an exception report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
	/// Reported explicitly by host code.
	Manual,
	/// A panic caught by the panic hook or a guarded future.
	Panic,
	/// An error surfaced by the host's UI framework.
	Framework,
}

impl ErrorOrigin {
	/// Human-readable name, e.g. "Panic".
	pub fn label(self) -> &'static str {
		self.title().1
	}

	fn title(self) -> (&'static str, &'static str) {
		match self {
			ErrorOrigin::Manual => (EMOJI_EXCEPTION, "Exception"),
			ErrorOrigin::Panic => (EMOJI_PANIC, "Panic"),
			ErrorOrigin::Framework => (EMOJI_FRAMEWORK, "Framework Error"),
		}
	}
}

/// An error flattened into strings for the exception template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionReport {
	pub origin: ErrorOrigin,
	pub error_type: String,
	pub message: String,
	/// Messages of the `source()` chain, outermost first.
	pub causes: Vec<String>,
	/// Where the error was raised, e.g. `src/main.rs:10:5`.
	pub location: Option<String>,
	/// Free-form description of what the host was doing, e.g. a thread name.
	pub context: Option<String>,
	pub stack_trace: Option<String>,
}

impl ExceptionReport {
	pub fn new(origin: ErrorOrigin, error_type: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			origin,
			error_type: error_type.into(),
			message: message.into(),
			causes: Vec::new(),
			location: None,
			context: None,
			stack_trace: None,
		}
	}

	/// Flattens a `std::error::Error` and its source chain.
	pub fn from_error<E>(origin: ErrorOrigin, error: &E) -> Self
	where
		E: std::error::Error + ?Sized,
	{
		let mut report = Self::new(origin, short_type_name::<E>(), safe_to_string(error));
		let mut source = error.source();
		while let Some(cause) = source {
			report.causes.push(safe_to_string(cause));
			source = cause.source();
		}
		report
	}

	pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
		self.stack_trace = Some(stack_trace.into());
		self
	}

	pub fn with_location(mut self, location: impl Into<String>) -> Self {
		self.location = Some(location.into());
		self
	}

	pub fn with_context(mut self, context: impl Into<String>) -> Self {
		self.context = Some(context.into());
		self
	}
}

/// A failed outbound HTTP exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpErrorReport {
	pub method: String,
	pub url: String,
	/// Absent when no response was received.
	pub status: Option<u16>,
	pub request_body: Option<String>,
	pub response_body: Option<String>,
	/// Description of the transport error, if any.
	pub error: Option<String>,
	pub stack_trace: Option<String>,
}

/// Stringifies `value`, yielding a placeholder if its `Display` impl panics.
pub fn safe_to_string<T>(value: &T) -> String
where
	T: Display + ?Sized,
{
	catch_unwind(AssertUnwindSafe(|| value.to_string()))
		.unwrap_or_else(|_| "<unprintable value>".to_string())
}

fn short_type_name<T: ?Sized>() -> String {
	let full = std::any::type_name::<T>();
	// Keep generic arguments intact, only trim the leading module path.
	match full.find('<') {
		Some(idx) => {
			let (head, tail) = full.split_at(idx);
			format!("{}{}", head.rsplit("::").next().unwrap_or(head), tail)
		}
		None => full.rsplit("::").next().unwrap_or(full).to_string(),
	}
}

/// Emoji shown next to an HTTP status.
pub fn status_emoji(status: Option<u16>) -> &'static str {
	match status {
		Some(s) if s >= 500 => EMOJI_SERVER_ERROR,
		Some(s) if (400..500).contains(&s) => EMOJI_CLIENT_ERROR,
		_ => EMOJI_OTHER_ERROR,
	}
}

fn push_header(out: &mut String, emoji: &str, title: &str, header: &ReportHeader) {
	out.push_str(&format!("{emoji} <b>{title}</b>\n"));
	if let Some(env) = &header.environment {
		out.push_str(&format!("<b>Environment:</b> <code>{}</code>\n", escape_html(env)));
	}
	if let Some(release) = &header.release {
		out.push_str(&format!("<b>Release:</b> <code>{}</code>\n", escape_html(release)));
	}
	out.push_str(&format!(
		"<b>Time:</b> <code>{}</code>\n",
		header.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
	));
}

fn push_block(out: &mut String, label: &str, content: &str) {
	out.push_str(&format!("\n<b>{label}:</b>\n<pre>{}</pre>\n", escape_html(content)));
}

fn push_device(out: &mut String, context: Option<&DeviceContext>) {
	let Some(context) = context else {
		return;
	};
	let fields = context.fields();
	if fields.is_empty() {
		return;
	}

	out.push_str(&format!("\n{EMOJI_DEVICE} <b>Device</b>\n"));
	for (label, value) in fields {
		out.push_str(&format!("<b>{label}:</b> {}\n", escape_html(value)));
	}
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Renders an exception report.
pub fn format_exception_report(
	report: &ExceptionReport,
	header: &ReportHeader,
	context: Option<&DeviceContext>,
) -> String {
	let (emoji, title) = report.origin.title();
	let mut out = String::new();
	push_header(&mut out, emoji, title, header);

	out.push_str(&format!(
		"\n<b>Type:</b> <code>{}</code>\n",
		escape_html(&report.error_type)
	));
	if let Some(location) = non_empty(&report.location) {
		out.push_str(&format!("<b>Location:</b> <code>{}</code>\n", escape_html(location)));
	}
	if let Some(ctx) = non_empty(&report.context) {
		out.push_str(&format!("<b>Context:</b> {}\n", escape_html(ctx)));
	}

	push_block(&mut out, "Message", &report.message);

	if !report.causes.is_empty() {
		let causes = report
			.causes
			.iter()
			.enumerate()
			.map(|(i, cause)| format!("{}. {}", i + 1, cause))
			.collect::<Vec<_>>()
			.join("\n");
		push_block(&mut out, "Caused by", &causes);
	}

	if let Some(stack) = non_empty(&report.stack_trace) {
		push_block(
			&mut out,
			"Stack trace",
			&truncate_with_marker(stack.trim_end(), EXCEPTION_STACK_TRACE_BUDGET),
		);
	}

	push_device(&mut out, context);
	out.trim_end().to_string()
}

/// Renders a plain message report.
pub fn format_message_report(
	message: &str,
	header: &ReportHeader,
	context: Option<&DeviceContext>,
) -> String {
	let mut out = String::new();
	push_header(&mut out, EMOJI_MESSAGE, "Message", header);
	out.push_str(&format!("\n{}\n", escape_html(message)));
	push_device(&mut out, context);
	out.trim_end().to_string()
}

/// Renders a failed HTTP exchange.
pub fn format_http_error_report(
	report: &HttpErrorReport,
	header: &ReportHeader,
	context: Option<&DeviceContext>,
) -> String {
	let mut out = String::new();
	let title = format!("HTTP Error {}", status_emoji(report.status));
	push_header(&mut out, EMOJI_HTTP, &title, header);

	out.push_str(&format!(
		"\n<b>Request:</b> <code>{} {}</code>\n",
		escape_html(&report.method.to_uppercase()),
		escape_html(&report.url)
	));
	match report.status {
		Some(status) => out.push_str(&format!("<b>Status:</b> <code>{status}</code>\n")),
		None => out.push_str("<b>Status:</b> <i>no response</i>\n"),
	}

	if let Some(error) = non_empty(&report.error) {
		push_block(&mut out, "Error", error);
	}
	if let Some(body) = non_empty(&report.request_body) {
		push_block(
			&mut out,
			"Request body",
			&truncate_with_marker(body, HTTP_REQUEST_BODY_BUDGET),
		);
	}
	if let Some(body) = non_empty(&report.response_body) {
		push_block(
			&mut out,
			"Response body",
			&truncate_with_marker(body, HTTP_RESPONSE_BODY_BUDGET),
		);
	}
	if let Some(stack) = non_empty(&report.stack_trace) {
		push_block(
			&mut out,
			"Stack trace",
			&truncate_with_marker(stack.trim_end(), HTTP_STACK_TRACE_BUDGET),
		);
	}

	push_device(&mut out, context);
	out.trim_end().to_string()
}
