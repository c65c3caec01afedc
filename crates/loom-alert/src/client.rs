// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Telegram Bot API delivery client.

use std::sync::Arc;
use std::time::Duration;

use loom_alert_core::html::{self, MAX_CAPTION_CHARS, MAX_MESSAGE_CHARS};
use loom_alert_core::{AlertConfig, BotToken, ParseErrorRule};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{AlertSdkError, Result};

/// Timeout for `sendMessage` requests.
const TEXT_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for `sendPhoto` uploads.
const PHOTO_TIMEOUT: Duration = Duration::from_secs(15);
/// File name given to uploaded screenshots.
const PHOTO_FILE_NAME: &str = "screenshot.png";

/// Decides whether anything may be sent at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryGate {
	pub enabled: bool,
	pub send_in_debug: bool,
	/// Whether the host was compiled with debug assertions.
	pub debug_build: bool,
}

impl DeliveryGate {
	pub fn from_config(config: &AlertConfig) -> Self {
		Self {
			enabled: config.enabled(),
			send_in_debug: config.send_in_debug(),
			debug_build: cfg!(debug_assertions),
		}
	}

	pub fn allows_delivery(&self) -> bool {
		self.enabled && (!self.debug_build || self.send_in_debug)
	}
}

/// How a message ended up being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
	/// `parse_mode=HTML`.
	Html,
	/// No parse mode; markup stripped.
	Plain,
}

/// Outcome of a successful [`TelegramClient::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
	pub mode: TextMode,
	/// True when the HTML attempt was rejected and the plain-text resend succeeded.
	pub fell_back: bool,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
	chat_id: &'a str,
	text: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	parse_mode: Option<&'static str>,
	disable_web_page_preview: bool,
}

struct TelegramClientInner {
	http_client: Client,
	base_url: String,
	bot_token: BotToken,
	chat_id: String,
	gate: DeliveryGate,
	parse_error_rule: ParseErrorRule,
}

/// Sends report text and screenshots to one Telegram chat.
///
/// [`send`](Self::send) and [`send_photo`](Self::send_photo) never fail:
/// errors are logged in debug builds and otherwise dropped.
/// [`deliver`](Self::deliver) and [`deliver_photo`](Self::deliver_photo)
/// expose the outcome.
///
/// # Example
///
/// ```ignore
/// let client = TelegramClient::new(&config)?;
/// client.send("<b>Deploy finished</b>").await;
/// ```
#[derive(Clone)]
pub struct TelegramClient {
	inner: Arc<TelegramClientInner>,
}

impl TelegramClient {
	/// Creates a client whose gate follows `config` and the current build flavour.
	pub fn new(config: &AlertConfig) -> Result<Self> {
		Self::with_gate(config, DeliveryGate::from_config(config))
	}

	/// Creates a client with an explicit delivery gate.
	pub fn with_gate(config: &AlertConfig, gate: DeliveryGate) -> Result<Self> {
		let http_client = loom_common_http::builder().build()?;

		Ok(Self {
			inner: Arc::new(TelegramClientInner {
				http_client,
				base_url: config.api_base_url().to_string(),
				bot_token: config.bot_token().clone(),
				chat_id: config.chat_id().to_string(),
				gate,
				parse_error_rule: config.parse_error_rule().clone(),
			}),
		})
	}

	pub fn gate(&self) -> DeliveryGate {
		self.inner.gate
	}

	/// Sends `text`, swallowing every failure.
	pub async fn send(&self, text: &str) {
		match self.deliver(text).await {
			Ok(receipt) => debug!(
				mode = ?receipt.mode,
				fell_back = receipt.fell_back,
				"Alert delivered"
			),
			Err(AlertSdkError::Disabled) => trace!("Alert delivery disabled, skipping message"),
			Err(e) => crate::log_delivery_failure(&e, "Failed to deliver alert message"),
		}
	}

	/// Uploads a PNG screenshot, swallowing every failure.
	pub async fn send_photo(&self, photo: Vec<u8>, caption: Option<&str>) {
		match self.deliver_photo(photo, caption).await {
			Ok(()) => debug!("Alert screenshot delivered"),
			Err(AlertSdkError::Disabled) => trace!("Alert delivery disabled, skipping screenshot"),
			Err(e) => crate::log_delivery_failure(&e, "Failed to deliver alert screenshot"),
		}
	}

	/// Sends `text` and reports the outcome.
	///
	/// Text that is too long or has unbalanced `pre`/`code`/`b` tags goes out
	/// as plain text straight away. Otherwise it is sent as HTML, and a
	/// markup rejection triggers exactly one plain-text resend.
	pub async fn deliver(&self, text: &str) -> Result<DeliveryReceipt> {
		if !self.inner.gate.allows_delivery() {
			return Err(AlertSdkError::Disabled);
		}

		if !html::is_html_safe(text) {
			debug!(
				chars = text.chars().count(),
				"Alert text is not HTML-safe, sending as plain text"
			);
			let plain = html::to_plain_text(text, MAX_MESSAGE_CHARS);
			let response = self.post_message(&plain, TextMode::Plain).await?;
			ensure_success(response).await?;
			return Ok(DeliveryReceipt {
				mode: TextMode::Plain,
				fell_back: false,
			});
		}

		let response = self.post_message(text, TextMode::Html).await?;
		let status = response.status();
		if status.is_success() {
			return Ok(DeliveryReceipt {
				mode: TextMode::Html,
				fell_back: false,
			});
		}

		let status = status.as_u16();
		let body = response.text().await.unwrap_or_default();
		if !self.inner.parse_error_rule.matches(status, &body) {
			return Err(AlertSdkError::ServerError {
				status,
				message: body,
			});
		}

		debug!(status, "Telegram rejected alert markup, resending as plain text");
		let plain = html::to_plain_text(text, MAX_MESSAGE_CHARS);
		let response = self.post_message(&plain, TextMode::Plain).await?;
		ensure_success(response).await?;

		Ok(DeliveryReceipt {
			mode: TextMode::Plain,
			fell_back: true,
		})
	}

	/// Uploads a PNG screenshot with an optional caption.
	///
	/// The caption is always stripped of markup and cut to 1024 characters.
	pub async fn deliver_photo(&self, photo: Vec<u8>, caption: Option<&str>) -> Result<()> {
		if !self.inner.gate.allows_delivery() {
			return Err(AlertSdkError::Disabled);
		}

		let part = Part::bytes(photo)
			.file_name(PHOTO_FILE_NAME)
			.mime_str("image/png")?;
		let mut form = Form::new()
			.text("chat_id", self.inner.chat_id.clone())
			.text("disable_notification", "true")
			.part("photo", part);
		if let Some(caption) = caption
			.map(|c| html::to_plain_text(c, MAX_CAPTION_CHARS))
			.filter(|c| !c.trim().is_empty())
		{
			form = form.text("caption", caption);
		}

		let response = self
			.inner
			.http_client
			.post(self.method_url("sendPhoto"))
			.timeout(PHOTO_TIMEOUT)
			.multipart(form)
			.send()
			.await?;

		ensure_success(response).await
	}

	async fn post_message(&self, text: &str, mode: TextMode) -> Result<Response> {
		let request = SendMessageRequest {
			chat_id: &self.inner.chat_id,
			text,
			parse_mode: match mode {
				TextMode::Html => Some("HTML"),
				TextMode::Plain => None,
			},
			disable_web_page_preview: true,
		};

		trace!(mode = ?mode, chars = text.chars().count(), "Posting sendMessage");

		let response = self
			.inner
			.http_client
			.post(self.method_url("sendMessage"))
			.timeout(TEXT_TIMEOUT)
			.json(&request)
			.send()
			.await?;

		Ok(response)
	}

	fn method_url(&self, method: &str) -> String {
		format!(
			"{}/bot{}/{}",
			self.inner.base_url,
			self.inner.bot_token.expose(),
			method
		)
	}
}

async fn ensure_success(response: Response) -> Result<()> {
	if response.status().is_success() {
		return Ok(());
	}

	let status = response.status().as_u16();
	let message = response.text().await.unwrap_or_default();
	Err(AlertSdkError::ServerError { status, message })
}
