// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Alert configuration: a mutable builder validated into an immutable snapshot.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ConfigError, Result};

/// Base URL of the public Telegram Bot API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Plain-text "echo my IP" endpoint used for the public IP context field.
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org";

/// Substring Telegram puts in a 400 response when it cannot parse HTML entities.
pub const DEFAULT_PARSE_ERROR_MARKER: &str = "can't parse entities";

const REDACTED: &str = "[REDACTED]";

/// Telegram bot token.
///
/// Debug and Display are redacted and the memory is zeroed on drop. Call
/// [`BotToken::expose`] to get the raw value when building request URLs.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct BotToken(String);

impl BotToken {
	pub fn new(token: impl Into<String>) -> Self {
		Self(token.into())
	}

	/// Explicitly access the raw token.
	pub fn expose(&self) -> &str {
		&self.0
	}

	fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for BotToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("BotToken").field(&REDACTED).finish()
	}
}

impl fmt::Display for BotToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for BotToken {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(BotToken)
	}
}

/// Compatibility rule deciding whether a rejected HTML message should be
/// resent as plain text.
///
/// Telegram reports markup problems as a 400 whose description contains
/// "can't parse entities". The wording is not part of any contract, so the
/// rule is configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseErrorRule {
	/// HTTP status that carries the parse error.
	pub status: u16,
	/// Case-insensitive substring searched for in the response body.
	pub marker: String,
}

impl ParseErrorRule {
	pub fn new(status: u16, marker: impl Into<String>) -> Self {
		Self {
			status,
			marker: marker.into(),
		}
	}

	/// Returns true if a response with this status and body is a markup rejection.
	pub fn matches(&self, status: u16, body: &str) -> bool {
		status == self.status && body.to_lowercase().contains(&self.marker.to_lowercase())
	}
}

impl Default for ParseErrorRule {
	fn default() -> Self {
		Self::new(400, DEFAULT_PARSE_ERROR_MARKER)
	}
}

/// Host application identity rendered in the device appendix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
	pub name: Option<String>,
	pub version: Option<String>,
	pub build: Option<String>,
}

/// Mutable builder for [`AlertConfig`].
///
/// The builder can also be deserialized so hosts can embed it in their own
/// configuration files; every field is optional there and falls back to the
/// same defaults as [`AlertConfigBuilder::new`].
///
/// # Example
///
/// ```
/// use loom_alert_core::AlertConfig;
///
/// let config = AlertConfig::builder()
///     .bot_token("123456:ABC")
///     .chat_id("-1001234567890")
///     .environment("production")
///     .release(env!("CARGO_PKG_VERSION"))
///     .build()
///     .unwrap();
///
/// assert!(config.enabled());
/// assert_eq!(config.environment(), Some("production"));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfigBuilder {
	bot_token: Option<BotToken>,
	chat_id: Option<String>,
	environment: Option<String>,
	release: Option<String>,
	enabled: bool,
	send_in_debug: bool,
	include_device_context: bool,
	include_ip: bool,
	attach_screenshot: bool,
	app: AppInfo,
	api_base_url: String,
	ip_lookup_url: String,
	parse_error_rule: ParseErrorRule,
}

impl AlertConfigBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			bot_token: None,
			chat_id: None,
			environment: None,
			release: None,
			enabled: true,
			send_in_debug: false,
			include_device_context: true,
			include_ip: true,
			attach_screenshot: false,
			app: AppInfo::default(),
			api_base_url: DEFAULT_API_BASE_URL.to_string(),
			ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
			parse_error_rule: ParseErrorRule::default(),
		}
	}

	/// Sets the bot token issued by @BotFather.
	pub fn bot_token(mut self, token: impl Into<String>) -> Self {
		self.bot_token = Some(BotToken::new(token));
		self
	}

	/// Sets the target chat: a numeric ID or an `@channel` username.
	pub fn chat_id(mut self, chat_id: impl Into<String>) -> Self {
		self.chat_id = Some(chat_id.into());
		self
	}

	/// Sets the environment name.
	///
	/// Example: `production`, `staging`, `development`
	pub fn environment(mut self, env: impl Into<String>) -> Self {
		self.environment = Some(env.into());
		self
	}

	/// Sets the release version.
	///
	/// Example: `1.2.3` or `git commit SHA`
	pub fn release(mut self, release: impl Into<String>) -> Self {
		self.release = Some(release.into());
		self
	}

	/// Enables or disables delivery altogether.
	pub fn enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	/// Allows delivery from debug builds. Off by default.
	pub fn send_in_debug(mut self, send: bool) -> Self {
		self.send_in_debug = send;
		self
	}

	/// Appends the device/app context block to every report.
	pub fn include_device_context(mut self, include: bool) -> Self {
		self.include_device_context = include;
		self
	}

	/// Looks up the public IP address as part of the device context.
	pub fn include_ip(mut self, include: bool) -> Self {
		self.include_ip = include;
		self
	}

	/// Attaches a screenshot to reports raised by the installed error hooks.
	pub fn attach_screenshot(mut self, attach: bool) -> Self {
		self.attach_screenshot = attach;
		self
	}

	/// Sets the host application's name, version, and build number.
	pub fn app_info(
		mut self,
		name: impl Into<String>,
		version: impl Into<String>,
		build: Option<String>,
	) -> Self {
		self.app = AppInfo {
			name: Some(name.into()),
			version: Some(version.into()),
			build,
		};
		self
	}

	/// Overrides the Bot API base URL (self-hosted Bot API servers, tests).
	pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
		self.api_base_url = url.into();
		self
	}

	/// Overrides the public IP lookup endpoint.
	pub fn ip_lookup_url(mut self, url: impl Into<String>) -> Self {
		self.ip_lookup_url = url.into();
		self
	}

	/// Overrides the rule used to detect markup rejections.
	pub fn parse_error_rule(mut self, rule: ParseErrorRule) -> Self {
		self.parse_error_rule = rule;
		self
	}

	/// Validates the builder and copies it into an immutable [`AlertConfig`].
	pub fn build(&self) -> Result<AlertConfig> {
		let bot_token = match &self.bot_token {
			Some(token) if !token.is_blank() => token.clone(),
			_ => return Err(ConfigError::MissingBotToken),
		};
		let chat_id = match self.chat_id.as_deref().map(str::trim) {
			Some(id) if !id.is_empty() => id.to_string(),
			_ => return Err(ConfigError::MissingChatId),
		};

		Ok(AlertConfig {
			bot_token,
			chat_id,
			environment: non_blank(self.environment.as_deref()),
			release: non_blank(self.release.as_deref()),
			enabled: self.enabled,
			send_in_debug: self.send_in_debug,
			include_device_context: self.include_device_context,
			include_ip: self.include_ip,
			attach_screenshot: self.attach_screenshot,
			app: self.app.clone(),
			api_base_url: self.api_base_url.trim_end_matches('/').to_string(),
			ip_lookup_url: self.ip_lookup_url.clone(),
			parse_error_rule: self.parse_error_rule.clone(),
		})
	}
}

impl Default for AlertConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn non_blank(value: Option<&str>) -> Option<String> {
	value
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(str::to_string)
}

/// Validated alert configuration. Never mutated after construction;
/// re-initialization replaces it wholesale.
#[derive(Debug, Clone)]
pub struct AlertConfig {
	bot_token: BotToken,
	chat_id: String,
	environment: Option<String>,
	release: Option<String>,
	enabled: bool,
	send_in_debug: bool,
	include_device_context: bool,
	include_ip: bool,
	attach_screenshot: bool,
	app: AppInfo,
	api_base_url: String,
	ip_lookup_url: String,
	parse_error_rule: ParseErrorRule,
}

impl AlertConfig {
	/// Creates a new builder.
	pub fn builder() -> AlertConfigBuilder {
		AlertConfigBuilder::new()
	}

	pub fn bot_token(&self) -> &BotToken {
		&self.bot_token
	}

	pub fn chat_id(&self) -> &str {
		&self.chat_id
	}

	pub fn environment(&self) -> Option<&str> {
		self.environment.as_deref()
	}

	pub fn release(&self) -> Option<&str> {
		self.release.as_deref()
	}

	pub fn enabled(&self) -> bool {
		self.enabled
	}

	pub fn send_in_debug(&self) -> bool {
		self.send_in_debug
	}

	pub fn include_device_context(&self) -> bool {
		self.include_device_context
	}

	pub fn include_ip(&self) -> bool {
		self.include_ip
	}

	pub fn attach_screenshot(&self) -> bool {
		self.attach_screenshot
	}

	pub fn app(&self) -> &AppInfo {
		&self.app
	}

	pub fn api_base_url(&self) -> &str {
		&self.api_base_url
	}

	pub fn ip_lookup_url(&self) -> &str {
		&self.ip_lookup_url
	}

	pub fn parse_error_rule(&self) -> &ParseErrorRule {
		&self.parse_error_rule
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn valid() -> AlertConfigBuilder {
		AlertConfig::builder().bot_token("123:abc").chat_id("42")
	}

	#[test]
	fn test_build_requires_bot_token() {
		let result = AlertConfig::builder().chat_id("42").build();
		assert_eq!(result.unwrap_err(), ConfigError::MissingBotToken);
	}

	#[test]
	fn test_build_rejects_blank_bot_token() {
		let result = AlertConfig::builder().bot_token("   ").chat_id("42").build();
		assert_eq!(result.unwrap_err(), ConfigError::MissingBotToken);
	}

	#[test]
	fn test_build_requires_chat_id() {
		let result = AlertConfig::builder().bot_token("123:abc").chat_id("").build();
		assert_eq!(result.unwrap_err(), ConfigError::MissingChatId);
	}

	#[test]
	fn test_defaults() {
		let config = valid().build().unwrap();
		assert!(config.enabled());
		assert!(!config.send_in_debug());
		assert!(config.include_device_context());
		assert!(config.include_ip());
		assert!(!config.attach_screenshot());
		assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
		assert_eq!(config.ip_lookup_url(), DEFAULT_IP_LOOKUP_URL);
		assert_eq!(config.parse_error_rule(), &ParseErrorRule::default());
	}

	#[test]
	fn test_snapshot_is_independent_of_builder() {
		let builder = valid().environment("staging");
		let config = builder.build().unwrap();
		let _changed = builder.environment("production");
		assert_eq!(config.environment(), Some("staging"));
	}

	#[test]
	fn test_blank_labels_become_none() {
		let config = valid().environment(" ").release("").build().unwrap();
		assert_eq!(config.environment(), None);
		assert_eq!(config.release(), None);
	}

	#[test]
	fn test_api_base_url_is_normalized() {
		let config = valid().api_base_url("http://localhost:8081/").build().unwrap();
		assert_eq!(config.api_base_url(), "http://localhost:8081");
	}

	#[test]
	fn test_bot_token_is_redacted() {
		let config = valid().build().unwrap();
		assert_eq!(format!("{}", config.bot_token()), "[REDACTED]");
		assert!(!format!("{config:?}").contains("123:abc"));
		assert_eq!(config.bot_token().expose(), "123:abc");
	}

	#[test]
	fn test_parse_error_rule_matches_case_insensitively() {
		let rule = ParseErrorRule::default();
		let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: Can't parse entities: unexpected end tag"}"#;
		assert!(rule.matches(400, body));
		assert!(!rule.matches(400, r#"{"ok":false,"description":"Bad Request: chat not found"}"#));
		assert!(!rule.matches(403, body));
	}

	#[test]
	fn test_builder_deserializes_with_defaults() {
		let builder: AlertConfigBuilder = serde_json::from_value(serde_json::json!({
			"bot_token": "123:abc",
			"chat_id": "42",
			"send_in_debug": true,
			"app": { "name": "demo", "version": "1.0.0" }
		}))
		.unwrap();
		let config = builder.build().unwrap();

		assert!(config.send_in_debug());
		assert!(config.enabled());
		assert_eq!(config.app().name.as_deref(), Some("demo"));
		assert_eq!(config.app().build, None);
	}
}
