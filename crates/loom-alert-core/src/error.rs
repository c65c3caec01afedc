// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for alert configuration.

use thiserror::Error;

/// Errors raised while validating an alert configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
	/// The bot token is missing or blank.
	#[error("bot token is required")]
	MissingBotToken,

	/// The chat ID is missing or blank.
	#[error("chat ID is required")]
	MissingChatId,
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
