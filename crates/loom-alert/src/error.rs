// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the alert SDK.

use loom_alert_core::ConfigError;
use thiserror::Error;

/// Result type alias for alert operations.
pub type Result<T> = std::result::Result<T, AlertSdkError>;

/// Errors that can occur in the alert SDK.
///
/// Only [`AlertSdkError::Config`] ever reaches host code (from
/// `AlertReporter::init`). Everything else is swallowed by the capture
/// pipeline and logged in debug builds.
#[derive(Debug, Error)]
pub enum AlertSdkError {
	/// The configuration is invalid.
	#[error("invalid alert configuration: {0}")]
	Config(#[from] ConfigError),

	/// Delivery is switched off for this build or configuration.
	#[error("alert delivery is disabled")]
	Disabled,

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// The Bot API returned an error.
	#[error("server error (status {status}): {message}")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Response body.
		message: String,
	},
}
