// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Loom error alerts delivered through a Telegram bot.
//!
//! This crate holds everything that does not touch the network:
//!
//! - [`AlertConfig`] and its builder, validated once at initialization
//! - [`DeviceContext`], the best-effort device/app metadata attached to reports
//! - [`html`], the markup helpers that keep messages inside what the Telegram
//!   HTML parser accepts
//! - [`template`], pure functions that turn exceptions, messages, and failed
//!   HTTP exchanges into HTML report text
//!
//! The delivery side lives in `loom-alert`.

pub mod config;
pub mod context;
pub mod error;
pub mod html;
pub mod template;

pub use config::{
	AlertConfig, AlertConfigBuilder, AppInfo, BotToken, ParseErrorRule, DEFAULT_API_BASE_URL,
	DEFAULT_IP_LOOKUP_URL,
};
pub use context::DeviceContext;
pub use error::{ConfigError, Result};
pub use template::{ErrorOrigin, ExceptionReport, HttpErrorReport, ReportHeader};
