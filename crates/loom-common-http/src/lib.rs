// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Loom.
//!
//! This crate provides a pre-configured reqwest client builder carrying a
//! consistent User-Agent header, plus the platform string reported with it.

mod client;

pub use client::{builder, platform, user_agent, VERSION};
