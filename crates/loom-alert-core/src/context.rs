// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Device and application context attached to reports.

use serde::{Deserialize, Serialize};

/// Best-effort device/app metadata. Every field is collected independently
/// and may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
	pub platform: Option<String>,
	pub os_version: Option<String>,
	pub device_model: Option<String>,
	pub device_brand: Option<String>,
	pub app_name: Option<String>,
	pub app_version: Option<String>,
	pub app_build: Option<String>,
	pub public_ip: Option<String>,
	pub locale: Option<String>,
}

impl DeviceContext {
	/// Returns the labelled fields in display order, skipping absent or
	/// empty values.
	pub fn fields(&self) -> Vec<(&'static str, &str)> {
		[
			("Platform", &self.platform),
			("OS", &self.os_version),
			("Device", &self.device_model),
			("Brand", &self.device_brand),
			("App", &self.app_name),
			("Version", &self.app_version),
			("Build", &self.app_build),
			("IP", &self.public_ip),
			("Locale", &self.locale),
		]
		.into_iter()
		.filter_map(|(label, value)| {
			value
				.as_deref()
				.map(str::trim)
				.filter(|v| !v.is_empty())
				.map(|v| (label, v))
		})
		.collect()
	}

	/// True when no field carries a value.
	pub fn is_empty(&self) -> bool {
		self.fields().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_fields_follow_fixed_order() {
		let context = DeviceContext {
			locale: Some("en-US".into()),
			platform: Some("linux-x86_64".into()),
			public_ip: Some("203.0.113.7".into()),
			app_name: Some("demo".into()),
			..Default::default()
		};

		let labels: Vec<&str> = context.fields().iter().map(|(label, _)| *label).collect();
		assert_eq!(labels, vec!["Platform", "App", "IP", "Locale"]);
	}

	#[test]
	fn test_fields_skip_empty_values() {
		let context = DeviceContext {
			platform: Some("".into()),
			os_version: Some("   ".into()),
			device_model: Some("ThinkPad X1".into()),
			..Default::default()
		};

		assert_eq!(context.fields(), vec![("Device", "ThinkPad X1")]);
	}

	#[test]
	fn test_default_is_empty() {
		assert!(DeviceContext::default().is_empty());
		assert!(DeviceContext {
			locale: Some(String::new()),
			..Default::default()
		}
		.is_empty());
	}

	proptest! {
		#[test]
		fn prop_fields_never_contain_blank_values(
			platform in proptest::option::of("[ a-z]{0,8}"),
			locale in proptest::option::of("[ a-z]{0,8}"),
		) {
			let context = DeviceContext {
				platform,
				locale,
				..Default::default()
			};
			for (_, value) in context.fields() {
				prop_assert!(!value.trim().is_empty());
			}
			let cloned = context.clone();
			prop_assert_eq!(context.fields(), cloned.fields());
		}
	}
}
