// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort device/app context collection, cached for the process lifetime.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use loom_alert_core::{AppInfo, DeviceContext};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Budget for the public IP lookup.
const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Source of the machine-level context fields.
///
/// Every method is called in isolation; an error only leaves that one field
/// empty.
pub trait SystemProbe: Send + Sync {
	fn platform(&self) -> io::Result<String>;
	fn os_version(&self) -> io::Result<String>;
	fn device_model(&self) -> io::Result<String>;
	fn device_brand(&self) -> io::Result<String>;
	fn locale(&self) -> io::Result<String>;
}

/// [`SystemProbe`] backed by the running host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProbe;

#[cfg(target_os = "linux")]
const DMI_DIR: &str = "/sys/devices/virtual/dmi/id";

impl SystemProbe for HostProbe {
	fn platform(&self) -> io::Result<String> {
		Ok(loom_common_http::platform())
	}

	fn os_version(&self) -> io::Result<String> {
		os_version()
	}

	fn device_model(&self) -> io::Result<String> {
		#[cfg(target_os = "linux")]
		if let Ok(model) = read_trimmed(&format!("{DMI_DIR}/product_name")) {
			return Ok(model);
		}
		#[cfg(target_os = "macos")]
		if let Ok(model) = command_output("sysctl", &["-n", "hw.model"]) {
			return Ok(model);
		}

		hostname::get().map(|h| h.to_string_lossy().into_owned())
	}

	fn device_brand(&self) -> io::Result<String> {
		#[cfg(target_os = "linux")]
		{
			read_trimmed(&format!("{DMI_DIR}/sys_vendor"))
		}
		#[cfg(target_os = "macos")]
		{
			Ok("Apple".to_string())
		}
		#[cfg(not(any(target_os = "linux", target_os = "macos")))]
		{
			Err(io::Error::new(io::ErrorKind::Unsupported, "device brand unavailable"))
		}
	}

	fn locale(&self) -> io::Result<String> {
		sys_locale::get_locale()
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "locale unavailable"))
	}
}

#[cfg(target_os = "linux")]
fn os_version() -> io::Result<String> {
	let release = std::fs::read_to_string("/etc/os-release")?;
	release
		.lines()
		.find_map(|line| line.strip_prefix("PRETTY_NAME="))
		.map(|v| v.trim_matches('"').to_string())
		.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "PRETTY_NAME missing"))
}

#[cfg(target_os = "macos")]
fn os_version() -> io::Result<String> {
	command_output("sw_vers", &["-productVersion"]).map(|v| format!("macOS {v}"))
}

#[cfg(target_os = "windows")]
fn os_version() -> io::Result<String> {
	command_output("cmd", &["/C", "ver"])
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn os_version() -> io::Result<String> {
	Ok(std::env::consts::OS.to_string())
}

#[cfg(target_os = "linux")]
fn read_trimmed(path: &str) -> io::Result<String> {
	Ok(std::fs::read_to_string(path)?.trim().to_string())
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn command_output(program: &str, args: &[&str]) -> io::Result<String> {
	let output = std::process::Command::new(program).args(args).output()?;
	if !output.status.success() {
		return Err(io::Error::new(
			io::ErrorKind::Other,
			format!("{program} exited with {}", output.status),
		));
	}
	Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Runs one probe, mapping failures and blank values to `None`.
fn best_effort(field: &'static str, probe: impl FnOnce() -> io::Result<String>) -> Option<String> {
	match probe() {
		Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
		Ok(_) => None,
		Err(e) => {
			trace!(field, error = %e, "Context field unavailable");
			None
		}
	}
}

struct CacheState {
	generation: u64,
	collected: Option<Option<Arc<DeviceContext>>>,
}

/// Collects [`DeviceContext`] once and hands out the cached copy afterwards.
///
/// The first call (successful or not) fills the cache; [`clear_cache`]
/// resets it, which the reporter does on every re-initialization.
///
/// [`clear_cache`]: ContextCollector::clear_cache
pub struct ContextCollector {
	probe: Arc<dyn SystemProbe>,
	http_client: Client,
	ip_lookup_url: parking_lot::RwLock<String>,
	app: parking_lot::RwLock<AppInfo>,
	generation: AtomicU64,
	cache: Mutex<CacheState>,
}

impl ContextCollector {
	/// Creates a collector probing the running host.
	pub fn new() -> Self {
		Self::with_probe(Arc::new(HostProbe))
	}

	/// Creates a collector with a custom probe.
	pub fn with_probe(probe: Arc<dyn SystemProbe>) -> Self {
		let http_client = loom_common_http::builder()
			.timeout(IP_LOOKUP_TIMEOUT)
			.build()
			.unwrap_or_default();

		Self {
			probe,
			http_client,
			ip_lookup_url: parking_lot::RwLock::new(loom_alert_core::DEFAULT_IP_LOOKUP_URL.to_string()),
			app: parking_lot::RwLock::new(AppInfo::default()),
			generation: AtomicU64::new(0),
			cache: Mutex::new(CacheState {
				generation: 0,
				collected: None,
			}),
		}
	}

	/// Points the collector at a new configuration's app info and IP
	/// endpoint and drops the cached context.
	pub fn reconfigure(&self, app: AppInfo, ip_lookup_url: impl Into<String>) {
		*self.app.write() = app;
		*self.ip_lookup_url.write() = ip_lookup_url.into();
		self.clear_cache();
	}

	/// Returns the cached context, collecting it on first use.
	///
	/// Returns `None` when no field could be collected.
	pub async fn collect(&self, include_ip: bool) -> Option<Arc<DeviceContext>> {
		let mut cache = self.cache.lock().await;
		let generation = self.generation.load(Ordering::Acquire);
		if cache.generation == generation {
			if let Some(context) = &cache.collected {
				return context.clone();
			}
		}

		let context = self.collect_uncached(include_ip).await;
		let context = (!context.is_empty()).then(|| Arc::new(context));
		debug!(fields = context.as_ref().map_or(0, |c| c.fields().len()), "Device context collected");

		*cache = CacheState {
			generation,
			collected: Some(context.clone()),
		};
		context
	}

	/// Drops the cached context so the next [`collect`](Self::collect) starts over.
	pub fn clear_cache(&self) {
		self.generation.fetch_add(1, Ordering::AcqRel);
	}

	async fn collect_uncached(&self, include_ip: bool) -> DeviceContext {
		let probe = &self.probe;
		let app = self.app.read().clone();

		let public_ip = if include_ip {
			self.lookup_public_ip().await
		} else {
			None
		};

		DeviceContext {
			platform: best_effort("platform", || probe.platform()),
			os_version: best_effort("os_version", || probe.os_version()),
			device_model: best_effort("device_model", || probe.device_model()),
			device_brand: best_effort("device_brand", || probe.device_brand()),
			app_name: app.name,
			app_version: app.version,
			app_build: app.build,
			public_ip,
			locale: best_effort("locale", || probe.locale()),
		}
	}

	async fn lookup_public_ip(&self) -> Option<String> {
		let url = self.ip_lookup_url.read().clone();
		let result = async {
			let response = self.http_client.get(&url).send().await?.error_for_status()?;
			response.text().await
		}
		.await;

		match result {
			Ok(body) => Some(body.trim().to_string()).filter(|ip| !ip.is_empty()),
			Err(e) => {
				trace!(error = %e, "Public IP lookup failed");
				None
			}
		}
	}
}

impl Default for ContextCollector {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicUsize;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	struct FakeProbe {
		calls: AtomicUsize,
		fail_os: bool,
	}

	impl FakeProbe {
		fn new(fail_os: bool) -> Self {
			Self {
				calls: AtomicUsize::new(0),
				fail_os,
			}
		}
	}

	impl SystemProbe for FakeProbe {
		fn platform(&self) -> io::Result<String> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Ok("linux-x86_64".into())
		}

		fn os_version(&self) -> io::Result<String> {
			if self.fail_os {
				Err(io::Error::new(io::ErrorKind::NotFound, "no os-release"))
			} else {
				Ok("Debian GNU/Linux 12".into())
			}
		}

		fn device_model(&self) -> io::Result<String> {
			Ok("  ".into())
		}

		fn device_brand(&self) -> io::Result<String> {
			Ok("LENOVO".into())
		}

		fn locale(&self) -> io::Result<String> {
			Ok("en-GB".into())
		}
	}

	struct NothingProbe;

	impl SystemProbe for NothingProbe {
		fn platform(&self) -> io::Result<String> {
			Err(io::Error::new(io::ErrorKind::Other, "nope"))
		}
		fn os_version(&self) -> io::Result<String> {
			Err(io::Error::new(io::ErrorKind::Other, "nope"))
		}
		fn device_model(&self) -> io::Result<String> {
			Err(io::Error::new(io::ErrorKind::Other, "nope"))
		}
		fn device_brand(&self) -> io::Result<String> {
			Err(io::Error::new(io::ErrorKind::Other, "nope"))
		}
		fn locale(&self) -> io::Result<String> {
			Err(io::Error::new(io::ErrorKind::Other, "nope"))
		}
	}

	#[tokio::test]
	async fn test_failed_field_does_not_abort_collection() {
		let collector = ContextCollector::with_probe(Arc::new(FakeProbe::new(true)));
		let context = collector.collect(false).await.unwrap();

		assert_eq!(context.platform.as_deref(), Some("linux-x86_64"));
		assert_eq!(context.os_version, None);
		assert_eq!(context.device_model, None);
		assert_eq!(context.device_brand.as_deref(), Some("LENOVO"));
		assert_eq!(context.locale.as_deref(), Some("en-GB"));
		assert_eq!(context.public_ip, None);
	}

	#[tokio::test]
	async fn test_context_is_cached_until_cleared() {
		let probe = Arc::new(FakeProbe::new(false));
		let collector = ContextCollector::with_probe(probe.clone());

		collector.collect(false).await;
		collector.collect(false).await;
		assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

		collector.clear_cache();
		collector.collect(false).await;
		assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_all_fields_absent_yields_none() {
		let collector = ContextCollector::with_probe(Arc::new(NothingProbe));
		assert!(collector.collect(false).await.is_none());
	}

	#[tokio::test]
	async fn test_app_info_comes_from_configuration() {
		let collector = ContextCollector::with_probe(Arc::new(NothingProbe));
		collector
			.reconfigure(
				AppInfo {
					name: Some("demo".into()),
					version: Some("2.0.0".into()),
					build: Some("77".into()),
				},
				"http://127.0.0.1:9",
			);

		let context = collector.collect(false).await.unwrap();
		assert_eq!(context.app_name.as_deref(), Some("demo"));
		assert_eq!(context.app_version.as_deref(), Some("2.0.0"));
		assert_eq!(context.app_build.as_deref(), Some("77"));
	}

	#[tokio::test]
	async fn test_public_ip_is_trimmed() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/"))
			.respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.7\n"))
			.expect(1)
			.mount(&server)
			.await;

		let collector = ContextCollector::with_probe(Arc::new(NothingProbe));
		collector.reconfigure(AppInfo::default(), server.uri());

		let context = collector.collect(true).await.unwrap();
		assert_eq!(context.public_ip.as_deref(), Some("203.0.113.7"));
	}

	#[tokio::test]
	async fn test_public_ip_failure_leaves_field_absent() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(503))
			.mount(&server)
			.await;

		let collector = ContextCollector::with_probe(Arc::new(FakeProbe::new(false)));
		collector.reconfigure(AppInfo::default(), server.uri());

		let context = collector.collect(true).await.unwrap();
		assert_eq!(context.public_ip, None);
		assert!(context.platform.is_some());
	}

	#[tokio::test]
	async fn test_public_ip_timeout_leaves_field_absent() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_string("203.0.113.7")
					.set_delay(IP_LOOKUP_TIMEOUT + Duration::from_secs(1)),
			)
			.mount(&server)
			.await;

		let collector = ContextCollector::with_probe(Arc::new(FakeProbe::new(false)));
		collector.reconfigure(AppInfo::default(), server.uri());

		let context = collector.collect(true).await.unwrap();
		assert_eq!(context.public_ip, None);
	}

	#[test]
	fn test_host_probe_platform() {
		assert_eq!(HostProbe.platform().unwrap(), loom_common_http::platform());
	}
}
