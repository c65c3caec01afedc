// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reporting of failed outbound HTTP requests.

use std::sync::Arc;

use bytes::Bytes;
use loom_alert_core::HttpErrorReport;
use reqwest::{Client, Request, Response};
use tracing::trace;

use crate::dispatch::CaptureHandle;
use crate::reporter::AlertReporter;

/// Decides from the status (absent for transport failures) whether to report.
pub type StatusPredicate = Arc<dyn Fn(Option<u16>) -> bool + Send + Sync>;

/// Forwards failed HTTP exchanges to an [`AlertReporter`].
///
/// Observing never changes what the caller receives.
#[derive(Clone)]
pub struct HttpErrorInterceptor {
	reporter: AlertReporter,
	predicate: Option<StatusPredicate>,
}

impl HttpErrorInterceptor {
	/// Reports every failure.
	pub fn new(reporter: AlertReporter) -> Self {
		Self {
			reporter,
			predicate: None,
		}
	}

	/// Reports only failures for which `predicate` returns true.
	pub fn with_predicate<P>(mut self, predicate: P) -> Self
	where
		P: Fn(Option<u16>) -> bool + Send + Sync + 'static,
	{
		self.predicate = Some(Arc::new(predicate));
		self
	}

	pub fn should_report(&self, status: Option<u16>) -> bool {
		self.predicate.as_ref().map_or(true, |p| p(status))
	}

	/// Reports `report` when the reporter is initialized and the predicate
	/// accepts its status.
	pub fn on_failure(&self, report: HttpErrorReport) -> CaptureHandle {
		if !self.reporter.is_initialized() || !self.should_report(report.status) {
			trace!(status = ?report.status, "HTTP failure not reported");
			return CaptureHandle::noop();
		}
		self.reporter.capture_http_error(report)
	}

	/// Executes `request` with `client`, reporting transport errors and
	/// responses with status >= 400.
	///
	/// An error response body is buffered to build the report and handed
	/// back in an equivalent [`Response`]. The rebuilt response keeps status,
	/// version, and headers, but [`Response::url`] no longer reflects the
	/// request URL.
	pub async fn execute(&self, client: &Client, request: Request) -> reqwest::Result<Response> {
		let method = request.method().to_string();
		let url = request.url().to_string();
		let request_body = request
			.body()
			.and_then(|body| body.as_bytes())
			.map(lossy);

		let response = match client.execute(request).await {
			Ok(response) => response,
			Err(e) => {
				self.on_failure(HttpErrorReport {
					method,
					url,
					status: e.status().map(|s| s.as_u16()),
					request_body,
					error: Some(e.to_string()),
					..Default::default()
				});
				return Err(e);
			}
		};

		let status = response.status();
		if !(status.is_client_error() || status.is_server_error()) {
			return Ok(response);
		}

		let version = response.version();
		let headers = response.headers().clone();
		let body: Bytes = match response.bytes().await {
			Ok(body) => body,
			Err(e) => {
				self.on_failure(HttpErrorReport {
					method,
					url,
					status: Some(status.as_u16()),
					request_body,
					error: Some(e.to_string()),
					..Default::default()
				});
				return Err(e);
			}
		};

		self.on_failure(HttpErrorReport {
			method,
			url,
			status: Some(status.as_u16()),
			request_body,
			response_body: Some(lossy(&body)),
			error: status.canonical_reason().map(str::to_string),
			..Default::default()
		});

		let mut rebuilt = http::Response::new(body);
		*rebuilt.status_mut() = status;
		*rebuilt.version_mut() = version;
		*rebuilt.headers_mut() = headers;
		Ok(Response::from(rebuilt))
	}
}

fn lossy(bytes: &[u8]) -> String {
	String::from_utf8_lossy(bytes).into_owned()
}

/// Builds a report from an exchange expressed with `http` types.
pub(crate) fn report_from_exchange<Req, Res>(
	request: &http::Request<Req>,
	response: &http::Response<Res>,
) -> HttpErrorReport
where
	Req: AsRef<[u8]>,
	Res: AsRef<[u8]>,
{
	let non_empty = |body: &[u8]| (!body.is_empty()).then(|| lossy(body));

	HttpErrorReport {
		method: request.method().to_string(),
		url: request.uri().to_string(),
		status: Some(response.status().as_u16()),
		request_body: non_empty(AsRef::<[u8]>::as_ref(request.body())),
		response_body: non_empty(AsRef::<[u8]>::as_ref(response.body())),
		error: response.status().canonical_reason().map(str::to_string),
		stack_trace: None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reporter::ReporterOptions;

	fn interceptor() -> HttpErrorInterceptor {
		HttpErrorInterceptor::new(AlertReporter::with_options(ReporterOptions {
			install_hooks: false,
			probe: None,
		}))
	}

	#[test]
	fn test_reports_everything_without_predicate() {
		let interceptor = interceptor();
		assert!(interceptor.should_report(Some(404)));
		assert!(interceptor.should_report(None));
	}

	#[test]
	fn test_predicate_filters_statuses() {
		let interceptor = interceptor().with_predicate(|status| status.map_or(true, |s| s >= 500));
		assert!(!interceptor.should_report(Some(404)));
		assert!(interceptor.should_report(Some(503)));
		assert!(interceptor.should_report(None));
	}

	#[tokio::test]
	async fn test_uninitialized_reporter_is_skipped() {
		let handle = interceptor().on_failure(HttpErrorReport {
			method: "GET".into(),
			url: "https://api.example.com/users".into(),
			status: Some(500),
			..Default::default()
		});
		assert!(!handle.is_dispatched());
	}

	#[test]
	fn test_report_from_exchange() {
		let request = http::Request::builder()
			.method("POST")
			.uri("https://api.example.com/orders")
			.body(r#"{"sku":"A1"}"#.to_string())
			.unwrap();
		let response = http::Response::builder()
			.status(503)
			.body(Bytes::from_static(b"upstream down"))
			.unwrap();

		let report = report_from_exchange(&request, &response);
		assert_eq!(report.method, "POST");
		assert_eq!(report.url, "https://api.example.com/orders");
		assert_eq!(report.status, Some(503));
		assert_eq!(report.request_body.as_deref(), Some(r#"{"sku":"A1"}"#));
		assert_eq!(report.response_body.as_deref(), Some("upstream down"));
		assert_eq!(report.error.as_deref(), Some("Service Unavailable"));
	}

	#[test]
	fn test_report_from_exchange_skips_empty_bodies() {
		let request = http::Request::get("https://api.example.com/").body(Vec::<u8>::new()).unwrap();
		let response = http::Response::builder().status(404).body(Vec::<u8>::new()).unwrap();

		let report = report_from_exchange(&request, &response);
		assert_eq!(report.request_body, None);
		assert_eq!(report.response_body, None);
	}
}
