// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: Send a few alerts to a Telegram chat using the loom-alert SDK.
//!
//! Run with:
//!   TELEGRAM_BOT_TOKEN=... TELEGRAM_CHAT_ID=... cargo run --example report -p loom-alert

use loom_alert::{AlertConfig, AlertReporter, HttpErrorInterceptor};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("loom_alert=debug")),
		)
		.init();

	let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
		.expect("TELEGRAM_BOT_TOKEN environment variable required");
	let chat_id =
		std::env::var("TELEGRAM_CHAT_ID").expect("TELEGRAM_CHAT_ID environment variable required");

	let reporter = AlertReporter::new();
	reporter.init(
		AlertConfig::builder()
			.bot_token(bot_token)
			.chat_id(chat_id)
			.environment("development")
			.release("0.1.0-example")
			.send_in_debug(true)
			.app_info("loom-alert-example", env!("CARGO_PKG_VERSION"), None),
	)?;

	println!("Sending message...");
	reporter
		.capture_message("Hello from the loom-alert example")
		.completed()
		.await;

	println!("Sending error...");
	let error = std::fs::read_to_string("/definitely/not/here").unwrap_err();
	reporter.capture_error(&error, None).completed().await;

	println!("Sending HTTP failure...");
	let interceptor = HttpErrorInterceptor::new(reporter.clone());
	let http = reqwest::Client::new();
	let request = http.get("https://httpbin.org/status/503").build()?;
	let response = interceptor.execute(&http, request).await?;
	println!("  upstream answered {}", response.status());

	println!("Running a guarded task that panics...");
	let result: Option<()> = reporter
		.run_guarded(async {
			tokio::task::yield_now().await;
			panic!("example panic inside a guarded task");
		})
		.await;
	println!("  guarded result: {:?}", result);

	// Give the detached captures a moment to finish.
	tokio::time::sleep(std::time::Duration::from_secs(3)).await;
	println!("Done!");
	Ok(())
}
