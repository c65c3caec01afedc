// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery mode selection over generated texts, against a mocked Bot API.

use loom_alert::html::{MAX_MESSAGE_CHARS, TRUNCATION_SUFFIX};
use loom_alert::{AlertConfig, DeliveryGate, TelegramClient, TextMode};
use proptest::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEND_MESSAGE: &str = "/bot123:abc/sendMessage";

/// What the mocked Bot API saw for one `deliver` call.
struct Delivered {
	mode: TextMode,
	bodies: Vec<serde_json::Value>,
}

fn deliver(text: &str) -> Delivered {
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.unwrap();

	runtime.block_on(async {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path(SEND_MESSAGE))
			.respond_with(ResponseTemplate::new(200))
			.mount(&server)
			.await;

		let config = AlertConfig::builder()
			.bot_token("123:abc")
			.chat_id("42")
			.api_base_url(server.uri())
			.build()
			.unwrap();
		let gate = DeliveryGate {
			enabled: true,
			send_in_debug: false,
			debug_build: false,
		};
		let receipt = TelegramClient::with_gate(&config, gate)
			.unwrap()
			.deliver(text)
			.await
			.unwrap();

		let bodies = server
			.received_requests()
			.await
			.unwrap()
			.iter()
			.map(|r| r.body_json().unwrap())
			.collect();

		Delivered {
			mode: receipt.mode,
			bodies,
		}
	})
}

fn sent_text(body: &serde_json::Value) -> String {
	body["text"].as_str().unwrap().to_string()
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(16))]

	#[test]
	fn prop_balanced_text_within_limit_is_one_html_request(
		title in "[A-Za-z0-9 ]{0,40}",
		body in "[a-z0-9 \n]{0,3500}",
	) {
		let text = format!("<b>{title}</b>\n<pre>{body}</pre>");
		prop_assume!(text.chars().count() <= MAX_MESSAGE_CHARS);

		let delivered = deliver(&text);
		prop_assert_eq!(delivered.mode, TextMode::Html);
		prop_assert_eq!(delivered.bodies.len(), 1);
		prop_assert_eq!(&delivered.bodies[0]["parse_mode"], "HTML");
		prop_assert_eq!(sent_text(&delivered.bodies[0]), text);
	}

	#[test]
	fn prop_oversized_text_is_one_bounded_plain_request(
		body in "[a-z0-9 \n]{4100,5500}",
		unbalanced in any::<bool>(),
	) {
		let text = if unbalanced {
			format!("<pre>{body}")
		} else {
			format!("<pre>{body}</pre>")
		};

		let delivered = deliver(&text);
		prop_assert_eq!(delivered.mode, TextMode::Plain);
		prop_assert_eq!(delivered.bodies.len(), 1);
		prop_assert!(delivered.bodies[0].get("parse_mode").is_none());

		let sent = sent_text(&delivered.bodies[0]);
		prop_assert!(sent.chars().count() <= MAX_MESSAGE_CHARS);
		prop_assert!(sent.ends_with(TRUNCATION_SUFFIX));
		prop_assert!(!sent.contains("<pre>"));
	}

	#[test]
	fn prop_unbalanced_short_text_is_sent_stripped(body in "[a-z0-9 \n]{0,500}") {
		let text = format!("<b>Oops</b>\n<pre>{body}");

		let delivered = deliver(&text);
		prop_assert_eq!(delivered.mode, TextMode::Plain);
		prop_assert_eq!(delivered.bodies.len(), 1);
		prop_assert!(delivered.bodies[0].get("parse_mode").is_none());
		prop_assert_eq!(sent_text(&delivered.bodies[0]), format!("Oops\n{body}"));
	}
}
