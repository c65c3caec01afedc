// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Markup helpers for Telegram's HTML parse mode.
//!
//! Telegram rejects a whole message when its HTML does not parse, so the
//! delivery client checks text with [`is_html_safe`] first and falls back to
//! [`to_plain_text`] when the check fails.

use once_cell::sync::Lazy;
use regex::Regex;

/// Hard limit on `sendMessage` text length.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Hard limit on `sendPhoto` caption length.
pub const MAX_CAPTION_CHARS: usize = 1024;

/// Suffix appended when plain text is cut to fit a ceiling.
pub const TRUNCATION_SUFFIX: &str = "…\n[truncated]";

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

struct TagPair {
	open: Regex,
	close: Regex,
}

static CHECKED_TAGS: Lazy<Vec<TagPair>> = Lazy::new(|| {
	["pre", "code", "b"]
		.iter()
		.map(|name| TagPair {
			open: Regex::new(&format!(r"(?i)<{name}(?:\s[^>]*)?>")).expect("valid open tag regex"),
			close: Regex::new(&format!(r"(?i)</{name}\s*>")).expect("valid close tag regex"),
		})
		.collect()
});

/// Escapes the three characters Telegram treats as markup.
pub fn escape_html(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			_ => escaped.push(c),
		}
	}
	escaped
}

/// Removes every tag-like substring.
pub fn strip_tags(text: &str) -> String {
	TAG.replace_all(text, "").into_owned()
}

/// Checks that `<pre>`, `<code>` and `<b>` each open as often as they close.
pub fn has_balanced_tags(text: &str) -> bool {
	CHECKED_TAGS
		.iter()
		.all(|pair| pair.open.find_iter(text).count() == pair.close.find_iter(text).count())
}

/// True when `text` can be sent with `parse_mode=HTML` as is.
pub fn is_html_safe(text: &str) -> bool {
	text.chars().count() <= MAX_MESSAGE_CHARS && has_balanced_tags(text)
}

/// Cuts `text` to at most `max_chars` characters, ending in
/// [`TRUNCATION_SUFFIX`] when anything was removed.
pub fn truncate(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}

	let keep = max_chars.saturating_sub(TRUNCATION_SUFFIX.chars().count());
	let mut out: String = text.chars().take(keep).collect();
	out.push_str(TRUNCATION_SUFFIX);
	out
}

/// Strips markup and truncates to `max_chars`.
pub fn to_plain_text(text: &str, max_chars: usize) -> String {
	truncate(&strip_tags(text), max_chars)
}

/// Cuts `text` to `budget` characters and notes how many were dropped.
///
/// Used by the templates on user content before escaping.
pub fn truncate_with_marker(text: &str, budget: usize) -> String {
	let total = text.chars().count();
	if total <= budget {
		return text.to_string();
	}

	let mut out: String = text.chars().take(budget).collect();
	out.push_str(&format!("… [truncated {} chars]", total - budget));
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_escape_html() {
		assert_eq!(escape_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
		assert_eq!(escape_html("plain"), "plain");
	}

	#[test]
	fn test_strip_tags() {
		assert_eq!(strip_tags("<b>Oops</b>\n<pre>broken"), "Oops\nbroken");
		assert_eq!(
			strip_tags(r#"<pre><code class="language-rust">x</code></pre>"#),
			"x"
		);
	}

	#[test]
	fn test_balanced_tags() {
		assert!(has_balanced_tags("<b>Hello</b>\n<pre>line 1\nline 2</pre>"));
		assert!(has_balanced_tags("no markup at all"));
		assert!(has_balanced_tags(
			r#"<pre><code class="language-rust">fn main() {}</code></pre>"#
		));
	}

	#[test]
	fn test_unbalanced_tags() {
		assert!(!has_balanced_tags("<b>Oops</b>\n<pre>broken"));
		assert!(!has_balanced_tags("<code>x"));
		assert!(!has_balanced_tags("x</b>"));
	}

	#[test]
	fn test_br_is_not_counted_as_bold() {
		assert!(has_balanced_tags("<b>x</b><br>"));
	}

	#[test]
	fn test_escaped_markup_is_not_counted() {
		assert!(has_balanced_tags("&lt;pre&gt; is escaped"));
	}

	#[test]
	fn test_is_html_safe_length_ceiling() {
		assert!(is_html_safe(&"a".repeat(MAX_MESSAGE_CHARS)));
		assert!(!is_html_safe(&"a".repeat(MAX_MESSAGE_CHARS + 1)));
	}

	#[test]
	fn test_truncate_short_text_unchanged() {
		assert_eq!(truncate("hello", 10), "hello");
	}

	#[test]
	fn test_truncate_appends_suffix() {
		let out = truncate(&"x".repeat(5000), MAX_MESSAGE_CHARS);
		assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS);
		assert!(out.ends_with(TRUNCATION_SUFFIX));
	}

	#[test]
	fn test_truncate_counts_chars_not_bytes() {
		let out = truncate(&"é".repeat(20), 15);
		assert_eq!(out.chars().count(), 15);
		assert!(out.ends_with(TRUNCATION_SUFFIX));
	}

	#[test]
	fn test_truncate_with_marker() {
		let out = truncate_with_marker(&"r".repeat(600), 500);
		assert!(out.starts_with(&"r".repeat(500)));
		assert!(out.ends_with("… [truncated 100 chars]"));
		assert_eq!(truncate_with_marker("short", 500), "short");
	}

	proptest! {
		#[test]
		fn prop_plain_text_is_bounded_and_tag_free(text in ".{0,3000}", max in 20usize..2000) {
			let out = to_plain_text(&text, max);
			prop_assert!(out.chars().count() <= max);
			prop_assert!(!TAG.is_match(&out));
		}

		#[test]
		fn prop_escaped_text_has_no_raw_markup(text in ".{0,500}") {
			let escaped = escape_html(&text);
			prop_assert!(!escaped.contains('<'));
			prop_assert!(!escaped.contains('>'));
		}
	}
}
