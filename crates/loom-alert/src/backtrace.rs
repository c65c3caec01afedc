// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backtrace capture and rendering for panic reports.

use std::backtrace::Backtrace;

/// One parsed backtrace frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
	pub function: String,
	pub location: Option<String>,
	pub in_app: bool,
}

/// Parses the `Display` output of a [`Backtrace`] into frames.
///
/// Frames look like `  N: path::to::function` optionally followed by an
/// `at file:line:col` line.
pub fn parse_backtrace_string(bt_string: &str) -> Vec<Frame> {
	let mut frames: Vec<Frame> = Vec::new();

	for line in bt_string.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			if let Some(last) = frames.last_mut() {
				if last.location.is_none() {
					last.location = Some(location.trim().to_string());
				}
			}
			continue;
		}

		if let Some(frame) = parse_frame_line(line) {
			frames.push(frame);
		}
	}

	frames
}

fn parse_frame_line(line: &str) -> Option<Frame> {
	let function = match line.split_once(':') {
		Some((prefix, rest)) if prefix.trim().parse::<u32>().is_ok() => rest.trim(),
		_ => line,
	};

	if function.is_empty() {
		return None;
	}

	Some(Frame {
		function: function.to_string(),
		location: None,
		in_app: is_in_app_frame(function),
	})
}

/// Determine if a frame is from application code rather than the runtime.
pub fn is_in_app_frame(function: &str) -> bool {
	const SYSTEM_PREFIXES: &[&str] = &[
		"std::",
		"core::",
		"alloc::",
		"<std::",
		"<core::",
		"<alloc::",
		"tokio::",
		"<tokio::",
		"futures::",
		"<futures::",
		"futures_util::",
		"<futures_util::",
		"async_trait::",
		"tracing::",
		"<tracing::",
		"loom_alert::",
		"<loom_alert::",
		"panic_unwind::",
		"rust_begin_unwind",
		"rust_panic",
		"__rust_",
		"_rust_",
		"__libc_start",
	];

	const SYSTEM_CONTAINS: &[&str] = &[
		"::panic::",
		"::panicking::",
		"::rt::",
		"::sys_common::",
		"::backtrace::",
	];

	!SYSTEM_PREFIXES.iter().any(|p| function.starts_with(p))
		&& !SYSTEM_CONTAINS.iter().any(|c| function.contains(c))
}

/// Renders frames as `function\n    at location` lines.
///
/// Only application frames are kept when there are any. Returns `None`
/// when nothing could be parsed.
pub fn render_frames(frames: &[Frame]) -> Option<String> {
	if frames.is_empty() {
		return None;
	}

	let in_app: Vec<&Frame> = frames.iter().filter(|f| f.in_app).collect();
	let selected: Vec<&Frame> = if in_app.is_empty() {
		frames.iter().collect()
	} else {
		in_app
	};

	let mut out = String::new();
	for frame in selected {
		out.push_str(&frame.function);
		out.push('\n');
		if let Some(location) = &frame.location {
			out.push_str("    at ");
			out.push_str(location);
			out.push('\n');
		}
	}
	Some(out.trim_end().to_string())
}

/// Renders a captured backtrace, falling back to its raw text.
pub fn render_backtrace(backtrace: &Backtrace) -> String {
	let raw = backtrace.to_string();
	render_frames(&parse_backtrace_string(&raw)).unwrap_or(raw)
}

/// Captures a fresh backtrace and renders it.
pub fn capture_stack_trace() -> String {
	render_backtrace(&Backtrace::force_capture())
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = "   0: std::backtrace_rs::backtrace::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/mod.rs:66:5
   1: std::panicking::begin_panic_handler
   2: my_app::handlers::process
             at ./src/handlers.rs:42:9
   3: my_app::main
             at ./src/main.rs:7:5
   4: core::ops::function::FnOnce::call_once
";

	#[test]
	fn test_is_in_app_frame_excludes_std() {
		assert!(!is_in_app_frame("std::panic::panic_any"));
		assert!(!is_in_app_frame("core::panicking::panic"));
		assert!(!is_in_app_frame("alloc::vec::Vec::push"));
		assert!(!is_in_app_frame("tokio::runtime::Runtime::block_on"));
		assert!(!is_in_app_frame("loom_alert::panic_hook::report"));
	}

	#[test]
	fn test_is_in_app_frame_includes_user_code() {
		assert!(is_in_app_frame("my_app::main"));
		assert!(is_in_app_frame("loom_alert_demo::run"));
		assert!(is_in_app_frame("foo::bar::baz"));
	}

	#[test]
	fn test_parse_attaches_locations() {
		let frames = parse_backtrace_string(SAMPLE);
		assert_eq!(frames.len(), 5);
		assert_eq!(frames[2].function, "my_app::handlers::process");
		assert_eq!(frames[2].location.as_deref(), Some("./src/handlers.rs:42:9"));
		assert_eq!(frames[1].location, None);
		assert!(frames[2].in_app);
		assert!(!frames[4].in_app);
	}

	#[test]
	fn test_render_keeps_app_frames() {
		let rendered = render_frames(&parse_backtrace_string(SAMPLE)).unwrap();
		assert_eq!(
			rendered,
			"my_app::handlers::process\n    at ./src/handlers.rs:42:9\nmy_app::main\n    at ./src/main.rs:7:5"
		);
	}

	#[test]
	fn test_render_falls_back_to_all_frames() {
		let frames = parse_backtrace_string("   0: std::rt::lang_start\n   1: core::ops::function::FnOnce::call_once");
		let rendered = render_frames(&frames).unwrap();
		assert!(rendered.starts_with("std::rt::lang_start"));
		assert!(rendered.contains("core::ops::function::FnOnce::call_once"));
	}

	#[test]
	fn test_render_nothing_parsed() {
		assert_eq!(render_frames(&[]), None);
	}

	#[test]
	fn test_capture_stack_trace() {
		// Frame content depends on debug info; only check it does not panic.
		let _ = capture_stack_trace();
	}
}
