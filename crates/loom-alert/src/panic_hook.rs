// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Chained panic hook.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, PanicHookInfo};

use crate::backtrace::capture_stack_trace;
use crate::reporter::AlertReporter;

/// What the hook learned about a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicDetails {
	pub message: String,
	pub location: Option<String>,
	pub stack_trace: Option<String>,
	/// Name of the panicking thread.
	pub thread: Option<String>,
}

impl PanicDetails {
	fn from_hook_info(info: &PanicHookInfo<'_>) -> Self {
		Self {
			message: panic_message(info.payload()),
			location: info
				.location()
				.map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
			stack_trace: Some(capture_stack_trace()),
			thread: current_thread_name(),
		}
	}

	/// Details recovered from a `catch_unwind` payload alone.
	pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
		Self {
			message: panic_message(payload),
			location: None,
			stack_trace: None,
			thread: current_thread_name(),
		}
	}
}

fn current_thread_name() -> Option<String> {
	std::thread::current().name().map(str::to_string)
}

/// Extracts the message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}

thread_local! {
	static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
	static DEFERRED: RefCell<Option<PanicDetails>> = const { RefCell::new(None) };
}

/// Marks the current thread as polling a guarded future.
pub(crate) struct GuardScope(());

impl GuardScope {
	pub(crate) fn enter() -> Self {
		GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
		Self(())
	}
}

impl Drop for GuardScope {
	fn drop(&mut self) {
		GUARD_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
	}
}

fn is_guarded() -> bool {
	GUARD_DEPTH.with(|depth| depth.get() > 0)
}

/// Takes the details the hook recorded for a guarded panic on this thread.
pub(crate) fn take_deferred() -> Option<PanicDetails> {
	DEFERRED.with(|slot| slot.borrow_mut().take())
}

/// Installs a panic hook reporting through `reporter`, chained in front of
/// the previously installed hook.
///
/// Panics raised while a guarded future is polled are left to the guard,
/// which reports them once it regains control. Capture pipelines are polled
/// guarded too, so their own panics never come back through this hook.
///
/// A panic inside a panic hook aborts the process, so the body must not panic.
pub(crate) fn install_panic_hook(reporter: AlertReporter) {
	let previous = panic::take_hook();

	panic::set_hook(Box::new(move |info| {
		let details = PanicDetails::from_hook_info(info);
		if is_guarded() {
			DEFERRED.with(|slot| *slot.borrow_mut() = Some(details));
		} else {
			reporter.capture_panic(details);
		}

		previous(info);
	}));
}
