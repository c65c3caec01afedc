// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Future wrapper that turns panics into values.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;

use crate::panic_hook::{self, GuardScope, PanicDetails};

pin_project! {
	/// Polls the inner future inside `catch_unwind`.
	///
	/// Resolves to `Err` with the panic details when the inner future panics.
	/// While it is being polled the panic hook records details for the guard
	/// instead of reporting.
	#[must_use = "futures do nothing unless polled"]
	pub struct Guarded<F> {
		#[pin]
		inner: F,
	}
}

impl<F> Guarded<F> {
	pub fn new(inner: F) -> Self {
		Self { inner }
	}
}

impl<F: Future> Future for Guarded<F> {
	type Output = Result<F::Output, PanicDetails>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.project();
		let inner = this.inner;

		let result = {
			let _scope = GuardScope::enter();
			panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx)))
		};

		match result {
			Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
			Ok(Poll::Pending) => Poll::Pending,
			Err(payload) => {
				let details = panic_hook::take_deferred()
					.unwrap_or_else(|| PanicDetails::from_payload(payload.as_ref()));
				Poll::Ready(Err(details))
			}
		}
	}
}
