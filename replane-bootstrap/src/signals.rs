// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! POSIX signal handling for graceful shutdown (SIGTERM, SIGINT, SIGHUP).

use tokio::signal::unix::{signal, SignalKind};

/// Which signal triggered shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
    Hangup,
}

/// Waits for the first of SIGINT, SIGTERM, or SIGHUP and returns which one
/// fired. Intended to be raced against a server's accept loop via
/// `tokio::select!`.
pub async fn wait_for_shutdown_signal() -> ShutdownSignal {
    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut hangup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = interrupt.recv() => ShutdownSignal::Interrupt,
        _ = terminate.recv() => ShutdownSignal::Terminate,
        _ = hangup.recv() => ShutdownSignal::Hangup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_on_sigint() {
        let handle = tokio::spawn(wait_for_shutdown_signal());
        // Give the handler a moment to install before raising.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        unsafe {
            libc_raise_sigint();
        }
        let sig = handle.await.expect("task panicked");
        assert_eq!(sig, ShutdownSignal::Interrupt);
    }

    /// Minimal `raise(SIGINT)` without pulling in the `libc` crate just for
    /// a test helper.
    unsafe fn libc_raise_sigint() {
        extern "C" {
            fn raise(sig: i32) -> i32;
        }
        const SIGINT: i32 = 2;
        raise(SIGINT);
    }
}
