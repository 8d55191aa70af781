//! Single-flight login claim.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Atomic gate deciding which caller performs the login exchange.
///
/// `claim()` flips the flag from `false` to `true` and reports whether this
/// caller did the flip. Until the matching `release()`, every other `claim()`
/// fails. Callers that lose the race can wait for the release with
/// [`LoginClaim::released`].
#[derive(Debug, Default)]
pub struct LoginClaim {
    claimed: AtomicBool,
    released: Notify,
}

impl LoginClaim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to become the caller that performs the login.
    pub fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Reset the flag and wake every caller waiting in [`LoginClaim::released`].
    pub fn release(&self) {
        self.claimed.store(false, Ordering::Release);
        self.released.notify_waiters();
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Claim the flag, returning a guard that releases it on drop.
    ///
    /// Returns `None` when another caller holds the claim.
    pub fn try_claim(&self) -> Option<ClaimGuard<'_>> {
        self.claim().then_some(ClaimGuard { claim: self })
    }

    /// Wait until the current claim (if any) has been released.
    pub async fn released(&self) {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a release between the
            // check and the await is not missed.
            notified.as_mut().enable();
            if !self.is_claimed() {
                return;
            }
            notified.await;
        }
    }
}

/// Releases a [`LoginClaim`] when dropped, including on cancellation.
#[derive(Debug)]
pub struct ClaimGuard<'a> {
    claim: &'a LoginClaim,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.claim.release();
    }
}
