use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out the account nonce for every transaction of a run.
///
/// Seeded once from the pending transaction count, then advanced locally so
/// that rapid sends never reuse a nonce while earlier ones are unconfirmed.
#[derive(Debug)]
pub struct NonceTracker {
    next: AtomicU64,
}

impl NonceTracker {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    pub fn next_nonce(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn sequential_nonces_have_no_gaps() {
        let tracker = NonceTracker::new(7);

        let nonces: Vec<_> = (0..5).map(|_| tracker.next_nonce()).collect();

        assert_eq!(nonces, vec![7, 8, 9, 10, 11]);
        assert_eq!(tracker.next_nonce(), 12);
    }

    #[tokio::test]
    async fn concurrent_nonces_are_unique_and_contiguous() -> eyre::Result<()> {
        const N: u64 = 256;

        let tracker = Arc::new(NonceTracker::new(100));

        let handles: Vec<_> = (0..N)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.next_nonce() })
            })
            .collect();

        let mut nonces = Vec::with_capacity(N as usize);
        for handle in handles {
            nonces.push(handle.await?);
        }

        nonces.sort_unstable();

        let expected: Vec<_> = (100..100 + N).collect();
        assert_eq!(nonces, expected);

        Ok(())
    }
}
