//! `DidResolver` trait and a retrying wrapper around any concrete resolver,
//! bounded by the 30s deadline spec.md §5 assigns to DID resolution.
//! Exponential backoff over `max_attempts`/`base_delay`/`max_delay`.

use std::time::Duration;

use async_trait::async_trait;
use sage_identity::{Did, KeyAlgorithm};

use crate::error::{DidRegError, DidRegResult};

/// A public key resolved for a DID, carrying the algorithm needed to verify
/// a signature produced by that DID's signer (spec.md §4.B covers three).
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub algorithm: KeyAlgorithm,
    pub public_key_bytes: Vec<u8>,
}

/// Resolves a DID to its current public key, per spec.md §4.A `Resolve(did)
/// -> publicKey`. Implementations may be backed by an on-chain registry, a
/// flat file, or anything else; only the interface is specified.
#[async_trait]
pub trait DidResolver: Send + Sync {
    async fn resolve(&self, did: &Did) -> DidRegResult<ResolvedKey>;
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub deadline: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            deadline: Duration::from_secs(30),
        }
    }
}

/// Wraps any `DidResolver` with retry-with-backoff, bounded overall by
/// `RetryConfig::deadline`. Failure after the deadline (or after exhausting
/// attempts) is surfaced as `DidRegError::TimedOut`, matching spec.md §4.A's
/// `DID_UNRESOLVABLE` failure mode.
pub struct RetryingResolver<R> {
    inner: R,
    config: RetryConfig,
}

impl<R: DidResolver> RetryingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, config: RetryConfig::default() }
    }

    pub fn with_config(inner: R, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub async fn resolve(&self, did: &Did) -> DidRegResult<ResolvedKey> {
        let attempt = async {
            let mut delay = self.config.base_delay;
            let mut last_err = DidRegError::Unresolvable(did.to_string());
            for attempt in 0..self.config.max_attempts {
                match self.inner.resolve(did).await {
                    Ok(key) => return Ok(key),
                    Err(err) => {
                        tracing::warn!(did = %did, attempt, error = %err, "DID resolution attempt failed");
                        last_err = err;
                    }
                }
                if attempt + 1 < self.config.max_attempts {
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.max_delay);
                }
            }
            Err(last_err)
        };

        match tokio::time::timeout(self.config.deadline, attempt).await {
            Ok(result) => result,
            Err(_) => Err(DidRegError::TimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyResolver {
        calls: Arc<AtomicU32>,
        succeed_on: u32,
    }

    #[async_trait]
    impl DidResolver for FlakyResolver {
        async fn resolve(&self, did: &Did) -> DidRegResult<ResolvedKey> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.succeed_on {
                Ok(ResolvedKey { algorithm: KeyAlgorithm::Ed25519, public_key_bytes: vec![1, 2, 3] })
            } else {
                Err(DidRegError::Unresolvable(did.to_string()))
            }
        }
    }

    #[tokio::test]
    async fn retries_until_success_within_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let resolver = RetryingResolver::with_config(
            FlakyResolver { calls: calls.clone(), succeed_on: 2 },
            RetryConfig { max_attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2), deadline: Duration::from_secs(5) },
        );
        let did = Did::parse("did:sage:ethereum:0xabc").unwrap();
        let key = resolver.resolve(&did).await.unwrap();
        assert_eq!(key.public_key_bytes, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let resolver = RetryingResolver::with_config(
            FlakyResolver { calls: calls.clone(), succeed_on: 99 },
            RetryConfig { max_attempts: 2, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2), deadline: Duration::from_secs(5) },
        );
        let did = Did::parse("did:sage:ethereum:0xabc").unwrap();
        assert!(resolver.resolve(&did).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
