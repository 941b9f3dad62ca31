//! SAGE Transport - components 4.D (Secure Transport) and 4.E (Inbound
//! Pipeline): the framing matrix for outbound POSTs and the composable
//! verification steps every peer's `/process` handler runs.

mod error;
mod inbound;
mod outbound;

pub use error::{TransportError, TransportResult};
pub use inbound::{demux_hpke, extract_metadata, verify_signature, DemuxOutcome, InboundMetadata, ReplayGuard};
pub use outbound::{send, FramingMode, TransportOutcome, TransportResponse};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn replay_guard_rejects_duplicate_message_id() {
        let guard = ReplayGuard::new(Duration::from_secs(300));
        guard.check("msg-1", Some(SystemTime::now())).unwrap();
        let result = guard.check("msg-1", Some(SystemTime::now()));
        assert!(matches!(result, Err(TransportError::ReplayedMessage(_))));
    }

    #[test]
    fn replay_guard_rejects_stale_timestamp() {
        let guard = ReplayGuard::new(Duration::from_secs(60));
        let old = SystemTime::now() - Duration::from_secs(3600);
        let result = guard.check("msg-2", Some(old));
        assert!(matches!(result, Err(TransportError::ExpiredMessage)));
    }

    #[test]
    fn demux_plaintext_passthrough_when_no_hpke_header() {
        let metadata = InboundMetadata::default();
        let sessions = sage_hpke::SessionManager::new();
        let outcome = demux_hpke(&metadata, b"hello", &sessions).unwrap();
        match outcome {
            DemuxOutcome::Plaintext(bytes) => assert_eq!(bytes, b"hello"),
            _ => panic!("expected plaintext"),
        }
    }

    #[test]
    fn demux_unknown_kid_is_rejected() {
        let metadata = InboundMetadata {
            hpke: Some("v1".to_string()),
            kid: Some("missing-kid".to_string()),
            ..Default::default()
        };
        let sessions = sage_hpke::SessionManager::new();
        let result = demux_hpke(&metadata, b"ciphertext", &sessions);
        assert!(result.is_err());
    }
}
