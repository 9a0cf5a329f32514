//! Signature collection round
//!
//! The same process plays two roles, selected at runtime by the leader
//! oracle: [`SignatureCollector::collect`] runs the leader side of a
//! turn (self-sign, fan out one request per remaining validator, re-sort
//! shares into validator-set order), and [`SignRequestHandler`] answers
//! inbound requests on every non-leader.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use ed25519_dalek::{Signature, Signer, SigningKey};
use futures_util::future;

use crate::error::AnchorError;
use crate::net::{PeerChannel, RequestHandler};
use crate::schedule::EpochSchedule;
use crate::types::{PeerMessage, SignatureShare, ValidatorSet, SIGN_PROTOCOL};

/// Leader-side collection of signature shares for one turn
pub struct SignatureCollector {
    signing_key: SigningKey,
    set: ValidatorSet,
    channel: Arc<dyn PeerChannel>,
    own_index: usize,
}

impl SignatureCollector {
    pub fn new(
        signing_key: SigningKey,
        set: ValidatorSet,
        channel: Arc<dyn PeerChannel>,
    ) -> anyhow::Result<Self> {
        let own_index = set
            .index_of(&signing_key.verifying_key())
            .ok_or_else(|| anyhow!("local signing key is not in the validator set"))?;
        Ok(Self {
            signing_key,
            set,
            channel,
            own_index,
        })
    }

    pub fn validator_set(&self) -> &ValidatorSet {
        &self.set
    }

    /// Collect one share per validator over `message`.
    ///
    /// Requests run concurrently; arrival order is irrelevant because the
    /// result is sorted into validator-set order. Up to
    /// `N - threshold` unreachable validators are tolerated (the multisig
    /// lock absorbs exactly one absent signer); beyond that the round
    /// fails and is not retried within the epoch.
    pub async fn collect(
        &self,
        turn: u64,
        message: [u8; 32],
    ) -> Result<Vec<SignatureShare>, AnchorError> {
        let mut shares = vec![SignatureShare {
            validator_index: self.own_index,
            signature: self.signing_key.sign(&message),
        }];

        let request = PeerMessage::SignRequest { turn, message }.to_bytes();
        let peers: Vec<(usize, String)> = self
            .set
            .validators()
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != self.own_index)
            .map(|(index, v)| (index, v.addr.clone()))
            .collect();

        let outcomes = future::join_all(peers.into_iter().map(|(index, addr)| {
            let channel = Arc::clone(&self.channel);
            let request = request.clone();
            async move {
                let outcome = channel.request(&addr, SIGN_PROTOCOL, &request).await;
                (index, addr, outcome)
            }
        }))
        .await;

        let allowed_missing = self.set.len() - self.set.threshold();
        let mut missing = 0usize;
        let mut first_failure: Option<String> = None;
        for (index, addr, outcome) in outcomes {
            match outcome.and_then(|payload| decode_share(&payload)) {
                Ok(signature) => shares.push(SignatureShare {
                    validator_index: index,
                    signature,
                }),
                Err(e) => {
                    missing += 1;
                    tracing::warn!(validator = index, peer = %addr, "no signature share: {e:#}");
                    if first_failure.is_none() {
                        first_failure = Some(format!("{addr}: {e:#}"));
                    }
                }
            }
        }

        if missing > allowed_missing {
            return Err(AnchorError::SignatureCollection {
                missing,
                detail: first_failure.unwrap_or_else(|| "no failure detail".to_string()),
            });
        }

        shares.sort_by_key(|share| share.validator_index);
        Ok(shares)
    }
}

fn decode_share(payload: &[u8]) -> anyhow::Result<Signature> {
    match PeerMessage::from_bytes(payload)? {
        PeerMessage::SignResponse { signature } => {
            Signature::from_slice(&signature).map_err(|e| anyhow!("bad signature bytes: {e}"))
        }
        PeerMessage::Rejected { reason } => bail!("peer rejected request: {reason}"),
        PeerMessage::SignRequest { .. } => bail!("unexpected request in reply position"),
    }
}

/// Responder role: sign inbound requests from the current leader
///
/// Requests are trusted to come from an authenticated validator (the
/// transport's concern); beyond format sanity the only guard is a
/// plausibility bound: the requested turn must not run more than one
/// epoch ahead of the locally observed finalized tip.
pub struct SignRequestHandler {
    signing_key: SigningKey,
    schedule: EpochSchedule,
    observed_tip: Arc<AtomicU64>,
}

impl SignRequestHandler {
    pub fn new(
        signing_key: SigningKey,
        schedule: EpochSchedule,
        observed_tip: Arc<AtomicU64>,
    ) -> Self {
        Self {
            signing_key,
            schedule,
            observed_tip,
        }
    }

    pub fn handle_sign_request(&self, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
        let message = match PeerMessage::from_bytes(payload)? {
            PeerMessage::SignRequest { turn, message } => {
                let tip = self.observed_tip.load(Ordering::Acquire);
                let local_turn = self.schedule.turn_of(tip);
                if turn > local_turn + 1 {
                    tracing::warn!(turn, local_turn, "sign request runs ahead of local tip");
                    return Ok(PeerMessage::Rejected {
                        reason: format!("turn {turn} ahead of local view ({local_turn})"),
                    }
                    .to_bytes());
                }
                tracing::debug!(turn, "signing anchor message");
                message
            }
            other => bail!("unexpected message on sign protocol: {other:?}"),
        };

        let signature = self.signing_key.sign(&message);
        Ok(PeerMessage::SignResponse {
            signature: signature.to_bytes().to_vec(),
        }
        .to_bytes())
    }
}

impl RequestHandler for SignRequestHandler {
    fn handle(&self, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
        self.handle_sign_request(payload)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::collections::HashSet;

    use async_trait::async_trait;

    use super::*;
    use crate::types::ValidatorInfo;

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn addr(index: u8) -> String {
        format!("127.0.0.1:91{index:02}")
    }

    fn validator_set(n: u8) -> ValidatorSet {
        ValidatorSet::new(
            (0..n)
                .map(|i| ValidatorInfo {
                    key: signing_key(i).verifying_key(),
                    addr: addr(i),
                })
                .collect(),
        )
    }

    /// In-process channel: each peer address maps to a responder, with a
    /// per-peer delay so replies land out of request order.
    struct LoopbackChannel {
        responders: HashMap<String, SignRequestHandler>,
        delays_ms: HashMap<String, u64>,
        unreachable: HashSet<String>,
    }

    impl LoopbackChannel {
        fn new(n: u8, schedule: EpochSchedule) -> Self {
            let responders = (0..n)
                .map(|i| {
                    (
                        addr(i),
                        SignRequestHandler::new(
                            signing_key(i),
                            schedule,
                            Arc::new(AtomicU64::new(u64::MAX / 2)),
                        ),
                    )
                })
                .collect();
            Self {
                responders,
                delays_ms: HashMap::new(),
                unreachable: HashSet::new(),
            }
        }
    }

    #[async_trait]
    impl PeerChannel for LoopbackChannel {
        async fn request(
            &self,
            addr: &str,
            _protocol: &str,
            payload: &[u8],
        ) -> anyhow::Result<Vec<u8>> {
            if self.unreachable.contains(addr) {
                bail!("connection refused");
            }
            if let Some(delay) = self.delays_ms.get(addr) {
                tokio::time::sleep(std::time::Duration::from_millis(*delay)).await;
            }
            self.responders
                .get(addr)
                .ok_or_else(|| anyhow!("unknown peer {addr}"))?
                .handle(payload)
        }
    }

    fn collector(leader: u8, n: u8, channel: LoopbackChannel) -> SignatureCollector {
        SignatureCollector::new(signing_key(leader), validator_set(n), Arc::new(channel)).unwrap()
    }

    #[test]
    fn test_rejects_key_outside_set() {
        let channel = LoopbackChannel::new(3, EpochSchedule::default());
        let result = SignatureCollector::new(signing_key(9), validator_set(3), Arc::new(channel));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_shares_are_in_validator_set_order() {
        // replies arrive C-before-B; the share list must still be A, B, C
        let mut channel = LoopbackChannel::new(3, EpochSchedule::default());
        channel.delays_ms.insert(addr(1), 40);
        channel.delays_ms.insert(addr(2), 5);

        let collector = collector(0, 3, channel);
        let message = [0x77; 32];
        let shares = collector.collect(0, message).await.unwrap();

        let indices: Vec<_> = shares.iter().map(|s| s.validator_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        for share in &shares {
            signing_key(share.validator_index as u8)
                .verifying_key()
                .verify_strict(&message, &share.signature)
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_mid_set_leader_sorts_itself_into_place() {
        let channel = LoopbackChannel::new(3, EpochSchedule::default());
        let collector = collector(1, 3, channel);
        let shares = collector.collect(0, [1; 32]).await.unwrap();
        let indices: Vec<_> = shares.iter().map(|s| s.validator_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_tolerates_one_unreachable_validator() {
        let mut channel = LoopbackChannel::new(4, EpochSchedule::default());
        channel.unreachable.insert(addr(2));

        let collector = collector(0, 4, channel);
        let shares = collector.collect(0, [2; 32]).await.unwrap();
        let indices: Vec<_> = shares.iter().map(|s| s.validator_index).collect();
        assert_eq!(indices, vec![0, 1, 3]);
    }

    #[tokio::test]
    async fn test_two_unreachable_validators_fail_the_round() {
        let mut channel = LoopbackChannel::new(4, EpochSchedule::default());
        channel.unreachable.insert(addr(1));
        channel.unreachable.insert(addr(3));

        let collector = collector(0, 4, channel);
        let err = collector.collect(0, [3; 32]).await.unwrap_err();
        assert!(matches!(
            err,
            AnchorError::SignatureCollection { missing: 2, .. }
        ));
    }

    #[test]
    fn test_responder_signs_plausible_turns() {
        let tip = Arc::new(AtomicU64::new(9));
        let handler = SignRequestHandler::new(signing_key(1), EpochSchedule::default(), tip);

        let message = [0x31; 32];
        let reply = handler
            .handle_sign_request(&PeerMessage::SignRequest { turn: 0, message }.to_bytes())
            .unwrap();
        match PeerMessage::from_bytes(&reply).unwrap() {
            PeerMessage::SignResponse { signature } => {
                let signature = Signature::from_slice(&signature).unwrap();
                signing_key(1)
                    .verifying_key()
                    .verify_strict(&message, &signature)
                    .unwrap();
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_responder_refuses_turns_far_ahead_of_tip() {
        let tip = Arc::new(AtomicU64::new(9));
        let handler = SignRequestHandler::new(signing_key(1), EpochSchedule::default(), tip);

        let request = PeerMessage::SignRequest {
            turn: 5,
            message: [0; 32],
        }
        .to_bytes();
        match PeerMessage::from_bytes(&handler.handle_sign_request(&request).unwrap()).unwrap() {
            PeerMessage::Rejected { .. } => {}
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_responder_rejects_malformed_payload() {
        let handler = SignRequestHandler::new(
            signing_key(1),
            EpochSchedule::default(),
            Arc::new(AtomicU64::new(0)),
        );
        assert!(handler.handle_sign_request(&[0xde, 0xad]).is_err());
    }
}
