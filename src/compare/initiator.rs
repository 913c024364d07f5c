// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use super::{evaluate_share, reconstruct, reduce_operand, CompareRequest, CompareShare, Finished};
use crate::{
    channel::Channel,
    errors::{InternalError, Result},
    fss::ComparisonGate,
    messages::{Message, MessageType},
    protocol::{Role, SessionId},
    sync::SeedAllocator,
    tournament::{Candidate, PairwiseComparator},
};
use tracing::{debug, error, instrument};

/// The Initiator's half of the pairwise secure comparison.
///
/// All comparisons of a round are pipelined: every request is put on the
/// channel before the first reply is awaited, so a round costs one round trip
/// regardless of how many pairings it has. Replies arrive in request order.
#[derive(Debug)]
pub struct SecureComparator<'a, C: Channel, G: ComparisonGate> {
    sid: SessionId,
    channel: &'a mut C,
    gate: &'a G,
    seeds: &'a mut SeedAllocator,
}

impl<'a, C: Channel, G: ComparisonGate> SecureComparator<'a, C, G> {
    /// Compare over `channel` within session `sid`, drawing one seed per
    /// comparison from `seeds`.
    pub fn new(
        sid: SessionId,
        channel: &'a mut C,
        gate: &'a G,
        seeds: &'a mut SeedAllocator,
    ) -> Self {
        Self {
            sid,
            channel,
            gate,
            seeds,
        }
    }

    /// Tell the Responder that no more requests will follow.
    pub fn finish(&mut self, comparisons: usize) -> Result<()> {
        let message = Message::new(
            MessageType::Finished,
            self.sid,
            Role::Initiator,
            Role::Responder,
            &Finished { comparisons },
        )?;
        self.channel.send(message)
    }

    /// Send the request for one pairing.
    fn issue(&mut self, first: &Candidate, second: &Candidate) -> Result<CompareRequest> {
        let bits = self.gate.bits();
        let request = CompareRequest {
            seed: self.seeds.allocate(),
            operand_a: reduce_operand(first.score(), bits),
            operand_b: reduce_operand(second.score(), bits),
        };
        debug!(
            "Requesting comparison {} of indices {} and {}",
            request.seed,
            first.original_index(),
            second.original_index()
        );
        let message = Message::new(
            MessageType::CompareRequest,
            self.sid,
            Role::Initiator,
            Role::Responder,
            &request,
        )?;
        self.channel.send(message)?;
        Ok(request)
    }

    /// Collect the Responder's share for `request` and reconstruct the
    /// outcome.
    fn resolve(&mut self, request: &CompareRequest) -> Result<bool> {
        // Receive before evaluating so that a local failure never leaves the
        // reply queued for the next pairing.
        let message = self.channel.receive()?;
        message.check_session(self.sid)?;
        let reply: CompareShare = message.payload(MessageType::CompareShare)?;
        if reply.seed != request.seed {
            error!(
                "Expected the share of comparison {}, got comparison {}",
                request.seed, reply.seed
            );
            return Err(InternalError::ProtocolError(Role::Responder));
        }

        let own_share = evaluate_share(self.gate, Role::Initiator, self.sid, request)?;
        Ok(reconstruct(own_share, reply.share, self.gate.bits()))
    }
}

impl<'a, C: Channel, G: ComparisonGate> PairwiseComparator for SecureComparator<'a, C, G> {
    #[instrument(skip_all, fields(pairings = pairings.len()))]
    fn compare_round(&mut self, pairings: &[(Candidate, Candidate)]) -> Vec<Result<bool>> {
        let requests = pairings
            .iter()
            .map(|(first, second)| self.issue(first, second))
            .collect::<Vec<_>>();

        requests
            .into_iter()
            .map(|request| request.and_then(|request| self.resolve(&request)))
            .collect()
    }

    fn fallback_greater_than(&self, first: &Candidate, second: &Candidate) -> bool {
        let bits = self.gate.bits();
        reduce_operand(first.score(), bits) > reduce_operand(second.score(), bits)
    }
}
