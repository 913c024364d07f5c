// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use super::{evaluate_share, CompareRequest, CompareShare, Finished};
use crate::{
    channel::Channel,
    errors::{CallerError, InternalError, Result},
    fss::ComparisonGate,
    messages::{Message, MessageType},
    protocol::{Role, SessionId},
    sync::ComparisonSeed,
};
use tracing::{debug, error, info, instrument, warn};

/// What the Responder did with one incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// Answered the comparison with this seed.
    Compared(ComparisonSeed),
    /// The Initiator finished its tournament.
    Finished(Finished),
}

/// The Responder's half of the pairwise secure comparison.
///
/// The Responder has no schedule of its own: it answers every
/// [`CompareRequest`] as it arrives until the Initiator sends [`Finished`].
#[derive(Debug)]
pub struct ComparisonResponder<'a, C: Channel, G: ComparisonGate> {
    sid: SessionId,
    channel: &'a mut C,
    gate: &'a G,
    served: usize,
    finished: bool,
}

impl<'a, C: Channel, G: ComparisonGate> ComparisonResponder<'a, C, G> {
    /// Serve comparisons of session `sid` arriving on `channel`.
    pub fn new(sid: SessionId, channel: &'a mut C, gate: &'a G) -> Self {
        Self {
            sid,
            channel,
            gate,
            served: 0,
            finished: false,
        }
    }

    /// Number of comparisons answered so far.
    pub fn served(&self) -> usize {
        self.served
    }

    /// Receive and handle the next message from the Initiator.
    #[instrument(skip_all, err(Debug))]
    pub fn serve_next(&mut self) -> Result<Served> {
        if self.finished {
            error!("The Initiator already finished session {}", self.sid);
            Err(CallerError::ProtocolAlreadyTerminated)?
        }

        let message = self.channel.receive()?;
        message.check_session(self.sid)?;

        match message.message_type() {
            MessageType::CompareRequest => {
                let request: CompareRequest = message.payload(MessageType::CompareRequest)?;
                self.answer(&request)?;
                Ok(Served::Compared(request.seed))
            }
            MessageType::Finished => {
                let finished: Finished = message.payload(MessageType::Finished)?;
                self.finished = true;
                if finished.comparisons != self.served {
                    warn!(
                        "Initiator reports {} comparisons but {} were answered here",
                        finished.comparisons, self.served
                    );
                } else {
                    info!("Initiator finished after {} comparisons", self.served);
                }
                Ok(Served::Finished(finished))
            }
            message_type => {
                error!(
                    "Incorrect MessageType given to ComparisonResponder. Got: {:?}",
                    message_type
                );
                Err(InternalError::ProtocolError(message.from()))
            }
        }
    }

    /// Serve until the Initiator sends [`Finished`].
    pub fn serve_until_finished(&mut self) -> Result<Finished> {
        loop {
            if let Served::Finished(finished) = self.serve_next()? {
                return Ok(finished);
            }
        }
    }

    fn answer(&mut self, request: &CompareRequest) -> Result<()> {
        debug!("Answering comparison {}", request.seed);
        let share = evaluate_share(self.gate, Role::Responder, self.sid, request)?;
        let message = Message::new(
            MessageType::CompareShare,
            self.sid,
            Role::Responder,
            Role::Initiator,
            &CompareShare {
                seed: request.seed,
                share,
            },
        )?;
        self.channel.send(message)?;
        self.served += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel::{FaultyChannel, InMemoryChannel},
        compare::SecureComparator,
        fss::SimulatedDrelu,
        sync::SeedAllocator,
        tournament::{Candidate, PairwiseComparator},
        utils::testing::init_testing,
    };
    use std::thread;

    fn spawn_responder(
        sid: SessionId,
        mut channel: InMemoryChannel,
        gate: SimulatedDrelu,
    ) -> thread::JoinHandle<Result<(Finished, usize)>> {
        thread::spawn(move || {
            let mut responder = ComparisonResponder::new(sid, &mut channel, &gate);
            let finished = responder.serve_until_finished()?;
            Ok((finished, responder.served()))
        })
    }

    #[test]
    fn a_pipelined_round_resolves_every_pairing() -> Result<()> {
        let rng = &mut init_testing();
        let sid = SessionId::random(rng);
        let gate = SimulatedDrelu::new(16)?;
        let (mut initiator_channel, responder_channel) = InMemoryChannel::pair();
        let handle = spawn_responder(sid, responder_channel, gate);

        let pairings = [
            (Candidate::new(10, 0), Candidate::new(3, 1)),
            (Candidate::new(3, 2), Candidate::new(10, 3)),
            (Candidate::new(7, 4), Candidate::new(7, 5)),
            (Candidate::new(-20, 6), Candidate::new(19, 7)),
        ];

        let mut seeds = SeedAllocator::new(12345);
        let mut comparator =
            SecureComparator::new(sid, &mut initiator_channel, &gate, &mut seeds);
        let outcomes = comparator
            .compare_round(&pairings)
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        comparator.finish(pairings.len())?;

        // |-20| = 20 > 19 after reduction to magnitudes.
        assert_eq!(outcomes, vec![true, false, false, true]);
        assert_eq!(seeds.issued(), 4);

        let (finished, served) = handle.join().map_err(|_| InternalError::InternalInvariantFailed)??;
        assert_eq!(finished.comparisons(), 4);
        assert_eq!(served, 4);
        Ok(())
    }

    #[test]
    fn a_lost_reply_fails_only_its_pairing() -> Result<()> {
        let rng = &mut init_testing();
        let sid = SessionId::random(rng);
        let gate = SimulatedDrelu::new(10)?;
        let (initiator_channel, responder_channel) = InMemoryChannel::pair();
        let mut initiator_channel = FaultyChannel::new(initiator_channel, [1]);
        let handle = spawn_responder(sid, responder_channel, gate);

        let pairings = [
            (Candidate::new(9, 0), Candidate::new(1, 1)),
            (Candidate::new(9, 2), Candidate::new(1, 3)),
            (Candidate::new(9, 4), Candidate::new(1, 5)),
        ];
        let mut seeds = SeedAllocator::new(0);
        let mut comparator =
            SecureComparator::new(sid, &mut initiator_channel, &gate, &mut seeds);
        let outcomes = comparator.compare_round(&pairings);
        comparator.finish(pairings.len())?;

        assert_eq!(outcomes[0], Ok(true));
        assert_eq!(
            outcomes[1],
            Err(InternalError::CommunicationFailure(Role::Responder))
        );
        assert_eq!(outcomes[2], Ok(true));

        handle.join().map_err(|_| InternalError::InternalInvariantFailed)??;
        Ok(())
    }

    #[test]
    fn foreign_sessions_are_rejected() -> Result<()> {
        let rng = &mut init_testing();
        let gate = SimulatedDrelu::new(10)?;
        let (mut initiator_channel, mut responder_channel) = InMemoryChannel::pair();

        let mut seeds = SeedAllocator::new(0);
        let mut stranger =
            SecureComparator::new(SessionId::random(rng), &mut initiator_channel, &gate, &mut seeds);
        stranger.finish(0)?;

        let mut responder =
            ComparisonResponder::new(SessionId::random(rng), &mut responder_channel, &gate);
        assert_eq!(
            responder.serve_next(),
            Err(InternalError::ProtocolError(Role::Initiator))
        );
        Ok(())
    }

    #[test]
    fn nothing_is_served_after_finished() -> Result<()> {
        let rng = &mut init_testing();
        let sid = SessionId::random(rng);
        let gate = SimulatedDrelu::new(10)?;
        let (mut initiator_channel, mut responder_channel) = InMemoryChannel::pair();

        let mut seeds = SeedAllocator::new(0);
        SecureComparator::new(sid, &mut initiator_channel, &gate, &mut seeds).finish(0)?;

        let mut responder = ComparisonResponder::new(sid, &mut responder_channel, &gate);
        assert!(matches!(responder.serve_next()?, Served::Finished(_)));
        assert_eq!(
            responder.serve_next(),
            Err(CallerError::ProtocolAlreadyTerminated.into())
        );
        Ok(())
    }

    #[test]
    fn replies_are_not_accepted_as_requests() -> Result<()> {
        let rng = &mut init_testing();
        let sid = SessionId::random(rng);
        let gate = SimulatedDrelu::new(10)?;
        let (mut initiator_channel, mut responder_channel) = InMemoryChannel::pair();

        let bogus = Message::new(
            MessageType::CompareShare,
            sid,
            Role::Initiator,
            Role::Responder,
            &CompareShare {
                seed: ComparisonSeed::new(0),
                share: 0,
            },
        )?;
        initiator_channel.send(bogus)?;

        let mut responder = ComparisonResponder::new(sid, &mut responder_channel, &gate);
        assert_eq!(
            responder.serve_next(),
            Err(InternalError::ProtocolError(Role::Initiator))
        );
        Ok(())
    }
}
