// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Session drivers for the two roles.
//!
//! A [`Party`] is built for exactly one role, chosen through its type
//! parameter, and runs whole sessions over its [`Channel`]:
//! - `Party<Initiator, _>` runs [`Party::authenticate`], which drives the
//!   tournament and returns the authentication decision.
//! - `Party<Responder, _>` runs [`Party::serve`], which answers comparisons
//!   until the Initiator finishes.

use crate::{
    channel::Channel,
    compare::{ComparisonResponder, SecureComparator},
    config::ProtocolConfig,
    decision::{AuthenticationDecision, DecisionStage},
    errors::{CallerError, Result},
    fss::{ComparisonGate, SimulatedDrelu},
    metrics::{PhaseMetrics, PhaseTimer},
    protocol::{Role, SessionId},
    similarity::SimilarityEngine,
    sync::SeedAllocator,
    tournament::{expected_comparisons, run_tournament, Round, TournamentOutput},
};
use std::marker::PhantomData;
use tracing::{debug, error, info, instrument, warn};

mod sealed {
    pub trait Sealed {}
}

/// A role a [`Party`] can be built for.
pub trait PartyRole: sealed::Sealed {
    /// The protocol role.
    const ROLE: Role;
}

/// Marker for the party that holds the query and drives the tournament.
#[derive(Debug, Clone, Copy)]
pub struct Initiator;

/// Marker for the party that holds the enrollment database and answers
/// comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Responder;

impl sealed::Sealed for Initiator {}
impl sealed::Sealed for Responder {}

impl PartyRole for Initiator {
    const ROLE: Role = Role::Initiator;
}

impl PartyRole for Responder {
    const ROLE: Role = Role::Responder;
}

/// One party of the authentication protocol.
#[derive(Debug)]
pub struct Party<R: PartyRole, C: Channel, G: ComparisonGate = SimulatedDrelu> {
    sid: SessionId,
    config: ProtocolConfig,
    channel: C,
    gate: G,
    role: PhantomData<R>,
}

impl<R: PartyRole, C: Channel, G: ComparisonGate> Party<R, C, G> {
    /// Build a party for session `sid`.
    ///
    /// Fails if `channel` belongs to the other role or `gate` does not have
    /// the configured width.
    pub fn new(sid: SessionId, config: ProtocolConfig, channel: C, gate: G) -> Result<Self> {
        if channel.role() != R::ROLE {
            error!(
                "A {} cannot run over the channel end of the {}",
                R::ROLE,
                channel.role()
            );
            Err(CallerError::BadInput)?
        }
        if gate.bits() != config.bits() {
            error!(
                "Gate width {} does not match the configured width {}",
                gate.bits(),
                config.bits()
            );
            Err(CallerError::BadInput)?
        }
        Ok(Self {
            sid,
            config,
            channel,
            gate,
            role: PhantomData,
        })
    }

    /// The role of this party.
    pub fn role(&self) -> Role {
        R::ROLE
    }

    /// The session this party runs.
    pub fn sid(&self) -> SessionId {
        self.sid
    }

    /// The deployment parameters.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// The channel to the peer.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Release the channel.
    pub fn into_channel(self) -> C {
        self.channel
    }
}

impl<R: PartyRole, C: Channel> Party<R, C, SimulatedDrelu> {
    /// Build a party that compares with the in-process [`SimulatedDrelu`]
    /// gate of the configured width.
    pub fn simulated(sid: SessionId, config: ProtocolConfig, channel: C) -> Result<Self> {
        let gate = SimulatedDrelu::new(config.bits())?;
        Self::new(sid, config, channel, gate)
    }
}

/// What the Initiator learns from one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionReport {
    sid: SessionId,
    decision: AuthenticationDecision,
    tournament: TournamentOutput,
    similarity: PhaseMetrics,
    comparison: PhaseMetrics,
}

impl SessionReport {
    /// The session the report belongs to.
    pub fn sid(&self) -> SessionId {
        self.sid
    }

    /// The authentication decision.
    pub fn decision(&self) -> &AuthenticationDecision {
        &self.decision
    }

    /// Winner and statistics of the tournament.
    pub fn tournament(&self) -> &TournamentOutput {
        &self.tournament
    }

    /// Cost of the similarity stage.
    pub fn similarity(&self) -> PhaseMetrics {
        self.similarity
    }

    /// Cost of the tournament stage.
    pub fn comparison(&self) -> PhaseMetrics {
        self.comparison
    }

    /// Cost of the whole session.
    pub fn total(&self) -> PhaseMetrics {
        self.similarity + self.comparison
    }
}

/// What the Responder observed in one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponderReport {
    sid: SessionId,
    served: usize,
    reported: usize,
    expected: usize,
    similarity: PhaseMetrics,
    comparison: PhaseMetrics,
}

impl ResponderReport {
    /// The session the report belongs to.
    pub fn sid(&self) -> SessionId {
        self.sid
    }

    /// Comparisons answered.
    pub fn served(&self) -> usize {
        self.served
    }

    /// Comparisons the Initiator claims to have performed.
    pub fn reported(&self) -> usize {
        self.reported
    }

    /// Comparisons a tournament over the configured database performs.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Cost of the similarity stage.
    pub fn similarity(&self) -> PhaseMetrics {
        self.similarity
    }

    /// Cost of answering comparisons.
    pub fn comparison(&self) -> PhaseMetrics {
        self.comparison
    }

    /// Cost of the whole session.
    pub fn total(&self) -> PhaseMetrics {
        self.similarity + self.comparison
    }
}

impl<C: Channel, G: ComparisonGate> Party<Initiator, C, G> {
    /// Run one authentication session: reveal the similarity scores, find the
    /// best match through the secure tournament, and decide.
    ///
    /// Failed comparisons degrade to a local comparison and never abort the
    /// session; only a failing similarity stage or a broken invariant does.
    #[instrument(skip_all, fields(sid = %self.sid), err(Debug))]
    pub fn authenticate<E: SimilarityEngine>(&mut self, engine: &mut E) -> Result<SessionReport> {
        info!("Starting authentication session {}", self.sid);

        let timer = PhaseTimer::start(engine.bytes_sent());
        let scores = engine.reveal_scores()?;
        let similarity = timer.finish(engine.bytes_sent());
        if scores.len() != self.config.database_size() {
            error!(
                "The similarity stage revealed {} scores for a database of {}",
                scores.len(),
                self.config.database_size()
            );
            Err(CallerError::BadInput)?
        }
        let first_round = Round::from_scores(&scores)?;

        let timer = PhaseTimer::start(self.channel.bytes_sent());
        let mut seeds = SeedAllocator::new(self.config.seed_offset());
        let mut comparator =
            SecureComparator::new(self.sid, &mut self.channel, &self.gate, &mut seeds);
        let tournament = run_tournament(first_round, &mut comparator)?;
        if let Err(err) = comparator.finish(tournament.comparisons()) {
            // The outcome is already known; only the Responder misses the end.
            warn!("Could not notify the Responder that the session ended: {err}");
        }
        let comparison = timer.finish(self.channel.bytes_sent());

        let decision = DecisionStage::from_config(&self.config).decide(&tournament.winner());
        debug!(
            "Session {} took {:.1} ms and {:.1} KiB",
            self.sid,
            (similarity + comparison).millis(),
            (similarity + comparison).kib()
        );

        Ok(SessionReport {
            sid: self.sid,
            decision,
            tournament,
            similarity,
            comparison,
        })
    }
}

impl<C: Channel, G: ComparisonGate> Party<Responder, C, G> {
    /// Contribute to the similarity stage, then answer comparisons until the
    /// Initiator finishes the session.
    #[instrument(skip_all, fields(sid = %self.sid), err(Debug))]
    pub fn serve<E: SimilarityEngine>(&mut self, engine: &mut E) -> Result<ResponderReport> {
        info!("Serving session {}", self.sid);

        let timer = PhaseTimer::start(engine.bytes_sent());
        let scores = engine.reveal_scores()?;
        let similarity = timer.finish(engine.bytes_sent());
        debug!("Similarity stage revealed {} scores here", scores.len());

        let timer = PhaseTimer::start(self.channel.bytes_sent());
        let mut responder = ComparisonResponder::new(self.sid, &mut self.channel, &self.gate);
        let finished = responder.serve_until_finished()?;
        let served = responder.served();
        let comparison = timer.finish(self.channel.bytes_sent());

        let expected = expected_comparisons(self.config.database_size());
        if served != expected {
            warn!("Answered {served} comparisons, a full tournament takes {expected}");
        }

        Ok(ResponderReport {
            sid: self.sid,
            served,
            reported: finished.comparisons(),
            expected,
            similarity,
            comparison,
        })
    }
}
