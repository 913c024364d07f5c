// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The final authentication decision over the tournament winner.

use crate::{config::ProtocolConfig, protocol::Score, tournament::Candidate};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

/// Outcome of the decision stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationDecision {
    winner_index: usize,
    winner_score: Score,
    plausible: bool,
    authenticated: bool,
}

impl AuthenticationDecision {
    /// Database index of the best-matching identity.
    pub fn winner_index(&self) -> usize {
        self.winner_index
    }

    /// Similarity score of the best-matching identity.
    pub fn winner_score(&self) -> Score {
        self.winner_score
    }

    /// Whether the winner passed the plausibility checks.
    pub fn plausible(&self) -> bool {
        self.plausible
    }

    /// Whether the query authenticates as the winner. Never `true` for an
    /// implausible winner.
    pub fn authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Checks the tournament winner and applies the authentication threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionStage {
    threshold: Score,
    database_size: usize,
}

impl DecisionStage {
    /// A decision stage for a database of `database_size` identities.
    pub fn new(threshold: Score, database_size: usize) -> Self {
        Self {
            threshold,
            database_size,
        }
    }

    /// The decision stage of a deployment.
    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(config.threshold(), config.database_size())
    }

    /// Decide whether `winner` authenticates.
    ///
    /// A winner with a non-positive score or an index outside the database is
    /// implausible and is rejected without looking at the threshold.
    #[instrument(skip_all)]
    pub fn decide(&self, winner: &Candidate) -> AuthenticationDecision {
        let mut plausible = true;
        if winner.score() <= 0 {
            error!(
                "Implausible winner: score {} is not positive",
                winner.score()
            );
            plausible = false;
        }
        if winner.original_index() >= self.database_size {
            error!(
                "Implausible winner: index {} is outside a database of {} identities",
                winner.original_index(),
                self.database_size
            );
            plausible = false;
        }

        let authenticated = plausible && winner.score() >= self.threshold;
        info!(
            "Winner {} with score {}: plausible = {plausible}, authenticated = {authenticated}",
            winner.original_index(),
            winner.score()
        );

        AuthenticationDecision {
            winner_index: winner.original_index(),
            winner_score: winner.score(),
            plausible,
            authenticated,
        }
    }
}
