// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    errors::{CallerError, InternalError, Result},
    protocol::Score,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// A similarity score together with the database index it was computed for.
///
/// The index is the position in the initial score sequence and never changes,
/// however many rounds the candidate survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    score: Score,
    original_index: usize,
}

impl Candidate {
    /// A candidate for the identity at `original_index`.
    pub fn new(score: Score, original_index: usize) -> Self {
        Self {
            score,
            original_index,
        }
    }

    /// The similarity score.
    pub fn score(&self) -> Score {
        self.score
    }

    /// Index of the enrolled identity this score belongs to.
    pub fn original_index(&self) -> usize {
        self.original_index
    }
}

/// An immutable, ordered list of the candidates still in the tournament.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    number: usize,
    candidates: Vec<Candidate>,
}

impl Round {
    /// The first round, holding one candidate per score.
    pub fn from_scores(scores: &[Score]) -> Result<Self> {
        if scores.is_empty() {
            error!("Cannot run a tournament without candidates");
            Err(CallerError::BadInput)?
        }
        Ok(Self {
            number: 0,
            candidates: scores
                .iter()
                .enumerate()
                .map(|(index, score)| Candidate::new(*score, index))
                .collect(),
        })
    }

    /// Zero-based position of this round in the tournament.
    pub fn number(&self) -> usize {
        self.number
    }

    /// The candidates of this round, in order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Number of candidates in this round.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always `false`; rounds are never empty.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The single remaining candidate, if the tournament is decided.
    pub fn winner(&self) -> Option<Candidate> {
        match self.candidates.as_slice() {
            [winner] => Some(*winner),
            _ => None,
        }
    }

    /// Adjacent pairs `(0, 1), (2, 3), ...` that must be compared this round.
    pub fn pairings(&self) -> Vec<(Candidate, Candidate)> {
        self.candidates
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    /// The trailing candidate of an odd-length round, which advances without
    /// a comparison.
    pub fn bye(&self) -> Option<Candidate> {
        self.candidates.chunks_exact(2).remainder().first().copied()
    }

    /// Produce the next round from one outcome per pairing, where
    /// `first_is_greater[i]` says whether the first candidate of pairing `i`
    /// is strictly greater than the second.
    ///
    /// A pairing whose outcome is `false` (including ties) advances the later
    /// candidate.
    pub(crate) fn advance(&self, first_is_greater: &[bool]) -> Result<Round> {
        let pairings = self.pairings();
        if pairings.len() != first_is_greater.len() {
            error!(
                "Round {} has {} pairings but {} outcomes",
                self.number,
                pairings.len(),
                first_is_greater.len()
            );
            return Err(InternalError::InternalInvariantFailed);
        }

        let candidates = pairings
            .into_iter()
            .zip(first_is_greater)
            .map(|((first, second), greater)| if *greater { first } else { second })
            .chain(self.bye())
            .collect();

        Ok(Round {
            number: self.number + 1,
            candidates,
        })
    }
}
