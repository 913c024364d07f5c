//! Single-elimination tournament over secret-shared similarity scores.
//!
//! # High-level description
//! Each round pairs adjacent candidates (positions 0 and 1, 2 and 3, ...) and
//! keeps the greater candidate of every pair; an unpaired trailing candidate
//! gets a bye and advances without a comparison. Rounds repeat until a single
//! candidate remains. A list of `n` candidates therefore takes `⌈log2 n⌉`
//! rounds and exactly `n - 1` comparisons, since every comparison eliminates
//! one candidate.
//!
//! All pairings of a round are handed to the [`PairwiseComparator`] at once so
//! the comparator can issue them concurrently. A round only starts after the
//! previous round has fully resolved.
//!
//! Ties compare as "not greater", so the later candidate of a tied pair
//! advances.
//!
//! A pairing the comparator fails to resolve does not abort the tournament:
//! it is settled by the comparator's local, non-secure fallback and counted as
//! degraded.
// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

mod round;

pub use round::{Candidate, Round};

use crate::errors::{InternalError, Result};
use tracing::{debug, error, info, instrument, warn};

/// Resolves "is the first candidate strictly greater than the second" for the
/// pairings of a round.
pub trait PairwiseComparator {
    /// Resolve every pairing of one round, returning one outcome per pairing
    /// in the same order. A failed pairing is reported as an `Err` in its slot
    /// and does not affect the others.
    fn compare_round(&mut self, pairings: &[(Candidate, Candidate)]) -> Vec<Result<bool>>;

    /// Non-secure local comparison used in place of a failed pairing.
    fn fallback_greater_than(&self, first: &Candidate, second: &Candidate) -> bool;
}

/// The outcome of a tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentOutput {
    winner: Candidate,
    comparisons: usize,
    rounds: usize,
    degraded: usize,
}

impl TournamentOutput {
    /// The last remaining candidate.
    pub fn winner(&self) -> Candidate {
        self.winner
    }

    /// Comparisons performed, including degraded ones.
    pub fn comparisons(&self) -> usize {
        self.comparisons
    }

    /// Rounds played.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Comparisons settled by the local fallback.
    pub fn degraded(&self) -> usize {
        self.degraded
    }
}

/// Number of comparisons a tournament over `n` candidates performs.
pub fn expected_comparisons(n: usize) -> usize {
    let mut remaining = n;
    let mut comparisons = 0;
    while remaining > 1 {
        comparisons += remaining / 2;
        remaining = (remaining + 1) / 2;
    }
    comparisons
}

/// Number of rounds a tournament over `n` candidates plays.
pub fn expected_rounds(n: usize) -> usize {
    let mut remaining = n;
    let mut rounds = 0;
    while remaining > 1 {
        remaining = (remaining + 1) / 2;
        rounds += 1;
    }
    rounds
}

/// Run the tournament starting from `first_round` until one candidate
/// remains.
#[instrument(skip_all, fields(candidates = first_round.len()))]
pub fn run_tournament<P: PairwiseComparator>(
    first_round: Round,
    comparator: &mut P,
) -> Result<TournamentOutput> {
    let mut round = first_round;
    let mut comparisons = 0;
    let mut degraded = 0;

    while round.winner().is_none() {
        let pairings = round.pairings();
        debug!(
            "Round {}: {} candidates, {} comparisons",
            round.number(),
            round.len(),
            pairings.len()
        );

        let results = comparator.compare_round(&pairings);
        if results.len() != pairings.len() {
            error!(
                "Comparator resolved {} of {} pairings",
                results.len(),
                pairings.len()
            );
            return Err(InternalError::InternalInvariantFailed);
        }

        let outcomes = pairings
            .iter()
            .zip(results)
            .map(|((first, second), result)| match result {
                Ok(greater) => greater,
                Err(err) => {
                    degraded += 1;
                    warn!(
                        "Secure comparison of indices {} and {} failed ({err}); \
                         falling back to a local comparison",
                        first.original_index(),
                        second.original_index()
                    );
                    comparator.fallback_greater_than(first, second)
                }
            })
            .collect::<Vec<_>>();

        comparisons += pairings.len();
        round = round.advance(&outcomes)?;
    }

    let winner = round.winner().ok_or(InternalError::InternalInvariantFailed)?;
    info!(
        "Tournament finished after {} rounds and {comparisons} comparisons ({degraded} degraded)",
        round.number()
    );

    Ok(TournamentOutput {
        winner,
        comparisons,
        rounds: round.number(),
        degraded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::CallerError, protocol::Score, utils::testing::init_testing};
    use rand::Rng;
    use std::collections::BTreeSet;

    /// Compares scores in the clear.
    #[derive(Default)]
    struct ClearComparator {
        comparisons: usize,
        rounds: Vec<usize>,
    }

    impl PairwiseComparator for ClearComparator {
        fn compare_round(&mut self, pairings: &[(Candidate, Candidate)]) -> Vec<Result<bool>> {
            self.comparisons += pairings.len();
            self.rounds.push(pairings.len());
            pairings
                .iter()
                .map(|(first, second)| Ok(first.score() > second.score()))
                .collect()
        }

        fn fallback_greater_than(&self, first: &Candidate, second: &Candidate) -> bool {
            first.score() > second.score()
        }
    }

    /// Fails the listed comparisons (numbered across the whole run) and always
    /// answers the others with `false`.
    struct FailingComparator {
        failing: BTreeSet<usize>,
        issued: usize,
    }

    impl PairwiseComparator for FailingComparator {
        fn compare_round(&mut self, pairings: &[(Candidate, Candidate)]) -> Vec<Result<bool>> {
            pairings
                .iter()
                .map(|_| {
                    let number = self.issued;
                    self.issued += 1;
                    if self.failing.contains(&number) {
                        Err(InternalError::CommunicationFailure(crate::Role::Responder))
                    } else {
                        Ok(false)
                    }
                })
                .collect()
        }

        fn fallback_greater_than(&self, first: &Candidate, second: &Candidate) -> bool {
            first.score() > second.score()
        }
    }

    fn run_clear(scores: &[Score]) -> Result<(TournamentOutput, ClearComparator)> {
        let mut comparator = ClearComparator::default();
        let output = run_tournament(Round::from_scores(scores)?, &mut comparator)?;
        Ok((output, comparator))
    }

    #[test]
    fn single_candidate_wins_without_comparisons() -> Result<()> {
        let (output, comparator) = run_clear(&[42])?;
        assert_eq!(output.winner(), Candidate::new(42, 0));
        assert_eq!(output.comparisons(), 0);
        assert_eq!(output.rounds(), 0);
        assert!(comparator.rounds.is_empty());
        Ok(())
    }

    #[test]
    fn comparison_counts_follow_elimination_with_byes() -> Result<()> {
        let rng = &mut init_testing();
        for (n, rounds) in [(1, 0), (2, 1), (3, 2), (5, 3), (8, 3), (9, 4), (512, 9)] {
            let scores: Vec<Score> = (0..n).map(|_| rng.gen_range(-1000..1000)).collect();
            let (output, comparator) = run_clear(&scores)?;

            assert_eq!(output.comparisons(), n - 1, "n = {n}");
            assert_eq!(output.comparisons(), expected_comparisons(n), "n = {n}");
            assert_eq!(comparator.comparisons, n - 1, "n = {n}");
            assert_eq!(output.rounds(), rounds, "n = {n}");
            assert_eq!(expected_rounds(n), rounds, "n = {n}");
            assert_eq!(output.degraded(), 0);
        }
        Ok(())
    }

    #[test]
    fn rounds_halve_rounding_up() -> Result<()> {
        let (_, comparator) = run_clear(&[0; 9])?;
        // 9 -> 5 -> 3 -> 2 -> 1
        assert_eq!(comparator.rounds, vec![4, 2, 1, 1]);
        Ok(())
    }

    #[test]
    fn the_maximum_wins() -> Result<()> {
        let rng = &mut init_testing();
        for n in [2usize, 3, 7, 100, 513] {
            let scores: Vec<Score> = (0..n).map(|_| rng.gen_range(0..1_000_000)).collect();
            let max = *scores.iter().max().ok_or(InternalError::InternalInvariantFailed)?;

            let (output, _) = run_clear(&scores)?;
            assert_eq!(output.winner().score(), max);
            assert_eq!(scores[output.winner().original_index()], max);
        }
        Ok(())
    }

    #[test]
    fn ties_advance_the_later_candidate() -> Result<()> {
        let (output, _) = run_clear(&[5, 5])?;
        assert_eq!(output.winner(), Candidate::new(5, 1));

        // All tied: the later candidate of every pair advances, and so does
        // the bye, so the last index wins.
        let (output, _) = run_clear(&[7; 5])?;
        assert_eq!(output.winner().original_index(), 4);

        let (output, _) = run_clear(&[3, 9, 9, 1])?;
        assert_eq!(output.winner().original_index(), 2);
        Ok(())
    }

    #[test]
    fn failed_comparisons_fall_back_locally() -> Result<()> {
        // Pairings of round 0: (0,1) (2,3) (4,5) (6,7). The comparator answers
        // "not greater" everywhere, which would advance the second candidate,
        // but pairing #1 fails and the fallback keeps index 2.
        let scores = [1, 2, 30, 4, 5, 6, 7, 8];
        let mut comparator = FailingComparator {
            failing: BTreeSet::from([1]),
            issued: 0,
        };

        let output = run_tournament(Round::from_scores(&scores)?, &mut comparator)?;

        assert_eq!(output.comparisons(), 7);
        assert_eq!(output.rounds(), 3);
        assert_eq!(output.degraded(), 1);
        // Round 1 is (1, 2, 5, 7): answers "not greater" advance 2 then 7.
        assert_eq!(output.winner().original_index(), 7);
        Ok(())
    }

    #[test]
    fn every_comparison_failing_still_finishes() -> Result<()> {
        let scores: Vec<Score> = (0..33).map(|i| (i * 37) % 101).collect();
        let mut comparator = FailingComparator {
            failing: (0..64).collect(),
            issued: 0,
        };

        let output = run_tournament(Round::from_scores(&scores)?, &mut comparator)?;
        assert_eq!(output.comparisons(), 32);
        assert_eq!(output.degraded(), 32);
        assert_eq!(output.winner().score(), 100);
        Ok(())
    }

    #[test]
    fn empty_candidate_lists_are_rejected() {
        assert_eq!(
            Round::from_scores(&[]).map(|_| ()),
            Err(InternalError::CallingApplicationMistake(CallerError::BadInput))
        );
    }
}
