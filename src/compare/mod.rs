//! Pairwise secure comparison.
//!
//! # High-level protocol description
//! One comparison resolves "is `a` strictly greater than `b`" and runs as
//! follows:
//! - The Initiator allocates a fresh [`ComparisonSeed`] and sends it, together
//!   with both reduced operands, to the Responder in a [`CompareRequest`].
//! - Both parties derive the same key pair from the session identifier and
//!   the seed (see [`crate::sync`]), compute the masked difference `a - b - 1 mod 2^bits`,
//!   and evaluate the comparison gate with their own key to obtain one
//!   additive share of the result.
//! - The Responder returns its share in a [`CompareShare`]. The Initiator
//!   subtracts the two shares modulo `2^bits`; a nonzero result means `a > b`.
//!
//! Operands are reduced to the `bits`-wide magnitude domain as
//! `|score| mod 2^bits`. The outcome is exact when the reduced operands differ
//! by less than `2^(bits - 1)`.
// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

mod initiator;
mod responder;

pub use initiator::SecureComparator;
pub use responder::{ComparisonResponder, Served};

use crate::{
    errors::Result,
    fss::{ring_mask, ComparisonGate},
    protocol::{Role, Score, SessionId},
    sync::{derive_keys, ComparisonSeed},
};
use serde::{Deserialize, Serialize};

/// Request for one comparison, sent by the Initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRequest {
    seed: ComparisonSeed,
    operand_a: u64,
    operand_b: u64,
}

impl CompareRequest {
    /// The seed of the comparison.
    pub fn seed(&self) -> ComparisonSeed {
        self.seed
    }
}

/// The Responder's partial share of one comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareShare {
    seed: ComparisonSeed,
    share: u64,
}

/// Sent by the Initiator once its tournament is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finished {
    comparisons: usize,
}

impl Finished {
    /// Number of comparisons the Initiator performed, including degraded ones.
    pub fn comparisons(&self) -> usize {
        self.comparisons
    }
}

/// Reduce a score to the `bits`-wide unsigned magnitude domain.
pub(crate) fn reduce_operand(score: Score, bits: u32) -> u64 {
    score.unsigned_abs() & ring_mask(bits)
}

/// `a - b - 1 mod 2^bits`.
pub(crate) fn masked_difference(operand_a: u64, operand_b: u64, bits: u32) -> u64 {
    operand_a.wrapping_sub(operand_b).wrapping_sub(1) & ring_mask(bits)
}

/// Derive the keys of the comparison described by `request` in session `sid`
/// and evaluate the gate as `role`.
pub(crate) fn evaluate_share<G: ComparisonGate>(
    gate: &G,
    role: Role,
    sid: SessionId,
    request: &CompareRequest,
) -> Result<u64> {
    let keys = derive_keys(gate, sid, request.seed)?;
    let input = masked_difference(request.operand_a, request.operand_b, gate.bits());
    gate.evaluate(role, keys.key_for(role), input)
}

/// Combine the Initiator's and the Responder's shares into the comparison
/// outcome.
pub(crate) fn reconstruct(initiator_share: u64, responder_share: u64, bits: u32) -> bool {
    initiator_share.wrapping_sub(responder_share) & ring_mask(bits) != 0
}
