//! Boundary to the function-secret-sharing (FSS) primitive library.
//!
//! The protocol never constructs FSS keys itself. It hands a seeded generator
//! to [`ComparisonGate::generate_keys`], feeds a masked input to
//! [`ComparisonGate::evaluate`], and consumes the resulting partial shares.
//! Two partial shares of the same comparison combine, by subtraction modulo
//! `2^bits`, into the gate output.
// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

mod drelu;

pub use drelu::{DreluKey, SimulatedDrelu};

use crate::{errors::Result, protocol::Role};
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;
use zeroize::Zeroize;

/// A two-party comparison gate over the `bits`-wide ring `Z_{2^bits}`.
///
/// The gate evaluates the step function "is the input, read as a `bits`-wide
/// two's-complement value, non-negative" in shared form: each party evaluates
/// its own key on the same public masked input and obtains one additive
/// share of the output bit.
pub trait ComparisonGate {
    /// The evaluation key held by one party.
    type Key: Zeroize + Debug;

    /// Width of the input and output ring.
    fn bits(&self) -> u32;

    /// Generate the key pair `(initiator_key, responder_key)` using `rng` as
    /// the only source of randomness.
    ///
    /// Two calls with generators in the same state must return the same keys.
    fn generate_keys<R: RngCore + CryptoRng>(&self, rng: &mut R)
        -> Result<(Self::Key, Self::Key)>;

    /// Evaluate `key` on `masked_input` as party `role`, returning that
    /// party's partial share.
    fn evaluate(&self, role: Role, key: &Self::Key, masked_input: u64) -> Result<u64>;

    /// Bit mask selecting the low `bits` bits.
    fn modulus_mask(&self) -> u64 {
        ring_mask(self.bits())
    }
}

/// Bit mask for the ring `Z_{2^bits}`. Widths of 64 and above select every
/// bit.
pub(crate) fn ring_mask(bits: u32) -> u64 {
    1u64.checked_shl(bits).map_or(u64::MAX, |modulus| modulus - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_saturate_at_the_word_size() {
        assert_eq!(ring_mask(0), 0);
        assert_eq!(ring_mask(10), 1023);
        assert_eq!(ring_mask(63), u64::MAX >> 1);
        assert_eq!(ring_mask(64), u64::MAX);
        assert_eq!(ring_mask(200), u64::MAX);
    }
}
