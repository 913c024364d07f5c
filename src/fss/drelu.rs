// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use super::{ring_mask, ComparisonGate};
use crate::{
    errors::{CallerError, Result},
    protocol::Role,
};
use rand::{CryptoRng, Rng, RngCore};
use std::fmt::{Debug, Formatter};
use tracing::error;
use zeroize::Zeroize;

/// Evaluation key of a [`SimulatedDrelu`] gate.
#[derive(Clone, PartialEq, Eq, Zeroize)]
pub struct DreluKey {
    #[zeroize(skip)]
    holder: Role,
    blind: u64,
}

impl DreluKey {
    /// The party this key was generated for.
    pub fn holder(&self) -> Role {
        self.holder
    }
}

impl Debug for DreluKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DreluKey")
            .field("holder", &self.holder)
            .field("blind", &"[redacted]")
            .finish()
    }
}

/// In-process stand-in for an FSS DReLU (derivative of ReLU) gate.
///
/// Both keys carry the same uniformly random blind `r`. The Initiator's share
/// is `step(x) + r` and the Responder's share is `r`, so the shares subtract
/// to `step(x)` exactly as the shares of a real FSS gate do. Unlike a real
/// gate, the shares are computed from the cleartext masked input; this type
/// provides the arithmetic of the gate, not its privacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedDrelu {
    bits: u32,
}

impl SimulatedDrelu {
    /// Create a gate over `Z_{2^bits}`; `bits` must lie in `1..=63`.
    pub fn new(bits: u32) -> Result<Self> {
        if !(1..=63).contains(&bits) {
            error!("Comparison gate width must lie in 1..=63, got {bits}");
            Err(CallerError::BadInput)?
        }
        Ok(Self { bits })
    }

    /// 1 if `x`, read as a `bits`-wide two's-complement value, is
    /// non-negative; 0 otherwise.
    fn step(&self, x: u64) -> u64 {
        let sign_bit = 1u64 << (self.bits - 1);
        u64::from(x & sign_bit == 0)
    }
}

impl ComparisonGate for SimulatedDrelu {
    type Key = DreluKey;

    fn bits(&self) -> u32 {
        self.bits
    }

    fn generate_keys<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<(DreluKey, DreluKey)> {
        let blind = rng.gen::<u64>() & ring_mask(self.bits);
        Ok((
            DreluKey {
                holder: Role::Initiator,
                blind,
            },
            DreluKey {
                holder: Role::Responder,
                blind,
            },
        ))
    }

    fn evaluate(&self, role: Role, key: &DreluKey, masked_input: u64) -> Result<u64> {
        if key.holder != role {
            error!(
                "{} tried to evaluate a key generated for {}",
                role, key.holder
            );
            Err(CallerError::BadInput)?
        }
        let mask = self.modulus_mask();
        let x = masked_input & mask;
        let share = match role {
            Role::Initiator => self.step(x).wrapping_add(key.blind),
            Role::Responder => key.blind,
        };
        Ok(share & mask)
    }
}
