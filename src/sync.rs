// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Synchronized key derivation.
//!
//! Instead of shipping FSS keys from one party to the other, both parties
//! regenerate the same key pair from one shared [`ComparisonSeed`]. The session
//! identifier and the seed are absorbed into a [`Transcript`] under fixed
//! labels and 32 challenge bytes
//! seed a [`ChaCha20Rng`]; that generator is the only randomness handed to the
//! gate's key generation. Both constructions have fixed output, so two parties
//! built with different toolchains derive bit-identical keys. Seeds restart at
//! the same offset in every session; binding the session identifier keeps key
//! pairs from repeating across sessions.
//!
//! Nothing authenticates that the two parties used the same seed. A party that
//! receives a different seed derives different keys and the comparison
//! reconstructs to garbage without either side noticing.

use crate::{
    errors::Result,
    fss::ComparisonGate,
    protocol::{Role, SessionId},
};
use merlin::Transcript;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use zeroize::Zeroize;

/// A 64-bit seed shared by both parties for exactly one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComparisonSeed(u64);

impl ComparisonSeed {
    /// Wrap a raw seed value.
    pub fn new(value: u64) -> Self {
        ComparisonSeed(value)
    }

    /// The raw seed value.
    pub fn value(self) -> u64 {
        self.0
    }

    /// A deterministic generator seeded from this comparison seed within
    /// session `sid`.
    pub fn rng(self, sid: SessionId) -> ChaCha20Rng {
        let mut transcript = Transcript::new(b"bioauth comparison key derivation");
        transcript.append_message(b"session id", sid.as_bytes());
        transcript.append_u64(b"comparison seed", self.0);
        let mut seed = [0u8; 32];
        transcript.challenge_bytes(b"chacha20 seed", &mut seed);
        let rng = ChaCha20Rng::from_seed(seed);
        seed.zeroize();
        rng
    }
}

impl Display for ComparisonSeed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out one fresh [`ComparisonSeed`] per comparison.
///
/// Seeds are `offset + counter`, where the counter counts every comparison of
/// the run, so seeds never repeat within a run.
#[derive(Debug, Clone)]
pub struct SeedAllocator {
    offset: u64,
    issued: u64,
}

impl SeedAllocator {
    /// Start a run whose first seed is `offset`.
    pub fn new(offset: u64) -> Self {
        Self { offset, issued: 0 }
    }

    /// Allocate the next seed.
    pub fn allocate(&mut self) -> ComparisonSeed {
        let seed = ComparisonSeed(self.offset.wrapping_add(self.issued));
        self.issued += 1;
        seed
    }

    /// Number of seeds allocated so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

/// The evaluation keys of a single comparison.
///
/// Scoped to one comparison: never serialized, never reused, wiped on drop.
pub struct DerivedKeyPair<K: Zeroize> {
    seed: ComparisonSeed,
    initiator: K,
    responder: K,
}

/// Derive the key pair of comparison `seed` in session `sid`.
///
/// Both parties call this with the same gate and seed and obtain the same
/// pair; each then evaluates only its own half.
pub fn derive_keys<G: ComparisonGate>(
    gate: &G,
    sid: SessionId,
    seed: ComparisonSeed,
) -> Result<DerivedKeyPair<G::Key>> {
    let mut rng = seed.rng(sid);
    let (initiator, responder) = gate.generate_keys(&mut rng)?;
    Ok(DerivedKeyPair {
        seed,
        initiator,
        responder,
    })
}

impl<K: Zeroize> DerivedKeyPair<K> {
    /// The seed these keys were derived from.
    pub fn seed(&self) -> ComparisonSeed {
        self.seed
    }

    /// The key evaluated by `role`.
    pub fn key_for(&self, role: Role) -> &K {
        match role {
            Role::Initiator => &self.initiator,
            Role::Responder => &self.responder,
        }
    }
}

impl<K: Zeroize> Drop for DerivedKeyPair<K> {
    fn drop(&mut self) {
        self.initiator.zeroize();
        self.responder.zeroize();
    }
}

impl<K: Zeroize> Debug for DerivedKeyPair<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeyPair")
            .field("seed", &self.seed)
            .field("initiator", &"[redacted]")
            .field("responder", &"[redacted]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fss::{DreluKey, SimulatedDrelu},
        utils::testing::init_testing,
    };
    use rand::RngCore;
    use uuid::Uuid;

    #[test]
    fn seeds_are_offset_counters() {
        let mut seeds = SeedAllocator::new(12345);
        assert_eq!(seeds.allocate(), ComparisonSeed::new(12345));
        assert_eq!(seeds.allocate(), ComparisonSeed::new(12346));
        assert_eq!(seeds.allocate(), ComparisonSeed::new(12347));
        assert_eq!(seeds.issued(), 3);
    }

    /// A fixed session, so derived values can be compared against constants.
    fn pinned_session() -> SessionId {
        SessionId::from_uuid(Uuid::from_u128(0x6a3f_1c2e_8d4b_4f7a_9e10_5b2c_7d8e_9f01))
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let rng = &mut init_testing();
        let sid = SessionId::random(rng);
        let mut first = ComparisonSeed::new(99).rng(sid);
        let mut second = ComparisonSeed::new(99).rng(sid);
        let mut other = ComparisonSeed::new(100).rng(sid);

        let a = first.next_u64();
        assert_eq!(a, second.next_u64());
        assert_ne!(a, other.next_u64());
    }

    #[test]
    fn generator_output_is_pinned() {
        // Parties built against other versions of merlin or rand_chacha must
        // still agree on these values.
        let mut rng = ComparisonSeed::new(12345).rng(pinned_session());
        assert_eq!(rng.next_u64(), 0xdd66_28fd_ecd8_8a44);
        assert_eq!(rng.next_u64(), 0x6460_13a9_999d_6461);
    }

    #[test]
    fn derived_keys_are_pinned() -> Result<()> {
        let gate = SimulatedDrelu::new(10)?;
        let keys = derive_keys(&gate, pinned_session(), ComparisonSeed::new(12345))?;

        // The Responder's share is the blind itself; the Initiator adds the
        // step bit, which is 1 at input 0.
        assert_eq!(
            gate.evaluate(Role::Responder, keys.key_for(Role::Responder), 0)?,
            580
        );
        assert_eq!(
            gate.evaluate(Role::Initiator, keys.key_for(Role::Initiator), 0)?,
            581
        );
        Ok(())
    }

    #[test]
    fn sessions_do_not_share_keys() {
        let next_sid = SessionId::from_uuid(Uuid::from_u128(
            0x6a3f_1c2e_8d4b_4f7a_9e10_5b2c_7d8e_9f02,
        ));
        let mut rng = ComparisonSeed::new(12345).rng(next_sid);
        assert_eq!(rng.next_u64(), 0xd5a9_62e5_16ae_72c2);
    }

    #[test]
    fn derivation_is_deterministic_for_both_roles() -> Result<()> {
        let rng = &mut init_testing();
        let sid = SessionId::random(rng);
        let gate = SimulatedDrelu::new(10)?;
        let seed = ComparisonSeed::new(12345);

        // Each party derives on its own; only the session and seed are shared.
        let on_initiator: DerivedKeyPair<DreluKey> = derive_keys(&gate, sid, seed)?;
        let on_responder: DerivedKeyPair<DreluKey> = derive_keys(&gate, sid, seed)?;

        for role in [Role::Initiator, Role::Responder] {
            assert_eq!(on_initiator.key_for(role), on_responder.key_for(role));
            assert_eq!(on_initiator.key_for(role).holder(), role);
        }
        Ok(())
    }

    #[test]
    fn derived_keys_reconstruct_across_parties() -> Result<()> {
        let rng = &mut init_testing();
        let sid = SessionId::random(rng);
        let gate = SimulatedDrelu::new(10)?;
        for value in 0..64 {
            let seed = ComparisonSeed::new(value);
            let initiator_side = derive_keys(&gate, sid, seed)?;
            let responder_side = derive_keys(&gate, sid, seed)?;

            let s0 = gate.evaluate(Role::Initiator, initiator_side.key_for(Role::Initiator), 4)?;
            let s1 = gate.evaluate(Role::Responder, responder_side.key_for(Role::Responder), 4)?;
            assert_eq!(s0.wrapping_sub(s1) & gate.modulus_mask(), 1);
        }
        Ok(())
    }

    #[test]
    fn debug_output_hides_keys() -> Result<()> {
        let gate = SimulatedDrelu::new(10)?;
        let keys = derive_keys(&gate, pinned_session(), ComparisonSeed::new(1))?;
        let printed = format!("{keys:?}");
        assert!(printed.contains("[redacted]"));
        assert!(!printed.contains("blind"));
        Ok(())
    }
}
