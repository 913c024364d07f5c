// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Two-party secure tournament comparison and authentication decision.
//!
//! A client holds a biometric query template and a server holds an enrollment
//! database. Once the two parties have computed one similarity score per
//! enrolled identity, this crate determines which identity matches best and
//! whether that match clears an authentication threshold.
//!
//! # High-level protocol description
//! The protocol runs in three stages:
//! - The similarity stage reveals one score per enrolled identity to the
//!   calling party. It is provided by an external secret-sharing engine behind
//!   the [`SimilarityEngine`] trait.
//! - The tournament stage reduces the scores to a single winner through a
//!   single-elimination tournament of pairwise secure comparisons. Every
//!   comparison derives its function-secret-sharing keys on both parties from
//!   one shared [`ComparisonSeed`], so no key material crosses the wire. All
//!   comparisons of a round are pipelined onto the [`Channel`] before any reply
//!   is collected.
//! - The decision stage checks that the winner is plausible and applies the
//!   authentication threshold.
//!
//! The two parties are modelled by one generic [`Party`] whose role
//! ([`Initiator`] or [`Responder`]) is fixed when it is built.
//!
//! # Known weaknesses
//! - Comparison seeds are a counter plus an offset and are trusted by the
//!   Responder as received. Nothing authenticates that both parties used the
//!   same seed; a desynchronized seed silently corrupts that comparison.
//! - The plausibility check of the decision stage only range-checks the winner
//!   index and the sign of its score. It stands in for a MAC check of the
//!   secret-sharing engine.
//! - The shipped [`SimulatedDrelu`] gate and [`ClearDotProduct`] engine are
//!   in-process stand-ins for the external cryptographic libraries and hide
//!   nothing.

#![allow(clippy::module_inception)]
#![warn(missing_docs)]

#[macro_use]
pub mod errors;

pub mod channel;
pub mod compare;
mod config;
pub mod decision;
pub mod fss;
pub mod messages;
mod metrics;
pub mod party;
mod protocol;
pub mod similarity;
pub mod sync;
pub mod tournament;
mod utils;

pub use channel::{Channel, FaultyChannel, InMemoryChannel};
pub use config::ProtocolConfig;
pub use decision::{AuthenticationDecision, DecisionStage};
pub use fss::{ComparisonGate, SimulatedDrelu};
pub use metrics::PhaseMetrics;
pub use party::{Initiator, Party, PartyRole, Responder, ResponderReport, SessionReport};
pub use protocol::{Role, Score, SessionId};
pub use similarity::{ClearDotProduct, SimilarityEngine};
pub use sync::{ComparisonSeed, DerivedKeyPair, SeedAllocator};
pub use tournament::{Candidate, Round, TournamentOutput};
