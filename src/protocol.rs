// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// A cleartext similarity score as revealed by the similarity engine.
pub type Score = i64;

/// The role a party plays in the comparison protocol.
///
/// Roles are fixed when a party starts and are never renegotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Party 0: the client holding the query template. Drives every
    /// comparison and learns the authentication outcome.
    Initiator,
    /// Party 1: the server holding the enrollment database. Answers
    /// comparison requests.
    Responder,
}

impl Role {
    /// The integer party identifier of this role.
    pub fn party_id(self) -> usize {
        match self {
            Role::Initiator => 0,
            Role::Responder => 1,
        }
    }

    /// The role of the other party.
    pub fn peer(self) -> Role {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Initiator => write!(f, "Initiator(0)"),
            Role::Responder => write!(f, "Responder(1)"),
        }
    }
}

/// A session identifier agreed on by both parties before a session starts.
///
/// Every [`Message`](crate::messages::Message) carries the identifier of the
/// session it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Sample a fresh session identifier.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        SessionId(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    /// Wrap an identifier chosen by the calling application.
    pub fn from_uuid(id: Uuid) -> Self {
        SessionId(id)
    }

    /// The identifier as 16 big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
