// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Wire messages exchanged between the two parties.

use crate::{
    errors::{InternalError, Result},
    protocol::{Role, SessionId},
};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use tracing::error;

/// The type of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// A comparison seed and both reduced operands, sent by the Initiator.
    CompareRequest,
    /// The Responder's partial share of one comparison result.
    CompareShare,
    /// The Initiator finished its tournament; no more requests will follow.
    Finished,
}

/// A message that can be sent between the two parties.
#[derive(Clone, Serialize, Deserialize)]
pub struct Message {
    message_type: MessageType,
    sid: SessionId,
    from: Role,
    to: Role,
    /// The bincode-encoded payload. Read it through `payload`, which runs
    /// `check_type` against the expected [`MessageType`] before decoding.
    pub(crate) unverified_bytes: Vec<u8>,
}

impl Message {
    /// Creates a new instance of [`Message`] by serializing `contents`.
    pub fn new<T: Serialize>(
        message_type: MessageType,
        sid: SessionId,
        from: Role,
        to: Role,
        contents: &T,
    ) -> Result<Self> {
        Ok(Self {
            message_type,
            sid,
            from,
            to,
            unverified_bytes: serialize!(contents)?,
        })
    }

    /// The type of the message.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The session this message belongs to.
    pub fn id(&self) -> SessionId {
        self.sid
    }

    /// The sender of the message.
    pub fn from(&self) -> Role {
        self.from
    }

    /// The intended recipient of the message.
    pub fn to(&self) -> Role {
        self.to
    }

    /// Number of bytes this message occupies on the wire.
    pub fn wire_size(&self) -> usize {
        bincode::serialized_size(self)
            .map(|size| size as usize)
            .unwrap_or(self.unverified_bytes.len())
    }

    /// Check that the message has the expected type, logging and returning an
    /// error otherwise.
    pub(crate) fn check_type(&self, expected_type: MessageType) -> Result<()> {
        if self.message_type() != expected_type {
            error!(
                "A message was misrouted. Expected {:?}, Got {:?}",
                expected_type,
                self.message_type()
            );
            return Err(InternalError::ProtocolError(self.from));
        }
        Ok(())
    }

    /// Check that the message belongs to session `sid`.
    pub(crate) fn check_session(&self, sid: SessionId) -> Result<()> {
        if self.sid != sid {
            error!(
                "Received a message for session {} while running session {}",
                self.sid, sid
            );
            return Err(InternalError::ProtocolError(self.from));
        }
        Ok(())
    }

    /// Decode the payload after checking the message type.
    pub(crate) fn payload<T: serde::de::DeserializeOwned>(
        &self,
        expected_type: MessageType,
    ) -> Result<T> {
        self.check_type(expected_type)?;
        let payload: T = deserialize!(&self.unverified_bytes)?;
        Ok(payload)
    }
}

impl Debug for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("message_type", &self.message_type)
            .field("sid", &self.sid)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("bytes", &self.unverified_bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::CallerError, utils::testing::init_testing};

    #[test]
    fn payload_requires_matching_type() -> Result<()> {
        let rng = &mut init_testing();
        let sid = SessionId::random(rng);
        let message = Message::new(
            MessageType::Finished,
            sid,
            Role::Initiator,
            Role::Responder,
            &7usize,
        )?;

        assert_eq!(message.payload::<usize>(MessageType::Finished)?, 7);
        assert_eq!(
            message.payload::<usize>(MessageType::CompareShare),
            Err(InternalError::ProtocolError(Role::Initiator))
        );
        Ok(())
    }

    #[test]
    fn truncated_payload_fails_to_decode() -> Result<()> {
        let rng = &mut init_testing();
        let mut message = Message::new(
            MessageType::CompareShare,
            SessionId::random(rng),
            Role::Responder,
            Role::Initiator,
            &(1u64, 2u64),
        )?;
        message.unverified_bytes.truncate(3);

        assert_eq!(
            message.payload::<(u64, u64)>(MessageType::CompareShare),
            Err(CallerError::DeserializationFailed.into())
        );
        Ok(())
    }

    #[test]
    fn foreign_sessions_are_rejected() -> Result<()> {
        let rng = &mut init_testing();
        let message = Message::new(
            MessageType::Finished,
            SessionId::random(rng),
            Role::Initiator,
            Role::Responder,
            &0usize,
        )?;
        assert!(message.check_session(message.id()).is_ok());
        assert!(message.check_session(SessionId::random(rng)).is_err());
        Ok(())
    }
}
