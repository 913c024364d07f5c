// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Point-to-point transport between the two parties.
//!
//! The connection lifecycle belongs to the calling application. This module
//! only fixes the interface the protocol needs and ships an in-process
//! implementation over [`std::sync::mpsc`] channels, plus a wrapper that
//! injects receive failures.

use crate::{
    errors::{InternalError, Result},
    messages::Message,
    protocol::Role,
};
use std::{
    collections::BTreeSet,
    sync::mpsc::{channel, Receiver, Sender},
};
use tracing::{error, trace, warn};

/// A blocking point-to-point channel to the other party.
pub trait Channel {
    /// The role of the party that owns this end of the channel.
    fn role(&self) -> Role;

    /// Queue `message` for the peer. This never waits for the peer; it fails
    /// only if the transport is already gone.
    fn send(&mut self, message: Message) -> Result<()>;

    /// Block until the next message from the peer arrives, or fail if the
    /// transport fails. Messages are never partially delivered.
    fn receive(&mut self) -> Result<Message>;

    /// Total number of bytes sent so far.
    fn bytes_sent(&self) -> usize;

    /// Total number of bytes received so far.
    fn bytes_received(&self) -> usize;
}

/// One end of an in-process channel pair.
#[derive(Debug)]
pub struct InMemoryChannel {
    role: Role,
    outgoing: Sender<Message>,
    incoming: Receiver<Message>,
    bytes_sent: usize,
    bytes_received: usize,
}

impl InMemoryChannel {
    /// Create a connected pair of channel ends: the first is owned by the
    /// Initiator, the second by the Responder.
    pub fn pair() -> (Self, Self) {
        let (to_responder, from_initiator) = channel();
        let (to_initiator, from_responder) = channel();
        (
            Self {
                role: Role::Initiator,
                outgoing: to_responder,
                incoming: from_responder,
                bytes_sent: 0,
                bytes_received: 0,
            },
            Self {
                role: Role::Responder,
                outgoing: to_initiator,
                incoming: from_initiator,
                bytes_sent: 0,
                bytes_received: 0,
            },
        )
    }
}

impl Channel for InMemoryChannel {
    fn role(&self) -> Role {
        self.role
    }

    fn send(&mut self, message: Message) -> Result<()> {
        if message.to() != self.role.peer() {
            error!(
                "{} tried to address a message to {}",
                self.role,
                message.to()
            );
            return Err(InternalError::InternalInvariantFailed);
        }
        let size = message.wire_size();
        trace!("{} sending {:?}", self.role, message);
        self.outgoing.send(message).map_err(|_| {
            warn!("{} could not send: the peer hung up", self.role);
            InternalError::CommunicationFailure(self.role.peer())
        })?;
        self.bytes_sent += size;
        Ok(())
    }

    fn receive(&mut self) -> Result<Message> {
        let message = self.incoming.recv().map_err(|_| {
            warn!("{} could not receive: the peer hung up", self.role);
            InternalError::CommunicationFailure(self.role.peer())
        })?;
        self.bytes_received += message.wire_size();
        trace!("{} received {:?}", self.role, message);
        Ok(message)
    }

    fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    fn bytes_received(&self) -> usize {
        self.bytes_received
    }
}

/// Wraps a [`Channel`] and fails selected receive calls.
///
/// Receive calls are numbered from zero. A failing receive still consumes the
/// underlying message, so the peer's reply is lost exactly as it would be on a
/// broken link.
#[derive(Debug)]
pub struct FaultyChannel<C: Channel> {
    inner: C,
    failing_receives: BTreeSet<usize>,
    receives: usize,
}

impl<C: Channel> FaultyChannel<C> {
    /// Wrap `inner`, failing the receive calls listed in `failing_receives`.
    pub fn new(inner: C, failing_receives: impl IntoIterator<Item = usize>) -> Self {
        Self {
            inner,
            failing_receives: failing_receives.into_iter().collect(),
            receives: 0,
        }
    }

    /// Unwrap the underlying channel.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: Channel> Channel for FaultyChannel<C> {
    fn role(&self) -> Role {
        self.inner.role()
    }

    fn send(&mut self, message: Message) -> Result<()> {
        self.inner.send(message)
    }

    fn receive(&mut self) -> Result<Message> {
        let call = self.receives;
        self.receives += 1;
        let message = self.inner.receive()?;
        if self.failing_receives.contains(&call) {
            warn!("Dropping receive #{call} ({:?})", message.message_type());
            return Err(InternalError::CommunicationFailure(self.role().peer()));
        }
        Ok(message)
    }

    fn bytes_sent(&self) -> usize {
        self.inner.bytes_sent()
    }

    fn bytes_received(&self) -> usize {
        self.inner.bytes_received()
    }
}
