// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Error types for the authentication protocol.

use crate::protocol::Role;
use thiserror::Error;

/// The default Result type used in this crate.
pub type Result<T> = std::result::Result<T, InternalError>;

/// Represents an error in the manipulation of internal cryptographic data.
#[derive(Clone, Eq, PartialEq, Error, Debug)]
pub enum InternalError {
    /// An error caused by the calling application.
    #[error("The calling application made a mistake: {0}")]
    CallingApplicationMistake(CallerError),
    /// The peer sent a message that does not follow the protocol.
    #[error("Protocol error, message from {0} does not follow the protocol")]
    ProtocolError(Role),
    /// The channel to the peer failed while sending or receiving.
    #[error("Communication with {0} failed")]
    CommunicationFailure(Role),
    /// A value could not be serialized.
    #[error("Serialization Error")]
    Serialization,
    /// Something that should never happen did.
    #[error("An internal invariant was broken")]
    InternalInvariantFailed,
}

/// Errors that are caused by incorrect behavior by the calling application.
#[derive(Clone, Eq, PartialEq, Error, Debug)]
pub enum CallerError {
    /// The input passed by the caller is not valid.
    #[error("Invalid input")]
    BadInput,
    /// Bytes received from the wire could not be decoded.
    #[error("Deserialization failed")]
    DeserializationFailed,
    /// The participant already produced its output.
    #[error("The protocol has already terminated")]
    ProtocolAlreadyTerminated,
}

impl From<CallerError> for InternalError {
    fn from(err: CallerError) -> Self {
        InternalError::CallingApplicationMistake(err)
    }
}

macro_rules! serialize {
    ($x:expr) => {{
        bincode::serialize($x).map_err(|_| $crate::errors::InternalError::Serialization)
    }};
}

macro_rules! deserialize {
    ($x:expr) => {{
        bincode::deserialize($x).map_err(|_| $crate::errors::CallerError::DeserializationFailed)
    }};
}
