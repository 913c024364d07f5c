// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    errors::{CallerError, Result},
    protocol::Score,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Width of the comparison ring used when none is configured.
pub(crate) const DEFAULT_COMPARISON_BITS: u32 = 10;
/// Score a plausible winner must reach to authenticate.
pub(crate) const DEFAULT_AUTHENTICATION_THRESHOLD: Score = 1_000_000;
/// Number of enrolled identities.
pub(crate) const DEFAULT_DATABASE_SIZE: usize = 512;
/// Length of one biometric template.
pub(crate) const DEFAULT_TEMPLATE_DIMENSION: usize = 1024;
/// First comparison seed of a run.
pub(crate) const DEFAULT_SEED_OFFSET: u64 = 12345;

/// Deployment parameters shared by both parties.
///
/// Both parties must run with the same configuration. In particular a
/// mismatched `bits` makes every comparison meaningless, and nothing detects
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    bits: u32,
    threshold: Score,
    database_size: usize,
    template_dimension: usize,
    seed_offset: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            bits: DEFAULT_COMPARISON_BITS,
            threshold: DEFAULT_AUTHENTICATION_THRESHOLD,
            database_size: DEFAULT_DATABASE_SIZE,
            template_dimension: DEFAULT_TEMPLATE_DIMENSION,
            seed_offset: DEFAULT_SEED_OFFSET,
        }
    }
}

impl ProtocolConfig {
    /// Build a configuration, checking that
    /// - `bits` lies in `1..=63`,
    /// - `database_size` and `template_dimension` are non-zero.
    pub fn new(
        bits: u32,
        threshold: Score,
        database_size: usize,
        template_dimension: usize,
    ) -> Result<Self> {
        if !(1..=63).contains(&bits) {
            error!("Comparison width must lie in 1..=63, got {bits}");
            Err(CallerError::BadInput)?
        }
        if database_size == 0 {
            error!("The enrollment database cannot be empty");
            Err(CallerError::BadInput)?
        }
        if template_dimension == 0 {
            error!("Templates must have at least one coordinate");
            Err(CallerError::BadInput)?
        }
        Ok(Self {
            bits,
            threshold,
            database_size,
            template_dimension,
            seed_offset: DEFAULT_SEED_OFFSET,
        })
    }

    /// Replace the first comparison seed of each run.
    pub fn with_seed_offset(mut self, seed_offset: u64) -> Self {
        self.seed_offset = seed_offset;
        self
    }

    /// Width of the comparison ring.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// The authentication threshold.
    pub fn threshold(&self) -> Score {
        self.threshold
    }

    /// Number of enrolled identities.
    pub fn database_size(&self) -> usize {
        self.database_size
    }

    /// Length of a template.
    pub fn template_dimension(&self) -> usize {
        self.template_dimension
    }

    /// The first comparison seed of a run.
    pub fn seed_offset(&self) -> u64 {
        self.seed_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InternalError;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = ProtocolConfig::default();
        assert_eq!(config.bits(), 10);
        assert_eq!(config.threshold(), 1_000_000);
        assert_eq!(config.database_size(), 512);
        assert_eq!(config.template_dimension(), 1024);
        assert_eq!(config.seed_offset(), 12345);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let bad_input = Err(InternalError::CallingApplicationMistake(CallerError::BadInput));
        assert_eq!(ProtocolConfig::new(0, 1, 1, 1), bad_input);
        assert_eq!(ProtocolConfig::new(64, 1, 1, 1), bad_input);
        assert_eq!(ProtocolConfig::new(10, 1, 0, 1), bad_input);
        assert_eq!(ProtocolConfig::new(10, 1, 1, 0), bad_input);
        assert!(ProtocolConfig::new(32, 1, 1, 1).is_ok());
    }

    #[test]
    fn seed_offset_can_be_replaced() -> Result<()> {
        let config = ProtocolConfig::new(10, 5, 8, 4)?.with_seed_offset(7);
        assert_eq!(config.seed_offset(), 7);
        Ok(())
    }
}
