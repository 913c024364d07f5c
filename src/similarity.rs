// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The similarity stage.
//!
//! Similarity scores are computed by an external secret-sharing engine; this
//! module only fixes the boundary the protocol consumes.

use crate::{
    errors::{CallerError, Result},
    protocol::Score,
};
use tracing::{error, instrument};

/// Produces one similarity score per enrolled identity.
pub trait SimilarityEngine {
    /// Run the similarity computation and return the scores revealed to the
    /// calling party, in database order.
    fn reveal_scores(&mut self) -> Result<Vec<Score>>;

    /// Bytes the engine sent to the peer so far.
    fn bytes_sent(&self) -> usize {
        0
    }
}

/// A fixed score vector, revealed as is.
impl SimilarityEngine for Vec<Score> {
    fn reveal_scores(&mut self) -> Result<Vec<Score>> {
        Ok(self.clone())
    }
}

/// Dot products of one query template against every database template,
/// computed in the clear.
#[derive(Debug, Clone)]
pub struct ClearDotProduct {
    query: Vec<Score>,
    database: Vec<Vec<Score>>,
}

impl ClearDotProduct {
    /// Score `query` against each template of `database`. All templates must
    /// have the query's dimension and the database cannot be empty.
    pub fn new(query: Vec<Score>, database: Vec<Vec<Score>>) -> Result<Self> {
        if query.is_empty() || database.is_empty() {
            error!("Need a query template and at least one enrolled template");
            Err(CallerError::BadInput)?
        }
        if let Some(index) = database
            .iter()
            .position(|template| template.len() != query.len())
        {
            error!(
                "Template {index} has dimension {}, expected {}",
                database[index].len(),
                query.len()
            );
            Err(CallerError::BadInput)?
        }
        Ok(Self { query, database })
    }

    /// Length of one template.
    pub fn dimension(&self) -> usize {
        self.query.len()
    }

    /// Number of enrolled templates.
    pub fn database_size(&self) -> usize {
        self.database.len()
    }
}

impl SimilarityEngine for ClearDotProduct {
    #[instrument(skip_all, fields(templates = self.database.len()))]
    fn reveal_scores(&mut self) -> Result<Vec<Score>> {
        Ok(self
            .database
            .iter()
            .map(|template| {
                template
                    .iter()
                    .zip(&self.query)
                    .fold(0 as Score, |acc, (x, y)| acc.wrapping_add(x.wrapping_mul(*y)))
            })
            .collect())
    }
}
