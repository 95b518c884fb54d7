use std::sync::Arc;

use rand::{rngs::StdRng, SeedableRng};

use crate::services::{
    embeddings::EmbeddingTable, predictor::RatingPredictor, recommendations::Recommender,
};

/// Shared application state
///
/// Everything inside is built once before the server starts accepting
/// requests and is read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

impl AppState {
    /// Creates state whose sampler is seeded from `seed`, or from OS entropy when `None`
    pub fn new(
        table: EmbeddingTable,
        predictor: Arc<dyn RatingPredictor>,
        seed: Option<u64>,
    ) -> Self {
        let table = Arc::new(table);
        let recommender = match seed {
            Some(seed) => Recommender::with_rng(table, predictor, StdRng::seed_from_u64(seed)),
            None => Recommender::new(table, predictor),
        };

        Self {
            recommender: Arc::new(recommender),
        }
    }
}
