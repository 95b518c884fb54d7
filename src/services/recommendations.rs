use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use ndarray::Array2;
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{MovieId, Prediction, RecommendResponse, UserRating, LIST_LEN},
    services::{
        embeddings::EmbeddingTable,
        predictor::RatingPredictor,
        user_matrix::{build_user_matrix, select_ratings},
    },
};

/// Produces top and bottom predicted movies for a user's ratings
///
/// Holds the startup-loaded embedding table and model, which are never
/// mutated afterwards, plus the random source used to sample long rating
/// lists.
pub struct Recommender {
    table: Arc<EmbeddingTable>,
    predictor: Arc<dyn RatingPredictor>,
    rng: Mutex<StdRng>,
}

impl Recommender {
    /// Creates a recommender seeded from OS entropy
    pub fn new(table: Arc<EmbeddingTable>, predictor: Arc<dyn RatingPredictor>) -> Self {
        Self::with_rng(table, predictor, StdRng::from_entropy())
    }

    /// Creates a recommender with an explicit random source
    pub fn with_rng(
        table: Arc<EmbeddingTable>,
        predictor: Arc<dyn RatingPredictor>,
        rng: StdRng,
    ) -> Self {
        Self {
            table,
            predictor,
            rng: Mutex::new(rng),
        }
    }

    pub fn table(&self) -> &EmbeddingTable {
        &self.table
    }

    /// Scores every unrated catalog movie and returns the extremes
    ///
    /// The scoring loop is CPU-bound and runs on the blocking pool. It calls
    /// the predictor once per candidate, in catalog order.
    pub async fn recommend(&self, ratings: Vec<UserRating>) -> AppResult<RecommendResponse> {
        if ratings.is_empty() {
            return Err(AppError::InvalidInput("No user ratings provided.".to_string()));
        }

        let selected = {
            let mut rng = self.rng.lock().await;
            select_ratings(&ratings, &mut *rng)
        };

        let table = Arc::clone(&self.table);
        let predictor = Arc::clone(&self.predictor);

        tokio::task::spawn_blocking(move || {
            rank_candidates(&table, predictor.as_ref(), &ratings, &selected)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

/// Synchronous core of a recommendation
///
/// `ratings` determines which movies are excluded; `selected` is the subset
/// encoded into the user matrix.
pub fn rank_candidates(
    table: &EmbeddingTable,
    predictor: &dyn RatingPredictor,
    ratings: &[UserRating],
    selected: &[UserRating],
) -> AppResult<RecommendResponse> {
    let start = Instant::now();

    let rated: HashSet<MovieId> = ratings.iter().map(|r| r.movie_id).collect();
    let user_matrix = build_user_matrix(selected, table);
    let predictions = score_candidates(table, predictor, &user_matrix, &rated)?;

    tracing::info!(
        ratings = ratings.len(),
        sampled = selected.len(),
        candidates = predictions.len(),
        predictor = predictor.name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Scored candidates"
    );

    Ok(select_extremes(predictions))
}

/// Predicts a rating for each catalog movie not in `rated`
///
/// The first predictor error aborts the whole request.
pub fn score_candidates(
    table: &EmbeddingTable,
    predictor: &dyn RatingPredictor,
    user_matrix: &Array2<f32>,
    rated: &HashSet<MovieId>,
) -> AppResult<Vec<Prediction>> {
    let mut predictions = Vec::with_capacity(table.len().saturating_sub(rated.len()));

    for &movie_id in table.catalog() {
        if rated.contains(&movie_id) {
            continue;
        }
        let item = table.vector_or_zero(movie_id);
        let predicted = predictor.predict(user_matrix, &item)?;
        predictions.push(Prediction(movie_id, predicted));
    }

    Ok(predictions)
}

/// Ascending by rating; `0.0` and `-0.0` are equal, as is anything compared with NaN
fn compare_ratings(a: &Prediction, b: &Prediction) -> Ordering {
    a.rating().partial_cmp(&b.rating()).unwrap_or(Ordering::Equal)
}

/// Splits predictions into the ten highest and ten lowest
///
/// Both lists are literal slices of one descending sort, so with fewer than
/// twenty predictions the same movie can appear in both. Equal ratings keep
/// their scoring order.
pub fn select_extremes(mut predictions: Vec<Prediction>) -> RecommendResponse {
    if predictions.is_empty() {
        return RecommendResponse::default();
    }

    predictions.sort_by(|a, b| compare_ratings(b, a));

    let top_10 = predictions.iter().take(LIST_LEN).copied().collect();

    let tail_start = predictions.len().saturating_sub(LIST_LEN);
    let mut bottom_10 = predictions[tail_start..].to_vec();
    bottom_10.sort_by(compare_ratings);

    RecommendResponse { top_10, bottom_10 }
}
