use ndarray::Array2;
use rand::{seq::SliceRandom, Rng};

use crate::{
    models::{UserRating, EMBEDDING_DIM, MAX_SAMPLED_RATINGS, RATING_OFFSET},
    services::embeddings::EmbeddingTable,
};

/// Picks the ratings that will populate the user matrix
///
/// Up to 16 ratings are used as given. Longer lists are reduced to a uniform
/// random sample of 16 without replacement.
pub fn select_ratings<R: Rng + ?Sized>(ratings: &[UserRating], rng: &mut R) -> Vec<UserRating> {
    if ratings.len() > MAX_SAMPLED_RATINGS {
        ratings
            .choose_multiple(rng, MAX_SAMPLED_RATINGS)
            .copied()
            .collect()
    } else {
        ratings.to_vec()
    }
}

/// Encodes ratings as a 16×16 matrix
///
/// Row `i` is the embedding of the `i`-th selected movie scaled by
/// `rating - RATING_OFFSET`. Unknown movies contribute a zero row, and rows
/// past the last selected rating stay zero.
pub fn build_user_matrix(selected: &[UserRating], table: &EmbeddingTable) -> Array2<f32> {
    let mut matrix = Array2::zeros((MAX_SAMPLED_RATINGS, EMBEDDING_DIM));

    for (mut row, entry) in matrix.rows_mut().into_iter().zip(selected) {
        let weight = (entry.rating - RATING_OFFSET) as f32;
        let embedding = table.vector_or_zero(entry.movie_id);
        for (cell, value) in row.iter_mut().zip(embedding.iter()) {
            *cell = value * weight;
        }
    }

    matrix
}
