use serde::{Deserialize, Serialize};

/// Width of every movie embedding and of each user-matrix row
pub const EMBEDDING_DIM: usize = 16;

/// Maximum number of ratings encoded into a user matrix
pub const MAX_SAMPLED_RATINGS: usize = 16;

/// Global mean rating of the training data, subtracted from every raw rating
pub const RATING_OFFSET: f64 = 3.687599378308004;

/// Length of the top and bottom lists in a recommendation
pub const LIST_LEN: usize = 10;

/// Integer movie identifier as it appears in the embedding table
pub type MovieId = i64;

/// Precomputed latent vector of one movie
pub type Embedding = [f32; EMBEDDING_DIM];

/// One rating supplied by the client
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UserRating {
    pub movie_id: MovieId,
    pub rating: f64,
}

/// Body of `POST /recommend`
///
/// Accepts either `{"user_ratings": [...]}` or a bare list of ratings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RecommendRequest {
    Wrapped { user_ratings: Vec<UserRating> },
    Bare(Vec<UserRating>),
}

impl RecommendRequest {
    pub fn into_ratings(self) -> Vec<UserRating> {
        match self {
            RecommendRequest::Wrapped { user_ratings } => user_ratings,
            RecommendRequest::Bare(user_ratings) => user_ratings,
        }
    }
}

/// Predicted rating for one candidate movie
///
/// Serialized as a two-element array `[movie_id, predicted_rating]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Prediction(pub MovieId, pub f32);

impl Prediction {
    pub fn movie_id(&self) -> MovieId {
        self.0
    }

    pub fn rating(&self) -> f32 {
        self.1
    }
}

/// Highest and lowest predicted movies for a user
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendResponse {
    /// Descending by predicted rating
    pub top_10: Vec<Prediction>,
    /// Ascending by predicted rating
    pub bottom_10: Vec<Prediction>,
}
