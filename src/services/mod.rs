pub mod embeddings;
pub mod predictor;
pub mod recommendations;
pub mod user_matrix;

pub use embeddings::EmbeddingTable;
pub use predictor::{OnnxPredictor, RatingPredictor};
pub use recommendations::Recommender;
