//! Rating predictor abstraction
//!
//! The trained two-tower model is opaque to this service: it maps a 16×16
//! user matrix and a 16-wide item embedding to a single predicted rating.
//! `OnnxPredictor` runs an ONNX export of that model with tract.

use std::path::Path;

use ndarray::Array2;
use tract_onnx::prelude::*;

use crate::{
    error::{AppError, AppResult},
    models::{Embedding, EMBEDDING_DIM, MAX_SAMPLED_RATINGS},
};

/// Predicts a user's rating of one movie
#[cfg_attr(test, mockall::automock)]
pub trait RatingPredictor: Send + Sync {
    /// Scores a single (user matrix, item embedding) pair
    fn predict(&self, user_matrix: &Array2<f32>, item: &Embedding) -> AppResult<f32>;

    /// Predictor name for logging
    fn name(&self) -> &'static str;
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Two-tower model exported to ONNX, executed with tract
pub struct OnnxPredictor {
    plan: OnnxPlan,
}

impl OnnxPredictor {
    /// Loads and optimizes the model at `path`
    ///
    /// Inputs are pinned to a batch of one: `(1, 16, 16)` for the user matrix
    /// and `(1, 16)` for the item embedding.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(AppError::Model(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    f32::fact([1, MAX_SAMPLED_RATINGS, EMBEDDING_DIM]).into(),
                )
            })
            .and_then(|model| model.with_input_fact(1, f32::fact([1, EMBEDDING_DIM]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                AppError::Model(format!(
                    "Failed to load ONNX model from {}: {}",
                    path.display(),
                    e
                ))
            })?;

        tracing::info!(path = %path.display(), "Loaded ONNX rating model");

        Ok(Self { plan })
    }
}

impl RatingPredictor for OnnxPredictor {
    fn predict(&self, user_matrix: &Array2<f32>, item: &Embedding) -> AppResult<f32> {
        if user_matrix.dim() != (MAX_SAMPLED_RATINGS, EMBEDDING_DIM) {
            return Err(AppError::Model(format!(
                "User matrix must be {}x{}, got {:?}",
                MAX_SAMPLED_RATINGS,
                EMBEDDING_DIM,
                user_matrix.dim()
            )));
        }

        let user_input: Tensor = tract_ndarray::Array3::from_shape_fn(
            (1, MAX_SAMPLED_RATINGS, EMBEDDING_DIM),
            |(_, i, j)| user_matrix[[i, j]],
        )
        .into();
        let item_input: Tensor =
            tract_ndarray::Array2::from_shape_fn((1, EMBEDDING_DIM), |(_, j)| item[j]).into();

        let outputs = self
            .plan
            .run(tvec!(user_input.into(), item_input.into()))
            .map_err(|e| AppError::Model(format!("ONNX inference failed: {}", e)))?;

        let scores = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| AppError::Model(format!("Output extraction failed: {}", e)))?;

        scores
            .iter()
            .next()
            .copied()
            .ok_or_else(|| AppError::Model("Model returned an empty output".to_string()))
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_model_fails() {
        let result = OnnxPredictor::load("/nonexistent/model.onnx");
        assert!(matches!(result, Err(AppError::Model(_))));
    }

    #[test]
    fn test_load_garbage_model_fails() {
        let path = std::env::temp_dir().join(format!("not-a-model-{}.onnx", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"definitely not protobuf").unwrap();

        let result = OnnxPredictor::load(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(AppError::Model(_))));
    }
}
