//! HTTP service that predicts movie ratings with a pre-trained two-tower model.
//!
//! At startup the movie embedding table and the ONNX model are loaded once;
//! `POST /recommend` then scores every movie the user has not rated and
//! returns the ten highest and ten lowest predictions.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
