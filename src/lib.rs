//! MedRisk ML - очистка медицинских датасетов и обучение ансамблей
//!
//! Два этапа: [`pipeline::normalize`] готовит чистый CSV из сырого,
//! [`pipeline::train`] обучает ансамбль с мягким голосованием и сохраняет
//! модель со скейлером.

pub mod artifacts;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod io;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod preprocessing;

pub use error::{PipelineError, Result};
pub use models::*;
pub use preprocessing::*;

// Re-export для удобства
pub use artifacts::{load_model, TrainedModel};
pub use config::{DatasetSpec, PipelineConfig};
pub use pipeline::{normalize_all, train_all, TrainingReport};
