//! Сохранение и загрузка обученных моделей и скейлеров (bincode)
//!
//! На каждый датасет два файла: `{name}_model.bin` и `{name}_scaler.bin`.
//! Оба хранят упорядоченный список признаков, и при загрузке списки
//! обязаны совпадать.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::frame::to_matrix;
use crate::models::SoftVotingEnsemble;
use crate::preprocessing::StandardScaler;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub dataset: String,
    pub feature_columns: Vec<String>,
    pub ensemble: SoftVotingEnsemble,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub dataset: String,
    pub feature_columns: Vec<String>,
    pub scaler: StandardScaler,
}

pub fn model_path(models_dir: &Path, dataset: &str) -> PathBuf {
    models_dir.join(format!("{}_model.bin", dataset))
}

pub fn scaler_path(models_dir: &Path, dataset: &str) -> PathBuf {
    models_dir.join(format!("{}_scaler.bin", dataset))
}

fn write_bincode<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, value)?;
    Ok(())
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

impl ModelArtifact {
    pub fn save(&self, models_dir: &Path) -> Result<PathBuf> {
        let path = model_path(models_dir, &self.dataset);
        write_bincode(self, &path)?;
        Ok(path)
    }

    pub fn load(models_dir: &Path, dataset: &str) -> Result<Self> {
        read_bincode(&model_path(models_dir, dataset))
    }

    pub fn classes(&self) -> &[i64] {
        self.ensemble.classes()
    }
}

impl ScalerArtifact {
    pub fn save(&self, models_dir: &Path) -> Result<PathBuf> {
        let path = scaler_path(models_dir, &self.dataset);
        write_bincode(self, &path)?;
        Ok(path)
    }

    pub fn load(models_dir: &Path, dataset: &str) -> Result<Self> {
        read_bincode(&scaler_path(models_dir, dataset))
    }
}

/// Модель и скейлер одного датасета, проверенные на согласованность
#[derive(Debug, Clone)]
pub struct TrainedModel {
    model: ModelArtifact,
    scaler: ScalerArtifact,
}

impl TrainedModel {
    pub fn new(model: ModelArtifact, scaler: ScalerArtifact) -> Result<Self> {
        if model.feature_columns != scaler.feature_columns {
            return Err(PipelineError::SchemaMismatch {
                scaler: scaler.feature_columns,
                model: model.feature_columns,
            });
        }
        if scaler.scaler.n_features() != scaler.feature_columns.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} scaler features", scaler.feature_columns.len()),
                actual: format!("{} scaler features", scaler.scaler.n_features()),
            });
        }
        Ok(Self { model, scaler })
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.model.feature_columns
    }

    pub fn classes(&self) -> &[i64] {
        self.model.classes()
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.model.trained_at
    }

    /// Выбирает признаки по имени, масштабирует и предсказывает классы
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<i64>> {
        let features = to_matrix(df, &self.model.feature_columns)?;
        let scaled = self.scaler.scaler.transform(&features)?;
        self.model.ensemble.predict(&scaled)
    }
}

/// Загружает пару артефактов датасета
pub fn load_model(models_dir: impl AsRef<Path>, dataset: &str) -> Result<TrainedModel> {
    let models_dir = models_dir.as_ref();
    let model = ModelArtifact::load(models_dir, dataset)?;
    let scaler = ScalerArtifact::load(models_dir, dataset)?;
    tracing::debug!(dataset, trained_at = %model.trained_at, "artifacts loaded");
    TrainedModel::new(model, scaler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnsembleConfig;
    use ndarray::Array2;
    use polars::prelude::{NamedFrom, Series};

    fn fitted() -> (ModelArtifact, ScalerArtifact, DataFrame) {
        let names = vec!["a".to_string(), "b".to_string()];
        let a: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..20).map(|i| (i % 3) as f64).collect();
        let y: Vec<i64> = (0..20).map(|i| if i < 10 { 0 } else { 1 }).collect();

        let df = DataFrame::new(vec![
            Series::new("a".into(), a).into(),
            Series::new("b".into(), b).into(),
        ])
        .unwrap();

        let x: Array2<f64> = to_matrix(&df, &names).unwrap();
        let mut scaler = StandardScaler::new();
        let x = scaler.fit_transform(&x).unwrap();

        let config = EnsembleConfig {
            forest_trees: 5,
            boosting_rounds: 5,
            logistic_max_iter: 100,
            ..Default::default()
        };
        let mut ensemble = SoftVotingEnsemble::from_config(&config, 42);
        ensemble.fit(&x, &y).unwrap();

        let model = ModelArtifact {
            dataset: "toy".to_string(),
            feature_columns: names.clone(),
            ensemble,
            trained_at: Utc::now(),
        };
        let scaler = ScalerArtifact {
            dataset: "toy".to_string(),
            feature_columns: names,
            scaler,
        };
        (model, scaler, df)
    }

    #[test]
    fn test_round_trip_predicts_the_same() {
        let dir = tempfile::tempdir().unwrap();
        let (model, scaler, df) = fitted();

        let in_memory = TrainedModel::new(model.clone(), scaler.clone()).unwrap();
        let expected = in_memory.predict(&df).unwrap();

        let saved = model.save(dir.path()).unwrap();
        scaler.save(dir.path()).unwrap();
        assert_eq!(saved, dir.path().join("toy_model.bin"));
        assert!(dir.path().join("toy_scaler.bin").exists());

        let loaded = load_model(dir.path(), "toy").unwrap();
        assert_eq!(loaded.classes(), &[0, 1]);
        assert_eq!(loaded.trained_at(), model.trained_at);
        assert_eq!(loaded.predict(&df).unwrap(), expected);
    }

    #[test]
    fn test_mismatched_pair_rejected() {
        let (model, mut scaler, _) = fitted();
        scaler.feature_columns.reverse();
        assert!(matches!(
            TrainedModel::new(model, scaler),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_feature_column_at_prediction() {
        let (model, scaler, _) = fitted();
        let trained = TrainedModel::new(model, scaler).unwrap();
        let df = DataFrame::new(vec![Series::new("a".into(), vec![1.0]).into()]).unwrap();
        assert!(matches!(
            trained.predict(&df),
            Err(PipelineError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_model(dir.path(), "absent"),
            Err(PipelineError::Io(_))
        ));
    }
}
