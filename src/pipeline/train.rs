//! Обучение ансамбля на очищенном датасете
//!
//! Порядок: обрезка строк, дискретизация метки, повторное кодирование
//! строковых колонок, holdout разбиение, скейлер на обучающей части,
//! ансамбль, оценка на тесте, сохранение артефактов.

use std::path::PathBuf;

use chrono::Utc;
use ndarray::Axis;
use polars::prelude::DataFrame;

use crate::artifacts::{ModelArtifact, ScalerArtifact};
use crate::config::{DatasetSpec, PipelineConfig, TrainingConfig};
use crate::error::Result;
use crate::io::read_csv;
use crate::metrics::ClassificationReport;
use crate::models::SoftVotingEnsemble;
use crate::preprocessing::cleaning::{strip_whitespace, text_columns};
use crate::preprocessing::{encode_column, train_test_split, FeatureEngineer, StandardScaler};

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub dataset: String,
    pub n_train: usize,
    pub n_test: usize,
    pub feature_columns: Vec<String>,
    pub classes: Vec<i64>,
    /// Предсказания на тестовой части в порядке разбиения
    pub test_predictions: Vec<i64>,
    pub evaluation: ClassificationReport,
    pub model_path: Option<PathBuf>,
    pub scaler_path: Option<PathBuf>,
}

impl TrainingReport {
    pub fn accuracy(&self) -> f64 {
        self.evaluation.accuracy
    }
}

/// Результат обучения до сохранения на диск
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub report: TrainingReport,
    pub model: ModelArtifact,
    pub scaler: ScalerArtifact,
}

/// Приводит очищенную таблицу к виду, пригодному для матрицы признаков
fn prepare_frame(spec: &DatasetSpec, df: &mut DataFrame) -> Result<()> {
    let text = text_columns(df);
    strip_whitespace(df, &text)?;

    for name in text {
        if spec.identifier_columns.contains(&name) {
            continue;
        }
        encode_column(df, &name)?;
    }
    Ok(())
}

pub fn train_table(training: &TrainingConfig, spec: &DatasetSpec, mut df: DataFrame) -> Result<TrainingRun> {
    prepare_frame(spec, &mut df)?;

    let (features, labels, feature_columns) =
        FeatureEngineer::extract(&df, &spec.label, &spec.identifier_columns, spec.label_rule)?;

    let split = train_test_split(features.nrows(), training.test_size, training.seed)?;
    let x_train = features.select(Axis(0), &split.train);
    let x_test = features.select(Axis(0), &split.test);
    let y_train: Vec<i64> = split.train.iter().map(|&i| labels[i]).collect();
    let y_test: Vec<i64> = split.test.iter().map(|&i| labels[i]).collect();

    tracing::info!(
        dataset = %spec.name,
        train = split.train.len(),
        test = split.test.len(),
        features = feature_columns.len(),
        "training ensemble"
    );

    // Скейлер только по обучающей части
    let mut scaler = StandardScaler::new();
    let x_train = scaler.fit_transform(&x_train)?;
    let x_test = scaler.transform(&x_test)?;

    let mut ensemble = SoftVotingEnsemble::from_config(&training.ensemble, training.seed);
    ensemble.fit(&x_train, &y_train)?;

    let test_predictions = ensemble.predict(&x_test)?;
    let evaluation = ClassificationReport::new(&y_test, &test_predictions)?;
    tracing::info!(dataset = %spec.name, accuracy = evaluation.accuracy, "holdout evaluation");

    let report = TrainingReport {
        dataset: spec.name.clone(),
        n_train: split.train.len(),
        n_test: split.test.len(),
        feature_columns: feature_columns.clone(),
        classes: ensemble.classes().to_vec(),
        test_predictions,
        evaluation,
        model_path: None,
        scaler_path: None,
    };
    let model = ModelArtifact {
        dataset: spec.name.clone(),
        feature_columns: feature_columns.clone(),
        ensemble,
        trained_at: Utc::now(),
    };
    let scaler = ScalerArtifact {
        dataset: spec.name.clone(),
        feature_columns,
        scaler,
    };

    Ok(TrainingRun {
        report,
        model,
        scaler,
    })
}

/// Обучает модель на чистом CSV датасета и сохраняет артефакты
pub fn train_dataset(config: &PipelineConfig, spec: &DatasetSpec) -> Result<TrainingReport> {
    let clean_path = config.clean_path(spec);
    tracing::info!(dataset = %spec.name, path = %clean_path.display(), "loading cleaned dataset");

    let clean = read_csv(&clean_path)?;
    let run = train_table(&config.training, spec, clean)?;

    let mut report = run.report;
    report.model_path = Some(run.model.save(&config.models_dir)?);
    report.scaler_path = Some(run.scaler.save(&config.models_dir)?);

    tracing::info!(dataset = %spec.name, dir = %config.models_dir.display(), "artifacts saved");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnsembleConfig, LabelRule, ScaleSelection};
    use polars::prelude::{NamedFrom, Series};

    fn small_training() -> TrainingConfig {
        TrainingConfig {
            ensemble: EnsembleConfig {
                forest_trees: 10,
                boosting_rounds: 10,
                logistic_max_iter: 200,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn scored_spec() -> DatasetSpec {
        DatasetSpec {
            name: "scored".to_string(),
            raw_file: "scored.csv".to_string(),
            clean_file: "scored_clean.csv".to_string(),
            rename: Vec::new(),
            strip_columns: Vec::new(),
            coerce_numeric: Vec::new(),
            categorical: Vec::new(),
            scale: ScaleSelection::AllNumeric,
            label: "target".to_string(),
            label_rule: LabelRule::Round,
            identifier_columns: vec!["patient_id".to_string()],
        }
    }

    fn scored_frame(n: usize) -> DataFrame {
        let ids: Vec<String> = (0..n).map(|i| format!("p{}", i)).collect();
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let smoker: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { " yes" } else { "no " }).collect();
        let score: Vec<f64> = (0..n).map(|i| if i < n / 2 { 0.49 } else { 0.51 }).collect();
        DataFrame::new(vec![
            Series::new("patient_id".into(), ids).into(),
            Series::new("x".into(), x).into(),
            Series::new("smoker".into(), smoker).into(),
            Series::new("target".into(), score).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_round_rule_and_identifier_exclusion() {
        let run = train_table(&small_training(), &scored_spec(), scored_frame(40)).unwrap();

        assert_eq!(run.report.classes, vec![0, 1]);
        assert_eq!(run.report.feature_columns, vec!["x".to_string(), "smoker".to_string()]);
        assert_eq!(run.report.n_train + run.report.n_test, 40);
        assert_eq!(run.report.test_predictions.len(), run.report.n_test);
        assert_eq!(run.model.feature_columns, run.scaler.feature_columns);
        assert!(run.report.accuracy() > 0.8);
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let a = train_table(&small_training(), &scored_spec(), scored_frame(30)).unwrap();
        let b = train_table(&small_training(), &scored_spec(), scored_frame(30)).unwrap();
        assert_eq!(a.report.test_predictions, b.report.test_predictions);
    }

    #[test]
    fn test_single_class_fails() {
        let mut df = scored_frame(20);
        df.with_column(Series::new("target".into(), vec![1.0; 20])).unwrap();
        assert!(train_table(&small_training(), &scored_spec(), df).is_err());
    }
}
