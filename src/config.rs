//! Конфигурация пайплайна: описания датасетов и параметры обучения

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Какие числовые колонки масштабировать на этапе очистки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleSelection {
    Columns(Vec<String>),
    /// Все числовые колонки, кроме целевой
    AllNumeric,
}

/// Как получить класс из целевой колонки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelRule {
    #[default]
    AsIs,
    /// Непрерывная оценка, округление до целого класса
    Round,
}

/// Описание одного датасета; общее для очистки и обучения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    pub raw_file: String,
    pub clean_file: String,
    #[serde(default)]
    pub rename: Vec<(String, String)>,
    #[serde(default)]
    pub strip_columns: Vec<String>,
    #[serde(default)]
    pub coerce_numeric: Vec<String>,
    #[serde(default)]
    pub categorical: Vec<String>,
    pub scale: ScaleSelection,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default)]
    pub label_rule: LabelRule,
    #[serde(default)]
    pub identifier_columns: Vec<String>,
}

fn default_label() -> String {
    "target".to_string()
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl DatasetSpec {
    pub fn diabetes() -> Self {
        Self {
            name: "diabetes".to_string(),
            raw_file: "diabetes.csv".to_string(),
            clean_file: "diabetes_clean.csv".to_string(),
            rename: pairs(&[
                ("BloodPressure", "blood_pressure"),
                ("Glucose", "glucose"),
                ("BMI", "bmi"),
                ("Age", "age"),
                ("Insulin", "insulin"),
                ("Outcome", "target"),
            ]),
            strip_columns: Vec::new(),
            coerce_numeric: Vec::new(),
            categorical: Vec::new(),
            scale: ScaleSelection::Columns(names(&[
                "glucose",
                "blood_pressure",
                "bmi",
                "insulin",
                "age",
            ])),
            label: default_label(),
            label_rule: LabelRule::AsIs,
            identifier_columns: Vec::new(),
        }
    }

    pub fn heart() -> Self {
        Self {
            name: "heart".to_string(),
            raw_file: "heart.csv".to_string(),
            clean_file: "heart_clean.csv".to_string(),
            rename: pairs(&[
                ("age", "age"),
                ("sex", "gender"),
                ("trestbps", "blood_pressure"),
                ("chol", "cholesterol"),
                ("thalach", "heart_rate"),
                ("target", "target"),
                // в некоторых выгрузках метка называется condition
                ("condition", "target"),
            ]),
            strip_columns: Vec::new(),
            coerce_numeric: Vec::new(),
            categorical: names(&["gender"]),
            scale: ScaleSelection::Columns(names(&[
                "age",
                "blood_pressure",
                "cholesterol",
                "heart_rate",
            ])),
            label: default_label(),
            label_rule: LabelRule::AsIs,
            identifier_columns: Vec::new(),
        }
    }

    pub fn kidney() -> Self {
        let numeric = names(&[
            "age",
            "blood_pressure",
            "blood_urea",
            "creatinine",
            "hemoglobin",
            "packed_cell_volume",
            "white_blood_cell_count",
            "red_blood_cell_count",
        ]);
        Self {
            name: "kidney".to_string(),
            raw_file: "kidney.csv".to_string(),
            clean_file: "kidney_clean.csv".to_string(),
            rename: pairs(&[
                ("age", "age"),
                ("bp", "blood_pressure"),
                ("sg", "specific_gravity"),
                ("al", "albumin"),
                ("su", "sugar"),
                ("rbc", "rbc"),
                ("pc", "pus_cell"),
                ("pcc", "pus_cell_clumps"),
                ("ba", "bacteria"),
                ("bgr", "blood_glucose_random"),
                ("bu", "blood_urea"),
                ("sc", "creatinine"),
                ("sod", "sodium"),
                ("pot", "potassium"),
                ("hemo", "hemoglobin"),
                ("pcv", "packed_cell_volume"),
                ("wbcc", "white_blood_cell_count"),
                ("rc", "red_blood_cell_count"),
                ("htn", "hypertension"),
                ("dm", "diabetes_mellitus"),
                ("cad", "coronary_artery_disease"),
                ("appet", "appetite"),
                ("pe", "pedal_edema"),
                ("ane", "anemia"),
                ("classification", "target"),
            ]),
            strip_columns: names(&["diabetes_mellitus", "coronary_artery_disease", "target"]),
            coerce_numeric: numeric.clone(),
            categorical: names(&[
                "rbc",
                "pus_cell",
                "pus_cell_clumps",
                "bacteria",
                "hypertension",
                "diabetes_mellitus",
                "coronary_artery_disease",
                "appetite",
                "pedal_edema",
                "anemia",
                "target",
            ]),
            scale: ScaleSelection::Columns(numeric),
            label: default_label(),
            label_rule: LabelRule::AsIs,
            identifier_columns: names(&["id"]),
        }
    }

    pub fn parkinsons() -> Self {
        Self {
            name: "parkinsons".to_string(),
            raw_file: "parkinsons.csv".to_string(),
            clean_file: "parkinsons_clean.csv".to_string(),
            rename: pairs(&[("name", "patient_id"), ("status", "target")]),
            strip_columns: Vec::new(),
            coerce_numeric: Vec::new(),
            categorical: Vec::new(),
            scale: ScaleSelection::AllNumeric,
            label: default_label(),
            label_rule: LabelRule::Round,
            identifier_columns: names(&["patient_id"]),
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![
            Self::diabetes(),
            Self::heart(),
            Self::kidney(),
            Self::parkinsons(),
        ]
    }
}

/// Гиперпараметры ансамбля
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    #[serde(default = "default_forest_trees")]
    pub forest_trees: usize,
    #[serde(default = "default_boosting_rounds")]
    pub boosting_rounds: usize,
    #[serde(default = "default_boosting_learning_rate")]
    pub boosting_learning_rate: f64,
    #[serde(default = "default_boosting_max_depth")]
    pub boosting_max_depth: usize,
    #[serde(default = "default_boosting_lambda")]
    pub boosting_lambda: f64,
    #[serde(default = "default_logistic_c")]
    pub logistic_c: f64,
    #[serde(default = "default_logistic_max_iter")]
    pub logistic_max_iter: usize,
    #[serde(default = "default_logistic_learning_rate")]
    pub logistic_learning_rate: f64,
}

fn default_forest_trees() -> usize {
    100
}

fn default_boosting_rounds() -> usize {
    100
}

fn default_boosting_learning_rate() -> f64 {
    0.3
}

fn default_boosting_max_depth() -> usize {
    6
}

fn default_boosting_lambda() -> f64 {
    1.0
}

fn default_logistic_c() -> f64 {
    1.0
}

fn default_logistic_max_iter() -> usize {
    500
}

fn default_logistic_learning_rate() -> f64 {
    0.5
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            forest_trees: default_forest_trees(),
            boosting_rounds: default_boosting_rounds(),
            boosting_learning_rate: default_boosting_learning_rate(),
            boosting_max_depth: default_boosting_max_depth(),
            boosting_lambda: default_boosting_lambda(),
            logistic_c: default_logistic_c(),
            logistic_max_iter: default_logistic_max_iter(),
            logistic_learning_rate: default_logistic_learning_rate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            seed: default_seed(),
            ensemble: EnsembleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_cleaned_dir")]
    pub cleaned_dir: PathBuf,
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default = "DatasetSpec::builtin")]
    pub datasets: Vec<DatasetSpec>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_cleaned_dir() -> PathBuf {
    PathBuf::from("data/cleaned")
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cleaned_dir: default_cleaned_dir(),
            models_dir: default_models_dir(),
            training: TrainingConfig::default(),
            datasets: DatasetSpec::builtin(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let test_size = self.training.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(PipelineError::InvalidParameter {
                name: "test_size".to_string(),
                value: test_size.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }

        let ensemble = &self.training.ensemble;
        if ensemble.forest_trees == 0 || ensemble.boosting_rounds == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "forest_trees/boosting_rounds".to_string(),
                value: format!("{}/{}", ensemble.forest_trees, ensemble.boosting_rounds),
                reason: "must be positive".to_string(),
            });
        }
        if ensemble.logistic_c <= 0.0 {
            return Err(PipelineError::InvalidParameter {
                name: "logistic_c".to_string(),
                value: ensemble.logistic_c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            if !seen.insert(dataset.name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "duplicate dataset name '{}'",
                    dataset.name
                )));
            }
        }
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> Result<&DatasetSpec> {
        self.datasets
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| PipelineError::Config(format!("unknown dataset '{}'", name)))
    }

    /// Все датасеты или один по имени
    pub fn select(&self, name: Option<&str>) -> Result<Vec<&DatasetSpec>> {
        match name {
            Some(name) => Ok(vec![self.dataset(name)?]),
            None => Ok(self.datasets.iter().collect()),
        }
    }

    pub fn raw_path(&self, dataset: &DatasetSpec) -> PathBuf {
        self.data_dir.join(&dataset.raw_file)
    }

    pub fn clean_path(&self, dataset: &DatasetSpec) -> PathBuf {
        self.cleaned_dir.join(&dataset.clean_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = PipelineConfig::default();
        let kidney = config.dataset("kidney").unwrap();
        assert_eq!(config.raw_path(kidney), PathBuf::from("data/kidney.csv"));
        assert_eq!(
            config.clean_path(kidney),
            PathBuf::from("data/cleaned/kidney_clean.csv")
        );
        assert_eq!(config.datasets.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "models_dir": "out", "training": { "seed": 7 } }"#).unwrap();
        assert_eq!(config.models_dir, PathBuf::from("out"));
        assert_eq!(config.training.seed, 7);
        assert_eq!(config.training.test_size, 0.2);
        assert_eq!(config.training.ensemble.forest_trees, 100);
        assert_eq!(config.datasets.len(), 4);
    }

    #[test]
    fn test_empty_json_matches_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());

        let ensemble: EnsembleConfig =
            serde_json::from_str(r#"{ "boosting_max_depth": 3 }"#).unwrap();
        assert_eq!(ensemble.boosting_max_depth, 3);
        assert_eq!(ensemble.boosting_learning_rate, 0.3);
        assert_eq!(ensemble.logistic_max_iter, 500);
        assert_eq!(ensemble.logistic_learning_rate, 0.5);
    }

    #[test]
    fn test_rejects_bad_test_size() {
        let mut config = PipelineConfig::default();
        config.training.test_size = 1.0;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut config = PipelineConfig::default();
        config.datasets.push(DatasetSpec::heart());
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_unknown_dataset() {
        let config = PipelineConfig::default();
        assert!(config.select(Some("liver")).is_err());
        assert_eq!(config.select(None).unwrap().len(), 4);
    }

    #[test]
    fn test_dataset_spec_json_shape() {
        let json = serde_json::to_string(&DatasetSpec::parkinsons()).unwrap();
        assert!(json.contains(r#""scale":"all_numeric""#));
        assert!(json.contains(r#""label_rule":"round""#));
    }
}
