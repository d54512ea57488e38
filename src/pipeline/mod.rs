/// Этапы пайплайна: очистка и обучение

pub mod normalize;
pub mod train;

pub use normalize::{normalize_dataset, normalize_table, NormalizeSummary};
pub use train::{train_dataset, train_table, TrainingReport, TrainingRun};

use crate::config::PipelineConfig;
use crate::error::Result;

/// Очистка выбранных датасетов по порядку конфигурации
pub fn normalize_all(config: &PipelineConfig, dataset: Option<&str>) -> Result<Vec<NormalizeSummary>> {
    config
        .select(dataset)?
        .into_iter()
        .map(|spec| normalize_dataset(config, spec))
        .collect()
}

/// Обучение на выбранных датасетах; первая ошибка прерывает прогон
pub fn train_all(config: &PipelineConfig, dataset: Option<&str>) -> Result<Vec<TrainingReport>> {
    config
        .select(dataset)?
        .into_iter()
        .map(|spec| train_dataset(config, spec))
        .collect()
}
