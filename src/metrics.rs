//! Метрики качества классификации на отложенной выборке

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Отчет по классам, аналог classification_report.
/// Деление на ноль дает 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub total: usize,
}

fn check_lengths(y_true: &[i64], y_pred: &[i64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::ShapeMismatch {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(PipelineError::InsufficientData(
            "no samples to evaluate".to_string(),
        ));
    }
    Ok(())
}

pub fn accuracy(y_true: &[i64], y_pred: &[i64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    /// Классы берутся из объединения истинных и предсказанных меток
    pub fn new(y_true: &[i64], y_pred: &[i64]) -> Result<Self> {
        let accuracy = accuracy(y_true, y_pred)?;
        let labels: BTreeSet<i64> = y_true.iter().chain(y_pred).copied().collect();

        let classes: Vec<ClassMetrics> = labels
            .into_iter()
            .map(|class| {
                let mut tp = 0;
                let mut predicted = 0;
                let mut support = 0;
                for (&t, &p) in y_true.iter().zip(y_pred) {
                    if p == class {
                        predicted += 1;
                    }
                    if t == class {
                        support += 1;
                        if p == class {
                            tp += 1;
                        }
                    }
                }
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    class,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let k = classes.len() as f64;
        let total = y_true.len();
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / k,
        };
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
        };

        Ok(Self {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
            total,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                c.class, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>14} {:>10} {:>10} {:>10.2} {:>10}", "accuracy", "", "", self.accuracy, self.total)?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, avg.precision, avg.recall, avg.f1, self.total
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]).unwrap(), 0.75);
        assert!(accuracy(&[0, 1], &[0]).is_err());
        assert!(accuracy(&[], &[]).is_err());
    }

    #[test]
    fn test_report_values() {
        let y_true = [0, 0, 0, 1, 1];
        let y_pred = [0, 0, 1, 1, 1];
        let report = ClassificationReport::new(&y_true, &y_pred).unwrap();

        assert_eq!(report.classes.len(), 2);
        let c0 = &report.classes[0];
        assert_eq!(c0.support, 3);
        assert!((c0.precision - 1.0).abs() < 1e-12);
        assert!((c0.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((c0.f1 - 0.8).abs() < 1e-12);

        let c1 = &report.classes[1];
        assert!((c1.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((c1.recall - 1.0).abs() < 1e-12);

        assert!((report.macro_avg.recall - (2.0 / 3.0 + 1.0) / 2.0).abs() < 1e-12);
        assert!((report.weighted_avg.recall - 0.8).abs() < 1e-12);
        assert!((report.accuracy - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        // Класс 1 ни разу не предсказан
        let report = ClassificationReport::new(&[0, 1], &[0, 0]).unwrap();
        let c1 = &report.classes[1];
        assert_eq!(c1.precision, 0.0);
        assert_eq!(c1.f1, 0.0);
    }

    #[test]
    fn test_display_contains_rows() {
        let report = ClassificationReport::new(&[0, 1, 1], &[0, 1, 0]).unwrap();
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("accuracy"));
        assert!(text.contains("weighted avg"));
    }
}
