/// Модуль предобработки данных

pub mod cleaning;
pub mod encoding;
pub mod feature_engineering;
pub mod imputation;
pub mod normalization;
pub mod split;

pub use encoding::{encode_column, LabelEncoder};
pub use feature_engineering::FeatureEngineer;
pub use imputation::Imputer;
pub use normalization::StandardScaler;
pub use split::{train_test_split, SplitIndices};
