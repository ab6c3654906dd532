mod article;

pub use article::{parse_datetime, Article, NewLabel, TrainingData};
