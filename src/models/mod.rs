pub mod bert;

pub use bert::BertSequenceClassifier;
