pub mod outline;

pub use outline::{
    BestPracticeRef, ChartRef, Item, NOT_APPLICABLE, Question, Report, Score, Topic,
    pad_references,
};
