use serde::{Deserialize, Deserializer, Serialize};

use crate::editing::ImageCategory;

/// Reserved value meaning "no reference/value provided"
pub const NOT_APPLICABLE: &str = "NA";

/// Whole assessment, as produced by the ingestion step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub charts: Vec<ChartRef>,
    pub topics: Vec<Topic>,
    /// Cross-topic improvement suggestion
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRef {
    pub uri: String,
    #[serde(default)]
    pub category: ImageCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topic {
    pub name: String,
    pub charts: Vec<ChartRef>,
    pub questions: Vec<Question>,
    pub not_applicable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Question {
    pub text: String,
    pub area: String,
    /// Suggested development stage
    pub stage: String,
    pub client_condition: String,
    pub improvement_plan: String,
    pub items: Vec<Item>,
    pub not_applicable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub name: String,
    pub checked: bool,
    pub note: String,
    pub refined_note: String,
    #[serde(deserialize_with = "lines")]
    pub best_practices: Vec<String>,
    #[serde(deserialize_with = "lines")]
    pub best_practice_refs: Vec<String>,
    pub best_practice_content: String,
    /// The "none of the above" choice of a question; never scored
    pub none_of_the_above: bool,
}

/// A best practice paired with its reference URL (or [`NOT_APPLICABLE`])
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestPracticeRef {
    pub text: String,
    pub reference: String,
}

/// Achieved versus assessed item counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub achieved: usize,
    pub total: usize,
}

impl std::ops::Add for Score {
    type Output = Score;

    fn add(self, other: Score) -> Score {
        Score {
            achieved: self.achieved + other.achieved,
            total: self.total + other.total,
        }
    }
}

impl std::iter::Sum for Score {
    fn sum<I: Iterator<Item = Score>>(iter: I) -> Score {
        iter.fold(Score::default(), |acc, score| acc + score)
    }
}

impl Score {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.achieved as f64 / self.total as f64
        }
    }

    /// Percentage with one decimal, e.g. `66.7%`
    pub fn maturity(&self) -> String {
        format!("{:.1}%", self.ratio() * 100.0)
    }
}

impl Report {
    /// Prepare freshly ingested data for layout: drop unnamed and "none of
    /// the above" items, flatten notes to one line, derive not-applicable
    /// flags and pad best-practice lists
    pub fn normalize(&mut self) {
        for topic in &mut self.topics {
            for question in &mut topic.questions {
                question.normalize();
            }
            if topic.questions.iter().all(|question| question.not_applicable) {
                topic.not_applicable = true;
            }
        }
    }

    pub fn score(&self) -> Score {
        self.topics.iter().map(Topic::score).sum()
    }
}

impl Topic {
    /// Sum over applicable questions only
    pub fn score(&self) -> Score {
        self.applicable_questions().map(Question::score).sum()
    }

    pub fn applicable_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|question| !question.not_applicable)
    }
}

impl Question {
    pub fn score(&self) -> Score {
        Score {
            achieved: self.items.iter().filter(|item| item.checked).count(),
            total: self.items.len(),
        }
    }

    pub fn achieved(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| item.checked)
    }

    pub fn unachieved(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| !item.checked)
    }

    /// Distinct best practices of all unachieved items, first occurrence wins
    pub fn best_practice_refs(&self) -> Vec<BestPracticeRef> {
        let mut refs: Vec<BestPracticeRef> = Vec::new();
        for item in self.unachieved() {
            for (text, reference) in item.best_practices.iter().zip(&item.best_practice_refs) {
                if refs.iter().any(|existing| &existing.text == text) {
                    continue;
                }
                refs.push(BestPracticeRef {
                    text: text.clone(),
                    reference: reference.clone(),
                });
            }
        }
        refs
    }

    fn normalize(&mut self) {
        let mut achieved_so_far = 0;
        let mut none_apply = false;
        self.items.retain(|item| {
            if item.none_of_the_above {
                if !item.checked && achieved_so_far == 0 {
                    none_apply = true;
                }
                return false;
            }
            if item.name.trim().is_empty() {
                return false;
            }
            if item.checked {
                achieved_so_far += 1;
            }
            true
        });
        if none_apply {
            self.not_applicable = true;
        }

        for item in &mut self.items {
            // notes are written as a single nested paragraph
            item.note.retain(|c| c != '\n');
            item.refined_note.retain(|c| c != '\n');
            pad_references(&item.name, &mut item.best_practices, &mut item.best_practice_refs);
        }
    }
}

impl Item {
    /// Refined note, falling back to the original note
    pub fn display_note(&self) -> &str {
        if self.refined_note.is_empty() {
            &self.note
        } else {
            &self.refined_note
        }
    }
}

/// Pad both lists with [`NOT_APPLICABLE`] to the same length.
///
/// Returns `true` (and warns) when references were given but their count does
/// not match the best-practice count, since links may then be misattributed.
pub fn pad_references(item: &str, texts: &mut Vec<String>, refs: &mut Vec<String>) -> bool {
    let mismatch = !refs.is_empty() && texts.len() != refs.len();
    if mismatch {
        log::warn!(
            "Item \"{item}\": best practice and reference counts differ ({}/{}); check hyperlinks",
            texts.len(),
            refs.len()
        );
    }

    let length = texts.len().max(refs.len());
    texts.resize(length, NOT_APPLICABLE.to_string());
    refs.resize(length, NOT_APPLICABLE.to_string());
    mismatch
}

/// Accepts either a list or a newline-separated string; blank lines are dropped
fn lines<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lines {
        Text(String),
        List(Vec<String>),
    }

    let lines = match Lines::deserialize(deserializer)? {
        Lines::Text(text) => text.split('\n').map(str::to_string).collect(),
        Lines::List(list) => list,
    };
    Ok(lines.into_iter().filter(|line| !line.is_empty()).collect())
}
