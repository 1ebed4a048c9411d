//! Optional language-model refinement of notes and summaries.
//!
//! The refiner is an external collaborator. Whatever it returns empty (or
//! fails to return) falls back to the original text, so a report can always
//! be written from the ingested data alone.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::models::{NOT_APPLICABLE, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefineTask {
    RefineNote,
    SummarizeConditions,
    SummarizeImprovements,
    SummarizeSuggestion,
}

impl RefineTask {
    pub fn key(&self) -> &'static str {
        match self {
            RefineTask::RefineNote => "refine_client_status_notes",
            RefineTask::SummarizeConditions => "summarize_client_conditions",
            RefineTask::SummarizeImprovements => "summarize_improvement_plans",
            RefineTask::SummarizeSuggestion => "summarize_suggestion",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RefineError {
    #[error("failed to run refiner {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("refiner {program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

pub trait TextRefiner {
    fn refine(&self, task: RefineTask, topic: &str, content: &str) -> Result<String, RefineError>;
}

impl<F> TextRefiner for F
where
    F: Fn(RefineTask, &str, &str) -> Result<String, RefineError>,
{
    fn refine(&self, task: RefineTask, topic: &str, content: &str) -> Result<String, RefineError> {
        self(task, topic, content)
    }
}

/// Task prompts handed to the model
#[derive(Debug, Clone, PartialEq)]
pub struct Prompts {
    pub refine_note: String,
    pub summarize_conditions: String,
    pub summarize_improvements: String,
    pub summarize_suggestion: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            refine_note: "Polish the following current-state note into an objective, professional \
                          and concise record. Do not add information or advice. At most 100 words."
                .to_string(),
            summarize_conditions: "Consolidate the following current-state notes into an \
                                   objective, professional record. Do not add information or \
                                   advice. At most 100 words."
                .to_string(),
            summarize_improvements: "Consolidate all of the following improvement items into \
                                     professional recommendations, keeping concrete details. At \
                                     most 150 words."
                .to_string(),
            summarize_suggestion: "Summarize the key points of the following per-topic state and \
                                   recommendations, explain their short, mid or long term \
                                   classification and the value they bring. At most 200 words."
                .to_string(),
        }
    }
}

impl Prompts {
    pub fn for_task(&self, task: RefineTask) -> &str {
        match task {
            RefineTask::RefineNote => &self.refine_note,
            RefineTask::SummarizeConditions => &self.summarize_conditions,
            RefineTask::SummarizeImprovements => &self.summarize_improvements,
            RefineTask::SummarizeSuggestion => &self.summarize_suggestion,
        }
    }
}

/// Runs an external program per request: the prompt goes to stdin, the
/// answer is read from stdout
#[derive(Debug, Clone)]
pub struct CommandRefiner {
    pub program: String,
    pub args: Vec<String>,
    pub system_instructions: Vec<String>,
    pub prompts: Prompts,
}

impl CommandRefiner {
    pub fn prompt(&self, task: RefineTask, topic: &str, content: &str) -> String {
        let mut prompt = String::new();
        for instruction in &self.system_instructions {
            prompt.push_str(instruction);
            prompt.push('\n');
        }
        prompt.push_str(&format!("Task: {}\n\n", self.prompts.for_task(task)));
        prompt.push_str(&format!("User input: {topic}\n{content}\nAnswer:\n"));
        prompt
    }
}

impl TextRefiner for CommandRefiner {
    fn refine(&self, task: RefineTask, topic: &str, content: &str) -> Result<String, RefineError> {
        let spawn_error = |source| RefineError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(self.prompt(task, topic, content).as_bytes())
                .map_err(spawn_error)?;
        }

        let output = child.wait_with_output().map_err(spawn_error)?;
        if !output.status.success() {
            return Err(RefineError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// How many answers were used versus fell back to the original text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefineSummary {
    pub refined: usize,
    pub fallbacks: usize,
}

/// Refine item notes and summarize every applicable question, then the
/// cross-topic suggestion. Expects a normalized report.
pub fn refine_report(report: &mut Report, refiner: &dyn TextRefiner) -> RefineSummary {
    let mut summary = RefineSummary::default();
    let mut suggestions = Vec::new();

    for topic in &mut report.topics {
        for question in &mut topic.questions {
            for item in &mut question.items {
                let refined = ask(
                    refiner,
                    &mut summary,
                    RefineTask::RefineNote,
                    &item.name,
                    &item.note,
                );
                if !refined.is_empty() {
                    item.refined_note = refined;
                }
                item.refined_note = item.refined_note.replace('\n', "");
            }

            if question.not_applicable {
                continue;
            }

            let mut conditions = String::new();
            let mut improvements = String::new();
            for item in &question.items {
                conditions.push_str(&format!(
                    "\n{}:{}, {}",
                    item.name,
                    item.checked,
                    item.display_note()
                ));
                if item.checked {
                    continue;
                }
                if item.best_practice_content.is_empty() {
                    for practice in &item.best_practices {
                        if practice != NOT_APPLICABLE {
                            improvements.push_str(practice);
                        }
                    }
                } else {
                    improvements.push_str(&item.best_practice_content);
                }
            }

            let condition = ask(
                refiner,
                &mut summary,
                RefineTask::SummarizeConditions,
                "",
                &conditions,
            );
            if !condition.is_empty() {
                question.client_condition = condition;
            }
            let improvement =
                ask(refiner, &mut summary, RefineTask::SummarizeImprovements, "", &improvements);
            if !improvement.is_empty() {
                question.improvement_plan = improvement;
            }

            suggestions.push(format!(
                "topic: {}; client condition: {}; improvement plan: {}",
                topic.name, question.client_condition, question.improvement_plan
            ));
        }
    }

    if !suggestions.is_empty() {
        let suggestion = ask(
            refiner,
            &mut summary,
            RefineTask::SummarizeSuggestion,
            "",
            &suggestions.join("\n"),
        );
        if !suggestion.is_empty() {
            report.suggestion = suggestion;
        }
    }

    log::info!(
        "Refinement finished: {} answers used, {} fell back to source text",
        summary.refined,
        summary.fallbacks
    );
    summary
}

/// Empty content is never sent; errors are logged and count as empty
fn ask(
    refiner: &dyn TextRefiner,
    summary: &mut RefineSummary,
    task: RefineTask,
    topic: &str,
    content: &str,
) -> String {
    if content.is_empty() {
        return String::new();
    }

    let answer = match refiner.refine(task, topic, content) {
        Ok(answer) => answer.trim().to_string(),
        Err(e) => {
            log::warn!("Refiner failed for {}: {e}", task.key());
            String::new()
        }
    };
    if answer.is_empty() {
        summary.fallbacks += 1;
    } else {
        summary.refined += 1;
    }
    answer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Topic;
    use crate::tests::{item, question};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn report() -> Report {
        let mut unachieved = item("Budgets", false, "No budget\nalerts");
        unachieved.best_practices = vec!["Set budgets".to_string(), NOT_APPLICABLE.to_string()];
        unachieved.best_practice_refs =
            vec!["https://budgets".to_string(), "https://x".to_string()];
        let mut q = question(
            "How do you manage cost?",
            vec![item("Tags", true, "Tagged"), unachieved],
        );
        q.client_condition = "original condition".to_string();
        q.improvement_plan = "original plan".to_string();
        Report {
            topics: vec![Topic {
                name: "Cost".to_string(),
                questions: vec![q],
                ..Topic::default()
            }],
            suggestion: "original suggestion".to_string(),
            ..Report::default()
        }
    }

    #[test]
    fn test_refines_every_field_when_answers_present() {
        let mut report = report();
        let calls = RefCell::new(Vec::new());
        let refiner =
            |task: RefineTask, topic: &str, content: &str| -> Result<String, RefineError> {
                calls
                    .borrow_mut()
                    .push((task, topic.to_string(), content.to_string()));
                Ok(format!("{}:\n{}", task.key(), topic))
            };

        let summary = refine_report(&mut report, &refiner);

        let question = &report.topics[0].questions[0];
        assert_eq!(question.items[0].refined_note, "refine_client_status_notes:Tags");
        assert_eq!(question.client_condition, "summarize_client_conditions:");
        assert_eq!(question.improvement_plan, "summarize_improvement_plans:");
        assert_eq!(report.suggestion, "summarize_suggestion:");
        assert_eq!(summary, RefineSummary { refined: 5, fallbacks: 0 });

        let calls = calls.borrow();
        let improvements = calls
            .iter()
            .find(|(task, _, _)| *task == RefineTask::SummarizeImprovements)
            .map(|(_, _, content)| content.clone())
            .unwrap();
        assert_eq!(improvements, "Set budgets");
    }

    #[test]
    fn test_empty_answers_fall_back_to_original_text() {
        let mut report = report();
        let refiner =
            |_: RefineTask, _: &str, _: &str| -> Result<String, RefineError> { Ok(String::new()) };

        let summary = refine_report(&mut report, &refiner);

        let question = &report.topics[0].questions[0];
        assert_eq!(question.items[1].refined_note, "");
        assert_eq!(question.items[1].display_note(), "No budget\nalerts");
        assert_eq!(question.client_condition, "original condition");
        assert_eq!(question.improvement_plan, "original plan");
        assert_eq!(report.suggestion, "original suggestion");
        assert_eq!(summary.refined, 0);
    }

    #[test]
    fn test_failures_fall_back_to_original_text() {
        let mut report = report();
        let refiner = |_: RefineTask, _: &str, _: &str| -> Result<String, RefineError> {
            Err(RefineError::Spawn {
                program: "missing-llm".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        };

        refine_report(&mut report, &refiner);

        assert_eq!(report.topics[0].questions[0].client_condition, "original condition");
    }

    #[test]
    fn test_not_applicable_questions_are_not_summarized() {
        let mut report = report();
        report.topics[0].questions[0].not_applicable = true;
        let refiner = |task: RefineTask, _: &str, _: &str| -> Result<String, RefineError> {
            Ok(task.key().to_string())
        };

        let summary = refine_report(&mut report, &refiner);

        // two item notes only
        assert_eq!(summary.refined, 2);
        assert_eq!(report.suggestion, "original suggestion");
    }

    #[test]
    fn test_command_prompt_layout() {
        let refiner = CommandRefiner {
            program: "llm".to_string(),
            args: vec![],
            system_instructions: vec!["Plain prose only".to_string()],
            prompts: Prompts::default(),
        };

        let prompt = refiner.prompt(RefineTask::RefineNote, "Budgets", "No budget");

        assert!(prompt.starts_with("Plain prose only\nTask: Polish"));
        assert!(prompt.ends_with("User input: Budgets\nNo budget\nAnswer:\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_refiner_reads_stdout() {
        let refiner = CommandRefiner {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "cat > /dev/null; echo '  refined text  '".to_string()],
            system_instructions: vec![],
            prompts: Prompts::default(),
        };

        let answer = refiner.refine(RefineTask::RefineNote, "t", "c").unwrap();

        assert_eq!(answer, "refined text");
    }

    #[test]
    fn test_command_refiner_missing_program() {
        let refiner = CommandRefiner {
            program: "definitely-not-an-installed-refiner".to_string(),
            args: vec![],
            system_instructions: vec![],
            prompts: Prompts::default(),
        };

        let result = refiner.refine(RefineTask::RefineNote, "t", "c");

        assert!(matches!(result, Err(RefineError::Spawn { .. })));
    }
}
