//! Walks the outline tree and writes the report through a [`Compositor`].
//!
//! The walk is an explicit sequence of phases:
//! `Idle → Report → (Topic → (Question → Topic)*)* → Roadmap → Finished`.
//! Every topic starts from a fresh anchor lookup and every question ends with
//! a flush, which bounds batch size and the blast radius of a failed request.

use crate::editing::{ComposeError, Compositor, ImageCategory, Indent, ParagraphStyle, stream_len};
use crate::models::{ChartRef, NOT_APPLICABLE, Question, Report, Score, Topic};
use crate::pacing::Pacer;
use crate::store::DocumentStore;

/// Fixed headings and captions written into the report
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    pub overall_maturity: String,
    pub topic_caption: String,
    pub topic_maturity: String,
    pub achieved: String,
    pub unachieved: String,
    pub stage: String,
    pub current_maturity: String,
    pub condition: String,
    pub improvement: String,
    pub references: String,
    pub roadmap: String,
    pub none: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            overall_maturity: "Overall maturity".to_string(),
            topic_caption: "Topic".to_string(),
            topic_maturity: "Topic maturity".to_string(),
            achieved: "Achieved items".to_string(),
            unachieved: "Unachieved items".to_string(),
            stage: "Suggested development stage".to_string(),
            current_maturity: "Current maturity".to_string(),
            condition: "Current state summary".to_string(),
            improvement: "Best practice recommendations".to_string(),
            references: "Best practice references".to_string(),
            roadmap: "Improvement roadmap".to_string(),
            none: "(none)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// Replaces `{{REPORT_DATE}}` in the template
    pub report_date: String,
    /// Topic name that ends the questionnaire
    pub end_marker: String,
    /// Stages listed in the roadmap, in order; empty disables the roadmap
    pub stage_order: Vec<String>,
    /// Delete the anchor text once everything is written
    pub remove_anchor: bool,
    pub labels: Labels,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            report_date: String::new(),
            end_marker: "QUESTIONNAIRE_END_MARKER".to_string(),
            stage_order: Vec::new(),
            remove_anchor: false,
            labels: Labels::default(),
        }
    }
}

pub const DATE_PLACEHOLDER: &str = "REPORT_DATE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Report,
    Topic,
    Question,
    Roadmap,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub topics: usize,
    pub questions: usize,
}

pub struct ReportWriter<'a, S, P> {
    compositor: &'a mut Compositor<S, P>,
    options: &'a ReportOptions,
    phase: Phase,
    summary: WriteSummary,
}

/// Write the whole report, flushing everything before returning
pub fn write_report<S: DocumentStore, P: Pacer>(
    compositor: &mut Compositor<S, P>,
    report: &Report,
    options: &ReportOptions,
) -> Result<WriteSummary, ComposeError> {
    let mut writer = ReportWriter::new(compositor, options);
    writer.begin_report(report)?;
    for topic in topics_in_scope(report, &options.end_marker) {
        writer.begin_topic(topic)?;
        for question in topic.applicable_questions() {
            writer.begin_question(question)?;
            writer.end_question()?;
        }
        log::info!("Topic \"{}\" written", topic.name);
    }
    writer.write_roadmap(report)?;
    writer.finish()
}

/// Applicable topics before the end marker
pub fn topics_in_scope<'r>(
    report: &'r Report,
    end_marker: &'r str,
) -> impl Iterator<Item = &'r Topic> {
    report
        .topics
        .iter()
        .take_while(move |topic| topic.name != end_marker)
        .filter(|topic| !topic.not_applicable)
}

/// Score over the topics that are actually reported
pub fn overall_score(report: &Report, end_marker: &str) -> Score {
    topics_in_scope(report, end_marker).map(Topic::score).sum()
}

impl<'a, S: DocumentStore, P: Pacer> ReportWriter<'a, S, P> {
    pub fn new(compositor: &'a mut Compositor<S, P>, options: &'a ReportOptions) -> Self {
        Self {
            compositor,
            options,
            phase: Phase::Idle,
            summary: WriteSummary::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn transition(&mut self, allowed: &[Phase], next: Phase) {
        debug_assert!(
            allowed.contains(&self.phase),
            "cannot enter {next:?} from {:?}",
            self.phase
        );
        log::debug!("{:?} -> {next:?}", self.phase);
        self.phase = next;
    }

    /// Date, overall maturity and the overall charts
    pub fn begin_report(&mut self, report: &Report) -> Result<(), ComposeError> {
        self.transition(&[Phase::Idle], Phase::Report);
        let options = self.options;
        let labels = &options.labels;

        if !self.options.report_date.is_empty() {
            self.compositor
                .replace_placeholder(DATE_PLACEHOLDER, &self.options.report_date);
        }

        self.compositor.resync()?;
        let heading = format!(
            "\n{}: {}\n",
            labels.overall_maturity,
            overall_score(report, &options.end_marker).maturity()
        );
        self.compositor
            .write(&heading, ParagraphStyle::Heading1, Indent::None);
        self.charts(&report.charts, Some(ImageCategory::Total));
        self.compositor
            .write("\n\n", ParagraphStyle::Heading1, Indent::None);
        Ok(())
    }

    pub fn begin_topic(&mut self, topic: &Topic) -> Result<(), ComposeError> {
        self.transition(&[Phase::Report, Phase::Topic], Phase::Topic);
        self.summary.topics += 1;
        let options = self.options;
        let labels = &options.labels;

        self.compositor.resync()?;
        let caption = format!("\n{} {}", labels.topic_caption, self.summary.topics);
        self.compositor
            .write(&caption, ParagraphStyle::Heading6, Indent::None);
        self.compositor
            .write(&topic.name, ParagraphStyle::Heading1, Indent::None);
        let maturity = format!("{}: {}", labels.topic_maturity, topic.score().maturity());
        self.compositor
            .write(&maturity, ParagraphStyle::NormalText, Indent::None);
        self.charts(&topic.charts, None);
        Ok(())
    }

    /// Everything written for one question. Bullet lists flush on their own;
    /// whatever is still pending goes out in [`Self::end_question`]
    pub fn begin_question(&mut self, question: &Question) -> Result<(), ComposeError> {
        self.transition(&[Phase::Topic], Phase::Question);
        self.summary.questions += 1;
        let options = self.options;
        let labels = &options.labels;

        self.compositor.write(
            &format!("\n{}", question.text),
            ParagraphStyle::Heading2,
            Indent::None,
        );

        let groups = [
            (&labels.achieved, question.achieved().collect::<Vec<_>>()),
            (&labels.unachieved, question.unachieved().collect::<Vec<_>>()),
        ];
        for (title, items) in groups {
            self.compositor
                .write(title, ParagraphStyle::Heading3, Indent::None);
            let start = self.compositor.cursor();
            for item in &items {
                self.compositor
                    .write(&item.name, ParagraphStyle::NormalText, Indent::Item);
                self.compositor.write(
                    item.display_note(),
                    ParagraphStyle::Heading5,
                    Indent::Nested,
                );
            }
            self.bullet_or_none(start)?;
        }

        self.section(&labels.stage, &question.stage, Indent::Item);

        self.compositor
            .write(&labels.current_maturity, ParagraphStyle::Heading3, Indent::None);
        self.compositor.write(
            &question.score().maturity(),
            ParagraphStyle::NormalText,
            Indent::None,
        );

        self.section(&labels.condition, &question.client_condition, Indent::None);
        self.section(&labels.improvement, &question.improvement_plan, Indent::None);

        self.references(question)?;
        Ok(())
    }

    /// Question checkpoint
    pub fn end_question(&mut self) -> Result<(), ComposeError> {
        self.transition(&[Phase::Question], Phase::Topic);
        self.compositor.flush()
    }

    /// Questions grouped by suggested stage, following `stage_order`
    pub fn write_roadmap(&mut self, report: &Report) -> Result<(), ComposeError> {
        self.transition(&[Phase::Report, Phase::Topic], Phase::Roadmap);
        if self.options.stage_order.is_empty() {
            return Ok(());
        }
        let options = self.options;
        let labels = &options.labels;

        self.compositor.resync()?;
        self.compositor.write(
            &format!("\n{}", labels.roadmap),
            ParagraphStyle::Heading1,
            Indent::None,
        );
        self.compositor
            .write(&report.suggestion, ParagraphStyle::NormalText, Indent::None);

        for stage in &options.stage_order {
            let entries: Vec<String> = topics_in_scope(report, &options.end_marker)
                .flat_map(|topic| {
                    topic
                        .applicable_questions()
                        .filter(|question| question.stage.trim() == stage)
                        .map(move |question| format!("{}: {}", topic.name, question.text))
                })
                .collect();
            if entries.is_empty() {
                continue;
            }

            self.compositor
                .write(stage, ParagraphStyle::Heading3, Indent::None);
            let start = self.compositor.cursor();
            for entry in &entries {
                self.compositor
                    .write(entry, ParagraphStyle::NormalText, Indent::Item);
            }
            let end = self.compositor.cursor();
            self.compositor.bullet(start, end)?;
        }
        self.compositor.flush()
    }

    pub fn finish(mut self) -> Result<WriteSummary, ComposeError> {
        self.transition(&[Phase::Report, Phase::Topic, Phase::Roadmap], Phase::Finished);
        self.compositor.flush()?;
        if self.options.remove_anchor {
            let anchor = self.compositor.anchor().to_string();
            self.compositor.delete_text(&anchor)?;
            self.compositor.flush()?;
        }
        Ok(self.summary)
    }

    fn charts(&mut self, charts: &[ChartRef], category: Option<ImageCategory>) {
        for (serial_index, chart) in charts.iter().enumerate() {
            self.compositor.image(
                &chart.uri,
                serial_index,
                charts.len(),
                category.unwrap_or(chart.category),
            );
        }
    }

    /// Heading plus an indented body, or the "none" placeholder
    fn section(&mut self, title: &str, body: &str, indent: Indent) {
        self.compositor
            .write(title, ParagraphStyle::Heading3, Indent::None);
        let options = self.options;
        let body = if body.is_empty() {
            options.labels.none.as_str()
        } else {
            body
        };
        self.compositor.write(
            &format!("    {body}"),
            ParagraphStyle::NormalText,
            indent,
        );
    }

    fn none_placeholder(&mut self) {
        let text = format!("    {}", self.options.labels.none);
        self.compositor
            .write(&text, ParagraphStyle::NormalText, Indent::Item);
    }

    /// Best-practice reference list; only real references become links
    fn references(&mut self, question: &Question) -> Result<(), ComposeError> {
        self.compositor.write(
            &self.options.labels.references,
            ParagraphStyle::Heading3,
            Indent::None,
        );

        let refs = question.best_practice_refs();
        let start = self.compositor.cursor();
        for practice in &refs {
            let text = if practice.text == NOT_APPLICABLE {
                &practice.reference
            } else {
                &practice.text
            };
            if text.is_empty() {
                continue;
            }
            let end = self
                .compositor
                .write(text, ParagraphStyle::NormalText, Indent::Item);
            // `end` already counts the terminator
            let link_start = end - stream_len(text) - 1;
            if practice.reference != NOT_APPLICABLE {
                self.compositor.link(link_start, end, &practice.reference);
            }
        }

        self.bullet_or_none(start)
    }

    /// Bullet everything written since `start`, or write the "none"
    /// placeholder when nothing was
    fn bullet_or_none(&mut self, start: usize) -> Result<(), ComposeError> {
        let end = self.compositor.cursor();
        if end == start {
            self.none_placeholder();
            return Ok(());
        }
        self.compositor.bullet(start, end)?;
        Ok(())
    }
}
