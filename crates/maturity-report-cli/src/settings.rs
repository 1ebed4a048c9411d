//! Turns the file configuration into engine settings.

use chrono::{DateTime, FixedOffset};
use chrono::format::{Item, StrftimeItems};
use maturity_report_config::{Config, DelayConfig, LabelConfig, PromptConfig};
use maturity_report_engine::{CommandRefiner, Delays, Labels, Prompts, ReportOptions};
use std::time::Duration;

const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn report_options(config: &Config, now: &DateTime<FixedOffset>) -> ReportOptions {
    ReportOptions {
        report_date: report_date(config, now),
        end_marker: config.end_marker.clone(),
        stage_order: config.stage_order.clone(),
        remove_anchor: config.remove_anchor,
        labels: labels(&config.labels),
    }
}

/// The configured date, or `now` in the configured format
pub fn report_date(config: &Config, now: &DateTime<FixedOffset>) -> String {
    if !config.report_date.trim().is_empty() {
        return config.report_date.trim().to_string();
    }

    let invalid = StrftimeItems::new(&config.date_format).any(|item| matches!(item, Item::Error));
    let format = if invalid {
        log::warn!(
            "Invalid date format \"{}\", using {FALLBACK_DATE_FORMAT}",
            config.date_format
        );
        FALLBACK_DATE_FORMAT
    } else {
        config.date_format.as_str()
    };
    now.format(format).to_string()
}

pub fn delays(config: &DelayConfig) -> Delays {
    Delays {
        request: Duration::from_millis(config.request_ms),
        image: Duration::from_millis(config.image_ms),
    }
}

pub fn labels(config: &LabelConfig) -> Labels {
    let mut labels = Labels::default();
    let overrides = [
        (&mut labels.overall_maturity, &config.overall_maturity),
        (&mut labels.topic_caption, &config.topic_caption),
        (&mut labels.topic_maturity, &config.topic_maturity),
        (&mut labels.achieved, &config.achieved),
        (&mut labels.unachieved, &config.unachieved),
        (&mut labels.stage, &config.stage),
        (&mut labels.current_maturity, &config.current_maturity),
        (&mut labels.condition, &config.condition),
        (&mut labels.improvement, &config.improvement),
        (&mut labels.references, &config.references),
        (&mut labels.roadmap, &config.roadmap),
        (&mut labels.none, &config.none),
    ];
    for (label, value) in overrides {
        override_with(label, value);
    }
    labels
}

pub fn prompts(config: &PromptConfig) -> Prompts {
    let mut prompts = Prompts::default();
    override_with(&mut prompts.refine_note, &config.refine_note);
    override_with(&mut prompts.summarize_conditions, &config.summarize_conditions);
    override_with(&mut prompts.summarize_improvements, &config.summarize_improvements);
    override_with(&mut prompts.summarize_suggestion, &config.summarize_suggestion);
    prompts
}

pub fn refiner(config: &Config) -> CommandRefiner {
    CommandRefiner {
        program: config.refiner.program.clone(),
        args: config.refiner.args.clone(),
        system_instructions: config.refiner.system_instructions.clone(),
        prompts: prompts(&config.prompts),
    }
}

/// Name/value rows shown by `show-config`
pub fn summary_rows(config: &Config) -> Vec<(&'static str, String)> {
    let on_off = |flag: bool| if flag { "on" } else { "off" }.to_string();
    vec![
        ("Document", config.document_id.clone()),
        ("Anchor", config.anchor.clone()),
        ("End marker", config.end_marker.clone()),
        (
            "Report date",
            if config.report_date.is_empty() {
                format!("today ({})", config.date_format)
            } else {
                config.report_date.clone()
            },
        ),
        ("AI generation", on_off(config.ai_generation)),
        (
            "Refiner",
            if config.refiner.program.is_empty() {
                "(none)".to_string()
            } else {
                config.refiner.program.clone()
            },
        ),
        ("Remove anchor", on_off(config.remove_anchor)),
        ("Stage order", config.stage_order.join(", ")),
        (
            "Template",
            config
                .template_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "(built-in)".to_string()),
        ),
        ("Request delay", format!("{} ms", config.delays.request_ms)),
        ("Image delay", format!("{} ms", config.delays.image_ms)),
    ]
}

/// Draw rows inside a plain box
pub fn render_box(rows: &[(&str, String)]) -> String {
    let key_width = rows.iter().map(|(key, _)| key.chars().count()).max().unwrap_or(0);
    let lines: Vec<String> = rows
        .iter()
        .map(|(key, value)| format!("{key:<key_width$} : {value}"))
        .collect();
    let width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);

    let border = format!("+{}+", "-".repeat(width + 2));
    let mut out = vec![border.clone()];
    out.extend(lines.iter().map(|line| format!("| {line:<width$} |")));
    out.push(border);
    out.join("\n")
}

fn override_with(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}
