use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use maturity_report_config::Config;
use maturity_report_engine::report::{overall_score, topics_in_scope};
use maturity_report_engine::{
    Compositor, MemoryStore, NoPacer, Pacer, Report, ThreadPacer, io, refine_report, write_report,
};
use std::path::{Path, PathBuf};

mod settings;

/// Writes maturity-assessment reports into a rich-text document
#[derive(Parser, Debug)]
#[command(name = "maturity-report")]
#[command(about = "Compose maturity-assessment reports into a document")]
struct Args {
    /// Log debug details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lay out a report and record the edit requests it takes
    Compose {
        /// Ingested assessment data (JSON)
        #[arg(long)]
        report: PathBuf,

        /// Document template containing the anchor line
        #[arg(long)]
        template: Option<PathBuf>,

        /// Config file (defaults to ~/.config/maturity-report/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where to write the batch-update request bodies
        #[arg(long)]
        requests_out: Option<PathBuf>,

        /// Where to write the final document text (stdout if omitted)
        #[arg(long)]
        text_out: Option<PathBuf>,

        /// Skip the pauses between requests
        #[arg(long)]
        no_delay: bool,

        /// Invisible units the store adds per bulleted paragraph
        #[arg(long, default_value_t = 0)]
        bullet_markers: usize,
    },
    /// Print achieved/assessed counts per topic
    Score {
        #[arg(long)]
        report: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the effective settings
    ShowConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a config file with default settings
    InitConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match args.command {
        Command::Compose {
            report,
            template,
            config,
            requests_out,
            text_out,
            no_delay,
            bullet_markers,
        } => {
            let config = load_config(config.as_deref())?;
            compose(
                &config,
                &report,
                template.as_deref(),
                requests_out.as_deref(),
                text_out.as_deref(),
                no_delay,
                bullet_markers,
            )
        }
        Command::Score { report, config } => {
            let config = load_config(config.as_deref())?;
            let report = io::load_report(&report)?;
            println!("{}", score_table(&report, &config.end_marker));
            Ok(())
        }
        Command::ShowConfig { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", settings::render_box(&settings::summary_rows(&config)));
            Ok(())
        }
        Command::InitConfig { config } => {
            let path = config.unwrap_or_else(Config::config_path);
            if path.exists() {
                log::warn!("Config file already exists at {}; leaving it alone", path.display());
                return Ok(());
            }
            Config::default()
                .save_to_path(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            log::info!("Wrote default config to {}", path.display());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);
    log::debug!("Config path: {}", path.display());
    match Config::load_from_path(&path)? {
        Some(config) => {
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => {
            log::info!("No config file at {}; using defaults", path.display());
            Ok(Config::default())
        }
    }
}

fn compose(
    config: &Config,
    report_path: &Path,
    template_path: Option<&Path>,
    requests_out: Option<&Path>,
    text_out: Option<&Path>,
    no_delay: bool,
    bullet_markers: usize,
) -> Result<()> {
    let mut report = io::load_report(report_path)?;
    log::info!(
        "Loaded {} topics from {}",
        report.topics.len(),
        report_path.display()
    );

    if config.refinement_enabled() {
        log::info!("Refining notes with {}", config.refiner.program);
        refine_report(&mut report, &settings::refiner(config));
    } else if config.ai_generation {
        log::warn!("AI generation is on but no refiner program is configured; skipping");
    }

    let template = match template_path.or(config.template_path.as_deref()) {
        Some(path) => io::read_template(path)?,
        None => format!("{{{{REPORT_DATE}}}}\n{}\n", config.anchor),
    };

    let store = MemoryStore::from_template(&config.document_id, &template)
        .with_bullet_markers(bullet_markers);
    let pacer: &dyn Pacer = if no_delay { &NoPacer } else { &ThreadPacer };
    let mut compositor = Compositor::new(
        store,
        pacer,
        &config.document_id,
        &config.anchor,
        settings::delays(&config.delays),
    );

    let now = chrono::Local::now().fixed_offset();
    let options = settings::report_options(config, &now);
    let summary = write_report(&mut compositor, &report, &options).context("composing report")?;
    log::info!(
        "Wrote {} topics and {} questions",
        summary.topics,
        summary.questions
    );

    let store = compositor.into_store();
    if let Some(path) = requests_out {
        io::write_requests(path, store.applied_batches())?;
        log::info!(
            "Recorded {} requests to {}",
            store.applied_batches().len(),
            path.display()
        );
    }
    match text_out {
        Some(path) => io::write_file(path, &store.visible_text())?,
        None => print!("{}", store.visible_text()),
    }
    Ok(())
}

fn score_table(report: &Report, end_marker: &str) -> String {
    let rows: Vec<(String, String, String)> = topics_in_scope(report, end_marker)
        .map(|topic| {
            let score = topic.score();
            (
                topic.name.clone(),
                format!("{}/{}", score.achieved, score.total),
                score.maturity(),
            )
        })
        .collect();
    let name_width = rows
        .iter()
        .map(|(name, _, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Overall".len());

    let mut lines: Vec<String> = rows
        .iter()
        .map(|(name, count, maturity)| format!("{name:<name_width$}  {count:>7}  {maturity:>6}"))
        .collect();
    let overall = overall_score(report, end_marker);
    lines.push(format!(
        "{:<name_width$}  {:>7}  {:>6}",
        "Overall",
        format!("{}/{}", overall.achieved, overall.total),
        overall.maturity()
    ));
    lines.join("\n")
}
