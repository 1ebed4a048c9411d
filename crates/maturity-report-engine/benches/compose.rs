use criterion::{Criterion, criterion_group, criterion_main};
use maturity_report_engine::{
    Compositor, Delays, Item, MemoryStore, NoPacer, Question, Report, ReportOptions, Topic,
    write_report,
};

fn generate_report(topics: usize, questions: usize, items: usize) -> Report {
    let topics = (0..topics)
        .map(|t| Topic {
            name: format!("Topic {t}"),
            questions: (0..questions)
                .map(|q| Question {
                    text: format!("Question {t}.{q}?"),
                    stage: "Short term".to_string(),
                    items: (0..items)
                        .map(|i| Item {
                            name: format!("Item {i}"),
                            checked: i % 2 == 0,
                            note: "Observed during the workshop".to_string(),
                            best_practices: vec!["Automate it".to_string()],
                            best_practice_refs: vec![format!("https://docs/{t}/{q}/{i}")],
                            ..Item::default()
                        })
                        .collect(),
                    ..Question::default()
                })
                .collect(),
            ..Topic::default()
        })
        .collect();
    let mut report = Report {
        topics,
        ..Report::default()
    };
    report.normalize();
    report
}

fn bench_write_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    group.sample_size(10);

    let report = generate_report(5, 6, 6);
    let options = ReportOptions {
        report_date: "2024-05-01".to_string(),
        stage_order: vec!["Short term".to_string()],
        ..ReportOptions::default()
    };

    group.bench_function("write_report", |b| {
        b.iter(|| {
            let store =
                MemoryStore::from_template("bench", "{{REPORT_DATE}}\nDOC_INSERTION_POINT\n")
                    .with_bullet_markers(1);
            let mut compositor =
                Compositor::new(store, NoPacer, "bench", "DOC_INSERTION_POINT", Delays::default());
            let summary = write_report(&mut compositor, std::hint::black_box(&report), &options);
            std::hint::black_box(summary.is_ok());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_write_report);
criterion_main!(benches);
