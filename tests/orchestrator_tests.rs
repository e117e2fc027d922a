use parking_lot::Mutex;
use specgen::generator::GenerationSettings;
use specgen::orchestrator::{FnGenerator, Generator, Orchestrator, Priority, ProgressEvent};
use specgen::spec::ApiModel;
use specgen::storage::{MemoryStorage, Storage};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

fn traced(name: &'static str, priority: Priority, log: &Log, pause: u64) -> Box<dyn Generator> {
    let log = Arc::clone(log);
    Box::new(FnGenerator::new(name, priority, move |ctx| {
        log.lock().push(format!("start {name}"));
        thread::sleep(Duration::from_millis(pause));
        ctx.storage
            .write_file(Path::new(&format!("{name}.out")), name.as_bytes())?;
        log.lock().push(format!("end {name}"));
        Ok(())
    }))
}

fn position(log: &[String], entry: &str) -> usize {
    log.iter().position(|e| e == entry).unwrap()
}

#[test]
fn test_tier_completes_before_next_starts() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let storage = MemoryStorage::new("out");
    let mut orchestrator = Orchestrator::new();
    // registered out of tier order on purpose
    orchestrator
        .register(traced("C", Priority::Last, &log, 1))
        .register(traced("A", Priority::First, &log, 40))
        .register(traced("B", Priority::First, &log, 5))
        .register(traced("D", Priority::Final, &log, 1));

    let summary = orchestrator
        .run(&ApiModel::default(), &storage, &GenerationSettings::default())
        .unwrap();
    assert_eq!(summary.executed, vec!["A", "B", "C", "D"]);
    assert_eq!(summary.tiers, 3);

    let log = log.lock();
    let c_start = position(&log, "start C");
    assert!(position(&log, "end A") < c_start);
    assert!(position(&log, "end B") < c_start);
    assert!(position(&log, "end C") < position(&log, "start D"));
    // A and B share a tier, so B starts before the slow A finishes
    assert!(position(&log, "start B") < position(&log, "end A"));
}

#[test]
fn test_only_filter_runs_named_generators() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let storage = MemoryStorage::new("out");
    let mut orchestrator = Orchestrator::new().with_progress(Arc::new(move |e: &ProgressEvent| {
        sink.lock().push(e.clone());
    }));
    orchestrator
        .register(traced("A", Priority::First, &log, 0))
        .register(traced("B", Priority::Normal, &log, 0))
        .register(traced("C", Priority::Last, &log, 0));
    let orchestrator = orchestrator.with_only("A, missing");

    let summary = orchestrator
        .run(&ApiModel::default(), &storage, &GenerationSettings::default())
        .unwrap();
    assert_eq!(summary.executed, vec!["A"]);
    assert!(storage.exists(Path::new("A.out")));
    assert!(!storage.exists(Path::new("B.out")));
    assert!(!storage.exists(Path::new("C.out")));

    let events = events.lock();
    assert_eq!(
        *events,
        vec![
            ProgressEvent::Start { total: 1 },
            ProgressEvent::GeneratorStart {
                name: "A".to_string(),
                index: 1,
                total: 1,
            },
            ProgressEvent::GeneratorDone {
                name: "A".to_string(),
                index: 1,
                total: 1,
            },
            ProgressEvent::Done { total: 1 },
        ]
    );
    assert!(!events.iter().any(|e| matches!(
        e,
        ProgressEvent::GeneratorStart { name, .. } | ProgressEvent::GeneratorDone { name, .. }
            if name != "A"
    )));
}

#[test]
fn test_empty_selection_is_a_noop() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let storage = MemoryStorage::new("out");
    let mut orchestrator = Orchestrator::new();
    orchestrator.register(traced("A", Priority::First, &log, 0));
    let orchestrator = orchestrator.with_only("nothing");

    let summary = orchestrator
        .run(&ApiModel::default(), &storage, &GenerationSettings::default())
        .unwrap();
    assert!(summary.executed.is_empty());
    assert_eq!(summary.tiers, 0);
    assert!(storage.is_empty());
}

#[test]
fn test_failure_is_attributed_and_reported() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let storage = MemoryStorage::new("out");

    let mut orchestrator = Orchestrator::new().with_progress(Arc::new(move |e: &ProgressEvent| {
        sink.lock().push(e.clone());
    }));
    orchestrator
        .register(traced("A", Priority::First, &log, 0))
        .register(Box::new(FnGenerator::new("sql", Priority::Normal, |_| {
            anyhow::bail!("no table for Draft")
        })))
        .register(traced("C", Priority::Last, &log, 0));

    let err = orchestrator
        .run(&ApiModel::default(), &storage, &GenerationSettings::default())
        .unwrap_err();
    assert_eq!(err.generator(), "sql");
    assert!(err.to_string().contains("no table for Draft"));
    assert!(!storage.exists(Path::new("C.out")));

    let events = events.lock();
    assert_eq!(events.first(), Some(&ProgressEvent::Start { total: 3 }));
    assert!(events.iter().any(|e| matches!(
        e,
        ProgressEvent::GeneratorDone { name, index: 1, total: 3 } if name == "A"
    )));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Error { generator, message }) if generator == "sql" && message.contains("Draft")
    ));
}
