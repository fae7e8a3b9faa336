use std::time::Instant;

use chisel_bind::bind_object;
use chisel_bind::parser::Binder;

#[derive(Debug, PartialEq)]
struct Event {
    id: i64,
    kind: String,
    value: f64,
    flagged: bool,
    note: Option<String>,
}

bind_object!(Event {
    id: i64,
    kind: String,
    value: f64,
    flagged: bool,
    note: Option<String>,
});

#[derive(Debug, PartialEq)]
struct EventLog {
    events: Vec<Event>,
}

bind_object!(EventLog {
    events: Vec<Event>,
});

/// Bind a chunky event log straight off disk and tot up some simple statistics
fn main() {
    let start = Instant::now();
    let binder = Binder::default();
    let log: EventLog = binder
        .decode_file("fixtures/json/bench/events.json")
        .unwrap();
    let flagged = log.events.iter().filter(|event| event.flagged).count();
    let total: f64 = log.events.iter().map(|event| event.value).sum();
    println!(
        "{} events, {} flagged, total value {:.2}",
        log.events.len(),
        flagged,
        total
    );
    println!("Bound the lot in: {:?}", start.elapsed());
}
