mod common;

use anyhow::{Result, bail};
use async_trait::async_trait;
use common::*;
use query_composer::*;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

fn cities() -> Vec<OptionItem> {
    vec![
        OptionItem::new("berlin", "Berlin"),
        OptionItem::new("bern", "Bern"),
        OptionItem::new("paris", "Paris"),
    ]
}

fn city_builder(loader: Arc<dyn OptionLoader>, config: ComposerConfig) -> InputController {
    init_tracing();
    InputController::new(schema_with_loader(loader), config)
}

fn lookup(reaction: Reaction) -> LookupRequest {
    match reaction {
        Reaction::Lookup(request) => request,
        other => panic!("expected Lookup, got: {other:?}"),
    }
}

fn labels(b: &InputController) -> Vec<&str> {
    b.suggestions().iter().map(|s| s.label.as_str()).collect()
}

/// Fails whenever the search is `boom`.
struct FlakyLoader {
    calls: AtomicUsize,
}

#[async_trait]
impl OptionLoader for FlakyLoader {
    async fn load(&self, search: &str, _token: &CancellationToken) -> Result<Vec<OptionItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if search == "boom" {
            bail!("backend unavailable");
        }
        Ok(cities())
    }
}

#[tokio::test]
async fn operator_on_loader_field_requests_lookup() {
    let mut b = city_builder(Arc::new(StaticLoader::new(cities())), ComposerConfig::default());
    applied(pick(&mut b, "city"));
    let request = lookup(pick(&mut b, "="));
    assert!(b.is_loading());
    assert!(b.state().async_search_active);
    assert_eq!(request.field, "city");
    assert_eq!(request.search, "");

    applied(b.apply_lookup(request.run().await));
    assert!(!b.is_loading());
    assert_eq!(labels(&b), ["Berlin", "Bern", "Paris"]);
    applied(pick(&mut b, "paris"));
    assert_eq!(b.query(), "city = paris");
}

#[tokio::test]
async fn superseded_response_is_discarded() {
    let mut b = city_builder(Arc::new(StaticLoader::new(cities())), ComposerConfig::default());
    applied(pick(&mut b, "city"));
    let first = lookup(pick(&mut b, "="));
    type_text(&mut b, "ber");
    let second = lookup(b.refresh());
    assert!(first.token.is_cancelled());
    assert!(!second.token.is_cancelled());

    let (first, second) = (first.run().await, second.run().await);
    applied(b.apply_lookup(second));
    assert!(matches!(b.apply_lookup(first), Reaction::Unchanged));
    assert_eq!(labels(&b), ["Berlin", "Bern"]);
}

#[tokio::test]
async fn superseded_response_overwrites_when_allowed() {
    let config = ComposerConfig {
        discard_stale_lookups: false,
        ..ComposerConfig::default()
    };
    let mut b = city_builder(Arc::new(StaticLoader::new(cities())), config);
    applied(pick(&mut b, "city"));
    let first = lookup(pick(&mut b, "="));
    type_text(&mut b, "ber");
    let second = lookup(b.refresh());

    let (first, second) = (first.run().await, second.run().await);
    applied(b.apply_lookup(second));
    applied(b.apply_lookup(first));
    assert_eq!(labels(&b), ["Berlin", "Bern", "Paris"]);
}

#[tokio::test]
async fn failed_lookup_keeps_previous_suggestions() {
    let loader = Arc::new(FlakyLoader {
        calls: AtomicUsize::new(0),
    });
    let mut b = city_builder(loader.clone(), ComposerConfig::default());
    applied(pick(&mut b, "city"));
    let request = lookup(pick(&mut b, "="));
    applied(b.apply_lookup(request.run().await));

    type_text(&mut b, "boom");
    let request = lookup(b.refresh());
    assert!(b.is_loading());
    applied(b.apply_lookup(request.run().await));
    assert!(!b.is_loading());
    assert_eq!(labels(&b).len(), 3);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn leaving_the_field_cancels_inflight_lookup() {
    let mut b = city_builder(Arc::new(StaticLoader::new(cities())), ComposerConfig::default());
    applied(pick(&mut b, "city"));
    let request = lookup(pick(&mut b, "="));
    applied(b.backspace());
    assert!(!b.is_loading());
    assert!(request.token.is_cancelled());
    assert!(matches!(
        b.apply_lookup(request.run().await),
        Reaction::Unchanged
    ));
    assert_eq!(b.phase(), Phase::FieldChosen);
}

#[tokio::test]
async fn commit_waits_for_lookup() {
    let mut b = city_builder(Arc::new(StaticLoader::new(cities())), ComposerConfig::default());
    applied(pick(&mut b, "city"));
    let request = lookup(pick(&mut b, "="));
    applied(b.apply_lookup(request.run().await));
    type_text(&mut b, "par");
    let request = lookup(b.commit());
    applied(b.apply_lookup(request.run().await));
    applied(b.commit());
    assert_eq!(b.query(), "city = paris");
}

#[tokio::test(start_paused = true)]
async fn session_debounces_and_looks_up() {
    init_tracing();
    let loader = StaticLoader::new(cities()).with_latency(Duration::from_millis(50));
    let session = FilterSession::spawn(
        schema_with_loader(Arc::new(loader)),
        ComposerConfig::default(),
    );
    let mut updates = session.query_updates();

    // first_name, age, created, status, city
    session.dispatch(Action::Select(4)).unwrap();
    session.dispatch(Action::Select(0)).unwrap();
    assert!(session.snapshot().loading);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.suggestions.len(), 3);

    for ch in "ber".chars() {
        session.dispatch(Action::Type(ch)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(session.snapshot().suggestions.len(), 3);
    tokio::time::sleep(Duration::from_millis(400)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.input, "ber");
    let values: Vec<_> = snapshot.suggestions.iter().map(|s| s.value.as_str()).collect();
    assert_eq!(values, ["berlin", "bern"]);

    updates.borrow_and_update();
    session.dispatch(Action::Select(1)).unwrap();
    assert!(updates.has_changed().unwrap());
    assert_eq!(session.query(), "city = bern");
    assert_eq!(session.snapshot().completeness, Completeness::Complete);
}

#[tokio::test]
async fn session_reports_refusals() {
    init_tracing();
    let session = FilterSession::spawn(schema(), ComposerConfig::default());
    assert_eq!(
        session.dispatch(Action::Select(42)),
        Err(Refusal::NoSuggestion)
    );
    assert_eq!(
        session.dispatch(Action::SetInput(")".into())),
        Err(Refusal::UnbalancedBracket)
    );
    session.dispatch(Action::SetInput("(".into())).unwrap();

    let json = serde_json::to_value(session.snapshot()).unwrap();
    assert_eq!(json["depth"], 1);
    assert_eq!(json["phase"], "Start");
    assert_eq!(json["tokens"][0], serde_json::json!({"bracket": "open"}));
}

#[tokio::test(start_paused = true)]
async fn retyping_after_escape_brings_suggestions_back() {
    init_tracing();
    let session = FilterSession::spawn(schema(), ComposerConfig::default());

    session.dispatch(Action::Type('a')).unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    let offered = session.snapshot().suggestions.len();
    assert!(offered > 0);

    session.dispatch(Action::Cancel).unwrap();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.input, "");
    assert!(snapshot.suggestions.is_empty());

    session.dispatch(Action::Type('a')).unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.input, "a");
    assert_eq!(snapshot.suggestions.len(), offered);
}
