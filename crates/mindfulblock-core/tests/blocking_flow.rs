//! End-to-end: navigation -> block -> challenge -> override -> allowed.

use chrono::{Duration, Utc};
use mindfulblock_core::analytics::{MemorySink, ReportKind};
use mindfulblock_core::friction::ChallengeKind;
use mindfulblock_core::interceptor::AllowReason;
use mindfulblock_core::{
    evaluate, BlockMode, BlockPageParams, ChallengeOutcome, FrictionEngine, InterceptState,
    Interceptor, Language, NavigationEvent, OverrideLedger, RuleStore, Verdict,
};

fn store() -> RuleStore {
    let mut store = RuleStore::new();
    store.add_rule("youtube.com", Some("Entertainment"), BlockMode::FrictionMath).unwrap();
    store.add_rule("facebook.com", None, BlockMode::Hard).unwrap();
    store.add_rule("reddit.com", None, BlockMode::FrictionWait).unwrap();
    store
}

fn state<'a>(store: &'a RuleStore, ledger: &'a OverrideLedger) -> InterceptState<'a, RuleStore> {
    InterceptState {
        matcher: store,
        ledger,
        blocking_enabled: true,
        language: Language::En,
    }
}

#[test]
fn math_challenge_unlocks_for_ten_minutes() {
    let store = store();
    let mut ledger = OverrideLedger::new();
    let sink = MemorySink::new();
    let interceptor = Interceptor::new(&sink);
    let mut engine = FrictionEngine::new(Some(42));
    let now = Utc::now();

    let nav = NavigationEvent::main_frame("https://www.youtube.com/watch?v=abc");
    let (verdict, event) = interceptor.handle(&nav, &state(&store, &ledger), now);
    assert!(event.is_some());
    let Verdict::Block(decision) = verdict else {
        panic!("expected block");
    };
    assert!(decision.overridable());

    // The block page sees exactly what the interceptor encoded.
    let query = decision.block_page.to_query();
    let params = BlockPageParams::from_query(&query);
    assert_eq!(params, decision.block_page);
    assert_eq!(params.hostname(), "youtube.com");

    let (mut challenge, _) = engine.start(&decision, now);
    let ChallengeKind::Math { problem } = challenge.kind.clone() else {
        panic!("expected math challenge");
    };

    let (outcome, _) = engine.submit(&mut challenge, "not a number", &mut ledger, &sink, now);
    assert_eq!(outcome, ChallengeOutcome::Retry { attempts: 1 });
    assert!(ledger.is_empty());

    let answer = problem.answer().to_string();
    let (outcome, event) = engine.submit(&mut challenge, &answer, &mut ledger, &sink, now);
    let ChallengeOutcome::Unlocked { navigate_to, expires_at_ms } = outcome else {
        panic!("expected unlock");
    };
    assert!(event.is_some());
    assert_eq!(navigate_to, "https://www.youtube.com/watch?v=abc");
    assert_eq!(expires_at_ms, now.timestamp_millis() + 600_000);

    // Inside the window the same navigation passes, without a new report.
    let later = now + Duration::minutes(9);
    let (verdict, event) = interceptor.handle(&nav, &state(&store, &ledger), later);
    assert!(event.is_none());
    assert!(matches!(
        verdict,
        Verdict::Allow {
            reason: AllowReason::OverrideActive { .. },
            ..
        }
    ));

    // After it the block is back.
    let expired = now + Duration::minutes(10) + Duration::milliseconds(1);
    assert!(evaluate(&nav, &state(&store, &ledger), expired).is_blocked());

    let kinds: Vec<_> = sink.events().into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ReportKind::Block, ReportKind::Override]);
}

#[test]
fn hard_block_has_no_way_through() {
    let store = store();
    let mut ledger = OverrideLedger::new();
    let sink = MemorySink::new();
    let mut engine = FrictionEngine::new(Some(1));
    let now = Utc::now();

    let verdict = evaluate(
        &NavigationEvent::main_frame("https://m.facebook.com/"),
        &state(&store, &ledger),
        now,
    );
    let Verdict::Block(decision) = verdict else {
        panic!("expected block");
    };
    assert!(!decision.overridable());

    let (mut challenge, _) = engine.start(&decision, now);
    let (outcome, event) = engine.submit(&mut challenge, "anything", &mut ledger, &sink, now);
    assert_eq!(outcome, ChallengeOutcome::Denied);
    assert!(event.is_none());
    assert!(ledger.is_empty());
    assert!(sink.events().is_empty());
}

#[test]
fn wait_challenge_needs_the_full_countdown() {
    let store = store();
    let mut ledger = OverrideLedger::new();
    let sink = MemorySink::new();
    let mut engine = FrictionEngine::new(None);
    let now = Utc::now();

    let Verdict::Block(decision) = evaluate(
        &NavigationEvent::main_frame("https://old.reddit.com/r/rust"),
        &state(&store, &ledger),
        now,
    ) else {
        panic!("expected block");
    };
    let (mut challenge, _) = engine.start(&decision, now);

    let early = now + Duration::seconds(14);
    let (outcome, _) = engine.submit(&mut challenge, "", &mut ledger, &sink, early);
    assert!(matches!(outcome, ChallengeOutcome::Waiting { .. }));
    assert!(ledger.is_empty());

    let done = now + Duration::seconds(15);
    let (outcome, _) = engine.submit(&mut challenge, "", &mut ledger, &sink, done);
    assert!(matches!(outcome, ChallengeOutcome::Unlocked { .. }));

    // The override is keyed by the navigated host, not the rule domain.
    assert!(ledger.is_active("old.reddit.com", done));
    assert!(!ledger.is_active("reddit.com", done));
}

#[test]
fn evaluation_is_idempotent() {
    let store = store();
    let ledger = OverrideLedger::new();
    let now = Utc::now();
    let nav = NavigationEvent::main_frame("https://youtube.com/");
    let first = evaluate(&nav, &state(&store, &ledger), now);
    let second = evaluate(&nav, &state(&store, &ledger), now);
    assert_eq!(first, second);
}

#[test]
fn disabling_blocking_or_the_group_lets_everything_through() {
    let mut store = store();
    let ledger = OverrideLedger::new();
    let now = Utc::now();
    let nav = NavigationEvent::main_frame("https://youtube.com/");

    let mut off = state(&store, &ledger);
    off.blocking_enabled = false;
    assert!(!evaluate(&nav, &off, now).is_blocked());

    assert_eq!(store.set_group_active("entertainment", false).unwrap(), 1);
    assert!(!evaluate(&nav, &state(&store, &ledger), now).is_blocked());
}

#[test]
fn sub_frames_are_never_blocked() {
    let store = store();
    let ledger = OverrideLedger::new();
    let nav = NavigationEvent {
        url: "https://www.youtube.com/embed/xyz".into(),
        main_frame: false,
    };
    assert!(!evaluate(&nav, &state(&store, &ledger), Utc::now()).is_blocked());
}
