use std::collections::HashMap;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use tocsync::application::toc::{
    HeadingSynchronizer, METRIC_ACTIVATION_MISS, METRIC_SCAN_ATTEMPTS, METRIC_SCAN_EXHAUSTED,
    SyncPolicy,
};
use tocsync::infra::document::{HtmlDocument, LayoutSettings};
use tokio::time::Instant;

#[test]
fn synchronizer_emits_expected_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let start = Instant::now();

    // Headingless content: every scheduled scan runs, then the schedule is exhausted.
    let empty = HtmlDocument::parse("<p>no headings</p>", LayoutSettings::default())
        .expect("parse document");
    let mut sync = HeadingSynchronizer::new(empty, SyncPolicy::default());
    let mut timers = sync.content_changed(start);
    while let Some(timer) = timers.pop() {
        timers = sync.fire(timer, start);
    }

    // Activation of a heading whose node vanished: initial miss plus two retries.
    let document = HtmlDocument::parse("<h1>Intro</h1><p>body</p>", LayoutSettings::default())
        .expect("parse document");
    let mut sync = HeadingSynchronizer::new(document.clone(), SyncPolicy::default());
    sync.scan();
    document.set_rendered(false);
    let mut timers = sync.activate("heading-0", start);
    while let Some(timer) = timers.pop() {
        timers = sync.fire(timer, start);
    }

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => Some((composite_key.key().name().to_string(), count)),
            _ => None,
        })
        .collect();

    assert_eq!(counters.get(METRIC_SCAN_ATTEMPTS), Some(&5));
    assert_eq!(counters.get(METRIC_SCAN_EXHAUSTED), Some(&1));
    assert_eq!(counters.get(METRIC_ACTIVATION_MISS), Some(&3));
}
