use tocsync::application::render::{RenderRequest, RenderService, render_service};
use tocsync::application::toc::{HeadingSynchronizer, SyncPolicy};
use tocsync::infra::document::{HtmlDocument, LayoutSettings};
use tocsync::presentation::{render_toc, render_toc_titled};

fn load_markdown() -> String {
    include_str!("fixtures/article.md").to_string()
}

fn scanned_fixture() -> (HtmlDocument, HeadingSynchronizer<HtmlDocument>) {
    let article = render_service()
        .render(&RenderRequest::new("getting-started", load_markdown()))
        .expect("render succeeds");
    let document =
        HtmlDocument::parse(&article.html, LayoutSettings::default()).expect("parse document");
    let mut sync = HeadingSynchronizer::new(document.clone(), SyncPolicy::default());
    sync.scan();
    (document, sync)
}

#[test]
fn rendered_article_reports_content_metrics() {
    let article = render_service()
        .render(&RenderRequest::new("getting-started", load_markdown()))
        .expect("render succeeds");

    let metrics = &article.content_metrics;
    assert_eq!(metrics.heading_count, 4);
    assert_eq!(metrics.code_blocks_count, 1);
    assert_eq!(metrics.reading_time_minutes, 1);
    assert!(metrics.word_count > 40);
    assert!(!article.html.contains("Getting started"));
}

#[test]
fn headings_of_rendered_markdown_become_entries() {
    let (_, sync) = scanned_fixture();

    let entries: Vec<_> = sync
        .state()
        .entries()
        .iter()
        .map(|entry| (entry.id.as_str(), entry.text.as_str(), entry.level.get()))
        .collect();
    assert_eq!(
        entries,
        [
            ("heading-0", "Intro", 1),
            ("heading-1", "Setup & Run", 2),
            ("heading-2", "Configuration", 3),
            ("heading-3", "Conclusion", 2),
        ]
    );
}

#[test]
fn tagged_markup_carries_positional_ids() {
    let (document, _) = scanned_fixture();
    let html = document.html().expect("serialise");

    assert!(html.contains("<h1 id=\"heading-0\">Intro</h1>"));
    assert!(html.contains("<h2 id=\"heading-1\">Setup &amp; <em>Run</em></h2>"));
    assert!(html.contains("<h3 id=\"heading-2\">Configuration</h3>"));
}

#[test]
fn toc_markup_lists_every_entry() {
    let (_, sync) = scanned_fixture();
    let html = render_toc(&sync.state().snapshot()).expect("render toc");

    for id in ["heading-0", "heading-1", "heading-2", "heading-3"] {
        assert!(html.contains(&format!("href=\"#{id}\"")), "missing {id}");
    }
    assert!(html.contains("toc__item--h3"));
    assert!(html.contains("Setup &#38; Run"));

    let titled = render_toc_titled(&sync.state().snapshot(), "On this page").expect("render toc");
    assert!(titled.contains("aria-label=\"On this page\""));
}
