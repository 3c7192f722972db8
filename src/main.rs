use std::{path::Path, process, time::Duration};

use serde::Serialize;
use tocsync::{
    application::error::AppError,
    application::render::{ContentMetrics, RenderRequest, RenderService, render_service},
    application::toc::{HeadingSynchronizer, SyncDriver, SyncPolicy},
    config,
    domain::headings::NavigationSnapshot,
    infra::{document::HtmlDocument, error::InfraError, telemetry},
    presentation::render_toc,
};
use tokio::time::{sleep, timeout};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

/// Extra time granted to the driver beyond the scan schedule before the
/// simulation proceeds without headings.
const SCAN_GRACE: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?error.chain(), "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?error.chain(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Render(args) => run_render(settings, args).await,
        config::Command::Simulate(args) => run_simulate(settings, args).await,
    }
}

#[derive(Debug, Serialize)]
struct RenderReport {
    slug: String,
    content_metrics: ContentMetrics,
    toc: NavigationSnapshot,
    html: String,
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let (slug, document, metrics) = load_article(&args.file, &settings).await?;

    let mut sync = HeadingSynchronizer::new(document.clone(), SyncPolicy::from(&settings.toc));
    let toc = sync.scan().snapshot();

    if args.toc_html {
        println!("{}", render_toc(&toc)?);
        return Ok(());
    }

    let report = RenderReport {
        slug,
        content_metrics: metrics,
        toc,
        html: document.html()?,
    };
    print_json(&report)
}

#[derive(Debug, Serialize)]
struct ScrollStep {
    scroll_top: f64,
    current_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ActivationStep {
    id: String,
    scroll_top: f64,
    current_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    slug: String,
    viewport_height: f64,
    toc: NavigationSnapshot,
    steps: Vec<ScrollStep>,
    activation: Option<ActivationStep>,
}

async fn run_simulate(
    settings: config::Settings,
    args: config::SimulateArgs,
) -> Result<(), AppError> {
    let (slug, document, _) = load_article(&args.file, &settings).await?;
    let policy = SyncPolicy::from(&settings.toc);
    let settle = policy.scroll_throttle + Duration::from_millis(5);
    let scan_budget = policy
        .scan_retry
        .delays()
        .iter()
        .fold(SCAN_GRACE, |total, delay| total + *delay);

    if args.render_delay_ms > 0 {
        document.set_rendered(false);
        let delayed = document.clone();
        let delay = Duration::from_millis(args.render_delay_ms);
        tokio::spawn(async move {
            sleep(delay).await;
            delayed.set_rendered(true);
        });
    }

    let (driver, handle) = SyncDriver::new(document.clone(), policy);
    let driver_task = tokio::spawn(driver.run());

    handle.content_changed().map_err(driver_closed)?;
    let mut snapshots = handle.subscribe();
    match timeout(scan_budget, snapshots.wait_for(|snapshot| !snapshot.is_empty())).await {
        Ok(Ok(_)) => {}
        Ok(Err(_)) => return Err(AppError::unexpected("navigation driver stopped early")),
        Err(_) => warn!(
            target = "tocsync::simulate",
            slug = %slug,
            "no headings appeared within the scan schedule"
        ),
    }
    let toc = handle.snapshot();

    let mut steps = Vec::with_capacity(args.scroll.len());
    for top in &args.scroll {
        document.set_scroll_top(*top);
        handle.scrolled().map_err(driver_closed)?;
        sleep(settle).await;
        steps.push(ScrollStep {
            scroll_top: document.scroll_top(),
            current_id: handle.snapshot().current_id,
        });
    }

    let activation = match args.activate {
        Some(id) => {
            handle.activate(id.clone()).map_err(driver_closed)?;
            sleep(settle).await;
            Some(ActivationStep {
                id,
                scroll_top: document.scroll_top(),
                current_id: handle.snapshot().current_id,
            })
        }
        None => None,
    };

    handle.shutdown().map_err(driver_closed)?;
    let sync = driver_task
        .await
        .map_err(|err| AppError::unexpected(format!("navigation driver panicked: {err}")))?;
    info!(
        target = "tocsync::simulate",
        slug = %slug,
        epoch = sync.epoch().get(),
        headings = sync.state().entries().len(),
        "simulation finished"
    );

    let report = SimulationReport {
        slug,
        viewport_height: document.viewport_height(),
        toc,
        steps,
        activation,
    };
    print_json(&report)
}

async fn load_article(
    path: &Path,
    settings: &config::Settings,
) -> Result<(String, HtmlDocument, ContentMetrics), AppError> {
    let markdown = tokio::fs::read_to_string(path)
        .await
        .map_err(InfraError::from)?;
    let slug = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "article".to_string());

    let article = render_service().render(&RenderRequest::new(slug.clone(), markdown))?;
    let document = HtmlDocument::parse(&article.html, settings.layout.clone())?;
    Ok((slug, document, article.content_metrics))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{json}");
    Ok(())
}

fn driver_closed(err: tocsync::application::toc::DriverError) -> AppError {
    AppError::unexpected(err.to_string())
}
