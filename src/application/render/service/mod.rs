mod config;
mod metrics;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::application::render::types::{
    RenderError, RenderRequest, RenderService, RenderedArticle,
};

use self::config::{build_article_sanitizer, default_options};
use self::metrics::collect_metrics;

/// Comrak-based article pipeline with Ammonia sanitisation.
///
/// This is the content-provider half of the render-then-scan contract: it
/// produces the markup that a document surface mounts and the heading
/// synchronizer later scans.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    sanitizer: ammonia::Builder<'static>,
}

impl ComrakRenderService {
    fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: build_article_sanitizer(),
        }
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderedArticle, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);

        let rendered_html = render_html_stage(root, &self.options)?;
        let html = self.sanitizer.clean(&rendered_html).to_string();
        let content_metrics = collect_metrics(&html)?;

        debug!(
            target = "application::render",
            slug = %request.slug,
            headings = content_metrics.heading_count,
            words = content_metrics.word_count,
            "rendered article"
        );

        Ok(RenderedArticle {
            slug: request.slug.clone(),
            html,
            content_metrics,
        })
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> RenderedArticle {
        render_service()
            .render(&RenderRequest::new("test", markdown))
            .expect("render succeeds")
    }

    #[test]
    fn headings_survive_sanitisation() {
        let article = render("# Intro\n\ntext\n\n## Setup\n\nmore\n\n# Conclusion\n");
        assert!(article.html.contains("<h1>Intro</h1>"));
        assert!(article.html.contains("<h2>Setup</h2>"));
        assert_eq!(article.content_metrics.heading_count, 3);
    }

    #[test]
    fn scripts_are_removed() {
        let article = render("# Title\n\n<script>alert(1)</script>\n\nbody\n");
        assert!(!article.html.contains("<script"));
        assert!(article.html.contains("body"));
    }

    #[test]
    fn empty_article_has_no_reading_time() {
        let article = render("");
        assert_eq!(article.content_metrics.word_count, 0);
        assert_eq!(article.content_metrics.reading_time_minutes, 0);
    }

    #[test]
    fn front_matter_is_not_rendered() {
        let article = render("---\ntitle: Hidden\n---\n\n# Shown\n");
        assert!(!article.html.contains("Hidden"));
        assert!(article.html.contains("Shown"));
    }
}
