use crate::canvas::{Canvas, Page};
use crate::content::{
    ContentContext, ContentNode, ContentProvider, ContentValue, CounterSnapshot, ImageNode,
    MarginBoxContent,
};
use crate::debug::{DebugLogger, json_escape};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{LayoutFailure, PageLayoutError};
use crate::fit::{FittedContent, Overflow, fit};
use crate::frame::{BoxLayouter, FrameLayouter};
use crate::geometry::{GeometryConfig, PageGeometry, compute_geometry};
use crate::hooks::{ContentRequest, HookRegistry};
use crate::length::LengthSpec;
use crate::margin_box::{BandRequest, MarginBoxPosition, margin_box_rects};
use crate::marks::{MarkInstruction, draw_marks, render_marks};
use crate::rules::{EffectivePageDeclaration, PageContext, PageRuleSet, PropertyMap, resolve};
use crate::types::{Edges, Pt, Rect, Size};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// One page to lay out: its cascade context and the counters captured for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: PageContext,
    pub counters: CounterSnapshot,
}

impl PageRequest {
    pub fn new(page: PageContext) -> Self {
        let counters = CounterSnapshot::for_page(&page);
        Self { page, counters }
    }

    pub fn with_counters(mut self, counters: CounterSnapshot) -> Self {
        self.counters = counters;
        self
    }

    /// Unnamed pages `0..total` with default counters.
    pub fn sequence(total: usize) -> Vec<PageRequest> {
        (0..total)
            .map(|index| PageRequest::new(PageContext::new(index, total)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PlacedMarginBox {
    pub position: MarginBoxPosition,
    pub rect: Rect,
    pub overflow: Overflow,
    pub content: FittedContent,
    // Image resources referenced by the content, for the emitter to embed.
    pub images: Vec<ImageNode>,
}

#[derive(Debug, Clone)]
pub struct PageLayout {
    pub page_index: usize,
    pub geometry: PageGeometry,
    pub margin_boxes: Vec<PlacedMarginBox>,
    pub marks: Vec<MarkInstruction>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PageLayout {
    pub fn margin_box(&self, position: MarginBoxPosition) -> Option<&PlacedMarginBox> {
        self.margin_boxes
            .iter()
            .find(|placed| placed.position == position)
    }

    /// Margin boxes in position order, then marks on top.
    pub fn to_page(&self) -> Page {
        let mut canvas = Canvas::new(self.geometry.media_box().size());
        canvas.record_bounds("pagebox.trim_box", self.geometry.trim_box());
        canvas.record_bounds("pagebox.bleed_box", self.geometry.bleed_box());
        for placed in &self.margin_boxes {
            canvas.save_state();
            canvas.record_bounds(placed.position.name(), placed.rect);
            if let Some(clip) = placed.content.clip {
                canvas.clip_rect(clip);
            }
            for fitted in &placed.content.items {
                fitted.item.flowable.draw(&mut canvas, fitted.item.rect);
            }
            canvas.restore_state();
        }
        draw_marks(&mut canvas, &self.marks);
        canvas.finish()
    }
}

// A margin box that will be generated, before its rectangle is known.
struct PendingBox {
    position: MarginBoxPosition,
    properties: PropertyMap,
    value: ContentValue,
    extent: Option<Pt>,
}

/// Lays out page geometry, margin boxes and marks for paged documents.
#[derive(Clone)]
pub struct PageBox {
    config: GeometryConfig,
    overflow_fallback: Overflow,
    parallel: bool,
    hooks: HookRegistry,
    layouter: Arc<dyn BoxLayouter>,
    debug: Option<DebugLogger>,
}

impl PageBox {
    pub fn builder() -> PageBoxBuilder {
        PageBoxBuilder::new()
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    pub fn overflow_fallback(&self) -> Overflow {
        self.overflow_fallback
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// Lays out one page. `rules` is `None` when no page style is available, which fails
    /// the page; everything short of that degrades to diagnostics.
    pub fn layout_page(
        &self,
        rules: Option<&PageRuleSet>,
        request: &PageRequest,
        provider: &dyn ContentProvider,
    ) -> Result<PageLayout, PageLayoutError> {
        let page_index = request.page.index;
        let Some(rules) = rules else {
            self.log_page_error(page_index, "missing_style_tree");
            return Err(PageLayoutError::MissingStyleTree { page_index });
        };
        let decl = resolve(rules, &request.page);
        let mut diagnostics = Diagnostics::for_page(page_index);
        let geometry = compute_geometry(&decl, &self.config, &mut diagnostics);
        let margin_boxes = match self.layout_margin_boxes(
            &geometry,
            &decl,
            &request.page,
            &request.counters,
            provider,
            &mut diagnostics,
        ) {
            Ok(boxes) => boxes,
            Err(err) => {
                self.log_page_error(page_index, "layout");
                return Err(PageLayoutError::Layout {
                    page_index,
                    message: err.0,
                });
            }
        };
        let marks = render_marks(&geometry);
        let layout = PageLayout {
            page_index,
            geometry,
            margin_boxes,
            marks,
            diagnostics: diagnostics.into_events(),
        };
        self.log_page(&layout);
        Ok(layout)
    }

    /// Places every generated, non-degenerate margin box of a page in position order.
    pub fn layout_margin_boxes(
        &self,
        geometry: &PageGeometry,
        decl: &EffectivePageDeclaration,
        page: &PageContext,
        counters: &CounterSnapshot,
        provider: &dyn ContentProvider,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<PlacedMarginBox>, LayoutFailure> {
        let trim = geometry.trim_box();
        let pending: Vec<PendingBox> = MarginBoxPosition::ALL
            .iter()
            .filter_map(|&position| self.prepare_box(position, decl, trim.size(), diagnostics))
            .collect();
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        let find = |position: MarginBoxPosition| pending.iter().find(|b| b.position == position);
        let rects = margin_box_rects(trim, geometry.margins, |position| match find(position) {
            Some(pending) => BandRequest {
                generated: true,
                extent: pending.extent,
            },
            None => BandRequest::default(),
        });

        let mut placed = Vec::new();
        for (position, rect) in rects {
            let Some(pending) = find(position) else {
                continue;
            };
            if rect.is_degenerate() {
                continue;
            }
            placed.push(self.place_box(pending, rect, page, counters, provider, diagnostics)?);
        }
        Ok(placed)
    }

    /// Lays out every request. Pages are independent, so one failure leaves the others
    /// intact; results keep request order.
    pub fn layout_document(
        &self,
        rules: Option<&PageRuleSet>,
        requests: &[PageRequest],
        provider: &dyn ContentProvider,
    ) -> Vec<Result<PageLayout, PageLayoutError>> {
        let results: Vec<Result<PageLayout, PageLayoutError>> = if self.parallel {
            use rayon::prelude::*;
            requests
                .par_iter()
                .map(|request| self.layout_page(rules, request, provider))
                .collect()
        } else {
            requests
                .iter()
                .map(|request| self.layout_page(rules, request, provider))
                .collect()
        };
        self.emit_debug_summary("layout_document");
        results
    }

    pub fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = &self.debug {
            logger.emit_summary(context);
            logger.flush();
        }
    }

    fn prepare_box(
        &self,
        position: MarginBoxPosition,
        decl: &EffectivePageDeclaration,
        trim: Size,
        diagnostics: &mut Diagnostics,
    ) -> Option<PendingBox> {
        let mut properties = decl.margin_box(position)?.clone();
        if let Some(applier) = self.hooks.style_applier(position) {
            applier.apply(position, &mut properties);
        }
        let raw = properties.get("content")?;
        let value = match ContentValue::parse(raw) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(_) => {
                diagnostics.report(
                    DiagnosticKind::ContentPropertyInvalid,
                    Some(position.name()),
                    raw,
                );
                return None;
            }
        };
        let extent = position.sizing_property().and_then(|name| {
            let basis = if name == "width" {
                trim.width
            } else {
                trim.height
            };
            match LengthSpec::parse(properties.get(name)?)? {
                LengthSpec::Auto => None,
                spec => Some(spec.resolve(basis, self.config.font_size)),
            }
        });
        Some(PendingBox {
            position,
            properties,
            value,
            extent,
        })
    }

    fn place_box(
        &self,
        pending: &PendingBox,
        rect: Rect,
        page: &PageContext,
        counters: &CounterSnapshot,
        provider: &dyn ContentProvider,
        diagnostics: &mut Diagnostics,
    ) -> Result<PlacedMarginBox, LayoutFailure> {
        let position = pending.position;
        let context = ContentContext {
            position,
            page,
            counters,
            provider,
        };
        let nodes = match self.hooks.content_worker(position) {
            Some(worker) => {
                let request = ContentRequest {
                    position,
                    properties: &pending.properties,
                    value: &pending.value,
                    context,
                };
                worker.resolve(&request, diagnostics)
            }
            None => pending.value.resolve(&context, diagnostics),
        };
        let mut images = Vec::new();
        collect_images(&nodes, &mut images);
        let content = MarginBoxContent::from_properties(position, &pending.properties, nodes);
        let overflow = content.overflow.unwrap_or(self.overflow_fallback);
        let laid_out = self.layouter.layout_box(&content, rect.size())?;
        Ok(PlacedMarginBox {
            position,
            rect,
            overflow,
            content: fit(laid_out, rect, overflow),
            images,
        })
    }

    fn log_page(&self, layout: &PageLayout) {
        let Some(logger) = &self.debug else {
            return;
        };
        for diagnostic in &layout.diagnostics {
            logger.log_json(&diagnostic.to_json());
            logger.increment(&format!("diagnostic.{}", diagnostic.kind.as_str()), 1);
        }
        logger.increment("margin_box.placed", layout.margin_boxes.len() as u64);
        let media = layout.geometry.media_box();
        let boxes = layout
            .margin_boxes
            .iter()
            .map(|placed| format!("\"{}\"", placed.position.name()))
            .collect::<Vec<_>>()
            .join(",");
        logger.log_json(&format!(
            "{{\"type\":\"pagebox.page\",\"page_index\":{},\"media_box\":[{:.3},{:.3}],\"margin_boxes\":[{}],\"marks\":{},\"diagnostics\":{}}}",
            layout.page_index,
            media.width.to_f32(),
            media.height.to_f32(),
            boxes,
            layout.marks.len(),
            layout.diagnostics.len()
        ));
    }

    fn log_page_error(&self, page_index: usize, reason: &str) {
        if let Some(logger) = &self.debug {
            logger.increment("page.failed", 1);
            logger.log_json(&format!(
                "{{\"type\":\"pagebox.page_error\",\"page_index\":{},\"reason\":\"{}\"}}",
                page_index,
                json_escape(reason)
            ));
        }
    }
}

impl fmt::Debug for PageBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageBox")
            .field("config", &self.config)
            .field("overflow_fallback", &self.overflow_fallback)
            .field("parallel", &self.parallel)
            .field("hooks", &self.hooks)
            .field("debug", &self.debug.is_some())
            .finish()
    }
}

fn collect_images(nodes: &[ContentNode], out: &mut Vec<ImageNode>) {
    for node in nodes {
        match node {
            ContentNode::Image(image) => out.push(image.clone()),
            ContentNode::Group(children) => collect_images(children, out),
            ContentNode::Text(_) => {}
        }
    }
}

pub struct PageBoxBuilder {
    config: GeometryConfig,
    overflow_fallback: Overflow,
    parallel: bool,
    hooks: HookRegistry,
    layouter: Arc<dyn BoxLayouter>,
    debug_path: Option<PathBuf>,
}

impl PageBoxBuilder {
    pub fn new() -> Self {
        Self {
            config: GeometryConfig::default(),
            overflow_fallback: Overflow::Visible,
            parallel: true,
            hooks: HookRegistry::new(),
            layouter: Arc::new(FrameLayouter),
            debug_path: None,
        }
    }

    pub fn default_page_size(mut self, size: Size) -> Self {
        self.config.default_size = size;
        self
    }

    pub fn default_margins(mut self, margins: Edges) -> Self {
        self.config.default_margins = margins;
        self
    }

    /// Bleed applied when marks are requested and `bleed` is unset or `auto`.
    pub fn default_bleed(mut self, bleed: Pt) -> Self {
        self.config.default_bleed = bleed;
        self
    }

    pub fn mark_gutter(mut self, gutter: Pt) -> Self {
        self.config.mark_gutter = gutter;
        self
    }

    /// Font size for `em` lengths in page declarations.
    pub fn font_size(mut self, size: Pt) -> Self {
        self.config.font_size = size;
        self
    }

    pub fn overflow_fallback(mut self, overflow: Overflow) -> Self {
        self.overflow_fallback = overflow;
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn layouter(mut self, layouter: impl BoxLayouter + 'static) -> Self {
        self.layouter = Arc::new(layouter);
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<PageBox, PageLayoutError> {
        let size = self.config.default_size;
        if !size.width.is_positive() || !size.height.is_positive() {
            return Err(PageLayoutError::InvalidConfiguration(
                "default page size must be positive".to_string(),
            ));
        }
        if self.config.default_margins.any_negative() {
            return Err(PageLayoutError::InvalidConfiguration(
                "default margins must not be negative".to_string(),
            ));
        }
        if self.config.default_bleed < Pt::ZERO {
            return Err(PageLayoutError::InvalidConfiguration(
                "default bleed must not be negative".to_string(),
            ));
        }
        if self.config.mark_gutter < Pt::ZERO {
            return Err(PageLayoutError::InvalidConfiguration(
                "mark gutter must not be negative".to_string(),
            ));
        }
        if !self.config.font_size.is_positive() {
            return Err(PageLayoutError::InvalidConfiguration(
                "font size must be positive".to_string(),
            ));
        }
        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        Ok(PageBox {
            config: self.config,
            overflow_fallback: self.overflow_fallback,
            parallel: self.parallel,
            hooks: self.hooks,
            layouter: self.layouter,
            debug,
        })
    }
}

impl Default for PageBoxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::content::NoContent;
    use crate::frame::LaidOutBox;
    use crate::hooks::{ContentWorker, HookKey, StyleApplier};
    use crate::rules::{Declarations, PageRule, PageSelector};
    use base64::Engine;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn engine() -> PageBox {
        PageBox::builder().parallel(false).build().expect("engine")
    }

    fn close(a: Pt, b: Pt) -> bool {
        (a.to_f32() - b.to_f32()).abs() < 0.01
    }

    fn content(raw: &str) -> Declarations {
        Declarations::new().with("content", raw)
    }

    fn strings(page: &Page) -> Vec<String> {
        page.commands
            .iter()
            .filter_map(|command| match command {
                Command::DrawString { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::new(width, height);
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .expect("encode png");
        bytes
    }

    fn temp_log_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "pagebox_{tag}_{}_{}.jsonl",
            std::process::id(),
            nanos
        ))
    }

    fn footer_rules() -> PageRuleSet {
        PageRuleSet::new().with_rule(
            PageRule::new(
                PageSelector::any(),
                Declarations::parse("size: a5; margin: 36pt"),
            )
            .margin_box(
                MarginBoxPosition::BottomCenter,
                content(r#""Page " counter(page) " of " counter(pages)"#),
            ),
        )
    }

    struct ScaledLogo(Vec<u8>);

    impl ContentWorker for ScaledLogo {
        fn resolve(
            &self,
            _request: &ContentRequest<'_>,
            _diagnostics: &mut Diagnostics,
        ) -> Vec<ContentNode> {
            match ImageNode::from_bytes(&self.0) {
                Ok(image) => vec![ContentNode::Image(image.with_auto_scale(true))],
                Err(_) => Vec::new(),
            }
        }
    }

    // Keeps the built-in result but lets every image shrink into its box.
    struct ShrinkImages;

    impl ContentWorker for ShrinkImages {
        fn resolve(
            &self,
            request: &ContentRequest<'_>,
            diagnostics: &mut Diagnostics,
        ) -> Vec<ContentNode> {
            request
                .resolve_builtin(diagnostics)
                .into_iter()
                .map(|node| match node {
                    ContentNode::Image(image) => ContentNode::Image(image.with_auto_scale(true)),
                    other => other,
                })
                .collect()
        }
    }

    struct VisibleByDefault;

    impl StyleApplier for VisibleByDefault {
        fn apply(&self, _position: MarginBoxPosition, properties: &mut PropertyMap) {
            properties
                .entry("overflow".to_string())
                .or_insert_with(|| "visible".to_string());
        }
    }

    struct FailingLayouter;

    impl BoxLayouter for FailingLayouter {
        fn layout_box(
            &self,
            _content: &MarginBoxContent,
            _size: Size,
        ) -> Result<LaidOutBox, LayoutFailure> {
            Err(LayoutFailure("no fonts".to_string()))
        }
    }

    #[test]
    fn footer_is_centered_in_bottom_band() {
        let engine = engine();
        let results = engine.layout_document(Some(&footer_rules()), &PageRequest::sequence(3), &NoContent);
        assert_eq!(results.len(), 3);
        for (index, result) in results.iter().enumerate() {
            let layout = result.as_ref().expect("page layout");
            assert_eq!(layout.page_index, index);
            assert_eq!(layout.margin_boxes.len(), 1);
            let trim = layout.geometry.trim_box();
            let footer = layout
                .margin_box(MarginBoxPosition::BottomCenter)
                .expect("footer");
            assert!(close(footer.rect.bottom(), trim.bottom()));
            assert!(close(footer.rect.height, Pt::from_f32(36.0)));
            assert!(close(
                footer.rect.x + footer.rect.width.half(),
                trim.x + trim.width.half()
            ));
            assert_eq!(
                strings(&layout.to_page()),
                vec![format!("Page {} of 3", index + 1)]
            );
        }
    }

    #[test]
    fn caller_counters_override_page_position() {
        let request = PageRequest::new(PageContext::new(0, 1))
            .with_counters(CounterSnapshot::new(7, 9));
        let layout = engine()
            .layout_page(Some(&footer_rules()), &request, &NoContent)
            .expect("layout");
        assert_eq!(strings(&layout.to_page()), vec!["Page 7 of 9".to_string()]);
    }

    #[test]
    fn first_page_rules_do_not_reach_page_two() {
        let rules = PageRuleSet::new().with_rule(
            PageRule::new(PageSelector::first(), Declarations::new())
                .margin_box(MarginBoxPosition::TopCenter, content(r#""Title""#)),
        );
        let engine = engine();
        let requests = PageRequest::sequence(2);
        let first = engine
            .layout_page(Some(&rules), &requests[0], &NoContent)
            .expect("first");
        let second = engine
            .layout_page(Some(&rules), &requests[1], &NoContent)
            .expect("second");
        assert!(first.margin_box(MarginBoxPosition::TopCenter).is_some());
        assert!(second.margin_boxes.is_empty());
    }

    #[test]
    fn content_worker_replaces_content_until_unregistered() {
        let rules = PageRuleSet::new().with_rule(
            PageRule::new(PageSelector::any(), Declarations::new())
                .margin_box(MarginBoxPosition::TopCenter, content(r#""Title""#)),
        );
        let mut engine = engine();
        engine.hooks_mut().register_content_worker(
            MarginBoxPosition::TopCenter,
            Arc::new(ScaledLogo(png_bytes(800, 40))),
        );
        let requests = PageRequest::sequence(3);
        for result in engine.layout_document(Some(&rules), &requests, &NoContent) {
            let layout = result.expect("layout");
            let header = layout
                .margin_box(MarginBoxPosition::TopCenter)
                .expect("header");
            assert_eq!(header.images.len(), 1);
            assert_eq!(header.content.items.len(), 1);
            let image = header.content.items[0].item.rect;
            assert_eq!(image.width, header.rect.width);
            assert!(header.rect.contains_rect(&image));
            assert!(strings(&layout.to_page()).is_empty());
        }

        assert!(engine
            .hooks_mut()
            .unregister_content_worker(MarginBoxPosition::TopCenter)
            .is_some());
        let layout = engine
            .layout_page(Some(&rules), &requests[1], &NoContent)
            .expect("layout");
        assert_eq!(strings(&layout.to_page()), vec!["Title".to_string()]);
    }

    #[test]
    fn worker_post_processes_builtin_images_into_the_header() {
        let payload = base64::engine::general_purpose::STANDARD.encode(png_bytes(100, 400));
        let logo = format!("url(\"data:image/png;base64,{payload}\")");
        for overflow in ["visible", "hidden"] {
            let rules = PageRuleSet::new().with_rule(
                PageRule::new(PageSelector::any(), Declarations::parse("size: a4; margin: 36pt"))
                    .margin_box(
                        MarginBoxPosition::TopCenter,
                        content(&logo).with("overflow", overflow),
                    ),
            );
            let mut engine = engine();
            engine
                .hooks_mut()
                .register_content_worker(MarginBoxPosition::TopCenter, Arc::new(ShrinkImages));
            let layout = engine
                .layout_page(Some(&rules), &PageRequest::new(PageContext::new(0, 1)), &NoContent)
                .expect("layout");
            let header = layout
                .margin_box(MarginBoxPosition::TopCenter)
                .expect("header");
            assert_eq!(header.images.len(), 1);
            assert!(header.images[0].auto_scale);
            assert_eq!(header.content.items.len(), 1, "{overflow}");
            let image = header.content.items[0].item.rect;
            assert!(header.rect.contains_rect(&image), "{overflow}: {image:?}");
            assert_eq!(image.height, header.rect.height);
            assert!(close(
                image.x + image.width.half(),
                header.rect.x + header.rect.width.half()
            ));
            let drawn = layout
                .to_page()
                .commands
                .iter()
                .filter(|c| matches!(c, Command::DrawImage { .. }))
                .count();
            assert_eq!(drawn, 1);
        }
    }

    #[test]
    fn malformed_color_falls_back_without_failing_pages() {
        let rules = PageRuleSet::new().with_rule(
            PageRule::new(PageSelector::any(), Declarations::new()).margin_box(
                MarginBoxPosition::TopCenter,
                content(r#""x""#).with("color", "#é0"),
            ),
        );
        let engine = PageBox::builder().build().expect("engine");
        let results =
            engine.layout_document(Some(&rules), &PageRequest::sequence(4), &NoContent);
        assert_eq!(results.len(), 4);
        for result in results {
            let layout = result.expect("layout");
            assert_eq!(strings(&layout.to_page()), vec!["x".to_string()]);
        }
    }

    #[test]
    fn applier_set_overflow_beats_fallback() {
        let rules = PageRuleSet::new().with_rule(
            PageRule::new(PageSelector::any(), Declarations::new())
                .margin_box(MarginBoxPosition::TopLeft, content(r#""a""#))
                .margin_box(
                    MarginBoxPosition::TopRight,
                    content(r#""b""#).with("overflow", "clip"),
                ),
        );
        let mut hooks = HookRegistry::new();
        hooks.register_style_applier(HookKey::MarginBoxTag, Arc::new(VisibleByDefault));
        let engine = PageBox::builder()
            .overflow_fallback(Overflow::Hidden)
            .hooks(hooks)
            .parallel(false)
            .build()
            .expect("engine");
        let layout = engine
            .layout_page(Some(&rules), &PageRequest::new(PageContext::new(0, 1)), &NoContent)
            .expect("layout");
        let left = layout.margin_box(MarginBoxPosition::TopLeft).expect("left");
        assert_eq!(left.overflow, Overflow::Visible);
        assert!(left.content.clip.is_none());
        let right = layout.margin_box(MarginBoxPosition::TopRight).expect("right");
        assert_eq!(right.overflow, Overflow::Clip);
        assert_eq!(right.content.clip, Some(right.rect));
    }

    #[test]
    fn fallback_overflow_applies_without_declaration() {
        let engine = PageBox::builder()
            .overflow_fallback(Overflow::Hidden)
            .build()
            .expect("engine");
        let layout = engine
            .layout_page(Some(&footer_rules()), &PageRequest::new(PageContext::new(0, 1)), &NoContent)
            .expect("layout");
        let footer = layout
            .margin_box(MarginBoxPosition::BottomCenter)
            .expect("footer");
        assert_eq!(footer.overflow, Overflow::Hidden);
        assert_eq!(footer.content.clip, Some(footer.rect));
    }

    #[test]
    fn invalid_content_reports_once_per_box() {
        let rules = PageRuleSet::new().with_rule(
            PageRule::new(PageSelector::any(), Declarations::new())
                .margin_box(MarginBoxPosition::TopLeft, content("bogus"))
                .margin_box(MarginBoxPosition::TopCenter, content("\"unterminated"))
                .margin_box(MarginBoxPosition::TopRight, content("counter(page"))
                .margin_box(MarginBoxPosition::BottomCenter, content("none")),
        );
        let layout = engine()
            .layout_page(Some(&rules), &PageRequest::new(PageContext::new(0, 1)), &NoContent)
            .expect("layout");
        assert!(layout.margin_boxes.is_empty());
        assert_eq!(layout.diagnostics.len(), 3);
        assert!(layout
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::ContentPropertyInvalid && d.page_index == Some(0)));
        let subjects: Vec<_> = layout
            .diagnostics
            .iter()
            .filter_map(|d| d.subject.as_deref())
            .collect();
        assert_eq!(subjects, vec!["top-left", "top-center", "top-right"]);
    }

    #[test]
    fn missing_rules_fail_every_page() {
        let engine = engine();
        let results = engine.layout_document(None, &PageRequest::sequence(2), &NoContent);
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Err(PageLayoutError::MissingStyleTree { page_index }) => {
                    assert_eq!(page_index, index)
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn layouter_failure_fails_only_that_page() {
        let rules = PageRuleSet::new().with_rule(
            PageRule::new(PageSelector::first(), Declarations::new())
                .margin_box(MarginBoxPosition::TopCenter, content(r#""Title""#)),
        );
        let engine = PageBox::builder()
            .layouter(FailingLayouter)
            .build()
            .expect("engine");
        let results = engine.layout_document(Some(&rules), &PageRequest::sequence(2), &NoContent);
        match &results[0] {
            Err(PageLayoutError::Layout {
                page_index,
                message,
            }) => {
                assert_eq!(*page_index, 0);
                assert_eq!(message, "no fonts");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(results[1].is_ok());
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let rules = footer_rules().with_rule(
            PageRule::new(PageSelector::left(), Declarations::parse("marks: crop cross"))
                .margin_box(MarginBoxPosition::LeftMiddle, content("counter(page, upper-roman)")),
        );
        let requests = PageRequest::sequence(6);
        let sequential = engine().layout_document(Some(&rules), &requests, &NoContent);
        let parallel = PageBox::builder()
            .parallel(true)
            .build()
            .expect("engine")
            .layout_document(Some(&rules), &requests, &NoContent);
        assert_eq!(sequential.len(), parallel.len());
        for (a, b) in sequential.iter().zip(&parallel) {
            let (a, b) = (a.as_ref().expect("a"), b.as_ref().expect("b"));
            assert_eq!(a.page_index, b.page_index);
            assert_eq!(a.geometry, b.geometry);
            assert_eq!(a.to_page(), b.to_page());
        }
    }

    #[test]
    fn marks_are_drawn_into_media_box() {
        let rules = PageRuleSet::new().with_rule(PageRule::new(
            PageSelector::any(),
            Declarations::parse("size: 200pt 300pt; marks: crop"),
        ));
        let layout = engine()
            .layout_page(Some(&rules), &PageRequest::new(PageContext::new(0, 1)), &NoContent)
            .expect("layout");
        assert_eq!(layout.marks.len(), 8);
        let page = layout.to_page();
        assert_eq!(page.size, Size::new(Pt::from_f32(260.0), Pt::from_f32(360.0)));
        let strokes = page
            .commands
            .iter()
            .filter(|c| matches!(c, Command::Stroke))
            .count();
        assert_eq!(strokes, 8);
    }

    #[test]
    fn degenerate_boxes_are_skipped() {
        let rules = PageRuleSet::new().with_rule(
            PageRule::new(PageSelector::any(), Declarations::parse("margin-left: 0"))
                .margin_box(MarginBoxPosition::LeftMiddle, content(r#""side""#))
                .margin_box(MarginBoxPosition::TopLeftCorner, content(r#""corner""#))
                .margin_box(MarginBoxPosition::TopRightCorner, content(r#""kept""#)),
        );
        let layout = engine()
            .layout_page(Some(&rules), &PageRequest::new(PageContext::new(0, 1)), &NoContent)
            .expect("layout");
        let positions: Vec<_> = layout.margin_boxes.iter().map(|b| b.position).collect();
        assert_eq!(positions, vec![MarginBoxPosition::TopRightCorner]);
        assert!(layout.diagnostics.is_empty());
    }

    #[test]
    fn explicit_width_sizes_start_box() {
        let rules = PageRuleSet::new().with_rule(
            PageRule::new(PageSelector::any(), Declarations::new())
                .margin_box(
                    MarginBoxPosition::TopLeft,
                    content(r#""left""#).with("width", "100pt"),
                )
                .margin_box(MarginBoxPosition::TopRight, content(r#""right""#)),
        );
        let layout = engine()
            .layout_page(Some(&rules), &PageRequest::new(PageContext::new(0, 1)), &NoContent)
            .expect("layout");
        let left = layout.margin_box(MarginBoxPosition::TopLeft).expect("left");
        let right = layout.margin_box(MarginBoxPosition::TopRight).expect("right");
        assert_eq!(left.rect.width, Pt::from_f32(100.0));
        assert_eq!(left.rect.right(), right.rect.x);
        assert_eq!(
            right.rect.right(),
            layout.geometry.trim_box().right() - Pt::from_f32(36.0)
        );
    }

    #[test]
    fn debug_log_records_pages_and_diagnostics() {
        let path = temp_log_path("engine");
        let engine = PageBox::builder()
            .parallel(false)
            .debug_log(&path)
            .build()
            .expect("engine");
        let rules = footer_rules().with_rule(PageRule::new(
            PageSelector::first(),
            Declarations::parse("size: 12pt 4pt 9pt"),
        ));
        let results = engine.layout_document(Some(&rules), &PageRequest::sequence(2), &NoContent);
        assert!(results.iter().all(Result::is_ok));

        let text = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines
                .iter()
                .filter(|l| l.contains("\"type\":\"pagebox.diagnostic\""))
                .count(),
            1
        );
        assert_eq!(
            lines
                .iter()
                .filter(|l| l.contains("\"type\":\"pagebox.page\""))
                .count(),
            2
        );
        let summary = lines.last().expect("summary");
        assert!(summary.contains("\"context\":\"layout_document\""));
        assert!(summary.contains("\"diagnostic.page_size_invalid\":1"));
        assert!(summary.contains("\"margin_box.placed\":2"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn builder_rejects_invalid_defaults() {
        let zero = PageBox::builder()
            .default_page_size(Size::new(Pt::ZERO, Pt::from_f32(100.0)))
            .build();
        assert!(matches!(zero, Err(PageLayoutError::InvalidConfiguration(_))));
        let negative = PageBox::builder()
            .default_margins(Edges::all(Pt::from_f32(-1.0)))
            .build();
        assert!(matches!(negative, Err(PageLayoutError::InvalidConfiguration(_))));
        let gutter = PageBox::builder().mark_gutter(Pt::from_f32(-2.0)).build();
        assert!(matches!(gutter, Err(PageLayoutError::InvalidConfiguration(_))));
        assert!(PageBox::builder().build().is_ok());
    }
}
