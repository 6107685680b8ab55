use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::length::{LengthSpec, parse_length_list, resolve_edge_shorthand};
use crate::marks::MarkSet;
use crate::rules::EffectivePageDeclaration;
use crate::types::{Edges, Pt, Rect, Size};

/// Engine-level defaults used when a page's declarations leave something unset.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryConfig {
    pub default_size: Size,
    pub default_margins: Edges,
    // Bleed used for `bleed: auto` when marks are requested.
    pub default_bleed: Pt,
    pub mark_gutter: Pt,
    pub font_size: Pt,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            default_size: Size::a4(),
            default_margins: Edges::all(Pt::from_f32(36.0)),
            default_bleed: Pt::from_f32(6.0),
            mark_gutter: Pt::from_f32(24.0),
            font_size: Pt::from_f32(12.0),
        }
    }
}

/// Physical layout of one page. All rectangles are in top-left-origin media-box space.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub trim_size: Size,
    pub bleed: Edges,
    pub marks: MarkSet,
    pub gutter: Pt,
    pub margins: Edges,
    pub padding: Edges,
}

impl PageGeometry {
    pub fn media_box(&self) -> Rect {
        self.bleed_box().outset(Edges::all(self.gutter))
    }

    pub fn bleed_box(&self) -> Rect {
        self.trim_box().outset(self.bleed)
    }

    pub fn trim_box(&self) -> Rect {
        Rect::new(
            self.gutter + self.bleed.left,
            self.gutter + self.bleed.top,
            self.trim_size.width,
            self.trim_size.height,
        )
    }

    /// The page area minus padding. Collapses to zero size instead of going negative.
    pub fn content_box(&self) -> Rect {
        self.trim_box().inset(self.margins).inset(self.padding)
    }
}

pub fn named_page_size(name: &str) -> Option<Size> {
    match name.to_ascii_lowercase().as_str() {
        "a5" => Some(Size::from_mm(148.0, 210.0)),
        "a4" => Some(Size::from_mm(210.0, 297.0)),
        "a3" => Some(Size::from_mm(297.0, 420.0)),
        "b5" => Some(Size::from_mm(176.0, 250.0)),
        "b4" => Some(Size::from_mm(250.0, 353.0)),
        "jis-b5" => Some(Size::from_mm(182.0, 257.0)),
        "jis-b4" => Some(Size::from_mm(257.0, 364.0)),
        "letter" => Some(Size::from_inches(8.5, 11.0)),
        "legal" => Some(Size::from_inches(8.5, 14.0)),
        "ledger" | "tabloid" => Some(Size::from_inches(11.0, 17.0)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// A well-formed `size` value. `size: None` means the default size (`auto` or a bare
/// orientation keyword).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSizeValue {
    pub size: Option<Size>,
    pub orientation: Option<Orientation>,
}

impl PageSizeValue {
    pub fn apply(self, default_size: Size) -> Size {
        let size = self.size.unwrap_or(default_size);
        match self.orientation {
            Some(Orientation::Portrait) => size.portrait(),
            Some(Orientation::Landscape) => size.landscape(),
            None => size,
        }
    }
}

/// Parses a `size` value; `None` when it is malformed.
pub fn parse_page_size(raw: &str, font_size: Pt) -> Option<PageSizeValue> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    match tokens.as_slice() {
        [] => return None,
        [only] if only.eq_ignore_ascii_case("auto") => {
            return Some(PageSizeValue {
                size: None,
                orientation: None,
            });
        }
        _ => {}
    }
    let mut keyword: Option<Size> = None;
    let mut orientation: Option<Orientation> = None;
    let mut lengths: Vec<Pt> = Vec::new();
    for token in tokens {
        let lower = token.to_ascii_lowercase();
        let parsed_orientation = match lower.as_str() {
            "portrait" => Some(Orientation::Portrait),
            "landscape" => Some(Orientation::Landscape),
            _ => None,
        };
        if let Some(value) = parsed_orientation {
            if orientation.replace(value).is_some() {
                return None;
            }
            continue;
        }
        if let Some(size) = named_page_size(&lower) {
            if keyword.replace(size).is_some() {
                return None;
            }
            continue;
        }
        let length = match LengthSpec::parse(token)? {
            LengthSpec::Absolute(value) => value,
            spec @ (LengthSpec::Em(_) | LengthSpec::Rem(_)) => spec.resolve(Pt::ZERO, font_size),
            LengthSpec::Auto | LengthSpec::Percent(_) => return None,
        };
        if !length.is_positive() {
            return None;
        }
        lengths.push(length);
    }
    let size = match (keyword, lengths.as_slice()) {
        (Some(size), []) => Some(size),
        (Some(_), _) => return None,
        (None, []) => None,
        (None, [side]) => Some(Size::new(*side, *side)),
        (None, [width, height]) => Some(Size::new(*width, *height)),
        (None, _) => return None,
    };
    Some(PageSizeValue { size, orientation })
}

/// Resolves a page's geometry. Malformed values fall back to configured defaults and
/// are reported to `diagnostics`; this never fails.
pub fn compute_geometry(
    decl: &EffectivePageDeclaration,
    config: &GeometryConfig,
    diagnostics: &mut Diagnostics,
) -> PageGeometry {
    let trim_size = match decl.get("size") {
        None => config.default_size,
        Some(raw) => match parse_page_size(raw, config.font_size) {
            Some(value) => value.apply(config.default_size),
            None => {
                diagnostics.report(DiagnosticKind::PageSizeInvalid, Some("size"), raw);
                config.default_size
            }
        },
    };

    let marks = decl.get("marks").map(MarkSet::parse).unwrap_or_default();
    let auto_bleed = if marks.is_empty() {
        Pt::ZERO
    } else {
        config.default_bleed
    };
    let bleed = decl
        .get("bleed")
        .and_then(|raw| parse_bleed(raw, config.font_size))
        .unwrap_or(Edges::all(auto_bleed));
    let gutter = if marks.is_empty() {
        Pt::ZERO
    } else {
        config.mark_gutter
    };

    let margins = resolve_box_edges(
        decl,
        "margin",
        config.default_margins,
        trim_size,
        config.font_size,
        diagnostics,
    );
    let padding = resolve_box_edges(
        decl,
        "padding",
        Edges::ZERO,
        trim_size,
        config.font_size,
        diagnostics,
    );

    let geometry = PageGeometry {
        trim_size,
        bleed,
        marks,
        gutter,
        margins,
        padding,
    };
    let insets = margins + padding;
    if insets.horizontal() > trim_size.width || insets.vertical() > trim_size.height {
        let content = geometry.content_box();
        diagnostics.report(
            DiagnosticKind::GeometryClamped,
            Some("content-box"),
            &format!(
                "{}x{}",
                content.width.to_f32(),
                content.height.to_f32()
            ),
        );
    }
    geometry
}

/// `auto` and malformed or negative values yield `None` (automatic bleed).
fn parse_bleed(raw: &str, font_size: Pt) -> Option<Edges> {
    let specs = parse_length_list(raw)?;
    let values = specs
        .into_iter()
        .map(|spec| match spec {
            LengthSpec::Absolute(value) => Some(value),
            LengthSpec::Em(_) | LengthSpec::Rem(_) => Some(spec.resolve(Pt::ZERO, font_size)),
            LengthSpec::Auto | LengthSpec::Percent(_) => None,
        })
        .collect::<Option<Vec<Pt>>>()?;
    let edges = Edges::from_shorthand(&values)?;
    (!edges.any_negative()).then_some(edges)
}

// Shorthand first, then longhands. The cascade already dropped longhands that an
// overriding shorthand replaced.
fn resolve_box_edges(
    decl: &EffectivePageDeclaration,
    property: &str,
    defaults: Edges,
    page: Size,
    font_size: Pt,
    diagnostics: &mut Diagnostics,
) -> Edges {
    let mut edges = decl
        .get(property)
        .and_then(|raw| resolve_edge_shorthand(raw, page, font_size))
        .unwrap_or(defaults);
    for side in ["top", "right", "bottom", "left"] {
        let name = format!("{property}-{side}");
        let Some(spec) = decl.get(&name).and_then(LengthSpec::parse) else {
            continue;
        };
        let basis = if side == "top" || side == "bottom" {
            page.height
        } else {
            page.width
        };
        let value = spec.resolve(basis, font_size);
        match side {
            "top" => edges.top = value,
            "right" => edges.right = value,
            "bottom" => edges.bottom = value,
            _ => edges.left = value,
        }
    }
    if edges.any_negative() {
        diagnostics.report(
            DiagnosticKind::GeometryClamped,
            Some(property),
            decl.get(property).unwrap_or("negative edge"),
        );
        edges = Edges::new(
            edges.top.clamp_non_negative(),
            edges.right.clamp_non_negative(),
            edges.bottom.clamp_non_negative(),
            edges.left.clamp_non_negative(),
        );
    }
    edges
}
