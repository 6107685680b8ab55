use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::fit::Overflow;
use crate::flowable::{TextAlign, TextStyle, VerticalAlign};
use crate::length::{LengthSpec, px_to_pt};
use crate::margin_box::MarginBoxPosition;
use crate::rules::{PageContext, PropertyMap, split_top_level};
use crate::types::{Color, Pt};
use base64::Engine;
use image::GenericImageView;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A replaced image with its natural size in points (96dpi source pixels).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageNode {
    pub resource_id: String,
    pub width: Pt,
    pub height: Pt,
    pub data: Arc<[u8]>,
    pub auto_scale: bool,
}

impl ImageNode {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(bytes)?;
        let (w, h) = decoded.dimensions();
        Ok(Self {
            resource_id: format!("img-{}", &sha256_hex(bytes)[..16]),
            width: px_to_pt(w as f32),
            height: px_to_pt(h as f32),
            data: Arc::from(bytes),
            auto_scale: false,
        })
    }

    pub fn with_auto_scale(mut self, auto_scale: bool) -> Self {
        self.auto_scale = auto_scale;
        self
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Decodes a `data:` URI payload, base64 or percent-encoded.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.trim().strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if header
        .split(';')
        .any(|part| part.trim().eq_ignore_ascii_case("base64"))
    {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .ok()
    } else {
        decode_percent_encoded_bytes(payload)
    }
}

fn decode_percent_encoded_bytes(input: &str) -> Option<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len() {
                return None;
            }
            let hi = hex_nibble(bytes[i + 1])?;
            let lo = hex_nibble(bytes[i + 2])?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}

fn hex_nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    Text(String),
    Image(ImageNode),
    Group(Vec<ContentNode>),
}

/// Page counter values captured before the page's margin boxes are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub page: i64,
    pub pages: i64,
    pub named: BTreeMap<String, i64>,
}

impl CounterSnapshot {
    pub fn new(page: i64, pages: i64) -> Self {
        Self {
            page,
            pages,
            named: BTreeMap::new(),
        }
    }

    pub fn for_page(page: &PageContext) -> Self {
        Self::new(page.page_number() as i64, page.total as i64)
    }

    pub fn with_counter(mut self, name: impl Into<String>, value: i64) -> Self {
        self.named.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> i64 {
        match name {
            "page" => self.page,
            "pages" => self.pages,
            other => self.named.get(other).copied().unwrap_or(0),
        }
    }
}

/// Document-side lookups the built-in `content` resolution needs.
pub trait ContentProvider: Send + Sync {
    fn running_element(&self, _name: &str, _page: &PageContext) -> Option<Vec<ContentNode>> {
        None
    }

    fn named_string(&self, _name: &str, _page: &PageContext) -> Option<String> {
        None
    }

    /// Resolves a non-`data:` image source.
    fn image(&self, _source: &str) -> Option<ImageNode> {
        None
    }
}

/// Provider with nothing to offer; running elements and named strings resolve empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContent;

impl ContentProvider for NoContent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStyle {
    Decimal,
    DecimalLeadingZero,
    LowerRoman,
    UpperRoman,
    LowerAlpha,
    UpperAlpha,
    None,
}

impl CounterStyle {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "decimal" => Some(CounterStyle::Decimal),
            "decimal-leading-zero" => Some(CounterStyle::DecimalLeadingZero),
            "lower-roman" => Some(CounterStyle::LowerRoman),
            "upper-roman" => Some(CounterStyle::UpperRoman),
            "lower-alpha" | "lower-latin" => Some(CounterStyle::LowerAlpha),
            "upper-alpha" | "upper-latin" => Some(CounterStyle::UpperAlpha),
            "none" => Some(CounterStyle::None),
            _ => None,
        }
    }

    /// Out-of-range values for roman and alphabetic styles fall back to decimal.
    pub fn format(self, value: i64) -> String {
        match self {
            CounterStyle::Decimal => value.to_string(),
            CounterStyle::DecimalLeadingZero => {
                if (0..10).contains(&value) {
                    format!("0{value}")
                } else if (-9..0).contains(&value) {
                    format!("-0{}", -value)
                } else {
                    value.to_string()
                }
            }
            CounterStyle::LowerRoman => roman(value)
                .map(|v| v.to_ascii_lowercase())
                .unwrap_or_else(|| value.to_string()),
            CounterStyle::UpperRoman => roman(value).unwrap_or_else(|| value.to_string()),
            CounterStyle::LowerAlpha => alpha(value, b'a').unwrap_or_else(|| value.to_string()),
            CounterStyle::UpperAlpha => alpha(value, b'A').unwrap_or_else(|| value.to_string()),
            CounterStyle::None => String::new(),
        }
    }
}

fn roman(value: i64) -> Option<String> {
    if !(1..=3999).contains(&value) {
        return None;
    }
    const TABLE: [(i64, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut rest = value;
    let mut out = String::new();
    for (amount, digits) in TABLE {
        while rest >= amount {
            out.push_str(digits);
            rest -= amount;
        }
    }
    Some(out)
}

fn alpha(value: i64, base: u8) -> Option<String> {
    if value < 1 {
        return None;
    }
    let mut rest = value;
    let mut out = Vec::new();
    while rest > 0 {
        rest -= 1;
        out.push(base + (rest % 26) as u8);
        rest /= 26;
    }
    out.reverse();
    String::from_utf8(out).ok()
}

/// One parsed component of a `content` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Text(String),
    Counter {
        name: String,
        style: CounterStyle,
    },
    Counters {
        name: String,
        separator: String,
        style: CounterStyle,
    },
    NamedString(String),
    Element(String),
    Url(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidContent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentValue {
    pub items: Vec<ContentItem>,
}

impl ContentValue {
    /// `Ok(None)` for `none`/`normal`, which leave the box ungenerated.
    pub fn parse(raw: &str) -> Result<Option<ContentValue>, InvalidContent> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("none") || trimmed.eq_ignore_ascii_case("normal") {
            return Ok(None);
        }
        let mut items = Vec::new();
        let mut chars = trimmed.char_indices().peekable();
        while let Some(&(start, ch)) = chars.peek() {
            if ch.is_whitespace() {
                chars.next();
                continue;
            }
            if ch == '"' || ch == '\'' {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    if c == ch {
                        closed = true;
                        break;
                    }
                    if c == '\\' {
                        text.push(c);
                        if let Some((_, escaped)) = chars.next() {
                            text.push(escaped);
                        }
                        continue;
                    }
                    text.push(c);
                }
                if !closed {
                    return Err(InvalidContent);
                }
                items.push(ContentItem::Text(unescape_css(&text)));
                continue;
            }
            let mut end = start;
            while let Some(&(idx, c)) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    end = idx + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let ident = &trimmed[start..end];
            if ident.is_empty() {
                return Err(InvalidContent);
            }
            if chars.peek().map(|&(_, c)| c) == Some('(') {
                chars.next();
                let args_start = end + 1;
                let mut depth = 1usize;
                let mut quote: Option<char> = None;
                let mut args_end = None;
                for (idx, c) in chars.by_ref() {
                    match quote {
                        Some(q) if c == q => quote = None,
                        Some(_) => {}
                        None => match c {
                            '"' | '\'' => quote = Some(c),
                            '(' => depth += 1,
                            ')' => {
                                depth -= 1;
                                if depth == 0 {
                                    args_end = Some(idx);
                                    break;
                                }
                            }
                            _ => {}
                        },
                    }
                }
                let args_end = args_end.ok_or(InvalidContent)?;
                items.push(parse_function(ident, &trimmed[args_start..args_end])?);
            } else {
                match ident.to_ascii_lowercase().as_str() {
                    "open-quote" => items.push(ContentItem::Text("\u{201c}".to_string())),
                    "close-quote" => items.push(ContentItem::Text("\u{201d}".to_string())),
                    "no-open-quote" | "no-close-quote" => {}
                    _ => return Err(InvalidContent),
                }
            }
        }
        if items.is_empty() {
            return Err(InvalidContent);
        }
        Ok(Some(ContentValue { items }))
    }

    /// Built-in resolution against the page's counters and the document provider.
    /// Adjacent inline pieces are merged into one text node.
    pub fn resolve(
        &self,
        cx: &ContentContext<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<ContentNode> {
        let mut nodes = Vec::new();
        let mut text = String::new();
        let mut has_text = false;
        for item in &self.items {
            match item {
                ContentItem::Text(value) => {
                    text.push_str(value);
                    has_text = true;
                }
                ContentItem::Counter { name, style } | ContentItem::Counters { name, style, .. } => {
                    text.push_str(&style.format(cx.counters.get(name)));
                    has_text = true;
                }
                ContentItem::NamedString(name) => {
                    if let Some(value) = cx.provider.named_string(name, cx.page) {
                        text.push_str(&value);
                    }
                    has_text = true;
                }
                ContentItem::Element(name) => {
                    flush_text(&mut nodes, &mut text, &mut has_text);
                    if let Some(children) = cx.provider.running_element(name, cx.page) {
                        nodes.push(ContentNode::Group(children));
                    }
                }
                ContentItem::Url(source) => {
                    flush_text(&mut nodes, &mut text, &mut has_text);
                    if let Some(image) = resolve_image(source, cx, diagnostics) {
                        nodes.push(ContentNode::Image(image));
                    }
                }
            }
        }
        flush_text(&mut nodes, &mut text, &mut has_text);
        nodes
    }
}

fn flush_text(nodes: &mut Vec<ContentNode>, text: &mut String, has_text: &mut bool) {
    if *has_text {
        nodes.push(ContentNode::Text(std::mem::take(text)));
        *has_text = false;
    }
}

fn resolve_image(
    source: &str,
    cx: &ContentContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Option<ImageNode> {
    if !source.trim_start().starts_with("data:") {
        return cx.provider.image(source);
    }
    let decoded = decode_data_uri(source).and_then(|bytes| ImageNode::from_bytes(&bytes).ok());
    if decoded.is_none() {
        diagnostics.report(
            DiagnosticKind::ContentPropertyInvalid,
            Some(cx.position.name()),
            source,
        );
    }
    decoded
}

fn parse_function(name: &str, args: &str) -> Result<ContentItem, InvalidContent> {
    // Unquoted data URIs carry commas, so `url()` takes its argument whole.
    if name.eq_ignore_ascii_case("url") {
        let raw = args.trim();
        let source = unquote(raw).unwrap_or_else(|| raw.to_string());
        if source.trim().is_empty() {
            return Err(InvalidContent);
        }
        return Ok(ContentItem::Url(source));
    }
    let args: Vec<&str> = split_top_level(args, ',')
        .into_iter()
        .map(str::trim)
        .collect();
    let ident = |raw: &str| -> Result<String, InvalidContent> {
        let ok = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if ok {
            Ok(raw.to_string())
        } else {
            Err(InvalidContent)
        }
    };
    let style = |raw: Option<&&str>| -> Result<CounterStyle, InvalidContent> {
        match raw {
            None => Ok(CounterStyle::Decimal),
            Some(raw) => CounterStyle::parse(raw).ok_or(InvalidContent),
        }
    };
    match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("counter", [counter, rest @ ..]) if rest.len() <= 1 => Ok(ContentItem::Counter {
            name: ident(*counter)?,
            style: style(rest.first())?,
        }),
        ("counters", [counter, separator, rest @ ..]) if rest.len() <= 1 => {
            Ok(ContentItem::Counters {
                name: ident(*counter)?,
                separator: unquote(separator).ok_or(InvalidContent)?,
                style: style(rest.first())?,
            })
        }
        // The optional second argument selects among several assignments on the page;
        // only one value per page is tracked.
        ("string", [string, rest @ ..]) if rest.len() <= 1 => {
            Ok(ContentItem::NamedString(ident(*string)?))
        }
        ("element", [element, rest @ ..]) if rest.len() <= 1 => {
            Ok(ContentItem::Element(ident(*element)?))
        }
        _ => Err(InvalidContent),
    }
}

fn unquote(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let quote = raw.chars().next()?;
    if (quote != '"' && quote != '\'') || raw.len() < 2 || !raw.ends_with(quote) {
        return None;
    }
    Some(unescape_css(&raw[1..raw.len() - 1]))
}

// Expands `\A` style hex escapes and drops the backslash before other characters.
fn unescape_css(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let mut hex = String::new();
        while hex.len() < 6 {
            match chars.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(*c);
                    chars.next();
                }
                _ => break,
            }
        }
        if hex.is_empty() {
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        if chars.peek() == Some(&' ') {
            chars.next();
        }
        let decoded = u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or('\u{fffd}');
        out.push(decoded);
    }
    out
}

/// Everything content resolution may consult for one margin box.
pub struct ContentContext<'a> {
    pub position: MarginBoxPosition,
    pub page: &'a PageContext,
    pub counters: &'a CounterSnapshot,
    pub provider: &'a dyn ContentProvider,
}

/// A margin box's resolved children plus the style that governs their layout.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginBoxContent {
    pub nodes: Vec<ContentNode>,
    // `None` when no declaration set it; the engine fallback applies.
    pub overflow: Option<Overflow>,
    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,
    pub text_style: TextStyle,
}

impl MarginBoxContent {
    pub fn new(position: MarginBoxPosition, nodes: Vec<ContentNode>) -> Self {
        let text_align = position.default_text_align();
        Self {
            nodes,
            overflow: None,
            text_align,
            vertical_align: position.default_vertical_align(),
            text_style: TextStyle {
                align: text_align,
                ..TextStyle::default()
            },
        }
    }

    /// Applies the box's styling properties. Unknown or malformed values keep defaults.
    pub fn from_properties(
        position: MarginBoxPosition,
        properties: &PropertyMap,
        nodes: Vec<ContentNode>,
    ) -> Self {
        let mut content = Self::new(position, nodes);
        let get = |name: &str| properties.get(name).map(String::as_str);
        content.overflow = get("overflow").and_then(Overflow::parse);
        if let Some(align) = get("text-align").and_then(TextAlign::parse) {
            content.text_align = align;
            content.text_style.align = align;
        }
        if let Some(align) = get("vertical-align").and_then(VerticalAlign::parse) {
            content.vertical_align = align;
        }
        let style = &mut content.text_style;
        let inherited = style.font_size;
        if let Some(size) = get("font-size").and_then(|raw| parse_font_size(raw, inherited)) {
            style.font_size = size;
            style.line_height = size * 1.2;
        }
        let font_size = style.font_size;
        if let Some(height) = get("line-height").and_then(|raw| parse_line_height(raw, font_size)) {
            style.line_height = height;
        }
        if let Some(color) = get("color").and_then(parse_color) {
            style.color = color;
        }
        if let Some(family) = get("font-family").and_then(first_family) {
            style.font_name = family;
        }
        content
    }
}

fn parse_font_size(raw: &str, inherited: Pt) -> Option<Pt> {
    let size = match LengthSpec::parse(raw)? {
        LengthSpec::Auto => return None,
        spec => spec.resolve(inherited, inherited),
    };
    size.is_positive().then_some(size)
}

fn parse_line_height(raw: &str, font_size: Pt) -> Option<Pt> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("normal") {
        return Some(font_size * 1.2);
    }
    if let Ok(factor) = raw.parse::<f32>() {
        return (factor.is_finite() && factor >= 0.0).then(|| font_size * factor);
    }
    match LengthSpec::parse(raw)? {
        LengthSpec::Auto => None,
        spec => Some(spec.resolve(font_size, font_size).clamp_non_negative()),
    }
}

fn first_family(raw: &str) -> Option<String> {
    let first = split_top_level(raw, ',').into_iter().next()?.trim();
    let family = unquote(first).unwrap_or_else(|| first.to_string());
    (!family.is_empty()).then_some(family)
}

/// Any CSS color csscolorparser knows (hex, named, `rgb()`, `hsl()` and friends).
/// Alpha is dropped. Non-ASCII input is rejected before it reaches the parser.
fn parse_color(raw: &str) -> Option<Color> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.is_ascii() {
        return None;
    }
    let parsed: csscolorparser::Color = raw.parse().ok()?;
    let [r, g, b, _] = parsed.to_rgba8();
    Some(Color::rgb(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
    ))
}
