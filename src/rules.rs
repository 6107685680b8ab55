use crate::margin_box::MarginBoxPosition;
use std::collections::BTreeMap;

/// Lower-cased property name → raw value text.
pub type PropertyMap = BTreeMap<String, String>;

// Setting a shorthand discards longhands collected earlier in the cascade.
const SHORTHANDS: [(&str, [&str; 4]); 2] = [
    (
        "margin",
        ["margin-top", "margin-right", "margin-bottom", "margin-left"],
    ),
    (
        "padding",
        ["padding-top", "padding-right", "padding-bottom", "padding-left"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagePseudoClass {
    First,
    Left,
    Right,
    // Recognized but never matched.
    Blank,
    Last,
}

impl PagePseudoClass {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "first" => Some(PagePseudoClass::First),
            "left" => Some(PagePseudoClass::Left),
            "right" => Some(PagePseudoClass::Right),
            "blank" => Some(PagePseudoClass::Blank),
            "last" => Some(PagePseudoClass::Last),
            _ => None,
        }
    }
}

/// Where a page sits in the spread, derived by the pagination driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagePosition {
    FirstAndOnly,
    Left,
    Right,
}

impl PagePosition {
    /// A lone page is first-and-only; otherwise the first page is a right page and
    /// sides alternate.
    pub fn for_page(index: usize, total: usize) -> Self {
        if total <= 1 {
            PagePosition::FirstAndOnly
        } else if index % 2 == 0 {
            PagePosition::Right
        } else {
            PagePosition::Left
        }
    }

    fn is_right(self) -> bool {
        matches!(self, PagePosition::Right | PagePosition::FirstAndOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub index: usize,
    pub total: usize,
    pub position: PagePosition,
    pub name: Option<String>,
}

impl PageContext {
    pub fn new(index: usize, total: usize) -> Self {
        Self {
            index,
            total,
            position: PagePosition::for_page(index, total),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, position: PagePosition) -> Self {
        self.position = position;
        self
    }

    pub fn page_number(&self) -> usize {
        self.index + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageSelector {
    pub name: Option<String>,
    pub pseudo_classes: Vec<PagePseudoClass>,
}

impl PageSelector {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            pseudo_classes: Vec::new(),
        }
    }

    pub fn first() -> Self {
        Self::any().with_pseudo(PagePseudoClass::First)
    }

    pub fn left() -> Self {
        Self::any().with_pseudo(PagePseudoClass::Left)
    }

    pub fn right() -> Self {
        Self::any().with_pseudo(PagePseudoClass::Right)
    }

    pub fn with_pseudo(mut self, pseudo: PagePseudoClass) -> Self {
        self.pseudo_classes.push(pseudo);
        self
    }

    /// Parses selector text such as `chapter:first`, `:left` or the empty string.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let mut parts = raw.split(':');
        let name = parts.next().unwrap_or("").trim();
        let mut selector = if name.is_empty() {
            Self::any()
        } else {
            if name.contains(char::is_whitespace) {
                return None;
            }
            Self::named(name)
        };
        for pseudo in parts {
            selector = selector.with_pseudo(PagePseudoClass::parse(pseudo)?);
        }
        Some(selector)
    }

    /// Cascade tier: default blocks, then named, then pseudo-class, then compound.
    fn tier(&self) -> u8 {
        let named = u8::from(self.name.is_some());
        let pseudo = if self.pseudo_classes.is_empty() { 0 } else { 2 };
        named + pseudo
    }

    pub fn matches(&self, page: &PageContext) -> bool {
        if let Some(name) = &self.name {
            if page.name.as_deref() != Some(name.as_str()) {
                return false;
            }
        }
        self.pseudo_classes.iter().all(|pseudo| match pseudo {
            PagePseudoClass::First => page.index == 0,
            PagePseudoClass::Left => page.position == PagePosition::Left,
            PagePseudoClass::Right => page.position.is_right(),
            PagePseudoClass::Blank | PagePseudoClass::Last => false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Declarations {
    normal: Vec<(String, String)>,
    important: Vec<(String, String)>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a declaration list (`size: a4; margin: 1in !important`). Quoted strings
    /// and parenthesized arguments may contain `;`.
    pub fn parse(text: &str) -> Self {
        let mut out = Self::new();
        for chunk in split_top_level(text, ';') {
            let Some((name, value)) = chunk.split_once(':') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }
            let (value, important) = strip_important(value);
            out.push(name, value, important);
        }
        out
    }

    pub fn push(&mut self, name: &str, value: &str, important: bool) {
        let entry = (name.trim().to_ascii_lowercase(), value.trim().to_string());
        if important {
            self.important.push(entry);
        } else {
            self.normal.push(entry);
        }
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.push(name, value, false);
        self
    }

    pub fn normal(&self) -> &[(String, String)] {
        &self.normal
    }

    pub fn important(&self) -> &[(String, String)] {
        &self.important
    }

    pub fn is_empty(&self) -> bool {
        self.normal.is_empty() && self.important.is_empty()
    }

    fn apply_to(&self, map: &mut PropertyMap, important: bool) {
        let list = if important {
            &self.important
        } else {
            &self.normal
        };
        for (name, value) in list {
            if let Some((_, longhands)) = SHORTHANDS.iter().find(|(short, _)| short == name) {
                for longhand in longhands {
                    map.remove(*longhand);
                }
            }
            map.insert(name.clone(), value.clone());
        }
    }
}

fn strip_important(value: &str) -> (&str, bool) {
    if let Some(idx) = value.rfind('!') {
        let (head, tail) = value.split_at(idx);
        if tail[1..].trim().eq_ignore_ascii_case("important") {
            return (head.trim_end(), true);
        }
    }
    (value, false)
}

/// Splits on `delim` outside quotes and parentheses.
pub(crate) fn split_top_level(text: &str, delim: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0usize;
    for (idx, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                c if c == delim && depth == 0 => {
                    parts.push(&text[start..idx]);
                    start = idx + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&text[start..]);
    parts
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeclarationBlock {
    pub declarations: Declarations,
    pub margin_rules: Vec<(MarginBoxPosition, Declarations)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRule {
    // Empty means `@page` with no selector.
    pub selectors: Vec<PageSelector>,
    pub block: DeclarationBlock,
}

impl PageRule {
    pub fn new(selector: PageSelector, declarations: Declarations) -> Self {
        Self {
            selectors: vec![selector],
            block: DeclarationBlock {
                declarations,
                margin_rules: Vec::new(),
            },
        }
    }

    pub fn with_selectors(selectors: Vec<PageSelector>, block: DeclarationBlock) -> Self {
        Self { selectors, block }
    }

    pub fn margin_box(mut self, position: MarginBoxPosition, declarations: Declarations) -> Self {
        self.block.margin_rules.push((position, declarations));
        self
    }

    fn match_tier(&self, page: &PageContext) -> Option<u8> {
        if self.selectors.is_empty() {
            return Some(0);
        }
        self.selectors
            .iter()
            .filter(|selector| selector.matches(page))
            .map(PageSelector::tier)
            .max()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRuleSet {
    rules: Vec<PageRule>,
}

impl PageRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: PageRule) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: PageRule) -> Self {
        self.push(rule);
        self
    }

    pub fn rules(&self) -> &[PageRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn extend(&mut self, other: PageRuleSet) {
        self.rules.extend(other.rules);
    }
}

/// The flattened declarations for one page and each of its margin boxes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectivePageDeclaration {
    pub properties: PropertyMap,
    pub margin_boxes: BTreeMap<MarginBoxPosition, PropertyMap>,
}

impl EffectivePageDeclaration {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn margin_box(&self, position: MarginBoxPosition) -> Option<&PropertyMap> {
        self.margin_boxes.get(&position)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.margin_boxes.is_empty()
    }
}

/// Folds every rule matching `page` in cascade order: tier first, then source order,
/// with `!important` declarations applied after all normal ones.
pub fn resolve(rules: &PageRuleSet, page: &PageContext) -> EffectivePageDeclaration {
    let mut matched: Vec<(u8, usize, &PageRule)> = rules
        .rules
        .iter()
        .enumerate()
        .filter_map(|(order, rule)| rule.match_tier(page).map(|tier| (tier, order, rule)))
        .collect();
    matched.sort_by_key(|(tier, order, _)| (*tier, *order));

    let mut effective = EffectivePageDeclaration::default();
    for important in [false, true] {
        for (_, _, rule) in &matched {
            rule.block
                .declarations
                .apply_to(&mut effective.properties, important);
            for (position, declarations) in &rule.block.margin_rules {
                let map = effective.margin_boxes.entry(*position).or_default();
                declarations.apply_to(map, important);
            }
        }
    }
    effective
}
