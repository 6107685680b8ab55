use crate::margin_box::MarginBoxPosition;
use crate::rules::{
    DeclarationBlock, Declarations, PagePseudoClass, PageRule, PageRuleSet, PageSelector,
};
use lightningcss::declaration::DeclarationBlock as CssDeclarationBlock;
use lightningcss::media_query::{MediaList, MediaType, Qualifier};
use lightningcss::properties::Property;
use lightningcss::rules::page::{
    PageMarginBox, PagePseudoClass as CssPagePseudoClass, PageRule as CssPageRule,
    PageSelector as CssPageSelector,
};
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

/// Collects `@page` rules (with their margin at-rules) from a stylesheet, including
/// those nested in `@media` blocks that apply to print. Other rules are ignored and an
/// unparseable stylesheet yields an empty set.
pub fn page_rules_from_css(css: &str) -> PageRuleSet {
    let mut rules = PageRuleSet::new();
    if css.trim().is_empty() {
        return rules;
    }
    let options = ParserOptions {
        error_recovery: true,
        ..ParserOptions::default()
    };
    let Ok(sheet) = StyleSheet::parse(css, options) else {
        return rules;
    };
    collect_page_rules(&sheet.rules, &mut rules);
    rules
}

fn collect_page_rules(list: &CssRuleList, out: &mut PageRuleSet) {
    for rule in &list.0 {
        match rule {
            CssRule::Page(page_rule) => out.push(convert_page_rule(page_rule)),
            CssRule::Media(media) => {
                if media_list_targets_print(&media.query) {
                    collect_page_rules(&media.rules, out);
                }
            }
            _ => {}
        }
    }
}

fn media_list_targets_print(list: &MediaList) -> bool {
    if list.media_queries.is_empty() {
        return true;
    }
    list.media_queries.iter().any(|query| {
        let typed = matches!(query.media_type, MediaType::All | MediaType::Print);
        if matches!(query.qualifier, Some(Qualifier::Not)) {
            !typed
        } else {
            typed
        }
    })
}

fn convert_page_rule(rule: &CssPageRule) -> PageRule {
    let selectors = rule.selectors.iter().map(convert_selector).collect();
    let margin_rules = rule
        .rules
        .iter()
        .map(|margin_rule| {
            (
                margin_position(&margin_rule.margin_box),
                convert_declarations(&margin_rule.declarations),
            )
        })
        .collect();
    PageRule::with_selectors(
        selectors,
        DeclarationBlock {
            declarations: convert_declarations(&rule.declarations),
            margin_rules,
        },
    )
}

fn convert_selector(selector: &CssPageSelector) -> PageSelector {
    PageSelector {
        name: selector.name.as_ref().map(|name| name.as_ref().to_string()),
        pseudo_classes: selector
            .pseudo_classes
            .iter()
            .map(|pseudo| match pseudo {
                CssPagePseudoClass::First => PagePseudoClass::First,
                CssPagePseudoClass::Left => PagePseudoClass::Left,
                CssPagePseudoClass::Right => PagePseudoClass::Right,
                CssPagePseudoClass::Blank => PagePseudoClass::Blank,
                CssPagePseudoClass::Last => PagePseudoClass::Last,
            })
            .collect(),
    }
}

fn margin_position(margin_box: &PageMarginBox) -> MarginBoxPosition {
    match margin_box {
        PageMarginBox::TopLeftCorner => MarginBoxPosition::TopLeftCorner,
        PageMarginBox::TopLeft => MarginBoxPosition::TopLeft,
        PageMarginBox::TopCenter => MarginBoxPosition::TopCenter,
        PageMarginBox::TopRight => MarginBoxPosition::TopRight,
        PageMarginBox::TopRightCorner => MarginBoxPosition::TopRightCorner,
        PageMarginBox::RightTop => MarginBoxPosition::RightTop,
        PageMarginBox::RightMiddle => MarginBoxPosition::RightMiddle,
        PageMarginBox::RightBottom => MarginBoxPosition::RightBottom,
        PageMarginBox::BottomRightCorner => MarginBoxPosition::BottomRightCorner,
        PageMarginBox::BottomRight => MarginBoxPosition::BottomRight,
        PageMarginBox::BottomCenter => MarginBoxPosition::BottomCenter,
        PageMarginBox::BottomLeft => MarginBoxPosition::BottomLeft,
        PageMarginBox::BottomLeftCorner => MarginBoxPosition::BottomLeftCorner,
        PageMarginBox::LeftBottom => MarginBoxPosition::LeftBottom,
        PageMarginBox::LeftMiddle => MarginBoxPosition::LeftMiddle,
        PageMarginBox::LeftTop => MarginBoxPosition::LeftTop,
    }
}

fn convert_declarations(block: &CssDeclarationBlock) -> Declarations {
    let mut out = Declarations::new();
    for property in &block.declarations {
        push_property(&mut out, property, false);
    }
    for property in &block.important_declarations {
        push_property(&mut out, property, true);
    }
    out
}

// Values are carried as serialized CSS text; typed interpretation happens later.
fn push_property(out: &mut Declarations, property: &Property, important: bool) {
    let id = property.property_id();
    let Ok(value) = property.value_to_css_string(PrinterOptions::default()) else {
        return;
    };
    out.push(id.name(), &value, important);
}
