use crate::types::{Edges, Pt, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LengthSpec {
    Auto,
    Absolute(Pt),
    Percent(f32),
    Em(f32),
    Rem(f32),
}

impl LengthSpec {
    pub fn parse(raw: &str) -> Option<LengthSpec> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.eq_ignore_ascii_case("auto") {
            return Some(LengthSpec::Auto);
        }
        if let Some(value) = raw.strip_suffix('%') {
            let v = value.trim().parse::<f32>().ok()?;
            return v.is_finite().then_some(LengthSpec::Percent(v / 100.0));
        }
        let lower = raw.to_ascii_lowercase();
        // Longer units first so "rem" is not read as "em".
        let units = ["rem", "em", "px", "pt", "pc", "in", "cm", "mm", "q"];
        for unit in &units {
            let Some(value) = lower.strip_suffix(unit) else {
                continue;
            };
            let Ok(v) = value.trim().parse::<f32>() else {
                continue;
            };
            if !v.is_finite() {
                return None;
            }
            return Some(match *unit {
                "px" => LengthSpec::Absolute(px_to_pt(v)),
                "pt" => LengthSpec::Absolute(Pt::from_f32(v)),
                "pc" => LengthSpec::Absolute(Pt::from_f32(v * 12.0)),
                "in" => LengthSpec::Absolute(Pt::from_inches(v)),
                "cm" => LengthSpec::Absolute(Pt::from_mm(v * 10.0)),
                "mm" => LengthSpec::Absolute(Pt::from_mm(v)),
                "q" => LengthSpec::Absolute(Pt::from_mm(v / 4.0)),
                "em" => LengthSpec::Em(v),
                "rem" => LengthSpec::Rem(v),
                _ => return None,
            });
        }
        // Unitless lengths are only valid as zero.
        match raw.parse::<f32>() {
            Ok(v) if v == 0.0 => Some(LengthSpec::Absolute(Pt::ZERO)),
            _ => None,
        }
    }

    /// Resolves against a percentage basis and a font size; `auto` becomes zero.
    pub fn resolve(self, basis: Pt, font_size: Pt) -> Pt {
        match self {
            LengthSpec::Auto => Pt::ZERO,
            LengthSpec::Absolute(value) => value,
            LengthSpec::Percent(value) => basis * value,
            LengthSpec::Em(value) | LengthSpec::Rem(value) => font_size * value,
        }
    }

    pub fn absolute(self) -> Option<Pt> {
        match self {
            LengthSpec::Absolute(value) => Some(value),
            _ => None,
        }
    }
}

pub fn px_to_pt(px: f32) -> Pt {
    Pt::from_f32(px * 0.75)
}

/// Parses an absolute length (no percentages, em units or `auto`).
pub fn parse_absolute_pt(raw: &str) -> Option<Pt> {
    LengthSpec::parse(raw)?.absolute()
}

pub fn parse_length_list(raw: &str) -> Option<Vec<LengthSpec>> {
    raw.split_whitespace().map(LengthSpec::parse).collect()
}

/// Resolves a 1-4 value box shorthand (`margin`, `padding`) against the page size:
/// horizontal sides use the width as percentage basis, vertical sides the height.
pub fn resolve_edge_shorthand(raw: &str, page: Size, font_size: Pt) -> Option<Edges> {
    let specs = parse_length_list(raw)?;
    let specs: [LengthSpec; 4] = match specs.as_slice() {
        [all] => [*all; 4],
        [v, h] => [*v, *h, *v, *h],
        [t, h, b] => [*t, *h, *b, *h],
        [t, r, b, l] => [*t, *r, *b, *l],
        _ => return None,
    };
    Some(Edges::new(
        specs[0].resolve(page.height, font_size),
        specs[1].resolve(page.width, font_size),
        specs[2].resolve(page.height, font_size),
        specs[3].resolve(page.width, font_size),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_absolute_units() {
        assert_eq!(parse_absolute_pt("1in"), Some(Pt::from_f32(72.0)));
        assert_eq!(parse_absolute_pt("2pc"), Some(Pt::from_f32(24.0)));
        assert_eq!(parse_absolute_pt("16px"), Some(Pt::from_f32(12.0)));
        assert_eq!(parse_absolute_pt("25.4MM"), Some(Pt::from_f32(72.0)));
        assert_eq!(parse_absolute_pt("2.54cm"), Some(Pt::from_f32(72.0)));
        assert_eq!(parse_absolute_pt("0"), Some(Pt::ZERO));
    }

    #[test]
    fn rejects_garbage_and_unitless_numbers() {
        assert_eq!(LengthSpec::parse("12"), None);
        assert_eq!(LengthSpec::parse("abc"), None);
        assert_eq!(LengthSpec::parse("12furlongs"), None);
        assert_eq!(LengthSpec::parse(""), None);
    }

    #[test]
    fn rem_is_not_mistaken_for_em() {
        assert_eq!(LengthSpec::parse("1.5rem"), Some(LengthSpec::Rem(1.5)));
        assert_eq!(LengthSpec::parse("2em"), Some(LengthSpec::Em(2.0)));
    }

    #[test]
    fn edge_shorthand_uses_axis_specific_percent_basis() {
        let page = Size::new(Pt::from_f32(200.0), Pt::from_f32(400.0));
        let edges = resolve_edge_shorthand("10% 5%", page, Pt::from_f32(12.0)).expect("edges");
        assert_eq!(edges.top, Pt::from_f32(40.0));
        assert_eq!(edges.right, Pt::from_f32(10.0));
        assert_eq!(edges.bottom, Pt::from_f32(40.0));
        assert_eq!(edges.left, Pt::from_f32(10.0));
        assert!(resolve_edge_shorthand("1pt 2pt 3pt 4pt 5pt", page, Pt::ZERO).is_none());
        assert!(resolve_edge_shorthand("1pt nope", page, Pt::ZERO).is_none());
    }
}
