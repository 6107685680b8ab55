use crate::frame::{LaidOutBox, LaidOutItem};
use crate::types::{Pt, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    Visible,
    Hidden,
    Clip,
    Scroll,
    Auto,
}

impl Overflow {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "visible" => Some(Overflow::Visible),
            "hidden" => Some(Overflow::Hidden),
            "clip" => Some(Overflow::Clip),
            "scroll" => Some(Overflow::Scroll),
            "auto" => Some(Overflow::Auto),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Overflow::Visible => "visible",
            Overflow::Hidden => "hidden",
            Overflow::Clip => "clip",
            Overflow::Scroll => "scroll",
            Overflow::Auto => "auto",
        }
    }

    /// Paged output cannot scroll, so everything but `visible` clips.
    pub fn clips(self) -> bool {
        !matches!(self, Overflow::Visible)
    }
}

#[derive(Debug, Clone)]
pub struct FittedItem {
    pub item: LaidOutItem,
    // Part of `item.rect` left visible after clipping; equals it when unclipped.
    pub visible: Rect,
}

/// Margin-box content in page coordinates.
#[derive(Debug, Clone)]
pub struct FittedContent {
    pub items: Vec<FittedItem>,
    pub clip: Option<Rect>,
}

impl FittedContent {
    /// Smallest rectangle covering every drawn item.
    pub fn ink_bounds(&self) -> Option<Rect> {
        let mut rects = self.items.iter().map(|fitted| fitted.visible);
        let first = rects.next()?;
        Some(rects.fold(first, |acc, rect| {
            let x = acc.x.min(rect.x);
            let y = acc.y.min(rect.y);
            let right = acc.right().max(rect.right());
            let bottom = acc.bottom().max(rect.bottom());
            Rect::new(x, y, right - x, bottom - y)
        }))
    }
}

/// Scales auto-scale images down into the box, then applies the overflow policy.
///
/// A scaled item keeps the anchor point its alignment gave it: a centered image stays
/// centered, a bottom-aligned one keeps its bottom edge. The height removed from the
/// stack is redistributed the same way across every item.
pub fn fit(laid_out: LaidOutBox, box_rect: Rect, overflow: Overflow) -> FittedContent {
    let bounds = Rect::from_size(box_rect.size());
    let LaidOutBox {
        items: laid_items,
        text_align,
        vertical_align,
        ..
    } = laid_out;

    let scaled: Vec<Option<Rect>> = laid_items
        .iter()
        .map(|item| {
            if item.auto_scale {
                scale_into(item.rect, bounds)
            } else {
                None
            }
        })
        .collect();
    let removed: Pt = laid_items
        .iter()
        .zip(&scaled)
        .filter_map(|(item, scaled)| scaled.map(|rect| item.rect.height - rect.height))
        .sum();
    let group_shift = vertical_align.offset(removed, Pt::ZERO);

    let mut lifted = Pt::ZERO;
    let mut items = Vec::with_capacity(laid_items.len());
    for (mut item, scaled) in laid_items.into_iter().zip(scaled) {
        let y = item.rect.y - lifted + group_shift;
        item.rect = match scaled {
            Some(size) => {
                lifted += item.rect.height - size.height;
                let x = item.rect.x + text_align.offset(item.rect.width, size.width);
                Rect::new(
                    x.max(Pt::ZERO).min(bounds.width - size.width),
                    y.max(Pt::ZERO).min(bounds.height - size.height),
                    size.width,
                    size.height,
                )
            }
            None => Rect::new(item.rect.x, y, item.rect.width, item.rect.height),
        };
        item.rect = item.rect.translate(box_rect.x, box_rect.y);
        items.push(item);
    }

    if !overflow.clips() {
        return FittedContent {
            items: items
                .into_iter()
                .map(|item| FittedItem {
                    visible: item.rect,
                    item,
                })
                .collect(),
            clip: None,
        };
    }

    let items = items
        .into_iter()
        .filter_map(|item| {
            let visible = item.rect.intersection(&box_rect)?;
            Some(FittedItem { item, visible })
        })
        .collect();
    FittedContent {
        items,
        clip: Some(box_rect),
    }
}

/// Uniform downscale of `rect` so it fits `bounds`, with the binding side set exactly
/// to the bounds side. Only the size of the result is meaningful. `None` when it
/// already fits.
fn scale_into(rect: Rect, bounds: Rect) -> Option<Rect> {
    if rect.width <= bounds.width && rect.height <= bounds.height {
        return None;
    }
    if !rect.width.is_positive() || !rect.height.is_positive() {
        return None;
    }
    let sx = bounds.width.to_f32() / rect.width.to_f32();
    let sy = bounds.height.to_f32() / rect.height.to_f32();
    let (width, height) = if sx <= sy {
        (bounds.width, rect.height * sx)
    } else {
        (rect.width * sy, bounds.height)
    };
    Some(Rect::new(Pt::ZERO, Pt::ZERO, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowable::{ImageFlowable, TextAlign, VerticalAlign};
    use crate::types::Size;

    fn pt(v: f32) -> Pt {
        Pt::from_f32(v)
    }

    fn image(rect: Rect, auto_scale: bool) -> LaidOutItem {
        LaidOutItem {
            rect,
            flowable: Box::new(ImageFlowable::new_pt(rect.width, rect.height, "img")),
            auto_scale,
        }
    }

    fn boxed(items: Vec<LaidOutItem>) -> LaidOutBox {
        LaidOutBox {
            size: Size::new(pt(100.0), pt(50.0)),
            items,
            text_align: TextAlign::Left,
            vertical_align: VerticalAlign::Top,
        }
    }

    fn centered(items: Vec<LaidOutItem>) -> LaidOutBox {
        LaidOutBox {
            text_align: TextAlign::Center,
            vertical_align: VerticalAlign::Middle,
            ..boxed(items)
        }
    }

    fn box_rect() -> Rect {
        Rect::new(pt(10.0), pt(20.0), pt(100.0), pt(50.0))
    }

    #[test]
    fn auto_scale_matches_one_side_and_keeps_ratio() {
        let laid_out = boxed(vec![image(Rect::new(Pt::ZERO, Pt::ZERO, pt(400.0), pt(100.0)), true)]);
        let fitted = fit(laid_out, box_rect(), Overflow::Visible);
        let rect = fitted.items[0].item.rect;
        assert_eq!(rect, Rect::new(pt(10.0), pt(20.0), pt(100.0), pt(25.0)));
        assert!(box_rect().contains_rect(&rect));
        assert!(fitted.clip.is_none());
    }

    #[test]
    fn auto_scale_binds_on_height_for_tall_images() {
        let laid_out = boxed(vec![image(Rect::new(Pt::ZERO, Pt::ZERO, pt(50.0), pt(200.0)), true)]);
        let fitted = fit(laid_out, box_rect(), Overflow::Visible);
        let rect = fitted.items[0].item.rect;
        assert_eq!(rect.height, pt(50.0));
        assert_eq!(rect.width, pt(12.5));
    }

    #[test]
    fn small_images_are_never_scaled_up() {
        let natural = Rect::new(pt(5.0), pt(5.0), pt(20.0), pt(10.0));
        let fitted = fit(boxed(vec![image(natural, true)]), box_rect(), Overflow::Hidden);
        assert_eq!(fitted.items[0].item.rect, natural.translate(pt(10.0), pt(20.0)));
    }

    #[test]
    fn later_siblings_move_up_by_removed_height() {
        let laid_out = boxed(vec![
            image(Rect::new(Pt::ZERO, Pt::ZERO, pt(200.0), pt(100.0)), true),
            image(Rect::new(Pt::ZERO, pt(100.0), pt(10.0), pt(10.0)), false),
        ]);
        let fitted = fit(laid_out, box_rect(), Overflow::Visible);
        assert_eq!(fitted.items[0].item.rect.height, pt(50.0));
        assert_eq!(fitted.items[1].item.rect.y, pt(20.0 + 50.0));
    }

    #[test]
    fn centered_tall_image_is_scaled_into_the_box_and_stays_centered() {
        // 20x200 natural, centered by layout at (40, -75) in the 100x50 box.
        let natural = Rect::new(pt(40.0), pt(-75.0), pt(20.0), pt(200.0));
        for overflow in [Overflow::Visible, Overflow::Hidden] {
            let fitted = fit(centered(vec![image(natural, true)]), box_rect(), overflow);
            assert_eq!(fitted.items.len(), 1);
            let rect = fitted.items[0].item.rect;
            assert_eq!(rect, Rect::new(pt(57.5), pt(20.0), pt(5.0), pt(50.0)));
            assert!(box_rect().contains_rect(&rect));
            assert_eq!(fitted.items[0].visible, rect);
        }
    }

    #[test]
    fn middle_aligned_stack_closes_up_around_the_scaled_item() {
        // Caption above a 400x100 image; the group of 110 is centered at y = -30.
        let laid_out = centered(vec![
            image(Rect::new(pt(45.0), pt(-30.0), pt(10.0), pt(10.0)), false),
            image(Rect::new(pt(-150.0), pt(-20.0), pt(400.0), pt(100.0)), true),
        ]);
        let fitted = fit(laid_out, box_rect(), Overflow::Visible);
        let caption = fitted.items[0].item.rect;
        let scaled = fitted.items[1].item.rect;
        // 10 + 25 high once scaled, so the group starts at 7.5.
        assert_eq!(caption, Rect::new(pt(55.0), pt(27.5), pt(10.0), pt(10.0)));
        assert_eq!(scaled, Rect::new(pt(10.0), pt(37.5), pt(100.0), pt(25.0)));
        assert_eq!(caption.bottom(), scaled.y);
    }

    #[test]
    fn bottom_right_alignment_keeps_the_far_edges() {
        let laid_out = LaidOutBox {
            text_align: TextAlign::Right,
            vertical_align: VerticalAlign::Bottom,
            ..boxed(vec![image(Rect::new(pt(-300.0), pt(-50.0), pt(400.0), pt(100.0)), true)])
        };
        let rect = fit(laid_out, box_rect(), Overflow::Hidden).items[0].item.rect;
        assert_eq!(rect, Rect::new(pt(10.0), pt(45.0), pt(100.0), pt(25.0)));
        assert_eq!(rect.right(), box_rect().right());
        assert_eq!(rect.bottom(), box_rect().bottom());
    }

    #[test]
    fn hidden_never_exceeds_box() {
        let laid_out = boxed(vec![
            image(Rect::new(pt(-30.0), pt(-10.0), pt(300.0), pt(90.0)), false),
            image(Rect::new(pt(150.0), pt(0.0), pt(10.0), pt(10.0)), false),
        ]);
        for overflow in [Overflow::Hidden, Overflow::Clip, Overflow::Scroll, Overflow::Auto] {
            let fitted = fit(laid_out.clone(), box_rect(), overflow);
            assert_eq!(fitted.clip, Some(box_rect()));
            assert_eq!(fitted.items.len(), 1);
            assert!(fitted
                .items
                .iter()
                .all(|item| box_rect().contains_rect(&item.visible)));
            assert_eq!(fitted.items[0].visible, box_rect());
            assert_eq!(fitted.ink_bounds(), Some(box_rect()));
        }
    }

    #[test]
    fn visible_keeps_natural_geometry() {
        let natural = Rect::new(pt(-30.0), pt(-10.0), pt(300.0), pt(90.0));
        let fitted = fit(boxed(vec![image(natural, false)]), box_rect(), Overflow::Visible);
        let placed = natural.translate(pt(10.0), pt(20.0));
        assert_eq!(fitted.items[0].visible, placed);
        assert!(!box_rect().contains_rect(&placed));
    }

    #[test]
    fn overflow_keywords() {
        assert_eq!(Overflow::parse(" Hidden "), Some(Overflow::Hidden));
        assert_eq!(Overflow::parse("overlay"), None);
        assert!(!Overflow::Visible.clips());
        assert!(Overflow::Auto.clips());
    }
}
