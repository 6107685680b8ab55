use fixed::types::I32F32;

/// A length in PDF points, stored as fixed point so geometry stays deterministic
/// across platforms and thread schedules.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Pt::from_milli_i64(milli)
    }

    pub fn from_mm(value: f32) -> Pt {
        Pt::from_f32(value * 72.0 / 25.4)
    }

    pub fn from_inches(value: f32) -> Pt {
        Pt::from_f32(value * 72.0)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn from_milli_i64(milli: i64) -> Pt {
        Pt::from_milli_i128(milli as i128)
    }

    fn from_milli_i128(milli: i128) -> Pt {
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Pt(I32F32::from_bits(bits))
    }

    pub fn max(self, other: Pt) -> Pt {
        if self >= other { self } else { other }
    }

    pub fn min(self, other: Pt) -> Pt {
        if self <= other { self } else { other }
    }

    pub fn abs(self) -> Pt {
        if self.to_milli_i64() < 0 { -self } else { self }
    }

    pub fn clamp_non_negative(self) -> Pt {
        self.max(Pt::ZERO)
    }

    pub fn is_positive(self) -> bool {
        self > Pt::ZERO
    }

    pub fn half(self) -> Pt {
        self / 2
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::from_milli_i128(self.to_milli_i64() as i128 + rhs.to_milli_i64() as i128)
    }
}

impl std::ops::AddAssign for Pt {
    fn add_assign(&mut self, rhs: Pt) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt::from_milli_i128(self.to_milli_i64() as i128 - rhs.to_milli_i64() as i128)
    }
}

impl std::ops::SubAssign for Pt {
    fn sub_assign(&mut self, rhs: Pt) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<i32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: i32) -> Pt {
        let milli = self.to_milli_i64() as i128;
        Pt::from_milli_i128(milli.saturating_mul(rhs as i128))
    }
}

impl std::ops::Div<i32> for Pt {
    type Output = Pt;
    fn div(self, rhs: i32) -> Pt {
        if rhs == 0 {
            return Pt::ZERO;
        }
        let milli = self.to_milli_i64() as i128;
        Pt::from_milli_i128(div_round_i128(milli, rhs as i128))
    }
}

impl std::ops::Mul<f32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: f32) -> Pt {
        if !rhs.is_finite() {
            return Pt::ZERO;
        }
        Pt::from_f32(self.to_f32() * rhs)
    }
}

impl std::ops::Neg for Pt {
    type Output = Pt;
    fn neg(self) -> Pt {
        Pt::from_milli_i128(-(self.to_milli_i64() as i128))
    }
}

impl std::iter::Sum for Pt {
    fn sum<I: Iterator<Item = Pt>>(iter: I) -> Pt {
        iter.fold(Pt::ZERO, |acc, v| acc + v)
    }
}

fn div_round_i128(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let den_abs = den.abs();
    if num >= 0 {
        (num + (den_abs / 2)) / den
    } else {
        -(((-num) + (den_abs / 2)) / den)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

impl Size {
    pub const ZERO: Size = Size {
        width: Pt::ZERO,
        height: Pt::ZERO,
    };

    pub fn new(width: Pt, height: Pt) -> Self {
        Self { width, height }
    }

    pub fn a4() -> Self {
        Self::from_mm(210.0, 297.0)
    }

    pub fn letter() -> Self {
        // 8.5in x 11in at 72pt/in.
        Self::from_inches(8.5, 11.0)
    }

    pub fn from_inches(width_in: f32, height_in: f32) -> Self {
        Self {
            width: Pt::from_inches(width_in),
            height: Pt::from_inches(height_in),
        }
    }

    pub fn from_mm(width_mm: f32, height_mm: f32) -> Self {
        Self {
            width: Pt::from_mm(width_mm),
            height: Pt::from_mm(height_mm),
        }
    }

    pub fn landscape(self) -> Self {
        if self.width < self.height {
            Self::new(self.height, self.width)
        } else {
            self
        }
    }

    pub fn portrait(self) -> Self {
        if self.width > self.height {
            Self::new(self.height, self.width)
        } else {
            self
        }
    }

    pub fn is_empty(self) -> bool {
        !self.width.is_positive() || !self.height.is_positive()
    }
}

/// Axis-aligned rectangle in top-left-origin page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
}

impl Rect {
    pub fn new(x: Pt, y: Pt, width: Pt, height: Pt) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(Pt::ZERO, Pt::ZERO, size.width, size.height)
    }

    pub fn right(&self) -> Pt {
        self.x + self.width
    }

    pub fn bottom(&self) -> Pt {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        !self.width.is_positive() || !self.height.is_positive()
    }

    pub fn area_milli(&self) -> i128 {
        self.width.to_milli_i64() as i128 * self.height.to_milli_i64() as i128
    }

    /// Shrinks the rectangle by `edges`; a side that would go negative collapses to zero.
    pub fn inset(&self, edges: Edges) -> Rect {
        Rect {
            x: self.x + edges.left,
            y: self.y + edges.top,
            width: (self.width - edges.left - edges.right).clamp_non_negative(),
            height: (self.height - edges.top - edges.bottom).clamp_non_negative(),
        }
    }

    pub fn outset(&self, edges: Edges) -> Rect {
        Rect {
            x: self.x - edges.left,
            y: self.y - edges.top,
            width: self.width + edges.left + edges.right,
            height: self.height + edges.top + edges.bottom,
        }
    }

    pub fn translate(&self, dx: Pt, dy: Pt) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(Rect::new(x, y, right - x, bottom - y))
    }
}

/// Per-side lengths, used for page margins, padding and bleed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edges {
    pub top: Pt,
    pub right: Pt,
    pub bottom: Pt,
    pub left: Pt,
}

impl Edges {
    pub const ZERO: Edges = Edges {
        top: Pt::ZERO,
        right: Pt::ZERO,
        bottom: Pt::ZERO,
        left: Pt::ZERO,
    };

    pub fn all(value: Pt) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn new(top: Pt, right: Pt, bottom: Pt, left: Pt) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Expands a 1-4 value CSS shorthand list (top, right, bottom, left).
    pub fn from_shorthand(values: &[Pt]) -> Option<Self> {
        let (top, right, bottom, left) = match values {
            [all] => (*all, *all, *all, *all),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => return None,
        };
        Some(Self::new(top, right, bottom, left))
    }

    pub fn any_negative(&self) -> bool {
        self.top < Pt::ZERO || self.right < Pt::ZERO || self.bottom < Pt::ZERO || self.left < Pt::ZERO
    }

    pub fn horizontal(&self) -> Pt {
        self.left + self.right
    }

    pub fn vertical(&self) -> Pt {
        self.top + self.bottom
    }
}

impl std::ops::Add for Edges {
    type Output = Edges;
    fn add(self, rhs: Edges) -> Edges {
        Edges {
            top: self.top + rhs.top,
            right: self.right + rhs.right,
            bottom: self.bottom + rhs.bottom,
            left: self.left + rhs.left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(v: f32) -> Pt {
        Pt::from_f32(v)
    }

    #[test]
    fn millimetre_sizes_round_to_three_decimals() {
        let a4 = Size::a4();
        assert_eq!(a4.width.to_milli_i64(), 595_276);
        assert_eq!(a4.height.to_milli_i64(), 841_890);
        assert_eq!(Size::letter(), Size::new(pt(612.0), pt(792.0)));
    }

    #[test]
    fn orientation_swaps_only_when_needed() {
        let letter = Size::letter();
        assert_eq!(letter.landscape(), Size::new(pt(792.0), pt(612.0)));
        assert_eq!(letter.portrait(), letter);
        assert_eq!(letter.landscape().portrait(), letter);
    }

    #[test]
    fn inset_collapses_instead_of_going_negative() {
        let rect = Rect::new(pt(0.0), pt(0.0), pt(100.0), pt(50.0));
        let inset = rect.inset(Edges::new(pt(30.0), pt(60.0), pt(30.0), pt(60.0)));
        assert_eq!(inset.width, Pt::ZERO);
        assert_eq!(inset.height, Pt::ZERO);
        assert!(inset.is_degenerate());
    }

    #[test]
    fn outset_then_inset_is_identity() {
        let rect = Rect::new(pt(10.0), pt(20.0), pt(100.0), pt(50.0));
        let edges = Edges::new(pt(1.0), pt(2.0), pt(3.0), pt(4.0));
        assert_eq!(rect.outset(edges).inset(edges), rect);
    }

    #[test]
    fn intersection_of_disjoint_rects_is_none() {
        let a = Rect::new(pt(0.0), pt(0.0), pt(10.0), pt(10.0));
        let b = Rect::new(pt(10.0), pt(0.0), pt(10.0), pt(10.0));
        assert!(a.intersection(&b).is_none());
        assert!(!a.intersects(&b));
        let c = Rect::new(pt(5.0), pt(5.0), pt(10.0), pt(10.0));
        assert_eq!(
            a.intersection(&c),
            Some(Rect::new(pt(5.0), pt(5.0), pt(5.0), pt(5.0)))
        );
    }

    #[test]
    fn shorthand_expands_like_css() {
        let one = Edges::from_shorthand(&[pt(1.0)]).expect("one value");
        assert_eq!(one, Edges::all(pt(1.0)));
        let three = Edges::from_shorthand(&[pt(1.0), pt(2.0), pt(3.0)]).expect("three values");
        assert_eq!(three, Edges::new(pt(1.0), pt(2.0), pt(3.0), pt(2.0)));
        assert!(Edges::from_shorthand(&[]).is_none());
        assert!(Edges::from_shorthand(&[pt(1.0); 5]).is_none());
    }
}
