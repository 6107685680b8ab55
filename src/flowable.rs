use crate::canvas::Canvas;
use crate::types::{Color, Pt, Rect, Size};
use std::fmt;

/// A measurable, drawable piece of margin-box content.
pub trait Flowable: FlowableClone + Send + Sync {
    /// Natural size when laid out within `avail_width`. May exceed the available space.
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size;

    /// Draws into `rect`, which is the (possibly scaled) placement chosen by layout.
    fn draw(&self, canvas: &mut Canvas, rect: Rect);

    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub trait FlowableClone {
    fn clone_box(&self) -> Box<dyn Flowable>;
}

impl<T> FlowableClone for T
where
    T: 'static + Flowable + Clone,
{
    fn clone_box(&self) -> Box<dyn Flowable> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Flowable> {
    fn clone(&self) -> Box<dyn Flowable> {
        self.clone_box()
    }
}

impl fmt::Debug for dyn Flowable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.debug_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" | "start" | "justify" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" | "end" => Some(TextAlign::Right),
            _ => None,
        }
    }

    /// Offset of a `used` wide run inside `avail`.
    pub fn offset(self, avail: Pt, used: Pt) -> Pt {
        match self {
            TextAlign::Left => Pt::ZERO,
            TextAlign::Center => (avail - used).half(),
            TextAlign::Right => avail - used,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

impl VerticalAlign {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "top" => Some(VerticalAlign::Top),
            "middle" => Some(VerticalAlign::Middle),
            "bottom" => Some(VerticalAlign::Bottom),
            _ => None,
        }
    }

    pub fn offset(self, avail: Pt, used: Pt) -> Pt {
        match self {
            VerticalAlign::Top => Pt::ZERO,
            VerticalAlign::Middle => (avail - used).half(),
            VerticalAlign::Bottom => avail - used,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_name: String,
    pub font_size: Pt,
    pub line_height: Pt,
    pub color: Color,
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        let font_size = Pt::from_f32(10.0);
        Self {
            font_name: "Helvetica".to_string(),
            font_size,
            line_height: font_size * 1.2,
            color: Color::BLACK,
            align: TextAlign::Left,
        }
    }
}

impl TextStyle {
    /// Estimated advance of `text`, using Helvetica-like average widths per glyph class.
    pub fn measure(&self, text: &str) -> Pt {
        let em: f32 = text.chars().map(glyph_em_width).sum();
        self.font_size * em
    }

    fn ascent(&self) -> Pt {
        self.font_size * 0.8
    }
}

fn glyph_em_width(ch: char) -> f32 {
    match ch {
        ' ' | 'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' => 0.278,
        'f' | 't' | 'r' | '(' | ')' | '-' => 0.333,
        'm' | 'w' | 'M' | 'W' => 0.833,
        '0'..='9' => 0.556,
        c if c.is_ascii_uppercase() => 0.667,
        _ => 0.5,
    }
}

/// A run of text broken greedily into lines.
#[derive(Debug, Clone)]
pub struct Paragraph {
    text: String,
    style: TextStyle,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// Breaks at spaces and explicit newlines. A word wider than the line stays whole.
    pub fn lines(&self, max_width: Pt) -> Vec<String> {
        let mut lines = Vec::new();
        for hard_line in self.text.split('\n') {
            let mut current = String::new();
            for word in hard_line.split(' ').filter(|w| !w.is_empty()) {
                if current.is_empty() {
                    current.push_str(word);
                    continue;
                }
                let candidate = format!("{current} {word}");
                if self.style.measure(&candidate) <= max_width {
                    current = candidate;
                } else {
                    lines.push(std::mem::take(&mut current));
                    current.push_str(word);
                }
            }
            lines.push(current);
        }
        lines
    }
}

impl Flowable for Paragraph {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        let lines = self.lines(avail_width);
        let width = lines
            .iter()
            .map(|line| self.style.measure(line))
            .fold(Pt::ZERO, Pt::max);
        let height = self.style.line_height * lines.len() as i32;
        Size::new(width, height)
    }

    fn draw(&self, canvas: &mut Canvas, rect: Rect) {
        canvas.set_font_name(&self.style.font_name);
        canvas.set_font_size(self.style.font_size);
        canvas.set_fill_color(self.style.color);
        let mut y = rect.y + self.style.ascent();
        for line in self.lines(rect.width) {
            if !line.is_empty() {
                let dx = self.style.align.offset(rect.width, self.style.measure(&line));
                canvas.draw_string(rect.x + dx, y, line);
            }
            y += self.style.line_height;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageFlowable {
    pub width: Pt,
    pub height: Pt,
    pub resource_id: String,
}

impl ImageFlowable {
    pub fn new_pt(width: Pt, height: Pt, resource_id: impl Into<String>) -> Self {
        Self {
            width,
            height,
            resource_id: resource_id.into(),
        }
    }
}

impl Flowable for ImageFlowable {
    fn wrap(&self, _avail_width: Pt, _avail_height: Pt) -> Size {
        Size::new(self.width, self.height)
    }

    fn draw(&self, canvas: &mut Canvas, rect: Rect) {
        canvas.draw_image(rect, self.resource_id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;

    fn style(size: f32) -> TextStyle {
        let font_size = Pt::from_f32(size);
        TextStyle {
            font_size,
            line_height: font_size,
            ..TextStyle::default()
        }
    }

    #[test]
    fn paragraph_breaks_on_width_and_newlines() {
        // "aa" is 10pt wide at 10pt, "aa aa" is 22.78pt.
        let paragraph = Paragraph::new("aa aa\naa", style(10.0));
        assert_eq!(paragraph.lines(Pt::from_f32(15.0)), vec!["aa", "aa", "aa"]);
        assert_eq!(paragraph.lines(Pt::from_f32(100.0)), vec!["aa aa", "aa"]);
        let size = paragraph.wrap(Pt::from_f32(15.0), Pt::from_f32(100.0));
        assert_eq!(size.width, Pt::from_f32(10.0));
        assert_eq!(size.height, Pt::from_f32(30.0));
    }

    #[test]
    fn long_word_keeps_natural_width() {
        let paragraph = Paragraph::new("aaaaaaaaaa", style(10.0));
        let size = paragraph.wrap(Pt::from_f32(20.0), Pt::from_f32(100.0));
        assert_eq!(size.width, Pt::from_f32(50.0));
        assert_eq!(size.height, Pt::from_f32(10.0));
    }

    #[test]
    fn paragraph_draw_aligns_lines() {
        let mut text_style = style(10.0);
        text_style.align = TextAlign::Right;
        let paragraph = Paragraph::new("aa", text_style);
        let mut canvas = Canvas::new(Size::a4());
        paragraph.draw(
            &mut canvas,
            Rect::new(Pt::ZERO, Pt::ZERO, Pt::from_f32(30.0), Pt::from_f32(10.0)),
        );
        let page = canvas.finish();
        let drawn = page.commands.iter().find_map(|command| match command {
            Command::DrawString { x, text, .. } => Some((*x, text.clone())),
            _ => None,
        });
        assert_eq!(drawn, Some((Pt::from_f32(20.0), "aa".to_string())));
    }

    #[test]
    fn alignment_keywords() {
        assert_eq!(TextAlign::parse("END"), Some(TextAlign::Right));
        assert_eq!(TextAlign::parse("justify"), Some(TextAlign::Left));
        assert_eq!(TextAlign::parse("sideways"), None);
        assert_eq!(VerticalAlign::parse("middle"), Some(VerticalAlign::Middle));
        assert_eq!(
            VerticalAlign::Bottom.offset(Pt::from_f32(10.0), Pt::from_f32(4.0)),
            Pt::from_f32(6.0)
        );
    }
}
