use crate::canvas::Canvas;
use crate::geometry::PageGeometry;
use crate::types::{Color, Pt};

const CROP_OFFSET: f32 = 3.0;
const CROP_LENGTH: f32 = 18.0;
const CROSS_RADIUS: f32 = 9.0;
const MARK_LINE_WIDTH: f32 = 0.25;

/// Printer's marks requested through the `marks` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkSet {
    pub crop: bool,
    pub cross: bool,
}

impl MarkSet {
    pub const NONE: MarkSet = MarkSet {
        crop: false,
        cross: false,
    };

    /// `none` anywhere clears the set; unknown tokens are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut marks = MarkSet::NONE;
        for token in raw.split_whitespace() {
            match token.to_ascii_lowercase().as_str() {
                "crop" => marks.crop = true,
                "cross" => marks.cross = true,
                "none" => return MarkSet::NONE,
                _ => {}
            }
        }
        marks
    }

    pub fn is_empty(self) -> bool {
        !self.crop && !self.cross
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x1: Pt,
    pub y1: Pt,
    pub x2: Pt,
    pub y2: Pt,
}

impl Segment {
    fn new(x1: Pt, y1: Pt, x2: Pt, y2: Pt) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkInstruction {
    Crop(Segment),
    Cross {
        center: (Pt, Pt),
        horizontal: Segment,
        vertical: Segment,
    },
}

/// Mark primitives in media-box space. Everything lies in the gutter outside the bleed
/// box.
pub fn render_marks(geometry: &PageGeometry) -> Vec<MarkInstruction> {
    let mut out = Vec::new();
    if geometry.marks.is_empty() {
        return out;
    }
    let trim = geometry.trim_box();
    let bleed = geometry.bleed_box();
    let media = geometry.media_box();

    if geometry.marks.crop {
        let offset = Pt::from_f32(CROP_OFFSET).min(geometry.gutter);
        let length = Pt::from_f32(CROP_LENGTH).min(geometry.gutter - offset);
        let left = bleed.x - offset;
        let right = bleed.right() + offset;
        let top = bleed.y - offset;
        let bottom = bleed.bottom() + offset;
        for (x, y, dx, dy) in [
            (trim.x, trim.y, left, top),
            (trim.right(), trim.y, right, top),
            (trim.right(), trim.bottom(), right, bottom),
            (trim.x, trim.bottom(), left, bottom),
        ] {
            // Horizontal arm runs outward from the bleed edge on the trim line.
            let h_end = if dx < trim.x { dx - length } else { dx + length };
            out.push(MarkInstruction::Crop(Segment::new(dx, y, h_end, y)));
            let v_end = if dy < trim.y { dy - length } else { dy + length };
            out.push(MarkInstruction::Crop(Segment::new(x, dy, x, v_end)));
        }
    }

    if geometry.marks.cross {
        let radius = Pt::from_f32(CROSS_RADIUS).min(geometry.gutter.half());
        let mid_x = trim.x + trim.width.half();
        let mid_y = trim.y + trim.height.half();
        let gutter_mid = |outer: Pt, inner: Pt| outer + (inner - outer).half();
        let centers = [
            (mid_x, gutter_mid(media.y, bleed.y)),
            (gutter_mid(bleed.right(), media.right()), mid_y),
            (mid_x, gutter_mid(bleed.bottom(), media.bottom())),
            (gutter_mid(media.x, bleed.x), mid_y),
        ];
        for (cx, cy) in centers {
            out.push(MarkInstruction::Cross {
                center: (cx, cy),
                horizontal: Segment::new(cx - radius, cy, cx + radius, cy),
                vertical: Segment::new(cx, cy - radius, cx, cy + radius),
            });
        }
    }
    out
}

/// Strokes marks as a pagination artifact.
pub fn draw_marks(canvas: &mut Canvas, marks: &[MarkInstruction]) {
    if marks.is_empty() {
        return;
    }
    canvas.save_state();
    canvas.begin_artifact(Some("Pagination".to_string()));
    canvas.set_stroke_color(Color::BLACK);
    canvas.set_line_width(Pt::from_f32(MARK_LINE_WIDTH));
    for mark in marks {
        match mark {
            MarkInstruction::Crop(segment) => stroke_segment(canvas, segment),
            MarkInstruction::Cross {
                horizontal,
                vertical,
                ..
            } => {
                stroke_segment(canvas, horizontal);
                stroke_segment(canvas, vertical);
            }
        }
    }
    canvas.end_marked_content();
    canvas.restore_state();
}

fn stroke_segment(canvas: &mut Canvas, segment: &Segment) {
    canvas.move_to(segment.x1, segment.y1);
    canvas.line_to(segment.x2, segment.y2);
    canvas.stroke();
}
