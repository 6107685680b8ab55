use crate::flowable::{TextAlign, VerticalAlign};
use crate::types::{Edges, Pt, Rect};

/// The sixteen page-margin boxes, declared in painting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarginBoxPosition {
    TopLeftCorner,
    TopLeft,
    TopCenter,
    TopRight,
    TopRightCorner,
    RightTop,
    RightMiddle,
    RightBottom,
    BottomRightCorner,
    BottomRight,
    BottomCenter,
    BottomLeft,
    BottomLeftCorner,
    LeftBottom,
    LeftMiddle,
    LeftTop,
}

impl MarginBoxPosition {
    pub const ALL: [MarginBoxPosition; 16] = [
        MarginBoxPosition::TopLeftCorner,
        MarginBoxPosition::TopLeft,
        MarginBoxPosition::TopCenter,
        MarginBoxPosition::TopRight,
        MarginBoxPosition::TopRightCorner,
        MarginBoxPosition::RightTop,
        MarginBoxPosition::RightMiddle,
        MarginBoxPosition::RightBottom,
        MarginBoxPosition::BottomRightCorner,
        MarginBoxPosition::BottomRight,
        MarginBoxPosition::BottomCenter,
        MarginBoxPosition::BottomLeft,
        MarginBoxPosition::BottomLeftCorner,
        MarginBoxPosition::LeftBottom,
        MarginBoxPosition::LeftMiddle,
        MarginBoxPosition::LeftTop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MarginBoxPosition::TopLeftCorner => "top-left-corner",
            MarginBoxPosition::TopLeft => "top-left",
            MarginBoxPosition::TopCenter => "top-center",
            MarginBoxPosition::TopRight => "top-right",
            MarginBoxPosition::TopRightCorner => "top-right-corner",
            MarginBoxPosition::RightTop => "right-top",
            MarginBoxPosition::RightMiddle => "right-middle",
            MarginBoxPosition::RightBottom => "right-bottom",
            MarginBoxPosition::BottomRightCorner => "bottom-right-corner",
            MarginBoxPosition::BottomRight => "bottom-right",
            MarginBoxPosition::BottomCenter => "bottom-center",
            MarginBoxPosition::BottomLeft => "bottom-left",
            MarginBoxPosition::BottomLeftCorner => "bottom-left-corner",
            MarginBoxPosition::LeftBottom => "left-bottom",
            MarginBoxPosition::LeftMiddle => "left-middle",
            MarginBoxPosition::LeftTop => "left-top",
        }
    }

    /// Accepts the at-rule name with or without the leading `@`.
    pub fn from_name(raw: &str) -> Option<Self> {
        let name = raw.trim().trim_start_matches('@').to_ascii_lowercase();
        Self::ALL.into_iter().find(|pos| pos.name() == name)
    }

    pub fn is_corner(self) -> bool {
        self.edge().is_none()
    }

    /// The edge band this box sits in; `None` for the four corners.
    pub fn edge(self) -> Option<PageEdge> {
        EDGE_TABLE
            .iter()
            .find(|entry| entry.boxes.contains(&self))
            .map(|entry| entry.edge)
    }

    pub fn slot(self) -> Option<BandSlot> {
        let entry = EDGE_TABLE.iter().find(|entry| entry.boxes.contains(&self))?;
        let idx = entry.boxes.iter().position(|pos| *pos == self)?;
        Some([BandSlot::Start, BandSlot::Center, BandSlot::End][idx])
    }

    pub fn default_text_align(self) -> TextAlign {
        use MarginBoxPosition::*;
        match self {
            TopLeftCorner | BottomLeftCorner | TopRight | BottomRight => TextAlign::Right,
            TopRightCorner | BottomRightCorner | TopLeft | BottomLeft => TextAlign::Left,
            TopCenter | BottomCenter => TextAlign::Center,
            LeftTop | LeftMiddle | LeftBottom | RightTop | RightMiddle | RightBottom => {
                TextAlign::Center
            }
        }
    }

    pub fn default_vertical_align(self) -> VerticalAlign {
        use MarginBoxPosition::*;
        match self {
            LeftTop | RightTop => VerticalAlign::Top,
            LeftBottom | RightBottom => VerticalAlign::Bottom,
            _ => VerticalAlign::Middle,
        }
    }

    /// Edge bands are sized along the horizontal axis for top/bottom boxes and along
    /// the vertical axis for left/right boxes.
    pub fn sizing_property(self) -> Option<&'static str> {
        match self.edge()? {
            PageEdge::Top | PageEdge::Bottom => Some("width"),
            PageEdge::Left | PageEdge::Right => Some("height"),
        }
    }
}

impl std::fmt::Display for MarginBoxPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageEdge {
    Top,
    Right,
    Bottom,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandSlot {
    Start,
    Center,
    End,
}

pub struct EdgeEntry {
    pub edge: PageEdge,
    pub start_corner: MarginBoxPosition,
    pub end_corner: MarginBoxPosition,
    // start, center, end
    pub boxes: [MarginBoxPosition; 3],
}

/// Which corners bound which edge-center boxes. Start is left for horizontal edges
/// and top for vertical edges.
pub static EDGE_TABLE: [EdgeEntry; 4] = [
    EdgeEntry {
        edge: PageEdge::Top,
        start_corner: MarginBoxPosition::TopLeftCorner,
        end_corner: MarginBoxPosition::TopRightCorner,
        boxes: [
            MarginBoxPosition::TopLeft,
            MarginBoxPosition::TopCenter,
            MarginBoxPosition::TopRight,
        ],
    },
    EdgeEntry {
        edge: PageEdge::Right,
        start_corner: MarginBoxPosition::TopRightCorner,
        end_corner: MarginBoxPosition::BottomRightCorner,
        boxes: [
            MarginBoxPosition::RightTop,
            MarginBoxPosition::RightMiddle,
            MarginBoxPosition::RightBottom,
        ],
    },
    EdgeEntry {
        edge: PageEdge::Bottom,
        start_corner: MarginBoxPosition::BottomLeftCorner,
        end_corner: MarginBoxPosition::BottomRightCorner,
        boxes: [
            MarginBoxPosition::BottomLeft,
            MarginBoxPosition::BottomCenter,
            MarginBoxPosition::BottomRight,
        ],
    },
    EdgeEntry {
        edge: PageEdge::Left,
        start_corner: MarginBoxPosition::TopLeftCorner,
        end_corner: MarginBoxPosition::BottomLeftCorner,
        boxes: [
            MarginBoxPosition::LeftTop,
            MarginBoxPosition::LeftMiddle,
            MarginBoxPosition::LeftBottom,
        ],
    },
];

pub fn edge_entry(edge: PageEdge) -> &'static EdgeEntry {
    match edge {
        PageEdge::Top => &EDGE_TABLE[0],
        PageEdge::Right => &EDGE_TABLE[1],
        PageEdge::Bottom => &EDGE_TABLE[2],
        PageEdge::Left => &EDGE_TABLE[3],
    }
}

/// What the band splitter needs to know about one edge box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandRequest {
    pub generated: bool,
    pub extent: Option<Pt>,
}

/// Splits an edge band of `length` into start/center/end extents that always sum to
/// `length`. A generated center box stays centered in the band.
pub fn split_band(length: Pt, start: BandRequest, center: BandRequest, end: BandRequest) -> [Pt; 3] {
    let length = length.clamp_non_negative();
    let clamp = |value: Pt| value.clamp_non_negative().min(length);

    if center.generated || (!start.generated && !end.generated) {
        let center_extent = match (center.extent, start.extent, end.extent) {
            (Some(extent), _, _) => clamp(extent),
            (None, None, None) => length / 3,
            (None, a, b) => {
                let side = clamp(a.unwrap_or(Pt::ZERO)).max(clamp(b.unwrap_or(Pt::ZERO)));
                (length - side * 2).clamp_non_negative()
            }
        };
        let start_extent = (length - center_extent).half();
        let end_extent = length - center_extent - start_extent;
        return [start_extent, center_extent, end_extent];
    }

    match (start.extent, end.extent) {
        (Some(extent), _) => {
            let s = clamp(extent);
            [s, Pt::ZERO, length - s]
        }
        (None, Some(extent)) => {
            let e = clamp(extent);
            [length - e, Pt::ZERO, e]
        }
        (None, None) => match (start.generated, end.generated) {
            (true, false) => [length, Pt::ZERO, Pt::ZERO],
            (false, true) => [Pt::ZERO, Pt::ZERO, length],
            _ => {
                let s = length.half();
                [s, Pt::ZERO, length - s]
            }
        },
    }
}

/// Rectangles for all sixteen positions, in [`MarginBoxPosition::ALL`] order.
///
/// `trim` is the trim box in page space and `margins` the resolved page margins;
/// `request` reports, per edge box, whether it is generated and its explicit extent.
pub fn margin_box_rects<F>(trim: Rect, margins: Edges, request: F) -> Vec<(MarginBoxPosition, Rect)>
where
    F: Fn(MarginBoxPosition) -> BandRequest,
{
    let ml = margins.left.clamp_non_negative().min(trim.width);
    let mr = margins.right.clamp_non_negative().min(trim.width - ml);
    let mt = margins.top.clamp_non_negative().min(trim.height);
    let mb = margins.bottom.clamp_non_negative().min(trim.height - mt);

    let inner_left = trim.x + ml;
    let inner_right = trim.right() - mr;
    let inner_top = trim.y + mt;
    let inner_bottom = trim.bottom() - mb;
    let horizontal_band = inner_right - inner_left;
    let vertical_band = inner_bottom - inner_top;

    let mut rects = Vec::with_capacity(16);
    for position in MarginBoxPosition::ALL {
        let rect = match position {
            MarginBoxPosition::TopLeftCorner => Rect::new(trim.x, trim.y, ml, mt),
            MarginBoxPosition::TopRightCorner => Rect::new(inner_right, trim.y, mr, mt),
            MarginBoxPosition::BottomRightCorner => Rect::new(inner_right, inner_bottom, mr, mb),
            MarginBoxPosition::BottomLeftCorner => Rect::new(trim.x, inner_bottom, ml, mb),
            _ => {
                let Some(edge) = position.edge() else {
                    continue;
                };
                let entry = edge_entry(edge);
                let band = match edge {
                    PageEdge::Top | PageEdge::Bottom => horizontal_band,
                    PageEdge::Left | PageEdge::Right => vertical_band,
                };
                let extents = split_band(
                    band,
                    request(entry.boxes[0]),
                    request(entry.boxes[1]),
                    request(entry.boxes[2]),
                );
                let idx = entry
                    .boxes
                    .iter()
                    .position(|pos| *pos == position)
                    .unwrap_or(0);
                let offset: Pt = extents[..idx].iter().copied().sum();
                let extent = extents[idx];
                match edge {
                    PageEdge::Top => Rect::new(inner_left + offset, trim.y, extent, mt),
                    PageEdge::Bottom => Rect::new(inner_left + offset, inner_bottom, extent, mb),
                    PageEdge::Left => Rect::new(trim.x, inner_top + offset, ml, extent),
                    PageEdge::Right => Rect::new(inner_right, inner_top + offset, mr, extent),
                }
            }
        };
        rects.push((position, rect));
    }
    rects
}
