use crate::content::{ContentNode, MarginBoxContent};
use crate::error::LayoutFailure;
use crate::flowable::{Flowable, ImageFlowable, Paragraph, TextAlign, TextStyle, VerticalAlign};
use crate::types::{Pt, Rect, Size};

/// One positioned flowable, in coordinates relative to its margin box.
#[derive(Debug, Clone)]
pub struct LaidOutItem {
    pub rect: Rect,
    pub flowable: Box<dyn Flowable>,
    pub auto_scale: bool,
}

#[derive(Debug, Clone)]
pub struct LaidOutBox {
    pub size: Size,
    pub items: Vec<LaidOutItem>,
    // Alignment the items were placed with; fitting re-anchors scaled items by it.
    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,
}

impl LaidOutBox {
    /// Union height of the items, measured from the box top.
    pub fn content_height(&self) -> Pt {
        self.items
            .iter()
            .map(|item| item.rect.bottom())
            .fold(Pt::ZERO, Pt::max)
    }
}

/// Flow layout collaborator: lays resolved nodes out inside a fixed-size box.
/// Items keep their natural size even when they overflow the box.
pub trait BoxLayouter: Send + Sync {
    fn layout_box(
        &self,
        content: &MarginBoxContent,
        size: Size,
    ) -> Result<LaidOutBox, LayoutFailure>;
}

pub enum AddResult {
    Placed(Rect),
    // Placed anyway; margin boxes do not paginate.
    Overflow(Rect),
}

/// Vertical stacking region.
pub struct Frame {
    rect: Rect,
    cursor_y: Pt,
    items: Vec<LaidOutItem>,
}

impl Frame {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            cursor_y: Pt::ZERO,
            items: Vec::new(),
        }
    }

    pub fn remaining_height(&self) -> Pt {
        (self.rect.height - self.cursor_y).max(Pt::ZERO)
    }

    pub fn used_height(&self) -> Pt {
        self.cursor_y
    }

    pub fn add(&mut self, flowable: Box<dyn Flowable>, auto_scale: bool) -> AddResult {
        let avail_height = self.remaining_height();
        let size = flowable.wrap(self.rect.width, avail_height);
        let rect = Rect::new(
            self.rect.x,
            self.rect.y + self.cursor_y,
            size.width,
            size.height,
        );
        self.cursor_y += size.height;
        self.items.push(LaidOutItem {
            rect,
            flowable,
            auto_scale,
        });
        if size.height <= avail_height {
            AddResult::Placed(rect)
        } else {
            AddResult::Overflow(rect)
        }
    }

    pub fn finish(self) -> Vec<LaidOutItem> {
        self.items
    }
}

/// Default layouter: one block per text run or image, stacked top to bottom, then
/// aligned as a group by `text-align` and `vertical-align`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameLayouter;

impl FrameLayouter {
    fn push_nodes(frame: &mut Frame, nodes: &[ContentNode], style: &TextStyle) {
        for node in nodes {
            match node {
                ContentNode::Text(text) => {
                    frame.add(Box::new(Paragraph::new(text.clone(), style.clone())), false);
                }
                ContentNode::Image(image) => {
                    let flowable =
                        ImageFlowable::new_pt(image.width, image.height, image.resource_id.clone());
                    frame.add(Box::new(flowable), image.auto_scale);
                }
                ContentNode::Group(children) => Self::push_nodes(frame, children, style),
            }
        }
    }
}

impl BoxLayouter for FrameLayouter {
    fn layout_box(
        &self,
        content: &MarginBoxContent,
        size: Size,
    ) -> Result<LaidOutBox, LayoutFailure> {
        let mut frame = Frame::new(Rect::from_size(size));
        Self::push_nodes(&mut frame, &content.nodes, &content.text_style);
        let dy = content.vertical_align.offset(size.height, frame.used_height());
        let items = frame
            .finish()
            .into_iter()
            .map(|mut item| {
                let dx = content.text_align.offset(size.width, item.rect.width);
                item.rect = item.rect.translate(dx, dy);
                item
            })
            .collect();
        Ok(LaidOutBox {
            size,
            items,
            text_align: content.text_align,
            vertical_align: content.vertical_align,
        })
    }
}
