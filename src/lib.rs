mod canvas;
mod content;
mod debug;
mod diagnostics;
mod engine;
mod error;
mod fit;
mod flowable;
mod frame;
mod geometry;
mod hooks;
mod length;
mod margin_box;
mod marks;
mod rules;
mod stylesheet;
mod types;

pub use canvas::{Canvas, Command, Page};
pub use content::{
    ContentContext, ContentItem, ContentNode, ContentProvider, ContentValue, CounterSnapshot,
    CounterStyle, ImageNode, InvalidContent, MarginBoxContent, NoContent, decode_data_uri,
};
pub use diagnostics::{
    CONTENT_PROPERTY_INVALID, Diagnostic, DiagnosticKind, Diagnostics, GEOMETRY_CLAMPED,
    PAGE_SIZE_VALUE_IS_INVALID,
};
pub use engine::{PageBox, PageBoxBuilder, PageLayout, PageRequest, PlacedMarginBox};
pub use error::{LayoutFailure, PageLayoutError};
pub use fit::{FittedContent, FittedItem, Overflow, fit};
pub use flowable::{
    Flowable, FlowableClone, ImageFlowable, Paragraph, TextAlign, TextStyle, VerticalAlign,
};
pub use frame::{AddResult, BoxLayouter, Frame, FrameLayouter, LaidOutBox, LaidOutItem};
pub use geometry::{
    GeometryConfig, Orientation, PageGeometry, PageSizeValue, compute_geometry, named_page_size,
    parse_page_size,
};
pub use hooks::{
    ContentRequest, ContentWorker, HookKey, HookRegistry, PAGE_MARGIN_BOX_TAG, StyleApplier,
};
pub use length::{LengthSpec, parse_absolute_pt, px_to_pt, resolve_edge_shorthand};
pub use margin_box::{
    BandRequest, BandSlot, EDGE_TABLE, EdgeEntry, MarginBoxPosition, PageEdge, edge_entry,
    margin_box_rects, split_band,
};
pub use marks::{MarkInstruction, MarkSet, Segment, draw_marks, render_marks};
pub use rules::{
    DeclarationBlock, Declarations, EffectivePageDeclaration, PageContext, PagePosition,
    PagePseudoClass, PageRule, PageRuleSet, PageSelector, PropertyMap, resolve,
};
pub use stylesheet::page_rules_from_css;
pub use types::{Color, Edges, Pt, Rect, Size};
