use crate::content::{ContentContext, ContentNode, ContentValue};
use crate::diagnostics::Diagnostics;
use crate::margin_box::MarginBoxPosition;
use crate::rules::PropertyMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Tag shared by every margin box; hooks registered under it apply to all positions.
pub const PAGE_MARGIN_BOX_TAG: &str = "_page_margin_box";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookKey {
    Position(MarginBoxPosition),
    MarginBoxTag,
}

impl HookKey {
    /// Accepts a position name (`top-center`, `@top-center`) or the margin box tag.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim() == PAGE_MARGIN_BOX_TAG {
            return Some(HookKey::MarginBoxTag);
        }
        MarginBoxPosition::from_name(raw).map(HookKey::Position)
    }
}

impl From<MarginBoxPosition> for HookKey {
    fn from(value: MarginBoxPosition) -> Self {
        HookKey::Position(value)
    }
}

/// What a content worker receives for one margin box.
pub struct ContentRequest<'a> {
    pub position: MarginBoxPosition,
    pub properties: &'a PropertyMap,
    pub value: &'a ContentValue,
    pub context: ContentContext<'a>,
}

impl ContentRequest<'_> {
    /// The resolution the engine would have done without the worker.
    pub fn resolve_builtin(&self, diagnostics: &mut Diagnostics) -> Vec<ContentNode> {
        self.value.resolve(&self.context, diagnostics)
    }
}

/// Replaces built-in `content` resolution for the boxes it is registered on.
pub trait ContentWorker: Send + Sync {
    fn resolve(&self, request: &ContentRequest<'_>, diagnostics: &mut Diagnostics)
    -> Vec<ContentNode>;
}

/// Edits a margin box's cascaded properties before its content is resolved.
pub trait StyleApplier: Send + Sync {
    fn apply(&self, position: MarginBoxPosition, properties: &mut PropertyMap);
}

#[derive(Clone, Default)]
pub struct HookRegistry {
    content_workers: BTreeMap<HookKey, Arc<dyn ContentWorker>>,
    style_appliers: BTreeMap<HookKey, Arc<dyn StyleApplier>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the worker previously registered under `key`, if any.
    pub fn register_content_worker(
        &mut self,
        key: impl Into<HookKey>,
        worker: Arc<dyn ContentWorker>,
    ) -> Option<Arc<dyn ContentWorker>> {
        self.content_workers.insert(key.into(), worker)
    }

    pub fn unregister_content_worker(
        &mut self,
        key: impl Into<HookKey>,
    ) -> Option<Arc<dyn ContentWorker>> {
        self.content_workers.remove(&key.into())
    }

    pub fn register_style_applier(
        &mut self,
        key: impl Into<HookKey>,
        applier: Arc<dyn StyleApplier>,
    ) -> Option<Arc<dyn StyleApplier>> {
        self.style_appliers.insert(key.into(), applier)
    }

    pub fn unregister_style_applier(
        &mut self,
        key: impl Into<HookKey>,
    ) -> Option<Arc<dyn StyleApplier>> {
        self.style_appliers.remove(&key.into())
    }

    /// Position-specific registration first, then the margin box tag.
    pub fn content_worker(&self, position: MarginBoxPosition) -> Option<&Arc<dyn ContentWorker>> {
        lookup(&self.content_workers, position)
    }

    pub fn style_applier(&self, position: MarginBoxPosition) -> Option<&Arc<dyn StyleApplier>> {
        lookup(&self.style_appliers, position)
    }

    pub fn is_empty(&self) -> bool {
        self.content_workers.is_empty() && self.style_appliers.is_empty()
    }
}

fn lookup<T: ?Sized>(
    map: &BTreeMap<HookKey, Arc<T>>,
    position: MarginBoxPosition,
) -> Option<&Arc<T>> {
    map.get(&HookKey::Position(position))
        .or_else(|| map.get(&HookKey::MarginBoxTag))
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("content_workers", &self.content_workers.keys().collect::<Vec<_>>())
            .field("style_appliers", &self.style_appliers.keys().collect::<Vec<_>>())
            .finish()
    }
}
