use crate::debug::json_escape;

pub const PAGE_SIZE_VALUE_IS_INVALID: &str = "page size value is invalid";
pub const CONTENT_PROPERTY_INVALID: &str = "content property invalid";
pub const GEOMETRY_CLAMPED: &str = "geometry clamped";

/// Non-fatal problems found while resolving one page. Each malformed occurrence is
/// reported exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    PageSizeInvalid,
    ContentPropertyInvalid,
    GeometryClamped,
}

impl DiagnosticKind {
    pub fn message(self) -> &'static str {
        match self {
            DiagnosticKind::PageSizeInvalid => PAGE_SIZE_VALUE_IS_INVALID,
            DiagnosticKind::ContentPropertyInvalid => CONTENT_PROPERTY_INVALID,
            DiagnosticKind::GeometryClamped => GEOMETRY_CLAMPED,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::PageSizeInvalid => "page_size_invalid",
            DiagnosticKind::ContentPropertyInvalid => "content_property_invalid",
            DiagnosticKind::GeometryClamped => "geometry_clamped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub page_index: Option<usize>,
    // Margin box name or property the value came from.
    pub subject: Option<String>,
    pub value: String,
}

impl Diagnostic {
    pub fn message(&self) -> &'static str {
        self.kind.message()
    }

    pub(crate) fn to_json(&self) -> String {
        let page = self
            .page_index
            .map(|v| v.to_string())
            .unwrap_or_else(|| "null".to_string());
        let subject = self
            .subject
            .as_deref()
            .map(|v| format!("\"{}\"", json_escape(v)))
            .unwrap_or_else(|| "null".to_string());
        format!(
            "{{\"type\":\"pagebox.diagnostic\",\"kind\":\"{}\",\"message\":\"{}\",\"page_index\":{},\"subject\":{},\"value\":\"{}\"}}",
            self.kind.as_str(),
            json_escape(self.message()),
            page,
            subject,
            json_escape(&self.value)
        )
    }
}

/// Explicit diagnostics sink threaded through geometry and content resolution.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    page_index: Option<usize>,
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_page(page_index: usize) -> Self {
        Self {
            page_index: Some(page_index),
            events: Vec::new(),
        }
    }

    pub fn report(&mut self, kind: DiagnosticKind, subject: Option<&str>, value: &str) {
        self.events.push(Diagnostic {
            kind,
            page_index: self.page_index,
            subject: subject.map(str::to_string),
            value: value.trim().to_string(),
        });
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.events.iter().filter(|event| event.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<Diagnostic> {
        self.events
    }
}
