use std::fmt;

#[derive(Debug)]
pub enum PageLayoutError {
    /// No page rule set was supplied for the page.
    MissingStyleTree { page_index: usize },
    /// The flow-layout collaborator could not lay out a margin box.
    Layout { page_index: usize, message: String },
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl PageLayoutError {
    pub fn page_index(&self) -> Option<usize> {
        match self {
            PageLayoutError::MissingStyleTree { page_index }
            | PageLayoutError::Layout { page_index, .. } => Some(*page_index),
            _ => None,
        }
    }
}

impl fmt::Display for PageLayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageLayoutError::MissingStyleTree { page_index } => {
                write!(f, "no page style available for page {}", page_index + 1)
            }
            PageLayoutError::Layout {
                page_index,
                message,
            } => write!(
                f,
                "margin box layout failed on page {}: {}",
                page_index + 1,
                message
            ),
            PageLayoutError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            PageLayoutError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for PageLayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PageLayoutError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PageLayoutError {
    fn from(value: std::io::Error) -> Self {
        PageLayoutError::Io(value)
    }
}

/// Failure reported by a [`crate::BoxLayouter`]; the engine attaches the page index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutFailure(pub String);

impl fmt::Display for LayoutFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for LayoutFailure {}
