use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A single cell is taller than the usable height of a page. Cells are
    /// never broken across pages, so the conversion stops here.
    #[error("cell content does not fit on one page: \"{text}\"")]
    UnsupportedLayout { text: String },
    #[error("surface state restored before any state was saved")]
    StateNotSaved,
    #[error("image error: {0}")]
    Image(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for TableError {
    fn from(value: image::ImageError) -> Self {
        TableError::Image(value.to_string())
    }
}

pub type Result<T, E = TableError> = std::result::Result<T, E>;

pub(crate) fn invalid(message: impl Into<String>) -> TableError {
    TableError::InvalidConfiguration(message.into())
}

const DIAGNOSTIC_TEXT_CHARS: usize = 50;

pub(crate) fn unsupported_layout(text: &str) -> TableError {
    let mut preview: String = text.chars().take(DIAGNOSTIC_TEXT_CHARS).collect();
    if text.chars().count() > DIAGNOSTIC_TEXT_CHARS {
        preview.push_str("...");
    }
    TableError::UnsupportedLayout { text: preview }
}
