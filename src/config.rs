use crate::error::{Result, invalid};
use std::path::PathBuf;

pub const DEFAULT_DPI: u32 = 72;

/// Filter used when a background image is resampled to its target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleFilter {
    /// Lanczos3 when shrinking, CatmullRom when enlarging.
    #[default]
    Auto,
    /// Nearest neighbour, for pixel art and barcodes.
    Nearest,
    /// CatmullRom in both directions.
    Smooth,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    default_dpi: u32,
    resample: ResampleFilter,
    debug_path: Option<PathBuf>,
    table_debug: bool,
    cache_backgrounds: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            default_dpi: DEFAULT_DPI,
            resample: ResampleFilter::Auto,
            debug_path: None,
            table_debug: false,
            cache_backgrounds: true,
        }
    }
}

impl ConvertOptions {
    pub fn builder() -> ConvertOptionsBuilder {
        ConvertOptionsBuilder::new()
    }

    /// DPI used for backgrounds that do not set their own.
    pub fn default_dpi(&self) -> u32 {
        self.default_dpi
    }

    pub fn resample(&self) -> ResampleFilter {
        self.resample
    }

    pub fn debug_path(&self) -> Option<&PathBuf> {
        self.debug_path.as_ref()
    }

    pub fn cache_backgrounds(&self) -> bool {
        self.cache_backgrounds
    }

    /// Verbose measure logging, switched on here or through
    /// `PAGEGRID_TABLE_DEBUG`.
    pub fn table_debug(&self) -> bool {
        self.table_debug || table_debug_env()
    }
}

pub struct ConvertOptionsBuilder {
    options: ConvertOptions,
}

impl Default for ConvertOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvertOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: ConvertOptions::default(),
        }
    }

    pub fn default_dpi(mut self, dpi: u32) -> Self {
        self.options.default_dpi = dpi;
        self
    }

    pub fn resample(mut self, filter: ResampleFilter) -> Self {
        self.options.resample = filter;
        self
    }

    /// Writes a JSON-lines trace of layout decisions to `path`.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.debug_path = Some(path.into());
        self
    }

    pub fn table_debug(mut self, enabled: bool) -> Self {
        self.options.table_debug = enabled;
        self
    }

    pub fn cache_backgrounds(mut self, enabled: bool) -> Self {
        self.options.cache_backgrounds = enabled;
        self
    }

    pub fn build(self) -> Result<ConvertOptions> {
        if self.options.default_dpi == 0 {
            return Err(invalid("default_dpi must be greater than 0"));
        }
        Ok(self.options)
    }
}

fn table_debug_env() -> bool {
    static ENABLED: std::sync::OnceLock<bool> = std::sync::OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var("PAGEGRID_TABLE_DEBUG")
            .ok()
            .map(|v| {
                let v = v.trim();
                v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
            })
            .unwrap_or(false)
    })
}
