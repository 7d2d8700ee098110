//! Cell backgrounds: formatter hook, image decoding, border inset and
//! resampling to the pixel size the target DPI calls for.

use crate::config::{ConvertOptions, ResampleFilter};
use crate::error::{Result, TableError};
use crate::style::Border;
use crate::surface::{PageSurface, PlacedImage};
use crate::table::{BackgroundFormatterOptions, Cell, ImageSource};
use crate::types::{Length, Rect};
use base64::Engine;
use image::imageops::FilterType;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

type CacheKey = (String, u32, u32);

pub(crate) struct BackgroundCompositor {
    default_dpi: u32,
    resample: ResampleFilter,
    cache: Option<HashMap<CacheKey, Arc<image::RgbaImage>>>,
}

impl BackgroundCompositor {
    pub fn new(options: &ConvertOptions) -> Self {
        Self {
            default_dpi: options.default_dpi(),
            resample: options.resample(),
            cache: options.cache_backgrounds().then(HashMap::new),
        }
    }

    /// Draws the background of `cell` into `rect`. Returns the placed image,
    /// or `None` when the cell has nothing to draw.
    pub fn draw<S: PageSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        cell: &Cell,
        rect: Rect,
        border_width: Length,
    ) -> Result<Option<PlacedImage>> {
        let background = cell.background();
        if background.is_empty() {
            return Ok(None);
        }

        let mut options =
            BackgroundFormatterOptions::new(background.image().cloned(), rect.width, rect.height);
        options.set_dpi(background.dpi());
        if let Some(formatter) = background.formatter() {
            formatter(&mut options);
        }
        let Some(source) = options.image() else {
            return Ok(None);
        };

        let area = inset_for_border(
            Rect::new(rect.x, rect.y, options.width(), options.height()),
            cell.border(),
            border_width,
        );
        if area.width <= Length::ZERO || area.height <= Length::ZERO {
            return Ok(None);
        }

        let dpi = options.dpi().unwrap_or(self.default_dpi);
        let unit = surface.unit();
        let pixel_width = to_pixel_count(unit.to_pixels(area.width.to_f32(), dpi as f32));
        let pixel_height = to_pixel_count(unit.to_pixels(area.height.to_f32(), dpi as f32));

        let (mime, data) = load_source(source)?;
        let digest = sha256_hex(&data);
        let key = (digest, pixel_width, pixel_height);
        let raster = match self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            Some(hit) => hit.clone(),
            None => {
                let decoded = decode_image(&data, mime.as_deref())?;
                let filter = select_filter(self.resample, decoded.width(), pixel_width);
                let resized = Arc::new(
                    decoded
                        .resize_exact(pixel_width, pixel_height, filter)
                        .to_rgba8(),
                );
                if let Some(cache) = self.cache.as_mut() {
                    cache.insert(key.clone(), resized.clone());
                }
                resized
            }
        };

        let placed = PlacedImage {
            x: area.x,
            y: area.y,
            width: area.width,
            height: area.height,
            dpi,
            resource_id: format!("bg-{}-{}x{}", &key.0[..16], pixel_width, pixel_height),
            raster,
        };
        surface.image(&placed);
        Ok(Some(placed))
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.cache.as_ref().map(HashMap::len).unwrap_or(0)
    }
}

/// Pulls the background in by half a stroke on every bordered side.
pub(crate) fn inset_for_border(rect: Rect, border: Border, border_width: Length) -> Rect {
    let half = border_width / 2;
    let mut out = rect;
    if border.contains(Border::LEFT) {
        out.x += half;
        out.width -= half;
    }
    if border.contains(Border::TOP) {
        out.y += half;
        out.height -= half;
    }
    if border.contains(Border::RIGHT) {
        out.width -= half;
    }
    if border.contains(Border::BOTTOM) {
        out.height -= half;
    }
    out.width = out.width.max(Length::ZERO);
    out.height = out.height.max(Length::ZERO);
    out
}

fn to_pixel_count(value: f32) -> u32 {
    if !value.is_finite() {
        return 1;
    }
    value.round().clamp(1.0, u32::MAX as f32) as u32
}

fn select_filter(resample: ResampleFilter, source_width: u32, target_width: u32) -> FilterType {
    let upscale = target_width > source_width;
    match resample {
        ResampleFilter::Nearest => FilterType::Nearest,
        ResampleFilter::Smooth => FilterType::CatmullRom,
        ResampleFilter::Auto if upscale => FilterType::CatmullRom,
        ResampleFilter::Auto => FilterType::Lanczos3,
    }
}

fn load_source(source: &ImageSource) -> Result<(Option<String>, Arc<[u8]>)> {
    match source {
        ImageSource::Path(path) => {
            let data = std::fs::read(path)?;
            Ok((None, Arc::from(data)))
        }
        ImageSource::Bytes(data) => Ok((None, data.clone())),
        ImageSource::DataUri(uri) => {
            let (mime, data) = parse_data_uri(uri)
                .ok_or_else(|| TableError::Image("malformed data URI".to_string()))?;
            Ok((Some(mime), Arc::from(data)))
        }
    }
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}

fn decode_image(data: &[u8], mime: Option<&str>) -> Result<image::DynamicImage> {
    let format = match mime {
        Some(mime) if mime.contains("png") => Some(image::ImageFormat::Png),
        Some(mime) if mime.contains("jpeg") || mime.contains("jpg") => {
            Some(image::ImageFormat::Jpeg)
        }
        _ => image::guess_format(data).ok(),
    };
    let decoded = match format {
        Some(format) => image::load_from_memory_with_format(data, format)?,
        None => image::load_from_memory(data)?,
    };
    Ok(decoded)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
