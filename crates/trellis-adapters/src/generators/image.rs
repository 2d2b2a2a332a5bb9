//! Placeholder images.

use std::io::Cursor;

use image::{ImageFormat as Encoding, Rgb, RgbImage};
use trellis_core::application::ports::GenerateRequest;

use super::{GeneratorError, attribute, attributes};

const MAX_DIMENSION: u32 = 10_000;
const DEFAULT_BACKGROUND: (u8, u8, u8) = (0xCC, 0xCC, 0xCC);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub format: ImageFormat,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            background: "#CCCCCC".to_string(),
            format: ImageFormat::Png,
        }
    }
}

impl ImageConfig {
    /// Defaults, then the file extension, then `config`, then `content`.
    pub fn from_request(request: &GenerateRequest<'_>) -> Self {
        let mut config = Self::default();
        let lower = request.file_name.to_ascii_lowercase();
        if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            config.format = ImageFormat::Jpeg;
        }
        for source in [request.config, request.content].into_iter().flatten() {
            config.apply(source);
        }
        config
    }

    fn apply(&mut self, source: &str) {
        let attrs = attributes(source);
        if let Some(w) = attribute(&attrs, "width").and_then(|v| v.trim().parse::<u32>().ok()) {
            self.width = w.clamp(1, MAX_DIMENSION);
        }
        if let Some(h) = attribute(&attrs, "height").and_then(|v| v.trim().parse::<u32>().ok()) {
            self.height = h.clamp(1, MAX_DIMENSION);
        }
        if let Some(bg) = attribute(&attrs, "background") {
            self.background = bg.trim().to_string();
        }
        match attribute(&attrs, "format").map(str::to_ascii_lowercase).as_deref() {
            Some("png") => self.format = ImageFormat::Png,
            Some("jpg" | "jpeg") => self.format = ImageFormat::Jpeg,
            _ => {}
        }
    }
}

/// `#RGB` or `#RRGGBB`, leading `#` optional.
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let r = channel(&hex[0..1].repeat(2))?;
            let g = channel(&hex[1..2].repeat(2))?;
            let b = channel(&hex[2..3].repeat(2))?;
            Some((r, g, b))
        }
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        _ => None,
    }
}

/// Encode a solid-colour image. An unparsable background falls back to grey.
pub fn generate_image(request: &GenerateRequest<'_>) -> Result<Vec<u8>, GeneratorError> {
    let config = ImageConfig::from_request(request);
    let (r, g, b) = parse_hex_color(&config.background).unwrap_or(DEFAULT_BACKGROUND);
    let img = RgbImage::from_pixel(config.width, config.height, Rgb([r, g, b]));

    let (encoding, format) = match config.format {
        ImageFormat::Png => (Encoding::Png, "PNG"),
        ImageFormat::Jpeg => (Encoding::Jpeg, "JPEG"),
    };
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, encoding)
        .map_err(|source| GeneratorError::Encode { format, source })?;
    Ok(buffer.into_inner())
}
