//! Decoded textures.
//!
//! This module provides [`TextureAsset`], an RGBA8 image decoded on the loading
//! side and handed to renderers untouched. Uploading it is the renderer's job.

use anyhow::*;
use image::{GenericImageView, ImageFormat, load_from_memory, load_from_memory_with_format};

/// How the texel values should be interpreted when sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColorSpace {
    #[default]
    Srgb,
    Linear,
}

/// A decoded RGBA8 image.
#[derive(Clone, Debug)]
pub struct TextureAsset {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub rgba: Vec<u8>,
}

impl TextureAsset {
    /// Decode a texture from encoded image bytes.
    ///
    /// `format` is an optional file extension hint (`"png"`, `"jpeg"`, ...). Without
    /// a hint the format is guessed from the bytes.
    pub fn from_bytes(bytes: &[u8], label: &str, format: Option<&str>) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            Some(format) => load_from_memory_with_format(bytes, format)?,
            None => load_from_memory(bytes)?,
        };
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            bail!("Texture {} has no pixels.", label);
        }
        Ok(Self {
            label: label.to_string(),
            width,
            height,
            color_space: ColorSpace::Srgb,
            rgba: img.to_rgba8().into_raw(),
        })
    }

    /// A single-colour texture, used as a stand-in by tests and renderers.
    pub fn solid(label: &str, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            label: label.to_string(),
            width,
            height,
            color_space: ColorSpace::Srgb,
            rgba: rgba.repeat((width * height) as usize),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = ((y * self.width + x) * 4) as usize;
        let px = self.rgba.get(start..start + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}
