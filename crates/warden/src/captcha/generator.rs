//! CAPTCHA image generation.
//!
//! Renders the answer text with a TrueType font onto a noisy canvas and
//! encodes it as JPEG. Only the offline pool builder calls this; request
//! handlers serve pre-rendered images.

use ab_glyph::{FontVec, PxScale};
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{
    draw_cubic_bezier_curve_mut, draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use rand::Rng;
use std::io::Cursor;
use std::path::Path;

use warden_common::WardenError;
use warden_common::constants::captcha::{CHARSET, HEIGHT, TEXT_LENGTH, WIDTH};

/// A rendered CAPTCHA before it enters the pool
#[derive(Debug, Clone)]
pub struct RenderedCaptcha {
    /// Answer text (uppercase)
    pub text: String,
    /// JPEG-encoded image
    pub jpeg: Vec<u8>,
}

/// Produces CAPTCHA images for the pool builder
pub trait CaptchaRenderer: Send + Sync {
    fn render(&self) -> Result<RenderedCaptcha, WardenError>;
}

/// Font-based CAPTCHA renderer
pub struct GlyphRenderer {
    font: FontVec,
    width: u32,
    height: u32,
    length: usize,
}

impl GlyphRenderer {
    /// Load the font at `path`; 320x100 canvas, 6 characters
    pub fn from_file(path: &Path) -> Result<Self, WardenError> {
        let bytes = std::fs::read(path)
            .map_err(|e| WardenError::Captcha(format!("font {}: {e}", path.display())))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| WardenError::Captcha(format!("font {}: {e}", path.display())))?;

        Ok(Self {
            font,
            width: WIDTH,
            height: HEIGHT,
            length: TEXT_LENGTH,
        })
    }

    fn draw(&self, text: &str, rng: &mut impl Rng) -> RgbImage {
        let background = Rgb([
            rng.random_range(225..=255),
            rng.random_range(225..=255),
            rng.random_range(225..=255),
        ]);
        let mut img: RgbImage = ImageBuffer::from_pixel(self.width, self.height, background);

        let (w, h) = (self.width as f32, self.height as f32);

        // Curves behind the text
        for _ in 0..4 {
            let color = random_dark(rng);
            draw_cubic_bezier_curve_mut(
                &mut img,
                (0.0, rng.random_range(0.0..h)),
                (w, rng.random_range(0.0..h)),
                (rng.random_range(0.0..w), rng.random_range(0.0..h)),
                (rng.random_range(0.0..w), rng.random_range(0.0..h)),
                color,
            );
        }

        let slot = w / (text.len() as f32 + 1.0);
        for (i, ch) in text.chars().enumerate() {
            let size = rng.random_range(52.0..68.0);
            let x = slot * (i as f32 + 0.5) + rng.random_range(-6.0..6.0);
            let y = h / 2.0 + rng.random_range(-10.0..10.0);
            let rotation = rng.random_range(-25.0f32..25.0);
            let color = random_dark(rng);
            self.draw_glyph(&mut img, ch, (x, y), size, rotation, color, background);
        }

        // Strike-through lines and speckle over the text
        for _ in 0..3 {
            draw_line_segment_mut(
                &mut img,
                (0.0, rng.random_range(0.0..h)),
                (w, rng.random_range(0.0..h)),
                random_dark(rng),
            );
        }
        for _ in 0..120 {
            let center = (
                rng.random_range(0..self.width as i32),
                rng.random_range(0..self.height as i32),
            );
            draw_filled_circle_mut(&mut img, center, rng.random_range(0..2), random_dark(rng));
        }

        img
    }

    /// Draw one rotated glyph centered at `center`
    #[allow(clippy::too_many_arguments)]
    fn draw_glyph(
        &self,
        img: &mut RgbImage,
        ch: char,
        center: (f32, f32),
        size: f32,
        rotation_deg: f32,
        color: Rgb<u8>,
        background: Rgb<u8>,
    ) {
        let side = (size * 1.6) as u32;
        let mut scratch: RgbImage = ImageBuffer::from_pixel(side, side, background);
        let offset = (side as f32 - size) as i32 / 2;
        draw_text_mut(
            &mut scratch,
            color,
            offset,
            offset,
            PxScale::from(size),
            &self.font,
            &ch.to_string(),
        );

        let rotated = rotate_about_center(
            &scratch,
            rotation_deg.to_radians(),
            Interpolation::Bilinear,
            background,
        );

        let half = side as i32 / 2;
        let (cx, cy) = (center.0 as i32, center.1 as i32);
        let (width, height) = img.dimensions();

        for (sx, sy, pixel) in rotated.enumerate_pixels() {
            if *pixel == background {
                continue;
            }
            let gx = cx + sx as i32 - half;
            let gy = cy + sy as i32 - half;
            if gx >= 0 && gy >= 0 && (gx as u32) < width && (gy as u32) < height {
                img.put_pixel(gx as u32, gy as u32, *pixel);
            }
        }
    }
}

impl CaptchaRenderer for GlyphRenderer {
    fn render(&self) -> Result<RenderedCaptcha, WardenError> {
        let mut rng = rand::rng();
        let text = random_text(&mut rng, self.length);
        let img = self.draw(&text, &mut rng);

        Ok(RenderedCaptcha {
            text,
            jpeg: encode_jpeg(&img)?,
        })
    }
}

/// Encode an RGB image as JPEG
pub fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>, WardenError> {
    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), ImageFormat::Jpeg)
        .map_err(|e| WardenError::Captcha(format!("JPEG encode failed: {e}")))?;
    Ok(data)
}

/// Random answer text from the CAPTCHA character set
pub fn random_text(rng: &mut impl Rng, length: usize) -> String {
    (0..length)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

fn random_dark(rng: &mut impl Rng) -> Rgb<u8> {
    Rgb([
        rng.random_range(0..140),
        rng.random_range(0..140),
        rng.random_range(0..140),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_common::constants::DEFAULT_FONT_PATH;

    #[test]
    fn test_random_text() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let text = random_text(&mut rng, TEXT_LENGTH);
            assert_eq!(text.len(), 6);
            assert!(text.bytes().all(|b| CHARSET.contains(&b)));
            assert_eq!(text, text.to_uppercase());
        }
    }

    #[test]
    fn test_encode_jpeg() {
        let img: RgbImage = ImageBuffer::from_pixel(32, 16, Rgb([200, 10, 10]));
        let jpeg = encode_jpeg(&img).unwrap();
        // SOI marker
        assert_eq!(&jpeg[..2], &[0xff, 0xd8]);
    }

    #[test]
    fn test_missing_font() {
        let result = GlyphRenderer::from_file(Path::new("/nonexistent/font.ttf"));
        assert!(matches!(result, Err(WardenError::Captcha(_))));
    }

    #[test]
    fn test_glyph_renderer() {
        let path = Path::new(DEFAULT_FONT_PATH);
        if !path.exists() {
            // Font package not installed on this host
            return;
        }

        let renderer = GlyphRenderer::from_file(path).unwrap();
        let captcha = renderer.render().unwrap();
        assert_eq!(captcha.text.len(), TEXT_LENGTH);

        let decoded = image::load_from_memory_with_format(&captcha.jpeg, ImageFormat::Jpeg)
            .unwrap();
        assert_eq!(decoded.width(), WIDTH);
        assert_eq!(decoded.height(), HEIGHT);
    }
}
