use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use anyhow::{Context, Result};
use percept_core::Scene;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tiny_skia::{
    Color, FilterQuality, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint,
    PremultipliedColorU8, Stroke, Transform,
};

/// Fraction of the horizontal resolution an image stimulus occupies.
pub const STIMULUS_WIDTH_FRACTION: f32 = 0.35;

const PROMPT_SIZE_PX: f32 = 28.0;
const CROSS_ARM_PX: f32 = 20.0;
const CROSS_STROKE_PX: f32 = 2.0;

/// Rasterizes scenes into the frame pixmap.
///
/// Decoded stimulus images and rasterized prompt text are cached across
/// frames; the caches survive a resize because images are stored at native
/// resolution and scaled at blit time.
pub struct StimulusRenderer {
    width: u32,
    height: u32,
    center_x: f32,
    center_y: f32,
    font: FontVec,
    prompts: HashMap<&'static str, Pixmap>,
    images: HashMap<PathBuf, Pixmap>,
}

impl StimulusRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let font = crate::font::load_default()?;
        Ok(Self {
            width,
            height,
            center_x: width as f32 / 2.0,
            center_y: height as f32 / 2.0,
            font,
            prompts: HashMap::new(),
            images: HashMap::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.center_x = width as f32 / 2.0;
        self.center_y = height as f32 / 2.0;
    }

    /// Render a complete frame for the given scene.
    pub fn render_frame(&mut self, pixmap: &mut Pixmap, scene: &Scene<'_>) -> Result<()> {
        pixmap.fill(Color::BLACK);

        match scene {
            Scene::StartPrompt => self.draw_prompt(pixmap, "Press any key to start"),
            Scene::ExitPrompt => self.draw_prompt(pixmap, "Press any key to exit"),
            Scene::Fixation => self.draw_fixation_cross(pixmap),
            Scene::Image(path) => self.draw_image(pixmap, path),
            Scene::Blank => Ok(()),
        }
    }

    fn draw_fixation_cross(&self, pixmap: &mut Pixmap) -> Result<()> {
        let mut paint = Paint::default();
        paint.set_color(Color::WHITE);
        paint.anti_alias = true;

        let mut path = PathBuilder::new();
        path.move_to(self.center_x - CROSS_ARM_PX, self.center_y);
        path.line_to(self.center_x + CROSS_ARM_PX, self.center_y);
        path.move_to(self.center_x, self.center_y - CROSS_ARM_PX);
        path.line_to(self.center_x, self.center_y + CROSS_ARM_PX);
        let cross = path.finish().context("fixation cross path")?;

        let stroke = Stroke {
            width: CROSS_STROKE_PX,
            ..Stroke::default()
        };
        pixmap.stroke_path(&cross, &paint, &stroke, Transform::identity(), None);
        Ok(())
    }

    /// Blit the stimulus centered at 35% of the horizontal resolution,
    /// aspect preserved. Decode failures halt the run.
    fn draw_image(&mut self, pixmap: &mut Pixmap, path: &Path) -> Result<()> {
        if !self.images.contains_key(path) {
            let decoded = decode_premultiplied(path)?;
            self.images.insert(path.to_path_buf(), decoded);
        }
        let Some(src) = self.images.get(path) else {
            return Ok(());
        };

        let (scale, w, h) = scaled_dims(self.width, src.width(), src.height());
        let tx = self.center_x - w / 2.0;
        let ty = self.center_y - h / 2.0;
        let transform = Transform::from_row(scale, 0.0, 0.0, scale, tx, ty);

        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        pixmap.draw_pixmap(0, 0, src.as_ref(), &paint, transform, None);
        Ok(())
    }

    fn draw_prompt(&mut self, pixmap: &mut Pixmap, text: &'static str) -> Result<()> {
        if !self.prompts.contains_key(text) {
            let rendered = render_text_pixmap(&self.font, text, PROMPT_SIZE_PX, Color::WHITE)?;
            self.prompts.insert(text, rendered);
        }
        let Some(rendered) = self.prompts.get(text) else {
            return Ok(());
        };

        let x = (self.center_x - rendered.width() as f32 / 2.0) as i32;
        let y = (self.center_y - rendered.height() as f32 / 2.0) as i32;
        pixmap.draw_pixmap(
            x,
            y,
            rendered.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }
}

/// Uniform scale factor and final size for a stimulus image.
pub fn scaled_dims(display_width: u32, img_w: u32, img_h: u32) -> (f32, f32, f32) {
    let target_w = display_width as f32 * STIMULUS_WIDTH_FRACTION;
    let scale = target_w / img_w as f32;
    (scale, target_w, img_h as f32 * scale)
}

/// Decode an image file into the premultiplied RGBA layout tiny-skia blits.
fn decode_premultiplied(path: &Path) -> Result<Pixmap> {
    let decoded = image::open(path)
        .with_context(|| format!("cannot decode image {}", path.display()))?
        .into_rgba8();
    let (w, h) = decoded.dimensions();
    let mut data = decoded.into_raw();

    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a < 255 {
            px[0] = ((px[0] as u16 * a) / 255) as u8;
            px[1] = ((px[1] as u16 * a) / 255) as u8;
            px[2] = ((px[2] as u16 * a) / 255) as u8;
        }
    }

    let size = IntSize::from_wh(w, h).context("zero-sized image")?;
    Pixmap::from_vec(data, size).context("image buffer size mismatch")
}

/// Rasterize a line of text into a tight transparent pixmap, baseline laid
/// out with kerning.
pub fn render_text_pixmap(
    font: &FontVec,
    text: &str,
    size_px: f32,
    color: Color,
) -> Result<Pixmap> {
    let scale = PxScale::from(size_px);
    let scaled = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += scaled.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, scaled.ascent()),
        });
        pen_x += scaled.h_advance(id);
    }

    // Union of the outlined pixel bounds.
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for glyph in &glyphs {
        if let Some(outlined) = font.outline_glyph(glyph.clone()) {
            let b = outlined.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }
    if min_x == f32::INFINITY {
        // Nothing outlines (e.g. all whitespace).
        return Pixmap::new(1, 1).context("text pixmap");
    }

    let left = min_x.floor();
    let top = min_y.floor();
    let w = (max_x.ceil() - left).max(1.0) as u32;
    let h = (max_y.ceil() - top).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h).context("text pixmap")?;

    let cu8 = color.to_color_u8();
    let (cr, cg, cb, ca) = (cu8.red(), cu8.green(), cu8.blue(), cu8.alpha());

    let pixels = pm.pixels_mut();
    for glyph in glyphs {
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        let ox = (bounds.min.x - left) as i32;
        let oy = (bounds.min.y - top) as i32;
        outlined.draw(|x, y, coverage| {
            if coverage <= 0.0 {
                return;
            }
            let px = ox + x as i32;
            let py = oy + y as i32;
            if px < 0 || py < 0 || px >= w as i32 || py >= h as i32 {
                return;
            }
            let a = (coverage * ca as f32) as u8;
            let c = PremultipliedColorU8::from_rgba(
                ((cr as f32 / 255.0 * a as f32) as u8).min(a),
                ((cg as f32 / 255.0 * a as f32) as u8).min(a),
                ((cb as f32 / 255.0 * a as f32) as u8).min(a),
                a,
            );
            if let Some(c) = c {
                pixels[py as usize * w as usize + px as usize] = c;
            }
        });
    }

    Ok(pm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_targets_35_percent_of_the_display_width() {
        let (scale, w, h) = scaled_dims(1920, 800, 600);
        assert!((w - 672.0).abs() < f32::EPSILON);
        assert!((scale - 0.84).abs() < 1e-6);
        assert!((h - 504.0).abs() < 1e-3);
    }

    #[test]
    fn scaling_preserves_aspect_ratio() {
        let (_, w, h) = scaled_dims(800, 400, 200);
        assert!((w / h - 2.0).abs() < 1e-6);
        let (_, w, h) = scaled_dims(800, 100, 300);
        assert!((h / w - 3.0).abs() < 1e-6);
    }
}
