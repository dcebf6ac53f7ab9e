//! Vector PDF drawing backend for plotters
//!
//! Backend coordinates are pixels at a fixed resolution with the origin in the
//! top-left corner, as plotters expects. Every primitive is written as a vector
//! path or text object on a single `printpdf` page whose physical size is
//! `pixels / dpi` inches. Text uses the built-in Helvetica face and is measured
//! with its standard advance widths, so no system fonts are needed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use plotters_backend::text_anchor::{HPos, VPos};
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
    FontTransform,
};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Polygon, Pt, Rgb, TextMatrix,
};

const POINTS_PER_INCH: f64 = 72.0;
const MM_PER_INCH: f64 = 25.4;

/// Helvetica ascender and descender, in em.
const ASCENT: f64 = 0.718;
const DESCENT: f64 = 0.207;

/// Helvetica advance widths for ASCII 0x20..=0x7E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];
const FALLBACK_WIDTH: u16 = 556;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("PDF document error: {0}")]
    Document(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF document was already written")]
    Presented,
}

/// Width and height, in backend pixels, of `text` set in Helvetica at `size` pixels.
pub fn text_extent(text: &str, size: f64) -> (f64, f64) {
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (0x20..=0x7E).contains(&code) {
                u32::from(HELVETICA_WIDTHS[(code - 0x20) as usize])
            } else {
                u32::from(FALLBACK_WIDTH)
            }
        })
        .sum();
    (f64::from(units) * size / 1000.0, (ASCENT + DESCENT) * size)
}

pub struct PdfBackend {
    path: PathBuf,
    size: (u32, u32),
    dpi: f64,
    doc: Option<PdfDocumentReference>,
    layer: PdfLayerReference,
    font: IndirectFontRef,
}

impl PdfBackend {
    /// Single-page document of `size` pixels at `dpi`, written to `path` on present.
    pub fn new(path: &Path, size: (u32, u32), dpi: f64) -> Result<Self, PdfError> {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "figure".to_string());
        let width = Mm((f64::from(size.0) / dpi * MM_PER_INCH) as f32);
        let height = Mm((f64::from(size.1) / dpi * MM_PER_INCH) as f32);

        let (doc, page, layer) = PdfDocument::new(title, width, height, "figure");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::Document(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            path: path.to_path_buf(),
            size,
            dpi,
            doc: Some(doc),
            layer,
            font,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_open(&self) -> Result<(), DrawingErrorKind<PdfError>> {
        if self.doc.is_some() {
            Ok(())
        } else {
            Err(DrawingErrorKind::DrawingError(PdfError::Presented))
        }
    }

    fn px_to_pt(&self, px: f64) -> f64 {
        px * POINTS_PER_INCH / self.dpi
    }

    fn point(&self, (x, y): (f64, f64)) -> Point {
        Point::new(
            Mm((x / self.dpi * MM_PER_INCH) as f32),
            Mm(((f64::from(self.size.1) - y) / self.dpi * MM_PER_INCH) as f32),
        )
    }

    fn coord(&self, (x, y): BackendCoord) -> Point {
        self.point((f64::from(x), f64::from(y)))
    }

    fn set_stroke<S: BackendStyle>(&self, style: &S) {
        self.layer.set_outline_color(pdf_color(&style.color()));
        self.layer
            .set_outline_thickness(self.px_to_pt(f64::from(style.stroke_width())) as f32);
    }

    fn stroke_points(&self, points: Vec<Point>, closed: bool) {
        if points.len() < 2 {
            return;
        }
        self.layer.add_line(Line {
            points: points.into_iter().map(|p| (p, false)).collect(),
            is_closed: closed,
        });
    }

    fn fill_points(&self, points: Vec<Point>, color: &BackendColor) {
        if points.len() < 3 {
            return;
        }
        self.layer.set_fill_color(pdf_color(color));
        self.layer.add_polygon(Polygon {
            rings: vec![points.into_iter().map(|p| (p, false)).collect()],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }
}

/// PDF has no per-object alpha without extended graphics states; the page is
/// always white, so translucent colours are pre-blended against white.
fn pdf_color(color: &BackendColor) -> Color {
    let alpha = color.alpha.clamp(0.0, 1.0);
    let blend = |c: u8| ((alpha * f64::from(c) + (1.0 - alpha) * 255.0) / 255.0) as f32;
    let (r, g, b) = color.rgb;
    Color::Rgb(Rgb::new(blend(r), blend(g), blend(b), None))
}

impl DrawingBackend for PdfBackend {
    type ErrorType = PdfError;

    fn get_size(&self) -> (u32, u32) {
        self.size
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<PdfError>> {
        self.check_open()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<PdfError>> {
        let Some(doc) = self.doc.take() else {
            return Ok(());
        };

        let file = File::create(&self.path).map_err(|source| {
            DrawingErrorKind::DrawingError(PdfError::Io {
                path: self.path.clone(),
                source,
            })
        })?;
        let mut writer = BufWriter::new(file);
        doc.save(&mut writer)
            .map_err(|e| DrawingErrorKind::DrawingError(PdfError::Document(e.to_string())))?;
        writer.flush().map_err(|source| {
            DrawingErrorKind::DrawingError(PdfError::Io {
                path: self.path.clone(),
                source,
            })
        })?;

        tracing::debug!(path = %self.path.display(), "PDF document written");
        Ok(())
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<PdfError>> {
        self.check_open()?;
        if color.alpha == 0.0 {
            return Ok(());
        }
        let (x, y) = (f64::from(point.0), f64::from(point.1));
        let square = vec![
            self.point((x, y)),
            self.point((x + 1.0, y)),
            self.point((x + 1.0, y + 1.0)),
            self.point((x, y + 1.0)),
        ];
        self.fill_points(square, &color);
        Ok(())
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<PdfError>> {
        self.check_open()?;
        if style.color().alpha == 0.0 {
            return Ok(());
        }
        self.set_stroke(style);
        self.stroke_points(vec![self.coord(from), self.coord(to)], false);
        Ok(())
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<PdfError>> {
        self.check_open()?;
        let color = style.color();
        if color.alpha == 0.0 {
            return Ok(());
        }
        let corners = vec![
            self.coord(upper_left),
            self.coord((bottom_right.0, upper_left.1)),
            self.coord(bottom_right),
            self.coord((upper_left.0, bottom_right.1)),
        ];
        if fill {
            self.fill_points(corners, &color);
        } else {
            self.set_stroke(style);
            self.stroke_points(corners, true);
        }
        Ok(())
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<PdfError>> {
        self.check_open()?;
        if style.color().alpha == 0.0 {
            return Ok(());
        }
        let points: Vec<Point> = path.into_iter().map(|c| self.coord(c)).collect();
        self.set_stroke(style);
        self.stroke_points(points, false);
        Ok(())
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<PdfError>> {
        self.check_open()?;
        let color = style.color();
        if color.alpha == 0.0 {
            return Ok(());
        }
        const SEGMENTS: usize = 36;
        let (cx, cy, r) = (f64::from(center.0), f64::from(center.1), f64::from(radius));
        let ring: Vec<Point> = (0..SEGMENTS)
            .map(|k| {
                let a = std::f64::consts::TAU * k as f64 / SEGMENTS as f64;
                self.point((cx + r * a.cos(), cy + r * a.sin()))
            })
            .collect();
        if fill {
            self.fill_points(ring, &color);
        } else {
            self.set_stroke(style);
            self.stroke_points(ring, true);
        }
        Ok(())
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<PdfError>> {
        self.check_open()?;
        let color = style.color();
        if color.alpha == 0.0 {
            return Ok(());
        }
        let points: Vec<Point> = vert.into_iter().map(|c| self.coord(c)).collect();
        self.fill_points(points, &color);
        Ok(())
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<PdfError>> {
        self.check_open()?;
        let color = style.color();
        if color.alpha == 0.0 || text.trim().is_empty() {
            return Ok(());
        }

        let size = style.size();
        let (width, height) = text_extent(text, size);

        // Baseline origin relative to the anchor, in the text's own frame
        // (x along the reading direction, y downwards).
        let dx = match style.anchor().h_pos {
            HPos::Left => 0.0,
            HPos::Center => -width / 2.0,
            HPos::Right => -width,
        };
        let dy = match style.anchor().v_pos {
            VPos::Top => ASCENT * size,
            VPos::Center => ASCENT * size - height / 2.0,
            VPos::Bottom => -DESCENT * size,
        };
        let (ox, oy, angle) = match style.transform() {
            FontTransform::None => (dx, dy, 0.0),
            FontTransform::Rotate90 => (-dy, dx, -90.0),
            FontTransform::Rotate180 => (-dx, -dy, 180.0),
            FontTransform::Rotate270 => (dy, -dx, 90.0),
        };

        let x = f64::from(pos.0) + ox;
        let y = f64::from(pos.1) + oy;
        let x_pt = self.px_to_pt(x);
        let y_pt = self.px_to_pt(f64::from(self.size.1) - y);

        self.layer.set_fill_color(pdf_color(&color));
        self.layer.begin_text_section();
        self.layer.set_font(&self.font, self.px_to_pt(size) as f32);
        self.layer.set_text_matrix(TextMatrix::TranslateRotate(
            Pt(x_pt as f32),
            Pt(y_pt as f32),
            angle,
        ));
        self.layer.write_text(text, &self.font);
        self.layer.end_text_section();
        Ok(())
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<PdfError>> {
        let (width, height) = text_extent(text, style.size());
        let (width, height) = match style.transform() {
            FontTransform::Rotate90 | FontTransform::Rotate270 => (height, width),
            FontTransform::None | FontTransform::Rotate180 => (width, height),
        };
        Ok((width.ceil() as u32, height.ceil() as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stroke(u32);

    impl BackendStyle for Stroke {
        fn color(&self) -> BackendColor {
            BackendColor {
                alpha: 1.0,
                rgb: (0, 0, 0),
            }
        }

        fn stroke_width(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_text_extent_uses_helvetica_widths() {
        let (w, h) = text_extent("0.00", 1000.0);
        assert_eq!(w, 556.0 * 3.0 + 278.0);
        assert!((h - 925.0).abs() < 1e-9);
        assert_eq!(text_extent("", 10.0).0, 0.0);
    }

    #[test]
    fn test_non_ascii_falls_back_to_digit_width() {
        assert_eq!(text_extent("\u{2605}", 1000.0).0, 556.0);
    }

    #[test]
    fn test_pdf_color_blends_alpha_against_white() {
        let translucent = BackendColor {
            alpha: 0.0,
            rgb: (0, 0, 0),
        };
        match pdf_color(&translucent) {
            Color::Rgb(rgb) => assert_eq!((rgb.r, rgb.g, rgb.b), (1.0, 1.0, 1.0)),
            _ => panic!("expected an RGB colour"),
        }
    }

    #[test]
    fn test_present_writes_pdf_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backend.pdf");
        let mut backend = PdfBackend::new(&path, (400, 300), 100.0).unwrap();
        assert_eq!(backend.path(), path.as_path());
        assert_eq!(backend.get_size(), (400, 300));

        backend.ensure_prepared().unwrap();
        backend.draw_line((10, 10), (390, 290), &Stroke(2)).unwrap();
        backend
            .draw_rect((20, 20), (80, 60), &Stroke(1), true)
            .unwrap();
        backend
            .draw_path(vec![(0, 0), (50, 20), (100, 0)], &Stroke(1))
            .unwrap();
        backend.draw_circle((200, 150), 12, &Stroke(1), false).unwrap();
        backend.present().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        // Second present is a no-op, further drawing is refused.
        backend.present().unwrap();
        assert!(backend.draw_line((0, 0), (1, 1), &Stroke(1)).is_err());
        assert!(backend.ensure_prepared().is_err());
    }

    #[test]
    fn test_present_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("backend.pdf");
        let mut backend = PdfBackend::new(&path, (100, 100), 100.0).unwrap();
        match backend.present() {
            Err(DrawingErrorKind::DrawingError(PdfError::Io { path: p, .. })) => {
                assert_eq!(p, path)
            }
            _ => panic!("expected an I/O error"),
        }
    }
}
