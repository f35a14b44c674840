//! PNG copies of the SVG diagrams, for platforms that refuse SVG attachments.

use std::fs;
use std::path::Path;

use resvg::{tiny_skia, usvg};

use crate::error::ExportError;

/// Output pixels per diagram pixel.
pub const PNG_SCALE: f32 = 2.0;

/// Renders SVG documents to PNG.
///
/// System fonts are loaded once; the piece glyphs and titles are text.
pub struct Rasterizer {
    options: usvg::Options<'static>,
    scale: f32,
}

impl Rasterizer {
    pub fn new(scale: f32) -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        Self { options, scale }
    }

    /// Rasterize `svg` and write it to `path`.
    pub fn write(&self, svg: &str, path: &Path) -> Result<(), ExportError> {
        let bytes = self.render(svg).map_err(|reason| ExportError::Png {
            path: path.to_path_buf(),
            reason,
        })?;
        fs::write(path, bytes).map_err(ExportError::io(path))
    }

    fn render(&self, svg: &str) -> Result<Vec<u8>, String> {
        let tree = usvg::Tree::from_str(svg, &self.options).map_err(|e| e.to_string())?;
        let size = tree
            .size()
            .to_int_size()
            .scale_by(self.scale)
            .ok_or_else(|| format!("cannot scale {:?} by {}", tree.size(), self.scale))?;
        let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
            .ok_or_else(|| format!("cannot allocate {}x{} pixmap", size.width(), size.height()))?;
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(self.scale, self.scale),
            &mut pixmap.as_mut(),
        );
        pixmap.encode_png().map_err(|e| e.to_string())
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(PNG_SCALE)
    }
}
