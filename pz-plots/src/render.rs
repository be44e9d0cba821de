//! Backend selection: every figure is drawn into an RGB buffer, and drawn
//! again into a PNG or SVG file when a path is given.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::{Figure, PlotError, Result};

/// A figure layout that can be drawn on any backend.
pub(crate) trait Layout {
    fn size(&self) -> (u32, u32);

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>;
}

pub(crate) fn render<L: Layout>(layout: &L, save_to: Option<&Path>) -> Result<Figure> {
    let (width, height) = layout.size();
    let mut rgb = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (width, height)).into_drawing_area();
        layout.draw(&root)?;
        root.present()?;
    }

    let saved_to = match save_to {
        Some(path) => {
            save(layout, path)?;
            log::info!("Figure saved as: {}", path.display());
            Some(path.to_path_buf())
        }
        None => None,
    };

    Ok(Figure {
        width,
        height,
        rgb,
        saved_to,
    })
}

fn save<L: Layout>(layout: &L, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PlotError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    if is_svg {
        let root = SVGBackend::new(path, layout.size()).into_drawing_area();
        layout.draw(&root)?;
        root.present()?;
    } else {
        let root = BitMapBackend::new(path, layout.size()).into_drawing_area();
        layout.draw(&root)?;
        root.present()?;
    }
    Ok(())
}
