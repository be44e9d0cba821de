//! Diagnostic plots for photo-z data products.
//!
//! Two fixed layouts over catalogs already fetched with `pz-server`:
//! [`specz_plots`] characterizes a spectroscopic redshift catalog and
//! [`train_valid_plots`] compares a training set with a validation set.
//! Figures are always rendered into memory and optionally written to disk
//! as PNG, or SVG when the path ends in `.svg`.

use std::path::PathBuf;

use plotters::drawing::DrawingAreaErrorKind;
use pz_server::CatalogError;
use thiserror::Error;

pub mod histogram;
mod render;
pub mod specz;
pub mod train_valid;

pub use histogram::Histogram;
pub use specz::{specz_plots, SpeczFields};
pub use train_valid::{train_valid_plots, TrainValidFields};

/// Errors raised while preparing or drawing a figure.
#[derive(Debug, Error)]
pub enum PlotError {
    /// The catalog has no rows.
    #[error("Catalog is empty, nothing to plot")]
    EmptyCatalog,

    /// Every value of a plotted column is NaN or infinite.
    #[error("Column '{column}' has no finite values")]
    NoFiniteValues { column: String },

    /// Neither a training nor a validation set was given.
    #[error("At least one of the training or validation sets is required")]
    NoData,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed to create directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backend failure while drawing or encoding.
    #[error("Rendering failed: {0}")]
    Render(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for PlotError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Render(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlotError>;

/// A rendered figure.
#[derive(Debug, Clone)]
pub struct Figure {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB pixels, 3 bytes each
    pub rgb: Vec<u8>,
    /// Where the figure was written, when requested
    pub saved_to: Option<PathBuf>,
}

impl Figure {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// RGB value at pixel (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 3) as usize;
        self.rgb
            .get(offset..offset + 3)
            .map(|p| [p[0], p[1], p[2]])
    }
}
