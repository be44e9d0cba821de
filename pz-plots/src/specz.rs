//! Spec-z catalog characterization: sky positions and redshift distribution.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use pz_server::{Catalog, SpeczCatalog};

use crate::histogram::{finite_range, padded, Histogram};
use crate::render::{render, Layout};
use crate::{Figure, PlotError, Result};

/// Figure size in pixels.
pub const SPECZ_FIGURE_SIZE: (u32, u32) = (900, 400);

/// Bins of the redshift histogram.
pub const REDSHIFT_BINS: usize = 30;

/// Catalog columns read by [`specz_plots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeczFields {
    pub ra: String,
    pub dec: String,
    pub redshift: String,
}

impl Default for SpeczFields {
    fn default() -> Self {
        Self {
            ra: "ra".to_string(),
            dec: "dec".to_string(),
            redshift: "redshift".to_string(),
        }
    }
}

impl SpeczFields {
    pub fn new(ra: impl Into<String>, dec: impl Into<String>, redshift: impl Into<String>) -> Self {
        Self {
            ra: ra.into(),
            dec: dec.into(),
            redshift: redshift.into(),
        }
    }

    /// Field names from the catalog's column associations, defaulting where
    /// the owner registered none.
    pub fn from_catalog(catalog: &SpeczCatalog) -> Self {
        let defaults = Self::default();
        Self {
            ra: catalog.ra_column().unwrap_or(defaults.ra),
            dec: catalog.dec_column().unwrap_or(defaults.dec),
            redshift: catalog.redshift_column().unwrap_or(defaults.redshift),
        }
    }
}

struct SpeczLayout {
    positions: Vec<(f64, f64)>,
    ra_range: (f64, f64),
    dec_range: (f64, f64),
    redshift: Histogram,
}

impl Layout for SpeczLayout {
    fn size(&self) -> (u32, u32) {
        SPECZ_FIGURE_SIZE
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE)?;
        let panels = root.split_evenly((1, 2));

        let (ra_min, ra_max) = padded(self.ra_range, 0.05);
        let (dec_min, dec_max) = padded(self.dec_range, 0.05);
        let mut sky = ChartBuilder::on(&panels[0])
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(ra_min..ra_max, dec_min..dec_max)?;
        sky.configure_mesh()
            .x_desc("R.A. (deg)")
            .y_desc("Dec. (deg)")
            .draw()?;
        sky.draw_series(
            self.positions
                .iter()
                .map(|&position| Circle::new(position, 2, BLUE.mix(0.6).filled())),
        )?;

        let (z_min, z_max) = self.redshift.range();
        let counts_max = self.redshift.max_count().max(1) as f64 * 1.05;
        let mut hist = ChartBuilder::on(&panels[1])
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(z_min..z_max, 0.0..counts_max)?;
        hist.configure_mesh()
            .x_desc("redshift")
            .y_desc("counts")
            .draw()?;
        hist.draw_series(self.redshift.bins().map(|(left, right, count)| {
            Rectangle::new([(left, 0.0), (right, count as f64)], BLUE.mix(0.7).filled())
        }))?;

        Ok(())
    }
}

/// Basic plots characterizing a spec-z catalog.
///
/// Left panel: R.A. vs Dec. scatter. Right panel: redshift histogram with
/// [`REDSHIFT_BINS`] bins. Rows with a non-finite value are skipped.
pub fn specz_plots(
    catalog: &Catalog,
    fields: &SpeczFields,
    save_to: Option<&Path>,
) -> Result<Figure> {
    if catalog.is_empty() {
        return Err(PlotError::EmptyCatalog);
    }

    let ra = catalog.column_f64(&fields.ra)?;
    let dec = catalog.column_f64(&fields.dec)?;
    let redshift = catalog.column_f64(&fields.redshift)?;

    let positions: Vec<(f64, f64)> = ra
        .iter()
        .zip(&dec)
        .filter(|(ra, dec)| ra.is_finite() && dec.is_finite())
        .map(|(&ra, &dec)| (ra, dec))
        .collect();
    let ra_range = finite_range(&ra).ok_or_else(|| no_finite(&fields.ra))?;
    let dec_range = finite_range(&dec).ok_or_else(|| no_finite(&fields.dec))?;
    let redshift =
        Histogram::new(&redshift, REDSHIFT_BINS).ok_or_else(|| no_finite(&fields.redshift))?;

    log::debug!(
        "Spec-z plots: {} positions, {} redshifts",
        positions.len(),
        redshift.total()
    );

    render(
        &SpeczLayout {
            positions,
            ra_range,
            dec_range,
            redshift,
        },
        save_to,
    )
}

fn no_finite(column: &str) -> PlotError {
    PlotError::NoFiniteValues {
        column: column.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pz_server::ProductMetadata;
    use serde_json::json;

    #[test]
    fn test_fields_from_column_associations() {
        let metadata: ProductMetadata = serde_json::from_value(json!({
            "id": 1,
            "main_file": {
                "name": "specz.csv",
                "columns_association": [
                    {"column_name": "RA_J2000", "ucd": "pos.eq.ra;meta.main", "alias": "ra"},
                    {"column_name": "Z_BEST", "ucd": "src.redshift", "alias": "z"},
                ],
            },
        }))
        .unwrap();
        let catalog = SpeczCatalog::new(Catalog::default(), metadata);

        let fields = SpeczFields::from_catalog(&catalog);
        assert_eq!(fields, SpeczFields::new("RA_J2000", "dec", "Z_BEST"));
    }
}
