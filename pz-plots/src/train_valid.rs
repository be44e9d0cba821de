//! Training vs validation set comparison.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use pz_server::Catalog;

use crate::histogram::{finite_range, padded, union_range, Histogram};
use crate::render::{render, Layout};
use crate::{Figure, PlotError, Result};

/// Figure size in pixels.
pub const TRAIN_VALID_FIGURE_SIZE: (u32, u32) = (1200, 400);

/// Bins of the magnitude and redshift histograms.
pub const COMPARISON_BINS: usize = 10;

const TRAIN_COLOR: RGBColor = RGBColor(31, 119, 180);
const VALID_COLOR: RGBColor = RGBColor(255, 127, 14);

/// Catalog columns read by [`train_valid_plots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainValidFields {
    pub magnitude: String,
    pub redshift: String,
}

impl Default for TrainValidFields {
    fn default() -> Self {
        Self {
            magnitude: "mag_cModel_i".to_string(),
            redshift: "z".to_string(),
        }
    }
}

impl TrainValidFields {
    pub fn new(magnitude: impl Into<String>, redshift: impl Into<String>) -> Self {
        Self {
            magnitude: magnitude.into(),
            redshift: redshift.into(),
        }
    }
}

/// One data set as plotted.
struct Sample {
    label: &'static str,
    color: RGBColor,
    magnitude: Vec<f64>,
    redshift: Vec<f64>,
}

impl Sample {
    fn read(
        label: &'static str,
        color: RGBColor,
        catalog: &Catalog,
        fields: &TrainValidFields,
    ) -> Result<Self> {
        if catalog.is_empty() {
            return Err(PlotError::EmptyCatalog);
        }
        Ok(Self {
            label,
            color,
            magnitude: catalog.column_f64(&fields.magnitude)?,
            redshift: catalog.column_f64(&fields.redshift)?,
        })
    }

    fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.redshift
            .iter()
            .zip(&self.magnitude)
            .filter(|(z, mag)| z.is_finite() && mag.is_finite())
            .map(|(&z, &mag)| (z, mag))
    }
}

struct TrainValidLayout {
    samples: Vec<Sample>,
    magnitude_desc: String,
    magnitude_range: (f64, f64),
    redshift_range: (f64, f64),
}

impl TrainValidLayout {
    /// Histograms of one quantity for every sample over a shared range.
    fn histograms(
        &self,
        values: impl Fn(&Sample) -> &[f64],
        range: (f64, f64),
    ) -> Vec<(&Sample, Histogram)> {
        self.samples
            .iter()
            .filter_map(|sample| {
                Histogram::with_range(values(sample), COMPARISON_BINS, range)
                    .map(|hist| (sample, hist))
            })
            .collect()
    }
}

impl Layout for TrainValidLayout {
    fn size(&self) -> (u32, u32) {
        TRAIN_VALID_FIGURE_SIZE
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE)?;
        let panels = root.split_evenly((1, 3));

        let magnitudes = self.histograms(|s| s.magnitude.as_slice(), self.magnitude_range);
        draw_histograms(&panels[0], &self.magnitude_desc, &magnitudes)?;

        let redshifts = self.histograms(|s| s.redshift.as_slice(), self.redshift_range);
        draw_histograms(&panels[1], "redshift", &redshifts)?;

        let (z_min, z_max) = padded(self.redshift_range, 0.05);
        let (mag_min, mag_max) = padded(self.magnitude_range, 0.05);
        let mut chart = ChartBuilder::on(&panels[2])
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(z_min..z_max, mag_min..mag_max)?;
        chart
            .configure_mesh()
            .x_desc("redshift")
            .y_desc(self.magnitude_desc.as_str())
            .draw()?;
        for sample in &self.samples {
            let color = sample.color;
            chart
                .draw_series(
                    sample
                        .points()
                        .map(|point| Circle::new(point, 2, color.mix(0.5).filled())),
                )?
                .label(sample.label)
                .legend(move |(x, y)| Circle::new((x + 5, y), 3, color.filled()));
        }
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        Ok(())
    }
}

fn draw_histograms<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    x_desc: &str,
    histograms: &[(&Sample, Histogram)],
) -> Result<()> {
    // Histograms share one range, so any of them gives the x axis
    let Some((_, first)) = histograms.first() else {
        return Ok(());
    };
    let (x_min, x_max) = first.range();
    let counts_max = histograms
        .iter()
        .map(|(_, hist)| hist.max_count())
        .max()
        .unwrap_or(0)
        .max(1) as f64
        * 1.05;

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0.0..counts_max)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("counts")
        .draw()?;

    for (sample, hist) in histograms {
        let color = sample.color;
        chart
            .draw_series(hist.bins().map(|(left, right, count)| {
                Rectangle::new([(left, 0.0), (right, count as f64)], color.mix(0.5).filled())
            }))?
            .label(sample.label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

/// Compare a training set with a validation set.
///
/// Three panels: magnitude histograms, redshift histograms, and magnitude
/// against redshift. Either set may be omitted, not both.
pub fn train_valid_plots(
    train: Option<&Catalog>,
    valid: Option<&Catalog>,
    fields: &TrainValidFields,
    save_to: Option<&Path>,
) -> Result<Figure> {
    let mut samples = Vec::with_capacity(2);
    if let Some(train) = train {
        samples.push(Sample::read("train", TRAIN_COLOR, train, fields)?);
    }
    if let Some(valid) = valid {
        samples.push(Sample::read("valid", VALID_COLOR, valid, fields)?);
    }
    if samples.is_empty() {
        return Err(PlotError::NoData);
    }

    let magnitude_range = samples
        .iter()
        .map(|s| finite_range(&s.magnitude))
        .fold(None, union_range)
        .ok_or_else(|| PlotError::NoFiniteValues {
            column: fields.magnitude.clone(),
        })?;
    let redshift_range = samples
        .iter()
        .map(|s| finite_range(&s.redshift))
        .fold(None, union_range)
        .ok_or_else(|| PlotError::NoFiniteValues {
            column: fields.redshift.clone(),
        })?;

    log::debug!(
        "Train/valid plots: {}",
        samples
            .iter()
            .map(|s| format!("{} {} rows", s.label, s.magnitude.len()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    render(
        &TrainValidLayout {
            magnitude_desc: format!("magnitude {}", fields.magnitude),
            samples,
            magnitude_range,
            redshift_range,
        },
        save_to,
    )
}
