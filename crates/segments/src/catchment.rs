//! Segment and catchment statistics
//!
//! Summaries reduce a value raster over each segment's own pixels
//! ([`Segments::summary`]) or over everything draining to each segment's
//! outlet ([`Segments::catchment_summary`]).
//!
//! Sums and means over catchments are incremental: every grid pixel is
//! labelled with the segment owning the first stream pixel on its flow path,
//! aggregates are computed per label, then merged into the segment each
//! outlet drains into, upstream first. Every pixel is visited a constant
//! number of times regardless of how many catchments it belongs to.
//!
//! Order statistics (min, max, median, std, var) need the full value set, so
//! each catchment is materialized. This is expensive on large grids; use
//! `terminal_only` where possible.

use crate::flowpath::{self, Hit};
use crate::network::{SegmentId, Segments};
use std::fmt;
use std::str::FromStr;
use streamnet_core::{AreaUnits, Error, Raster, RasterElement, Result};
use tracing::debug;

/// Statistics available for summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    /// Value at the segment outlet
    Outlet,
    Min,
    Max,
    Mean,
    Median,
    /// Population standard deviation
    Std,
    Sum,
    /// Population variance
    Var,
    NanMin,
    NanMax,
    NanMean,
    NanMedian,
    NanStd,
    NanSum,
    NanVar,
}

impl Statistic {
    /// Every supported statistic
    pub const ALL: [Statistic; 15] = [
        Statistic::Outlet,
        Statistic::Min,
        Statistic::Max,
        Statistic::Mean,
        Statistic::Median,
        Statistic::Std,
        Statistic::Sum,
        Statistic::Var,
        Statistic::NanMin,
        Statistic::NanMax,
        Statistic::NanMean,
        Statistic::NanMedian,
        Statistic::NanStd,
        Statistic::NanSum,
        Statistic::NanVar,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Statistic::Outlet => "outlet",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Std => "std",
            Statistic::Sum => "sum",
            Statistic::Var => "var",
            Statistic::NanMin => "nanmin",
            Statistic::NanMax => "nanmax",
            Statistic::NanMean => "nanmean",
            Statistic::NanMedian => "nanmedian",
            Statistic::NanStd => "nanstd",
            Statistic::NanSum => "nansum",
            Statistic::NanVar => "nanvar",
        }
    }

    /// Whether NaN values are skipped rather than propagated
    pub fn ignores_nan(self) -> bool {
        matches!(
            self,
            Statistic::NanMin
                | Statistic::NanMax
                | Statistic::NanMean
                | Statistic::NanMedian
                | Statistic::NanStd
                | Statistic::NanSum
                | Statistic::NanVar
        )
    }

    /// The statistic with NaN handling stripped
    fn base(self) -> Statistic {
        match self {
            Statistic::NanMin => Statistic::Min,
            Statistic::NanMax => Statistic::Max,
            Statistic::NanMean => Statistic::Mean,
            Statistic::NanMedian => Statistic::Median,
            Statistic::NanStd => Statistic::Std,
            Statistic::NanSum => Statistic::Sum,
            Statistic::NanVar => Statistic::Var,
            other => other,
        }
    }

    /// Whether catchment values can be merged from upstream aggregates
    pub fn is_incremental(self) -> bool {
        matches!(self.base(), Statistic::Sum | Statistic::Mean | Statistic::Outlet)
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Statistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        Statistic::ALL
            .iter()
            .copied()
            .find(|stat| stat.name() == name)
            .ok_or_else(|| Error::UnknownStatistic {
                name: s.to_string(),
                supported: Statistic::ALL.iter().map(|st| st.name()).collect::<Vec<_>>().join(", "),
            })
    }
}

/// Options shared by the summary operations
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryOptions<'a> {
    /// Only pixels where the mask is nonzero contribute
    pub mask: Option<&'a Raster<u8>>,
    /// Skip NaN and nodata values for every statistic
    pub omit_nan: bool,
    /// Report terminal segments only
    pub terminal_only: bool,
}

/// Reduce a set of values. Masked pixels must already be excluded; NaN
/// entries are either skipped or poison the result.
pub fn reduce(stat: Statistic, mut values: Vec<f64>, omit_nan: bool) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    if stat.ignores_nan() || omit_nan {
        values.retain(|v| !v.is_nan());
        if values.is_empty() {
            return if stat.base() == Statistic::Sum { 0.0 } else { f64::NAN };
        }
    } else if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }

    match stat.base() {
        Statistic::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Statistic::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Statistic::Sum => values.iter().sum(),
        Statistic::Mean => mean(&values),
        Statistic::Var => variance(&values),
        Statistic::Std => variance(&values).sqrt(),
        Statistic::Median => {
            values.sort_by(f64::total_cmp);
            let mid = values.len() / 2;
            if values.len() % 2 == 0 {
                (values[mid - 1] + values[mid]) / 2.0
            } else {
                values[mid]
            }
        }
        // A single value stands for itself
        _ => values[values.len() - 1],
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance
fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Flat per-pixel values with the mask applied
struct Sampler {
    values: Vec<f64>,
    mask: Option<Vec<bool>>,
}

impl Sampler {
    /// `None` for pixels excluded by the mask
    #[inline]
    fn get(&self, idx: usize) -> Option<f64> {
        match &self.mask {
            Some(mask) if !mask[idx] => None,
            _ => Some(self.values[idx]),
        }
    }

    fn collect(&self, pixels: impl Iterator<Item = usize>) -> Vec<f64> {
        pixels.filter_map(|idx| self.get(idx)).collect()
    }
}

/// Running sum over a pixel set
#[derive(Debug, Clone, Copy, Default)]
struct Aggregate {
    /// Pixels passing the mask
    selected: usize,
    /// Selected pixels that are not NaN
    valid: usize,
    sum: f64,
}

impl Aggregate {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.selected += 1;
            if !v.is_nan() {
                self.valid += 1;
                self.sum += v;
            }
        }
    }

    fn merge(&mut self, other: &Aggregate) {
        self.selected += other.selected;
        self.valid += other.valid;
        self.sum += other.sum;
    }

    fn finish(&self, stat: Statistic, omit_nan: bool) -> f64 {
        if self.selected == 0 {
            return f64::NAN;
        }
        if !(stat.ignores_nan() || omit_nan) && self.valid < self.selected {
            return f64::NAN;
        }
        match stat.base() {
            Statistic::Sum => self.sum,
            _ if self.valid == 0 => f64::NAN,
            _ => self.sum / self.valid as f64,
        }
    }
}

impl Segments {
    fn sampler<T: RasterElement>(&self, raster: &Raster<T>, mask: Option<&Raster<u8>>) -> Result<Sampler> {
        self.flow.check_alignment(raster)?;
        let nodata = raster.nodata();
        let values = raster.data().iter().map(|v| v.value_or_nan(nodata)).collect();
        let mask = match mask {
            Some(m) => {
                self.flow.check_alignment(m)?;
                Some(m.data().iter().map(|&v| v != 0).collect())
            }
            None => None,
        };
        Ok(Sampler { values, mask })
    }

    /// Positions reported by a summary
    fn reported(&self, terminal_only: bool) -> Vec<usize> {
        (0..self.len())
            .filter(|&pos| !terminal_only || self.segments[pos].child == 0)
            .collect()
    }

    /// Compute a statistic over the pixels of each segment.
    ///
    /// Returns one value per segment in network order (terminal segments
    /// only when `options.terminal_only` is set).
    pub fn summary<T: RasterElement>(
        &self,
        stat: Statistic,
        raster: &Raster<T>,
        options: &SummaryOptions<'_>,
    ) -> Result<Vec<f64>> {
        let sampler = self.sampler(raster, options.mask)?;
        let cols = self.flow.cols();
        let reported = self.reported(options.terminal_only);

        if stat == Statistic::Outlet {
            let outlets = self.outlet_pixels();
            return Ok(reported
                .into_iter()
                .map(|pos| {
                    let (r, c) = outlets[pos];
                    sampler.get(r * cols + c).unwrap_or(f64::NAN)
                })
                .collect());
        }

        Ok(reported
            .into_iter()
            .map(|pos| {
                let pixels = self.segments[pos].pixels.iter().map(|&(r, c)| r * cols + c);
                reduce(stat, sampler.collect(pixels), options.omit_nan)
            })
            .collect())
    }

    /// Compute a statistic over the catchment of each segment.
    ///
    /// `sum`, `mean` and their NaN variants are computed in a single pass over
    /// the grid. Other statistics materialize every reported catchment.
    pub fn catchment_summary<T: RasterElement>(
        &self,
        stat: Statistic,
        raster: &Raster<T>,
        options: &SummaryOptions<'_>,
    ) -> Result<Vec<f64>> {
        if stat == Statistic::Outlet {
            return self.summary(stat, raster, options);
        }

        let sampler = self.sampler(raster, options.mask)?;
        let reported = self.reported(options.terminal_only);

        if stat.is_incremental() {
            debug!(stat = %stat, segments = reported.len(), "incremental catchment summary");
            let totals = self.accumulate(|idx| sampler.get(idx));
            return Ok(reported
                .into_iter()
                .map(|pos| totals[pos].finish(stat, options.omit_nan))
                .collect());
        }

        debug!(stat = %stat, segments = reported.len(), "materialized catchment summary");
        let cols = self.flow.cols();
        let outlets = self.outlet_pixels();
        Ok(reported
            .into_iter()
            .map(|pos| {
                let (r, c) = outlets[pos];
                let pixels = flowpath::upstream(&self.flow, r * cols + c);
                reduce(stat, sampler.collect(pixels.into_iter()), options.omit_nan)
            })
            .collect())
    }

    /// Catchment aggregate of every segment, in network order.
    ///
    /// `value` returns `None` for pixels that should not be counted.
    fn accumulate(&self, value: impl Fn(usize) -> Option<f64>) -> Vec<Aggregate> {
        let n = self.len();
        let cols = self.flow.cols();
        let mut totals = vec![Aggregate::default(); n];
        if n == 0 {
            return totals;
        }

        let mut seeds = vec![0_u32; self.flow.len()];
        for (&idx, &id) in self.owners() {
            seeds[idx] = id;
        }
        let labels = flowpath::propagate(&self.flow, &seeds, Hit::Nearest);

        for (idx, &label) in labels.iter().enumerate() {
            if label != 0 {
                if let Ok(pos) = self.position(label) {
                    totals[pos].add(value(idx));
                }
            }
        }

        // Segment receiving each outlet's flow
        let outlets = self.outlet_pixels();
        let targets: Vec<Option<usize>> = outlets
            .iter()
            .enumerate()
            .map(|(pos, &(r, c))| {
                let below = flowpath::downstream(&self.flow, r * cols + c)?;
                let target = self.position(labels[below]).ok()?;
                (target != pos).then_some(target)
            })
            .collect();

        let mut pending = vec![0_usize; n];
        for target in targets.iter().flatten() {
            pending[*target] += 1;
        }
        let mut queue: Vec<usize> = (0..n).filter(|&p| pending[p] == 0).collect();
        while let Some(pos) = queue.pop() {
            if let Some(target) = targets[pos] {
                let upstream = totals[pos];
                totals[target].merge(&upstream);
                pending[target] -= 1;
                if pending[target] == 0 {
                    queue.push(target);
                }
            }
        }
        totals
    }

    /// Pixels draining to a segment's outlet, the outlet included
    pub fn catchment_indices(&self, id: SegmentId) -> Result<Vec<(usize, usize)>> {
        let (r, c) = self.outlet(id)?;
        let cols = self.flow.cols();
        Ok(flowpath::upstream(&self.flow, r * cols + c)
            .into_iter()
            .map(|idx| (idx / cols, idx % cols))
            .collect())
    }

    /// Number of pixels in each catchment
    pub fn npixels(&self, terminal_only: bool) -> Vec<usize> {
        let totals = self.accumulate(|_| Some(0.0));
        self.reported(terminal_only)
            .into_iter()
            .map(|pos| totals[pos].selected)
            .collect()
    }

    /// Catchment area of each segment, optionally limited to a mask
    pub fn area(&self, mask: Option<&Raster<u8>>, units: AreaUnits, terminal_only: bool) -> Result<Vec<f64>> {
        let included = match mask {
            Some(m) => {
                self.flow.check_alignment(m)?;
                Some(m.data().iter().map(|&v| v != 0).collect::<Vec<bool>>())
            }
            None => None,
        };
        let totals = self.accumulate(|idx| match &included {
            Some(inc) if !inc[idx] => None,
            _ => Some(0.0),
        });
        let pixel_area = units.from_square_meters(self.transform.pixel_area());
        Ok(self
            .reported(terminal_only)
            .into_iter()
            .map(|pos| totals[pos].selected as f64 * pixel_area)
            .collect())
    }

    /// Proportion of each catchment inside a mask (for example the burned
    /// fraction of the area draining to each segment)
    pub fn upslope_ratio(&self, mask: &Raster<u8>, terminal_only: bool) -> Result<Vec<f64>> {
        self.flow.check_alignment(mask)?;
        let flags = mask.data().iter().map(|&v| if v != 0 { 1.0 } else { 0.0 }).collect::<Vec<f64>>();
        let totals = self.accumulate(|idx| Some(flags[idx]));
        Ok(self
            .reported(terminal_only)
            .into_iter()
            .map(|pos| {
                let t = &totals[pos];
                if t.selected == 0 {
                    f64::NAN
                } else {
                    t.sum / t.selected as f64
                }
            })
            .collect())
    }
}
