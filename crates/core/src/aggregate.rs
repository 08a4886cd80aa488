//! In-process error and timeline aggregation over extraction records.
//!
//! Mirrors the `CREATE TABLE ... AS SELECT ... GROUP BY` statements that
//! materialize the `error` and `timeline` schemas: records of the two
//! algorithms are inner-joined on acquisition time and geometry, optionally
//! restricted to one orbit direction, then grouped by geometry (errors) or
//! by acquisition day (timeline).

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::landcover::{OrbitDirection, OrbitFilter};
use crate::stats::{RmseAccumulator, RunningStats, Summary};
use crate::types::{AcquisitionDate, AcquisitionTime};

/// Nearest-pixel values of both bands for one sample point in one scene.
///
/// `values[0]` and `values[1]` hold the first and second configured band
/// (`vv` and `vh` by default).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRecord {
    pub fdate: AcquisitionTime,
    /// Geometry as WKT; equal geometries render to equal text.
    pub geom: String,
    pub values: [f64; 2],
}

impl ExtractionRecord {
    /// Build a record from raw pixel reads. A no-data read in either band
    /// yields no record at all.
    pub fn from_pixels(
        fdate: AcquisitionTime,
        geom: String,
        first: Option<f64>,
        second: Option<f64>,
    ) -> Option<Self> {
        match (first, second) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some(Self {
                fdate,
                geom,
                values: [a, b],
            }),
            _ => None,
        }
    }
}

/// A pair of records from the two algorithms sharing date and geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord<'a> {
    pub fdate: AcquisitionTime,
    pub geom: &'a str,
    pub first: [f64; 2],
    pub second: [f64; 2],
}

/// Inner join on `(fdate, geom)`, optionally restricted by orbit direction.
///
/// Duplicate keys produce the cross product, as the SQL join does. With an
/// orbit filter, records whose date has no known orbit are dropped.
pub fn join_records<'a>(
    first: &'a [ExtractionRecord],
    second: &'a [ExtractionRecord],
    orbit: OrbitFilter,
    orbits: &HashMap<AcquisitionTime, OrbitDirection>,
) -> Vec<JoinedRecord<'a>> {
    let mut index: HashMap<(AcquisitionTime, &str), Vec<&ExtractionRecord>> = HashMap::new();
    for rec in second {
        index
            .entry((rec.fdate, rec.geom.as_str()))
            .or_default()
            .push(rec);
    }

    let mut joined = Vec::new();
    for a in first {
        if orbit != OrbitFilter::Both && !orbit.admits(orbits.get(&a.fdate).copied()) {
            continue;
        }
        if let Some(matches) = index.get(&(a.fdate, a.geom.as_str())) {
            for b in matches {
                joined.push(JoinedRecord {
                    fdate: a.fdate,
                    geom: a.geom.as_str(),
                    first: a.values,
                    second: b.values,
                });
            }
        }
    }
    joined
}

// ---------------------------------------------------------------------------
// Error aggregation
// ---------------------------------------------------------------------------

/// Per-geometry comparison of the two algorithms over the scene stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub geom: String,
    pub samples: u64,
    pub first: [Summary; 2],
    pub second: [Summary; 2],
    /// Statistics of `first - second`, per band.
    pub difference: [Summary; 2],
}

#[derive(Default)]
struct ErrorGroup {
    first: [RunningStats; 2],
    second: [RunningStats; 2],
    difference: [RunningStats; 2],
}

fn summaries(stats: &[RunningStats; 2]) -> Option<[Summary; 2]> {
    Some([stats[0].summary()?, stats[1].summary()?])
}

/// One row per distinct geometry present in both inputs, ordered by WKT.
pub fn aggregate_errors(
    first: &[ExtractionRecord],
    second: &[ExtractionRecord],
    orbit: OrbitFilter,
    orbits: &HashMap<AcquisitionTime, OrbitDirection>,
) -> Vec<ErrorRecord> {
    let mut groups: BTreeMap<&str, ErrorGroup> = BTreeMap::new();
    for pair in join_records(first, second, orbit, orbits) {
        let group = groups.entry(pair.geom).or_default();
        for band in 0..2 {
            group.first[band].push(pair.first[band]);
            group.second[band].push(pair.second[band]);
            group.difference[band].push(pair.first[band] - pair.second[band]);
        }
    }

    groups
        .into_iter()
        .filter_map(|(geom, g)| {
            Some(ErrorRecord {
                geom: geom.to_string(),
                samples: g.first[0].count(),
                first: summaries(&g.first)?,
                second: summaries(&g.second)?,
                difference: summaries(&g.difference)?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Timeline aggregation
// ---------------------------------------------------------------------------

/// Per-day statistics across all sample points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRecord {
    pub date: AcquisitionDate,
    pub samples: u64,
    pub first: [Summary; 2],
    pub second: [Summary; 2],
    /// RMSE between the two algorithms, per band.
    pub rmse: [f64; 2],
}

#[derive(Default)]
struct TimelineGroup {
    first: [RunningStats; 2],
    second: [RunningStats; 2],
    rmse: [RmseAccumulator; 2],
}

/// One row per acquisition day, ascending by date.
pub fn aggregate_timeline(
    first: &[ExtractionRecord],
    second: &[ExtractionRecord],
    orbit: OrbitFilter,
    orbits: &HashMap<AcquisitionTime, OrbitDirection>,
) -> Vec<TimelineRecord> {
    let mut groups: BTreeMap<AcquisitionDate, TimelineGroup> = BTreeMap::new();
    for pair in join_records(first, second, orbit, orbits) {
        let group = groups.entry(pair.fdate.date()).or_default();
        for band in 0..2 {
            group.first[band].push(pair.first[band]);
            group.second[band].push(pair.second[band]);
            group.rmse[band].push(pair.first[band], pair.second[band]);
        }
    }

    groups
        .into_iter()
        .filter_map(|(date, g)| {
            Some(TimelineRecord {
                date,
                samples: g.first[0].count(),
                first: summaries(&g.first)?,
                second: summaries(&g.second)?,
                rmse: [g.rmse[0].value()?, g.rmse[1].value()?],
            })
        })
        .collect()
}
