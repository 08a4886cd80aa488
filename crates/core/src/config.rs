//! Immutable per-command configuration, assembled once from command-line
//! input and handed to each stage.

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;
use crate::ident::Ident;
use crate::landcover::{OrbitFilter, SlopeBucket};
use crate::partition::TaskPartitioner;
use crate::sampling::SampleRequest;
use crate::types::Timestamp;

/// Upper bound on extraction workers per `(algorithm, class)` run.
pub const MAX_THREADS: usize = 64;

/// Band names read by default from each scene.
pub const DEFAULT_BANDS: [&str; 2] = ["vv", "vh"];

/// Algorithms compared by default; the first is the reference side of
/// every difference.
pub const DEFAULT_ALGORITHMS: [&str; 2] = ["gamma", "snap"];

fn band_pair(bands: &[String]) -> Result<[Ident; 2], CoreError> {
    match bands {
        [a, b] => {
            let (a, b) = (Ident::normalized(a)?, Ident::normalized(b)?);
            if a == b {
                return Err(CoreError::Validation(format!(
                    "The two bands must differ, got '{}' twice",
                    a.as_str()
                )));
            }
            Ok([a, b])
        }
        _ => Err(CoreError::Validation(format!(
            "Exactly two bands are required, got {}",
            bands.len()
        ))),
    }
}

fn algorithm_list(algorithms: &[String]) -> Result<Vec<Ident>, CoreError> {
    if algorithms.is_empty() {
        return Err(CoreError::Validation(
            "At least one algorithm is required".to_string(),
        ));
    }
    let mut out: Vec<Ident> = Vec::with_capacity(algorithms.len());
    for raw in algorithms {
        let ident = Ident::normalized(raw)?;
        if !out.contains(&ident) {
            out.push(ident);
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionConfig {
    pub product: Ident,
    pub classes: Vec<Ident>,
    pub algorithms: Vec<Ident>,
    pub bands: [Ident; 2],
    pub slope: Option<SlopeBucket>,
    pub threads: usize,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    #[serde(skip)]
    pub partitioner: TaskPartitioner,
}

/// Raw extraction options as parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct ExtractionArgs {
    pub product: String,
    pub classes: Vec<Ident>,
    pub algorithms: Vec<String>,
    pub bands: Vec<String>,
    pub slope: Option<SlopeBucket>,
    pub threads: usize,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub epsilon_secs: i64,
}

impl ExtractionConfig {
    pub fn from_args(args: ExtractionArgs) -> Result<Self, CoreError> {
        if args.threads == 0 || args.threads > MAX_THREADS {
            return Err(CoreError::Validation(format!(
                "Thread count must be between 1 and {MAX_THREADS}, got {}",
                args.threads
            )));
        }
        if let (Some(start), Some(end)) = (args.start, args.end) {
            if start > end {
                return Err(CoreError::InvalidRange { start, end });
            }
        }
        let partitioner = if args.epsilon_secs == 0 {
            TaskPartitioner::half_open()
        } else {
            TaskPartitioner::with_epsilon(Duration::seconds(args.epsilon_secs))?
        };

        Ok(Self {
            product: Ident::normalized(&args.product)?,
            classes: args.classes,
            algorithms: algorithm_list(&args.algorithms)?,
            bands: band_pair(&args.bands)?,
            slope: args.slope,
            threads: args.threads,
            start: args.start,
            end: args.end,
            partitioner,
        })
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AggregationConfig {
    pub product: Ident,
    pub classes: Vec<Ident>,
    /// `[reference, comparison]`; differences are `reference - comparison`.
    pub algorithms: [Ident; 2],
    pub bands: [Ident; 2],
    pub slope: Option<SlopeBucket>,
    pub orbit: OrbitFilter,
}

impl AggregationConfig {
    pub fn new(
        product: &str,
        classes: Vec<Ident>,
        algorithms: &[String],
        bands: &[String],
        slope: Option<SlopeBucket>,
        orbit: OrbitFilter,
    ) -> Result<Self, CoreError> {
        let algorithms = match algorithm_list(algorithms)?.as_slice() {
            [a, b] => [a.clone(), b.clone()],
            other => {
                return Err(CoreError::Validation(format!(
                    "Aggregation compares exactly two distinct algorithms, got {}",
                    other.len()
                )))
            }
        };
        Ok(Self {
            product: Ident::normalized(product)?,
            classes,
            algorithms,
            bands: band_pair(bands)?,
            slope,
            orbit,
        })
    }
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SampleConfig {
    pub classes: Vec<Ident>,
    pub request: SampleRequest,
}
