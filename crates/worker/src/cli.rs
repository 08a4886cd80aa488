//! Command-line surface of the `sarcmp` binary.

use clap::{Args, Parser, Subcommand};
use sarcmp_core::config::{
    AggregationConfig, ExtractionArgs, ExtractionConfig, SampleConfig, DEFAULT_ALGORITHMS,
    DEFAULT_BANDS,
};
use sarcmp_core::error::CoreError;
use sarcmp_core::landcover::{resolve_classes, OrbitFilter, SlopeBucket};
use sarcmp_core::sampling::{BoundingBox, SampleRequest};
use sarcmp_core::types::parse_cli_datetime;

#[derive(Debug, Parser)]
#[command(name = "sarcmp", version)]
#[command(about = "Compare SAR backscatter produced by different processing algorithms")]
pub struct Cli {
    /// Database name on the local server
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Full connection URL; takes precedence over --database and DATABASE_URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Print the run summary as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate land-cover points of interest for a region
    Poi(PoiArgs),
    /// Draw analysis samples from the points of interest
    Sample(SampleArgs),
    /// Extract backscatter at the sample points for every scene
    Extract(ExtractArgs),
    /// Build per-point error statistics between two algorithms
    Error(AggregateArgs),
    /// Build per-day statistics and RMSE between two algorithms
    Timeline(AggregateArgs),
    /// Recompute error and timeline tables in process and compare
    Verify(AggregateArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Poi(_) => "poi",
            Self::Sample(_) => "sample",
            Self::Extract(_) => "extract",
            Self::Error(_) => "error",
            Self::Timeline(_) => "timeline",
            Self::Verify(_) => "verify",
        }
    }

    /// Concurrent database users the command needs.
    pub fn workers(&self) -> usize {
        match self {
            Self::Extract(args) => args.threads.max(1),
            _ => 1,
        }
    }
}

fn slope(value: &str) -> Result<Option<SlopeBucket>, CoreError> {
    SlopeBucket::parse_optional(value)
}

#[derive(Debug, Args)]
pub struct PoiArgs {
    /// Region whose polygons are sampled (fiji, alps)
    pub region: String,

    /// Restrict generation to these classes
    #[arg(short = 'c', long = "class", num_args = 1..)]
    pub classes: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Number of points drawn per class
    #[arg(short = 'n', long, default_value_t = 10_000)]
    pub samples: i64,

    /// Bounding box: xmin ymin xmax ymax target-epsg
    #[arg(
        short,
        long,
        num_args = 5,
        value_names = ["XMIN", "YMIN", "XMAX", "YMAX", "EPSG"],
        allow_negative_numbers = true
    )]
    pub aoi: Vec<String>,

    /// Land-cover classes
    #[arg(short = 'c', long = "landcover", num_args = 1.., default_values = ["forest", "grassland"])]
    pub classes: Vec<String>,

    /// Slope bucket (flat, steep or empty for none)
    #[arg(short, long, default_value = "")]
    pub slope: String,
}

impl SampleArgs {
    /// Build the sample configuration and the list of skipped class names.
    pub fn into_config(self) -> Result<(SampleConfig, Vec<String>), CoreError> {
        let aoi = if self.aoi.is_empty() {
            None
        } else {
            Some(BoundingBox::from_args(&self.aoi)?)
        };
        let request = SampleRequest::new(self.samples, aoi, slope(&self.slope)?)?;
        let (classes, skipped) = resolve_classes(&self.classes);
        Ok((SampleConfig { classes, request }, skipped))
    }
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Product name in the scene catalog (e.g. S1_GRD)
    pub product: String,

    /// Start date filter (DD/MM/YYYY HH:MM:SS)
    #[arg(short, long)]
    pub start: Option<String>,

    /// End date filter (DD/MM/YYYY HH:MM:SS)
    #[arg(short, long)]
    pub end: Option<String>,

    /// Land-cover classes
    #[arg(short = 'c', long = "landcover", num_args = 1.., default_values = ["forest", "grassland"])]
    pub classes: Vec<String>,

    /// Parallel workers per algorithm and class
    #[arg(short, long, default_value_t = 1)]
    pub threads: usize,

    /// Algorithms to extract
    #[arg(short = 'g', long = "alg", num_args = 1.., default_values = DEFAULT_ALGORITHMS)]
    pub algorithms: Vec<String>,

    /// Slope bucket of the sample to read (flat, steep or empty)
    #[arg(long, default_value = "")]
    pub slope: String,

    /// The two band names to read
    #[arg(long, num_args = 2, default_values = DEFAULT_BANDS)]
    pub bands: Vec<String>,

    /// Gap in seconds between adjacent task windows; 0 for half-open windows
    #[arg(long, default_value_t = 0)]
    pub epsilon: i64,
}

impl ExtractArgs {
    pub fn into_config(self) -> Result<(ExtractionConfig, Vec<String>), CoreError> {
        let (classes, skipped) = resolve_classes(&self.classes);
        let config = ExtractionConfig::from_args(ExtractionArgs {
            product: self.product,
            classes,
            algorithms: self.algorithms,
            bands: self.bands,
            slope: slope(&self.slope)?,
            threads: self.threads,
            start: self.start.as_deref().map(parse_cli_datetime).transpose()?,
            end: self.end.as_deref().map(parse_cli_datetime).transpose()?,
            epsilon_secs: self.epsilon,
        })?;
        Ok((config, skipped))
    }
}

#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Product name in the scene catalog (e.g. S1_GRD)
    pub product: String,

    /// Orbit direction filter (both, ascending, descending)
    #[arg(short, long, default_value = "both")]
    pub orbit: String,

    /// Land-cover classes
    #[arg(short = 'c', long = "landcover", num_args = 1.., default_values = ["forest", "grassland"])]
    pub classes: Vec<String>,

    /// Reference and comparison algorithm
    #[arg(short = 'g', long = "alg", num_args = 2, default_values = DEFAULT_ALGORITHMS)]
    pub algorithms: Vec<String>,

    /// Slope bucket (flat, steep or empty for none)
    #[arg(short, long, default_value = "")]
    pub slope: String,

    /// The two band names to compare
    #[arg(long, num_args = 2, default_values = DEFAULT_BANDS)]
    pub bands: Vec<String>,
}

impl AggregateArgs {
    pub fn into_config(self) -> Result<(AggregationConfig, Vec<String>), CoreError> {
        let (classes, skipped) = resolve_classes(&self.classes);
        let orbit: OrbitFilter = self.orbit.parse()?;
        let config = AggregationConfig::new(
            &self.product,
            classes,
            &self.algorithms,
            &self.bands,
            slope(&self.slope)?,
            orbit,
        )?;
        Ok((config, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use sarcmp_core::landcover::OrbitDirection;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sarcmp").chain(args.iter().copied())).unwrap()
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn extract_defaults() {
        let cli = parse(&["extract", "S1_GRD"]);
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(args.threads, 1);
        assert_eq!(args.classes, ["forest", "grassland"]);
        assert_eq!(args.algorithms, ["gamma", "snap"]);
        assert_eq!(args.bands, ["vv", "vh"]);

        let (config, skipped) = args.into_config().unwrap();
        assert!(skipped.is_empty());
        assert_eq!(config.product.as_str(), "s1_grd");
        assert_eq!(config.start, None);
    }

    #[test]
    fn extract_dates_and_threads() {
        let cli = parse(&[
            "extract",
            "S1_GRD",
            "-s",
            "01/01/2020 00:00:00",
            "-e",
            "31/01/2020 00:00:00",
            "-t",
            "4",
            "--epsilon",
            "1",
        ]);
        assert_eq!(cli.command.workers(), 4);
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let (config, _) = args.into_config().unwrap();
        assert_eq!(config.start, Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(config.end, Some(Utc.with_ymd_and_hms(2020, 1, 31, 0, 0, 0).unwrap()));
        assert_eq!(config.threads, 4);
    }

    #[test]
    fn bad_date_is_a_validation_error() {
        let cli = parse(&["extract", "S1_GRD", "-s", "2020-01-01"]);
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert_matches!(args.into_config(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn unknown_classes_are_skipped() {
        let cli = parse(&["sample", "-c", "forest", "tundra"]);
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        let (config, skipped) = args.into_config().unwrap();
        assert_eq!(config.classes.len(), 1);
        assert_eq!(skipped, ["tundra"]);
        assert_eq!(config.request.samples, 10_000);
    }

    #[test]
    fn sample_bounding_box_accepts_negative_coordinates() {
        let cli = parse(&[
            "sample", "-a", "177.0", "-18.5", "178.8", "-17.0", "32760", "-s", "flat",
        ]);
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        let (config, _) = args.into_config().unwrap();
        let aoi = config.request.aoi.unwrap();
        assert_eq!(aoi.ymin, -18.5);
        assert_eq!(aoi.target_epsg, 32760);
        assert_eq!(config.request.slope, Some(SlopeBucket::Flat));
    }

    #[test]
    fn aggregate_orbit_and_slope() {
        let cli = parse(&["timeline", "S1_GRD", "-o", "ascending", "-s", "steep", "-c", "forest"]);
        let Command::Timeline(args) = cli.command else {
            panic!("expected timeline");
        };
        let (config, _) = args.into_config().unwrap();
        assert_eq!(config.orbit, OrbitFilter::Only(OrbitDirection::Ascending));
        assert_eq!(config.slope, Some(SlopeBucket::Steep));
        assert_eq!(config.algorithms[1].as_str(), "snap");
    }

    #[test]
    fn global_database_flags() {
        let cli = parse(&["error", "S1_GRD", "-d", "alps", "--json"]);
        assert_eq!(cli.database.as_deref(), Some("alps"));
        assert!(cli.json);
        assert_eq!(cli.command.name(), "error");
    }

    #[test]
    fn invalid_orbit_is_rejected() {
        let cli = parse(&["verify", "S1_GRD", "-o", "sideways"]);
        let Command::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert!(args.into_config().is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
