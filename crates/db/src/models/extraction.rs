//! Extracted backscatter rows (`result_<alg>[_<slope>].<product>_<class>`).

use sarcmp_core::aggregate::ExtractionRecord;
use sarcmp_core::types::AcquisitionTime;
use sqlx::FromRow;

/// A stored extraction row with the geometry rendered as WKT.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ExtractionRow {
    pub fdate: AcquisitionTime,
    pub geom: String,
    pub first: Option<f64>,
    pub second: Option<f64>,
}

impl ExtractionRow {
    pub fn into_record(self) -> Option<ExtractionRecord> {
        ExtractionRecord::from_pixels(self.fdate, self.geom, self.first, self.second)
    }
}
