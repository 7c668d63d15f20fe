use serde::{Deserialize, Serialize};

use crate::models::bracket::strip_sort_prefix;

/// The categorical fields that, with a year and a bracket, identify one row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DemographicKey {
    pub sex: String,
    pub taxable_status: String,
    pub age_range: String,
}

impl DemographicKey {
    /// Builds a key, trimming every field and dropping any sort prefix from
    /// the age range (`02. 25 - 29` becomes `25 - 29`).
    pub fn new(
        sex: &str,
        taxable_status: &str,
        age_range: &str,
    ) -> Self {
        Self {
            sex: sex.trim().to_string(),
            taxable_status: taxable_status.trim().to_string(),
            age_range: strip_sort_prefix(age_range).to_string(),
        }
    }
}
