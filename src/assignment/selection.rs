//! License rows selected for an assignment.

use crate::bulk::PreflightFilter;
use serde::{Deserialize, Serialize};

/// One selected license row as shown in the license grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedLicense {
    pub license_code: String,
    pub count_available: usize,
}

impl SelectedLicense {
    pub fn new(license_code: impl Into<String>, count_available: usize) -> Self {
        Self {
            license_code: license_code.into(),
            count_available,
        }
    }
}

/// The licenses picked for one assignment action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseSelection {
    rows: Vec<SelectedLicense>,
}

impl LicenseSelection {
    pub fn new(rows: Vec<SelectedLicense>) -> Self {
        Self { rows }
    }

    pub fn with_license(mut self, license_code: impl Into<String>, count_available: usize) -> Self {
        self.rows.push(SelectedLicense::new(license_code, count_available));
        self
    }

    pub fn rows(&self) -> &[SelectedLicense] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of the rows' available counts.
    pub fn available_total(&self) -> usize {
        self.rows.iter().map(|row| row.count_available).sum()
    }

    pub fn license_codes(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.license_code.clone()).collect()
    }

    /// The "who still needs a license" check for this selection.
    pub fn preflight(&self) -> PreflightFilter {
        PreflightFilter::new(self.license_codes(), self.available_total())
    }
}

impl FromIterator<SelectedLicense> for LicenseSelection {
    fn from_iter<T: IntoIterator<Item = SelectedLicense>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
