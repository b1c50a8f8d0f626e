//! Patient records and their response projections.
//!
//! The warehouse owns the data; this module only types it at the
//! boundary and re-shapes it. Two output shapes exist: a snake_case
//! "detail" shape used by the analysis endpoints, and a camelCase
//! "listing" shape used by the pagination/search endpoints.

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Column order every patient SELECT uses, and the order
/// [`PatientRecord::from_cells`] expects.
pub const PATIENT_COLUMNS: [&str; 8] = [
    "PID",
    "FirstName",
    "LastName",
    "Age",
    "Gender",
    "Address",
    "FirstVisit",
    "Prescriptions",
];

/// One row of the patient table, strictly typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub pid: i64,
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub gender: String,
    pub address: String,
    pub first_visit: String,
    pub prescriptions: String,
    pub patient_description: Option<String>,
}

/// Detail projection (snake_case), returned by `/analyze-patient`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDetail {
    pub pid: i64,
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub gender: String,
    pub address: String,
    pub first_visit: String,
    pub prescriptions: String,
    pub patient_description: String,
}

/// Listing projection (camelCase), returned by `/patients*` and `/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientListing {
    pub registration_no: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub gender: String,
    pub address: String,
    pub first_visit_date: String,
    pub prescriptions: String,
}

impl PatientRecord {
    /// Build a record from one warehouse row's cells, in
    /// [`PATIENT_COLUMNS`] order with an optional ninth
    /// `patient_description` cell. Fails fast on missing or
    /// non-numeric id/age cells.
    pub fn from_cells(cells: &[Option<String>]) -> Result<Self, RecordError> {
        let text = |idx: usize, column: &'static str| -> Result<String, RecordError> {
            cells
                .get(idx)
                .and_then(|c| c.clone())
                .ok_or(RecordError::MissingColumn(column))
        };
        let int = |idx: usize, column: &'static str| -> Result<i64, RecordError> {
            let raw = text(idx, column)?;
            raw.trim()
                .parse::<i64>()
                .map_err(|_| RecordError::Malformed { column, value: raw })
        };

        Ok(Self {
            pid: int(0, "PID")?,
            first_name: text(1, "FirstName")?,
            last_name: text(2, "LastName")?,
            age: int(3, "Age")?,
            gender: text(4, "Gender")?,
            address: text(5, "Address")?,
            first_visit: text(6, "FirstVisit")?,
            prescriptions: text(7, "Prescriptions")?,
            patient_description: cells.get(8).and_then(|c| c.clone()),
        })
    }

    pub fn to_detail(&self) -> PatientDetail {
        PatientDetail {
            pid: self.pid,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            age: self.age,
            gender: self.gender.clone(),
            address: self.address.clone(),
            first_visit: self.first_visit.clone(),
            prescriptions: self.prescriptions.clone(),
            patient_description: self.patient_description.clone().unwrap_or_default(),
        }
    }

    pub fn to_listing(&self) -> PatientListing {
        PatientListing {
            registration_no: self.pid.to_string(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            age: self.age,
            gender: self.gender.clone(),
            address: self.address.clone(),
            first_visit_date: self.first_visit.clone(),
            prescriptions: self.prescriptions.clone(),
        }
    }

    /// Case-insensitive substring match over first name, last name,
    /// id-as-text, and address. `term` must already be lower-cased.
    pub fn matches_term(&self, term: &str) -> bool {
        self.first_name.to_lowercase().contains(term)
            || self.last_name.to_lowercase().contains(term)
            || self.pid.to_string().contains(term)
            || self.address.to_lowercase().contains(term)
    }
}
