//! Search result types and similarity scoring.

use serde::Serialize;

use crate::patient::PatientRecord;

/// Convert a cosine distance into a similarity percentage in [0, 100],
/// rounded to one decimal place.
pub fn similarity_from_distance(distance: f64) -> f64 {
    ((1.0 - distance) * 1000.0).round() / 10.0
}

/// Which branch produced a search outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    PidLookup,
    VectorSearch,
    Error,
}

/// One matched patient with its similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub pid: i64,
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub gender: String,
    pub address: String,
    pub first_visit: String,
    pub prescriptions: String,
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl SearchResult {
    /// An exact id match. Similarity is fixed at 100.0 whether the id
    /// came from a true lookup or a coincidental digit capture.
    pub fn exact(record: PatientRecord) -> Self {
        Self::from_record(record, 100.0, None)
    }

    /// A nearest-neighbor match at the given cosine distance.
    pub fn ranked(record: PatientRecord, distance: f64) -> Self {
        Self::from_record(record, similarity_from_distance(distance), Some(distance))
    }

    fn from_record(record: PatientRecord, similarity: f64, distance: Option<f64>) -> Self {
        Self {
            pid: record.pid,
            first_name: record.first_name,
            last_name: record.last_name,
            age: record.age,
            gender: record.gender,
            address: record.address,
            first_visit: record.first_visit,
            prescriptions: record.prescriptions,
            similarity,
            distance,
        }
    }
}

/// The full outcome of a `/vector-search` request.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub search_type: SearchType,
    pub query: String,
    pub results: Vec<SearchResult>,
    pub total_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchOutcome {
    /// An id lookup that found its patient.
    pub fn pid_match(query: String, record: PatientRecord) -> Self {
        Self {
            search_type: SearchType::PidLookup,
            query,
            results: vec![SearchResult::exact(record)],
            total_results: 1,
            message: None,
        }
    }

    /// An id lookup that found nothing. This is a 200, not an error.
    pub fn pid_miss(query: String, pid: i64) -> Self {
        Self {
            search_type: SearchType::PidLookup,
            query,
            results: Vec::new(),
            total_results: 0,
            message: Some(format!("No patient found with PID {pid}")),
        }
    }

    /// A semantic search outcome, ordered by ascending distance.
    pub fn ranked(query: String, hits: Vec<(PatientRecord, f64)>) -> Self {
        let mut results: Vec<SearchResult> = hits
            .into_iter()
            .map(|(record, distance)| SearchResult::ranked(record, distance))
            .collect();
        results.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        let total_results = results.len();
        Self {
            search_type: SearchType::VectorSearch,
            query,
            results,
            total_results,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pid: i64) -> PatientRecord {
        PatientRecord {
            pid,
            first_name: "Meera".into(),
            last_name: "Shah".into(),
            age: 54,
            gender: "Female".into(),
            address: "8 Hill St".into(),
            first_visit: "2019-11-02".into(),
            prescriptions: "nux 30".into(),
            patient_description: None,
        }
    }

    #[test]
    fn similarity_conversion_table() {
        assert_eq!(similarity_from_distance(0.0), 100.0);
        assert_eq!(similarity_from_distance(0.25), 75.0);
        assert_eq!(similarity_from_distance(1.0), 0.0);
        assert_eq!(similarity_from_distance(0.123), 87.7);
    }

    #[test]
    fn pid_match_carries_one_result_at_full_similarity() {
        let outcome = SearchOutcome::pid_match("patient 5".into(), record(5));
        assert_eq!(outcome.search_type, SearchType::PidLookup);
        assert_eq!(outcome.total_results, 1);
        assert_eq!(outcome.results[0].similarity, 100.0);
        assert_eq!(outcome.results[0].distance, None);
    }

    #[test]
    fn pid_miss_is_empty_with_a_message() {
        let outcome = SearchOutcome::pid_miss("pid 999".into(), 999);
        assert_eq!(outcome.total_results, 0);
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.message.as_deref(), Some("No patient found with PID 999"));
    }

    #[test]
    fn ranked_results_sort_ascending_by_distance() {
        let outcome = SearchOutcome::ranked(
            "joint pain".into(),
            vec![(record(2), 0.4), (record(1), 0.1), (record(3), 0.25)],
        );
        assert_eq!(outcome.search_type, SearchType::VectorSearch);
        let pids: Vec<i64> = outcome.results.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![1, 3, 2]);
        assert_eq!(outcome.results[0].similarity, 90.0);
        assert_eq!(outcome.results[1].similarity, 75.0);
    }

    #[test]
    fn search_type_serializes_snake_case() {
        assert_eq!(serde_json::to_value(SearchType::PidLookup).unwrap(), "pid_lookup");
        assert_eq!(serde_json::to_value(SearchType::VectorSearch).unwrap(), "vector_search");
        assert_eq!(serde_json::to_value(SearchType::Error).unwrap(), "error");
    }
}
