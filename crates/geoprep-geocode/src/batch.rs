//! Batch geocoding of a CSV table

use std::time::Duration;

use geoprep_core::config::FailurePolicy;
use geoprep_core::error::{GeoprepError, Result};
use serde::Serialize;

use crate::ports::{GeocodeOutcome, Geocoder};
use crate::table::{ColumnSelector, CsvTable};

/// Header of the appended latitude column
pub const LATITUDE_HEADER: &str = "위도";
/// Header of the appended longitude column
pub const LONGITUDE_HEADER: &str = "경도";

/// Options for [`geocode_table`]
#[derive(Debug, Clone)]
pub struct GeocodeOptions {
    pub status_column: ColumnSelector,
    pub address_column: ColumnSelector,
    /// Rows are kept when their status contains any of these
    pub keywords: Vec<String>,
    /// Pause after every request that reached the geocoder
    pub delay: Duration,
    pub on_failure: FailurePolicy,
}

impl Default for GeocodeOptions {
    fn default() -> Self {
        Self {
            status_column: ColumnSelector::Index(3),
            address_column: ColumnSelector::Index(5),
            keywords: vec!["휴업".to_string(), "폐업".to_string()],
            delay: Duration::from_millis(200),
            on_failure: FailurePolicy::Skip,
        }
    }
}

/// Counts gathered during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeocodeReport {
    pub rows_read: usize,
    pub rows_matched: usize,
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
    pub blank_addresses: usize,
}

/// Filter `table` and geocode the address of every remaining row.
///
/// The returned table holds the filtered rows with latitude and longitude
/// columns appended; both are empty when no position was found. `progress`
/// is called once per filtered row.
pub async fn geocode_table<G, F>(
    table: &CsvTable,
    geocoder: &G,
    options: &GeocodeOptions,
    progress: F,
) -> Result<(CsvTable, GeocodeReport)>
where
    G: Geocoder + ?Sized,
    F: Fn(),
{
    let status_column = table.column(&options.status_column)?;
    let address_column = table.column(&options.address_column)?;

    let filtered = table.filter_containing(status_column, &options.keywords);

    let mut report = GeocodeReport {
        rows_read: table.len(),
        rows_matched: filtered.len(),
        ..Default::default()
    };

    tracing::info!(
        "{} of {} rows match {:?}, geocoding with {}",
        filtered.len(),
        table.len(),
        options.keywords,
        geocoder.service_name()
    );

    let mut headers = filtered.headers.clone();
    headers.push_field(LATITUDE_HEADER);
    headers.push_field(LONGITUDE_HEADER);

    let mut rows = Vec::with_capacity(filtered.len());
    for row in &filtered.rows {
        let address = row.get(address_column).unwrap_or("").trim();

        let position = if address.is_empty() {
            report.blank_addresses += 1;
            None
        } else {
            let outcome = geocoder.geocode(address).await;
            let position = match outcome {
                GeocodeOutcome::Found(position) => {
                    report.found += 1;
                    Some(position)
                }
                GeocodeOutcome::NotFound => {
                    report.not_found += 1;
                    tracing::debug!("No match for '{}'", address);
                    None
                }
                GeocodeOutcome::Failed(reason) => {
                    report.failed += 1;
                    if options.on_failure == FailurePolicy::Abort {
                        return Err(GeoprepError::Geocoding { address: address.to_string(), reason });
                    }
                    tracing::warn!("Skipping '{}': {}", address, reason);
                    None
                }
            };

            if !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }
            position
        };

        let mut output = row.clone();
        match position {
            Some(position) => {
                output.push_field(&position.lat.to_string());
                output.push_field(&position.lng.to_string());
            }
            None => {
                output.push_field("");
                output.push_field("");
            }
        }
        rows.push(output);
        progress();
    }

    tracing::info!(
        "Geocoded {} rows: {} found, {} not found, {} failed, {} blank",
        report.rows_matched,
        report.found,
        report.not_found,
        report.failed,
        report.blank_addresses
    );

    Ok((CsvTable { headers, rows }, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::LatLng;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a fixed table and records every address it was asked for
    struct StubGeocoder {
        answers: HashMap<&'static str, GeocodeOutcome>,
        calls: Mutex<Vec<String>>,
    }

    impl StubGeocoder {
        fn new(answers: Vec<(&'static str, GeocodeOutcome)>) -> Self {
            Self { answers: answers.into_iter().collect(), calls: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn geocode(&self, address: &str) -> GeocodeOutcome {
            self.calls.lock().unwrap().push(address.to_string());
            self.answers.get(address).cloned().unwrap_or(GeocodeOutcome::NotFound)
        }

        fn service_name(&self) -> &str {
            "stub"
        }
    }

    fn stations() -> CsvTable {
        CsvTable::parse(
            "번호,지역,상호,상태,업종,주소\n\
             1,서울,행복주유소,영업,주유소,서울 종로구 세종대로 175\n\
             2,서울,중앙주유소,휴업,주유소,서울 중구 세종대로 110\n\
             3,부산,바다주유소,폐업,주유소,\n\
             4,부산,항구주유소,휴업,주유소,부산 중구 중앙대로 100\n\
             5,대구,달구벌주유소,폐업,주유소,대구 어딘가\n",
        )
        .unwrap()
    }

    fn options(on_failure: FailurePolicy) -> GeocodeOptions {
        GeocodeOptions { delay: Duration::ZERO, on_failure, ..Default::default() }
    }

    fn seoul() -> GeocodeOutcome {
        GeocodeOutcome::Found(LatLng { lat: 37.5663, lng: 126.9779 })
    }

    #[tokio::test]
    async fn test_filtered_rows_get_coordinates() {
        let geocoder = StubGeocoder::new(vec![
            ("서울 중구 세종대로 110", seoul()),
            ("부산 중구 중앙대로 100", GeocodeOutcome::Failed("HTTP 500".to_string())),
        ]);

        let (output, report) =
            geocode_table(&stations(), &geocoder, &options(FailurePolicy::Skip), || {}).await.unwrap();

        assert_eq!(report.rows_read, 5);
        assert_eq!(report.rows_matched, 4);
        assert_eq!(report.found, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.blank_addresses, 1);

        assert_eq!(&output.headers[6], "위도");
        assert_eq!(&output.headers[7], "경도");

        assert_eq!(&output.rows[0][2], "중앙주유소");
        assert_eq!(&output.rows[0][6], "37.5663");
        assert_eq!(&output.rows[0][7], "126.9779");
        for row in &output.rows[1..] {
            assert_eq!(&row[6], "");
            assert_eq!(&row[7], "");
        }
    }

    #[tokio::test]
    async fn test_blank_address_makes_no_request() {
        let geocoder = StubGeocoder::new(vec![]);
        geocode_table(&stations(), &geocoder, &options(FailurePolicy::Skip), || {}).await.unwrap();

        let calls = geocoder.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| !c.is_empty()));
    }

    #[tokio::test]
    async fn test_abort_stops_at_first_failure() {
        let geocoder = StubGeocoder::new(vec![
            ("서울 중구 세종대로 110", GeocodeOutcome::Failed("timeout".to_string())),
        ]);

        let err = geocode_table(&stations(), &geocoder, &options(FailurePolicy::Abort), || {})
            .await
            .unwrap_err();

        match err {
            GeoprepError::Geocoding { address, reason } => {
                assert_eq!(address, "서울 중구 세종대로 110");
                assert_eq!(reason, "timeout");
            }
            other => panic!("Expected Geocoding error, got {:?}", other),
        }
        assert_eq!(geocoder.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_abort_ignores_not_found() {
        let geocoder = StubGeocoder::new(vec![]);
        let (_, report) =
            geocode_table(&stations(), &geocoder, &options(FailurePolicy::Abort), || {}).await.unwrap();
        assert_eq!(report.not_found, 3);
    }

    #[tokio::test]
    async fn test_columns_by_name_and_custom_keywords() {
        let geocoder = StubGeocoder::new(vec![("서울 종로구 세종대로 175", seoul())]);
        let options = GeocodeOptions {
            status_column: ColumnSelector::Name("상태".to_string()),
            address_column: ColumnSelector::Name("주소".to_string()),
            keywords: vec!["영업".to_string()],
            ..options(FailurePolicy::Skip)
        };

        let (output, report) = geocode_table(&stations(), &geocoder, &options, || {}).await.unwrap();
        assert_eq!(report.rows_matched, 1);
        assert_eq!(report.found, 1);
        assert_eq!(&output.rows[0][2], "행복주유소");
    }

    #[tokio::test]
    async fn test_unknown_column_is_error() {
        let geocoder = StubGeocoder::new(vec![]);
        let options = GeocodeOptions { address_column: ColumnSelector::Index(9), ..options(FailurePolicy::Skip) };

        let result = geocode_table(&stations(), &geocoder, &options, || {}).await;
        assert!(matches!(result, Err(GeoprepError::FormatError { .. })));
        assert!(geocoder.calls().is_empty());
    }
}
