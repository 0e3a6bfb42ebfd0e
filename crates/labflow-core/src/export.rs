//! CSV export of sample results
//!
//! Fields are joined with commas and written as-is: embedded commas are not
//! quoted. Downstream consumers of this export split on `,` directly.

use crate::config::ExportConfig;
use labflow_model::SampleResult;

/// Header line for sample result exports
pub const SAMPLE_RESULT_HEADER: &str = "sampleID,runID,protocolID,result,signer,witness,completedOn";

/// Long human-readable date, e.g. `Saturday, May 1, 2021 9:00 AM`
const COMPLETED_ON_FORMAT: &str = "%A, %B %-d, %Y %-I:%M %p";

/// Format each item as a row and join rows with newlines
pub fn objects_to_csv<T>(items: &[T], to_row: impl Fn(&T) -> String) -> String {
    items.iter().map(to_row).collect::<Vec<_>>().join("\n")
}

/// One CSV row for a sample result
///
/// Multiple signers or witnesses are joined with `;`.
#[must_use]
pub fn sample_result_row(sample: &SampleResult) -> String {
    [
        sample.sample_id.clone(),
        sample.run_id.clone().unwrap_or_default(),
        sample.protocol_id.clone().unwrap_or_default(),
        sample.result.clone().unwrap_or_default(),
        sample.signers.join(";"),
        sample.witnesses.join(";"),
        sample
            .completed_on
            .map(|at| at.format(COMPLETED_ON_FORMAT).to_string())
            .unwrap_or_default(),
    ]
    .join(",")
}

/// Full export: optional header line, then one row per sample
#[must_use]
pub fn export_sample_results(samples: &[SampleResult], config: &ExportConfig) -> String {
    let rows = objects_to_csv(samples, sample_result_row);
    if config.include_header {
        format!("{SAMPLE_RESULT_HEADER}\n{rows}")
    } else {
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn sample(id: &str) -> SampleResult {
        SampleResult {
            sample_id: id.into(),
            run_id: Some("4".into()),
            protocol_id: Some("9".into()),
            result: Some("positive".into()),
            signers: vec!["alice".into()],
            witnesses: vec!["bob".into(), "carol".into()],
            completed_on: Some(Utc.with_ymd_and_hms(2021, 5, 1, 21, 5, 0).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn row_uses_long_date() {
        assert_eq!(
            sample_result_row(&sample("1001")),
            "1001,4,9,positive,alice,bob;carol,Saturday, May 1, 2021 9:05 PM"
        );
    }

    #[test]
    fn missing_fields_are_blank() {
        let row = sample_result_row(&SampleResult {
            sample_id: "12".into(),
            ..Default::default()
        });
        assert_eq!(row, "12,,,,,,");
    }

    #[test]
    fn header_is_optional() {
        let samples = [sample("1"), sample("2")];
        let with = export_sample_results(&samples, &ExportConfig::default());
        let without = export_sample_results(
            &samples,
            &ExportConfig {
                include_header: false,
            },
        );
        assert_eq!(with.lines().count(), 3);
        assert!(with.starts_with(SAMPLE_RESULT_HEADER));
        assert_eq!(without.lines().count(), 2);
        assert!(without.starts_with("1,"));
    }

    #[test]
    fn embedded_commas_are_not_quoted() {
        let mut s = sample("5");
        s.result = Some("positive, weak".into());
        assert!(sample_result_row(&s).contains(",positive, weak,"));
    }
}
