//! Per-sample results collected from a run
//!
//! Plate sampler mappings say which sample sits in which well; sequencer
//! results say what each well produced. The two are joined on plate label,
//! row and column. Run-level overrides then replace collected entries with
//! the same sample id.

use labflow_engine::derive_status;
use labflow_model::{Block, CellValue, PlateResult, Run, RunStatus, SampleResult};

/// Every sample result the run can report
///
/// Samples are listed in mapping order. A mapped well with no sequencer
/// result still yields an entry, with no result call.
#[must_use]
pub fn collect_sample_results(run: &Run) -> Vec<SampleResult> {
    let results: Vec<&PlateResult> = run
        .blocks()
        .filter_map(|block| match block {
            Block::EndPlateSequencer(b) => Some(&b.plate_sequencing_results),
            _ => None,
        })
        .flatten()
        .collect();

    let signers = distinct(run.sections.iter().filter_map(|s| s.signature.as_deref()));
    let witnesses = distinct(run.sections.iter().filter_map(|s| s.witness.as_deref()));
    let plate_lots = distinct(run.blocks().filter_map(|block| match block {
        Block::PlateAddReagent(b) => b.plate_lot.as_deref(),
        _ => None,
    }));
    let completed_on = completed_on(run);
    let protocol_id = run.protocol.as_ref().and_then(|p| p.id.clone());

    let mut samples = Vec::new();
    for block in run.blocks() {
        let Block::PlateSampler(sampler) = block else {
            continue;
        };
        for (plate_label, wells) in &sampler.plate_mappings {
            for well in wells {
                let Some(sample_label) = well.sample_label else {
                    continue;
                };
                let result = match (well.row, well.col) {
                    (Some(row), Some(col)) => {
                        results.iter().find(|r| r.is_at(plate_label, row, col))
                    }
                    _ => None,
                };
                samples.push(SampleResult {
                    sample_id: CellValue::Number(sample_label).to_text(),
                    run_id: run.id.clone(),
                    protocol_id: protocol_id.clone(),
                    plate_id: Some(plate_label.clone()),
                    result: result.and_then(|r| r.classification.clone()),
                    marker1: result.and_then(|r| r.marker1.clone()),
                    marker2: result.and_then(|r| r.marker2.clone()),
                    plate_row: well.row,
                    plate_col: well.col,
                    signers: signers.clone(),
                    witnesses: witnesses.clone(),
                    plate_lots: plate_lots.clone(),
                    completed_on,
                });
            }
        }
    }

    apply_overrides(&mut samples, &run.sample_overrides);
    tracing::debug!(run = ?run.id, samples = samples.len(), "collected sample results");
    samples
}

/// Replace entries by sample id; overrides for unknown samples are appended
pub fn apply_overrides(samples: &mut Vec<SampleResult>, overrides: &[SampleResult]) {
    for replacement in overrides {
        match samples
            .iter_mut()
            .find(|s| s.sample_id == replacement.sample_id)
        {
            Some(existing) => *existing = replacement.clone(),
            None => samples.push(replacement.clone()),
        }
    }
}

/// Latest sign-off time, once the run is completed
fn completed_on(run: &Run) -> Option<chrono::DateTime<chrono::Utc>> {
    if derive_status(run) != RunStatus::Completed {
        return None;
    }
    run.sections
        .iter()
        .flat_map(|s| [s.signed_on, s.witnessed_on])
        .flatten()
        .max()
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        if !out.iter().any(|seen| seen == value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use labflow_model::{
        EndPlateSequencerBlock, PlateCoordinate, PlateSamplerBlock, Section, SectionDefinition,
    };

    fn run_with(blocks: Vec<Block>) -> Run {
        Run {
            id: Some("run-1".into()),
            sections: vec![Section {
                definition: SectionDefinition::new("s1"),
                blocks,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn sampler(plate: &str, wells: Vec<PlateCoordinate>) -> Block {
        let mut block = PlateSamplerBlock::default();
        block.plate_mappings.insert(plate.into(), wells);
        Block::PlateSampler(block)
    }

    fn sequencer(results: Vec<PlateResult>) -> Block {
        Block::EndPlateSequencer(EndPlateSequencerBlock {
            plate_sequencing_results: results,
            ..Default::default()
        })
    }

    fn call(plate: &str, row: u32, col: u32, classification: &str) -> PlateResult {
        PlateResult {
            plate_label: Some(plate.into()),
            plate_row: Some(row),
            plate_col: Some(col),
            classification: Some(classification.into()),
            ..Default::default()
        }
    }

    #[test]
    fn joins_on_plate_and_position() {
        let run = run_with(vec![
            sampler(
                "P1",
                vec![
                    PlateCoordinate::at(0, 1).with_sample(1001.0),
                    PlateCoordinate::at(0, 2).with_sample(1002.0),
                ],
            ),
            sequencer(vec![call("P1", 0, 2, "negative"), call("P2", 0, 1, "positive")]),
        ]);

        let samples = collect_sample_results(&run);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].sample_id, "1001");
        assert_eq!(samples[0].result, None);
        assert_eq!(samples[1].sample_id, "1002");
        assert_eq!(samples[1].result.as_deref(), Some("negative"));
        assert_eq!(samples[1].run_id.as_deref(), Some("run-1"));
        assert_eq!(samples[1].plate_id.as_deref(), Some("P1"));
    }

    #[test]
    fn wells_without_samples_are_skipped() {
        let run = run_with(vec![sampler("P1", vec![PlateCoordinate::at(3, 4)])]);
        assert!(collect_sample_results(&run).is_empty());
    }

    #[test]
    fn overrides_replace_by_sample_id() {
        let mut samples = vec![SampleResult {
            sample_id: "7".into(),
            result: Some("positive".into()),
            ..Default::default()
        }];
        apply_overrides(
            &mut samples,
            &[
                SampleResult {
                    sample_id: "7".into(),
                    result: Some("inconclusive".into()),
                    ..Default::default()
                },
                SampleResult {
                    sample_id: "8".into(),
                    ..Default::default()
                },
            ],
        );
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].result.as_deref(), Some("inconclusive"));
    }

    #[test]
    fn distinct_drops_blanks_and_repeats() {
        let values = ["alice", " ", "bob", "alice"];
        assert_eq!(distinct(values.into_iter()), vec!["alice", "bob"]);
    }
}
