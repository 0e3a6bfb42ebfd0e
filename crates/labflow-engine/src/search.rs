//! Run search filters and list summaries

use labflow_model::{Block, BlockDefinition, Protocol, Run, SectionDefinition};

/// Criteria for narrowing a list of runs
///
/// Every criterion that is set must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunFilter {
    /// Plate label mentioned by any plate step
    pub plate_label: Option<String>,
    /// Reagent label used by any reagent step
    pub reagent_label: Option<String>,
    /// Sample label placed by any plate mapping
    pub sample_label: Option<f64>,
}

impl RunFilter {
    /// Create empty filter matching every run
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With plate label criterion
    #[inline]
    #[must_use]
    pub fn with_plate_label(mut self, label: impl Into<String>) -> Self {
        self.plate_label = Some(label.into());
        self
    }

    /// With reagent label criterion
    #[inline]
    #[must_use]
    pub fn with_reagent_label(mut self, label: impl Into<String>) -> Self {
        self.reagent_label = Some(label.into());
        self
    }

    /// With sample label criterion
    #[inline]
    #[must_use]
    pub fn with_sample_label(mut self, label: f64) -> Self {
        self.sample_label = Some(label);
        self
    }

    /// Whether the run satisfies every criterion set
    #[must_use]
    pub fn matches(&self, run: &Run) -> bool {
        if let Some(plate) = self.plate_label.as_deref() {
            if !run.blocks().any(|b| b.plate_labels().contains(&plate)) {
                return false;
            }
        }
        if let Some(reagent) = self.reagent_label.as_deref() {
            if !run.blocks().any(|b| b.reagent_label() == Some(reagent)) {
                return false;
            }
        }
        if let Some(sample) = self.sample_label {
            if !run.blocks().any(|b| mentions_sample(b, sample)) {
                return false;
            }
        }
        true
    }

    /// Runs satisfying the filter, in input order
    pub fn apply<'a>(&'a self, runs: &'a [Run]) -> impl Iterator<Item = &'a Run> + 'a {
        runs.iter().filter(move |run| self.matches(run))
    }
}

#[allow(clippy::float_cmp)]
fn mentions_sample(block: &Block, sample: f64) -> bool {
    let Block::PlateSampler(sampler) = block else {
        return false;
    };
    sampler
        .plate_mappings
        .values()
        .flatten()
        .any(|c| c.sample_label == Some(sample))
}

/// Remove bulky plate data from a run for list views
///
/// Drops plate mappings, marker tables and sequencing results from the run's
/// blocks, its section templates and its protocol snapshot.
pub fn strip_large_fields(run: &mut Run) {
    for section in &mut run.sections {
        strip_section_definition(&mut section.definition);
        for block in &mut section.blocks {
            match block {
                Block::PlateSampler(b) => b.plate_mappings.clear(),
                Block::EndPlateSequencer(b) => {
                    b.definition.plate_markers.clear();
                    b.plate_sequencing_results.clear();
                }
                _ => {}
            }
        }
    }
    if let Some(protocol) = run.protocol.as_mut() {
        strip_protocol(protocol);
    }
}

/// Remove marker tables from a protocol for list views
pub fn strip_protocol(protocol: &mut Protocol) {
    for section in &mut protocol.sections {
        strip_section_definition(section);
    }
}

fn strip_section_definition(section: &mut SectionDefinition) {
    for definition in &mut section.blocks {
        if let BlockDefinition::EndPlateSequencer(d) = definition {
            d.plate_markers.clear();
        }
    }
}
