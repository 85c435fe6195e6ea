use std::collections::BTreeMap;

use crate::{config::StartConfiguration, errors::RunError};

/// Pre-flight check over the whole declared set.
///
/// All violations are collected, not just the first: duplicate ids (one
/// error per offending id), links to ids that never appear, and links to
/// ids declared at or after the dependent configuration. Runs before any
/// provider call; a non-empty result aborts the run.
pub fn validate_start_configurations(configurations: &[StartConfiguration]) -> Vec<RunError> {
    let mut errors = Vec::new();

    let mut first_position: BTreeMap<&str, usize> = BTreeMap::new();
    let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
    for (position, configuration) in configurations.iter().enumerate() {
        let id = configuration.effective_id();
        first_position.entry(id).or_insert(position);
        *occurrences.entry(id).or_insert(0) += 1;
    }

    // Duplicate errors in declaration order of the first extra occurrence.
    let mut reported: Vec<&str> = Vec::new();
    for configuration in configurations {
        let id = configuration.effective_id();
        if occurrences[id] > 1 && !reported.contains(&id) {
            reported.push(id);
            errors.push(RunError::DuplicateId { id: id.to_owned() });
        }
    }

    for (position, configuration) in configurations.iter().enumerate() {
        let config_id = configuration.effective_id();
        for link in configuration.links() {
            match first_position.get(link.target()) {
                None => errors.push(RunError::UnknownLinkTarget {
                    config_id: config_id.to_owned(),
                    target: link.target().to_owned(),
                }),
                Some(&target_position) if target_position >= position => {
                    errors.push(RunError::LinkNotYetStarted {
                        config_id: config_id.to_owned(),
                        target: link.target().to_owned(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    errors
}
