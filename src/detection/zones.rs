// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Zone rule matching

use std::collections::BTreeSet;

use crate::config::{ZoneRule, WILDCARD};

/// Whether any rule's zone is active for this label.
///
/// An empty rule list answers `default`. A rule applies to the label when its
/// label list holds `"*"` or the label itself; an event without a label is
/// matched by every rule whose zone is active.
pub fn zone_match(
    rules: &[ZoneRule],
    active_zones: &BTreeSet<String>,
    label: Option<&str>,
    default: bool,
) -> bool {
    if rules.is_empty() {
        return default;
    }

    rules.iter().any(|rule| {
        active_zones.contains(&rule.zone)
            && match label {
                None => true,
                Some(label) => rule.labels.iter().any(|l| l == WILDCARD || l == label),
            }
    })
}
