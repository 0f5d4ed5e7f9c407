//! Profile grouping: a presentation transform that inserts group
//! headers into the row sequence without reordering or altering rows.

use std::collections::BTreeMap;

use crate::model::{GroupedRow, ServiceRow};

/// Group label for services with no matching profile.
pub const NO_PROFILE_GROUP: &str = "(no-profile)";

/// Pick the group for one service: the first declared profile that
/// also appears in the configured order, or the first declared profile
/// at all when no order is configured.
fn group_for(declared: &[String], profile_order: &[String]) -> String {
    for profile in declared {
        if profile_order.is_empty() || profile_order.contains(profile) {
            return profile.clone();
        }
    }
    NO_PROFILE_GROUP.to_string()
}

/// Insert a header before the first row of each contiguous group run.
/// A label that recurs non-adjacently gets a fresh header for each
/// run.
pub fn group_rows(
    rows: Vec<ServiceRow>,
    service_profiles: &BTreeMap<String, Vec<String>>,
    profile_order: &[String],
) -> Vec<GroupedRow> {
    let mut out = Vec::with_capacity(rows.len() + 4);
    let mut current: Option<String> = None;
    for row in rows {
        let declared = service_profiles
            .get(&row.service)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let group = group_for(declared, profile_order);
        if current.as_deref() != Some(group.as_str()) {
            out.push(GroupedRow::Header {
                profile: group.clone(),
            });
            current = Some(group);
        }
        out.push(GroupedRow::Service(row));
    }
    out
}
