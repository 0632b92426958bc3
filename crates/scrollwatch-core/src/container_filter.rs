//! Allow/deny rules deciding which containers are scanned.

use crate::scan_config::ScanConfig;
use crate::scan_model::Container;

/// Returns true when `container` passes the configured allow/deny rules.
///
/// The name deny-list always wins. With no allow rules every remaining
/// container passes; otherwise any single matching allow rule suffices.
/// Threads match the channel-id allow-list through their parent id.
pub fn container_passes(container: &Container, config: &ScanConfig) -> bool {
    let name = container.name.trim();
    if config.exclude_channel_names.contains(name) {
        return false;
    }
    if !config.has_allow_rules() {
        return true;
    }
    let id_allowed = config.allow_channel_ids.contains(&container.id)
        || container
            .parent_id
            .is_some_and(|parent_id| config.allow_channel_ids.contains(&parent_id));
    let category_allowed = container
        .category_id
        .is_some_and(|category_id| config.allow_category_ids.contains(&category_id));
    let name_allowed = config.allow_channel_names.contains(name);
    id_allowed || category_allowed || name_allowed
}
