//! Export portal discovery.

use autocap_models::Portal;

use crate::config::ExportConfig;

/// Id used by clients for the single configured portal.
pub const DEFAULT_PORTAL_ID: &str = "default";

/// Numbered portals in slot order; the default portal when none are numbered.
pub fn list_portals(config: &ExportConfig) -> Vec<Portal> {
    if !config.portals.is_empty() {
        return config.portals.clone();
    }
    config
        .default_url
        .as_ref()
        .map(|url| Portal {
            id: DEFAULT_PORTAL_ID.to_string(),
            name: config.default_name.clone(),
            url: url.clone(),
        })
        .into_iter()
        .collect()
}

/// Delivery URL for `portal_id`. Absent or `default` selects the default portal.
pub fn resolve_portal_url(config: &ExportConfig, portal_id: Option<&str>) -> Option<String> {
    match portal_id.map(str::trim).filter(|id| !id.is_empty()) {
        None | Some(DEFAULT_PORTAL_ID) => config.default_url.clone(),
        Some(id) => config
            .portals
            .iter()
            .find(|portal| portal.id == id)
            .map(|portal| portal.url.clone()),
    }
}
