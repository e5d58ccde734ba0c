use tracing::warn;

use crate::model::trust_relationship::{MetadataFilter, TrustRelationship};
use crate::parsers::{metadata_filter, profile};
use crate::result::{ReportItem, Stage};

pub const ENTITY_ROLE_WHITE_LIST_TYPE: &str = "EntityRoleWhiteList";
pub const SIGNATURE_VALIDATION: &str = "signatureValidation";

/// Parse a relationship's stored profile and filter blobs into their
/// run-scoped forms. Bad blobs are dropped; the relationship always proceeds.
pub fn normalize(tr: &mut TrustRelationship) -> Vec<ReportItem> {
    let mut items = Vec::new();
    let label = tr.label();

    tr.profile_configurations = match tr.profile_configuration.as_deref() {
        Some(blob) => match profile::parse_str(blob) {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("Failed to parse stored profile configuration of {}: {}", label, e);
                items.push(ReportItem::skipped(
                    Stage::Filters,
                    &label,
                    &format!("profile configuration ignored: {}", e),
                ));
                Default::default()
            }
        },
        None => Default::default(),
    };

    let mut parsed = Vec::with_capacity(tr.metadata_filters.len());
    for blob in &tr.metadata_filters {
        match metadata_filter::parse_str(blob) {
            Ok(filter) => parsed.push(filter),
            Err(e) => {
                warn!("Failed to parse stored metadata filter of {}: {}", label, e);
                items.push(ReportItem::skipped(Stage::Filters, &label, &e.to_string()));
            }
        }
    }
    reorder_filters(&mut parsed);
    tr.parsed_filters = parsed;

    if items.is_empty() {
        items.push(ReportItem::ok(
            Stage::Filters,
            &label,
            &format!(
                "{} filter(s), {} profile(s)",
                tr.parsed_filters.len(),
                tr.profile_configurations.len()
            ),
        ));
    }
    items
}

/// Move every `EntityRoleWhiteList` filter to the end, keeping relative order.
pub fn reorder_filters(filters: &mut Vec<MetadataFilter>) {
    let (mut kept, white_lists): (Vec<_>, Vec<_>) = filters
        .drain(..)
        .partition(|f| f.filter_type != ENTITY_ROLE_WHITE_LIST_TYPE);
    kept.extend(white_lists);
    *filters = kept;
}
