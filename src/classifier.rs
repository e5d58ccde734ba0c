use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::config::IdpLayout;
use crate::error::SynthesisError;
use crate::filters::SIGNATURE_VALIDATION;
use crate::model::context::TrustEngine;
use crate::model::trust_relationship::{Status, TrustRelationship};
use crate::parsers::metadata;
use crate::result::{ReportItem, Stage};
use crate::store::DirectoryStore;

/// Result of partitioning one run's relationships.
///
/// `standalone` and `deconstructed` index into the slice given to [`classify`].
#[derive(Debug, Default)]
pub struct Classification {
    /// inum → standalone sequence number, 1-based.
    pub trust_ids: BTreeMap<String, u32>,
    /// inum → entity IDs from the relationship's own metadata.
    pub trust_entity_ids: BTreeMap<String, Vec<String>>,
    /// entity ID → federation sequence number, 1-based.
    pub deconstructed_ids: BTreeMap<String, u32>,
    /// federation inum → member entity IDs, in input order.
    pub federations: BTreeMap<String, Vec<String>>,
    pub standalone: Vec<usize>,
    pub deconstructed: Vec<usize>,
    pub trust_engines: Vec<TrustEngine>,
    pub items: Vec<ReportItem>,
}

impl Classification {
    pub fn trust_engine_for(&self, tr: &TrustRelationship) -> Option<&TrustEngine> {
        let id = trust_engine_id(tr);
        self.trust_engines.iter().find(|e| e.id == id)
    }
}

pub fn trust_engine_id(tr: &TrustRelationship) -> String {
    format!("Trust{}", tr.sanitized_inum())
}

/// Partition relationships into standalone and federation-derived sets and
/// number each set in input order.
///
/// Standalone relationships whose metadata cannot be read are set INACTIVE,
/// persisted through `store` and left out of every output map.
#[tracing::instrument(skip_all, fields(count = relationships.len()))]
pub fn classify(
    relationships: &mut [TrustRelationship],
    layout: &IdpLayout,
    store: &dyn DirectoryStore,
) -> Classification {
    let mut result = Classification::default();
    let metadata_dir = layout.metadata_dir();
    let credentials_dir = layout.credentials_dir();
    let mut standalone_seq = 0u32;
    let mut federation_seq = 0u32;

    for (index, tr) in relationships.iter_mut().enumerate() {
        let label = tr.label();
        if tr.metadata_source_type.is_standalone() {
            let Some(entity_ids) = standalone_entity_ids(tr, &metadata_dir) else {
                mark_inactive(tr, store, &mut result.items);
                continue;
            };

            standalone_seq += 1;
            result.trust_ids.insert(tr.inum.clone(), standalone_seq);
            result
                .items
                .push(ReportItem::ok(
                    Stage::Classification,
                    &label,
                    &format!(
                        "{} #{}, {} entity ID(s)",
                        tr.metadata_source_type,
                        standalone_seq,
                        entity_ids.len()
                    ),
                ));
            result.trust_entity_ids.insert(tr.inum.clone(), entity_ids);
            result.standalone.push(index);

            if let Some(filter) = tr.filter(SIGNATURE_VALIDATION) {
                match filter.certificate_file.as_deref() {
                    Some(cert) => result.trust_engines.push(TrustEngine {
                        id: trust_engine_id(tr),
                        cert_path: credentials_dir.join(cert).to_string_lossy().to_string(),
                    }),
                    None => {
                        warn!("Signature validation filter of {} names no certificate", label);
                        result.items.push(ReportItem::skipped(
                            Stage::Classification,
                            &label,
                            "signature validation filter names no certificate, no trust engine",
                        ));
                    }
                }
            }
        } else {
            let (Some(parent), Some(entity_id)) =
                (tr.container_federation.clone(), tr.entity_id.clone())
            else {
                warn!("Federation relationship {} has no parent federation or entity ID", label);
                result.items.push(ReportItem::skipped(
                    Stage::Classification,
                    &label,
                    "federation relationship without parent federation or entity ID",
                ));
                continue;
            };

            federation_seq += 1;
            result.deconstructed_ids.insert(entity_id.clone(), federation_seq);
            result
                .federations
                .entry(parent.clone())
                .or_default()
                .push(entity_id);
            result.deconstructed.push(index);
            result.items.push(ReportItem::ok(
                Stage::Classification,
                &label,
                &format!("member #{} of federation {}", federation_seq, parent),
            ));
        }
    }

    // A federation's own entry must not also trust the members it was
    // deconstructed into.
    for (federation, members) in &result.federations {
        if let Some(entity_ids) = result.trust_entity_ids.get_mut(federation) {
            let before = entity_ids.len();
            entity_ids.retain(|id| !members.contains(id));
            debug!(
                federation = %federation,
                removed = before - entity_ids.len(),
                "excluded deconstructed members"
            );
        }
    }

    info!(
        standalone = result.trust_ids.len(),
        deconstructed = result.deconstructed_ids.len(),
        engines = result.trust_engines.len(),
        "classified trust relationships"
    );
    result
}

fn standalone_entity_ids(tr: &TrustRelationship, metadata_dir: &Path) -> Option<Vec<String>> {
    let Some(file_name) = tr.metadata_file_name.as_deref().filter(|n| !n.is_empty()) else {
        warn!("Trust relationship {} has no metadata file", tr.label());
        return None;
    };
    metadata::entity_ids_from_file(&metadata_dir.join(file_name))
}

fn mark_inactive(tr: &mut TrustRelationship, store: &dyn DirectoryStore, items: &mut Vec<ReportItem>) {
    let label = tr.label();
    error!("Metadata of {} is missing or corrupt, setting it INACTIVE", label);
    tr.status = Status::Inactive;
    match store.merge_trust_relationship(tr) {
        Ok(()) => items.push(ReportItem::skipped(
            Stage::Classification,
            &label,
            "metadata missing or corrupt, set INACTIVE",
        )),
        Err(e) => {
            error!("Failed to persist INACTIVE status of {}: {}", label, e);
            items.push(ReportItem::fatal(
                Stage::Classification,
                &label,
                &SynthesisError::Store(e),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::MemoryStore;
    use crate::model::trust_relationship::MetadataSourceType;
    use crate::parsers::metadata_filter;
    use crate::result::ItemStatus;
    use std::fs;
    use tempfile::TempDir;

    fn sp_metadata(entity_ids: &[&str]) -> String {
        let entities: String = entity_ids
            .iter()
            .map(|id| format!("<EntityDescriptor entityID=\"{}\"><SPSSODescriptor/></EntityDescriptor>", id))
            .collect();
        if entity_ids.len() == 1 {
            entities
        } else {
            format!("<EntitiesDescriptor>{}</EntitiesDescriptor>", entities)
        }
    }

    fn standalone(inum: &str, file: &str) -> TrustRelationship {
        TrustRelationship {
            inum: inum.to_string(),
            metadata_source_type: MetadataSourceType::File,
            metadata_file_name: Some(file.to_string()),
            ..Default::default()
        }
    }

    fn member(inum: &str, parent: &str, entity_id: &str) -> TrustRelationship {
        TrustRelationship {
            inum: inum.to_string(),
            metadata_source_type: MetadataSourceType::Federation,
            container_federation: Some(parent.to_string()),
            entity_id: Some(entity_id.to_string()),
            ..Default::default()
        }
    }

    struct Fixture {
        _dir: TempDir,
        layout: IdpLayout,
    }

    fn fixture(files: &[(&str, String)]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let layout = IdpLayout::new(dir.path());
        fs::create_dir_all(layout.metadata_dir()).unwrap();
        for (name, content) in files {
            fs::write(layout.metadata_dir().join(name), content).unwrap();
        }
        Fixture { _dir: dir, layout }
    }

    #[test]
    fn separate_counters_follow_input_order() {
        let fx = fixture(&[
            ("a.xml", sp_metadata(&["https://a.example.org"])),
            ("b.xml", sp_metadata(&["https://b.example.org"])),
        ]);
        let store = MemoryStore::default();
        let mut trs = vec![
            member("@!F1", "@!FED", "https://m1.example.org"),
            standalone("@!A", "a.xml"),
            member("@!F2", "@!FED", "https://m2.example.org"),
            standalone("@!B", "b.xml"),
        ];

        let c = classify(&mut trs, &fx.layout, &store);
        assert_eq!(c.trust_ids["@!A"], 1);
        assert_eq!(c.trust_ids["@!B"], 2);
        assert_eq!(c.deconstructed_ids["https://m1.example.org"], 1);
        assert_eq!(c.deconstructed_ids["https://m2.example.org"], 2);
        assert_eq!(c.standalone, vec![1, 3]);
        assert_eq!(c.deconstructed, vec![0, 2]);
        assert_eq!(
            c.federations["@!FED"],
            vec!["https://m1.example.org", "https://m2.example.org"]
        );
    }

    #[test]
    fn federation_members_are_excluded_from_parent() {
        let fx = fixture(&[(
            "fed.xml",
            sp_metadata(&[
                "https://e1.example.org",
                "https://e2.example.org",
                "https://e3.example.org",
            ]),
        )]);
        let store = MemoryStore::default();
        let mut trs = vec![
            standalone("@!FED", "fed.xml"),
            member("@!F1", "@!FED", "https://e1.example.org"),
            member("@!F2", "@!FED", "https://e2.example.org"),
        ];

        let c = classify(&mut trs, &fx.layout, &store);
        assert_eq!(
            c.trust_entity_ids["@!FED"],
            vec!["https://e3.example.org".to_string()]
        );
        assert_eq!(
            c.federations["@!FED"],
            vec!["https://e1.example.org", "https://e2.example.org"]
        );
    }

    #[test]
    fn corrupt_metadata_is_inactive_and_persisted() {
        let fx = fixture(&[
            ("good.xml", sp_metadata(&["https://good.example.org"])),
            ("bad.xml", "<EntityDescriptor entityID=\"x\">".to_string()),
        ]);
        let store = MemoryStore::default();
        let mut trs = vec![
            standalone("@!BAD", "bad.xml"),
            standalone("@!GOOD", "good.xml"),
            standalone("@!GONE", "missing.xml"),
        ];
        store.relationships.borrow_mut().extend(trs.iter().cloned());

        let c = classify(&mut trs, &fx.layout, &store);
        assert!(!c.trust_ids.contains_key("@!BAD"));
        assert!(!c.trust_ids.contains_key("@!GONE"));
        assert_eq!(c.trust_ids["@!GOOD"], 1);
        assert_eq!(trs[0].status, Status::Inactive);
        assert_eq!(trs[2].status, Status::Inactive);

        let persisted = store.find_trust_relationship("@!BAD").unwrap().unwrap();
        assert_eq!(persisted.status, Status::Inactive);
        assert_eq!(
            c.items.iter().filter(|i| i.status == ItemStatus::Skipped).count(),
            2
        );
    }

    #[test]
    fn failed_status_persist_is_fatal() {
        let fx = fixture(&[]);
        let store = MemoryStore::default();
        let mut trs = vec![standalone("@!UNSTORED", "missing.xml")];
        let c = classify(&mut trs, &fx.layout, &store);
        assert_eq!(c.items[0].status, ItemStatus::Fatal);
        assert!(c.trust_ids.is_empty());
    }

    #[test]
    fn orphan_federation_member_is_skipped() {
        let fx = fixture(&[]);
        let store = MemoryStore::default();
        let mut orphan = member("@!F1", "@!FED", "https://m1.example.org");
        orphan.container_federation = None;
        let mut trs = vec![orphan];

        let c = classify(&mut trs, &fx.layout, &store);
        assert!(c.deconstructed_ids.is_empty());
        assert_eq!(c.items[0].status, ItemStatus::Skipped);
    }

    #[test]
    fn signature_validation_emits_trust_engine() {
        let fx = fixture(&[("a.xml", sp_metadata(&["https://a.example.org"]))]);
        let store = MemoryStore::default();
        let mut tr = standalone("@!1111!0001", "a.xml");
        tr.parsed_filters = vec![metadata_filter::parse_str(
            "<MetadataFilter xsi:type=\"SignatureValidation\" certificateFile=\"fed.crt\"/>",
        )
        .unwrap()];
        let mut trs = vec![tr];

        let c = classify(&mut trs, &fx.layout, &store);
        assert_eq!(c.trust_engines.len(), 1);
        assert_eq!(c.trust_engines[0].id, "Trust11110001");
        assert!(c.trust_engines[0].cert_path.ends_with("metadata/credentials/fed.crt"));
        assert!(c.trust_engine_for(&trs[0]).is_some());
    }
}
