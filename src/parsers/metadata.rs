use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use super::{get_attr, local_name};
use crate::error::MetadataError;

/// Entity information extracted from one SAML metadata document.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataSummary {
    /// `entityID` of every `EntityDescriptor`, in document order.
    pub entity_ids: Vec<String>,
    /// Entities that carry an `SPSSODescriptor`.
    pub sp_entity_ids: Vec<String>,
    /// Number of `EntitiesDescriptor` elements.
    pub entities_descriptors: usize,
}

impl MetadataSummary {
    pub fn is_federation(&self) -> bool {
        self.entities_descriptors > 0
    }
}

struct OpenEntity {
    id: Option<String>,
    depth: usize,
    is_sp: bool,
}

pub fn analyze(bytes: &[u8]) -> Result<MetadataSummary, MetadataError> {
    let mut reader = Reader::from_reader(bytes);
    let mut summary = MetadataSummary::default();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut open: Option<OpenEntity> = None;

    loop {
        match reader.read_event() {
            Err(e) => {
                return Err(MetadataError::Xml {
                    position: reader.error_position() as u64,
                    message: e.to_string(),
                })
            }
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                saw_root = true;
                depth += 1;
                visit(&e, depth, false, &mut summary, &mut open);
            }
            Ok(Event::Empty(e)) => {
                saw_root = true;
                visit(&e, depth + 1, true, &mut summary, &mut open);
            }
            Ok(Event::End(_)) => {
                if open.as_ref().is_some_and(|o| o.depth == depth) {
                    if let Some(OpenEntity {
                        id: Some(id),
                        is_sp: true,
                        ..
                    }) = open.take()
                    {
                        summary.sp_entity_ids.push(id);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(MetadataError::Empty);
    }
    if depth != 0 {
        return Err(MetadataError::Unbalanced(depth));
    }
    Ok(summary)
}

fn visit(
    e: &BytesStart<'_>,
    depth: usize,
    is_empty: bool,
    summary: &mut MetadataSummary,
    open: &mut Option<OpenEntity>,
) {
    match local_name(e).as_str() {
        "EntitiesDescriptor" => summary.entities_descriptors += 1,
        "EntityDescriptor" => {
            let id = get_attr(e, "entityID");
            if let Some(ref id) = id {
                summary.entity_ids.push(id.clone());
            }
            if !is_empty {
                *open = Some(OpenEntity {
                    id,
                    depth,
                    is_sp: false,
                });
            }
        }
        "SPSSODescriptor" => {
            if let Some(entity) = open.as_mut() {
                entity.is_sp = true;
            }
        }
        _ => {}
    }
}

/// Entity IDs in a metadata document.
///
/// `None` means the document is corrupt; a well-formed document without
/// entities yields an empty list.
pub fn extract_entity_ids(bytes: &[u8]) -> Option<Vec<String>> {
    match analyze(bytes) {
        Ok(summary) => Some(summary.entity_ids),
        Err(e) => {
            warn!("Unable to extract entity IDs from metadata: {}", e);
            None
        }
    }
}

/// Entity IDs of SP entities only; `None` when the document is corrupt.
pub fn extract_sp_entity_ids(bytes: &[u8]) -> Option<Vec<String>> {
    match analyze(bytes) {
        Ok(summary) => Some(summary.sp_entity_ids),
        Err(e) => {
            warn!("Unable to extract SP entity IDs from metadata: {}", e);
            None
        }
    }
}

/// True when the document aggregates entities under an `EntitiesDescriptor`.
pub fn is_federation_aggregate(bytes: &[u8]) -> bool {
    match analyze(bytes) {
        Ok(summary) => summary.is_federation(),
        Err(e) => {
            warn!("Failed to parse metadata while checking for a federation: {}", e);
            false
        }
    }
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, MetadataError> {
    std::fs::read(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Entity IDs from a metadata file; unreadable files count as corrupt.
pub fn entity_ids_from_file(path: &Path) -> Option<Vec<String>> {
    match read_file(path) {
        Ok(bytes) => extract_entity_ids(&bytes),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SP_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"
                             entityID="https://sp.example.org/shibboleth">
            <md:SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
                <md:AssertionConsumerService index="1" isDefault="true"
                    Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"
                    Location="https://sp.example.org/Shibboleth.sso/SAML2/POST"/>
            </md:SPSSODescriptor>
        </md:EntityDescriptor>"#;

    const FEDERATION: &str = r#"
        <EntitiesDescriptor xmlns="urn:oasis:names:tc:SAML:2.0:metadata" Name="urn:example:federation">
            <EntityDescriptor entityID="https://sp1.example.org">
                <SPSSODescriptor/>
            </EntityDescriptor>
            <EntityDescriptor entityID="https://idp.example.org">
                <IDPSSODescriptor/>
            </EntityDescriptor>
            <EntitiesDescriptor Name="nested">
                <EntityDescriptor entityID="https://sp2.example.org">
                    <SPSSODescriptor></SPSSODescriptor>
                </EntityDescriptor>
            </EntitiesDescriptor>
        </EntitiesDescriptor>"#;

    #[test]
    fn test_single_sp() {
        let summary = analyze(SP_METADATA.as_bytes()).unwrap();
        assert_eq!(summary.entity_ids, vec!["https://sp.example.org/shibboleth"]);
        assert_eq!(summary.sp_entity_ids, summary.entity_ids);
        assert!(!summary.is_federation());
        assert!(!is_federation_aggregate(SP_METADATA.as_bytes()));
    }

    #[test]
    fn test_federation_aggregate() {
        let summary = analyze(FEDERATION.as_bytes()).unwrap();
        assert_eq!(
            summary.entity_ids,
            vec![
                "https://sp1.example.org",
                "https://idp.example.org",
                "https://sp2.example.org"
            ]
        );
        assert_eq!(
            summary.sp_entity_ids,
            vec!["https://sp1.example.org", "https://sp2.example.org"]
        );
        assert_eq!(summary.entities_descriptors, 2);
        assert!(is_federation_aggregate(FEDERATION.as_bytes()));
    }

    #[test]
    fn test_zero_entities_is_empty_not_none() {
        let ids = extract_entity_ids(b"<EntitiesDescriptor/>").unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_corrupt_metadata_is_none() {
        assert!(extract_entity_ids(b"").is_none());
        assert!(extract_entity_ids(b"   \n").is_none());
        assert!(extract_entity_ids(b"<EntityDescriptor entityID=\"x\">").is_none());
        assert!(extract_entity_ids(b"<a><b></a>").is_none());
        assert!(!is_federation_aggregate(b"<EntitiesDescriptor>"));
    }

    #[test]
    fn test_escaped_entity_id() {
        let xml = r#"<EntityDescriptor entityID="https://sp.example.org/?a=1&amp;b=2"/>"#;
        assert_eq!(
            extract_entity_ids(xml.as_bytes()).unwrap(),
            vec!["https://sp.example.org/?a=1&b=2"]
        );
    }

    #[test]
    fn test_missing_file_is_none() {
        assert!(entity_ids_from_file(Path::new("/nonexistent/sp-metadata.xml")).is_none());
    }
}
