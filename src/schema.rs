use crate::error::SchemaLookupError;
use crate::model::schema::SchemaSnapshot;

/// Maps attribute names to directory OIDs against one schema snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    snapshot: &'a SchemaSnapshot,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(snapshot: &'a SchemaSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn resolve_oid(&self, attribute_name: &str) -> Result<&'a str, SchemaLookupError> {
        self.snapshot
            .attribute_types
            .iter()
            .find(|t| t.has_name(attribute_name))
            .filter(|t| !t.oid.is_empty())
            .map(|t| t.oid.as_str())
            .ok_or_else(|| SchemaLookupError(attribute_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::AttributeTypeDefinition;

    fn snapshot() -> SchemaSnapshot {
        SchemaSnapshot {
            attribute_types: vec![
                AttributeTypeDefinition {
                    oid: "2.5.4.3".to_string(),
                    names: vec!["cn".to_string(), "commonName".to_string()],
                },
                AttributeTypeDefinition {
                    oid: String::new(),
                    names: vec!["broken".to_string()],
                },
            ],
        }
    }

    #[test]
    fn resolves_any_alias() {
        let snapshot = snapshot();
        let resolver = SchemaResolver::new(&snapshot);
        assert_eq!(resolver.resolve_oid("cn").unwrap(), "2.5.4.3");
        assert_eq!(resolver.resolve_oid("CommonName").unwrap(), "2.5.4.3");
    }

    #[test]
    fn unknown_or_oidless_attribute_fails() {
        let snapshot = snapshot();
        let resolver = SchemaResolver::new(&snapshot);
        assert_eq!(
            resolver.resolve_oid("mail"),
            Err(SchemaLookupError("mail".to_string()))
        );
        assert!(resolver.resolve_oid("broken").is_err());
    }
}
