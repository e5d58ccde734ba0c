use std::cell::OnceCell;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::model::attribute::Attribute;
use crate::model::schema::SchemaSnapshot;
use crate::store::{DirectoryStore, SchemaService};

/// Read-through cache scoped to a single synthesis run.
///
/// The attribute set and schema snapshot are fetched on first use and then
/// served unchanged for the rest of the run.
pub struct RunCache<'a> {
    store: &'a dyn DirectoryStore,
    schema_service: &'a dyn SchemaService,
    attributes: OnceCell<Vec<Attribute>>,
    schema: OnceCell<SchemaSnapshot>,
}

impl<'a> RunCache<'a> {
    pub fn new(store: &'a dyn DirectoryStore, schema_service: &'a dyn SchemaService) -> Self {
        Self {
            store,
            schema_service,
            attributes: OnceCell::new(),
            schema: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &'a dyn DirectoryStore {
        self.store
    }

    pub fn schema_service(&self) -> &'a dyn SchemaService {
        self.schema_service
    }

    pub fn attributes(&self) -> Result<&[Attribute], StoreError> {
        if let Some(attributes) = self.attributes.get() {
            return Ok(attributes);
        }
        let loaded = self.store.person_attributes()?;
        Ok(self.attributes.get_or_init(|| loaded))
    }

    pub fn schema(&self) -> Result<&SchemaSnapshot, StoreError> {
        if let Some(schema) = self.schema.get() {
            return Ok(schema);
        }
        let loaded = self.schema_service.schema()?;
        Ok(self.schema.get_or_init(|| loaded))
    }

    pub fn attribute_by_name(&self, name: &str) -> Result<Option<&Attribute>, StoreError> {
        Ok(self
            .attributes()?
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name)))
    }

    pub fn attributes_by_dn(&self) -> Result<HashMap<&str, &Attribute>, StoreError> {
        Ok(self
            .attributes()?
            .iter()
            .map(|a| (a.dn.as_str(), a))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory store used by unit tests across the crate.

    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::model::attribute::{CasConfiguration, NameIdConfig};
    use crate::model::schema::AttributeTypeDefinition;
    use crate::model::trust_relationship::TrustRelationship;

    #[derive(Default)]
    pub struct MemoryStore {
        pub relationships: RefCell<Vec<TrustRelationship>>,
        pub attributes: Vec<Attribute>,
        pub schema: SchemaSnapshot,
        pub name_ids: Vec<NameIdConfig>,
        pub cas: Option<CasConfiguration>,
        pub cas_broken: bool,
        pub own_sp: RefCell<Option<String>>,
        pub attribute_reads: Cell<usize>,
        pub schema_reads: Cell<usize>,
    }

    impl MemoryStore {
        pub fn with_attributes(names: &[(&str, &str)]) -> Self {
            let attributes = names
                .iter()
                .map(|(name, _)| Attribute {
                    dn: attribute_dn(name),
                    name: name.to_string(),
                    ..Default::default()
                })
                .collect();
            let schema = SchemaSnapshot {
                attribute_types: names
                    .iter()
                    .map(|(name, oid)| AttributeTypeDefinition {
                        oid: oid.to_string(),
                        names: vec![name.to_string()],
                    })
                    .collect(),
            };
            Self {
                attributes,
                schema,
                ..Default::default()
            }
        }
    }

    pub fn attribute_dn(name: &str) -> String {
        format!("inum={},ou=attributes,o=gluu", name)
    }

    impl DirectoryStore for MemoryStore {
        fn trust_relationships(&self) -> Result<Vec<TrustRelationship>, StoreError> {
            Ok(self.relationships.borrow().clone())
        }

        fn find_trust_relationship(
            &self,
            inum: &str,
        ) -> Result<Option<TrustRelationship>, StoreError> {
            Ok(self
                .relationships
                .borrow()
                .iter()
                .find(|t| t.inum == inum)
                .cloned())
        }

        fn merge_trust_relationship(&self, relationship: &TrustRelationship) -> Result<(), StoreError> {
            let mut all = self.relationships.borrow_mut();
            match all.iter_mut().find(|t| t.inum == relationship.inum) {
                Some(existing) => {
                    *existing = relationship.clone();
                    Ok(())
                }
                None => Err(StoreError::NotFound(relationship.inum.clone())),
            }
        }

        fn add_trust_relationship(&self, relationship: &TrustRelationship) -> Result<(), StoreError> {
            self.relationships.borrow_mut().push(relationship.clone());
            Ok(())
        }

        fn generate_inum(&self) -> Result<String, StoreError> {
            Ok(format!("@!0000!{:04}", self.relationships.borrow().len() + 1))
        }

        fn person_attributes(&self) -> Result<Vec<Attribute>, StoreError> {
            self.attribute_reads.set(self.attribute_reads.get() + 1);
            Ok(self.attributes.clone())
        }

        fn name_id_configs(&self) -> Result<Vec<NameIdConfig>, StoreError> {
            Ok(self.name_ids.clone())
        }

        fn cas_configuration(&self) -> Result<Option<CasConfiguration>, StoreError> {
            if self.cas_broken {
                return Err(StoreError::NotFound("cas".to_string()));
            }
            Ok(self.cas.clone())
        }

        fn persistence_type(&self) -> Result<String, StoreError> {
            Ok("ldap".to_string())
        }

        fn own_sp_inum(&self) -> Result<Option<String>, StoreError> {
            Ok(self.own_sp.borrow().clone())
        }

        fn set_own_sp_inum(&self, inum: &str) -> Result<(), StoreError> {
            *self.own_sp.borrow_mut() = Some(inum.to_string());
            Ok(())
        }
    }

    impl SchemaService for MemoryStore {
        fn schema(&self) -> Result<SchemaSnapshot, StoreError> {
            self.schema_reads.set(self.schema_reads.get() + 1);
            Ok(self.schema.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryStore;
    use super::*;

    #[test]
    fn reads_each_snapshot_once() {
        let store = MemoryStore::with_attributes(&[("uid", "0.9.2342.19200300.100.1.1")]);
        let cache = RunCache::new(&store, &store);

        assert!(cache.attribute_by_name("UID").unwrap().is_some());
        assert!(cache.attribute_by_name("mail").unwrap().is_none());
        cache.attributes_by_dn().unwrap();
        cache.schema().unwrap();
        cache.schema().unwrap();

        assert_eq!(store.attribute_reads.get(), 1);
        assert_eq!(store.schema_reads.get(), 1);
    }
}
