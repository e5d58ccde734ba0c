pub mod attribute;
pub mod context;
pub mod schema;
pub mod trust_relationship;
