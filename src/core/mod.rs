//! Core domain types shared by the pipeline, the store and the CLI.

pub mod record;
pub mod whitelist;

pub use record::{NewUser, UserRecord};
pub use whitelist::{Field, FieldSpec, FieldType, Operator, Whitelist};
