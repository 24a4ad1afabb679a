//! Module registry core.
//!
//! A module is a named collection of field descriptors stored as data; forms,
//! tables and record validation are interpreted from it at runtime. This
//! crate holds the domain types, the port traits and every pure algorithm.
//! Storage adapters live in `modreg_postgres`; HTTP lives in `modreg_server`.

pub mod editor;
pub mod error;
pub mod field;
pub mod hydrate;
pub mod memory;
pub mod module;
pub mod ports;
pub mod principal;
pub mod render;
pub mod seeds;
pub mod service;
pub mod validate;
pub mod wire;

pub use error::{FieldErrors, RegistryError};
pub use field::{FieldDescriptor, FieldType, SelectOption, View};
pub use module::{Identity, ModuleDefinition, Record};
pub use principal::Principal;
pub use service::{RegistryService, RegistryServiceImpl};
