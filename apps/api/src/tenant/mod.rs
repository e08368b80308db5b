pub mod bundle;
pub mod handlers;
pub mod links;
pub mod pg_source;
pub mod resolver;
pub mod source;
pub mod views;

pub use bundle::TenantBundle;
pub use resolver::CompanyDataResolver;
pub use source::{JsonDirSource, TenantSource};
