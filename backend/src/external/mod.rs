//! Collaborators outside the ledger

pub mod site_directory;

pub use site_directory::{resolve_scope, PgSiteDirectory, SiteDirectory, StaticSiteDirectory};
