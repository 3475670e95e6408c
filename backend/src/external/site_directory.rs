//! Site directory: which company sites exist and whether they are tracked
//!
//! Sites are reference data owned outside the ledger. The ledger only asks
//! whether a (company, site) pair exists and whether its inventory is kept.

use std::collections::BTreeMap;

use shared::SiteRef;
use sqlx::PgPool;

use crate::config::SiteEntry;
use crate::error::AppResult;
use crate::ledger::{SiteScope, SiteStatus};

#[axum::async_trait]
pub trait SiteDirectory: Send + Sync {
    /// `None` when the site does not exist for that company
    async fn lookup(&self, site: &SiteRef) -> AppResult<Option<SiteStatus>>;
}

/// Resolve every site an operation may touch into a scope for the engine
pub async fn resolve_scope<I>(directory: &dyn SiteDirectory, sites: I) -> AppResult<SiteScope>
where
    I: IntoIterator<Item = SiteRef>,
{
    let mut scope = SiteScope::new();
    for site in sites {
        if let Some(status) = directory.lookup(&site).await? {
            scope.insert(site, status);
        }
    }
    Ok(scope)
}

/// In-memory directory loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticSiteDirectory {
    sites: BTreeMap<SiteRef, SiteStatus>,
}

impl StaticSiteDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[SiteEntry]) -> Self {
        entries
            .iter()
            .fold(Self::new(), |dir, e| dir.with_site(&e.company, &e.site, e.tracked))
    }

    pub fn with_site(mut self, company: &str, site: &str, tracked: bool) -> Self {
        self.sites
            .insert(SiteRef::new(company, site), SiteStatus { tracked });
        self
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[axum::async_trait]
impl SiteDirectory for StaticSiteDirectory {
    async fn lookup(&self, site: &SiteRef) -> AppResult<Option<SiteStatus>> {
        Ok(self.sites.get(site).copied())
    }
}

/// Directory backed by the `sites` table
#[derive(Clone)]
pub struct PgSiteDirectory {
    db: PgPool,
}

impl PgSiteDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[axum::async_trait]
impl SiteDirectory for PgSiteDirectory {
    async fn lookup(&self, site: &SiteRef) -> AppResult<Option<SiteStatus>> {
        let tracked = sqlx::query_scalar::<_, bool>(
            "SELECT tracked FROM sites WHERE company_id = $1 AND site_id = $2",
        )
        .bind(&site.company)
        .bind(&site.site)
        .fetch_optional(&self.db)
        .await?;

        Ok(tracked.map(|tracked| SiteStatus { tracked }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_scope_skips_unknown_sites() {
        let directory = StaticSiteDirectory::new()
            .with_site("acme", "S1", true)
            .with_site("beta", "S2", false);

        let scope = resolve_scope(
            &directory,
            [
                SiteRef::new("acme", "S1"),
                SiteRef::new("beta", "S2"),
                SiteRef::new("acme", "S9"),
            ],
        )
        .await
        .unwrap();

        assert!(scope.is_tracked(&SiteRef::new("acme", "S1")));
        assert!(!scope.is_tracked(&SiteRef::new("beta", "S2")));
        assert!(scope.require(&SiteRef::new("beta", "S2")).is_ok());
        assert!(scope.require(&SiteRef::new("acme", "S9")).is_err());
    }

    #[test]
    fn test_site_is_scoped_to_company() {
        let directory = StaticSiteDirectory::new().with_site("acme", "S1", true);
        assert!(directory.sites.contains_key(&SiteRef::new("acme", "S1")));
        assert!(!directory.sites.contains_key(&SiteRef::new("beta", "S1")));
    }
}
