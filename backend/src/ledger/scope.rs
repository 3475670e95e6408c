//! Site information resolved before an operation runs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::SiteRef;

use super::error::{LedgerError, LedgerResult};

/// What the site directory knows about one existing site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteStatus {
    /// Whether the ledger keeps inventory for this site
    pub tracked: bool,
}

/// Sites an operation may touch. A site missing from the scope does not exist.
#[derive(Debug, Clone, Default)]
pub struct SiteScope {
    sites: BTreeMap<SiteRef, SiteStatus>,
}

impl SiteScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, site: SiteRef, status: SiteStatus) {
        self.sites.insert(site, status);
    }

    pub fn with(mut self, site: SiteRef, tracked: bool) -> Self {
        self.insert(site, SiteStatus { tracked });
        self
    }

    pub fn require(&self, site: &SiteRef) -> LedgerResult<SiteStatus> {
        self.sites
            .get(site)
            .copied()
            .ok_or_else(|| LedgerError::SiteNotFound(site.clone()))
    }

    /// Unknown sites count as untracked
    pub fn is_tracked(&self, site: &SiteRef) -> bool {
        self.sites.get(site).map_or(false, |s| s.tracked)
    }
}
