//! Common types used across the ledger

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// On-hand or cargo quantity
pub type Quantity = Decimal;

/// Free-form key/value metadata attached to items and cargo lines
pub type Metadata = BTreeMap<String, String>;

/// Schema version stamped on records when the caller does not supply one
pub const DEFAULT_SCHEMA_VERSION: &str = "1";

/// A site scoped to the company that owns it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteRef {
    pub company: String,
    pub site: String,
}

impl SiteRef {
    pub fn new(company: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            site: site.into(),
        }
    }
}

impl std::fmt::Display for SiteRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.company, self.site)
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

impl Pagination {
    /// Number of records skipped before this page starts
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.per_page as usize
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    /// Cut one page out of an already filtered result set
    pub fn paginate(records: Vec<T>, pagination: &Pagination) -> Self {
        let per_page = pagination.per_page.max(1);
        let total_items = records.len() as u64;
        let total_pages = total_items.div_ceil(per_page as u64) as u32;
        let data = records
            .into_iter()
            .skip(pagination.offset())
            .take(per_page as usize)
            .collect();

        Self {
            data,
            pagination: PaginationMeta {
                page: pagination.page.max(1),
                per_page,
                total_items,
                total_pages,
            },
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}
