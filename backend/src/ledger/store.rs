//! Item ledger storage and the per-operation write overlay

use std::collections::{BTreeMap, BTreeSet};

use shared::{InventoryLogEntry, Item, ItemFilter, ItemKey, SiteRef};

/// Current on-hand records keyed by (company, site, item) with secondary indices
#[derive(Debug, Default, Clone)]
pub struct ItemStore {
    items: BTreeMap<ItemKey, Item>,
    by_product: BTreeMap<String, BTreeSet<ItemKey>>,
    by_delivery: BTreeMap<String, BTreeSet<ItemKey>>,
    by_creator: BTreeMap<String, BTreeSet<ItemKey>>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &ItemKey) -> Option<&Item> {
        self.items.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Insert or replace an item, keeping the indices in step
    pub fn insert(&mut self, item: Item) {
        let key = item.key();
        self.unindex(&key);
        index(&mut self.by_product, &item.product, &key);
        if let Some(delivery) = &item.delivery {
            index(&mut self.by_delivery, delivery, &key);
        }
        index(&mut self.by_creator, &item.created_by, &key);
        self.items.insert(key, item);
    }

    pub fn remove(&mut self, key: &ItemKey) -> Option<Item> {
        self.unindex(key);
        self.items.remove(key)
    }

    fn unindex(&mut self, key: &ItemKey) {
        if let Some(old) = self.items.get(key) {
            unindex(&mut self.by_product, &old.product, key);
            if let Some(delivery) = &old.delivery {
                unindex(&mut self.by_delivery, delivery, key);
            }
            unindex(&mut self.by_creator, &old.created_by, key);
        }
    }

    pub fn by_company<'a>(&'a self, company: &str) -> impl Iterator<Item = &'a Item> + 'a {
        let start = ItemKey::new(company, "", "");
        let company = company.to_string();
        self.items
            .range(start..)
            .take_while(move |(key, _)| key.company == company)
            .map(|(_, item)| item)
    }

    pub fn by_site<'a>(&'a self, site: &SiteRef) -> impl Iterator<Item = &'a Item> + 'a {
        let start = ItemKey::at(site, "");
        let site = site.clone();
        self.items
            .range(start..)
            .take_while(move |(key, _)| key.company == site.company && key.site == site.site)
            .map(|(_, item)| item)
    }

    pub fn by_site_product<'a>(
        &'a self,
        site: &SiteRef,
        product: &str,
    ) -> impl Iterator<Item = &'a Item> + 'a {
        let product = product.to_string();
        self.by_site(site).filter(move |item| item.product == product)
    }

    pub fn by_product(&self, product: &str) -> Vec<&Item> {
        self.lookup(&self.by_product, product)
    }

    pub fn by_delivery(&self, delivery: &str) -> Vec<&Item> {
        self.lookup(&self.by_delivery, delivery)
    }

    pub fn by_creator(&self, user: &str) -> Vec<&Item> {
        self.lookup(&self.by_creator, user)
    }

    fn lookup(&self, index: &BTreeMap<String, BTreeSet<ItemKey>>, value: &str) -> Vec<&Item> {
        index
            .get(value)
            .map(|keys| keys.iter().filter_map(|key| self.items.get(key)).collect())
            .unwrap_or_default()
    }

    /// Items matching a filter, using the narrowest index available
    pub fn list(&self, filter: &ItemFilter) -> Vec<&Item> {
        let candidates: Vec<&Item> = match (&filter.company, &filter.site) {
            (Some(company), Some(site)) => {
                let site = SiteRef::new(company.clone(), site.clone());
                self.by_site(&site).collect()
            }
            (Some(company), None) => self.by_company(company).collect(),
            _ => {
                if let Some(delivery) = &filter.delivery {
                    self.by_delivery(delivery)
                } else if let Some(product) = &filter.product {
                    self.by_product(product)
                } else if let Some(user) = &filter.created_by {
                    self.by_creator(user)
                } else {
                    self.items.values().collect()
                }
            }
        };
        candidates.into_iter().filter(|item| filter.matches(item)).collect()
    }
}

fn index(index: &mut BTreeMap<String, BTreeSet<ItemKey>>, value: &str, key: &ItemKey) {
    index.entry(value.to_string()).or_default().insert(key.clone());
}

fn unindex(index: &mut BTreeMap<String, BTreeSet<ItemKey>>, value: &str, key: &ItemKey) {
    if let Some(keys) = index.get_mut(value) {
        keys.remove(key);
        if keys.is_empty() {
            index.remove(value);
        }
    }
}

/// Writes staged by one operation, applied together on commit
#[derive(Debug, Default)]
pub struct TxChanges {
    pub items: BTreeMap<ItemKey, Option<Item>>,
    pub entries: Vec<InventoryLogEntry>,
}

/// Read-through overlay over the item store.
///
/// Reads see the operation's own staged writes. Nothing reaches the store or
/// the audit log until the changes are committed, so an error part-way
/// through an operation leaves no trace.
#[derive(Debug)]
pub struct LedgerTx<'a> {
    store: &'a ItemStore,
    staged: BTreeMap<ItemKey, Option<Item>>,
    entries: Vec<InventoryLogEntry>,
}

impl<'a> LedgerTx<'a> {
    pub fn new(store: &'a ItemStore) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &ItemKey) -> Option<&Item> {
        match self.staged.get(key) {
            Some(staged) => staged.as_ref(),
            None => self.store.get(key),
        }
    }

    pub fn put(&mut self, item: Item) {
        self.staged.insert(item.key(), Some(item));
    }

    pub fn remove(&mut self, key: &ItemKey) {
        self.staged.insert(key.clone(), None);
    }

    pub fn record(&mut self, entry: InventoryLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[InventoryLogEntry] {
        &self.entries
    }

    pub fn into_changes(self) -> TxChanges {
        TxChanges {
            items: self.staged,
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shared::Metadata;

    fn item(company: &str, site: &str, id: &str, product: &str) -> Item {
        let now = Utc::now();
        Item {
            company: company.into(),
            site: site.into(),
            item_id: id.into(),
            product: product.into(),
            quantity: Decimal::from(5),
            metadata: Metadata::new(),
            delivery: None,
            created_by: "alice".into(),
            updated_by: "alice".into(),
            created_at: now,
            updated_at: now,
            version: "1".into(),
        }
    }

    #[test]
    fn test_site_and_company_scans() {
        let mut store = ItemStore::new();
        store.insert(item("acme", "S1", "a", "widget"));
        store.insert(item("acme", "S1", "b", "gadget"));
        store.insert(item("acme", "S2", "c", "widget"));
        store.insert(item("beta", "S1", "d", "widget"));

        let s1 = SiteRef::new("acme", "S1");
        assert_eq!(store.by_site(&s1).count(), 2);
        assert_eq!(store.by_company("acme").count(), 3);
        assert_eq!(store.by_site_product(&s1, "widget").count(), 1);
        assert_eq!(store.by_product("widget").len(), 3);
    }

    #[test]
    fn test_reindex_on_replace() {
        let mut store = ItemStore::new();
        store.insert(item("acme", "S1", "a", "widget"));

        let mut changed = item("acme", "S1", "a", "gadget");
        changed.delivery = Some("D1".into());
        store.insert(changed);

        assert!(store.by_product("widget").is_empty());
        assert_eq!(store.by_product("gadget").len(), 1);
        assert_eq!(store.by_delivery("D1").len(), 1);

        store.remove(&ItemKey::new("acme", "S1", "a"));
        assert!(store.by_delivery("D1").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_overlay_reads_staged_writes() {
        let mut store = ItemStore::new();
        store.insert(item("acme", "S1", "a", "widget"));
        let key = ItemKey::new("acme", "S1", "a");

        let mut tx = LedgerTx::new(&store);
        tx.remove(&key);
        assert!(tx.get(&key).is_none());

        tx.put(item("acme", "S1", "b", "widget"));
        assert!(tx.get(&ItemKey::new("acme", "S1", "b")).is_some());

        let changes = tx.into_changes();
        assert_eq!(changes.items.len(), 2);
        // The store itself is untouched until commit
        assert!(store.get(&key).is_some());
    }

    #[test]
    fn test_list_with_filter() {
        let mut store = ItemStore::new();
        store.insert(item("acme", "S1", "a", "widget"));
        store.insert(item("acme", "S2", "b", "widget"));

        let filter = ItemFilter {
            company: Some("acme".into()),
            product: Some("widget".into()),
            ..Default::default()
        };
        assert_eq!(store.list(&filter).len(), 2);

        let filter = ItemFilter {
            company: Some("acme".into()),
            site: Some("S2".into()),
            ..Default::default()
        };
        assert_eq!(store.list(&filter).len(), 1);
    }
}
