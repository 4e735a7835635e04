use dashmap::DashMap;
use metrics::counter;
use tracing::debug;

/// Lookup key: region id verbatim, product code lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    region_id: String,
    product: String,
}

impl EndpointKey {
    pub fn new(region_id: impl Into<String>, product: impl AsRef<str>) -> Self {
        Self {
            region_id: region_id.into(),
            product: product.as_ref().to_ascii_lowercase(),
        }
    }

    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    pub fn product(&self) -> &str {
        &self.product
    }
}

/// User-supplied endpoint domains that take precedence over the built-in
/// endpoint tables. Entries never expire; the last registration for a key
/// wins.
#[derive(Debug, Default)]
pub struct EndpointOverrideRegistry {
    entries: DashMap<EndpointKey, String>,
}

impl EndpointOverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `domain` for the pair and returns the domain it replaced.
    pub fn register(
        &self,
        region_id: impl Into<String>,
        product: impl AsRef<str>,
        domain: impl Into<String>,
    ) -> Option<String> {
        let key = EndpointKey::new(region_id, product);
        let domain = domain.into();
        debug!(
            region_id = key.region_id(),
            product = key.product(),
            domain = %domain,
            "registering endpoint override"
        );
        counter!("endpoint_overrides_registered_total").increment(1);
        self.entries.insert(key, domain)
    }

    pub fn resolve(&self, region_id: &str, product: &str) -> Option<String> {
        self.entries
            .get(&EndpointKey::new(region_id, product))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Point-in-time copy of every override, sorted by key.
    pub fn snapshot(&self) -> Vec<(EndpointKey, String)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|(left, _), (right, _)| {
            (left.region_id(), left.product()).cmp(&(right.region_id(), right.product()))
        });
        entries
    }
}
