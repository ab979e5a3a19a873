use crate::proxy::credential::ProxyCredential;

/// Round-robin proxy rotation over an ordered, immutable pool
///
/// The cursor is the only mutable state. It moves strictly forward, once per
/// observed failure, and never on success.
#[derive(Debug, Clone, Default)]
pub struct ProxyRotator {
    proxies: Vec<ProxyCredential>,
    current: usize,
}

impl ProxyRotator {
    /// Creates a rotator over already-parsed credentials
    pub fn new(proxies: Vec<ProxyCredential>) -> Self {
        Self {
            proxies,
            current: 0,
        }
    }

    /// Builds a rotator from raw `host:port[:user:pass]` entries, dropping malformed ones
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let proxies = entries
            .into_iter()
            .filter_map(|entry| ProxyCredential::parse(entry.as_ref()))
            .collect();
        Self::new(proxies)
    }

    /// Returns the proxy at `index mod len`, or `None` when the pool is empty
    pub fn next(&self, index: usize) -> Option<&ProxyCredential> {
        if self.proxies.is_empty() {
            return None;
        }
        self.proxies.get(index % self.proxies.len())
    }

    /// The proxy the next request should use
    pub fn current(&self) -> Option<&ProxyCredential> {
        self.next(self.current)
    }

    /// Index of the active proxy, `None` when no proxies are configured
    pub fn current_index(&self) -> Option<usize> {
        (!self.proxies.is_empty()).then_some(self.current)
    }

    /// Rotates forward by one, wrapping around, and returns the new index
    ///
    /// With an empty pool nothing changes and 0 is returned.
    pub fn advance(&mut self) -> usize {
        if !self.proxies.is_empty() {
            self.current = (self.current + 1) % self.proxies.len();
        }
        self.current
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(size: usize) -> ProxyRotator {
        ProxyRotator::from_entries((0..size).map(|i| format!("10.0.0.{}:8080", i + 1)))
    }

    #[test]
    fn test_empty_pool() {
        let mut rotator = ProxyRotator::default();
        assert!(rotator.is_empty());
        assert!(rotator.current().is_none());
        assert!(rotator.next(3).is_none());
        assert_eq!(rotator.current_index(), None);
        assert_eq!(rotator.advance(), 0);
        assert_eq!(rotator.current_index(), None);
    }

    #[test]
    fn test_next_wraps_modulo_length() {
        let rotator = pool(3);
        assert_eq!(rotator.next(0).unwrap().host, "10.0.0.1");
        assert_eq!(rotator.next(4).unwrap().host, "10.0.0.2");
    }

    #[test]
    fn test_k_failures_move_cursor_k_steps() {
        let mut rotator = pool(5);
        for _ in 0..3 {
            rotator.advance();
        }
        assert_eq!(rotator.current_index(), Some(3));
        assert_eq!(rotator.current().unwrap().host, "10.0.0.4");
    }

    #[test]
    fn test_advance_wraps() {
        let mut rotator = pool(2);
        assert_eq!(rotator.advance(), 1);
        assert_eq!(rotator.advance(), 0);
        assert_eq!(rotator.advance(), 1);
    }

    #[test]
    fn test_malformed_entries_skipped_at_load() {
        let rotator = ProxyRotator::from_entries(["1.1.1.1:80", "broken", "2.2.2.2:81:u:p"]);
        assert_eq!(rotator.len(), 2);
        assert_eq!(rotator.next(1).unwrap().host, "2.2.2.2");
    }
}
