//! Aperture-correction eligibility registry.

/// Ordered set of measurement base names registered for downstream
/// aperture correction.
///
/// Passed explicitly to plugin constructors; deliberately not a process
/// global so independent measurement runs cannot observe each other.
#[derive(Debug, Clone, Default)]
pub struct ApCorrRegistry {
    names: Vec<String>,
}

impl ApCorrRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a base name. Re-registration is a no-op.
    pub fn register(&mut self, name: &str) {
        if !self.contains(name) {
            self.names.push(name.to_string());
        }
    }

    /// Whether a base name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}
