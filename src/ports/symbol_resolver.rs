//! Free text to symbol resolution port.

pub trait SymbolResolver: Send + Sync {
    /// Canonical symbol for `text`, or `None` if it cannot be resolved.
    fn resolve(&self, text: &str) -> Option<String>;
}
