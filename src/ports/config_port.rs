//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;

    /// Every `key = value` pair of `section`, keys as stored by the backend.
    fn get_section(&self, _section: &str) -> Vec<(String, String)> {
        Vec::new()
    }
}
