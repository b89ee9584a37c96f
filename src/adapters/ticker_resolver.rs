//! Local symbol resolution: alias table plus ticker-shape matching.

use crate::ports::config_port::ConfigPort;
use crate::ports::symbol_resolver::SymbolResolver;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static NON_TICKER_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z0-9=^.-]").expect("valid regex"));
static TICKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\^?[A-Z]{1,5}(?:-[A-Z]{1,4}|=[A-Z])?").expect("valid regex")
});

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("EXXON", "XOM"),
    ("EXXON MOBIL", "XOM"),
    ("BERKSHIRE", "BRK-B"),
    ("BERKSHIRE HATHAWAY", "BRK-B"),
    ("BRK.B", "BRK-B"),
    ("SP500", "^GSPC"),
    ("S&P500", "^GSPC"),
    ("S&P 500", "^GSPC"),
    ("NASDAQ", "^IXIC"),
    ("DOW JONES", "^DJI"),
    ("RUSSELL 2000", "^RUT"),
    ("GOLD", "GC=F"),
    ("SILVER", "SI=F"),
    ("BITCOIN", "BTC-USD"),
    ("ETHEREUM", "ETH-USD"),
];

pub struct TickerResolver {
    aliases: HashMap<String, String>,
}

impl Default for TickerResolver {
    fn default() -> Self {
        Self::new(std::iter::empty::<(String, String)>())
    }
}

impl TickerResolver {
    /// Built-in aliases, overridden by `extra`. Alias names match
    /// case-insensitively.
    pub fn new<I, K, V>(extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut aliases: HashMap<String, String> = BUILTIN_ALIASES
            .iter()
            .map(|(name, symbol)| (name.to_string(), symbol.to_string()))
            .collect();
        for (name, symbol) in extra {
            let name = name.as_ref().trim().to_uppercase();
            let symbol = symbol.as_ref().trim().to_uppercase();
            if !name.is_empty() && !symbol.is_empty() {
                aliases.insert(name, symbol);
            }
        }
        Self { aliases }
    }

    /// Aliases come from the `[aliases]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        Self::new(config.get_section("aliases"))
    }

    fn alias(&self, key: &str) -> Option<String> {
        self.aliases.get(key).cloned()
    }
}

impl SymbolResolver for TickerResolver {
    fn resolve(&self, text: &str) -> Option<String> {
        let upper = text.trim().to_uppercase();
        if upper.is_empty() {
            return None;
        }
        if let Some(symbol) = self.alias(&upper) {
            return Some(symbol);
        }

        let cleaned = NON_TICKER_CHARS.replace_all(&upper, " ");
        let cleaned = cleaned.trim();
        if let Some(symbol) = self.alias(cleaned) {
            return Some(symbol);
        }
        // Free text with several words is not a ticker.
        if cleaned.contains(' ') {
            return None;
        }

        TICKER.find(cleaned).map(|m| m.as_str().to_string())
    }
}
