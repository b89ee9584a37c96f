//! Baskets, saved groups and drafting a basket from free text.
//!
//! A draft is built from lines like `"apple, 40"` or `"MSFT 60%"`: each line
//! is split into a name and an optional weight, the name goes through the
//! symbol resolver, and entries without a weight share what is left of 100%.

use crate::domain::error::PerfError;
use crate::ports::symbol_resolver::SymbolResolver;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static DELIMITED_WEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)[\t,;|]\s*([+-]?\d+(?:[.,]\d+)?)\s*%?\s*$").expect("valid regex")
});
static PERCENT_WEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s+([+-]?\d+(?:[.,]\d+)?)\s*%$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedAsset {
    pub symbol: String,
    /// Percentage points, not a fraction.
    pub weight: f64,
}

impl WeightedAsset {
    pub fn new(symbol: impl Into<String>, weight: f64) -> Self {
        Self {
            symbol: symbol.into(),
            weight,
        }
    }
}

/// One comparison unit. Weights are not required to sum to 100.
#[derive(Debug, Clone, PartialEq)]
pub struct Basket {
    pub label: String,
    pub assets: Vec<WeightedAsset>,
}

impl Basket {
    pub fn new(label: impl Into<String>, assets: Vec<WeightedAsset>) -> Self {
        Self {
            label: label.into(),
            assets,
        }
    }

    /// A bare instrument: a basket of one at 100%.
    pub fn single(symbol: &str) -> Self {
        Self::new(symbol, vec![WeightedAsset::new(symbol, 100.0)])
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(|a| a.symbol.as_str())
    }
}

/// A saved basket. Weights sum to 100 at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub assets: Vec<WeightedAsset>,
}

impl Group {
    /// Validate and normalize a drafted basket into a group.
    ///
    /// Non-positive weights are dropped and the rest rescaled to sum to 100,
    /// rounded to four decimals.
    pub fn from_draft(name: &str, assets: &[WeightedAsset]) -> Result<Self, PerfError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PerfError::InvalidGroup {
                reason: "group name is empty".into(),
            });
        }

        let valid: Vec<&WeightedAsset> = assets
            .iter()
            .filter(|a| a.weight.is_finite() && a.weight > 0.0)
            .collect();
        if valid.is_empty() {
            return Err(PerfError::InvalidGroup {
                reason: "at least one asset needs a weight above 0".into(),
            });
        }

        let total: f64 = valid.iter().map(|a| a.weight).sum();
        let assets = valid
            .into_iter()
            .map(|a| WeightedAsset::new(a.symbol.clone(), round_to(a.weight / total * 100.0, 4)))
            .collect();

        Ok(Self {
            name: name.to_string(),
            assets,
        })
    }

    pub fn to_basket(&self) -> Basket {
        Basket::new(self.name.clone(), self.assets.clone())
    }

    pub fn composition(&self) -> String {
        self.assets
            .iter()
            .map(|a| format!("{} ({}%)", a.symbol, a.weight))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// One parsed input line before symbol resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftEntry {
    pub raw: String,
    pub weight: Option<f64>,
}

/// A resolved draft line.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftAsset {
    pub raw: String,
    pub symbol: String,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub assets: Vec<DraftAsset>,
    /// Input texts the resolver could not map to a symbol.
    pub unresolved: Vec<String>,
}

impl Draft {
    pub fn weighted_assets(&self) -> Vec<WeightedAsset> {
        self.assets
            .iter()
            .map(|a| WeightedAsset::new(a.symbol.clone(), a.weight.unwrap_or(0.0)))
            .collect()
    }
}

/// Split `"name, 25"` / `"name;25%"` / `"name 25%"` into name and weight.
///
/// The space-separated form requires a trailing `%` so names such as
/// `"S&P 500"` are not read as a weight.
pub fn parse_entry_line(line: &str) -> Option<DraftEntry> {
    let text = line.trim();
    if text.is_empty() {
        return None;
    }

    for re in [&*DELIMITED_WEIGHT, &*PERCENT_WEIGHT] {
        if let Some(caps) = re.captures(text) {
            let weight = caps[2].replace(',', ".").parse::<f64>().ok();
            return Some(DraftEntry {
                raw: caps[1].trim().to_string(),
                weight,
            });
        }
    }

    Some(DraftEntry {
        raw: text.to_string(),
        weight: None,
    })
}

/// Fill in weights for entries that did not specify one.
///
/// With no explicit weights at all every entry gets an equal share (two
/// decimals). Otherwise whatever the explicit weights leave of 100 is split
/// evenly between the implicit entries (four decimals).
pub fn assign_draft_weights(assets: &mut [DraftAsset]) {
    let is_explicit = |w: Option<f64>| w.is_some_and(|v| !v.is_nan());
    let implicit = assets.iter().filter(|a| !is_explicit(a.weight)).count();

    if implicit == assets.len() {
        if assets.is_empty() {
            return;
        }
        let equal = round_to(100.0 / assets.len() as f64, 2);
        for a in assets.iter_mut() {
            a.weight = Some(equal);
        }
        return;
    }
    if implicit == 0 {
        return;
    }

    let explicit_sum: f64 = assets
        .iter()
        .filter_map(|a| a.weight.filter(|v| !v.is_nan()))
        .sum();
    let split = round_to((100.0 - explicit_sum).max(0.0) / implicit as f64, 4);
    for a in assets.iter_mut().filter(|a| !is_explicit(a.weight)) {
        a.weight = Some(split);
    }
}

/// Parse multi-line text into a weighted draft.
///
/// Lines that resolve to an already-seen symbol fold into it, adding their
/// explicit weight. Unresolvable lines are listed, not fatal.
pub fn draft_basket(text: &str, resolver: &dyn SymbolResolver) -> Draft {
    let mut draft = Draft::default();

    for entry in text.lines().filter_map(parse_entry_line) {
        let Some(symbol) = resolver.resolve(&entry.raw) else {
            tracing::debug!(text = %entry.raw, "draft line did not resolve");
            draft.unresolved.push(entry.raw);
            continue;
        };

        match draft.assets.iter_mut().find(|a| a.symbol == symbol) {
            None => draft.assets.push(DraftAsset {
                raw: entry.raw,
                symbol,
                weight: entry.weight,
            }),
            Some(prev) => {
                if let Some(w) = entry.weight.filter(|w| !w.is_nan()) {
                    prev.weight = Some(prev.weight.unwrap_or(0.0) + w);
                }
            }
        }
    }

    assign_draft_weights(&mut draft.assets);
    draft
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct UpperResolver;

    impl SymbolResolver for UpperResolver {
        fn resolve(&self, text: &str) -> Option<String> {
            match text.trim().to_uppercase().as_str() {
                "APPLE" => Some("AAPL".into()),
                "???" => None,
                other => Some(other.to_string()),
            }
        }
    }

    fn asset(raw: &str, weight: Option<f64>) -> DraftAsset {
        DraftAsset {
            raw: raw.into(),
            symbol: raw.to_uppercase(),
            weight,
        }
    }

    #[test]
    fn parse_comma_weight() {
        let entry = parse_entry_line("Apple, 40").unwrap();
        assert_eq!(entry.raw, "Apple");
        assert_eq!(entry.weight, Some(40.0));
    }

    #[test]
    fn parse_other_delimiters_and_percent() {
        assert_eq!(parse_entry_line("MSFT;25%").unwrap().weight, Some(25.0));
        assert_eq!(parse_entry_line("MSFT|12.5").unwrap().weight, Some(12.5));
        assert_eq!(parse_entry_line("MSFT\t7").unwrap().weight, Some(7.0));
    }

    #[test]
    fn parse_comma_decimal() {
        let entry = parse_entry_line("Gold; 33,5 %").unwrap();
        assert_eq!(entry.raw, "Gold");
        assert_eq!(entry.weight, Some(33.5));
    }

    #[test]
    fn parse_space_form_requires_percent() {
        let entry = parse_entry_line("NVDA 30%").unwrap();
        assert_eq!(entry.raw, "NVDA");
        assert_eq!(entry.weight, Some(30.0));

        let entry = parse_entry_line("S&P 500").unwrap();
        assert_eq!(entry.raw, "S&P 500");
        assert_eq!(entry.weight, None);
    }

    #[test]
    fn parse_blank_line_is_none() {
        assert!(parse_entry_line("   ").is_none());
    }

    #[test]
    fn equal_split_when_no_weights_given() {
        let mut assets = vec![asset("a", None), asset("b", None), asset("c", None)];
        assign_draft_weights(&mut assets);
        for a in &assets {
            assert_eq!(a.weight, Some(33.33));
        }
    }

    #[test]
    fn explicit_weights_are_left_alone() {
        let mut assets = vec![asset("a", Some(70.0)), asset("b", Some(50.0))];
        assign_draft_weights(&mut assets);
        assert_eq!(assets[0].weight, Some(70.0));
        assert_eq!(assets[1].weight, Some(50.0));
    }

    #[test]
    fn implicit_entries_share_the_remainder() {
        let mut assets = vec![asset("a", Some(40.0)), asset("b", None), asset("c", None)];
        assign_draft_weights(&mut assets);
        assert_eq!(assets[1].weight, Some(30.0));
        assert_eq!(assets[2].weight, Some(30.0));
    }

    #[test]
    fn remainder_never_goes_negative() {
        let mut assets = vec![asset("a", Some(120.0)), asset("b", None)];
        assign_draft_weights(&mut assets);
        assert_eq!(assets[1].weight, Some(0.0));
    }

    #[test]
    fn draft_merges_duplicates_and_lists_unresolved() {
        let text = "apple, 20\nAAPL, 30\n???\nmsft\n\n";
        let draft = draft_basket(text, &UpperResolver);

        assert_eq!(draft.unresolved, vec!["???".to_string()]);
        assert_eq!(draft.assets.len(), 2);
        assert_eq!(draft.assets[0].symbol, "AAPL");
        assert_eq!(draft.assets[0].weight, Some(50.0));
        assert_eq!(draft.assets[1].symbol, "MSFT");
        assert_eq!(draft.assets[1].weight, Some(50.0));
    }

    #[test]
    fn group_normalizes_weights_to_one_hundred() {
        let assets = vec![
            WeightedAsset::new("AAPL", 1.0),
            WeightedAsset::new("MSFT", 2.0),
            WeightedAsset::new("XOM", 0.0),
        ];
        let group = Group::from_draft("  Tech  ", &assets).unwrap();

        assert_eq!(group.name, "Tech");
        assert_eq!(group.assets.len(), 2);
        assert_relative_eq!(group.assets[0].weight, 33.3333);
        assert_relative_eq!(group.assets[1].weight, 66.6667);
    }

    #[test]
    fn group_requires_name_and_positive_weight() {
        let assets = vec![WeightedAsset::new("AAPL", 10.0)];
        assert!(matches!(
            Group::from_draft(" ", &assets),
            Err(PerfError::InvalidGroup { .. })
        ));

        let zero = vec![WeightedAsset::new("AAPL", 0.0)];
        assert!(matches!(
            Group::from_draft("Tech", &zero),
            Err(PerfError::InvalidGroup { .. })
        ));
    }

    #[test]
    fn group_composition_lists_weights() {
        let group = Group {
            name: "Mix".into(),
            assets: vec![WeightedAsset::new("AAPL", 60.0), WeightedAsset::new("GLD", 40.0)],
        };
        assert_eq!(group.composition(), "AAPL (60%) + GLD (40%)");
    }
}
