//! Stateless odds classification into display categories.
//!
//! Markets arrive from the per-fixture odds feed as flat outcome lists. They
//! are grouped by market id, assigned to display categories by an ordered
//! rule list (market-id match OR case-insensitive keyword match against the
//! market description, first category wins), and finally flattened into
//! client-ready betting sections.

use std::collections::HashMap;

use crate::data::models::{
    BettingOption, BettingSection, CategoryOdds, CategorySummary, ClassifiedOdds, MarketGroup,
    RawOdd,
};

/// Synthetic aggregate category spanning all non-empty categories.
pub const CATEGORY_ALL: &str = "all";
/// Catch-all for markets matching no rule.
pub const CATEGORY_OTHERS: &str = "others";

/// One display-category rule. Order in `CATEGORY_DEFS` is priority order:
/// the first rule that matches a market claims it, which is the deliberate
/// tie-break for descriptions that loosely match several keyword sets.
pub struct CategoryDef {
    pub id: &'static str,
    pub label: &'static str,
    pub market_ids: &'static [i64],
    pub keywords: &'static [&'static str],
}

pub const CATEGORY_DEFS: &[CategoryDef] = &[
    CategoryDef {
        id: "main",
        label: "Main",
        market_ids: &[1, 2, 12],
        keywords: &["match winner", "double chance", "draw no bet"],
    },
    CategoryDef {
        id: "goals",
        label: "Goals",
        market_ids: &[5, 6, 26],
        keywords: &["over/under", "goals over", "total goals", "exact goals"],
    },
    CategoryDef {
        id: "handicap",
        label: "Handicap",
        market_ids: &[4, 9],
        keywords: &["handicap"],
    },
    CategoryDef {
        id: "teams",
        label: "Teams",
        market_ids: &[8, 16, 17],
        keywords: &["both teams", "team to score", "clean sheet"],
    },
    CategoryDef {
        id: "score",
        label: "Score",
        market_ids: &[10, 31],
        keywords: &["correct score", "exact score", "halftime/fulltime"],
    },
    CategoryDef {
        id: "halves",
        label: "Halves",
        market_ids: &[13, 20, 21],
        keywords: &["1st half", "2nd half", "first half", "second half"],
    },
];

/// Markets accepted from the per-fixture odds feed. Everything else is
/// dropped before classification.
pub const ALLOWED_MARKET_IDS: &[i64] = &[
    1, 2, 4, 5, 6, 8, 9, 10, 12, 13, 16, 17, 20, 21, 26, 31, 38, 45, 59,
];

/// Group a flat odds list by market id, keeping market-id order stable.
pub fn group_by_market(odds: &[RawOdd]) -> Vec<MarketGroup> {
    let mut groups: std::collections::BTreeMap<i64, MarketGroup> = Default::default();
    for odd in odds {
        groups
            .entry(odd.market_id)
            .or_insert_with(|| MarketGroup {
                market_id: odd.market_id,
                description: odd.market_name.clone(),
                odds: Vec::new(),
            })
            .odds
            .push(odd.clone());
    }
    groups.into_values().collect()
}

/// Drop markets outside the display allow-list.
pub fn filter_allowed(odds: Vec<RawOdd>) -> Vec<RawOdd> {
    odds.into_iter()
        .filter(|o| ALLOWED_MARKET_IDS.contains(&o.market_id))
        .collect()
}

fn matches_category(def: &CategoryDef, group: &MarketGroup) -> bool {
    if def.market_ids.contains(&group.market_id) {
        return true;
    }
    let description = group.description.to_lowercase();
    def.keywords.iter().any(|kw| description.contains(kw))
}

/// Classify market groups into display categories.
///
/// Each market lands in exactly one category (first matching rule wins);
/// unmatched markets go to `others`. Empty categories are dropped, and a
/// synthetic `all` category carries the total market count.
pub fn classify(groups: Vec<MarketGroup>) -> ClassifiedOdds {
    let mut by_category: HashMap<String, CategoryOdds> = HashMap::new();

    for group in groups {
        let (id, label) = CATEGORY_DEFS
            .iter()
            .find(|def| matches_category(def, &group))
            .map(|def| (def.id, def.label))
            .unwrap_or((CATEGORY_OTHERS, "Others"));

        let entry = by_category
            .entry(id.to_string())
            .or_insert_with(|| CategoryOdds {
                label: label.to_string(),
                markets: Vec::new(),
                count: 0,
            });
        entry.markets.push(group);
        entry.count += 1;
    }

    let mut categories = Vec::new();
    let total: usize = by_category.values().map(|c| c.count).sum();
    if total > 0 {
        categories.push(CategorySummary {
            id: CATEGORY_ALL.to_string(),
            label: "All".to_string(),
            count: total,
        });
    }
    for def in CATEGORY_DEFS {
        if let Some(cat) = by_category.get(def.id) {
            categories.push(CategorySummary {
                id: def.id.to_string(),
                label: def.label.to_string(),
                count: cat.count,
            });
        }
    }
    if let Some(others) = by_category.get(CATEGORY_OTHERS) {
        categories.push(CategorySummary {
            id: CATEGORY_OTHERS.to_string(),
            label: "Others".to_string(),
            count: others.count,
        });
    }

    ClassifiedOdds {
        categories,
        by_category,
    }
}

/// Flatten classified odds into client-ready sections.
///
/// Individual suspended outcomes are filtered out; a section whose outcomes
/// are all suspended is omitted entirely.
pub fn transform_to_betting_data(classified: &ClassifiedOdds) -> Vec<BettingSection> {
    let mut sections = Vec::new();

    let category_order = CATEGORY_DEFS
        .iter()
        .map(|d| d.id)
        .chain(std::iter::once(CATEGORY_OTHERS));

    for category_id in category_order {
        let Some(cat) = classified.by_category.get(category_id) else {
            continue;
        };
        for market in &cat.markets {
            let options: Vec<BettingOption> = market
                .odds
                .iter()
                .filter(|o| !o.suspended)
                .map(|o| BettingOption {
                    id: o.id,
                    label: o.label.clone(),
                    value: o.value,
                    suspended: o.suspended,
                    market_id: o.market_id,
                })
                .collect();

            if options.is_empty() {
                continue;
            }

            sections.push(BettingSection {
                category: category_id.to_string(),
                title: market.description.clone(),
                options,
            });
        }
    }

    sections
}
