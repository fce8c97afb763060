pub mod household;
pub mod population;

use serde::Serialize;

/// One bar of a waterfall decomposition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallItem {
    pub label: String,
    pub amount: f64,
}

/// Decomposition of a net change into labelled components; `total` is the
/// sum of the items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallChart {
    pub items: Vec<WaterfallItem>,
    pub total: f64,
}

impl WaterfallChart {
    pub fn from_items(items: Vec<WaterfallItem>) -> Self {
        let total = items.iter().map(|item| item.amount).sum();
        Self { items, total }
    }
}
