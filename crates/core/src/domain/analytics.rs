use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Each distinct product name counts as this many active customers.
pub const CUSTOMERS_PER_PRODUCT: i64 = 10;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub growth_rate: f64,
    pub active_customers: i64,
    pub total_orders: i64,
    pub categories: Vec<CategoryShare>,
    pub regions: Vec<RegionPerformance>,
    pub monthly_orders: Vec<MonthlyOrders>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub name: String,
    pub value: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionPerformance {
    pub name: String,
    pub sales: f64,
    pub growth: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyOrders {
    pub month: String,
    pub orders: i64,
}

/// Short month name for a `YYYY-MM` bucket; the bucket itself when it does not parse.
pub fn month_label(year_month: &str) -> String {
    NaiveDate::parse_from_str(&format!("{year_month}-01"), "%Y-%m-%d")
        .map(|date| date.format("%b").to_string())
        .unwrap_or_else(|_| year_month.to_string())
}

#[cfg(test)]
mod tests {
    use super::{month_label, AnalyticsSummary};

    #[test]
    fn month_label_uses_short_month_names() {
        assert_eq!(month_label("2024-01"), "Jan");
        assert_eq!(month_label("2025-11"), "Nov");
        assert_eq!(month_label("garbage"), "garbage");
        assert_eq!(month_label(""), "");
    }

    #[test]
    fn empty_summary_serializes_with_zeroes_and_empty_lists() {
        let value = serde_json::to_value(AnalyticsSummary::default()).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "growthRate": 0.0,
                "activeCustomers": 0,
                "totalOrders": 0,
                "categories": [],
                "regions": [],
                "monthlyOrders": []
            })
        );
    }
}
