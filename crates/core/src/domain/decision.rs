use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One purchase-decision request. Lives only for the duration of a single
/// HTTP request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub item: String,
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub frequency: Option<String>,
    pub snapshot: FinancialSnapshot,
}

/// Caller-supplied view of the client's finances. Every numeric field
/// defaults to 0 when absent; only the enclosing object is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSnapshot {
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub monthly_income: f64,
    #[serde(default)]
    pub avg_daily_spending: f64,
    #[serde(default)]
    pub recurring_expenses: f64,
    #[serde(default)]
    pub days_left_in_month: f64,
    #[serde(default)]
    pub savings_goal: Option<SavingsGoal>,
    #[serde(default)]
    pub last_30_day_spend: f64,
    #[serde(default)]
    pub avg_monthly_spend: f64,
    #[serde(default)]
    pub category_totals: BTreeMap<String, f64>,
}

/// Clients send the savings goal either as an amount or as free text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SavingsGoal {
    Amount(f64),
    Label(String),
}

impl FinancialSnapshot {
    /// Rendered form of the savings goal; zero and empty collapse to the
    /// literal "none", same as an absent field.
    pub fn savings_goal_display(&self) -> String {
        match &self.savings_goal {
            Some(SavingsGoal::Amount(amount)) if *amount != 0.0 => format!("{amount}"),
            Some(SavingsGoal::Label(label)) if !label.is_empty() => label.clone(),
            _ => "none".to_string(),
        }
    }
}

/// The validated purchase decision returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: Verdict,
    pub confidence: u8,
    pub reasoning: Vec<String>,
    pub suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Buy,
    Wait,
    No,
}

/// Check order is part of the contract: the first missing field is the one
/// named in the error.
const REQUIRED_FIELDS: [&str; 4] = ["item", "price", "currency", "snapshot"];

/// Returns the first required field that is absent or falsy. Falsy follows
/// the zero-or-empty rules of the prompt defaults: null, 0, "" and false
/// all count as missing.
pub fn missing_required_field(payload: &Value) -> Option<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .find(|field| !payload.get(**field).map(is_truthy).unwrap_or(false))
        .copied()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_complete_payload() {
        let payload = json!({
            "item": "Shoes",
            "price": 80,
            "currency": "USD",
            "snapshot": {"balance": 500}
        });
        assert_eq!(missing_required_field(&payload), None);
    }

    #[test]
    fn zero_price_counts_as_missing() {
        let payload = json!({
            "item": "Shoes",
            "price": 0,
            "currency": "USD",
            "snapshot": {}
        });
        assert_eq!(missing_required_field(&payload), Some("price"));
    }

    #[test]
    fn names_first_missing_field_in_order() {
        let payload = json!({"price": 80, "snapshot": {}});
        assert_eq!(missing_required_field(&payload), Some("item"));
    }

    #[test]
    fn empty_snapshot_object_is_present() {
        let payload = json!({
            "item": "Shoes",
            "price": 80,
            "currency": "USD",
            "snapshot": {}
        });
        assert_eq!(missing_required_field(&payload), None);

        let request: DecisionRequest = serde_json::from_value(payload).unwrap();
        assert_eq!(request.snapshot.balance, 0.0);
        assert_eq!(request.snapshot.monthly_income, 0.0);
        assert!(request.snapshot.category_totals.is_empty());
    }

    #[test]
    fn deserializes_camel_case_snapshot_fields() {
        let request: DecisionRequest = serde_json::from_value(json!({
            "item": "Shoes",
            "price": 80,
            "currency": "USD",
            "isRecurring": true,
            "frequency": "weekly",
            "snapshot": {
                "monthlyIncome": 3000,
                "daysLeftInMonth": 10,
                "last30DaySpend": 1200,
                "avgMonthlySpend": 1500,
                "categoryTotals": {"Food": 300.5}
            }
        }))
        .unwrap();

        assert!(request.is_recurring);
        assert_eq!(request.snapshot.monthly_income, 3000.0);
        assert_eq!(request.snapshot.days_left_in_month, 10.0);
        assert_eq!(request.snapshot.last_30_day_spend, 1200.0);
        assert_eq!(request.snapshot.avg_monthly_spend, 1500.0);
        assert_eq!(
            request.snapshot.category_totals.get("Food").copied(),
            Some(300.5)
        );
    }

    #[test]
    fn savings_goal_display_defaults_to_none() {
        let snapshot = FinancialSnapshot::default();
        assert_eq!(snapshot.savings_goal_display(), "none");

        let zero: FinancialSnapshot =
            serde_json::from_value(json!({"savingsGoal": 0})).unwrap();
        assert_eq!(zero.savings_goal_display(), "none");

        let amount: FinancialSnapshot =
            serde_json::from_value(json!({"savingsGoal": 2000})).unwrap();
        assert_eq!(amount.savings_goal_display(), "2000");

        let label: FinancialSnapshot =
            serde_json::from_value(json!({"savingsGoal": "vacation fund"})).unwrap();
        assert_eq!(label.savings_goal_display(), "vacation fund");
    }

    #[test]
    fn verdict_serializes_upper_case() {
        assert_eq!(serde_json::to_value(Verdict::Buy).unwrap(), json!("BUY"));
        assert_eq!(serde_json::to_value(Verdict::Wait).unwrap(), json!("WAIT"));
        assert_eq!(serde_json::to_value(Verdict::No).unwrap(), json!("NO"));
    }
}
