//! The case model retrieved from the upstream workflow system (spec.md §3,
//! §6). Treated as opaque input: this crate never structures or fetches it,
//! only reads the values required to validate a document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Product type, used only to decide which keys are required (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    PersonalLoan,
    Overdraft,
    CreditCard,
}

impl ProductType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pl" => Some(Self::PersonalLoan),
            "od" => Some(Self::Overdraft),
            "cc" => Some(Self::CreditCard),
            _ => None,
        }
    }
}

/// A structured record mapping field name to expected value, as retrieved
/// from the upstream workflow system. Backed by a JSON map so the shape
/// stays flexible across product types (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaseModel {
    #[serde(flatten)]
    fields: HashMap<String, Value>,
}

impl CaseModel {
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(|v| v.as_bool())
    }

    pub fn product(&self) -> Option<ProductType> {
        self.get_str("product").as_deref().and_then(ProductType::from_code)
    }

    pub fn is_staff(&self) -> bool {
        self.get_bool("clientIsStaff").unwrap_or(false)
    }

    pub fn case_id(&self) -> Option<String> {
        self.get_str("caseId")
    }

    /// Required keys for every product, per spec.md §3.
    pub fn required_common_keys() -> &'static [&'static str] {
        &["caseId", "loanAmount", "instalment", "interestRate", "insurancePremium", "collectionAccountNo"]
    }

    /// Keys required only for some products (spec.md §3).
    pub fn product_dependent_keys() -> &'static [&'static str] {
        &["initiationFee", "serviceFee", "collectionBank", "disbursementAccountNo", "clientIsStaff"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CaseModel {
        let mut fields = HashMap::new();
        fields.insert("caseId".to_string(), json!("10016998899"));
        fields.insert("loanAmount".to_string(), json!(90640.57));
        fields.insert("clientIsStaff".to_string(), json!(true));
        fields.insert("product".to_string(), json!("pl"));
        CaseModel::new(fields)
    }

    #[test]
    fn reads_typed_fields() {
        let model = sample();
        assert_eq!(model.case_id(), Some("10016998899".to_string()));
        assert_eq!(model.get_f64("loanAmount"), Some(90640.57));
        assert!(model.is_staff());
        assert_eq!(model.product(), Some(ProductType::PersonalLoan));
    }

    #[test]
    fn missing_key_is_none() {
        let model = sample();
        assert_eq!(model.get_f64("nonexistent"), None);
    }
}
