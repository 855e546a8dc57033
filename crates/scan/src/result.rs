use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use larder_inventory::NewBatch;

use crate::ScanKind;

/// Confidence reported for model output that was not valid JSON.
const UNPARSED_CONFIDENCE: f64 = 0.5;

/// One item recognized in an inventory photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedItem {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    /// Free-form expiry as read by the model (date or shelf-life hint).
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptScan {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
    #[serde(default)]
    pub items: Vec<ReceiptLine>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeScan {
    pub dish_name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Outcome of one scan, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scanType", rename_all = "snake_case")]
pub enum ScanResult {
    Inventory { items: Vec<ScannedItem> },
    Receipt(ReceiptScan),
    Recipe(RecipeScan),
    /// The model answered, but not in the expected shape.
    Unparsed { kind: ScanKind, raw: String, confidence: f64 },
    /// The upstream call failed; nothing usable came back.
    Failed { kind: ScanKind, reason: String, confidence: f64 },
}

impl ScanResult {
    /// Interpret raw model output for a scan of `kind`.
    ///
    /// Never fails: output that is not JSON, or JSON of the wrong shape,
    /// becomes `Unparsed` carrying the raw text.
    pub fn parse(kind: ScanKind, raw: &str) -> Self {
        let body = strip_code_fence(raw);
        let value: JsonValue = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(scan_type = %kind, "scan output is not JSON: {e}");
                return Self::unparsed(kind, raw);
            }
        };

        let parsed = match kind {
            ScanKind::Inventory => parse_inventory(value),
            ScanKind::Receipt => serde_json::from_value::<ReceiptScan>(value).map(|mut r| {
                r.confidence.get_or_insert(kind.default_confidence());
                ScanResult::Receipt(r)
            }),
            ScanKind::Recipe => serde_json::from_value::<RecipeScan>(value).map(|mut r| {
                r.confidence.get_or_insert(kind.default_confidence());
                ScanResult::Recipe(r)
            }),
        };

        parsed.unwrap_or_else(|e| {
            tracing::debug!(scan_type = %kind, "scan output has unexpected shape: {e}");
            Self::unparsed(kind, raw)
        })
    }

    pub fn failed(kind: ScanKind, reason: impl Into<String>) -> Self {
        ScanResult::Failed {
            kind,
            reason: reason.into(),
            confidence: 0.0,
        }
    }

    fn unparsed(kind: ScanKind, raw: &str) -> Self {
        ScanResult::Unparsed {
            kind,
            raw: raw.to_string(),
            confidence: UNPARSED_CONFIDENCE,
        }
    }

    pub fn kind(&self) -> ScanKind {
        match self {
            ScanResult::Inventory { .. } => ScanKind::Inventory,
            ScanResult::Receipt(_) => ScanKind::Receipt,
            ScanResult::Recipe(_) => ScanKind::Recipe,
            ScanResult::Unparsed { kind, .. } | ScanResult::Failed { kind, .. } => *kind,
        }
    }

    /// Overall confidence; for inventory scans, the mean over items.
    pub fn confidence(&self) -> f64 {
        match self {
            ScanResult::Inventory { items } if items.is_empty() => {
                ScanKind::Inventory.default_confidence()
            }
            ScanResult::Inventory { items } => {
                let sum: f64 = items
                    .iter()
                    .map(|i| i.confidence.unwrap_or(ScanKind::Inventory.default_confidence()))
                    .sum();
                sum / items.len() as f64
            }
            ScanResult::Receipt(r) => r.confidence.unwrap_or(ScanKind::Receipt.default_confidence()),
            ScanResult::Recipe(r) => r.confidence.unwrap_or(ScanKind::Recipe.default_confidence()),
            ScanResult::Unparsed { confidence, .. } | ScanResult::Failed { confidence, .. } => {
                *confidence
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ScanResult::Unparsed { .. } | ScanResult::Failed { .. })
    }
}

impl ReceiptScan {
    /// Batches to receive for each line that states a positive quantity.
    ///
    /// Lines without a quantity are skipped; the caller decides how to match
    /// names to inventory items.
    pub fn restock_batches(&self, purchased_at: DateTime<Utc>) -> Vec<(String, NewBatch)> {
        self.items
            .iter()
            .filter(|line| line.quantity.is_some_and(|q| q > 0.0))
            .map(|line| {
                let quantity = line.quantity.unwrap_or_default();
                let unit = line.unit.clone().unwrap_or_else(|| "pcs".to_string());
                let batch = NewBatch::new(quantity, unit).purchased(
                    purchased_at,
                    line.price,
                    self.vendor.clone(),
                );
                (line.name.clone(), batch)
            })
            .collect()
    }
}

fn parse_inventory(value: JsonValue) -> Result<ScanResult, serde_json::Error> {
    // Models answer with either a bare array or {"items": [...]}.
    let items_value = match value {
        JsonValue::Object(mut map) if map.contains_key("items") => {
            map.remove("items").unwrap_or(JsonValue::Null)
        }
        other => other,
    };

    let mut items: Vec<ScannedItem> = serde_json::from_value(items_value)?;
    for item in &mut items {
        item.confidence.get_or_insert(ScanKind::Inventory.default_confidence());
    }
    Ok(ScanResult::Inventory { items })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Accept numbers, numeric strings ("2", "1.5"), or null.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inventory_array_with_default_confidence() {
        let raw = r#"[{"name":"Tomato","category":"vegetables","quantity":"4","unit":"pieces"},
                      {"name":"Milk","quantity":1,"confidence":0.9}]"#;

        let result = ScanResult::parse(ScanKind::Inventory, raw);
        let ScanResult::Inventory { items } = &result else {
            panic!("expected inventory scan, got {result:?}");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, Some(4.0));
        assert_eq!(items[0].confidence, Some(0.8));
        assert_eq!(items[1].confidence, Some(0.9));
        assert!((result.confidence() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn accepts_fenced_json_and_wrapped_items() {
        let raw = "```json\n{\"items\":[{\"name\":\"Rice\"}]}\n```";
        let result = ScanResult::parse(ScanKind::Inventory, raw);
        assert!(matches!(result, ScanResult::Inventory { ref items } if items[0].name == "Rice"));
    }

    #[test]
    fn parses_receipt_and_builds_restock_batches() {
        let raw = r#"{"vendor":"Fresh Mart","total":"12.5","items":[
            {"name":"Onion","quantity":2,"unit":"kg","price":3.0},
            {"name":"Bag","price":0.5}
        ]}"#;

        let result = ScanResult::parse(ScanKind::Receipt, raw);
        let ScanResult::Receipt(receipt) = &result else {
            panic!("expected receipt scan, got {result:?}");
        };
        assert_eq!(receipt.total, Some(12.5));
        assert_eq!(result.confidence(), 0.7);

        let now = Utc::now();
        let batches = receipt.restock_batches(now);
        assert_eq!(batches.len(), 1);
        let (name, batch) = &batches[0];
        assert_eq!(name, "Onion");
        assert_eq!(batch.quantity, 2.0);
        assert_eq!(batch.unit, "kg");
        assert_eq!(batch.purchase_price, Some(3.0));
        assert_eq!(batch.vendor.as_deref(), Some("Fresh Mart"));
        assert_eq!(batch.purchase_date, Some(now));
    }

    #[test]
    fn parses_recipe_scan() {
        let raw = r#"{"dishName":"Paneer tikka","ingredients":["paneer","yogurt"],"cuisine":"Indian"}"#;
        let result = ScanResult::parse(ScanKind::Recipe, raw);
        match result {
            ScanResult::Recipe(ref recipe) => {
                assert_eq!(recipe.dish_name, "Paneer tikka");
                assert_eq!(recipe.ingredients.len(), 2);
            }
            other => panic!("expected recipe scan, got {other:?}"),
        }
        assert_eq!(result.kind(), ScanKind::Recipe);
    }

    #[test]
    fn non_json_output_falls_back_to_unparsed() {
        let result = ScanResult::parse(ScanKind::Receipt, "I see a receipt from a grocery store.");
        assert_eq!(
            result,
            ScanResult::Unparsed {
                kind: ScanKind::Receipt,
                raw: "I see a receipt from a grocery store.".to_string(),
                confidence: 0.5,
            }
        );
        assert!(result.is_fallback());
    }

    #[test]
    fn wrong_shape_falls_back_to_unparsed() {
        let result = ScanResult::parse(ScanKind::Recipe, r#"{"ingredients":[]}"#);
        assert!(matches!(result, ScanResult::Unparsed { kind: ScanKind::Recipe, .. }));
    }

    #[test]
    fn failed_scans_have_zero_confidence_and_tag_on_the_wire() {
        let result = ScanResult::failed(ScanKind::Inventory, "vision API timeout");
        assert_eq!(result.confidence(), 0.0);
        assert!(result.is_fallback());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["scanType"], "failed");
        assert_eq!(json["kind"], "inventory");
    }

    #[test]
    fn scan_kind_parses_from_request_strings() {
        assert_eq!("Receipt".parse::<ScanKind>().unwrap(), ScanKind::Receipt);
        assert!("barcode".parse::<ScanKind>().is_err());
    }
}
