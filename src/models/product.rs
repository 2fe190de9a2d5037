use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::deal::default_currency;
use super::{require, Entity, EntityId, EntityType};
use crate::error::ApiError;

label_enum! {
    ProductCategory {
        Software => "Software",
        Service => "Service",
        Hardware => "Hardware",
        Misc => "Other",
    }
}

label_enum! {
    ProductStatus {
        Active => "active",
        Inactive => "inactive",
    }
}

impl Default for ProductStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    /// Catalog SKU.
    pub code: String,
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub category: Option<ProductCategory>,
    #[serde(default)]
    pub status: ProductStatus,
    pub company_id: Option<EntityId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Product {
    const TYPE: EntityType = EntityType::Product;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }

    fn validate(&self) -> Result<(), ApiError> {
        require("name", &self.name)?;
        require("code", &self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_code_required() {
        let product: Product =
            serde_json::from_value(json!({"name": "Widget", "code": ""})).unwrap();
        assert_eq!(product.validate().unwrap_err().to_string(), "code: field required");
    }

    #[test]
    fn test_defaults() {
        let product: Product =
            serde_json::from_value(json!({"name": "Widget", "code": "W-1"})).unwrap();
        assert_eq!(product.status, ProductStatus::Active);
        assert_eq!(product.currency, "INR");
        assert_eq!(product.label(), "Widget (W-1)");
    }
}
