//! 外部原始記錄
//!
//! 產品/配方維護畫面輸出的記錄欄位名稱並不一致（`qty` 與 `quantity`、
//! 各式損耗係數名稱等），這裡以 serde 別名一次吸收，正規化之後的核心
//! 型別不再看到這些差異。數值欄位一律為 `Option`，缺漏由正規化階段回報。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 原始產品記錄
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(alias = "product_id", alias = "code")]
    pub id: String,

    #[serde(default, alias = "description", alias = "label")]
    pub name: String,

    #[serde(alias = "unit", alias = "uom", alias = "measure_unit")]
    pub base_unit: String,

    #[serde(default, alias = "composite", alias = "has_recipe", alias = "is_recipe")]
    pub is_composite: bool,

    #[serde(default, alias = "cost", alias = "price", alias = "purchase_price")]
    pub unit_cost: Option<Decimal>,
}

/// 原始 BOM 行記錄
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawBomLine {
    #[serde(alias = "component", alias = "ingredient_id", alias = "product_id")]
    pub component_id: String,

    #[serde(default, alias = "qty", alias = "amount")]
    pub quantity: Option<Decimal>,

    #[serde(alias = "uom", alias = "measure_unit")]
    pub unit: String,

    #[serde(
        default,
        alias = "loss",
        alias = "k_evap",
        alias = "scrap_factor",
        alias = "waste_percentage"
    )]
    pub loss_percentage: Option<Decimal>,
}

/// 原始配方記錄
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRecipe {
    #[serde(alias = "product_id", alias = "parent_id")]
    pub output_product_id: String,

    #[serde(default, alias = "yield", alias = "output_qty", alias = "batch_size")]
    pub output_quantity: Option<Decimal>,

    #[serde(default, alias = "yield_unit")]
    pub output_unit: Option<String>,

    #[serde(default, alias = "components", alias = "ingredients", alias = "items")]
    pub lines: Vec<RawBomLine>,

    #[serde(default, alias = "markup", alias = "margin_percentage")]
    pub markup_percentage: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_raw_recipe_aliases() {
        let json = r#"{
            "product_id": "PIZZA",
            "yield": 1,
            "ingredients": [
                { "component": "DOUGH", "qty": 200, "uom": "g", "k_evap": 5 },
                { "ingredient_id": "CHEESE", "quantity": "100", "unit": "gr" }
            ],
            "markup": 10
        }"#;
        let recipe: RawRecipe = serde_json::from_str(json).unwrap();

        assert_eq!(recipe.output_product_id, "PIZZA");
        assert_eq!(recipe.output_quantity, Some(dec!(1)));
        assert_eq!(recipe.output_unit, None);
        assert_eq!(recipe.lines.len(), 2);
        assert_eq!(recipe.lines[0].loss_percentage, Some(dec!(5)));
        assert_eq!(recipe.lines[1].quantity, Some(dec!(100)));
        assert_eq!(recipe.lines[1].loss_percentage, None);
        assert_eq!(recipe.markup_percentage, Some(dec!(10)));
    }

    #[test]
    fn test_raw_product_aliases() {
        let json = r#"[
            { "code": "CHEESE", "description": "Mozzarella", "uom": "kg", "price": 8.5 },
            { "id": "PIZZA", "name": "Margherita", "unit": "pz", "has_recipe": true }
        ]"#;
        let products: Vec<RawProduct> = serde_json::from_str(json).unwrap();

        assert_eq!(products[0].id, "CHEESE");
        assert_eq!(products[0].unit_cost, Some(dec!(8.5)));
        assert!(!products[0].is_composite);
        assert!(products[1].is_composite);
        assert_eq!(products[1].unit_cost, None);
    }
}
