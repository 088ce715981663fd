//! 產品模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Unit;

/// 產品（原料或組合產品）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// 產品ID
    pub id: String,

    /// 顯示名稱
    pub name: String,

    /// 基準單位（所有數量在計算前先換算為此單位）
    pub base_unit: Unit,

    /// 是否為組合產品（有配方）
    pub is_composite: bool,

    /// 每基準單位的直接成本（僅原料適用）
    pub unit_cost: Option<Decimal>,
}

impl Product {
    /// 創建原料
    pub fn raw(id: impl Into<String>, name: impl Into<String>, base_unit: Unit) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_unit,
            is_composite: false,
            unit_cost: None,
        }
    }

    /// 創建組合產品
    pub fn composite(id: impl Into<String>, name: impl Into<String>, base_unit: Unit) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_unit,
            is_composite: true,
            unit_cost: None,
        }
    }

    /// 建構器模式：設置直接成本
    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_products() {
        let flour = Product::raw("FLOUR", "Flour", Unit::Gram).with_unit_cost(dec!(0.002));
        assert!(!flour.is_composite);
        assert_eq!(flour.unit_cost, Some(dec!(0.002)));

        let bread = Product::composite("BREAD", "Bread", Unit::Each);
        assert!(bread.is_composite);
        assert_eq!(bread.unit_cost, None);
        assert_eq!(bread.base_unit, Unit::Each);
    }
}
