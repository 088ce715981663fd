//! 計算結果（成本、可生產量）
//!
//! 結果建立後不再修改，可直接序列化交給呈現層。

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Unit;

/// 成本明細行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    /// 子件產品ID
    pub component_id: String,

    /// 用量（已換算為子件基準單位）
    pub quantity: Decimal,

    /// 計入損耗後的用量
    pub loss_adjusted_quantity: Decimal,

    /// 子件每基準單位成本
    pub component_unit_cost: Decimal,

    /// 行成本 = 損耗後用量 × 子件單位成本
    pub line_cost: Decimal,
}

/// 成本計算警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostWarning {
    /// 原料缺少成本，以 0 計算
    MissingComponentPrice { product_id: String },
}

/// 成本計算結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostResult {
    /// 產品ID
    pub product_id: String,

    /// 每基準單位成本（已含加成）
    pub unit_cost: Decimal,

    /// 成本的計量單位（產品基準單位）
    pub per_unit: Unit,

    /// 各行成本明細（原料為單一行）
    pub breakdown: Vec<CostLine>,

    /// 加成前的每基準單位成本
    pub cost_before_markup: Decimal,

    /// 已套用的加成率
    pub markup_percentage: Option<Decimal>,

    /// 警告（包含所有下層子件的警告）
    pub warnings: Vec<CostWarning>,
}

impl CostResult {
    /// 成本是否完整（沒有缺價警告）
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// 可生產量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "quantity", rename_all = "snake_case")]
pub enum Availability {
    /// 沒有任何子件限制
    Unbounded,
    /// 受庫存限制的最大可生產量（連續值，未取整）
    Limited(Decimal),
}

impl Availability {
    /// 受限時的數量
    pub fn quantity(&self) -> Option<Decimal> {
        match self {
            Availability::Unbounded => None,
            Availability::Limited(q) => Some(*q),
        }
    }

    /// 是否無上限
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Availability::Unbounded)
    }

    /// 依產出單位取整：離散單位（個）向下取整，連續單位不變
    pub fn whole_units(&self, unit: Unit) -> Availability {
        match self {
            Availability::Limited(q) if unit.dimension().is_discrete() => {
                Availability::Limited(q.floor())
            }
            other => *other,
        }
    }

    /// 近似浮點值（僅供顯示）
    pub fn to_f64(&self) -> Option<f64> {
        self.quantity().and_then(|q| q.to_f64())
    }
}

/// 單一子件的產能
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineCapacity {
    /// 子件產品ID
    pub component_id: String,

    /// 每單位產出所需子件量（子件基準單位，含損耗）
    pub required_per_output_unit: Decimal,

    /// 現有庫存（子件基準單位）
    pub on_hand: Decimal,

    /// 可支撐的產出量 = 現有庫存 / 每單位需求
    pub line_capacity: Decimal,
}

/// 可生產量計算結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    /// 產品ID
    pub product_id: String,

    /// 可生產量（產品基準單位）
    pub virtual_available: Availability,

    /// 產品基準單位
    pub unit: Unit,

    /// 限制因素（所有與最小值並列的子件）
    pub limiting_lines: Vec<LineCapacity>,

    /// 所有子件的產能
    pub lines: Vec<LineCapacity>,

    /// 計算所用的庫存快照
    pub snapshot_id: Uuid,
}

impl AvailabilityResult {
    /// 某子件是否為限制因素
    pub fn is_limited_by(&self, component_id: &str) -> bool {
        self.limiting_lines
            .iter()
            .any(|l| l.component_id == component_id)
    }

    /// 某子件的產能
    pub fn line(&self, component_id: &str) -> Option<&LineCapacity> {
        self.lines.iter().find(|l| l.component_id == component_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_whole_units() {
        let limited = Availability::Limited(dec!(7.8));
        assert_eq!(limited.whole_units(Unit::Each), Availability::Limited(dec!(7)));
        assert_eq!(limited.whole_units(Unit::Gram), limited);
        assert_eq!(
            Availability::Unbounded.whole_units(Unit::Each),
            Availability::Unbounded
        );
    }

    #[test]
    fn test_availability_serde() {
        let json = serde_json::to_value(Availability::Unbounded).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "unbounded" }));

        let limited = serde_json::to_value(Availability::Limited(dec!(10))).unwrap();
        assert_eq!(limited["kind"], "limited");
    }

    #[test]
    fn test_cost_result_completeness() {
        let mut result = CostResult {
            product_id: "PIZZA".to_string(),
            unit_cost: dec!(13.42),
            per_unit: Unit::Each,
            breakdown: Vec::new(),
            cost_before_markup: dec!(12.2),
            markup_percentage: Some(dec!(10)),
            warnings: Vec::new(),
        };
        assert!(result.is_complete());

        result.warnings.push(CostWarning::MissingComponentPrice {
            product_id: "BASIL".to_string(),
        });
        assert!(!result.is_complete());
    }
}
