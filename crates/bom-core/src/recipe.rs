//! 配方（BOM）模型

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{convert, BomError, Result, Unit};

const ONE_HUNDRED: Decimal = dec!(100);

/// BOM 行（子件用量）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    /// 子件產品ID
    pub component_id: String,

    /// 用量（以 `unit` 表示）
    pub quantity: Decimal,

    /// 用量單位
    pub unit: Unit,

    /// 損耗率（0 ≤ x < 100），只放大用量，不影響單價
    pub loss_percentage: Decimal,
}

impl BomLine {
    /// 創建新的 BOM 行（無損耗）
    pub fn new(component_id: impl Into<String>, quantity: Decimal, unit: Unit) -> Self {
        Self {
            component_id: component_id.into(),
            quantity,
            unit,
            loss_percentage: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置損耗率
    pub fn with_loss(mut self, loss_percentage: Decimal) -> Self {
        self.loss_percentage = loss_percentage;
        self
    }

    /// 損耗係數 `1 + loss/100`
    pub fn loss_factor(&self) -> Decimal {
        Decimal::ONE + self.loss_percentage / ONE_HUNDRED
    }

    /// 換算為子件基準單位的用量
    pub fn base_quantity(&self, component_base: Unit) -> Result<Decimal> {
        convert(self.quantity, self.unit, component_base)
    }

    /// 換算並計入損耗後的用量
    pub fn loss_adjusted_quantity(&self, component_base: Unit) -> Result<Decimal> {
        self.base_quantity(component_base)?
            .checked_mul(self.loss_factor())
            .ok_or_else(|| BomError::Overflow(format!("{} 含損耗用量", self.component_id)))
    }
}

/// 配方：產出 `output_quantity` 個 `output_unit` 的組合產品所需子件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// 產出產品ID
    pub output_product_id: String,

    /// 產出數量（> 0）
    pub output_quantity: Decimal,

    /// 產出單位
    pub output_unit: Unit,

    /// 子件清單（有序）
    pub lines: Vec<BomLine>,

    /// 加成率，套用在最終單位成本上
    pub markup_percentage: Option<Decimal>,
}

impl Recipe {
    /// 創建新的配方
    pub fn new(output_product_id: impl Into<String>, output_quantity: Decimal, output_unit: Unit) -> Self {
        Self {
            output_product_id: output_product_id.into(),
            output_quantity,
            output_unit,
            lines: Vec::new(),
            markup_percentage: None,
        }
    }

    /// 建構器模式：添加 BOM 行
    pub fn with_line(mut self, line: BomLine) -> Self {
        self.lines.push(line);
        self
    }

    /// 建構器模式：設置加成率
    pub fn with_markup(mut self, markup_percentage: Decimal) -> Self {
        self.markup_percentage = Some(markup_percentage);
        self
    }

    /// 加成係數 `1 + markup/100`，未設置時為 1
    pub fn markup_factor(&self) -> Decimal {
        self.markup_percentage
            .map(|m| Decimal::ONE + m / ONE_HUNDRED)
            .unwrap_or(Decimal::ONE)
    }

    /// 產出數量換算為產出產品的基準單位
    pub fn output_in_base(&self, output_base: Unit) -> Result<Decimal> {
        convert(self.output_quantity, self.output_unit, output_base)
    }

    /// 每單位產出所需的子件用量（子件基準單位，含損耗）
    pub fn required_per_output_unit(
        &self,
        line: &BomLine,
        component_base: Unit,
        output_base: Unit,
    ) -> Result<Decimal> {
        let output = self.output_in_base(output_base)?;
        if output <= Decimal::ZERO {
            return Err(BomError::InvalidQuantity {
                field: "output_quantity",
                value: self.output_quantity,
            });
        }
        line.loss_adjusted_quantity(component_base)?
            .checked_div(output)
            .ok_or_else(|| {
                BomError::Overflow(format!("{} 每單位產出需求 {}", self.output_product_id, line.component_id))
            })
    }

    /// 是否沒有任何子件
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_adjusted_quantity() {
        let line = BomLine::new("DOUGH", dec!(200), Unit::Gram).with_loss(dec!(5));
        assert_eq!(line.loss_factor(), dec!(1.05));
        assert_eq!(line.loss_adjusted_quantity(Unit::Gram).unwrap(), dec!(210));

        // 換算到公斤後再計入損耗
        assert_eq!(
            line.loss_adjusted_quantity(Unit::Kilogram).unwrap(),
            dec!(0.21)
        );
    }

    #[test]
    fn test_required_per_output_unit() {
        let recipe = Recipe::new("SAUCE", dec!(2), Unit::Liter)
            .with_line(BomLine::new("TOMATO", dec!(3), Unit::Kilogram).with_loss(dec!(10)));

        // 3kg → 3000g × 1.1 = 3300g，產出 2L = 2000ml → 每 ml 1.65g
        let required = recipe
            .required_per_output_unit(&recipe.lines[0], Unit::Gram, Unit::Milliliter)
            .unwrap();
        assert_eq!(required, dec!(1.65));
    }

    #[test]
    fn test_required_per_output_unit_overflow() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(20), 0);
        let recipe = Recipe::new("DUST", dec!(0.000000000001), Unit::Each)
            .with_line(BomLine::new("SAND", huge, Unit::Gram));

        let err = recipe
            .required_per_output_unit(&recipe.lines[0], Unit::Gram, Unit::Each)
            .unwrap_err();
        assert!(matches!(err, BomError::Overflow(_)));
    }

    #[test]
    fn test_markup_factor() {
        let plain = Recipe::new("A", dec!(1), Unit::Each);
        assert_eq!(plain.markup_factor(), Decimal::ONE);

        let marked = plain.with_markup(dec!(10));
        assert_eq!(marked.markup_factor(), dec!(1.1));
    }
}
