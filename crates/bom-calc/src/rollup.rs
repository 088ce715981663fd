//! 成本展開

use std::collections::BTreeMap;

use bom_core::{
    BomError, Catalog, CostLine, CostResult, CostWarning, EngineConfig, MissingPricePolicy,
    Product, Recipe, Result,
};
use rayon::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

/// 成本展開計算器
///
/// 對組合產品遞迴展開配方：每行用量換算為子件基準單位、乘上損耗係數，
/// 再乘上子件單位成本；總和除以產出數量後套用加成。
/// 成功結果備忘在目錄上，同一目錄的後續查詢直接重用。
pub struct CostCalculator<'a> {
    catalog: &'a Catalog,
    config: &'a EngineConfig,
}

impl<'a> CostCalculator<'a> {
    /// 創建新的成本計算器
    pub fn new(catalog: &'a Catalog, config: &'a EngineConfig) -> Self {
        Self { catalog, config }
    }

    /// 計算單一產品的每基準單位成本
    ///
    /// 備忘的是未經進位的結果；`cost_scale` 只作用在回傳給呼叫端的單位成本，
    /// 上層配方引用子件時仍使用完整精度。
    pub fn cost(&self, product_id: &str) -> Result<CostResult> {
        let mut visiting = Vec::new();
        let mut result = self.resolve(product_id, &mut visiting)?;
        if let Some(scale) = self.config.cost_scale {
            result.unit_cost = result
                .unit_cost
                .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
        }
        Ok(result)
    }

    /// 並行計算所有組合產品的成本
    ///
    /// 各產品獨立成敗，一個產品失敗不影響其他產品。
    pub fn cost_all(&self) -> BTreeMap<String, Result<CostResult>> {
        let ids = self.catalog.composite_ids();
        tracing::info!("開始成本展開：組合產品 {} 項", ids.len());
        let start_time = std::time::Instant::now();

        let results: BTreeMap<String, Result<CostResult>> = ids
            .par_iter()
            .map(|id| (id.to_string(), self.cost(id)))
            .collect();

        let failed = results.values().filter(|r| r.is_err()).count();
        tracing::info!(
            "成本展開完成，耗時 {:?}，失敗 {} 項",
            start_time.elapsed(),
            failed
        );
        results
    }

    fn resolve(&self, product_id: &str, visiting: &mut Vec<String>) -> Result<CostResult> {
        let product = self
            .catalog
            .product(product_id)
            .ok_or_else(|| BomError::UnknownProduct(product_id.to_string()))?;

        if !product.is_composite {
            return self.leaf_cost(product);
        }

        // 目錄可能未經正規化，展開時仍需自行防範循環
        if visiting.iter().any(|id| id == product_id) || visiting.len() >= self.config.max_depth {
            let mut path = visiting.clone();
            path.push(product_id.to_string());
            tracing::warn!("成本展開遇到循環或超過深度: {}", path.join(" -> "));
            return Err(BomError::CyclicBom { path });
        }

        if let Some(cached) = self.catalog.cached_cost(product_id) {
            tracing::debug!("成本備忘命中: {}", product_id);
            // 備忘可能由寬鬆政策的查詢寫入
            if let (MissingPricePolicy::Reject, Some(CostWarning::MissingComponentPrice { product_id })) =
                (self.config.missing_price, cached.warnings.first())
            {
                return Err(BomError::MissingComponentPrice(product_id.clone()));
            }
            return Ok(cached.clone());
        }

        let recipe = self
            .catalog
            .recipe(product_id)
            .ok_or_else(|| self.catalog.missing_recipe_error(product_id))?;

        visiting.push(product_id.to_string());
        let rolled = self.roll_up(product, recipe, visiting);
        visiting.pop();

        let result = rolled?;
        self.catalog.remember_cost(&result);
        Ok(result)
    }

    /// 原料成本
    fn leaf_cost(&self, product: &Product) -> Result<CostResult> {
        let (unit_cost, warnings) = match (product.unit_cost, self.config.missing_price) {
            (Some(cost), _) => (cost, Vec::new()),
            (None, MissingPricePolicy::ZeroWithWarning) => {
                tracing::warn!("原料缺少成本，以 0 計算: {}", product.id);
                (
                    Decimal::ZERO,
                    vec![CostWarning::MissingComponentPrice {
                        product_id: product.id.clone(),
                    }],
                )
            }
            (None, MissingPricePolicy::Reject) => {
                return Err(BomError::MissingComponentPrice(product.id.clone()));
            }
        };

        Ok(CostResult {
            product_id: product.id.clone(),
            unit_cost,
            per_unit: product.base_unit,
            breakdown: vec![CostLine {
                component_id: product.id.clone(),
                quantity: Decimal::ONE,
                loss_adjusted_quantity: Decimal::ONE,
                component_unit_cost: unit_cost,
                line_cost: unit_cost,
            }],
            cost_before_markup: unit_cost,
            markup_percentage: None,
            warnings,
        })
    }

    /// 展開配方
    fn roll_up(
        &self,
        product: &Product,
        recipe: &Recipe,
        visiting: &mut Vec<String>,
    ) -> Result<CostResult> {
        let output = recipe.output_in_base(product.base_unit)?;
        if output <= Decimal::ZERO {
            return Err(BomError::InvalidQuantity {
                field: "output_quantity",
                value: recipe.output_quantity,
            });
        }

        let mut breakdown = Vec::with_capacity(recipe.lines.len());
        let mut warnings: Vec<CostWarning> = Vec::new();
        let mut total = Decimal::ZERO;

        for line in &recipe.lines {
            let component = self
                .catalog
                .product(&line.component_id)
                .ok_or_else(|| BomError::UnknownProduct(line.component_id.clone()))?;

            let quantity = line.base_quantity(component.base_unit)?;
            let loss_adjusted_quantity = line.loss_adjusted_quantity(component.base_unit)?;
            let component_cost = self.resolve(&line.component_id, visiting)?;
            let line_cost = loss_adjusted_quantity
                .checked_mul(component_cost.unit_cost)
                .ok_or_else(|| overflow(&product.id, &line.component_id))?;

            tracing::debug!(
                "成本展開: {} → {} (用量: {}, 損耗後: {}, 行成本: {})",
                product.id,
                line.component_id,
                quantity,
                loss_adjusted_quantity,
                line_cost
            );

            for warning in component_cost.warnings {
                if !warnings.contains(&warning) {
                    warnings.push(warning);
                }
            }

            total = total
                .checked_add(line_cost)
                .ok_or_else(|| overflow(&product.id, &line.component_id))?;
            breakdown.push(CostLine {
                component_id: line.component_id.clone(),
                quantity,
                loss_adjusted_quantity,
                component_unit_cost: component_cost.unit_cost,
                line_cost,
            });
        }

        let cost_before_markup = total
            .checked_div(output)
            .ok_or_else(|| BomError::Overflow(format!("{} 單位成本", product.id)))?;
        let unit_cost = cost_before_markup
            .checked_mul(recipe.markup_factor())
            .ok_or_else(|| BomError::Overflow(format!("{} 加成後成本", product.id)))?;

        Ok(CostResult {
            product_id: product.id.clone(),
            unit_cost,
            per_unit: product.base_unit,
            breakdown,
            cost_before_markup,
            markup_percentage: recipe.markup_percentage,
            warnings,
        })
    }
}

fn overflow(product_id: &str, component_id: &str) -> BomError {
    BomError::Overflow(format!("{} 的子件 {} 行成本", product_id, component_id))
}
