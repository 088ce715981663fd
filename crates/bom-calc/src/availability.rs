//! 可生產量（虛擬庫存）計算

use std::collections::BTreeMap;

use bom_core::{
    Availability, AvailabilityResult, BomError, Catalog, EngineConfig, LineCapacity, Result,
    StockSnapshot, Unit, WarehouseFilter,
};
use rayon::prelude::*;
use rust_decimal::Decimal;

/// 可生產量計算器
///
/// 所有查詢共用同一個庫存快照，因此共用子件的不同產品看到相同的現有庫存。
pub struct AvailabilityCalculator<'a> {
    catalog: &'a Catalog,
    snapshot: &'a StockSnapshot,
    config: &'a EngineConfig,
}

/// 子件需求（同一子件的多行已合併）
struct Requirement<'r> {
    component_id: &'r str,
    base_unit: Unit,
    per_output_unit: Decimal,
}

impl<'a> AvailabilityCalculator<'a> {
    /// 創建新的可生產量計算器
    pub fn new(catalog: &'a Catalog, snapshot: &'a StockSnapshot, config: &'a EngineConfig) -> Self {
        Self {
            catalog,
            snapshot,
            config,
        }
    }

    /// 計算單一組合產品的可生產量與限制因素
    pub fn availability(
        &self,
        product_id: &str,
        filter: Option<&WarehouseFilter>,
    ) -> Result<AvailabilityResult> {
        let product = self
            .catalog
            .product(product_id)
            .ok_or_else(|| BomError::UnknownProduct(product_id.to_string()))?;
        if !product.is_composite {
            return Err(BomError::NotComposite(product_id.to_string()));
        }
        let recipe = self
            .catalog
            .recipe(product_id)
            .ok_or_else(|| self.catalog.missing_recipe_error(product_id))?;

        // 沒有子件：不受任何庫存限制
        if recipe.is_empty() {
            tracing::debug!("產品 {} 沒有子件，可生產量無上限", product_id);
            return Ok(AvailabilityResult {
                product_id: product_id.to_string(),
                virtual_available: Availability::Unbounded,
                unit: product.base_unit,
                limiting_lines: Vec::new(),
                lines: Vec::new(),
                snapshot_id: self.snapshot.id(),
            });
        }

        // Step 1: 每單位產出的子件需求（同一子件合併）
        let mut requirements: Vec<Requirement<'_>> = Vec::with_capacity(recipe.lines.len());
        for line in &recipe.lines {
            let component = self
                .catalog
                .product(&line.component_id)
                .ok_or_else(|| BomError::UnknownProduct(line.component_id.clone()))?;

            let per_output_unit =
                recipe.required_per_output_unit(line, component.base_unit, product.base_unit)?;
            if per_output_unit <= Decimal::ZERO {
                return Err(BomError::ZeroRequirement {
                    product_id: product_id.to_string(),
                    component_id: line.component_id.clone(),
                });
            }

            match requirements
                .iter_mut()
                .find(|r| r.component_id == line.component_id)
            {
                Some(existing) => {
                    existing.per_output_unit = existing
                        .per_output_unit
                        .checked_add(per_output_unit)
                        .ok_or_else(|| {
                            BomError::Overflow(format!("{} 的子件 {} 需求", product_id, line.component_id))
                        })?;
                }
                None => requirements.push(Requirement {
                    component_id: &line.component_id,
                    base_unit: component.base_unit,
                    per_output_unit,
                }),
            }
        }

        // Step 2: 各子件產能 = 現有庫存 / 每單位需求
        let mut lines = Vec::with_capacity(requirements.len());
        for requirement in &requirements {
            let on_hand = self
                .snapshot
                .on_hand(requirement.component_id, requirement.base_unit, filter)?;
            let line_capacity = on_hand
                .checked_div(requirement.per_output_unit)
                .unwrap_or(Decimal::MAX);

            tracing::debug!(
                "產能: {} ← {} (需求: {}, 庫存: {}, 產能: {})",
                product_id,
                requirement.component_id,
                requirement.per_output_unit,
                on_hand,
                line_capacity
            );

            lines.push(LineCapacity {
                component_id: requirement.component_id.to_string(),
                required_per_output_unit: requirement.per_output_unit,
                on_hand,
                line_capacity,
            });
        }

        // Step 3: 取最小值，所有並列的子件都是限制因素
        let minimum = lines
            .iter()
            .map(|l| l.line_capacity)
            .min()
            .unwrap_or(Decimal::ZERO);
        let limiting_lines: Vec<LineCapacity> = lines
            .iter()
            .filter(|l| is_tie(l.line_capacity, minimum, self.config.tie_tolerance))
            .cloned()
            .collect();

        tracing::debug!(
            "產品 {} 可生產量 {}，限制因素 {} 項",
            product_id,
            minimum,
            limiting_lines.len()
        );

        Ok(AvailabilityResult {
            product_id: product_id.to_string(),
            virtual_available: Availability::Limited(minimum),
            unit: product.base_unit,
            limiting_lines,
            lines,
            snapshot_id: self.snapshot.id(),
        })
    }

    /// 並行計算所有組合產品的可生產量
    pub fn availability_all(
        &self,
        filter: Option<&WarehouseFilter>,
    ) -> BTreeMap<String, Result<AvailabilityResult>> {
        let ids = self.catalog.composite_ids();
        tracing::info!(
            "開始可生產量計算：組合產品 {} 項，快照 {}",
            ids.len(),
            self.snapshot.id()
        );

        ids.par_iter()
            .map(|id| (id.to_string(), self.availability(id, filter)))
            .collect()
    }
}

/// 相對容差內視為並列
fn is_tie(capacity: Decimal, minimum: Decimal, tolerance: Decimal) -> bool {
    let diff = (capacity - minimum).abs();
    let scale = capacity.abs().max(minimum.abs());
    scale.checked_mul(tolerance).map_or(true, |bound| diff <= bound)
}
