//! 產品目錄
//!
//! 一次計算批次所用的不可變產品與配方集合。資料變動時應建立新的目錄，
//! 而不是修改既有目錄。

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::{BomError, CostResult, Product, Recipe};

/// 不可變產品目錄
#[derive(Debug, Clone)]
pub struct Catalog {
    products: HashMap<String, Product>,
    recipes: HashMap<String, Recipe>,
    /// 成本備忘：每個產品一格，建立目錄時預先配置，之後只寫入一次
    cost_memo: HashMap<String, OnceLock<CostResult>>,
    /// 配方被排除的原因（例如位於循環上）
    excluded: HashMap<String, BomError>,
}

impl Catalog {
    /// 由產品與配方直接建立目錄（不做驗證）
    ///
    /// 一般應透過正規化流程建立；直接建立的目錄可能含循環或無效單位，
    /// 計算引擎會在查詢時回報這些錯誤。
    pub fn from_parts(
        products: impl IntoIterator<Item = Product>,
        recipes: impl IntoIterator<Item = Recipe>,
    ) -> Self {
        let products: HashMap<String, Product> = products
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let recipes: HashMap<String, Recipe> = recipes
            .into_iter()
            .map(|r| (r.output_product_id.clone(), r))
            .collect();
        let cost_memo = products
            .keys()
            .map(|id| (id.clone(), OnceLock::new()))
            .collect();

        Self {
            products,
            recipes,
            cost_memo,
            excluded: HashMap::new(),
        }
    }

    /// 建構器模式：記錄配方被排除的原因
    ///
    /// 查詢該產品時回傳此錯誤，而不是 [`BomError::MissingRecipe`]。
    pub fn with_excluded_recipe(mut self, product_id: impl Into<String>, reason: BomError) -> Self {
        self.excluded.insert(product_id.into(), reason);
        self
    }

    /// 組合產品沒有可用配方時應回報的錯誤
    pub fn missing_recipe_error(&self, product_id: &str) -> BomError {
        self.excluded
            .get(product_id)
            .cloned()
            .unwrap_or_else(|| BomError::MissingRecipe(product_id.to_string()))
    }

    /// 查詢產品
    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.products.get(product_id)
    }

    /// 查詢配方
    pub fn recipe(&self, product_id: &str) -> Option<&Recipe> {
        self.recipes.get(product_id)
    }

    /// 所有產品
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// 所有配方
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// 所有組合產品ID（排序後）
    pub fn composite_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .products
            .values()
            .filter(|p| p.is_composite)
            .map(|p| p.id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// 產品數量
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// 目錄是否為空
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// 已備忘的成本
    pub fn cached_cost(&self, product_id: &str) -> Option<&CostResult> {
        self.cost_memo.get(product_id).and_then(OnceLock::get)
    }

    /// 備忘成本結果（已存在時保留先寫入的結果）
    pub fn remember_cost(&self, result: &CostResult) {
        if let Some(cell) = self.cost_memo.get(&result.product_id) {
            let _ = cell.set(result.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BomLine, Unit};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn sample_catalog() -> Catalog {
        Catalog::from_parts(
            vec![
                Product::raw("FLOUR", "Flour", Unit::Gram).with_unit_cost(dec!(0.002)),
                Product::composite("BREAD", "Bread", Unit::Each),
                Product::composite("TOAST", "Toast", Unit::Each),
            ],
            vec![Recipe::new("BREAD", dec!(1), Unit::Each)
                .with_line(BomLine::new("FLOUR", dec!(500), Unit::Gram))],
        )
    }

    #[test]
    fn test_lookup() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.product("FLOUR").is_some());
        assert!(catalog.recipe("BREAD").is_some());
        assert!(catalog.recipe("FLOUR").is_none());
        assert_eq!(catalog.composite_ids(), vec!["BREAD", "TOAST"]);
    }

    #[test]
    fn test_missing_recipe_error_keeps_reason() {
        let cyclic = BomError::CyclicBom {
            path: vec!["TOAST".to_string(), "TOAST".to_string()],
        };
        let catalog = sample_catalog().with_excluded_recipe("TOAST", cyclic.clone());

        assert_eq!(catalog.missing_recipe_error("TOAST"), cyclic);
        assert_eq!(
            catalog.missing_recipe_error("BREAD"),
            BomError::MissingRecipe("BREAD".to_string())
        );
    }

    #[test]
    fn test_cost_memo_written_once() {
        let catalog = sample_catalog();
        assert!(catalog.cached_cost("FLOUR").is_none());

        let first = CostResult {
            product_id: "FLOUR".to_string(),
            unit_cost: dec!(0.002),
            per_unit: Unit::Gram,
            breakdown: Vec::new(),
            cost_before_markup: dec!(0.002),
            markup_percentage: None,
            warnings: Vec::new(),
        };
        catalog.remember_cost(&first);

        let mut second = first.clone();
        second.unit_cost = Decimal::ONE;
        catalog.remember_cost(&second);

        assert_eq!(catalog.cached_cost("FLOUR").unwrap().unit_cost, dec!(0.002));
    }

    #[test]
    fn test_memo_ignores_unknown_product() {
        let catalog = sample_catalog();
        let stray = CostResult {
            product_id: "GHOST".to_string(),
            unit_cost: Decimal::ONE,
            per_unit: Unit::Each,
            breakdown: Vec::new(),
            cost_before_markup: Decimal::ONE,
            markup_percentage: None,
            warnings: Vec::new(),
        };
        catalog.remember_cost(&stray);
        assert!(catalog.cached_cost("GHOST").is_none());
    }
}
