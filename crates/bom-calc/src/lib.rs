//! # BOM Calculation Engine
//!
//! 成本展開與可生產量（虛擬庫存）計算。兩者都是不可變目錄與庫存快照上的
//! 純函數，不做 I/O、不修改輸入，可安全地跨執行緒並行查詢。

pub mod availability;
pub mod rollup;

// Re-export 主要類型
pub use availability::AvailabilityCalculator;
pub use rollup::CostCalculator;

use bom_core::{
    AvailabilityResult, Catalog, CostResult, EngineConfig, Result, StockSnapshot,
    WarehouseFilter,
};

/// 以預設配置計算產品成本
pub fn cost(catalog: &Catalog, product_id: &str) -> Result<CostResult> {
    let config = EngineConfig::default();
    CostCalculator::new(catalog, &config).cost(product_id)
}

/// 以預設配置計算組合產品的可生產量
pub fn availability(
    catalog: &Catalog,
    snapshot: &StockSnapshot,
    product_id: &str,
    filter: Option<&WarehouseFilter>,
) -> Result<AvailabilityResult> {
    let config = EngineConfig::default();
    AvailabilityCalculator::new(catalog, snapshot, &config).availability(product_id, filter)
}
