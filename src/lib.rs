//! # BOM
//!
//! 配方成本展開與虛擬庫存引擎
//!
//! - [`bom_core`]：資料模型、單位換算、庫存快照
//! - [`bom_graph`]：原始記錄正規化與循環偵測
//! - [`bom_calc`]：成本展開、可生產量計算

pub use bom_calc::{AvailabilityCalculator, CostCalculator};
pub use bom_core::{
    convert, Availability, AvailabilityResult, BomError, BomLine, Catalog, CostLine, CostResult,
    CostWarning, Dimension, EngineConfig, LineCapacity, MissingPricePolicy, Product, RawBomLine,
    RawProduct, RawRecipe, Recipe, Result, StockEntry, StockLedger, StockSnapshot, Unit,
    WarehouseFilter,
};
pub use bom_graph::{normalize, BomNormalizer, Subject, ValidationError};

pub use bom_calc::{availability, cost};
pub use rust_decimal::Decimal;
