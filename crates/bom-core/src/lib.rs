//! # BOM Core
//!
//! 核心資料模型與類型定義（單位、產品、配方、庫存快照、目錄）

pub mod catalog;
pub mod config;
pub mod ledger;
pub mod product;
pub mod raw;
pub mod recipe;
pub mod result;
pub mod stock;
pub mod unit;

// Re-export 主要類型
pub use catalog::Catalog;
pub use config::{EngineConfig, MissingPricePolicy};
pub use ledger::StockLedger;
pub use product::Product;
pub use raw::{RawBomLine, RawProduct, RawRecipe};
pub use recipe::{BomLine, Recipe};
pub use result::{
    Availability, AvailabilityResult, CostLine, CostResult, CostWarning, LineCapacity,
};
pub use stock::{StockEntry, StockSnapshot, WarehouseFilter};
pub use unit::{convert, Dimension, Unit};

use rust_decimal::Decimal;

/// BOM 錯誤類型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BomError {
    #[error("BOM 循環依賴: {}", .path.join(" -> "))]
    CyclicBom { path: Vec<String> },

    #[error("單位不相容: {from} 無法轉換為 {to}")]
    IncompatibleUnits { from: Unit, to: Unit },

    #[error("找不到產品: {0}")]
    UnknownProduct(String),

    #[error("無法識別的單位: {0}")]
    UnknownUnit(String),

    #[error("用量為零: {product_id} 的子件 {component_id} 每單位需求量為 0")]
    ZeroRequirement {
        product_id: String,
        component_id: String,
    },

    #[error("組合產品缺少配方: {0}")]
    MissingRecipe(String),

    #[error("產品不是組合產品: {0}")]
    NotComposite(String),

    #[error("產品缺少成本: {0}")]
    MissingComponentPrice(String),

    #[error("無效的數值 {field} = {value}")]
    InvalidQuantity { field: &'static str, value: Decimal },

    #[error("缺少必要欄位: {0}")]
    MissingField(&'static str),

    #[error("重複的產品ID: {0}")]
    DuplicateProduct(String),

    #[error("重複的配方: {0}")]
    DuplicateRecipe(String),

    #[error("庫存數量為負: {product_id} 於倉庫 {warehouse_id} 數量 {quantity}")]
    NegativeStock {
        product_id: String,
        warehouse_id: String,
        quantity: Decimal,
    },

    /// 運算結果超出 `Decimal` 可表示範圍
    #[error("數值溢位: {0}")]
    Overflow(String),

    #[error("配置錯誤: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BomError>;
