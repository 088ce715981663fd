//! # BOM Graph
//!
//! BOM 正規化：驗證原始產品/配方記錄、偵測循環依賴，產生不可變的 [`Catalog`]

pub mod cycle;
pub mod normalize;

// Re-export 主要類型
pub use cycle::{find_cycles, upstream_of_cycles, DependencyGraph};
pub use normalize::BomNormalizer;

use bom_core::{BomError, Catalog, RawProduct, RawRecipe};
use std::fmt;

/// 驗證錯誤的對象
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// 產品記錄
    Product(String),
    /// 配方記錄（可指明第幾行，從 1 起算）
    Recipe {
        product_id: String,
        line: Option<usize>,
    },
}

impl Subject {
    /// 相關產品ID
    pub fn product_id(&self) -> &str {
        match self {
            Subject::Product(id) => id,
            Subject::Recipe { product_id, .. } => product_id,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Product(id) => write!(f, "產品 {}", id),
            Subject::Recipe {
                product_id,
                line: None,
            } => write!(f, "配方 {}", product_id),
            Subject::Recipe {
                product_id,
                line: Some(line),
            } => write!(f, "配方 {} 第 {} 行", product_id, line),
        }
    }
}

/// 正規化驗證錯誤
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{subject}: {error}")]
pub struct ValidationError {
    pub subject: Subject,
    #[source]
    pub error: BomError,
}

impl ValidationError {
    pub fn product(product_id: impl Into<String>, error: BomError) -> Self {
        Self {
            subject: Subject::Product(product_id.into()),
            error,
        }
    }

    pub fn recipe(product_id: impl Into<String>, error: BomError) -> Self {
        Self {
            subject: Subject::Recipe {
                product_id: product_id.into(),
                line: None,
            },
            error,
        }
    }

    pub fn line(product_id: impl Into<String>, index: usize, error: BomError) -> Self {
        Self {
            subject: Subject::Recipe {
                product_id: product_id.into(),
                line: Some(index + 1),
            },
            error,
        }
    }
}

/// 正規化原始記錄
///
/// 回傳目錄與所有驗證錯誤（不在第一個錯誤就停止）。有錯誤的配方不會進入目錄。
pub fn normalize(
    raw_products: &[RawProduct],
    raw_recipes: &[RawRecipe],
) -> (Catalog, Vec<ValidationError>) {
    BomNormalizer::normalize(raw_products, raw_recipes)
}
