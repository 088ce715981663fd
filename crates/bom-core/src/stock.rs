//! 庫存記錄與庫存快照

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{convert, BomError, Result, Unit};

/// 庫存記錄（單一倉庫、單一批次）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    /// 產品ID
    pub product_id: String,

    /// 倉庫
    pub warehouse_id: String,

    /// 數量（非負）
    pub quantity: Decimal,

    /// 數量單位
    pub unit: Unit,

    /// 批次
    pub batch_id: Option<String>,
}

impl StockEntry {
    /// 創建新的庫存記錄
    pub fn new(
        product_id: impl Into<String>,
        warehouse_id: impl Into<String>,
        quantity: Decimal,
        unit: Unit,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            warehouse_id: warehouse_id.into(),
            quantity,
            unit,
            batch_id: None,
        }
    }

    /// 建構器模式：設置批次
    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }
}

/// 倉庫篩選條件
///
/// 空集合視為不限倉庫，與不傳篩選條件相同。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WarehouseFilter {
    warehouses: BTreeSet<String>,
}

impl WarehouseFilter {
    /// 只包含單一倉庫
    pub fn single(warehouse_id: impl Into<String>) -> Self {
        Self {
            warehouses: BTreeSet::from([warehouse_id.into()]),
        }
    }

    /// 包含任一指定倉庫
    pub fn any_of<I, S>(warehouse_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            warehouses: warehouse_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// 倉庫是否符合條件
    pub fn matches(&self, warehouse_id: &str) -> bool {
        self.warehouses.is_empty() || self.warehouses.contains(warehouse_id)
    }
}

/// 庫存快照：某一時點的不可變庫存視圖
///
/// 同一快照上的所有查詢看到完全相同的庫存，即使底層帳本之後被修改。
/// 複製快照只複製 `Arc`，不複製記錄。
#[derive(Debug, Clone)]
pub struct StockSnapshot {
    id: Uuid,
    taken_at: DateTime<Utc>,
    by_product: Arc<HashMap<String, Vec<StockEntry>>>,
}

impl StockSnapshot {
    /// 由庫存記錄建立快照，負數量直接拒絕
    pub fn capture(entries: impl IntoIterator<Item = StockEntry>) -> Result<Self> {
        let mut by_product: HashMap<String, Vec<StockEntry>> = HashMap::new();
        for entry in entries {
            if entry.quantity.is_sign_negative() && !entry.quantity.is_zero() {
                return Err(BomError::NegativeStock {
                    product_id: entry.product_id,
                    warehouse_id: entry.warehouse_id,
                    quantity: entry.quantity,
                });
            }
            by_product
                .entry(entry.product_id.clone())
                .or_default()
                .push(entry);
        }

        let snapshot = Self {
            id: Uuid::new_v4(),
            taken_at: Utc::now(),
            by_product: Arc::new(by_product),
        };
        tracing::debug!(
            "建立庫存快照 {}：產品 {} 種",
            snapshot.id,
            snapshot.by_product.len()
        );
        Ok(snapshot)
    }

    /// 空快照
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            taken_at: Utc::now(),
            by_product: Arc::new(HashMap::new()),
        }
    }

    /// 快照ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 建立時間
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// 某產品的所有庫存記錄
    pub fn entries_for(&self, product_id: &str) -> &[StockEntry] {
        self.by_product
            .get(product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 現有庫存（換算為 `base_unit`，可依倉庫篩選）
    ///
    /// 沒有記錄的產品回傳 0。
    pub fn on_hand(
        &self,
        product_id: &str,
        base_unit: Unit,
        filter: Option<&WarehouseFilter>,
    ) -> Result<Decimal> {
        let mut total = Decimal::ZERO;
        for entry in self.entries_for(product_id) {
            if let Some(filter) = filter {
                if !filter.matches(&entry.warehouse_id) {
                    continue;
                }
            }
            total = total
                .checked_add(convert(entry.quantity, entry.unit, base_unit)?)
                .ok_or_else(|| BomError::Overflow(format!("{} 現有庫存", product_id)))?;
        }
        Ok(total)
    }

    /// 快照中的產品數量
    pub fn product_count(&self) -> usize {
        self.by_product.len()
    }
}
