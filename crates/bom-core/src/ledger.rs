//! 記憶體庫存帳本
//!
//! 代表外部庫存帳本的邊界實作：可被並行修改，但快照只在一次讀鎖內取得，
//! 因此每個快照都是一致的單次讀取。

use std::sync::{PoisonError, RwLock};

use rust_decimal::Decimal;

use crate::{BomError, Result, StockEntry, StockSnapshot, WarehouseFilter};

/// 庫存帳本
#[derive(Debug, Default)]
pub struct StockLedger {
    entries: RwLock<Vec<StockEntry>>,
}

impl StockLedger {
    /// 創建空帳本
    pub fn new() -> Self {
        Self::default()
    }

    /// 記錄一筆庫存
    pub fn record(&self, entry: StockEntry) -> Result<()> {
        if entry.quantity.is_sign_negative() && !entry.quantity.is_zero() {
            return Err(BomError::NegativeStock {
                product_id: entry.product_id,
                warehouse_id: entry.warehouse_id,
                quantity: entry.quantity,
            });
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push(entry);
        Ok(())
    }

    /// 設置某產品在某倉庫的數量（覆蓋該倉庫所有批次）
    ///
    /// 數量以既有記錄的單位表示；沒有記錄時不做任何事並回傳 false。
    pub fn set_quantity(&self, product_id: &str, warehouse_id: &str, quantity: Decimal) -> Result<bool> {
        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(BomError::NegativeStock {
                product_id: product_id.to_string(),
                warehouse_id: warehouse_id.to_string(),
                quantity,
            });
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(first) = entries
            .iter()
            .position(|e| e.product_id == product_id && e.warehouse_id == warehouse_id)
        else {
            return Ok(false);
        };

        entries[first].quantity = quantity;
        entries[first].batch_id = None;
        let mut index = 0;
        entries.retain(|e| {
            let keep = index == first || e.product_id != product_id || e.warehouse_id != warehouse_id;
            index += 1;
            keep
        });
        Ok(true)
    }

    /// 取得庫存快照（單次讀鎖，可依倉庫篩選）
    pub fn snapshot(&self, filter: Option<&WarehouseFilter>) -> Result<StockSnapshot> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let selected: Vec<StockEntry> = entries
            .iter()
            .filter(|e| filter.map_or(true, |f| f.matches(&e.warehouse_id)))
            .cloned()
            .collect();
        drop(entries);

        StockSnapshot::capture(selected)
    }

    /// 帳本記錄數
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// 帳本是否為空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
