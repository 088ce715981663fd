//! 計算引擎配置

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BomError, Result};

/// 原料缺價的處理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPricePolicy {
    /// 以 0 計算並在結果上附加警告（預設）
    #[default]
    ZeroWithWarning,
    /// 直接回傳 `MissingComponentPrice` 錯誤
    Reject,
}

/// 成本與可生產量引擎的參數配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 限制因素並列判定的相對容差
    pub tie_tolerance: Decimal,

    /// 成本展開的最大遞迴深度（超過視為循環）
    pub max_depth: usize,

    /// 原料缺價策略
    pub missing_price: MissingPricePolicy,

    /// 最終單位成本的小數位數（None 表示不取整）
    pub cost_scale: Option<u32>,
}

impl EngineConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self {
            tie_tolerance: Decimal::new(1, 9),
            max_depth: 64,
            missing_price: MissingPricePolicy::ZeroWithWarning,
            cost_scale: None,
        }
    }

    /// 建構器模式：設置並列容差
    pub fn with_tie_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tie_tolerance = tolerance;
        self
    }

    /// 建構器模式：設置最大遞迴深度
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 建構器模式：設置缺價策略
    pub fn with_missing_price(mut self, policy: MissingPricePolicy) -> Self {
        self.missing_price = policy;
        self
    }

    /// 建構器模式：設置成本小數位數
    ///
    /// # 範例
    /// ```
    /// # use bom_core::EngineConfig;
    /// let config = EngineConfig::new().with_cost_scale(4);
    /// assert_eq!(config.cost_scale, Some(4));
    /// ```
    pub fn with_cost_scale(mut self, scale: u32) -> Self {
        self.cost_scale = Some(scale);
        self
    }

    /// 從 JSON 載入配置，缺少的欄位使用預設值
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BomError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 檢查配置是否合理
    pub fn validate(&self) -> Result<()> {
        if self.tie_tolerance.is_sign_negative() {
            return Err(BomError::Config(format!(
                "tie_tolerance 不可為負: {}",
                self.tie_tolerance
            )));
        }
        if self.max_depth == 0 {
            return Err(BomError::Config("max_depth 必須大於 0".to_string()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tie_tolerance, dec!(0.000000001));
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.missing_price, MissingPricePolicy::ZeroWithWarning);
        assert_eq!(config.cost_scale, None);
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .with_tie_tolerance(dec!(0.001))
            .with_max_depth(8)
            .with_missing_price(MissingPricePolicy::Reject)
            .with_cost_scale(2);

        assert_eq!(config.tie_tolerance, dec!(0.001));
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.missing_price, MissingPricePolicy::Reject);
        assert_eq!(config.cost_scale, Some(2));
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json(r#"{ "missing_price": "reject", "max_depth": 10 }"#)
            .unwrap();
        assert_eq!(config.missing_price, MissingPricePolicy::Reject);
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.tie_tolerance, dec!(0.000000001));
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "max_depth": 0 }"#),
            Err(BomError::Config(_))
        ));
        assert!(EngineConfig::from_json("not json").is_err());
    }
}
