//! 計量單位與換算表
//!
//! 每個維度（質量、體積、數量）以一個標準單位為基準（克、毫升、個），
//! 其餘單位以相對於標準單位的係數表示。同維度內換算為 O(1) 查表，
//! 跨維度換算（例如以密度換算體積與質量）一律拒絕。

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{BomError, Result};

/// 物理維度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// 質量（標準單位：克）
    Mass,
    /// 體積（標準單位：毫升）
    Volume,
    /// 數量（標準單位：個）
    Count,
}

impl Dimension {
    /// 該維度的標準單位
    pub fn canonical_unit(self) -> Unit {
        match self {
            Dimension::Mass => Unit::Gram,
            Dimension::Volume => Unit::Milliliter,
            Dimension::Count => Unit::Each,
        }
    }

    /// 是否為離散維度（只能以整數單位生產）
    pub fn is_discrete(self) -> bool {
        matches!(self, Dimension::Count)
    }
}

/// 計量單位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Milligram,
    Gram,
    Kilogram,
    Ounce,
    Pound,
    Milliliter,
    Centiliter,
    Deciliter,
    Liter,
    FluidOunce,
    Each,
    Pair,
    Dozen,
}

impl Unit {
    /// 所有支援的單位
    pub const ALL: [Unit; 13] = [
        Unit::Milligram,
        Unit::Gram,
        Unit::Kilogram,
        Unit::Ounce,
        Unit::Pound,
        Unit::Milliliter,
        Unit::Centiliter,
        Unit::Deciliter,
        Unit::Liter,
        Unit::FluidOunce,
        Unit::Each,
        Unit::Pair,
        Unit::Dozen,
    ];

    /// 單位所屬維度
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Milligram | Unit::Gram | Unit::Kilogram | Unit::Ounce | Unit::Pound => {
                Dimension::Mass
            }
            Unit::Milliliter
            | Unit::Centiliter
            | Unit::Deciliter
            | Unit::Liter
            | Unit::FluidOunce => Dimension::Volume,
            Unit::Each | Unit::Pair | Unit::Dozen => Dimension::Count,
        }
    }

    /// 相對於維度標準單位的換算係數
    pub fn factor(self) -> Decimal {
        match self {
            Unit::Milligram => dec!(0.001),
            Unit::Gram => Decimal::ONE,
            Unit::Kilogram => dec!(1000),
            Unit::Ounce => dec!(28.349523125),
            Unit::Pound => dec!(453.59237),
            Unit::Milliliter => Decimal::ONE,
            Unit::Centiliter => dec!(10),
            Unit::Deciliter => dec!(100),
            Unit::Liter => dec!(1000),
            Unit::FluidOunce => dec!(29.5735295625),
            Unit::Each => Decimal::ONE,
            Unit::Pair => dec!(2),
            Unit::Dozen => dec!(12),
        }
    }

    /// 標準符號
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Milligram => "mg",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Ounce => "oz",
            Unit::Pound => "lb",
            Unit::Milliliter => "ml",
            Unit::Centiliter => "cl",
            Unit::Deciliter => "dl",
            Unit::Liter => "l",
            Unit::FluidOunce => "fl oz",
            Unit::Each => "each",
            Unit::Pair => "pair",
            Unit::Dozen => "dozen",
        }
    }

    /// 兩單位是否可互相換算
    pub fn is_compatible(self, other: Unit) -> bool {
        self.dimension() == other.dimension()
    }
}

/// 同維度內換算數量
///
/// 跨維度時回傳 [`BomError::IncompatibleUnits`]，超出 `Decimal` 範圍時回傳
/// [`BomError::Overflow`]。
pub fn convert(quantity: Decimal, from: Unit, to: Unit) -> Result<Decimal> {
    if from == to {
        return Ok(quantity);
    }
    if !from.is_compatible(to) {
        return Err(BomError::IncompatibleUnits { from, to });
    }
    quantity
        .checked_mul(from.factor())
        .and_then(|q| q.checked_div(to.factor()))
        .ok_or_else(|| BomError::Overflow(format!("{} {} → {}", quantity, from, to)))
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = BomError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let unit = match normalized.as_str() {
            "mg" | "milligram" | "milligrams" => Unit::Milligram,
            "g" | "gr" | "gram" | "grams" | "grammi" => Unit::Gram,
            "kg" | "kilo" | "kilogram" | "kilograms" => Unit::Kilogram,
            "oz" | "ounce" | "ounces" => Unit::Ounce,
            "lb" | "lbs" | "pound" | "pounds" => Unit::Pound,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Unit::Milliliter,
            "cl" | "centiliter" | "centiliters" => Unit::Centiliter,
            "dl" | "deciliter" | "deciliters" => Unit::Deciliter,
            "l" | "lt" | "liter" | "liters" | "litre" | "litres" => Unit::Liter,
            "fl oz" | "floz" | "fl_oz" | "fluid ounce" => Unit::FluidOunce,
            "each" | "ea" | "pc" | "pcs" | "pz" | "piece" | "pieces" | "unit" | "units" => {
                Unit::Each
            }
            "pair" | "pairs" => Unit::Pair,
            "dozen" | "dz" => Unit::Dozen,
            _ => return Err(BomError::UnknownUnit(s.to_string())),
        };
        Ok(unit)
    }
}

impl Serialize for Unit {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
