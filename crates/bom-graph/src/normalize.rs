//! 原始記錄正規化

use std::collections::{HashMap, HashSet};

use bom_core::{
    BomError, BomLine, Catalog, Product, RawBomLine, RawProduct, RawRecipe, Recipe, Unit,
};
use rust_decimal::Decimal;

use crate::{find_cycles, upstream_of_cycles, DependencyGraph, ValidationError};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// BOM 正規化器
pub struct BomNormalizer;

impl BomNormalizer {
    /// 驗證並轉換原始記錄
    ///
    /// 步驟：
    /// 1. 產品：單位、成本、重複ID
    /// 2. 配方：產出數量/單位、每行用量/損耗/單位、零需求
    /// 3. 組合產品缺配方
    /// 4. 循環偵測（含被拒絕的配方），循環上及其上游產品的配方排除
    pub fn normalize(
        raw_products: &[RawProduct],
        raw_recipes: &[RawRecipe],
    ) -> (Catalog, Vec<ValidationError>) {
        tracing::info!(
            "開始 BOM 正規化：產品 {} 筆，配方 {} 筆",
            raw_products.len(),
            raw_recipes.len()
        );

        let mut errors = Vec::new();

        // Step 1: 產品
        let mut products: HashMap<String, Product> = HashMap::new();
        for raw in raw_products {
            match Self::normalize_product(raw) {
                Ok(product) => {
                    if products.contains_key(&product.id) {
                        errors.push(ValidationError::product(
                            &product.id,
                            BomError::DuplicateProduct(product.id.clone()),
                        ));
                    } else {
                        products.insert(product.id.clone(), product);
                    }
                }
                Err(error) => errors.push(ValidationError::product(&raw.id, error)),
            }
        }
        tracing::debug!("有效產品: {}", products.len());

        // Step 2: 配方
        let mut recipes: HashMap<String, Recipe> = HashMap::new();
        let mut seen_outputs: HashSet<&str> = HashSet::new();
        let mut graph: DependencyGraph<'_> = HashMap::new();
        for raw in raw_recipes {
            if !seen_outputs.insert(raw.output_product_id.as_str()) {
                errors.push(ValidationError::recipe(
                    &raw.output_product_id,
                    BomError::DuplicateRecipe(raw.output_product_id.clone()),
                ));
                continue;
            }
            graph.insert(
                raw.output_product_id.as_str(),
                raw.lines.iter().map(|line| line.component_id.as_str()).collect(),
            );
            match Self::normalize_recipe(raw, &products) {
                Ok(recipe) => {
                    recipes.insert(recipe.output_product_id.clone(), recipe);
                }
                Err(recipe_errors) => errors.extend(recipe_errors),
            }
        }
        tracing::debug!("有效配方: {}", recipes.len());

        // Step 3: 組合產品缺配方（配方本身被拒絕的已另外回報）
        let mut missing: Vec<&str> = products
            .values()
            .filter(|p| p.is_composite && !seen_outputs.contains(p.id.as_str()))
            .map(|p| p.id.as_str())
            .collect();
        missing.sort_unstable();
        for id in missing {
            errors.push(ValidationError::product(
                id,
                BomError::MissingRecipe(id.to_string()),
            ));
        }

        // Step 4: 循環偵測，依原始記錄建圖，被拒絕的配方也一併檢查
        let cycles = find_cycles(&graph);
        let upstream = upstream_of_cycles(&graph, &cycles);
        let mut excluded: HashMap<String, BomError> = HashMap::new();
        for path in cycles {
            let error = BomError::CyclicBom { path: path.clone() };
            for id in &path {
                excluded.entry(id.clone()).or_insert_with(|| error.clone());
            }
            let head = path.first().cloned().unwrap_or_default();
            errors.push(ValidationError::recipe(head, error));
        }
        // 上游產品各自回報到達循環的路徑
        for path in upstream {
            let head = path.first().cloned().unwrap_or_default();
            let error = BomError::CyclicBom { path };
            excluded.insert(head.clone(), error.clone());
            errors.push(ValidationError::recipe(head, error));
        }
        recipes.retain(|id, _| !excluded.contains_key(id));

        for error in &errors {
            tracing::warn!("BOM 驗證失敗: {}", error);
        }
        tracing::info!(
            "BOM 正規化完成：產品 {} 筆，配方 {} 筆，錯誤 {} 筆",
            products.len(),
            recipes.len(),
            errors.len()
        );

        let catalog = excluded.into_iter().fold(
            Catalog::from_parts(products.into_values(), recipes.into_values()),
            |catalog, (id, reason)| catalog.with_excluded_recipe(id, reason),
        );
        (catalog, errors)
    }

    /// 正規化單一產品
    fn normalize_product(raw: &RawProduct) -> bom_core::Result<Product> {
        if raw.id.trim().is_empty() {
            return Err(BomError::MissingField("id"));
        }
        let base_unit: Unit = raw.base_unit.parse()?;

        let name = if raw.name.trim().is_empty() {
            raw.id.clone()
        } else {
            raw.name.clone()
        };

        let mut product = if raw.is_composite {
            Product::composite(raw.id.clone(), name, base_unit)
        } else {
            Product::raw(raw.id.clone(), name, base_unit)
        };

        if let Some(cost) = raw.unit_cost {
            if cost.is_sign_negative() && !cost.is_zero() {
                return Err(BomError::InvalidQuantity {
                    field: "unit_cost",
                    value: cost,
                });
            }
            // 組合產品的成本由配方展開，忽略記錄上的成本
            if !raw.is_composite {
                product = product.with_unit_cost(cost);
            }
        }

        Ok(product)
    }

    /// 正規化單一配方，收集所有錯誤
    fn normalize_recipe(
        raw: &RawRecipe,
        products: &HashMap<String, Product>,
    ) -> Result<Recipe, Vec<ValidationError>> {
        let id = raw.output_product_id.as_str();
        let mut errors = Vec::new();

        let output_product = match products.get(id) {
            Some(product) if product.is_composite => Some(product),
            Some(_) => {
                errors.push(ValidationError::recipe(id, BomError::NotComposite(id.to_string())));
                None
            }
            None => {
                errors.push(ValidationError::recipe(id, BomError::UnknownProduct(id.to_string())));
                None
            }
        };

        let output_quantity = match raw.output_quantity {
            None => {
                errors.push(ValidationError::recipe(id, BomError::MissingField("output_quantity")));
                None
            }
            Some(q) if q <= Decimal::ZERO => {
                errors.push(ValidationError::recipe(
                    id,
                    BomError::InvalidQuantity {
                        field: "output_quantity",
                        value: q,
                    },
                ));
                None
            }
            Some(q) => Some(q),
        };

        // 產出單位預設為產品基準單位
        let output_unit = match (&raw.output_unit, output_product) {
            (Some(raw_unit), product) => match raw_unit.parse::<Unit>() {
                Ok(unit) => match product {
                    Some(p) if !unit.is_compatible(p.base_unit) => {
                        errors.push(ValidationError::recipe(
                            id,
                            BomError::IncompatibleUnits {
                                from: unit,
                                to: p.base_unit,
                            },
                        ));
                        None
                    }
                    _ => Some(unit),
                },
                Err(error) => {
                    errors.push(ValidationError::recipe(id, error));
                    None
                }
            },
            (None, Some(p)) => Some(p.base_unit),
            (None, None) => None,
        };

        if let Some(markup) = raw.markup_percentage {
            if markup.is_sign_negative() && !markup.is_zero() {
                errors.push(ValidationError::recipe(
                    id,
                    BomError::InvalidQuantity {
                        field: "markup_percentage",
                        value: markup,
                    },
                ));
            }
        }

        let mut lines = Vec::with_capacity(raw.lines.len());
        for (index, raw_line) in raw.lines.iter().enumerate() {
            match Self::normalize_line(raw_line, products) {
                Ok(line) => lines.push(line),
                Err(line_errors) => errors.extend(
                    line_errors
                        .into_iter()
                        .map(|error| ValidationError::line(id, index, error)),
                ),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        // 以上檢查通過時三者必定存在
        let (Some(output_product), Some(output_quantity), Some(output_unit)) =
            (output_product, output_quantity, output_unit)
        else {
            return Err(errors);
        };

        let mut recipe = Recipe::new(id, output_quantity, output_unit);
        recipe.markup_percentage = raw.markup_percentage;
        recipe.lines = lines;

        if let Err(error) = recipe.output_in_base(output_product.base_unit) {
            return Err(vec![ValidationError::recipe(id, error)]);
        }

        // 零需求：數值過小換算後被截斷為 0 的行
        for (index, line) in recipe.lines.iter().enumerate() {
            let Some(component) = products.get(&line.component_id) else {
                continue;
            };
            match recipe.required_per_output_unit(line, component.base_unit, output_product.base_unit) {
                Ok(required) if required.is_zero() => errors.push(ValidationError::line(
                    id,
                    index,
                    BomError::ZeroRequirement {
                        product_id: id.to_string(),
                        component_id: line.component_id.clone(),
                    },
                )),
                Ok(_) => {}
                Err(error) => errors.push(ValidationError::line(id, index, error)),
            }
        }

        if errors.is_empty() {
            Ok(recipe)
        } else {
            Err(errors)
        }
    }

    /// 正規化單一 BOM 行，收集所有錯誤
    fn normalize_line(
        raw: &RawBomLine,
        products: &HashMap<String, Product>,
    ) -> Result<BomLine, Vec<BomError>> {
        let mut errors = Vec::new();

        let component = products.get(&raw.component_id);
        if component.is_none() {
            errors.push(BomError::UnknownProduct(raw.component_id.clone()));
        }

        let quantity = match raw.quantity {
            None => {
                errors.push(BomError::MissingField("quantity"));
                None
            }
            Some(q) if q <= Decimal::ZERO => {
                errors.push(BomError::InvalidQuantity {
                    field: "quantity",
                    value: q,
                });
                None
            }
            Some(q) => Some(q),
        };

        let loss = raw.loss_percentage.unwrap_or(Decimal::ZERO);
        if loss.is_sign_negative() && !loss.is_zero() || loss >= ONE_HUNDRED {
            errors.push(BomError::InvalidQuantity {
                field: "loss_percentage",
                value: loss,
            });
        }

        let unit = match raw.unit.parse::<Unit>() {
            Ok(unit) => {
                if let Some(component) = component {
                    if !unit.is_compatible(component.base_unit) {
                        errors.push(BomError::IncompatibleUnits {
                            from: unit,
                            to: component.base_unit,
                        });
                    }
                }
                Some(unit)
            }
            Err(error) => {
                errors.push(error);
                None
            }
        };

        match (quantity, unit) {
            (Some(quantity), Some(unit)) if errors.is_empty() => {
                Ok(BomLine::new(raw.component_id.clone(), quantity, unit).with_loss(loss))
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn raw_product(id: &str, unit: &str, cost: Option<Decimal>) -> RawProduct {
        RawProduct {
            id: id.to_string(),
            name: id.to_string(),
            base_unit: unit.to_string(),
            is_composite: false,
            unit_cost: cost,
        }
    }

    fn raw_composite(id: &str, unit: &str) -> RawProduct {
        RawProduct {
            is_composite: true,
            ..raw_product(id, unit, None)
        }
    }

    fn raw_line(component: &str, qty: Decimal, unit: &str, loss: Option<Decimal>) -> RawBomLine {
        RawBomLine {
            component_id: component.to_string(),
            quantity: Some(qty),
            unit: unit.to_string(),
            loss_percentage: loss,
        }
    }

    fn raw_recipe(id: &str, output: Decimal, lines: Vec<RawBomLine>) -> RawRecipe {
        RawRecipe {
            output_product_id: id.to_string(),
            output_quantity: Some(output),
            output_unit: None,
            lines,
            markup_percentage: None,
        }
    }

    fn pizza_products() -> Vec<RawProduct> {
        vec![
            raw_product("DOUGH", "g", Some(dec!(0.02))),
            raw_product("CHEESE", "g", Some(dec!(0.08))),
            raw_product("OIL", "ml", Some(dec!(0.01))),
            raw_composite("PIZZA", "each"),
        ]
    }

    #[test]
    fn test_valid_catalog() {
        let recipes = vec![raw_recipe(
            "PIZZA",
            dec!(1),
            vec![
                raw_line("DOUGH", dec!(0.2), "kg", Some(dec!(5))),
                raw_line("CHEESE", dec!(100), "g", None),
            ],
        )];

        let (catalog, errors) = BomNormalizer::normalize(&pizza_products(), &recipes);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(catalog.len(), 4);

        let recipe = catalog.recipe("PIZZA").unwrap();
        assert_eq!(recipe.output_unit, Unit::Each);
        assert_eq!(recipe.lines.len(), 2);
        assert_eq!(recipe.lines[0].unit, Unit::Kilogram);
        assert_eq!(recipe.lines[0].loss_percentage, dec!(5));
        assert_eq!(recipe.lines[1].loss_percentage, Decimal::ZERO);
    }

    #[rstest]
    #[case(dec!(0), None, "quantity")]
    #[case(dec!(-5), None, "quantity")]
    #[case(dec!(10), Some(dec!(100)), "loss_percentage")]
    #[case(dec!(10), Some(dec!(-1)), "loss_percentage")]
    fn test_invalid_line_values(
        #[case] qty: Decimal,
        #[case] loss: Option<Decimal>,
        #[case] field: &str,
    ) {
        let recipes = vec![raw_recipe(
            "PIZZA",
            dec!(1),
            vec![raw_line("DOUGH", qty, "g", loss)],
        )];

        let (catalog, errors) = BomNormalizer::normalize(&pizza_products(), &recipes);
        assert!(catalog.recipe("PIZZA").is_none());
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0].error,
            BomError::InvalidQuantity { field: f, .. } if *f == field
        ));
        assert_eq!(
            errors[0].subject,
            crate::Subject::Recipe {
                product_id: "PIZZA".to_string(),
                line: Some(1)
            }
        );
    }

    #[test]
    fn test_invalid_output_quantity() {
        let recipes = vec![raw_recipe(
            "PIZZA",
            dec!(0),
            vec![raw_line("DOUGH", dec!(200), "g", None)],
        )];

        let (catalog, errors) = BomNormalizer::normalize(&pizza_products(), &recipes);
        assert!(catalog.recipe("PIZZA").is_none());
        assert!(matches!(
            errors[0].error,
            BomError::InvalidQuantity {
                field: "output_quantity",
                ..
            }
        ));
    }

    #[test]
    fn test_incompatible_line_unit() {
        // 油以毫升計，不能以克換算（不猜密度）
        let recipes = vec![raw_recipe(
            "PIZZA",
            dec!(1),
            vec![raw_line("OIL", dec!(10), "g", None)],
        )];

        let (_, errors) = BomNormalizer::normalize(&pizza_products(), &recipes);
        assert_eq!(
            errors[0].error,
            BomError::IncompatibleUnits {
                from: Unit::Gram,
                to: Unit::Milliliter
            }
        );
    }

    #[test]
    fn test_collects_all_errors() {
        let mut products = pizza_products();
        products.push(raw_product("BAD", "furlong", None));
        products.push(raw_product("DOUGH", "g", Some(dec!(0.03))));

        let recipes = vec![
            raw_recipe(
                "PIZZA",
                dec!(1),
                vec![
                    raw_line("GHOST", dec!(1), "g", None),
                    raw_line("CHEESE", dec!(-1), "bushel", None),
                ],
            ),
            raw_recipe("CHEESE", dec!(1), vec![]),
        ];

        let (_, errors) = BomNormalizer::normalize(&products, &recipes);
        let kinds: Vec<&BomError> = errors.iter().map(|e| &e.error).collect();

        assert!(kinds.contains(&&BomError::UnknownUnit("furlong".to_string())));
        assert!(kinds.contains(&&BomError::DuplicateProduct("DOUGH".to_string())));
        assert!(kinds.contains(&&BomError::UnknownProduct("GHOST".to_string())));
        assert!(kinds.contains(&&BomError::UnknownUnit("bushel".to_string())));
        assert!(kinds.contains(&&BomError::NotComposite("CHEESE".to_string())));
        assert!(kinds
            .iter()
            .any(|e| matches!(e, BomError::InvalidQuantity { field: "quantity", .. })));
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn test_cycle_rejected() {
        let products = vec![raw_composite("A", "each"), raw_composite("B", "each")];
        let recipes = vec![
            raw_recipe("A", dec!(1), vec![raw_line("B", dec!(1), "each", None)]),
            raw_recipe("B", dec!(1), vec![raw_line("A", dec!(1), "each", None)]),
        ];

        let (catalog, errors) = BomNormalizer::normalize(&products, &recipes);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].error,
            BomError::CyclicBom {
                path: vec!["A".to_string(), "B".to_string(), "A".to_string()]
            }
        );
        assert!(catalog.recipe("A").is_none());
        assert!(catalog.recipe("B").is_none());
        // 產品仍保留，查詢時各自失敗
        assert!(catalog.product("A").is_some());
    }

    #[test]
    fn test_cycle_propagates_to_upstream_products() {
        // ROOT → A ↔ B
        let products = vec![
            raw_product("SALT", "g", Some(dec!(0.001))),
            raw_composite("ROOT", "each"),
            raw_composite("A", "each"),
            raw_composite("B", "each"),
        ];
        let recipes = vec![
            raw_recipe(
                "ROOT",
                dec!(1),
                vec![
                    raw_line("A", dec!(1), "each", None),
                    raw_line("SALT", dec!(5), "g", None),
                ],
            ),
            raw_recipe("A", dec!(1), vec![raw_line("B", dec!(1), "each", None)]),
            raw_recipe("B", dec!(1), vec![raw_line("A", dec!(1), "each", None)]),
        ];

        let (catalog, errors) = BomNormalizer::normalize(&products, &recipes);
        let paths: Vec<&Vec<String>> = errors
            .iter()
            .filter_map(|e| match &e.error {
                BomError::CyclicBom { path } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(paths, vec![&vec!["A", "B", "A"], &vec!["ROOT", "A", "B", "A"]]);
        assert!(catalog.recipe("ROOT").is_none());

        // 查詢時回報循環，而不是缺少配方
        assert_eq!(
            catalog.missing_recipe_error("ROOT"),
            BomError::CyclicBom {
                path: vec![
                    "ROOT".to_string(),
                    "A".to_string(),
                    "B".to_string(),
                    "A".to_string()
                ]
            }
        );
        assert!(matches!(
            catalog.missing_recipe_error("B"),
            BomError::CyclicBom { .. }
        ));
    }

    #[test]
    fn test_cycle_through_rejected_recipe_still_reported() {
        // B 的損耗無效而被拒絕，A ↔ B 的循環仍在同一次正規化中回報
        let products = vec![raw_composite("A", "each"), raw_composite("B", "each")];
        let recipes = vec![
            raw_recipe("A", dec!(1), vec![raw_line("B", dec!(1), "each", None)]),
            raw_recipe(
                "B",
                dec!(1),
                vec![raw_line("A", dec!(1), "each", Some(dec!(150)))],
            ),
        ];

        let (catalog, errors) = BomNormalizer::normalize(&products, &recipes);
        let kinds: Vec<&BomError> = errors.iter().map(|e| &e.error).collect();

        assert!(kinds
            .iter()
            .any(|e| matches!(e, BomError::InvalidQuantity { field: "loss_percentage", .. })));
        assert!(kinds.iter().any(|e| matches!(e, BomError::CyclicBom { .. })));
        assert!(catalog.recipe("A").is_none());
    }

    #[rstest]
    #[case::line_quantity(dec!(1), raw_line("SAND", Decimal::from_i128_with_scale(10_i128.pow(26), 0), "kg", None))]
    #[case::output_quantity(Decimal::from_i128_with_scale(10_i128.pow(27), 0), raw_line("SAND", dec!(1), "g", None))]
    fn test_overflowing_record_is_rejected(#[case] output: Decimal, #[case] line: RawBomLine) {
        let products = vec![
            raw_product("SAND", "g", Some(dec!(0.0001))),
            raw_composite("BRICK", "g"),
        ];
        let mut recipe = raw_recipe("BRICK", output, vec![line]);
        recipe.output_unit = Some("kg".to_string());

        let (catalog, errors) = BomNormalizer::normalize(&products, &[recipe]);
        assert!(catalog.recipe("BRICK").is_none());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].error, BomError::Overflow(_)));
    }

    #[test]
    fn test_missing_recipe_reported() {
        let products = vec![raw_composite("SALAD", "each")];
        let (catalog, errors) = BomNormalizer::normalize(&products, &[]);
        assert_eq!(errors[0].error, BomError::MissingRecipe("SALAD".to_string()));
        assert!(catalog.product("SALAD").is_some());
    }

    #[test]
    fn test_zero_requirement_from_truncation() {
        // 1e-28 mg 換算為公斤後超出十進位精度，變為 0
        let products = vec![
            raw_product("SAFFRON", "kg", Some(dec!(5000))),
            raw_composite("RISOTTO", "each"),
        ];
        let recipes = vec![raw_recipe(
            "RISOTTO",
            dec!(1),
            vec![raw_line("SAFFRON", Decimal::new(1, 28), "mg", None)],
        )];

        let (catalog, errors) = BomNormalizer::normalize(&products, &recipes);
        assert!(catalog.recipe("RISOTTO").is_none());
        assert!(matches!(errors[0].error, BomError::ZeroRequirement { .. }));
    }

    #[test]
    fn test_output_unit_defaults_and_checks() {
        let mut recipe = raw_recipe(
            "PIZZA",
            dec!(1),
            vec![raw_line("DOUGH", dec!(200), "g", None)],
        );
        recipe.output_unit = Some("kg".to_string());

        let (_, errors) = BomNormalizer::normalize(&pizza_products(), &[recipe]);
        assert_eq!(
            errors[0].error,
            BomError::IncompatibleUnits {
                from: Unit::Kilogram,
                to: Unit::Each
            }
        );
    }

    #[test]
    fn test_from_json_records() {
        let products: Vec<RawProduct> = serde_json::from_str(
            r#"[
                { "code": "DOUGH", "uom": "g", "cost": 0.02 },
                { "code": "PIZZA", "uom": "pz", "composite": true }
            ]"#,
        )
        .unwrap();
        let recipes: Vec<RawRecipe> = serde_json::from_str(
            r#"[{ "product_id": "PIZZA", "yield": 2,
                  "ingredients": [{ "component": "DOUGH", "qty": "0.4", "uom": "kg", "k_evap": 5 }],
                  "markup": 10 }]"#,
        )
        .unwrap();

        let (catalog, errors) = BomNormalizer::normalize(&products, &recipes);
        assert!(errors.is_empty(), "{:?}", errors);
        let recipe = catalog.recipe("PIZZA").unwrap();
        assert_eq!(recipe.output_quantity, dec!(2));
        assert_eq!(recipe.markup_percentage, Some(dec!(10)));
        assert_eq!(catalog.product("DOUGH").unwrap().name, "DOUGH");
    }
}
