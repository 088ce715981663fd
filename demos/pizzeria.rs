//! # 披薩店成本展開範例
//!
//! 這個範例展示完整的成本計算流程：
//! - 載入產品/配方原始記錄（欄位名稱不一致的 JSON）
//! - 正規化並列出驗證錯誤
//! - 並行展開所有組合產品成本
//! - 列出單一產品的成本明細
//!
//! 執行：`RUST_LOG=debug cargo run --example pizzeria`

use anyhow::Context;
use bom::*;
use tracing_subscriber::EnvFilter;

const PRODUCTS: &str = include_str!("data/products.json");
const RECIPES: &str = include_str!("data/recipes.json");

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    println!("===== 披薩店成本展開範例 =====");
    println!();

    // ========== 1. 載入原始記錄 ==========
    println!("[1] 載入原始記錄");
    let products: Vec<RawProduct> = serde_json::from_str(PRODUCTS).context("產品記錄格式錯誤")?;
    let recipes: Vec<RawRecipe> = serde_json::from_str(RECIPES).context("配方記錄格式錯誤")?;
    println!("    產品 {} 筆，配方 {} 筆", products.len(), recipes.len());
    println!();

    // ========== 2. 正規化 ==========
    println!("[2] 正規化");
    let (catalog, errors) = normalize(&products, &recipes);
    println!("    有效產品 {} 項", catalog.len());
    if errors.is_empty() {
        println!("    無驗證錯誤");
    } else {
        for error in &errors {
            println!("    ⚠ {}", error);
        }
    }
    println!();

    // ========== 3. 成本展開 ==========
    println!("[3] 成本展開（每基本單位，四捨五入至小數 4 位）");
    let config = EngineConfig::default().with_cost_scale(4);
    let calculator = CostCalculator::new(&catalog, &config);

    for (product_id, result) in calculator.cost_all() {
        match result {
            Ok(cost) => {
                let flag = if cost.is_complete() { "" } else { " (缺少單價)" };
                println!(
                    "    {:<12} {:>10} / {}{}",
                    product_id, cost.unit_cost, cost.per_unit, flag
                );
            }
            Err(e) => println!("    {:<12} 失敗：{}", product_id, e),
        }
    }
    println!();

    // ========== 4. 成本明細 ==========
    println!("[4] MARGHERITA 成本明細");
    let margherita = calculator.cost("MARGHERITA")?;
    println!(
        "    {:<12} {:>10} {:>10} {:>10} {:>10}",
        "元件", "用量", "含損耗", "單價", "小計"
    );
    for line in &margherita.breakdown {
        println!(
            "    {:<12} {:>10} {:>10} {:>10} {:>10}",
            line.component_id,
            line.quantity.round_dp(3),
            line.loss_adjusted_quantity.round_dp(3),
            line.component_unit_cost.round_dp(4),
            line.line_cost.round_dp(4),
        );
    }
    println!("    加成前: {}", margherita.cost_before_markup.round_dp(4));
    if let Some(markup) = margherita.markup_percentage {
        println!("    加成: {}%", markup);
    }
    println!("    售價成本: {}", margherita.unit_cost);
    println!();

    println!("[5] JSON 輸出");
    println!("{}", serde_json::to_string_pretty(&margherita)?);

    Ok(())
}
