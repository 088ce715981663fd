//! # 虛擬庫存範例
//!
//! 從庫存帳本取得快照，計算每道披薩以現有庫存還能做幾份，
//! 並示範快照在帳本後續異動時保持不變。
//!
//! 執行：`cargo run --example virtual_stock`

use anyhow::Context;
use bom::*;
use tracing_subscriber::EnvFilter;

const PRODUCTS: &str = include_str!("data/products.json");
const RECIPES: &str = include_str!("data/recipes.json");
const STOCK: &str = include_str!("data/stock.json");

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn print_availability(result: &AvailabilityResult) {
    let shown = match result.virtual_available.whole_units(result.unit) {
        Availability::Unbounded => "不受限".to_string(),
        Availability::Limited(quantity) => format!("{} {}", quantity, result.unit),
    };
    let limiting: Vec<&str> = result
        .limiting_lines
        .iter()
        .map(|line| line.component_id.as_str())
        .collect();
    println!(
        "    {:<12} {:>10}   瓶頸: {}",
        result.product_id,
        shown,
        limiting.join(", ")
    );
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    println!("===== 虛擬庫存範例 =====");
    println!();

    // ========== 1. 目錄與帳本 ==========
    println!("[1] 建立目錄與庫存帳本");
    let products: Vec<RawProduct> = serde_json::from_str(PRODUCTS).context("產品記錄格式錯誤")?;
    let recipes: Vec<RawRecipe> = serde_json::from_str(RECIPES).context("配方記錄格式錯誤")?;
    let (catalog, errors) = normalize(&products, &recipes);
    println!("    有效產品 {} 項，驗證錯誤 {} 筆", catalog.len(), errors.len());

    let ledger = StockLedger::new();
    let entries: Vec<StockEntry> = serde_json::from_str(STOCK).context("庫存記錄格式錯誤")?;
    for entry in entries {
        ledger.record(entry)?;
    }
    println!("    庫存記錄 {} 筆", ledger.len());
    println!();

    // ========== 2. 全倉快照 ==========
    println!("[2] 全倉可生產量");
    let config = EngineConfig::default();
    let snapshot = ledger.snapshot(None)?;
    println!("    快照 {} @ {}", snapshot.id(), snapshot.taken_at().format("%Y-%m-%d %H:%M:%S"));

    let calculator = AvailabilityCalculator::new(&catalog, &snapshot, &config);
    for (product_id, result) in calculator.availability_all(None) {
        match result {
            Ok(result) => print_availability(&result),
            Err(e) => println!("    {:<12} 失敗：{}", product_id, e),
        }
    }
    println!();

    // ========== 3. 單一倉庫 ==========
    println!("[3] 僅廚房倉");
    let kitchen = WarehouseFilter::single("KITCHEN");
    let margherita = calculator.availability("MARGHERITA", Some(&kitchen))?;
    print_availability(&margherita);
    for line in &margherita.lines {
        println!(
            "      {:<12} 需求 {:>8} 現有 {:>8} 可做 {:>8}",
            line.component_id,
            line.required_per_output_unit.round_dp(4),
            line.on_hand.round_dp(4),
            line.line_capacity.round_dp(2),
        );
    }
    println!();

    // ========== 4. 快照一致性 ==========
    println!("[4] 帳本異動後舊快照不變");
    ledger.set_quantity("MOZZARELLA", "KITCHEN", Decimal::ZERO)?;
    ledger.set_quantity("MOZZARELLA", "COLD_ROOM", Decimal::ZERO)?;

    let before = calculator.availability("PROSCIUTTO", None)?;
    let fresh = ledger.snapshot(None)?;
    let after = AvailabilityCalculator::new(&catalog, &fresh, &config).availability("PROSCIUTTO", None)?;
    print!("    舊快照");
    print_availability(&before);
    print!("    新快照");
    print_availability(&after);

    Ok(())
}
