use cardpivot::categorizer::Categorizer;
use cardpivot::error::Result;
use cardpivot::settings::load_settings;
use colored::Colorize;
use comfy_table::{Cell, Table};

pub fn list() -> Result<()> {
    let rules = load_settings().rule_table()?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Pattern", "Type", "Category", "Merchant", "Priority"]);
    for (i, rule) in rules.rules().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&rule.pattern),
            Cell::new(rule.match_type.key()),
            Cell::new(&rule.category),
            Cell::new(rule.merchant.as_deref().unwrap_or("")),
            Cell::new(rule.priority),
        ]);
    }
    println!("Rules (first match wins)\n{table}");
    println!("{} rules", rules.len());
    Ok(())
}

pub fn test(description: &str) -> Result<()> {
    let rules = load_settings().rule_table()?;
    let c = Categorizer::new(&rules).classify(description);

    let category = if c.matched {
        c.category.green().bold()
    } else {
        c.category.yellow().bold()
    };
    println!("{description} \u{2192} {category} ({})", c.merchant);
    match rules.find(description) {
        Some(rule) => println!(
            "  matched {} rule '{}' (priority {})",
            rule.match_type.key(),
            rule.pattern,
            rule.priority
        ),
        None => println!("  no rule matched"),
    }
    Ok(())
}
