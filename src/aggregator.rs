use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::{DateRange, Transaction};

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Category x month pivot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub category: String,
    /// One cell per entry of [`CategoryMonthPivot::months`].
    pub cells: Vec<Decimal>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryMonthPivot {
    /// `YYYY-MM`, ascending.
    pub months: Vec<String>,
    pub rows: Vec<PivotRow>,
    pub month_totals: Vec<Decimal>,
    pub grand_total: Decimal,
}

impl CategoryMonthPivot {
    pub fn cell(&self, category: &str, month: &str) -> Decimal {
        let Some(col) = self.months.iter().position(|m| m == month) else {
            return Decimal::ZERO;
        };
        self.rows
            .iter()
            .find(|r| r.category == category)
            .map(|r| r.cells[col])
            .unwrap_or(Decimal::ZERO)
    }

    pub fn row_total(&self, category: &str) -> Decimal {
        self.rows
            .iter()
            .find(|r| r.category == category)
            .map(|r| r.total)
            .unwrap_or(Decimal::ZERO)
    }
}

pub fn category_month_pivot(txns: &[&Transaction]) -> CategoryMonthPivot {
    let months: Vec<String> = txns
        .iter()
        .map(|t| t.month())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut by_category: BTreeMap<&str, Vec<Decimal>> = BTreeMap::new();
    for t in txns {
        let col = months.iter().position(|m| *m == t.month()).unwrap_or(0);
        let cells = by_category
            .entry(t.category_name())
            .or_insert_with(|| vec![Decimal::ZERO; months.len()]);
        cells[col] += t.amount;
    }

    let rows: Vec<PivotRow> = by_category
        .into_iter()
        .map(|(category, cells)| PivotRow {
            category: category.to_string(),
            total: cells.iter().sum(),
            cells,
        })
        .collect();

    let month_totals: Vec<Decimal> = (0..months.len())
        .map(|i| rows.iter().map(|r| r.cells[i]).sum())
        .collect();
    let grand_total = month_totals.iter().sum();

    CategoryMonthPivot {
        months,
        rows,
        month_totals,
        grand_total,
    }
}

// ---------------------------------------------------------------------------
// Group-by views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantItem {
    pub category: String,
    pub merchant: String,
    pub count: usize,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardItem {
    pub source_card: String,
    pub count: usize,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: usize,
    pub total: Decimal,
    /// Percent of the grand total, two decimals.
    pub pct: Decimal,
}

/// Merchants within each category: categories A-Z, biggest merchant first.
pub fn merchant_breakdown(txns: &[&Transaction]) -> Vec<MerchantItem> {
    let mut groups: BTreeMap<(&str, &str), (usize, Decimal)> = BTreeMap::new();
    for t in txns {
        let entry = groups
            .entry((t.category_name(), t.merchant_name()))
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += t.amount;
    }
    let mut items: Vec<MerchantItem> = groups
        .into_iter()
        .map(|((category, merchant), (count, total))| MerchantItem {
            category: category.to_string(),
            merchant: merchant.to_string(),
            count,
            total,
        })
        .collect();
    items.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then(b.total.cmp(&a.total))
            .then(a.merchant.cmp(&b.merchant))
    });
    items
}

pub fn card_breakdown(txns: &[&Transaction]) -> Vec<CardItem> {
    let mut groups: BTreeMap<&str, (usize, Decimal)> = BTreeMap::new();
    for t in txns {
        let entry = groups.entry(t.source_card.as_str()).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += t.amount;
    }
    groups
        .into_iter()
        .map(|(card, (count, total))| CardItem {
            source_card: card.to_string(),
            count,
            total,
        })
        .collect()
}

pub fn category_shares(txns: &[&Transaction]) -> Vec<CategoryShare> {
    let mut groups: BTreeMap<&str, (usize, Decimal)> = BTreeMap::new();
    for t in txns {
        let entry = groups.entry(t.category_name()).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += t.amount;
    }
    let grand: Decimal = groups.values().map(|(_, total)| *total).sum();
    let mut shares: Vec<CategoryShare> = groups
        .into_iter()
        .map(|(category, (count, total))| {
            let pct = total
                .checked_mul(Decimal::ONE_HUNDRED)
                .and_then(|scaled| scaled.checked_div(grand))
                .map(round_money)
                .unwrap_or(Decimal::ZERO);
            CategoryShare {
                category: category.to_string(),
                count,
                total,
                pct,
            }
        })
        .collect();
    shares.sort_by(|a, b| b.total.cmp(&a.total).then(a.category.cmp(&b.category)));
    shares
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub total: Decimal,
    pub average: Decimal,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

pub fn summarize(txns: &[&Transaction]) -> Summary {
    let count = txns.len();
    let total: Decimal = txns.iter().map(|t| t.amount).sum();
    let average = if count == 0 {
        Decimal::ZERO
    } else {
        round_money(total / Decimal::from(count))
    };
    Summary {
        count,
        total,
        average,
        first_date: txns.iter().map(|t| t.date).min(),
        last_date: txns.iter().map(|t| t.date).max(),
    }
}

// ---------------------------------------------------------------------------
// All views at once
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateView {
    pub range: DateRange,
    pub summary: Summary,
    pub pivot: CategoryMonthPivot,
    pub merchants: Vec<MerchantItem>,
    pub cards: Vec<CardItem>,
    pub categories: Vec<CategoryShare>,
}

impl AggregateView {
    pub fn is_empty(&self) -> bool {
        self.summary.count == 0
    }
}

pub fn filter_range<'a>(txns: &'a [Transaction], range: &DateRange) -> Vec<&'a Transaction> {
    txns.iter().filter(|t| range.contains(t.date)).collect()
}

/// Recompute every view over the transactions inside `range`.
pub fn aggregate(txns: &[Transaction], range: &DateRange) -> AggregateView {
    let selected = filter_range(txns, range);
    AggregateView {
        range: *range,
        summary: summarize(&selected),
        pivot: category_month_pivot(&selected),
        merchants: merchant_breakdown(&selected),
        cards: card_breakdown(&selected),
        categories: category_shares(&selected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNCATEGORIZED;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(date: NaiveDate, amount: &str, category: &str, merchant: &str, card: &str) -> Transaction {
        Transaction::new(date, dec(amount), merchant, card).classified(category, merchant)
    }

    fn sample() -> Vec<Transaction> {
        vec![
            txn(day(2024, 1, 5), "12.50", "Dining", "Starbucks", "Chase"),
            txn(day(2024, 1, 20), "45.99", "Shopping", "Amazon", "American Express"),
            txn(day(2024, 2, 2), "7.50", "Dining", "Starbucks", "Chase"),
            txn(day(2024, 2, 14), "60.00", "Dining", "Bistro Luna", "American Express"),
            txn(day(2024, 2, 28), "-20.00", "Shopping", "Amazon", "American Express"),
            txn(day(2024, 3, 1), "99.00", UNCATEGORIZED, "Xyz Unknown Corp", "Chase"),
        ]
    }

    #[test]
    fn test_pivot_layout_and_totals() {
        let txns = sample();
        let view = aggregate(&txns, &DateRange::all());
        let pivot = &view.pivot;
        assert_eq!(pivot.months, vec!["2024-01", "2024-02", "2024-03"]);
        let categories: Vec<&str> = pivot.rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["Dining", "Shopping", UNCATEGORIZED]);
        assert_eq!(pivot.cell("Dining", "2024-02"), dec("67.50"));
        assert_eq!(pivot.cell("Shopping", "2024-03"), Decimal::ZERO);
        assert_eq!(pivot.row_total("Dining"), dec("80.00"));
        assert_eq!(pivot.month_totals, vec![dec("58.49"), dec("47.50"), dec("99.00")]);
        assert_eq!(pivot.grand_total, dec("204.99"));
    }

    #[test]
    fn test_category_sums_match_members() {
        let txns = sample();
        let range = DateRange::new(day(2024, 1, 10), day(2024, 2, 20));
        let view = aggregate(&txns, &range);
        for row in &view.pivot.rows {
            let members: Decimal = txns
                .iter()
                .filter(|t| range.contains(t.date) && t.category_name() == row.category)
                .map(|t| t.amount)
                .sum();
            assert_eq!(row.total, members, "{}", row.category);
        }
        assert_eq!(view.summary.count, 3);
    }

    #[test]
    fn test_uncategorized_counts_in_sums() {
        let txns = sample();
        let view = aggregate(&txns, &DateRange::all());
        let share = view.categories.iter().find(|s| s.category == UNCATEGORIZED).unwrap();
        assert_eq!(share.total, dec("99.00"));
        assert_eq!(share.count, 1);
    }

    #[test]
    fn test_merchant_and_card_breakdowns() {
        let txns = sample();
        let view = aggregate(&txns, &DateRange::all());
        let dining: Vec<(&str, usize)> = view
            .merchants
            .iter()
            .filter(|m| m.category == "Dining")
            .map(|m| (m.merchant.as_str(), m.count))
            .collect();
        assert_eq!(dining, vec![("Bistro Luna", 1), ("Starbucks", 2)]);

        assert_eq!(view.cards.len(), 2);
        assert_eq!(view.cards[0].source_card, "American Express");
        assert_eq!(view.cards[0].total, dec("85.99"));
        assert_eq!(view.cards[1].count, 3);
    }

    #[test]
    fn test_category_share_pct() {
        let a = txn(day(2024, 1, 1), "75", "Dining", "A", "Chase");
        let b = txn(day(2024, 1, 2), "25", "Travel", "B", "Chase");
        let shares = category_shares(&[&a, &b]);
        assert_eq!(shares[0].category, "Dining");
        assert_eq!(shares[0].pct, dec("75"));
        assert_eq!(shares[1].pct, dec("25"));
    }

    #[test]
    fn test_category_share_pct_never_overflows() {
        let huge = Transaction::new(day(2024, 1, 1), Decimal::MAX, "HUGE", "Chase")
            .classified("Travel", "Huge");
        let shares = category_shares(&[&huge]);
        assert_eq!(shares[0].total, Decimal::MAX);
        assert_eq!(shares[0].pct, Decimal::ZERO);
    }

    #[test]
    fn test_summary() {
        let txns = sample();
        let view = aggregate(&txns, &DateRange::all());
        assert_eq!(view.summary.count, 6);
        assert_eq!(view.summary.total, dec("204.99"));
        assert_eq!(view.summary.average, dec("34.17"));
        assert_eq!(view.summary.first_date, Some(day(2024, 1, 5)));
        assert_eq!(view.summary.last_date, Some(day(2024, 3, 1)));
    }

    #[test]
    fn test_empty_range_gives_empty_views() {
        let txns = sample();
        let view = aggregate(&txns, &DateRange::new(day(2023, 1, 1), day(2023, 12, 31)));
        assert!(view.is_empty());
        assert!(view.pivot.rows.is_empty());
        assert!(view.pivot.months.is_empty());
        assert_eq!(view.pivot.grand_total, Decimal::ZERO);
        assert!(view.merchants.is_empty());
        assert!(view.cards.is_empty());
        assert!(view.categories.is_empty());
        assert_eq!(view.summary.average, Decimal::ZERO);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let txns = sample();
        let view = aggregate(&txns, &DateRange::new(day(2024, 3, 1), day(2024, 1, 1)));
        assert!(view.is_empty());
    }
}
