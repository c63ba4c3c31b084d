//! MRP-style component check (spec §4.9 "Component check (MRP)").

use super::workbook::{BomRow, OrderRow, StockSnapshotRow};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct ComponentCheckRow {
    pub order_id: String,
    pub component_code: String,
    pub required: f64,
    pub available: f64,
    pub shortfall: f64,
    pub feasible: bool,
}

/// Explodes the BOM for every order against the stock snapshot. Stock is
/// allocated greedily in due-date order, ties broken by priority then
/// `order_id` (spec §4.9).
pub fn check_components(
    orders: &[OrderRow],
    bom: &[BomRow],
    stock: &[StockSnapshotRow],
) -> Vec<ComponentCheckRow> {
    let mut ordered: Vec<&OrderRow> = orders.iter().collect();
    ordered.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then(b.priority.cmp(&a.priority))
            .then(a.order_id.cmp(&b.order_id))
    });

    let mut remaining_stock: HashMap<&str, f64> = stock
        .iter()
        .map(|s| (s.component_code.as_str(), s.on_hand))
        .collect();

    let mut rows = Vec::new();
    for order in ordered {
        let components: Vec<&BomRow> = bom
            .iter()
            .filter(|b| b.product_code == order.product_code)
            .collect();
        for component in components {
            let required = component.qty_per_unit * order.qty as f64;
            let on_hand = remaining_stock
                .get(component.component_code.as_str())
                .copied()
                .unwrap_or(0.0);
            let allocated = required.min(on_hand.max(0.0));
            let shortfall = (required - on_hand).max(0.0);
            remaining_stock.insert(component.component_code.as_str(), on_hand - allocated);
            rows.push(ComponentCheckRow {
                order_id: order.order_id.clone(),
                component_code: component.component_code.clone(),
                required,
                available: on_hand,
                shortfall,
                feasible: shortfall == 0.0,
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn shortfall_zero_when_stock_sufficient() {
        let orders = vec![OrderRow {
            order_id: "O1".into(),
            product_code: "P1".into(),
            qty: 10,
            due_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            priority: 1,
        }];
        let bom = vec![BomRow {
            product_code: "P1".into(),
            component_code: "C1".into(),
            qty_per_unit: 2.0,
        }];
        let stock = vec![StockSnapshotRow {
            component_code: "C1".into(),
            on_hand: 30.0,
            as_of_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        }];
        let rows = check_components(&orders, &bom, &stock);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].feasible);
        assert_eq!(rows[0].shortfall, 0.0);
    }

    #[test]
    fn shortfall_reported_when_stock_insufficient() {
        let orders = vec![OrderRow {
            order_id: "O1".into(),
            product_code: "P1".into(),
            qty: 10,
            due_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            priority: 1,
        }];
        let bom = vec![BomRow {
            product_code: "P1".into(),
            component_code: "C1".into(),
            qty_per_unit: 2.0,
        }];
        let stock = vec![StockSnapshotRow {
            component_code: "C1".into(),
            on_hand: 5.0,
            as_of_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        }];
        let rows = check_components(&orders, &bom, &stock);
        assert_eq!(rows[0].shortfall, 15.0);
        assert!(!rows[0].feasible);
    }
}
