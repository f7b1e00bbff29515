use crate::cli::ui;
use crate::core::history::NetWorthPoint;
use comfy_table::Cell;

/// Renders a bucketed net-worth series, oldest first, with the change since
/// the previous point in the last column.
pub fn render_series(series: &[NetWorthPoint], currency: &str) -> String {
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Cash"),
        ui::header_cell("Investments"),
        ui::header_cell("Debt"),
        ui::header_cell(&format!("Net Worth ({currency})")),
        ui::header_cell("Change"),
    ]);

    let mut previous_net: Option<f64> = None;
    for point in series {
        let label = point
            .label
            .clone()
            .unwrap_or_else(|| point.date.to_string());
        let net = point.net();

        let change_cell = match previous_net {
            Some(prev) => ui::signed_money_cell(net - prev),
            None => Cell::new(""),
        };
        previous_net = Some(net);

        table.add_row(vec![
            Cell::new(label),
            ui::money_cell(point.cash),
            ui::money_cell(point.investments),
            ui::money_cell(point.debt),
            ui::money_cell(net),
            change_cell,
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, cash: f64, investments: f64, debt: f64) -> NetWorthPoint {
        NetWorthPoint {
            date: date.parse().unwrap(),
            cash,
            investments,
            debt,
            label: Some("test".to_string()),
        }
    }

    #[test]
    fn test_render_shows_net_and_change() {
        let series = vec![
            point("2024-05-09", 100.0, 1000.0, 50.0),
            point("2024-05-10", 100.0, 1100.0, 50.0),
        ];
        let rendered = render_series(&series, "USD");

        assert!(rendered.contains("1050.00"));
        assert!(rendered.contains("1150.00"));
        assert!(rendered.contains("+100.00"));
    }

    #[test]
    fn test_render_empty_series() {
        let rendered = render_series(&[], "USD");
        assert!(rendered.contains("Net Worth (USD)"));
    }
}
