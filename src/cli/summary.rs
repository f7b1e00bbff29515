use crate::cli::ui;
use crate::core::valuation::ValuationReport;
use comfy_table::Cell;

/// Renders one valuation report as a table with totals underneath.
pub fn render_report(report: &ValuationReport) -> String {
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Qty"),
        ui::header_cell(&format!("Price ({})", report.currency)),
        ui::header_cell("Value"),
        ui::header_cell("Day"),
        ui::header_cell("Unrealized"),
        ui::header_cell("Realized"),
        ui::header_cell("Weight (%)"),
    ]);

    for position in &report.positions {
        let name = position
            .display_name
            .clone()
            .unwrap_or_else(|| position.symbol.clone());
        let symbol_cell = if position.error.is_some() {
            Cell::new(format!("{name} (!)"))
        } else if position.oversold {
            Cell::new(format!("{name} (oversold)"))
        } else {
            Cell::new(name)
        };

        table.add_row(vec![
            symbol_cell,
            ui::money_cell(position.quantity),
            ui::format_optional_cell(position.price, |p| format!("{p:.2}")),
            ui::format_optional_cell(position.value, |v| format!("{v:.2}")),
            ui::format_optional_cell(position.day_change, |c| format!("{c:+.2}")),
            ui::format_optional_cell(position.unrealized, |u| format!("{u:+.2}")),
            ui::signed_money_cell(position.realized),
            ui::format_optional_cell(position.weight, |w| format!("{w:.2}%")),
        ]);
    }

    let mut output = format!(
        "Portfolio: {}\n\n{}",
        ui::style_text(&report.name, ui::StyleType::Title),
        table
    );

    output.push_str(&format!(
        "\n\nTotal Value ({}): {}   Day: {}   Gain: {}   Cash: {}",
        ui::style_text(&report.currency, ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:.2}", report.total_value), ui::StyleType::TotalValue),
        ui::style_text(
            &format!("{:+.2} ({:+.2}%)", report.day_change, report.day_change_pct),
            ui::StyleType::TotalLabel
        ),
        ui::style_text(&format!("{:+.2}", report.total_gain), ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:.2}", report.cash_total), ui::StyleType::TotalLabel),
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::valuation::PositionValue;

    fn report() -> ValuationReport {
        ValuationReport {
            name: "Growth".to_string(),
            currency: "USD".to_string(),
            total_value: 1500.0,
            day_change: 20.0,
            day_change_pct: 1.35,
            total_gain: 500.0,
            cash_total: 100.0,
            positions: vec![PositionValue {
                symbol: "AAPL".to_string(),
                display_name: Some("Apple Inc.".to_string()),
                quantity: 10.0,
                native_currency: "USD".to_string(),
                native_price: Some(150.0),
                price: Some(150.0),
                value: Some(1500.0),
                day_change: Some(20.0),
                realized: 0.0,
                unrealized: Some(500.0),
                weight: Some(100.0),
                oversold: false,
                error: None,
            }],
        }
    }

    #[test]
    fn test_render_contains_positions_and_totals() {
        let rendered = render_report(&report());
        assert!(rendered.contains("Apple Inc."));
        assert!(rendered.contains("1500.00"));
        assert!(rendered.contains("Growth"));
        assert!(rendered.contains("+20.00"));
    }

    #[test]
    fn test_render_marks_degraded_rows() {
        let mut report = report();
        report.positions[0].error = Some("No quote available for AAPL".to_string());
        report.positions[0].value = None;

        let rendered = render_report(&report);
        assert!(rendered.contains("(!)"));
        assert!(rendered.contains("N/A"));
    }
}
