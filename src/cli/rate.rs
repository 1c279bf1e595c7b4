use super::ui;
use crate::core::{RateError, RateQuote, RateResolver};
use anyhow::Result;
use chrono::DateTime;
use comfy_table::Cell;

impl RateQuote {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Base"),
            ui::header_cell("Target"),
            ui::header_cell("Rate"),
            ui::header_cell("Updated (UTC)"),
        ]);

        let updated = DateTime::from_timestamp(self.updated_at, 0)
            .map_or("N/A".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());

        table.add_row(vec![
            Cell::new(self.base.as_str()),
            Cell::new(self.target.as_str()),
            ui::rate_cell(self.rate),
            Cell::new(updated),
        ]);

        format!(
            "1 {} = {} {}\n\n{table}",
            ui::style_text(self.base.as_str(), ui::StyleType::TotalLabel),
            ui::style_text(&format!("{:.2}", self.rate), ui::StyleType::TotalValue),
            ui::style_text(self.target.as_str(), ui::StyleType::TotalLabel),
        )
    }
}

/// User facing message for a failed lookup.
pub fn describe_error(error: &RateError) -> String {
    if error.is_not_found() {
        format!("Unsupported currency: {error}")
    } else {
        format!("Rate lookup failed: {error}")
    }
}

/// Resolves one pair and prints it.
pub async fn run(resolver: &RateResolver, base: &str, target: &str) -> Result<()> {
    match resolver.resolve(base, target).await {
        Ok(quote) => {
            println!("{}", quote.display_as_table());
            Ok(())
        }
        Err(e) => {
            let message = describe_error(&e);
            eprintln!("{}", ui::style_text(&message, ui::StyleType::Error));
            if e.is_not_found() {
                eprintln!(
                    "{}",
                    ui::style_text(
                        "Run `ratekeeper sync` to refresh the stored rates.",
                        ui::StyleType::Subtle
                    )
                );
            }
            Err(anyhow::Error::new(e).context(format!("Failed to resolve {base} to {target}")))
        }
    }
}
