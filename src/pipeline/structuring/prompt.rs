/// Instruction sent with every page image.
///
/// Field names mirror the canonical schema so a well-behaved model needs no
/// mapping beyond validation.
pub const STATEMENT_INSTRUCTION: &str = r#"You are reading one page of a bank portfolio statement.
Extract the data on THIS page only and answer with a single JSON object inside a ```json block.

Schema (omit or use null for anything not printed on the page):
{
  "summary": {
    "client_id": string,
    "client_name": string,
    "bank_name": string,
    "statement_date": "DD.MM.YYYY",
    "currency": "ISO 4217 code of the reference currency",
    "total_portfolio_value": number,
    "ytd_performance_pct": number,
    "ytd_gain_loss": number
  },
  "holdings": [
    {
      "isin": "12-character ISIN",
      "security_name": string,
      "quantity": number,
      "price": number,
      "market_value": number,
      "currency": "ISO 4217 code",
      "asset_class": "BOND | STRUCTURED_PRODUCT | EQUITY | CASH | OTHER",
      "percentage": number,
      "maturity_date": "DD.MM.YYYY"
    }
  ],
  "asset_allocation": {
    "bonds": number, "structured_products": number, "equities": number,
    "cash": number, "other": number, "alternatives": number
  }
}

Rules:
- Numbers are plain JSON numbers without thousands separators.
- Percentages are numbers between 0 and 100 without the % sign.
- Copy ISINs and dates exactly as printed. Never invent values."#;

/// Page-specific instruction: the shared schema plus the page position.
pub fn build_page_instruction(page_number: usize, page_count: usize) -> String {
    format!("{STATEMENT_INSTRUCTION}\n\nThis is page {page_number} of {page_count}.")
}
