//! Symbol-suffix to currency inference.
//!
//! Quote feeds report prices in the listing venue's currency, but holdings
//! imported without explicit metadata only carry a symbol. The table below
//! maps venue suffixes to currencies; first match wins, and an unmatched
//! symbol resolves to USD so the lookup is total.

/// Ordered (suffix, currency) pairs. Crypto pairs like `BTC-USD` are listed
/// before exchange suffixes so the quote currency in the pair wins.
const SUFFIX_CURRENCIES: &[(&str, &str)] = &[
    ("-USD", "USD"),
    ("-EUR", "EUR"),
    ("-GBP", "GBP"),
    (".L", "GBP"),
    (".HK", "HKD"),
    (".T", "JPY"),
    (".TO", "CAD"),
    (".V", "CAD"),
    (".AX", "AUD"),
    (".NZ", "NZD"),
    (".SI", "SGD"),
    (".NS", "INR"),
    (".BO", "INR"),
    (".DE", "EUR"),
    (".F", "EUR"),
    (".PA", "EUR"),
    (".AS", "EUR"),
    (".BR", "EUR"),
    (".MC", "EUR"),
    (".MI", "EUR"),
    (".SW", "CHF"),
    (".ST", "SEK"),
    (".OL", "NOK"),
    (".CO", "DKK"),
    (".KS", "KRW"),
    (".KQ", "KRW"),
    (".SS", "CNY"),
    (".SZ", "CNY"),
    (".TW", "TWD"),
    (".SA", "BRL"),
    (".MX", "MXN"),
    (".JO", "ZAR"),
];

pub const DEFAULT_CURRENCY: &str = "USD";

/// Resolves the quote currency for a symbol. Always resolves; symbols with
/// no recognized suffix default to USD.
pub fn currency_for_symbol(symbol: &str) -> &'static str {
    SUFFIX_CURRENCIES
        .iter()
        .find(|(suffix, _)| symbol.ends_with(suffix))
        .map(|(_, currency)| *currency)
        .unwrap_or(DEFAULT_CURRENCY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_entry_resolves() {
        for (suffix, currency) in SUFFIX_CURRENCIES {
            let symbol = format!("TEST{suffix}");
            assert_eq!(
                currency_for_symbol(&symbol),
                *currency,
                "suffix {suffix} should resolve to {currency}"
            );
        }
    }

    #[test]
    fn test_unmatched_symbol_defaults_to_usd() {
        assert_eq!(currency_for_symbol("AAPL"), "USD");
        assert_eq!(currency_for_symbol(""), "USD");
        assert_eq!(currency_for_symbol("BRK.B"), "USD");
    }

    #[test]
    fn test_crypto_pair_wins_over_exchange_suffix() {
        // Ends with both "-USD" and no exchange suffix; pair must win.
        assert_eq!(currency_for_symbol("BTC-USD"), "USD");
        assert_eq!(currency_for_symbol("ETH-EUR"), "EUR");
    }

    #[test]
    fn test_known_venues() {
        assert_eq!(currency_for_symbol("SHEL.L"), "GBP");
        assert_eq!(currency_for_symbol("0700.HK"), "HKD");
        assert_eq!(currency_for_symbol("7203.T"), "JPY");
        assert_eq!(currency_for_symbol("RY.TO"), "CAD");
        assert_eq!(currency_for_symbol("D05.SI"), "SGD");
    }
}
