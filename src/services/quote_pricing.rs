use crate::errors::ServiceError;
use crate::models::numeric::{is_negative, non_negative, plus, product, total};
use crate::models::{Quote, QuoteLineItem};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub discounted_subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

fn percent_fraction(percent: Option<Decimal>) -> Decimal {
    non_negative(percent).min(Decimal::ONE_HUNDRED) / Decimal::ONE_HUNDRED
}

/// `quantity × unit_price × (1 − discount_percent/100)`.
pub fn price_quote_line(line: &QuoteLineItem) -> Decimal {
    product(
        product(non_negative(line.quantity), non_negative(line.unit_price)),
        Decimal::ONE - percent_fraction(line.discount_percent),
    )
}

/// Quote-level discount and tax applied to a subtotal. `tax_rate` is a fraction (0.08 = 8%).
pub fn quote_totals(subtotal: Decimal, discount_percent: Decimal, tax_rate: Decimal) -> QuoteTotals {
    let discount_amount = product(subtotal, percent_fraction(Some(discount_percent)));
    let discounted_subtotal = subtotal - discount_amount;
    let tax_amount = product(discounted_subtotal, non_negative(Some(tax_rate)));
    QuoteTotals {
        subtotal,
        discount_amount,
        discounted_subtotal,
        tax_amount,
        total_amount: plus(discounted_subtotal, tax_amount),
    }
}

/// Prices every line of a quote and the quote-level adjustments.
///
/// Fails with a validation error, without pricing anything, when a line or an
/// adjustment is out of range.
pub fn price_quote(quote: &Quote) -> Result<QuoteTotals, ServiceError> {
    check_adjustments(quote.discount_percent, quote.tax_rate)?;
    quote.all_lines().try_for_each(QuoteLineItem::check)?;

    let subtotal = total(quote.all_lines().map(price_quote_line));
    Ok(quote_totals(
        subtotal,
        non_negative(quote.discount_percent),
        non_negative(quote.tax_rate),
    ))
}

pub fn check_adjustments(
    discount_percent: Option<Decimal>,
    tax_rate: Option<Decimal>,
) -> Result<(), ServiceError> {
    if is_negative(discount_percent) || non_negative(discount_percent) > Decimal::ONE_HUNDRED {
        return Err(ServiceError::ValidationError(
            "discount_percent must be between 0 and 100".into(),
        ));
    }
    if is_negative(tax_rate) || non_negative(tax_rate) > Decimal::ONE {
        return Err(ServiceError::ValidationError(
            "tax_rate must be a fraction between 0 and 1".into(),
        ));
    }
    Ok(())
}

impl Quote {
    /// Recomputes every line total and the quote totals in place.
    pub fn reprice(&mut self) -> Result<QuoteTotals, ServiceError> {
        let totals = price_quote(self)?;
        for line in self.all_lines_mut() {
            line.total_price = Some(price_quote_line(line));
        }
        self.subtotal = totals.subtotal;
        self.discount_amount = totals.discount_amount;
        self.tax_amount = totals.tax_amount;
        self.total_amount = totals.total_amount;
        Ok(totals)
    }
}
