use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{Quote, QuoteLineItem, QuoteLineKind, QuoteStatus, UpsertOutcome},
    repositories::{CatalogRepository, QuoteRepository, SalesOrderRepository},
    services::{
        assembly_costing::cost_sub_assembly,
        bom::{BomService, FlagReason},
        lifecycle::{parse_quote_status, transition_quote_status, OrderNumbering, QuoteTransition},
        quote_pricing::check_adjustments,
    },
};

const MAX_WRITE_ATTEMPTS: usize = 5;

/// Result of adding a catalog item to a quote.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuoteLineUpsert {
    pub outcome: UpsertOutcome,
    pub quote: Quote,
}

/// Changes to an existing quote line; `None` leaves a field as it is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LineUpdate {
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
}

/// Quote authoring and the quote lifecycle, including acceptance into a sales order.
#[derive(Clone)]
pub struct QuoteService {
    catalog: Arc<dyn CatalogRepository>,
    quotes: Arc<dyn QuoteRepository>,
    sales_orders: Arc<dyn SalesOrderRepository>,
    bom: BomService,
    numbering: OrderNumbering,
    default_tax_rate: Decimal,
    validity: chrono::Duration,
    event_sender: Option<EventSender>,
}

impl QuoteService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        quotes: Arc<dyn QuoteRepository>,
        sales_orders: Arc<dyn SalesOrderRepository>,
        bom: BomService,
        config: &EngineConfig,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            catalog,
            quotes,
            sales_orders,
            bom,
            numbering: OrderNumbering::from_config(config),
            default_tax_rate: config.tax_rate(),
            validity: config.quote_validity(),
            event_sender,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    pub async fn get(&self, quote_id: Uuid) -> Result<Quote, ServiceError> {
        self.quotes
            .get_quote(quote_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {}", quote_id)))
    }

    pub async fn list(&self) -> Result<Vec<Quote>, ServiceError> {
        self.quotes.list_quotes().await
    }

    /// Creates a draft quote for a customer.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn create_quote(
        &self,
        customer_id: Uuid,
        location_id: Option<String>,
    ) -> Result<Quote, ServiceError> {
        let customer = self
            .catalog
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| ServiceError::reference("customer", customer_id))?;
        if let Some(location_id) = &location_id {
            if customer.location(location_id).is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "customer {} has no location {}",
                    customer.company_name, location_id
                )));
            }
        }

        let valid_until = Self::today() + self.validity;
        let mut stamp = Utc::now().timestamp_millis();

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut quote = Quote::new(
                format!("{}{}", self.numbering.quote_prefix, stamp),
                customer_id,
                valid_until,
            );
            quote.location_id = location_id.clone();
            quote.tax_rate = Some(self.default_tax_rate);
            quote.discount_percent = Some(customer.default_discount());
            quote.reprice()?;

            match self.quotes.insert_quote(&quote).await {
                Ok(created) => {
                    info!(
                        "Quote created: number={}, customer={}",
                        created.quote_number, customer.company_name
                    );
                    if let Some(sender) = &self.event_sender {
                        sender.send_or_log(Event::QuoteCreated {
                            quote_id: created.id,
                            quote_number: created.quote_number.clone(),
                            customer_id,
                        });
                    }
                    return Ok(created);
                }
                Err(ServiceError::Conflict(_)) => stamp += 1,
                Err(e) => {
                    error!("Failed to create quote: {}", e);
                    return Err(e);
                }
            }
        }

        Err(ServiceError::Conflict(
            "could not allocate a unique quote number".into(),
        ))
    }

    /// Loads the quote, applies `edit`, reprices and saves, retrying on version conflicts.
    async fn modify_quote<T, F>(&self, quote_id: Uuid, mut edit: F) -> Result<(Quote, T), ServiceError>
    where
        F: FnMut(&mut Quote) -> Result<T, ServiceError> + Send,
        T: Send,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut quote = self.get(quote_id).await?;
            if quote.status == QuoteStatus::Accepted {
                return Err(ServiceError::InvalidStatus(format!(
                    "quote {} is accepted and can no longer be edited",
                    quote.quote_number
                )));
            }

            let outcome = edit(&mut quote)?;
            let totals = quote.reprice()?;
            quote.updated_at = Utc::now();

            match self.quotes.update_quote(&quote).await {
                Ok(saved) => {
                    if let Some(sender) = &self.event_sender {
                        sender.send_or_log(Event::QuoteRepriced {
                            quote_id,
                            total_amount: totals.total_amount,
                        });
                    }
                    return Ok((saved, outcome));
                }
                Err(ServiceError::ConcurrentModification(_)) => {
                    warn!("Quote {} changed concurrently (attempt {})", quote_id, attempt);
                }
                Err(e) => {
                    error!("Failed to save quote {}: {}", quote_id, e);
                    return Err(e);
                }
            }
        }
        Err(ServiceError::ConcurrentModification(quote_id))
    }

    async fn add_line(
        &self,
        quote_id: Uuid,
        kind: QuoteLineKind,
        line: QuoteLineItem,
    ) -> Result<QuoteLineUpsert, ServiceError> {
        if line.quantity.map_or(true, |q| q <= Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "quantity must be greater than zero".into(),
            ));
        }
        let item_id = line.item_id;
        let (quote, outcome) = self
            .modify_quote(quote_id, |quote| quote.upsert_line(kind, line.clone()))
            .await?;
        info!(
            "Quote {} {} line {}: item={}",
            quote.quote_number, kind, outcome, item_id
        );
        Ok(QuoteLineUpsert { outcome, quote })
    }

    /// Adds a machine at the selling price of its current BOM roll-up.
    #[instrument(skip(self), fields(quote_id = %quote_id, machine_id = %machine_id))]
    pub async fn add_machine(
        &self,
        quote_id: Uuid,
        machine_id: Uuid,
        quantity: Decimal,
    ) -> Result<QuoteLineUpsert, ServiceError> {
        let machine = self
            .catalog
            .get_machine(machine_id)
            .await?
            .ok_or_else(|| ServiceError::reference("machine", machine_id))?;
        if !machine.is_active {
            return Err(ServiceError::ValidationError(format!(
                "machine {} is inactive",
                machine.machine_id
            )));
        }

        let cost = self.bom.machine_cost(machine_id).await?;
        if let Some(missing) = cost
            .flagged_lines
            .iter()
            .find(|f| f.reason == FlagReason::MissingItem)
        {
            return Err(ServiceError::reference(
                missing.item_type.to_string(),
                missing.item_id,
            ));
        }

        let line = QuoteLineItem::new(
            machine.id,
            machine.name,
            machine.machine_id,
            quantity,
            cost.selling_price,
        );
        self.add_line(quote_id, QuoteLineKind::Machine, line).await
    }

    #[instrument(skip(self), fields(quote_id = %quote_id, part_id = %part_id))]
    pub async fn add_part(
        &self,
        quote_id: Uuid,
        part_id: Uuid,
        quantity: Decimal,
    ) -> Result<QuoteLineUpsert, ServiceError> {
        let part = self
            .catalog
            .get_part(part_id)
            .await?
            .ok_or_else(|| ServiceError::reference("part", part_id))?;
        if !part.is_quotable() {
            return Err(ServiceError::ValidationError(format!(
                "part {} is inactive or obsolete",
                part.part_number
            )));
        }

        let unit_price = part.selling_price();
        let line = QuoteLineItem::new(part.id, part.name, part.part_number, quantity, unit_price);
        self.add_line(quote_id, QuoteLineKind::Part, line).await
    }

    #[instrument(skip(self), fields(quote_id = %quote_id, sub_assembly_id = %sub_assembly_id))]
    pub async fn add_sub_assembly(
        &self,
        quote_id: Uuid,
        sub_assembly_id: Uuid,
        quantity: Decimal,
    ) -> Result<QuoteLineUpsert, ServiceError> {
        let sub_assembly = self
            .catalog
            .get_sub_assembly(sub_assembly_id)
            .await?
            .ok_or_else(|| ServiceError::reference("sub_assembly", sub_assembly_id))?;
        if !sub_assembly.is_quotable() {
            return Err(ServiceError::ValidationError(format!(
                "sub-assembly {} is inactive",
                sub_assembly.assembly_number
            )));
        }

        let unit_price = cost_sub_assembly(&sub_assembly).selling_price;
        let line = QuoteLineItem::new(
            sub_assembly.id,
            sub_assembly.name,
            sub_assembly.assembly_number,
            quantity,
            unit_price,
        );
        self.add_line(quote_id, QuoteLineKind::SubAssembly, line).await
    }

    #[instrument(skip(self), fields(quote_id = %quote_id, item_id = %item_id))]
    pub async fn update_line(
        &self,
        quote_id: Uuid,
        kind: QuoteLineKind,
        item_id: Uuid,
        update: LineUpdate,
    ) -> Result<Quote, ServiceError> {
        if update.quantity.map_or(false, |q| q <= Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "quantity must be greater than zero".into(),
            ));
        }
        let (quote, _) = self
            .modify_quote(quote_id, |quote| {
                let line = quote.find_line_mut(kind, item_id).ok_or_else(|| {
                    ServiceError::NotFound(format!("{} line {} on quote", kind, item_id))
                })?;
                if let Some(quantity) = update.quantity {
                    line.quantity = Some(quantity);
                }
                if let Some(unit_price) = update.unit_price {
                    line.unit_price = Some(unit_price);
                }
                if let Some(discount) = update.discount_percent {
                    line.discount_percent = Some(discount);
                }
                Ok(())
            })
            .await?;
        Ok(quote)
    }

    #[instrument(skip(self), fields(quote_id = %quote_id, item_id = %item_id))]
    pub async fn remove_line(
        &self,
        quote_id: Uuid,
        kind: QuoteLineKind,
        item_id: Uuid,
    ) -> Result<Quote, ServiceError> {
        let (quote, _) = self
            .modify_quote(quote_id, |quote| {
                if quote.remove_line(kind, item_id) {
                    Ok(())
                } else {
                    Err(ServiceError::NotFound(format!(
                        "{} line {} on quote",
                        kind, item_id
                    )))
                }
            })
            .await?;
        info!("Quote {} {} line removed: item={}", quote.quote_number, kind, item_id);
        Ok(quote)
    }

    /// Sets the quote-level discount (percent) and tax rate (fraction).
    #[instrument(skip(self), fields(quote_id = %quote_id))]
    pub async fn set_adjustments(
        &self,
        quote_id: Uuid,
        discount_percent: Option<Decimal>,
        tax_rate: Option<Decimal>,
    ) -> Result<Quote, ServiceError> {
        check_adjustments(discount_percent, tax_rate)?;
        let (quote, _) = self
            .modify_quote(quote_id, |quote| {
                if discount_percent.is_some() {
                    quote.discount_percent = discount_percent;
                }
                if tax_rate.is_some() {
                    quote.tax_rate = tax_rate;
                }
                Ok(())
            })
            .await?;
        Ok(quote)
    }

    /// Moves a quote to a new status.
    ///
    /// Accepting creates the quote's sales order: the order is inserted first, under the
    /// one-order-per-quote constraint, then the quote is saved. If saving the quote fails
    /// the order is deleted again.
    #[instrument(skip(self), fields(quote_id = %quote_id, new_status = %new_status))]
    pub async fn transition_status(
        &self,
        quote_id: Uuid,
        new_status: &str,
    ) -> Result<QuoteTransition, ServiceError> {
        let status = parse_quote_status(new_status)?;
        let quote = self.get(quote_id).await?;
        let old_status = quote.status;

        let order_exists = status == QuoteStatus::Accepted
            && self.sales_orders.find_by_quote(quote_id).await?.is_some();
        let transition =
            transition_quote_status(&quote, status, order_exists, &self.numbering, Self::today())?;

        let created = match &transition.sales_order {
            Some(order) => match self.sales_orders.insert_sales_order(order).await {
                Ok(created) => Some(created),
                Err(ServiceError::Conflict(msg)) => {
                    if self.sales_orders.find_by_quote(quote_id).await?.is_some() {
                        warn!("Quote {} was accepted concurrently", quote.quote_number);
                        return Err(ServiceError::AlreadyAccepted(quote.quote_number));
                    }
                    error!("Sales order number conflict for quote {}: {}", quote.quote_number, msg);
                    return Err(ServiceError::Conflict(msg));
                }
                Err(e) => {
                    error!("Failed to create sales order for quote {}: {}", quote.quote_number, e);
                    return Err(e);
                }
            },
            None => None,
        };

        let saved = match self.quotes.update_quote(&transition.quote).await {
            Ok(saved) => saved,
            Err(e) => {
                error!("Failed to save quote {} status: {}", quote.quote_number, e);
                if let Some(order) = &created {
                    match self.sales_orders.delete_sales_order(order.id).await {
                        Ok(_) => warn!(
                            "Rolled back sales order {} for quote {}",
                            order.sales_order_number, quote.quote_number
                        ),
                        Err(rollback) => error!(
                            "Failed to roll back sales order {}: {}",
                            order.sales_order_number, rollback
                        ),
                    }
                }
                return Err(e);
            }
        };

        info!(
            "Quote {} status changed: {} -> {}",
            saved.quote_number, old_status, saved.status
        );
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::QuoteStatusChanged {
                quote_id,
                old_status,
                new_status: saved.status,
            });
            if let Some(order) = &created {
                sender.send_or_log(Event::SalesOrderCreated {
                    sales_order_id: order.id,
                    sales_order_number: order.sales_order_number.clone(),
                    quote_id,
                    total_amount: order.total_amount,
                });
            }
        }
        if let Some(order) = &created {
            info!(
                "Sales order {} created from quote {} for {}",
                order.sales_order_number, saved.quote_number, order.total_amount
            );
        }

        Ok(QuoteTransition {
            quote: saved,
            sales_order: created,
        })
    }
}
