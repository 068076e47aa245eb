use std::fmt::Display;

use chrono::{DateTime, Utc};
use momo_common::Fcfa;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Customer, NewOrder, Order, OrderId, OrderItem, OrderStatusType, PaymentMethod},
    helpers::normalize_phone,
    traits::OrderFlowError,
};

//--------------------------------------  CreateOrderRequest   ---------------------------------------------------------
/// An order as submitted by the storefront. Missing amounts are derived from the items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub subtotal: Option<Fcfa>,
    #[serde(default)]
    pub shipping: Option<Fcfa>,
    #[serde(default)]
    pub total: Option<Fcfa>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// The authenticated customer. Required for wallet payments.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl CreateOrderRequest {
    pub fn new(customer: Customer, items: Vec<OrderItem>) -> Self {
        Self { customer, items, ..Default::default() }
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_shipping(mut self, shipping: Fcfa) -> Self {
        self.shipping = Some(shipping);
        self
    }

    pub fn with_total(mut self, total: Fcfa) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Validates the request and fills in the derived amounts.
    ///
    /// * the phone number is reduced to its digits and must have 9 to 15 of them,
    /// * name and email are required,
    /// * there must be at least one item, each with a name, a non-negative price and a positive quantity,
    /// * `subtotal` defaults to the sum of the line totals, `shipping` to zero and `total` to their sum,
    /// * the payment method defaults to Airtel Money. Wallet orders need a `user_id`.
    pub fn into_new_order(self) -> Result<NewOrder, OrderFlowError> {
        let invalid = |msg: &str| Err(OrderFlowError::Validation(msg.to_string()));
        let mut customer = self.customer;
        customer.phone = match normalize_phone(&customer.phone) {
            Some(phone) => phone,
            None => return invalid("the customer phone number must have between 9 and 15 digits"),
        };
        customer.name = customer.name.trim().to_string();
        customer.email = customer.email.trim().to_string();
        if customer.name.is_empty() {
            return invalid("the customer name is required");
        }
        if customer.email.is_empty() || !customer.email.contains('@') {
            return invalid("a valid customer email is required");
        }
        if self.items.is_empty() {
            return invalid("an order needs at least one item");
        }
        if let Some(item) = self.items.iter().find(|i| i.name.trim().is_empty()) {
            return Err(OrderFlowError::Validation(format!("item {item:?} has no name")));
        }
        if let Some(item) = self.items.iter().find(|i| i.unit_price.is_negative() || i.quantity < 1) {
            return Err(OrderFlowError::Validation(format!(
                "item '{}' needs a non-negative price and a quantity of at least 1",
                item.name
            )));
        }
        let too_large = || OrderFlowError::Validation("the order amounts are too large".into());
        let subtotal = match self.subtotal {
            Some(subtotal) => subtotal,
            None => self
                .items
                .iter()
                .try_fold(Fcfa::default(), |sum, item| item.line_total().and_then(|line| sum.checked_add(line)))
                .ok_or_else(too_large)?,
        };
        let shipping = self.shipping.unwrap_or_default();
        let total = match self.total {
            Some(total) => total,
            None => subtotal.checked_add(shipping).ok_or_else(too_large)?,
        };
        if subtotal.is_negative() || shipping.is_negative() || total.is_negative() {
            return invalid("order amounts cannot be negative");
        }
        let payment_method = self.payment_method.unwrap_or_default();
        let user_id = self.user_id.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        if payment_method == PaymentMethod::Wallet && user_id.is_none() {
            return invalid("wallet payments require an authenticated user");
        }
        Ok(NewOrder {
            customer,
            items: self.items,
            subtotal,
            shipping,
            total,
            payment_method,
            user_id,
            created_at: Utc::now(),
        })
    }
}

//--------------------------------------     OrderCreated      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub total: Fcfa,
    pub status: OrderStatusType,
}

impl From<&Order> for OrderCreated {
    fn from(order: &Order) -> Self {
        Self { order_id: order.id, total: order.total, status: order.status }
    }
}

//--------------------------------------     PaymentCheck      ---------------------------------------------------------
/// The answer to "has my order been paid yet?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCheck {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub paid: bool,
    pub payment_reference: Option<String>,
    pub payment_received_at: Option<DateTime<Utc>>,
}

impl From<&Order> for PaymentCheck {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            status: order.status,
            paid: order.status.is_paid(),
            payment_reference: order.payment_reference.clone(),
            payment_received_at: order.payment_received_at,
        }
    }
}

//--------------------------------------   OrderQueryFilter    ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub customer_phone: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub user_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_customer_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.customer_phone = Some(phone.into());
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_phone.is_none() &&
            self.payment_method.is_none() &&
            self.user_id.is_none() &&
            self.status.as_ref().map_or(true, Vec::is_empty) &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(phone) = &self.customer_phone {
            write!(f, "phone: {phone}. ")?;
        }
        if let Some(method) = &self.payment_method {
            write!(f, "payment method: {method}. ")?;
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user: {user_id}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}
