use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use momo_common::Fcfa;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

/// Implements `Display` and `FromStr` for the snake_case enums that are stored as TEXT columns.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    s => Err(ConversionError(format!("Invalid {}: {s}", stringify!($name)))),
                }
            }
        }
    };
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .trim_start_matches('#')
            .parse::<i64>()
            .map(Self)
            .map_err(|e| ConversionError(format!("Invalid order id {s}: {e}")))
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been placed and is waiting for a mobile-money payment.
    PendingPayment,
    /// Payment for the order has been received in full.
    Paid,
    /// The merchant is preparing the order.
    Processing,
    /// The order has left the shop.
    Shipped,
    /// The customer has received the order.
    Delivered,
    /// The order has been cancelled by the customer or an admin.
    Cancelled,
}

text_enum!(OrderStatusType {
    PendingPayment => "pending_payment",
    Paid => "paid",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether an order in this status has been paid for.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::PendingPayment | Self::Cancelled)
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    AirtelMoney,
    Cash,
    Wallet,
}

text_enum!(PaymentMethod {
    AirtelMoney => "airtel_money",
    Cash => "cash",
    Wallet => "wallet",
});

//--------------------------------------       Customer        ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub city: Option<String>,
    pub district: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Digits only, 9 to 15 of them.
    pub phone: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: ShippingAddress,
}

//--------------------------------------      OrderItem        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub name: String,
    pub unit_price: Fcfa,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl OrderItem {
    pub fn new<S: Into<String>>(name: S, unit_price: Fcfa, quantity: i64) -> Self {
        Self { product_id: None, name: name.into(), unit_price, quantity, size: None }
    }

    pub fn with_product_id<S: Into<String>>(mut self, product_id: S) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    /// `unit_price × quantity`, or `None` if the product does not fit in an amount.
    pub fn line_total(&self) -> Option<Fcfa> {
        self.unit_price.checked_mul(self.quantity)
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub subtotal: Fcfa,
    pub shipping: Fcfa,
    pub total: Fcfa,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub payment_received_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    /// The wallet owner for wallet-funded orders.
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let items: String = row.try_get("items")?;
        let items = serde_json::from_str::<Vec<OrderItem>>(&items)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "items".into(), source: Box::new(e) })?;
        let customer = Customer {
            phone: row.try_get("customer_phone")?,
            name: row.try_get("customer_name")?,
            email: row.try_get("customer_email")?,
            address: ShippingAddress {
                city: row.try_get("address_city")?,
                district: row.try_get("address_district")?,
                details: row.try_get("address_details")?,
            },
        };
        Ok(Self {
            id: row.try_get("id")?,
            customer,
            items,
            subtotal: row.try_get("subtotal")?,
            shipping: row.try_get("shipping")?,
            total: row.try_get("total")?,
            status: row.try_get("status")?,
            payment_method: row.try_get("payment_method")?,
            payment_reference: row.try_get("payment_reference")?,
            payment_received_at: row.try_get("payment_received_at")?,
            paid_at: row.try_get("paid_at")?,
            shipped_at: row.try_get("shipped_at")?,
            delivered_at: row.try_get("delivered_at")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// A validated order, ready to be stored. Build these with
/// [`CreateOrderRequest::into_new_order`](crate::order_objects::CreateOrderRequest::into_new_order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub subtotal: Fcfa,
    pub shipping: Fcfa,
    pub total: Fcfa,
    pub payment_method: PaymentMethod,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

//--------------------------------------   PaymentLogStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentLogStatus {
    /// The payment was applied to an order.
    Matched,
    /// No pending order could be found for the payment. An operator has been alerted.
    Unmatched,
    /// The notification was seen before.
    Duplicate,
    /// The text was not a payment notification.
    Ignored,
}

text_enum!(PaymentLogStatus {
    Matched => "matched",
    Unmatched => "unmatched",
    Duplicate => "duplicate",
    Ignored => "ignored",
});

//--------------------------------------    PaymentLogEntry    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentLogEntry {
    pub id: i64,
    pub amount: Fcfa,
    pub customer_phone: String,
    /// Empty when the notification carried no transaction id.
    pub transaction_id: String,
    pub raw_text: String,
    pub sender: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub status: PaymentLogStatus,
    pub matched_order_id: Option<OrderId>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentLogEntry {
    pub amount: Fcfa,
    pub customer_phone: String,
    pub transaction_id: String,
    pub raw_text: String,
    pub sender: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub status: PaymentLogStatus,
    pub matched_order_id: Option<OrderId>,
}

impl NewPaymentLogEntry {
    pub fn with_status(mut self, status: PaymentLogStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_matched_order(mut self, order_id: OrderId) -> Self {
        self.matched_order_id = Some(order_id);
        self
    }
}

//--------------------------------------  Wallet transactions  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WalletTransactionType {
    Deposit,
    Withdrawal,
    Purchase,
    Refund,
}

text_enum!(WalletTransactionType {
    Deposit => "deposit",
    Withdrawal => "withdrawal",
    Purchase => "purchase",
    Refund => "refund",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WalletTransactionStatus {
    /// A top-up has been requested but the customer has not sent the money yet.
    Pending,
    /// The customer says they have sent the money and is waiting for an admin to check.
    ClaimPending,
    Completed,
    Refused,
    Failed,
}

text_enum!(WalletTransactionStatus {
    Pending => "pending",
    ClaimPending => "claim_pending",
    Completed => "completed",
    Refused => "refused",
    Failed => "failed",
});

impl WalletTransactionStatus {
    /// Completed, refused and failed transactions never change again.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Refused | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WalletMethod {
    AirtelMoney,
    Wallet,
    System,
}

text_enum!(WalletMethod {
    AirtelMoney => "airtel_money",
    Wallet => "wallet",
    System => "system",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimInfo {
    /// The number the customer sent the money from.
    pub deposit_number: String,
    /// The mobile-money transaction id quoted by the customer.
    pub tid: String,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: i64,
    pub account_id: i64,
    pub tx_type: WalletTransactionType,
    /// Signed. Purchases are negative.
    pub amount: Fcfa,
    pub status: WalletTransactionStatus,
    pub method: WalletMethod,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub claim_info: Option<ClaimInfo>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl FromRow<'_, SqliteRow> for WalletTransaction {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let deposit_number: Option<String> = row.try_get("deposit_number")?;
        let tid: Option<String> = row.try_get("claim_tid")?;
        let claimed_at: Option<DateTime<Utc>> = row.try_get("claimed_at")?;
        let claim_info = match (deposit_number, tid, claimed_at) {
            (Some(deposit_number), Some(tid), Some(claimed_at)) => Some(ClaimInfo { deposit_number, tid, claimed_at }),
            _ => None,
        };
        Ok(Self {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            tx_type: row.try_get("tx_type")?,
            amount: row.try_get("amount")?,
            status: row.try_get("status")?,
            method: row.try_get("method")?,
            reference: row.try_get("reference")?,
            description: row.try_get("description")?,
            claim_info,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWalletTransaction {
    pub tx_type: WalletTransactionType,
    pub amount: Fcfa,
    pub status: WalletTransactionStatus,
    pub method: WalletMethod,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub claim_info: Option<ClaimInfo>,
}

impl NewWalletTransaction {
    pub fn topup_request(amount: Fcfa) -> Self {
        Self {
            tx_type: WalletTransactionType::Deposit,
            amount,
            status: WalletTransactionStatus::Pending,
            method: WalletMethod::AirtelMoney,
            reference: None,
            description: Some("Demande de recharge".into()),
            claim_info: None,
        }
    }

    pub fn topup_claim(amount: Fcfa, claim: ClaimInfo) -> Self {
        Self {
            tx_type: WalletTransactionType::Deposit,
            amount,
            status: WalletTransactionStatus::ClaimPending,
            method: WalletMethod::AirtelMoney,
            reference: Some(claim.tid.clone()),
            description: Some(format!("Recharge depuis le {}", claim.deposit_number)),
            claim_info: Some(claim),
        }
    }

    /// A completed debit. `amount` is the positive price; it is stored negated.
    pub fn purchase(amount: Fcfa, order_ref: &str) -> Self {
        Self {
            tx_type: WalletTransactionType::Purchase,
            amount: -amount.abs(),
            status: WalletTransactionStatus::Completed,
            method: WalletMethod::Wallet,
            reference: Some(order_ref.to_string()),
            description: Some(format!("Paiement commande {order_ref}")),
            claim_info: None,
        }
    }
}

//--------------------------------------    WalletAccount      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WalletAccount {
    pub id: i64,
    pub user_id: String,
    pub balance: Fcfa,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
