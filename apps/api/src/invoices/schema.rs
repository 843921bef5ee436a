use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{AppError, FieldErrors};
use crate::models::invoice::InvoiceStatus;
use crate::models::money::dollars_to_cents;
use crate::validation::push_error;

pub const CUSTOMER_MESSAGE: &str = "Please select a customer.";
pub const AMOUNT_MESSAGE: &str = "Please enter an amount greater than $0.";
pub const STATUS_MESSAGE: &str = "Please select an invoice status.";

/// Raw invoice form body. `amount` is in dollars and may be a number or a numeric string.
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceForm {
    #[serde(alias = "customerId")]
    pub customer_id: Option<String>,
    pub amount: Option<Value>,
    pub status: Option<String>,
}

/// A validated invoice ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceInput {
    pub customer_id: Uuid,
    pub amount_cents: i32,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Copy)]
pub enum InvoiceAction {
    Create,
    Update,
}

impl InvoiceAction {
    fn failure_message(self) -> &'static str {
        match self {
            InvoiceAction::Create => "Missing Fields. Failed to Create Invoice.",
            InvoiceAction::Update => "Missing Fields. Failed to Update Invoice.",
        }
    }
}

/// Coerces a JSON number or numeric string to dollars.
fn coerce_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn amount_cents(value: Option<&Value>) -> Option<i32> {
    let dollars = coerce_amount(value?)?;
    if !dollars.is_finite() || dollars <= 0.0 {
        return None;
    }
    let cents = dollars_to_cents(dollars);
    if cents < 1 {
        return None;
    }
    i32::try_from(cents).ok()
}

impl InvoiceForm {
    pub fn validate(self, action: InvoiceAction) -> Result<InvoiceInput, AppError> {
        let mut errors = FieldErrors::new();

        let customer_id = self
            .customer_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id.trim()).ok());
        if customer_id.is_none() {
            push_error(&mut errors, "customer_id", CUSTOMER_MESSAGE);
        }

        let amount = amount_cents(self.amount.as_ref());
        if amount.is_none() {
            push_error(&mut errors, "amount", AMOUNT_MESSAGE);
        }

        let status = self
            .status
            .as_deref()
            .and_then(|s| s.parse::<InvoiceStatus>().ok());
        if status.is_none() {
            push_error(&mut errors, "status", STATUS_MESSAGE);
        }

        match (customer_id, amount, status) {
            (Some(customer_id), Some(amount_cents), Some(status)) => Ok(InvoiceInput {
                customer_id,
                amount_cents,
                status,
            }),
            _ => Err(AppError::validation(action.failure_message(), errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(body: Value) -> InvoiceForm {
        serde_json::from_value(body).unwrap()
    }

    fn field_errors(err: AppError) -> FieldErrors {
        match err {
            AppError::Validation { fields, .. } => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_form_converts_dollars_to_cents() {
        let id = Uuid::new_v4();
        let input = form(json!({ "customer_id": id.to_string(), "amount": 157.95, "status": "paid" }))
            .validate(InvoiceAction::Create)
            .unwrap();
        assert_eq!(
            input,
            InvoiceInput {
                customer_id: id,
                amount_cents: 15795,
                status: InvoiceStatus::Paid,
            }
        );
    }

    #[test]
    fn test_amount_string_is_coerced() {
        let id = Uuid::new_v4();
        let input = form(json!({ "customerId": id.to_string(), "amount": " 20 ", "status": "pending" }))
            .validate(InvoiceAction::Update)
            .unwrap();
        assert_eq!(input.amount_cents, 2000);
        assert_eq!(input.customer_id, id);
    }

    #[test]
    fn test_non_positive_amount_is_rejected() {
        for amount in [json!(0), json!(-5), json!("abc"), json!(0.001), json!(true)] {
            let err = form(json!({
                "customer_id": Uuid::new_v4().to_string(),
                "amount": amount,
                "status": "paid"
            }))
            .validate(InvoiceAction::Create)
            .unwrap_err();
            let fields = field_errors(err);
            assert_eq!(fields["amount"], vec![AMOUNT_MESSAGE]);
            assert_eq!(fields.len(), 1);
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = form(json!({
            "customer_id": Uuid::new_v4().to_string(),
            "amount": 10,
            "status": "overdue"
        }))
        .validate(InvoiceAction::Create)
        .unwrap_err();
        assert_eq!(field_errors(err)["status"], vec![STATUS_MESSAGE]);
    }

    #[test]
    fn test_empty_form_reports_all_fields() {
        let err = InvoiceForm::default()
            .validate(InvoiceAction::Create)
            .unwrap_err();
        let AppError::Validation { message, fields } = err else {
            panic!("expected validation error");
        };
        assert_eq!(message, "Missing Fields. Failed to Create Invoice.");
        assert_eq!(fields["customer_id"], vec![CUSTOMER_MESSAGE]);
        assert_eq!(fields["amount"], vec![AMOUNT_MESSAGE]);
        assert_eq!(fields["status"], vec![STATUS_MESSAGE]);
    }

    #[test]
    fn test_amount_overflow_is_rejected() {
        let err = form(json!({
            "customer_id": Uuid::new_v4().to_string(),
            "amount": 1.0e12,
            "status": "paid"
        }))
        .validate(InvoiceAction::Create)
        .unwrap_err();
        assert!(field_errors(err).contains_key("amount"));
    }
}
