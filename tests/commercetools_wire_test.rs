mod common;

use {
    common::*,
    psp_ledger_sync::{
        domain::{
            commerce::{Cart, Customer},
            error::EngineError,
            ledger::{PaymentAction, PaymentDraft, TransactionDraft, TransactionState, TransactionType},
        },
        infra::commercetools::{
            client::{map_status, payment_amount},
            wire::{
                CartWire, CustomerActionWire, CustomerWire, PSP_CUSTOMER_FIELD,
                PSP_CUSTOMER_TYPE_KEY, PaymentActionWire, PaymentDraftWire, UpdateWire,
            },
        },
    },
    reqwest::StatusCode,
    serde_json::json,
};

fn authorization() -> TransactionDraft {
    TransactionDraft {
        kind: TransactionType::Authorization,
        state: TransactionState::Initial,
        amount: money(12300, "USD"),
        interaction_id: Some("pi_1".into()),
    }
}

#[test]
fn payment_actions_serialize_to_update_api_shape() {
    let actions = [
        PaymentAction::SetInterfaceId("pi_1".into()),
        PaymentAction::AddTransaction(authorization()),
        PaymentAction::ChangeTransactionState {
            transaction_id: "tx-1".into(),
            state: TransactionState::Success,
        },
    ];
    let update = UpdateWire {
        version: 7,
        actions: actions.iter().map(PaymentActionWire::from).collect(),
    };

    let body = serde_json::to_value(&update).unwrap();

    assert_eq!(
        body,
        json!({
            "version": 7,
            "actions": [
                { "action": "setInterfaceId", "interfaceId": "pi_1" },
                {
                    "action": "addTransaction",
                    "transaction": {
                        "type": "Authorization",
                        "state": "Initial",
                        "amount": { "centAmount": 12300, "currencyCode": "USD" },
                        "interactionId": "pi_1"
                    }
                },
                { "action": "changeTransactionState", "transactionId": "tx-1", "state": "Success" }
            ]
        })
    );
}

#[test]
fn payment_draft_references_the_customer() {
    let draft = PaymentDraft {
        amount_planned: money(12300, "USD"),
        payment_interface: "stripe".into(),
        interface_id: Some("pi_1".into()),
        customer_id: Some("customer-1".into()),
        anonymous_id: None,
        transactions: vec![authorization()],
    };

    let body = serde_json::to_value(PaymentDraftWire::from(&draft)).unwrap();

    assert_eq!(body["paymentMethodInfo"]["paymentInterface"], "stripe");
    assert_eq!(body["customer"], json!({ "typeId": "customer", "id": "customer-1" }));
    assert_eq!(body["interfaceId"], "pi_1");
    assert!(body.get("anonymousId").is_none());
    assert_eq!(body["transactions"][0]["type"], "Authorization");
}

#[test]
fn cart_wire_flattens_taxes_and_payments() {
    let wire: CartWire = serde_json::from_value(json!({
        "id": "cart-1",
        "version": 4,
        "customerId": null,
        "anonymousId": "anon-1",
        "totalPrice": { "centAmount": 10000, "currencyCode": "EUR" },
        "taxedPrice": { "totalGross": { "centAmount": 11900, "currencyCode": "EUR" } },
        "paymentInfo": { "payments": [ { "typeId": "payment", "id": "payment-1" } ] },
        "shippingAddress": { "firstName": "Ada", "country": "DE" }
    }))
    .unwrap();

    let cart = Cart::try_from(wire).unwrap();

    assert_eq!(cart.version, 4);
    assert_eq!(cart.payment_ids[0].as_str(), "payment-1");
    assert_eq!(payment_amount(&cart), money(11900, "EUR"));
    assert_eq!(cart.shipping_address.unwrap().first_name.as_deref(), Some("Ada"));
}

#[test]
fn payment_amount_falls_back_to_cart_total() {
    let c = cart("cart-1", money(5000, "USD"));
    assert_eq!(payment_amount(&c), money(5000, "USD"));
}

#[test]
fn customer_wire_reads_psp_customer_from_custom_fields() {
    let wire: CustomerWire = serde_json::from_value(json!({
        "id": "customer-1",
        "version": 2,
        "email": "buyer@example.test",
        "addresses": [],
        "custom": {
            "type": { "typeId": "type", "id": "type-1" },
            "fields": { (PSP_CUSTOMER_FIELD): "cus_123" }
        }
    }))
    .unwrap();
    let customer = Customer::from(wire);
    assert_eq!(customer.psp_customer_id.as_deref(), Some("cus_123"));
    assert_eq!(customer.custom_type_id.as_deref(), Some("type-1"));

    let bare: CustomerWire =
        serde_json::from_value(json!({ "id": "customer-2", "version": 1 })).unwrap();
    assert!(Customer::from(bare).psp_customer_id.is_none());
}

#[test]
fn http_statuses_map_to_engine_errors() {
    assert!(matches!(
        map_status("update payment", StatusCode::CONFLICT, "version mismatch"),
        EngineError::LedgerConflict(_)
    ));
    assert!(matches!(
        map_status("get cart", StatusCode::NOT_FOUND, "missing"),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        map_status("get cart", StatusCode::BAD_REQUEST, "bad"),
        EngineError::LedgerPermanent(_)
    ));
    assert!(map_status("update payment", StatusCode::CONFLICT, "x").is_retryable());
}

#[test]
fn psp_customer_write_back_respects_an_existing_custom_type() {
    let typed = customer("customer-1", vec![], Some("cus_old"));
    let action = serde_json::to_value(CustomerActionWire::psp_customer_id(&typed, "cus_new")).unwrap();
    assert_eq!(
        action,
        json!({ "action": "setCustomField", "name": PSP_CUSTOMER_FIELD, "value": "cus_new" })
    );

    let untyped = customer("customer-2", vec![], None);
    let action = serde_json::to_value(CustomerActionWire::psp_customer_id(&untyped, "cus_new")).unwrap();
    assert_eq!(
        action,
        json!({
            "action": "setCustomType",
            "type": { "key": PSP_CUSTOMER_TYPE_KEY, "typeId": "type" },
            "fields": { (PSP_CUSTOMER_FIELD): "cus_new" }
        })
    );
}
