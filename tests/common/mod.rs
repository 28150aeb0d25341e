#![allow(dead_code)]

use {
    psp_ledger_sync::{
        config::AppConfig,
        domain::{
            EngineFuture,
            commerce::{Address, Cart, CommercePlatform, Customer},
            error::EngineError,
            gateway::{
                CaptureRequest, CustomerRequest, FeatureMap, IntentRequest, META_CUSTOMER_ID,
                PaymentGateway, PspBalanceTransaction, PspCustomer, PspIntent, PspRefund,
            },
            id::{CartId, IdempotencyKey, IntentId, PaymentId},
            ledger::{LedgerPayment, PaymentAction, PaymentDraft, Transaction, TransactionDraft},
            money::Money,
            region::{Region, RegionContext},
        },
    },
    serde_json::{Value, json},
    std::{
        collections::{BTreeMap, HashMap, VecDeque},
        sync::Mutex,
    },
};

pub const US_SECRET: &str = "whsec_us_test";
pub const EU_SECRET: &str = "whsec_eu_test";
pub const OPERATIONS_TOKEN: &str = "ops_test_token";

pub fn money(cents: i64, currency: &str) -> Money {
    Money::from_psp(cents, currency).unwrap()
}

pub fn us_context() -> RegionContext {
    RegionContext::new(Region::Us, "sk_test_us", US_SECRET)
}

pub fn eu_context() -> RegionContext {
    RegionContext::new(Region::Eu, "sk_test_eu", EU_SECRET)
}

/// Two-region configuration with US as default.
pub fn test_config(multi_operations: bool) -> AppConfig {
    let mut env = HashMap::new();
    env.insert("STRIPE_SECRET_KEY_US", "sk_test_us");
    env.insert("STRIPE_WEBHOOK_SIGNING_SECRET_US", US_SECRET);
    env.insert("STRIPE_SECRET_KEY_EU", "sk_test_eu");
    env.insert("STRIPE_WEBHOOK_SIGNING_SECRET_EU", EU_SECRET);
    env.insert("STRIPE_DEFAULT_REGION", "US");
    env.insert("STRIPE_CAPTURE_METHOD", "manual");
    env.insert(
        "STRIPE_ENABLE_MULTI_OPERATIONS",
        if multi_operations { "true" } else { "false" },
    );
    env.insert("STRIPE_COLLECT_BILLING_ADDRESS", "never");
    env.insert("CTP_PROJECT_KEY", "test-project");
    env.insert("CTP_CLIENT_ID", "client");
    env.insert("CTP_CLIENT_SECRET", "secret");
    env.insert("CTP_AUTH_URL", "https://auth.example.test");
    env.insert("CTP_API_URL", "https://api.example.test");
    env.insert("MERCHANT_RETURN_URL", "https://shop.example.test/return");
    env.insert("OPERATIONS_API_TOKEN", OPERATIONS_TOKEN);
    AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap()
}

pub fn address(first: &str, street: &str) -> Address {
    Address {
        first_name: Some(first.into()),
        last_name: Some("Tester".into()),
        street_name: Some(street.into()),
        street_number: Some("12".into()),
        postal_code: Some("10001".into()),
        city: Some("New York".into()),
        country: Some("US".into()),
        phone: Some("+15550100".into()),
        ..Address::default()
    }
}

pub fn cart(id: &str, amount: Money) -> Cart {
    Cart {
        id: CartId::new(id).unwrap(),
        version: 1,
        customer_id: None,
        anonymous_id: Some("anon-1".into()),
        customer_email: Some("buyer@example.test".into()),
        shipping_address: Some(address("Ship", "Main St")),
        billing_address: None,
        total_price: amount,
        taxed_total_gross: None,
        payment_ids: Vec::new(),
    }
}

/// Ledger customer "Ada Tester"; a saved PSP id implies a custom type.
pub fn customer(id: &str, addresses: Vec<Address>, psp_customer_id: Option<&str>) -> Customer {
    Customer {
        id: id.into(),
        version: 3,
        email: Some("ada@example.test".into()),
        first_name: Some("Ada".into()),
        last_name: Some("Tester".into()),
        addresses,
        psp_customer_id: psp_customer_id.map(str::to_string),
        custom_type_id: psp_customer_id.map(|_| "type-1".to_string()),
    }
}

pub fn psp_customer(id: &str, ct_customer_id: &str) -> PspCustomer {
    PspCustomer {
        id: id.into(),
        deleted: false,
        ct_customer_id: Some(ct_customer_id.into()),
    }
}

pub fn payment(id: &str, planned: Money, transactions: Vec<Transaction>) -> LedgerPayment {
    LedgerPayment {
        id: PaymentId::new(id).unwrap(),
        version: 1,
        amount_planned: planned,
        interface_id: Some("pi_test_1".into()),
        transactions,
    }
}

pub fn tx(id: &str, draft: TransactionDraft) -> Transaction {
    Transaction {
        id: id.into(),
        kind: draft.kind,
        state: draft.state,
        amount: draft.amount,
        interaction_id: draft.interaction_id,
    }
}

// ── Fake commerce platform ──────────────────────────────────────────────────

#[derive(Default)]
struct LedgerState {
    carts: HashMap<String, Cart>,
    payments: HashMap<String, LedgerPayment>,
    customers: HashMap<String, Customer>,
    drafts: Vec<PaymentDraft>,
    next_id: u64,
    pending_conflicts: u32,
    permanent_failure: bool,
    update_attempts: u32,
    updates: u32,
    cart_links: Vec<(String, String)>,
    interleave_reads: bool,
    down: bool,
}

/// In-memory ledger that enforces optimistic-concurrency versions.
#[derive(Default)]
pub struct FakeLedger {
    state: Mutex<LedgerState>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_cart(&self, cart: Cart) {
        let mut s = self.state.lock().unwrap();
        s.carts.insert(cart.id.to_string(), cart);
    }

    pub fn put_customer(&self, customer: Customer) {
        let mut s = self.state.lock().unwrap();
        s.customers.insert(customer.id.clone(), customer);
    }

    pub fn put_payment(&self, payment: LedgerPayment) {
        let mut s = self.state.lock().unwrap();
        s.payments.insert(payment.id.to_string(), payment);
    }

    pub fn payment(&self, id: &str) -> LedgerPayment {
        self.state.lock().unwrap().payments[id].clone()
    }

    pub fn payments(&self) -> Vec<LedgerPayment> {
        self.state.lock().unwrap().payments.values().cloned().collect()
    }

    pub fn drafts(&self) -> Vec<PaymentDraft> {
        self.state.lock().unwrap().drafts.clone()
    }

    pub fn cart_links(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().cart_links.clone()
    }

    pub fn customer(&self, id: &str) -> Customer {
        self.state.lock().unwrap().customers[id].clone()
    }

    /// Payment reads yield to the scheduler before returning, so concurrent
    /// deliveries both read the same version before either writes.
    pub fn interleave_reads(&self) {
        self.state.lock().unwrap().interleave_reads = true;
    }

    pub fn go_down(&self) {
        self.state.lock().unwrap().down = true;
    }

    /// The next `n` updates fail as if another writer got there first.
    pub fn inject_conflicts(&self, n: u32) {
        self.state.lock().unwrap().pending_conflicts = n;
    }

    pub fn fail_updates_permanently(&self) {
        self.state.lock().unwrap().permanent_failure = true;
    }

    /// Update calls that reached the ledger, successful or not.
    pub fn update_attempts(&self) -> u32 {
        self.state.lock().unwrap().update_attempts
    }

    /// Update calls that changed a payment.
    pub fn updates(&self) -> u32 {
        self.state.lock().unwrap().updates
    }

    fn next_id(s: &mut LedgerState, prefix: &str) -> String {
        s.next_id += 1;
        format!("{prefix}-{}", s.next_id)
    }
}

fn not_found(what: &str, id: &str) -> EngineError {
    EngineError::NotFound(format!("{what} {id}"))
}

impl CommercePlatform for FakeLedger {
    fn get_cart<'a>(&'a self, id: &'a CartId) -> EngineFuture<'a, Cart> {
        Box::pin(async move {
            let s = self.state.lock().unwrap();
            s.carts
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| not_found("cart", id.as_str()))
        })
    }

    fn get_payment_amount<'a>(&'a self, cart: &'a Cart) -> EngineFuture<'a, Money> {
        Box::pin(async move {
            Ok(cart
                .taxed_total_gross
                .clone()
                .unwrap_or_else(|| cart.total_price.clone()))
        })
    }

    fn create_payment<'a>(&'a self, draft: &'a PaymentDraft) -> EngineFuture<'a, LedgerPayment> {
        Box::pin(async move {
            let mut s = self.state.lock().unwrap();
            let id = FakeLedger::next_id(&mut s, "payment");
            let mut transactions = Vec::new();
            for d in &draft.transactions {
                let tx_id = FakeLedger::next_id(&mut s, "tx");
                transactions.push(tx(&tx_id, d.clone()));
            }
            let payment = LedgerPayment {
                id: PaymentId::new(id.clone())?,
                version: 1,
                amount_planned: draft.amount_planned.clone(),
                interface_id: draft.interface_id.clone(),
                transactions,
            };
            s.drafts.push(draft.clone());
            s.payments.insert(id, payment.clone());
            Ok(payment)
        })
    }

    fn get_payment<'a>(&'a self, id: &'a PaymentId) -> EngineFuture<'a, LedgerPayment> {
        Box::pin(async move {
            let (found, interleave) = {
                let s = self.state.lock().unwrap();
                (s.payments.get(id.as_str()).cloned(), s.interleave_reads)
            };
            if interleave {
                tokio::task::yield_now().await;
            }
            found.ok_or_else(|| not_found("payment", id.as_str()))
        })
    }

    fn update_payment<'a>(
        &'a self,
        id: &'a PaymentId,
        version: i64,
        actions: &'a [PaymentAction],
    ) -> EngineFuture<'a, LedgerPayment> {
        Box::pin(async move {
            let mut s = self.state.lock().unwrap();
            s.update_attempts += 1;

            if s.permanent_failure {
                return Err(EngineError::LedgerPermanent("payment locked".into()));
            }
            if s.pending_conflicts > 0 {
                s.pending_conflicts -= 1;
                if let Some(p) = s.payments.get_mut(id.as_str()) {
                    p.version += 1;
                }
                return Err(EngineError::LedgerConflict(format!(
                    "payment {id} changed concurrently"
                )));
            }

            let mut payment = s
                .payments
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| not_found("payment", id.as_str()))?;
            if payment.version != version {
                return Err(EngineError::LedgerConflict(format!(
                    "expected version {}, got {version}",
                    payment.version
                )));
            }

            for action in actions {
                match action {
                    PaymentAction::SetInterfaceId(v) => payment.interface_id = Some(v.clone()),
                    PaymentAction::AddTransaction(d) => {
                        let tx_id = FakeLedger::next_id(&mut s, "tx");
                        payment.transactions.push(tx(&tx_id, d.clone()));
                    }
                    PaymentAction::ChangeTransactionState {
                        transaction_id,
                        state,
                    } => {
                        let target = payment
                            .transactions
                            .iter_mut()
                            .find(|t| &t.id == transaction_id)
                            .ok_or_else(|| not_found("transaction", transaction_id))?;
                        target.state = *state;
                    }
                }
            }
            payment.version += 1;
            s.updates += 1;
            s.payments.insert(id.to_string(), payment.clone());
            Ok(payment)
        })
    }

    fn add_payment_to_cart<'a>(
        &'a self,
        cart_id: &'a CartId,
        cart_version: i64,
        payment_id: &'a PaymentId,
    ) -> EngineFuture<'a, Cart> {
        Box::pin(async move {
            let mut s = self.state.lock().unwrap();
            let mut cart = s
                .carts
                .get(cart_id.as_str())
                .cloned()
                .ok_or_else(|| not_found("cart", cart_id.as_str()))?;
            if cart.version != cart_version {
                return Err(EngineError::LedgerConflict("cart changed".into()));
            }
            cart.version += 1;
            cart.payment_ids.push(payment_id.clone());
            s.cart_links
                .push((cart_id.to_string(), payment_id.to_string()));
            s.carts.insert(cart_id.to_string(), cart.clone());
            Ok(cart)
        })
    }

    fn get_customer<'a>(&'a self, id: &'a str) -> EngineFuture<'a, Option<Customer>> {
        Box::pin(async move { Ok(self.state.lock().unwrap().customers.get(id).cloned()) })
    }

    fn set_psp_customer_id<'a>(
        &'a self,
        customer: &'a Customer,
        psp_customer_id: &'a str,
    ) -> EngineFuture<'a, Customer> {
        Box::pin(async move {
            let mut s = self.state.lock().unwrap();
            let stored = s
                .customers
                .get_mut(&customer.id)
                .ok_or_else(|| not_found("customer", &customer.id))?;
            if stored.version != customer.version {
                return Err(EngineError::LedgerConflict("customer changed".into()));
            }
            stored.version += 1;
            stored.psp_customer_id = Some(psp_customer_id.to_string());
            if stored.custom_type_id.is_none() {
                stored.custom_type_id = Some("type-stripe-customer".into());
            }
            Ok(stored.clone())
        })
    }

    fn check_health<'a>(&'a self) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            if self.state.lock().unwrap().down {
                return Err(EngineError::LedgerPermanent("HTTP 503".into()));
            }
            Ok(())
        })
    }
}

// ── Fake PSP ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub operation: &'static str,
    pub region: Region,
    pub target: String,
    pub key: Option<String>,
}

#[derive(Default)]
struct GatewayState {
    intents: HashMap<String, PspIntent>,
    refunds: Vec<PspRefund>,
    balance_transactions: Vec<PspBalanceTransaction>,
    created: Vec<IntentRequest>,
    metadata_updates: Vec<(String, BTreeMap<String, String>)>,
    captures: Vec<CaptureRequest>,
    customers: HashMap<String, PspCustomer>,
    created_customers: Vec<CustomerRequest>,
    sessions: Vec<(String, FeatureMap)>,
    calls: Vec<GatewayCall>,
    failures: VecDeque<EngineError>,
    failing_operations: HashMap<&'static str, EngineError>,
    next_id: u32,
}

/// Scripted PSP: answers from canned data and records every call.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_refunds(self, refunds: Vec<PspRefund>) -> Self {
        self.state.lock().unwrap().refunds = refunds;
        self
    }

    pub fn with_balance_transactions(self, txs: Vec<PspBalanceTransaction>) -> Self {
        self.state.lock().unwrap().balance_transactions = txs;
        self
    }

    pub fn put_customer(&self, customer: PspCustomer) {
        let mut s = self.state.lock().unwrap();
        s.customers.insert(customer.id.clone(), customer);
    }

    pub fn created_customers(&self) -> Vec<CustomerRequest> {
        self.state.lock().unwrap().created_customers.clone()
    }

    pub fn sessions(&self) -> Vec<(String, FeatureMap)> {
        self.state.lock().unwrap().sessions.clone()
    }

    pub fn put_intent(&self, intent: PspIntent) {
        let mut s = self.state.lock().unwrap();
        s.intents.insert(intent.id.to_string(), intent);
    }

    /// The next call fails with `err`.
    pub fn fail_next(&self, err: EngineError) {
        self.state.lock().unwrap().failures.push_back(err);
    }

    /// Every call to `operation` fails with `err`.
    pub fn fail_on(&self, operation: &'static str, err: EngineError) {
        self.state
            .lock()
            .unwrap()
            .failing_operations
            .insert(operation, err);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<GatewayCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation == operation)
            .collect()
    }

    pub fn created(&self) -> Vec<IntentRequest> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn metadata_updates(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.state.lock().unwrap().metadata_updates.clone()
    }

    pub fn captures(&self) -> Vec<CaptureRequest> {
        self.state.lock().unwrap().captures.clone()
    }

    fn record(
        &self,
        operation: &'static str,
        ctx: &RegionContext,
        target: &str,
        key: Option<&IdempotencyKey>,
    ) -> Result<(), EngineError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(GatewayCall {
            operation,
            region: ctx.region(),
            target: target.to_string(),
            key: key.map(|k| k.as_str().to_string()),
        });
        if let Some(err) = s.failing_operations.get(operation) {
            return Err(clone_error(err));
        }
        match s.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn intent(&self, id: &IntentId) -> Result<PspIntent, EngineError> {
        self.state
            .lock()
            .unwrap()
            .intents
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| EngineError::PspPermanent(format!("no such intent {id}")))
    }
}

fn clone_error(err: &EngineError) -> EngineError {
    match err {
        EngineError::PspTransient(m) => EngineError::PspTransient(m.clone()),
        EngineError::PspPermanent(m) => EngineError::PspPermanent(m.clone()),
        other => EngineError::PspPermanent(other.to_string()),
    }
}

impl PaymentGateway for FakeGateway {
    fn create_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        request: &'a IntentRequest,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent> {
        Box::pin(async move {
            self.record("create_intent", ctx, "", Some(key))?;
            let mut s = self.state.lock().unwrap();
            s.next_id += 1;
            let id = format!("pi_test_{}", s.next_id);
            let intent = PspIntent {
                id: IntentId::new(id.clone())?,
                amount: request.amount.amount().minor_units(),
                amount_received: 0,
                currency: request.amount.currency().to_psp(),
                status: "requires_payment_method".into(),
                client_secret: Some(format!("{id}_secret")),
            };
            s.created.push(request.clone());
            s.intents.insert(id, intent.clone());
            Ok(intent)
        })
    }

    fn retrieve_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
    ) -> EngineFuture<'a, PspIntent> {
        Box::pin(async move {
            self.record("retrieve_intent", ctx, id.as_str(), None)?;
            self.intent(id)
        })
    }

    fn update_intent_metadata<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        metadata: &'a BTreeMap<String, String>,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent> {
        Box::pin(async move {
            self.record("update_intent_metadata", ctx, id.as_str(), Some(key))?;
            self.state
                .lock()
                .unwrap()
                .metadata_updates
                .push((id.to_string(), metadata.clone()));
            self.intent(id)
        })
    }

    fn capture_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        capture: CaptureRequest,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent> {
        Box::pin(async move {
            self.record("capture_intent", ctx, id.as_str(), Some(key))?;
            self.state.lock().unwrap().captures.push(capture);
            let mut intent = self.intent(id)?;
            intent.amount_received += capture.amount_to_capture;
            self.put_intent(intent.clone());
            Ok(intent)
        })
    }

    fn cancel_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent> {
        Box::pin(async move {
            self.record("cancel_intent", ctx, id.as_str(), Some(key))?;
            let mut intent = self.intent(id)?;
            intent.status = "canceled".into();
            Ok(intent)
        })
    }

    fn create_refund<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        amount: i64,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspRefund> {
        Box::pin(async move {
            self.record("create_refund", ctx, id.as_str(), Some(key))?;
            let intent = self.intent(id)?;
            Ok(PspRefund {
                id: format!("re_for_{id}"),
                amount,
                currency: intent.currency,
                created: 1_700_000_100,
                status: Some("pending".into()),
            })
        })
    }

    fn list_refunds<'a>(
        &'a self,
        ctx: &'a RegionContext,
        charge_id: &'a str,
        created_gte: i64,
        limit: u8,
    ) -> EngineFuture<'a, Vec<PspRefund>> {
        Box::pin(async move {
            self.record("list_refunds", ctx, charge_id, None)?;
            let s = self.state.lock().unwrap();
            Ok(s.refunds
                .iter()
                .filter(|r| r.created >= created_gte)
                .take(limit as usize)
                .cloned()
                .collect())
        })
    }

    fn list_balance_transactions<'a>(
        &'a self,
        ctx: &'a RegionContext,
        source: &'a str,
        limit: u8,
    ) -> EngineFuture<'a, Vec<PspBalanceTransaction>> {
        Box::pin(async move {
            self.record("list_balance_transactions", ctx, source, None)?;
            let s = self.state.lock().unwrap();
            Ok(s.balance_transactions
                .iter()
                .take(limit as usize)
                .cloned()
                .collect())
        })
    }

    fn retrieve_customer<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a str,
    ) -> EngineFuture<'a, PspCustomer> {
        Box::pin(async move {
            self.record("retrieve_customer", ctx, id, None)?;
            self.state
                .lock()
                .unwrap()
                .customers
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::PspPermanent(format!("404: no such customer {id}")))
        })
    }

    fn search_customer<'a>(
        &'a self,
        ctx: &'a RegionContext,
        ct_customer_id: &'a str,
    ) -> EngineFuture<'a, Option<PspCustomer>> {
        Box::pin(async move {
            self.record("search_customer", ctx, ct_customer_id, None)?;
            let s = self.state.lock().unwrap();
            Ok(s.customers
                .values()
                .find(|c| c.ct_customer_id.as_deref() == Some(ct_customer_id))
                .cloned())
        })
    }

    fn create_customer<'a>(
        &'a self,
        ctx: &'a RegionContext,
        request: &'a CustomerRequest,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspCustomer> {
        Box::pin(async move {
            self.record("create_customer", ctx, "", Some(key))?;
            let mut s = self.state.lock().unwrap();
            s.next_id += 1;
            let created = PspCustomer {
                id: format!("cus_test_{}", s.next_id),
                deleted: false,
                ct_customer_id: request.metadata.get(META_CUSTOMER_ID).cloned(),
            };
            s.created_customers.push(request.clone());
            s.customers.insert(created.id.clone(), created.clone());
            Ok(created)
        })
    }

    fn create_ephemeral_key<'a>(
        &'a self,
        ctx: &'a RegionContext,
        customer_id: &'a str,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, String> {
        Box::pin(async move {
            self.record("create_ephemeral_key", ctx, customer_id, Some(key))?;
            Ok(format!("ek_for_{customer_id}"))
        })
    }

    fn create_customer_session<'a>(
        &'a self,
        ctx: &'a RegionContext,
        customer_id: &'a str,
        features: &'a FeatureMap,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, String> {
        Box::pin(async move {
            self.record("create_customer_session", ctx, customer_id, Some(key))?;
            self.state
                .lock()
                .unwrap()
                .sessions
                .push((customer_id.to_string(), features.clone()));
            Ok(format!("cuss_secret_for_{customer_id}"))
        })
    }

    fn check_health<'a>(&'a self, ctx: &'a RegionContext) -> EngineFuture<'a, ()> {
        Box::pin(async move { self.record("check_health", ctx, "", None) })
    }
}

// ── Event payloads ──────────────────────────────────────────────────────────

pub fn event(kind: &str, object: Value, previous: Option<Value>) -> Value {
    let mut data = json!({ "object": object });
    if let Some(previous) = previous {
        data["previous_attributes"] = previous;
    }
    json!({
        "id": "evt_test_1",
        "object": "event",
        "type": kind,
        "created": 1_700_000_000,
        "livemode": false,
        "data": data,
    })
}

pub fn intent_object(id: &str, payment_id: &str, amount: i64, currency: &str) -> Value {
    json!({
        "id": id,
        "object": "payment_intent",
        "amount": amount,
        "amount_received": amount,
        "currency": currency,
        "status": "succeeded",
        "capture_method": "automatic",
        "metadata": { "ct_payment_id": payment_id, "cart_id": "cart-1" },
        "latest_charge": "ch_test_1",
    })
}

pub fn multicapture_intent_object(id: &str, payment_id: &str, amount: i64) -> Value {
    let mut object = intent_object(id, payment_id, amount, "usd");
    object["capture_method"] = json!("manual");
    object["payment_method_options"] = json!({ "card": { "request_multicapture": "if_available" } });
    object
}

pub fn charge_object(payment_id: &str, intent_id: &str, currency: &str) -> Value {
    json!({
        "id": "ch_test_1",
        "object": "charge",
        "amount": 50000,
        "amount_captured": 50000,
        "amount_refunded": 0,
        "captured": true,
        "currency": currency,
        "created": 1_700_000_000,
        "payment_intent": intent_id,
        "balance_transaction": "txn_test_1",
        "metadata": { "ct_payment_id": payment_id },
    })
}

pub fn refund(id: &str, amount: i64, currency: &str) -> PspRefund {
    PspRefund {
        id: id.into(),
        amount,
        currency: currency.into(),
        created: 1_700_000_050,
        status: Some("succeeded".into()),
    }
}

pub fn balance_transaction(id: &str, amount: i64) -> PspBalanceTransaction {
    PspBalanceTransaction {
        id: id.into(),
        amount,
        currency: "usd".into(),
    }
}
