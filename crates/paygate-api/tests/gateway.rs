//! End-to-end gateway scenarios against a stubbed acquirer
//!
//! The stub speaks the acquirer REST dialect on a real TCP port so the
//! adapter exercises its actual wire client; the gateway itself runs on
//! in-memory stores.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Form, Json, Router};
use axum_test::TestServer;
use serde_json::{json, Value};

use paygate_api::{create_router, AppState};
use paygate_core::channels::alfabank::{
    AlfaBankChannelFactory, ALFABANK_CHANNEL_ID, ALFABANK_CHANNEL_KEY,
};
use paygate_core::{
    CardInstrument, PluginRegistry, TransactionService, VisaMasterRouterFactory,
    CARD_INSTRUMENT_ID, CARD_INSTRUMENT_KEY, VISAMASTER_ROUTER_ID, VISAMASTER_ROUTER_KEY,
};
use paygate_store::{
    AccountRepository as _, ChannelRepository as _, ChannelSpec, CurrencyRepository as _,
    InstrumentRepository as _, ProfileRepository as _, RouteRepository as _, SessionStore as _,
    Stores,
};
use paygate_types::{Account, Currency, Profile, Route, Router as RouterEntity};

// ----------------------------------------------------------------------
// Stub acquirer
// ----------------------------------------------------------------------

#[derive(Default)]
struct StubState {
    /// Scripted responses for successive paymentorder calls
    payment: VecDeque<Value>,
    /// Scripted register response (orderId "Z1" by default)
    register: Option<Value>,
    /// Scripted order-status response
    status: Option<Value>,
    /// Every (endpoint, form) the stub received, in order
    requests: Vec<(String, HashMap<String, String>)>,
}

#[derive(Clone)]
struct StubAcquirer {
    state: Arc<Mutex<StubState>>,
    base_url: String,
}

impl StubAcquirer {
    async fn start() -> Self {
        let state = Arc::new(Mutex::new(StubState::default()));

        let app = Router::new()
            .route("/rest/:endpoint", post(stub_endpoint))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { state, base_url }
    }

    fn script_payment(&self, response: Value) {
        self.state.lock().unwrap().payment.push_back(response);
    }

    fn script_register(&self, response: Value) {
        self.state.lock().unwrap().register = Some(response);
    }

    fn script_status(&self, response: Value) {
        self.state.lock().unwrap().status = Some(response);
    }

    fn requests_to(&self, endpoint: &str) -> Vec<HashMap<String, String>> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(e, _)| e == endpoint)
            .map(|(_, form)| form.clone())
            .collect()
    }
}

async fn stub_endpoint(
    State(state): State<Arc<Mutex<StubState>>>,
    Path(endpoint): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    let mut stub = state.lock().unwrap();
    stub.requests.push((endpoint.clone(), form));

    let response = match endpoint.as_str() {
        "register.do" | "registerPreAuth.do" => stub
            .register
            .clone()
            .unwrap_or_else(|| json!({"orderId": "Z1"})),
        "paymentorder.do" => stub.payment.pop_front().unwrap_or_else(|| json!({})),
        "getOrderStatusExtended.do" => stub
            .status
            .clone()
            .unwrap_or_else(|| json!({"orderStatus": 2})),
        "finish3ds.do" | "finish3dsVer2.do" | "deposit.do" | "reverse.do" | "refund.do"
        | "paymentOrderBinding.do" => json!({"errorCode": "0"}),
        _ => json!({"errorCode": "5", "errorMessage": "unknown endpoint"}),
    };
    Json(response)
}

// ----------------------------------------------------------------------
// Gateway fixture
// ----------------------------------------------------------------------

struct Gateway {
    server: TestServer,
    stores: Stores,
    profile_id: i32,
}

struct AccountFlags {
    partial_confirm: bool,
    partial_refund: bool,
    rebill: bool,
}

impl Default for AccountFlags {
    fn default() -> Self {
        Self {
            partial_confirm: false,
            partial_refund: false,
            rebill: false,
        }
    }
}

async fn seed_account(stores: &Stores, flags: &AccountFlags) -> Account {
    let (_, channels) = stores
        .channels
        .query(&ChannelSpec::ById(ALFABANK_CHANNEL_ID))
        .await
        .unwrap();
    let (_, currencies) = stores
        .currencies
        .query(&paygate_store::CurrencySpec::ByNumericCode(643))
        .await
        .unwrap();

    let mut account = Account {
        id: 0,
        is_enabled: true,
        is_test: true,
        rebill_enabled: flags.rebill,
        refund_enabled: true,
        reversal_enabled: true,
        partial_confirm_enabled: flags.partial_confirm,
        partial_reversal_enabled: false,
        partial_refund_enabled: flags.partial_refund,
        currency_conversion_enabled: false,
        currency: currencies[0].clone(),
        channel: channels[0].clone(),
        settings: json!({"login": "merchant", "password": "secret"}),
    };
    stores.accounts.add(&mut account).await.unwrap();
    account
}

/// Boot a gateway whose route goes through the visamaster router over
/// two accounts; returns (gateway, visa account id, mastercard account id).
async fn gateway_with_router(acquirer: &StubAcquirer) -> (Gateway, i32, i32) {
    let stores = Stores::in_memory();
    let (registry, mut currency) = base_registry(acquirer, &stores).await;
    stores.currencies.add(&mut currency).await.unwrap();

    let mut profile = Profile {
        id: 0,
        key: "shop".into(),
        description: "test shop".into(),
        currency: currency.clone(),
    };
    stores.profiles.add(&mut profile).await.unwrap();

    let visa_acc = seed_account(&stores, &AccountFlags::default()).await;
    let master_acc = seed_account(&stores, &AccountFlags::default()).await;

    let (_, instruments) = stores
        .instruments
        .query(&paygate_store::InstrumentSpec::ById(CARD_INSTRUMENT_ID))
        .await
        .unwrap();
    let mut route = Route {
        id: 0,
        profile: profile.clone(),
        instrument: instruments[0].clone(),
        account: None,
        router: Some(RouterEntity {
            id: VISAMASTER_ROUTER_ID,
            key: VISAMASTER_ROUTER_KEY.into(),
        }),
        settings: Some(json!({"visa_acc": visa_acc.id, "master_acc": master_acc.id})),
    };
    stores.routes.add(&mut route).await.unwrap();

    let gateway = finish_gateway(stores, registry, profile.id);
    (gateway, visa_acc.id, master_acc.id)
}

/// Boot a gateway on in-memory stores with a seeded profile and a direct
/// route to one alfabank account.
async fn gateway_with_account(acquirer: &StubAcquirer, flags: AccountFlags) -> (Gateway, Account) {
    let stores = Stores::in_memory();
    let (registry, mut currency) = base_registry(acquirer, &stores).await;
    stores.currencies.add(&mut currency).await.unwrap();

    let mut profile = Profile {
        id: 0,
        key: "shop".into(),
        description: "test shop".into(),
        currency: currency.clone(),
    };
    stores.profiles.add(&mut profile).await.unwrap();

    let account = seed_account(&stores, &flags).await;

    let (_, instruments) = stores
        .instruments
        .query(&paygate_store::InstrumentSpec::ById(CARD_INSTRUMENT_ID))
        .await
        .unwrap();
    let mut route = Route {
        id: 0,
        profile: profile.clone(),
        instrument: instruments[0].clone(),
        account: Some(account.clone()),
        router: None,
        settings: None,
    };
    stores.routes.add(&mut route).await.unwrap();

    let gateway = finish_gateway(stores, registry, profile.id);
    (gateway, account)
}

/// Register the plugins, reconcile the persisted mirrors, and hand back
/// the registry plus the currency every fixture seeds.
async fn base_registry(acquirer: &StubAcquirer, stores: &Stores) -> (PluginRegistry, Currency) {
    let http = reqwest::Client::new();
    let registry = PluginRegistry::builder()
        .bank_channel(
            ALFABANK_CHANNEL_ID,
            ALFABANK_CHANNEL_KEY,
            Arc::new(AlfaBankChannelFactory::new(
                http,
                acquirer.base_url.clone(),
                stores.sessions.clone(),
                stores.transactions.clone(),
            )),
        )
        .unwrap()
        .instrument(
            CARD_INSTRUMENT_ID,
            CARD_INSTRUMENT_KEY,
            Arc::new(CardInstrument::new(stores.cards.clone())),
        )
        .unwrap()
        .router(
            VISAMASTER_ROUTER_ID,
            VISAMASTER_ROUTER_KEY,
            Arc::new(VisaMasterRouterFactory::new(stores.accounts.clone())),
        )
        .unwrap()
        .build();

    registry
        .reconcile(&*stores.channels, &*stores.instruments, &*stores.routers)
        .await
        .unwrap();

    let currency = Currency {
        id: 0,
        numeric_code: 643,
        char_code: "RUB".into(),
        name: "Russian rouble".into(),
        exponent: 2,
    };
    (registry, currency)
}

fn finish_gateway(stores: Stores, registry: PluginRegistry, profile_id: i32) -> Gateway {
    let service = TransactionService::new(stores.clone(), Arc::new(registry));
    let state = Arc::new(AppState::new(stores.clone(), service));
    let server = TestServer::new(create_router(state)).unwrap();
    Gateway {
        server,
        stores,
        profile_id,
    }
}

fn authorize_body(pan: &str, amount: i64) -> Value {
    json!({
        "order_id": "order-1",
        "amount": amount,
        "customer": "customer-1",
        "card": {
            "pan": pan,
            "cvv": "123",
            "expire": "2027-12-01",
            "holder": "CARD HOLDER"
        },
        "threedsver2termurl": "https://merchant.test/term",
        "browser_info": {
            "user_agent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
            "accept_header": "*/*",
            "color_depth": 24,
            "ip": "10.0.0.1",
            "language": "en-US",
            "screen_height": 1080,
            "screen_width": 1920,
            "screen_print": "1920x1080x24",
            "tz": -120,
            "time_zone": "Europe/Berlin",
            "java_enabled": false,
            "device_channel": "browser"
        }
    })
}

// ----------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_frictionless_authorize() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_status(json!({
        "orderStatus": 2,
        "actionCode": 0,
        "authRefNum": "RRN-1",
        "cardAuthInfo": {"approvalCode": "OK1"}
    }));
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["remote_id"], "Z1");
    assert_eq!(body["rrn"], "RRN-1");
    assert_eq!(body["auth_code"], "OK1");

    let registers = acquirer.requests_to("register.do");
    assert_eq!(registers.len(), 1);
    assert_eq!(registers[0]["amount"], "1000");
    assert_eq!(registers[0]["currency"], "643");
}

#[tokio::test]
async fn test_3ds_v1_challenge() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_payment(json!({"acsUrl": "https://acs/", "paReq": "PA"}));
    acquirer.script_status(json!({"orderStatus": 1}));
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "wait_3ds");
    assert_eq!(body["three_ds_secure_10"]["acs"], "https://acs/");
    assert_eq!(body["three_ds_secure_10"]["pareq"], "PA");
    let tid = body["id"].as_i64().unwrap();

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/processpares",
            gw.profile_id
        ))
        .json(&json!({"pares": "PR"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");

    let finishes = acquirer.requests_to("finish3ds.do");
    assert_eq!(finishes.len(), 1);
    assert_eq!(finishes[0]["PaRes"], "PR");
    assert_eq!(finishes[0]["MD"], "Z1");
}

#[tokio::test]
async fn test_3ds_v2_with_method_url() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_payment(json!({
        "is3DSVer2": true,
        "threeDSServerTransId": "S",
        "threeDSMethodURL": "https://m/",
        "threeDSMethodDataPacked": "D"
    }));
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    // Step 1: card submission parks the flow on the method URL.
    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "wait_method_url");
    assert_eq!(body["three_ds_method_url"]["method_url"], "https://m/");
    assert_eq!(body["three_ds_method_url"]["method_data"], "D");
    let tid = body["id"].as_i64().unwrap();

    let session_key = format!("3ds20session_{tid}");
    let session = gw.stores.sessions.get(&session_key).await.unwrap();
    assert!(session.is_some(), "session {session_key} must be parked");

    // Step 2: method URL completion replays the card call and yields the
    // ACS challenge.
    acquirer.script_payment(json!({"acsUrl": "https://acs2/", "packedCReq": "CR"}));
    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/completemethodurl",
            gw.profile_id
        ))
        .json(&json!({"completed": true}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "wait_3ds");
    assert_eq!(body["three_ds_secure_20"]["acs"], "https://acs2/");
    assert_eq!(body["three_ds_secure_20"]["creq"], "CR");

    // The replayed card call must carry the parked server trans id.
    let payments = acquirer.requests_to("paymentorder.do");
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[1]["threeDSServerTransId"], "S");

    // Step 3: challenge result settles the payment.
    acquirer.script_status(json!({"orderStatus": 2}));
    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/processcres",
            gw.profile_id
        ))
        .json(&json!({"cres": "C"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");

    let finishes = acquirer.requests_to("finish3dsVer2.do");
    assert_eq!(finishes.len(), 1);
    assert_eq!(finishes[0]["tDsTransId"], "S");
}

#[tokio::test]
async fn test_partial_confirm_requires_account_flag() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_status(json!({"orderStatus": 1}));
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/preauthorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    let tid = body["id"].as_i64().unwrap();

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/confirm",
            gw.profile_id
        ))
        .json(&json!({"amount": 400}))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("partial confirm not allowed"));
}

#[tokio::test]
async fn test_double_confirm_is_rejected() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_status(json!({"orderStatus": 1}));
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/preauthorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await;
    let tid = response.json::<Value>()["id"].as_i64().unwrap();

    acquirer.script_status(json!({"orderStatus": 2}));
    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/confirm",
            gw.profile_id
        ))
        .json(&json!({"amount": 1000}))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "success");

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/confirm",
            gw.profile_id
        ))
        .json(&json!({"amount": 1000}))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("transaction has already confirmed"));
}

#[tokio::test]
async fn test_router_rewrites_account_by_network() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_status(json!({"orderStatus": 2}));
    let (gw, visa_id, master_id) = gateway_with_router(&acquirer).await;

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["account"]["id"].as_i64().unwrap() as i32, visa_id);

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("5555555555554444", 1000))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["account"]["id"].as_i64().unwrap() as i32, master_id);
}

// ----------------------------------------------------------------------
// Cross-cutting properties
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_get_matches_mutating_response() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_status(json!({"orderStatus": 2}));
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    let posted: Value = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await
        .json();
    let tid = posted["id"].as_i64().unwrap();

    let fetched: Value = gw
        .server
        .get(&format!("/profiles/{}/transactions/{tid}", gw.profile_id))
        .await
        .json();

    assert_eq!(posted, fetched);
}

#[tokio::test]
async fn test_callback_on_terminal_transaction_is_rejected() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_status(json!({"orderStatus": 2}));
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    let posted: Value = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await
        .json();
    assert_eq!(posted["status"], "success");
    let tid = posted["id"].as_i64().unwrap();

    let finishes_before = acquirer.requests_to("finish3dsVer2.do").len();
    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/processcres",
            gw.profile_id
        ))
        .json(&json!({"cres": "C"}))
        .await;
    response.assert_status_bad_request();

    // No acquirer call, no persisted change.
    assert_eq!(acquirer.requests_to("finish3dsVer2.do").len(), finishes_before);
    let fetched: Value = gw
        .server
        .get(&format!("/profiles/{}/transactions/{tid}", gw.profile_id))
        .await
        .json();
    assert_eq!(fetched["status"], "success");
}

#[tokio::test]
async fn test_unknown_profile_is_404() {
    let acquirer = StubAcquirer::start().await;
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    let response = gw
        .server
        .post("/profiles/999/transactions/authorize/card")
        .json(&authorize_body("4111111111111111", 1000))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_acquirer_decline_stays_200() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_register(json!({"errorCode": 5, "errorMessage": "access denied"}));
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "declined");
    assert_eq!(body["decline_reason"], "access denied");
    assert_eq!(body["response_code"], "5");
}

#[tokio::test]
async fn test_refund_budget_spans_prior_refunds() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_status(json!({"orderStatus": 2}));
    let (gw, _) = gateway_with_account(
        &acquirer,
        AccountFlags {
            partial_refund: true,
            ..AccountFlags::default()
        },
    )
    .await;

    let posted: Value = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await
        .json();
    let tid = posted["id"].as_i64().unwrap();

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/refund",
            gw.profile_id
        ))
        .json(&json!({"amount": 700}))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "success");

    // 700 of 1000 is gone; another 700 must not pass.
    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/refund",
            gw.profile_id
        ))
        .json(&json!({"amount": 700}))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("exceeds available"));
}

#[tokio::test]
async fn test_reverse_settles_on_acquirer_ack() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_status(json!({"orderStatus": 1}));
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    let posted: Value = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/preauthorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await
        .json();
    let tid = posted["id"].as_i64().unwrap();

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/reverse",
            gw.profile_id
        ))
        .json(&json!({"amount": 1000}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["remote_id"], "Z1");

    let reversals = acquirer.requests_to("reverse.do");
    assert_eq!(reversals.len(), 1);
    assert_eq!(reversals[0]["orderId"], "Z1");
    assert_eq!(reversals[0]["amount"], "1000");
}

#[tokio::test]
async fn test_rebill_pays_by_stored_binding() {
    let acquirer = StubAcquirer::start().await;
    acquirer.script_status(json!({
        "orderStatus": 2,
        "bindingInfo": {"bindingId": "B1"}
    }));
    let (gw, _) = gateway_with_account(
        &acquirer,
        AccountFlags {
            rebill: true,
            ..AccountFlags::default()
        },
    )
    .await;

    let posted: Value = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&authorize_body("4111111111111111", 1000))
        .await
        .json();
    assert_eq!(posted["additional_data"]["bindingId"], "B1");
    let tid = posted["id"].as_i64().unwrap();

    acquirer.script_register(json!({"orderId": "Z9"}));
    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/{tid}/rebill",
            gw.profile_id
        ))
        .json(&json!({"amount": 500}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["remote_id"], "Z9");

    let bindings = acquirer.requests_to("paymentOrderBinding.do");
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0]["mdOrder"], "Z9");
    assert_eq!(bindings[0]["bindingId"], "B1");
}

#[tokio::test]
async fn test_unknown_body_field_is_400() {
    let acquirer = StubAcquirer::start().await;
    let (gw, _) = gateway_with_account(&acquirer, AccountFlags::default()).await;

    let mut body = authorize_body("4111111111111111", 1000);
    body["surprise"] = json!(true);

    let response = gw
        .server
        .post(&format!(
            "/profiles/{}/transactions/authorize/card",
            gw.profile_id
        ))
        .json(&body)
        .await;
    response.assert_status_bad_request();
}
