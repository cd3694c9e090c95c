//! AlfaBank acquirer channel
//!
//! REST wire protocol with the full 3-D Secure matrix: frictionless,
//! 3DS v1 (PaReq/PaRes), and 3DS v2 with optional method-URL probing and
//! browser fingerprinting. Interactive-flow context is parked in the
//! session store between callbacks.

mod client;
mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use paygate_store::{SessionStore, TransactionRepository, TransactionSpec, TurnOver};
use paygate_types::{
    threeds20_session_key, Account, Session, ThreeDsMethodUrl, ThreeDsSecure10, ThreeDsSecure20,
    Transaction, TransactionStatus, TransactionType,
};
use serde::Deserialize;

use crate::channel::{BankChannel, BankChannelFactory, ChannelError};
use crate::error::CoreError;
use crate::request::CardPaymentRequest;

use client::AlfaBankClient;
use wire::{
    device_from_ua, find_last_url, platform_from_ua, ErrorFields, OrderStatusResponse,
    PaymentOrderResponse, RegisterResponse,
};

/// Durable identity of the AlfaBank channel plugin.
pub const ALFABANK_CHANNEL_ID: i32 = 2;
pub const ALFABANK_CHANNEL_KEY: &str = "alfabank";

const REGISTER_PATH: &str = "rest/register.do";
const REGISTER_PREAUTH_PATH: &str = "rest/registerPreAuth.do";
const PAYMENT_ORDER_PATH: &str = "rest/paymentorder.do";
const FINISH_3DS_PATH: &str = "rest/finish3ds.do";
const FINISH_3DS_V2_PATH: &str = "rest/finish3dsVer2.do";
const ORDER_STATUS_PATH: &str = "rest/getOrderStatusExtended.do";
const DEPOSIT_PATH: &str = "rest/deposit.do";
const REVERSE_PATH: &str = "rest/reverse.do";
const REFUND_PATH: &str = "rest/refund.do";
const PAYMENT_BINDING_PATH: &str = "rest/paymentOrderBinding.do";

const SESSION_TDS_TRANS_ID: &str = "tdsTransId";
const SESSION_RETRY_QUERY: &str = "retryQuery";

/// Account settings decoded by this channel.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AlfaBankSettings {
    login: String,
    password: String,
}

pub struct AlfaBankChannelFactory {
    http: reqwest::Client,
    base_url: String,
    sessions: Arc<dyn SessionStore>,
    transactions: Arc<dyn TransactionRepository>,
}

impl AlfaBankChannelFactory {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        sessions: Arc<dyn SessionStore>,
        transactions: Arc<dyn TransactionRepository>,
    ) -> Self {
        Self {
            http,
            base_url,
            sessions,
            transactions,
        }
    }
}

impl BankChannelFactory for AlfaBankChannelFactory {
    fn create(&self, account: &Account) -> Result<Box<dyn BankChannel>, CoreError> {
        let settings: AlfaBankSettings = serde_json::from_value(account.settings.clone())
            .map_err(|e| CoreError::Validation(format!("alfabank account settings: {e}")))?;

        Ok(Box::new(AlfaBankChannel {
            client: AlfaBankClient::new(
                self.http.clone(),
                self.base_url.clone(),
                settings.login,
                settings.password,
            ),
            sessions: self.sessions.clone(),
            transactions: self.transactions.clone(),
        }))
    }
}

pub struct AlfaBankChannel {
    client: AlfaBankClient,
    sessions: Arc<dyn SessionStore>,
    transactions: Arc<dyn TransactionRepository>,
}

impl AlfaBankChannel {
    // ------------------------------------------------------------------
    // Root payment flow
    // ------------------------------------------------------------------

    async fn pay(
        &self,
        register_path: &str,
        tx: &mut Transaction,
        request: &CardPaymentRequest,
    ) -> Result<(), ChannelError> {
        self.register_order(register_path, tx, request).await?;

        // From here on the order exists on the acquirer side; any failure
        // must fall through to a status query so the transaction never
        // stays New for a registered order.
        let card_query = self.card_query(tx, request);
        let response = match self.client.post(PAYMENT_ORDER_PATH, &card_query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(tx = tx.id, error = %e, "card submission failed, settling by status");
                return self.settle(tx).await;
            }
        };
        let payment = PaymentOrderResponse::parse(&response);

        if payment.is_3ds_ver2 {
            return self.continue_3ds_v2(tx, request, card_query, payment).await;
        }

        if let (Some(acs), Some(pareq)) = (payment.acs_url.clone(), payment.pa_req.clone()) {
            tx.three_ds_secure_10 = Some(ThreeDsSecure10 { acs, pareq });
            tx.wait_3ds();
            return Ok(());
        }

        self.settle(tx).await
    }

    async fn register_order(
        &self,
        path: &str,
        tx: &mut Transaction,
        request: &CardPaymentRequest,
    ) -> Result<(), ChannelError> {
        let mut params = vec![
            ("orderNumber".to_string(), tx.id.to_string()),
            ("amount".to_string(), tx.amount.to_string()),
            ("currency".to_string(), tx.currency.numeric_code.to_string()),
            ("clientId".to_string(), tx.customer.clone()),
        ];
        if let Some(url) = &request.return_url {
            params.push(("returnUrl".to_string(), url.clone()));
        }

        let response = self.client.post(path, &params).await?;
        let register = RegisterResponse::parse(&response);

        match register.order_id {
            Some(order_id) => {
                tx.remote_id = Some(order_id);
                Ok(())
            }
            None => {
                tx.response_code = register.error.code.clone();
                Err(ChannelError::Processing(
                    register.error.message_or("order registration failed"),
                ))
            }
        }
    }

    fn card_query(&self, tx: &Transaction, request: &CardPaymentRequest) -> Vec<(String, String)> {
        let remote_id = tx.remote_id.clone().unwrap_or_default();
        let mut params = vec![
            ("MDORDER".to_string(), remote_id),
            ("$PAN".to_string(), request.card.pan.clone()),
            ("$CVC".to_string(), request.card.cvv.clone()),
            ("YYYY".to_string(), request.card.expire.format("%Y").to_string()),
            ("MM".to_string(), request.card.expire.format("%m").to_string()),
            ("TEXT".to_string(), request.card.holder.clone()),
        ];
        if let Some(url) = &request.threedsver2_term_url {
            params.push(("threeDSVer2TermUrl".to_string(), url.clone()));
        }
        params
    }

    async fn continue_3ds_v2(
        &self,
        tx: &mut Transaction,
        request: &CardPaymentRequest,
        card_query: Vec<(String, String)>,
        payment: PaymentOrderResponse,
    ) -> Result<(), ChannelError> {
        let tds_trans_id = match payment.tds_server_trans_id.clone() {
            Some(id) => id,
            None => {
                tracing::warn!(tx = tx.id, "3ds v2 response without server trans id");
                return self.settle(tx).await;
            }
        };

        let mut retry_query = card_query;
        retry_query.push(("threeDSServerTransId".to_string(), tds_trans_id.clone()));

        if let (Some(method_url), Some(method_data)) =
            (payment.method_url.clone(), payment.method_data_packed.clone())
        {
            // Park the retry query so the completion callback can replay
            // the card submission, then hand the probe to the client.
            let mut session = Session::new(threeds20_session_key(tx.id));
            session.insert(SESSION_TDS_TRANS_ID, tds_trans_id);
            session.insert(
                SESSION_RETRY_QUERY,
                serde_json::to_value(&retry_query)
                    .map_err(|e| ChannelError::Processing(format!("session encode: {e}")))?,
            );
            self.sessions.add(session).await?;

            tx.three_ds_method_url = Some(ThreeDsMethodUrl {
                method_url,
                method_data,
            });
            tx.wait_method_url();
            return Ok(());
        }

        if let Some(server_url) = payment.method_url_server.clone() {
            if let Err(e) = self.fingerprint_browser(tx, request, &server_url).await {
                tracing::warn!(tx = tx.id, error = %e, "browser fingerprint failed");
            }
        }

        let response = match self.client.post(PAYMENT_ORDER_PATH, &retry_query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(tx = tx.id, error = %e, "3ds v2 retry failed, settling by status");
                return self.settle(tx).await;
            }
        };
        let retry = PaymentOrderResponse::parse(&response);

        if let (Some(acs), Some(creq)) = (retry.acs_url, retry.packed_creq) {
            tx.three_ds_secure_20 = Some(ThreeDsSecure20 { acs, creq });
            tx.wait_3ds();
            return Ok(());
        }

        self.settle(tx).await
    }

    /// Submit the ClientInfo block derived from the merchant-supplied
    /// browser environment. The method-URL server responds with markup
    /// whose last URL is the actual collection endpoint.
    async fn fingerprint_browser(
        &self,
        tx: &Transaction,
        request: &CardPaymentRequest,
        server_url: &str,
    ) -> Result<(), ChannelError> {
        let browser = request.browser_info.as_ref().ok_or_else(|| {
            ChannelError::Processing("browser info required for 3ds v2 fingerprint".into())
        })?;

        let client_info = vec![
            ("userAgent".to_string(), browser.user_agent.clone()),
            (
                "os".to_string(),
                platform_from_ua(&browser.user_agent).to_string(),
            ),
            (
                "deviceType".to_string(),
                device_from_ua(&browser.user_agent).to_string(),
            ),
            ("colorDepth".to_string(), browser.color_depth.to_string()),
            ("screenHeight".to_string(), browser.screen_height.to_string()),
            ("screenWidth".to_string(), browser.screen_width.to_string()),
            ("language".to_string(), browser.language.clone()),
            ("timeZone".to_string(), browser.tz.to_string()),
            ("javaEnabled".to_string(), browser.java_enabled.to_string()),
        ];

        let body = self.client.post_text(server_url, &client_info).await?;
        let endpoint = find_last_url(&body).ok_or_else(|| {
            ChannelError::Processing("no client-info endpoint in method-url-server response".into())
        })?;

        tracing::debug!(tx = tx.id, endpoint = %endpoint, "submitting client info");
        self.client.post_text(&endpoint, &client_info).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Status settlement
    // ------------------------------------------------------------------

    /// Query the order status and write the outcome into the
    /// transaction. Status 1 and 2 settle as success, 6 as declined;
    /// anything else leaves the transaction as it is.
    async fn settle(&self, tx: &mut Transaction) -> Result<(), ChannelError> {
        let order_id = tx
            .remote_id
            .clone()
            .ok_or_else(|| ChannelError::Processing("transaction has no remote order id".into()))?;

        let response = self
            .client
            .post(ORDER_STATUS_PATH, &[("orderId".to_string(), order_id)])
            .await?;
        let status = OrderStatusResponse::parse(&response);

        if let Some(code) = status.action_code.clone() {
            tx.response_code = Some(code);
        }
        if let Some(rrn) = status.auth_ref_num.clone() {
            tx.rrn = Some(rrn);
        }
        if let Some(approval) = status.approval_code.clone() {
            tx.auth_code = Some(approval);
        }
        if let Some(binding_id) = status.binding_id.clone() {
            let extras = tx
                .additional_data
                .get_or_insert_with(|| serde_json::json!({}));
            if let Some(map) = extras.as_object_mut() {
                map.insert("bindingId".to_string(), binding_id.into());
            }
        }

        match status.order_status {
            Some(1) | Some(2) => tx.success(),
            Some(6) => {
                let reason = status
                    .action_code_description
                    .unwrap_or_else(|| "declined by acquirer".to_string());
                tx.declined(reason);
            }
            other => {
                tracing::warn!(tx = tx.id, order_status = ?other, "indeterminate order status");
            }
        }

        Ok(())
    }

    async fn turn_over_for(
        &self,
        reference_id: i64,
    ) -> Result<std::collections::HashMap<TransactionType, TurnOver>, ChannelError> {
        Ok(self
            .transactions
            .type_turn_over(&TransactionSpec::ByReferenceAndStatus {
                reference_id,
                status: TransactionStatus::Success,
            })
            .await?)
    }

    fn reference_of(tx: &Transaction) -> Result<&Transaction, ChannelError> {
        tx.reference
            .as_deref()
            .ok_or_else(|| ChannelError::Processing("transaction has no reference".into()))
    }

    fn remote_of(reference: &Transaction) -> Result<String, ChannelError> {
        reference.remote_id.clone().ok_or_else(|| {
            ChannelError::Processing("reference transaction has no remote order id".into())
        })
    }

    /// Fail on a non-zero errorCode, recording it on the transaction.
    fn check_error(tx: &mut Transaction, response: &serde_json::Value, what: &str) -> Result<(), ChannelError> {
        let error = ErrorFields::parse(response);
        if error.is_error() {
            tx.response_code = error.code.clone();
            return Err(ChannelError::Processing(
                error.message_or(&format!("{what} failed")),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BankChannel for AlfaBankChannel {
    async fn authorize(
        &self,
        tx: &mut Transaction,
        request: &CardPaymentRequest,
    ) -> Result<(), ChannelError> {
        self.pay(REGISTER_PATH, tx, request).await
    }

    async fn preauthorize(
        &self,
        tx: &mut Transaction,
        request: &CardPaymentRequest,
    ) -> Result<(), ChannelError> {
        self.pay(REGISTER_PREAUTH_PATH, tx, request).await
    }

    async fn confirm(&self, tx: &mut Transaction) -> Result<(), ChannelError> {
        let reference = Self::reference_of(tx)?.clone();
        let turn_over = self.turn_over_for(reference.id).await?;

        // Single partial confirm policy: one successful capture per
        // preauth, whatever its amount.
        if turn_over.contains_key(&TransactionType::Confirmauth) {
            return Err(ChannelError::Guard(
                "transaction has already confirmed".into(),
            ));
        }

        let reversed = turn_over
            .get(&TransactionType::Reversal)
            .map(|t| t.sum)
            .unwrap_or(0);
        let available = reference.amount - reversed;
        if tx.amount > available {
            return Err(ChannelError::Guard(format!(
                "confirm amount {} exceeds available {}",
                tx.amount, available
            )));
        }

        let remote_id = Self::remote_of(&reference)?;
        let response = self
            .client
            .post(
                DEPOSIT_PATH,
                &[
                    ("orderId".to_string(), remote_id.clone()),
                    ("amount".to_string(), tx.amount.to_string()),
                ],
            )
            .await?;
        Self::check_error(tx, &response, "deposit")?;

        tx.remote_id = Some(remote_id);
        self.settle(tx).await
    }

    async fn reverse(&self, tx: &mut Transaction) -> Result<(), ChannelError> {
        let reference = Self::reference_of(tx)?.clone();
        let remote_id = Self::remote_of(&reference)?;

        let response = self
            .client
            .post(
                REVERSE_PATH,
                &[
                    ("orderId".to_string(), remote_id.clone()),
                    ("amount".to_string(), tx.amount.to_string()),
                ],
            )
            .await?;
        Self::check_error(tx, &response, "reversal")?;

        tx.remote_id = Some(remote_id);
        tx.success();
        Ok(())
    }

    async fn refund(&self, tx: &mut Transaction) -> Result<(), ChannelError> {
        let reference = Self::reference_of(tx)?.clone();
        let remote_id = Self::remote_of(&reference)?;

        let response = self
            .client
            .post(
                REFUND_PATH,
                &[
                    ("orderId".to_string(), remote_id.clone()),
                    ("amount".to_string(), tx.amount.to_string()),
                ],
            )
            .await?;
        Self::check_error(tx, &response, "refund")?;

        tx.remote_id = Some(remote_id);
        tx.success();
        Ok(())
    }

    async fn rebill(&self, tx: &mut Transaction) -> Result<(), ChannelError> {
        let reference = Self::reference_of(tx)?.clone();
        let binding_id = reference
            .additional_data
            .as_ref()
            .and_then(|extras| extras.get("bindingId"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ChannelError::Guard("reference transaction has no binding for rebill".into())
            })?;

        let response = self
            .client
            .post(
                REGISTER_PATH,
                &[
                    ("orderNumber".to_string(), tx.id.to_string()),
                    ("amount".to_string(), tx.amount.to_string()),
                    ("currency".to_string(), tx.currency.numeric_code.to_string()),
                    ("clientId".to_string(), tx.customer.clone()),
                ],
            )
            .await?;
        let register = RegisterResponse::parse(&response);
        let remote_id = match register.order_id {
            Some(order_id) => order_id,
            None => {
                tx.response_code = register.error.code.clone();
                return Err(ChannelError::Processing(
                    register.error.message_or("rebill order registration failed"),
                ));
            }
        };
        tx.remote_id = Some(remote_id.clone());

        let response = self
            .client
            .post(
                PAYMENT_BINDING_PATH,
                &[
                    ("mdOrder".to_string(), remote_id),
                    ("bindingId".to_string(), binding_id),
                ],
            )
            .await?;
        Self::check_error(tx, &response, "binding payment")?;

        self.settle(tx).await
    }

    async fn process_pares(&self, tx: &mut Transaction, pares: &str) -> Result<(), ChannelError> {
        let remote_id = tx
            .remote_id
            .clone()
            .ok_or_else(|| ChannelError::Processing("transaction has no remote order id".into()))?;

        let response = self
            .client
            .post(
                FINISH_3DS_PATH,
                &[
                    ("PaRes".to_string(), pares.to_string()),
                    ("MD".to_string(), remote_id),
                ],
            )
            .await?;
        Self::check_error(tx, &response, "3ds finish")?;

        self.settle(tx).await
    }

    async fn process_cres(&self, tx: &mut Transaction, _cres: &str) -> Result<(), ChannelError> {
        // The ACS delivers the CRes to the acquirer directly; the
        // callback only proves the challenge round finished. Resume from
        // the parked server transaction id.
        let key = threeds20_session_key(tx.id);
        let session = self
            .sessions
            .get(&key)
            .await?
            .ok_or_else(|| ChannelError::Processing(format!("session {key} not found")))?;
        let tds_trans_id = session
            .get_str(SESSION_TDS_TRANS_ID)
            .ok_or_else(|| {
                ChannelError::Processing(format!("session {key} has no server trans id"))
            })?
            .to_string();

        let response = self
            .client
            .post(
                FINISH_3DS_V2_PATH,
                &[("tDsTransId".to_string(), tds_trans_id)],
            )
            .await?;
        Self::check_error(tx, &response, "3ds v2 finish")?;

        self.settle(tx).await
    }

    async fn complete_method_url(
        &self,
        tx: &mut Transaction,
        completed: bool,
    ) -> Result<(), ChannelError> {
        if !completed {
            tx.declined("3ds method url completion failed");
            return Ok(());
        }

        let key = threeds20_session_key(tx.id);
        let session = self
            .sessions
            .get(&key)
            .await?
            .ok_or_else(|| ChannelError::Processing(format!("session {key} not found")))?;
        let retry_query: Vec<(String, String)> = session
            .data
            .get(SESSION_RETRY_QUERY)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ChannelError::Processing(format!("session decode: {e}")))?
            .ok_or_else(|| {
                ChannelError::Processing(format!("session {key} has no parked card query"))
            })?;

        let response = self.client.post(PAYMENT_ORDER_PATH, &retry_query).await?;
        let payment = PaymentOrderResponse::parse(&response);

        if let (Some(acs), Some(creq)) = (payment.acs_url, payment.packed_creq) {
            tx.three_ds_secure_20 = Some(ThreeDsSecure20 { acs, creq });
            tx.wait_3ds();
            return Ok(());
        }

        self.settle(tx).await
    }
}
