//! Payment confirmation use cases.
//!
//! Both entry flows (browser return and webhook) converge on
//! [`PaymentRecorder`]; the webhook flow additionally depends on the
//! signature verifier, and both flows use [`FeeResolver`] to extract the
//! processor fee.

mod create_checkout;
mod handle_return;
mod handle_webhook;
mod record_payment;
mod resolve_fee;

pub use create_checkout::{
    CheckoutCreated, CheckoutError, CreateCheckoutCommand, CreateCheckoutHandler,
};
pub use handle_return::{
    HandleReturnCommand, HandleReturnHandler, RedirectOutcome, ReturnRejection,
};
pub use handle_webhook::{HandleWebhookCommand, HandleWebhookHandler, WebhookOutcome};
pub use record_payment::{PaymentRecorder, RecordOutcome};
pub use resolve_fee::{FeeMethod, FeeResolver, ResolvedFee};
