//! Payload-versus-requirement checks that need no cryptography.

use crate::proto::{ErrorReason, PaymentPayload, PriceRequirement, SchemePayload, X402_VERSION};
use crate::timestamp::UnixTimestamp;

/// Checks that `payload` satisfies `requirement` at time `now`.
///
/// Checks run in a fixed order and stop at the first failure:
///
/// 1. protocol version is [`X402_VERSION`]
/// 2. scheme and network equal the requirement's
/// 3. authorized value equals `maxAmountRequired`, compared as strings
/// 4. recipient equals `payTo`, ignoring ASCII case
/// 5. `validBefore` is not earlier than `now`
///
/// `validAfter` is not checked.
///
/// # Errors
///
/// Returns the [`ErrorReason`] of the first failing check.
pub fn match_requirement(
    payload: &PaymentPayload,
    requirement: &PriceRequirement,
    now: UnixTimestamp,
) -> Result<(), ErrorReason> {
    if payload.x402_version != X402_VERSION {
        return Err(ErrorReason::UnsupportedVersion);
    }
    if payload.scheme() != requirement.scheme || payload.network != requirement.network {
        return Err(ErrorReason::SchemeOrNetworkMismatch);
    }
    match &payload.payload {
        SchemePayload::Exact(exact) => {
            let auth = &exact.authorization;
            if auth.value != requirement.max_amount_required {
                return Err(ErrorReason::AmountMismatch);
            }
            if !auth.to.to_string().eq_ignore_ascii_case(&requirement.pay_to) {
                return Err(ErrorReason::RecipientMismatch);
            }
            if auth.valid_before < now {
                return Err(ErrorReason::Expired);
            }
        }
    }
    Ok(())
}
