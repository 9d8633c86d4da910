//! The signing pipeline: nonce issuance and the serial-request state machine.

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use signet_assert::{assemble, Assertion, AssertionKind, Decoder, Headers};
use signet_keystore::KeyStore;

use crate::env::Env;
use crate::error::SignError;
use crate::resolver::resolve;

/// Issue a fresh request-id nonce for an authenticated model tenant.
pub async fn request_id(env: &Env, api_key: &str) -> Result<String, SignError> {
    check_api_key(env, api_key, "REQUESTID").await?;

    // Opportunistic sweep; a failure here must not block issuance.
    if let Err(e) = env.db.delete_expired_device_nonces().await {
        warn!(op = "REQUESTID", code = "delete-expired-nonces", error = %e, "Expiry sweep failed");
    }

    let nonce = env
        .db
        .create_device_nonce(env.config.nonce_ttl_secs)
        .await
        .map_err(|e| {
            warn!(op = "REQUESTID", code = "generate-request-id", error = %e, "Nonce creation failed");
            SignError::GenerateNonce
        })?;

    Ok(nonce.nonce)
}

/// Turn a serial-request stream into a signed serial assertion.
pub async fn sign_serial(env: &Env, api_key: &str, body: &[u8]) -> Result<Vec<u8>, SignError> {
    check_api_key(env, api_key, "SIGN").await?;

    let (request, model_assert) = decode_request_stream(body)?;

    if request.kind() != AssertionKind::SerialRequest {
        warn!(op = "SIGN", code = "invalid-type", "The assertion type must be 'serial-request'");
        return Err(SignError::InvalidType);
    }

    if let Some(model_assert) = &model_assert {
        check_optional_model(&request, model_assert)?;
    }

    let nonce = request.header("request-id").unwrap_or_default();
    let consumed = env.db.consume_device_nonce(nonce).await.map_err(|e| {
        warn!(op = "SIGN", code = "invalid-nonce", error = %e, "Nonce lookup failed");
        SignError::InvalidNonce
    })?;
    if nonce.is_empty() || !consumed {
        warn!(op = "SIGN", code = "invalid-nonce", "Nonce is invalid, expired or already used");
        return Err(SignError::InvalidNonce);
    }

    let brand_id = request.header("brand-id").unwrap_or_default().to_string();
    let declared_model = request.header("model").unwrap_or_default().to_string();
    let header_serial = request.header("serial").unwrap_or_default().to_string();

    let resolved = resolve(&env.db, &brand_id, &declared_model, &header_serial, api_key).await?;

    if resolved.model.key_active == 0 {
        warn!(op = "SIGN", code = "inactive-model", %brand_id, model = %declared_model, "Signing key is inactive");
        return Err(SignError::InactiveModel);
    }

    let serial = find_serial(&request, &header_serial)?;
    let fingerprint = request.sign_key_id().unwrap_or_default().to_string();

    let check = env
        .db
        .check_for_duplicate(&brand_id, &resolved.model_name, &serial, &fingerprint)
        .await
        .map_err(|e| {
            warn!(op = "SIGN", code = "duplicate-assertion", error = %e, "Duplicate check failed");
            SignError::CreateAssertion(e.to_string())
        })?;
    if check.key_swap {
        warn!(
            op = "SIGN",
            code = "duplicate-assertion",
            %brand_id,
            %serial,
            "The serial number was previously signed for a different device-key"
        );
    } else if check.duplicate {
        warn!(
            op = "SIGN",
            code = "duplicate-assertion",
            %brand_id,
            %serial,
            "The serial number and device-key have already been used to sign a device"
        );
    }
    let revision = check.max_revision + 1;

    let headers = serial_headers(&request, &resolved.model_name, &serial, revision);
    let serial_assertion = assemble(
        headers,
        request.body().to_vec(),
        request.content().to_vec(),
        request.signature().to_vec(),
    )
    .map_err(|e| {
        warn!(op = "SIGN", code = "create-assertion", error = %e, "Assertion assembly failed");
        SignError::CreateAssertion(e.to_string())
    })?;

    let keypair = env
        .db
        .get_keypair(&resolved.model.authority_id, &resolved.model.key_id)
        .await
        .map_err(|e| {
            warn!(op = "SIGN", code = "signing-assertion", error = %e, "Signing keypair not available");
            SignError::SigningAssertion(e.to_string())
        })?;

    let signed = env
        .keystore
        .sign(
            &keypair.authority_id,
            &keypair.key_id,
            &keypair.sealed_material,
            AssertionKind::Serial,
            serial_assertion.headers(),
            serial_assertion.body(),
        )
        .map_err(|e| {
            warn!(op = "SIGN", code = "signing-assertion", error = %e, "Keystore refused to sign");
            SignError::SigningAssertion(e.to_string())
        })?;

    env.db
        .create_signing_log(&brand_id, &resolved.model_name, &serial, revision, &fingerprint)
        .await
        .map_err(|e| {
            warn!(op = "SIGN", code = "logging-assertion", error = %e, "Signing log write failed");
            SignError::LoggingAssertion(e.to_string())
        })?;

    info!(op = "SIGN", %brand_id, model = %resolved.model_name, %serial, revision, "Serial assertion signed");

    Ok(signed)
}

/// Store a factory test artifact for the next replication sweep.
pub async fn store_test_log(
    env: &Env,
    api_key: &str,
    req: &crate::api::TestLogRequest,
) -> Result<(), SignError> {
    check_api_key(env, api_key, "TESTLOG").await?;

    env.db
        .create_test_log(&req.brand_id, &req.model, &req.filename, &req.data)
        .await
        .map_err(|e| {
            warn!(op = "TESTLOG", code = "logging-assertion", error = %e, "Test log write failed");
            SignError::LoggingAssertion(e.to_string())
        })?;

    Ok(())
}

/// Check the presented API key against the model tenants.
async fn check_api_key(env: &Env, api_key: &str, op: &'static str) -> Result<(), SignError> {
    let known = !api_key.is_empty()
        && env
            .db
            .api_key_exists(api_key)
            .await
            .map_err(|_| SignError::InvalidApiKey)?;
    if !known {
        warn!(op, code = "invalid-api-key", "Invalid API key used");
        return Err(SignError::InvalidApiKey);
    }
    Ok(())
}

/// Decode one mandatory serial-request and one optional model assertion;
/// the stream must end there.
fn decode_request_stream(body: &[u8]) -> Result<(Assertion, Option<Assertion>), SignError> {
    let mut decoder = Decoder::new(body);

    let request = match decoder.decode() {
        Ok(Some(assertion)) => assertion,
        Ok(None) => {
            warn!(op = "SIGN", code = "invalid-assertion", "No data supplied for signing");
            return Err(SignError::EmptyData);
        }
        Err(e) => {
            warn!(op = "SIGN", code = "invalid-assertion", error = %e, "Assertion decode failed");
            return Err(SignError::InvalidAssertion(e.to_string()));
        }
    };

    let model_assert = decoder.decode().map_err(|e| {
        warn!(op = "SIGN", code = "invalid-assertion", error = %e, "Assertion decode failed");
        SignError::InvalidAssertion(e.to_string())
    })?;

    match decoder.decode() {
        Ok(None) => {}
        Ok(Some(_)) => {
            warn!(op = "SIGN", code = "invalid-assertion", "Unexpected assertion in the request stream");
            return Err(SignError::InvalidAssertion(
                "unexpected assertion in the request stream".into(),
            ));
        }
        Err(e) => {
            warn!(op = "SIGN", code = "invalid-assertion", error = %e, "Assertion decode failed");
            return Err(SignError::InvalidAssertion(e.to_string()));
        }
    }

    Ok((request, model_assert))
}

/// The optional model assertion must agree with the serial-request.
fn check_optional_model(request: &Assertion, model_assert: &Assertion) -> Result<(), SignError> {
    if model_assert.kind() != AssertionKind::Model {
        warn!(op = "SIGN", code = "invalid-second-type", "The second assertion type must be 'model'");
        return Err(SignError::InvalidSecondType);
    }
    if model_assert.header("brand-id") != request.header("brand-id")
        || model_assert.header("model") != request.header("model")
    {
        warn!(op = "SIGN", code = "mismatched-model", "Model and serial-request assertion do not match");
        return Err(SignError::MismatchedModel);
    }
    Ok(())
}

/// Get the serial from the header, falling back to the body document.
///
/// The header takes precedence; the body is consulted only when the header
/// is absent or empty.
fn find_serial(request: &Assertion, header_serial: &str) -> Result<String, SignError> {
    if !header_serial.is_empty() {
        return Ok(header_serial.to_string());
    }

    let body_values = signet_assert::parse_key_values(request.body());
    match body_values.get("serial") {
        Some(serial) if !serial.is_empty() => Ok(serial.clone()),
        _ => {
            warn!(op = "SIGN", code = "empty-serial", "The serial is missing from the header and the body");
            Err(SignError::EmptySerial)
        }
    }
}

/// Build the serial assertion headers from the serial-request.
fn serial_headers(
    request: &Assertion,
    model_name: &str,
    serial: &str,
    revision: i64,
) -> Headers {
    let brand_id = request.header("brand-id").unwrap_or_default();

    let mut headers = Headers::new();
    headers.insert("type".into(), AssertionKind::Serial.name().into());
    // The brand signs with its own authority.
    headers.insert("authority-id".into(), brand_id.into());
    headers.insert("brand-id".into(), brand_id.into());
    headers.insert("model".into(), model_name.into());
    headers.insert("serial".into(), serial.into());
    if let Some(device_key) = request.header("device-key") {
        headers.insert("device-key".into(), device_key.into());
    }
    if let Some(sign_key) = request.sign_key_id() {
        // The device's own signing key fingerprint becomes the recorded
        // device-key fingerprint.
        headers.insert("sign-key-sha3-384".into(), sign_key.into());
        headers.insert("device-key-sha3-384".into(), sign_key.into());
    }
    headers.insert(
        "timestamp".into(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    headers.insert("revision".into(), revision.to_string());
    if !request.body().is_empty() {
        if let Some(body_length) = request.header("body-length") {
            headers.insert("body-length".into(), body_length.into());
        }
    }

    headers
}
