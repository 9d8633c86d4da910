//! Model resolution, including sub-store pivots.

use tracing::warn;

use crate::error::SignError;
use crate::storage::{Model, VaultDatabase};

/// A resolved model together with the effective model name to use for
/// header construction and the signing log.
///
/// On the direct path the name is the request's own; on a pivot it is the
/// sub-store's override when one is set.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub model: Model,
    pub model_name: String,
}

/// Map a (brand, model, API key) — or a pivot (brand, model, serial) — to
/// the model record holding the signing key identity.
///
/// The direct lookup takes precedence: when it matches, the sub-store query
/// never runs.
pub async fn resolve(
    db: &VaultDatabase,
    brand_id: &str,
    model_name: &str,
    serial: &str,
    api_key: &str,
) -> Result<ResolvedModel, SignError> {
    match db.find_model(brand_id, model_name, api_key).await {
        Ok(Some(model)) => {
            return Ok(ResolvedModel {
                model,
                model_name: model_name.to_string(),
            });
        }
        Ok(None) => {}
        Err(e) => {
            warn!(op = "SIGN", code = "invalid-model", error = %e, "Model lookup failed");
            return Err(SignError::InvalidModel);
        }
    }

    let substore = match db.find_substore(brand_id, model_name, serial).await {
        Ok(Some(substore)) => substore,
        Ok(None) => {
            warn!(
                op = "SIGN",
                code = "invalid-model",
                brand_id,
                model_name,
                "No model or sub-store mapping"
            );
            return Err(SignError::InvalidModel);
        }
        Err(e) => {
            warn!(op = "SIGN", code = "invalid-model-substore", error = %e, "Sub-store lookup failed");
            return Err(SignError::InvalidModelSubstore);
        }
    };

    let from_model = db
        .get_model(substore.from_model_id)
        .await
        .map_err(|_| SignError::InvalidModelSubstore)?;

    if from_model.api_key != api_key {
        warn!(
            op = "SIGN",
            code = "invalid-model-substore",
            brand_id,
            model_name,
            "Sub-store origin model does not hold the presented API key"
        );
        return Err(SignError::InvalidModelSubstore);
    }

    let effective = if substore.model_name_override.is_empty() {
        model_name.to_string()
    } else {
        substore.model_name_override
    };

    Ok(ResolvedModel {
        model: from_model,
        model_name: effective,
    })
}
