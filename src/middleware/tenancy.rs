// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// Extrator do estúdio (tenant) que a requisição quer acessar.
// Toda query do dashboard é escopada por este UUID.
#[derive(Debug, Clone)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(TENANT_ID_HEADER)
            .ok_or(AppError::MissingTenantHeader)?;

        let value_str = header_value
            .to_str()
            .map_err(|_| AppError::InvalidTenantHeader)?;

        let tenant_id = Uuid::parse_str(value_str).map_err(|_| AppError::InvalidTenantHeader)?;

        Ok(TenantContext(tenant_id))
    }
}
