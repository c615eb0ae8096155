use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cabeçalho X-Tenant-ID ausente")]
    MissingTenantHeader,

    #[error("Cabeçalho X-Tenant-ID inválido")]
    InvalidTenantHeader,

    // Falha genérica do pipeline de agregação: a causa original já foi
    // logada no composer; o chamador só vê uma mensagem segura.
    #[error("Não foi possível carregar o dashboard")]
    DashboardUnavailable,

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::MissingTenantHeader => {
                (StatusCode::BAD_REQUEST, "O cabeçalho X-Tenant-ID é obrigatório.")
            }
            AppError::InvalidTenantHeader => {
                (StatusCode::BAD_REQUEST, "Cabeçalho X-Tenant-ID inválido (não é um UUID).")
            }
            AppError::DashboardUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Não foi possível carregar o dashboard. Tente novamente.",
            ),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` guarda a mensagem detalhada; o cliente recebe algo genérico.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
