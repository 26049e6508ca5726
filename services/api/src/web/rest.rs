//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the project workflow endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Every project handler locks the session's project for the duration of the
//! action, so actions of one session are serialized while other sessions proceed.

use crate::web::{admin, auth, state::AppState, state::SessionState};
use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use translation_workflow_core::domain::{
    Feedback, Language, Project, ProjectView, PromptKind, SourceDocument,
};
use translation_workflow_core::error::WorkflowError;
use translation_workflow_core::workflow::StartProject;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::logout_handler,
        get_project_handler,
        start_project_handler,
        translate_handler,
        ai_edit_handler,
        manual_edit_handler,
        proofread_handler,
        override_prompt_handler,
        select_model_handler,
        download_handler,
        archive_handler,
        admin::list_users_handler,
        admin::add_user_handler,
        admin::delete_user_handler,
        admin::list_events_handler,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::AuthResponse,
            ManualEditRequest,
            PromptOverrideRequest,
            SelectModelRequest,
            ArchiveRequest,
            admin::AddUserRequest,
            admin::UserSummary,
        )
    ),
    tags(
        (name = "Translation Workflow API", description = "API endpoints for the human-in-the-loop document translation workflow.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The response payload sent after a project is started.
#[derive(Serialize)]
pub struct StartProjectResponse {
    project: ProjectView,
    warnings: Vec<String>,
}

/// The reviewed translation typed in by the user.
#[derive(Deserialize, ToSchema)]
pub struct ManualEditRequest {
    pub text: String,
}

#[derive(Deserialize, ToSchema)]
pub struct PromptOverrideRequest {
    pub prompt: String,
}

/// An empty or absent model restores the configured default.
#[derive(Deserialize, ToSchema)]
pub struct SelectModelRequest {
    #[serde(default)]
    pub model: Option<String>,
}

/// Feedback is optional; omit `rating` to archive without it.
#[derive(Deserialize, ToSchema, Default)]
pub struct ArchiveRequest {
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: Option<String>,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a workflow failure to the status and message returned to the client.
pub fn workflow_error_response(err: WorkflowError) -> (StatusCode, String) {
    let status = match &err {
        WorkflowError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        WorkflowError::EmptySource | WorkflowError::ExtractionFailed { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
        WorkflowError::InvalidCredential | WorkflowError::OracleUnavailable(_) => {
            StatusCode::BAD_GATEWAY
        }
        WorkflowError::NoFinalText
        | WorkflowError::StageNotReached { .. }
        | WorkflowError::ProjectInProgress => StatusCode::CONFLICT,
        WorkflowError::RenderFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        WorkflowError::InvalidFeedback(_) => StatusCode::BAD_REQUEST,
    };

    if status.is_server_error() {
        error!("Workflow action failed: {}", err);
    } else {
        warn!("Workflow action rejected: {}", err);
    }
    (status, err.to_string())
}

//=========================================================================================
// Multipart Parsing
//=========================================================================================

async fn read_document(field: Field<'_>) -> Result<SourceDocument, (StatusCode, String)> {
    let file_name = field.file_name().unwrap_or("untitled").to_string();
    let content_type = field.content_type().map(str::to_string);
    let data = field.bytes().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read file bytes: {}", e),
        )
    })?;

    let document = SourceDocument::new(file_name, data.to_vec());
    Ok(match content_type {
        Some(ct) => document.with_content_type(ct),
        None => document,
    })
}

async fn read_language(field: Field<'_>) -> Result<Language, (StatusCode, String)> {
    let raw = field.text().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read form field: {}", e),
        )
    })?;
    raw.parse::<Language>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))
}

/// Reads the start form: one `source` file, any number of `gold_en` and `gold_pt`
/// files, and optional `source_lang` / `target_lang` names.
async fn read_start_form(mut multipart: Multipart) -> Result<StartProject, (StatusCode, String)> {
    let defaults = Project::default();
    let mut source = None;
    let mut gold_source = Vec::new();
    let mut gold_target = Vec::new();
    let mut source_lang = defaults.source_lang;
    let mut target_lang = defaults.target_lang;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "source" => source = Some(read_document(field).await?),
            "gold_en" => gold_source.push(read_document(field).await?),
            "gold_pt" => gold_target.push(read_document(field).await?),
            "source_lang" => source_lang = read_language(field).await?,
            "target_lang" => target_lang = read_language(field).await?,
            other => warn!("Ignoring unexpected form field '{}'", other),
        }
    }

    let source = source.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Please upload a document to translate".to_string(),
        )
    })?;

    Ok(StartProject {
        source,
        gold_source,
        gold_target,
        source_lang,
        target_lang,
    })
}

//=========================================================================================
// Project Handlers
//=========================================================================================

/// Returns the current state of the session's project.
#[utoipa::path(
    get,
    path = "/project",
    responses(
        (status = 200, description = "The project view"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn get_project_handler(
    Extension(session): Extension<Arc<SessionState>>,
) -> impl IntoResponse {
    let project = session.project.lock().await;
    Json(project.view())
}

/// Start a project by uploading the source document and optional gold-standard pairs.
#[utoipa::path(
    post,
    path = "/project",
    request_body(content_type = "multipart/form-data", description = "Fields: `source` (file), `gold_en` and `gold_pt` (repeatable files), `source_lang`, `target_lang`."),
    responses(
        (status = 201, description = "Project prepared"),
        (status = 400, description = "Malformed form"),
        (status = 409, description = "A project is already in progress"),
        (status = 415, description = "Unsupported document format"),
        (status = 422, description = "The document has no extractable text"),
        (status = 503, description = "No oracle API key configured")
    )
)]
pub async fn start_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request = read_start_form(multipart).await?;

    let mut project = session.project.lock().await;
    let outcome = state
        .workflow
        .start_project(&mut project, &session.identity, request)
        .await
        .map_err(workflow_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(StartProjectResponse {
            project: outcome.view,
            warnings: outcome.warnings,
        }),
    ))
}

/// Produce the first-draft translation.
#[utoipa::path(
    post,
    path = "/project/translate",
    responses(
        (status = 200, description = "Draft translation produced"),
        (status = 409, description = "No source document yet"),
        (status = 502, description = "The oracle failed or rejected the API key")
    )
)]
pub async fn translate_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut project = session.project.lock().await;
    let view = state
        .workflow
        .run_translate(&mut project)
        .await
        .map_err(workflow_error_response)?;
    Ok(Json(view))
}

/// Let the oracle review the draft against the source.
#[utoipa::path(
    post,
    path = "/project/edit",
    responses(
        (status = 200, description = "Reviewed translation produced"),
        (status = 409, description = "No draft translation yet"),
        (status = 502, description = "The oracle failed or rejected the API key")
    )
)]
pub async fn ai_edit_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut project = session.project.lock().await;
    let view = state
        .workflow
        .run_edit(&mut project)
        .await
        .map_err(workflow_error_response)?;
    Ok(Json(view))
}

/// Replace the reviewed translation with text typed by the user.
#[utoipa::path(
    put,
    path = "/project/edit",
    request_body = ManualEditRequest,
    responses(
        (status = 200, description = "Reviewed translation stored"),
        (status = 409, description = "No draft translation yet")
    )
)]
pub async fn manual_edit_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionState>>,
    Json(req): Json<ManualEditRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut project = session.project.lock().await;
    let view = state
        .workflow
        .manual_edit(&mut project, req.text)
        .map_err(workflow_error_response)?;
    Ok(Json(view))
}

/// Proofread the reviewed translation, or the draft when no review exists.
#[utoipa::path(
    post,
    path = "/project/proofread",
    responses(
        (status = 200, description = "Proofread translation produced"),
        (status = 409, description = "No draft translation yet"),
        (status = 502, description = "The oracle failed or rejected the API key")
    )
)]
pub async fn proofread_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut project = session.project.lock().await;
    let view = state
        .workflow
        .run_proofread(&mut project)
        .await
        .map_err(workflow_error_response)?;
    Ok(Json(view))
}

/// Replace the pending prompt of one oracle-driven stage.
#[utoipa::path(
    put,
    path = "/project/prompts/{kind}",
    request_body = PromptOverrideRequest,
    params(
        ("kind" = String, Path, description = "One of `translate`, `edit` or `proofread`.")
    ),
    responses(
        (status = 200, description = "Prompt replaced"),
        (status = 409, description = "The stage has no pending prompt yet")
    )
)]
pub async fn override_prompt_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionState>>,
    Path(kind): Path<PromptKind>,
    Json(req): Json<PromptOverrideRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.prompt.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "The prompt cannot be empty".to_string()));
    }
    let mut project = session.project.lock().await;
    let view = state
        .workflow
        .override_prompt(&mut project, kind, req.prompt)
        .map_err(workflow_error_response)?;
    Ok(Json(view))
}

/// Choose the oracle model used by this project.
#[utoipa::path(
    put,
    path = "/project/model",
    request_body = SelectModelRequest,
    responses(
        (status = 200, description = "Model selected")
    )
)]
pub async fn select_model_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionState>>,
    Json(req): Json<SelectModelRequest>,
) -> impl IntoResponse {
    let mut project = session.project.lock().await;
    Json(state.workflow.select_model(&mut project, req.model))
}

/// Download the final text as a `.docx` attachment.
#[utoipa::path(
    get,
    path = "/project/download",
    responses(
        (status = 200, description = "The translated document", content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 409, description = "No final text to download"),
        (status = 500, description = "The document could not be rendered")
    )
)]
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut project = session.project.lock().await;
    let deliverable = state
        .workflow
        .prepare_download(&mut project, &session.identity)
        .await
        .map_err(workflow_error_response)?;

    let disposition = content_disposition(&deliverable.file_name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, deliverable.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        deliverable.bytes,
    ))
}

/// Characters left as-is in the `filename*` parameter.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');

/// An attachment header with an ASCII `filename` fallback and the exact name as
/// an RFC 6266 `filename*` parameter.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        utf8_percent_encode(file_name, FILENAME_ENCODE_SET)
    )
}

/// Archive the project, optionally leaving feedback, and return to a fresh inquiry.
#[utoipa::path(
    post,
    path = "/project/archive",
    request_body = ArchiveRequest,
    responses(
        (status = 200, description = "Project archived"),
        (status = 400, description = "Rating outside 1..=5")
    )
)]
pub async fn archive_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionState>>,
    Json(req): Json<ArchiveRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let feedback = req.rating.map(|rating| Feedback {
        rating,
        comment: req.comment,
    });

    let mut project = session.project.lock().await;
    let view = state
        .workflow
        .archive_project(&mut project, &session.identity, feedback)
        .await
        .map_err(workflow_error_response)?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use translation_workflow_core::domain::Stage;

    #[test]
    fn workflow_errors_map_to_statuses() {
        let cases = [
            (WorkflowError::UnsupportedFormat("a.rtf".into()), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (WorkflowError::EmptySource, StatusCode::UNPROCESSABLE_ENTITY),
            (WorkflowError::MissingCredential, StatusCode::SERVICE_UNAVAILABLE),
            (WorkflowError::InvalidCredential, StatusCode::BAD_GATEWAY),
            (WorkflowError::NoFinalText, StatusCode::CONFLICT),
            (
                WorkflowError::StageNotReached {
                    required: Stage::Translated,
                    current: Stage::Prepared,
                },
                StatusCode::CONFLICT,
            ),
            (WorkflowError::RenderFailure("zip".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (WorkflowError::InvalidFeedback(9), StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            assert_eq!(workflow_error_response(err).0, expected);
        }
    }

    #[test]
    fn download_names_are_quoted_safely() {
        assert_eq!(
            content_disposition("translated_story.docx"),
            "attachment; filename=\"translated_story.docx\"; filename*=UTF-8''translated_story.docx"
        );
        assert_eq!(
            content_disposition("translated_a\"b.docx"),
            "attachment; filename=\"translated_a_b.docx\"; filename*=UTF-8''translated_a%22b.docx"
        );
        assert_eq!(
            content_disposition("translated_relatório.docx"),
            "attachment; filename=\"translated_relat_rio.docx\"; filename*=UTF-8''translated_relat%C3%B3rio.docx"
        );
        assert!(axum::http::HeaderValue::from_str(&content_disposition("translated_\u{7}x.docx")).is_ok());
    }

    #[test]
    fn invalid_credential_message_is_user_facing() {
        let (_, message) = workflow_error_response(WorkflowError::InvalidCredential);
        assert_eq!(message, "Error: Invalid oracle API key. Please check your .env file");
    }
}
