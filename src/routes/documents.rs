use std::collections::HashMap;

use axum::extract::{Json, Multipart, Path, State};
use axum::http::StatusCode;
use chrono::{NaiveDateTime, Utc};
use diesel::result::DatabaseErrorKind;
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::domain::{
    is_valid_document_type, ApplicantType, DocumentStatus, UserRole, MESA_DE_PARTES_OFFICE,
    TERMINAL_STATUSES,
};
use crate::error::{AppError, AppResult};
use crate::history::{self, HistoryEvent};
use crate::models::{
    Document, DocumentAttachment, NewDocument, NewDocumentAttachment, Office,
};
use crate::schema::{document_attachments, documents, offices};
use crate::state::AppState;
use crate::storage::StoredObject;

/// Bounded retries when a freshly generated tracking code loses the race
/// against the unique constraint.
const TRACKING_CODE_ATTEMPTS: u32 = 3;

const PUBLIC_INTAKE_OBSERVATION: &str = "Registro Web - Pendiente de Validación";

fn iso(ts: NaiveDateTime) -> String {
    ts.and_utc().to_rfc3339()
}

// ---------------------------------------------------------------------------
// Request/response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CreateDocumentInput {
    applicant_type: String,
    applicant_identifier: String,
    applicant_name: String,
    applicant_lastname: String,
    applicant_email: String,
    applicant_phone: Option<String>,
    applicant_address: Option<String>,
    document_type: String,
    subject: String,
    page_count: i32,
}

struct UploadedFile {
    bytes: Vec<u8>,
    file_name: String,
    content_type: String,
}

#[derive(Serialize)]
pub struct RegistrationResponse {
    pub message: String,
    pub tracking_code: String,
    pub info: String,
}

#[derive(Serialize)]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
}

impl From<DocumentAttachment> for AttachmentResponse {
    fn from(attachment: DocumentAttachment) -> Self {
        Self {
            id: attachment.id,
            file_url: attachment.file_url,
            file_name: attachment.file_name,
            file_type: attachment.file_type,
        }
    }
}

#[derive(Serialize)]
pub struct LastMovementResponse {
    pub status: String,
    pub from_office: Option<String>,
    pub observation: Option<String>,
    pub date: String,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub tracking_code: String,
    pub applicant_type: String,
    pub applicant_identifier: String,
    pub applicant_name: String,
    pub applicant_lastname: String,
    pub applicant_email: String,
    pub document_type: String,
    pub subject: String,
    pub page_count: i32,
    pub current_status: String,
    pub current_office_id: Uuid,
    pub owner_office_id: Uuid,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_movement: Option<LastMovementResponse>,
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub observation: String,
}

#[derive(Deserialize)]
pub struct DeriveRequest {
    pub target_office_id: Uuid,
    pub instructions: String,
}

#[derive(Deserialize)]
pub struct AttendRequest {
    pub final_status: String,
    pub observation: String,
}

#[derive(Serialize)]
pub struct TrackingHistoryItem {
    pub date: String,
    pub status: String,
    pub office_name: String,
    pub observation: String,
}

#[derive(Serialize)]
pub struct TrackingResponse {
    pub tracking_code: String,
    pub subject: String,
    pub current_status: String,
    pub current_office: String,
    pub last_update: String,
    pub history: Vec<TrackingHistoryItem>,
}

#[derive(Serialize)]
pub struct HistoryItemResponse {
    pub status: String,
    pub observation: Option<String>,
    pub from_office: Option<String>,
    pub to_office: String,
    pub user: Option<String>,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct FullHistoryResponse {
    pub document: DocumentResponse,
    pub history: Vec<HistoryItemResponse>,
}

// ---------------------------------------------------------------------------
// Intake (registration)
// ---------------------------------------------------------------------------

pub async fn register_internal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<RegistrationResponse>)> {
    user.require_role(&[UserRole::MesaDePartes, UserRole::SuperAdmin])?;
    let office_id = user.require_office()?;

    let (input, file) = parse_registration_form(multipart).await?;
    validate_registration(&input)?;

    let response = register_document(
        &state,
        input,
        file,
        office_id,
        DocumentStatus::Recibido,
        Some(user.user_id),
        None,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn register_public(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<RegistrationResponse>)> {
    let (input, file) = parse_registration_form(multipart).await?;
    validate_registration(&input)?;

    let intake_office: Office = {
        let mut conn = state.db()?;
        offices::table
            .filter(offices::name.eq(MESA_DE_PARTES_OFFICE))
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::internal("intake office is not configured"))?
    };

    // Public submissions enter as `creado` on row and ledger alike; they
    // stay invisible to routing until mesa de partes validates them.
    let response = register_document(
        &state,
        input,
        file,
        intake_office.id,
        DocumentStatus::Creado,
        None,
        Some(PUBLIC_INTAKE_OBSERVATION),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Upload-then-commit coordinator. The blob goes to object storage first
/// (its locator is needed for the attachment row); the document, attachment
/// and ledger rows then commit as one transaction. A failed commit deletes
/// the already-uploaded blob as compensation. The notification is spawned
/// only after the commit so a slow or failing mail provider can never roll
/// back a valid registration.
async fn register_document(
    state: &AppState,
    input: CreateDocumentInput,
    file: UploadedFile,
    office_id: Uuid,
    initial_status: DocumentStatus,
    acting_user_id: Option<Uuid>,
    observation: Option<&str>,
) -> AppResult<RegistrationResponse> {
    let stored = state
        .storage
        .upload(file.bytes, &file.file_name, &file.content_type)
        .await
        .map_err(|err| {
            error!(error = %err, file_name = %file.file_name, "attachment upload failed");
            AppError::internal("Error al guardar el archivo adjunto")
        })?;

    let applicant_email = input.applicant_email.clone();

    let result = persist_registration(
        state,
        input,
        &file.file_name,
        &file.content_type,
        &stored,
        office_id,
        initial_status,
        acting_user_id,
        observation,
    );

    let tracking_code = match result {
        Ok(code) => code,
        Err(err) => {
            // Compensation: the commit failed, so the blob must not outlive
            // it. A failed delete is a logged leak, not a second error.
            if let Err(delete_err) = state.storage.delete_object(&stored.key).await {
                error!(
                    key = %stored.key,
                    error = %delete_err,
                    "failed to delete orphaned attachment after aborted registration"
                );
            }
            return Err(err);
        }
    };

    info!(%tracking_code, "document registered");

    let mailer = state.mailer.clone();
    let code_for_mail = tracking_code.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer
            .send_tracking_code(&applicant_email, &code_for_mail)
            .await
        {
            warn!(error = %err, "failed to send tracking code notification");
        }
    });

    Ok(RegistrationResponse {
        message: "Trámite enviado correctamente".to_string(),
        tracking_code,
        info: "Se ha enviado el código de seguimiento a su correo electrónico.".to_string(),
    })
}

#[allow(clippy::too_many_arguments)]
fn persist_registration(
    state: &AppState,
    input: CreateDocumentInput,
    file_name: &str,
    file_type: &str,
    stored: &StoredObject,
    office_id: Uuid,
    initial_status: DocumentStatus,
    acting_user_id: Option<Uuid>,
    observation: Option<&str>,
) -> AppResult<String> {
    let mut conn = state.db()?;

    for attempt in 1..=TRACKING_CODE_ATTEMPTS {
        let tracking_code = state.codes.generate();
        let document_id = Uuid::new_v4();

        let outcome = conn.transaction::<(), diesel::result::Error, _>(|conn| {
            let new_document = NewDocument {
                id: document_id,
                tracking_code: tracking_code.clone(),
                applicant_type: input.applicant_type.clone(),
                applicant_identifier: input.applicant_identifier.clone(),
                applicant_name: input.applicant_name.clone(),
                applicant_lastname: input.applicant_lastname.clone(),
                applicant_email: input.applicant_email.clone(),
                applicant_phone: input.applicant_phone.clone(),
                applicant_address: input.applicant_address.clone(),
                document_type: input.document_type.clone(),
                subject: input.subject.clone(),
                page_count: input.page_count,
                current_status: initial_status.as_str().to_string(),
                current_office_id: office_id,
                owner_office_id: office_id,
            };
            diesel::insert_into(documents::table)
                .values(&new_document)
                .execute(conn)?;

            let attachment = NewDocumentAttachment {
                id: Uuid::new_v4(),
                file_url: stored.url.clone(),
                file_name: file_name.to_string(),
                file_type: file_type.to_string(),
                file_key: stored.key.clone(),
                document_id,
            };
            diesel::insert_into(document_attachments::table)
                .values(&attachment)
                .execute(conn)?;

            history::append(
                conn,
                HistoryEvent {
                    document_id,
                    status: initial_status,
                    from_office_id: None,
                    to_office_id: office_id,
                    user_id: acting_user_id,
                    observation,
                },
            )?;

            Ok(())
        });

        match outcome {
            Ok(()) => return Ok(tracking_code),
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info))
                if info.constraint_name() == Some("documents_tracking_code_key") =>
            {
                warn!(%tracking_code, attempt, "tracking code collision, regenerating");
                continue;
            }
            Err(err) => {
                error!(error = %err, "document registration transaction failed");
                return Err(AppError::internal(
                    "Error al registrar el documento en base de datos",
                ));
            }
        }
    }

    Err(AppError::internal(
        "could not allocate a unique tracking code",
    ))
}

async fn parse_registration_form(
    mut multipart: Multipart,
) -> AppResult<(CreateDocumentInput, UploadedFile)> {
    let mut input = CreateDocumentInput::default();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(|n| n.to_string())
                    .ok_or_else(|| AppError::bad_request("file name is required"))?;
                let content_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read file bytes");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                file = Some(UploadedFile {
                    bytes: data.to_vec(),
                    file_name,
                    content_type,
                });
            }
            Some(other) => {
                let value = field.text().await.map_err(|err| {
                    AppError::bad_request(format!("invalid field '{other}': {err}"))
                })?;
                let value = value.trim().to_string();
                match other {
                    "applicant_type" => input.applicant_type = value,
                    "applicant_identifier" => input.applicant_identifier = value,
                    "applicant_name" => input.applicant_name = value,
                    "applicant_lastname" => input.applicant_lastname = value,
                    "applicant_email" => input.applicant_email = value,
                    "applicant_phone" if !value.is_empty() => {
                        input.applicant_phone = Some(value)
                    }
                    "applicant_address" if !value.is_empty() => {
                        input.applicant_address = Some(value)
                    }
                    "document_type" => input.document_type = value,
                    "subject" => input.subject = value,
                    "page_count" => {
                        input.page_count = value.parse().map_err(|_| {
                            AppError::bad_request("page_count must be an integer")
                        })?;
                    }
                    _ => {}
                }
            }
            None => {}
        }
    }

    let file = file.ok_or_else(|| AppError::bad_request("file field is required"))?;
    if file.bytes.is_empty() {
        return Err(AppError::bad_request("file field must not be empty"));
    }

    Ok((input, file))
}

/// All validation runs before any storage or persistence call.
fn validate_registration(input: &CreateDocumentInput) -> AppResult<()> {
    if ApplicantType::parse(&input.applicant_type).is_none() {
        return Err(AppError::bad_request(
            "applicant_type must be 'natural' or 'juridica'",
        ));
    }

    for (field, value) in [
        ("applicant_identifier", &input.applicant_identifier),
        ("applicant_name", &input.applicant_name),
        ("applicant_lastname", &input.applicant_lastname),
        ("subject", &input.subject),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::bad_request(format!("{field} must not be empty")));
        }
    }

    if !input.applicant_email.contains('@') {
        return Err(AppError::bad_request(
            "applicant_email must be a valid email address",
        ));
    }

    if !is_valid_document_type(&input.document_type) {
        return Err(AppError::bad_request("unknown document_type"));
    }

    if input.page_count < 1 {
        return Err(AppError::bad_request("page_count must be at least 1"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Validation funnel (approve / reject)
// ---------------------------------------------------------------------------

pub async fn list_pending(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    user.require_role(&[UserRole::MesaDePartes, UserRole::SuperAdmin])?;

    let mut conn = state.db()?;
    let docs: Vec<Document> = documents::table
        .filter(documents::current_status.eq(DocumentStatus::Creado.as_str()))
        .order(documents::created_at.asc())
        .load(&mut conn)?;

    Ok(Json(build_document_responses(&mut conn, docs)?))
}

pub async fn approve_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<DocumentResponse>> {
    user.require_role(&[UserRole::MesaDePartes])?;
    let office_id = user.require_office()?;

    let mut conn = state.db()?;
    let updated = conn.transaction::<Document, AppError, _>(|conn| {
        let doc = lock_document(conn, document_id)?;
        if doc.current_office_id != office_id {
            return Err(AppError::forbidden(
                "No puedes validar un documento que no está en tu oficina actual.",
            ));
        }
        let status = parse_status(&doc.current_status)?;
        if status != DocumentStatus::Creado {
            return Err(AppError::conflict(
                "El documento no existe o ya fue procesado.",
            ));
        }

        transition(
            conn,
            &doc,
            DocumentStatus::Recibido,
            doc.current_office_id,
            HistoryEvent {
                document_id: doc.id,
                status: DocumentStatus::Recibido,
                from_office_id: Some(office_id),
                to_office_id: office_id,
                user_id: Some(user.user_id),
                observation: Some("Documento Validado y Recepcionado conforme."),
            },
        )
    })?;

    info!(document_id = %updated.id, "document approved into workflow");
    let response = build_document_responses(&mut conn, vec![updated])?;
    single(response)
}

pub async fn reject_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<RejectRequest>,
) -> AppResult<Json<DocumentResponse>> {
    user.require_role(&[UserRole::MesaDePartes])?;
    let office_id = user.require_office()?;

    let reason = payload.observation.trim();
    if reason.is_empty() {
        return Err(AppError::bad_request(
            "Debe indicar el motivo del rechazo u observación.",
        ));
    }
    let observation = format!("RECHAZADO: {reason}");

    let mut conn = state.db()?;
    let updated = conn.transaction::<Document, AppError, _>(|conn| {
        let doc = lock_document(conn, document_id)?;
        if doc.current_office_id != office_id {
            return Err(AppError::forbidden(
                "No puedes validar un documento que no está en tu oficina actual.",
            ));
        }
        let status = parse_status(&doc.current_status)?;
        if status != DocumentStatus::Creado {
            return Err(AppError::conflict(
                "El documento no existe o ya fue procesado.",
            ));
        }

        transition(
            conn,
            &doc,
            DocumentStatus::Rechazado,
            doc.current_office_id,
            HistoryEvent {
                document_id: doc.id,
                status: DocumentStatus::Rechazado,
                from_office_id: Some(office_id),
                to_office_id: office_id,
                user_id: Some(user.user_id),
                observation: Some(&observation),
            },
        )
    })?;

    info!(document_id = %updated.id, "document rejected at intake");
    let response = build_document_responses(&mut conn, vec![updated])?;
    single(response)
}

// ---------------------------------------------------------------------------
// Routing (inbox / derive / attend)
// ---------------------------------------------------------------------------

pub async fn get_inbox(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let office_id = user.require_office()?;

    let mut conn = state.db()?;
    let docs: Vec<Document> = documents::table
        .filter(documents::current_office_id.eq(office_id))
        .filter(documents::current_status.ne_all(TERMINAL_STATUSES))
        .order(documents::updated_at.desc())
        .load(&mut conn)?;

    Ok(Json(build_document_responses(&mut conn, docs)?))
}

pub async fn derive_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<DeriveRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let office_id = user.require_office()?;

    let instructions = payload.instructions.trim();
    if instructions.is_empty() {
        return Err(AppError::bad_request(
            "Las instrucciones de derivación son obligatorias.",
        ));
    }

    let mut conn = state.db()?;
    let updated = conn.transaction::<Document, AppError, _>(|conn| {
        let doc = lock_document(conn, document_id)?;

        // The office gate is re-evaluated under the row lock so two actors
        // cannot both believe they hold the document.
        if doc.current_office_id != office_id {
            return Err(AppError::forbidden(
                "No puedes derivar un documento que no está en tu oficina actual.",
            ));
        }

        let status = parse_status(&doc.current_status)?;
        if !status.can_derive() {
            return Err(AppError::conflict(
                "El estado actual del documento no permite derivarlo.",
            ));
        }

        let target: Option<Office> = offices::table
            .find(payload.target_office_id)
            .first(conn)
            .optional()?;
        let target = target
            .ok_or_else(|| AppError::not_found_with("La oficina destino no existe."))?;

        transition(
            conn,
            &doc,
            DocumentStatus::Derivado,
            target.id,
            HistoryEvent {
                document_id: doc.id,
                status: DocumentStatus::Derivado,
                from_office_id: Some(office_id),
                to_office_id: target.id,
                user_id: Some(user.user_id),
                observation: Some(instructions),
            },
        )
    })?;

    info!(
        document_id = %updated.id,
        to_office = %updated.current_office_id,
        "document derived"
    );
    let response = build_document_responses(&mut conn, vec![updated])?;
    single(response)
}

pub async fn attend_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<AttendRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let office_id = user.require_office()?;

    // The closure set is checked before touching persistence.
    let final_status = DocumentStatus::parse(&payload.final_status)
        .filter(|status| status.is_closure())
        .ok_or_else(|| AppError::bad_request("Estado final inválido."))?;

    let observation = payload.observation.trim();
    if observation.is_empty() {
        return Err(AppError::bad_request(
            "Debe indicar la conclusión del trámite.",
        ));
    }

    let mut conn = state.db()?;
    let updated = conn.transaction::<Document, AppError, _>(|conn| {
        let doc = lock_document(conn, document_id)?;

        if doc.current_office_id != office_id {
            return Err(AppError::forbidden(
                "No puedes finalizar un documento que no tienes en tu poder.",
            ));
        }

        let status = parse_status(&doc.current_status)?;
        if status.is_terminal() || status == DocumentStatus::Creado {
            return Err(AppError::conflict(
                "El estado actual del documento no permite finalizarlo.",
            ));
        }

        // The document stays filed at the closing office.
        transition(
            conn,
            &doc,
            final_status,
            doc.current_office_id,
            HistoryEvent {
                document_id: doc.id,
                status: final_status,
                from_office_id: Some(office_id),
                to_office_id: office_id,
                user_id: Some(user.user_id),
                observation: Some(observation),
            },
        )
    })?;

    info!(
        document_id = %updated.id,
        final_status = %updated.current_status,
        "document closed"
    );
    let response = build_document_responses(&mut conn, vec![updated])?;
    single(response)
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

pub async fn track_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<TrackingResponse>> {
    let mut conn = state.db()?;

    let doc: Option<Document> = documents::table
        .filter(documents::tracking_code.eq(&code))
        .first(&mut conn)
        .optional()?;
    let doc = doc.ok_or_else(|| {
        AppError::not_found_with("No se encontró ningún trámite con ese código.")
    })?;

    let entries = history::all_enriched(&mut conn, doc.id)?;
    let office_names = history::load_office_names(&mut conn, &[doc.current_office_id])?;

    // Sanitized projection: no applicant PII beyond the subject, no acting
    // users, only the destination of each hop.
    Ok(Json(TrackingResponse {
        tracking_code: doc.tracking_code,
        subject: doc.subject,
        current_status: doc.current_status,
        current_office: office_names
            .get(&doc.current_office_id)
            .cloned()
            .unwrap_or_else(|| "Finalizado".to_string()),
        last_update: iso(doc.updated_at),
        history: entries
            .into_iter()
            .map(|enriched| TrackingHistoryItem {
                date: iso(enriched.entry.timestamp),
                status: enriched.entry.status_at_moment,
                office_name: enriched.to_office_name,
                observation: enriched
                    .entry
                    .observation
                    .unwrap_or_else(|| "Sin observaciones".to_string()),
            })
            .collect(),
    }))
}

pub async fn get_full_history(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    _user: AuthenticatedUser,
) -> AppResult<Json<FullHistoryResponse>> {
    let mut conn = state.db()?;

    let doc: Document = documents::table.find(document_id).first(&mut conn)?;
    let entries = history::all_enriched(&mut conn, doc.id)?;
    let document = build_document_responses(&mut conn, vec![doc])?
        .into_iter()
        .next()
        .ok_or_else(AppError::not_found)?;

    Ok(Json(FullHistoryResponse {
        document,
        history: entries
            .into_iter()
            .map(|enriched| HistoryItemResponse {
                status: enriched.entry.status_at_moment,
                observation: enriched.entry.observation,
                from_office: enriched.from_office_name,
                to_office: enriched.to_office_name,
                user: enriched.user_display_name,
                timestamp: iso(enriched.entry.timestamp),
            })
            .collect(),
    }))
}

// ---------------------------------------------------------------------------
// Shared transition plumbing
// ---------------------------------------------------------------------------

/// Loads the document under `FOR UPDATE` so the status/location check and
/// the subsequent write are one atomic read-then-write.
fn lock_document(conn: &mut PgConnection, document_id: Uuid) -> Result<Document, AppError> {
    documents::table
        .find(document_id)
        .for_update()
        .first::<Document>(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_with("Documento no encontrado"))
}

fn parse_status(raw: &str) -> Result<DocumentStatus, AppError> {
    DocumentStatus::parse(raw)
        .ok_or_else(|| AppError::internal(format!("document carries unknown status '{raw}'")))
}

/// The one write path for status/location changes: the document row update
/// and the ledger append commit together, keeping the row equal to the
/// ledger's head.
fn transition(
    conn: &mut PgConnection,
    doc: &Document,
    new_status: DocumentStatus,
    new_office_id: Uuid,
    event: HistoryEvent<'_>,
) -> Result<Document, AppError> {
    let now = Utc::now().naive_utc();
    diesel::update(documents::table.find(doc.id))
        .set((
            documents::current_status.eq(new_status.as_str()),
            documents::current_office_id.eq(new_office_id),
            documents::updated_at.eq(now),
        ))
        .execute(conn)?;

    history::append(conn, event)?;

    let refreshed: Document = documents::table.find(doc.id).first(conn)?;
    Ok(refreshed)
}

fn build_document_responses(
    conn: &mut PgConnection,
    docs: Vec<Document>,
) -> AppResult<Vec<DocumentResponse>> {
    let doc_ids: Vec<Uuid> = docs.iter().map(|d| d.id).collect();

    let attachment_rows: Vec<DocumentAttachment> = if doc_ids.is_empty() {
        Vec::new()
    } else {
        document_attachments::table
            .filter(document_attachments::document_id.eq_any(&doc_ids))
            .order(document_attachments::created_at.asc())
            .load(conn)?
    };
    let mut attachments_map: HashMap<Uuid, Vec<AttachmentResponse>> = HashMap::new();
    for row in attachment_rows {
        attachments_map
            .entry(row.document_id)
            .or_default()
            .push(row.into());
    }

    let latest_map = history::latest_for_documents(conn, &doc_ids)?;
    let mut from_office_ids: Vec<Uuid> = latest_map
        .values()
        .filter_map(|e| e.from_office_id)
        .collect();
    from_office_ids.sort();
    from_office_ids.dedup();
    let office_names = history::load_office_names(conn, &from_office_ids)?;

    let response = docs
        .into_iter()
        .map(|doc| {
            let attachments = attachments_map.remove(&doc.id).unwrap_or_default();
            let last_movement = latest_map.get(&doc.id).map(|entry| LastMovementResponse {
                status: entry.status_at_moment.clone(),
                from_office: entry
                    .from_office_id
                    .and_then(|id| office_names.get(&id).cloned()),
                observation: entry.observation.clone(),
                date: iso(entry.timestamp),
            });
            DocumentResponse {
                id: doc.id,
                tracking_code: doc.tracking_code,
                applicant_type: doc.applicant_type,
                applicant_identifier: doc.applicant_identifier,
                applicant_name: doc.applicant_name,
                applicant_lastname: doc.applicant_lastname,
                applicant_email: doc.applicant_email,
                document_type: doc.document_type,
                subject: doc.subject,
                page_count: doc.page_count,
                current_status: doc.current_status,
                current_office_id: doc.current_office_id,
                owner_office_id: doc.owner_office_id,
                created_at: iso(doc.created_at),
                updated_at: iso(doc.updated_at),
                attachments,
                last_movement,
            }
        })
        .collect();

    Ok(response)
}

fn single(mut docs: Vec<DocumentResponse>) -> AppResult<Json<DocumentResponse>> {
    match docs.pop() {
        Some(doc) if docs.is_empty() => Ok(Json(doc)),
        _ => Err(AppError::internal("expected exactly one document")),
    }
}
