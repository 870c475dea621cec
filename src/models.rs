use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = offices)]
pub struct Office {
    pub id: Uuid,
    pub name: String,
    pub acronym: String,
    pub office_type: String,
    pub parent_office_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = offices)]
pub struct NewOffice {
    pub id: Uuid,
    pub name: String,
    pub acronym: String,
    pub office_type: String,
    pub parent_office_id: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = users)]
#[diesel(belongs_to(Office, foreign_key = office_id))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub dni: String,
    pub name: String,
    pub last_name: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub office_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub dni: String,
    pub name: String,
    pub last_name: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub office_id: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = documents)]
pub struct Document {
    pub id: Uuid,
    pub tracking_code: String,
    pub applicant_type: String,
    pub applicant_identifier: String,
    pub applicant_name: String,
    pub applicant_lastname: String,
    pub applicant_email: String,
    pub applicant_phone: Option<String>,
    pub applicant_address: Option<String>,
    pub document_type: String,
    pub subject: String,
    pub page_count: i32,
    pub current_status: String,
    pub current_office_id: Uuid,
    pub owner_office_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub tracking_code: String,
    pub applicant_type: String,
    pub applicant_identifier: String,
    pub applicant_name: String,
    pub applicant_lastname: String,
    pub applicant_email: String,
    pub applicant_phone: Option<String>,
    pub applicant_address: Option<String>,
    pub document_type: String,
    pub subject: String,
    pub page_count: i32,
    pub current_status: String,
    pub current_office_id: Uuid,
    pub owner_office_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = document_attachments)]
#[diesel(belongs_to(Document))]
pub struct DocumentAttachment {
    pub id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_key: String,
    pub document_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_attachments)]
pub struct NewDocumentAttachment {
    pub id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_key: String,
    pub document_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = document_history)]
#[diesel(belongs_to(Document))]
pub struct DocumentHistoryEntry {
    pub id: Uuid,
    pub status_at_moment: String,
    pub observation: Option<String>,
    pub document_id: Uuid,
    pub from_office_id: Option<Uuid>,
    pub to_office_id: Uuid,
    pub user_id: Option<Uuid>,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_history)]
pub struct NewDocumentHistoryEntry {
    pub id: Uuid,
    pub status_at_moment: String,
    pub observation: Option<String>,
    pub document_id: Uuid,
    pub from_office_id: Option<Uuid>,
    pub to_office_id: Uuid,
    pub user_id: Option<Uuid>,
}
