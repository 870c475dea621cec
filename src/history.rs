//! Append-only audit ledger of every status/location change.
//!
//! Entries are never updated or deleted. `append` takes a borrowed
//! connection so the insert always runs inside the caller's transaction,
//! next to the document-row mutation it records; a standalone append would
//! let the ledger and the document row drift apart.

use std::collections::HashMap;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::DocumentStatus;
use crate::models::{DocumentHistoryEntry, NewDocumentHistoryEntry, Office};
use crate::schema::{document_history, offices, users};

pub struct HistoryEvent<'a> {
    pub document_id: Uuid,
    pub status: DocumentStatus,
    pub from_office_id: Option<Uuid>,
    pub to_office_id: Uuid,
    pub user_id: Option<Uuid>,
    pub observation: Option<&'a str>,
}

pub fn append(conn: &mut PgConnection, event: HistoryEvent<'_>) -> QueryResult<()> {
    let entry = NewDocumentHistoryEntry {
        id: Uuid::new_v4(),
        status_at_moment: event.status.as_str().to_string(),
        observation: event.observation.map(|o| o.to_string()),
        document_id: event.document_id,
        from_office_id: event.from_office_id,
        to_office_id: event.to_office_id,
        user_id: event.user_id,
    };

    diesel::insert_into(document_history::table)
        .values(&entry)
        .execute(conn)?;
    Ok(())
}

pub fn latest_for_documents(
    conn: &mut PgConnection,
    document_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, DocumentHistoryEntry>> {
    if document_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<DocumentHistoryEntry> = document_history::table
        .filter(document_history::document_id.eq_any(document_ids))
        .order(document_history::timestamp.asc())
        .load(conn)?;

    // Ascending load, so the last write per document wins.
    let mut map = HashMap::new();
    for row in rows {
        map.insert(row.document_id, row);
    }
    Ok(map)
}

/// One ledger entry enriched for staff consumption. The acting user is
/// reduced to a display name; credentials never leave the users table.
pub struct EnrichedEntry {
    pub entry: DocumentHistoryEntry,
    pub from_office_name: Option<String>,
    pub to_office_name: String,
    pub user_display_name: Option<String>,
}

/// Full ledger for one document, most recent first.
pub fn all_enriched(
    conn: &mut PgConnection,
    document_id: Uuid,
) -> QueryResult<Vec<EnrichedEntry>> {
    let entries: Vec<DocumentHistoryEntry> = document_history::table
        .filter(document_history::document_id.eq(document_id))
        .order(document_history::timestamp.desc())
        .load(conn)?;

    let mut office_ids: Vec<Uuid> = entries.iter().map(|e| e.to_office_id).collect();
    office_ids.extend(entries.iter().filter_map(|e| e.from_office_id));
    office_ids.sort();
    office_ids.dedup();
    let office_names = load_office_names(conn, &office_ids)?;

    let mut user_ids: Vec<Uuid> = entries.iter().filter_map(|e| e.user_id).collect();
    user_ids.sort();
    user_ids.dedup();
    let user_names: HashMap<Uuid, (String, String)> = users::table
        .filter(users::id.eq_any(&user_ids))
        .select((users::id, (users::name, users::last_name)))
        .load::<(Uuid, (String, String))>(conn)?
        .into_iter()
        .collect();

    Ok(entries
        .into_iter()
        .map(|entry| {
            let from_office_name = entry
                .from_office_id
                .and_then(|id| office_names.get(&id).cloned());
            let to_office_name = office_names
                .get(&entry.to_office_id)
                .cloned()
                .unwrap_or_default();
            let user_display_name = entry
                .user_id
                .and_then(|id| user_names.get(&id))
                .map(|(name, last_name)| format!("{name} {last_name}"));
            EnrichedEntry {
                entry,
                from_office_name,
                to_office_name,
                user_display_name,
            }
        })
        .collect())
}

pub fn load_office_names(
    conn: &mut PgConnection,
    office_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, String>> {
    if office_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<Office> = offices::table
        .filter(offices::id.eq_any(office_ids))
        .load(conn)?;

    Ok(rows.into_iter().map(|o| (o.id, o.name)).collect())
}
