mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, applicant_fields, body_to_vec, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

async fn register_and_get_id(app: &TestApp) -> Result<(Uuid, String)> {
    use diesel::prelude::*;
    use tramitex::schema::documents;

    let response = app
        .register_document(
            "/api/documents/public/register",
            &applicant_fields(),
            "solicitud.pdf",
            b"%PDF-1.4 test",
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered: Value = serde_json::from_slice(&body_to_vec(response.into_body()).await?)?;
    let code = registered["tracking_code"]
        .as_str()
        .expect("tracking_code present")
        .to_string();

    let lookup = code.clone();
    let id = app
        .with_conn(move |conn| {
            let id = documents::table
                .filter(documents::tracking_code.eq(&lookup))
                .select(documents::id)
                .first(conn)?;
            Ok(id)
        })
        .await?;
    Ok((id, code))
}

#[tokio::test]
async fn dashboard_aggregates_statuses_and_office_load() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let mesa_office_id = app.insert_office("MESA_DE_PARTES", None).await?;
    app.insert_user("mesa", "secret123", "mesa_de_partes", Some(mesa_office_id))
        .await?;
    let mesa_token = app.login_token("mesa", "secret123").await?;
    let legal_office_id = app.insert_office("OGAJ", None).await?;

    app.insert_user("gerente", "secret123", "gerente", None)
        .await?;
    let gerente_token = app.login_token("gerente", "secret123").await?;

    // One document in each of: creado, recibido, derivado.
    let (_stuck_id, _) = register_and_get_id(&app).await?;
    let (received_id, _) = register_and_get_id(&app).await?;
    let (derived_id, derived_code) = register_and_get_id(&app).await?;

    for id in [received_id, derived_id] {
        let response = app
            .patch_json(
                &format!("/api/documents/{id}/approve"),
                &json!({}),
                Some(&mesa_token),
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app
        .patch_json(
            &format!("/api/documents/{derived_id}/derive"),
            &json!({ "target_office_id": legal_office_id, "instructions": "Opinión" }),
            Some(&mesa_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/api/dashboard", Some(&gerente_token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let dashboard: Value = serde_json::from_slice(&body_to_vec(response.into_body()).await?)?;

    let stats = dashboard["stats"].as_array().expect("stats array");
    let count_for = |status: &str| {
        stats
            .iter()
            .find(|s| s["status"] == status)
            .and_then(|s| s["count"].as_i64())
            .unwrap_or(0)
    };
    assert_eq!(count_for("creado"), 1);
    assert_eq!(count_for("recibido"), 1);
    assert_eq!(count_for("derivado"), 1);

    // `creado` is not yet in the workflow, so only two documents count as
    // stuck.
    let urgent = dashboard["urgent_docs"].as_array().expect("urgent array");
    assert_eq!(urgent.len(), 2);
    assert!(urgent
        .iter()
        .any(|d| d["code"] == derived_code.as_str() && d["office"] == "OGAJ"));
    assert!(urgent.iter().all(|d| d["days_open"].as_i64() == Some(0)));

    let office_load = dashboard["office_load"].as_array().expect("load array");
    let load_for = |office: &str| {
        office_load
            .iter()
            .find(|o| o["office"] == office)
            .and_then(|o| o["count"].as_i64())
            .unwrap_or(0)
    };
    assert_eq!(load_for("MESA_DE_PARTES"), 2);
    assert_eq!(load_for("OGAJ"), 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn dashboard_is_restricted_to_management_roles() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let office_id = app.insert_office("MESA_DE_PARTES", None).await?;
    app.insert_user("mesa", "secret123", "mesa_de_partes", Some(office_id))
        .await?;
    let mesa_token = app.login_token("mesa", "secret123").await?;

    let response = app.get("/api/dashboard", Some(&mesa_token)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}
