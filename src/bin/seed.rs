//! Bootstrap of the organizational office tree and the initial staff
//! accounts. Idempotent: offices upsert by name, users by username.

use anyhow::Result;
use diesel::prelude::*;
use diesel::PgConnection;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tramitex::auth::password::hash_password;
use tramitex::config::AppConfig;
use tramitex::db;
use tramitex::domain::{OfficeType, UserRole, MESA_DE_PARTES_OFFICE};
use tramitex::models::{NewOffice, NewUser};
use tramitex::schema::{offices, users};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env()?;
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let mut conn = pool.get()?;

    tracing::info!("seeding office tree");

    let alcaldia = upsert_office(&mut conn, "ALCALDÍA", "ALC", OfficeType::Alcaldia, None)?;
    let gm = upsert_office(
        &mut conn,
        "GERENCIA MUNICIPAL",
        "GM",
        OfficeType::GerenciaMunicipal,
        Some(alcaldia),
    )?;

    upsert_office(
        &mut conn,
        "ÓRGANO DE CONTROL INSTITUCIONAL",
        "OCI",
        OfficeType::OrganoStaff,
        Some(alcaldia),
    )?;
    let secretaria = upsert_office(
        &mut conn,
        "SECRETARÍA GENERAL",
        "SG",
        OfficeType::OficinaGeneral,
        Some(alcaldia),
    )?;
    let oga = upsert_office(
        &mut conn,
        "OFICINA GENERAL DE ADMINISTRACIÓN",
        "OGA",
        OfficeType::OficinaGeneral,
        Some(gm),
    )?;
    upsert_office(
        &mut conn,
        "OFICINA GENERAL DE ASESORÍA JURÍDICA",
        "OGAJ",
        OfficeType::OficinaGeneral,
        Some(gm),
    )?;
    upsert_office(
        &mut conn,
        "GERENCIA DE DESARROLLO SOCIAL",
        "GDS",
        OfficeType::GerenciaLinea,
        Some(gm),
    )?;
    upsert_office(
        &mut conn,
        "GERENCIA DE DESARROLLO URBANO",
        "GDU",
        OfficeType::GerenciaLinea,
        Some(gm),
    )?;

    let mesa = upsert_office(
        &mut conn,
        MESA_DE_PARTES_OFFICE,
        "MP",
        OfficeType::Unidad,
        Some(secretaria),
    )?;
    upsert_office(
        &mut conn,
        "UNIDAD DE LOGÍSTICA",
        "LOG",
        OfficeType::Unidad,
        Some(oga),
    )?;
    upsert_office(
        &mut conn,
        "UNIDAD DE RECURSOS HUMANOS",
        "RRHH",
        OfficeType::Unidad,
        Some(oga),
    )?;

    tracing::info!("seeding staff accounts");

    upsert_user(
        &mut conn,
        SeedUser {
            email: "admin@municipalidad.gob.pe",
            dni: "00000001",
            name: "Admin",
            last_name: "Sistema",
            username: "admin",
            role: UserRole::SuperAdmin,
            office_id: Some(alcaldia),
        },
    )?;
    upsert_user(
        &mut conn,
        SeedUser {
            email: "mesadepartes@municipalidad.gob.pe",
            dni: "00000002",
            name: "Mesa",
            last_name: "De Partes",
            username: "mesadepartes",
            role: UserRole::MesaDePartes,
            office_id: Some(mesa),
        },
    )?;

    tracing::info!("seed complete");
    Ok(())
}

fn upsert_office(
    conn: &mut PgConnection,
    name: &str,
    acronym: &str,
    office_type: OfficeType,
    parent: Option<Uuid>,
) -> Result<Uuid> {
    let new_office = NewOffice {
        id: Uuid::new_v4(),
        name: name.to_string(),
        acronym: acronym.to_string(),
        office_type: office_type.as_str().to_string(),
        parent_office_id: parent,
    };

    diesel::insert_into(offices::table)
        .values(&new_office)
        .on_conflict(offices::name)
        .do_update()
        .set(offices::parent_office_id.eq(parent))
        .execute(conn)?;

    let id = offices::table
        .filter(offices::name.eq(name))
        .select(offices::id)
        .first(conn)?;
    Ok(id)
}

struct SeedUser<'a> {
    email: &'a str,
    dni: &'a str,
    name: &'a str,
    last_name: &'a str,
    username: &'a str,
    role: UserRole,
    office_id: Option<Uuid>,
}

fn upsert_user(conn: &mut PgConnection, seed: SeedUser<'_>) -> Result<()> {
    let existing: Option<Uuid> = users::table
        .filter(users::username.eq(seed.username))
        .select(users::id)
        .first(conn)
        .optional()?;
    if existing.is_some() {
        return Ok(());
    }

    // Default password for freshly seeded environments.
    let password_hash = hash_password("123456")?;
    let new_user = NewUser {
        id: Uuid::new_v4(),
        email: seed.email.to_string(),
        dni: seed.dni.to_string(),
        name: seed.name.to_string(),
        last_name: seed.last_name.to_string(),
        username: seed.username.to_string(),
        password_hash,
        role: seed.role.as_str().to_string(),
        office_id: seed.office_id,
    };
    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(conn)?;

    Ok(())
}
