//! Fixed vocabulary of the document lifecycle: statuses, roles and the
//! transition rules the routing engine enforces. Enum values are stored as
//! lowercase strings in the database, so every enum carries `as_str`/`parse`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    Creado,
    Recibido,
    Derivado,
    EnRevision,
    Atendido,
    Archivado,
    Rechazado,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 7] = [
        DocumentStatus::Creado,
        DocumentStatus::Recibido,
        DocumentStatus::Derivado,
        DocumentStatus::EnRevision,
        DocumentStatus::Atendido,
        DocumentStatus::Archivado,
        DocumentStatus::Rechazado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Creado => "creado",
            DocumentStatus::Recibido => "recibido",
            DocumentStatus::Derivado => "derivado",
            DocumentStatus::EnRevision => "en_revision",
            DocumentStatus::Atendido => "atendido",
            DocumentStatus::Archivado => "archivado",
            DocumentStatus::Rechazado => "rechazado",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == value)
    }

    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Atendido | DocumentStatus::Archivado | DocumentStatus::Rechazado
        )
    }

    /// Statuses counted as "still waiting on an office" by the dashboard.
    /// `en_revision` has no exposed transition into it; it is only ever set
    /// by direct data correction, but must still be reported.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Recibido | DocumentStatus::Derivado | DocumentStatus::EnRevision
        )
    }

    /// Valid closure outcomes for the attend operation.
    pub fn is_closure(&self) -> bool {
        matches!(self, DocumentStatus::Atendido | DocumentStatus::Archivado)
    }

    /// Whether a document in this status may be derived to another office.
    /// `creado` must pass through the approve funnel first.
    pub fn can_derive(&self) -> bool {
        !self.is_terminal() && *self != DocumentStatus::Creado
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const TERMINAL_STATUSES: [&str; 3] = ["atendido", "archivado", "rechazado"];
pub const PENDING_STATUSES: [&str; 3] = ["recibido", "derivado", "en_revision"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    SuperAdmin,
    MesaDePartes,
    Gerente,
    JefeOficina,
    StaffOficina,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::SuperAdmin,
        UserRole::MesaDePartes,
        UserRole::Gerente,
        UserRole::JefeOficina,
        UserRole::StaffOficina,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::MesaDePartes => "mesa_de_partes",
            UserRole::Gerente => "gerente",
            UserRole::JefeOficina => "jefe_oficina",
            UserRole::StaffOficina => "staff_oficina",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeType {
    Alcaldia,
    GerenciaMunicipal,
    OficinaGeneral,
    GerenciaLinea,
    Unidad,
    OrganoStaff,
}

impl OfficeType {
    pub const ALL: [OfficeType; 6] = [
        OfficeType::Alcaldia,
        OfficeType::GerenciaMunicipal,
        OfficeType::OficinaGeneral,
        OfficeType::GerenciaLinea,
        OfficeType::Unidad,
        OfficeType::OrganoStaff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OfficeType::Alcaldia => "alcaldia",
            OfficeType::GerenciaMunicipal => "gerencia_municipal",
            OfficeType::OficinaGeneral => "oficina_general",
            OfficeType::GerenciaLinea => "gerencia_linea",
            OfficeType::Unidad => "unidad",
            OfficeType::OrganoStaff => "organo_staff",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicantType {
    Natural,
    Juridica,
}

impl ApplicantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicantType::Natural => "natural",
            ApplicantType::Juridica => "juridica",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "natural" => Some(ApplicantType::Natural),
            "juridica" => Some(ApplicantType::Juridica),
            _ => None,
        }
    }
}

pub const DOCUMENT_TYPES: [&str; 6] = [
    "solicitud",
    "oficio",
    "carta",
    "informe",
    "expediente",
    "otro",
];

pub fn is_valid_document_type(value: &str) -> bool {
    DOCUMENT_TYPES.contains(&value)
}

/// Designated intake office for public self-service submissions.
pub const MESA_DE_PARTES_OFFICE: &str = "MESA_DE_PARTES";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in DocumentStatus::ALL {
            assert_eq!(DocumentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DocumentStatus::parse("perdido"), None);
    }

    #[test]
    fn terminal_statuses_cannot_be_derived() {
        assert!(!DocumentStatus::Atendido.can_derive());
        assert!(!DocumentStatus::Archivado.can_derive());
        assert!(!DocumentStatus::Rechazado.can_derive());
    }

    #[test]
    fn unvalidated_submissions_cannot_be_derived() {
        assert!(!DocumentStatus::Creado.can_derive());
        assert!(DocumentStatus::Recibido.can_derive());
        assert!(DocumentStatus::Derivado.can_derive());
        assert!(DocumentStatus::EnRevision.can_derive());
    }

    #[test]
    fn closure_set_is_exactly_atendido_and_archivado() {
        let closures: Vec<_> = DocumentStatus::ALL
            .iter()
            .filter(|s| s.is_closure())
            .collect();
        assert_eq!(
            closures,
            [&DocumentStatus::Atendido, &DocumentStatus::Archivado]
        );
    }

    #[test]
    fn pending_set_matches_dashboard_constant() {
        for status in DocumentStatus::ALL {
            assert_eq!(
                status.is_pending(),
                PENDING_STATUSES.contains(&status.as_str())
            );
        }
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in UserRole::ALL {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
    }
}
