use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifecycle state of a submitted work. Stored as lowercase snake case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl WorkStatus {
    pub const ALL: [WorkStatus; 4] = [
        WorkStatus::Submitted,
        WorkStatus::UnderReview,
        WorkStatus::Approved,
        WorkStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Submitted => "submitted",
            WorkStatus::UnderReview => "under_review",
            WorkStatus::Approved => "approved",
            WorkStatus::Rejected => "rejected",
        }
    }

    pub fn label_pt(&self) -> &'static str {
        match self {
            WorkStatus::Submitted => "Submetido",
            WorkStatus::UnderReview => "Em Validação",
            WorkStatus::Approved => "Aprovado",
            WorkStatus::Rejected => "Rejeitado",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            WorkStatus::Submitted => "submitted",
            WorkStatus::UnderReview => "under-review",
            WorkStatus::Approved => "approved",
            WorkStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(WorkStatus::Submitted),
            "under_review" => Some(WorkStatus::UnderReview),
            "approved" => Some(WorkStatus::Approved),
            "rejected" => Some(WorkStatus::Rejected),
            _ => None,
        }
    }

    /// Coordinator decisions are only accepted while the work is still Submitted.
    pub fn accepts_decisions(&self) -> bool {
        matches!(self, WorkStatus::Submitted)
    }

    pub fn after(&self, decision: Decision) -> Option<WorkStatus> {
        if self.accepts_decisions() {
            Some(decision.target_status())
        } else {
            None
        }
    }
}

impl Serialize for WorkStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WorkStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        WorkStatus::parse(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown work status `{value}`")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkType {
    Undergraduate,
    Master,
    Doctoral,
}

impl WorkType {
    pub const ALL: [WorkType; 3] = [WorkType::Undergraduate, WorkType::Master, WorkType::Doctoral];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::Undergraduate => "undergraduate",
            WorkType::Master => "master",
            WorkType::Doctoral => "doctoral",
        }
    }

    pub fn label_pt(&self) -> &'static str {
        match self {
            WorkType::Undergraduate => "Licenciatura",
            WorkType::Master => "Mestrado",
            WorkType::Doctoral => "Doutoramento",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "undergraduate" => Some(WorkType::Undergraduate),
            "master" => Some(WorkType::Master),
            "doctoral" => Some(WorkType::Doctoral),
            _ => None,
        }
    }
}

impl Serialize for WorkType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Coordinator action on a Submitted work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
    RequestJustification,
}

impl Decision {
    pub const ALL: [Decision; 3] = [
        Decision::Approve,
        Decision::Reject,
        Decision::RequestJustification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
            Decision::RequestJustification => "request_justification",
        }
    }

    pub fn label_pt(&self) -> &'static str {
        match self {
            Decision::Approve => "Aprovar",
            Decision::Reject => "Rejeitar",
            Decision::RequestJustification => "Solicitar justificação",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "approve" => Some(Decision::Approve),
            "reject" => Some(Decision::Reject),
            "request_justification" => Some(Decision::RequestJustification),
            _ => None,
        }
    }

    pub fn target_status(&self) -> WorkStatus {
        match self {
            Decision::Approve => WorkStatus::Approved,
            Decision::Reject => WorkStatus::Rejected,
            Decision::RequestJustification => WorkStatus::UnderReview,
        }
    }

    pub fn requires_comment(&self) -> bool {
        !matches!(self, Decision::Approve)
    }

    pub fn notification_message(&self, title: &str, comment: Option<&str>) -> String {
        let comment = comment.unwrap_or("");
        match self {
            Decision::Approve => format!("O seu TFC \"{title}\" foi aprovado!"),
            Decision::Reject => {
                format!("O seu TFC \"{title}\" foi rejeitado. Motivo: {comment}")
            }
            Decision::RequestJustification => {
                format!("Solicitada justificação adicional para o TFC \"{title}\". {comment}")
            }
        }
    }

    /// Flash code shown on the dashboard after the decision is stored.
    pub fn flash_status(&self) -> &'static str {
        match self {
            Decision::Approve => "approved",
            Decision::Reject => "rejected",
            Decision::RequestJustification => "justification_requested",
        }
    }
}

impl Serialize for Decision {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_storage_text() {
        for status in WorkStatus::ALL {
            assert_eq!(WorkStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(WorkStatus::parse("Submetido"), None);
    }

    #[test]
    fn decisions_only_leave_submitted() {
        assert_eq!(
            WorkStatus::Submitted.after(Decision::Approve),
            Some(WorkStatus::Approved)
        );
        assert_eq!(
            WorkStatus::Submitted.after(Decision::Reject),
            Some(WorkStatus::Rejected)
        );
        assert_eq!(
            WorkStatus::Submitted.after(Decision::RequestJustification),
            Some(WorkStatus::UnderReview)
        );

        for status in [
            WorkStatus::UnderReview,
            WorkStatus::Approved,
            WorkStatus::Rejected,
        ] {
            for decision in [
                Decision::Approve,
                Decision::Reject,
                Decision::RequestJustification,
            ] {
                assert_eq!(status.after(decision), None);
            }
        }
    }

    #[test]
    fn no_decision_targets_submitted() {
        for decision in [
            Decision::Approve,
            Decision::Reject,
            Decision::RequestJustification,
        ] {
            assert_ne!(decision.target_status(), WorkStatus::Submitted);
        }
    }

    #[test]
    fn only_approval_allows_empty_comment() {
        assert!(!Decision::Approve.requires_comment());
        assert!(Decision::Reject.requires_comment());
        assert!(Decision::RequestJustification.requires_comment());
    }

    #[test]
    fn notification_messages_include_title_and_reason() {
        assert_eq!(
            Decision::Approve.notification_message("Redes Neuronais", None),
            "O seu TFC \"Redes Neuronais\" foi aprovado!"
        );
        assert_eq!(
            Decision::Reject.notification_message("Redes Neuronais", Some("Plágio")),
            "O seu TFC \"Redes Neuronais\" foi rejeitado. Motivo: Plágio"
        );
        assert!(
            Decision::RequestJustification
                .notification_message("X", Some("Rever metodologia"))
                .ends_with("Rever metodologia")
        );
    }

    #[test]
    fn status_deserializes_from_json_text() {
        let status: WorkStatus = serde_json::from_str("\"under_review\"").unwrap();
        assert_eq!(status, WorkStatus::UnderReview);
        assert!(serde_json::from_str::<WorkStatus>("\"archived\"").is_err());
    }
}
