use serde::Deserialize;

#[derive(Default, Deserialize)]
pub struct DashboardQuery {
    pub tab: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

/// Dashboard tabs. Unknown values fall back to the overview.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DashboardTab {
    Overview,
    Pending,
    All,
    Settings,
}

impl DashboardTab {
    pub const ALL: [DashboardTab; 4] = [
        DashboardTab::Overview,
        DashboardTab::Pending,
        DashboardTab::All,
        DashboardTab::Settings,
    ];

    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("pendentes") => DashboardTab::Pending,
            Some("todos") => DashboardTab::All,
            Some("definicoes") => DashboardTab::Settings,
            _ => DashboardTab::Overview,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            DashboardTab::Overview => "resumo",
            DashboardTab::Pending => "pendentes",
            DashboardTab::All => "todos",
            DashboardTab::Settings => "definicoes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DashboardTab::Overview => "Resumo",
            DashboardTab::Pending => "Pendentes",
            DashboardTab::All => "Todos os TFCs",
            DashboardTab::Settings => "Definições",
        }
    }
}

/// Redirect target for the settings tab with a flash code.
pub fn settings_redirect(kind: &str, code: &str) -> String {
    format!(
        "/dashboard?tab={}&{kind}={code}",
        DashboardTab::Settings.key()
    )
}
