/// Profile access level. `admin` users are coordinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Admin,
    Student,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Admin => "admin",
            AccessLevel::Student => "student",
        }
    }

    pub fn label_pt(&self) -> &'static str {
        match self {
            AccessLevel::Admin => "Coordenador",
            AccessLevel::Student => "Estudante",
        }
    }

    /// Unknown stored values fall back to the least privileged level.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "admin" => AccessLevel::Admin,
            _ => AccessLevel::Student,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(AccessLevel::Admin),
            "student" => Some(AccessLevel::Student),
            _ => None,
        }
    }

    pub fn home_path(&self) -> &'static str {
        match self {
            AccessLevel::Admin => "/dashboard",
            AccessLevel::Student => "/estudante",
        }
    }
}

pub const LOGIN_PATH: &str = "/auth/login";

/// Route groups with distinct access rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    AuthPages,
    Student,
    Coordinator,
}

/// Decides whether a visitor may enter an area, returning the redirect target otherwise.
pub fn gate(area: Area, level: Option<AccessLevel>) -> Result<(), &'static str> {
    match (area, level) {
        (Area::AuthPages, None) => Ok(()),
        (Area::AuthPages, Some(level)) => Err(level.home_path()),
        (_, None) => Err(LOGIN_PATH),
        (Area::Student, Some(AccessLevel::Student)) => Ok(()),
        (Area::Student, Some(AccessLevel::Admin)) => Err("/dashboard"),
        (Area::Coordinator, Some(AccessLevel::Admin)) => Ok(()),
        (Area::Coordinator, Some(AccessLevel::Student)) => Err("/estudante?error=not_authorized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_visitors_are_sent_to_login() {
        assert_eq!(gate(Area::Student, None), Err(LOGIN_PATH));
        assert_eq!(gate(Area::Coordinator, None), Err(LOGIN_PATH));
        assert_eq!(gate(Area::AuthPages, None), Ok(()));
    }

    #[test]
    fn students_cannot_enter_coordinator_area() {
        assert_eq!(
            gate(Area::Coordinator, Some(AccessLevel::Student)),
            Err("/estudante?error=not_authorized")
        );
        assert_eq!(gate(Area::Student, Some(AccessLevel::Student)), Ok(()));
    }

    #[test]
    fn signed_in_users_leave_auth_pages_by_role() {
        assert_eq!(
            gate(Area::AuthPages, Some(AccessLevel::Admin)),
            Err("/dashboard")
        );
        assert_eq!(
            gate(Area::AuthPages, Some(AccessLevel::Student)),
            Err("/estudante")
        );
    }

    #[test]
    fn coordinators_use_the_dashboard() {
        assert_eq!(gate(Area::Coordinator, Some(AccessLevel::Admin)), Ok(()));
        assert_eq!(gate(Area::Student, Some(AccessLevel::Admin)), Err("/dashboard"));
    }

    #[test]
    fn unknown_stored_level_is_student() {
        assert_eq!(AccessLevel::from_stored("usuario"), AccessLevel::Student);
        assert_eq!(AccessLevel::parse("usuario"), None);
    }
}
