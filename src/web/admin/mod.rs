mod areas;
mod auth;
mod settings;
mod types;
mod users;

pub use areas::{create_research_area, delete_research_area};
pub use auth::require_admin_user;
pub use settings::render_settings_tab;
pub use types::{DashboardQuery, DashboardTab};
pub use users::{update_user_active, update_user_role};
