pub mod access;
pub mod admin;
pub mod auth;
pub mod data;
pub mod flash;
pub mod landing;
pub mod models;
pub mod responses;
pub mod router;
pub mod state;
pub mod storage;
pub mod templates;
pub mod upload_ui;
pub mod uploads;

pub use auth::AuthUser;
pub use responses::{ApiMessage, json_error};
pub use state::AppState;
pub use templates::{escape_html, render_login_page, render_sign_up_page};
