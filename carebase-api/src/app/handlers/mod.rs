mod accounts;
mod auth;
mod health;
mod passwords;
mod patients;

pub use accounts::{get_me, list_accounts, update_me};
pub use auth::{confirm_email, login, logout, register, resend_confirmation};
pub use health::health;
pub use passwords::{
    redeem_password_change, redeem_password_reset, request_password_change, request_password_reset,
};
pub use patients::{create_patient, delete_patient, get_patient, list_patients, update_patient};
