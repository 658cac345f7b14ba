//! Core library for the account service: credential lifecycle, signed sessions, and patient records.

mod error;

pub mod account;
pub mod patient;

pub use account::{
    Account, AccountMail, AccountMailer, AccountManager, AccountSummary, LogMailer, LoginRequest,
    MailKind, RegisterRequest, SessionEntry, UpdateAccountRequest, UpdateOutcome,
};
pub use error::{AccountError, Result};
pub use patient::{CreatePatientRequest, Patient, PatientStore, UpdatePatientRequest};
