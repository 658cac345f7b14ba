//! 病历记录模块

mod models;
mod store;

pub use models::{CreatePatientRequest, Patient, UpdatePatientRequest};
pub use store::PatientStore;
