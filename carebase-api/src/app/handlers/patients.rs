//! 病历 API handlers，读写都按当前账户隔离

use axum::extract::{Path, State};
use axum::{Extension, Json};
use carebase_core::{CreatePatientRequest, Patient, UpdatePatientRequest};

use super::super::error::ApiError;
use super::super::middleware::CurrentAccount;
use super::super::state::AppState;

/// POST /api/patients - 新建病历，归属当前账户
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Json(req): Json<CreatePatientRequest>,
) -> Result<Json<Patient>, ApiError> {
    let patient = state
        .patients
        .create_patient(&current.account.id, req)
        .await?;
    Ok(Json(patient))
}

/// GET /api/patients - 列出当前账户的全部病历
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let patients = state.patients.list_patients(&current.account.id).await?;
    Ok(Json(patients))
}

/// GET /api/patients/:id - 取单个病历
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let patient = state.patients.get_patient(&current.account.id, &id).await?;
    Ok(Json(patient))
}

/// PATCH /api/patients/:id - 更新病历字段
pub async fn update_patient(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePatientRequest>,
) -> Result<Json<Patient>, ApiError> {
    let patient = state
        .patients
        .update_patient(&current.account.id, &id, req)
        .await?;
    Ok(Json(patient))
}

/// DELETE /api/patients/:id - 删除病历并返回被删除的记录
pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let patient = state
        .patients
        .delete_patient(&current.account.id, &id)
        .await?;
    Ok(Json(patient))
}
