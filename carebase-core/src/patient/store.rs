//! 病历存储：按创建者隔离的文件持久化

use super::models::{CreatePatientRequest, Patient, UpdatePatientRequest};
use crate::error::{AccountError, Result};
use chrono::Utc;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tracing::instrument;
use uuid::Uuid;

/// 病历存储，每条记录一个 JSON 文件：`<data>/patients/<id>.json`
#[derive(Debug, Clone)]
pub struct PatientStore {
    data_dir: PathBuf,
}

impl PatientStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn patients_dir(&self) -> PathBuf {
        self.data_dir.join("patients")
    }

    fn patient_path(&self, id: &str) -> PathBuf {
        self.patients_dir().join(format!("{}.json", id))
    }

    async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.patients_dir()).await?;
        Ok(())
    }

    /// id 只允许字母数字与连字符；其余一律按不存在处理。
    fn validate_id(&self, id: &str) -> Result<()> {
        let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if valid {
            Ok(())
        } else {
            Err(AccountError::NotFound(format!("patient: {}", id)))
        }
    }

    /// 姓名字段修剪后必须非空。
    fn required_name(&self, value: &str, field: &str) -> Result<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AccountError::Validation(format!("{} is required", field)));
        }
        Ok(trimmed.to_string())
    }

    fn validate_age(&self, age: i64) -> Result<()> {
        if age <= 1 {
            return Err(AccountError::Validation(
                "age must be greater than 1".into(),
            ));
        }
        Ok(())
    }

    async fn persist(&self, patient: &Patient) -> Result<()> {
        let data = serde_json::to_vec(patient)?;
        tokio::fs::write(self.patient_path(&patient.id), data).await?;
        Ok(())
    }

    /// 按 id 加载并校验归属；跨属主访问与记录缺失不可区分。
    async fn load_owned(&self, owner_id: &str, id: &str) -> Result<Patient> {
        self.validate_id(id)?;
        let path = self.patient_path(id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AccountError::NotFound(format!("patient: {}", id)));
        }
        let data = tokio::fs::read(&path).await?;
        let patient: Patient = serde_json::from_slice(&data)?;
        if patient.owner_id != owner_id {
            return Err(AccountError::NotFound(format!("patient: {}", id)));
        }
        Ok(patient)
    }

    /// 新建病历，归属到创建者。
    #[instrument(skip(self, req))]
    pub async fn create_patient(
        &self,
        owner_id: &str,
        req: CreatePatientRequest,
    ) -> Result<Patient> {
        self.ensure_dirs().await?;

        let name = self.required_name(&req.name, "name")?;
        let lastname = self.required_name(&req.lastname, "lastname")?;
        self.validate_age(req.age)?;

        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name,
            lastname,
            age: req.age,
            progress: req.progress,
            avatar: req.avatar,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.persist(&patient).await?;
        Ok(patient)
    }

    /// 按 id 取病历，只有创建者可见。
    pub async fn get_patient(&self, owner_id: &str, id: &str) -> Result<Patient> {
        self.load_owned(owner_id, id).await
    }

    /// 列出创建者名下的全部病历（并发加载）。
    #[instrument(skip(self))]
    pub async fn list_patients(&self, owner_id: &str) -> Result<Vec<Patient>> {
        self.ensure_dirs().await?;

        // 先收集所有记录 ID
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(self.patients_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if let Some(id) = file_name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }

        // 并发加载再按归属过滤
        let futures: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let store = self.clone();
                async move {
                    let data = tokio::fs::read(store.patient_path(&id)).await?;
                    let patient: Patient = serde_json::from_slice(&data)?;
                    Ok::<_, AccountError>(patient)
                }
            })
            .collect();

        let results = join_all(futures).await;
        let mut patients = Vec::with_capacity(results.len());
        for result in results {
            let patient = result?;
            if patient.owner_id == owner_id {
                patients.push(patient);
            }
        }
        Ok(patients)
    }

    /// 更新病历字段，只有创建者可改。
    #[instrument(skip(self, req))]
    pub async fn update_patient(
        &self,
        owner_id: &str,
        id: &str,
        req: UpdatePatientRequest,
    ) -> Result<Patient> {
        let mut patient = self.load_owned(owner_id, id).await?;

        if let Some(name) = req.name.as_deref() {
            patient.name = self.required_name(name, "name")?;
        }
        if let Some(lastname) = req.lastname.as_deref() {
            patient.lastname = self.required_name(lastname, "lastname")?;
        }
        if let Some(age) = req.age {
            self.validate_age(age)?;
            patient.age = age;
        }
        if let Some(progress) = req.progress {
            patient.progress = Some(progress);
        }
        if let Some(avatar) = req.avatar {
            patient.avatar = Some(avatar);
        }
        patient.updated_at = Some(Utc::now());

        self.persist(&patient).await?;
        Ok(patient)
    }

    /// 删除病历并返回被删除的记录，只有创建者可删。
    #[instrument(skip(self))]
    pub async fn delete_patient(&self, owner_id: &str, id: &str) -> Result<Patient> {
        let patient = self.load_owned(owner_id, id).await?;
        tokio::fs::remove_file(self.patient_path(id)).await?;
        Ok(patient)
    }
}
