//! 病历数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// 病历记录，归属创建它的账户
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// 病历唯一 ID (UUID)
    pub id: String,
    /// 创建者账户 ID，所有读写都按它过滤
    pub owner_id: String,
    /// 名
    pub name: String,
    /// 姓
    pub lastname: String,
    /// 年龄，必须大于 1
    pub age: i64,
    /// 治疗进度
    pub progress: Option<f64>,
    /// 头像 URL
    pub avatar: Option<String>,
    /// 创建时间
    pub created_at: Option<DateTime<Utc>>,
    /// 更新时间
    pub updated_at: Option<DateTime<Utc>>,
}

/// 新建病历请求
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    pub lastname: String,
    pub age: i64,
    pub progress: Option<f64>,
    pub avatar: Option<String>,
}

/// 更新病历请求，字段均可选
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub lastname: Option<String>,
    pub age: Option<i64>,
    pub progress: Option<f64>,
    pub avatar: Option<String>,
}
