// ==========================================
// 课程完成度跟踪 - 领域类型定义
// ==========================================
// 时间统一使用 epoch 秒 (i64)，0 表示“未设置”
// 状态枚举的整数取值与存储层一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 课程 ID
pub type CourseId = i64;
/// 用户 ID
pub type UserId = i64;
/// 角色 ID
pub type RoleId = i64;
/// epoch 秒
pub type Timestamp = i64;

// ==========================================
// 选课方式状态 (Enrol Method Status)
// ==========================================
// 存储: enrol.status (0 = 启用, 1 = 停用)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MethodStatus {
    Enabled,
    Disabled,
}

impl MethodStatus {
    pub fn as_i64(&self) -> i64 {
        match self {
            MethodStatus::Enabled => 0,
            MethodStatus::Disabled => 1,
        }
    }

    /// 非 0 一律视为停用
    pub fn from_i64(v: i64) -> Self {
        if v == 0 {
            MethodStatus::Enabled
        } else {
            MethodStatus::Disabled
        }
    }
}

impl fmt::Display for MethodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodStatus::Enabled => write!(f, "ENABLED"),
            MethodStatus::Disabled => write!(f, "DISABLED"),
        }
    }
}

// ==========================================
// 学员选课状态 (User Enrolment Status)
// ==========================================
// 存储: user_enrolments.status (0 = 正常, 1 = 暂停)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrolmentStatus {
    Active,
    Suspended,
}

impl EnrolmentStatus {
    pub fn as_i64(&self) -> i64 {
        match self {
            EnrolmentStatus::Active => 0,
            EnrolmentStatus::Suspended => 1,
        }
    }

    /// 非 0 一律视为暂停
    pub fn from_i64(v: i64) -> Self {
        if v == 0 {
            EnrolmentStatus::Active
        } else {
            EnrolmentStatus::Suspended
        }
    }
}

impl fmt::Display for EnrolmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrolmentStatus::Active => write!(f, "ACTIVE"),
            EnrolmentStatus::Suspended => write!(f, "SUSPENDED"),
        }
    }
}
