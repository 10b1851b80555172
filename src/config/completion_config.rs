// ==========================================
// 课程完成度跟踪 - 任务配置值对象
// ==========================================
// 职责: 显式承载任务所需的全部配置，构造任务时传入
// ==========================================

use crate::domain::types::RoleId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// RoleFilter - 可计分角色过滤
// ==========================================
// 空集合 = 不限制角色类型（仍要求持有至少一个课程角色）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleFilter(BTreeSet<RoleId>);

impl RoleFilter {
    /// 不限制角色
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, role_id: RoleId) -> bool {
        self.0.contains(&role_id)
    }

    /// 升序的角色 ID 列表（用于绑定 SQL 参数）
    pub fn role_ids(&self) -> Vec<RoleId> {
        self.0.iter().copied().collect()
    }

    /// 角色过滤是否放行
    ///
    /// 学员必须在课程中持有至少一个角色；不限制时任意角色均可，
    /// 否则需持有过滤集内的角色
    pub fn admits<I>(&self, held_roles: I) -> bool
    where
        I: IntoIterator<Item = RoleId>,
    {
        held_roles
            .into_iter()
            .any(|r| self.is_unrestricted() || self.contains(r))
    }
}

impl FromIterator<RoleId> for RoleFilter {
    fn from_iter<T: IntoIterator<Item = RoleId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ==========================================
// CompletionConfig - 任务配置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// 站点级完成度开关；关闭时任务不做任何事
    pub completion_enabled: bool,
    /// 可计分角色过滤
    pub role_filter: RoleFilter,
}

impl CompletionConfig {
    pub fn new(completion_enabled: bool, role_filter: RoleFilter) -> Self {
        Self {
            completion_enabled,
            role_filter,
        }
    }

    /// 启用完成度、不限制角色
    pub fn enabled() -> Self {
        Self::new(true, RoleFilter::unrestricted())
    }
}
