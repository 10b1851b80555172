// ==========================================
// 课程完成度跟踪 - 参数化 SQL 构建工具
// ==========================================
// 职责: 基础谓词 + 可选谓词的拼装，参数始终通过绑定传入
// 约束: 调用方只能追加固定的 SQL 片段，值一律走 `?` 占位符
// ==========================================

use rusqlite::types::Value;

/// 参数化查询构建器（流式 API）
///
/// # 示例
/// ```
/// use completion_tracker::repository::sql_builder::SqlQueryBuilder;
///
/// let (sql, params) = SqlQueryBuilder::new("SELECT * FROM course_completions")
///     .where_clause("course = ?", [7_i64])
///     .and_in_if("user_id", &[1_i64, 2])
///     .group_by("course")
///     .build();
///
/// assert_eq!(
///     sql,
///     "SELECT * FROM course_completions WHERE course = ? AND user_id IN (?, ?) GROUP BY course"
/// );
/// assert_eq!(params.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    select_clause: String,
    where_clauses: Vec<String>,
    params: Vec<Value>,
    group_by_clause: Option<String>,
    order_by_clause: Option<String>,
}

impl SqlQueryBuilder {
    /// 创建新的 SQL 查询构建器
    pub fn new(select: &str) -> Self {
        Self {
            select_clause: select.to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            group_by_clause: None,
            order_by_clause: None,
        }
    }

    /// 添加 WHERE 条件及其绑定参数（按 `?` 出现顺序）
    pub fn where_clause<I, V>(mut self, condition: &str, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_clauses.push(condition.to_string());
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    /// 条件非空时追加 `column IN (?, ?, ...)`；空集合不追加任何条件
    pub fn and_in_if<V>(mut self, column: &str, values: &[V]) -> Self
    where
        V: Clone + Into<Value>,
    {
        if values.is_empty() {
            return self;
        }

        self.where_clauses.push(in_clause(column, values.len()));
        self.params.extend(values.iter().cloned().map(Into::into));
        self
    }

    /// 追加一个始终生效的子查询谓词，模板中的 `{}` 按需收窄
    ///
    /// - values 为空: `{}` 替换为空串
    /// - values 非空: `{}` 替换为 ` AND column IN (?, ...)`
    ///
    /// 用于 `EXISTS (SELECT 1 FROM t WHERE t.x = y{})`
    pub fn and_exists_narrowed<V>(mut self, template: &str, column: &str, values: &[V]) -> Self
    where
        V: Clone + Into<Value>,
    {
        let narrowing = if values.is_empty() {
            String::new()
        } else {
            format!(" AND {}", in_clause(column, values.len()))
        };

        self.where_clauses.push(template.replace("{}", &narrowing));
        self.params.extend(values.iter().cloned().map(Into::into));
        self
    }

    /// 添加 GROUP BY 子句
    pub fn group_by(mut self, group: &str) -> Self {
        self.group_by_clause = Some(group.to_string());
        self
    }

    /// 添加 ORDER BY 子句
    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by_clause = Some(order.to_string());
        self
    }

    /// 构建最终的 SQL 语句与参数列表
    pub fn build(self) -> (String, Vec<Value>) {
        let mut sql = self.select_clause;

        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        if let Some(group) = self.group_by_clause {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group);
        }

        if let Some(order) = self.order_by_clause {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        (sql, self.params)
    }
}

fn in_clause(column: &str, len: usize) -> String {
    format!("{} IN ({})", column, vec!["?"; len].join(", "))
}
