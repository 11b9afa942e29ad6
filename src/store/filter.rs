use serde_json::Value;
use uuid::Uuid;

/// Field-match filter over JSON documents. Conditions combine conjunctively.
#[derive(Debug, Clone, Default)]
pub struct DocFilter {
    conditions: Vec<Condition>,
}

#[derive(Debug, Clone)]
enum Condition {
    /// document identity column
    IdEq(Uuid),
    /// exact match on a document field
    Eq(String, Value),
    /// case-insensitive substring match on a document field
    ContainsCi(String, String),
}

impl DocFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_eq(mut self, id: Uuid) -> Self {
        self.conditions.push(Condition::IdEq(id));
        self
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    pub fn contains_ci(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::ContainsCi(field.into(), needle.into()));
        self
    }

    /// Compile to a SQL predicate plus its parameters, numbering placeholders
    /// from `start_index`.
    pub fn to_sql(&self, start_index: usize) -> (String, Vec<Value>) {
        if self.conditions.is_empty() {
            return ("TRUE".to_string(), vec![]);
        }

        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut params = Vec::with_capacity(self.conditions.len());
        let mut index = start_index;

        for condition in &self.conditions {
            match condition {
                Condition::IdEq(id) => {
                    clauses.push(format!("id = ${}::uuid", index));
                    params.push(Value::String(id.to_string()));
                }
                Condition::Eq(field, value) => {
                    clauses.push(format!("{} = ${}", field_expr(field), index));
                    params.push(value.clone());
                }
                Condition::ContainsCi(field, needle) => {
                    clauses.push(format!("{} ILIKE '%' || ${} || '%'", field_expr(field), index));
                    params.push(Value::String(needle.clone()));
                }
            }
            index += 1;
        }

        (clauses.join(" AND "), params)
    }
}

/// Extract a document field as text. Field names come from handler code,
/// never from clients; quoting keeps a stray apostrophe from breaking the
/// statement.
fn field_expr(field: &str) -> String {
    format!("doc->>'{}'", field.replace('\'', "''"))
}
