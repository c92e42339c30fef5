#![allow(dead_code)]

//! Shared fixtures: a scripted session double and a two-table catalog.

use async_trait::async_trait;
use graft::{
    Catalog, ColumnDef, ColumnType, ForeignKey, GraftError, Row, Session, SqlStatement,
    TableSchema, Value,
};
use parking_lot::Mutex;

type Handler = Box<dyn Fn(&SqlStatement) -> Result<Vec<Row>, GraftError> + Send + Sync>;

/// A [`Session`] whose responses are decided by a closure over the statement
/// text. Every executed statement, savepoint traffic included, is recorded in
/// order.
pub struct ScriptedSession {
    log: Mutex<Vec<SqlStatement>>,
    handler: Handler,
}

impl ScriptedSession {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&SqlStatement) -> Result<Vec<Row>, GraftError> + Send + Sync + 'static,
    {
        Self {
            log: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub fn statements(&self) -> Vec<SqlStatement> {
        self.log.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.log.lock().iter().map(|s| s.text.clone()).collect()
    }

    /// Index of the first logged statement whose text starts with `prefix`.
    pub fn position_of(&self, prefix: &str) -> Option<usize> {
        self.log
            .lock()
            .iter()
            .position(|s| s.text.starts_with(prefix))
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn execute(&self, statement: &SqlStatement) -> Result<Vec<Row>, GraftError> {
        self.log.lock().push(statement.clone());
        (self.handler)(statement)
    }
}

/// Answers savepoint traffic with empty results; other statements fall
/// through to `handler`.
pub fn with_savepoints<F>(
    handler: F,
) -> impl Fn(&SqlStatement) -> Result<Vec<Row>, GraftError> + Send + Sync + 'static
where
    F: Fn(&SqlStatement) -> Result<Vec<Row>, GraftError> + Send + Sync + 'static,
{
    move |statement| {
        let text = statement.text.as_str();
        if text.starts_with("SAVEPOINT")
            || text.starts_with("ROLLBACK TO SAVEPOINT")
            || text.starts_with("RELEASE SAVEPOINT")
        {
            return Ok(Vec::new());
        }
        handler(statement)
    }
}

/// parent(id pk default, name) and child(id pk default, parent_id, name)
/// joined by `child_parent_fkey`.
pub fn demo_catalog() -> Catalog {
    let mut parent = TableSchema::new("parent");
    parent.columns = vec![
        ColumnDef::new("id", ColumnType::Integer).with_default(),
        ColumnDef::new("name", ColumnType::Text),
    ];
    parent.primary_key = vec!["id".into()];

    let mut child = TableSchema::new("child");
    child.columns = vec![
        ColumnDef::new("id", ColumnType::Integer).with_default(),
        ColumnDef::new("parent_id", ColumnType::Integer).nullable(),
        ColumnDef::new("name", ColumnType::Text),
    ];
    child.primary_key = vec!["id".into()];
    child.foreign_keys = vec![ForeignKey {
        name: "child_parent_fkey".into(),
        columns: vec!["parent_id".into()],
        references_table: "parent".into(),
        references_columns: vec!["id".into()],
    }];

    Catalog::builder()
        .table(parent)
        .table(child)
        .build()
        .expect("demo catalog builds")
}

/// employee(id pk default, manager_id → employee.id, name): a
/// self-referencing schema. The reverse side of the key is addressed as
/// `employee_manager_fkey_reverse`.
pub fn org_catalog() -> Catalog {
    let mut employee = TableSchema::new("employee");
    employee.columns = vec![
        ColumnDef::new("id", ColumnType::Integer).with_default(),
        ColumnDef::new("manager_id", ColumnType::Integer).nullable(),
        ColumnDef::new("name", ColumnType::Text),
    ];
    employee.primary_key = vec!["id".into()];
    employee.foreign_keys = vec![ForeignKey {
        name: "employee_manager_fkey".into(),
        columns: vec!["manager_id".into()],
        references_table: "employee".into(),
        references_columns: vec!["id".into()],
    }];

    Catalog::builder()
        .table(employee)
        .build()
        .expect("org catalog builds")
}

pub fn employee_row(id: i64, manager_id: Option<i64>, name: &str) -> Row {
    Row::from_pairs([
        ("id", Value::Integer(id)),
        (
            "manager_id",
            manager_id.map_or(Value::Null, Value::Integer),
        ),
        ("name", Value::text(name)),
    ])
}

pub fn parent_row(id: i64, name: &str) -> Row {
    Row::from_pairs([("id", Value::Integer(id)), ("name", Value::text(name))])
}

pub fn child_row(id: i64, parent_id: i64, name: &str) -> Row {
    Row::from_pairs([
        ("id", Value::Integer(id)),
        ("parent_id", Value::Integer(parent_id)),
        ("name", Value::text(name)),
    ])
}
