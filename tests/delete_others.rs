//! The deleteOthers sweep: rows the request did not explicitly keep are
//! removed, and the sweep runs before any new children are written.

mod common;

use common::{child_row, demo_catalog, parent_row, with_savepoints, ScriptedSession};
use graft::{
    GraftEngine, GraftErrorCode, MutationInput, MutationOperation, MutationRequest, Projection,
    RelationInput, Row, RowLocator, Value,
};

fn create_parent_request(input: MutationInput) -> MutationRequest {
    MutationRequest {
        table: "parent".into(),
        operation: MutationOperation::Create {
            input,
            upsert: false,
        },
        projection: Projection::all(),
        caller: Default::default(),
        client_context: None,
    }
}

#[tokio::test]
async fn sweep_keeps_connected_rows_and_runs_before_creates() {
    // Children 99 (connected, kept), 100 (swept) and 101 (created after).
    let engine = GraftEngine::new(demo_catalog());
    let session = ScriptedSession::new(with_savepoints(|stmt| {
        if stmt.text.starts_with("INSERT INTO \"parent\"") {
            Ok(vec![parent_row(1, "p")])
        } else if stmt.text.starts_with("UPDATE \"child\"") {
            Ok(vec![child_row(99, 1, "kept")])
        } else if stmt.text.starts_with("DELETE FROM \"child\"") {
            Ok(vec![child_row(100, 1, "swept")])
        } else if stmt.text.starts_with("INSERT INTO \"child\"") {
            Ok(vec![child_row(101, 1, "new")])
        } else if stmt.text.starts_with("SELECT * FROM \"parent\"") {
            Ok(vec![parent_row(1, "p")])
        } else {
            panic!("unexpected statement: {}", stmt.text);
        }
    }));

    let input = MutationInput::new(Row::from_pairs([("name", Value::text("p"))])).with_relation(
        "child_parent_fkey",
        RelationInput::new()
            .connect(RowLocator::ByKeys(Row::from_pairs([(
                "id",
                Value::Integer(99),
            )])))
            .delete_others()
            .create(MutationInput::new(Row::from_pairs([(
                "name",
                Value::text("new"),
            )]))),
    );
    engine
        .mutate(&session, &create_parent_request(input))
        .await
        .expect("mutation succeeds");

    let sweep = session
        .statements()
        .into_iter()
        .find(|s| s.text.starts_with("DELETE FROM \"child\""))
        .expect("sweep issued");
    assert_eq!(
        sweep.text,
        "DELETE FROM \"child\" WHERE (\"parent_id\" = $1) AND NOT (\"id\" = $2)"
    );
    assert_eq!(sweep.params, vec![Value::Integer(1), Value::Integer(99)]);

    let sweep_at = session.position_of("DELETE FROM \"child\"").unwrap();
    let create_at = session.position_of("INSERT INTO \"child\"").unwrap();
    assert!(sweep_at < create_at, "sweep must precede new children");
}

#[tokio::test]
async fn sweep_alone_removes_every_connected_row() {
    let engine = GraftEngine::new(demo_catalog());
    let session = ScriptedSession::new(with_savepoints(|stmt| {
        if stmt.text.starts_with("INSERT INTO \"parent\"") {
            Ok(vec![parent_row(1, "p")])
        } else if stmt.text.starts_with("DELETE FROM \"child\"") {
            Ok(Vec::new())
        } else if stmt.text.starts_with("SELECT * FROM \"parent\"") {
            Ok(vec![parent_row(1, "p")])
        } else {
            panic!("unexpected statement: {}", stmt.text);
        }
    }));

    let input = MutationInput::new(Row::from_pairs([("name", Value::text("p"))]))
        .with_relation("child_parent_fkey", RelationInput::new().delete_others());
    engine
        .mutate(&session, &create_parent_request(input))
        .await
        .expect("mutation succeeds");

    let sweep = session
        .statements()
        .into_iter()
        .find(|s| s.text.starts_with("DELETE FROM \"child\""))
        .expect("sweep issued");
    assert_eq!(sweep.text, "DELETE FROM \"child\" WHERE (\"parent_id\" = $1)");
    assert_eq!(sweep.params, vec![Value::Integer(1)]);
}

#[tokio::test]
async fn updated_children_are_kept_by_the_sweep() {
    let engine = GraftEngine::new(demo_catalog());
    let session = ScriptedSession::new(with_savepoints(|stmt| {
        if stmt.text.starts_with("INSERT INTO \"parent\"") {
            Ok(vec![parent_row(1, "p")])
        } else if stmt.text.starts_with("UPDATE \"child\"") {
            Ok(vec![child_row(55, 1, "renamed")])
        } else if stmt.text.starts_with("DELETE FROM \"child\"") {
            Ok(Vec::new())
        } else if stmt.text.starts_with("SELECT * FROM \"parent\"") {
            Ok(vec![parent_row(1, "p")])
        } else {
            panic!("unexpected statement: {}", stmt.text);
        }
    }));

    let input = MutationInput::new(Row::from_pairs([("name", Value::text("p"))])).with_relation(
        "child_parent_fkey",
        RelationInput::new()
            .update(
                RowLocator::ByKeys(Row::from_pairs([("id", Value::Integer(55))])),
                Row::from_pairs([("name", Value::text("renamed"))]),
            )
            .delete_others(),
    );
    engine
        .mutate(&session, &create_parent_request(input))
        .await
        .expect("mutation succeeds");

    let sweep = session
        .statements()
        .into_iter()
        .find(|s| s.text.starts_with("DELETE FROM \"child\""))
        .expect("sweep issued");
    assert_eq!(sweep.params, vec![Value::Integer(1), Value::Integer(55)]);
}

#[tokio::test]
async fn sweep_on_a_forward_relation_is_illegal() {
    let engine = GraftEngine::new(demo_catalog());
    let session = ScriptedSession::new(with_savepoints(|stmt| {
        panic!("no data statement should run: {}", stmt.text);
    }));

    let input = MutationInput::new(Row::from_pairs([("name", Value::text("c"))]))
        .with_relation("child_parent_fkey", RelationInput::new().delete_others());
    let request = MutationRequest {
        table: "child".into(),
        operation: MutationOperation::Create {
            input,
            upsert: false,
        },
        projection: Projection::all(),
        caller: Default::default(),
        client_context: None,
    };
    let err = engine
        .mutate(&session, &request)
        .await
        .expect_err("deleteOthers has no forward meaning");
    assert_eq!(err.code(), GraftErrorCode::IllegalVerb);
}
