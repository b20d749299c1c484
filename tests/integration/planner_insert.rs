//! Integration tests for batched block insertion

use std::sync::Arc;
use std::time::Duration;

use docsync::{BlockDescriptor, MutationPlanner, PlannerConfig, StyledRun};
use serde_json::json;

use crate::support::{test_client, RecordingTransport};

fn planner(transport: &Arc<RecordingTransport>) -> MutationPlanner {
    MutationPlanner::with_config(
        test_client(Arc::clone(transport)),
        PlannerConfig {
            batch_size: 50,
            settle_delay: Duration::ZERO,
        },
    )
}

fn paragraphs(count: usize) -> Vec<BlockDescriptor> {
    (0..count)
        .map(|i| BlockDescriptor::paragraph(vec![StyledRun::plain(format!("line {i}"))]))
        .collect()
}

#[tokio::test]
async fn test_insert_chunks_at_batch_size() {
    let transport = Arc::new(RecordingTransport::new());
    let planner = planner(&transport);

    let inserted = planner
        .insert("d1", "d1", 0, &paragraphs(120))
        .await
        .unwrap();

    assert_eq!(inserted, 120);
    let requests = transport.requests();
    assert_eq!(requests.len(), 3);

    let sizes: Vec<usize> = requests
        .iter()
        .map(|r| r.body.as_ref().unwrap()["children"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![50, 50, 20]);

    let indices: Vec<u64> = requests
        .iter()
        .map(|r| r.body.as_ref().unwrap()["index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices, vec![0, 50, 100]);
}

#[tokio::test]
async fn test_insert_addresses_latest_revision() {
    let transport = Arc::new(RecordingTransport::new());
    let planner = planner(&transport);

    planner.insert("d1", "d1", 5, &paragraphs(1)).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].url, "https://docs.example.com/api/v1/documents/d1/blocks/d1/children");
    assert!(requests[0]
        .query
        .contains(&("document_revision_id".to_string(), "-1".to_string())));
}

#[tokio::test]
async fn test_table_uses_three_step_protocol() {
    let transport = Arc::new(RecordingTransport::new());
    // Leading paragraph batch.
    transport.push_data(json!({ "children": [] }));
    // Structural table create returns the table block with its
    // generated cell ids.
    transport.push_data(json!({
        "children": [{
            "block_id": "tbl1",
            "block_type": 31,
            "children": ["c1", "c2", "c3", "c4"],
            "table": {
                "property": { "row_size": 2, "column_size": 2 },
                "cells": ["c1", "c2", "c3", "c4"]
            }
        }]
    }));

    let planner = planner(&transport);
    let descriptors = vec![
        BlockDescriptor::paragraph(vec![StyledRun::plain("before")]),
        BlockDescriptor::table(
            2,
            2,
            vec![
                vec![StyledRun::plain("a")],
                vec![StyledRun::plain("b")],
                Vec::new(),
                vec![StyledRun::plain("d")],
            ],
        ),
        BlockDescriptor::paragraph(vec![StyledRun::plain("after")]),
    ];

    let inserted = planner.insert("d1", "d1", 0, &descriptors).await.unwrap();
    assert_eq!(inserted, 3);

    let requests = transport.requests();
    // Paragraph batch, table create, three cell fills (the empty cell
    // is skipped), trailing paragraph batch. The cell ids come from the
    // create response, so no read-back call happens.
    assert_eq!(requests.len(), 6);

    let table_create = requests[1].body.as_ref().unwrap();
    assert_eq!(table_create["index"], 1);
    let table_wire = &table_create["children"][0];
    assert_eq!(table_wire["block_type"], 31);
    assert_eq!(table_wire["table"]["property"]["row_size"], 2);
    // Cell contents never travel with the structural create.
    assert!(table_wire["table"].get("cells").is_none());

    let fill_urls: Vec<&str> = requests[2..5].iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        fill_urls,
        vec![
            "https://docs.example.com/api/v1/documents/d1/blocks/c1/children",
            "https://docs.example.com/api/v1/documents/d1/blocks/c2/children",
            "https://docs.example.com/api/v1/documents/d1/blocks/c4/children",
        ]
    );
    for fill in &requests[2..5] {
        assert_eq!(fill.body.as_ref().unwrap()["index"], 0);
    }

    let trailing = requests[5].body.as_ref().unwrap();
    assert_eq!(trailing["index"], 2);
}

#[tokio::test]
async fn test_table_create_without_cell_ids_falls_back_to_read_back() {
    let transport = Arc::new(RecordingTransport::new());
    // Create response carries the table block but no cell ids yet.
    transport.push_data(json!({
        "children": [{ "block_id": "tbl1", "block_type": 31 }]
    }));
    transport.push_data(json!({
        "block": {
            "block_id": "tbl1",
            "block_type": 31,
            "children": ["c1", "c2"],
            "table": {
                "property": { "row_size": 1, "column_size": 2 },
                "cells": ["c1", "c2"]
            }
        }
    }));

    let planner = planner(&transport);
    let table = BlockDescriptor::table(
        1,
        2,
        vec![vec![StyledRun::plain("a")], vec![StyledRun::plain("b")]],
    );

    planner.insert("d1", "d1", 0, &[table]).await.unwrap();

    let requests = transport.requests();
    // Create, read-back of the table block, two cell fills.
    assert_eq!(requests.len(), 4);
    assert!(requests[1].url.ends_with("/documents/d1/blocks/tbl1"));
    assert!(requests[2].url.ends_with("/documents/d1/blocks/c1/children"));
    assert!(requests[3].url.ends_with("/documents/d1/blocks/c2/children"));
}

#[tokio::test]
async fn test_table_cell_fill_is_lenient_about_geometry() {
    let transport = Arc::new(RecordingTransport::new());
    transport.push_data(json!({
        "children": [{ "block_id": "tbl1", "block_type": 31 }]
    }));
    // Service materialized fewer cells than requested.
    transport.push_data(json!({
        "block": {
            "block_id": "tbl1",
            "block_type": 31,
            "children": ["c1", "c2"],
            "table": {
                "property": { "row_size": 2, "column_size": 2 },
                "cells": ["c1", "c2"]
            }
        }
    }));

    let planner = planner(&transport);
    let table = BlockDescriptor::table(
        2,
        2,
        vec![
            vec![StyledRun::plain("a")],
            vec![StyledRun::plain("b")],
            vec![StyledRun::plain("c")],
            vec![StyledRun::plain("d")],
        ],
    );

    planner.insert("d1", "d1", 0, &[table]).await.unwrap();

    // Create, read, and exactly two fills; the surplus contents are
    // dropped instead of failing the insert.
    assert_eq!(transport.request_count(), 4);
}

#[tokio::test]
async fn test_empty_insert_makes_no_calls() {
    let transport = Arc::new(RecordingTransport::new());
    let planner = planner(&transport);

    let inserted = planner.insert("d1", "d1", 0, &[]).await.unwrap();

    assert_eq!(inserted, 0);
    assert_eq!(transport.request_count(), 0);
}
