//! Assistant proposals applied through the session.

mod common;

use serde_json::json;

use common::{session_with, ScriptedTransport};
use rpcflow::{ParamBinding, ParamValue, Proposal, ProposalError, WorkflowError};

fn field(name: &str, value: ParamValue) -> ParamBinding {
    ParamBinding {
        name: name.to_string(),
        value,
    }
}

#[tokio::test]
async fn test_unknown_method_rejects_whole_batch() {
    let transport = ScriptedTransport::new();
    let session = session_with(transport.clone());

    let err = session
        .apply_proposals(&[
            Proposal::by_field("getSlot", vec![]),
            Proposal::by_field("getFoo", vec![]),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Method 'getFoo' is not available");
    assert!(matches!(
        err,
        WorkflowError::ProposalRejected(ProposalError::MethodNotAvailable(_))
    ));
    assert!(session.workflow().is_empty());
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_missing_required_field_is_rejected() {
    let session = session_with(ScriptedTransport::new());
    let err = session
        .apply_proposals(&[Proposal::by_field(
            "getBalance",
            vec![field("commitment", ParamValue::literal(json!("finalized")))],
        )])
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Method 'getBalance' is missing required field 'pubkey'"
    );
}

#[tokio::test]
async fn test_accepted_proposals_are_appended_and_run() {
    let transport = ScriptedTransport::new();
    let session = session_with(transport.clone());
    let existing = session.add_node("getAccounts").unwrap();

    let report = session
        .apply_proposals(&[
            Proposal::by_field("getSlot", vec![]).with_local_id("slot"),
            Proposal::by_field(
                "getBlock",
                vec![field("slot", ParamValue::reference("slot", "result.call"))],
            ),
            Proposal::raw("custom_rpc", r#"[1, "two"]"#),
        ])
        .await
        .unwrap();

    assert!(report.success(), "{}", report.outcome.message());
    assert_eq!(report.created, vec!["node-1", "node-2", "node-3"]);
    // Only the new nodes run.
    assert_eq!(transport.calls(), vec!["getSlot", "getBlock", "custom_rpc"]);
    assert!(!report.outcome.calls.contains_key(&existing));

    let block = session.node("node-2").unwrap();
    assert_eq!(block.param("slot"), Some(&ParamValue::reference("node-1", "result.call")));
    assert_eq!(block.output.unwrap()["result"]["params"], json!({"slot": 1}));
    let raw = session.node("node-3").unwrap();
    assert_eq!(raw.output.unwrap()["result"]["params"], json!([1, "two"]));
}

#[tokio::test]
async fn test_failed_validation_run_is_reported() {
    let transport = ScriptedTransport::new();
    transport.respond(
        "getSlot",
        500,
        json!({"error": "upstream unavailable"}),
    );
    let session = session_with(transport.clone());

    let report = session
        .apply_proposals(&[Proposal::by_field("getSlot", vec![])])
        .await
        .unwrap();
    assert!(!report.success());
    assert_eq!(
        report.outcome.failure.unwrap().message,
        "upstream unavailable"
    );
    // The node stays in the workflow for the user to fix.
    assert_eq!(session.workflow().len(), 1);
}
