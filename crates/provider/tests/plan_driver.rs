use std::io::Write as _;
use std::sync::Arc;

use cirrus_provider::driver::{self, Action, PlanFile};
use cirrus_provider::sim::Operation;
use cirrus_provider::state::get_string_attr;
use cirrus_provider::{CirrusProvider, ProviderConfig, Registry, SimulatedCloud};

fn provider(settle_polls: u32) -> (Arc<SimulatedCloud>, CirrusProvider) {
    let cloud = Arc::new(SimulatedCloud::with_settle_polls(settle_polls));
    let provider = CirrusProvider::new(Registry::builtin(), cloud.clone(), ProviderConfig::default());
    (cloud, provider)
}

fn plan(json: &str) -> PlanFile {
    serde_json::from_str(json).unwrap()
}

/// Create, grow, replace on a namespace change, then destroy.
#[tokio::test(start_paused = true)]
async fn workgroup_through_its_lifecycle() {
    let (cloud, provider) = provider(2);
    let plan = plan(
        r#"{
            "provider": {"region": "eu-west-1"},
            "steps": [
                {"address": "wg.etl", "type": "cirrus_workgroup",
                 "config": {"workgroup_name": "etl", "namespace_name": "lake", "base_capacity": 32}},
                {"address": "wg.etl", "type": "cirrus_workgroup",
                 "config": {"workgroup_name": "etl", "namespace_name": "lake", "base_capacity": 64}},
                {"address": "wg.etl", "type": "cirrus_workgroup",
                 "config": {"workgroup_name": "etl", "namespace_name": "archive", "base_capacity": 64}},
                {"address": "wg.etl", "type": "cirrus_workgroup", "config": null}
            ]
        }"#,
    );

    let outcomes = driver::run(&provider, &plan).await;

    let actions: Vec<_> = outcomes.iter().map(|o| o.action).collect();
    assert_eq!(
        actions,
        vec![Action::Create, Action::Update, Action::Replace, Action::Delete]
    );
    assert!(outcomes.iter().all(|o| !o.failed()), "{:?}", outcomes);
    assert_eq!(get_string_attr(&outcomes[2].state, "namespace_name"), "archive");
    assert!(outcomes[3].state.is_null());

    assert_eq!(cloud.call_count(Operation::CreateWorkgroup), 2);
    assert_eq!(cloud.call_count(Operation::DeleteWorkgroup), 2);
    assert!(cloud.peek_workgroup("etl").is_none());
}

#[tokio::test(start_paused = true)]
async fn run_stops_at_first_failure() {
    let (cloud, provider) = provider(0);
    let plan = plan(
        r#"{
            "steps": [
                {"address": "wg.a", "type": "cirrus_workgroup",
                 "config": {"workgroup_name": "a", "namespace_name": "lake"}},
                {"address": "wg.a", "type": "cirrus_workgroup",
                 "config": {"workgroup_name": "a", "namespace_name": "lake",
                            "config_parameter": [{"parameter_key": "not_a_parameter", "parameter_value": "1"}]}},
                {"address": "wg.b", "type": "cirrus_workgroup",
                 "config": {"workgroup_name": "b", "namespace_name": "lake"}}
            ]
        }"#,
    );

    let outcomes = driver::run(&provider, &plan).await;

    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].failed());
    assert!(outcomes[1].failed());
    assert_eq!(get_string_attr(&outcomes[1].state, "id"), "a");
    assert_eq!(cloud.call_count(Operation::CreateWorkgroup), 1);
}

#[tokio::test(start_paused = true)]
async fn import_adopts_existing_workgroup() {
    let (cloud, provider) = provider(0);
    let setup = plan(
        r#"{"steps": [{"address": "wg.x", "type": "cirrus_workgroup",
                       "config": {"workgroup_name": "shared", "namespace_name": "lake"}}]}"#,
    );
    driver::run(&provider, &setup).await;

    let adopt = plan(
        r#"{
            "steps": [
                {"address": "wg.y", "type": "cirrus_workgroup", "import": "shared"},
                {"address": "wg.y", "type": "cirrus_workgroup", "config": null}
            ]
        }"#,
    );
    let outcomes = driver::run(&provider, &adopt).await;

    assert_eq!(outcomes[0].action, Action::Import);
    assert_eq!(get_string_attr(&outcomes[0].state, "id"), "shared");
    assert_eq!(outcomes[1].action, Action::Delete);
    assert!(cloud.peek_workgroup("shared").is_none());
}

#[tokio::test]
async fn unknown_resource_type_fails_the_step() {
    let (_cloud, provider) = provider(0);
    let plan = plan(
        r#"{"steps": [{"address": "c.main", "type": "cirrus_cluster", "config": {"name": "main"}}]}"#,
    );

    let outcomes = driver::run(&provider, &plan).await;

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].failed());
    assert_eq!(outcomes[0].action, Action::NoOp);
}

#[test]
fn load_reads_plan_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"steps": [{{"address": "wg.a", "type": "cirrus_workgroup", "config": null}}]}}"#
    )
    .unwrap();

    let plan = PlanFile::load(file.path()).unwrap();
    assert_eq!(plan.steps.len(), 1);
    assert!(plan.steps[0].config.is_null());

    let missing = PlanFile::load(std::path::Path::new("/nonexistent/plan.json"));
    assert!(missing.unwrap_err().to_string().contains("reading plan file"));
}
