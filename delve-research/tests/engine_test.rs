//! End-to-end run through the engine facade

mod common;

use common::*;
use delve_core::{CancellationToken, DelveConfig};
use delve_research::{prompts, ResearchBudget, ResearchEngine};
use std::sync::Arc;

#[tokio::test]
async fn test_research_then_report() {
    let model = Arc::new(FakeModel::well_behaved());
    let search = Arc::new(FakeSearch::new());
    let engine =
        ResearchEngine::new(capabilities(model.clone(), search.clone()), DelveConfig::default())
            .unwrap();
    let cancel = CancellationToken::new();

    let result = engine
        .research("X", ResearchBudget { breadth: 2, depth: 1 }, &cancel)
        .await
        .unwrap();
    let report = engine.write_report("X", &result, &cancel).await.unwrap();

    assert!(report.starts_with("# Report"));
    assert!(report.ends_with(&format!(
        "## Sources\n\n- {}\n- {}",
        url_for("q0-0"),
        url_for("q0-1")
    )));

    let report_prompts = model.report_prompts.lock().unwrap();
    assert_eq!(report_prompts.len(), 1);
    assert!(report_prompts[0].contains("<learning>\nlearning about q0-0\n</learning>"));
}

#[tokio::test]
async fn test_default_budget_comes_from_config() {
    let mut config = DelveConfig::default();
    config.research.default_breadth = 3;
    config.research.default_depth = 1;

    let engine = ResearchEngine::new(
        capabilities(Arc::new(FakeModel::well_behaved()), Arc::new(FakeSearch::new())),
        config,
    )
    .unwrap();

    assert_eq!(engine.default_budget(), ResearchBudget { breadth: 3, depth: 1 });
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let result = ResearchEngine::new(
        capabilities(Arc::new(FakeModel::well_behaved()), Arc::new(FakeSearch::new())),
        config_with_concurrency(0),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_clarifying_questions_feed_combined_query() {
    let engine = ResearchEngine::new(
        capabilities(Arc::new(FakeModel::well_behaved()), Arc::new(FakeSearch::new())),
        DelveConfig::default(),
    )
    .unwrap();

    let questions = engine.clarifying_questions("Battery chemistry").await.unwrap();
    assert_eq!(questions.len(), 2);

    let answers: Vec<(String, String)> = questions
        .into_iter()
        .map(|q| (q, "recent work only".to_string()))
        .collect();
    let combined = prompts::combined_query("Battery chemistry", &answers);

    assert!(combined.starts_with("Initial Query: Battery chemistry\n"));
    assert!(combined.contains("Q: Any time frame?\nA: recent work only"));
}
