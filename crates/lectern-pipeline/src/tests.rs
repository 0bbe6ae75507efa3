//! End-to-end scenarios for the Summarizer

#[cfg(test)]
mod tests {
    use crate::{PipelineConfig, SummarizeRequest, Summarizer, SummaryStrategy};
    use lectern_domain::document::ERROR_SECTION_HEADING;
    use lectern_domain::PlanLimits;
    use lectern_janitor::QualityEnforcer;
    use lectern_llm::{LlmError, LlmGateway, MockBackend, MockReply};
    use lectern_store::{MemoryResponseCache, MemoryUsageLedger};
    use serde_json::{json, Value};
    use std::sync::Arc;

    const MAP: &str = "Task: map.extract";
    const OUTLINE: &str = "Task: reduce.outline";
    const FILL: &str = "Task: reduce.fill";
    const REPAIR: &str = "Task: reduce.repair";
    const SINGLE: &str = "Task: summary.single";

    const FILLER_LINE: &str = "the river carried fine silt toward the delta while the evening tide pushed back.";

    /// Markdown document with one `##` section per heading, each about 6300 chars
    fn long_document(headings: &[&str]) -> String {
        let body = vec![FILLER_LINE; 78].join("\n");
        headings
            .iter()
            .map(|h| format!("## {}\n\n{}\n", h, body))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn outline_json(headings: &[&str]) -> String {
        let sections: Vec<Value> = headings
            .iter()
            .map(|h| json!({"heading": h, "concepts": [{"term": format!("{} idea", h), "expectedExampleKind": "numeric"}]}))
            .collect();
        json!({"title": "Guide", "sections": sections}).to_string()
    }

    fn document_json(headings: &[&str]) -> String {
        let sections: Vec<Value> = headings
            .iter()
            .map(|h| {
                json!({
                    "heading": h,
                    "summary": format!("What {} covers.", h),
                    "concepts": [{
                        "term": format!("{} idea", h),
                        "definition": format!("The central idea of {}.", h),
                        "example": "With 3 units at 2 each the total is 6."
                    }],
                    "citations": [{"sourceRef": "chunk", "sectionOrHeading": h}]
                })
            })
            .collect();
        json!({
            "summary": {
                "title": "Guide",
                "overview": "A structured overview of the material.",
                "sections": sections,
                "diagrams": [{"title": "Flow", "content": "a -> b"}, {"title": "Cycle", "content": "b -> c"}],
                "pseudocode": [{"title": "Step", "code": "repeat step"}, {"title": "Check", "code": "verify input"}],
                "practiceProblems": [
                    {"question": "First question?", "solution": "1"},
                    {"question": "Second question?", "solution": "2"},
                    {"question": "Third question?", "solution": "3"}
                ]
            }
        })
        .to_string()
    }

    fn knowledge_json(term: &str) -> String {
        json!({"concepts": [{"term": term, "definition": "Extracted from the fragment."}]}).to_string()
    }

    fn summarizer(backend: &MockBackend) -> Summarizer {
        Summarizer::new(LlmGateway::new(Arc::new(backend.clone())), PipelineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_small_input_uses_single_pass() {
        let backend = MockBackend::new(document_json(&["Overview"]));
        let text = "plain prose about how plants turn sunlight into sugar and oxygen over the day. ".repeat(7);
        assert!(text.len() >= 480);

        let response = summarizer(&backend).summarize(SummarizeRequest::new(text)).await;

        assert_eq!(backend.call_count(), 1);
        assert_eq!(response.strategy, SummaryStrategy::SinglePass);
        assert!(!response.document.summary.sections.is_empty());
        assert!(!response.regenerated);
        assert_eq!(response.chunk_count, 0);
    }

    #[tokio::test]
    async fn test_large_document_runs_map_reduce() {
        let headings = [
            "Kinematics",
            "Newtonian Dynamics",
            "Work and Energy",
            "Momentum",
            "Rotational Motion",
            "Gravitation",
            "Oscillations",
            "Fluid Mechanics",
        ];
        let backend = MockBackend::new("{}");
        backend.on(MAP, MockReply::text(knowledge_json("Sediment transport")));
        backend.on(OUTLINE, MockReply::text(outline_json(&headings)));
        backend.on(FILL, MockReply::text(document_json(&headings)));

        let response = summarizer(&backend)
            .summarize(SummarizeRequest::new(long_document(&headings)))
            .await;

        assert_eq!(response.chunk_count, 8);
        assert_eq!(backend.calls_matching(MAP), 8);
        assert_eq!(backend.call_count(), response.chunk_count + 2);
        assert_eq!(response.strategy, SummaryStrategy::TwoStage);
        assert!(!response.regenerated);

        let coverage = response.coverage().unwrap();
        assert!((0.0..=1.0).contains(&coverage.score));
        assert_eq!(response.document.summary.sections.len(), 8);
        assert_eq!(response.document.summary.sections[0].heading, "Kinematics");
    }

    #[tokio::test]
    async fn test_malformed_map_output_does_not_abort() {
        let themes = ["Optics", "Waves", "Heat"];
        let planned = ["Optics", "Waves", "Heat", "Motion", "Energy", "Fields"];
        let backend = MockBackend::new("{}");
        backend.on(MAP, MockReply::text("<<the model rambled instead of answering>>"));
        backend.on(MAP, MockReply::text(knowledge_json("Interference")));
        backend.on(OUTLINE, MockReply::text(outline_json(&planned)));
        backend.on(FILL, MockReply::text(document_json(&planned)));

        let request = SummarizeRequest::new(long_document(&themes)).with_force_chunking(true);
        let response = summarizer(&backend).summarize(request).await;

        assert!(!response.document.is_failure());
        assert_eq!(response.chunk_count, 3);
        assert_eq!(response.degraded_chunks, 1);
        assert_eq!(response.strategy, SummaryStrategy::TwoStage);

        let fill_call = backend.calls().into_iter().find(|c| c.system.contains(FILL)).unwrap();
        assert!(fill_call.user.contains("Unparsed content: Optics"));
        assert!(fill_call.user.contains("Interference"));
    }

    #[tokio::test]
    async fn test_density_boost_only_above_threshold() {
        let headings = ["Optics", "Waves", "Heat", "Motion", "Energy", "Fields"];
        let text = long_document(&headings);
        let compact = "write compactly";

        for (threshold, expect_boost) in [(30_000, false), (8_000, true)] {
            let backend = MockBackend::new("{}");
            backend.on(MAP, MockReply::text(knowledge_json("Refraction")));
            backend.on(OUTLINE, MockReply::text(outline_json(&headings)));
            backend.on(FILL, MockReply::text(document_json(&headings)));
            let config = PipelineConfig {
                density_boost_tokens: threshold,
                ..PipelineConfig::default()
            };
            let summarizer = Summarizer::new(LlmGateway::new(Arc::new(backend.clone())), config).unwrap();

            let response = summarizer.summarize(SummarizeRequest::new(text.clone())).await;
            assert_eq!(response.strategy, SummaryStrategy::TwoStage);

            let calls = backend.calls();
            let fill = calls.iter().find(|c| c.system.contains(FILL)).unwrap();
            assert_eq!(fill.user.contains(compact), expect_boost);
            assert!(calls.iter().filter(|c| c.system.contains(MAP)).all(|c| !c.user.contains(compact)));
        }
    }

    #[tokio::test]
    async fn test_short_fill_is_repaired_exactly_once() {
        let planned = ["Optics", "Waves", "Heat", "Motion", "Energy", "Fields"];
        let filled = ["Optics", "Waves", "Heat"];
        let backend = MockBackend::new("{}");
        backend.on(MAP, MockReply::text(knowledge_json("Refraction")));
        backend.on(OUTLINE, MockReply::text(outline_json(&planned)));
        backend.on(FILL, MockReply::text(document_json(&filled)));
        backend.on(REPAIR, MockReply::text(document_json(&filled)));

        let text = "## Optics\n\nlight bends when it crosses into glass.\n\n## Waves\n\nsound spreads out from a source.\n";
        let request = SummarizeRequest::new(text).with_force_chunking(true);
        let response = summarizer(&backend).summarize(request).await;

        assert_eq!(backend.calls_matching(REPAIR), 1);
        assert_eq!(backend.call_count(), 4);
        assert!(!response.regenerated);
        assert_eq!(response.strategy, SummaryStrategy::TwoStage);
        assert_eq!(response.document.summary.sections.len(), 3);
    }

    #[tokio::test]
    async fn test_low_coverage_regenerates_once_with_hints() {
        let text = "## Optics\n\nlight bends.\n\n## Waves\n\nsound spreads.\n\n## Thermodynamics\n\nheat flows.\n\n## Acoustics\n\nrooms echo.\n";
        let backend = MockBackend::new("{}");
        backend.on(SINGLE, MockReply::text(document_json(&["Optics"])));
        backend.on(
            SINGLE,
            MockReply::text(document_json(&["Optics", "Waves", "Thermodynamics", "Acoustics"])),
        );

        let response = summarizer(&backend).summarize(SummarizeRequest::new(text)).await;

        assert_eq!(backend.call_count(), 2);
        assert!(response.regenerated);
        assert_eq!(response.coverage().unwrap().score, 1.0);
        let retry = &backend.calls()[1];
        assert!(retry.user.contains("The previous attempt missed these source topics"));
        assert!(retry.user.contains("Waves; Thermodynamics; Acoustics"));
    }

    #[tokio::test]
    async fn test_low_coverage_after_regeneration_is_kept() {
        let text = "## Optics\n\nlight bends.\n\n## Waves\n\nsound spreads.\n\n## Acoustics\n\nrooms echo.\n";
        let backend = MockBackend::new(document_json(&["Optics"]));

        let response = summarizer(&backend).summarize(SummarizeRequest::new(text)).await;

        assert_eq!(backend.call_count(), 2);
        assert!(response.regenerated);
        let coverage = response.coverage().unwrap();
        assert!(coverage.score < 0.85);
        assert_eq!(coverage.missing_topics, vec!["Waves", "Acoustics"]);
    }

    #[tokio::test]
    async fn test_total_failure_returns_error_document() {
        let backend = MockBackend::new("{}");
        backend.on(SINGLE, MockReply::Error(LlmError::generation(401, "invalid api key")));

        let response = summarizer(&backend).summarize(SummarizeRequest::new("a short note")).await;

        assert_eq!(response.strategy, SummaryStrategy::Failed);
        assert!(response.document.is_failure());
        assert_eq!(response.json["summary"]["sections"][0]["heading"], ERROR_SECTION_HEADING);
    }

    #[tokio::test]
    async fn test_empty_input_fails_without_calls() {
        let backend = MockBackend::new(document_json(&["Unused"]));
        let response = summarizer(&backend).summarize(SummarizeRequest::new("   \n ")).await;

        assert_eq!(backend.call_count(), 0);
        assert!(response.document.is_failure());
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_requests() {
        let backend = MockBackend::new(document_json(&["Overview"]));
        let cache = Arc::new(MemoryResponseCache::default());
        let summarizer = summarizer(&backend).with_cache(cache.clone());

        let first = summarizer.summarize(SummarizeRequest::new("plain prose about tides")).await;
        let second = summarizer.summarize(SummarizeRequest::new("plain prose about tides")).await;

        assert_eq!(backend.call_count(), 1);
        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(second.strategy, SummaryStrategy::Cached);
        assert_eq!(first.json, second.json);
        assert_eq!(cache.len(), 1);

        summarizer
            .summarize(SummarizeRequest::new("plain prose about tides").with_language("German"))
            .await;
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let backend = MockBackend::new("{}");
        backend.on(SINGLE, MockReply::Error(LlmError::Timeout(180)));
        let cache = Arc::new(MemoryResponseCache::default());
        let summarizer = summarizer(&backend).with_cache(cache.clone());

        let response = summarizer.summarize(SummarizeRequest::new("plain prose")).await;
        assert!(response.document.is_failure());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_output_is_already_enforced() {
        let backend = MockBackend::new(document_json(&["Overview"]));
        let response = summarizer(&backend).summarize(SummarizeRequest::new("plain prose")).await;

        let (again, metrics) = QualityEnforcer::default().enforce(response.document.clone());
        assert!(metrics.is_clean());
        assert_eq!(again, response.document);
    }

    #[tokio::test]
    async fn test_output_cap_clamped_and_input_truncated() {
        let backend = MockBackend::new(document_json(&["Overview"]));
        let config = PipelineConfig {
            plan: PlanLimits {
                max_input_tokens: 10,
                ..PlanLimits::free()
            },
            ..PipelineConfig::default()
        };
        let summarizer = Summarizer::new(LlmGateway::new(Arc::new(backend.clone())), config).unwrap();

        let text = format!("{} TAIL-MARKER", "word ".repeat(20));
        summarizer
            .summarize(SummarizeRequest::new(text).with_output_cap(50_000))
            .await;

        let call = &backend.calls()[0];
        assert_eq!(call.max_tokens, 4_000);
        assert!(!call.user.contains("TAIL-MARKER"));
    }

    #[tokio::test]
    async fn test_every_call_is_recorded_under_one_request() {
        let backend = MockBackend::new("{}");
        backend.on(MAP, MockReply::text(knowledge_json("Refraction")));
        backend.on(OUTLINE, MockReply::text(outline_json(&["Optics", "Waves", "Heat", "Motion", "Energy", "Fields"])));
        backend.on(FILL, MockReply::text(document_json(&["Optics", "Waves", "Heat", "Motion", "Energy", "Fields"])));
        let ledger = Arc::new(MemoryUsageLedger::new());
        let gateway = LlmGateway::new(Arc::new(backend.clone())).with_ledger(ledger.clone());
        let summarizer = Summarizer::new(gateway, PipelineConfig::default()).unwrap();

        let request = SummarizeRequest::new("## Optics\n\nlight bends.\n")
            .with_force_chunking(true)
            .with_user("student-7");
        summarizer.summarize(request).await;

        let records = ledger.records();
        assert_eq!(records.len(), backend.call_count());
        let endpoints: Vec<&str> = records.iter().map(|r| r.endpoint.as_str()).collect();
        assert_eq!(endpoints, vec!["map.extract", "reduce.outline", "reduce.fill"]);
        assert!(records.iter().all(|r| r.user_id.as_deref() == Some("student-7")));
        assert!(records.iter().all(|r| r.request_id == records[0].request_id));
        assert!(records[0].request_id.is_some());
    }

    #[tokio::test]
    async fn test_topic_summary_without_source() {
        let backend = MockBackend::new("{}");
        backend.on("Task: summary.topic", MockReply::text(document_json(&["Basics", "Practice"])));

        let response = summarizer(&backend)
            .summarize_without_source("Linear algebra", "English", 3_000)
            .await;

        assert_eq!(response.strategy, SummaryStrategy::Topic);
        assert!(response.coverage().is_none());
        assert_eq!(backend.calls()[0].max_tokens, 3_000);
        assert!(backend.calls()[0].user.contains("Linear algebra"));
    }
}
