mod common;

use std::sync::Arc;

use common::{CountingEmbedder, RecordingAnswerer};
use speechrag_core::config::DEFAULT_PROMPT_TEMPLATE;
use speechrag_core::segmenter::split;
use speechrag_core::types::{Chunk, Meta, ScoredChunk};
use speechrag_core::Error;
use speechrag_service::{build_context, AskResponse, InitOutcome, PromptTemplate, RagAnswer, RagPipeline};
use speechrag_vector::{embed_chunks, VectorIndex};

fn hit(seq: usize, text: &str) -> ScoredChunk {
    let mut metadata = Meta::new();
    metadata.insert("source".into(), "speech.txt".into());
    ScoredChunk { chunk: Chunk { text: text.into(), sequence_index: seq, start: 0, end: text.len(), metadata }, score: 0.5 }
}

#[test]
fn template_requires_both_placeholders() {
    assert!(PromptTemplate::new(DEFAULT_PROMPT_TEMPLATE).is_ok());
    assert!(matches!(PromptTemplate::new("Context: {context}"), Err(Error::InvalidConfig(_))));
    assert!(matches!(PromptTemplate::new("Question: {question}"), Err(Error::InvalidConfig(_))));
}

#[test]
fn render_substitutes_once_and_keeps_literal_braces() {
    let t = PromptTemplate::new("{ctx-free} C={context} Q={question} {other}").expect("template");
    let out = t.render("about {question}", "why {context}?");
    assert_eq!(out, "{ctx-free} C=about {question} Q=why {context}? {other}");
}

#[test]
fn default_template_renders_expected_prompt() {
    let t = PromptTemplate::new(DEFAULT_PROMPT_TEMPLATE).expect("template");
    let out = t.render("A\n\nB", "What?");
    assert_eq!(
        out,
        "Answer the question based on the following context from Dr. B.R. Ambedkar's speech:\n\nContext: A\n\nB\n\nQuestion: What?\n\nAnswer: "
    );
}

#[test]
fn context_joins_in_retrieval_order() {
    assert_eq!(build_context(&[hit(2, "second"), hit(0, "first")]), "second\n\nfirst");
    assert_eq!(build_context(&[]), "");
}

#[test]
fn ask_response_mirrors_retrieval() {
    let answer = RagAnswer { question: "q".into(), answer: "a".into(), retrieved: vec![hit(1, "one"), hit(0, "zero")] };
    let resp = AskResponse::from(answer);
    assert_eq!(resp.sources_count, 2);
    assert_eq!(resp.sources[0].content, "one");
    assert_eq!(resp.sources[1].metadata.get("source").map(String::as_str), Some("speech.txt"));

    let json = serde_json::to_value(&resp).expect("json");
    assert_eq!(json["sources_count"], 2);
    assert_eq!(json["sources"][0]["content"], "one");
}

#[test]
fn init_outcome_json_shape() {
    let json = serde_json::to_value(InitOutcome::already_initialized()).expect("json");
    assert_eq!(json["status"], "already_initialized");
    assert!(json.get("chunks_count").is_none());
    let json = serde_json::to_value(InitOutcome::initialized(3, speechrag_service::IndexSource::Built)).expect("json");
    assert_eq!(json["status"], "success");
    assert_eq!(json["chunks_count"], 3);
    assert_eq!(json["index_source"], "built");
}

#[tokio::test]
async fn pipeline_answers_with_top_k_context() {
    let embedder = CountingEmbedder::new();
    let chunks = split(common::SPEECH, 40, 10, ". ").expect("split");
    let entries = embed_chunks(embedder.as_ref(), chunks, 8, false).expect("embed");
    let index = Arc::new(VectorIndex::build(entries).expect("index"));
    let answerer = RecordingAnswerer::new();
    let template = PromptTemplate::new(DEFAULT_PROMPT_TEMPLATE).expect("template");
    let pipeline = RagPipeline::new(embedder.clone(), index, answerer.clone(), template, 2).expect("pipeline");

    let out = pipeline.answer("division of labourers").await.expect("answer");
    assert_eq!(out.retrieved.len(), 2);
    assert_eq!(out.retrieved[0].chunk.text, "It is a division of labourers");
    assert_eq!(out.answer, "Caste divides labourers, not just labour.");
    let prompts = answerer.prompts();
    assert!(prompts[0].contains(&build_context(&out.retrieved)));
}

#[test]
fn pipeline_rejects_zero_k_and_mismatched_dims() {
    let embedder = CountingEmbedder::new();
    let chunks = split(common::SPEECH, 40, 10, ". ").expect("split");
    let entries = embed_chunks(&speechrag_embed::HashEmbedder::new(8), chunks, 8, false).expect("embed");
    let index = Arc::new(VectorIndex::build(entries).expect("index"));
    let template = PromptTemplate::new(DEFAULT_PROMPT_TEMPLATE).expect("template");
    assert!(matches!(
        RagPipeline::new(embedder.clone(), index.clone(), RecordingAnswerer::new(), template.clone(), 3),
        Err(Error::DimensionMismatch { .. })
    ));
    assert!(matches!(
        RagPipeline::new(embedder, index, RecordingAnswerer::new(), template, 0),
        Err(Error::InvalidConfig(_))
    ));
}
