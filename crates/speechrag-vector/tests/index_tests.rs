use speechrag_core::traits::VectorSearch;
use speechrag_core::types::{Chunk, IndexedChunk, Meta};
use speechrag_core::Error;
use speechrag_vector::VectorIndex;

fn entry(seq: usize, text: &str, vector: Vec<f32>) -> IndexedChunk {
    IndexedChunk {
        chunk: Chunk { text: text.to_string(), sequence_index: seq, start: 0, end: text.len(), metadata: Meta::new() },
        vector,
    }
}

fn sample() -> VectorIndex {
    VectorIndex::build(vec![
        entry(0, "east", vec![1.0, 0.0]),
        entry(1, "north", vec![0.0, 1.0]),
        entry(2, "north-east", vec![1.0, 1.0]),
        entry(3, "west", vec![-1.0, 0.0]),
    ])
    .expect("build")
}

#[test]
fn build_rejects_empty_input() {
    assert!(matches!(VectorIndex::build(Vec::new()), Err(Error::EmptyCorpus)));
}

#[test]
fn build_rejects_mixed_dimensions() {
    let err = VectorIndex::build(vec![entry(0, "a", vec![1.0, 0.0]), entry(1, "b", vec![1.0, 0.0, 0.0])]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
}

#[test]
fn retrieve_orders_by_descending_similarity() {
    let index = sample();
    let hits = index.retrieve(&[1.0, 0.2], 4).expect("retrieve");
    let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
    assert_eq!(texts, vec!["east", "north-east", "north", "west"]);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!((hits[0].score - 1.0 / (1.04f32).sqrt()).abs() < 1e-5);
}

#[test]
fn retrieve_returns_min_of_k_and_len() {
    let index = sample();
    assert_eq!(index.retrieve(&[1.0, 0.0], 3).expect("retrieve").len(), 3);
    assert_eq!(index.retrieve(&[1.0, 0.0], 10).expect("retrieve").len(), 4);

    let single = VectorIndex::build(vec![entry(0, "only", vec![0.5, 0.5])]).expect("build");
    assert_eq!(single.retrieve(&[1.0, 0.0], 3).expect("retrieve").len(), 1);
}

#[test]
fn ties_keep_document_order() {
    let index = VectorIndex::build(vec![
        entry(2, "third", vec![0.0, 1.0]),
        entry(0, "first", vec![0.0, 1.0]),
        entry(1, "second", vec![0.0, 1.0]),
    ])
    .expect("build");
    let hits = index.retrieve(&[0.0, 2.0], 3).expect("retrieve");
    let order: Vec<usize> = hits.iter().map(|h| h.chunk.sequence_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
}

#[test]
fn zero_query_scores_zero_everywhere() {
    let hits = sample().retrieve(&[0.0, 0.0], 2).expect("retrieve");
    assert!(hits.iter().all(|h| h.score == 0.0));
    assert_eq!(hits[0].chunk.sequence_index, 0);
}

#[test]
fn retrieve_validates_arguments() {
    let index = sample();
    assert!(matches!(index.retrieve(&[1.0, 0.0], 0), Err(Error::InvalidArgument(_))));
    assert!(matches!(index.retrieve(&[1.0], 1), Err(Error::DimensionMismatch { expected: 2, actual: 1 })));
}

#[test]
fn insert_appends_and_checks_dimension() {
    let mut index = sample();
    index.insert(entry(4, "south", vec![0.0, -1.0])).expect("insert");
    assert_eq!(index.len(), 5);
    assert!(index.insert(entry(5, "bad", vec![1.0])).is_err());
    assert_eq!(index.len(), 5);
}

#[test]
fn search_trait_delegates_to_retrieve() {
    let index = sample();
    let search: &dyn VectorSearch = &index;
    assert_eq!(search.dim(), 2);
    assert_eq!(search.len(), 4);
    assert!(!search.is_empty());
    let hits = search.search_vec(&[0.0, 1.0], 1).expect("search");
    assert_eq!(hits[0].chunk.text, "north");
}

#[test]
fn empty_index_rejects_retrieval_until_filled() {
    let mut index = VectorIndex::with_dim(2).expect("empty index");
    assert!(index.is_empty());
    assert!(matches!(index.retrieve(&[1.0, 0.0], 3), Err(Error::EmptyIndex)));

    index.insert(entry(0, "east", vec![1.0, 0.0])).expect("insert");
    let hits = index.retrieve(&[1.0, 0.0], 3).expect("retrieve");
    assert_eq!(hits.len(), 1);
    assert!(matches!(VectorIndex::with_dim(0), Err(Error::InvalidArgument(_))));
}
