use std::fs;
use std::io::Write;
use tempfile::TempDir;

use speechrag_core::config::{Config, EmbeddingProvider, Settings, DEFAULT_PROMPT_TEMPLATE};
use speechrag_core::document::{document_available, load_document};
use speechrag_core::types::SOURCE_KEY;
use speechrag_core::Error;

#[test]
fn load_document_reads_text_and_source() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("speech.txt");
    let mut f = fs::File::create(&path).unwrap();
    write!(f, "Short text").unwrap();

    let doc = load_document(&path).expect("load");
    assert_eq!(doc.text, "Short text");
    assert_eq!(doc.metadata().get(SOURCE_KEY).map(String::as_str), Some(path.to_string_lossy().as_ref()));
    assert!(document_available(&path));
}

#[test]
fn load_document_missing_file_is_document_not_found() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("missing.txt");
    let err = load_document(&path).unwrap_err();
    assert!(matches!(err, Error::DocumentNotFound(ref p) if p == &path), "got {err:?}");
    assert!(!document_available(&path));
}

#[test]
fn load_document_invalid_utf8_is_decoded_lossily() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("latin1.txt");
    fs::write(&path, [b'c', b'a', b'f', 0xE9]).unwrap();
    let doc = load_document(&path).expect("load");
    assert!(doc.text.starts_with("caf"));
}

#[test]
fn default_settings_are_valid() {
    let settings = Settings::default();
    settings.validate().expect("defaults validate");
    assert_eq!(settings.chunking.chunk_size, 200);
    assert_eq!(settings.chunking.chunk_overlap, 50);
    assert_eq!(settings.chunking.separator, ". ");
    assert_eq!(settings.index.top_k, 3);
    assert_eq!(settings.llm.model, "mistral");
    assert_eq!(settings.prompt.template, DEFAULT_PROMPT_TEMPLATE);
}

#[test]
fn template_without_placeholders_is_rejected() {
    let mut settings = Settings::default();
    settings.prompt.template = "Context: {context}".to_string();
    assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn config_merges_toml_env_and_resolves_paths() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [document]
            path = "data/speech.txt"

            [chunking]
            chunk_size = 120

            [embedding]
            provider = "hash"
            "#,
        )?;
        jail.set_env("RUST_ENV", "dev");
        jail.create_file("config.dev.toml", "[index]\ndir = \"dev_index\"\n")?;
        jail.set_env("APP_LLM__MODEL", "llama3");

        let base = jail.directory().to_path_buf();
        let config = Config::load_from(&base).expect("load");
        let settings = config.settings().expect("settings");

        assert_eq!(settings.chunking.chunk_size, 120);
        assert_eq!(settings.chunking.chunk_overlap, 50, "unset keys keep defaults");
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Hash);
        assert_eq!(settings.llm.model, "llama3");
        assert_eq!(settings.document.path, base.join("data/speech.txt"));
        assert_eq!(settings.index.dir, base.join("dev_index"));

        let model: String = config.get("llm.model").expect("get");
        assert_eq!(model, "llama3");
        Ok(())
    });
}

#[test]
fn config_rejects_overlap_larger_than_size() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[chunking]\nchunk_size = 10\nchunk_overlap = 20\n")?;
        let config = Config::load_from(jail.directory()).expect("load");
        assert!(config.settings().is_err());
        Ok(())
    });
}
