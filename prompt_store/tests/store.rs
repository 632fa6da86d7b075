use prompt_store::{upsert_by_name, PromptStore, PromptTemplate};
use pretty_assertions::assert_eq;

fn template(name: &str) -> PromptTemplate {
    PromptTemplate {
        name: name.to_string(),
        description: String::new(),
        system: "You are a terse assistant.".to_string(),
        prompt: "Describe the image.".to_string(),
    }
}

#[test]
fn loading_a_missing_library_yields_an_empty_sequence() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = PromptStore::new(dir.path().join("prompts.json"));

    assert_eq!(Vec::<PromptTemplate>::new(), store.load()?);
    Ok(())
}

#[test]
fn malformed_documents_are_an_error_not_an_empty_library() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("prompts.json");
    std::fs::write(&path, "{ not json")?;

    let store = PromptStore::new(&path);
    assert!(store.load().is_err());
    Ok(())
}

#[test]
fn mutations_round_trip_through_the_document() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = PromptStore::new(dir.path().join("prompts.json"));

    let mut templates = store.load()?;
    upsert_by_name(&mut templates, template("Describe"))?;
    upsert_by_name(&mut templates, template("Count"))?;
    store.save(&templates)?;

    assert_eq!(
        vec![template("Describe"), template("Count")],
        store.load()?
    );

    // The document uses the dashboard's wire field names.
    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(store.path())?)?;
    let mut keys: Vec<_> = raw[0].as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(vec!["description", "name", "prompt", "system"], keys);

    Ok(())
}

#[test]
fn init_seeds_only_when_the_library_is_absent() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let default_path = dir.path().join("prompts.default.json");
    std::fs::write(
        &default_path,
        serde_json::to_string(&vec![template("Describe")])?,
    )?;

    let store = PromptStore::new(dir.path().join("prompts.json"));
    store.init_from_default(&default_path)?;
    assert_eq!(vec![template("Describe")], store.load()?);

    // A second init must not clobber user edits.
    store.save(&[template("Custom")])?;
    store.init_from_default(&default_path)?;
    assert_eq!(vec![template("Custom")], store.load()?);

    Ok(())
}

#[test]
fn reset_overwrites_custom_prompts() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let default_path = dir.path().join("prompts.default.json");
    std::fs::write(
        &default_path,
        serde_json::to_string(&vec![template("Describe")])?,
    )?;

    let store = PromptStore::new(dir.path().join("prompts.json"));
    store.save(&[template("Custom")])?;
    store.reset_to_default(&default_path)?;

    assert_eq!(vec![template("Describe")], store.load()?);
    Ok(())
}
