use spotirfid_core::{ResourceId, TagUid};
use spotirfid_storage::TagMapStore;

fn uid(hex: &str) -> TagUid {
    hex.parse().unwrap()
}

fn resource(uri: &str) -> ResourceId {
    ResourceId::new(uri).unwrap()
}

#[tokio::test]
async fn test_mappings_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tag_map.json");

    let mut store = TagMapStore::load(&path).await;
    store
        .insert_and_save(uid("04A1B2C3"), resource("spotify:album:6jbtHi5R0jMXoliU2OS0lo"))
        .await
        .unwrap();
    store
        .insert_and_save(uid("0A0B0C0D"), resource("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M"))
        .await
        .unwrap();

    let reloaded = TagMapStore::load(&path).await;
    assert_eq!(reloaded.map(), store.map());
    assert_eq!(
        reloaded.get(&uid("04A1B2C3")),
        Some(&resource("spotify:album:6jbtHi5R0jMXoliU2OS0lo"))
    );
}

#[tokio::test]
async fn test_remapping_returns_previous_and_keeps_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tag_map.json");

    let mut store = TagMapStore::load(&path).await;
    store
        .insert_and_save(uid("04A1B2C3"), resource("spotify:album:aaa"))
        .await
        .unwrap();
    let previous = store
        .insert_and_save(uid("04A1B2C3"), resource("spotify:album:bbb"))
        .await
        .unwrap();

    assert_eq!(previous, Some(resource("spotify:album:aaa")));
    let reloaded = TagMapStore::load(&path).await;
    assert_eq!(reloaded.map().len(), 1);
}

#[tokio::test]
async fn test_corrupt_file_is_replaced_on_next_commit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tag_map.json");
    std::fs::write(&path, "garbage").unwrap();

    let mut store = TagMapStore::load(&path).await;
    assert!(store.map().is_empty());
    store
        .insert_and_save(uid("04A1B2C3"), resource("spotify:album:aaa"))
        .await
        .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(value["04A1B2C3"], "spotify:album:aaa");
}

#[tokio::test]
async fn test_no_temporary_files_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tag_map.json");

    let mut store = TagMapStore::load(&path).await;
    for i in 0..5u8 {
        store
            .insert_and_save(
                TagUid::new(vec![i, 1, 2, 3]).unwrap(),
                resource("spotify:album:aaa"),
            )
            .await
            .unwrap();
    }

    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}
