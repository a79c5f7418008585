mod support;

use std::path::PathBuf;

use taskdeck::config::{Config, CONFIG_FILE};
use taskdeck::history::ViewHistory;
use taskdeck::Error;

use support::TestDeck;

#[test]
fn bounded_history_from_config() -> Result<(), Box<dyn std::error::Error>> {
    let deck = TestDeck::new();
    deck.write_config("[history]\ncapacity = 3\n")?;

    let config = Config::load_from_dir(deck.path())?;
    assert_eq!(config.storage.file, PathBuf::from("tasks.csv"));

    let mut tracker = config.history.tracker()?;
    for id in [1, 2, 3, 1, 4] {
        tracker.touch(id);
    }
    assert_eq!(tracker.snapshot(), vec![3, 1, 4]);

    Ok(())
}

#[test]
fn empty_storage_file_is_invalid() -> Result<(), Box<dyn std::error::Error>> {
    let deck = TestDeck::new();
    let path = deck.write_config("[storage]\nfile = \"\"\n")?;

    let err = Config::load(&path).expect_err("empty file");
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(CONFIG_FILE));

    Ok(())
}

#[test]
fn cli_rejects_invalid_config() -> Result<(), Box<dyn std::error::Error>> {
    let deck = TestDeck::new();
    deck.write_config("[history]\ncapacity = 0\n")?;

    deck.cmd()
        .arg("list")
        .assert()
        .code(2)
        .stderr(predicates::str::contains("history.capacity"));

    Ok(())
}
