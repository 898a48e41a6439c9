use std::fs;
use std::time::Duration;

use chordcubes::config::Config;
use chordcubes::console::Level;
use chordcubes::patterns::Style;
use chordcubes::staves::NotationMode;

#[test]
fn reads_yaml_and_keeps_defaults_for_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chordcubes.yaml");
    fs::write(
        &path,
        "bpm: 96\nstyle: funk\ndrums: true\nnotation: plain\nlog_level: warn\nmute: ['[STAVES]']\n",
    )
    .unwrap();

    let config = Config::open(&path).expect("config");
    assert_eq!(config.initial_bpm(), 96.0);
    assert_eq!(config.initial_style().unwrap(), Style::Funk);
    assert!(config.drums);
    assert!(!config.metronome);
    assert_eq!(config.notation, NotationMode::Plain);
    assert_eq!(config.log_level, Level::Warn);
    assert_eq!(config.lookahead(), Duration::from_millis(100));

    let filter = config.log_filter();
    assert!(!filter.allows(Level::Error, "[STAVES] boom"));
    assert!(filter.allows(Level::Error, "[AUDIO] boom"));
}

#[test]
fn out_of_range_bpm_is_clamped_not_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fast.yaml");
    fs::write(&path, "bpm: 999\n").unwrap();
    assert_eq!(Config::open(&path).unwrap().initial_bpm(), 300.0);
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.yaml");
    let err = Config::open(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("nope.yaml"));
}

#[test]
fn unknown_style_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "style: polka\n").unwrap();
    let err = Config::open(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("polka"));
}

#[test]
fn malformed_yaml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "bpm: [\n").unwrap();
    assert!(Config::open(&path).is_err());
}

#[test]
fn environment_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chordcubes.yaml");
    fs::write(&path, "bpm: 96\nstyle: funk\n").unwrap();
    let mut config = Config::open(&path).unwrap();
    config
        .apply_overrides(|key| match key {
            "CHORDCUBES_BPM" => Some("140".into()),
            "CHORDCUBES_STYLE" => Some("latin".into()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.initial_bpm(), 140.0);
    assert_eq!(config.initial_style().unwrap(), Style::Latin);
}
