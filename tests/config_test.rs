//! Integration tests for Settings loading with layered merge semantics.
//!
//! Every test points the global layer at its own temp directory, so a config
//! file in the developer's real config directory never leaks in.

use std::fs;
use std::path::PathBuf;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use vertree::util::testing::init_test_setup;
use vertree::{SequenceSettings, Settings, TreeArena, TreeError};

struct ConfigDirs {
    _dir: TempDir,
    global: PathBuf,
    local: PathBuf,
}

#[fixture]
fn dirs() -> ConfigDirs {
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let global = dir.path().join("global").join("vertree.toml");
    let local = dir.path().join("vertree.toml");
    fs::create_dir_all(global.parent().unwrap()).unwrap();
    ConfigDirs {
        _dir: dir,
        global,
        local,
    }
}

#[test]
fn given_no_config_when_defaults_then_growth_doubles_from_four() {
    let settings = Settings::default();
    assert_eq!(
        settings.sequence,
        SequenceSettings {
            min_capacity: 4,
            growth_factor: 2
        }
    );
}

#[rstest]
fn given_no_files_when_load_then_uses_defaults(dirs: ConfigDirs) {
    let settings = Settings::load_from(Some(&dirs.global), None).expect("load settings");
    assert_eq!(settings, Settings::default());
}

#[rstest]
fn given_local_config_when_load_then_specified_fields_override_defaults(dirs: ConfigDirs) {
    fs::write(&dirs.local, "[sequence]\nmin_capacity = 16\n").unwrap();

    let settings = Settings::load_from(Some(&dirs.global), Some(&dirs.local)).expect("load settings");

    assert_eq!(settings.sequence.min_capacity, 16);
    assert_eq!(settings.sequence.growth_factor, 2, "unspecified field keeps default");
}

#[rstest]
fn given_global_and_local_config_when_load_then_local_wins_per_field(dirs: ConfigDirs) {
    fs::write(&dirs.global, "[sequence]\nmin_capacity = 32\ngrowth_factor = 3\n").unwrap();
    fs::write(&dirs.local, "[sequence]\ngrowth_factor = 5\n").unwrap();

    let settings = Settings::load_from(Some(&dirs.global), Some(&dirs.local)).unwrap();

    assert_eq!(settings.sequence.min_capacity, 32);
    assert_eq!(settings.sequence.growth_factor, 5);
}

#[rstest]
fn given_missing_local_file_when_load_then_config_error(dirs: ConfigDirs) {
    let absent = dirs.local.with_file_name("absent.toml");

    let err = Settings::load_from(Some(&dirs.global), Some(&absent)).unwrap_err();

    assert!(matches!(err, TreeError::Config { .. }));
    assert!(!err.is_invariant_violation());
}

#[rstest]
#[case("[sequence]\nmin_capacity = \"many\"")]
#[case("[sequence\nmin_capacity = 1")]
#[case("[sequence]\ngrowth_factor = -2")]
fn given_malformed_local_file_when_load_then_config_error(dirs: ConfigDirs, #[case] content: &str) {
    fs::write(&dirs.local, content).unwrap();

    let err = Settings::load_from(Some(&dirs.global), Some(&dirs.local)).unwrap_err();

    match err {
        TreeError::Config { message } => assert!(message.contains("parse"), "{}", message),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[rstest]
fn given_malformed_global_file_when_load_then_config_error(dirs: ConfigDirs) {
    fs::write(&dirs.global, "[sequence]\ngrowth_factor = \"fast\"\n").unwrap();

    let err = Settings::load_from(Some(&dirs.global), None).unwrap_err();

    assert!(matches!(err, TreeError::Config { .. }));
}

#[rstest]
fn given_zero_growth_factor_when_load_then_validation_fails(dirs: ConfigDirs) {
    fs::write(&dirs.local, "[sequence]\ngrowth_factor = 0\n").unwrap();

    let err = Settings::load_from(Some(&dirs.global), Some(&dirs.local)).unwrap_err();

    assert_eq!(
        err,
        TreeError::Config {
            message: "sequence.growth_factor must be at least 1".to_string()
        }
    );
}

#[rstest]
fn given_settings_when_rendered_as_toml_then_loads_back_equal(dirs: ConfigDirs) {
    let settings = Settings {
        sequence: SequenceSettings {
            min_capacity: 10,
            growth_factor: 3,
        },
    };
    fs::write(&dirs.local, settings.to_toml().unwrap()).unwrap();

    let loaded = Settings::load_from(Some(&dirs.global), Some(&dirs.local)).unwrap();

    assert_eq!(loaded, settings);
}

#[test]
fn given_custom_growth_when_appending_past_capacity_then_arena_uses_it() {
    init_test_setup();
    let settings = Settings {
        sequence: SequenceSettings {
            min_capacity: 1,
            growth_factor: 4,
        },
    };
    let mut tree = TreeArena::with_settings(settings.clone());
    let seq = tree.make_seq(3, 3).unwrap();

    let grown = tree.append(seq, &[None]).unwrap();

    assert_eq!(tree.settings(), &settings);
    assert_eq!(tree.seq_cap(grown).unwrap(), 12);
}
