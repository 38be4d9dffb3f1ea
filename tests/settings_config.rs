// tests/settings_config.rs
use std::{env, fs};
use thumbnail_rating_bar::settings::{BarPosition, UserSettings, ENV_SETTINGS_PATH};

#[test]
fn load_toml_and_json_files() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("settings.toml");
    fs::write(
        &p_toml,
        r#"
barPosition = "top"
barHeight = 6
showPercentage = true
"#,
    )
    .unwrap();
    let s = UserSettings::load_from(&p_toml).unwrap();
    assert_eq!(s.bar_position, BarPosition::Top);
    assert_eq!(s.bar_height, 6);
    assert!(s.show_percentage);
    assert_eq!(s.cache_duration, 600_000);

    let p_json = dir.path().join("settings.json");
    fs::write(&p_json, r#"{"cacheDuration": 30000, "rateShorts": true}"#).unwrap();
    let j = UserSettings::load_from(&p_json).unwrap();
    assert_eq!(j.cache_duration, 30_000);
    assert!(j.rate_shorts);
    assert_eq!(j.bar_height, 4);
}

#[test]
fn broken_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("settings.json");
    fs::write(&p, r#"{"barHeight": "tall"}"#).unwrap();
    assert!(UserSettings::load_from(&p).is_err());
}

#[serial_test::serial]
#[test]
fn default_prefers_toml_fallback_over_json() {
    // Isolate CWD so the test never reads a real config/ directory.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_SETTINGS_PATH);

    fs::create_dir_all("config").unwrap();
    fs::write("config/settings.json", r#"{"barOpacity": 40}"#).unwrap();
    assert_eq!(UserSettings::load_default().unwrap().bar_opacity, 40);

    fs::write("config/settings.toml", "barOpacity = 70\n").unwrap();
    assert_eq!(UserSettings::load_default().unwrap().bar_opacity, 70);

    env::set_current_dir(&old).unwrap();
}
