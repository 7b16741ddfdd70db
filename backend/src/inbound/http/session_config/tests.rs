//! Unit tests for session configuration parsing.

use super::*;
use mockable::MockEnv;
use rstest::rstest;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn key_file(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp key file");
    file.write_all(&vec![b'k'; len]).expect("write key");
    file
}

fn mock_env(vars: HashMap<&'static str, String>) -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string()
        .times(0..)
        .returning(move |key| vars.get(key).cloned());
    env
}

fn release_vars(key: &NamedTempFile) -> HashMap<&'static str, String> {
    HashMap::from([
        (KEY_FILE_ENV, key.path().to_string_lossy().into_owned()),
        (COOKIE_SECURE_ENV, "1".to_owned()),
        (SAMESITE_ENV, "Strict".to_owned()),
        (ALLOW_EPHEMERAL_ENV, "0".to_owned()),
    ])
}

#[rstest]
fn release_accepts_complete_configuration() {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let settings = session_settings_from_env(&mock_env(release_vars(&key)), BuildMode::Release)
        .expect("valid settings");
    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Strict);
}

#[rstest]
#[case(COOKIE_SECURE_ENV)]
#[case(SAMESITE_ENV)]
#[case(ALLOW_EPHEMERAL_ENV)]
fn release_requires_every_toggle(#[case] missing: &'static str) {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let mut vars = release_vars(&key);
    vars.remove(missing);

    let error = session_settings_from_env(&mock_env(vars), BuildMode::Release)
        .err()
        .expect("missing toggle rejected");

    assert!(matches!(error, SessionConfigError::MissingEnv { name } if name == missing));
}

#[rstest]
fn release_rejects_short_keys() {
    let key = key_file(SESSION_KEY_MIN_LEN - 1);
    let error = session_settings_from_env(&mock_env(release_vars(&key)), BuildMode::Release)
        .err()
        .expect("short key rejected");
    assert!(matches!(
        error,
        SessionConfigError::KeyTooShort { length, .. } if length == SESSION_KEY_MIN_LEN - 1
    ));
}

#[rstest]
fn release_rejects_insecure_same_site_none() {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let mut vars = release_vars(&key);
    vars.insert(COOKIE_SECURE_ENV, "0".to_owned());
    vars.insert(SAMESITE_ENV, "None".to_owned());

    let error = session_settings_from_env(&mock_env(vars), BuildMode::Release)
        .err()
        .expect("insecure None rejected");

    assert!(matches!(error, SessionConfigError::InsecureSameSiteNone));
}

#[rstest]
fn release_rejects_ephemeral_keys() {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let mut vars = release_vars(&key);
    vars.insert(ALLOW_EPHEMERAL_ENV, "yes".to_owned());

    let error = session_settings_from_env(&mock_env(vars), BuildMode::Release)
        .err()
        .expect("ephemeral rejected");

    assert!(matches!(error, SessionConfigError::EphemeralNotAllowed));
}

#[rstest]
fn release_rejects_invalid_booleans() {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let mut vars = release_vars(&key);
    vars.insert(COOKIE_SECURE_ENV, "maybe".to_owned());

    let error = session_settings_from_env(&mock_env(vars), BuildMode::Release)
        .err()
        .expect("invalid flag rejected");

    assert!(matches!(
        error,
        SessionConfigError::InvalidEnv { name, ref value, .. }
            if name == COOKIE_SECURE_ENV && value == "maybe"
    ));
}

#[rstest]
fn debug_falls_back_to_defaults() {
    let mut vars = HashMap::new();
    vars.insert(
        KEY_FILE_ENV,
        std::env::temp_dir()
            .join("missing-session-key")
            .to_string_lossy()
            .into_owned(),
    );
    vars.insert(SAMESITE_ENV, "sideways".to_owned());

    let settings =
        session_settings_from_env(&mock_env(vars), BuildMode::Debug).expect("debug defaults");

    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Lax);
}

#[rstest]
#[case("1", Some(true))]
#[case("Yes", Some(true))]
#[case("n", Some(false))]
#[case("FALSE", Some(false))]
#[case("2", None)]
fn parses_boolean_spellings(#[case] raw: &str, #[case] expected: Option<bool>) {
    assert_eq!(parse_bool(raw), expected);
}
