use std::sync::Arc;

use assert_cmd::Command;
use mindmap_auth::auth::jwt::{DEFAULT_ACCESS_TOKEN_LIFETIME, DEFAULT_ISSUER, TokenCodec};
use mindmap_auth::auth::password::hash_password;
use mindmap_auth::clock::SystemClock;
use mindmap_auth::models::auth::{Role, User};
use predicates::prelude::*;

const SECRET_HEX: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("mindmap-auth").unwrap();
    for key in [
        "JWT_SECRET",
        "SESSION_KEY",
        "TOKEN_EXPIRATION_HOURS",
        "REFRESH_TOKEN_EXPIRATION_HOURS",
        "BCRYPT_COST",
        "ENABLE_RATE_LIMIT",
        "MAX_LOGIN_ATTEMPTS",
        "RATE_LIMIT_WINDOW_MINUTES",
        "RATE_LIMIT_BLOCK_MINUTES",
    ] {
        cmd.env_remove(key);
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn version_prints_package_version() {
    cli()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn gen_secret_prints_hex() {
    let output = cli().args(["gen-secret", "--bytes", "16"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let secret = stdout.trim();
    assert_eq!(secret.len(), 32);
    assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn gen_secret_rejects_short_lengths() {
    cli().args(["gen-secret", "--bytes", "4"]).assert().failure();
}

#[test]
fn hash_password_prints_bcrypt_digest() {
    cli()
        .args(["hash-password", "Secur3!Pass", "--cost", "4"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("$2b$04$"));
}

#[test]
fn verify_password_checks_digest() {
    let digest = hash_password("Secur3!Pass", 4).unwrap();
    cli()
        .args(["verify-password", &digest, "Secur3!Pass"])
        .assert()
        .success()
        .stdout(predicate::str::contains("password matches"));
    cli()
        .args(["verify-password", &digest, "Wr0ng!Pass"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("password does not match"));
}

#[test]
fn inspect_token_prints_claims() {
    let secret = (0..32u8)
        .map(|i| (i % 16) * 0x11)
        .collect::<Vec<_>>();
    assert_eq!(SECRET_HEX.len(), secret.len() * 2);
    let codec = TokenCodec::new(&secret, DEFAULT_ISSUER, Arc::new(SystemClock));
    let user = User {
        id: 7,
        name: "Jane".into(),
        email: "jane@x.com".into(),
        password_hash: String::new(),
        role: Role::Author,
    };
    let token = codec.issue(&user, DEFAULT_ACCESS_TOKEN_LIFETIME).unwrap();

    cli()
        .env("JWT_SECRET", SECRET_HEX)
        .args(["inspect-token", &format!("Bearer {token}")])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"email\": \"jane@x.com\""))
        .stdout(predicate::str::contains("\"role\": \"author\""));

    cli()
        .env("JWT_SECRET", "ffff")
        .args(["inspect-token", &token])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid token"));
}

#[test]
fn inspect_token_requires_secret() {
    cli()
        .args(["inspect-token", "a.b.c"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JWT_SECRET is not set"));
}

#[test]
fn config_redacts_secrets() {
    cli()
        .env("JWT_SECRET", SECRET_HEX)
        .env("BCRYPT_COST", "10")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("bcrypt_cost: 10"))
        .stdout(predicate::str::contains("<redacted 32 bytes>"))
        .stdout(predicate::str::contains("00112233").not());
}

#[test]
fn config_rejects_malformed_values() {
    cli()
        .env("MAX_LOGIN_ATTEMPTS", "many")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MAX_LOGIN_ATTEMPTS"));
}

#[test]
fn policies_lists_seed_rules() {
    cli()
        .arg("policies")
        .assert()
        .success()
        .stdout(predicate::str::contains("admin\tpost\tdelete"))
        .stdout(predicate::str::contains("admin\tuser\tmanage"))
        .stdout(predicate::str::contains("user\tpost\tdelete").not());
}

#[test]
fn policies_as_json() {
    let output = cli().args(["policies", "--json"]).output().unwrap();
    assert!(output.status.success());
    let rules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rules.as_array().unwrap().len(), 8);
}

#[test]
fn logs_go_to_stderr_not_stdout() {
    let output = cli()
        .args(["--log-level", "debug", "config"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stdout.starts_with("AuthConfig"));
    assert!(!stdout.contains("auto-generated"));
    assert!(stderr.contains("JWT secret was auto-generated"));
}

#[test]
fn log_level_flag_silences_warnings() {
    let output = cli()
        .env_remove("RUST_LOG")
        .args(["config", "--log-level", "error"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(!String::from_utf8(output.stderr).unwrap().contains("auto-generated"));
}
