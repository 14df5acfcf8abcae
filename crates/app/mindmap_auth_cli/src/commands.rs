use std::sync::Arc;

use mindmap_auth::AuthConfig;
use mindmap_auth::auth::bearer::extract_bearer;
use mindmap_auth::auth::jwt::TokenCodec;
use mindmap_auth::auth::password::{hash_password, verify_password};
use mindmap_auth::auth::policy::PolicyEngine;
use mindmap_auth::clock::SystemClock;
use mindmap_auth::config::generate_secret;

use crate::{Error, Result};

pub fn gen_secret(bytes: u16) -> Result<()> {
    println!("{}", hex::encode(generate_secret(bytes.into())));
    Ok(())
}

pub fn hash(password: &str, cost: u32) -> Result<()> {
    println!("{}", hash_password(password, cost)?);
    Ok(())
}

pub fn verify(hash: &str, password: &str) -> Result<()> {
    if !verify_password(password, hash) {
        return Err(Error::Custom("password does not match".into()));
    }
    println!("password matches");
    Ok(())
}

pub fn inspect_token(token: &str) -> Result<()> {
    let config = AuthConfig::from_env()?;
    if config.jwt_secret.is_empty() {
        return Err(Error::Custom("JWT_SECRET is not set".into()));
    }
    let config = config.with_defaults();
    let codec = TokenCodec::new(&config.jwt_secret, config.issuer, Arc::new(SystemClock));

    let token = extract_bearer(token).unwrap_or(token);
    let claims = codec.parse(token)?;
    println!("{}", serde_json::to_string_pretty(&claims)?);
    Ok(())
}

pub fn show_config() -> Result<()> {
    let config = AuthConfig::from_env()?.with_defaults();
    println!("{config:#?}");
    Ok(())
}

pub fn policies(json: bool) -> Result<()> {
    let rules = PolicyEngine::with_default_rules().policies();
    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }
    for rule in rules {
        println!("{}\t{}\t{}", rule.role, rule.object, rule.action);
    }
    Ok(())
}
