use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use oauth_dispatch::config::JwtConfig;
use oauth_dispatch::jwt::{JwtClaims, JwtIssuer};
use oauth_dispatch::models::User;
use oauth_dispatch::DispatchError;

const PRIVATE_KEY: &str = include_str!("fixtures/jwt_signing_key.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/jwt_signing_key.pub.pem");

fn config(enforce_scopes: bool) -> JwtConfig {
    JwtConfig {
        private_signing_key: Some(PRIVATE_KEY.to_string()),
        enforce_scopes,
        ..JwtConfig::default()
    }
}

fn user() -> User {
    let mut user = User::new("learner".into(), "learner@example.com".into());
    user.first_name = "Lee".into();
    user.last_name = "Learner".into();
    user
}

fn decode_asymmetric(token: &str, config: &JwtConfig) -> JwtClaims {
    let mut validation = Validation::new(Algorithm::RS512);
    validation.set_audience(&[&config.audience]);
    validation.set_issuer(&[&config.issuer]);
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).expect("public key");
    jsonwebtoken::decode::<JwtClaims>(token, &key, &validation)
        .expect("asymmetric signature")
        .claims
}

#[test]
fn login_jwts_are_signed_with_the_private_key() {
    let config = config(false);
    let issuer = JwtIssuer::new(config.clone());

    let token = issuer.create_user_login_jwt(&user(), 300).unwrap();
    let header = jsonwebtoken::decode_header(&token).unwrap();
    assert_eq!(header.alg, Algorithm::RS512);

    let claims = decode_asymmetric(&token, &config);
    assert_eq!(claims.preferred_username, "learner");
    assert_eq!(claims.exp - claims.iat, 300);
    assert_eq!(claims.scopes, vec!["email", "profile"]);
    assert_eq!(claims.email.as_deref(), Some("learner@example.com"));

    let profile = claims.profile.expect("profile claims");
    assert_eq!(profile.given_name, "Lee");
    assert_eq!(profile.family_name, "Learner");
    assert_eq!(profile.name, None);
    assert!(!profile.administrator);

    // Not verifiable with the shared secret.
    assert!(matches!(
        issuer.decode_symmetric(&token),
        Err(DispatchError::Jwt(_))
    ));
}

#[test]
fn restricted_apps_get_the_private_key_only_when_scopes_are_enforced() {
    let scopes = vec!["email".to_string()];
    let filters = vec!["user:me".to_string()];
    let user = user();

    let relaxed = JwtIssuer::new(config(false));
    let token = relaxed
        .create_app_access_jwt(&user, &scopes, None, true, &filters)
        .unwrap();
    assert_eq!(jsonwebtoken::decode_header(&token).unwrap().alg, Algorithm::HS256);
    let claims = relaxed.decode_symmetric(&token).unwrap();
    assert!(claims.is_restricted);
    assert_eq!(claims.filters, filters);
    assert!(claims.profile.is_none());

    let enforced_config = config(true);
    let enforced = JwtIssuer::new(enforced_config.clone());
    let token = enforced
        .create_app_access_jwt(&user, &scopes, None, true, &filters)
        .unwrap();
    assert_eq!(jsonwebtoken::decode_header(&token).unwrap().alg, Algorithm::RS512);
    let claims = decode_asymmetric(&token, &enforced_config);
    assert_eq!(claims.sub, enforced.anonymous_id(&user));

    // Unrestricted apps stay on the shared secret either way.
    let token = enforced
        .create_app_access_jwt(&user, &scopes, None, false, &[])
        .unwrap();
    assert_eq!(jsonwebtoken::decode_header(&token).unwrap().alg, Algorithm::HS256);
}

#[test]
fn symmetric_algorithms_are_not_accepted_for_the_private_key() {
    let issuer = JwtIssuer::new(JwtConfig {
        signing_algorithm: "HS512".into(),
        ..config(false)
    });

    let err = issuer.create_user_login_jwt(&user(), 60).unwrap_err();
    assert!(matches!(err, DispatchError::Jwt(_)));
}
