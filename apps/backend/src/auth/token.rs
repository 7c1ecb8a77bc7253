//! Token issuance and verification.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::error::AppError;
use crate::state::security_config::SecurityConfig;

/// Mint a compact signed token carrying the given claims.
pub fn mint_token(claims: &Claims, security: &SecurityConfig) -> Result<String, AppError> {
    encode(&Header::new(security.algorithm), claims, security.encoding_key())
        .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))
}

/// Verify a token's signature and expiry, returning its claims.
///
/// Errors:
/// - Expired token → `AppError::UnauthorizedExpiredJwt`
/// - Invalid signature → `AppError::UnauthorizedInvalidJwt`
/// - Any other decode error → `AppError::UnauthorizedInvalidJwt`
pub fn verify_token(
    token: &str,
    algorithm: Algorithm,
    key: &DecodingKey,
) -> Result<Claims, AppError> {
    // Default Validation already checks exp; pin algorithm and drop leeway
    // so an expired token is rejected the second it expires.
    let mut validation = Validation::new(algorithm);
    validation.leeway = 0;

    decode::<Claims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::UnauthorizedExpiredJwt,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AppError::UnauthorizedInvalidJwt,
            _ => AppError::UnauthorizedInvalidJwt,
        })
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::{mint_token, verify_token};
    use crate::auth::claims::{Claims, ExtraClaims};
    use crate::error::AppError;
    use crate::state::security_config::SecurityConfig;

    const RSA_KEY: &[u8] = include_bytes!("../../testdata/rsa_private.pem");
    const RSA_PUB: &[u8] = include_bytes!("../../testdata/rsa_public.pem");
    const OTHER_RSA_KEY: &[u8] = include_bytes!("../../testdata/rsa_other_private.pem");
    const OTHER_RSA_PUB: &[u8] = include_bytes!("../../testdata/rsa_other_public.pem");
    const EC_KEY: &[u8] = include_bytes!("../../testdata/ec_private.pem");
    const EC_PUB: &[u8] = include_bytes!("../../testdata/ec_public.pem");

    fn rsa_security() -> SecurityConfig {
        SecurityConfig::from_pem("RS256", RSA_KEY, RSA_PUB, Duration::from_secs(3600)).unwrap()
    }

    fn claims_valid_for(lifetime: Duration) -> Claims {
        let now = SystemTime::now();
        let extra = ExtraClaims {
            display_name: Some("Alice".to_string()),
            email: Some("alice@example.org".to_string()),
            email_verified: true,
            groups: vec!["self-service".to_string()],
        };
        Claims::new("alice", extra, now, now + lifetime)
    }

    #[test]
    fn test_mint_and_verify_roundtrip() {
        let security = rsa_security();
        let claims = claims_valid_for(Duration::from_secs(3600));

        let token = mint_token(&claims, &security).unwrap();
        let decoded = verify_token(&token, security.algorithm, &security.decoding_key).unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.exp - decoded.iat, 3600);
    }

    #[test]
    fn test_ec_roundtrip() {
        let security =
            SecurityConfig::from_pem("ES256", EC_KEY, EC_PUB, Duration::from_secs(3600)).unwrap();
        let claims = claims_valid_for(Duration::from_secs(3600));

        let token = mint_token(&claims, &security).unwrap();
        let decoded = verify_token(&token, security.algorithm, &security.decoding_key).unwrap();
        assert_eq!(decoded.sub, "alice");
    }

    #[test]
    fn test_expired_token() {
        let security = rsa_security();
        // issued 40 minutes ago, expired 20 minutes ago
        let now = SystemTime::now() - Duration::from_secs(40 * 60);
        let claims = Claims::new(
            "alice",
            ExtraClaims::default(),
            now,
            now + Duration::from_secs(20 * 60),
        );

        let token = mint_token(&claims, &security).unwrap();
        let result = verify_token(&token, security.algorithm, &security.decoding_key);

        assert!(matches!(result, Err(AppError::UnauthorizedExpiredJwt)));
    }

    #[test]
    fn test_token_from_untrusted_key_is_rejected() {
        // Mint with key A, verify against key B: matching claims are not
        // enough, the signature has to check out.
        let signer =
            SecurityConfig::from_pem("RS256", OTHER_RSA_KEY, OTHER_RSA_PUB, Duration::from_secs(3600))
                .unwrap();
        let verifier = rsa_security();

        let token = mint_token(&claims_valid_for(Duration::from_secs(3600)), &signer).unwrap();
        let result = verify_token(&token, verifier.algorithm, &verifier.decoding_key);

        assert!(matches!(result, Err(AppError::UnauthorizedInvalidJwt)));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let security = rsa_security();
        let result = verify_token("not.a.token", security.algorithm, &security.decoding_key);
        assert!(matches!(result, Err(AppError::UnauthorizedInvalidJwt)));
    }
}
