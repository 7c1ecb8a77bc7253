use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

use crate::error::AppError;

/// Signing material for token issuance and verification.
///
/// The algorithm family is fixed per process at startup: mismatched key
/// material fails construction rather than issuing unverifiable tokens.
#[derive(Clone)]
pub struct SecurityConfig {
    /// Signing algorithm (RS256/RS384/RS512 or ES256/ES384)
    pub algorithm: Algorithm,
    encoding_key: EncodingKey,
    /// Verification key, derived from the public key PEM
    pub decoding_key: DecodingKey,
    /// Raw public key PEM, served to token consumers
    pub public_key_pem: Vec<u8>,
    /// Process-wide token lifetime applied uniformly to every issuance
    pub token_duration: Duration,
}

impl SecurityConfig {
    /// Build signing material from PEM-encoded keys.
    pub fn from_pem(
        method: &str,
        key_pem: &[u8],
        public_pem: &[u8],
        token_duration: Duration,
    ) -> Result<Self, AppError> {
        let algorithm = parse_method(method)?;

        let (encoding_key, decoding_key) = match algorithm {
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => (
                EncodingKey::from_rsa_pem(key_pem)
                    .map_err(|e| AppError::config(format!("failed to load RSA private key: {e}")))?,
                DecodingKey::from_rsa_pem(public_pem)
                    .map_err(|e| AppError::config(format!("failed to load RSA public key: {e}")))?,
            ),
            Algorithm::ES256 | Algorithm::ES384 => (
                EncodingKey::from_ec_pem(key_pem)
                    .map_err(|e| AppError::config(format!("failed to load EC private key: {e}")))?,
                DecodingKey::from_ec_pem(public_pem)
                    .map_err(|e| AppError::config(format!("failed to load EC public key: {e}")))?,
            ),
            _ => {
                return Err(AppError::config(format!(
                    "unsupported signing method {method}: expected an RS* or ES* algorithm"
                )))
            }
        };

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
            public_key_pem: public_pem.to_vec(),
            token_duration,
        })
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }
}

/// Build a verification-only key, for processes that never sign.
pub fn verification_key(method: &str, public_pem: &[u8]) -> Result<(Algorithm, DecodingKey), AppError> {
    let algorithm = parse_method(method)?;
    let key = match algorithm {
        Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => {
            DecodingKey::from_rsa_pem(public_pem)
                .map_err(|e| AppError::config(format!("failed to load RSA public key: {e}")))?
        }
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(public_pem)
            .map_err(|e| AppError::config(format!("failed to load EC public key: {e}")))?,
        _ => {
            return Err(AppError::config(format!(
                "unsupported signing method {method}: expected an RS* or ES* algorithm"
            )))
        }
    };
    Ok((algorithm, key))
}

fn parse_method(method: &str) -> Result<Algorithm, AppError> {
    method
        .parse::<Algorithm>()
        .map_err(|_| AppError::config(format!("unknown signing method: {method}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_KEY: &[u8] = include_bytes!("../../testdata/rsa_private.pem");
    const RSA_PUB: &[u8] = include_bytes!("../../testdata/rsa_public.pem");
    const EC_KEY: &[u8] = include_bytes!("../../testdata/ec_private.pem");
    const EC_PUB: &[u8] = include_bytes!("../../testdata/ec_public.pem");

    #[test]
    fn rsa_and_ec_material_loads() {
        let dur = Duration::from_secs(3600);
        assert!(SecurityConfig::from_pem("RS256", RSA_KEY, RSA_PUB, dur).is_ok());
        assert!(SecurityConfig::from_pem("RS512", RSA_KEY, RSA_PUB, dur).is_ok());
        assert!(SecurityConfig::from_pem("ES256", EC_KEY, EC_PUB, dur).is_ok());
    }

    #[test]
    fn mismatched_family_fails_at_startup() {
        let dur = Duration::from_secs(3600);
        // EC method over RSA keys and vice versa must fail here, not at
        // request time.
        assert!(SecurityConfig::from_pem("ES256", RSA_KEY, RSA_PUB, dur).is_err());
        assert!(SecurityConfig::from_pem("RS256", EC_KEY, EC_PUB, dur).is_err());
    }

    #[test]
    fn symmetric_and_unknown_methods_are_rejected() {
        let dur = Duration::from_secs(3600);
        assert!(SecurityConfig::from_pem("HS256", RSA_KEY, RSA_PUB, dur).is_err());
        assert!(SecurityConfig::from_pem("bogus", RSA_KEY, RSA_PUB, dur).is_err());
    }
}
