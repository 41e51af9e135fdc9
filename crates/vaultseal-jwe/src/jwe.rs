//! JWE (JSON Web Encryption) with A128KW / A128CBC-HS256.
//!
//! Implements compact JWE format per RFC 7516 with:
//! - Key management: A128KW (RFC 7518 §4.4), the KEK being the key derived
//!   from the shared secret
//! - Content encryption: A128CBC-HS256 (RFC 7518 §5.2.3)
//!
//! A fresh random CEK and IV are generated per envelope.

use vaultseal_crypto::{
    base64url_decode, base64url_encode, cbc_hmac, generate_cek, unwrap_cek, wrap_cek,
    SymmetricKey,
};

use crate::claims::Claims;
use crate::error::JweError;
use crate::header::{AlgorithmConstraints, ProtectedHeader};

/// A parsed compact JWE: header.encrypted_key.iv.ciphertext.tag
#[derive(Debug, Clone)]
pub struct Envelope {
    header: ProtectedHeader,
    /// Encoded header exactly as received; it is the AAD.
    header_b64: String,
    encrypted_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
}

impl Envelope {
    /// Parse a compact serialization. Only structure is checked here;
    /// algorithms are checked by [`Decryptor`].
    pub fn parse(compact: &str) -> Result<Self, JweError> {
        let parts: Vec<&str> = compact.split('.').collect();
        if parts.len() != 5 {
            return Err(JweError::Format(format!(
                "expected 5 parts, got {}",
                parts.len()
            )));
        }

        let decode = |name: &str, part: &str| {
            base64url_decode(part).map_err(|e| JweError::Format(format!("{}: {}", name, e)))
        };

        let header_bytes = decode("header", parts[0])?;
        let header: ProtectedHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| JweError::Format(format!("header: {}", e)))?;

        Ok(Self {
            header,
            header_b64: parts[0].to_string(),
            encrypted_key: decode("encrypted key", parts[1])?,
            iv: decode("iv", parts[2])?,
            ciphertext: decode("ciphertext", parts[3])?,
            tag: decode("tag", parts[4])?,
        })
    }

    pub fn header(&self) -> &ProtectedHeader {
        &self.header
    }

    /// Re-serialize in compact form.
    pub fn to_compact(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}",
            self.header_b64,
            base64url_encode(&self.encrypted_key),
            base64url_encode(&self.iv),
            base64url_encode(&self.ciphertext),
            base64url_encode(&self.tag)
        )
    }
}

/// Decrypts envelopes whose algorithms pass a fixed constraint set.
#[derive(Debug, Clone)]
pub struct Decryptor {
    constraints: AlgorithmConstraints,
}

impl Decryptor {
    /// Build a decryptor. Fails if `constraints` permit anything this codec
    /// cannot process.
    pub fn new(constraints: AlgorithmConstraints) -> Result<Self, JweError> {
        constraints.ensure_supported()?;
        Ok(Self { constraints })
    }

    /// A128KW + A128CBC-HS256 only.
    pub fn strict() -> Self {
        Self {
            constraints: AlgorithmConstraints::strict(),
        }
    }

    /// Decrypt an envelope to plaintext bytes.
    ///
    /// The envelope's own header is checked against the constraints before
    /// any key material is touched.
    pub fn decrypt(&self, envelope: &Envelope, key: &SymmetricKey) -> Result<Vec<u8>, JweError> {
        self.constraints.check(&envelope.header)?;

        let cek = unwrap_cek(&envelope.encrypted_key, key)?;
        let plaintext = cbc_hmac::decrypt(
            &cek,
            envelope.header_b64.as_bytes(),
            &envelope.iv,
            &envelope.ciphertext,
            &envelope.tag,
        )?;
        Ok(plaintext)
    }
}

/// Encrypt plaintext as a compact JWE using A128KW / A128CBC-HS256.
pub fn encrypt_compact(plaintext: &[u8], key: &SymmetricKey) -> Result<String, JweError> {
    let header = ProtectedHeader::a128kw_a128cbc_hs256();
    let header_json = serde_json::to_vec(&header)
        .map_err(|e| JweError::EncryptionFailed(format!("header serialization: {}", e)))?;
    // AAD is the base64url-encoded header (RFC 7516 §5.1 step 14).
    let header_b64 = base64url_encode(&header_json);

    let cek = generate_cek()?;
    let wrapped_cek = wrap_cek(&cek, key)?;
    let sealed = cbc_hmac::encrypt(&cek, header_b64.as_bytes(), plaintext)?;

    Ok(format!(
        "{}.{}.{}.{}.{}",
        header_b64,
        base64url_encode(&wrapped_cek),
        base64url_encode(&sealed.iv),
        base64url_encode(&sealed.ciphertext),
        base64url_encode(&sealed.tag)
    ))
}

/// Seal claims into a compact envelope.
///
/// Fails only for malformed claims or an RNG failure.
pub fn seal(claims: &Claims, key: &SymmetricKey) -> Result<String, JweError> {
    claims.ensure_well_formed()?;
    let plaintext = claims.to_json()?;
    encrypt_compact(&plaintext, key)
}

/// Open a compact envelope and parse its claims with the strict allow-list.
pub fn open(compact: &str, key: &SymmetricKey) -> Result<Claims, JweError> {
    let envelope = Envelope::parse(compact)?;
    let plaintext = Decryptor::strict().decrypt(&envelope, key)?;
    Claims::from_json(&plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::ISSUER;
    use vaultseal_crypto::derive_symmetric_key;

    fn key() -> SymmetricKey {
        derive_symmetric_key(b"shared secret")
    }

    fn claims() -> Claims {
        Claims {
            issuer: ISSUER.to_string(),
            expires_at: 1_700_000_060,
            not_before: 1_699_999_940,
            issued_at: 1_700_000_000,
            token_id: "3b0f7c1e-2d0b-4d55-9d67-2f1c8d0b6a11".to_string(),
            user_data: r#"{"id":100,"message":"Hello World"}"#.to_string(),
        }
    }

    /// Re-encode a compact JWE with segment `index` replaced by `f(decoded)`.
    fn tamper(jwe: &str, index: usize, f: impl FnOnce(&mut Vec<u8>)) -> String {
        let mut parts: Vec<String> = jwe.split('.').map(|s| s.to_string()).collect();
        let mut bytes = base64url_decode(&parts[index]).unwrap();
        f(&mut bytes);
        parts[index] = base64url_encode(&bytes);
        parts.join(".")
    }

    fn with_header(jwe: &str, header_json: &str) -> String {
        let header_b64 = base64url_encode(header_json.as_bytes());
        let mut parts: Vec<&str> = jwe.split('.').collect();
        parts[0] = &header_b64;
        parts.join(".")
    }

    #[test]
    fn seal_open_round_trip() {
        let jwe = seal(&claims(), &key()).unwrap();
        let opened = open(&jwe, &key()).unwrap();
        assert_eq!(opened, claims());
    }

    #[test]
    fn compact_jwe_has_5_parts() {
        let jwe = seal(&claims(), &key()).unwrap();
        assert_eq!(jwe.split('.').count(), 5);
    }

    #[test]
    fn header_has_correct_algorithms() {
        let jwe = seal(&claims(), &key()).unwrap();
        let envelope = Envelope::parse(&jwe).unwrap();
        assert_eq!(envelope.header().alg, "A128KW");
        assert_eq!(envelope.header().enc, "A128CBC-HS256");
        assert_eq!(envelope.to_compact(), jwe);
    }

    #[test]
    fn empty_and_unicode_payloads_round_trip() {
        let long = "x".repeat(4096);
        for payload in ["", "grüße ✓", long.as_str()] {
            let mut c = claims();
            c.user_data = payload.to_string();
            let jwe = seal(&c, &key()).unwrap();
            assert_eq!(open(&jwe, &key()).unwrap().user_data, payload);
        }
    }

    #[test]
    fn wrong_key_is_integrity_failure() {
        let jwe = seal(&claims(), &key()).unwrap();
        let err = open(&jwe, &derive_symmetric_key(b"other secret")).unwrap_err();
        assert!(matches!(err, JweError::IntegrityFailure(_)));
    }

    #[test]
    fn flipped_bits_in_ciphertext_tag_iv_or_key_are_integrity_failures() {
        let jwe = seal(&claims(), &key()).unwrap();
        for index in 1..=4 {
            let len = base64url_decode(jwe.split('.').nth(index).unwrap())
                .unwrap()
                .len();
            for byte in [0, len / 2, len - 1] {
                for bit in [0u8, 3, 7] {
                    let tampered = tamper(&jwe, index, |b| b[byte] ^= 1 << bit);
                    let err = open(&tampered, &key()).unwrap_err();
                    assert!(
                        matches!(err, JweError::IntegrityFailure(_)),
                        "segment {index} byte {byte} bit {bit}: {err:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn header_swap_breaks_aad() {
        // Same algorithms, different encoding (extra whitespace): AAD no longer matches.
        let jwe = seal(&claims(), &key()).unwrap();
        let swapped = with_header(&jwe, r#"{"alg":"A128KW", "enc":"A128CBC-HS256"}"#);
        assert!(matches!(
            open(&swapped, &key()),
            Err(JweError::IntegrityFailure(_))
        ));
    }

    #[test]
    fn disallowed_algorithms_rejected_before_decryption() {
        let jwe = seal(&claims(), &key()).unwrap();
        for header in [
            r#"{"alg":"dir","enc":"A128CBC-HS256"}"#,
            r#"{"alg":"A256KW","enc":"A128CBC-HS256"}"#,
            r#"{"alg":"A128KW","enc":"A128GCM"}"#,
            r#"{"alg":"A128KW","enc":"A256CBC-HS512"}"#,
            r#"{"alg":"A128KW","enc":"A128CBC-HS256","zip":"DEF"}"#,
            r#"{"alg":"A128KW","enc":"A128CBC-HS256","crit":["exp"],"exp":1}"#,
        ] {
            let err = open(&with_header(&jwe, header), &key()).unwrap_err();
            assert!(matches!(err, JweError::UnsupportedAlgorithm(_)), "{header}");
        }
    }

    #[test]
    fn decryptor_construction_enforces_allow_list() {
        let loose = AlgorithmConstraints::permit(&["A128KW", "dir"], &["A128CBC-HS256"]);
        assert!(matches!(
            Decryptor::new(loose),
            Err(JweError::UnsupportedAlgorithm(_))
        ));
        assert!(Decryptor::new(AlgorithmConstraints::strict()).is_ok());
    }

    #[test]
    fn rejects_invalid_jwe_format() {
        for bad in ["not-a-jwe", "a.b.c", "a.b.c.d.e.f", "!!.b.c.d.e", ""] {
            assert!(matches!(open(bad, &key()), Err(JweError::Format(_))), "{bad}");
        }
    }

    #[test]
    fn rejects_header_without_alg() {
        let jwe = seal(&claims(), &key()).unwrap();
        let err = open(&with_header(&jwe, r#"{"enc":"A128CBC-HS256"}"#), &key()).unwrap_err();
        assert!(matches!(err, JweError::Format(_)));
    }

    #[test]
    fn non_claims_plaintext_is_invalid_claims() {
        let jwe = encrypt_compact(b"plain text, not claims", &key()).unwrap();
        assert!(matches!(
            open(&jwe, &key()),
            Err(JweError::InvalidClaims(_))
        ));
    }

    #[test]
    fn seal_rejects_inverted_window() {
        let mut c = claims();
        c.not_before = c.expires_at + 1;
        assert!(matches!(seal(&c, &key()), Err(JweError::InvalidClaims(_))));
    }

    #[test]
    fn envelopes_are_randomized() {
        let a = seal(&claims(), &key()).unwrap();
        let b = seal(&claims(), &key()).unwrap();
        assert_ne!(a, b);
    }
}
