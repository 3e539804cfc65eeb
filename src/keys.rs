// src/keys.rs

use crate::error::{Result, VcdOidcError};
use base64::engine::{general_purpose::URL_SAFE, Engine};
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{BigUint, RsaPublicKey};

/// Largest modulus accepted, in bits. The key is only re-encoded, never used for crypto.
const MAX_MODULUS_BITS: usize = 16384;

/// Converts a JWK's RSA components into a SubjectPublicKeyInfo PEM string.
///
/// `n` and `e` are the base64url-encoded modulus and exponent exactly as the
/// provider publishes them. Providers usually strip the padding, so both are
/// re-padded to a multiple of four characters before decoding.
///
/// # Errors
///
/// Returns `InvalidKeyMaterial` if either component does not decode or the
/// resulting integers do not form a usable RSA public key.
pub fn jwk_to_pem(n: &str, e: &str) -> Result<String> {
    let modulus = decode_component("n", n)?;
    let exponent = decode_component("e", e)?;

    let public_key = RsaPublicKey::new_with_max_size(
        BigUint::from_bytes_be(&modulus),
        BigUint::from_bytes_be(&exponent),
        MAX_MODULUS_BITS,
    )
    .map_err(|err| VcdOidcError::InvalidKeyMaterial(format!("cannot build RSA key: {err}")))?;

    let pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|err| VcdOidcError::InvalidKeyMaterial(format!("cannot encode PEM: {err}")))?;
    Ok(pem.trim_end().to_string())
}

fn decode_component(name: &str, value: &str) -> Result<Vec<u8>> {
    URL_SAFE
        .decode(repad(value))
        .map_err(|err| VcdOidcError::InvalidKeyMaterial(format!("'{name}' is not base64url: {err}")))
}

/// Normalises base64 padding: drops whatever `=` is present and pads back to a multiple of 4.
fn repad(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('=');
    let missing = (4 - trimmed.len() % 4) % 4;
    let mut padded = String::with_capacity(trimmed.len() + missing);
    padded.push_str(trimmed);
    padded.extend(std::iter::repeat('=').take(missing));
    padded
}
