//! Binary-safe encoding layer
//!
//! Everything that crosses the ceremony wire is base64url (URL-safe alphabet,
//! no padding); wallet identities are 58-character addresses carrying a
//! 32-byte public key and a 4-byte SHA-512/256 checksum in a base32 body.
//! Encode and decode are inverse operations on every field.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha512_256};

use crate::errors::CodecError;

/// Length of a public key in bytes
pub const PUBLIC_KEY_BYTE_LENGTH: usize = 32;

/// Length of the decoded address body (public key + checksum)
pub const ADDRESS_BYTE_LENGTH: usize = 36;

/// Length of the address checksum in bytes
pub const CHECKSUM_BYTE_LENGTH: usize = 4;

/// Length of an encoded address string
pub const ADDRESS_LENGTH: usize = 58;

/// Length of the SHA-512/256 digest in bytes
const HASH_BYTES_LENGTH: usize = 32;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Encode bytes as base64url without padding
#[must_use]
pub fn to_base64_url(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a base64url string into bytes
///
/// # Errors
///
/// Returns [`CodecError::InvalidBase64UrlInput`] if the input is not valid
/// unpadded base64url
pub fn from_base64_url(input: &str) -> Result<Vec<u8>, CodecError> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| CodecError::InvalidBase64UrlInput)
}

/// Encode a 32-byte public key as a 58-character address
///
/// The trailing 4 bytes of the SHA-512/256 digest of the key are appended as
/// a checksum before the 36-byte body is base32 encoded and truncated to 58
/// characters.
#[must_use]
pub fn encode_address(public_key: &[u8; PUBLIC_KEY_BYTE_LENGTH]) -> String {
    let digest = Sha512_256::digest(public_key);
    let mut body = [0u8; ADDRESS_BYTE_LENGTH];
    body[..PUBLIC_KEY_BYTE_LENGTH].copy_from_slice(public_key);
    body[PUBLIC_KEY_BYTE_LENGTH..]
        .copy_from_slice(&digest[HASH_BYTES_LENGTH - CHECKSUM_BYTE_LENGTH..]);

    let mut address = base32_encode(&body);
    address.truncate(ADDRESS_LENGTH);
    address
}

/// Decode a 58-character address back into its 32-byte public key
///
/// # Errors
///
/// Returns [`CodecError::MalformedAddress`] if the string is not 58 valid
/// base32 characters, or [`CodecError::BadChecksum`] if the embedded checksum
/// does not match the checksum recomputed over the public key
pub fn decode_address(address: &str) -> Result<[u8; PUBLIC_KEY_BYTE_LENGTH], CodecError> {
    if address.len() != ADDRESS_LENGTH {
        return Err(CodecError::MalformedAddress);
    }

    let decoded = base32_decode(address)?;
    if decoded.len() < ADDRESS_BYTE_LENGTH {
        return Err(CodecError::MalformedAddress);
    }

    let mut public_key = [0u8; PUBLIC_KEY_BYTE_LENGTH];
    public_key.copy_from_slice(&decoded[..PUBLIC_KEY_BYTE_LENGTH]);
    let checksum = &decoded[PUBLIC_KEY_BYTE_LENGTH..ADDRESS_BYTE_LENGTH];

    let digest = Sha512_256::digest(public_key);
    if digest[HASH_BYTES_LENGTH - CHECKSUM_BYTE_LENGTH..] != *checksum {
        return Err(CodecError::BadChecksum);
    }

    Ok(public_key)
}

/// RFC 4648 base32 without padding
///
/// The address body is 36 bytes (288 bits), which encodes to 58 characters
/// with three zero pad bits in the final character.
fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(char::from(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize]));
        }
    }
    if bits > 0 {
        out.push(char::from(
            BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize],
        ));
    }

    out
}

/// Inverse of [`base32_encode`]; trailing partial bits are discarded
fn base32_decode(input: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for byte in input.bytes() {
        let value = match byte {
            b'A'..=b'Z' => byte - b'A',
            b'2'..=b'7' => byte - b'2' + 26,
            _ => return Err(CodecError::MalformedAddress),
        };
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    // Wallet address fixture from the linking service
    const ADDRESS_FIXTURE: &str = "65X3KSKFCNX3VUPQDVO3RQUHDZN7BONGBEC6PJWAVKX73DIC356M7M32JM";

    #[test]
    fn test_base64url_known_vectors() {
        assert_eq!(to_base64_url(b""), "");
        assert_eq!(to_base64_url(b"f"), "Zg");
        assert_eq!(to_base64_url(b"fo"), "Zm8");
        assert_eq!(to_base64_url(b"foo"), "Zm9v");
        assert_eq!(to_base64_url(b"foob"), "Zm9vYg");
        assert_eq!(to_base64_url(&[0xfb, 0xff]), "-_8");
    }

    #[test]
    fn test_base64url_round_trip_all_lengths_mod_three() {
        let mut rng = rand::rng();
        for len in 0..64 {
            let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
            let encoded = to_base64_url(&bytes);
            assert!(!encoded.ends_with('='));
            assert_eq!(from_base64_url(&encoded).unwrap(), bytes, "len {len}");
        }
    }

    #[test]
    fn test_base64url_rejects_invalid_input() {
        assert_eq!(
            from_base64_url("not base64url!"),
            Err(CodecError::InvalidBase64UrlInput)
        );
        assert_eq!(
            from_base64_url("Zm9v+"),
            Err(CodecError::InvalidBase64UrlInput)
        );
    }

    #[test]
    fn test_address_fixture_round_trips() {
        let public_key = decode_address(ADDRESS_FIXTURE).unwrap();
        assert_eq!(encode_address(&public_key), ADDRESS_FIXTURE);
    }

    #[test]
    fn test_address_round_trip_random_keys() {
        let mut rng = rand::rng();
        for _ in 0..32 {
            let mut public_key = [0u8; PUBLIC_KEY_BYTE_LENGTH];
            rng.fill(&mut public_key);
            let address = encode_address(&public_key);
            assert_eq!(address.len(), ADDRESS_LENGTH);
            assert_eq!(decode_address(&address).unwrap(), public_key);
        }
    }

    #[test]
    fn test_decode_address_rejects_wrong_length() {
        assert_eq!(decode_address(""), Err(CodecError::MalformedAddress));
        assert_eq!(
            decode_address(&ADDRESS_FIXTURE[..ADDRESS_LENGTH - 1]),
            Err(CodecError::MalformedAddress)
        );
        let long = format!("{ADDRESS_FIXTURE}A");
        assert_eq!(decode_address(&long), Err(CodecError::MalformedAddress));
    }

    #[test]
    fn test_decode_address_rejects_invalid_alphabet() {
        let mut corrupted = String::from(ADDRESS_FIXTURE);
        corrupted.replace_range(0..1, "0");
        assert_eq!(decode_address(&corrupted), Err(CodecError::MalformedAddress));
    }

    #[test]
    fn test_decode_address_rejects_corrupted_checksum() {
        // The checksum occupies the trailing characters of the address; any
        // data-bit change there must be caught.
        for index in [54, 55, 56] {
            let mut corrupted = String::from(ADDRESS_FIXTURE);
            let original = corrupted.as_bytes()[index];
            let replacement = if original == b'A' { "B" } else { "A" };
            corrupted.replace_range(index..=index, replacement);
            assert_eq!(
                decode_address(&corrupted),
                Err(CodecError::BadChecksum),
                "index {index}"
            );
        }
    }

    #[test]
    fn test_decode_address_rejects_corrupted_public_key() {
        let mut corrupted = String::from(ADDRESS_FIXTURE);
        let original = corrupted.as_bytes()[3];
        let replacement = if original == b'A' { "B" } else { "A" };
        corrupted.replace_range(3..=3, replacement);
        assert_eq!(decode_address(&corrupted), Err(CodecError::BadChecksum));
    }
}
