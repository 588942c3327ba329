//! Integration tests for the cipher module.

use apivault::cipher::{mask_key, validate_format, KeyCipher, MIN_KDF_ITERATIONS};
use apivault::errors::VaultError;
use apivault::store::models::ServiceType;

const MASTER: &str = "integration-test-master-secret-0123456789";

fn cipher() -> KeyCipher {
    KeyCipher::new(Some(MASTER), MIN_KDF_ITERATIONS).expect("cipher should build")
}

// ---------------------------------------------------------------------------
// Encryption round-trip
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let cipher = cipher();
    let plaintext = "sk_test_4eC39HqLyjWDarjtT1zdp7dc";

    let encoded = cipher.encrypt(plaintext).expect("encrypt should succeed");

    // Ciphertext is base64 text, never the raw key.
    assert!(!encoded.contains(plaintext));

    let recovered = cipher.decrypt(&encoded).expect("decrypt should succeed");
    assert_eq!(recovered.as_str(), plaintext);
}

#[test]
fn encrypt_produces_different_ciphertext_each_time() {
    let cipher = cipher();
    let plaintext = "sk-abcdefghijklmnop1234";

    let ct1 = cipher.encrypt(plaintext).expect("encrypt 1");
    let ct2 = cipher.encrypt(plaintext).expect("encrypt 2");

    // Because each call generates a new random nonce, the output must differ.
    assert_ne!(ct1, ct2, "two encryptions of the same plaintext must differ");

    // Both still decrypt to the original.
    assert_eq!(cipher.decrypt(&ct1).unwrap().as_str(), plaintext);
    assert_eq!(cipher.decrypt(&ct2).unwrap().as_str(), plaintext);
}

#[test]
fn same_master_secret_yields_compatible_ciphers() {
    // Ciphertext written by one cipher instance must decrypt under a
    // second instance derived from the same secret (process restart).
    let a = cipher();
    let b = cipher();

    let encoded = a.encrypt("keyABCDEF123456789").unwrap();
    assert_eq!(b.decrypt(&encoded).unwrap().as_str(), "keyABCDEF123456789");
}

#[test]
fn decrypt_with_wrong_master_secret_fails() {
    let a = cipher();
    let b = KeyCipher::new(
        Some("a-different-master-secret-9876543210abcdef"),
        MIN_KDF_ITERATIONS,
    )
    .unwrap();

    let encoded = a.encrypt("sk_live_abcdefgh12345678").unwrap();
    assert!(matches!(
        b.decrypt(&encoded),
        Err(VaultError::DecryptionFailed)
    ));
}

#[test]
fn decrypt_rejects_malformed_input() {
    let cipher = cipher();
    assert!(cipher.decrypt("").is_err());
    assert!(cipher.decrypt("   ").is_err());
    assert!(cipher.decrypt("not!!base64$$").is_err());
    // Valid base64 but shorter than a nonce.
    assert!(cipher.decrypt("YWJj").is_err());
}

#[test]
fn decrypt_rejects_tampered_ciphertext() {
    let cipher = cipher();
    let encoded = cipher.encrypt("sk_test_tamperdetect1234").unwrap();

    // Flip one character somewhere past the nonce region.
    let mut chars: Vec<char> = encoded.chars().collect();
    let idx = chars.len() - 2;
    chars[idx] = if chars[idx] == 'A' { 'B' } else { 'A' };
    let tampered: String = chars.into_iter().collect();

    assert!(cipher.decrypt(&tampered).is_err());
}

#[test]
fn encrypt_rejects_empty_plaintext() {
    let cipher = cipher();
    assert!(matches!(
        cipher.encrypt(""),
        Err(VaultError::EmptyPlaintext)
    ));
    assert!(matches!(
        cipher.encrypt("   \t"),
        Err(VaultError::EmptyPlaintext)
    ));
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn short_master_secret_is_rejected() {
    let result = KeyCipher::new(Some("too-short"), MIN_KDF_ITERATIONS);
    assert!(matches!(result, Err(VaultError::MasterKeyTooShort(32))));
}

#[test]
fn weak_iteration_count_is_rejected() {
    let result = KeyCipher::new(Some(MASTER), 1_000);
    assert!(matches!(result, Err(VaultError::KeyDerivationFailed(_))));
}

// ---------------------------------------------------------------------------
// Masking
// ---------------------------------------------------------------------------

#[test]
fn masking_preserves_prefix_and_suffix() {
    assert_eq!(mask_key("sk_live_1234567890abcd", 4), "sk_live_********abcd");
}

#[test]
fn masking_is_stable_under_middle_changes() {
    let a = mask_key("sk_test_XXXXXXXXXXXXwxyz", 4);
    let b = mask_key("sk_test_YYYYYYYYYYYYwxyz", 4);
    assert_eq!(a, b);
    assert!(a.starts_with("sk_test_"));
    assert!(a.ends_with("wxyz"));
}

#[test]
fn masking_short_key_is_placeholder() {
    assert_eq!(mask_key("ab", 4), "********");
}

// ---------------------------------------------------------------------------
// Format validation
// ---------------------------------------------------------------------------

#[test]
fn validate_format_per_service() {
    assert!(validate_format("sk_live_1234567890abcdef", ServiceType::Stripe).0);
    assert!(!validate_format("sk-1234567890abcdefghij", ServiceType::Stripe).0);
    assert!(validate_format("sk-1234567890abcdefghij", ServiceType::Openai).0);
    assert!(validate_format("keyABCDEF1234567890", ServiceType::Airtable).0);
    assert!(validate_format("arbitrary-token-12345", ServiceType::Sendgrid).0);
}
