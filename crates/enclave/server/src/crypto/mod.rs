//! Key material: the secp256k1 proposal signer and the RSA key used for migration.

mod ecdsa;
pub use ecdsa::{
    PRIVATE_KEY_LENGTH, generate_signer, private_key_bytes, public_key_bytes, signer_from_bytes,
    signer_from_hex,
};

mod rsa;
pub use self::rsa::{
    RSA_KEY_BITS, decrypt_pkcs1v15, encrypt_pkcs1v15, generate_rsa_key, pkix_to_public_key,
    public_key_to_pkix,
};

mod signing;
pub use signing::{SIGNATURE_LENGTH, recover_signer, sign_message, verify_message};
