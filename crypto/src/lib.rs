/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Software crypto provider for provisioning, built on RustCrypto.

--*/

use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::{OsRng, StdRng};
use rand::{CryptoRng, RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use sidewalk_prov::CryptoProvider;
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::*;
use zeroize::Zeroize;

/// SEC1 tag of an uncompressed point
const SEC1_UNCOMPRESSED: u8 = 0x04;

/// Crypto provider backed by `sha2`, `ed25519-dalek` and `p256`
pub struct RustCrypto<R: RngCore + CryptoRng = OsRng> {
    rng: R,
}

impl Default for RustCrypto<OsRng> {
    fn default() -> Self {
        Self { rng: OsRng }
    }
}

impl RustCrypto<StdRng> {
    /// Reproducible key generation for tests and tooling
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: RngCore + CryptoRng> RustCrypto<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

fn check_len(buf: &[u8], len: usize) -> ProvResult<()> {
    if buf.len() == len {
        Ok(())
    } else {
        Err(ProvError::INVALID_ARGS)
    }
}

fn ed25519_signing_key(priv_key: &[u8]) -> ProvResult<ed25519_dalek::SigningKey> {
    let bytes: &[u8; ED25519_PRIV_KEY_SIZE] =
        priv_key.try_into().map_err(|_| ProvError::INVALID_ARGS)?;
    Ok(ed25519_dalek::SigningKey::from_bytes(bytes))
}

fn p256_signing_key(priv_key: &[u8]) -> ProvResult<p256::ecdsa::SigningKey> {
    check_len(priv_key, P256_PRIV_KEY_SIZE)?;
    p256::ecdsa::SigningKey::from_slice(priv_key).map_err(|_| ProvError::INVALID_ARGS)
}

/// Raw `x || y` of a P-256 verifying key
fn p256_raw_public_key(key: &p256::ecdsa::VerifyingKey, out: &mut [u8]) -> ProvResult<()> {
    let point = key.as_affine().to_encoded_point(false);
    let raw = point
        .as_bytes()
        .get(1..)
        .ok_or(ProvError::GENERIC)?;
    check_len(out, raw.len())?;
    out.copy_from_slice(raw);
    Ok(())
}

fn p256_verifying_key(pub_key: &[u8]) -> ProvResult<p256::ecdsa::VerifyingKey> {
    check_len(pub_key, P256_PUB_KEY_SIZE)?;
    let mut sec1 = [0u8; P256_PUB_KEY_SIZE + 1];
    sec1[0] = SEC1_UNCOMPRESSED;
    sec1[1..].copy_from_slice(pub_key);
    p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).map_err(|_| ProvError::INVALID_ARGS)
}

impl<R: RngCore + CryptoRng> CryptoProvider for RustCrypto<R> {
    fn sha256_digest(&mut self, data: &[u8]) -> ProvResult<Fingerprint> {
        let mut engine = Sha256::new();
        engine.update(data);
        Ok(engine.finalize().into())
    }

    fn generate_keypair(
        &mut self,
        alg: Algorithm,
        priv_key: &mut [u8],
        pub_key: &mut [u8],
    ) -> ProvResult<()> {
        check_len(priv_key, alg.priv_key_size())?;
        check_len(pub_key, alg.pub_key_size())?;
        match alg {
            Algorithm::Ed25519 => {
                let key = ed25519_dalek::SigningKey::generate(&mut self.rng);
                priv_key.copy_from_slice(key.as_bytes());
                pub_key.copy_from_slice(key.verifying_key().as_bytes());
            }
            Algorithm::P256 => {
                let key = p256::ecdsa::SigningKey::random(&mut self.rng);
                let mut bytes = key.to_bytes();
                priv_key.copy_from_slice(&bytes);
                bytes.as_mut_slice().zeroize();
                p256_raw_public_key(key.verifying_key(), pub_key)?;
            }
        }
        Ok(())
    }

    fn sign(
        &mut self,
        alg: Algorithm,
        priv_key: &[u8],
        msg: &[u8],
        sig: &mut [u8],
    ) -> ProvResult<()> {
        check_len(sig, alg.signature_size())?;
        match alg {
            Algorithm::Ed25519 => {
                let key = ed25519_signing_key(priv_key)?;
                sig.copy_from_slice(&key.sign(msg).to_bytes());
            }
            Algorithm::P256 => {
                let key = p256_signing_key(priv_key)?;
                let signature: p256::ecdsa::Signature = key.sign(msg);
                sig.copy_from_slice(&signature.to_bytes());
            }
        }
        Ok(())
    }

    fn verify(
        &mut self,
        alg: Algorithm,
        pub_key: &[u8],
        msg: &[u8],
        sig: &[u8],
    ) -> ProvResult<bool> {
        match alg {
            Algorithm::Ed25519 => {
                let pub_key: &[u8; ED25519_PUB_KEY_SIZE] =
                    pub_key.try_into().map_err(|_| ProvError::INVALID_ARGS)?;
                let sig: &[u8; ED25519_SIGNATURE_SIZE] =
                    sig.try_into().map_err(|_| ProvError::INVALID_ARGS)?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(pub_key)
                    .map_err(|_| ProvError::INVALID_ARGS)?;
                let sig = ed25519_dalek::Signature::from_bytes(sig);
                Ok(key.verify(msg, &sig).is_ok())
            }
            Algorithm::P256 => {
                check_len(sig, P256_SIGNATURE_SIZE)?;
                let key = p256_verifying_key(pub_key)?;
                // Out-of-range scalars can never verify.
                let Ok(sig) = p256::ecdsa::Signature::from_slice(sig) else {
                    return Ok(false);
                };
                Ok(key.verify(msg, &sig).is_ok())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let mut crypto = RustCrypto::default();
        assert_eq!(
            hex::encode(crypto.sha256_digest(b"abc").unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_ed25519_known_answer() {
        let mut crypto = RustCrypto::default();
        let priv_key =
            hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60")
                .unwrap();
        let pub_key =
            hex::decode("d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a")
                .unwrap();
        let mut sig = [0u8; ED25519_SIGNATURE_SIZE];
        crypto
            .sign(Algorithm::Ed25519, &priv_key, b"", &mut sig)
            .unwrap();
        assert_eq!(
            hex::encode(sig),
            "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b"
        );
        assert_eq!(crypto.verify(Algorithm::Ed25519, &pub_key, b"", &sig), Ok(true));
        assert_eq!(crypto.verify(Algorithm::Ed25519, &pub_key, b"x", &sig), Ok(false));
    }

    #[test]
    fn test_generated_keys_sign_and_verify() {
        let mut crypto = RustCrypto::from_seed(7);
        for alg in Algorithm::ALL {
            let mut priv_key = [0u8; MAX_PRIV_KEY_SIZE];
            let mut pub_key = vec![0u8; alg.pub_key_size()];
            crypto
                .generate_keypair(alg, &mut priv_key[..alg.priv_key_size()], &mut pub_key)
                .unwrap();

            let mut sig = vec![0u8; alg.signature_size()];
            crypto
                .sign(alg, &priv_key[..alg.priv_key_size()], b"fingerprint", &mut sig)
                .unwrap();
            assert_eq!(crypto.verify(alg, &pub_key, b"fingerprint", &sig), Ok(true));

            sig[5] ^= 0x10;
            assert_eq!(crypto.verify(alg, &pub_key, b"fingerprint", &sig), Ok(false));
        }
    }

    #[test]
    fn test_seeded_keys_are_reproducible() {
        let mut a = RustCrypto::from_seed(42);
        let mut b = RustCrypto::from_seed(42);
        let (mut sk_a, mut pk_a) = ([0u8; 32], [0u8; 64]);
        let (mut sk_b, mut pk_b) = ([0u8; 32], [0u8; 64]);
        a.generate_keypair(Algorithm::P256, &mut sk_a, &mut pk_a).unwrap();
        b.generate_keypair(Algorithm::P256, &mut sk_b, &mut pk_b).unwrap();
        assert_eq!(sk_a, sk_b);
        assert_eq!(pk_a, pk_b);
    }

    #[test]
    fn test_malformed_inputs() {
        let mut crypto = RustCrypto::default();
        let mut sig = [0u8; 64];
        assert_eq!(
            crypto.sign(Algorithm::Ed25519, &[1; 31], b"m", &mut sig),
            Err(ProvError::INVALID_ARGS)
        );
        assert_eq!(
            crypto.sign(Algorithm::P256, &[0; 32], b"m", &mut sig),
            Err(ProvError::INVALID_ARGS)
        );
        assert_eq!(
            crypto.sign(Algorithm::P256, &[1; 32], b"m", &mut sig[..63]),
            Err(ProvError::INVALID_ARGS)
        );
        // Not a point on the curve.
        assert_eq!(
            crypto.verify(Algorithm::P256, &[0xAB; 64], b"m", &sig),
            Err(ProvError::INVALID_ARGS)
        );
        let mut priv_key = [0u8; 32];
        assert_eq!(
            crypto.generate_keypair(Algorithm::Ed25519, &mut priv_key, &mut [0u8; 64]),
            Err(ProvError::INVALID_ARGS)
        );
    }
}
