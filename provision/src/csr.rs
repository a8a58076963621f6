/*++

Licensed under the Apache-2.0 license.

File Name:

    csr.rs

Abstract:

    Device key generation and certificate signing request output.

--*/

use crate::context::{Ed25519Keys, P256Keys, ProvisioningContext};
use crate::slice_concat::concat_into;
use crate::state::{AlgSlot, DeviceKeys, ProvFlags};
use crate::{cprintln, CryptoProvider};
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::*;

/// Key/CSR Generator
pub(crate) struct CsrGenerator<'a, C: CryptoProvider> {
    crypto: &'a mut C,
}

impl<'a, C: CryptoProvider> CsrGenerator<'a, C> {
    pub fn new(crypto: &'a mut C) -> Self {
        Self { crypto }
    }

    /// Generate a fresh device key pair for `alg` and write its CSR.
    ///
    /// The CSR is `public_key || fingerprint || signature`, the signature
    /// covering the first two fields. Any chain previously ingested for
    /// `alg` is discarded, even if generation then fails.
    ///
    /// # Returns
    ///
    /// * `usize` - CSR length, always `alg.csr_size()`
    pub fn generate(
        &mut self,
        ctx: &mut ProvisioningContext,
        alg: Algorithm,
        out: &mut [u8],
    ) -> ProvResult<usize> {
        ctx.require(ProvFlags::FINGERPRINT_SET)?;
        let fingerprint = ctx.fingerprint()?;

        ctx.clear_algorithm(alg);

        if out.len() < alg.csr_size() {
            cprintln!(
                "[prov] CSR buffer too small alg={} len={}",
                alg.name(),
                out.len()
            );
            return Err(ProvError::INVALID_ARGS);
        }

        let len = match alg {
            Algorithm::Ed25519 => {
                let keys: Ed25519Keys = self.device_keys(alg, &fingerprint)?;
                let len = write_csr(out, &keys, &fingerprint)?;
                ctx.ed25519 = AlgSlot::CsrReady(keys);
                len
            }
            Algorithm::P256 => {
                let keys: P256Keys = self.device_keys(alg, &fingerprint)?;
                let len = write_csr(out, &keys, &fingerprint)?;
                ctx.p256 = AlgSlot::CsrReady(keys);
                len
            }
        };

        cprintln!("[prov] CSR generated alg={}", alg.name());
        Ok(len)
    }

    /// Generate a key pair and self-sign `public_key || fingerprint`
    fn device_keys<const SK: usize, const PK: usize, const SIG: usize>(
        &mut self,
        alg: Algorithm,
        fingerprint: &Fingerprint,
    ) -> ProvResult<DeviceKeys<SK, PK, SIG>> {
        let mut keys = DeviceKeys::<SK, PK, SIG>::new();
        self.crypto
            .generate_keypair(alg, &mut keys.private_key, &mut keys.public_key)
            .map_err(|err| {
                cprintln!("[prov] Key generation failed alg={}", alg.name());
                err
            })?;

        let mut msg = [0u8; MAX_PUB_KEY_SIZE + FINGERPRINT_SIZE];
        let msg = concat_into(&mut msg, &[&keys.public_key, fingerprint], ProvError::INVALID_ARGS)?;
        self.crypto
            .sign(alg, &keys.private_key, msg, &mut keys.signature)
            .map_err(|err| {
                cprintln!("[prov] CSR signing failed alg={}", alg.name());
                err
            })?;

        Ok(keys)
    }
}

fn write_csr<const SK: usize, const PK: usize, const SIG: usize>(
    out: &mut [u8],
    keys: &DeviceKeys<SK, PK, SIG>,
    fingerprint: &Fingerprint,
) -> ProvResult<usize> {
    let csr = concat_into(
        out,
        &[&keys.public_key, fingerprint, &keys.signature],
        ProvError::INVALID_ARGS,
    )?;
    Ok(csr.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainIngester;
    use crate::identity::IdentityGenerator;
    use crate::state::AlgStage;
    use crate::test_env::{build_chain, TestCrypto};

    fn ready_context(crypto: &mut TestCrypto) -> ProvisioningContext {
        let mut ctx = ProvisioningContext::new();
        IdentityGenerator::new(crypto)
            .derive(&mut ctx, "dev_type_A", "DSN12345", "APID", None)
            .unwrap();
        ctx
    }

    #[test]
    fn test_requires_fingerprint() {
        let mut crypto = TestCrypto::default();
        let mut ctx = ProvisioningContext::new();
        let mut out = [0u8; 256];
        assert_eq!(
            CsrGenerator::new(&mut crypto).generate(&mut ctx, Algorithm::Ed25519, &mut out),
            Err(ProvError::INVALID_STATE)
        );
    }

    #[test]
    fn test_csr_layout() {
        let mut crypto = TestCrypto::default();
        let mut ctx = ready_context(&mut crypto);
        let fingerprint = ctx.fingerprint().unwrap();

        for alg in Algorithm::ALL {
            let mut out = [0u8; 256];
            let len = CsrGenerator::new(&mut crypto)
                .generate(&mut ctx, alg, &mut out)
                .unwrap();
            assert_eq!(len, alg.csr_size());

            let pk_len = alg.pub_key_size();
            let public_key = ctx.device_public_key(alg).unwrap();
            assert_eq!(&out[..pk_len], public_key);
            assert_eq!(&out[pk_len..pk_len + FINGERPRINT_SIZE], &fingerprint);
            let sig = &out[pk_len + FINGERPRINT_SIZE..len];
            assert_eq!(
                crypto.verify(alg, public_key, &out[..pk_len + FINGERPRINT_SIZE], sig),
                Ok(true)
            );
            assert_eq!(ctx.stage(alg), AlgStage::CsrReady);
        }
        assert_eq!(
            ctx.flags(),
            ProvFlags::FINGERPRINT_SET | ProvFlags::ED25519_CSR | ProvFlags::P256_CSR
        );
    }

    #[test]
    fn test_small_buffer_untouched() {
        let mut crypto = TestCrypto::default();
        let mut ctx = ready_context(&mut crypto);
        let mut out = [0x5A; 159];
        assert_eq!(
            CsrGenerator::new(&mut crypto).generate(&mut ctx, Algorithm::P256, &mut out),
            Err(ProvError::INVALID_ARGS)
        );
        assert!(out.iter().all(|&b| b == 0x5A));
        assert_eq!(ctx.stage(Algorithm::P256), AlgStage::Empty);
    }

    #[test]
    fn test_regeneration_clears_chain() {
        let mut crypto = TestCrypto::default();
        let mut ctx = ready_context(&mut crypto);
        let mut out = [0u8; 256];
        let len = CsrGenerator::new(&mut crypto)
            .generate(&mut ctx, Algorithm::Ed25519, &mut out)
            .unwrap();
        let chain = build_chain(&mut crypto, Algorithm::Ed25519, &out[..len]);
        ChainIngester::new()
            .ingest(&mut ctx, Algorithm::Ed25519, &chain)
            .unwrap();
        assert_eq!(ctx.stage(Algorithm::Ed25519), AlgStage::ChainIngested);
        let old_key = ctx.device_public_key(Algorithm::Ed25519).unwrap().to_vec();

        CsrGenerator::new(&mut crypto)
            .generate(&mut ctx, Algorithm::Ed25519, &mut out)
            .unwrap();
        assert_eq!(ctx.stage(Algorithm::Ed25519), AlgStage::CsrReady);
        assert_ne!(ctx.device_public_key(Algorithm::Ed25519).unwrap(), &old_key[..]);
    }

    #[test]
    fn test_crypto_errors_propagate() {
        let mut crypto = TestCrypto::default();
        let mut ctx = ready_context(&mut crypto);
        let mut out = [0u8; 256];

        crypto.keygen_error = Some(ProvError::NOSUPPORT);
        assert_eq!(
            CsrGenerator::new(&mut crypto).generate(&mut ctx, Algorithm::P256, &mut out),
            Err(ProvError::NOSUPPORT)
        );

        crypto.keygen_error = None;
        crypto.sign_error = Some(ProvError::GENERIC);
        assert_eq!(
            CsrGenerator::new(&mut crypto).generate(&mut ctx, Algorithm::P256, &mut out),
            Err(ProvError::GENERIC)
        );
        assert_eq!(ctx.stage(Algorithm::P256), AlgStage::Empty);
        assert_eq!(ctx.flags(), ProvFlags::FINGERPRINT_SET);
    }
}
