/*++

Licensed under the Apache-2.0 license.

File Name:

    verifier.rs

Abstract:

    Chain-of-trust verification of the ingested certificate chains.

--*/

use crate::context::ProvisioningContext;
use crate::slice_concat::concat_into;
use crate::state::{DeviceKeys, ProvFlags};
use crate::{cprintln, CryptoProvider};
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::*;

/// Chain-of-Trust Verifier
pub(crate) struct ChainVerifier<'a, C: CryptoProvider> {
    crypto: &'a mut C,
}

impl<'a, C: CryptoProvider> ChainVerifier<'a, C> {
    pub fn new(crypto: &'a mut C) -> Self {
        Self { crypto }
    }

    /// Verify both device certificates and all ten authority records.
    ///
    /// Every failed check is reported as `GENERIC`.
    pub fn verify(&mut self, ctx: &ProvisioningContext) -> ProvResult<()> {
        ctx.require(ProvFlags::all())?;
        let fingerprint = ctx.fingerprint()?;

        let (keys, chain) = ctx.ed25519.chain().ok_or(ProvError::INVALID_STATE)?;
        self.verify_alg(Algorithm::Ed25519, &fingerprint, keys, chain)?;

        let (keys, chain) = ctx.p256.chain().ok_or(ProvError::INVALID_STATE)?;
        self.verify_alg(Algorithm::P256, &fingerprint, keys, chain)?;

        cprintln!("[prov] Chain of trust verified");
        Ok(())
    }

    fn verify_alg<const SK: usize, const PK: usize, const SIG: usize>(
        &mut self,
        alg: Algorithm,
        fingerprint: &Fingerprint,
        keys: &DeviceKeys<SK, PK, SIG>,
        chain: &CertChain<PK, SIG>,
    ) -> ProvResult<()> {
        let mut msg = [0u8; MAX_PUB_KEY_SIZE + CA_SERIAL_MAX_SIZE];

        // The device certificate is issued by the nearest authority.
        let signed = concat_into(&mut msg, &[&keys.public_key, fingerprint], ProvError::GENERIC)?;
        let issuer = chain.authority(CaLevel::Dak);
        if !self.check(alg, &issuer.public_key, signed, &keys.signature) {
            cprintln!("[prov] Device cert verify failed alg={}", alg.name());
            return Err(ProvError::GENERIC);
        }

        for record in chain.authorities() {
            let issuer = chain.issuer_of(record.level);
            let signed = concat_into(
                &mut msg,
                &[&record.public_key, record.serial.as_bytes()],
                ProvError::GENERIC,
            )?;
            if !self.check(alg, &issuer.public_key, signed, &record.signature) {
                cprintln!(
                    "[prov] Chain verify failed alg={} level={}",
                    alg.name(),
                    record.level.name()
                );
                return Err(ProvError::GENERIC);
            }
        }

        Ok(())
    }

    fn check(&mut self, alg: Algorithm, pub_key: &[u8], msg: &[u8], sig: &[u8]) -> bool {
        matches!(self.crypto.verify(alg, pub_key, msg, sig), Ok(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AlgSlot;
    use crate::test_env::{provision_all, TestCrypto};

    fn provisioned() -> (TestCrypto, ProvisioningContext) {
        let mut crypto = TestCrypto::default();
        let mut ctx = ProvisioningContext::new();
        provision_all(&mut crypto, &mut ctx);
        (crypto, ctx)
    }

    /// Rebuild a slot's chain with one record changed
    fn tamper_p256(ctx: &mut ProvisioningContext, level: CaLevel, f: impl FnOnce(&mut P256CaRecord)) {
        let AlgSlot::ChainIngested(_, chain) = &mut ctx.p256 else {
            panic!("chain not ingested");
        };
        let mut records = *chain.authorities();
        f(&mut records[level.index()]);
        *chain = P256CertChain::new(records).unwrap();
    }

    #[test]
    fn test_verify_valid_chains() {
        let (mut crypto, ctx) = provisioned();
        assert_eq!(ChainVerifier::new(&mut crypto).verify(&ctx), Ok(()));
    }

    #[test]
    fn test_requires_every_flag() {
        let (mut crypto, mut ctx) = provisioned();
        ctx.app_server_key = None;
        assert_eq!(
            ChainVerifier::new(&mut crypto).verify(&ctx),
            Err(ProvError::INVALID_STATE)
        );

        let (mut crypto, mut ctx) = provisioned();
        ctx.clear_chain(Algorithm::P256);
        assert_eq!(
            ChainVerifier::new(&mut crypto).verify(&ctx),
            Err(ProvError::INVALID_STATE)
        );
    }

    #[test]
    fn test_corrupt_device_signature() {
        let (mut crypto, mut ctx) = provisioned();
        if let AlgSlot::ChainIngested(keys, _) = &mut ctx.ed25519 {
            keys.signature[17] ^= 0x04;
        }
        assert_eq!(
            ChainVerifier::new(&mut crypto).verify(&ctx),
            Err(ProvError::GENERIC)
        );
    }

    #[test]
    fn test_corrupt_each_level() {
        for level in CaLevel::ALL {
            let (mut crypto, mut ctx) = provisioned();
            tamper_p256(&mut ctx, level, |record| record.signature[0] ^= 0x01);
            assert_eq!(
                ChainVerifier::new(&mut crypto).verify(&ctx),
                Err(ProvError::GENERIC)
            );

            let (mut crypto, mut ctx) = provisioned();
            tamper_p256(&mut ctx, level, |record| record.public_key[63] ^= 0x80);
            assert_eq!(
                ChainVerifier::new(&mut crypto).verify(&ctx),
                Err(ProvError::GENERIC)
            );
        }
    }

    #[test]
    fn test_corrupt_serial() {
        let (mut crypto, mut ctx) = provisioned();
        tamper_p256(&mut ctx, CaLevel::Manufacturer, |record| {
            let mut serial = record.serial.as_bytes().to_vec();
            serial[3] ^= 0xFF;
            record.serial = CaSerial::new(&serial).unwrap();
        });
        assert_eq!(
            ChainVerifier::new(&mut crypto).verify(&ctx),
            Err(ProvError::GENERIC)
        );
    }

    #[test]
    fn test_provider_error_is_generic() {
        let (mut crypto, ctx) = provisioned();
        crypto.verify_error = Some(ProvError::NOSUPPORT);
        assert_eq!(
            ChainVerifier::new(&mut crypto).verify(&ctx),
            Err(ProvError::GENERIC)
        );
    }
}
