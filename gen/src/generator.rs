/*++

Licensed under the Apache-2.0 license.

File Name:

   generator.rs

Abstract:

    Certificate chain generator

--*/
use anyhow::{anyhow, bail};
use sidewalk_prov::CryptoProvider;
use sidewalk_prov_error::ProvError;
use sidewalk_prov_types::*;

use crate::*;

fn prov_err(what: &'static str) -> impl FnOnce(ProvError) -> anyhow::Error {
    move |err| anyhow!("{what} failed: 0x{:08x}", u32::from(err))
}

/// Chain generator
pub struct ChainGenerator<Crypto: CryptoProvider> {
    crypto: Crypto,
}

impl<Crypto: CryptoProvider> ChainGenerator<Crypto> {
    /// Create an instance `ChainGenerator`
    pub fn new(crypto: Crypto) -> Self {
        Self { crypto }
    }

    /// Generate a chain for a device CSR
    ///
    /// # Arguments
    ///
    /// * `alg`    - Algorithm family of the CSR
    /// * `csr`    - `public_key || fingerprint || signature` from the device
    /// * `config` - Chain generator configuration
    ///
    /// # Returns
    ///
    /// * `GeneratedChain` - Serialized chain and its authorities
    pub fn generate(
        &mut self,
        alg: Algorithm,
        csr: &[u8],
        config: &ChainGeneratorConfig,
    ) -> anyhow::Result<GeneratedChain> {
        if csr.len() != alg.csr_size() {
            bail!(
                "{alg} CSR must be {} bytes, got {}",
                alg.csr_size(),
                csr.len()
            );
        }
        let (signed, csr_sig) = csr.split_at(alg.pub_key_size() + FINGERPRINT_SIZE);
        let (device_pub, fingerprint) = signed.split_at(alg.pub_key_size());

        let valid = self
            .crypto
            .verify(alg, device_pub, signed, csr_sig)
            .map_err(prov_err("CSR verification"))?;
        if !valid {
            bail!("{alg} CSR self-signature does not verify");
        }

        for (level, serial) in CaLevel::ALL.iter().zip(&config.serials) {
            if SerialEncoding::for_serial(serial).is_err() {
                bail!(
                    "Serial for {} must be {CA_SERIAL_MIN_SIZE}..={CA_SERIAL_MAX_SIZE} bytes, got {}",
                    level.name(),
                    serial.len()
                );
            }
        }

        let mut authorities = self.gen_authorities(alg, config)?;
        for level in CaLevel::ALL {
            let signature = self.sign(
                alg,
                &authorities[level.issuer().index()].private_key,
                &[
                    authorities[level.index()].public_key.as_slice(),
                    authorities[level.index()].serial.as_slice(),
                ]
                .concat(),
            )?;
            authorities[level.index()].signature = signature;
        }

        let device_signature = self.sign(
            alg,
            &authorities[CaLevel::Dak.index()].private_key,
            signed,
        )?;

        let bytes = Self::serialize(fingerprint, device_pub, &device_signature, &authorities)?;

        Ok(GeneratedChain {
            bytes,
            device_signature,
            authorities,
        })
    }

    /// Create the authority key pairs, signatures left empty
    fn gen_authorities(
        &mut self,
        alg: Algorithm,
        config: &ChainGeneratorConfig,
    ) -> anyhow::Result<Vec<GeneratedAuthority>> {
        let mut authorities = Vec::with_capacity(CA_LEVEL_COUNT);
        for (level, serial) in CaLevel::ALL.into_iter().zip(&config.serials) {
            let mut private_key = vec![0u8; alg.priv_key_size()];
            let mut public_key = vec![0u8; alg.pub_key_size()];
            self.crypto
                .generate_keypair(alg, &mut private_key, &mut public_key)
                .map_err(prov_err("Key generation"))?;
            authorities.push(GeneratedAuthority {
                level,
                private_key,
                public_key,
                serial: serial.clone(),
                signature: Vec::new(),
            });
        }
        Ok(authorities)
    }

    fn sign(&mut self, alg: Algorithm, priv_key: &[u8], msg: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut sig = vec![0u8; alg.signature_size()];
        self.crypto
            .sign(alg, priv_key, msg, &mut sig)
            .map_err(prov_err("Signing"))?;
        Ok(sig)
    }

    fn serialize(
        fingerprint: &[u8],
        device_pub: &[u8],
        device_signature: &[u8],
        authorities: &[GeneratedAuthority],
    ) -> anyhow::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(fingerprint);
        bytes.extend_from_slice(device_pub);
        bytes.extend_from_slice(device_signature);
        for authority in authorities {
            let mut serial = [0u8; SERIAL_HEADER_SIZE + CA_SERIAL_MAX_SIZE];
            let len = encode_serial(&authority.serial, &mut serial)
                .map_err(prov_err("Serial encoding"))?;
            bytes.extend_from_slice(&serial[..len]);
            bytes.extend_from_slice(&authority.public_key);
            bytes.extend_from_slice(&authority.signature);
        }
        Ok(bytes)
    }
}
