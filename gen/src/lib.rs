/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Provisioning-service side certificate chain generator.

    Given a device CSR it creates five authority key pairs, signs each
    authority with its issuer (the root signs itself), signs the device
    certificate with the nearest authority and serializes the chain in the
    form the device ingests.

--*/

mod generator;

pub use generator::ChainGenerator;

use sidewalk_prov_types::{CaLevel, CA_LEVEL_COUNT};

/// Serial numbers assigned to the authorities, nearest the device first
#[derive(Debug, Clone)]
pub struct ChainGeneratorConfig {
    pub serials: [Vec<u8>; CA_LEVEL_COUNT],
}

impl Default for ChainGeneratorConfig {
    /// Mix of inline and extended serials
    fn default() -> Self {
        Self {
            serials: [
                vec![0x01, 0x00, 0x00, 0x0D],
                vec![0x02, 0x50, 0x52, 0x44, 0x00, 0x01],
                vec![0x03, 0x4D, 0x46, 0x47],
                (0..16).map(|i| 0xC0 | i).collect(),
                vec![0x05, 0x52, 0x4F, 0x4F, 0x54, 0x00, 0x00, 0x01],
            ],
        }
    }
}

/// One generated authority
#[derive(Debug, Clone)]
pub struct GeneratedAuthority {
    pub level: CaLevel,
    pub private_key: Vec<u8>,
    pub public_key: Vec<u8>,
    pub serial: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Serialized chain plus the material it was built from
#[derive(Debug, Clone)]
pub struct GeneratedChain {
    /// Wire form accepted by chain ingestion
    pub bytes: Vec<u8>,

    /// Signature over `device_public_key || fingerprint`
    pub device_signature: Vec<u8>,

    /// Authorities, nearest the device first
    pub authorities: Vec<GeneratedAuthority>,
}

impl GeneratedChain {
    pub fn authority(&self, level: CaLevel) -> &GeneratedAuthority {
        &self.authorities[level.index()]
    }
}
