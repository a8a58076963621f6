/*++

Licensed under the Apache-2.0 license.

File Name:

    context.rs

Abstract:

    Provisioning context: everything gathered between `init` and the commit.

--*/

use crate::state::{AlgSlot, AlgStage, DeviceKeys, ProvFlags, ProvState};
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::*;
use zeroize::Zeroize;

pub(crate) type Ed25519Keys =
    DeviceKeys<ED25519_PRIV_KEY_SIZE, ED25519_PUB_KEY_SIZE, ED25519_SIGNATURE_SIZE>;
pub(crate) type P256Keys = DeviceKeys<P256_PRIV_KEY_SIZE, P256_PUB_KEY_SIZE, P256_SIGNATURE_SIZE>;
pub(crate) type Ed25519Slot = AlgSlot<ED25519_PRIV_KEY_SIZE, ED25519_PUB_KEY_SIZE, ED25519_SIGNATURE_SIZE>;
pub(crate) type P256Slot = AlgSlot<P256_PRIV_KEY_SIZE, P256_PUB_KEY_SIZE, P256_SIGNATURE_SIZE>;

/// Device fingerprint and the product id it was derived with
#[derive(Zeroize)]
pub(crate) struct DeviceIdentity {
    pub fingerprint: Fingerprint,
    pub apid: AdvertisedProductId,
}

pub(crate) struct ProvisioningContext {
    pub identity: Option<DeviceIdentity>,
    pub app_server_key: Option<AppServerKey>,
    pub ed25519: Ed25519Slot,
    pub p256: P256Slot,
}

impl ProvisioningContext {
    pub const fn new() -> Self {
        Self {
            identity: None,
            app_server_key: None,
            ed25519: AlgSlot::Empty,
            p256: AlgSlot::Empty,
        }
    }

    /// Drop all progress, scrubbing key material
    pub fn wipe(&mut self) {
        if let Some(identity) = self.identity.as_mut() {
            identity.zeroize();
        }
        if let Some(key) = self.app_server_key.as_mut() {
            key.zeroize();
        }
        self.identity = None;
        self.app_server_key = None;
        self.ed25519.clear();
        self.p256.clear();
    }

    pub fn flags(&self) -> ProvFlags {
        let mut flags = ProvFlags::empty();
        flags.set(ProvFlags::FINGERPRINT_SET, self.identity.is_some());
        flags.set(ProvFlags::APP_KEY_SET, self.app_server_key.is_some());
        for alg in Algorithm::ALL {
            match self.stage(alg) {
                AlgStage::Empty => {}
                AlgStage::CsrReady => flags |= ProvFlags::csr(alg),
                AlgStage::ChainIngested => flags |= ProvFlags::csr(alg) | ProvFlags::chain(alg),
            }
        }
        flags
    }

    pub fn state(&self) -> ProvState {
        ProvState::from(self.flags())
    }

    pub fn stage(&self, alg: Algorithm) -> AlgStage {
        match alg {
            Algorithm::Ed25519 => self.ed25519.stage(),
            Algorithm::P256 => self.p256.stage(),
        }
    }

    /// Fails with `INVALID_STATE` unless every flag in `required` is set
    pub fn require(&self, required: ProvFlags) -> ProvResult<()> {
        self.flags().require(required)
    }

    pub fn fingerprint(&self) -> ProvResult<Fingerprint> {
        self.identity
            .as_ref()
            .map(|identity| identity.fingerprint)
            .ok_or(ProvError::INVALID_STATE)
    }

    /// Clear the CSR and chain of `alg`
    pub fn clear_algorithm(&mut self, alg: Algorithm) {
        match alg {
            Algorithm::Ed25519 => self.ed25519.clear(),
            Algorithm::P256 => self.p256.clear(),
        }
    }

    /// Clear only the chain of `alg`, keeping its CSR
    pub fn clear_chain(&mut self, alg: Algorithm) {
        match alg {
            Algorithm::Ed25519 => self.ed25519.drop_chain(),
            Algorithm::P256 => self.p256.drop_chain(),
        }
    }

    pub fn device_public_key(&self, alg: Algorithm) -> Option<&[u8]> {
        match alg {
            Algorithm::Ed25519 => self.ed25519.keys().map(|keys| &keys.public_key[..]),
            Algorithm::P256 => self.p256.keys().map(|keys| &keys.public_key[..]),
        }
    }
}

impl Default for ProvisioningContext {
    fn default() -> Self {
        Self::new()
    }
}
