/*++

Licensed under the Apache-2.0 license.

File Name:

    state.rs

Abstract:

    Provisioning progress tracking.

    Each algorithm family moves through `Empty -> CsrReady -> ChainIngested`
    and carries its key material inside the variant, so a stage can only
    reach data whose presence the state proves. The six-flag bitmask is a
    view derived from those variants.

--*/

use bitflags::bitflags;
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::{Algorithm, CertChain};
use zeroize::Zeroize;

bitflags! {
    /// Completed provisioning steps
    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    pub struct ProvFlags: u32 {
        const FINGERPRINT_SET = 0b00_0001;
        const APP_KEY_SET = 0b00_0010;
        const ED25519_CSR = 0b00_0100;
        const P256_CSR = 0b00_1000;
        const ED25519_CHAIN = 0b01_0000;
        const P256_CHAIN = 0b10_0000;
    }
}

impl ProvFlags {
    pub const fn csr(alg: Algorithm) -> Self {
        match alg {
            Algorithm::Ed25519 => Self::ED25519_CSR,
            Algorithm::P256 => Self::P256_CSR,
        }
    }

    pub const fn chain(alg: Algorithm) -> Self {
        match alg {
            Algorithm::Ed25519 => Self::ED25519_CHAIN,
            Algorithm::P256 => Self::P256_CHAIN,
        }
    }

    /// Fails with `INVALID_STATE` unless every flag in `required` is set
    pub fn require(self, required: ProvFlags) -> ProvResult<()> {
        if self.contains(required) {
            Ok(())
        } else {
            Err(ProvError::INVALID_STATE)
        }
    }
}

/// Named provisioning state
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProvState {
    /// Nothing done yet
    Empty,

    /// Only the fingerprint is set
    IdentitySet,

    /// Some but not all steps done
    Partial,

    /// Every step done; the commit is allowed
    FullyReady,
}

impl From<ProvFlags> for ProvState {
    fn from(flags: ProvFlags) -> Self {
        if flags.is_empty() {
            ProvState::Empty
        } else if flags == ProvFlags::FINGERPRINT_SET {
            ProvState::IdentitySet
        } else if flags == ProvFlags::all() {
            ProvState::FullyReady
        } else {
            ProvState::Partial
        }
    }
}

/// Progress of one algorithm family
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AlgStage {
    Empty,
    CsrReady,
    ChainIngested,
}

/// Device key pair plus the signature over `public_key || fingerprint`.
///
/// The signature is the CSR self-signature until a chain is ingested, after
/// which it is the issuer's signature on the device certificate.
pub(crate) struct DeviceKeys<const SK: usize, const PK: usize, const SIG: usize> {
    pub private_key: [u8; SK],
    pub public_key: [u8; PK],
    pub signature: [u8; SIG],
}

impl<const SK: usize, const PK: usize, const SIG: usize> DeviceKeys<SK, PK, SIG> {
    pub fn new() -> Self {
        Self {
            private_key: [0u8; SK],
            public_key: [0u8; PK],
            signature: [0u8; SIG],
        }
    }
}

impl<const SK: usize, const PK: usize, const SIG: usize> Drop for DeviceKeys<SK, PK, SIG> {
    fn drop(&mut self) {
        self.private_key.zeroize();
        self.public_key.zeroize();
        self.signature.zeroize();
    }
}

/// Per-algorithm slot of the provisioning context
pub(crate) enum AlgSlot<const SK: usize, const PK: usize, const SIG: usize> {
    Empty,
    CsrReady(DeviceKeys<SK, PK, SIG>),
    ChainIngested(DeviceKeys<SK, PK, SIG>, CertChain<PK, SIG>),
}

impl<const SK: usize, const PK: usize, const SIG: usize> AlgSlot<SK, PK, SIG> {
    pub fn stage(&self) -> AlgStage {
        match self {
            AlgSlot::Empty => AlgStage::Empty,
            AlgSlot::CsrReady(_) => AlgStage::CsrReady,
            AlgSlot::ChainIngested(..) => AlgStage::ChainIngested,
        }
    }

    pub fn keys(&self) -> Option<&DeviceKeys<SK, PK, SIG>> {
        match self {
            AlgSlot::Empty => None,
            AlgSlot::CsrReady(keys) | AlgSlot::ChainIngested(keys, _) => Some(keys),
        }
    }

    pub fn chain(&self) -> Option<(&DeviceKeys<SK, PK, SIG>, &CertChain<PK, SIG>)> {
        match self {
            AlgSlot::ChainIngested(keys, chain) => Some((keys, chain)),
            _ => None,
        }
    }

    /// Forget keys and chain
    pub fn clear(&mut self) {
        if let AlgSlot::ChainIngested(_, chain) = self {
            chain.zeroize();
        }
        *self = AlgSlot::Empty;
    }

    /// Step back from `ChainIngested` to `CsrReady`
    pub fn drop_chain(&mut self) {
        if let AlgSlot::ChainIngested(..) = self {
            if let AlgSlot::ChainIngested(keys, mut chain) =
                core::mem::replace(self, AlgSlot::Empty)
            {
                chain.zeroize();
                *self = AlgSlot::CsrReady(keys);
            }
        }
    }

    /// `CsrReady -> ChainIngested`, replacing the device signature with the
    /// one carried by the chain.
    pub fn attach_chain(
        &mut self,
        device_signature: [u8; SIG],
        chain: CertChain<PK, SIG>,
    ) -> ProvResult<()> {
        match core::mem::replace(self, AlgSlot::Empty) {
            AlgSlot::CsrReady(mut keys) => {
                keys.signature = device_signature;
                *self = AlgSlot::ChainIngested(keys, chain);
                Ok(())
            }
            other => {
                *self = other;
                Err(ProvError::INVALID_STATE)
            }
        }
    }
}
