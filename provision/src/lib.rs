/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    On-device identity provisioning: fingerprint derivation, key and CSR
    generation, certificate chain ingestion, chain-of-trust verification and
    the manufacturing store commit.

--*/

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

#[doc(hidden)]
pub mod printer;

mod chain;
mod commit;
mod context;
mod csr;
mod identity;
mod session;
mod slice_concat;
mod state;
mod verifier;

pub use printer::HexBytes;
pub use session::{ProvisioningArena, ProvisioningSession};
pub use sidewalk_prov_error::{ProvError, ProvResult};
pub use sidewalk_prov_types::{Algorithm, CaLevel, Fingerprint, MfgField};
pub use state::{AlgStage, ProvFlags, ProvState};

/// Cryptographic primitives consumed by the provisioning engine.
///
/// Public keys and signatures are raw byte strings: 32/64 bytes for
/// Ed25519, `x || y` and `r || s` for P-256. Implementations report
/// `NOSUPPORT`, `INVALID_ARGS` or `GENERIC` on failure.
pub trait CryptoProvider {
    /// Calculate SHA-256 Digest
    fn sha256_digest(&mut self, data: &[u8]) -> ProvResult<Fingerprint>;

    /// Generate a key pair, filling both output buffers completely
    fn generate_keypair(
        &mut self,
        alg: Algorithm,
        priv_key: &mut [u8],
        pub_key: &mut [u8],
    ) -> ProvResult<()>;

    /// Sign `msg`, filling `sig` completely
    fn sign(
        &mut self,
        alg: Algorithm,
        priv_key: &[u8],
        msg: &[u8],
        sig: &mut [u8],
    ) -> ProvResult<()>;

    /// Verify `sig` over `msg`
    fn verify(
        &mut self,
        alg: Algorithm,
        pub_key: &[u8],
        msg: &[u8],
        sig: &[u8],
    ) -> ProvResult<bool>;
}

/// Field-addressed persistent store holding provisioned material
pub trait MfgStore {
    /// Write `data` to `field`
    fn write(&mut self, field: MfgField, data: &[u8]) -> ProvResult<()>;

    /// Read exactly `data.len()` bytes of `field`
    fn read(&mut self, field: MfgField, data: &mut [u8]) -> ProvResult<()>;

    /// Erase every field
    fn erase_all(&mut self) -> ProvResult<()>;

    /// Whether the store uses the tag/length/value layout
    fn supports_tlv_layout(&self) -> bool;
}

impl<T: CryptoProvider + ?Sized> CryptoProvider for &mut T {
    fn sha256_digest(&mut self, data: &[u8]) -> ProvResult<Fingerprint> {
        (**self).sha256_digest(data)
    }

    fn generate_keypair(
        &mut self,
        alg: Algorithm,
        priv_key: &mut [u8],
        pub_key: &mut [u8],
    ) -> ProvResult<()> {
        (**self).generate_keypair(alg, priv_key, pub_key)
    }

    fn sign(
        &mut self,
        alg: Algorithm,
        priv_key: &[u8],
        msg: &[u8],
        sig: &mut [u8],
    ) -> ProvResult<()> {
        (**self).sign(alg, priv_key, msg, sig)
    }

    fn verify(
        &mut self,
        alg: Algorithm,
        pub_key: &[u8],
        msg: &[u8],
        sig: &[u8],
    ) -> ProvResult<bool> {
        (**self).verify(alg, pub_key, msg, sig)
    }
}

impl<T: MfgStore + ?Sized> MfgStore for &mut T {
    fn write(&mut self, field: MfgField, data: &[u8]) -> ProvResult<()> {
        (**self).write(field, data)
    }

    fn read(&mut self, field: MfgField, data: &mut [u8]) -> ProvResult<()> {
        (**self).read(field, data)
    }

    fn erase_all(&mut self) -> ProvResult<()> {
        (**self).erase_all()
    }

    fn supports_tlv_layout(&self) -> bool {
        (**self).supports_tlv_layout()
    }
}

#[cfg(test)]
pub(crate) mod test_env;
