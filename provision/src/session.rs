/*++

Licensed under the Apache-2.0 license.

File Name:

    session.rs

Abstract:

    Provisioning arena and the session handle that drives the stages.

--*/

use crate::chain::ChainIngester;
use crate::commit::StoreCommitter;
use crate::context::ProvisioningContext;
use crate::csr::CsrGenerator;
use crate::identity::IdentityGenerator;
use crate::state::{AlgStage, ProvFlags, ProvState};
use crate::verifier::ChainVerifier;
use crate::{cprintln, CryptoProvider, MfgStore};
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::*;

/// Caller-owned storage for the single provisioning context.
///
/// A session mutably borrows the arena, so only one can be live at a time.
pub struct ProvisioningArena {
    context: ProvisioningContext,
    in_use: bool,
}

impl ProvisioningArena {
    pub const fn new() -> Self {
        Self {
            context: ProvisioningContext::new(),
            in_use: false,
        }
    }

    /// Start a provisioning session over a wiped context.
    ///
    /// Fails with `OUT_OF_MEMORY` if a previous session was leaked instead
    /// of being dropped or deinitialized.
    pub fn init<C: CryptoProvider, S: MfgStore>(
        &mut self,
        crypto: C,
        store: S,
    ) -> ProvResult<ProvisioningSession<'_, C, S>> {
        if self.in_use {
            cprintln!("[prov] Arena slot still held");
            return Err(ProvError::OUT_OF_MEMORY);
        }
        self.context.wipe();
        self.in_use = true;
        cprintln!("[prov] Session started");
        Ok(ProvisioningSession {
            arena: self,
            crypto,
            store,
        })
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }
}

impl Default for ProvisioningArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a live provisioning session.
///
/// Stages run in order: fingerprint, CSR and chain per algorithm, app
/// server key, then `verify_and_commit`. Dropping the session wipes every
/// key held in the arena.
pub struct ProvisioningSession<'a, C: CryptoProvider, S: MfgStore> {
    arena: &'a mut ProvisioningArena,
    crypto: C,
    store: S,
}

impl<'a, C: CryptoProvider, S: MfgStore> ProvisioningSession<'a, C, S> {
    fn ctx(&self) -> &ProvisioningContext {
        &self.arena.context
    }

    pub fn state(&self) -> ProvState {
        self.ctx().state()
    }

    pub fn flags(&self) -> ProvFlags {
        self.ctx().flags()
    }

    pub fn stage(&self, alg: Algorithm) -> AlgStage {
        self.ctx().stage(alg)
    }

    pub fn fingerprint(&self) -> ProvResult<Fingerprint> {
        self.ctx().fingerprint()
    }

    pub fn advertised_product_id(&self) -> ProvResult<AdvertisedProductId> {
        self.ctx()
            .identity
            .as_ref()
            .map(|identity| identity.apid)
            .ok_or(ProvError::INVALID_STATE)
    }

    /// Public key generated by the last CSR for `alg`
    pub fn device_public_key(&self, alg: Algorithm) -> Option<&[u8]> {
        self.ctx().device_public_key(alg)
    }

    /// Derive the device fingerprint, discarding all earlier progress.
    pub fn derive_fingerprint(
        &mut self,
        device_type: &str,
        dsn: &str,
        apid: &str,
        board_id: Option<&str>,
    ) -> ProvResult<Fingerprint> {
        IdentityGenerator::new(&mut self.crypto).derive(
            &mut self.arena.context,
            device_type,
            dsn,
            apid,
            board_id,
        )
    }

    /// Generate the device key pair for `alg` and write its CSR to `out`.
    pub fn generate_csr(&mut self, alg: Algorithm, out: &mut [u8]) -> ProvResult<usize> {
        CsrGenerator::new(&mut self.crypto).generate(&mut self.arena.context, alg, out)
    }

    /// Store the certificate chain issued for the `alg` CSR.
    pub fn ingest_chain(&mut self, alg: Algorithm, bytes: &[u8]) -> ProvResult<()> {
        ChainIngester::new().ingest(&mut self.arena.context, alg, bytes)
    }

    /// Set the application server public key, once per derived fingerprint.
    pub fn set_app_server_key(&mut self, key: &[u8]) -> ProvResult<()> {
        if key.is_empty() {
            return Err(ProvError::NULL_POINTER);
        }
        let key: AppServerKey = key.try_into().map_err(|_| ProvError::INVALID_ARGS)?;
        let ctx = &mut self.arena.context;
        ctx.require(ProvFlags::FINGERPRINT_SET)?;
        if ctx.app_server_key.is_some() {
            return Err(ProvError::INVALID_STATE);
        }
        ctx.app_server_key = Some(key);
        cprintln!("[prov] App server key set");
        Ok(())
    }

    /// Verify both chains of trust, then erase the store and persist
    /// everything. Nothing is written unless every signature checks out.
    pub fn verify_and_commit(&mut self) -> ProvResult<()> {
        let ctx = &self.arena.context;
        ChainVerifier::new(&mut self.crypto).verify(ctx)?;
        StoreCommitter::new(&mut self.store).commit(ctx)
    }

    /// End the session, wiping the context and releasing the arena.
    pub fn deinit(self) {}
}

impl<C: CryptoProvider, S: MfgStore> Drop for ProvisioningSession<'_, C, S> {
    fn drop(&mut self) {
        self.arena.context.wipe();
        self.arena.in_use = false;
        cprintln!("[prov] Session closed");
    }
}
