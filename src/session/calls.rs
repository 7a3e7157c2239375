//! Call operations for the session facade

use crate::engine::{CallParams, SipUri};
use crate::error::{BridgeError, BridgeResult};

impl super::Session {
    /// Start an outgoing call to `uri`
    ///
    /// The URI is validated synchronously; progress is reported through the
    /// normalized event stream (`ConnectionRequested`, `CallRequested`, ...).
    /// Media encryption is not requested.
    pub async fn outgoing_call(&self, uri: &str) -> BridgeResult<()> {
        let remote: SipUri = uri
            .parse()
            .map_err(|_| BridgeError::invalid_address(uri))?;

        let call = self
            .engine()
            .invite(remote.clone(), CallParams::default())
            .await?;
        tracing::info!(%call, %remote, "outgoing call started");
        Ok(())
    }

    /// Terminate the current call
    ///
    /// Operates on the engine's current call when there is one, else on the
    /// first call in the engine's call list (a paused call is not current
    /// but must still be hangable). Rejects with
    /// [`BridgeError::NoActiveCall`] when no call exists.
    pub async fn hang_up(&self) -> BridgeResult<()> {
        let engine = self.engine();
        let target = engine
            .current_call()
            .or_else(|| engine.calls().into_iter().next())
            .ok_or(BridgeError::NoActiveCall)?;

        tracing::info!(call = %target, "hanging up");
        engine.terminate_call(target).await?;
        Ok(())
    }

    /// Send one DTMF digit on the current call
    ///
    /// The digit is a `char`, so empty or multi-character input is
    /// unrepresentable. Rejects with [`BridgeError::NoActiveCall`] when the
    /// engine has no current call.
    pub async fn send_dtmf(&self, digit: char) -> BridgeResult<bool> {
        let call = self
            .engine()
            .current_call()
            .ok_or(BridgeError::NoActiveCall)?;
        self.engine().send_dtmf(call, digit).await?;
        tracing::debug!(%call, %digit, "dtmf sent");
        Ok(true)
    }
}
