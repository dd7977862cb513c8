use async_trait::async_trait;
use tracing::info;

use crate::app::{Result, TrailbusterError};

/// The one human-in-the-loop pause of the login flow.
#[async_trait]
pub trait CaptchaGate: Send + Sync {
    /// Block until someone confirms the CAPTCHA has been solved.
    async fn wait_for_human(&self) -> Result<()>;
}

/// Asks on the terminal and waits for Enter.
pub struct StdinCaptchaGate;

#[async_trait]
impl CaptchaGate for StdinCaptchaGate {
    async fn wait_for_human(&self) -> Result<()> {
        println!("Please complete the reCAPTCHA and press Enter to continue...");
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| ())
        })
        .await
        .map_err(|e| TrailbusterError::Other(format!("Prompt task failed: {}", e)))??;
        info!("Continuing after manual CAPTCHA");
        Ok(())
    }
}

/// Proceeds immediately; for unattended runs where a CAPTCHA would fail the
/// login anyway.
pub struct NoopCaptchaGate;

#[async_trait]
impl CaptchaGate for NoopCaptchaGate {
    async fn wait_for_human(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_gate_passes_through() {
        tokio_test::assert_ok!(tokio_test::block_on(NoopCaptchaGate.wait_for_human()));
    }
}
