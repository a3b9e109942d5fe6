use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::frame::{NmeaSentence, UbxFrame, ACK_FRAME_LEN, PORT_UART1};
use crate::transport::Transport;
use crate::UbxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Acknowledged,
    NotAcknowledged,
    /// CFG-PRT: the reply (if any) goes out at the new baud, so we never see it.
    NoResponseExpected,
}

/// How hard to push a frame before giving up.
///
/// `max_attempts = None` keeps resending until the receiver answers.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_backoff")]
    pub backoff: f32,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    100
}

fn default_backoff() -> f32 {
    1.5
}

fn default_max_delay_ms() -> u64 {
    2_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(20),
            delay_ms: default_delay_ms(),
            backoff: default_backoff(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Resend every 100 ms until the receiver answers.
    pub fn unbounded() -> Self {
        Self { max_attempts: None, delay_ms: 100, backoff: 1.0, max_delay_ms: 100 }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.map(|max| attempts >= max).unwrap_or(false)
    }

    /// Pause after the `attempt`-th failed try (1-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff.max(1.0).powi(attempt.saturating_sub(1).min(32) as i32);
        let ms = (self.delay_ms as f32 * factor).min(self.max_delay_ms as f32);
        Duration::from_millis(ms as u64)
    }
}

pub struct Configurator<T> {
    transport: T,
    ack_timeout: Duration,
    policy: RetryPolicy,
}

impl<T: Transport> Configurator<T> {
    pub fn new(transport: T, ack_timeout: Duration, policy: RetryPolicy) -> Self {
        Self { transport, ack_timeout, policy }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// One write/read cycle. `None` means the reply was neither our ACK nor our NAK.
    async fn attempt(
        &mut self,
        out: &[u8],
        ack: &[u8],
        nak: &[u8],
        port_config: bool,
    ) -> Result<Option<AckStatus>, UbxError> {
        self.transport.clear_input().await?;
        self.transport.write_all(out).await?;
        debug!("ubx tx {}", hex::encode(out));

        let mut buf = [0u8; ACK_FRAME_LEN];
        let n = self.transport.read_up_to(&mut buf, self.ack_timeout).await?;
        let reply = &buf[..n];
        debug!("ubx rx {}", hex::encode(reply));

        if reply == ack {
            Ok(Some(AckStatus::Acknowledged))
        } else if reply == nak {
            Ok(Some(AckStatus::NotAcknowledged))
        } else if port_config {
            Ok(Some(AckStatus::NoResponseExpected))
        } else {
            Ok(None)
        }
    }

    async fn run(&mut self, frame: &UbxFrame, accept_nak: bool) -> Result<AckStatus, UbxError> {
        let out = frame.to_bytes();
        let ack = UbxFrame::ack_for(frame.class(), frame.id()).to_bytes();
        let nak = UbxFrame::nak_for(frame.class(), frame.id()).to_bytes();

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let status = self.attempt(&out, &ack, &nak, frame.is_port_config()).await?;
            match status {
                Some(AckStatus::NotAcknowledged) if !accept_nak => {
                    warn!("ubx {:#04x}/{:#04x}: NAK (attempt {})", frame.class(), frame.id(), attempts);
                }
                Some(s) => return Ok(s),
                None => {
                    warn!(
                        "ubx {:#04x}/{:#04x}: no valid reply (attempt {})",
                        frame.class(),
                        frame.id(),
                        attempts
                    );
                }
            }

            if self.policy.exhausted(attempts) {
                return Err(UbxError::NoAcknowledgement { class: frame.class(), id: frame.id(), attempts });
            }
            tokio::time::sleep(self.policy.delay_after(attempts)).await;
        }
    }

    /// Send `frame` and wait for the receiver's verdict, resending on
    /// silence or garbage.
    pub async fn send_and_confirm(&mut self, frame: &UbxFrame) -> Result<AckStatus, UbxError> {
        self.run(frame, true).await
    }

    /// Like [`send_and_confirm`](Self::send_and_confirm), but a NAK is also resent.
    pub async fn send_until_acked(&mut self, frame: &UbxFrame) -> Result<(), UbxError> {
        self.run(frame, false).await.map(|_| ())
    }
}

/// What the receiver should look like after power-on.
#[derive(Debug, Clone)]
pub struct StartupPlan {
    pub baud: u32,
    pub disable: Vec<NmeaSentence>,
    /// Pause between the two CFG-PRT sends.
    pub settle: Duration,
}

impl StartupPlan {
    /// Only RMC and GGA stay on; the rest overruns the UART buffer.
    pub fn new(baud: u32) -> Self {
        Self {
            baud,
            disable: vec![NmeaSentence::Gll, NmeaSentence::Gsa, NmeaSentence::Gsv, NmeaSentence::Vtg],
            settle: Duration::from_millis(100),
        }
    }
}

/// Switch the receiver UART to `plan.baud`, follow it locally, then mute
/// the sentences we don't decode.
pub async fn configure_receiver<T: Transport>(
    cfg: &mut Configurator<T>,
    plan: &StartupPlan,
) -> Result<(), UbxError> {
    info!("receiver: switching to {} baud", plan.baud);
    let prt = UbxFrame::cfg_prt_uart(PORT_UART1, plan.baud)?;

    // The first send may already change the baud, so its reply is unreadable.
    // Send twice and don't look at either outcome.
    let first = cfg.send_and_confirm(&prt).await?;
    tokio::time::sleep(plan.settle).await;
    let second = cfg.send_and_confirm(&prt).await?;
    debug!("receiver: CFG-PRT outcomes {:?} / {:?}", first, second);

    cfg.transport_mut().set_baud_rate(plan.baud)?;

    for sentence in &plan.disable {
        info!("receiver: disabling {:?}", sentence);
        cfg.send_until_acked(&UbxFrame::disable_nmea(*sentence)?).await?;
    }

    info!("receiver: configured");
    Ok(())
}
