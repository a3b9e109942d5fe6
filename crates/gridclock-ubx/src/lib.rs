pub mod configurator;
pub mod frame;
pub mod serial;
pub mod transport;

pub use configurator::{configure_receiver, AckStatus, Configurator, RetryPolicy, StartupPlan};
pub use frame::{NmeaSentence, UbxFrame};
pub use serial::SerialLink;
pub use transport::Transport;

#[derive(Debug, thiserror::Error)]
pub enum UbxError {
    #[error("serial i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("open serial {dev}: {source}")]
    Open {
        dev: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("payload of {0} bytes does not fit the 16-bit length field")]
    PayloadTooLarge(usize),

    #[error("no acknowledgement for message {class:#04x}/{id:#04x} after {attempts} attempts")]
    NoAcknowledgement { class: u8, id: u8, attempts: u32 },
}
