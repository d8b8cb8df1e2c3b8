// Bridge-facing protocol: inbound commands and outbound events.

pub mod dispatcher;
pub mod outbound;
