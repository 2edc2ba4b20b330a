use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

use crate::hub::HubOptions;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address the relay binds to.
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port for both the HTTP endpoints and WebSocket upgrades. Use 0 for an ephemeral port.
    #[arg(long, env = "PORT", default_value_t = 7070)]
    pub port: u16,

    /// Remove a participant from the roster when its connection drops without an exit event.
    #[arg(long, env = "PRUNE_ON_CLOSE")]
    pub prune_on_close: bool,
}

impl Cli {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn hub_options(&self) -> HubOptions {
        HubOptions {
            prune_on_close: self.prune_on_close,
        }
    }
}
